//! # toon_core - Toon RP Core
//!
//! Dependency-free primitives shared by the render pipeline crates:
//! - **Handles**: generational, type-tagged references to host-owned
//!   resources and registry entries
//! - **Ids**: FNV-hashed identifiers for scenes, shader properties and
//!   pipelines
//!
//! Nothing in here knows about the GPU; the render crate gives these types
//! their meaning.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

pub mod handle;
pub mod id;

pub use handle::*;
pub use id::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::handle::{Handle, HandleMap};
    pub use crate::id::Id;
}
