//! Blob Shadows
//!
//! Cheap ground-contact shadows for large numbers of small casters. Casters
//! are grouped per scene and shadow type into dense arrays mirrored in
//! persistent GPU buffers. Every frame the camera's view of the ground plane
//! is intersected with each caster's 2D bounds on worker threads, and the
//! survivors are drawn into a small shadow map in batches of at most
//! [`MAX_BATCH_SIZE`] procedural quads.
//!
//! ## Components
//!
//! - [`packing`]: parameter codec for the GPU element
//! - [`BlobShadowGroup`]: dense per-type registry with swap-remove
//! - [`culling`] and [`receiver`]: receiver rectangle and culling jobs
//! - [`BlobShadowBatching`]: per-key batching of visible casters and draws
//! - [`GroupGpuBuffer`]: window-aligned persistent buffers
//! - [`ShadowWorld`] / [`BlobShadowManagers`]: per-scene lifetimes
//! - [`BlobShadowPass`]: setup/render/cleanup for the camera renderer

pub mod batching;
pub mod caster;
pub mod config;
pub mod culling;
pub mod group;
pub mod manager;
pub mod packing;
pub mod pass;
pub mod receiver;
pub mod stats;
pub mod streaming;

use toon_core::Id;

pub use batching::{BatchKey, BatchSet, BatchingStats, BlobShadowBatch, BlobShadowBatching};
pub use caster::{
    BlobShadowCaster, BlobShadowShape, BlobShadowType, CasterHandle, CasterRecord, CasterTransform,
    GpuBlobShadowData,
};
pub use config::{BlobShadowMapSize, BlobShadowSettings, BlobShadowsMode};
pub use culling::{cull_group, cull_into, Bounds2D, CullRecord, CullingJob};
pub use group::{BlobShadowGroup, MovedRenderer};
pub use manager::{BlobShadowManagers, CasterLocation, ShadowWorld};
pub use packing::PackedBlobShadowParams;
pub use pass::{BlobShadowPass, BlobShadowPipelines};
pub use receiver::compute_receiver_bounds;
pub use stats::BlobShadowStats;
pub use streaming::{BufferWindow, DirtyRange, GroupGpuBuffer};

/// Casters per batch and elements per buffer window
pub const MAX_BATCH_SIZE: usize = 128;

// Shader properties
pub const BLOB_SHADOW_MAP: Id = Id::from_name("_BlobShadowMap");
pub const BLOB_SHADOW_COORDS: Id = Id::from_name("_BlobShadowCoords");
pub const BLOB_SHADOW_PARAMS: Id = Id::from_name("_BlobShadowParams");
pub const BLOB_SHADOW_DATA: Id = Id::from_name("_BlobShadowData");
pub const BLOB_SHADOW_INDICES: Id = Id::from_name("_BlobShadowIndices");
pub const BLOB_SHADOW_BAKED_TEXTURE: Id = Id::from_name("_BlobShadowBakedTexture");
