//! # toon_render - Toon RP Render Pipeline
//!
//! Backend-agnostic pieces of the Toon render pipeline. The pipeline runs
//! inside a host engine that owns the GPU:
//! - **Resources**: descriptors and handles for host-owned buffers, targets
//!   and pipelines
//! - **Commands**: one ordered command stream the host replays
//! - **Blob shadows**: batched, culled ground-contact shadows
//!
//! ## Example
//!
//! ```ignore
//! use toon_render::prelude::*;
//!
//! let config = ToonPipelineConfig::from_toml_str(&std::fs::read_to_string("toon.toml")?)?;
//! let jobs = Arc::new(JobPool::new(&config.jobs)?);
//! let mut pass = BlobShadowPass::new(&host, jobs)?;
//!
//! let mut managers = BlobShadowManagers::new();
//! let world = managers.create_world(scene)?;
//! let shadow = world.on_renderer_enabled(BlobShadowCaster::circle(0.5), transform);
//!
//! // Each frame
//! let mut ctx = RenderContext::new(&mut host, &mut commands);
//! pass.setup(&mut ctx, &config.blob_shadows, &camera);
//! pass.render(&mut ctx, &mut managers)?;
//! pass.cleanup(&mut ctx);
//! host.execute(commands.drain());
//! ```

pub mod backend;
pub mod blob_shadows;
pub mod camera;
pub mod command;
pub mod config;
pub mod error;
pub mod jobs;
pub mod resource;

pub use backend::{GpuResources, HeadlessResources, RenderContext};
pub use camera::{Camera, Projection, Ray};
pub use command::{CommandList, RenderCommand};
pub use config::{JobPoolConfig, ToonPipelineConfig};
pub use error::{RenderError, RenderResult};
pub use jobs::JobPool;
pub use resource::*;

/// Prelude - commonly used types
pub mod prelude {
    pub use crate::backend::{GpuResources, HeadlessResources, RenderContext};
    pub use crate::blob_shadows::{
        BlobShadowCaster, BlobShadowManagers, BlobShadowMapSize, BlobShadowPass, BlobShadowSettings,
        BlobShadowShape, BlobShadowStats, BlobShadowType, BlobShadowsMode, CasterHandle,
        CasterTransform, ShadowWorld,
    };
    pub use crate::camera::{Camera, Projection};
    pub use crate::command::{CommandList, RenderCommand};
    pub use crate::config::{JobPoolConfig, ToonPipelineConfig};
    pub use crate::error::{RenderError, RenderResult};
    pub use crate::jobs::JobPool;
    pub use toon_core::Id;
}
