//! Blob Shadow Pass
//!
//! Per-camera driver of the blob shadow system. The camera renderer calls
//! [`setup`](BlobShadowPass::setup) when the frame begins,
//! [`render`](BlobShadowPass::render) once its culling results are ready and
//! [`cleanup`](BlobShadowPass::cleanup) when the frame ends.
//!
//! # Usage
//!
//! ```ignore
//! let mut pass = BlobShadowPass::new(&resources, jobs.clone())?;
//!
//! // Each frame
//! let mut ctx = RenderContext::new(&mut resources, &mut commands);
//! pass.setup(&mut ctx, &settings, &camera);
//! pass.render(&mut ctx, &mut managers)?;
//! pass.cleanup(&mut ctx);
//! ```

use std::sync::Arc;

use glam::Vec4;

use super::batching::BlobShadowBatching;
use super::config::{BlobShadowSettings, BlobShadowsMode};
use super::manager::{BlobShadowManagers, ShadowWorld};
use super::receiver::compute_receiver_bounds;
use super::stats::BlobShadowStats;
use super::{BLOB_SHADOW_COORDS, BLOB_SHADOW_MAP, BLOB_SHADOW_PARAMS};
use crate::backend::{GpuResources, RenderContext};
use crate::camera::Camera;
use crate::error::{RenderError, RenderResult};
use crate::jobs::JobPool;
use crate::resource::{ClearValue, PipelineHandle, TextureDesc, TextureHandle};

/// Shader pipelines of the two blend modes. The pass index within a
/// pipeline is the shadow type index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlobShadowPipelines {
    pub default: PipelineHandle,
    pub metaballs: PipelineHandle,
}

impl BlobShadowPipelines {
    /// Resolve both pipelines, failing if either is missing
    pub fn resolve(resources: &dyn GpuResources) -> RenderResult<Self> {
        let find = |mode: BlobShadowsMode| {
            let name = mode.pipeline_name();
            resources
                .find_pipeline(name)
                .ok_or_else(|| RenderError::PipelineNotFound(name.to_string()))
        };
        Ok(Self {
            default: find(BlobShadowsMode::Default)?,
            metaballs: find(BlobShadowsMode::Metaballs)?,
        })
    }

    pub fn for_mode(&self, mode: BlobShadowsMode) -> PipelineHandle {
        match mode {
            BlobShadowsMode::Default => self.default,
            BlobShadowsMode::Metaballs => self.metaballs,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct ShadowTarget {
    handle: TextureHandle,
    size: u32,
}

/// Blob shadow map pass of one camera
#[derive(Debug)]
pub struct BlobShadowPass {
    pipelines: BlobShadowPipelines,
    jobs: Arc<JobPool>,
    batching: BlobShadowBatching,
    settings: BlobShadowSettings,
    camera: Option<Camera>,
    target: Option<ShadowTarget>,
    stats: BlobShadowStats,
}

impl BlobShadowPass {
    /// Create the pass, resolving its pipelines up front
    pub fn new(resources: &dyn GpuResources, jobs: Arc<JobPool>) -> RenderResult<Self> {
        Ok(Self {
            pipelines: BlobShadowPipelines::resolve(resources)?,
            jobs,
            batching: BlobShadowBatching::new(),
            settings: BlobShadowSettings::default(),
            camera: None,
            target: None,
            stats: BlobShadowStats::default(),
        })
    }

    /// Begin a frame: remember settings and camera, and make sure the shadow
    /// map exists at the configured size
    pub fn setup(
        &mut self,
        ctx: &mut RenderContext<'_>,
        settings: &BlobShadowSettings,
        camera: &Camera,
    ) {
        self.settings = settings.clone();
        self.camera = Some(camera.clone());

        let size = settings.map_size.pixels();
        match self.target {
            Some(target) if target.size == size => {}
            stale => {
                if let Some(old) = stale {
                    ctx.resources.release_render_target(old.handle);
                    log::debug!("Blob shadow map resized {} -> {}", old.size, size);
                }
                let handle = ctx
                    .resources
                    .acquire_render_target(&TextureDesc::shadow_map("Blob Shadow Map", size));
                self.target = Some(ShadowTarget { handle, size });
            }
        }
    }

    /// Update the camera's world, clear the shadow map and draw every
    /// visible caster into it
    pub fn render(
        &mut self,
        ctx: &mut RenderContext<'_>,
        managers: &mut BlobShadowManagers,
    ) -> RenderResult<()> {
        let (Some(camera), Some(target)) = (self.camera.clone(), self.target) else {
            log::warn!("Blob shadow pass rendered without setup");
            return Ok(());
        };

        self.stats.begin_frame();

        let world: Option<&ShadowWorld> = match managers.world_for_camera(&camera) {
            Some(world) => {
                self.stats.uploaded_bytes = world.update(&mut *ctx.resources, &mut *ctx.commands);
                self.stats.casters = world.caster_count() as u32;
                Some(&*world)
            }
            None => None,
        };

        ctx.commands.set_render_target(target.handle, ClearValue::default());
        ctx.commands.set_global_texture(BLOB_SHADOW_MAP, target.handle);

        let Some(receiver) = compute_receiver_bounds(&camera, &self.settings) else {
            self.stats.degenerate_frames += 1;
            ctx.commands.set_global_vector(BLOB_SHADOW_COORDS, Vec4::ZERO);
            return Ok(());
        };

        let size = receiver.size().max(glam::Vec2::splat(1e-6));
        ctx.commands.set_global_vector(
            BLOB_SHADOW_COORDS,
            Vec4::new(receiver.min.x, receiver.min.y, 1.0 / size.x, 1.0 / size.y),
        );
        ctx.commands.set_global_vector(
            BLOB_SHADOW_PARAMS,
            Vec4::new(
                self.settings.saturation,
                self.settings.receiver_plane_y,
                self.settings.shadow_offset.x,
                self.settings.shadow_offset.y,
            ),
        );

        let Some(world) = world else {
            log::trace!("No blob shadow world for scene {}", camera.scene);
            return Ok(());
        };

        self.batching.batch(world, &self.jobs, receiver);
        self.batching
            .draw(world, &self.pipelines, self.settings.mode, &mut *ctx.commands);
        self.batching.clear();
        self.stats.record_batching(self.batching.stats());

        log::trace!(
            "Blob shadows: {} casters, {} visible, {} draws",
            self.stats.casters,
            self.stats.visible,
            self.stats.draws
        );
        Ok(())
    }

    /// End the frame and release the transient shadow map
    pub fn cleanup(&mut self, ctx: &mut RenderContext<'_>) {
        if let Some(target) = self.target.take() {
            ctx.resources.release_render_target(target.handle);
        }
        self.camera = None;
    }

    pub fn stats(&self) -> &BlobShadowStats {
        &self.stats
    }

    pub fn pipelines(&self) -> &BlobShadowPipelines {
        &self.pipelines
    }

    /// Shadow map of the current frame, between `setup` and `cleanup`
    pub fn target(&self) -> Option<TextureHandle> {
        self.target.map(|target| target.handle)
    }
}
