//! Host Backend Seam
//!
//! The host engine owns the GPU. The pipeline asks it for resources through
//! [`GpuResources`] and records work into a [`CommandList`]; both travel
//! together in a [`RenderContext`].
//!
//! [`HeadlessResources`] implements the trait without a GPU. It allocates
//! generational handles, remembers descriptors and counts live resources,
//! which is enough for headless runs and tests.

use std::collections::HashMap;

use toon_core::HandleMap;

use crate::command::CommandList;
use crate::resource::{
    BufferDesc, BufferHandle, GpuBuffer, GpuPipeline, GpuTexture, PipelineHandle, TextureDesc,
    TextureHandle,
};

/// GPU resource services provided by the host
pub trait GpuResources {
    /// Create a persistent buffer
    fn create_buffer(&mut self, desc: &BufferDesc) -> BufferHandle;

    /// Release a buffer created by `create_buffer`
    fn release_buffer(&mut self, buffer: BufferHandle);

    /// Acquire a temporary render target for this frame
    fn acquire_render_target(&mut self, desc: &TextureDesc) -> TextureHandle;

    /// Return a temporary render target
    fn release_render_target(&mut self, target: TextureHandle);

    /// Resolve a shader pipeline by name
    fn find_pipeline(&self, name: &str) -> Option<PipelineHandle>;

    /// Required alignment of constant buffer bind offsets, in bytes
    fn constant_buffer_offset_alignment(&self) -> u64 {
        256
    }
}

/// Per-frame access to the host
pub struct RenderContext<'a> {
    pub resources: &'a mut dyn GpuResources,
    pub commands: &'a mut CommandList,
}

impl<'a> RenderContext<'a> {
    pub fn new(resources: &'a mut dyn GpuResources, commands: &'a mut CommandList) -> Self {
        Self { resources, commands }
    }
}

/// GPU-less resource bookkeeping
#[derive(Debug, Default)]
pub struct HeadlessResources {
    buffers: HandleMap<GpuBuffer, BufferDesc>,
    targets: HandleMap<GpuTexture, TextureDesc>,
    pipelines: HandleMap<GpuPipeline, String>,
    pipeline_names: HashMap<String, PipelineHandle>,
    buffers_created: u64,
    buffers_released: u64,
}

impl HeadlessResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Headless host with the blob shadow pipelines registered
    pub fn with_pipelines(names: &[&str]) -> Self {
        let mut resources = Self::new();
        for name in names {
            resources.register_pipeline(name);
        }
        resources
    }

    /// Make a pipeline resolvable by name
    pub fn register_pipeline(&mut self, name: &str) -> PipelineHandle {
        if let Some(handle) = self.pipeline_names.get(name) {
            return *handle;
        }
        let handle = self.pipelines.insert(name.to_string());
        self.pipeline_names.insert(name.to_string(), handle);
        handle
    }

    pub fn buffer_desc(&self, buffer: BufferHandle) -> Option<&BufferDesc> {
        self.buffers.get(buffer)
    }

    pub fn render_target_desc(&self, target: TextureHandle) -> Option<&TextureDesc> {
        self.targets.get(target)
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_render_targets(&self) -> usize {
        self.targets.len()
    }

    pub fn buffers_created(&self) -> u64 {
        self.buffers_created
    }

    pub fn buffers_released(&self) -> u64 {
        self.buffers_released
    }
}

impl GpuResources for HeadlessResources {
    fn create_buffer(&mut self, desc: &BufferDesc) -> BufferHandle {
        self.buffers_created += 1;
        self.buffers.insert(desc.clone())
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(buffer).is_some() {
            self.buffers_released += 1;
        } else {
            log::warn!("Released unknown buffer {:?}", buffer);
        }
    }

    fn acquire_render_target(&mut self, desc: &TextureDesc) -> TextureHandle {
        self.targets.insert(desc.clone())
    }

    fn release_render_target(&mut self, target: TextureHandle) {
        if self.targets.remove(target).is_none() {
            log::warn!("Released unknown render target {:?}", target);
        }
    }

    fn find_pipeline(&self, name: &str) -> Option<PipelineHandle> {
        self.pipeline_names.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_buffer_lifecycle() {
        let mut resources = HeadlessResources::new();
        let a = resources.create_buffer(&BufferDesc::constant("a", 4096));
        let b = resources.create_buffer(&BufferDesc::constant("b", 8192));
        assert_eq!(resources.live_buffers(), 2);
        assert_eq!(resources.buffer_desc(b).map(|d| d.size), Some(8192));

        resources.release_buffer(a);
        assert_eq!(resources.live_buffers(), 1);
        assert_eq!(resources.buffers_released(), 1);
        assert!(resources.buffer_desc(a).is_none());

        // Double release is ignored
        resources.release_buffer(a);
        assert_eq!(resources.buffers_released(), 1);
    }

    #[test]
    fn test_pipeline_lookup() {
        let mut resources = HeadlessResources::with_pipelines(&["Default"]);
        let default = resources.find_pipeline("Default");
        assert!(default.is_some());
        assert_eq!(resources.register_pipeline("Default"), default.unwrap());
        assert!(resources.find_pipeline("Metaballs").is_none());
    }

    #[test]
    fn test_render_target_lifecycle() {
        let mut resources = HeadlessResources::new();
        let target = resources.acquire_render_target(&TextureDesc::shadow_map("map", 128));
        assert_eq!(resources.live_render_targets(), 1);
        resources.release_render_target(target);
        assert_eq!(resources.live_render_targets(), 0);
    }
}
