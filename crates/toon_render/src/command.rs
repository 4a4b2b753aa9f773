//! Command Stream
//!
//! Every GPU-visible side effect of the pipeline (buffer uploads, target
//! binds, global shader properties, draws) is recorded into one ordered
//! [`CommandList`] which the host replays in order.
//!
//! # Usage
//!
//! ```ignore
//! let mut commands = CommandList::new();
//! commands.set_render_target(target, ClearValue::default());
//! commands.set_global_texture(BLOB_SHADOW_MAP, target);
//! commands.draw_procedural(pipeline, 0, 4 * visible);
//! host.execute(commands.drain());
//! ```

use glam::Vec4;
use toon_core::Id;

use crate::resource::{BufferHandle, ClearValue, PipelineHandle, TextureHandle};

/// A single recorded command
#[derive(Clone, Debug, PartialEq)]
pub enum RenderCommand {
    /// Bind a render target, optionally clearing it
    SetRenderTarget {
        target: TextureHandle,
        clear: ClearValue,
    },

    /// Upload bytes into a buffer at a byte offset
    WriteBuffer {
        buffer: BufferHandle,
        offset: u64,
        data: Vec<u8>,
    },

    /// Global vector shader property
    SetGlobalVector { property: Id, value: Vec4 },

    /// Global texture shader property
    SetGlobalTexture { property: Id, texture: TextureHandle },

    /// Bind a byte range of a buffer as a constant buffer
    BindConstantBuffer {
        property: Id,
        buffer: BufferHandle,
        offset: u64,
        size: u64,
    },

    /// Small per-draw float array
    SetFloatArray { property: Id, values: Vec<f32> },

    /// Procedural draw without vertex buffers
    DrawProcedural {
        pipeline: PipelineHandle,
        pass: u32,
        vertex_count: u32,
    },
}

impl RenderCommand {
    /// Check if this command is a draw
    pub fn is_draw(&self) -> bool {
        matches!(self, Self::DrawProcedural { .. })
    }
}

/// Ordered command stream for one frame
#[derive(Clone, Debug, Default)]
pub struct CommandList {
    commands: Vec<RenderCommand>,
}

impl CommandList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: RenderCommand) {
        self.commands.push(command);
    }

    pub fn set_render_target(&mut self, target: TextureHandle, clear: ClearValue) {
        self.push(RenderCommand::SetRenderTarget { target, clear });
    }

    pub fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        self.push(RenderCommand::WriteBuffer {
            buffer,
            offset,
            data: data.to_vec(),
        });
    }

    pub fn set_global_vector(&mut self, property: Id, value: Vec4) {
        self.push(RenderCommand::SetGlobalVector { property, value });
    }

    pub fn set_global_texture(&mut self, property: Id, texture: TextureHandle) {
        self.push(RenderCommand::SetGlobalTexture { property, texture });
    }

    pub fn bind_constant_buffer(
        &mut self,
        property: Id,
        buffer: BufferHandle,
        offset: u64,
        size: u64,
    ) {
        self.push(RenderCommand::BindConstantBuffer {
            property,
            buffer,
            offset,
            size,
        });
    }

    pub fn set_float_array(&mut self, property: Id, values: &[f32]) {
        self.push(RenderCommand::SetFloatArray {
            property,
            values: values.to_vec(),
        });
    }

    pub fn draw_procedural(&mut self, pipeline: PipelineHandle, pass: u32, vertex_count: u32) {
        self.push(RenderCommand::DrawProcedural {
            pipeline,
            pass,
            vertex_count,
        });
    }

    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderCommand> {
        self.commands.iter()
    }

    /// Number of draw commands recorded
    pub fn draw_count(&self) -> usize {
        self.commands.iter().filter(|c| c.is_draw()).count()
    }

    /// Total bytes recorded in buffer uploads
    pub fn uploaded_bytes(&self) -> u64 {
        self.commands
            .iter()
            .map(|c| match c {
                RenderCommand::WriteBuffer { data, .. } => data.len() as u64,
                _ => 0,
            })
            .sum()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Hand the recorded commands to the host, leaving the list empty
    pub fn drain(&mut self) -> std::vec::Drain<'_, RenderCommand> {
        self.commands.drain(..)
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}
