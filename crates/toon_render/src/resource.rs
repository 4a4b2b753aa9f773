//! Render Resources - host-owned GPU resource descriptions
//!
//! The pipeline never owns GPU memory. It describes what it needs with the
//! descriptors in this module and refers to what the host created through
//! generational handles.

use serde::{Deserialize, Serialize};
use toon_core::Handle;

/// Marker for constant/storage buffers
#[derive(Debug)]
pub enum GpuBuffer {}
/// Marker for textures and render targets
#[derive(Debug)]
pub enum GpuTexture {}
/// Marker for resolved shader pipelines
#[derive(Debug)]
pub enum GpuPipeline {}

pub type BufferHandle = Handle<GpuBuffer>;
pub type TextureHandle = Handle<GpuTexture>;
pub type PipelineHandle = Handle<GpuPipeline>;

/// Texture format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TextureFormat {
    /// Single 8-bit channel, the blob shadow map format
    R8Unorm,
}

/// Texture usage flags
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureUsage(pub u32);

impl TextureUsage {
    pub const TEXTURE_BINDING: Self = Self(1 << 0);
    pub const RENDER_ATTACHMENT: Self = Self(1 << 1);

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl core::ops::BitOr for TextureUsage {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Temporary render target request
#[derive(Clone, Debug, PartialEq)]
pub struct TextureDesc {
    /// Debug label
    pub label: Option<String>,
    /// Size in pixels
    pub width: u32,
    pub height: u32,
    /// Format
    pub format: TextureFormat,
    /// Usage flags
    pub usage: TextureUsage,
}

impl TextureDesc {
    /// A square single-channel target, the blob shadow map layout
    pub fn shadow_map(label: &str, size: u32) -> Self {
        Self {
            label: Some(label.to_string()),
            width: size,
            height: size,
            format: TextureFormat::R8Unorm,
            usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
        }
    }
}

/// Buffer usage flags
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferUsage(pub u32);

impl BufferUsage {
    /// Bound as a constant buffer and written through `WriteBuffer`
    pub const UNIFORM: Self = Self(1 << 0);

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

/// Buffer descriptor
#[derive(Clone, Debug, PartialEq)]
pub struct BufferDesc {
    /// Debug label
    pub label: Option<String>,
    /// Size in bytes
    pub size: u64,
    /// Usage flags
    pub usage: BufferUsage,
}

impl BufferDesc {
    /// A constant buffer written through `WriteBuffer` commands
    pub fn constant(label: &str, size: u64) -> Self {
        Self {
            label: Some(label.to_string()),
            size,
            usage: BufferUsage::UNIFORM,
        }
    }
}

/// Clear value for render targets
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClearValue {
    /// Color clear value (RGBA)
    Color([f32; 4]),
    /// Keep existing contents
    Load,
}

impl Default for ClearValue {
    fn default() -> Self {
        Self::Color([0.0, 0.0, 0.0, 0.0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadow_map_desc() {
        let desc = TextureDesc::shadow_map("BlobShadowMap", 256);
        assert_eq!(desc.width, 256);
        assert_eq!(desc.height, 256);
        assert_eq!(desc.format, TextureFormat::R8Unorm);
        let usage = TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING;
        assert!(desc.usage.contains(usage));
    }

    #[test]
    fn test_constant_buffer_desc() {
        let desc = BufferDesc::constant("Blob Shadows", 4096);
        assert_eq!(desc.size, 4096);
        assert!(desc.usage.contains(BufferUsage::UNIFORM));
        assert_eq!(desc.label.as_deref(), Some("Blob Shadows"));
    }
}
