//! Caster descriptors and the per-caster record a Group keeps

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use toon_core::Handle;

use super::batching::BatchKey;
use super::culling::{Bounds2D, CullRecord};
use super::packing::{pack_params, PackedBlobShadowParams};
use crate::resource::TextureHandle;

/// Handle naming a registered caster inside its [`ShadowWorld`](super::ShadowWorld)
pub type CasterHandle = Handle<BlobShadowCaster>;

/// Shadow type tag, one Group per type and scene
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlobShadowType {
    Circle = 0,
    Square = 1,
    Baked = 2,
}

impl BlobShadowType {
    pub const COUNT: usize = 3;
    pub const ALL: [BlobShadowType; Self::COUNT] = [Self::Circle, Self::Square, Self::Baked];

    /// Array index, also the shader pass drawing this type
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Shape of a blob shadow with its type-specific parameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BlobShadowShape {
    Circle,
    Square {
        /// Width relative to the blob size (0-1)
        width: f32,
        /// Height relative to the blob size (0-1)
        height: f32,
        /// Corner rounding (0-1)
        corner_radius: f32,
        /// Rotation in degrees, added to the caster yaw
        rotation: f32,
    },
    Baked {
        /// Texture array holding the baked shadow
        texture: TextureHandle,
        /// Slice within `texture`
        texture_index: u8,
        /// Rotation in degrees, added to the caster yaw
        rotation: f32,
    },
}

impl BlobShadowShape {
    pub fn shadow_type(&self) -> BlobShadowType {
        match self {
            Self::Circle => BlobShadowType::Circle,
            Self::Square { .. } => BlobShadowType::Square,
            Self::Baked { .. } => BlobShadowType::Baked,
        }
    }
}

/// Shadow caster descriptor as exposed by the caster component
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlobShadowCaster {
    pub shape: BlobShadowShape,
    /// Half extent of the blob on the ground plane
    pub half_size: f32,
    /// Scales the global shadow offset for this caster (-1 to 1)
    pub offset_multiplier: f32,
    /// Per-caster saturation (0-1)
    pub saturation: f32,
    /// Static casters are computed once and skipped by per-frame updates
    pub is_static: bool,
}

impl BlobShadowCaster {
    pub fn new(shape: BlobShadowShape, half_size: f32) -> Self {
        Self {
            shape,
            half_size,
            offset_multiplier: 1.0,
            saturation: 1.0,
            is_static: false,
        }
    }

    pub fn circle(half_size: f32) -> Self {
        Self::new(BlobShadowShape::Circle, half_size)
    }

    pub fn square(
        half_size: f32,
        width: f32,
        height: f32,
        corner_radius: f32,
        rotation: f32,
    ) -> Self {
        Self::new(
            BlobShadowShape::Square {
                width,
                height,
                corner_radius,
                rotation,
            },
            half_size,
        )
    }

    pub fn baked(half_size: f32, texture: TextureHandle, texture_index: u8, rotation: f32) -> Self {
        Self::new(
            BlobShadowShape::Baked {
                texture,
                texture_index,
                rotation,
            },
            half_size,
        )
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn with_saturation(mut self, saturation: f32) -> Self {
        self.saturation = saturation;
        self
    }

    pub fn with_offset_multiplier(mut self, offset_multiplier: f32) -> Self {
        self.offset_multiplier = offset_multiplier;
        self
    }

    pub fn shadow_type(&self) -> BlobShadowType {
        self.shape.shadow_type()
    }

    /// Baked texture this caster samples, if any
    pub fn baked_texture(&self) -> Option<TextureHandle> {
        match self.shape {
            BlobShadowShape::Baked { texture, .. } => Some(texture),
            _ => None,
        }
    }
}

/// World transform of a caster
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CasterTransform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl CasterTransform {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Position projected onto the ground plane (x, z)
    pub fn ground_position(&self) -> Vec2 {
        Vec2::new(self.position.x, self.position.z)
    }

    /// Heading around +Y in degrees, measured from +Z toward +X
    ///
    /// A caster's forward axis is +Z, unlike [`Camera`](crate::camera::Camera)
    /// which looks down -Z. A yaw of 90 degrees faces +X.
    pub fn yaw_degrees(&self) -> f32 {
        let forward = self.rotation * Vec3::Z;
        forward.x.atan2(forward.z).to_degrees()
    }
}

impl Default for CasterTransform {
    fn default() -> Self {
        Self::from_position(Vec3::ZERO)
    }
}

/// Per-caster GPU element, one per dense index
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuBlobShadowData {
    /// Ground-plane position (x, z)
    pub position: [f32; 2],
    pub half_size: f32,
    pub _pad0: f32,
    pub params: PackedBlobShadowParams,
    pub _pad1: [u32; 2],
}

impl GpuBlobShadowData {
    pub const SIZE: usize = core::mem::size_of::<Self>();

    pub fn new(position: Vec2, half_size: f32, params: PackedBlobShadowParams) -> Self {
        Self {
            position: position.to_array(),
            half_size,
            params,
            ..Default::default()
        }
    }
}

/// CPU-side state of one registered caster
#[derive(Clone, Debug)]
pub struct CasterRecord {
    pub handle: CasterHandle,
    pub caster: BlobShadowCaster,
    pub transform: CasterTransform,
    /// Transform was set since the last recompute
    pub transform_changed: bool,
    /// Descriptor was edited since the last recompute
    pub params_dirty: bool,
    /// Recompute on next update even if static
    pub forced: bool,
    /// Position in the Group's dynamic list, `None` for static casters
    pub(super) dynamic_slot: Option<usize>,
}

impl CasterRecord {
    pub fn new(handle: CasterHandle, caster: BlobShadowCaster, transform: CasterTransform) -> Self {
        Self {
            handle,
            caster,
            transform,
            transform_changed: false,
            params_dirty: false,
            forced: false,
            dynamic_slot: None,
        }
    }

    /// Whether the next update must recompute this record
    pub fn needs_update(&self) -> bool {
        if self.forced {
            return true;
        }
        !self.caster.is_static && (self.transform_changed || self.params_dirty)
    }

    /// Rebuild the GPU element and culling record, clearing change flags
    pub fn compute(&mut self) -> (GpuBlobShadowData, CullRecord) {
        let position = self.transform.ground_position();
        let half_size = self.caster.half_size.max(0.0);
        let params = pack_params(&self.caster, self.transform.yaw_degrees());

        self.transform_changed = false;
        self.params_dirty = false;
        self.forced = false;

        (
            GpuBlobShadowData::new(position, half_size, params),
            CullRecord {
                bounds: Bounds2D::from_center(position, Vec2::splat(half_size)),
                key: BatchKey::new(self.caster.baked_texture()),
            },
        )
    }
}
