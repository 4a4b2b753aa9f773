//! Packed Parameter Codec
//!
//! Shadow parameters travel to the GPU as four 16-bit channels, each holding
//! two 8-bit normalized values. Packing is lossy and never fails: inputs
//! outside the documented ranges are clamped and NaN packs to zero.
//!
//! | channel  | lo byte                    | hi byte                  |
//! |----------|----------------------------|--------------------------|
//! | `param0` | snorm(offset multiplier)   | unorm(saturation)        |
//! | `param1` | Square: unorm(width)       | Square: unorm(height)    |
//! |          | Baked: texture index       | Baked: unorm(rotation)   |
//! | `param2` | Square: unorm(corner)      | Square: unorm(rotation)  |
//! | `param3` | unused                     | unused                   |

use serde::{Deserialize, Serialize};

use super::caster::{BlobShadowCaster, BlobShadowShape};

/// Four packed 16-bit parameter channels
#[repr(C)]
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    bytemuck::Pod,
    bytemuck::Zeroable,
)]
pub struct PackedBlobShadowParams {
    pub param0: u16,
    pub param1: u16,
    pub param2: u16,
    pub param3: u16,
}

/// Clamp to [0, 1] and quantize to 8 bits
#[inline]
pub fn pack_unorm(value: f32) -> u8 {
    // NaN survives clamp and saturates to 0 in the cast
    (value.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

/// Map [-1, 1] to [0, 1] and quantize to 8 bits
#[inline]
pub fn pack_snorm(value: f32) -> u8 {
    pack_unorm(value * 0.5 + 0.5)
}

#[inline]
pub fn pack_to_short(lo: u8, hi: u8) -> u16 {
    (hi as u16) << 8 | lo as u16
}

#[inline]
pub fn unpack_unorm(packed: u8) -> f32 {
    packed as f32 / 255.0
}

#[inline]
pub fn unpack_snorm(packed: u8) -> f32 {
    unpack_unorm(packed) * 2.0 - 1.0
}

/// Split a short into `(lo, hi)`
#[inline]
pub fn unpack_short(packed: u16) -> (u8, u8) {
    (packed as u8, (packed >> 8) as u8)
}

/// Combine the caster yaw with the shape's own rotation, both in degrees,
/// into a fraction of a full turn in [0, 1)
#[inline]
pub fn wrap_rotation(transform_yaw_degrees: f32, param_rotation_degrees: f32) -> f32 {
    let turns = ((-transform_yaw_degrees + param_rotation_degrees) / 360.0).rem_euclid(1.0);
    // rem_euclid may round up to exactly 1.0 for tiny negative inputs
    if turns >= 1.0 {
        0.0
    } else {
        turns
    }
}

#[inline]
fn pack_common(offset_multiplier: f32, saturation: f32) -> u16 {
    pack_to_short(pack_snorm(offset_multiplier), pack_unorm(saturation))
}

pub fn pack_circle(offset_multiplier: f32, saturation: f32) -> PackedBlobShadowParams {
    PackedBlobShadowParams {
        param0: pack_common(offset_multiplier, saturation),
        ..Default::default()
    }
}

pub fn pack_square(
    offset_multiplier: f32,
    saturation: f32,
    width: f32,
    height: f32,
    corner_radius: f32,
    rotation01: f32,
) -> PackedBlobShadowParams {
    PackedBlobShadowParams {
        param0: pack_common(offset_multiplier, saturation),
        param1: pack_to_short(pack_unorm(width), pack_unorm(height)),
        param2: pack_to_short(pack_unorm(corner_radius), pack_unorm(rotation01)),
        param3: 0,
    }
}

pub fn pack_baked(
    offset_multiplier: f32,
    saturation: f32,
    texture_index: u8,
    rotation01: f32,
) -> PackedBlobShadowParams {
    PackedBlobShadowParams {
        param0: pack_common(offset_multiplier, saturation),
        param1: pack_to_short(texture_index, pack_unorm(rotation01)),
        param2: 0,
        param3: 0,
    }
}

/// Pack a caster's parameters given the yaw of its transform
pub fn pack_params(caster: &BlobShadowCaster, yaw_degrees: f32) -> PackedBlobShadowParams {
    match caster.shape {
        BlobShadowShape::Circle => pack_circle(caster.offset_multiplier, caster.saturation),
        BlobShadowShape::Square {
            width,
            height,
            corner_radius,
            rotation,
        } => pack_square(
            caster.offset_multiplier,
            caster.saturation,
            width,
            height,
            corner_radius,
            wrap_rotation(yaw_degrees, rotation),
        ),
        BlobShadowShape::Baked {
            texture_index,
            rotation,
            ..
        } => pack_baked(
            caster.offset_multiplier,
            caster.saturation,
            texture_index,
            wrap_rotation(yaw_degrees, rotation),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const UNORM_STEP: f32 = 1.0 / 255.0;

    #[test]
    fn test_unorm_round_trip_within_quantization() {
        for i in 0..=1000 {
            let v = i as f32 / 1000.0;
            assert_abs_diff_eq!(unpack_unorm(pack_unorm(v)), v, epsilon = UNORM_STEP * 0.5 + 1e-6);
        }
    }

    #[test]
    fn test_snorm_round_trip_within_quantization() {
        for i in -500..=500 {
            let v = i as f32 / 500.0;
            assert_abs_diff_eq!(unpack_snorm(pack_snorm(v)), v, epsilon = 2.0 * UNORM_STEP);
        }
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(pack_unorm(-3.0), 0);
        assert_eq!(pack_unorm(7.5), 255);
        assert_eq!(pack_unorm(f32::NAN), 0);
        assert_eq!(pack_snorm(-2.0), 0);
        assert_eq!(pack_snorm(2.0), 255);
        assert_eq!(pack_unorm(f32::INFINITY), 255);
    }

    #[test]
    fn test_short_layout() {
        assert_eq!(pack_to_short(0x12, 0x34), 0x3412);
        assert_eq!(unpack_short(0x3412), (0x12, 0x34));
    }

    #[test]
    fn test_wrap_rotation() {
        assert_abs_diff_eq!(wrap_rotation(0.0, 90.0), 0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(wrap_rotation(90.0, 0.0), 0.75, epsilon = 1e-6);
        assert_abs_diff_eq!(wrap_rotation(0.0, 450.0), 0.25, epsilon = 1e-6);
        assert_eq!(wrap_rotation(0.0, 360.0), 0.0);
        for yaw in [-720.0, -45.0, 0.0, 33.0, 359.0, 1000.0] {
            let turns = wrap_rotation(yaw, 10.0);
            assert!((0.0..1.0).contains(&turns));
        }
    }

    #[test]
    fn test_circle_uses_only_param0() {
        let params = pack_circle(0.0, 1.0);
        let (lo, hi) = unpack_short(params.param0);
        assert_eq!(lo, pack_snorm(0.0));
        assert_eq!(hi, 255);
        assert_eq!((params.param1, params.param2, params.param3), (0, 0, 0));
    }

    #[test]
    fn test_square_channels() {
        let params = pack_square(-1.0, 0.5, 1.0, 0.5, 0.25, 0.5);
        assert_eq!(unpack_short(params.param0), (0, 128));
        assert_eq!(unpack_short(params.param1), (255, 128));
        assert_eq!(unpack_short(params.param2), (64, 128));
        assert_eq!(params.param3, 0);
    }

    #[test]
    fn test_baked_channels() {
        let params = pack_baked(1.0, 0.0, 7, 0.25);
        assert_eq!(unpack_short(params.param0), (255, 0));
        assert_eq!(unpack_short(params.param1), (7, 64));
        assert_eq!(params.param2, 0);
    }

    #[test]
    fn test_packing_is_deterministic() {
        let a = pack_square(0.3, 0.7, 0.2, 0.9, 0.1, wrap_rotation(12.0, 40.0));
        let b = pack_square(0.3, 0.7, 0.2, 0.9, 0.1, wrap_rotation(12.0, 40.0));
        assert_eq!(a, b);
    }
}
