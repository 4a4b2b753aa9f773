//! Receiver rectangle
//!
//! The part of the ground plane a camera can see, found by casting the four
//! viewport-corner rays against the plane `y = receiver_plane_y`.

use glam::{Vec2, Vec3};

use super::config::BlobShadowSettings;
use super::culling::Bounds2D;
use crate::camera::{Camera, Ray};

/// Hit point of `ray` with the plane `y = plane_y` within `max_distance`
pub fn intersect_receiver_plane(ray: &Ray, plane_y: f32, max_distance: f32) -> Option<Vec3> {
    if ray.direction.y.abs() <= f32::EPSILON {
        return None;
    }
    let t = (plane_y - ray.origin.y) / ray.direction.y;
    if t > 0.0 && t <= max_distance {
        Some(ray.at(t))
    } else {
        None
    }
}

/// Ground rectangle seen by `camera`, or `None` when fewer than two corner
/// rays reach the receiver plane within the max shadow distance.
///
/// Rays that miss contribute their point at the max distance, projected onto
/// the plane. The result is inflated by the absolute shadow offset so that
/// offset shadows of casters just outside the view still land inside it.
pub fn compute_receiver_bounds(camera: &Camera, settings: &BlobShadowSettings) -> Option<Bounds2D> {
    let mut hits = 0;
    let mut min = Vec2::splat(f32::INFINITY);
    let mut max = Vec2::splat(f32::NEG_INFINITY);

    for ray in camera.corner_rays() {
        let hit =
            intersect_receiver_plane(&ray, settings.receiver_plane_y, settings.max_distance);
        let point = match hit {
            Some(hit) => {
                hits += 1;
                hit
            }
            None => ray.at(settings.max_distance),
        };
        let projected = Vec2::new(point.x, point.z);
        min = min.min(projected);
        max = max.max(projected);
    }

    if hits < 2 {
        log::trace!("Receiver plane degenerate: {} corner rays hit", hits);
        return None;
    }

    Some(Bounds2D::new(min, max).inflate(settings.shadow_offset.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use glam::Quat;
    use toon_core::Id;

    #[test]
    fn test_top_down_orthographic() {
        let camera = Camera::top_down(Id::NULL, Vec2::new(3.0, -2.0), 20.0, 10.0);
        let bounds = compute_receiver_bounds(&camera, &BlobShadowSettings::default()).unwrap();
        assert_abs_diff_eq!(bounds.min.x, -7.0, epsilon = 1e-3);
        assert_abs_diff_eq!(bounds.max.x, 13.0, epsilon = 1e-3);
        assert_abs_diff_eq!(bounds.min.y, -12.0, epsilon = 1e-3);
        assert_abs_diff_eq!(bounds.max.y, 8.0, epsilon = 1e-3);
    }

    #[test]
    fn test_offset_inflates() {
        let camera = Camera::top_down(Id::NULL, Vec2::ZERO, 20.0, 10.0);
        let settings = BlobShadowSettings {
            shadow_offset: Vec2::new(-1.0, 0.5),
            ..Default::default()
        };
        let bounds = compute_receiver_bounds(&camera, &settings).unwrap();
        assert_abs_diff_eq!(bounds.min.x, -11.0, epsilon = 1e-3);
        assert_abs_diff_eq!(bounds.max.y, 10.5, epsilon = 1e-3);
    }

    #[test]
    fn test_looking_up_is_degenerate() {
        let camera = Camera::perspective(Id::NULL, 60.0_f32.to_radians(), 1.0, 0.1, 100.0)
            .with_position(Vec3::new(0.0, 2.0, 0.0))
            .with_rotation(Quat::from_rotation_x(core::f32::consts::FRAC_PI_2));
        assert!(camera.forward().y > 0.99);
        assert!(compute_receiver_bounds(&camera, &BlobShadowSettings::default()).is_none());
    }

    #[test]
    fn test_plane_out_of_range_is_degenerate() {
        let camera = Camera::top_down(Id::NULL, Vec2::ZERO, 200.0, 10.0);
        let settings = BlobShadowSettings {
            max_distance: 50.0,
            ..Default::default()
        };
        assert!(compute_receiver_bounds(&camera, &settings).is_none());
    }

    #[test]
    fn test_horizon_rays_clamp_to_max_distance() {
        // Tilted perspective camera: bottom corners hit, top corners miss
        let mut camera = Camera::perspective(Id::NULL, 60.0_f32.to_radians(), 1.0, 0.1, 1000.0)
            .with_position(Vec3::new(0.0, 5.0, 0.0));
        camera.look_at(Vec3::new(0.0, 4.0, -20.0), Vec3::Y);
        let settings = BlobShadowSettings {
            max_distance: 40.0,
            ..Default::default()
        };
        let bounds = compute_receiver_bounds(&camera, &settings).unwrap();
        // The far edge is bounded by the max distance
        assert!(bounds.min.y >= -40.0 - 1e-3);
        assert!(bounds.max.y < 0.0);
    }

    #[test]
    fn test_intersect_requires_forward_hit() {
        let ray = Ray {
            origin: Vec3::new(0.0, 1.0, 0.0),
            direction: Vec3::Y,
        };
        assert!(intersect_receiver_plane(&ray, 0.0, 100.0).is_none());
        let down = Ray {
            origin: Vec3::new(0.0, 1.0, 0.0),
            direction: -Vec3::Y,
        };
        assert_eq!(intersect_receiver_plane(&down, 0.0, 100.0), Some(Vec3::ZERO));
        assert!(intersect_receiver_plane(&down, 0.0, 0.5).is_none());
    }
}
