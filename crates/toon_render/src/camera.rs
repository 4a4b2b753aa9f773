//! Camera description consumed by the pipeline
//!
//! Cameras use a right-handed convention: local `-Z` is forward, `+Y` is up
//! and `+X` is right.

use glam::{Mat3, Quat, Vec2, Vec3};
use toon_core::Id;

/// Projection type
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    Perspective {
        /// Vertical field of view in radians
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        /// Half of the view height in world units
        half_height: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
}

impl Default for Projection {
    fn default() -> Self {
        Self::Perspective {
            fov_y: 60.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// A ray in world space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction
    pub direction: Vec3,
}

impl Ray {
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Camera for rendering
#[derive(Clone, Debug)]
pub struct Camera {
    /// Scene whose shadow world this camera renders
    pub scene: Id,
    /// World position
    pub position: Vec3,
    /// Orientation
    pub rotation: Quat,
    /// Projection
    pub projection: Projection,
}

impl Camera {
    pub fn new(scene: Id) -> Self {
        Self {
            scene,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            projection: Projection::default(),
        }
    }

    pub fn perspective(scene: Id, fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Perspective { fov_y, aspect, near, far },
            ..Self::new(scene)
        }
    }

    pub fn orthographic(scene: Id, half_height: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Orthographic { half_height, aspect, near, far },
            ..Self::new(scene)
        }
    }

    /// Orthographic camera at `height` looking straight down on a square
    /// region of half-extent `half_extent` centered at `center` (x, z)
    pub fn top_down(scene: Id, center: Vec2, height: f32, half_extent: f32) -> Self {
        Self {
            position: Vec3::new(center.x, height, center.y),
            rotation: Quat::from_rotation_x(-core::f32::consts::FRAC_PI_2),
            ..Self::orthographic(scene, half_extent, 1.0, 0.01, height * 2.0)
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Orient the camera towards `target`. `up` must not be parallel to the
    /// view direction.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let forward = (target - self.position).normalize();
        let right = forward.cross(up).normalize();
        let actual_up = right.cross(forward);
        self.rotation = Quat::from_mat3(&Mat3::from_cols(right, actual_up, -forward));
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn is_orthographic(&self) -> bool {
        matches!(self.projection, Projection::Orthographic { .. })
    }

    pub fn far_plane(&self) -> f32 {
        match self.projection {
            Projection::Perspective { far, .. } | Projection::Orthographic { far, .. } => far,
        }
    }

    /// Rays through the four viewport corners, in the order
    /// bottom-left, bottom-right, top-right, top-left.
    ///
    /// Perspective rays start at the eye and fan out through the corners.
    /// Orthographic rays are parallel to the view direction and start on the
    /// near plane.
    pub fn corner_rays(&self) -> [Ray; 4] {
        const CORNERS: [(f32, f32); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

        let forward = self.forward();
        let right = self.right();
        let up = self.up();

        match self.projection {
            Projection::Perspective { fov_y, aspect, .. } => {
                let tan_y = (fov_y * 0.5).tan();
                let tan_x = tan_y * aspect;
                CORNERS.map(|(sx, sy)| Ray {
                    origin: self.position,
                    direction: (forward + right * (sx * tan_x) + up * (sy * tan_y)).normalize(),
                })
            }
            Projection::Orthographic { half_height, aspect, near, .. } => {
                let half_width = half_height * aspect;
                let center = self.position + forward * near;
                CORNERS.map(|(sx, sy)| Ray {
                    origin: center + right * (sx * half_width) + up * (sy * half_height),
                    direction: forward,
                })
            }
        }
    }
}
