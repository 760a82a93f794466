//! 2D transform used when drawing meshes and textures.

use glam::{Mat4, Vec2, Vec4};

/// Position, rotation, scale, origin offset and shear of a 2D drawable.
///
/// Applied in the order: move by `-origin`, shear, scale, rotate, translate
/// by `position`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    pub position: Vec2,
    /// Radians, clockwise in a y-down coordinate system
    pub rotation: f32,
    pub scale: Vec2,
    /// Local point placed at `position`
    pub origin: Vec2,
    pub shear: Vec2,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
            origin: Vec2::ZERO,
            shear: Vec2::ZERO,
        }
    }
}

impl Transform2D {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_position(position: Vec2) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_origin(mut self, origin: Vec2) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_shear(mut self, shear: Vec2) -> Self {
        self.shear = shear;
        self
    }

    /// Get the model matrix for this transform
    pub fn matrix(&self) -> Mat4 {
        let (s, c) = self.rotation.sin_cos();
        let (sx, sy) = (self.scale.x, self.scale.y);
        let (kx, ky) = (self.shear.x, self.shear.y);

        let m00 = c * sx - ky * s * sy;
        let m10 = s * sx + ky * c * sy;
        let m01 = kx * c * sx - s * sy;
        let m11 = kx * s * sx + c * sy;
        let tx = self.position.x - self.origin.x * m00 - self.origin.y * m01;
        let ty = self.position.y - self.origin.x * m10 - self.origin.y * m11;

        Mat4::from_cols(
            Vec4::new(m00, m10, 0.0, 0.0),
            Vec4::new(m01, m11, 0.0, 0.0),
            Vec4::new(0.0, 0.0, 1.0, 0.0),
            Vec4::new(tx, ty, 0.0, 1.0),
        )
    }

    /// Apply the transform to a local point.
    pub fn transform_point(&self, point: Vec2) -> Vec2 {
        self.matrix().transform_point3(point.extend(0.0)).truncate()
    }
}

impl From<Transform2D> for Mat4 {
    fn from(transform: Transform2D) -> Self {
        transform.matrix()
    }
}

impl From<&Transform2D> for Mat4 {
    fn from(transform: &Transform2D) -> Self {
        transform.matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_near(a: Vec2, b: Vec2) {
        assert!((a - b).length() < 1e-5, "{a:?} != {b:?}");
    }

    #[test]
    fn test_default_is_identity() {
        assert_eq!(Transform2D::default().matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_origin_lands_on_position() {
        let transform = Transform2D::from_position(Vec2::new(50.0, 20.0))
            .with_origin(Vec2::new(8.0, 4.0))
            .with_scale(Vec2::new(2.0, 3.0))
            .with_rotation(0.7);
        assert_near(
            transform.transform_point(Vec2::new(8.0, 4.0)),
            Vec2::new(50.0, 20.0),
        );
    }

    #[test]
    fn test_rotation_quarter_turn() {
        let transform = Transform2D::new().with_rotation(std::f32::consts::FRAC_PI_2);
        assert_near(
            transform.transform_point(Vec2::new(1.0, 0.0)),
            Vec2::new(0.0, 1.0),
        );
    }

    #[test]
    fn test_shear_and_scale() {
        let transform = Transform2D::new()
            .with_shear(Vec2::new(1.0, 0.0))
            .with_scale(Vec2::new(2.0, 1.0));
        // x' = sx * (x + kx * y)
        assert_near(
            transform.transform_point(Vec2::new(1.0, 1.0)),
            Vec2::new(4.0, 1.0),
        );
    }
}
