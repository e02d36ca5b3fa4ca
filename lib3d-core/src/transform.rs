/// Axis rotations, translations and the composed view-projection product
use nalgebra::{Matrix4, Vector3};

/// Transform builder for 3D transformations
///
/// All matrices follow the right-hand rule and compose with `*` (or
/// [`crate::math::matmul4`]) in column-vector convention.
pub struct Transform;

impl Transform {
    /// Rotation about the X axis (radians)
    pub fn rotation_x(angle: f32) -> Matrix4<f32> {
        let (s, c) = angle.sin_cos();
        #[rustfmt::skip]
        let m = Matrix4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, c,   -s,  0.0,
            0.0, s,   c,   0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        m
    }

    /// Rotation about the Y axis (radians)
    pub fn rotation_y(angle: f32) -> Matrix4<f32> {
        let (s, c) = angle.sin_cos();
        #[rustfmt::skip]
        let m = Matrix4::new(
            c,   0.0, s,   0.0,
            0.0, 1.0, 0.0, 0.0,
            -s,  0.0, c,   0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        m
    }

    /// Rotation about the Z axis (radians)
    pub fn rotation_z(angle: f32) -> Matrix4<f32> {
        let (s, c) = angle.sin_cos();
        #[rustfmt::skip]
        let m = Matrix4::new(
            c,   -s,  0.0, 0.0,
            s,   c,   0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        m
    }

    /// Fixed extrinsic tilt: X rotation applied after Y rotation
    pub fn tilt(x_radians: f32, y_radians: f32) -> Matrix4<f32> {
        Self::rotation_x(x_radians) * Self::rotation_y(y_radians)
    }

    /// Create a translation matrix
    pub fn translation_matrix(x: f32, y: f32, z: f32) -> Matrix4<f32> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    /// Projection after the inverse camera orientation after the inverse
    /// camera translation
    pub fn view_projection(
        projection: &Matrix4<f32>,
        inverse_orientation: &Matrix4<f32>,
        inverse_position: &Matrix4<f32>,
    ) -> Matrix4<f32> {
        projection * (inverse_orientation * inverse_position)
    }
}
