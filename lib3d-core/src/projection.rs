/// Camera model: perspective parameters, position and orientation basis,
/// and the derived world-to-clip matrix
use nalgebra::{Matrix3, Matrix4, Vector3};

use crate::error::{Lib3dError, Result};
use crate::geometry::Vertex;
use crate::math::{self, format_mat4};
use crate::transform::Transform;

/// Reference "up" used by [`Camera::look_at`]
pub const WORLD_UP: Vertex = Vertex::new(0.0, 0.0, 1.0);

/// Perspective projection parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraParameters {
    /// Focal length
    pub f: f32,
    pub width: f32,
    pub height: f32,
    pub zfar: f32,
    pub znear: f32,
}

impl CameraParameters {
    fn validate(&self) -> Result<()> {
        if self.zfar == self.znear {
            return Err(Lib3dError::InvalidCameraParameters(format!(
                "zfar and znear are both {}",
                self.zfar
            )));
        }
        if self.znear <= 0.0 || self.zfar <= 0.0 {
            return Err(Lib3dError::InvalidCameraParameters(format!(
                "clip planes must be positive (znear = {}, zfar = {})",
                self.znear, self.zfar
            )));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(Lib3dError::InvalidCameraParameters(format!(
                "viewport must have a positive extent ({} x {})",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Perspective projection with the reversed depth range used by the
    /// draw path: the near plane maps to NDC z = +1, the far plane to -1.
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        let depth = self.zfar - self.znear;
        let mut m = Matrix4::zeros();
        m[(0, 0)] = 2.0 * self.f / self.width;
        m[(1, 1)] = 2.0 * self.f / self.height;
        m[(2, 2)] = (self.zfar + self.znear) / depth;
        m[(3, 2)] = -1.0;
        m[(2, 3)] = 2.0 * self.zfar * self.znear / depth;
        m
    }
}

impl Default for CameraParameters {
    fn default() -> Self {
        Self {
            f: 1.0,
            width: 1.0,
            height: 1.0,
            zfar: 100.0,
            znear: 0.1,
        }
    }
}

/// Camera basis in world coordinates.
///
/// `vx` points right, `vy` up and `vz` backward (from the target toward the
/// camera).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraOrientation {
    pub vx: Vertex,
    pub vy: Vertex,
    pub vz: Vertex,
}

impl CameraOrientation {
    /// The basis vectors as the columns of a 3x3 matrix
    pub fn basis_matrix(&self) -> Matrix3<f32> {
        Matrix3::from_columns(&[
            Vector3::from(self.vx),
            Vector3::from(self.vy),
            Vector3::from(self.vz),
        ])
    }

    /// Inverse of the basis via the adjugate, embedded in a 4x4 identity.
    ///
    /// A zero determinant yields non-finite entries.
    pub fn inverse_matrix(&self) -> Matrix4<f32> {
        let a = self.basis_matrix();
        let det = a.determinant();

        let cofactor = |r0: usize, r1: usize, c0: usize, c1: usize| {
            a[(r0, c0)] * a[(r1, c1)] - a[(r0, c1)] * a[(r1, c0)]
        };

        let mut inv = Matrix4::identity();
        inv[(0, 0)] = cofactor(1, 2, 1, 2) / det;
        inv[(0, 1)] = -cofactor(0, 2, 1, 2) / det;
        inv[(0, 2)] = cofactor(0, 1, 1, 2) / det;
        inv[(1, 0)] = -cofactor(1, 2, 0, 2) / det;
        inv[(1, 1)] = cofactor(0, 2, 0, 2) / det;
        inv[(1, 2)] = -cofactor(0, 1, 0, 2) / det;
        inv[(2, 0)] = cofactor(1, 2, 0, 1) / det;
        inv[(2, 1)] = -cofactor(0, 2, 0, 1) / det;
        inv[(2, 2)] = cofactor(0, 1, 0, 1) / det;
        inv
    }
}

impl Default for CameraOrientation {
    fn default() -> Self {
        Self {
            vx: Vertex::new(-1.0, 0.0, 0.0),
            vy: Vertex::new(0.0, 0.0, 1.0),
            vz: Vertex::new(0.0, 1.0, 0.0),
        }
    }
}

/// Camera configuration for 3D rendering.
///
/// Every setter recomputes the dependent matrices immediately.
#[derive(Debug, Clone)]
pub struct Camera {
    parameters: CameraParameters,
    position: Vertex,
    orientation: CameraOrientation,
    projection: Matrix4<f32>,
    inverse_orientation: Matrix4<f32>,
    inverse_position: Matrix4<f32>,
    composed: Matrix4<f32>,
}

impl Camera {
    pub const DEFAULT_POSITION: Vertex = Vertex::new(0.0, 1.0, 0.0);

    pub fn new(
        parameters: CameraParameters,
        position: Vertex,
        orientation: CameraOrientation,
    ) -> Result<Self> {
        parameters.validate()?;
        check_basis(&orientation)?;

        let mut camera = Self {
            parameters,
            position,
            orientation,
            projection: Matrix4::identity(),
            inverse_orientation: Matrix4::identity(),
            inverse_position: Matrix4::identity(),
            composed: Matrix4::identity(),
        };
        camera.recompute();
        Ok(camera)
    }

    pub fn parameters(&self) -> &CameraParameters {
        &self.parameters
    }

    pub fn position(&self) -> Vertex {
        self.position
    }

    pub fn orientation(&self) -> &CameraOrientation {
        &self.orientation
    }

    pub fn projection_matrix(&self) -> &Matrix4<f32> {
        &self.projection
    }

    pub fn inverse_orientation_matrix(&self) -> &Matrix4<f32> {
        &self.inverse_orientation
    }

    pub fn inverse_position_matrix(&self) -> &Matrix4<f32> {
        &self.inverse_position
    }

    /// World space to clip space: projection x inverse orientation x
    /// inverse position
    pub fn composed_matrix(&self) -> &Matrix4<f32> {
        &self.composed
    }

    pub fn set_position(&mut self, position: Vertex) {
        self.position = position;
        self.compute_inverse_position();
        self.compute_composed();
    }

    /// Fails without touching the camera if the basis is singular
    pub fn set_orientation(&mut self, orientation: CameraOrientation) -> Result<()> {
        check_basis(&orientation)?;
        self.orientation = orientation;
        self.compute_inverse_orientation();
        self.compute_composed();
        Ok(())
    }

    /// Fails without touching the camera if `zfar == znear` or an extent is
    /// not positive
    pub fn set_parameters(&mut self, parameters: CameraParameters) -> Result<()> {
        parameters.validate()?;
        self.parameters = parameters;
        self.compute_projection();
        self.compute_composed();
        Ok(())
    }

    /// Orient the camera toward `target` with [`WORLD_UP`] as reference.
    ///
    /// There is no fallback basis: a target at the camera position, or
    /// straight above or below it, is rejected.
    pub fn look_at(&mut self, target: Vertex) -> Result<()> {
        let backward: Vector3<f32> = (self.position - target).into();
        if backward.norm() == 0.0 {
            return Err(Lib3dError::DegenerateOrientation(format!(
                "look-at target {:?} coincides with the camera position",
                target
            )));
        }
        let vz = math::normalize(&backward);

        let right = math::cross(&WORLD_UP.into(), &vz);
        if right.norm() <= f32::EPSILON {
            return Err(Lib3dError::DegenerateOrientation(format!(
                "viewing axis {:?} is parallel to world up",
                Vertex::from(vz)
            )));
        }
        let vx = math::normalize(&right);
        let vy = math::normalize(&math::cross(&vz, &vx));

        self.set_orientation(CameraOrientation {
            vx: vx.into(),
            vy: vy.into(),
            vz: vz.into(),
        })
    }

    /// Recompute every derived matrix from the current inputs
    pub fn recompute(&mut self) {
        self.compute_projection();
        self.compute_inverse_orientation();
        self.compute_inverse_position();
        self.compute_composed();
    }

    fn compute_projection(&mut self) {
        self.projection = self.parameters.projection_matrix();
    }

    fn compute_inverse_orientation(&mut self) {
        self.inverse_orientation = self.orientation.inverse_matrix();
    }

    fn compute_inverse_position(&mut self) {
        self.inverse_position =
            Transform::translation_matrix(-self.position.x, -self.position.y, -self.position.z);
    }

    fn compute_composed(&mut self) {
        self.composed = Transform::view_projection(
            &self.projection,
            &self.inverse_orientation,
            &self.inverse_position,
        );
        log::trace!("inverse view and projection matrix:\n{}", format_mat4(&self.composed));
    }
}

impl Default for Camera {
    fn default() -> Self {
        let parameters = CameraParameters::default();
        let orientation = CameraOrientation::default();
        let mut camera = Self {
            parameters,
            position: Self::DEFAULT_POSITION,
            orientation,
            projection: Matrix4::identity(),
            inverse_orientation: Matrix4::identity(),
            inverse_position: Matrix4::identity(),
            composed: Matrix4::identity(),
        };
        camera.recompute();
        camera
    }
}

fn check_basis(orientation: &CameraOrientation) -> Result<()> {
    let det = orientation.basis_matrix().determinant();
    if det == 0.0 || !det.is_finite() {
        return Err(Lib3dError::DegenerateOrientation(format!(
            "basis determinant is {}",
            det
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector4;

    fn identity_orientation() -> CameraOrientation {
        CameraOrientation {
            vx: Vertex::new(1.0, 0.0, 0.0),
            vy: Vertex::new(0.0, 1.0, 0.0),
            vz: Vertex::new(0.0, 0.0, 1.0),
        }
    }

    #[test]
    fn test_projection_entries() {
        let p = CameraParameters {
            f: 1.5,
            width: 1.0,
            height: 2.0,
            zfar: 100.0,
            znear: 0.1,
        };
        let m = p.projection_matrix();
        let s = m.as_slice();
        assert_relative_eq!(s[0], 3.0);
        assert_relative_eq!(s[5], 1.5);
        assert_relative_eq!(s[10], 100.1 / 99.9, epsilon = 1e-5);
        assert_eq!(s[11], -1.0);
        assert_relative_eq!(s[14], 20.0 / 99.9, epsilon = 1e-5);
        assert_eq!(s[15], 0.0);
    }

    #[test]
    fn test_clip_planes_map_to_reversed_depth() {
        let camera = Camera::new(
            CameraParameters::default(),
            Vertex::ORIGIN,
            identity_orientation(),
        )
        .unwrap();
        let m = camera.composed_matrix();

        let near = m * Vector4::new(0.0, 0.0, -0.1, 1.0);
        let far = m * Vector4::new(0.0, 0.0, -100.0, 1.0);
        assert_relative_eq!(near.z / near.w, 1.0, epsilon = 1e-4);
        assert_relative_eq!(far.z / far.w, -1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_default_orientation_inverse() {
        let orientation = CameraOrientation::default();
        let basis = orientation.basis_matrix().to_homogeneous();
        let product = orientation.inverse_matrix() * basis;
        assert_relative_eq!(product, Matrix4::identity(), epsilon = 1e-6);
    }

    #[test]
    fn test_general_basis_inverse() {
        let orientation = CameraOrientation {
            vx: Vertex::new(2.0, 0.5, -1.0),
            vy: Vertex::new(0.0, 1.0, 3.0),
            vz: Vertex::new(1.0, -2.0, 0.5),
        };
        let product = orientation.inverse_matrix() * orientation.basis_matrix().to_homogeneous();
        assert_relative_eq!(product, Matrix4::identity(), epsilon = 1e-5);
    }

    #[test]
    fn test_look_at_origin_from_above_y() {
        let mut camera = Camera::default();
        camera.set_position(Vertex::new(0.0, 4.0, 0.0));
        camera.look_at(Vertex::ORIGIN).unwrap();

        let o = camera.orientation();
        let (vx, vy, vz): (Vector3<f32>, Vector3<f32>, Vector3<f32>) =
            (o.vx.into(), o.vy.into(), o.vz.into());
        assert_relative_eq!(vz, Vector3::y(), epsilon = 1e-6);
        assert_relative_eq!(vx.norm(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(vy.norm(), 1.0, epsilon = 1e-6);
        assert!(vx.dot(&vy).abs() < 1e-6);
        assert!(vx.dot(&vz).abs() < 1e-6);
        assert!(vy.dot(&vz).abs() < 1e-6);
        // right-handed
        assert_relative_eq!(vx.cross(&vy), vz, epsilon = 1e-6);
    }

    #[test]
    fn test_look_at_rejects_degenerate_targets() {
        let mut camera = Camera::default();
        camera.set_position(Vertex::new(0.0, 0.0, 4.0));
        let before = *camera.orientation();

        assert!(matches!(
            camera.look_at(Vertex::ORIGIN),
            Err(Lib3dError::DegenerateOrientation(_))
        ));
        assert!(matches!(
            camera.look_at(Vertex::new(0.0, 0.0, 4.0)),
            Err(Lib3dError::DegenerateOrientation(_))
        ));
        assert_eq!(*camera.orientation(), before);
    }

    #[test]
    fn test_singular_orientation_is_rejected() {
        let mut camera = Camera::default();
        let flat = CameraOrientation {
            vx: Vertex::new(1.0, 0.0, 0.0),
            vy: Vertex::new(2.0, 0.0, 0.0),
            vz: Vertex::new(0.0, 0.0, 1.0),
        };
        assert!(camera.set_orientation(flat).is_err());
        assert_eq!(*camera.orientation(), CameraOrientation::default());

        // the raw inverse is non-finite for such a basis
        assert!(flat.inverse_matrix().iter().any(|x| !x.is_finite()));
    }

    #[test]
    fn test_equal_clip_planes_are_rejected() {
        let mut camera = Camera::default();
        let params = CameraParameters {
            zfar: 1.0,
            znear: 1.0,
            ..CameraParameters::default()
        };
        assert!(matches!(
            camera.set_parameters(params),
            Err(Lib3dError::InvalidCameraParameters(_))
        ));
        assert_eq!(*camera.parameters(), CameraParameters::default());
    }

    #[test]
    fn test_setters_recompute_composed_matrix() {
        let mut camera = Camera::default();
        let before = *camera.composed_matrix();

        camera.set_position(Vertex::new(3.0, 0.0, 0.0));
        assert_ne!(*camera.composed_matrix(), before);
        assert_eq!(camera.inverse_position_matrix().as_slice()[12], -3.0);

        let expected = camera.projection_matrix()
            * camera.inverse_orientation_matrix()
            * camera.inverse_position_matrix();
        assert_relative_eq!(*camera.composed_matrix(), expected, epsilon = 1e-6);
    }
}
