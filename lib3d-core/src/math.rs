/// Vector and matrix helpers
///
/// Flat matrices are stored column-major: element `[col * rows + row]`.
/// `nalgebra::Matrix4` uses the same storage order, so `as_slice()` can be
/// passed straight to a renderer.
use nalgebra::{Matrix4, Point3, Vector3, Vector4};
use std::fmt::Write;

/// Multiply an `n x p` matrix `a` by a `p x m` matrix `b`, both column-major.
///
/// The result is `n x m`, column-major. A column vector is an `p x 1` matrix,
/// so `matmul_nm(a, v, 4, 1, 4)` applies a 4x4 matrix to a 4-vector.
pub fn matmul_nm(a: &[f32], b: &[f32], n: usize, m: usize, p: usize) -> Vec<f32> {
    assert_eq!(a.len(), n * p, "left operand must be {}x{}", n, p);
    assert_eq!(b.len(), p * m, "right operand must be {}x{}", p, m);

    let mut out = Vec::with_capacity(n * m);
    for col in 0..m {
        for row in 0..n {
            let mut sum = 0.0;
            for k in 0..p {
                sum += a[k * n + row] * b[col * p + k];
            }
            out.push(sum);
        }
    }
    out
}

/// Square matrix product of two column-major `n x n` matrices
pub fn matmul(a: &[f32], b: &[f32], n: usize) -> Vec<f32> {
    matmul_nm(a, b, n, n, n)
}

pub fn matmul4(a: &Matrix4<f32>, b: &Matrix4<f32>) -> Matrix4<f32> {
    a * b
}

pub fn matvec4(a: &Matrix4<f32>, v: &Vector4<f32>) -> Vector4<f32> {
    a * v
}

/// Divide a vector by its Euclidean length.
///
/// A zero vector yields non-finite components; callers must not pass one.
pub fn normalize(v: &Vector3<f32>) -> Vector3<f32> {
    v / v.norm()
}

/// Right-handed cross product
pub fn cross(a: &Vector3<f32>, b: &Vector3<f32>) -> Vector3<f32> {
    a.cross(b)
}

pub fn to_radians(degrees: f32) -> f32 {
    degrees * std::f32::consts::PI / 180.0
}

pub fn to_degrees(radians: f32) -> f32 {
    radians * 180.0 / std::f32::consts::PI
}

/// Homogeneous point to 3D point
pub fn perspective_divide(v: &Vector4<f32>) -> Point3<f32> {
    Point3::new(v.x / v.w, v.y / v.w, v.z / v.w)
}

/// Render a 4x4 matrix row by row with two decimals
pub fn format_mat4(m: &Matrix4<f32>) -> String {
    let data = m.as_slice();
    let mut out = String::new();
    for row in 0..4 {
        for col in 0..4 {
            let _ = write!(out, "{:.2}", data[col * 4 + row]);
            if col < 3 {
                out.push(' ');
            }
        }
        if row < 3 {
            out.push('\n');
        }
    }
    out
}

/// Render a flattened attribute buffer, one vertex per line and a blank line
/// between primitives.
///
/// Returns `None` if the buffer length is not a multiple of `components`.
pub fn format_element_buffer(buffer: &[f32], components: usize, vertices: usize) -> Option<String> {
    if components == 0 || buffer.len() % components != 0 {
        log::warn!(
            "number of components {} inconsistent with buffer size {}",
            components,
            buffer.len()
        );
        return None;
    }

    let mut out = String::new();
    for (i, value) in buffer.iter().enumerate() {
        if i > 0 {
            if i % components == 0 {
                out.push('\n');
            } else {
                out.push(' ');
            }
            if vertices > 0 && i % (components * vertices) == 0 {
                out.push('\n');
            }
        }
        let _ = write!(out, "{:.2}", value);
    }
    Some(out)
}
