/// Geometry primitives for 3D rendering
use nalgebra::{Point3, Vector3, Vector4};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Key of a primitive in the scene, derived from its vertex coordinates.
///
/// Two primitives with the same vertices in the same order share a handle.
pub type Handle = u64;

/// A point (or, depending on context, a direction) in world space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vertex {
    pub const ORIGIN: Vertex = Vertex::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Homogeneous point form (w = 1)
    pub fn to_homogeneous(&self) -> Vector4<f32> {
        Vector4::new(self.x, self.y, self.z, 1.0)
    }

    /// Drop the w component of a homogeneous vector
    pub fn from_homogeneous(v: &Vector4<f32>) -> Self {
        Self::new(v.x, v.y, v.z)
    }

    pub fn scale(&self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }

    pub fn length(&self) -> f32 {
        Vector3::from(*self).norm()
    }

    fn hash_into<H: Hasher>(&self, state: &mut H) {
        for c in [self.x, self.y, self.z] {
            // -0.0 == 0.0, so both must produce the same key
            let canonical = if c == 0.0 { 0.0f32 } else { c };
            canonical.to_bits().hash(state);
        }
    }
}

impl From<Vector3<f32>> for Vertex {
    fn from(v: Vector3<f32>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<Vertex> for Vector3<f32> {
    fn from(v: Vertex) -> Self {
        Vector3::new(v.x, v.y, v.z)
    }
}

impl From<Point3<f32>> for Vertex {
    fn from(p: Point3<f32>) -> Self {
        Self::new(p.x, p.y, p.z)
    }
}

impl std::ops::Add for Vertex {
    type Output = Vertex;

    fn add(self, rhs: Vertex) -> Vertex {
        Vertex::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vertex {
    type Output = Vertex;

    fn sub(self, rhs: Vertex) -> Vertex {
        Vertex::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// RGBA color, channels conventionally in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Opaque color from 8-bit channels
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// A filled triangle with a single color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub v1: Vertex,
    pub v2: Vertex,
    pub v3: Vertex,
    pub color: Color,
}

impl Triangle {
    pub fn new(v1: Vertex, v2: Vertex, v3: Vertex, color: Color) -> Self {
        Self { v1, v2, v3, color }
    }

    pub fn vertices(&self) -> [Vertex; 3] {
        [self.v1, self.v2, self.v3]
    }

    /// Content key; color does not participate
    pub fn handle(&self) -> Handle {
        let mut hasher = DefaultHasher::new();
        for v in self.vertices() {
            v.hash_into(&mut hasher);
        }
        hasher.finish()
    }
}

/// A line segment with a single color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub v1: Vertex,
    pub v2: Vertex,
    pub color: Color,
}

impl Line {
    pub fn new(v1: Vertex, v2: Vertex, color: Color) -> Self {
        Self { v1, v2, color }
    }

    pub fn vertices(&self) -> [Vertex; 2] {
        [self.v1, self.v2]
    }

    /// Content key; color does not participate
    pub fn handle(&self) -> Handle {
        let mut hasher = DefaultHasher::new();
        // Keeps line keys apart from triangle keys built from the same points
        2u8.hash(&mut hasher);
        for v in self.vertices() {
            v.hash_into(&mut hasher);
        }
        hasher.finish()
    }
}
