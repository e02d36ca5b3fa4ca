/// Four colored triangles and an axis triad seen from a camera orbiting them
use lib3d_core::{
    CameraOrientation, CameraParameters, Color, Handle, Lib3d, OriginTriad, RenderBackend, Result,
    Triangle, Vertex,
};
use std::f32::consts::PI;
use std::time::Duration;

use crate::Demo;

pub const TIME_PER_REVOLUTION: Duration = Duration::from_millis(3_000);
pub const ORIGIN_SIZE: f32 = 1.0;

/// Camera on a circle of radius 3 around (0.5, 0.75, -0.5)
pub fn camera_position(t: f32) -> Vertex {
    Vertex::new(0.5 - 3.0 * t.sin(), 0.75, -0.5 - 3.0 * t.cos())
}

/// Basis that keeps the camera facing the orbit centre
pub fn camera_orientation(t: f32) -> CameraOrientation {
    CameraOrientation {
        vx: Vertex::new(-t.cos(), 0.0, t.sin()),
        vy: Vertex::new(0.0, 1.0, 0.0),
        vz: Vertex::new(-t.sin(), 0.0, -t.cos()),
    }
}

fn corner_triangles() -> [Triangle; 4] {
    let a = Vertex::new(1.0, 1.0, -1.0);
    let b = Vertex::new(1.0, 0.0, -1.0);
    let c = Vertex::new(0.0, 1.0, -1.0);
    let d = Vertex::new(1.0, 1.0, 0.0);
    [
        Triangle::new(a, b, c, Color::new(0.72, 0.13, 0.2, 1.0)),
        Triangle::new(a, d, c, Color::new(0.82, 0.4, 0.35, 1.0)),
        Triangle::new(b, d, c, Color::new(0.95, 0.7, 0.55, 1.0)),
        Triangle::new(a, b, d, Color::new(0.96, 0.87, 0.85, 1.0)),
    ]
}

pub struct TrianglesDemo {
    t: f32,
    /// Orbit angle the clock restarts from after a pause
    resume_from: f32,
    animation_offset: Option<Duration>,
    triangles: Vec<Handle>,
    origin: OriginTriad,
}

impl TrianglesDemo {
    pub fn create<B: RenderBackend>(backend: B, aspect: f32) -> Result<(Lib3d<B>, Self)> {
        let parameters = CameraParameters {
            f: 1.0,
            width: aspect,
            height: 1.0,
            zfar: 100.0,
            znear: 0.1,
        };
        let mut lib3d = Lib3d::new(backend, parameters, camera_position(0.0), camera_orientation(0.0))?;

        let triangles = corner_triangles()
            .into_iter()
            .map(|triangle| lib3d.add_triangle(triangle))
            .collect();
        let origin = OriginTriad::new(lib3d.scene_mut(), ORIGIN_SIZE);

        Ok((
            lib3d,
            Self {
                t: 0.0,
                resume_from: 0.0,
                animation_offset: None,
                triangles,
                origin,
            },
        ))
    }

    /// Orbit angle in radians
    pub fn angle(&self) -> f32 {
        self.t
    }

    pub fn triangle_handles(&self) -> &[Handle] {
        &self.triangles
    }

    pub fn axis_handles(&self) -> &[Handle] {
        self.origin.line_handles()
    }
}

impl Demo for TrianglesDemo {
    fn title(&self) -> &str {
        "Lib3d Triangles"
    }

    fn tick(&mut self, now: Duration) {
        let offset = *self.animation_offset.get_or_insert(now);
        let radians_per_ms = 2.0 * PI / TIME_PER_REVOLUTION.as_millis() as f32;
        let elapsed_ms = now.saturating_sub(offset).as_secs_f32() * 1000.0;
        self.t = (self.resume_from + elapsed_ms * radians_per_ms).rem_euclid(2.0 * PI);
    }

    fn update_scene<B: RenderBackend>(&mut self, lib3d: &mut Lib3d<B>) -> Result<()> {
        lib3d.set_camera_position(camera_position(self.t));
        lib3d.set_camera_orientation(camera_orientation(self.t))
    }

    /// The orbit holds its angle while stopped and continues from it
    fn set_paused(&mut self, _paused: bool) {
        self.resume_from = self.t;
        self.animation_offset = None;
    }

    fn status(&self) -> String {
        format!("orbit {:.0}°", self.t.to_degrees())
    }
}
