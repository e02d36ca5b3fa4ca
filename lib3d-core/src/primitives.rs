/// Parametric line geometry: a sphere's meridian/parallel grid and an
/// origin axis triad
///
/// Generators own the handles they emit and rebuild them from scratch on
/// every redraw.
use nalgebra::{Matrix4, Vector4};
use std::f32::consts::PI;

use crate::error::{Lib3dError, Result};
use crate::geometry::{Color, Handle, Line, Vertex};
use crate::math::{matvec4, to_degrees, to_radians};
use crate::scene::Scene;
use crate::transform::Transform;

/// Sphere grid configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SphereConfig {
    /// Extrinsic tilt about X (degrees)
    pub tilt_x_deg: f32,
    /// Extrinsic tilt about Y (degrees)
    pub tilt_y_deg: f32,
    /// Segments per circle
    pub segments: usize,
    /// Meridians around the full circle; each drawn great circle covers two
    pub meridians: usize,
    /// Latitudes of the drawn parallels (degrees)
    pub parallels: Vec<f32>,
    pub line_color: Color,
    /// Color of the 0° meridian and the equator
    pub great_circle_color: Color,
}

impl Default for SphereConfig {
    fn default() -> Self {
        Self {
            tilt_x_deg: 0.0,
            tilt_y_deg: 0.0,
            segments: 50,
            meridians: 24,
            parallels: vec![60.0, 45.0, 30.0, 15.0, 0.0, -15.0, -30.0, -45.0, -60.0],
            line_color: Color::rgb(0.0, 1.0, 1.0),
            great_circle_color: Color::rgb(0.0, 0.75, 1.0),
        }
    }
}

/// Wire-frame sphere centred at the origin, spinning about its polar (Z) axis
#[derive(Debug, Clone)]
pub struct SphereGrid {
    radius: f32,
    config: SphereConfig,
    tilt: Matrix4<f32>,
    line_handles: Vec<Handle>,
}

impl SphereGrid {
    /// Create the grid and draw it at rotation angle 0
    pub fn new(scene: &mut Scene, radius: f32) -> Self {
        Self::with_config(scene, radius, SphereConfig::default())
    }

    pub fn with_config(scene: &mut Scene, radius: f32, config: SphereConfig) -> Self {
        let tilt = Transform::tilt(to_radians(config.tilt_x_deg), to_radians(config.tilt_y_deg));
        let mut sphere = Self {
            radius,
            config,
            tilt,
            line_handles: Vec::new(),
        };
        sphere.draw(scene, 0.0);
        sphere
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn config(&self) -> &SphereConfig {
        &self.config
    }

    /// Handles emitted by the last redraw, in emission order
    pub fn line_handles(&self) -> &[Handle] {
        &self.line_handles
    }

    /// Replace the previous grid with one spun by `rotation_angle` radians
    pub fn draw(&mut self, scene: &mut Scene, rotation_angle: f32) {
        self.remove_all(scene);
        self.draw_meridians(scene, rotation_angle);
        self.draw_parallels(scene);
        log::trace!(
            "sphere grid redrawn at {:.3} rad with {} lines",
            rotation_angle,
            self.line_handles.len()
        );
    }

    /// Remove every line this grid emitted
    pub fn remove_all(&mut self, scene: &mut Scene) {
        for handle in self.line_handles.drain(..) {
            scene.remove_line(handle);
        }
    }

    /// World-space point at the given latitude/longitude (degrees) with the
    /// sphere spun by `rotation_angle` radians.
    ///
    /// Starts at `(radius, 0, 0)`, rotates by `-latitude` about Y, then by
    /// `longitude + rotation_angle` about Z, then applies the tilt.
    pub fn surface_point(&self, latitude_deg: f32, longitude_deg: f32, rotation_angle: f32) -> Result<Vertex> {
        if !(-90.0..=90.0).contains(&latitude_deg) {
            return Err(Lib3dError::InvalidLatitude(latitude_deg));
        }
        if !(-180.0..=180.0).contains(&longitude_deg) {
            return Err(Lib3dError::InvalidLongitude(longitude_deg));
        }
        let rot_lat = Transform::rotation_y(to_radians(-latitude_deg));
        let rot_lon = Transform::rotation_z(to_radians(longitude_deg) + rotation_angle);
        let m = self.tilt * rot_lon * rot_lat;
        Ok(Vertex::from_homogeneous(&matvec4(&m, &Vector4::new(self.radius, 0.0, 0.0, 1.0))))
    }

    fn segment_increment(&self) -> f32 {
        2.0 * PI / self.config.segments as f32
    }

    fn color_for(&self, degrees: f32) -> Color {
        if degrees == 0.0 {
            self.config.great_circle_color
        } else {
            self.config.line_color
        }
    }

    fn draw_meridians(&mut self, scene: &mut Scene, rotation_angle: f32) {
        let meridian_increment = 2.0 * PI / self.config.meridians as f32;
        let step = self.segment_increment();

        for j in 0..self.config.meridians / 2 {
            let plane_angle = j as f32 * meridian_increment;
            let m = self.tilt * Transform::rotation_z(plane_angle + rotation_angle);
            let color = self.color_for(to_degrees(plane_angle));
            let radius = self.radius;

            let points = (0..self.config.segments).map(|i| {
                let theta = i as f32 * step;
                let p = if i == 0 {
                    Vector4::new(radius, 0.0, 0.0, 1.0)
                } else {
                    Vector4::new(radius * theta.cos(), 0.0, radius * theta.sin(), 1.0)
                };
                Vertex::from_homogeneous(&matvec4(&m, &p))
            });
            let points: Vec<Vertex> = points.collect();
            self.emit_loop(scene, &points, color);
        }
    }

    fn draw_parallels(&mut self, scene: &mut Scene) {
        let step = self.segment_increment();

        for lat in self.config.parallels.clone() {
            let height = self.radius * to_radians(lat).sin();
            let circle_radius = self.radius * to_radians(lat).cos();
            let color = self.color_for(lat);

            let points: Vec<Vertex> = (0..self.config.segments)
                .map(|i| {
                    let theta = i as f32 * step;
                    let p = Vector4::new(
                        circle_radius * theta.sin(),
                        circle_radius * theta.cos(),
                        height,
                        1.0,
                    );
                    Vertex::from_homogeneous(&matvec4(&self.tilt, &p))
                })
                .collect();
            self.emit_loop(scene, &points, color);
        }
    }

    /// One segment per consecutive pair, closing back to the first point
    fn emit_loop(&mut self, scene: &mut Scene, points: &[Vertex], color: Color) {
        if points.len() < 2 {
            return;
        }
        for pair in points.windows(2) {
            self.line_handles.push(scene.add_line(Line::new(pair[0], pair[1], color)));
        }
        let last = points[points.len() - 1];
        self.line_handles.push(scene.add_line(Line::new(last, points[0], color)));
    }
}

/// Red/green/blue X/Y/Z axis segments from the origin
#[derive(Debug, Clone)]
pub struct OriginTriad {
    size: f32,
    line_handles: Vec<Handle>,
}

impl OriginTriad {
    pub fn new(scene: &mut Scene, size: f32) -> Self {
        let mut triad = Self {
            size,
            line_handles: Vec::with_capacity(3),
        };
        triad.draw(scene);
        triad
    }

    pub fn line_handles(&self) -> &[Handle] {
        &self.line_handles
    }

    pub fn draw(&mut self, scene: &mut Scene) {
        self.remove_all(scene);

        let s = self.size;
        for (tip, color) in [
            (Vertex::new(s, 0.0, 0.0), Color::RED),
            (Vertex::new(0.0, s, 0.0), Color::GREEN),
            (Vertex::new(0.0, 0.0, s), Color::BLUE),
        ] {
            self.line_handles.push(scene.add_line(Line::new(Vertex::ORIGIN, tip, color)));
        }
    }

    pub fn remove_all(&mut self, scene: &mut Scene) {
        for handle in self.line_handles.drain(..) {
            scene.remove_line(handle);
        }
    }
}
