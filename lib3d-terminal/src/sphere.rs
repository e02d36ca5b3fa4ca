/// Spinning sphere with a gyroscope axis drawn at a chosen latitude
///
/// State is a handful of explicit inputs. The camera position and gyro axis
/// are derived from them every frame instead of being pushed around by
/// change callbacks.
use crossterm::event::KeyCode;
use lib3d_core::math::{cross, to_degrees, to_radians};
use lib3d_core::{
    Camera, CameraOrientation, CameraParameters, Color, Handle, Lib3d, Line, OriginTriad,
    RenderBackend, Result, SphereGrid, Vertex,
};
use std::f32::consts::PI;
use std::time::Duration;

use crate::Demo;

pub const SPHERE_RADIUS: f32 = 1.0;
pub const ORIGIN_SIZE: f32 = 0.5;
pub const FOCAL_LENGTH: f32 = 1.5;
/// Camera distance from the centre, in sphere radii
pub const VIEWING_HEIGHT: f32 = 4.0;
/// The camera always sits over this meridian
pub const CAMERA_LONGITUDE_DEG: f32 = 0.0;
pub const GYRO_AXIS_LINE_LENGTH: f32 = 0.25;
pub const TIME_PER_REVOLUTION: Duration = Duration::from_millis(24_000);

/// Largest latitude reachable from the keyboard; the pole itself would put
/// an overhead camera on the world-up axis
pub const MAX_INTERACTIVE_LATITUDE: f32 = 85.0;
const LATITUDE_STEP: f32 = 5.0;
const ROTATION_STEP_DEG: f32 = 5.0;

fn gyro_color_inner() -> Color {
    Color::from_rgb8(235, 139, 14)
}

fn gyro_color_outer() -> Color {
    Color::from_rgb8(153, 16, 227)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraMode {
    /// Fixed in space; does not follow the spin
    Static { latitude_deg: f32, rotation_deg: f32 },
    /// Above the gyroscope latitude, spinning with the sphere
    Overhead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GyroAxisOrientation {
    /// Along the surface normal
    Vertical,
    /// Tangent to the surface, pointing north
    Horizontal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SphereOptions {
    pub latitude_deg: f32,
    pub camera_mode: CameraMode,
    pub gyro_axis: GyroAxisOrientation,
}

impl Default for SphereOptions {
    fn default() -> Self {
        Self {
            latitude_deg: 45.0,
            camera_mode: CameraMode::Static {
                latitude_deg: 45.0,
                rotation_deg: 50.0,
            },
            gyro_axis: GyroAxisOrientation::Vertical,
        }
    }
}

/// Spin angle as a 24-hour clock reading, one revolution per day
pub fn rotation_to_hours(rotation_angle: f32) -> String {
    let minutes_total = (12.0 * 60.0 / PI) * rotation_angle;
    let mut hours = (minutes_total / 60.0).floor() as i32;
    let mut minutes = (minutes_total - hours as f32 * 60.0).round() as i32;
    if minutes == 60 {
        hours += 1;
        minutes = 0;
    }
    format!("{:02}:{:02}", hours, minutes)
}

pub struct SphereDemo {
    sphere: SphereGrid,
    // Emitted once; kept so the triad stays owned alongside the grid
    _origin: OriginTriad,
    options: SphereOptions,
    rotation_angle: f32,
    animation_offset: Option<Duration>,
    gyro_handles: Vec<Handle>,
}

impl SphereDemo {
    pub fn create<B: RenderBackend>(
        backend: B,
        aspect: f32,
        options: SphereOptions,
    ) -> Result<(Lib3d<B>, Self)> {
        let parameters = CameraParameters {
            f: FOCAL_LENGTH,
            width: aspect,
            height: 1.0,
            zfar: 100.0,
            znear: 0.1,
        };
        let mut lib3d = Lib3d::new(
            backend,
            parameters,
            Camera::DEFAULT_POSITION,
            CameraOrientation::default(),
        )?;
        let sphere = SphereGrid::new(lib3d.scene_mut(), SPHERE_RADIUS);
        let origin = OriginTriad::new(lib3d.scene_mut(), ORIGIN_SIZE);

        let mut demo = Self {
            sphere,
            _origin: origin,
            options,
            rotation_angle: 0.0,
            animation_offset: None,
            gyro_handles: Vec::new(),
        };
        demo.update_scene(&mut lib3d)?;
        Ok((lib3d, demo))
    }

    pub fn options(&self) -> &SphereOptions {
        &self.options
    }

    pub fn rotation_angle(&self) -> f32 {
        self.rotation_angle
    }

    pub fn set_rotation_angle(&mut self, angle: f32) {
        self.rotation_angle = angle.rem_euclid(2.0 * PI);
    }

    /// Where the camera sits for the current mode and spin
    pub fn camera_position(&self) -> Result<Vertex> {
        let surface_point = match self.options.camera_mode {
            CameraMode::Static {
                latitude_deg,
                rotation_deg,
            } => self
                .sphere
                .surface_point(latitude_deg, CAMERA_LONGITUDE_DEG, to_radians(rotation_deg))?,
            CameraMode::Overhead => self.sphere.surface_point(
                self.options.latitude_deg,
                CAMERA_LONGITUDE_DEG,
                self.rotation_angle,
            )?,
        };
        Ok(surface_point.scale(VIEWING_HEIGHT))
    }

    /// Unit gyroscope axis for the selected latitude, in the unspun frame
    pub fn gyro_axis(&self) -> Result<Vertex> {
        let normal = self
            .sphere
            .surface_point(self.options.latitude_deg, CAMERA_LONGITUDE_DEG, 0.0)?;
        Ok(match self.options.gyro_axis {
            GyroAxisOrientation::Vertical => normal,
            GyroAxisOrientation::Horizontal => cross(&Vertex::new(0.0, 1.0, 0.0).into(), &normal.into()).into(),
        })
    }

    fn draw_gyro_axis<B: RenderBackend>(&mut self, lib3d: &mut Lib3d<B>) -> Result<()> {
        let surface_point = self.sphere.surface_point(
            self.options.latitude_deg,
            CAMERA_LONGITUDE_DEG,
            self.rotation_angle,
        )?;
        let offset = self.gyro_axis()?.scale(GYRO_AXIS_LINE_LENGTH);

        self.gyro_handles.push(lib3d.add_line(Line::new(
            surface_point - offset,
            surface_point,
            gyro_color_inner(),
        )));
        self.gyro_handles.push(lib3d.add_line(Line::new(
            surface_point,
            surface_point + offset,
            gyro_color_outer(),
        )));
        Ok(())
    }

    fn remove_gyro_axis<B: RenderBackend>(&mut self, lib3d: &mut Lib3d<B>) {
        for handle in self.gyro_handles.drain(..) {
            lib3d.remove_line(handle);
        }
    }

    fn adjust_latitude(&mut self, delta: f32) {
        self.options.latitude_deg = (self.options.latitude_deg + delta)
            .clamp(-MAX_INTERACTIVE_LATITUDE, MAX_INTERACTIVE_LATITUDE);
    }

    fn adjust_static_camera(&mut self, delta_latitude: f32, delta_rotation: f32) {
        if let CameraMode::Static {
            latitude_deg,
            rotation_deg,
        } = &mut self.options.camera_mode
        {
            *latitude_deg = (*latitude_deg + delta_latitude)
                .clamp(-MAX_INTERACTIVE_LATITUDE, MAX_INTERACTIVE_LATITUDE);
            *rotation_deg = (*rotation_deg + delta_rotation).rem_euclid(360.0);
        }
    }
}

impl Demo for SphereDemo {
    fn title(&self) -> &str {
        "Lib3d Sphere"
    }

    fn tick(&mut self, now: Duration) {
        let offset = *self.animation_offset.get_or_insert(now);
        let radians_per_ms = 2.0 * PI / TIME_PER_REVOLUTION.as_millis() as f32;
        let elapsed_ms = now.saturating_sub(offset).as_secs_f32() * 1000.0;
        self.set_rotation_angle(elapsed_ms * radians_per_ms);
    }

    fn update_scene<B: RenderBackend>(&mut self, lib3d: &mut Lib3d<B>) -> Result<()> {
        self.remove_gyro_axis(lib3d);
        lib3d.set_camera_position(self.camera_position()?);
        lib3d.look_at(Vertex::ORIGIN)?;
        self.sphere.draw(lib3d.scene_mut(), self.rotation_angle);
        self.draw_gyro_axis(lib3d)
    }

    fn handle_key(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Up => self.adjust_latitude(LATITUDE_STEP),
            KeyCode::Down => self.adjust_latitude(-LATITUDE_STEP),
            KeyCode::Left if self.animation_offset.is_none() => {
                self.set_rotation_angle(self.rotation_angle - to_radians(ROTATION_STEP_DEG))
            }
            KeyCode::Right if self.animation_offset.is_none() => {
                self.set_rotation_angle(self.rotation_angle + to_radians(ROTATION_STEP_DEG))
            }
            KeyCode::PageUp => self.adjust_static_camera(LATITUDE_STEP, 0.0),
            KeyCode::PageDown => self.adjust_static_camera(-LATITUDE_STEP, 0.0),
            KeyCode::Char('[') => self.adjust_static_camera(0.0, -ROTATION_STEP_DEG),
            KeyCode::Char(']') => self.adjust_static_camera(0.0, ROTATION_STEP_DEG),
            KeyCode::Char('c') => {
                self.options.camera_mode = match self.options.camera_mode {
                    CameraMode::Static { .. } => CameraMode::Overhead,
                    CameraMode::Overhead => SphereOptions::default().camera_mode,
                }
            }
            KeyCode::Char('g') => {
                self.options.gyro_axis = match self.options.gyro_axis {
                    GyroAxisOrientation::Vertical => GyroAxisOrientation::Horizontal,
                    GyroAxisOrientation::Horizontal => GyroAxisOrientation::Vertical,
                }
            }
            _ => return false,
        }
        true
    }

    /// Stopping rewinds the spin; the next tick after resuming restarts the
    /// clock from zero
    fn set_paused(&mut self, paused: bool) {
        if paused {
            self.rotation_angle = 0.0;
        }
        self.animation_offset = None;
    }

    fn status(&self) -> String {
        let camera = match self.options.camera_mode {
            CameraMode::Static { .. } => "static",
            CameraMode::Overhead => "overhead",
        };
        let gyro = match self.options.gyro_axis {
            GyroAxisOrientation::Vertical => "vertical",
            GyroAxisOrientation::Horizontal => "horizontal",
        };
        format!(
            "lat {:.0}° | {:03.0}° {} | camera {} (C) | gyro {} (G)",
            self.options.latitude_deg,
            to_degrees(self.rotation_angle),
            rotation_to_hours(self.rotation_angle),
            camera,
            gyro
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib3d_core::MockBackend;

    fn demo(options: SphereOptions) -> (Lib3d<MockBackend>, SphereDemo) {
        SphereDemo::create(MockBackend::new(), 1.0, options).unwrap()
    }

    #[test]
    fn test_rotation_to_hours() {
        assert_eq!(rotation_to_hours(0.0), "00:00");
        assert_eq!(rotation_to_hours(PI), "12:00");
        assert_eq!(rotation_to_hours(PI / 2.0), "06:00");
        assert_eq!(rotation_to_hours(PI / 12.0 * 0.5), "00:30");
    }

    #[test]
    fn test_static_camera_ignores_spin() {
        let (_, mut demo) = demo(SphereOptions::default());
        let before = demo.camera_position().unwrap();
        demo.set_rotation_angle(1.0);
        assert_eq!(demo.camera_position().unwrap(), before);
        assert!((before.length() - VIEWING_HEIGHT).abs() < 1e-4);
    }

    #[test]
    fn test_overhead_camera_follows_spin() {
        let options = SphereOptions {
            camera_mode: CameraMode::Overhead,
            ..SphereOptions::default()
        };
        let (_, mut demo) = demo(options);
        let before = demo.camera_position().unwrap();
        demo.set_rotation_angle(1.0);
        assert_ne!(demo.camera_position().unwrap(), before);
    }

    #[test]
    fn test_gyro_axis_orientations() {
        let (_, mut demo) = demo(SphereOptions::default());
        let vertical = demo.gyro_axis().unwrap();
        assert!((vertical.length() - 1.0).abs() < 1e-5);

        demo.handle_key(KeyCode::Char('g'));
        let horizontal = demo.gyro_axis().unwrap();
        let dot = vertical.x * horizontal.x + vertical.y * horizontal.y + vertical.z * horizontal.z;
        assert!(dot.abs() < 1e-5);
    }

    #[test]
    fn test_update_scene_replaces_gyro_lines() {
        let (mut lib3d, mut demo) = demo(SphereOptions::default());
        let lines = lib3d.scene().line_count();

        demo.tick(Duration::from_millis(0));
        demo.tick(Duration::from_millis(6_000));
        assert!((demo.rotation_angle() - PI / 2.0).abs() < 1e-4);

        demo.update_scene(&mut lib3d).unwrap();
        assert_eq!(lib3d.scene().line_count(), lines);
        lib3d.draw().unwrap();
    }

    #[test]
    fn test_pause_rewinds_and_allows_manual_rotation() {
        let (_, mut demo) = demo(SphereOptions::default());
        demo.tick(Duration::from_secs(1));
        demo.tick(Duration::from_secs(3));
        assert!(demo.rotation_angle() > 0.0);

        demo.set_paused(true);
        assert_eq!(demo.rotation_angle(), 0.0);
        assert!(demo.handle_key(KeyCode::Right));
        assert!((to_degrees(demo.rotation_angle()) - ROTATION_STEP_DEG).abs() < 1e-3);
    }

    #[test]
    fn test_latitude_keys_stay_off_the_pole() {
        let options = SphereOptions {
            camera_mode: CameraMode::Overhead,
            ..SphereOptions::default()
        };
        let (mut lib3d, mut demo) = demo(options);
        for _ in 0..30 {
            demo.handle_key(KeyCode::Up);
        }
        assert_eq!(demo.options().latitude_deg, MAX_INTERACTIVE_LATITUDE);
        assert!(demo.update_scene(&mut lib3d).is_ok());
    }
}
