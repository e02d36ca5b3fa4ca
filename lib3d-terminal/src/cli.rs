/// Command-line arguments of the sphere binary
use clap::Parser;

use crate::sphere::{CameraMode, GyroAxisOrientation, SphereOptions, MAX_INTERACTIVE_LATITUDE};
use crate::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "lib3d-terminal", about = "Spinning sphere with a gyroscope axis, drawn in the terminal")]
pub struct Args {
    /// Target frame rate
    #[arg(long, default_value_t = AppConfig::default().target_fps)]
    pub fps: u32,

    /// Start with the spin stopped
    #[arg(long)]
    pub paused: bool,

    /// Gyroscope latitude in degrees
    #[arg(long, default_value_t = 45.0, value_parser = parse_latitude, allow_negative_numbers = true)]
    pub latitude: f32,

    /// Put the camera above the gyroscope, spinning with the sphere
    #[arg(long, conflicts_with = "camera")]
    pub overhead: bool,

    /// Static camera latitude and rotation in degrees
    #[arg(long, value_name = "LAT,ROT", value_parser = parse_camera, allow_hyphen_values = true)]
    pub camera: Option<(f32, f32)>,

    /// Draw the gyroscope axis tangent to the surface
    #[arg(long)]
    pub horizontal: bool,
}

impl Args {
    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            target_fps: self.fps,
            start_paused: self.paused,
        }
    }

    pub fn sphere_options(&self) -> SphereOptions {
        let defaults = SphereOptions::default();
        let camera_mode = match (self.overhead, self.camera) {
            (true, _) => CameraMode::Overhead,
            (false, Some((latitude_deg, rotation_deg))) => CameraMode::Static {
                latitude_deg,
                rotation_deg,
            },
            (false, None) => defaults.camera_mode,
        };
        SphereOptions {
            latitude_deg: self.latitude,
            camera_mode,
            gyro_axis: if self.horizontal {
                GyroAxisOrientation::Horizontal
            } else {
                GyroAxisOrientation::Vertical
            },
        }
    }
}

fn parse_degrees(value: &str, limit: f32) -> Result<f32, String> {
    let degrees: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("not a number: {}", value))?;
    if !(-limit..=limit).contains(&degrees) {
        return Err(format!("{} is outside ±{}°", degrees, limit));
    }
    Ok(degrees)
}

fn parse_latitude(value: &str) -> Result<f32, String> {
    parse_degrees(value, MAX_INTERACTIVE_LATITUDE)
}

fn parse_camera(value: &str) -> Result<(f32, f32), String> {
    let (latitude, rotation) = value
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,ROT, got {}", value))?;
    Ok((parse_latitude(latitude)?, parse_degrees(rotation, 360.0)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["lib3d-terminal"]).unwrap();
        assert_eq!(args.app_config(), AppConfig::default());
        assert_eq!(args.sphere_options(), SphereOptions::default());
    }

    #[test]
    fn test_flags_map_to_options() {
        let args = Args::try_parse_from([
            "lib3d-terminal",
            "--fps",
            "60",
            "--paused",
            "--latitude",
            "30",
            "--overhead",
            "--horizontal",
        ])
        .unwrap();
        assert_eq!(
            args.app_config(),
            AppConfig {
                target_fps: 60,
                start_paused: true
            }
        );
        let options = args.sphere_options();
        assert_eq!(options.latitude_deg, 30.0);
        assert_eq!(options.camera_mode, CameraMode::Overhead);
        assert_eq!(options.gyro_axis, GyroAxisOrientation::Horizontal);
    }

    #[test]
    fn test_camera_pair() {
        let args = Args::try_parse_from(["lib3d-terminal", "--camera", "-10,200"]).unwrap();
        assert_eq!(
            args.sphere_options().camera_mode,
            CameraMode::Static {
                latitude_deg: -10.0,
                rotation_deg: 200.0
            }
        );
        assert!(Args::try_parse_from(["lib3d-terminal", "--camera", "10"]).is_err());
        assert!(Args::try_parse_from(["lib3d-terminal", "--camera", "10,400"]).is_err());
        assert!(Args::try_parse_from(["lib3d-terminal", "--camera", "10,20", "--overhead"]).is_err());
    }

    #[test]
    fn test_rejects_bad_latitude_and_unknown_flags() {
        assert!(Args::try_parse_from(["lib3d-terminal", "--latitude", "95"]).is_err());
        assert!(Args::try_parse_from(["lib3d-terminal", "--latitude", "-85"]).is_ok());
        assert!(Args::try_parse_from(["lib3d-terminal", "--latitude"]).is_err());
        assert!(Args::try_parse_from(["lib3d-terminal", "--spin"]).is_err());
    }
}
