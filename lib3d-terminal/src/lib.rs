/// Terminal front end: an ASCII render backend and a frame loop that drives
/// the example scenes
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self},
};
use lib3d_core::{CameraParameters, Lib3d, Lib3dError, RenderBackend};
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};

pub mod cli;
pub mod renderer;
pub mod sphere;
pub mod triangles;

pub use cli::Args;
pub use renderer::AsciiRenderer;
pub use sphere::{CameraMode, GyroAxisOrientation, SphereDemo, SphereOptions};
pub use triangles::TrianglesDemo;

/// A scene driven by the frame loop.
///
/// Per frame the loop calls `tick` (unless paused), then `update_scene`,
/// then draws. Scene rebuilding must finish before the draw.
pub trait Demo {
    fn title(&self) -> &str;

    /// Advance the animation to clock time `now`, measured from app start
    fn tick(&mut self, now: Duration);

    /// Rebuild camera and geometry from the current state
    fn update_scene<B: RenderBackend>(&mut self, lib3d: &mut Lib3d<B>) -> lib3d_core::Result<()>;

    /// Returns true if the key was consumed
    fn handle_key(&mut self, _key: KeyCode) -> bool {
        false
    }

    fn set_paused(&mut self, _paused: bool) {}

    fn status(&self) -> String {
        String::new()
    }
}

/// Frame loop settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppConfig {
    pub target_fps: u32,
    pub start_paused: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            target_fps: 30,
            start_paused: false,
        }
    }
}

/// Camera viewport width for a viewport height of 1, so that shapes stay
/// round on character cells roughly twice as tall as they are wide
pub fn cell_aspect(columns: u16, rows: u16) -> f32 {
    if rows == 0 {
        return 1.0;
    }
    columns as f32 / (2.0 * rows as f32)
}

/// Camera parameters for a resized terminal; `None` for an empty grid, which
/// has no aspect to follow
pub fn resized_parameters(current: &CameraParameters, columns: u16, rows: u16) -> Option<CameraParameters> {
    if columns == 0 || rows == 0 {
        return None;
    }
    Some(CameraParameters {
        width: current.height * cell_aspect(columns, rows),
        ..*current
    })
}

pub fn to_io_error(err: Lib3dError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err)
}

/// Main application struct for terminal 3D rendering
pub struct TerminalApp<D: Demo> {
    lib3d: Lib3d<AsciiRenderer>,
    demo: D,
    config: AppConfig,
    running: bool,
    paused: bool,
    started: Instant,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl<D: Demo> TerminalApp<D> {
    /// `build` receives a renderer sized to the terminal and the cell aspect
    pub fn new<F>(config: AppConfig, build: F) -> io::Result<Self>
    where
        F: FnOnce(AsciiRenderer, f32) -> lib3d_core::Result<(Lib3d<AsciiRenderer>, D)>,
    {
        let (width, height) = terminal::size()?;
        let renderer = AsciiRenderer::new(width as usize, height as usize);
        let (lib3d, mut demo) = build(renderer, cell_aspect(width, height)).map_err(to_io_error)?;
        demo.set_paused(config.start_paused);
        log::info!("{} started on a {}x{} terminal", demo.title(), width, height);

        Ok(Self {
            lib3d,
            demo,
            config,
            running: true,
            paused: config.start_paused,
            started: Instant::now(),
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        if let Err(err) = &result {
            log::error!("frame loop stopped: {}", err);
        }
        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / self.config.target_fps.max(1) as u64);

        while self.running {
            let frame_start = Instant::now();

            // Handle input
            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?)?;
            }

            // Update
            if !self.paused {
                self.demo.tick(self.started.elapsed());
            }
            self.demo.update_scene(&mut self.lib3d).map_err(to_io_error)?;

            // Render
            self.lib3d.draw().map_err(to_io_error)?;
            self.present()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) -> io::Result<()> {
        match event {
            Event::Key(KeyEvent { code, kind, .. }) if kind != KeyEventKind::Release => {
                if self.demo.handle_key(code) {
                    return Ok(());
                }
                match code {
                    KeyCode::Char('q') | KeyCode::Esc => {
                        self.running = false;
                    }
                    KeyCode::Char(' ') => {
                        self.paused = !self.paused;
                        self.demo.set_paused(self.paused);
                        log::debug!("animation {}", if self.paused { "paused" } else { "resumed" });
                    }
                    _ => {}
                }
            }
            Event::Resize(width, height) => self.resize(width, height)?,
            _ => {}
        }
        Ok(())
    }

    fn resize(&mut self, width: u16, height: u16) -> io::Result<()> {
        self.lib3d.backend_mut().resize(width as usize, height as usize);
        let Some(parameters) = resized_parameters(self.lib3d.camera().parameters(), width, height) else {
            return Ok(());
        };
        self.lib3d.set_camera_parameters(parameters).map_err(to_io_error)
    }

    fn present(&mut self) -> io::Result<()> {
        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;

        self.lib3d.backend().present(&mut stdout)?;

        // Draw UI overlay
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "{} | FPS: {:.1} | {} | Space={} Q=Quit",
                self.demo.title(),
                self.fps,
                self.demo.status(),
                if self.paused { "Start" } else { "Stop" }
            )),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_aspect() {
        assert_eq!(cell_aspect(80, 40), 1.0);
        assert_eq!(cell_aspect(120, 30), 2.0);
        assert_eq!(cell_aspect(10, 0), 1.0);
    }

    #[test]
    fn test_resize_to_empty_grid_keeps_camera() {
        let current = CameraParameters::default();
        assert_eq!(resized_parameters(&current, 0, 40), None);
        assert_eq!(resized_parameters(&current, 80, 0), None);

        let resized = resized_parameters(&current, 120, 30).unwrap();
        assert_eq!(resized.width, 2.0);
        assert_eq!(resized.height, current.height);
        assert!(lib3d_core::Camera::new(resized, lib3d_core::Camera::DEFAULT_POSITION, Default::default()).is_ok());
    }

    #[test]
    fn test_io_error_keeps_message() {
        let err = to_io_error(Lib3dError::InvalidLatitude(95.0));
        assert!(err.to_string().contains("invalid latitude"));
    }
}
