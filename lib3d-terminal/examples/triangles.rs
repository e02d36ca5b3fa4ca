/// Example: Four triangles and an axis triad seen from an orbiting camera
///
/// Usage: cargo run --example triangles
use env_logger::Env;
use lib3d_terminal::{AppConfig, TerminalApp, TrianglesDemo};
use std::io;

fn main() -> io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("off")).init();

    let mut app = TerminalApp::new(AppConfig::default(), TrianglesDemo::create)?;
    app.run()
}
