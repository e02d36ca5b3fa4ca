/// Lib3d Terminal Demo - Spinning Sphere
///
/// A wire-frame sphere with a gyroscope axis at a chosen latitude.
/// Controls:
///   - Space: Stop / start the spin
///   - Up/Down: Gyroscope latitude
///   - Left/Right: Turn the sphere while stopped
///   - C: Static / overhead camera
///   - G: Vertical / horizontal gyroscope
///   - PageUp/PageDown, [ and ]: Move the static camera
///   - Q/ESC: Quit
///
/// Run with `--help` for the command-line options.
use clap::Parser;
use env_logger::Env;
use lib3d_terminal::{Args, SphereDemo, TerminalApp};
use std::io;

fn main() -> io::Result<()> {
    // Silent unless RUST_LOG is set
    env_logger::Builder::from_env(Env::default().default_filter_or("off")).init();

    let args = Args::parse();
    let config = args.app_config();
    let options = args.sphere_options();
    log::debug!("starting with {:?} {:?}", config, options);

    let mut app = TerminalApp::new(config, |renderer, aspect| {
        SphereDemo::create(renderer, aspect, options)
    })?;
    app.run()
}
