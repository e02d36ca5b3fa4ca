/// Error types for scene construction, camera updates and geometry generation

/// Result type for lib3d operations
pub type Result<T> = std::result::Result<T, Lib3dError>;

/// Errors raised by the core library.
///
/// Apart from the backend variants, every error here is a precondition
/// violation by the caller. Nothing is clamped or retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Lib3dError {
    #[error("invalid latitude: {0}°")]
    InvalidLatitude(f32),

    #[error("invalid longitude: {0}°")]
    InvalidLongitude(f32),

    #[error("invalid camera parameters: {0}")]
    InvalidCameraParameters(String),

    #[error("degenerate camera orientation: {0}")]
    DegenerateOrientation(String),

    #[error("failed to compile shader: {0}")]
    ShaderCompilation(String),

    #[error("failed to link program: {0}")]
    ProgramLink(String),

    #[error("unknown program handle: {0}")]
    UnknownProgram(u32),

    #[error("backend error: {0}")]
    Backend(String),
}
