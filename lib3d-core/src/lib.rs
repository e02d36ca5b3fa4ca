/// Lib3d Core Library - camera math, scene registry and line geometry
///
/// This library projects triangles and lines through a perspective camera
/// and hands flattened attribute buffers to a pluggable render backend.

pub mod context;
pub mod error;
pub mod geometry;
pub mod math;
pub mod primitives;
pub mod projection;
pub mod renderer;
pub mod scene;
pub mod transform;

// Re-export commonly used types
pub use context::Lib3d;
pub use error::{Lib3dError, Result};
pub use geometry::{Color, Handle, Line, Triangle, Vertex};
pub use primitives::{OriginTriad, SphereConfig, SphereGrid};
pub use projection::{Camera, CameraOrientation, CameraParameters, WORLD_UP};
pub use renderer::{ClearState, DepthTest, MockBackend, PrimitiveKind, ProgramHandle, RenderBackend};
pub use scene::{AttributeBuffers, Scene};
pub use transform::Transform;
