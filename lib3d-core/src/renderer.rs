/// Renderer binding: the backend interface the draw path talks to
///
/// A backend compiles the two shader programs once, then per frame receives
/// flattened position/color buffers, the composed camera matrix and a draw
/// call per primitive kind.
use crate::error::{Lib3dError, Result};
use crate::geometry::Color;

pub const VERTEX_SHADER: &str = include_str!("shaders/vertex.glsl");
pub const FRAGMENT_SHADER: &str = include_str!("shaders/fragment.glsl");

pub const POSITION_ATTRIBUTE: &str = "a_position";
pub const COLOR_ATTRIBUTE: &str = "a_color";
pub const MATRIX_UNIFORM: &str = "u_matrix";

/// Opaque id of a compiled program, assigned by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Triangles,
    Lines,
}

impl PrimitiveKind {
    pub fn vertices_per_primitive(&self) -> usize {
        match self {
            PrimitiveKind::Triangles => 3,
            PrimitiveKind::Lines => 2,
        }
    }
}

/// Depth comparison a fragment must pass against the stored depth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthTest {
    Less,
    Greater,
}

impl DepthTest {
    pub fn passes(&self, incoming: f32, stored: f32) -> bool {
        match self {
            DepthTest::Less => incoming < stored,
            DepthTest::Greater => incoming > stored,
        }
    }
}

/// Per-frame clear and depth state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearState {
    pub color: Color,
    pub depth: f32,
    pub depth_test: DepthTest,
}

impl Default for ClearState {
    /// Reversed depth: near fragments carry larger depth, the buffer is
    /// cleared to -1 and a fragment is kept when its depth is greater.
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            depth: -1.0,
            depth_test: DepthTest::Greater,
        }
    }
}

pub trait RenderBackend {
    /// Compile and link a program. Fails with the backend's diagnostic log.
    fn compile_program(&mut self, vertex_src: &str, fragment_src: &str) -> Result<ProgramHandle>;

    /// Replace the contents of a per-vertex float attribute
    fn upload_buffer(&mut self, program: ProgramHandle, attribute: &str, data: &[f32]) -> Result<()>;

    /// Set a 4x4 column-major matrix uniform
    fn set_uniform_matrix(&mut self, program: ProgramHandle, name: &str, matrix: &[f32; 16]) -> Result<()>;

    fn draw_primitives(&mut self, program: ProgramHandle, kind: PrimitiveKind, vertex_count: usize) -> Result<()>;

    /// Clear color and depth over the backend's whole viewport
    fn clear(&mut self, state: &ClearState);
}

/// A call recorded by [`MockBackend`]
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Compile(ProgramHandle),
    Upload {
        program: ProgramHandle,
        attribute: String,
        data: Vec<f32>,
    },
    SetMatrix {
        program: ProgramHandle,
        name: String,
        matrix: [f32; 16],
    },
    Draw {
        program: ProgramHandle,
        kind: PrimitiveKind,
        vertex_count: usize,
    },
    Clear(ClearState),
}

/// Backend that records every call, for tests without a display
#[derive(Debug, Default)]
pub struct MockBackend {
    pub calls: Vec<BackendCall>,
    /// When set, `compile_program` fails with this log
    pub compile_error: Option<String>,
    programs: u32,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(log: &str) -> Self {
        Self {
            compile_error: Some(log.to_string()),
            ..Self::default()
        }
    }

    pub fn draws(&self) -> Vec<(PrimitiveKind, usize)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::Draw { kind, vertex_count, .. } => Some((*kind, *vertex_count)),
                _ => None,
            })
            .collect()
    }

    /// Most recent upload of `attribute` to `program`
    pub fn last_upload(&self, program: ProgramHandle, attribute: &str) -> Option<&[f32]> {
        self.calls.iter().rev().find_map(|call| match call {
            BackendCall::Upload {
                program: p,
                attribute: a,
                data,
            } if *p == program && a == attribute => Some(data.as_slice()),
            _ => None,
        })
    }

    fn check_program(&self, program: ProgramHandle) -> Result<()> {
        if program.0 >= self.programs {
            return Err(Lib3dError::UnknownProgram(program.0));
        }
        Ok(())
    }
}

impl RenderBackend for MockBackend {
    fn compile_program(&mut self, _vertex_src: &str, _fragment_src: &str) -> Result<ProgramHandle> {
        if let Some(log) = &self.compile_error {
            return Err(Lib3dError::ShaderCompilation(log.clone()));
        }
        let handle = ProgramHandle(self.programs);
        self.programs += 1;
        self.calls.push(BackendCall::Compile(handle));
        Ok(handle)
    }

    fn upload_buffer(&mut self, program: ProgramHandle, attribute: &str, data: &[f32]) -> Result<()> {
        self.check_program(program)?;
        self.calls.push(BackendCall::Upload {
            program,
            attribute: attribute.to_string(),
            data: data.to_vec(),
        });
        Ok(())
    }

    fn set_uniform_matrix(&mut self, program: ProgramHandle, name: &str, matrix: &[f32; 16]) -> Result<()> {
        self.check_program(program)?;
        self.calls.push(BackendCall::SetMatrix {
            program,
            name: name.to_string(),
            matrix: *matrix,
        });
        Ok(())
    }

    fn draw_primitives(&mut self, program: ProgramHandle, kind: PrimitiveKind, vertex_count: usize) -> Result<()> {
        self.check_program(program)?;
        self.calls.push(BackendCall::Draw {
            program,
            kind,
            vertex_count,
        });
        Ok(())
    }

    fn clear(&mut self, state: &ClearState) {
        self.calls.push(BackendCall::Clear(*state));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reversed_depth_defaults() {
        let state = ClearState::default();
        assert_eq!(state.depth, -1.0);
        assert_eq!(state.depth_test, DepthTest::Greater);
        // anything in the NDC range beats the cleared value
        assert!(state.depth_test.passes(-0.99, state.depth));
        assert!(!state.depth_test.passes(-1.0, state.depth));
    }

    #[test]
    fn test_shaders_declare_binding_names() {
        for name in [POSITION_ATTRIBUTE, COLOR_ATTRIBUTE, MATRIX_UNIFORM] {
            assert!(VERTEX_SHADER.contains(name), "vertex shader lacks {}", name);
        }
        assert!(FRAGMENT_SHADER.contains("gl_FragColor"));
    }

    #[test]
    fn test_mock_rejects_unknown_program() {
        let mut backend = MockBackend::new();
        assert_eq!(
            backend.draw_primitives(ProgramHandle(0), PrimitiveKind::Lines, 2),
            Err(Lib3dError::UnknownProgram(0))
        );
        let p = backend.compile_program(VERTEX_SHADER, FRAGMENT_SHADER).unwrap();
        assert!(backend.draw_primitives(p, PrimitiveKind::Lines, 2).is_ok());
        assert_eq!(backend.draws(), vec![(PrimitiveKind::Lines, 2)]);
    }
}
