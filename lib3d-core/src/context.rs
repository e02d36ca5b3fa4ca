/// Draw orchestration: owns the camera, the scene and a backend, and issues
/// one frame's worth of backend calls per `draw`
use crate::error::Result;
use crate::geometry::{Handle, Line, Triangle, Vertex};
use crate::math::{format_element_buffer, format_mat4};
use crate::projection::{Camera, CameraOrientation, CameraParameters};
use crate::renderer::{
    ClearState, PrimitiveKind, ProgramHandle, RenderBackend, COLOR_ATTRIBUTE, FRAGMENT_SHADER,
    MATRIX_UNIFORM, POSITION_ATTRIBUTE, VERTEX_SHADER,
};
use crate::scene::{AttributeBuffers, Scene, COMPONENTS_PER_VERTEX};

pub struct Lib3d<B: RenderBackend> {
    backend: B,
    camera: Camera,
    scene: Scene,
    clear_state: ClearState,
    triangle_program: ProgramHandle,
    line_program: ProgramHandle,
    triangle_buffers: AttributeBuffers,
    line_buffers: AttributeBuffers,
    flattened_generation: Option<u64>,
}

impl<B: RenderBackend> Lib3d<B> {
    pub fn new(
        backend: B,
        parameters: CameraParameters,
        position: Vertex,
        orientation: CameraOrientation,
    ) -> Result<Self> {
        let camera = Camera::new(parameters, position, orientation)?;
        Self::with_camera(backend, camera)
    }

    /// Compile the triangle and line programs. A compile or link failure
    /// aborts construction.
    pub fn with_camera(mut backend: B, camera: Camera) -> Result<Self> {
        let triangle_program = backend.compile_program(VERTEX_SHADER, FRAGMENT_SHADER)?;
        let line_program = backend.compile_program(VERTEX_SHADER, FRAGMENT_SHADER)?;
        log::info!("lib3d initialized");
        log::debug!("projection matrix:\n{}", format_mat4(camera.projection_matrix()));

        Ok(Self {
            backend,
            camera,
            scene: Scene::new(),
            clear_state: ClearState::default(),
            triangle_program,
            line_program,
            triangle_buffers: AttributeBuffers::default(),
            line_buffers: AttributeBuffers::default(),
            flattened_generation: None,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn clear_state(&self) -> &ClearState {
        &self.clear_state
    }

    pub fn set_clear_state(&mut self, state: ClearState) {
        self.clear_state = state;
    }

    pub fn add_triangle(&mut self, triangle: Triangle) -> Handle {
        self.scene.add_triangle(triangle)
    }

    pub fn remove_triangle(&mut self, handle: Handle) {
        self.scene.remove_triangle(handle)
    }

    pub fn add_line(&mut self, line: Line) -> Handle {
        self.scene.add_line(line)
    }

    pub fn remove_line(&mut self, handle: Handle) {
        self.scene.remove_line(handle)
    }

    pub fn reset(&mut self) {
        self.scene.reset()
    }

    pub fn set_camera_position(&mut self, position: Vertex) {
        self.camera.set_position(position)
    }

    pub fn set_camera_orientation(&mut self, orientation: CameraOrientation) -> Result<()> {
        self.camera.set_orientation(orientation)
    }

    pub fn set_camera_parameters(&mut self, parameters: CameraParameters) -> Result<()> {
        self.camera.set_parameters(parameters)
    }

    pub fn look_at(&mut self, target: Vertex) -> Result<()> {
        self.camera.look_at(target)
    }

    /// Draw the current scene: clear, then triangles, then lines, all with
    /// the freshly recomputed composed matrix.
    pub fn draw(&mut self) -> Result<()> {
        self.refresh_buffers();
        self.backend.clear(&self.clear_state);
        self.camera.recompute();

        let mut matrix = [0.0f32; 16];
        matrix.copy_from_slice(self.camera.composed_matrix().as_slice());

        draw_batch(
            &mut self.backend,
            self.triangle_program,
            &self.triangle_buffers,
            PrimitiveKind::Triangles,
            &matrix,
        )?;
        draw_batch(
            &mut self.backend,
            self.line_program,
            &self.line_buffers,
            PrimitiveKind::Lines,
            &matrix,
        )?;
        log::trace!(
            "drew {} triangles and {} lines",
            self.scene.triangle_count(),
            self.scene.line_count()
        );
        Ok(())
    }

    fn refresh_buffers(&mut self) {
        let generation = self.scene.generation();
        if self.flattened_generation == Some(generation) {
            return;
        }
        self.triangle_buffers = self.scene.flatten_triangles();
        self.line_buffers = self.scene.flatten_lines();
        self.flattened_generation = Some(generation);
        if log::log_enabled!(log::Level::Trace) {
            if let Some(text) = format_element_buffer(
                &self.triangle_buffers.positions,
                COMPONENTS_PER_VERTEX,
                PrimitiveKind::Triangles.vertices_per_primitive(),
            ) {
                log::trace!("triangle positions:\n{}", text);
            }
        }
        log::debug!(
            "flattened generation {}: {} triangle and {} line vertices",
            generation,
            self.triangle_buffers.vertex_count(),
            self.line_buffers.vertex_count()
        );
    }
}

fn draw_batch<B: RenderBackend>(
    backend: &mut B,
    program: ProgramHandle,
    buffers: &AttributeBuffers,
    kind: PrimitiveKind,
    matrix: &[f32; 16],
) -> Result<()> {
    backend.set_uniform_matrix(program, MATRIX_UNIFORM, matrix)?;
    backend.upload_buffer(program, POSITION_ATTRIBUTE, &buffers.positions)?;
    backend.upload_buffer(program, COLOR_ATTRIBUTE, &buffers.colors)?;
    backend.draw_primitives(program, kind, buffers.vertex_count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Lib3dError;
    use crate::geometry::Color;
    use crate::renderer::{BackendCall, MockBackend};

    fn lib3d() -> Lib3d<MockBackend> {
        Lib3d::with_camera(MockBackend::new(), Camera::default()).unwrap()
    }

    #[test]
    fn test_compile_failure_is_fatal() {
        let result = Lib3d::with_camera(MockBackend::failing("ERROR: 0:3: 'u_matrx' : undeclared"), Camera::default());
        match result {
            Err(Lib3dError::ShaderCompilation(log)) => assert!(log.contains("undeclared")),
            _ => panic!("expected a shader compilation error"),
        }
    }

    #[test]
    fn test_draw_call_order() {
        let mut lib3d = lib3d();
        lib3d.add_triangle(Triangle::new(
            Vertex::new(1.0, 1.0, -1.0),
            Vertex::new(1.0, 0.0, -1.0),
            Vertex::new(0.0, 1.0, -1.0),
            Color::RED,
        ));
        lib3d.add_line(Line::new(Vertex::ORIGIN, Vertex::new(1.0, 0.0, 0.0), Color::RED));
        lib3d.backend_mut().calls.clear();

        lib3d.draw().unwrap();

        let calls = &lib3d.backend().calls;
        assert!(matches!(calls[0], BackendCall::Clear(_)));
        assert_eq!(
            lib3d.backend().draws(),
            vec![(PrimitiveKind::Triangles, 3), (PrimitiveKind::Lines, 2)]
        );
        let matrix = calls.iter().find_map(|c| match c {
            BackendCall::SetMatrix { matrix, .. } => Some(*matrix),
            _ => None,
        });
        assert_eq!(matrix.unwrap().as_slice(), lib3d.camera().composed_matrix().as_slice());
    }

    #[test]
    fn test_draw_reflects_registry_changes() {
        let mut lib3d = lib3d();
        let h = lib3d.add_line(Line::new(Vertex::ORIGIN, Vertex::new(0.0, 1.0, 0.0), Color::GREEN));
        lib3d.draw().unwrap();
        let line_program = lib3d.line_program;
        assert_eq!(
            lib3d.backend().last_upload(line_program, POSITION_ATTRIBUTE).unwrap(),
            &[0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0]
        );

        lib3d.remove_line(h);
        lib3d.draw().unwrap();
        assert!(lib3d.backend().last_upload(line_program, POSITION_ATTRIBUTE).unwrap().is_empty());
        assert_eq!(lib3d.backend().draws().last(), Some(&(PrimitiveKind::Lines, 0)));
    }

    #[test]
    fn test_camera_setters_flow_into_draw() {
        let mut lib3d = lib3d();
        lib3d.set_camera_position(Vertex::new(0.0, 4.0, 0.0));
        lib3d.look_at(Vertex::ORIGIN).unwrap();
        lib3d.draw().unwrap();

        let uploaded = lib3d.backend().calls.iter().rev().find_map(|c| match c {
            BackendCall::SetMatrix { matrix, .. } => Some(*matrix),
            _ => None,
        });
        assert_eq!(uploaded.unwrap()[14], lib3d.camera().composed_matrix()[(2, 3)]);
        assert!(lib3d.set_camera_parameters(CameraParameters { znear: 5.0, zfar: 5.0, ..CameraParameters::default() }).is_err());
    }
}
