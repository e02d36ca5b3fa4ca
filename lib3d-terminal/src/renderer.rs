/// ASCII rasterizer for terminal rendering
///
/// A software implementation of the render backend: vertices are run through
/// the uploaded matrix, clipped, mapped to character cells and depth tested.
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use lib3d_core::math::perspective_divide;
use lib3d_core::renderer::{COLOR_ATTRIBUTE, MATRIX_UNIFORM, POSITION_ATTRIBUTE};
use lib3d_core::{ClearState, DepthTest, Lib3dError, PrimitiveKind, ProgramHandle, RenderBackend, Result};
use nalgebra::{Matrix4, Vector4};
use std::io::Write;

/// Character luminosity ramp (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &['.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Clip-space w below which a vertex counts as behind the camera
const MIN_W: f32 = 1e-6;

#[derive(Debug, Default)]
struct SoftwareProgram {
    positions: Vec<f32>,
    colors: Vec<f32>,
    matrix: Matrix4<f32>,
}

/// A vertex after the matrix, before the perspective divide
#[derive(Debug, Clone, Copy)]
struct ClipVertex {
    position: Vector4<f32>,
    color: [f32; 4],
}

/// A vertex after projection: cell coordinates, NDC depth and color
#[derive(Debug, Clone, Copy)]
struct ScreenVertex {
    x: f32,
    y: f32,
    depth: f32,
    color: [f32; 4],
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    character: char,
    color: [f32; 4],
}

impl Cell {
    const BLANK: Cell = Cell {
        character: ' ',
        color: [1.0, 1.0, 1.0, 1.0],
    };
}

/// ASCII renderer that draws primitives as terminal characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    cells: Vec<Cell>,
    depth_test: DepthTest,
    programs: Vec<SoftwareProgram>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        let clear = ClearState::default();
        Self {
            width,
            height,
            depth_buffer: vec![clear.depth; size],
            cells: vec![Cell::BLANK; size],
            depth_test: clear.depth_test,
            programs: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Resize the cell grid; contents are discarded
    pub fn resize(&mut self, width: usize, height: usize) {
        let clear_depth = self.depth_buffer.first().copied().unwrap_or(-1.0);
        self.width = width;
        self.height = height;
        self.depth_buffer = vec![clear_depth; width * height];
        self.cells = vec![Cell::BLANK; width * height];
    }

    /// Character drawn at a cell, mainly for tests
    pub fn char_at(&self, x: usize, y: usize) -> Option<char> {
        self.cells.get(y * self.width + x).map(|cell| cell.character)
    }

    /// Number of non-blank cells
    pub fn covered_cells(&self) -> usize {
        self.cells.iter().filter(|cell| cell.character != ' ').count()
    }

    fn program(&self, handle: ProgramHandle) -> Result<&SoftwareProgram> {
        self.programs
            .get(handle.0 as usize)
            .ok_or(Lib3dError::UnknownProgram(handle.0))
    }

    fn program_mut(&mut self, handle: ProgramHandle) -> Result<&mut SoftwareProgram> {
        self.programs
            .get_mut(handle.0 as usize)
            .ok_or(Lib3dError::UnknownProgram(handle.0))
    }

    /// Vertex `index` of a program in clip space
    fn clip_vertex(program: &SoftwareProgram, index: usize) -> ClipVertex {
        let p = &program.positions[index * 4..index * 4 + 4];
        let c = &program.colors[index * 4..index * 4 + 4];
        ClipVertex {
            position: program.matrix * Vector4::new(p[0], p[1], p[2], p[3]),
            color: [c[0], c[1], c[2], c[3]],
        }
    }

    /// Perspective divide and viewport mapping; `w` must be at least `MIN_W`
    fn to_screen(&self, v: &ClipVertex) -> ScreenVertex {
        let ndc = perspective_divide(&v.position);
        ScreenVertex {
            x: (ndc.x + 1.0) * 0.5 * self.width as f32,
            y: (1.0 - ndc.y) * 0.5 * self.height as f32,
            depth: ndc.z,
            color: v.color,
        }
    }

    fn plot(&mut self, x: i32, y: i32, depth: f32, color: [f32; 4]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        if !(-1.0..=1.0).contains(&depth) {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        if self.depth_test.passes(depth, self.depth_buffer[idx]) {
            self.depth_buffer[idx] = depth;
            self.cells[idx] = Cell {
                character: ramp_char(&color),
                color,
            };
        }
    }

    fn rasterize_triangle(&mut self, v: [ScreenVertex; 3]) {
        let [v0, v1, v2] = v;

        // Bounding box, clipped to screen bounds
        let min_x = v0.x.min(v1.x).min(v2.x).floor().max(0.0) as i32;
        let max_x = v0.x.max(v1.x).max(v2.x).ceil().min(self.width as f32 - 1.0) as i32;
        let min_y = v0.y.min(v1.y).min(v2.y).floor().max(0.0) as i32;
        let max_y = v0.y.max(v1.y).max(v2.y).ceil().min(self.height as f32 - 1.0) as i32;

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                if let Some((w0, w1, w2)) = barycentric((v0.x, v0.y), (v1.x, v1.y), (v2.x, v2.y), (px, py)) {
                    if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                        let depth = w0 * v0.depth + w1 * v1.depth + w2 * v2.depth;
                        self.plot(x, y, depth, v0.color);
                    }
                }
            }
        }
    }

    fn rasterize_line(&mut self, a: ScreenVertex, b: ScreenVertex) {
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as i32;

        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let x = (a.x + dx * t).floor() as i32;
            let y = (a.y + dy * t).floor() as i32;
            let depth = a.depth + (b.depth - a.depth) * t;
            self.plot(x, y, depth, a.color);
        }
    }

    /// Write the frame to `writer`, one terminal row per cell row
    pub fn present<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for y in 0..self.height {
            for x in 0..self.width {
                let cell = self.cells[y * self.width + x];
                let [r, g, b, _] = cell.color;
                let color = Color::Rgb {
                    r: to_channel(r),
                    g: to_channel(g),
                    b: to_channel(b),
                };

                writer.queue(SetForegroundColor(color))?;
                writer.queue(Print(cell.character))?;
            }
            if y + 1 < self.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

impl RenderBackend for AsciiRenderer {
    /// The software pipeline needs the binding names the draw path uses;
    /// a shader pair without them is reported the way a driver would.
    fn compile_program(&mut self, vertex_src: &str, fragment_src: &str) -> Result<ProgramHandle> {
        for name in [POSITION_ATTRIBUTE, COLOR_ATTRIBUTE, MATRIX_UNIFORM] {
            if !vertex_src.contains(name) {
                return Err(Lib3dError::ShaderCompilation(format!(
                    "vertex shader does not declare '{}'",
                    name
                )));
            }
        }
        if fragment_src.trim().is_empty() {
            return Err(Lib3dError::ProgramLink("fragment shader is empty".to_string()));
        }

        self.programs.push(SoftwareProgram {
            matrix: Matrix4::identity(),
            ..SoftwareProgram::default()
        });
        Ok(ProgramHandle(self.programs.len() as u32 - 1))
    }

    fn upload_buffer(&mut self, program: ProgramHandle, attribute: &str, data: &[f32]) -> Result<()> {
        let program = self.program_mut(program)?;
        match attribute {
            POSITION_ATTRIBUTE => program.positions = data.to_vec(),
            COLOR_ATTRIBUTE => program.colors = data.to_vec(),
            other => {
                return Err(Lib3dError::Backend(format!("unknown attribute '{}'", other)));
            }
        }
        Ok(())
    }

    fn set_uniform_matrix(&mut self, program: ProgramHandle, name: &str, matrix: &[f32; 16]) -> Result<()> {
        if name != MATRIX_UNIFORM {
            return Err(Lib3dError::Backend(format!("unknown uniform '{}'", name)));
        }
        self.program_mut(program)?.matrix = Matrix4::from_column_slice(matrix);
        Ok(())
    }

    fn draw_primitives(&mut self, program: ProgramHandle, kind: PrimitiveKind, vertex_count: usize) -> Result<()> {
        let program = self.program(program)?;
        let available = program.positions.len().min(program.colors.len()) / 4;
        if vertex_count > available {
            return Err(Lib3dError::Backend(format!(
                "draw of {} vertices exceeds the {} uploaded",
                vertex_count, available
            )));
        }

        let per_primitive = kind.vertices_per_primitive();
        let mut projected = Vec::with_capacity(vertex_count / per_primitive);
        for first in (0..vertex_count - vertex_count % per_primitive).step_by(per_primitive) {
            let vertices: Vec<ClipVertex> = (first..first + per_primitive)
                .map(|i| Self::clip_vertex(program, i))
                .collect();
            match kind {
                // Triangles crossing behind the camera are dropped whole
                PrimitiveKind::Triangles => {
                    if vertices.iter().all(|v| v.position.w >= MIN_W) {
                        projected.push(vertices.iter().map(|v| self.to_screen(v)).collect::<Vec<_>>());
                    }
                }
                PrimitiveKind::Lines => {
                    if let Some((a, b)) = clip_line(vertices[0], vertices[1]) {
                        projected.push(vec![self.to_screen(&a), self.to_screen(&b)]);
                    }
                }
            }
        }

        for vertices in projected {
            match kind {
                PrimitiveKind::Triangles => self.rasterize_triangle([vertices[0], vertices[1], vertices[2]]),
                PrimitiveKind::Lines => self.rasterize_line(vertices[0], vertices[1]),
            }
        }
        Ok(())
    }

    fn clear(&mut self, state: &ClearState) {
        self.depth_test = state.depth_test;
        self.depth_buffer.fill(state.depth);
        self.cells.fill(Cell::BLANK);
    }
}

/// Clip a segment in homogeneous space to the part in front of the camera
/// and inside the side planes `-w <= x, y <= w`.
///
/// Clipping before the divide keeps the projected endpoints on screen, so
/// the rasterizer's step count is bounded by the grid size.
fn clip_line(a: ClipVertex, b: ClipVertex) -> Option<(ClipVertex, ClipVertex)> {
    let planes: [fn(&Vector4<f32>) -> f32; 5] = [
        |p| p.w - MIN_W,
        |p| p.w - p.x,
        |p| p.w + p.x,
        |p| p.w - p.y,
        |p| p.w + p.y,
    ];
    let mut t0 = 0.0f32;
    let mut t1 = 1.0f32;

    for plane in planes {
        let da = plane(&a.position);
        let db = plane(&b.position);
        if !(da.is_finite() && db.is_finite()) || (da < 0.0 && db < 0.0) {
            return None;
        }
        if da < 0.0 {
            t0 = t0.max(da / (da - db));
        } else if db < 0.0 {
            t1 = t1.min(da / (da - db));
        }
        if t0 > t1 {
            return None;
        }
    }

    let at = |t: f32| ClipVertex {
        position: a.position + (b.position - a.position) * t,
        color: a.color,
    };
    Some((at(t0), at(t1)))
}

fn to_channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Brighter colors get denser characters
fn ramp_char(color: &[f32; 4]) -> char {
    let luminance = 0.2126 * color[0] + 0.7152 * color[1] + 0.0722 * color[2];
    let index = (luminance.clamp(0.0, 1.0) * (LUMINOSITY_RAMP.len() - 1) as f32).round() as usize;
    LUMINOSITY_RAMP[index.min(LUMINOSITY_RAMP.len() - 1)]
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use lib3d_core::renderer::{FRAGMENT_SHADER, VERTEX_SHADER};

    fn renderer_with_program() -> (AsciiRenderer, ProgramHandle) {
        let mut renderer = AsciiRenderer::new(20, 10);
        let program = renderer.compile_program(VERTEX_SHADER, FRAGMENT_SHADER).unwrap();
        renderer.clear(&ClearState::default());
        (renderer, program)
    }

    fn upload(renderer: &mut AsciiRenderer, program: ProgramHandle, positions: &[f32], color: [f32; 4]) {
        let colors: Vec<f32> = (0..positions.len() / 4).flat_map(|_| color).collect();
        renderer.upload_buffer(program, POSITION_ATTRIBUTE, positions).unwrap();
        renderer.upload_buffer(program, COLOR_ATTRIBUTE, &colors).unwrap();
    }

    #[test]
    fn test_rejects_shader_without_bindings() {
        let mut renderer = AsciiRenderer::new(4, 4);
        let result = renderer.compile_program("void main() {}", FRAGMENT_SHADER);
        assert!(matches!(result, Err(Lib3dError::ShaderCompilation(_))));
    }

    #[test]
    fn test_identity_triangle_covers_cells() {
        let (mut renderer, program) = renderer_with_program();
        let identity: Vec<f32> = Matrix4::<f32>::identity().as_slice().to_vec();
        let mut matrix = [0.0; 16];
        matrix.copy_from_slice(&identity);
        renderer.set_uniform_matrix(program, MATRIX_UNIFORM, &matrix).unwrap();
        upload(
            &mut renderer,
            program,
            &[-1.0, -1.0, 0.0, 1.0, 1.0, -1.0, 0.0, 1.0, -1.0, 1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0, 1.0],
        );
        renderer.draw_primitives(program, PrimitiveKind::Triangles, 3).unwrap();

        assert!(renderer.covered_cells() > 50);
        // bottom-left corner is inside, top-right outside
        assert_eq!(renderer.char_at(0, 9), Some('@'));
        assert_eq!(renderer.char_at(19, 0), Some(' '));
    }

    #[test]
    fn test_greater_depth_wins() {
        let (mut renderer, program) = renderer_with_program();
        let mut matrix = [0.0; 16];
        matrix.copy_from_slice(Matrix4::<f32>::identity().as_slice());
        renderer.set_uniform_matrix(program, MATRIX_UNIFORM, &matrix).unwrap();

        // horizontal line at depth 0.5 in white, then one at -0.5 in black
        upload(&mut renderer, program, &[-1.0, 0.0, 0.5, 1.0, 1.0, 0.0, 0.5, 1.0], [1.0, 1.0, 1.0, 1.0]);
        renderer.draw_primitives(program, PrimitiveKind::Lines, 2).unwrap();
        upload(&mut renderer, program, &[-1.0, 0.0, -0.5, 1.0, 1.0, 0.0, -0.5, 1.0], [0.0, 0.0, 0.0, 1.0]);
        renderer.draw_primitives(program, PrimitiveKind::Lines, 2).unwrap();

        assert_eq!(renderer.char_at(10, 5), Some('@'));
    }

    fn identity_program() -> (AsciiRenderer, ProgramHandle) {
        let (mut renderer, program) = renderer_with_program();
        let mut matrix = [0.0; 16];
        matrix.copy_from_slice(Matrix4::<f32>::identity().as_slice());
        renderer.set_uniform_matrix(program, MATRIX_UNIFORM, &matrix).unwrap();
        (renderer, program)
    }

    #[test]
    fn test_primitives_behind_camera_are_dropped() {
        let (mut renderer, program) = identity_program();
        upload(&mut renderer, program, &[-1.0, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0, -2.0], [1.0, 0.0, 0.0, 1.0]);
        renderer.draw_primitives(program, PrimitiveKind::Lines, 2).unwrap();
        upload(
            &mut renderer,
            program,
            &[-1.0, -1.0, 0.0, -1.0, 1.0, -1.0, 0.0, 1.0, -1.0, 1.0, 0.0, 1.0],
            [1.0, 0.0, 0.0, 1.0],
        );
        renderer.draw_primitives(program, PrimitiveKind::Triangles, 3).unwrap();
        assert_eq!(renderer.covered_cells(), 0);
    }

    #[test]
    fn test_line_crossing_camera_plane_keeps_front_part() {
        let (mut renderer, program) = identity_program();
        // From the viewport centre to a point behind the camera on the right
        upload(&mut renderer, program, &[0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, -1.0], [1.0, 1.0, 1.0, 1.0]);
        renderer.draw_primitives(program, PrimitiveKind::Lines, 2).unwrap();

        assert_eq!(renderer.char_at(15, 5), Some('@'));
        assert_eq!(renderer.char_at(5, 5), Some(' '));
    }

    #[test]
    fn test_line_ending_at_camera_plane_is_bounded() {
        let (mut renderer, program) = identity_program();
        // One endpoint projects about 10^10 cells off-screen
        upload(
            &mut renderer,
            program,
            &[1_000.0, 0.0, 0.0, 2e-6, 0.0, 0.0, 0.0, 1.0],
            [1.0, 1.0, 1.0, 1.0],
        );
        let started = std::time::Instant::now();
        renderer.draw_primitives(program, PrimitiveKind::Lines, 2).unwrap();
        assert!(started.elapsed() < std::time::Duration::from_millis(200));

        // Only the visible half of the centre row is drawn
        for x in 11..20 {
            assert_eq!(renderer.char_at(x, 5), Some('@'), "column {}", x);
        }
        assert_eq!(renderer.char_at(5, 5), Some(' '));
    }

    #[test]
    fn test_clip_line_to_frustum_sides() {
        let vertex = |x: f32, y: f32, w: f32| ClipVertex {
            position: Vector4::new(x, y, 0.0, w),
            color: [1.0; 4],
        };
        let (a, b) = clip_line(vertex(-3.0, 0.0, 1.0), vertex(3.0, 0.0, 1.0)).unwrap();
        assert_relative_eq!(a.position.x, -1.0, epsilon = 1e-5);
        assert_relative_eq!(b.position.x, 1.0, epsilon = 1e-5);
        assert!(clip_line(vertex(2.0, 0.0, 1.0), vertex(3.0, 0.5, 1.0)).is_none());
        assert!(clip_line(vertex(f32::NAN, 0.0, 1.0), vertex(0.0, 0.0, 1.0)).is_none());
    }

    #[test]
    fn test_draw_beyond_uploaded_data_fails() {
        let (mut renderer, program) = renderer_with_program();
        assert!(renderer.draw_primitives(program, PrimitiveKind::Lines, 2).is_err());
        assert!(renderer.draw_primitives(ProgramHandle(7), PrimitiveKind::Lines, 0).is_err());
    }

    #[test]
    fn test_present_writes_every_row() {
        let (renderer, _) = renderer_with_program();
        let mut out = Vec::new();
        renderer.present(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("\r\n").count(), 9);
    }

    #[test]
    fn test_ramp_char_by_luminance() {
        assert_eq!(ramp_char(&[0.0, 0.0, 0.0, 1.0]), '.');
        assert_eq!(ramp_char(&[1.0, 1.0, 1.0, 1.0]), '@');
    }
}
