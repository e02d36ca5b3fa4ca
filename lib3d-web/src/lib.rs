/// Lib3d Web - WebGL2 render backend for browsers
///
/// `WebGlBackend` implements the core backend interface over a canvas's
/// WebGL2 context. `Lib3dCanvas` exposes the registry and camera to
/// JavaScript with flat number arrays in place of structured vertices.
use lib3d_core::{
    CameraOrientation, CameraParameters, ClearState, Color, DepthTest, Handle, Lib3d, Lib3dError,
    Line, PrimitiveKind, ProgramHandle, RenderBackend, Triangle, Vertex,
};
use std::collections::HashMap;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, WebGl2RenderingContext as Gl, WebGlBuffer, WebGlProgram, WebGlShader};

/// Components per vertex in every attribute buffer
const COMPONENTS: i32 = 4;

struct ProgramState {
    program: WebGlProgram,
    buffers: HashMap<String, WebGlBuffer>,
}

pub struct WebGlBackend {
    gl: Gl,
    width: i32,
    height: i32,
    programs: Vec<ProgramState>,
}

impl WebGlBackend {
    pub fn new(canvas: &HtmlCanvasElement) -> lib3d_core::Result<Self> {
        let gl = canvas
            .get_context("webgl2")
            .map_err(|_| backend_error("canvas refused a webgl2 context"))?
            .ok_or_else(|| backend_error("webgl2 is not supported"))?
            .dyn_into::<Gl>()
            .map_err(|_| backend_error("context is not a WebGl2RenderingContext"))?;

        Ok(Self {
            gl,
            width: canvas.width() as i32,
            height: canvas.height() as i32,
            programs: Vec::new(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width as i32;
        self.height = height as i32;
    }

    fn compile_shader(&self, kind: u32, source: &str) -> lib3d_core::Result<WebGlShader> {
        let shader = self
            .gl
            .create_shader(kind)
            .ok_or_else(|| backend_error("unable to create shader object"))?;
        self.gl.shader_source(&shader, source);
        self.gl.compile_shader(&shader);

        let compiled = self
            .gl
            .get_shader_parameter(&shader, Gl::COMPILE_STATUS)
            .as_bool()
            .unwrap_or(false);
        if compiled {
            Ok(shader)
        } else {
            let info = self.gl.get_shader_info_log(&shader).unwrap_or_default();
            self.gl.delete_shader(Some(&shader));
            Err(Lib3dError::ShaderCompilation(info))
        }
    }

    fn program(&self, program: ProgramHandle) -> lib3d_core::Result<&ProgramState> {
        self.programs
            .get(program.0 as usize)
            .ok_or(Lib3dError::UnknownProgram(program.0))
    }
}

fn backend_error(message: &str) -> Lib3dError {
    Lib3dError::Backend(message.to_string())
}

/// Little-endian bytes of an f32 slice, as `bufferData` expects them
fn float_bytes(data: &[f32]) -> Vec<u8> {
    data.iter().flat_map(|value| value.to_le_bytes()).collect()
}

impl RenderBackend for WebGlBackend {
    fn compile_program(&mut self, vertex_src: &str, fragment_src: &str) -> lib3d_core::Result<ProgramHandle> {
        let vertex = self.compile_shader(Gl::VERTEX_SHADER, vertex_src)?;
        let fragment = self.compile_shader(Gl::FRAGMENT_SHADER, fragment_src)?;

        let program = self
            .gl
            .create_program()
            .ok_or_else(|| backend_error("unable to create program object"))?;
        self.gl.attach_shader(&program, &vertex);
        self.gl.attach_shader(&program, &fragment);
        self.gl.link_program(&program);

        let linked = self
            .gl
            .get_program_parameter(&program, Gl::LINK_STATUS)
            .as_bool()
            .unwrap_or(false);
        if !linked {
            let info = self.gl.get_program_info_log(&program).unwrap_or_default();
            self.gl.delete_program(Some(&program));
            return Err(Lib3dError::ProgramLink(info));
        }

        let handle = ProgramHandle(self.programs.len() as u32);
        self.programs.push(ProgramState {
            program,
            buffers: HashMap::new(),
        });
        log::info!("linked program {}", handle.0);
        Ok(handle)
    }

    fn upload_buffer(&mut self, program: ProgramHandle, attribute: &str, data: &[f32]) -> lib3d_core::Result<()> {
        let location = {
            let state = self.program(program)?;
            self.gl.get_attrib_location(&state.program, attribute)
        };
        if location < 0 {
            return Err(Lib3dError::Backend(format!("no attribute named {}", attribute)));
        }

        let buffer = match self.programs[program.0 as usize].buffers.get(attribute) {
            Some(buffer) => buffer.clone(),
            None => {
                let buffer = self
                    .gl
                    .create_buffer()
                    .ok_or_else(|| backend_error("unable to create buffer"))?;
                self.programs[program.0 as usize]
                    .buffers
                    .insert(attribute.to_string(), buffer.clone());
                buffer
            }
        };

        self.gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&buffer));
        self.gl
            .buffer_data_with_u8_array(Gl::ARRAY_BUFFER, &float_bytes(data), Gl::DYNAMIC_DRAW);
        self.gl.enable_vertex_attrib_array(location as u32);
        self.gl
            .vertex_attrib_pointer_with_i32(location as u32, COMPONENTS, Gl::FLOAT, false, 0, 0);
        Ok(())
    }

    fn set_uniform_matrix(&mut self, program: ProgramHandle, name: &str, matrix: &[f32; 16]) -> lib3d_core::Result<()> {
        let state = self.program(program)?;
        let location = self
            .gl
            .get_uniform_location(&state.program, name)
            .ok_or_else(|| Lib3dError::Backend(format!("no uniform named {}", name)))?;
        self.gl.use_program(Some(&state.program));
        self.gl
            .uniform_matrix4fv_with_f32_array(Some(&location), false, matrix);
        Ok(())
    }

    fn draw_primitives(&mut self, program: ProgramHandle, kind: PrimitiveKind, vertex_count: usize) -> lib3d_core::Result<()> {
        let state = self.program(program)?;
        if vertex_count == 0 {
            return Ok(());
        }
        let mode = match kind {
            PrimitiveKind::Triangles => Gl::TRIANGLES,
            PrimitiveKind::Lines => Gl::LINES,
        };
        self.gl.use_program(Some(&state.program));
        self.gl.draw_arrays(mode, 0, vertex_count as i32);
        Ok(())
    }

    fn clear(&mut self, state: &ClearState) {
        self.gl.viewport(0, 0, self.width, self.height);
        self.gl.clear_color(state.color.r, state.color.g, state.color.b, state.color.a);
        self.gl.clear_depth(state.depth);
        self.gl.enable(Gl::DEPTH_TEST);
        self.gl.depth_func(match state.depth_test {
            DepthTest::Less => Gl::LESS,
            DepthTest::Greater => Gl::GREATER,
        });
        self.gl.clear(Gl::COLOR_BUFFER_BIT | Gl::DEPTH_BUFFER_BIT);
    }
}

fn to_js(err: Lib3dError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn vertex_at(values: &[f32], index: usize) -> Vertex {
    Vertex::new(values[3 * index], values[3 * index + 1], values[3 * index + 2])
}

fn color_from(values: &[f32]) -> lib3d_core::Result<Color> {
    match values {
        [r, g, b] => Ok(Color::rgb(*r, *g, *b)),
        [r, g, b, a] => Ok(Color::new(*r, *g, *b, *a)),
        _ => Err(Lib3dError::Backend(format!(
            "a color needs 3 or 4 components, got {}",
            values.len()
        ))),
    }
}

fn triangle_from(vertices: &[f32], color: &[f32]) -> lib3d_core::Result<Triangle> {
    if vertices.len() != 9 {
        return Err(Lib3dError::Backend(format!(
            "a triangle needs 9 coordinates, got {}",
            vertices.len()
        )));
    }
    Ok(Triangle::new(
        vertex_at(vertices, 0),
        vertex_at(vertices, 1),
        vertex_at(vertices, 2),
        color_from(color)?,
    ))
}

fn line_from(vertices: &[f32], color: &[f32]) -> lib3d_core::Result<Line> {
    if vertices.len() != 6 {
        return Err(Lib3dError::Backend(format!(
            "a line needs 6 coordinates, got {}",
            vertices.len()
        )));
    }
    Ok(Line::new(vertex_at(vertices, 0), vertex_at(vertices, 1), color_from(color)?))
}

fn orientation_from(basis: &[f32]) -> lib3d_core::Result<CameraOrientation> {
    if basis.len() != 9 {
        return Err(Lib3dError::DegenerateOrientation(format!(
            "a basis needs 9 components, got {}",
            basis.len()
        )));
    }
    Ok(CameraOrientation {
        vx: vertex_at(basis, 0),
        vy: vertex_at(basis, 1),
        vz: vertex_at(basis, 2),
    })
}

/// A lib3d context bound to a canvas
#[wasm_bindgen]
pub struct Lib3dCanvas {
    inner: Lib3d<WebGlBackend>,
}

#[wasm_bindgen]
impl Lib3dCanvas {
    /// Bind to the canvas with id `canvas_id`; the camera starts at the
    /// default position and orientation
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str, f: f32, width: f32, height: f32, zfar: f32, znear: f32) -> Result<Lib3dCanvas, JsValue> {
        let canvas = web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.get_element_by_id(canvas_id))
            .ok_or_else(|| JsValue::from_str(&format!("could not find canvas element {}", canvas_id)))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| JsValue::from_str("element is not a canvas"))?;

        let backend = WebGlBackend::new(&canvas).map_err(to_js)?;
        let parameters = CameraParameters {
            f,
            width,
            height,
            zfar,
            znear,
        };
        let inner = Lib3d::new(
            backend,
            parameters,
            lib3d_core::Camera::DEFAULT_POSITION,
            CameraOrientation::default(),
        )
        .map_err(to_js)?;
        Ok(Lib3dCanvas { inner })
    }

    /// `vertices` is x1,y1,z1,x2,y2,z2,x3,y3,z3; `color` is r,g,b[,a]
    #[wasm_bindgen(js_name = addTriangle)]
    pub fn add_triangle(&mut self, vertices: &[f32], color: &[f32]) -> Result<Handle, JsValue> {
        let triangle = triangle_from(vertices, color).map_err(to_js)?;
        Ok(self.inner.add_triangle(triangle))
    }

    #[wasm_bindgen(js_name = removeTriangle)]
    pub fn remove_triangle(&mut self, handle: Handle) {
        self.inner.remove_triangle(handle);
    }

    /// `vertices` is x1,y1,z1,x2,y2,z2; `color` is r,g,b[,a]
    #[wasm_bindgen(js_name = addLine)]
    pub fn add_line(&mut self, vertices: &[f32], color: &[f32]) -> Result<Handle, JsValue> {
        let line = line_from(vertices, color).map_err(to_js)?;
        Ok(self.inner.add_line(line))
    }

    #[wasm_bindgen(js_name = removeLine)]
    pub fn remove_line(&mut self, handle: Handle) {
        self.inner.remove_line(handle);
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    #[wasm_bindgen(js_name = setCameraPosition)]
    pub fn set_camera_position(&mut self, x: f32, y: f32, z: f32) {
        self.inner.set_camera_position(Vertex::new(x, y, z));
    }

    /// `basis` is vx, vy, vz as nine consecutive numbers
    #[wasm_bindgen(js_name = setCameraOrientation)]
    pub fn set_camera_orientation(&mut self, basis: &[f32]) -> Result<(), JsValue> {
        let orientation = orientation_from(basis).map_err(to_js)?;
        self.inner.set_camera_orientation(orientation).map_err(to_js)
    }

    #[wasm_bindgen(js_name = setCameraParameters)]
    pub fn set_camera_parameters(&mut self, f: f32, width: f32, height: f32, zfar: f32, znear: f32) -> Result<(), JsValue> {
        self.inner
            .set_camera_parameters(CameraParameters {
                f,
                width,
                height,
                zfar,
                znear,
            })
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = lookAt)]
    pub fn look_at(&mut self, x: f32, y: f32, z: f32) -> Result<(), JsValue> {
        self.inner.look_at(Vertex::new(x, y, z)).map_err(to_js)
    }

    /// Match the GL viewport to a resized canvas
    pub fn resize(&mut self, width: u32, height: u32) {
        self.inner.backend_mut().resize(width, height);
    }

    pub fn draw(&mut self) -> Result<(), JsValue> {
        self.inner.draw().map_err(to_js)
    }
}
