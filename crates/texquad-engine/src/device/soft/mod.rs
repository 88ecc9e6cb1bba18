//! CPU reference implementation of [`GraphicsContext`].
//!
//! `SoftContext` runs the same object model a GLES 2.0 driver does (shader
//! and program objects with deferred deletion, bind points, attribute
//! pointers, texture units) over an RGBA `f32` color buffer. Shaders are
//! compiled with `texquad-glsl` and interpreted per vertex and per fragment.
//!
//! Misuse is never a panic: the offending call is skipped and a
//! [`ContextError`] is queued, readable with [`SoftContext::take_errors`].
//! Optionally every state-changing call is traced by name so tests can
//! assert call order.

mod eval;
mod objects;
mod raster;
mod sampler;

use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use image::{Rgba, RgbaImage};
use texquad_glsl::{CheckedShader, Type};

use crate::coords::Viewport;
use crate::paint::Color;

use super::context::GraphicsContext;
use super::types::{
    BufferTarget, BufferUsage, Capability, ComponentType, IndexType, PixelFormat, PrimitiveType,
    ShaderStage, TextureFilter, TextureParameter, TextureWrap,
};

use eval::{Sampling, Value};
use objects::{LinkedProgram, ProgramSlot, ShaderSlot, TextureSlot, UniformValue};
use raster::{AttribPointer, Fragment, ShadedVertex, Target};

pub use objects::{
    MAX_TEXTURE_UNITS, MAX_VERTEX_ATTRIBS, SoftBuffer, SoftProgram, SoftShader, SoftTexture,
    SoftUniformLocation,
};

/// A call the context rejected. The call had no effect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("invalid enum: {0}")]
    InvalidEnum(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

/// Wrap and filter parameters currently set on a texture.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SamplingState {
    pub wrap_s: TextureWrap,
    pub wrap_t: TextureWrap,
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
}

fn invalid_op(msg: impl Into<String>) -> ContextError {
    ContextError::InvalidOperation(msg.into())
}

#[derive(Debug, Copy, Clone, Default)]
struct AttribState {
    enabled: bool,
    pointer: Option<AttribPointer>,
}

pub struct SoftContext {
    width: u32,
    height: u32,
    /// Row-major, row 0 at the bottom.
    pixels: Vec<[f32; 4]>,

    next_name: u32,
    shaders: HashMap<u32, ShaderSlot>,
    programs: HashMap<u32, ProgramSlot>,
    buffers: HashMap<u32, Vec<u8>>,
    textures: HashMap<u32, TextureSlot>,

    array_buffer: Option<SoftBuffer>,
    element_buffer: Option<SoftBuffer>,
    current_program: Option<SoftProgram>,
    attribs: [AttribState; MAX_VERTEX_ATTRIBS],
    active_unit: usize,
    units: [Option<SoftTexture>; MAX_TEXTURE_UNITS],
    viewport: Viewport,
    clear_color: Color,
    cull_face: bool,

    object_limit: Option<usize>,
    errors: Vec<ContextError>,
    trace: Option<Vec<&'static str>>,
}

impl SoftContext {
    /// Creates a context with a `width × height` color buffer cleared to
    /// transparent black and the viewport covering all of it.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0.0; 4]; width as usize * height as usize],
            next_name: 1,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            array_buffer: None,
            element_buffer: None,
            current_program: None,
            attribs: [AttribState::default(); MAX_VERTEX_ATTRIBS],
            active_unit: 0,
            units: [None; MAX_TEXTURE_UNITS],
            viewport: Viewport::sized(width, height),
            clear_color: Color::TRANSPARENT,
            cull_face: false,
            object_limit: None,
            errors: Vec::new(),
            trace: None,
        }
    }

    #[inline]
    pub fn framebuffer_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Color of pixel `(x, y)`, bottom-left origin.
    pub fn read_pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get((y * self.width + x) as usize)
            .copied()
            .map(Color::from_array)
    }

    /// The color buffer as an 8-bit image with the usual top-left origin.
    pub fn snapshot(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let row = self.height - 1 - y;
            let px = self.pixels[(row * self.width + x) as usize];
            Rgba(Color::from_array(px).to_rgba8())
        })
    }

    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Wrap and filter parameters of `texture`, `None` once deleted.
    pub fn texture_sampling(&self, texture: SoftTexture) -> Option<SamplingState> {
        self.textures.get(&texture.0).map(|slot| SamplingState {
            wrap_s: slot.wrap_s,
            wrap_t: slot.wrap_t,
            min_filter: slot.min_filter,
            mag_filter: slot.mag_filter,
        })
    }

    /// Makes object creation fail once `limit` objects of any kind are alive.
    pub fn limit_objects(&mut self, limit: Option<usize>) {
        self.object_limit = limit;
    }

    /// Drains the errors queued since the last call.
    pub fn take_errors(&mut self) -> Vec<ContextError> {
        std::mem::take(&mut self.errors)
    }

    /// Starts recording the names of state-changing calls.
    pub fn enable_call_trace(&mut self) {
        self.trace = Some(Vec::new());
    }

    /// Drains the recorded call names.
    pub fn take_call_trace(&mut self) -> Vec<&'static str> {
        self.trace.as_mut().map(std::mem::take).unwrap_or_default()
    }

    // ── internals ─────────────────────────────────────────────────────────

    fn record(&mut self, call: &'static str) {
        if let Some(trace) = self.trace.as_mut() {
            trace.push(call);
        }
    }

    fn error(&mut self, err: ContextError) {
        log::warn!("soft context: {err}");
        self.errors.push(err);
    }

    fn allocate(&mut self, what: &str) -> Result<u32, String> {
        let live = self.shaders.len() + self.programs.len() + self.buffers.len() + self.textures.len();
        if self.object_limit.is_some_and(|limit| live >= limit) {
            return Err(format!("out of memory: cannot create {what} ({live} objects alive)"));
        }
        let name = self.next_name;
        self.next_name += 1;
        Ok(name)
    }

    fn is_attached_anywhere(&self, shader: SoftShader) -> bool {
        self.programs.values().any(|p| p.attached.contains(&shader))
    }

    /// Frees a shader flagged for deletion once no program references it.
    fn collect_shader(&mut self, shader: SoftShader) {
        let pending = self.shaders.get(&shader.0).is_some_and(|s| s.delete_pending);
        if pending && !self.is_attached_anywhere(shader) {
            self.shaders.remove(&shader.0);
        }
    }

    fn free_program(&mut self, program: SoftProgram) {
        if let Some(slot) = self.programs.remove(&program.0) {
            for shader in slot.attached {
                self.collect_shader(shader);
            }
        }
    }

    fn bound_texture_mut(&mut self, call: &str) -> Option<&mut TextureSlot> {
        let bound = self.units[self.active_unit];
        if bound.is_none_or(|t| !self.textures.contains_key(&t.0)) {
            self.error(invalid_op(format!("{call}: no texture bound to unit {}", self.active_unit)));
            return None;
        }
        bound.and_then(|t| self.textures.get_mut(&t.0))
    }

    /// Uniform slot of the current program named by `location`.
    fn uniform_slot(&mut self, location: &SoftUniformLocation, call: &str) -> Option<(Type, &mut UniformValue)> {
        if self.current_program != Some(location.program) {
            self.error(invalid_op(format!("{call}: location does not belong to the current program")));
            return None;
        }
        let slot = self.programs.get_mut(&location.program.0)?;
        let ty = slot.linked.as_ref()?.uniforms.get(location.index)?.ty;
        slot.uniform_values.get_mut(location.index).map(|value| (ty, value))
    }

    fn draw(&mut self, mode: PrimitiveType, count: usize, index_type: IndexType, offset: usize) -> Result<(), ContextError> {
        let program_id = self.current_program.ok_or_else(|| invalid_op("draw: no program in use"))?;
        let program = self
            .programs
            .get(&program_id.0)
            .ok_or_else(|| invalid_op("draw: current program no longer exists"))?;
        let linked = program
            .linked
            .as_ref()
            .ok_or_else(|| invalid_op("draw: current program is not linked"))?;

        let elements = self
            .element_buffer
            .and_then(|b| self.buffers.get(&b.0))
            .ok_or_else(|| invalid_op("draw: no element array buffer bound"))?;
        let size = index_type.size_bytes();
        if offset % size != 0 {
            return Err(invalid_op(format!("draw: offset {offset} is not a multiple of the index size {size}")));
        }
        let index_bytes = elements
            .get(offset..)
            .filter(|rest| rest.len() >= count * size)
            .ok_or_else(|| invalid_op(format!("draw: {count} indices at offset {offset} overrun the element buffer")))?;
        let indices: Vec<u32> = (0..count).filter_map(|i| index_type.read(index_bytes, i)).collect();

        // Fetch every attribute of every referenced vertex up front so an
        // out-of-range read rejects the whole draw.
        let unique: BTreeSet<u32> = indices.iter().copied().collect();
        let mut inputs: HashMap<u32, Vec<(String, Value)>> = HashMap::new();
        for attribute in &linked.attributes {
            let state = self.attribs[attribute.location as usize];
            let components = attribute.ty.components();
            let source = match (state.enabled, state.pointer) {
                (false, _) => None,
                (true, None) => {
                    return Err(invalid_op(format!(
                        "draw: attribute '{}' is enabled without a pointer",
                        attribute.name
                    )));
                }
                (true, Some(pointer)) => {
                    let store = self.buffers.get(&pointer.buffer.0).ok_or_else(|| {
                        invalid_op(format!("draw: attribute '{}' reads a deleted buffer", attribute.name))
                    })?;
                    Some((pointer, store))
                }
            };
            for &index in &unique {
                let raw = match source {
                    None => [0.0, 0.0, 0.0, 1.0],
                    Some((pointer, store)) => pointer.fetch(store, index).ok_or_else(|| {
                        invalid_op(format!(
                            "draw: attribute '{}' reads past the end of its buffer at vertex {index}",
                            attribute.name
                        ))
                    })?,
                };
                inputs
                    .entry(index)
                    .or_default()
                    .push((attribute.name.clone(), Value::constant(&raw[..components])));
            }
        }

        let mut uniforms: HashMap<String, Value> = HashMap::new();
        let mut samplers: HashMap<String, Option<TextureSlot>> = HashMap::new();
        for (uniform, value) in linked.uniforms.iter().zip(&program.uniform_values) {
            match *value {
                UniformValue::Float(v) => {
                    uniforms.insert(uniform.name.clone(), Value::constant(&v[..uniform.ty.components()]));
                }
                UniformValue::Sampler(unit) => {
                    let texture = usize::try_from(unit)
                        .ok()
                        .and_then(|u| self.units.get(u).copied().flatten())
                        .and_then(|t| self.textures.get(&t.0))
                        .cloned();
                    samplers.insert(uniform.name.clone(), texture);
                }
            }
        }

        let shading = Shading {
            vertex: Rc::clone(&linked.vertex),
            fragment: Rc::clone(&linked.fragment),
            varyings: linked.varyings.iter().map(|v| (v.name.clone(), v.ty)).collect(),
            uniforms,
            samplers: BoundSamplers(samplers),
        };

        let shaded: HashMap<u32, ShadedVertex> = inputs
            .into_iter()
            .map(|(index, attributes)| (index, shading.shade_vertex(attributes)))
            .collect();
        // Programs without active attributes still shade each vertex.
        let shaded_for = |index: u32| shaded.get(&index).cloned().unwrap_or_else(|| shading.shade_vertex(Vec::new()));

        let mut target = Target {
            width: self.width,
            height: self.height,
            pixels: &mut self.pixels,
            viewport: self.viewport,
            cull_back_faces: self.cull_face,
        };
        let mut fragments = 0usize;
        for [a, b, c] in raster::assemble(mode, indices.len()) {
            let tri = [shaded_for(indices[a]), shaded_for(indices[b]), shaded_for(indices[c])];
            target.draw_triangle([&tri[0], &tri[1], &tri[2]], &mut |fragment: Fragment| {
                fragments += 1;
                shading.shade_fragment(fragment)
            });
        }
        log::trace!("draw: {count} indices, {} vertices shaded, {fragments} fragments", unique.len());
        Ok(())
    }
}

// ── shading ───────────────────────────────────────────────────────────────

struct BoundSamplers(HashMap<String, Option<TextureSlot>>);

impl Sampling for BoundSamplers {
    fn sample(&self, name: &str, uv: &Value) -> [f32; 4] {
        match self.0.get(name) {
            Some(Some(texture)) => sampler::sample(texture, uv),
            _ => sampler::INCOMPLETE_SAMPLE,
        }
    }
}

/// Everything one draw needs to run both stages.
struct Shading {
    vertex: Rc<CheckedShader>,
    fragment: Rc<CheckedShader>,
    varyings: Vec<(String, Type)>,
    uniforms: HashMap<String, Value>,
    samplers: BoundSamplers,
}

impl Shading {
    fn shade_vertex(&self, attributes: Vec<(String, Value)>) -> ShadedVertex {
        let mut globals = self.uniforms.clone();
        globals.extend(attributes);
        eval::execute(self.vertex.main_body(), &mut globals, &self.samplers);

        let position = globals.get("gl_Position").map(|p| p.to_vec4()).unwrap_or([0.0; 4]);
        let varyings = self
            .varyings
            .iter()
            .map(|(name, ty)| {
                globals
                    .get(name)
                    .copied()
                    .unwrap_or_else(|| Value::constant(&[0.0; 4][..ty.components()]))
            })
            .collect();
        ShadedVertex { position, varyings }
    }

    fn shade_fragment(&self, fragment: Fragment) -> [f32; 4] {
        let mut globals = self.uniforms.clone();
        for ((name, _), value) in self.varyings.iter().zip(fragment.varyings) {
            globals.insert(name.clone(), value);
        }
        globals.insert("gl_FragCoord".to_string(), Value::constant(&fragment.frag_coord));
        eval::execute(self.fragment.main_body(), &mut globals, &self.samplers);
        globals.get("gl_FragColor").map(|c| c.to_vec4()).unwrap_or([0.0; 4])
    }
}

// ── GraphicsContext ───────────────────────────────────────────────────────

impl GraphicsContext for SoftContext {
    type Shader = SoftShader;
    type Program = SoftProgram;
    type Buffer = SoftBuffer;
    type Texture = SoftTexture;
    type UniformLocation = SoftUniformLocation;

    fn create_shader(&mut self, stage: ShaderStage) -> Result<SoftShader, String> {
        self.record("create_shader");
        let name = self.allocate("shader")?;
        self.shaders.insert(name, ShaderSlot::new(stage));
        Ok(SoftShader(name))
    }

    fn shader_source(&mut self, shader: SoftShader, source: &str) {
        self.record("shader_source");
        match self.shaders.get_mut(&shader.0) {
            Some(slot) => slot.source = source.to_string(),
            None => self.error(ContextError::InvalidValue(format!("shader_source: unknown shader {}", shader.0))),
        }
    }

    fn compile_shader(&mut self, shader: SoftShader) {
        self.record("compile_shader");
        match self.shaders.get_mut(&shader.0) {
            Some(slot) => slot.compile(),
            None => self.error(ContextError::InvalidValue(format!("compile_shader: unknown shader {}", shader.0))),
        }
    }

    fn shader_compile_status(&self, shader: SoftShader) -> bool {
        self.shaders.get(&shader.0).is_some_and(|s| s.compiled.is_some())
    }

    fn shader_info_log(&self, shader: SoftShader) -> String {
        self.shaders.get(&shader.0).map(|s| s.info_log.clone()).unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: SoftShader) {
        self.record("delete_shader");
        if !self.shaders.contains_key(&shader.0) {
            self.error(ContextError::InvalidValue(format!("delete_shader: unknown shader {}", shader.0)));
            return;
        }
        if let Some(slot) = self.shaders.get_mut(&shader.0) {
            slot.delete_pending = true;
        }
        self.collect_shader(shader);
    }

    fn create_program(&mut self) -> Result<SoftProgram, String> {
        self.record("create_program");
        let name = self.allocate("program")?;
        self.programs.insert(name, ProgramSlot::default());
        Ok(SoftProgram(name))
    }

    fn attach_shader(&mut self, program: SoftProgram, shader: SoftShader) {
        self.record("attach_shader");
        let Some(stage) = self.shaders.get(&shader.0).map(|s| s.stage) else {
            self.error(ContextError::InvalidValue(format!("attach_shader: unknown shader {}", shader.0)));
            return;
        };
        let same_stage_attached = match self.programs.get(&program.0) {
            Some(slot) => slot
                .attached
                .iter()
                .any(|s| self.shaders.get(&s.0).is_some_and(|other| other.stage == stage)),
            None => {
                self.error(ContextError::InvalidValue(format!("attach_shader: unknown program {}", program.0)));
                return;
            }
        };
        if same_stage_attached {
            self.error(invalid_op(format!("attach_shader: a {stage} shader is already attached")));
            return;
        }
        if let Some(slot) = self.programs.get_mut(&program.0) {
            slot.attached.push(shader);
        }
    }

    fn detach_shader(&mut self, program: SoftProgram, shader: SoftShader) {
        self.record("detach_shader");
        let detached = match self.programs.get_mut(&program.0) {
            Some(slot) => {
                let before = slot.attached.len();
                slot.attached.retain(|s| *s != shader);
                slot.attached.len() != before
            }
            None => false,
        };
        if !detached {
            self.error(invalid_op(format!("detach_shader: shader {} is not attached to program {}", shader.0, program.0)));
            return;
        }
        self.collect_shader(shader);
    }

    fn link_program(&mut self, program: SoftProgram) {
        self.record("link_program");
        let Some(attached) = self.programs.get(&program.0).map(|p| p.attached.clone()) else {
            self.error(ContextError::InvalidValue(format!("link_program: unknown program {}", program.0)));
            return;
        };
        let stages: Vec<_> = attached
            .iter()
            .filter_map(|s| self.shaders.get(&s.0))
            .map(|s| (s.stage, s.compiled.clone()))
            .collect();
        let result: Result<LinkedProgram, String> = objects::link(&stages);
        if let Some(slot) = self.programs.get_mut(&program.0) {
            match result {
                Ok(linked) => slot.install(linked),
                Err(log) => slot.fail(log),
            }
        }
    }

    fn program_link_status(&self, program: SoftProgram) -> bool {
        self.programs.get(&program.0).is_some_and(|p| p.linked.is_some())
    }

    fn program_info_log(&self, program: SoftProgram) -> String {
        self.programs.get(&program.0).map(|p| p.info_log.clone()).unwrap_or_default()
    }

    fn delete_program(&mut self, program: SoftProgram) {
        self.record("delete_program");
        if !self.programs.contains_key(&program.0) {
            self.error(ContextError::InvalidValue(format!("delete_program: unknown program {}", program.0)));
            return;
        }
        if self.current_program == Some(program) {
            if let Some(slot) = self.programs.get_mut(&program.0) {
                slot.delete_pending = true;
            }
        } else {
            self.free_program(program);
        }
    }

    fn use_program(&mut self, program: Option<SoftProgram>) {
        self.record("use_program");
        if let Some(p) = program {
            match self.programs.get(&p.0).map(|slot| slot.linked.is_some()) {
                None => {
                    self.error(ContextError::InvalidValue(format!("use_program: unknown program {}", p.0)));
                    return;
                }
                Some(false) => {
                    self.error(invalid_op(format!("use_program: program {} is not linked", p.0)));
                    return;
                }
                Some(true) => {}
            }
        }
        let previous = std::mem::replace(&mut self.current_program, program);
        if let Some(prev) = previous.filter(|prev| Some(*prev) != program) {
            if self.programs.get(&prev.0).is_some_and(|slot| slot.delete_pending) {
                self.free_program(prev);
            }
        }
    }

    fn attrib_location(&self, program: SoftProgram, name: &str) -> Option<u32> {
        let linked = self.programs.get(&program.0)?.linked.as_ref()?;
        linked.attributes.iter().find(|a| a.name == name).map(|a| a.location)
    }

    fn uniform_location(&self, program: SoftProgram, name: &str) -> Option<SoftUniformLocation> {
        let linked = self.programs.get(&program.0)?.linked.as_ref()?;
        let index = linked.uniforms.iter().position(|u| u.name == name)?;
        Some(SoftUniformLocation { program, index })
    }

    fn uniform_1_i32(&mut self, location: &SoftUniformLocation, value: i32) {
        self.record("uniform_1_i32");
        let Some((ty, slot)) = self.uniform_slot(location, "uniform_1_i32") else {
            return;
        };
        if ty != Type::Sampler2D {
            self.error(invalid_op(format!("uniform_1_i32: uniform is a {ty}, not an integer or sampler")));
            return;
        }
        if !(0..MAX_TEXTURE_UNITS as i32).contains(&value) {
            self.error(ContextError::InvalidValue(format!("uniform_1_i32: texture unit {value} out of range")));
            return;
        }
        *slot = UniformValue::Sampler(value);
    }

    fn uniform_4_f32(&mut self, location: &SoftUniformLocation, value: [f32; 4]) {
        self.record("uniform_4_f32");
        let Some((ty, slot)) = self.uniform_slot(location, "uniform_4_f32") else {
            return;
        };
        if ty != Type::Vec4 {
            self.error(invalid_op(format!("uniform_4_f32: uniform is a {ty}, not a vec4")));
            return;
        }
        *slot = UniformValue::Float(value);
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        self.record("enable_vertex_attrib_array");
        match self.attribs.get_mut(index as usize) {
            Some(state) => state.enabled = true,
            None => self.error(ContextError::InvalidValue(format!("enable_vertex_attrib_array: index {index}"))),
        }
    }

    fn disable_vertex_attrib_array(&mut self, index: u32) {
        self.record("disable_vertex_attrib_array");
        match self.attribs.get_mut(index as usize) {
            Some(state) => state.enabled = false,
            None => self.error(ContextError::InvalidValue(format!("disable_vertex_attrib_array: index {index}"))),
        }
    }

    fn vertex_attrib_pointer(
        &mut self,
        index: u32,
        size: i32,
        ty: ComponentType,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        self.record("vertex_attrib_pointer");
        if index as usize >= MAX_VERTEX_ATTRIBS || !(1..=4).contains(&size) || !(0..=255).contains(&stride) || offset < 0 {
            self.error(ContextError::InvalidValue(format!(
                "vertex_attrib_pointer: index {index}, size {size}, stride {stride}, offset {offset}"
            )));
            return;
        }
        let width = ty.size_bytes() as i32;
        if offset % width != 0 || stride % width != 0 {
            self.error(invalid_op(format!(
                "vertex_attrib_pointer: stride {stride} and offset {offset} must be multiples of {width}"
            )));
            return;
        }
        let Some(buffer) = self.array_buffer else {
            self.error(invalid_op("vertex_attrib_pointer: no array buffer bound"));
            return;
        };
        self.attribs[index as usize].pointer = Some(AttribPointer {
            buffer,
            size: size as usize,
            ty,
            normalized,
            stride: stride as usize,
            offset: offset as usize,
        });
    }

    fn create_buffer(&mut self) -> Result<SoftBuffer, String> {
        self.record("create_buffer");
        let name = self.allocate("buffer")?;
        self.buffers.insert(name, Vec::new());
        Ok(SoftBuffer(name))
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<SoftBuffer>) {
        self.record("bind_buffer");
        if let Some(b) = buffer.filter(|b| !self.buffers.contains_key(&b.0)) {
            self.error(invalid_op(format!("bind_buffer: buffer {} was deleted", b.0)));
            return;
        }
        match target {
            BufferTarget::Array => self.array_buffer = buffer,
            BufferTarget::ElementArray => self.element_buffer = buffer,
        }
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], _usage: BufferUsage) {
        self.record("buffer_data");
        let bound = match target {
            BufferTarget::Array => self.array_buffer,
            BufferTarget::ElementArray => self.element_buffer,
        };
        match bound.and_then(|b| self.buffers.get_mut(&b.0)) {
            Some(store) => *store = data.to_vec(),
            None => self.error(invalid_op(format!("buffer_data: nothing bound to {target:?}"))),
        }
    }

    fn delete_buffer(&mut self, buffer: SoftBuffer) {
        self.record("delete_buffer");
        if self.buffers.remove(&buffer.0).is_none() {
            self.error(ContextError::InvalidValue(format!("delete_buffer: unknown buffer {}", buffer.0)));
            return;
        }
        if self.array_buffer == Some(buffer) {
            self.array_buffer = None;
        }
        if self.element_buffer == Some(buffer) {
            self.element_buffer = None;
        }
    }

    fn create_texture(&mut self) -> Result<SoftTexture, String> {
        self.record("create_texture");
        let name = self.allocate("texture")?;
        self.textures.insert(name, TextureSlot::default());
        Ok(SoftTexture(name))
    }

    fn active_texture(&mut self, unit: u32) {
        self.record("active_texture");
        if unit as usize >= MAX_TEXTURE_UNITS {
            self.error(ContextError::InvalidEnum(format!("active_texture: unit {unit}")));
            return;
        }
        self.active_unit = unit as usize;
    }

    fn bind_texture(&mut self, texture: Option<SoftTexture>) {
        self.record("bind_texture");
        if let Some(t) = texture.filter(|t| !self.textures.contains_key(&t.0)) {
            self.error(invalid_op(format!("bind_texture: texture {} was deleted", t.0)));
            return;
        }
        self.units[self.active_unit] = texture;
    }

    fn tex_parameter(&mut self, parameter: TextureParameter) {
        self.record("tex_parameter");
        if let TextureParameter::MagFilter(filter) = parameter {
            if filter.uses_mipmaps() {
                self.error(ContextError::InvalidEnum(format!("tex_parameter: {filter:?} is not a magnification filter")));
                return;
            }
        }
        let Some(slot) = self.bound_texture_mut("tex_parameter") else {
            return;
        };
        match parameter {
            TextureParameter::WrapS(mode) => slot.wrap_s = mode,
            TextureParameter::WrapT(mode) => slot.wrap_t = mode,
            TextureParameter::MinFilter(filter) => slot.min_filter = filter,
            TextureParameter::MagFilter(filter) => slot.mag_filter = filter,
        }
    }

    fn tex_image_2d(&mut self, width: u32, height: u32, format: PixelFormat, pixels: &[u8]) {
        self.record("tex_image_2d");
        let needed = width as usize * height as usize * format.bytes_per_pixel();
        if pixels.len() < needed {
            self.error(invalid_op(format!(
                "tex_image_2d: {width}x{height} needs {needed} bytes, got {}",
                pixels.len()
            )));
            return;
        }
        let Some(slot) = self.bound_texture_mut("tex_image_2d") else {
            return;
        };
        slot.width = width;
        slot.height = height;
        slot.format = format;
        slot.texels = pixels[..needed].to_vec();
    }

    fn delete_texture(&mut self, texture: SoftTexture) {
        self.record("delete_texture");
        if self.textures.remove(&texture.0).is_none() {
            self.error(ContextError::InvalidValue(format!("delete_texture: unknown texture {}", texture.0)));
            return;
        }
        for unit in self.units.iter_mut().filter(|u| **u == Some(texture)) {
            *unit = None;
        }
    }

    fn viewport(&mut self, viewport: Viewport) {
        self.record("viewport");
        self.viewport = viewport;
    }

    fn clear_color(&mut self, color: Color) {
        self.record("clear_color");
        self.clear_color = color.clamped();
    }

    fn clear(&mut self) {
        self.record("clear");
        let fill = self.clear_color.to_array();
        self.pixels.fill(fill);
    }

    fn enable(&mut self, capability: Capability) {
        self.record("enable");
        match capability {
            Capability::CullFace => self.cull_face = true,
        }
    }

    fn disable(&mut self, capability: Capability) {
        self.record("disable");
        match capability {
            Capability::CullFace => self.cull_face = false,
        }
    }

    fn draw_elements(&mut self, mode: PrimitiveType, count: usize, index_type: IndexType, offset: usize) {
        self.record("draw_elements");
        if count == 0 {
            return;
        }
        if let Err(err) = self.draw(mode, count, index_type, offset) {
            self.error(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = "
        attribute vec2 a_position;
        attribute vec4 a_color;
        varying vec4 v_color;
        void main() {
            v_color = a_color;
            gl_Position = vec4(a_position, 0.0, 1.0);
        }";

    const FS: &str = "
        precision mediump float;
        varying vec4 v_color;
        void main() { gl_FragColor = v_color; }";

    fn compiled(ctx: &mut SoftContext, stage: ShaderStage, src: &str) -> SoftShader {
        let shader = ctx.create_shader(stage).unwrap();
        ctx.shader_source(shader, src);
        ctx.compile_shader(shader);
        assert!(ctx.shader_compile_status(shader), "{}", ctx.shader_info_log(shader));
        shader
    }

    fn linked(ctx: &mut SoftContext, vs: &str, fs: &str) -> SoftProgram {
        let v = compiled(ctx, ShaderStage::Vertex, vs);
        let f = compiled(ctx, ShaderStage::Fragment, fs);
        let program = ctx.create_program().unwrap();
        ctx.attach_shader(program, v);
        ctx.attach_shader(program, f);
        ctx.link_program(program);
        assert!(ctx.program_link_status(program), "{}", ctx.program_info_log(program));
        ctx.detach_shader(program, v);
        ctx.detach_shader(program, f);
        ctx.delete_shader(v);
        ctx.delete_shader(f);
        program
    }

    fn upload(ctx: &mut SoftContext, target: BufferTarget, bytes: &[u8]) -> SoftBuffer {
        let buffer = ctx.create_buffer().unwrap();
        ctx.bind_buffer(target, Some(buffer));
        ctx.buffer_data(target, bytes, BufferUsage::StaticDraw);
        buffer
    }

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// Full-viewport quad in the given solid vertex color.
    fn draw_fullscreen(ctx: &mut SoftContext, rgba: [u8; 4]) {
        let program = linked(ctx, VS, FS);
        ctx.use_program(Some(program));

        let pos = ctx.attrib_location(program, "a_position").unwrap();
        let col = ctx.attrib_location(program, "a_color").unwrap();

        upload(ctx, BufferTarget::Array, &f32_bytes(&[-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0]));
        ctx.enable_vertex_attrib_array(pos);
        ctx.vertex_attrib_pointer(pos, 2, ComponentType::Float, false, 0, 0);

        upload(ctx, BufferTarget::Array, &rgba.repeat(4));
        ctx.enable_vertex_attrib_array(col);
        ctx.vertex_attrib_pointer(col, 4, ComponentType::UnsignedByte, true, 0, 0);

        upload(ctx, BufferTarget::ElementArray, &[0, 1, 2, 2, 1, 3]);
        ctx.draw_elements(PrimitiveType::Triangles, 6, IndexType::UnsignedByte, 0);
    }

    #[test]
    fn fullscreen_quad_covers_every_pixel() {
        let mut ctx = SoftContext::new(8, 6);
        ctx.enable(Capability::CullFace);
        draw_fullscreen(&mut ctx, [0, 255, 0, 255]);
        assert!(ctx.take_errors().is_empty());
        for y in 0..6 {
            for x in 0..8 {
                assert_eq!(ctx.read_pixel(x, y), Some(Color::GREEN), "pixel {x},{y}");
            }
        }
    }

    #[test]
    fn clear_fills_with_clamped_color() {
        let mut ctx = SoftContext::new(2, 2);
        ctx.clear_color(Color::new(0.0, 0.0, 0.0, 255.0));
        ctx.clear();
        assert_eq!(ctx.read_pixel(1, 1), Some(Color::BLACK));
        assert_eq!(ctx.snapshot().get_pixel(0, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn attached_shader_deletion_is_deferred() {
        let mut ctx = SoftContext::new(1, 1);
        let v = compiled(&mut ctx, ShaderStage::Vertex, VS);
        let f = compiled(&mut ctx, ShaderStage::Fragment, FS);
        let program = ctx.create_program().unwrap();
        ctx.attach_shader(program, v);
        ctx.attach_shader(program, f);
        ctx.delete_shader(v);
        assert_eq!(ctx.live_shaders(), 2);
        ctx.delete_program(program);
        assert_eq!(ctx.live_shaders(), 1);
        ctx.delete_shader(f);
        assert_eq!(ctx.live_shaders(), 0);
        assert_eq!(ctx.live_programs(), 0);
    }

    #[test]
    fn current_program_deletion_is_deferred() {
        let mut ctx = SoftContext::new(1, 1);
        let program = linked(&mut ctx, VS, FS);
        ctx.use_program(Some(program));
        ctx.delete_program(program);
        assert_eq!(ctx.live_programs(), 1);
        ctx.use_program(None);
        assert_eq!(ctx.live_programs(), 0);
    }

    #[test]
    fn unused_attribute_has_no_location() {
        let mut ctx = SoftContext::new(1, 1);
        let vs = "attribute vec2 a_position; attribute vec2 a_uv;
            void main() { gl_Position = vec4(a_position, 0.0, 1.0); }";
        let fs = "precision mediump float; void main() { gl_FragColor = vec4(1.0); }";
        let program = linked(&mut ctx, vs, fs);
        assert_eq!(ctx.attrib_location(program, "a_position"), Some(0));
        assert_eq!(ctx.attrib_location(program, "a_uv"), None);
    }

    #[test]
    fn pointer_without_array_buffer_is_rejected() {
        let mut ctx = SoftContext::new(1, 1);
        ctx.vertex_attrib_pointer(0, 2, ComponentType::Float, false, 0, 0);
        assert!(matches!(ctx.take_errors().as_slice(), [ContextError::InvalidOperation(_)]));
    }

    #[test]
    fn misaligned_offset_is_rejected() {
        let mut ctx = SoftContext::new(1, 1);
        upload(&mut ctx, BufferTarget::Array, &[0; 16]);
        ctx.vertex_attrib_pointer(0, 2, ComponentType::Float, false, 16, 2);
        assert!(matches!(ctx.take_errors().as_slice(), [ContextError::InvalidOperation(_)]));
    }

    #[test]
    fn out_of_range_index_rejects_the_draw() {
        let mut ctx = SoftContext::new(4, 4);
        let program = linked(&mut ctx, VS, FS);
        ctx.use_program(Some(program));
        upload(&mut ctx, BufferTarget::Array, &f32_bytes(&[0.0; 6]));
        ctx.enable_vertex_attrib_array(0);
        ctx.vertex_attrib_pointer(0, 2, ComponentType::Float, false, 0, 0);
        upload(&mut ctx, BufferTarget::ElementArray, &[0, 1, 9]);
        ctx.draw_elements(PrimitiveType::Triangles, 3, IndexType::UnsignedByte, 0);
        let errors = ctx.take_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("past the end"), "{}", errors[0]);
    }

    #[test]
    fn draw_without_program_is_an_error() {
        let mut ctx = SoftContext::new(1, 1);
        upload(&mut ctx, BufferTarget::ElementArray, &[0, 1, 2]);
        ctx.draw_elements(PrimitiveType::Triangles, 3, IndexType::UnsignedByte, 0);
        assert_eq!(ctx.take_errors().len(), 1);
    }

    #[test]
    fn disabled_arrays_read_the_default_attribute() {
        let mut ctx = SoftContext::new(4, 4);
        let vs = "attribute vec2 a_position; attribute vec4 a_color; varying vec4 v_color;
            void main() { v_color = a_color; gl_Position = vec4(a_position, 0.0, 1.0); }";
        let program = linked(&mut ctx, vs, FS);
        ctx.use_program(Some(program));
        upload(&mut ctx, BufferTarget::Array, &f32_bytes(&[-1.0, -1.0, 3.0, -1.0, -1.0, 3.0]));
        ctx.enable_vertex_attrib_array(0);
        ctx.vertex_attrib_pointer(0, 2, ComponentType::Float, false, 0, 0);
        upload(&mut ctx, BufferTarget::ElementArray, &[0, 1, 2]);
        ctx.draw_elements(PrimitiveType::Triangles, 3, IndexType::UnsignedByte, 0);
        assert!(ctx.take_errors().is_empty());
        assert_eq!(ctx.read_pixel(2, 2), Some(Color::new(0.0, 0.0, 0.0, 1.0)));
    }

    #[test]
    fn object_limit_fails_creation() {
        let mut ctx = SoftContext::new(1, 1);
        ctx.limit_objects(Some(1));
        ctx.create_texture().unwrap();
        assert!(ctx.create_buffer().is_err());
    }

    #[test]
    fn texture_parameters_need_a_bound_texture() {
        let mut ctx = SoftContext::new(1, 1);
        ctx.tex_parameter(TextureParameter::WrapS(TextureWrap::ClampToEdge));
        assert_eq!(ctx.take_errors().len(), 1);

        let texture = ctx.create_texture().unwrap();
        ctx.bind_texture(Some(texture));
        ctx.tex_parameter(TextureParameter::MagFilter(TextureFilter::LinearMipmapLinear));
        assert!(matches!(ctx.take_errors().as_slice(), [ContextError::InvalidEnum(_)]));
    }

    #[test]
    fn call_trace_records_state_changes() {
        let mut ctx = SoftContext::new(1, 1);
        ctx.enable_call_trace();
        ctx.viewport(Viewport::sized(1, 1));
        ctx.clear();
        assert_eq!(ctx.take_call_trace(), vec!["viewport", "clear"]);
        assert!(ctx.take_call_trace().is_empty());
    }
}
