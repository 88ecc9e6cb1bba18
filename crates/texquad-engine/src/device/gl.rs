//! [`GraphicsContext`] over a real OpenGL / GLES / WebGL context via `glow`.

use glow::HasContext;

use crate::coords::Viewport;
use crate::paint::Color;

use super::context::GraphicsContext;
use super::types::{
    BufferTarget, BufferUsage, Capability, ComponentType, IndexType, PixelFormat, PrimitiveType,
    ShaderStage, TextureFilter, TextureParameter, TextureWrap,
};

fn stage_enum(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

fn target_enum(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Array => glow::ARRAY_BUFFER,
        BufferTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
    }
}

fn usage_enum(usage: BufferUsage) -> u32 {
    match usage {
        BufferUsage::StaticDraw => glow::STATIC_DRAW,
        BufferUsage::DynamicDraw => glow::DYNAMIC_DRAW,
        BufferUsage::StreamDraw => glow::STREAM_DRAW,
    }
}

fn component_enum(ty: ComponentType) -> u32 {
    match ty {
        ComponentType::Byte => glow::BYTE,
        ComponentType::UnsignedByte => glow::UNSIGNED_BYTE,
        ComponentType::Short => glow::SHORT,
        ComponentType::UnsignedShort => glow::UNSIGNED_SHORT,
        ComponentType::Float => glow::FLOAT,
    }
}

fn index_enum(ty: IndexType) -> u32 {
    match ty {
        IndexType::UnsignedByte => glow::UNSIGNED_BYTE,
        IndexType::UnsignedShort => glow::UNSIGNED_SHORT,
    }
}

fn primitive_enum(mode: PrimitiveType) -> u32 {
    match mode {
        PrimitiveType::Triangles => glow::TRIANGLES,
        PrimitiveType::TriangleStrip => glow::TRIANGLE_STRIP,
        PrimitiveType::TriangleFan => glow::TRIANGLE_FAN,
    }
}

fn wrap_enum(mode: TextureWrap) -> i32 {
    (match mode {
        TextureWrap::ClampToEdge => glow::CLAMP_TO_EDGE,
        TextureWrap::Repeat => glow::REPEAT,
        TextureWrap::MirroredRepeat => glow::MIRRORED_REPEAT,
    }) as i32
}

fn filter_enum(filter: TextureFilter) -> i32 {
    (match filter {
        TextureFilter::Nearest => glow::NEAREST,
        TextureFilter::Linear => glow::LINEAR,
        TextureFilter::NearestMipmapNearest => glow::NEAREST_MIPMAP_NEAREST,
        TextureFilter::LinearMipmapNearest => glow::LINEAR_MIPMAP_NEAREST,
        TextureFilter::NearestMipmapLinear => glow::NEAREST_MIPMAP_LINEAR,
        TextureFilter::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
    }) as i32
}

fn capability_enum(capability: Capability) -> u32 {
    match capability {
        Capability::CullFace => glow::CULL_FACE,
    }
}

/// Owns a `glow::Context` plus the vertex array object core profiles need.
pub struct GlowContext {
    gl: glow::Context,
    vao: Option<glow::VertexArray>,
}

impl GlowContext {
    /// Wraps `gl` and binds a default vertex array on GL 3+ / GLES 3+ contexts.
    ///
    /// # Safety
    /// `gl` must be current on this thread for the lifetime of the returned value.
    pub unsafe fn new(gl: glow::Context) -> Result<Self, String> {
        let vao = if gl.version().major >= 3 {
            let vao = unsafe { gl.create_vertex_array()? };
            unsafe { gl.bind_vertex_array(Some(vao)) };
            Some(vao)
        } else {
            None
        };
        log::info!("glow context: {:?}", gl.version());
        Ok(Self { gl, vao })
    }

    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }
}

impl Drop for GlowContext {
    fn drop(&mut self) {
        if let Some(vao) = self.vao.take() {
            unsafe { self.gl.delete_vertex_array(vao) };
        }
    }
}

// SAFETY (all blocks below): `GlowContext::new` requires the context to be current.
impl GraphicsContext for GlowContext {
    type Shader = glow::Shader;
    type Program = glow::Program;
    type Buffer = glow::Buffer;
    type Texture = glow::Texture;
    type UniformLocation = glow::UniformLocation;

    fn create_shader(&mut self, stage: ShaderStage) -> Result<glow::Shader, String> {
        unsafe { self.gl.create_shader(stage_enum(stage)) }
    }

    fn shader_source(&mut self, shader: glow::Shader, source: &str) {
        unsafe { self.gl.shader_source(shader, source) }
    }

    fn compile_shader(&mut self, shader: glow::Shader) {
        unsafe { self.gl.compile_shader(shader) }
    }

    fn shader_compile_status(&self, shader: glow::Shader) -> bool {
        unsafe { self.gl.get_shader_compile_status(shader) }
    }

    fn shader_info_log(&self, shader: glow::Shader) -> String {
        unsafe { self.gl.get_shader_info_log(shader) }
    }

    fn delete_shader(&mut self, shader: glow::Shader) {
        unsafe { self.gl.delete_shader(shader) }
    }

    fn create_program(&mut self) -> Result<glow::Program, String> {
        unsafe { self.gl.create_program() }
    }

    fn attach_shader(&mut self, program: glow::Program, shader: glow::Shader) {
        unsafe { self.gl.attach_shader(program, shader) }
    }

    fn detach_shader(&mut self, program: glow::Program, shader: glow::Shader) {
        unsafe { self.gl.detach_shader(program, shader) }
    }

    fn link_program(&mut self, program: glow::Program) {
        unsafe { self.gl.link_program(program) }
    }

    fn program_link_status(&self, program: glow::Program) -> bool {
        unsafe { self.gl.get_program_link_status(program) }
    }

    fn program_info_log(&self, program: glow::Program) -> String {
        unsafe { self.gl.get_program_info_log(program) }
    }

    fn delete_program(&mut self, program: glow::Program) {
        unsafe { self.gl.delete_program(program) }
    }

    fn use_program(&mut self, program: Option<glow::Program>) {
        unsafe { self.gl.use_program(program) }
    }

    fn attrib_location(&self, program: glow::Program, name: &str) -> Option<u32> {
        unsafe { self.gl.get_attrib_location(program, name) }
    }

    fn uniform_location(&self, program: glow::Program, name: &str) -> Option<glow::UniformLocation> {
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn uniform_1_i32(&mut self, location: &glow::UniformLocation, value: i32) {
        unsafe { self.gl.uniform_1_i32(Some(location), value) }
    }

    fn uniform_4_f32(&mut self, location: &glow::UniformLocation, [x, y, z, w]: [f32; 4]) {
        unsafe { self.gl.uniform_4_f32(Some(location), x, y, z, w) }
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) }
    }

    fn disable_vertex_attrib_array(&mut self, index: u32) {
        unsafe { self.gl.disable_vertex_attrib_array(index) }
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
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(index, size, component_enum(ty), normalized, stride, offset)
        }
    }

    fn create_buffer(&mut self) -> Result<glow::Buffer, String> {
        unsafe { self.gl.create_buffer() }
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<glow::Buffer>) {
        unsafe { self.gl.bind_buffer(target_enum(target), buffer) }
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        unsafe { self.gl.buffer_data_u8_slice(target_enum(target), data, usage_enum(usage)) }
    }

    fn delete_buffer(&mut self, buffer: glow::Buffer) {
        unsafe { self.gl.delete_buffer(buffer) }
    }

    fn create_texture(&mut self) -> Result<glow::Texture, String> {
        unsafe { self.gl.create_texture() }
    }

    fn active_texture(&mut self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) }
    }

    fn bind_texture(&mut self, texture: Option<glow::Texture>) {
        unsafe { self.gl.bind_texture(glow::TEXTURE_2D, texture) }
    }

    fn tex_parameter(&mut self, parameter: TextureParameter) {
        let (name, value) = match parameter {
            TextureParameter::WrapS(mode) => (glow::TEXTURE_WRAP_S, wrap_enum(mode)),
            TextureParameter::WrapT(mode) => (glow::TEXTURE_WRAP_T, wrap_enum(mode)),
            TextureParameter::MinFilter(filter) => (glow::TEXTURE_MIN_FILTER, filter_enum(filter)),
            TextureParameter::MagFilter(filter) => (glow::TEXTURE_MAG_FILTER, filter_enum(filter)),
        };
        unsafe { self.gl.tex_parameter_i32(glow::TEXTURE_2D, name, value) }
    }

    fn tex_image_2d(&mut self, width: u32, height: u32, format: PixelFormat, pixels: &[u8]) {
        let (internal, external) = match format {
            PixelFormat::Rgba8 => (glow::RGBA as i32, glow::RGBA),
        };
        unsafe {
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal,
                width as i32,
                height as i32,
                0,
                external,
                glow::UNSIGNED_BYTE,
                Some(pixels),
            );
        }
    }

    fn delete_texture(&mut self, texture: glow::Texture) {
        unsafe { self.gl.delete_texture(texture) }
    }

    fn viewport(&mut self, viewport: Viewport) {
        unsafe {
            self.gl
                .viewport(viewport.x, viewport.y, viewport.width as i32, viewport.height as i32)
        }
    }

    fn clear_color(&mut self, color: Color) {
        unsafe { self.gl.clear_color(color.r, color.g, color.b, color.a) }
    }

    fn clear(&mut self) {
        unsafe { self.gl.clear(glow::COLOR_BUFFER_BIT) }
    }

    fn enable(&mut self, capability: Capability) {
        unsafe { self.gl.enable(capability_enum(capability)) }
    }

    fn disable(&mut self, capability: Capability) {
        unsafe { self.gl.disable(capability_enum(capability)) }
    }

    fn draw_elements(&mut self, mode: PrimitiveType, count: usize, index_type: IndexType, offset: usize) {
        unsafe {
            self.gl
                .draw_elements(primitive_enum(mode), count as i32, index_enum(index_type), offset as i32)
        }
    }
}
