use std::fmt::Debug;

use crate::coords::Viewport;
use crate::paint::Color;

use super::types::{
    BufferTarget, BufferUsage, Capability, ComponentType, IndexType, PixelFormat, PrimitiveType,
    ShaderStage, TextureParameter,
};

/// GL-style graphics context the pipeline drives.
///
/// The model is the classic bind-to-edit state machine: buffers, the program
/// and textures are made current with `bind_*` / `use_program` and later
/// calls act on whatever is current. Implementations own that implicit state;
/// callers must re-assert every binding a call depends on immediately before
/// the call.
///
/// Object creation returns `Err` with a driver message when the context
/// cannot allocate. Every other call is fire-and-forget; misuse is reported
/// through the context's own error channel, never through a return value.
pub trait GraphicsContext {
    type Shader: Copy + Eq + Debug;
    type Program: Copy + Eq + Debug;
    type Buffer: Copy + Eq + Debug;
    type Texture: Copy + Eq + Debug;
    type UniformLocation: Clone + Debug;

    // ── shaders ───────────────────────────────────────────────────────────

    fn create_shader(&mut self, stage: ShaderStage) -> Result<Self::Shader, String>;
    fn shader_source(&mut self, shader: Self::Shader, source: &str);
    fn compile_shader(&mut self, shader: Self::Shader);
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&mut self, shader: Self::Shader);

    // ── programs ──────────────────────────────────────────────────────────

    fn create_program(&mut self) -> Result<Self::Program, String>;
    fn attach_shader(&mut self, program: Self::Program, shader: Self::Shader);
    fn detach_shader(&mut self, program: Self::Program, shader: Self::Shader);
    fn link_program(&mut self, program: Self::Program);
    fn program_link_status(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn delete_program(&mut self, program: Self::Program);
    fn use_program(&mut self, program: Option<Self::Program>);

    /// Location of an active attribute; `None` when absent or optimized out.
    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32>;
    /// Location of an active uniform; `None` when absent or optimized out.
    fn uniform_location(&self, program: Self::Program, name: &str) -> Option<Self::UniformLocation>;
    /// Writes an `int`/sampler uniform of the current program.
    fn uniform_1_i32(&mut self, location: &Self::UniformLocation, value: i32);
    /// Writes a `vec4` uniform of the current program.
    fn uniform_4_f32(&mut self, location: &Self::UniformLocation, value: [f32; 4]);

    // ── vertex input ──────────────────────────────────────────────────────

    fn enable_vertex_attrib_array(&mut self, index: u32);
    fn disable_vertex_attrib_array(&mut self, index: u32);
    /// Describes how attribute `index` reads the buffer currently bound to
    /// [`BufferTarget::Array`]. `stride == 0` means tightly packed.
    fn vertex_attrib_pointer(
        &mut self,
        index: u32,
        size: i32,
        ty: ComponentType,
        normalized: bool,
        stride: i32,
        offset: i32,
    );

    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(&mut self) -> Result<Self::Buffer, String>;
    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<Self::Buffer>);
    /// Replaces the store of the buffer bound to `target`.
    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage);
    fn delete_buffer(&mut self, buffer: Self::Buffer);

    // ── textures ──────────────────────────────────────────────────────────

    fn create_texture(&mut self) -> Result<Self::Texture, String>;
    /// Selects the texture unit later `bind_texture` calls affect.
    fn active_texture(&mut self, unit: u32);
    /// Binds to the `TEXTURE_2D` target of the active unit.
    fn bind_texture(&mut self, texture: Option<Self::Texture>);
    /// Sets a parameter of the texture bound to the active unit.
    fn tex_parameter(&mut self, parameter: TextureParameter);
    /// Uploads mip level 0 of the texture bound to the active unit. Row 0 of
    /// `pixels` is the bottom row (`t = 0`).
    fn tex_image_2d(&mut self, width: u32, height: u32, format: PixelFormat, pixels: &[u8]);
    fn delete_texture(&mut self, texture: Self::Texture);

    // ── framebuffer + draw ────────────────────────────────────────────────

    fn viewport(&mut self, viewport: Viewport);
    fn clear_color(&mut self, color: Color);
    /// Clears the color buffer to the current clear color.
    fn clear(&mut self);
    fn enable(&mut self, capability: Capability);
    fn disable(&mut self, capability: Capability);

    /// Draws `count` indices read from the bound element buffer starting at
    /// byte `offset`.
    fn draw_elements(&mut self, mode: PrimitiveType, count: usize, index_type: IndexType, offset: usize);
}
