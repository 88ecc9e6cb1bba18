use crate::device::{BufferTarget, Capability, GraphicsContext, IndexType, PrimitiveType};
use crate::layout::{GpuVertexLayout, IndexBuffer};
use crate::pipeline::ProgramObject;
use crate::texture::{TEXTURE_UNIT, TextureResource};

use super::config::RendererConfig;

/// One indexed draw submission.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DrawCommand {
    pub primitive: PrimitiveType,
    pub index_count: usize,
    pub index_type: IndexType,
    /// Byte offset into the bound index buffer.
    pub index_offset: usize,
}

impl DrawCommand {
    /// Draws every index of `indices` as a triangle list.
    pub fn triangles<B: Copy>(indices: &IndexBuffer<B>) -> Self {
        Self {
            primitive: PrimitiveType::Triangles,
            index_count: indices.count(),
            index_type: indices.index_type(),
            index_offset: 0,
        }
    }
}

/// Sequences program, vertex attributes, texture and index buffer into a
/// single draw.
///
/// Every binding a draw depends on is re-asserted inside [`draw_frame`],
/// so nothing carries over from whatever ran on the context before.
///
/// [`draw_frame`]: FrameRenderer::draw_frame
#[derive(Debug, Clone, Default)]
pub struct FrameRenderer {
    config: RendererConfig,
    uniforms: Vec<(String, [f32; 4])>,
}

impl FrameRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config, uniforms: Vec::new() }
    }

    /// Adds a `vec4` uniform written after the program is bound.
    pub fn with_uniform(mut self, name: impl Into<String>, value: [f32; 4]) -> Self {
        self.set_uniform(name, value);
        self
    }

    /// Sets or replaces a `vec4` uniform value.
    pub fn set_uniform(&mut self, name: impl Into<String>, value: [f32; 4]) {
        let name = name.into();
        match self.uniforms.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.uniforms.push((name, value)),
        }
    }

    #[inline]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    #[inline]
    pub fn config_mut(&mut self) -> &mut RendererConfig {
        &mut self.config
    }

    /// Clears the target and draws `command` with the given resources.
    ///
    /// Attributes the program does not use have no location and are skipped.
    pub fn draw_frame<C: GraphicsContext>(
        &self,
        ctx: &mut C,
        program: &ProgramObject<C::Program>,
        layout: &GpuVertexLayout<C::Buffer>,
        indices: &IndexBuffer<C::Buffer>,
        texture: &TextureResource<C::Texture>,
        command: DrawCommand,
    ) {
        let program = program.handle();

        ctx.viewport(self.config.viewport);
        ctx.clear_color(self.config.clear_color);
        ctx.clear();
        if self.config.cull_back_faces {
            ctx.enable(Capability::CullFace);
        } else {
            ctx.disable(Capability::CullFace);
        }

        ctx.use_program(Some(program));
        for (name, value) in &self.uniforms {
            match ctx.uniform_location(program, name) {
                Some(location) => ctx.uniform_4_f32(&location, *value),
                None => log::debug!("uniform '{name}' is not active; skipped"),
            }
        }

        // ── attributes ──
        for (attr, buffer) in layout.bindings() {
            let Some(location) = ctx.attrib_location(program, &attr.name) else {
                log::debug!("attribute '{}' is not active; skipped", attr.name);
                continue;
            };
            ctx.enable_vertex_attrib_array(location);
            ctx.bind_buffer(BufferTarget::Array, Some(buffer));
            ctx.vertex_attrib_pointer(
                location,
                attr.component_count as i32,
                attr.component_type,
                attr.normalized,
                attr.stride_bytes as i32,
                attr.offset_bytes as i32,
            );
        }

        // ── texture ──
        ctx.active_texture(TEXTURE_UNIT);
        ctx.bind_texture(Some(texture.handle()));
        match ctx.uniform_location(program, &self.config.sampler_uniform) {
            Some(location) => ctx.uniform_1_i32(&location, TEXTURE_UNIT as i32),
            None => log::debug!("sampler '{}' is not active", self.config.sampler_uniform),
        }

        // ── draw ──
        ctx.bind_buffer(BufferTarget::ElementArray, Some(indices.handle()));
        log::trace!(
            "draw_elements {:?}: {} {:?} indices at +{}",
            command.primitive,
            command.index_count,
            command.index_type,
            command.index_offset
        );
        ctx.draw_elements(command.primitive, command.index_count, command.index_type, command.index_offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Viewport;
    use crate::device::{ComponentType, SoftContext};
    use crate::layout::{IndexData, PosUvVertex, VertexLayoutBuilder};
    use crate::paint::Color;
    use crate::pipeline::{ProgramLinker, ShaderSource};
    use crate::texture::{PixelBuffer, TextureUploader};

    const VS: &str = "
        attribute vec2 a_position;
        attribute vec2 a_uv;
        void main() { gl_Position = vec4(a_position, 0.0, 1.0); }";

    const FS: &str = "
        precision mediump float;
        uniform vec4 u_tint;
        void main() { gl_FragColor = u_tint; }";

    struct Fixture {
        ctx: SoftContext,
        program: ProgramObject<<SoftContext as GraphicsContext>::Program>,
        layout: GpuVertexLayout<<SoftContext as GraphicsContext>::Buffer>,
        indices: IndexBuffer<<SoftContext as GraphicsContext>::Buffer>,
        texture: TextureResource<<SoftContext as GraphicsContext>::Texture>,
    }

    /// A full-viewport quad on a 4×4 target, wound counter-clockwise unless
    /// `clockwise`.
    fn fixture(clockwise: bool) -> Fixture {
        let mut ctx = SoftContext::new(4, 4);
        let program =
            ProgramLinker::build(&mut ctx, &ShaderSource::vertex(VS), &ShaderSource::fragment(FS)).unwrap();
        let quad = [
            PosUvVertex { position: [-1.0, -1.0], uv: [0.0, 0.0] },
            PosUvVertex { position: [1.0, -1.0], uv: [1.0, 0.0] },
            PosUvVertex { position: [-1.0, 1.0], uv: [0.0, 1.0] },
            PosUvVertex { position: [1.0, 1.0], uv: [1.0, 1.0] },
        ];
        let layout = VertexLayoutBuilder::new()
            .vertices("quad", &quad)
            .attribute("a_position", 2, ComponentType::Float, false, 16, 0)
            .attribute("a_uv", 2, ComponentType::Float, false, 16, 8)
            .build()
            .unwrap()
            .upload(&mut ctx)
            .unwrap();
        let order: &[u32] = if clockwise { &[0, 2, 1, 2, 3, 1] } else { &[0, 1, 2, 2, 1, 3] };
        let indices = IndexData::new(order).unwrap().upload(&mut ctx).unwrap();
        let texture = TextureUploader::upload(&mut ctx, &PixelBuffer::solid(Color::WHITE)).unwrap();
        Fixture { ctx, program, layout, indices, texture }
    }

    fn renderer() -> FrameRenderer {
        FrameRenderer::new(RendererConfig { viewport: Viewport::sized(4, 4), ..Default::default() })
            .with_uniform("u_tint", [0.0, 1.0, 0.0, 1.0])
    }

    impl Fixture {
        fn draw(&mut self, renderer: &FrameRenderer) {
            let command = DrawCommand::triangles(&self.indices);
            renderer.draw_frame(&mut self.ctx, &self.program, &self.layout, &self.indices, &self.texture, command);
        }
    }

    #[test]
    fn inactive_attribute_is_not_an_error() {
        let mut f = fixture(false);
        assert_eq!(f.ctx.attrib_location(f.program.handle(), "a_uv"), None);
        f.draw(&renderer());
        assert!(f.ctx.take_errors().is_empty());
        assert_eq!(f.ctx.read_pixel(1, 2), Some(Color::GREEN));
    }

    #[test]
    fn vec4_uniforms_are_written_after_binding() {
        let mut f = fixture(false);
        let renderer = renderer().with_uniform("u_tint", [0.0, 0.0, 1.0, 1.0]).with_uniform("u_missing", [1.0; 4]);
        f.draw(&renderer);
        assert!(f.ctx.take_errors().is_empty());
        assert_eq!(f.ctx.read_pixel(3, 3), Some(Color::BLUE));
    }

    #[test]
    fn back_faces_are_culled_when_enabled() {
        let mut f = fixture(true);
        f.draw(&renderer());
        assert_eq!(f.ctx.read_pixel(1, 1), Some(Color::BLACK));

        let mut two_sided = renderer();
        two_sided.config_mut().cull_back_faces = false;
        f.draw(&two_sided);
        assert_eq!(f.ctx.read_pixel(1, 1), Some(Color::GREEN));
        assert!(f.ctx.take_errors().is_empty());
    }

    #[test]
    fn call_order_is_fixed() {
        let mut f = fixture(false);
        f.ctx.enable_call_trace();
        f.draw(&renderer());
        assert_eq!(
            f.ctx.take_call_trace(),
            vec![
                "viewport",
                "clear_color",
                "clear",
                "enable",
                "use_program",
                "uniform_4_f32",
                "enable_vertex_attrib_array",
                "bind_buffer",
                "vertex_attrib_pointer",
                "active_texture",
                "bind_texture",
                "bind_buffer",
                "draw_elements",
            ]
        );
    }

    #[test]
    fn clear_color_comes_from_config() {
        let mut f = fixture(false);
        let mut renderer = renderer();
        renderer.config_mut().viewport = Viewport::new(0, 0, 2, 2);
        renderer.config_mut().clear_color = Color::new(0.0, 0.0, 0.0, 1.0);
        f.draw(&renderer);
        assert_eq!(f.ctx.read_pixel(0, 0), Some(Color::GREEN));
        assert_eq!(f.ctx.read_pixel(3, 3), Some(Color::BLACK));
    }
}
