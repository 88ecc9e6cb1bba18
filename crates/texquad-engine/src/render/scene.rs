//! The textured, per-vertex-colored quad.

use anyhow::{Context, Result};

use crate::device::{ComponentType, GraphicsContext};
use crate::layout::{
    GpuVertexLayout, IndexBuffer, IndexData, LayoutError, PosUvVertex, VertexLayout, VertexLayoutBuilder,
};
use crate::paint::Color;
use crate::pipeline::{ProgramLinker, ProgramObject, ShaderSource};
use crate::texture::{PixelBuffer, TextureResource, TextureUploader};

use super::config::RendererConfig;
use super::frame::{DrawCommand, FrameRenderer};

pub const POSITION_ATTRIBUTE: &str = "a_position";
pub const UV_ATTRIBUTE: &str = "a_uv";
pub const COLOR_ATTRIBUTE: &str = "a_color";
pub const SAMPLER_UNIFORM: &str = "mainTexture";

pub const VERTEX_SHADER: &str = "\
attribute vec2 a_position;
attribute vec2 a_uv;
attribute vec4 a_color;

varying vec2 v_uv;
varying vec4 v_color;

void main() {
    v_uv = a_uv;
    v_color = a_color;
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

pub const FRAGMENT_SHADER: &str = "\
precision mediump float;

uniform sampler2D mainTexture;

varying vec2 v_uv;
varying vec4 v_color;

void main() {
    gl_FragColor = texture2D(mainTexture, v_uv) * v_color;
}
";

pub const ORANGE: [u8; 4] = [255, 127, 0, 255];

// ── geometry ──────────────────────────────────────────────────────────────

/// Quad vertices, their RGBA8 colors and the triangle list over them.
///
/// Positions and UVs go into one interleaved buffer; colors into a second,
/// tightly packed one.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadGeometry {
    pub vertices: Vec<PosUvVertex>,
    pub colors: Vec<[u8; 4]>,
    pub indices: Vec<u32>,
}

impl Default for QuadGeometry {
    fn default() -> Self {
        Self {
            vertices: vec![
                PosUvVertex { position: [0.0, 0.0], uv: [0.0, 0.0] },
                PosUvVertex { position: [0.7, 0.0], uv: [1.0, 0.0] },
                PosUvVertex { position: [0.0, 0.5], uv: [0.0, 1.0] },
                PosUvVertex { position: [0.7, 0.5], uv: [1.0, 1.0] },
            ],
            colors: vec![
                Color::RED.to_rgba8(),
                Color::GREEN.to_rgba8(),
                Color::BLUE.to_rgba8(),
                ORANGE,
            ],
            indices: vec![0, 1, 2, 2, 1, 3],
        }
    }
}

impl QuadGeometry {
    pub fn vertex_layout(&self) -> Result<VertexLayout, LayoutError> {
        VertexLayoutBuilder::new()
            .vertices("quad", &self.vertices)
            .attribute(POSITION_ATTRIBUTE, 2, ComponentType::Float, false, PosUvVertex::STRIDE, PosUvVertex::POSITION_OFFSET)
            .attribute(UV_ATTRIBUTE, 2, ComponentType::Float, false, PosUvVertex::STRIDE, PosUvVertex::UV_OFFSET)
            .vertices("colors", &self.colors)
            .attribute(COLOR_ATTRIBUTE, 4, ComponentType::UnsignedByte, true, 0, 0)
            .build()
    }

    pub fn index_data(&self) -> Result<IndexData, LayoutError> {
        IndexData::new(&self.indices)
    }
}

// ── scene ─────────────────────────────────────────────────────────────────

/// Every context object the quad needs, built once and drawn many times.
pub struct QuadScene<C: GraphicsContext> {
    program: ProgramObject<C::Program>,
    vertices: GpuVertexLayout<C::Buffer>,
    indices: IndexBuffer<C::Buffer>,
    texture: TextureResource<C::Texture>,
    renderer: FrameRenderer,
}

impl<C: GraphicsContext> QuadScene<C> {
    /// Builds the default quad textured with `image`.
    pub fn new(ctx: &mut C, config: RendererConfig, image: &PixelBuffer) -> Result<Self> {
        Self::build(ctx, config, &QuadGeometry::default(), image)
    }

    /// Compiles the shaders, uploads `geometry` and `image`, and keeps the
    /// results. Anything created before a failing step is released.
    pub fn build(ctx: &mut C, config: RendererConfig, geometry: &QuadGeometry, image: &PixelBuffer) -> Result<Self> {
        let layout = geometry.vertex_layout().context("invalid quad vertex layout")?;
        let index_data = geometry.index_data().context("invalid quad indices")?;
        if let Some(&bad) = geometry.indices.iter().find(|&&i| i as usize >= layout.vertex_count()) {
            anyhow::bail!("index {bad} is out of range for {} vertices", layout.vertex_count());
        }

        let program = ProgramLinker::build(
            ctx,
            &ShaderSource::vertex(VERTEX_SHADER),
            &ShaderSource::fragment(FRAGMENT_SHADER),
        )
        .context("failed to build the quad program")?;

        let vertices = match layout.upload(ctx) {
            Ok(vertices) => vertices,
            Err(err) => {
                program.release(ctx);
                return Err(err).context("failed to upload quad vertices");
            }
        };

        let indices = match index_data.upload(ctx) {
            Ok(indices) => indices,
            Err(err) => {
                vertices.release(ctx);
                program.release(ctx);
                return Err(err).context("failed to upload quad indices");
            }
        };

        let texture = match TextureUploader::upload(ctx, image) {
            Ok(texture) => texture,
            Err(err) => {
                indices.release(ctx);
                vertices.release(ctx);
                program.release(ctx);
                return Err(err).context("failed to upload quad texture");
            }
        };

        log::info!(
            "quad scene ready: {} vertices, {} indices, {}x{} texture",
            vertices.vertex_count(),
            indices.count(),
            image.width(),
            image.height()
        );
        Ok(Self { program, vertices, indices, texture, renderer: FrameRenderer::new(config) })
    }

    #[inline]
    pub fn renderer(&self) -> &FrameRenderer {
        &self.renderer
    }

    #[inline]
    pub fn renderer_mut(&mut self) -> &mut FrameRenderer {
        &mut self.renderer
    }

    /// Clears the target and draws the quad.
    pub fn draw(&self, ctx: &mut C) {
        let command = DrawCommand::triangles(&self.indices);
        self.renderer
            .draw_frame(ctx, &self.program, &self.vertices, &self.indices, &self.texture, command);
    }

    /// Deletes every context object the scene owns.
    pub fn release(self, ctx: &mut C) {
        ctx.use_program(None);
        self.texture.release(ctx);
        self.indices.release(ctx);
        self.vertices.release(ctx);
        self.program.release(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Viewport;
    use crate::device::SoftContext;
    use crate::logging::{LoggingConfig, init_logging};

    fn magenta_scene(ctx: &mut SoftContext) -> QuadScene<SoftContext> {
        init_logging(LoggingConfig::for_tests());
        let config = RendererConfig { viewport: Viewport::sized(401, 301), ..Default::default() };
        QuadScene::new(ctx, config, &PixelBuffer::solid(Color::MAGENTA)).unwrap()
    }

    #[test]
    fn first_vertex_is_texture_times_vertex_color() {
        let mut ctx = SoftContext::new(401, 301);
        let scene = magenta_scene(&mut ctx);
        scene.draw(&mut ctx);
        assert!(ctx.take_errors().is_empty());

        // NDC (0, 0) is the center of pixel (200, 150) in a 401×301 viewport.
        assert_eq!(ctx.read_pixel(200, 150), Some(Color::MAGENTA * Color::RED));
        assert_eq!(ctx.read_pixel(200, 150), Some(Color::RED));
        assert_eq!(ctx.read_pixel(10, 10), Some(Color::BLACK));
        assert_eq!(ctx.read_pixel(380, 280), Some(Color::BLACK));

        // Inside the quad every fragment is some mix of the vertex colors
        // with the texture's zero green channel.
        let inside = ctx.read_pixel(270, 190).unwrap();
        assert_eq!(inside.g, 0.0);
        assert_eq!(inside.a, 1.0);

        scene.release(&mut ctx);
        assert_eq!(
            (ctx.live_shaders(), ctx.live_programs(), ctx.live_buffers(), ctx.live_textures()),
            (0, 0, 0, 0)
        );
    }

    #[test]
    fn drawing_twice_is_idempotent() {
        let mut ctx = SoftContext::new(401, 301);
        let scene = magenta_scene(&mut ctx);
        scene.draw(&mut ctx);
        let first = ctx.snapshot();
        scene.draw(&mut ctx);
        assert_eq!(first, ctx.snapshot());
        assert!(ctx.take_errors().is_empty());
    }

    #[test]
    fn geometry_defaults() {
        let geometry = QuadGeometry::default();
        let layout = geometry.vertex_layout().unwrap();
        assert_eq!(layout.vertex_count(), 4);
        assert_eq!(layout.read(COLOR_ATTRIBUTE, 3), Some([1.0, 127.0 / 255.0, 0.0, 1.0]));
        assert_eq!(layout.read(POSITION_ATTRIBUTE, 1), Some([0.7, 0.0, 0.0, 1.0]));
        assert_eq!(geometry.index_data().unwrap().index_type(), crate::device::IndexType::UnsignedByte);
    }

    #[test]
    fn out_of_range_index_is_rejected_before_any_upload() {
        let mut ctx = SoftContext::new(4, 4);
        let geometry = QuadGeometry { indices: vec![0, 1, 4], ..Default::default() };
        let err = QuadScene::build(&mut ctx, RendererConfig::default(), &geometry, &PixelBuffer::solid(Color::WHITE))
            .err()
            .unwrap();
        assert!(err.to_string().contains("out of range"), "{err}");
        assert_eq!(ctx.live_programs(), 0);
    }

    #[test]
    fn failed_upload_releases_earlier_objects() {
        let mut ctx = SoftContext::new(4, 4);
        // program + two vertex buffers + index buffer fit; the texture does not
        ctx.limit_objects(Some(4));
        let err = QuadScene::new(&mut ctx, RendererConfig::default(), &PixelBuffer::solid(Color::WHITE))
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("texture"), "{err:#}");
        assert_eq!(
            (ctx.live_shaders(), ctx.live_programs(), ctx.live_buffers(), ctx.live_textures()),
            (0, 0, 0, 0)
        );
    }
}
