use crate::device::{GraphicsContext, PixelFormat, TextureFilter, TextureParameter, TextureWrap};
use crate::pipeline::PipelineError;

use super::pixels::PixelBuffer;

/// Texture unit every upload and draw uses.
pub const TEXTURE_UNIT: u32 = 0;

/// A configured 2D texture with mip level 0 uploaded.
#[must_use = "an uploaded texture must be released"]
#[derive(Debug)]
pub struct TextureResource<T> {
    handle: T,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl<T: Copy> TextureResource<T> {
    #[inline]
    pub fn handle(&self) -> T {
        self.handle
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn release<C: GraphicsContext<Texture = T>>(self, ctx: &mut C) {
        ctx.delete_texture(self.handle);
    }
}

pub struct TextureUploader;

impl TextureUploader {
    /// Creates a texture on unit 0 and uploads `pixels` into level 0.
    ///
    /// Wrapping is clamp-to-edge on both axes; minification is nearest and
    /// magnification linear. Rows are flipped first so UV `(0, 0)` lands on
    /// the image's bottom-left pixel. No mipmaps are generated.
    pub fn upload<C: GraphicsContext>(
        ctx: &mut C,
        pixels: &PixelBuffer,
    ) -> Result<TextureResource<C::Texture>, PipelineError> {
        let handle = ctx.create_texture().map_err(PipelineError::creation("texture"))?;

        ctx.active_texture(TEXTURE_UNIT);
        ctx.bind_texture(Some(handle));
        ctx.tex_parameter(TextureParameter::WrapS(TextureWrap::ClampToEdge));
        ctx.tex_parameter(TextureParameter::WrapT(TextureWrap::ClampToEdge));
        ctx.tex_parameter(TextureParameter::MinFilter(TextureFilter::Nearest));
        ctx.tex_parameter(TextureParameter::MagFilter(TextureFilter::Linear));

        let upright = pixels.flipped_vertically();
        ctx.tex_image_2d(upright.width(), upright.height(), upright.format(), upright.data());

        log::debug!("uploaded {}x{} texture {handle:?}", pixels.width(), pixels.height());
        Ok(TextureResource {
            handle,
            width: pixels.width(),
            height: pixels.height(),
            format: pixels.format(),
        })
    }
}
