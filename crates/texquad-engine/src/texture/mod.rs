//! Decoded pixel buffers and their upload into 2D textures.

mod pixels;
mod uploader;

pub use pixels::{PixelBuffer, PixelBufferError};
pub use uploader::{TEXTURE_UNIT, TextureResource, TextureUploader};
