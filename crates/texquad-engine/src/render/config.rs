use crate::coords::Viewport;
use crate::paint::Color;

use super::scene::SAMPLER_UNIFORM;

/// Frame-level settings for [`FrameRenderer`](super::FrameRenderer).
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Window-space rectangle NDC maps onto.
    ///
    /// Usually the full size of the target.
    pub viewport: Viewport,

    /// Color the target is cleared to before drawing.
    ///
    /// Components are in `[0, 1]`; the alpha of an opaque clear is `1.0`.
    pub clear_color: Color,

    /// Discard triangles wound clockwise in window space.
    pub cull_back_faces: bool,

    /// Name of the `sampler2D` uniform that reads the bound texture.
    ///
    /// If the program has no such active uniform the texture is still bound,
    /// it is just never sampled.
    pub sampler_uniform: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::sized(400, 300),
            clear_color: Color::BLACK,
            cull_back_faces: true,
            sampler_uniform: SAMPLER_UNIFORM.to_owned(),
        }
    }
}
