//! Color model shared by the renderer configuration and the reference context.
//!
//! Colors are straight (non-premultiplied) RGBA in `[0, 1]`, which is what the
//! quad's vertex colors, texels and clear color all are.

pub mod color;

pub use color::Color;
