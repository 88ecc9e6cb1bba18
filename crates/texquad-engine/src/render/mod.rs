//! Frame rendering.
//!
//! [`FrameRenderer`] issues one indexed draw per frame in a fixed order:
//! viewport, clear, program, attributes, texture, indices. [`QuadScene`] owns
//! the objects for the textured quad and draws it through a renderer.
//!
//! Convention:
//! - vertex positions are clip space, `w = 1`
//! - texture coordinates have `(0, 0)` at the image's bottom-left

mod config;
mod frame;
pub mod scene;

pub use config::RendererConfig;
pub use frame::{DrawCommand, FrameRenderer};
pub use scene::{QuadGeometry, QuadScene};
