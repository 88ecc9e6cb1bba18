//! Graphics context abstraction.
//!
//! This module is responsible for:
//! - the GL-style [`GraphicsContext`] trait the pipeline drives
//! - typed replacements for the raw `GLenum`s that trait takes
//! - [`SoftContext`], a CPU reference context with inspectable state
//! - [`GlowContext`] (feature `glow`), the same contract over a real GL driver

mod context;
#[cfg(feature = "glow")]
mod gl;
pub mod soft;
pub mod types;

pub use context::GraphicsContext;
#[cfg(feature = "glow")]
pub use gl::GlowContext;
pub use soft::{ContextError, SoftContext};
pub use types::{
    BufferTarget, BufferUsage, Capability, ComponentType, IndexType, PixelFormat, PrimitiveType,
    ShaderStage, TextureFilter, TextureParameter, TextureWrap,
};
