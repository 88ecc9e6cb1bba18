//! Texquad engine crate.
//!
//! Builds a textured, per-vertex-colored quad through a GL-style object
//! model: shaders are compiled and linked into a program, vertex data is
//! described by a validated layout, an image is uploaded as a texture, and a
//! frame renderer sequences all of it into one indexed draw.
//!
//! Everything is written against [`device::GraphicsContext`]. The
//! [`device::SoftContext`] implementation runs entirely on the CPU; the
//! `glow` feature adds one over a real OpenGL context.

pub mod device;

pub mod coords;
pub mod layout;
pub mod logging;
pub mod paint;
pub mod pipeline;
pub mod render;
pub mod texture;
