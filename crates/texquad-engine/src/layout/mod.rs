//! Vertex and index data, described declaratively and validated before upload.
//!
//! A [`VertexLayout`] is a list of source buffers plus one
//! [`AttributeDescriptor`] per named shader input. Offsets, strides and
//! component sizes are checked once in [`VertexLayoutBuilder::build`], so the
//! renderer never has to second-guess them at draw time.

mod attribute;
mod builder;
mod error;
mod index;
mod vertex;

pub use attribute::{AttributeDescriptor, BufferRef};
pub use builder::{BufferSource, GpuVertexLayout, MAX_STRIDE, VertexLayout, VertexLayoutBuilder};
pub use error::LayoutError;
pub use index::{IndexBuffer, IndexData};
pub use vertex::{PosColorVertex, PosUvVertex};
