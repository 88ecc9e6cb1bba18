use bytemuck::Pod;

use crate::device::{BufferTarget, BufferUsage, ComponentType, GraphicsContext};
use crate::pipeline::PipelineError;

use super::attribute::{AttributeDescriptor, BufferRef};
use super::error::LayoutError;

/// Largest stride `vertexAttribPointer` accepts on every target.
pub const MAX_STRIDE: usize = 255;

/// Raw bytes for one source buffer plus a label for logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferSource {
    pub label: String,
    pub bytes: Vec<u8>,
}

/// Declarative description of where every attribute lives.
///
/// Attributes attach to the most recently added buffer:
///
/// ```
/// # use texquad_engine::device::ComponentType;
/// # use texquad_engine::layout::VertexLayoutBuilder;
/// let quad = [0u8; 64];
/// let colors = [255u8; 16];
/// let layout = VertexLayoutBuilder::new()
///     .buffer("quad", quad)
///     .attribute("a_position", 2, ComponentType::Float, false, 16, 0)
///     .attribute("a_uv", 2, ComponentType::Float, false, 16, 8)
///     .buffer("colors", colors)
///     .attribute("a_color", 4, ComponentType::UnsignedByte, true, 0, 0)
///     .build()
///     .unwrap();
/// assert_eq!(layout.vertex_count(), 4);
/// ```
#[derive(Debug, Default, Clone)]
pub struct VertexLayoutBuilder {
    buffers: Vec<BufferSource>,
    attributes: Vec<PendingAttribute>,
}

#[derive(Debug, Clone)]
struct PendingAttribute {
    buffer: Option<BufferRef>,
    descriptor: AttributeDescriptor,
}

impl VertexLayoutBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(mut self, label: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.buffers.push(BufferSource { label: label.into(), bytes: bytes.into() });
        self
    }

    /// Adds a buffer holding `vertices` as raw bytes.
    pub fn vertices<V: Pod>(self, label: impl Into<String>, vertices: &[V]) -> Self {
        self.buffer(label, bytemuck::cast_slice::<V, u8>(vertices))
    }

    pub fn attribute(
        mut self,
        name: impl Into<String>,
        component_count: u8,
        component_type: ComponentType,
        normalized: bool,
        stride_bytes: usize,
        offset_bytes: usize,
    ) -> Self {
        let buffer = self.buffers.len().checked_sub(1).map(BufferRef);
        self.attributes.push(PendingAttribute {
            buffer,
            descriptor: AttributeDescriptor {
                name: name.into(),
                buffer: buffer.unwrap_or(BufferRef(0)),
                component_count,
                component_type,
                normalized,
                stride_bytes,
                offset_bytes,
            },
        });
        self
    }

    /// Validates every attribute and freezes the layout.
    ///
    /// All attributes must describe the same number of vertices.
    pub fn build(self) -> Result<VertexLayout, LayoutError> {
        let mut attributes: Vec<AttributeDescriptor> = Vec::with_capacity(self.attributes.len());
        for pending in self.attributes {
            let attr = pending.descriptor;
            if pending.buffer.is_none() {
                return Err(LayoutError::AttributeWithoutBuffer(attr.name));
            }
            if attributes.iter().any(|a| a.name == attr.name) {
                return Err(LayoutError::DuplicateAttribute(attr.name));
            }
            validate(&attr)?;
            attributes.push(attr);
        }
        if attributes.is_empty() {
            return Err(LayoutError::NoAttributes);
        }

        let counts: Vec<usize> = attributes
            .iter()
            .map(|a| a.vertex_count(&self.buffers[a.buffer.0].bytes))
            .collect();
        let expected = counts[0];
        if let Some((attr, &found)) = attributes.iter().zip(&counts).find(|&(_, &n)| n != expected) {
            return Err(LayoutError::VertexCountMismatch { name: attr.name.clone(), expected, found });
        }

        Ok(VertexLayout { buffers: self.buffers, attributes, vertex_count: expected })
    }
}

fn validate(attr: &AttributeDescriptor) -> Result<(), LayoutError> {
    let name = || attr.name.clone();
    if !(1..=4).contains(&attr.component_count) {
        return Err(LayoutError::ComponentCount { name: name(), count: attr.component_count });
    }
    if attr.normalized && !attr.component_type.is_integer() {
        return Err(LayoutError::NormalizedFloat(name()));
    }
    if attr.stride_bytes > MAX_STRIDE {
        return Err(LayoutError::StrideTooLarge { name: name(), stride: attr.stride_bytes });
    }
    if i32::try_from(attr.offset_bytes).is_err() {
        return Err(LayoutError::OffsetTooLarge { name: name(), offset: attr.offset_bytes });
    }
    let align = attr.component_type.size_bytes();
    if attr.offset_bytes % align != 0 || attr.stride_bytes % align != 0 {
        return Err(LayoutError::Misaligned { name: name(), align });
    }
    let end = attr.offset_bytes + attr.element_size();
    if attr.stride_bytes != 0 && end > attr.stride_bytes {
        return Err(LayoutError::ExceedsStride { name: name(), end, stride: attr.stride_bytes });
    }
    Ok(())
}

/// A validated set of buffers and the attributes read from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    buffers: Vec<BufferSource>,
    attributes: Vec<AttributeDescriptor>,
    vertex_count: usize,
}

impl VertexLayout {
    #[inline]
    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    #[inline]
    pub fn buffers(&self) -> &[BufferSource] {
        &self.buffers
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Reads attribute `name` of vertex `vertex` back from the CPU copy.
    pub fn read(&self, name: &str, vertex: usize) -> Option<[f32; 4]> {
        let attr = self.attribute(name)?;
        attr.read(&self.buffers[attr.buffer.0].bytes, vertex)
    }

    /// Creates one static buffer per source and uploads its bytes.
    ///
    /// Buffers created before a failure are deleted again.
    pub fn upload<C: GraphicsContext>(&self, ctx: &mut C) -> Result<GpuVertexLayout<C::Buffer>, PipelineError> {
        let mut handles = Vec::with_capacity(self.buffers.len());
        for source in &self.buffers {
            let handle = match ctx.create_buffer() {
                Ok(handle) => handle,
                Err(reason) => {
                    for handle in handles {
                        ctx.delete_buffer(handle);
                    }
                    return Err(PipelineError::creation("vertex buffer")(reason));
                }
            };
            ctx.bind_buffer(BufferTarget::Array, Some(handle));
            ctx.buffer_data(BufferTarget::Array, &source.bytes, BufferUsage::StaticDraw);
            log::debug!("uploaded vertex buffer '{}' ({} bytes)", source.label, source.bytes.len());
            handles.push(handle);
        }
        ctx.bind_buffer(BufferTarget::Array, None);

        Ok(GpuVertexLayout {
            buffers: handles,
            attributes: self.attributes.clone(),
            vertex_count: self.vertex_count,
        })
    }
}

/// A [`VertexLayout`] whose buffers live in a graphics context.
#[must_use = "uploaded vertex buffers must be released"]
#[derive(Debug)]
pub struct GpuVertexLayout<B> {
    buffers: Vec<B>,
    attributes: Vec<AttributeDescriptor>,
    vertex_count: usize,
}

impl<B: Copy> GpuVertexLayout<B> {
    #[inline]
    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    #[inline]
    pub fn buffer(&self, buffer: BufferRef) -> Option<B> {
        self.buffers.get(buffer.0).copied()
    }

    /// Each attribute paired with the buffer it reads from.
    pub fn bindings(&self) -> impl Iterator<Item = (&AttributeDescriptor, B)> + '_ {
        self.attributes.iter().filter_map(|a| Some((a, self.buffer(a.buffer)?)))
    }

    pub fn release<C: GraphicsContext<Buffer = B>>(self, ctx: &mut C) {
        for handle in self.buffers {
            ctx.delete_buffer(handle);
        }
    }
}
