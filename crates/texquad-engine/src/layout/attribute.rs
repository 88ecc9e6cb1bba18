use crate::device::ComponentType;

/// Index of a source buffer inside one [`VertexLayout`](super::VertexLayout).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct BufferRef(pub(super) usize);

impl BufferRef {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// How one named attribute is read out of its source buffer.
///
/// Mirrors the arguments of `vertexAttribPointer`: `stride_bytes == 0` means
/// tightly packed, i.e. the stride equals the element size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub name: String,
    pub buffer: BufferRef,
    /// 1..=4
    pub component_count: u8,
    pub component_type: ComponentType,
    pub normalized: bool,
    pub stride_bytes: usize,
    pub offset_bytes: usize,
}

impl AttributeDescriptor {
    /// Bytes occupied by one vertex's worth of this attribute.
    #[inline]
    pub fn element_size(&self) -> usize {
        self.component_count as usize * self.component_type.size_bytes()
    }

    #[inline]
    pub fn effective_stride(&self) -> usize {
        if self.stride_bytes == 0 { self.element_size() } else { self.stride_bytes }
    }

    /// Number of complete elements `bytes` holds for this attribute.
    pub fn vertex_count(&self, bytes: &[u8]) -> usize {
        let needed = self.offset_bytes + self.element_size();
        if bytes.len() < needed {
            return 0;
        }
        (bytes.len() - needed) / self.effective_stride() + 1
    }

    /// Decodes vertex `vertex` from `bytes`, the contents of this
    /// attribute's buffer.
    ///
    /// Components past `component_count` take the shader defaults
    /// `(0, 0, 0, 1)`. `None` if the element is not fully inside `bytes`.
    pub fn read(&self, bytes: &[u8], vertex: usize) -> Option<[f32; 4]> {
        let start = self.offset_bytes.checked_add(self.effective_stride().checked_mul(vertex)?)?;
        let element = bytes.get(start..start.checked_add(self.element_size())?)?;
        let mut out = [0.0, 0.0, 0.0, 1.0];
        for (component, chunk) in element.chunks_exact(self.component_type.size_bytes()).enumerate() {
            out[component] = self.component_type.decode(chunk, self.normalized)?;
        }
        Some(out)
    }
}
