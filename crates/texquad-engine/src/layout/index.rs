use crate::device::{BufferTarget, BufferUsage, GraphicsContext, IndexType};
use crate::pipeline::PipelineError;

use super::error::LayoutError;

/// Element indices packed in the narrowest [`IndexType`] that holds them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexData {
    index_type: IndexType,
    count: usize,
    bytes: Vec<u8>,
}

impl IndexData {
    /// Packs `indices` as `UNSIGNED_BYTE` when every value is at most 255,
    /// otherwise as `UNSIGNED_SHORT`.
    pub fn new(indices: &[u32]) -> Result<Self, LayoutError> {
        let max = indices.iter().copied().max().unwrap_or(0);
        let index_type = IndexType::for_max_index(max).ok_or(LayoutError::IndexTooLarge { index: max })?;
        let bytes = match index_type {
            IndexType::UnsignedByte => indices.iter().map(|&i| i as u8).collect(),
            IndexType::UnsignedShort => indices.iter().flat_map(|&i| (i as u16).to_le_bytes()).collect(),
        };
        Ok(Self { index_type, count: indices.len(), bytes })
    }

    #[inline]
    pub fn index_type(&self) -> IndexType {
        self.index_type
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn get(&self, i: usize) -> Option<u32> {
        self.index_type.read(&self.bytes, i)
    }

    pub fn upload<C: GraphicsContext>(&self, ctx: &mut C) -> Result<IndexBuffer<C::Buffer>, PipelineError> {
        let handle = ctx.create_buffer().map_err(PipelineError::creation("index buffer"))?;
        ctx.bind_buffer(BufferTarget::ElementArray, Some(handle));
        ctx.buffer_data(BufferTarget::ElementArray, &self.bytes, BufferUsage::StaticDraw);
        ctx.bind_buffer(BufferTarget::ElementArray, None);
        log::debug!("uploaded {} {:?} indices", self.count, self.index_type);
        Ok(IndexBuffer { handle, index_type: self.index_type, count: self.count })
    }
}

/// An uploaded [`IndexData`].
#[must_use = "an uploaded index buffer must be released"]
#[derive(Debug)]
pub struct IndexBuffer<B> {
    handle: B,
    index_type: IndexType,
    count: usize,
}

impl<B: Copy> IndexBuffer<B> {
    #[inline]
    pub fn handle(&self) -> B {
        self.handle
    }

    #[inline]
    pub fn index_type(&self) -> IndexType {
        self.index_type
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn release<C: GraphicsContext<Buffer = B>>(self, ctx: &mut C) {
        ctx.delete_buffer(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_indices_pack_as_bytes() {
        let data = IndexData::new(&[0, 1, 2, 2, 1, 3]).unwrap();
        assert_eq!(data.index_type(), IndexType::UnsignedByte);
        assert_eq!(data.bytes(), &[0, 1, 2, 2, 1, 3]);
        assert_eq!(data.count(), 6);
    }

    #[test]
    fn wide_indices_pack_as_shorts() {
        let data = IndexData::new(&[0, 256, 65_535]).unwrap();
        assert_eq!(data.index_type(), IndexType::UnsignedShort);
        assert_eq!(data.bytes().len(), 6);
        assert_eq!(data.get(1), Some(256));
        assert_eq!(data.get(2), Some(65_535));
    }

    #[test]
    fn oversized_index_is_rejected() {
        assert_eq!(IndexData::new(&[1, 70_000]), Err(LayoutError::IndexTooLarge { index: 70_000 }));
    }

    #[test]
    fn empty_index_set() {
        let data = IndexData::new(&[]).unwrap();
        assert_eq!(data.count(), 0);
        assert_eq!(data.index_type(), IndexType::UnsignedByte);
    }
}
