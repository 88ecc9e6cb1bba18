/// A vertex layout or index set that cannot be described to the context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("attribute '{0}' is declared before any buffer")]
    AttributeWithoutBuffer(String),

    #[error("attribute '{name}' has {count} components, expected 1 to 4")]
    ComponentCount { name: String, count: u8 },

    #[error("attribute '{0}' is declared twice")]
    DuplicateAttribute(String),

    #[error("attribute '{0}' is FLOAT and cannot be normalized")]
    NormalizedFloat(String),

    #[error("attribute '{name}': offset and stride must be multiples of {align} bytes")]
    Misaligned { name: String, align: usize },

    #[error("attribute '{name}': stride {stride} exceeds 255 bytes")]
    StrideTooLarge { name: String, stride: usize },

    #[error("attribute '{name}': offset {offset} is out of range")]
    OffsetTooLarge { name: String, offset: usize },

    /// `offset + element size` runs past the stride of an interleaved buffer.
    #[error("attribute '{name}' ends at byte {end} of a {stride}-byte vertex")]
    ExceedsStride { name: String, end: usize, stride: usize },

    #[error("attribute '{name}' holds {found} vertices, expected {expected}")]
    VertexCountMismatch { name: String, expected: usize, found: usize },

    #[error("layout declares no attributes")]
    NoAttributes,

    #[error("index {index} does not fit in a 16-bit index buffer")]
    IndexTooLarge { index: u32 },
}
