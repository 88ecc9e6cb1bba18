//! Typed enums for the values a GL-style context takes as raw `GLenum`s.

pub use texquad_glsl::Stage as ShaderStage;

/// Scalar type of one vertex attribute component.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ComponentType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Float,
}

impl ComponentType {
    #[inline]
    pub const fn size_bytes(self) -> usize {
        match self {
            ComponentType::Byte | ComponentType::UnsignedByte => 1,
            ComponentType::Short | ComponentType::UnsignedShort => 2,
            ComponentType::Float => 4,
        }
    }

    pub const fn is_integer(self) -> bool {
        !matches!(self, ComponentType::Float)
    }

    /// Decodes one little-endian component from `bytes[..size_bytes()]`.
    ///
    /// Normalized unsigned values map `0..=MAX` onto `[0, 1]`; normalized
    /// signed values map onto `[-1, 1]` as `max(c / MAX, -1)`. Without
    /// normalization integers pass their raw magnitude. `normalized` is
    /// ignored for `Float`.
    ///
    /// Returns `None` when `bytes` is too short.
    pub fn decode(self, bytes: &[u8], normalized: bool) -> Option<f32> {
        let raw = bytes.get(..self.size_bytes())?;
        let value = match self {
            ComponentType::Float => f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
            ComponentType::UnsignedByte => {
                let c = raw[0] as f32;
                if normalized { c / u8::MAX as f32 } else { c }
            }
            ComponentType::Byte => {
                let c = raw[0] as i8 as f32;
                if normalized { (c / i8::MAX as f32).max(-1.0) } else { c }
            }
            ComponentType::UnsignedShort => {
                let c = u16::from_le_bytes([raw[0], raw[1]]) as f32;
                if normalized { c / u16::MAX as f32 } else { c }
            }
            ComponentType::Short => {
                let c = i16::from_le_bytes([raw[0], raw[1]]) as f32;
                if normalized { (c / i16::MAX as f32).max(-1.0) } else { c }
            }
        };
        Some(value)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferTarget {
    /// Vertex attribute data (`ARRAY_BUFFER`).
    Array,
    /// Index data (`ELEMENT_ARRAY_BUFFER`).
    ElementArray,
}

/// Upload frequency hint.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum BufferUsage {
    /// Written once, drawn many times.
    #[default]
    StaticDraw,
    DynamicDraw,
    StreamDraw,
}

/// Element type of an index buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IndexType {
    /// Indices `0..=255`.
    UnsignedByte,
    /// Indices `0..=65535`.
    UnsignedShort,
}

impl IndexType {
    #[inline]
    pub const fn size_bytes(self) -> usize {
        match self {
            IndexType::UnsignedByte => 1,
            IndexType::UnsignedShort => 2,
        }
    }

    #[inline]
    pub const fn max_index(self) -> u32 {
        match self {
            IndexType::UnsignedByte => u8::MAX as u32,
            IndexType::UnsignedShort => u16::MAX as u32,
        }
    }

    /// Smallest type able to address `max_index`, if any.
    pub fn for_max_index(max_index: u32) -> Option<Self> {
        [IndexType::UnsignedByte, IndexType::UnsignedShort]
            .into_iter()
            .find(|t| max_index <= t.max_index())
    }

    /// Reads the `i`-th index from `bytes`.
    pub fn read(self, bytes: &[u8], i: usize) -> Option<u32> {
        match self {
            IndexType::UnsignedByte => bytes.get(i).map(|&b| b as u32),
            IndexType::UnsignedShort => {
                let b = bytes.get(i * 2..i * 2 + 2)?;
                Some(u16::from_le_bytes([b[0], b[1]]) as u32)
            }
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PrimitiveType {
    Triangles,
    TriangleStrip,
    TriangleFan,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureWrap {
    ClampToEdge,
    Repeat,
    MirroredRepeat,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl TextureFilter {
    /// Whether sampling with this filter needs more than mip level 0.
    pub const fn uses_mipmaps(self) -> bool {
        !matches!(self, TextureFilter::Nearest | TextureFilter::Linear)
    }
}

/// A `texParameteri` call on the `TEXTURE_2D` target.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureParameter {
    WrapS(TextureWrap),
    WrapT(TextureWrap),
    MinFilter(TextureFilter),
    /// Only `Nearest` and `Linear` are valid magnification filters.
    MagFilter(TextureFilter),
}

/// Texel layout of an uploaded image.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum PixelFormat {
    /// 4 channels, 8 bits each, in R, G, B, A byte order.
    #[default]
    Rgba8,
}

impl PixelFormat {
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// Server-side capability toggled with `enable` / `disable`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Capability {
    /// Discard triangles facing away from the viewer (counter-clockwise is front).
    CullFace,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_unsigned_byte_boundaries() {
        assert_eq!(ComponentType::UnsignedByte.decode(&[255], true), Some(1.0));
        assert_eq!(ComponentType::UnsignedByte.decode(&[0], true), Some(0.0));
    }

    #[test]
    fn raw_unsigned_byte_passes_magnitude() {
        assert_eq!(ComponentType::UnsignedByte.decode(&[255], false), Some(255.0));
        assert_eq!(ComponentType::UnsignedByte.decode(&[0], false), Some(0.0));
    }

    #[test]
    fn normalized_signed_values_clamp_at_minus_one() {
        assert_eq!(ComponentType::Byte.decode(&[0x80], true), Some(-1.0));
        assert_eq!(ComponentType::Byte.decode(&[0x7f], true), Some(1.0));
        assert_eq!(ComponentType::Short.decode(&i16::MIN.to_le_bytes(), true), Some(-1.0));
    }

    #[test]
    fn float_ignores_normalization() {
        let bytes = 0.7f32.to_le_bytes();
        assert_eq!(ComponentType::Float.decode(&bytes, true), Some(0.7));
    }

    #[test]
    fn short_input_is_rejected() {
        assert_eq!(ComponentType::Float.decode(&[0, 0, 0], false), None);
    }

    #[test]
    fn index_type_selection() {
        assert_eq!(IndexType::for_max_index(3), Some(IndexType::UnsignedByte));
        assert_eq!(IndexType::for_max_index(255), Some(IndexType::UnsignedByte));
        assert_eq!(IndexType::for_max_index(256), Some(IndexType::UnsignedShort));
        assert_eq!(IndexType::for_max_index(65_536), None);
    }

    #[test]
    fn index_reads_are_little_endian() {
        let bytes = [0x01, 0x02, 0xff, 0x00];
        assert_eq!(IndexType::UnsignedShort.read(&bytes, 0), Some(0x0201));
        assert_eq!(IndexType::UnsignedShort.read(&bytes, 1), Some(0x00ff));
        assert_eq!(IndexType::UnsignedShort.read(&bytes, 2), None);
    }
}
