//! `Pod` vertex structs for the interleaved layouts.

use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};

// ── position + uv ─────────────────────────────────────────────────────────

/// Clip-space position followed by texture coordinates; 16 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct PosUvVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl PosUvVertex {
    pub const STRIDE: usize = size_of::<Self>();
    pub const POSITION_OFFSET: usize = offset_of!(Self, position);
    pub const UV_OFFSET: usize = offset_of!(Self, uv);
}

// ── position + packed color ───────────────────────────────────────────────

/// Position followed by an RGBA8 color; 12 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct PosColorVertex {
    pub position: [f32; 2],
    pub color: [u8; 4],
}

impl PosColorVertex {
    pub const STRIDE: usize = size_of::<Self>();
    pub const POSITION_OFFSET: usize = offset_of!(Self, position);
    pub const COLOR_OFFSET: usize = offset_of!(Self, color);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaved_offsets() {
        assert_eq!((PosUvVertex::STRIDE, PosUvVertex::POSITION_OFFSET, PosUvVertex::UV_OFFSET), (16, 0, 8));
        assert_eq!((PosColorVertex::STRIDE, PosColorVertex::COLOR_OFFSET), (12, 8));
    }
}
