/// Viewport rectangle in window pixels (bottom-left origin).
///
/// Maps normalized device coordinates `[-1, 1]²` onto
/// `[x, x + width) × [y, y + height)`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[inline]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Viewport covering a whole `width × height` target.
    #[inline]
    pub const fn sized(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Maps an NDC position to window coordinates.
    #[inline]
    pub fn ndc_to_window(self, ndc_x: f32, ndc_y: f32) -> (f32, f32) {
        let half_w = self.width as f32 * 0.5;
        let half_h = self.height as f32 * 0.5;
        (
            (ndc_x + 1.0) * half_w + self.x as f32,
            (ndc_y + 1.0) * half_h + self.y as f32,
        )
    }
}
