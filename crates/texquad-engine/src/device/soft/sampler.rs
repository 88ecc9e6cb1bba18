//! Level-0 texture sampling: wrap modes, nearest/linear filtering, and the
//! minification/magnification switch.

use crate::device::types::{TextureFilter, TextureWrap};

use super::eval::Value;
use super::objects::TextureSlot;

/// Result of sampling an incomplete texture.
pub(super) const INCOMPLETE_SAMPLE: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

fn wrap(i: i64, size: u32, mode: TextureWrap) -> usize {
    let size = i64::from(size);
    let wrapped = match mode {
        TextureWrap::ClampToEdge => i.clamp(0, size - 1),
        TextureWrap::Repeat => i.rem_euclid(size),
        TextureWrap::MirroredRepeat => {
            let m = i.rem_euclid(2 * size);
            if m >= size { 2 * size - 1 - m } else { m }
        }
    };
    wrapped as usize
}

fn texel(tex: &TextureSlot, x: usize, y: usize) -> [f32; 4] {
    let bpp = tex.format.bytes_per_pixel();
    let at = (y * tex.width as usize + x) * bpp;
    match tex.texels.get(at..at + bpp) {
        Some(px) => [
            px[0] as f32 / 255.0,
            px[1] as f32 / 255.0,
            px[2] as f32 / 255.0,
            px[3] as f32 / 255.0,
        ],
        None => INCOMPLETE_SAMPLE,
    }
}

fn lerp(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    std::array::from_fn(|i| a[i] + (b[i] - a[i]) * t)
}

fn filter(tex: &TextureSlot, u: f32, v: f32, mode: TextureFilter) -> [f32; 4] {
    match mode {
        TextureFilter::Nearest => {
            let x = wrap(u.floor() as i64, tex.width, tex.wrap_s);
            let y = wrap(v.floor() as i64, tex.height, tex.wrap_t);
            texel(tex, x, y)
        }
        // Level 0 only: mipmapped filters never reach here on a complete texture.
        _ => {
            let (u, v) = (u - 0.5, v - 0.5);
            let (i0, j0) = (u.floor() as i64, v.floor() as i64);
            let (a, b) = (u - u.floor(), v - v.floor());
            let x0 = wrap(i0, tex.width, tex.wrap_s);
            let x1 = wrap(i0 + 1, tex.width, tex.wrap_s);
            let y0 = wrap(j0, tex.height, tex.wrap_t);
            let y1 = wrap(j0 + 1, tex.height, tex.wrap_t);
            let bottom = lerp(texel(tex, x0, y0), texel(tex, x1, y0), a);
            let top = lerp(texel(tex, x0, y1), texel(tex, x1, y1), a);
            lerp(bottom, top, b)
        }
    }
}

/// Level-of-detail from the screen-space derivatives of `uv` in texel units.
fn lambda(tex: &TextureSlot, uv: &Value) -> f32 {
    let (w, h) = (tex.width as f32, tex.height as f32);
    let rho_x = (uv.dx[0] * w).hypot(uv.dx[1] * h);
    let rho_y = (uv.dy[0] * w).hypot(uv.dy[1] * h);
    rho_x.max(rho_y).log2()
}

/// Samples `tex` at `uv` (`s`, `t` in components 0 and 1).
pub(super) fn sample(tex: &TextureSlot, uv: &Value) -> [f32; 4] {
    if !tex.is_complete() {
        return INCOMPLETE_SAMPLE;
    }
    let mode = if lambda(tex, uv) > 0.0 { tex.min_filter } else { tex.mag_filter };
    filter(tex, uv.v[0] * tex.width as f32, uv.v[1] * tex.height as f32, mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2×2 texture: red, green on row 0; blue, white on row 1.
    fn quad_texture() -> TextureSlot {
        TextureSlot {
            width: 2,
            height: 2,
            texels: vec![
                255, 0, 0, 255, 0, 255, 0, 255, //
                0, 0, 255, 255, 255, 255, 255, 255,
            ],
            wrap_s: TextureWrap::ClampToEdge,
            wrap_t: TextureWrap::ClampToEdge,
            min_filter: TextureFilter::Nearest,
            mag_filter: TextureFilter::Linear,
            ..TextureSlot::default()
        }
    }

    fn uv(s: f32, t: f32, d: f32) -> Value {
        Value::with_derivatives(&[s, t], &[d, 0.0], &[0.0, d])
    }

    #[test]
    fn wrap_modes() {
        assert_eq!(wrap(-1, 4, TextureWrap::ClampToEdge), 0);
        assert_eq!(wrap(7, 4, TextureWrap::ClampToEdge), 3);
        assert_eq!(wrap(-1, 4, TextureWrap::Repeat), 3);
        assert_eq!(wrap(5, 4, TextureWrap::Repeat), 1);
        assert_eq!(wrap(4, 4, TextureWrap::MirroredRepeat), 3);
        assert_eq!(wrap(-1, 4, TextureWrap::MirroredRepeat), 0);
    }

    #[test]
    fn magnified_corner_is_the_corner_texel() {
        let tex = quad_texture();
        assert_eq!(sample(&tex, &uv(0.0, 0.0, 0.001)), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(sample(&tex, &uv(1.0, 1.0, 0.001)), [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn magnification_blends_between_texels() {
        let tex = quad_texture();
        let c = sample(&tex, &uv(0.5, 0.25, 0.001));
        assert_eq!(c, [0.5, 0.5, 0.0, 1.0]);
    }

    #[test]
    fn minification_uses_nearest() {
        let tex = quad_texture();
        let c = sample(&tex, &uv(0.5, 0.25, 4.0));
        assert_eq!(c, [0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn incomplete_texture_samples_opaque_black() {
        let mut tex = quad_texture();
        tex.min_filter = TextureFilter::LinearMipmapLinear;
        assert_eq!(sample(&tex, &uv(0.5, 0.5, 0.001)), INCOMPLETE_SAMPLE);
        assert_eq!(sample(&TextureSlot::default(), &uv(0.0, 0.0, 0.0)), INCOMPLETE_SAMPLE);
    }
}
