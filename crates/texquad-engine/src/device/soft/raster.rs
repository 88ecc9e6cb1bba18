//! Vertex fetch, primitive assembly, and triangle rasterization.

use crate::coords::Viewport;
use crate::device::types::{ComponentType, PrimitiveType};

use super::eval::Value;
use super::objects::SoftBuffer;

// ── vertex fetch ──────────────────────────────────────────────────────────

/// State recorded by `vertex_attrib_pointer`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(super) struct AttribPointer {
    pub buffer: SoftBuffer,
    pub size: usize,
    pub ty: ComponentType,
    pub normalized: bool,
    pub stride: usize,
    pub offset: usize,
}

impl AttribPointer {
    /// Byte distance between consecutive vertices; `0` means tightly packed.
    pub fn effective_stride(&self) -> usize {
        if self.stride == 0 { self.size * self.ty.size_bytes() } else { self.stride }
    }

    /// Reads vertex `index`, filling missing components from `(0, 0, 0, 1)`.
    ///
    /// `None` when the read would run past the end of `store`.
    pub fn fetch(&self, store: &[u8], index: u32) -> Option<[f32; 4]> {
        let base = self.offset.checked_add(self.effective_stride().checked_mul(index as usize)?)?;
        let width = self.ty.size_bytes();
        let mut out = [0.0, 0.0, 0.0, 1.0];
        for (c, slot) in out.iter_mut().enumerate().take(self.size) {
            *slot = self.ty.decode(store.get(base + c * width..)?, self.normalized)?;
        }
        Some(out)
    }
}

// ── primitive assembly ────────────────────────────────────────────────────

/// Splits `count` vertices into triangles of positions in the index stream.
///
/// Incomplete trailing primitives are dropped. Strip triangles alternate
/// winding so every triangle keeps the orientation of the first.
pub(super) fn assemble(mode: PrimitiveType, count: usize) -> Vec<[usize; 3]> {
    match mode {
        PrimitiveType::Triangles => (0..count / 3).map(|t| [3 * t, 3 * t + 1, 3 * t + 2]).collect(),
        PrimitiveType::TriangleStrip => (0..count.saturating_sub(2))
            .map(|i| if i % 2 == 0 { [i, i + 1, i + 2] } else { [i + 1, i, i + 2] })
            .collect(),
        PrimitiveType::TriangleFan => (0..count.saturating_sub(2)).map(|i| [0, i + 1, i + 2]).collect(),
    }
}

// ── rasterization ─────────────────────────────────────────────────────────

/// Output of the vertex stage for one vertex.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct ShadedVertex {
    /// Clip-space `gl_Position`.
    pub position: [f32; 4],
    /// Values of the linked varyings, in link order.
    pub varyings: Vec<Value>,
}

/// Per-fragment input handed to the fragment stage.
#[derive(Debug, Clone)]
pub(super) struct Fragment {
    /// `gl_FragCoord`: pixel center, window depth, `1 / w`.
    pub frag_coord: [f32; 4],
    pub varyings: Vec<Value>,
}

/// The color buffer a draw writes into: `width × height`, row 0 at the bottom.
pub(super) struct Target<'a> {
    pub width: u32,
    pub height: u32,
    pub pixels: &'a mut [[f32; 4]],
    pub viewport: Viewport,
    pub cull_back_faces: bool,
}

#[derive(Debug, Copy, Clone)]
struct WindowVertex {
    x: f32,
    y: f32,
    z: f32,
    inv_w: f32,
}

/// `(b - a) × (p - a)`; positive when `p` lies left of `a → b`.
fn edge(a: WindowVertex, b: WindowVertex, px: f32, py: f32) -> f32 {
    (b.x - a.x) * (py - a.y) - (b.y - a.y) * (px - a.x)
}

/// Perspective-correct barycentric weights of `(px, py)`; they sum to one.
fn weights(v: &[WindowVertex; 3], px: f32, py: f32) -> [f32; 3] {
    let e = [edge(v[1], v[2], px, py), edge(v[2], v[0], px, py), edge(v[0], v[1], px, py)];
    let area = e[0] + e[1] + e[2];
    let b = e.map(|w| w / area);
    let p = [b[0] * v[0].inv_w, b[1] * v[1].inv_w, b[2] * v[2].inv_w];
    let sum = p[0] + p[1] + p[2];
    p.map(|w| w / sum)
}

/// `v0 + w1 (v1 - v0) + w2 (v2 - v0)`: exact at vertex 0 and for constants.
fn interpolate(values: [&Value; 3], w: [f32; 3]) -> [f32; 4] {
    std::array::from_fn(|i| {
        let base = values[0].v[i];
        base + w[1] * (values[1].v[i] - base) + w[2] * (values[2].v[i] - base)
    })
}

impl Target<'_> {
    /// Rasterizes one triangle, calling `shade` for every covered pixel and
    /// storing its (clamped) result.
    ///
    /// Pixels whose centers lie exactly on an edge are covered. Triangles
    /// with a vertex at or behind the eye (`w <= 0`) are discarded whole.
    /// Returns whether the triangle produced fragments.
    pub fn draw_triangle(
        &mut self,
        tri: [&ShadedVertex; 3],
        shade: &mut dyn FnMut(Fragment) -> [f32; 4],
    ) -> bool {
        if tri.iter().any(|v| !(v.position[3] > 0.0)) {
            return false;
        }
        let win = tri.map(|v| {
            let [x, y, z, w] = v.position;
            let (wx, wy) = self.viewport.ndc_to_window(x / w, y / w);
            WindowVertex { x: wx, y: wy, z: (z / w) * 0.5 + 0.5, inv_w: 1.0 / w }
        });

        let area = edge(win[0], win[1], win[2].x, win[2].y);
        if area == 0.0 || !area.is_finite() {
            return false;
        }
        // Counter-clockwise in window space (y up) is front-facing.
        if self.cull_back_faces && area < 0.0 {
            return false;
        }
        let orient = area.signum();

        let vp = self.viewport;
        let clip_x0 = vp.x.max(0) as f32;
        let clip_y0 = vp.y.max(0) as f32;
        let clip_x1 = ((vp.x as i64 + vp.width as i64).min(self.width as i64)).max(0) as f32;
        let clip_y1 = ((vp.y as i64 + vp.height as i64).min(self.height as i64)).max(0) as f32;

        let min_x = win.iter().map(|v| v.x).fold(f32::INFINITY, f32::min).floor().max(clip_x0);
        let max_x = win.iter().map(|v| v.x).fold(f32::NEG_INFINITY, f32::max).ceil().min(clip_x1);
        let min_y = win.iter().map(|v| v.y).fold(f32::INFINITY, f32::min).floor().max(clip_y0);
        let max_y = win.iter().map(|v| v.y).fold(f32::NEG_INFINITY, f32::max).ceil().min(clip_y1);

        let n_varyings = tri[0].varyings.len();
        let mut covered = false;
        let mut py = min_y as u32;
        while (py as f32) < max_y {
            let mut px = min_x as u32;
            while (px as f32) < max_x {
                let (cx, cy) = (px as f32 + 0.5, py as f32 + 0.5);
                let inside = [
                    edge(win[1], win[2], cx, cy),
                    edge(win[2], win[0], cx, cy),
                    edge(win[0], win[1], cx, cy),
                ]
                .iter()
                .all(|e| e * orient >= 0.0);

                if inside {
                    covered = true;
                    let w = weights(&win, cx, cy);
                    let wx = weights(&win, cx + 1.0, cy);
                    let wy = weights(&win, cx, cy + 1.0);

                    let varyings = (0..n_varyings)
                        .map(|k| {
                            let vals = [&tri[0].varyings[k], &tri[1].varyings[k], &tri[2].varyings[k]];
                            let here = interpolate(vals, w);
                            let right = interpolate(vals, wx);
                            let up = interpolate(vals, wy);
                            let len = vals[0].len;
                            let dx: [f32; 4] = std::array::from_fn(|i| right[i] - here[i]);
                            let dy: [f32; 4] = std::array::from_fn(|i| up[i] - here[i]);
                            Value::with_derivatives(&here[..len], &dx[..len], &dy[..len])
                        })
                        .collect();

                    let z = w[0] * win[0].z + w[1] * win[1].z + w[2] * win[2].z;
                    let inv_w = w[0] * win[0].inv_w + w[1] * win[1].inv_w + w[2] * win[2].inv_w;
                    let color = shade(Fragment {
                        frag_coord: [cx, cy, z, inv_w],
                        varyings,
                    });
                    let at = (py * self.width + px) as usize;
                    if let Some(slot) = self.pixels.get_mut(at) {
                        *slot = color.map(|c| c.clamp(0.0, 1.0));
                    }
                }
                px += 1;
            }
            py += 1;
        }
        covered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pointer(size: usize, ty: ComponentType, normalized: bool, stride: usize, offset: usize) -> AttribPointer {
        AttribPointer { buffer: SoftBuffer(1), size, ty, normalized, stride, offset }
    }

    #[test]
    fn interleaved_fetch() {
        let mut store = Vec::new();
        for (p, uv) in [([0.0f32, 0.0], [0.0f32, 0.0]), ([0.7, 0.5], [1.0, 1.0])] {
            for f in p.iter().chain(uv.iter()) {
                store.extend_from_slice(&f.to_le_bytes());
            }
        }
        let position = pointer(2, ComponentType::Float, false, 16, 0);
        let uv = pointer(2, ComponentType::Float, false, 16, 8);
        assert_eq!(position.fetch(&store, 1), Some([0.7, 0.5, 0.0, 1.0]));
        assert_eq!(uv.fetch(&store, 1), Some([1.0, 1.0, 0.0, 1.0]));
        assert_eq!(uv.fetch(&store, 2), None);
    }

    #[test]
    fn packed_normalized_bytes() {
        let store = [255u8, 0, 0, 255, 0, 255, 0, 255];
        let color = pointer(4, ComponentType::UnsignedByte, true, 0, 0);
        assert_eq!(color.effective_stride(), 4);
        assert_eq!(color.fetch(&store, 0), Some([1.0, 0.0, 0.0, 1.0]));
        assert_eq!(color.fetch(&store, 1), Some([0.0, 1.0, 0.0, 1.0]));
    }

    #[test]
    fn assembly_modes() {
        assert_eq!(assemble(PrimitiveType::Triangles, 7), vec![[0, 1, 2], [3, 4, 5]]);
        assert_eq!(assemble(PrimitiveType::TriangleStrip, 4), vec![[0, 1, 2], [2, 1, 3]]);
        assert_eq!(assemble(PrimitiveType::TriangleFan, 4), vec![[0, 1, 2], [0, 2, 3]]);
        assert!(assemble(PrimitiveType::TriangleStrip, 2).is_empty());
    }

    fn vertex(x: f32, y: f32, tag: f32) -> ShadedVertex {
        ShadedVertex { position: [x, y, 0.0, 1.0], varyings: vec![Value::scalar(tag)] }
    }

    fn draw(tri: [&ShadedVertex; 3], cull: bool) -> (Vec<[f32; 4]>, bool) {
        let mut pixels = vec![[0.0; 4]; 16];
        let mut target = Target {
            width: 4,
            height: 4,
            pixels: &mut pixels,
            viewport: Viewport::sized(4, 4),
            cull_back_faces: cull,
        };
        let drawn = target.draw_triangle(tri, &mut |f: Fragment| [f.varyings[0].v[0], 0.0, 0.0, 1.0]);
        (pixels, drawn)
    }

    #[test]
    fn clockwise_triangles_are_culled() {
        let (a, b, c) = (vertex(-1.0, -1.0, 0.0), vertex(1.0, -1.0, 0.0), vertex(-1.0, 1.0, 0.0));
        assert!(draw([&a, &b, &c], true).1);
        assert!(!draw([&a, &c, &b], true).1);
        assert!(draw([&a, &c, &b], false).1);
    }

    #[test]
    fn values_at_a_vertex_are_exact() {
        // Vertex 0 sits exactly on the center of pixel (1, 1).
        let a = vertex(-0.25, -0.25, 0.3);
        let b = vertex(1.0, -0.25, 0.9);
        let c = vertex(-0.25, 1.0, 0.7);
        let (pixels, _) = draw([&a, &b, &c], true);
        assert_eq!(pixels[4 + 1][0], 0.3);
    }

    #[test]
    fn behind_the_eye_is_discarded() {
        let mut a = vertex(-1.0, -1.0, 0.0);
        a.position[3] = 0.0;
        let (b, c) = (vertex(1.0, -1.0, 0.0), vertex(-1.0, 1.0, 0.0));
        assert!(!draw([&a, &b, &c], false).1);
    }
}
