//! Interpreter for checked shader bodies.
//!
//! Every value carries its screen-space partial derivatives alongside it so
//! `texture2D` can pick a minification or magnification filter the way a
//! GPU does from neighbouring fragments.

use std::collections::HashMap;

use texquad_glsl::ast::{BinOp, Expr, ExprKind, Stmt};

/// A `float` or `vecN` with its `d/dx` and `d/dy`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(super) struct Value {
    pub len: usize,
    pub v: [f32; 4],
    pub dx: [f32; 4],
    pub dy: [f32; 4],
}

impl Value {
    pub fn constant(components: &[f32]) -> Self {
        let mut v = [0.0; 4];
        let len = components.len().min(4);
        v[..len].copy_from_slice(&components[..len]);
        Self { len, v, dx: [0.0; 4], dy: [0.0; 4] }
    }

    pub fn scalar(x: f32) -> Self {
        Self::constant(&[x])
    }

    pub fn with_derivatives(components: &[f32], dx: &[f32], dy: &[f32]) -> Self {
        let mut value = Self::constant(components);
        value.dx[..value.len].copy_from_slice(&dx[..value.len]);
        value.dy[..value.len].copy_from_slice(&dy[..value.len]);
        value
    }

    pub fn components(&self) -> &[f32] {
        &self.v[..self.len]
    }

    /// Widens to four components, filling with `(0, 0, 0, 1)`.
    pub fn to_vec4(&self) -> [f32; 4] {
        let mut out = [0.0, 0.0, 0.0, 1.0];
        out[..self.len].copy_from_slice(self.components());
        out
    }

    /// Component `i`, broadcasting scalars.
    fn lane(&self, i: usize) -> (f32, f32, f32) {
        let i = if self.len == 1 { 0 } else { i };
        (self.v[i], self.dx[i], self.dy[i])
    }

    fn zip(self, other: Value, f: impl Fn((f32, f32, f32), (f32, f32, f32)) -> (f32, f32, f32)) -> Value {
        let len = self.len.max(other.len);
        let mut out = Value { len, v: [0.0; 4], dx: [0.0; 4], dy: [0.0; 4] };
        for i in 0..len {
            let (v, dx, dy) = f(self.lane(i), other.lane(i));
            out.v[i] = v;
            out.dx[i] = dx;
            out.dy[i] = dy;
        }
        out
    }

    fn negate(mut self) -> Value {
        for i in 0..self.len {
            self.v[i] = -self.v[i];
            self.dx[i] = -self.dx[i];
            self.dy[i] = -self.dy[i];
        }
        self
    }
}

fn binary(op: BinOp, l: Value, r: Value) -> Value {
    match op {
        BinOp::Add => l.zip(r, |(a, adx, ady), (b, bdx, bdy)| (a + b, adx + bdx, ady + bdy)),
        BinOp::Sub => l.zip(r, |(a, adx, ady), (b, bdx, bdy)| (a - b, adx - bdx, ady - bdy)),
        BinOp::Mul => l.zip(r, |(a, adx, ady), (b, bdx, bdy)| {
            (a * b, adx * b + a * bdx, ady * b + a * bdy)
        }),
        BinOp::Div => l.zip(r, |(a, adx, ady), (b, bdx, bdy)| {
            let b2 = b * b;
            (a / b, (adx * b - a * bdx) / b2, (ady * b - a * bdy) / b2)
        }),
    }
}

/// Texture lookups requested by `texture2D(sampler, uv)`.
pub(super) trait Sampling {
    fn sample(&self, sampler: &str, uv: &Value) -> [f32; 4];
}

/// Runs `body` against `globals`, which holds inputs (attributes, varyings,
/// uniforms, built-ins) on entry and the written outputs on exit.
///
/// The body must have passed the checker; unknown names read as zero.
pub(super) fn execute(body: &[Stmt], globals: &mut HashMap<String, Value>, sampling: &dyn Sampling) {
    let mut frame = Frame { globals, locals: HashMap::new(), sampling };
    for stmt in body {
        match stmt {
            Stmt::Local { name, init, .. } => {
                let value = frame.eval(init);
                frame.locals.insert(name.as_str(), value);
            }
            Stmt::Assign { target, value, .. } => {
                let value = frame.eval(value);
                if let Some(slot) = frame.locals.get_mut(target.as_str()) {
                    *slot = value;
                } else {
                    frame.globals.insert(target.clone(), value);
                }
            }
        }
    }
}

struct Frame<'a, 'b> {
    globals: &'a mut HashMap<String, Value>,
    locals: HashMap<&'b str, Value>,
    sampling: &'a dyn Sampling,
}

impl Frame<'_, '_> {
    fn read(&self, name: &str) -> Value {
        self.locals
            .get(name)
            .or_else(|| self.globals.get(name))
            .copied()
            .unwrap_or_else(|| Value::scalar(0.0))
    }

    fn eval(&self, expr: &Expr) -> Value {
        match &expr.kind {
            ExprKind::Number(x) => Value::scalar(*x),
            ExprKind::Ident(name) => self.read(name),
            ExprKind::Neg(operand) => self.eval(operand).negate(),
            ExprKind::Binary { op, lhs, rhs } => binary(*op, self.eval(lhs), self.eval(rhs)),
            ExprKind::Swizzle { base, fields } => {
                let base = self.eval(base);
                let mut out = Value { len: fields.len(), v: [0.0; 4], dx: [0.0; 4], dy: [0.0; 4] };
                for (slot, &field) in fields.iter().enumerate().take(4) {
                    out.v[slot] = base.v[field];
                    out.dx[slot] = base.dx[field];
                    out.dy[slot] = base.dy[field];
                }
                out
            }
            ExprKind::Call { callee, args } if callee == "texture2D" => {
                let sampler = match args.first().map(|a| &a.kind) {
                    Some(ExprKind::Ident(name)) => name.as_str(),
                    _ => return Value::constant(&[0.0, 0.0, 0.0, 1.0]),
                };
                let uv = args.get(1).map(|a| self.eval(a)).unwrap_or_else(|| Value::constant(&[0.0, 0.0]));
                Value::constant(&self.sampling.sample(sampler, &uv))
            }
            ExprKind::Call { callee, args } => self.construct(callee, args),
        }
    }

    fn construct(&self, callee: &str, args: &[Expr]) -> Value {
        let len = match callee {
            "float" => 1,
            "vec2" => 2,
            "vec3" => 3,
            _ => 4,
        };
        let values: Vec<Value> = args.iter().map(|a| self.eval(a)).collect();
        let mut out = Value { len, v: [0.0; 4], dx: [0.0; 4], dy: [0.0; 4] };
        if let [only] = values.as_slice() {
            if only.len == 1 {
                for i in 0..len {
                    (out.v[i], out.dx[i], out.dy[i]) = only.lane(0);
                }
                return out;
            }
        }
        let lanes = values.iter().flat_map(|value| (0..value.len).map(move |i| value.lane(i)));
        for (i, (v, dx, dy)) in lanes.take(len).enumerate() {
            out.v[i] = v;
            out.dx[i] = dx;
            out.dy[i] = dy;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use texquad_glsl::Stage;

    struct NoTextures;

    impl Sampling for NoTextures {
        fn sample(&self, _: &str, _: &Value) -> [f32; 4] {
            [0.0, 0.0, 0.0, 1.0]
        }
    }

    struct EchoUv;

    impl Sampling for EchoUv {
        fn sample(&self, _: &str, uv: &Value) -> [f32; 4] {
            [uv.v[0], uv.v[1], 0.0, 1.0]
        }
    }

    fn run(src: &str, stage: Stage, inputs: &[(&str, Value)], sampling: &dyn Sampling) -> HashMap<String, Value> {
        let shader = texquad_glsl::compile(src, stage).unwrap();
        let mut globals: HashMap<String, Value> =
            inputs.iter().map(|(name, value)| (name.to_string(), *value)).collect();
        execute(shader.main_body(), &mut globals, sampling);
        globals
    }

    #[test]
    fn vertex_position_passthrough() {
        let out = run(
            "attribute vec2 p; void main() { gl_Position = vec4(p, 0.0, 1.0); }",
            Stage::Vertex,
            &[("p", Value::constant(&[0.5, -0.25]))],
            &NoTextures,
        );
        assert_eq!(out["gl_Position"].components(), &[0.5, -0.25, 0.0, 1.0]);
    }

    #[test]
    fn scalar_broadcast_and_swizzle() {
        let out = run(
            "uniform vec4 u; varying vec3 v; void main() { vec3 c = u.bgr * 2.0; v = -c + 1.0; }",
            Stage::Vertex,
            &[("u", Value::constant(&[0.125, 0.25, 0.375, 1.0]))],
            &NoTextures,
        );
        assert_eq!(out["v"].components(), &[0.25, 0.5, 0.75]);
    }

    #[test]
    fn locals_shadow_without_touching_globals() {
        let out = run(
            "precision mediump float; varying vec4 v;
             void main() { vec4 v = vec4(2.0); gl_FragColor = v; }",
            Stage::Fragment,
            &[("v", Value::constant(&[1.0, 1.0, 1.0, 1.0]))],
            &NoTextures,
        );
        assert_eq!(out["gl_FragColor"].components(), &[2.0; 4]);
        assert_eq!(out["v"].components(), &[1.0; 4]);
    }

    #[test]
    fn product_rule_derivatives() {
        let a = Value::with_derivatives(&[2.0], &[1.0], &[0.0]);
        let b = Value::with_derivatives(&[3.0], &[0.0], &[1.0]);
        let p = binary(BinOp::Mul, a, b);
        assert_eq!(p.v[0], 6.0);
        assert_eq!(p.dx[0], 3.0);
        assert_eq!(p.dy[0], 2.0);
    }

    #[test]
    fn texture_lookup_modulates() {
        let out = run(
            "precision mediump float; uniform sampler2D t; varying vec2 uv;
             void main() { gl_FragColor = texture2D(t, uv) * vec4(0.5); }",
            Stage::Fragment,
            &[("uv", Value::constant(&[1.0, 0.5]))],
            &EchoUv,
        );
        assert_eq!(out["gl_FragColor"].components(), &[0.5, 0.25, 0.0, 0.5]);
    }

    #[test]
    fn vector_truncation() {
        let out = run(
            "uniform vec4 u; varying vec2 v; void main() { v = vec2(u); }",
            Stage::Vertex,
            &[("u", Value::constant(&[1.0, 2.0, 3.0, 4.0]))],
            &NoTextures,
        );
        assert_eq!(out["v"].components(), &[1.0, 2.0]);
    }
}
