//! Syntax tree for the supported GLSL ES 1.00 subset.

use std::fmt;

/// Programmable pipeline stage a shader source targets.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Stage {
    Vertex,
    Fragment,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Vertex => "vertex",
            Stage::Fragment => "fragment",
        })
    }
}

/// Value types understood by the checker and the interpreters built on it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Type {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Sampler2D,
}

impl Type {
    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "float" => Type::Float,
            "vec2" => Type::Vec2,
            "vec3" => Type::Vec3,
            "vec4" => Type::Vec4,
            "sampler2D" => Type::Sampler2D,
            _ => return None,
        })
    }

    /// Floating-point vector type with `n` components (`1` is `float`).
    pub fn with_components(n: usize) -> Option<Self> {
        Some(match n {
            1 => Type::Float,
            2 => Type::Vec2,
            3 => Type::Vec3,
            4 => Type::Vec4,
            _ => return None,
        })
    }

    /// Number of float components; `0` for opaque types.
    pub fn components(self) -> usize {
        match self {
            Type::Float => 1,
            Type::Vec2 => 2,
            Type::Vec3 => 3,
            Type::Vec4 => 4,
            Type::Sampler2D => 0,
        }
    }

    pub fn is_numeric(self) -> bool {
        self.components() > 0
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Type::Float => "float",
            Type::Vec2 => "vec2",
            Type::Vec3 => "vec3",
            Type::Vec4 => "vec4",
            Type::Sampler2D => "sampler2D",
        })
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Precision {
    Low,
    Medium,
    High,
}

impl Precision {
    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "lowp" => Precision::Low,
            "mediump" => Precision::Medium,
            "highp" => Precision::High,
            _ => return None,
        })
    }
}

/// Storage qualifier of a global declaration.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Storage {
    Attribute,
    Varying,
    Uniform,
}

impl Storage {
    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "attribute" => Storage::Attribute,
            "varying" => Storage::Varying,
            "uniform" => Storage::Uniform,
            _ => return None,
        })
    }
}

impl fmt::Display for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Storage::Attribute => "attribute",
            Storage::Varying => "varying",
            Storage::Uniform => "uniform",
        })
    }
}

// ── Declarations ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub storage: Storage,
    pub precision: Option<Precision>,
    pub ty: Type,
    pub name: String,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrecisionDecl {
    pub precision: Precision,
    pub ty: Type,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub body: Vec<Stmt>,
    pub line: usize,
    pub col: usize,
}

/// Top-level items in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Precision(PrecisionDecl),
    Global(Global),
    Function(Function),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TranslationUnit {
    pub items: Vec<Item>,
}

impl TranslationUnit {
    pub fn globals(&self) -> impl Iterator<Item = &Global> {
        self.items.iter().filter_map(|item| match item {
            Item::Global(g) => Some(g),
            _ => None,
        })
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.items.iter().find_map(|item| match item {
            Item::Function(f) if f.name == name => Some(f),
            _ => None,
        })
    }
}

// ── Statements ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `vec4 c = expr;`
    Local {
        precision: Option<Precision>,
        ty: Type,
        name: String,
        init: Expr,
        line: usize,
        col: usize,
    },
    /// `name = expr;`
    Assign {
        target: String,
        value: Expr,
        line: usize,
        col: usize,
    },
}

// ── Expressions ───────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Number(f32),
    Ident(String),
    /// Constructor or built-in function call.
    Call { callee: String, args: Vec<Expr> },
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Neg(Box<Expr>),
    /// Component selection; indices are already resolved to `0..4`.
    Swizzle { base: Box<Expr>, fields: Vec<usize> },
}
