//! Semantic checks: declarations, stage rules, precision, and expression types.

use std::collections::{BTreeSet, HashMap};

use crate::ast::{
    BinOp, Expr, ExprKind, Function, Global, Item, Precision, Stage, Stmt, Storage,
    TranslationUnit, Type,
};
use crate::error::ParseError;

/// A declared shader input/output visible to the host or the other stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub ty: Type,
}

/// The linkable surface of one checked shader.
#[derive(Debug, Clone, PartialEq)]
pub struct Interface {
    pub stage: Stage,
    pub attributes: Vec<Variable>,
    pub varyings: Vec<Variable>,
    pub uniforms: Vec<Variable>,
    /// Globals read by `main`. Attributes missing from this set are inactive.
    pub referenced: BTreeSet<String>,
    pub has_main: bool,
}

impl Interface {
    fn new(stage: Stage) -> Self {
        Self {
            stage,
            attributes: Vec::new(),
            varyings: Vec::new(),
            uniforms: Vec::new(),
            referenced: BTreeSet::new(),
            has_main: false,
        }
    }

    pub fn is_referenced(&self, name: &str) -> bool {
        self.referenced.contains(name)
    }

    pub fn varying(&self, name: &str) -> Option<&Variable> {
        self.varyings.iter().find(|v| v.name == name)
    }

    pub fn uniform(&self, name: &str) -> Option<&Variable> {
        self.uniforms.iter().find(|v| v.name == name)
    }
}

/// A translation unit that passed every semantic check for its stage.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedShader {
    pub unit: TranslationUnit,
    pub interface: Interface,
}

impl CheckedShader {
    pub fn stage(&self) -> Stage {
        self.interface.stage
    }

    /// Statements of `main`; empty when the shader has no entry point.
    pub fn main_body(&self) -> &[Stmt] {
        self.unit.function("main").map(|f| f.body.as_slice()).unwrap_or(&[])
    }
}

/// Built-in variables available per stage: `(name, type, writable)`.
fn builtins(stage: Stage) -> &'static [(&'static str, Type, bool)] {
    match stage {
        Stage::Vertex => &[("gl_Position", Type::Vec4, true)],
        Stage::Fragment => &[("gl_FragColor", Type::Vec4, true), ("gl_FragCoord", Type::Vec4, false)],
    }
}

// ── Checker ───────────────────────────────────────────────────────────────

struct Checker {
    stage: Stage,
    globals: HashMap<String, (Storage, Type)>,
    default_float_precision: Option<Precision>,
    interface: Interface,
}

pub fn check(unit: TranslationUnit, stage: Stage) -> Result<CheckedShader, ParseError> {
    let mut checker = Checker {
        stage,
        globals: HashMap::new(),
        default_float_precision: None,
        interface: Interface::new(stage),
    };
    for item in &unit.items {
        match item {
            Item::Precision(decl) => {
                match decl.ty {
                    Type::Float => checker.default_float_precision = Some(decl.precision),
                    Type::Sampler2D => {}
                    other => {
                        return Err(ParseError::new(
                            format!("'{other}' : precision statements apply to float and sampler types only"),
                            decl.line,
                            decl.col,
                        ));
                    }
                }
            }
            Item::Global(global) => checker.declare_global(global)?,
            Item::Function(function) => checker.check_function(function)?,
        }
    }
    Ok(CheckedShader { unit, interface: checker.interface })
}

impl Checker {
    fn require_precision(
        &self,
        ty: Type,
        precision: Option<Precision>,
        line: usize,
        col: usize,
    ) -> Result<(), ParseError> {
        let needs = self.stage == Stage::Fragment && ty.is_numeric();
        if needs && precision.is_none() && self.default_float_precision.is_none() {
            return Err(ParseError::new("No precision specified for (float)", line, col));
        }
        Ok(())
    }

    fn declare_global(&mut self, g: &Global) -> Result<(), ParseError> {
        let err = |msg: String| ParseError::new(msg, g.line, g.col);
        if g.name.starts_with("gl_") {
            return Err(err(format!("'{}' : reserved built-in name", g.name)));
        }
        if self.globals.contains_key(&g.name) {
            return Err(err(format!("'{}' : redefinition", g.name)));
        }
        if g.storage == Storage::Attribute && self.stage != Stage::Vertex {
            return Err(err("'attribute' : supported in vertex shaders only".to_string()));
        }
        if g.ty == Type::Sampler2D && g.storage != Storage::Uniform {
            return Err(err(format!("'{}' : samplers must be uniform", g.name)));
        }
        self.require_precision(g.ty, g.precision, g.line, g.col)?;

        self.globals.insert(g.name.clone(), (g.storage, g.ty));
        let var = Variable { name: g.name.clone(), ty: g.ty };
        match g.storage {
            Storage::Attribute => self.interface.attributes.push(var),
            Storage::Varying => self.interface.varyings.push(var),
            Storage::Uniform => self.interface.uniforms.push(var),
        }
        Ok(())
    }

    fn check_function(&mut self, f: &Function) -> Result<(), ParseError> {
        if f.name != "main" {
            return Err(ParseError::new(
                format!("'{}' : only 'main' may be defined", f.name),
                f.line,
                f.col,
            ));
        }
        if self.interface.has_main {
            return Err(ParseError::new("'main' : function already has a body", f.line, f.col));
        }
        self.interface.has_main = true;

        let mut locals: HashMap<String, Type> = HashMap::new();
        for stmt in &f.body {
            match stmt {
                Stmt::Local { precision, ty, name, init, line, col } => {
                    if locals.contains_key(name) {
                        return Err(ParseError::new(format!("'{name}' : redefinition"), *line, *col));
                    }
                    if !ty.is_numeric() {
                        return Err(ParseError::new(format!("'{name}' : samplers must be uniform"), *line, *col));
                    }
                    self.require_precision(*ty, *precision, *line, *col)?;
                    let init_ty = self.type_of(init, &locals)?;
                    if init_ty != *ty {
                        return Err(ParseError::new(
                            format!("'=' : cannot convert from '{init_ty}' to '{ty}'"),
                            *line,
                            *col,
                        ));
                    }
                    locals.insert(name.clone(), *ty);
                }
                Stmt::Assign { target, value, line, col } => {
                    let target_ty = self.writable_type(target, &locals, *line, *col)?;
                    let value_ty = self.type_of(value, &locals)?;
                    if value_ty != target_ty {
                        return Err(ParseError::new(
                            format!("'=' : cannot convert from '{value_ty}' to '{target_ty}'"),
                            *line,
                            *col,
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    fn writable_type(
        &self,
        target: &str,
        locals: &HashMap<String, Type>,
        line: usize,
        col: usize,
    ) -> Result<Type, ParseError> {
        if let Some(ty) = locals.get(target) {
            return Ok(*ty);
        }
        if let Some((storage, ty)) = self.globals.get(target) {
            let writable = *storage == Storage::Varying && self.stage == Stage::Vertex;
            if !writable {
                return Err(ParseError::new(
                    format!("'{target}' : l-value required (can't modify a {storage})"),
                    line,
                    col,
                ));
            }
            return Ok(*ty);
        }
        match builtins(self.stage).iter().find(|(name, _, _)| *name == target) {
            Some((_, ty, true)) => Ok(*ty),
            Some((_, _, false)) => Err(ParseError::new(
                format!("'{target}' : l-value required (read-only built-in)"),
                line,
                col,
            )),
            None => Err(ParseError::new(format!("'{target}' : undeclared identifier"), line, col)),
        }
    }

    fn type_of(&mut self, expr: &Expr, locals: &HashMap<String, Type>) -> Result<Type, ParseError> {
        let err = |msg: String| ParseError::new(msg, expr.line, expr.col);
        match &expr.kind {
            ExprKind::Number(_) => Ok(Type::Float),
            ExprKind::Ident(name) => {
                if let Some(ty) = locals.get(name) {
                    return Ok(*ty);
                }
                if let Some((_, ty)) = self.globals.get(name) {
                    self.interface.referenced.insert(name.clone());
                    return Ok(*ty);
                }
                builtins(self.stage)
                    .iter()
                    .find(|(builtin, _, _)| builtin == name)
                    .map(|(_, ty, _)| *ty)
                    .ok_or_else(|| err(format!("'{name}' : undeclared identifier")))
            }
            ExprKind::Neg(operand) => {
                let ty = self.type_of(operand, locals)?;
                if !ty.is_numeric() {
                    return Err(err(format!("'-' : wrong operand type - no operation '-' exists that takes an operand of type '{ty}'")));
                }
                Ok(ty)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.type_of(lhs, locals)?;
                let r = self.type_of(rhs, locals)?;
                let symbol = match op {
                    BinOp::Add => '+',
                    BinOp::Sub => '-',
                    BinOp::Mul => '*',
                    BinOp::Div => '/',
                };
                let result = match (l, r) {
                    _ if !l.is_numeric() || !r.is_numeric() => None,
                    _ if l == r => Some(l),
                    (Type::Float, other) | (other, Type::Float) => Some(other),
                    _ => None,
                };
                result.ok_or_else(|| {
                    err(format!(
                        "'{symbol}' : wrong operand types - no operation '{symbol}' exists that takes a left-hand operand of type '{l}' and a right operand of type '{r}'"
                    ))
                })
            }
            ExprKind::Swizzle { base, fields } => {
                let base_ty = self.type_of(base, locals)?;
                let n = base_ty.components();
                if fields.iter().any(|&i| i >= n) {
                    return Err(err(format!("vector field selection out of range for '{base_ty}'")));
                }
                Type::with_components(fields.len())
                    .ok_or_else(|| err("illegal vector field selection".to_string()))
            }
            ExprKind::Call { callee, args } => {
                let mut arg_types = Vec::with_capacity(args.len());
                for arg in args {
                    arg_types.push(self.type_of(arg, locals)?);
                }
                self.call_type(callee, &arg_types).map_err(err)
            }
        }
    }

    fn call_type(&self, callee: &str, args: &[Type]) -> Result<Type, String> {
        if callee == "texture2D" {
            return match args {
                [Type::Sampler2D, Type::Vec2] => Ok(Type::Vec4),
                _ => Err("'texture2D' : no matching overloaded function found".to_string()),
            };
        }
        let Some(target) = Type::from_keyword(callee).filter(|t| t.is_numeric()) else {
            return Err(format!("'{callee}' : no matching overloaded function found"));
        };
        if args.is_empty() {
            return Err(format!("'{callee}' : constructor does not have any arguments"));
        }
        if args.iter().any(|t| !t.is_numeric()) {
            return Err(format!("'{callee}' : cannot convert a sampler"));
        }
        let needed = target.components();
        if let [only] = args {
            // A scalar fills every component; a vector must cover them all.
            return if only.components() == 1 || only.components() >= needed {
                Ok(target)
            } else {
                Err(format!("'{callee}' : not enough data provided for construction"))
            };
        }
        let before_last: usize = args[..args.len() - 1].iter().map(|t| t.components()).sum();
        let total = before_last + args[args.len() - 1].components();
        if before_last >= needed {
            return Err(format!("'{callee}' : too many arguments"));
        }
        if total < needed {
            return Err(format!("'{callee}' : not enough data provided for construction"));
        }
        Ok(target)
    }
}
