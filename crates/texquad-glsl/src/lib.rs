//! Lexer, parser, and checker for the **GLSL ES 1.00 subset** that texquad
//! shaders are written in.
//!
//! This crate is intentionally dependency-free so shader sources can be
//! validated by tooling without pulling in the engine or any GL binding.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`ast`] | `TranslationUnit`, `Item`, `Stmt`, `Expr`, `Type`, `Stage` |
//! | [`check`] | `check`, `CheckedShader`, `Interface` |
//! | [`error`] | `ParseError` |
//! | [`lexer`] | `Lexer`, `Token` |
//! | [`parser`] | `parse_str` |
//!
//! # Supported language
//!
//! - `#version 100`, `precision` statements, `attribute` / `varying` /
//!   `uniform` globals of type `float`, `vec2`–`vec4`, `sampler2D`
//! - a single `void main()` made of local declarations and assignments
//! - `+ - * /`, unary minus, swizzles, vector constructors, `texture2D`
//!
//! Numeric literals are all treated as `float`.
//!
//! # Quick start
//!
//! ```rust
//! use texquad_glsl::{compile, Stage};
//!
//! let src = r#"
//!     attribute vec2 a_position;
//!     void main() { gl_Position = vec4(a_position, 0.0, 1.0); }
//! "#;
//!
//! let shader = compile(src, Stage::Vertex).unwrap();
//! assert!(shader.interface.is_referenced("a_position"));
//! ```

pub mod ast;
pub mod check;
pub mod error;
pub mod lexer;
pub mod parser;

pub use ast::{Stage, Type};
pub use check::{CheckedShader, Interface, Variable};
pub use error::ParseError;
pub use parser::parse_str;

/// Parse and check `src` as a shader for `stage`.
pub fn compile(src: &str, stage: Stage) -> Result<CheckedShader, ParseError> {
    check::check(parse_str(src)?, stage)
}
