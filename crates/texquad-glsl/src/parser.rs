use crate::ast::{
    BinOp, Expr, ExprKind, Function, Global, Item, Precision, PrecisionDecl, Stmt, Storage,
    TranslationUnit, Type,
};
use crate::error::ParseError;
use crate::lexer::{Lexer, Token, TokenWithPos};

// ── Parser ────────────────────────────────────────────────────────────────

pub struct Parser {
    tokens: Vec<TokenWithPos>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<TokenWithPos>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current_pos(&self) -> (usize, usize) {
        self.tokens
            .get(self.pos)
            .map(|t| (t.line, t.col))
            .or_else(|| self.tokens.last().map(|t| (t.line, t.col)))
            .unwrap_or((1, 1))
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).map(|t| &t.token).unwrap_or(&Token::Eof)
    }

    fn peek_ahead(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).map(|t| &t.token).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens.get(self.pos).map(|t| t.token.clone()).unwrap_or(Token::Eof);
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn err(&self, msg: impl Into<String>) -> ParseError {
        let (line, col) = self.current_pos();
        ParseError::new(msg, line, col)
    }

    fn syntax_error(&self) -> ParseError {
        let near = match self.peek() {
            Token::Eof => "end of input".to_string(),
            Token::Ident(s) => format!("'{s}'"),
            Token::Number(n) => format!("'{n}'"),
            tok => format!("{tok:?}"),
        };
        self.err(format!("syntax error near {near}"))
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Token::Ident(_) => match self.advance() {
                Token::Ident(s) => Ok(s),
                _ => Err(self.syntax_error()),
            },
            _ => Err(self.syntax_error()),
        }
    }

    fn expect_token(&mut self, expected: &Token) -> Result<(), ParseError> {
        if self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.syntax_error())
        }
    }

    fn peek_ident(&self) -> Option<&str> {
        match self.peek() {
            Token::Ident(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn parse_type(&mut self) -> Result<Type, ParseError> {
        let (line, col) = self.current_pos();
        let word = self.expect_ident()?;
        Type::from_keyword(&word)
            .ok_or_else(|| ParseError::new(format!("'{word}' : unknown type"), line, col))
    }

    fn parse_optional_precision(&mut self) -> Option<Precision> {
        let precision = self.peek_ident().and_then(Precision::from_keyword)?;
        self.advance();
        Some(precision)
    }

    // ── Translation unit ──────────────────────────────────────────────────

    pub fn parse_unit(&mut self) -> Result<TranslationUnit, ParseError> {
        let mut items = Vec::new();
        loop {
            let (line, col) = self.current_pos();
            let item = match self.peek() {
                Token::Eof => break,
                Token::Semicolon => {
                    self.advance();
                    continue;
                }
                Token::Ident(word) if word == "precision" => {
                    Item::Precision(self.parse_precision(line, col)?)
                }
                Token::Ident(word) if Storage::from_keyword(word).is_some() => {
                    Item::Global(self.parse_global(line, col)?)
                }
                Token::Ident(word) if word == "void" => {
                    Item::Function(self.parse_function(line, col)?)
                }
                _ => return Err(self.syntax_error()),
            };
            items.push(item);
        }
        Ok(TranslationUnit { items })
    }

    // ── Declarations ──────────────────────────────────────────────────────

    fn parse_precision(&mut self, line: usize, col: usize) -> Result<PrecisionDecl, ParseError> {
        self.advance(); // consume `precision`
        let precision = self
            .parse_optional_precision()
            .ok_or_else(|| self.err("expected a precision qualifier after 'precision'"))?;
        let ty = self.parse_type()?;
        self.expect_token(&Token::Semicolon)?;
        Ok(PrecisionDecl { precision, ty, line, col })
    }

    fn parse_global(&mut self, line: usize, col: usize) -> Result<Global, ParseError> {
        let storage = match self.advance() {
            Token::Ident(word) => Storage::from_keyword(&word),
            _ => None,
        }
        .ok_or_else(|| self.syntax_error())?;
        let precision = self.parse_optional_precision();
        let ty = self.parse_type()?;
        let name = self.expect_ident()?;
        if self.peek() == &Token::Assign {
            return Err(self.err(format!(
                "'{name}' : cannot initialize a {storage} variable"
            )));
        }
        self.expect_token(&Token::Semicolon)?;
        Ok(Global { storage, precision, ty, name, line, col })
    }

    fn parse_function(&mut self, line: usize, col: usize) -> Result<Function, ParseError> {
        self.advance(); // consume `void`
        let name = self.expect_ident()?;
        self.expect_token(&Token::LParen)?;
        if self.peek_ident() == Some("void") {
            self.advance();
        }
        if self.peek() != &Token::RParen {
            return Err(self.err(format!("'{name}' : function parameters are not supported")));
        }
        self.advance();
        if self.peek() == &Token::Semicolon {
            return Err(self.err(format!("'{name}' : function prototypes are not supported")));
        }
        let body = self.parse_block()?;
        Ok(Function { name, body, line, col })
    }

    // ── Statements ────────────────────────────────────────────────────────

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect_token(&Token::LBrace)?;
        let mut body = Vec::new();
        loop {
            match self.peek() {
                Token::RBrace => {
                    self.advance();
                    break;
                }
                Token::Eof => return Err(self.err("unexpected end of input: unclosed '{' block")),
                Token::Semicolon => {
                    self.advance();
                }
                _ => body.push(self.parse_stmt()?),
            }
        }
        Ok(body)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        let (line, col) = self.current_pos();
        let starts_decl = self
            .peek_ident()
            .is_some_and(|w| Type::from_keyword(w).is_some() || Precision::from_keyword(w).is_some());
        let is_constructor_call = self.peek_ahead(1) == &Token::LParen;

        let stmt = if starts_decl && !is_constructor_call {
            let precision = self.parse_optional_precision();
            let ty = self.parse_type()?;
            let name = self.expect_ident()?;
            self.expect_token(&Token::Assign)?;
            let init = self.parse_expr()?;
            Stmt::Local { precision, ty, name, init, line, col }
        } else {
            let target = self.expect_ident()?;
            if self.peek() != &Token::Assign {
                return Err(match self.peek() {
                    Token::Dot => self.err(format!("'{target}' : swizzled assignment is not supported")),
                    _ => self.syntax_error(),
                });
            }
            self.advance();
            let value = self.parse_expr()?;
            Stmt::Assign { target, value, line, col }
        };
        self.expect_token(&Token::Semicolon)?;
        Ok(stmt)
    }

    // ── Expressions ───────────────────────────────────────────────────────

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            let (line, col) = self.current_pos();
            self.advance();
            let rhs = self.parse_term()?;
            lhs = Expr {
                kind: ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) },
                line,
                col,
            };
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                _ => break,
            };
            let (line, col) = self.current_pos();
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr {
                kind: ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) },
                line,
                col,
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let (line, col) = self.current_pos();
        match self.peek() {
            Token::Minus => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr { kind: ExprKind::Neg(Box::new(operand)), line, col })
            }
            Token::Plus => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        while self.peek() == &Token::Dot {
            let (line, col) = self.current_pos();
            self.advance();
            let selector = self.expect_ident()?;
            let fields = parse_swizzle(&selector)
                .ok_or_else(|| ParseError::new(format!("'{selector}' : illegal vector field selection"), line, col))?;
            expr = Expr { kind: ExprKind::Swizzle { base: Box::new(expr), fields }, line, col };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let (line, col) = self.current_pos();
        match self.peek().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expr { kind: ExprKind::Number(n), line, col })
            }
            Token::Ident(name) => {
                self.advance();
                if self.peek() == &Token::LParen {
                    let args = self.parse_args()?;
                    Ok(Expr { kind: ExprKind::Call { callee: name, args }, line, col })
                } else {
                    Ok(Expr { kind: ExprKind::Ident(name), line, col })
                }
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect_token(&Token::RParen)?;
                Ok(inner)
            }
            _ => Err(self.syntax_error()),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.advance(); // consume `(`
        let mut args = Vec::new();
        if self.peek() == &Token::RParen {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            match self.peek() {
                Token::Comma => {
                    self.advance();
                }
                Token::RParen => {
                    self.advance();
                    break;
                }
                _ => return Err(self.syntax_error()),
            }
        }
        Ok(args)
    }
}

/// Resolves a swizzle selector such as `xy`, `rgba` or `st` to component indices.
///
/// Selectors may not mix naming sets and are at most four components long.
fn parse_swizzle(selector: &str) -> Option<Vec<usize>> {
    const SETS: [&str; 3] = ["xyzw", "rgba", "stpq"];
    if selector.is_empty() || selector.len() > 4 {
        return None;
    }
    SETS.iter().find_map(|set| {
        selector.chars().map(|c| set.find(c)).collect::<Option<Vec<usize>>>()
    })
}

// ── Public parse entry point ──────────────────────────────────────────────

/// Parse a shader source string into a [`TranslationUnit`] without type checking.
pub fn parse_str(src: &str) -> Result<TranslationUnit, ParseError> {
    let tokens = Lexer::new(src).tokenize()?;
    Parser::new(tokens).parse_unit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn main_body(src: &str) -> Vec<Stmt> {
        let unit = parse_str(src).unwrap();
        unit.function("main").unwrap().body.clone()
    }

    #[test]
    fn precedence_mul_binds_tighter_than_add() {
        let body = main_body("void main() { x = a + b * c; }");
        let Stmt::Assign { value, .. } = &body[0] else { panic!("expected assignment") };
        let ExprKind::Binary { op: BinOp::Add, rhs, .. } = &value.kind else {
            panic!("expected add at the root, got {:?}", value.kind)
        };
        assert!(matches!(rhs.kind, ExprKind::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn swizzles_resolve_to_indices() {
        let body = main_body("void main() { x = v.zx; y = c.ba; }");
        let Stmt::Assign { value, .. } = &body[0] else { panic!() };
        assert!(matches!(&value.kind, ExprKind::Swizzle { fields, .. } if fields == &vec![2, 0]));
        let Stmt::Assign { value, .. } = &body[1] else { panic!() };
        assert!(matches!(&value.kind, ExprKind::Swizzle { fields, .. } if fields == &vec![2, 3]));
    }

    #[test]
    fn mixed_swizzle_sets_are_rejected() {
        assert!(parse_str("void main() { x = v.xg; }").is_err());
        assert!(parse_str("void main() { x = v.xyzwx; }").is_err());
    }

    #[test]
    fn local_declaration_vs_constructor_statement() {
        let body = main_body("void main() { vec4 c = vec4(1.0); }");
        assert!(matches!(&body[0], Stmt::Local { ty: Type::Vec4, name, .. } if name == "c"));
    }

    #[test]
    fn globals_keep_their_qualifiers() {
        let unit = parse_str("attribute vec2 a_position; uniform lowp sampler2D tex;").unwrap();
        let globals: Vec<_> = unit.globals().collect();
        assert_eq!(globals[0].storage, Storage::Attribute);
        assert_eq!(globals[0].ty, Type::Vec2);
        assert_eq!(globals[1].precision, Some(Precision::Low));
        assert_eq!(globals[1].ty, Type::Sampler2D);
    }

    #[test]
    fn missing_semicolon_reports_position() {
        let err = parse_str("void main() {\n  x = 1.0\n}").unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.message.starts_with("syntax error"));
    }

    #[test]
    fn function_parameters_are_unsupported() {
        assert!(parse_str("void helper(float x) { }").is_err());
    }

    #[test]
    fn unclosed_block() {
        assert!(parse_str("void main() { x = 1.0;").is_err());
    }
}
