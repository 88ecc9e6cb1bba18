use crate::error::ParseError;

// ── Token ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Ident(String),
    Number(f32),
    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    Semicolon,
    Comma,
    Dot,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    // Sentinel
    Eof,
}

/// A token together with the 1-based position of its first character.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenWithPos {
    pub token: Token,
    pub line: usize,
    pub col: usize,
}

// ── Lexer ─────────────────────────────────────────────────────────────────

/// Only `#version 100` is accepted as a preprocessor line.
const SUPPORTED_VERSION: &str = "100";

pub struct Lexer<'s> {
    src: &'s str,
    pos: usize,
    line: usize,
    col: usize,
    /// True until the first non-whitespace character of the current line.
    at_line_start: bool,
}

impl<'s> Lexer<'s> {
    pub fn new(src: &'s str) -> Self {
        Self { src, pos: 0, line: 1, col: 1, at_line_start: true }
    }

    pub fn tokenize(mut self) -> Result<Vec<TokenWithPos>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments()?;
            let (line, col) = (self.line, self.col);
            let token = self.next_token()?;
            let eof = token == Token::Eof;
            tokens.push(TokenWithPos { token, line, col });
            if eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn err(&self, msg: impl Into<String>) -> ParseError {
        ParseError::new(msg, self.line, self.col)
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
            self.at_line_start = true;
        } else {
            self.col += 1;
            if !ch.is_whitespace() {
                self.at_line_start = false;
            }
        }
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), ParseError> {
        loop {
            while matches!(self.peek(), Some(c) if c.is_whitespace()) {
                self.advance();
            }
            if self.rest().starts_with("//") {
                while !matches!(self.peek(), None | Some('\n')) {
                    self.advance();
                }
            } else if self.rest().starts_with("/*") {
                let (line, col) = (self.line, self.col);
                self.advance();
                self.advance();
                loop {
                    if self.rest().starts_with("*/") {
                        self.advance();
                        self.advance();
                        break;
                    }
                    if self.advance().is_none() {
                        return Err(ParseError::new("unterminated block comment", line, col));
                    }
                }
            } else if self.peek() == Some('#') && self.at_line_start {
                self.lex_directive()?;
            } else {
                return Ok(());
            }
        }
    }

    fn lex_directive(&mut self) -> Result<(), ParseError> {
        let (line, col) = (self.line, self.col);
        let start = self.pos;
        while !matches!(self.peek(), None | Some('\n')) {
            self.advance();
        }
        let directive = self.src[start..self.pos].trim();
        let mut words = directive[1..].split_whitespace();
        match (words.next(), words.next(), words.next()) {
            (Some("version"), Some(SUPPORTED_VERSION), None) => Ok(()),
            (Some("version"), Some(v), _) => Err(ParseError::new(
                format!("version '{v}' is not supported"),
                line,
                col,
            )),
            (Some(other), _, _) => Err(ParseError::new(
                format!("unsupported preprocessor directive '#{other}'"),
                line,
                col,
            )),
            (None, _, _) => Ok(()), // a lone `#` is the null directive
        }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        let ch = match self.peek() {
            None => return Ok(Token::Eof),
            Some(c) => c,
        };

        let punct = match ch {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            ';' => Some(Token::Semicolon),
            ',' => Some(Token::Comma),
            '=' => Some(Token::Assign),
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            _ => None,
        };
        if let Some(tok) = punct {
            self.advance();
            return Ok(tok);
        }

        match ch {
            '.' if matches!(self.peek_second(), Some(c) if c.is_ascii_digit()) => self.lex_number(),
            '.' => {
                self.advance();
                Ok(Token::Dot)
            }
            c if c.is_ascii_digit() => self.lex_number(),
            c if c.is_ascii_alphabetic() || c == '_' => Ok(self.lex_ident()),
            other => Err(self.err(format!("'{other}' : unexpected character"))),
        }
    }

    fn lex_digits(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn lex_number(&mut self) -> Result<Token, ParseError> {
        let start = self.pos;
        self.lex_digits();
        if self.peek() == Some('.') {
            self.advance();
            self.lex_digits();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.advance();
            if matches!(self.peek(), Some('+' | '-')) {
                self.advance();
            }
            self.lex_digits();
        }
        let s = &self.src[start..self.pos];
        if matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            return Err(self.err(format!("'{s}' : invalid numeric literal suffix")));
        }
        s.parse::<f32>()
            .map(Token::Number)
            .map_err(|_| self.err(format!("'{s}' : invalid numeric literal")))
    }

    fn lex_ident(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }
        Token::Ident(self.src[start..self.pos].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        Lexer::new(src).tokenize().unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn numbers_in_all_forms() {
        assert_eq!(
            kinds("0 0.5 .25 1e2 2."),
            vec![
                Token::Number(0.0),
                Token::Number(0.5),
                Token::Number(0.25),
                Token::Number(100.0),
                Token::Number(2.0),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn swizzle_dot_is_punctuation() {
        assert_eq!(
            kinds("v.xy"),
            vec![
                Token::Ident("v".into()),
                Token::Dot,
                Token::Ident("xy".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn positions_are_one_based() {
        let toks = Lexer::new("a\n  b").tokenize().unwrap();
        assert_eq!((toks[0].line, toks[0].col), (1, 1));
        assert_eq!((toks[1].line, toks[1].col), (2, 3));
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(kinds("// x\n/* y\n z */ a"), vec![Token::Ident("a".into()), Token::Eof]);
    }

    #[test]
    fn version_directive() {
        assert_eq!(kinds("#version 100\nx"), vec![Token::Ident("x".into()), Token::Eof]);
        assert!(Lexer::new("#version 330 core\n").tokenize().is_err());
        assert!(Lexer::new("#define FOO 1\n").tokenize().is_err());
    }

    #[test]
    fn unterminated_comment_is_an_error() {
        let err = Lexer::new("a /* never closed").tokenize().unwrap_err();
        assert_eq!((err.line, err.col), (1, 3));
    }

    #[test]
    fn stray_character_is_an_error() {
        assert!(Lexer::new("a @ b").tokenize().is_err());
    }
}
