//! Tokenizer for preprocessed C.
//!
//! Input is normally the output of `cc -E`: comments are gone and directives
//! are reduced to line markers (`# 12 "webgpu.h" 2`) and the odd `#pragma`.
//! Line markers are honoured so every token knows where it came from in the
//! original header. Comments, line splices, and unprocessed directives are
//! still tolerated so hand-written test input can be tokenized directly.

use std::sync::Arc;

use super::types::Location;
use super::HeaderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    /// A preprocessing number; validated when it is used
    Number,
    /// Character constant including quotes and any encoding prefix
    Char,
    /// String literal including quotes and any encoding prefix
    Str,
    Punct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub text: &'src str,
    pub location: Location,
}

impl Token<'_> {
    pub fn is_punct(&self, p: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == p
    }

    pub fn is_ident(&self, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == name
    }
}

/// Punctuators, longest first so the first match is the maximal munch.
const PUNCTUATORS: &[&str] = &[
    "...", "<<=", ">>=", "->", "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "*=",
    "/=", "%=", "+=", "-=", "&=", "^=", "|=", "##", "[", "]", "(", ")", "{", "}", ".", "&", "*",
    "+", "-", "~", "!", "/", "%", "<", ">", "^", "|", "?", ":", ";", "=", ",", "#",
];

/// Tokenize `src`, attributing tokens to `file` until a line marker says otherwise.
pub fn tokenize<'src>(src: &'src str, file: &str) -> Result<Vec<Token<'src>>, HeaderError> {
    Lexer::new(src, file).run()
}

struct Lexer<'src> {
    src: &'src str,
    pos: usize,
    file: Arc<str>,
    line: u32,
    column: u32,
    at_line_start: bool,
    tokens: Vec<Token<'src>>,
}

impl<'src> Lexer<'src> {
    fn new(src: &'src str, file: &str) -> Self {
        Lexer {
            src,
            pos: 0,
            file: Arc::from(file),
            line: 1,
            column: 1,
            at_line_start: true,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token<'src>>, HeaderError> {
        while let Some(c) = self.peek() {
            match c {
                '\n' => self.bump(),
                ' ' | '\t' | '\r' | '\x0b' | '\x0c' => self.bump(),
                '\\' if self.peek_at(1) == Some('\n') => {
                    self.bump();
                    self.bump();
                }
                '\\' if self.peek_at(1) == Some('\r') && self.peek_at(2) == Some('\n') => {
                    self.bump();
                    self.bump();
                    self.bump();
                }
                '/' if self.peek_at(1) == Some('/') => self.skip_line(),
                '/' if self.peek_at(1) == Some('*') => self.skip_block_comment()?,
                '#' if self.at_line_start => self.directive(),
                c if c == '_' || c == '$' || c.is_ascii_alphabetic() => self.ident_or_literal()?,
                c if c.is_ascii_digit() => self.number(),
                '.' if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => self.number(),
                '\'' => self.quoted('\'', self.pos, self.location())?,
                '"' => self.quoted('"', self.pos, self.location())?,
                _ => self.punct()?,
            }
        }
        Ok(self.tokens)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
            if c == '\n' {
                self.line += 1;
                self.column = 1;
                self.at_line_start = true;
            } else {
                self.column += 1;
            }
        }
    }

    fn location(&self) -> Location {
        Location {
            file: self.file.clone(),
            line: self.line,
            column: self.column,
        }
    }

    fn error(&self, location: Location, message: impl Into<String>) -> HeaderError {
        HeaderError::Parse {
            location,
            message: message.into(),
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize, location: Location) {
        self.tokens.push(Token {
            kind,
            text: &self.src[start..self.pos],
            location,
        });
        self.at_line_start = false;
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), HeaderError> {
        let location = self.location();
        // A comment does not end the "start of line" state for directives.
        let at_line_start = self.at_line_start;
        self.bump();
        self.bump();
        loop {
            match self.peek() {
                None => return Err(self.error(location, "unterminated comment")),
                Some('*') if self.peek_at(1) == Some('/') => {
                    self.bump();
                    self.bump();
                    break;
                }
                Some('\n') => self.bump(),
                Some(_) => {
                    self.bump();
                    self.at_line_start = at_line_start;
                }
            }
        }
        Ok(())
    }

    /// Handle a `#` at the start of a line.
    ///
    /// Line markers (`# 12 "file"` or `#line 12 "file"`) retarget the
    /// location of the following line; every other directive is skipped.
    fn directive(&mut self) {
        let start = self.pos;
        self.skip_line();
        let text = &self.src[start + 1..self.pos];

        if let Some((line, file)) = parse_line_marker(text) {
            if let Some(file) = file {
                self.file = Arc::from(file.as_str());
            }
            // The newline ending the marker advances to `line`.
            self.line = line.saturating_sub(1);
        }
    }

    fn ident_or_literal(&mut self) -> Result<(), HeaderError> {
        let start = self.pos;
        let location = self.location();
        while let Some(c) = self.peek() {
            if c == '_' || c == '$' || c.is_ascii_alphanumeric() {
                self.bump();
            } else {
                break;
            }
        }

        let text = &self.src[start..self.pos];
        if matches!(text, "L" | "u" | "U" | "u8") {
            if let Some(quote @ ('\'' | '"')) = self.peek() {
                return self.quoted(quote, start, location);
            }
        }

        self.push(TokenKind::Ident, start, location);
        Ok(())
    }

    fn number(&mut self) {
        let start = self.pos;
        let location = self.location();
        while let Some(c) = self.peek() {
            if matches!(c, 'e' | 'E' | 'p' | 'P')
                && matches!(self.peek_at(1), Some('+') | Some('-'))
            {
                self.bump();
                self.bump();
            } else if c == '_' || c == '.' || c.is_ascii_alphanumeric() {
                self.bump();
            } else {
                break;
            }
        }
        self.push(TokenKind::Number, start, location);
    }

    fn quoted(&mut self, quote: char, start: usize, location: Location) -> Result<(), HeaderError> {
        self.bump();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    let what = if quote == '\'' {
                        "character constant"
                    } else {
                        "string literal"
                    };
                    return Err(self.error(location, format!("unterminated {}", what)));
                }
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some(c) if c == quote => {
                    self.bump();
                    break;
                }
                Some(_) => self.bump(),
            }
        }
        let kind = if quote == '\'' {
            TokenKind::Char
        } else {
            TokenKind::Str
        };
        self.push(kind, start, location);
        Ok(())
    }

    fn punct(&mut self) -> Result<(), HeaderError> {
        let start = self.pos;
        let location = self.location();
        let rest = &self.src[self.pos..];
        let Some(p) = PUNCTUATORS.iter().find(|p| rest.starts_with(**p)) else {
            let c = self.peek().unwrap_or_default();
            return Err(self.error(location, format!("unexpected character `{}`", c)));
        };
        for _ in 0..p.len() {
            self.bump();
        }
        self.push(TokenKind::Punct, start, location);
        Ok(())
    }
}

/// Parse the body of a line marker directive (text after `#`).
///
/// Accepts both the GNU form `12 "file" 1 3` and `line 12 "file"`.
fn parse_line_marker(text: &str) -> Option<(u32, Option<String>)> {
    let text = text.trim_start();
    let text = text
        .strip_prefix("line")
        .filter(|rest| rest.starts_with(char::is_whitespace))
        .unwrap_or(text)
        .trim_start();

    let digits_end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    if digits_end == 0 {
        return None;
    }
    let line: u32 = text[..digits_end].parse().ok()?;

    let rest = text[digits_end..].trim_start();
    let file = rest.strip_prefix('"').and_then(|rest| {
        let mut name = String::new();
        let mut chars = rest.chars();
        while let Some(c) = chars.next() {
            match c {
                '"' => return Some(name),
                '\\' => name.push(chars.next()?),
                c => name.push(c),
            }
        }
        None
    });

    Some((line, file))
}
