//! Declaration scanner and constant-expression parser.
//!
//! The scanner walks the translation unit one external declaration at a
//! time. Each declaration must open with a declaration specifier and close
//! with `;` or a function body, with balanced brackets in between. Enum
//! specifiers with bodies and typedefs are recorded; the rest of a
//! declaration is only checked for shape. Enumerator initializers are parsed
//! into [`Expr`] trees with C operator precedence.

use std::collections::HashSet;

use super::lexer::{Token, TokenKind};
use super::types::{
    BinaryOp, CharLiteral, EnumDecl, Enumerator, Expr, ExprKind, IntLiteral, Location, Radix,
    TranslationUnit, TypeName, Typedef, TypedefTarget, UnaryOp,
};
use super::HeaderError;

/// Words that can never name an enumerator.
const KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while", "_Alignas", "_Alignof", "_Atomic", "_Bool",
    "_Complex", "_Generic", "_Imaginary", "_Noreturn", "_Static_assert", "_Thread_local",
];

/// Type specifier keywords.
const TYPE_SPECIFIERS: &[&str] = &[
    "void", "char", "short", "int", "long", "float", "double", "signed", "unsigned", "_Bool",
    "_Complex", "__int128", "__signed__", "__signed", "__unsigned__", "_Float16", "_Float32",
    "_Float64", "_Float128", "__float128",
];

/// Qualifiers and storage words dropped from type names.
const QUALIFIERS: &[&str] = &[
    "const", "volatile", "restrict", "__const", "__const__", "__volatile__", "__restrict",
    "__restrict__", "_Atomic", "__extension__", "__inline", "__inline__", "inline", "extern",
    "static", "register", "_Noreturn", "_Thread_local",
];

/// GNU/MSVC attribute introducers followed by a parenthesized argument list.
const ATTRIBUTES: &[&str] = &["__attribute__", "__attribute", "__declspec", "__asm__", "__asm"];

/// Words that may open a declaration besides type names and qualifiers.
const DECLARATION_STARTS: &[&str] = &[
    "typedef", "auto", "_Static_assert", "static_assert", "_Alignas", "alignas", "typeof",
    "typeof_unqual", "bool", "constexpr", "thread_local",
];

/// Scan a token stream for enums and typedefs.
pub fn parse(tokens: &[Token<'_>]) -> Result<TranslationUnit, HeaderError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        typedef_names: HashSet::new(),
        unit: TranslationUnit::default(),
    };
    parser.scan()?;
    Ok(parser.unit)
}

/// Parse a standalone constant expression.
pub fn parse_expression(tokens: &[Token<'_>]) -> Result<Expr, HeaderError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        typedef_names: HashSet::new(),
        unit: TranslationUnit::default(),
    };
    let expr = parser.conditional()?;
    if let Some(tok) = parser.peek() {
        return Err(parse_error(
            &tok.location,
            format!("unexpected `{}` after expression", tok.text),
        ));
    }
    Ok(expr)
}

fn parse_error(location: &Location, message: impl Into<String>) -> HeaderError {
    HeaderError::Parse {
        location: location.clone(),
        message: message.into(),
    }
}

struct Parser<'t, 'src> {
    tokens: &'t [Token<'src>],
    pos: usize,
    typedef_names: HashSet<String>,
    unit: TranslationUnit,
}

impl<'t, 'src> Parser<'t, 'src> {
    fn peek(&self) -> Option<&'t Token<'src>> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, n: usize) -> Option<&'t Token<'src>> {
        self.tokens.get(self.pos + n)
    }

    fn next(&mut self) -> Option<&'t Token<'src>> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn at_punct(&self, p: &str) -> bool {
        self.peek().is_some_and(|t| t.is_punct(p))
    }

    /// Location for "unexpected end of input" errors.
    fn end_location(&self) -> Location {
        self.tokens
            .last()
            .map(|t| t.location.clone())
            .unwrap_or_else(|| Location::new("<input>", 1, 1))
    }

    fn expect_punct(&mut self, p: &str, context: &str) -> Result<(), HeaderError> {
        match self.next() {
            Some(tok) if tok.is_punct(p) => Ok(()),
            Some(tok) => Err(parse_error(
                &tok.location,
                format!("expected `{}` {}, found `{}`", p, context, tok.text),
            )),
            None => Err(parse_error(
                &self.end_location(),
                format!("expected `{}` {}, found end of input", p, context),
            )),
        }
    }

    fn scan(&mut self) -> Result<(), HeaderError> {
        while self.peek().is_some() {
            self.external_declaration()?;
        }
        Ok(())
    }

    /// Whether `tok` can open an external declaration.
    ///
    /// Reserved identifiers (`__builtin_va_list`, `_Float32x`) are accepted
    /// as compiler builtins.
    fn starts_declaration(&self, tok: &Token<'_>) -> bool {
        if tok.kind != TokenKind::Ident {
            return false;
        }
        self.starts_type_name(tok)
            || DECLARATION_STARTS.contains(&tok.text)
            || ATTRIBUTES.contains(&tok.text)
            || is_reserved(tok.text)
    }

    /// Consume one external declaration or function definition.
    fn external_declaration(&mut self) -> Result<(), HeaderError> {
        let Some(first) = self.peek() else {
            return Ok(());
        };
        if first.is_punct(";") {
            self.pos += 1;
            return Ok(());
        }
        let c23_attribute =
            first.is_punct("[") && self.peek_at(1).is_some_and(|t| t.is_punct("["));
        if !c23_attribute && !self.starts_declaration(first) {
            let message = if first.kind == TokenKind::Ident && !KEYWORDS.contains(&first.text) {
                format!("unknown type name `{}`", first.text)
            } else {
                format!("expected declaration, found `{}`", first.text)
            };
            return Err(parse_error(&first.location, message));
        }

        let mut open: Vec<&'t Token<'src>> = Vec::new();
        let mut after_params = false;

        while let Some(tok) = self.peek() {
            if tok.kind == TokenKind::Ident && ATTRIBUTES.contains(&tok.text) {
                self.skip_attributes()?;
                continue;
            }
            if tok.is_ident("typedef") {
                self.scan_typedef(self.pos)?;
            } else if tok.is_ident("enum") && self.enum_specifier()? {
                after_params = false;
                continue;
            }
            self.pos += 1;

            if tok.kind != TokenKind::Punct {
                after_params = false;
                continue;
            }
            match tok.text {
                "{" if open.is_empty() && after_params => {
                    // Function body: skip to its closing brace.
                    self.pos = self.matching_close(self.pos - 1)? + 1;
                    return Ok(());
                }
                "(" | "[" | "{" => open.push(tok),
                ")" | "]" | "}" => {
                    let expected = match tok.text {
                        ")" => "(",
                        "]" => "[",
                        _ => "{",
                    };
                    match open.pop() {
                        Some(o) if o.text == expected => {}
                        Some(o) => {
                            return Err(parse_error(
                                &tok.location,
                                format!("mismatched `{}`, `{}` is still open", tok.text, o.text),
                            ))
                        }
                        None => {
                            return Err(parse_error(
                                &tok.location,
                                format!("unexpected `{}`", tok.text),
                            ))
                        }
                    }
                }
                ";" if open.is_empty() => return Ok(()),
                _ => {}
            }
            after_params = open.is_empty() && tok.text == ")";
        }

        match open.last() {
            Some(o) => Err(parse_error(&o.location, format!("unbalanced `{}`", o.text))),
            None => Err(parse_error(
                &self.end_location(),
                "expected `;` at end of declaration, found end of input",
            )),
        }
    }

    /// Skip `__attribute__((...))` and friends at the current position.
    fn skip_attributes(&mut self) -> Result<(), HeaderError> {
        while let Some(tok) = self.peek() {
            if tok.kind != TokenKind::Ident || !ATTRIBUTES.contains(&tok.text) {
                break;
            }
            self.pos += 1;
            if self.at_punct("(") {
                self.pos = self.matching_close(self.pos)? + 1;
            }
        }
        Ok(())
    }

    /// Index of the bracket closing the one at `open`.
    fn matching_close(&self, open: usize) -> Result<usize, HeaderError> {
        let mut depth = 0usize;
        for (i, tok) in self.tokens.iter().enumerate().skip(open) {
            if tok.kind != TokenKind::Punct {
                continue;
            }
            match tok.text {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                _ => {}
            }
        }
        Err(parse_error(
            &self.tokens[open].location,
            format!("unbalanced `{}`", self.tokens[open].text),
        ))
    }

    /// Parse `enum [attrs] [tag] [: type] { ... }` at the current `enum` token.
    ///
    /// Returns `false` without consuming anything when the specifier has no
    /// body (a reference such as `enum WGPUFoo x;`).
    fn enum_specifier(&mut self) -> Result<bool, HeaderError> {
        let start = self.pos;
        let location = self.tokens[start].location.clone();
        self.pos += 1;
        self.skip_attributes()?;

        let mut tag = None;
        if let Some(tok) = self.peek() {
            if tok.kind == TokenKind::Ident && !KEYWORDS.contains(&tok.text) {
                tag = Some(tok.text.to_string());
                self.pos += 1;
                self.skip_attributes()?;
            }
        }

        let mut underlying = None;
        if self.at_punct(":") && self.peek_at(1).is_some_and(|t| self.starts_type_name(t)) {
            self.pos += 1;
            let ty = self.type_name()?;
            if ty.pointers > 0 {
                return Err(parse_error(
                    &location,
                    format!("invalid underlying type `{}` for enum", ty),
                ));
            }
            underlying = Some(ty);
        }

        if !self.at_punct("{") {
            self.pos = start;
            return Ok(false);
        }
        self.pos += 1;

        let enumerators = self.enumerator_list(&location)?;
        self.unit.enums.push(EnumDecl {
            tag,
            underlying,
            enumerators,
            location,
        });
        Ok(true)
    }

    fn enumerator_list(&mut self, enum_location: &Location) -> Result<Vec<Enumerator>, HeaderError> {
        let mut enumerators = Vec::new();
        loop {
            let Some(tok) = self.next() else {
                return Err(parse_error(enum_location, "unterminated enumerator list"));
            };
            if tok.is_punct("}") {
                if enumerators.is_empty() {
                    return Err(parse_error(&tok.location, "empty enum is invalid"));
                }
                break;
            }
            if tok.kind != TokenKind::Ident || KEYWORDS.contains(&tok.text) {
                return Err(parse_error(
                    &tok.location,
                    format!("expected identifier in enumerator list, found `{}`", tok.text),
                ));
            }

            let name = tok.text.to_string();
            let location = tok.location.clone();
            self.skip_attributes()?;

            let value = if self.at_punct("=") {
                self.pos += 1;
                Some(self.conditional()?)
            } else {
                None
            };
            enumerators.push(Enumerator {
                name,
                value,
                location,
            });

            match self.next() {
                Some(t) if t.is_punct(",") => continue,
                Some(t) if t.is_punct("}") => break,
                Some(t) => {
                    return Err(parse_error(
                        &t.location,
                        format!("expected `,` or `}}` after enumerator, found `{}`", t.text),
                    ))
                }
                None => return Err(parse_error(enum_location, "unterminated enumerator list")),
            }
        }
        Ok(enumerators)
    }

    // ------------------------------------------------------------------
    // Typedefs
    // ------------------------------------------------------------------

    /// Record the names declared by the typedef starting at `start`.
    ///
    /// Does not move the cursor: enum bodies inside the typedef are picked
    /// up by the main scan afterwards.
    fn scan_typedef(&mut self, start: usize) -> Result<(), HeaderError> {
        let mut depth = 0usize;
        let mut end = None;
        for (i, tok) in self.tokens.iter().enumerate().skip(start + 1) {
            if tok.kind != TokenKind::Punct {
                continue;
            }
            match tok.text {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                ";" if depth == 0 => {
                    end = Some(i);
                    break;
                }
                _ => {}
            }
        }
        let Some(end) = end else {
            return Err(parse_error(
                &self.tokens[start].location,
                "expected `;` after typedef",
            ));
        };

        let decl = strip_attributes(&self.tokens[start + 1..end]);
        let (specifiers, declarators) = split_specifiers(&decl)?;

        for declarator in declarators.split(|t| t.is_punct(",")) {
            let Some(name_tok) = declarator_name(declarator) else {
                continue;
            };
            let target = match &specifiers {
                Some(spec) if declarator.len() == 1 => TypedefTarget::Scalar(TypeName {
                    specifiers: spec.clone(),
                    pointers: 0,
                }),
                _ => TypedefTarget::Other,
            };
            self.typedef_names.insert(name_tok.text.to_string());
            self.unit.typedefs.push(Typedef {
                name: name_tok.text.to_string(),
                target,
                location: name_tok.location.clone(),
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Type names
    // ------------------------------------------------------------------

    fn starts_type_name(&self, tok: &Token<'_>) -> bool {
        tok.kind == TokenKind::Ident
            && (TYPE_SPECIFIERS.contains(&tok.text)
                || QUALIFIERS.contains(&tok.text)
                || matches!(tok.text, "struct" | "union" | "enum")
                || self.typedef_names.contains(tok.text))
    }

    /// Parse specifiers and an abstract pointer declarator.
    fn type_name(&mut self) -> Result<TypeName, HeaderError> {
        let location = self
            .peek()
            .map(|t| t.location.clone())
            .unwrap_or_else(|| self.end_location());
        let mut specifiers = Vec::new();
        let mut has_base = false;

        while let Some(tok) = self.peek() {
            if tok.kind != TokenKind::Ident {
                break;
            }
            if QUALIFIERS.contains(&tok.text) {
                self.pos += 1;
            } else if ATTRIBUTES.contains(&tok.text) {
                self.skip_attributes()?;
            } else if TYPE_SPECIFIERS.contains(&tok.text) {
                specifiers.push(tok.text.to_string());
                has_base = true;
                self.pos += 1;
            } else if matches!(tok.text, "struct" | "union" | "enum") {
                let keyword = tok.text;
                self.pos += 1;
                match self.next() {
                    Some(tag) if tag.kind == TokenKind::Ident => {
                        specifiers.push(format!("{} {}", keyword, tag.text));
                    }
                    _ => {
                        return Err(parse_error(
                            &location,
                            format!("expected tag after `{}` in type name", keyword),
                        ))
                    }
                }
                has_base = true;
            } else if !has_base && self.typedef_names.contains(tok.text) {
                specifiers.push(tok.text.to_string());
                has_base = true;
                self.pos += 1;
            } else {
                break;
            }
        }

        if specifiers.is_empty() {
            return Err(parse_error(&location, "expected type name"));
        }

        let mut pointers = 0u8;
        while let Some(tok) = self.peek() {
            if tok.is_punct("*") {
                pointers = pointers.saturating_add(1);
                self.pos += 1;
            } else if tok.kind == TokenKind::Ident && QUALIFIERS.contains(&tok.text) {
                self.pos += 1;
            } else {
                break;
            }
        }

        Ok(TypeName {
            specifiers,
            pointers,
        })
    }

    // ------------------------------------------------------------------
    // Constant expressions
    // ------------------------------------------------------------------

    fn conditional(&mut self) -> Result<Expr, HeaderError> {
        let cond = self.binary(1)?;
        if !self.at_punct("?") {
            return Ok(cond);
        }
        self.pos += 1;
        let then = self.conditional()?;
        self.expect_punct(":", "in conditional expression")?;
        let otherwise = self.conditional()?;
        let location = cond.location.clone();
        Ok(Expr::new(
            ExprKind::Conditional(Box::new(cond), Box::new(then), Box::new(otherwise)),
            location,
        ))
    }

    /// Precedence climbing over binary operators binding at least `min`.
    fn binary(&mut self, min: u8) -> Result<Expr, HeaderError> {
        let mut lhs = self.unary()?;
        loop {
            let Some(op) = self
                .peek()
                .filter(|t| t.kind == TokenKind::Punct)
                .and_then(|t| BinaryOp::from_punct(t.text))
            else {
                break;
            };
            let prec = op.precedence();
            if prec < min {
                break;
            }
            self.pos += 1;
            let rhs = self.binary(prec + 1)?;
            let location = lhs.location.clone();
            lhs = Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), location);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, HeaderError> {
        let Some(tok) = self.peek() else {
            return Err(parse_error(
                &self.end_location(),
                "expected expression, found end of input",
            ));
        };
        let location = tok.location.clone();

        let op = match tok.text {
            "+" if tok.kind == TokenKind::Punct => Some(UnaryOp::Plus),
            "-" if tok.kind == TokenKind::Punct => Some(UnaryOp::Minus),
            "~" if tok.kind == TokenKind::Punct => Some(UnaryOp::BitNot),
            "!" if tok.kind == TokenKind::Punct => Some(UnaryOp::LogicalNot),
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            let operand = self.unary()?;
            return Ok(Expr::new(ExprKind::Unary(op, Box::new(operand)), location));
        }

        if tok.is_ident("__extension__") {
            self.pos += 1;
            return self.unary();
        }

        if tok.is_ident("sizeof") {
            self.pos += 1;
            let is_type = self.at_punct("(")
                && self.peek_at(1).is_some_and(|t| self.starts_type_name(t));
            if is_type {
                self.pos += 1;
                let ty = self.type_name()?;
                self.expect_punct(")", "after type name")?;
                return Ok(Expr::new(ExprKind::SizeofType(ty), location));
            }
            let operand = self.unary()?;
            return Ok(Expr::new(ExprKind::SizeofExpr(Box::new(operand)), location));
        }

        if tok.is_punct("(") && self.peek_at(1).is_some_and(|t| self.starts_type_name(t)) {
            self.pos += 1;
            let ty = self.type_name()?;
            self.expect_punct(")", "after type name in cast")?;
            let operand = self.unary()?;
            return Ok(Expr::new(ExprKind::Cast(ty, Box::new(operand)), location));
        }

        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, HeaderError> {
        let Some(tok) = self.next() else {
            return Err(parse_error(
                &self.end_location(),
                "expected expression, found end of input",
            ));
        };
        let location = tok.location.clone();

        let kind = match tok.kind {
            TokenKind::Number => ExprKind::Int(
                parse_int_literal(tok.text).map_err(|msg| parse_error(&location, msg))?,
            ),
            TokenKind::Char => ExprKind::Char(
                parse_char_literal(tok.text).map_err(|msg| parse_error(&location, msg))?,
            ),
            TokenKind::Ident if !KEYWORDS.contains(&tok.text) => {
                ExprKind::Ident(tok.text.to_string())
            }
            TokenKind::Punct if tok.text == "(" => {
                let inner = self.conditional()?;
                self.expect_punct(")", "to close parenthesized expression")?;
                return Ok(inner);
            }
            TokenKind::Str => {
                return Err(parse_error(
                    &location,
                    "string literal in integer constant expression",
                ))
            }
            _ => {
                return Err(parse_error(
                    &location,
                    format!("expected expression, found `{}`", tok.text),
                ))
            }
        };
        Ok(Expr::new(kind, location))
    }
}

/// Identifiers reserved to the implementation: `__x` or `_X`.
fn is_reserved(ident: &str) -> bool {
    let mut chars = ident.chars();
    chars.next() == Some('_') && chars.next().is_some_and(|c| c == '_' || c.is_ascii_uppercase())
}

/// Drop attribute introducers and their argument lists.
fn strip_attributes<'t, 'src>(tokens: &'t [Token<'src>]) -> Vec<&'t Token<'src>> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let tok = &tokens[i];
        if tok.kind == TokenKind::Ident && ATTRIBUTES.contains(&tok.text) {
            i += 1;
            if tokens.get(i).is_some_and(|t| t.is_punct("(")) {
                let mut depth = 0usize;
                while i < tokens.len() {
                    if tokens[i].is_punct("(") {
                        depth += 1;
                    } else if tokens[i].is_punct(")") {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    i += 1;
                }
                i += 1;
            }
            continue;
        }
        if !(tok.kind == TokenKind::Ident && tok.text == "__extension__") {
            out.push(tok);
        }
        i += 1;
    }
    out
}

/// Scalar specifiers (if any) and the remaining declarator tokens.
type Split<'t, 'src> = (Option<Vec<String>>, Vec<&'t Token<'src>>);

/// Split a typedef (without `typedef` and `;`) into specifiers and declarators.
///
/// Specifiers are returned only for plain arithmetic or tagged types;
/// record bodies make the typedef opaque.
fn split_specifiers<'t, 'src>(decl: &[&'t Token<'src>]) -> Result<Split<'t, 'src>, HeaderError> {
    let mut specifiers = Vec::new();
    let mut scalar = true;
    let mut has_base = false;
    let mut i = 0;

    while i < decl.len() {
        let tok = decl[i];
        if tok.kind != TokenKind::Ident {
            break;
        }
        if QUALIFIERS.contains(&tok.text) {
            i += 1;
        } else if TYPE_SPECIFIERS.contains(&tok.text) {
            specifiers.push(tok.text.to_string());
            has_base = true;
            i += 1;
        } else if matches!(tok.text, "struct" | "union" | "enum") {
            let keyword = tok.text;
            i += 1;
            let mut tag = None;
            if let Some(t) = decl.get(i).filter(|t| t.kind == TokenKind::Ident) {
                tag = Some(t.text);
                i += 1;
            }
            if keyword == "enum" && decl.get(i).is_some_and(|t| t.is_punct(":")) {
                // Fixed underlying type: skip to the body.
                while i < decl.len() && !decl[i].is_punct("{") {
                    i += 1;
                }
            }
            if decl.get(i).is_some_and(|t| t.is_punct("{")) {
                let mut depth = 0usize;
                while i < decl.len() {
                    if decl[i].is_punct("{") {
                        depth += 1;
                    } else if decl[i].is_punct("}") {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    i += 1;
                }
                i += 1;
            }
            match (keyword, tag) {
                ("enum", Some(tag)) => specifiers.push(format!("enum {}", tag)),
                // Anonymous enums have type int for our purposes.
                ("enum", None) => specifiers.push("int".to_string()),
                _ => scalar = false,
            }
            has_base = true;
        } else if !has_base {
            specifiers.push(tok.text.to_string());
            has_base = true;
            i += 1;
        } else {
            break;
        }
    }

    if !has_base {
        let location = decl
            .first()
            .map(|t| t.location.clone())
            .unwrap_or_else(|| Location::new("<input>", 1, 1));
        return Err(parse_error(&location, "typedef without a type"));
    }

    let spec = if scalar { Some(specifiers) } else { None };
    Ok((spec, decl[i..].to_vec()))
}

/// The identifier a declarator declares, e.g. `x` in `x`, `*x[4]`, `(*x)(void)`.
fn declarator_name<'t, 'src>(declarator: &[&'t Token<'src>]) -> Option<&'t Token<'src>> {
    declarator
        .iter()
        .copied()
        .take_while(|t| !t.is_punct("["))
        .find(|t| t.kind == TokenKind::Ident && !QUALIFIERS.contains(&t.text))
}

/// Parse the text of a pp-number as an integer constant.
pub fn parse_int_literal(text: &str) -> Result<IntLiteral, String> {
    let suffix_start = text
        .char_indices()
        .rev()
        .take_while(|(_, c)| matches!(c, 'u' | 'U' | 'l' | 'L'))
        .last()
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let (body, suffix) = text.split_at(suffix_start);

    let (unsigned, longs) = match suffix {
        "" => (false, 0),
        "u" | "U" => (true, 0),
        "l" | "L" => (false, 1),
        "ll" | "LL" => (false, 2),
        "ul" | "uL" | "Ul" | "UL" | "lu" | "lU" | "Lu" | "LU" => (true, 1),
        "ull" | "uLL" | "Ull" | "ULL" | "llu" | "llU" | "LLu" | "LLU" => (true, 2),
        _ => return Err(format!("invalid suffix `{}` on integer constant", suffix)),
    };

    let lower = body.to_ascii_lowercase();
    let (radix, digits) = if let Some(hex) = lower.strip_prefix("0x") {
        (Radix::Hex, hex)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        (Radix::Binary, bin)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (Radix::Octal, &lower[1..])
    } else {
        (Radix::Decimal, lower.as_str())
    };

    let is_float = match radix {
        Radix::Hex => digits.contains('.') || digits.contains('p'),
        _ => digits.contains('.') || digits.contains('e'),
    };
    if is_float {
        return Err("floating constant in integer constant expression".to_string());
    }
    if digits.is_empty() {
        return Err(format!("invalid integer constant `{}`", text));
    }

    let base = match radix {
        Radix::Binary => 2,
        Radix::Octal => 8,
        Radix::Decimal => 10,
        Radix::Hex => 16,
    };
    let mut value: u64 = 0;
    for c in digits.chars() {
        let digit = c.to_digit(base).ok_or_else(|| match radix {
            Radix::Octal => format!("invalid digit `{}` in octal constant", c),
            Radix::Binary => format!("invalid digit `{}` in binary constant", c),
            _ => format!("invalid integer constant `{}`", text),
        })?;
        value = value
            .checked_mul(u64::from(base))
            .and_then(|v| v.checked_add(u64::from(digit)))
            .ok_or_else(|| "integer constant is too large for any integer type".to_string())?;
    }

    Ok(IntLiteral {
        value,
        radix,
        unsigned,
        longs,
    })
}

/// Parse a character constant (`'a'`, `L'\n'`, `'\x41'`).
pub fn parse_char_literal(text: &str) -> Result<CharLiteral, String> {
    let (prefix, rest) = match text.find('\'') {
        Some(i) => text.split_at(i),
        None => return Err(format!("invalid character constant `{}`", text)),
    };
    let inner = rest
        .strip_prefix('\'')
        .and_then(|r| r.strip_suffix('\''))
        .ok_or_else(|| format!("invalid character constant `{}`", text))?;

    let mut chars = inner.chars().peekable();
    let mut values = Vec::new();
    while let Some(c) = chars.next() {
        if c != '\\' {
            values.push(c as u32);
            continue;
        }
        let Some(esc) = chars.next() else {
            return Err("incomplete escape sequence".to_string());
        };
        let value = match esc {
            'n' => 0x0a,
            't' => 0x09,
            'r' => 0x0d,
            'a' => 0x07,
            'b' => 0x08,
            'f' => 0x0c,
            'v' => 0x0b,
            'e' => 0x1b,
            '\\' | '\'' | '"' | '?' => esc as u32,
            'x' => {
                let mut v: u32 = 0;
                let mut any = false;
                while let Some(d) = chars.peek().and_then(|c| c.to_digit(16)) {
                    v = v.saturating_mul(16).saturating_add(d);
                    any = true;
                    chars.next();
                }
                if !any {
                    return Err("\\x used with no following hex digits".to_string());
                }
                v
            }
            '0'..='7' => {
                let mut v = esc.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            v = v * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                v
            }
            other => return Err(format!("unknown escape sequence `\\{}`", other)),
        };
        values.push(value);
    }

    match values.as_slice() {
        [] => Err("empty character constant".to_string()),
        [v] if prefix.is_empty() && *v > 0xff => {
            Err("character too large for enclosing character literal type".to_string())
        }
        [v] => Ok(CharLiteral {
            value: *v,
            plain: prefix.is_empty(),
        }),
        _ => Err("multi-character character constant".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::super::lexer::tokenize;
    use super::*;

    fn unit(src: &str) -> TranslationUnit {
        let tokens = tokenize(src, "test.h").unwrap();
        parse(&tokens).unwrap()
    }

    fn parse_err(src: &str) -> String {
        let tokens = tokenize(src, "test.h").unwrap();
        parse(&tokens).unwrap_err().to_string()
    }

    fn expr(src: &str) -> Expr {
        let tokens = tokenize(src, "expr").unwrap();
        parse_expression(&tokens).unwrap()
    }

    #[test]
    fn test_typedef_enum() {
        let unit = unit(
            "typedef enum WGPUAddressMode {\n\
                 WGPUAddressMode_Repeat = 0x00000000,\n\
                 WGPUAddressMode_MirrorRepeat = 0x00000001,\n\
                 WGPUAddressMode_Force32 = 0x7FFFFFFF\n\
             } WGPUAddressMode;",
        );

        assert_eq!(unit.enums.len(), 1);
        let e = &unit.enums[0];
        assert_eq!(e.tag.as_deref(), Some("WGPUAddressMode"));
        assert_eq!(e.enumerators.len(), 3);
        assert_eq!(e.enumerators[1].name, "WGPUAddressMode_MirrorRepeat");
        assert_eq!(e.enumerators[2].location.line, 4);

        let td = unit.typedef("WGPUAddressMode").unwrap();
        assert_eq!(
            td.target,
            TypedefTarget::Scalar(TypeName {
                specifiers: vec!["enum WGPUAddressMode".to_string()],
                pointers: 0,
            })
        );
    }

    #[test]
    fn test_anonymous_enum_and_trailing_comma() {
        let unit = unit("enum { A, B = 4, C, };");
        assert_eq!(unit.enums[0].tag, None);
        assert_eq!(unit.enums[0].enumerators.len(), 3);
        assert!(unit.enums[0].enumerators[0].value.is_none());
    }

    #[test]
    fn test_enum_references_are_not_definitions() {
        let unit = unit("enum Foo f(enum Foo x); typedef enum Foo Foo;");
        assert!(unit.enums.is_empty());
        assert_eq!(unit.typedefs.len(), 1);
    }

    #[test]
    fn test_enums_nested_in_structs() {
        let unit = unit("struct S { enum { IN_A = 1 } kind; int x; }; enum Out { OUT_A };");
        let names: Vec<_> = unit
            .enums
            .iter()
            .flat_map(|e| e.enumerators.iter().map(|n| n.name.as_str()))
            .collect();
        assert_eq!(names, vec!["IN_A", "OUT_A"]);
    }

    #[test]
    fn test_fixed_underlying_type() {
        let unit = unit("enum Small : unsigned char { S_A = 1 };");
        let underlying = unit.enums[0].underlying.as_ref().unwrap();
        assert_eq!(underlying.specifiers, vec!["unsigned", "char"]);
    }

    #[test]
    fn test_attributes_are_skipped() {
        let unit = unit(
            "enum __attribute__((packed)) E { E_A __attribute__((deprecated(\"x\"))) = 2, E_B };",
        );
        let e = &unit.enums[0];
        assert_eq!(e.tag.as_deref(), Some("E"));
        assert_eq!(e.enumerators.len(), 2);
        assert!(e.enumerators[0].value.is_some());
    }

    #[test]
    fn test_typedef_kinds() {
        let unit = unit(
            "typedef unsigned int uint32_t;\n\
             typedef uint32_t WGPUFlags;\n\
             typedef struct WGPUAdapterImpl* WGPUAdapter;\n\
             typedef void (*WGPUProc)(void);\n\
             typedef int arr_t[4], *ptr_t;\n\
             typedef struct { int x; } Point;",
        );

        let scalar = |name: &str| match &unit.typedef(name).unwrap().target {
            TypedefTarget::Scalar(t) => t.specifiers.join(" "),
            TypedefTarget::Other => "other".to_string(),
        };
        assert_eq!(scalar("uint32_t"), "unsigned int");
        assert_eq!(scalar("WGPUFlags"), "uint32_t");
        assert_eq!(scalar("WGPUAdapter"), "other");
        assert_eq!(scalar("WGPUProc"), "other");
        assert_eq!(scalar("arr_t"), "other");
        assert_eq!(scalar("ptr_t"), "other");
        assert_eq!(scalar("Point"), "other");
    }

    #[test]
    fn test_declarations_around_enums() {
        let unit = unit(
            "typedef __builtin_va_list va_list;\n\
             extern int printf(const char *, ...) __attribute__((format(printf, 1, 2)));\n\
             static inline int twice(int x) { int y[2] = { x, x }; return y[0] + y[1]; }\n\
             int (*handler)(void) __attribute__((weak)) = 0;\n\
             _Static_assert(sizeof(int) == 4, \"int\");\n\
             __extension__ typedef long long wide_t;\n\
             ;\n\
             typedef struct __attribute__((packed)) { enum { P_A = 1 } kind; } Packed;\n\
             _Float32x half(void);\n\
             va_list args;\n\
             enum After { AFTER_A };",
        );
        let names: Vec<_> = unit
            .enums
            .iter()
            .flat_map(|e| e.enumerators.iter().map(|n| n.name.as_str()))
            .collect();
        assert_eq!(names, vec!["P_A", "AFTER_A"]);
        assert!(unit.typedef("Packed").is_some());
        assert!(unit.typedef("wide_t").is_some());
    }

    #[test]
    fn test_rejects_text_that_is_not_c() {
        let err = parse_err("this is not C at all ;\nenum { WGPUFoo_A = 1 };");
        assert_eq!(err, "test.h:1:1: unknown type name `this`");

        let err = parse_err("int f( {\nenum { WGPUFoo_A = 1 };");
        assert!(err.contains("unbalanced `{`"), "{err}");

        let err = parse_err("int x[3);");
        assert_eq!(err, "test.h:1:8: mismatched `)`, `[` is still open");

        let err = parse_err("enum E { A };\n}");
        assert_eq!(err, "test.h:2:1: expected declaration, found `}`");

        let err = parse_err("int x");
        assert!(err.contains("expected `;` at end of declaration"));

        let err = parse_err("int x; 42;");
        assert!(err.contains("expected declaration, found `42`"));
    }

    #[test]
    fn test_precedence() {
        // 1 + (2 * 3) << 1  ==>  (1 + (2 * 3)) << 1
        let e = expr("1 + 2 * 3 << 1");
        let ExprKind::Binary(BinaryOp::Shl, lhs, _) = &e.kind else {
            panic!("expected shift at the root, got {:?}", e.kind);
        };
        assert!(matches!(lhs.kind, ExprKind::Binary(BinaryOp::Add, _, _)));
    }

    #[test]
    fn test_left_associative() {
        let e = expr("8 - 4 - 2");
        let ExprKind::Binary(BinaryOp::Sub, lhs, rhs) = &e.kind else {
            panic!("expected subtraction");
        };
        assert!(matches!(lhs.kind, ExprKind::Binary(BinaryOp::Sub, _, _)));
        assert!(matches!(rhs.kind, ExprKind::Int(_)));
    }

    #[test]
    fn test_cast_and_sizeof() {
        let e = expr("(unsigned int)-1");
        assert!(matches!(e.kind, ExprKind::Cast(_, _)));

        let e = expr("sizeof(long)");
        assert!(matches!(e.kind, ExprKind::SizeofType(_)));

        let e = expr("sizeof (1)");
        assert!(matches!(e.kind, ExprKind::SizeofExpr(_)));

        // Parenthesized identifier that is not a type stays an expression.
        let e = expr("(FOO) + 1");
        assert!(matches!(e.kind, ExprKind::Binary(BinaryOp::Add, _, _)));
    }

    #[test]
    fn test_conditional() {
        let e = expr("A ? 1 : B ? 2 : 3");
        let ExprKind::Conditional(_, _, otherwise) = &e.kind else {
            panic!("expected conditional");
        };
        assert!(matches!(otherwise.kind, ExprKind::Conditional(_, _, _)));
    }

    #[test]
    fn test_parse_errors_are_located() {
        let err = parse_err("enum E {\n  A = ,\n};");
        assert_eq!(err, "test.h:2:7: expected expression, found `,`");

        let err = parse_err("enum E { A B };");
        assert!(err.contains("expected `,` or `}` after enumerator, found `B`"));

        let err = parse_err("enum E { int };");
        assert!(err.contains("expected identifier in enumerator list"));

        let err = parse_err("enum E { };");
        assert!(err.contains("empty enum is invalid"));

        let err = parse_err("enum E { A = 1");
        assert!(err.contains("end of input") || err.contains("unterminated"));

        let err = parse_err("enum E { A = \"s\" };");
        assert!(err.contains("string literal in integer constant expression"));
    }

    #[test]
    fn test_int_literals() {
        let lit = parse_int_literal("0x7FFFFFFF").unwrap();
        assert_eq!(lit.value, 0x7fff_ffff);
        assert_eq!(lit.radix, Radix::Hex);

        let lit = parse_int_literal("0755").unwrap();
        assert_eq!(lit.value, 0o755);
        assert_eq!(lit.radix, Radix::Octal);

        let lit = parse_int_literal("0").unwrap();
        assert_eq!(lit.radix, Radix::Decimal);

        let lit = parse_int_literal("0b101").unwrap();
        assert_eq!(lit.value, 5);

        let lit = parse_int_literal("10ULL").unwrap();
        assert!(lit.unsigned);
        assert_eq!(lit.longs, 2);

        let lit = parse_int_literal("1lu").unwrap();
        assert!(lit.unsigned);
        assert_eq!(lit.longs, 1);

        assert_eq!(parse_int_literal("0xFFFFFFFFFFFFFFFF").unwrap().value, u64::MAX);
    }

    #[test]
    fn test_invalid_int_literals() {
        assert!(parse_int_literal("089").unwrap_err().contains("octal"));
        assert!(parse_int_literal("1.5").unwrap_err().contains("floating"));
        assert!(parse_int_literal("1e3").unwrap_err().contains("floating"));
        assert!(parse_int_literal("1lL").unwrap_err().contains("suffix"));
        assert!(parse_int_literal("0x").is_err());
        assert!(parse_int_literal("0x1FFFFFFFFFFFFFFFF")
            .unwrap_err()
            .contains("too large"));
    }

    #[test]
    fn test_char_literals() {
        let value = |s: &str| parse_char_literal(s).unwrap().value;
        assert_eq!(value("'a'"), 97);
        assert_eq!(value("'\\n'"), 10);
        assert_eq!(value("'\\x41'"), 0x41);
        assert_eq!(value("'\\101'"), 0o101);
        assert_eq!(value("'\\0'"), 0);
        assert_eq!(value("'\\xff'"), 0xff);
        assert!(parse_char_literal("'x'").unwrap().plain);
        assert!(!parse_char_literal("L'\\xff'").unwrap().plain);
        assert!(parse_char_literal("'\\x100'").is_err());
        assert!(parse_char_literal("'ab'").is_err());
        assert!(parse_char_literal("''").is_err());
    }
}
