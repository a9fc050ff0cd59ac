//! Syntax tree for the parts of a C translation unit the generator needs.
//!
//! Only enum specifiers and typedefs are kept. Enumerator initializers are
//! stored as full constant-expression trees so the type checker can evaluate
//! them with C semantics.

use std::fmt;
use std::sync::Arc;

/// A position in an original source file (after line-marker mapping).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// File name as reported by the preprocessor
    pub file: Arc<str>,
    /// 1-based line
    pub line: u32,
    /// 1-based column, in characters
    pub column: u32,
}

impl Location {
    pub fn new(file: impl Into<Arc<str>>, line: u32, column: u32) -> Self {
        Location {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Prefix operators allowed in integer constant expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    BitNot,
    LogicalNot,
}

/// Binary operators allowed in integer constant expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOp {
    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::LogicalOr => 1,
            BinaryOp::LogicalAnd => 2,
            BinaryOp::BitOr => 3,
            BinaryOp::BitXor => 4,
            BinaryOp::BitAnd => 5,
            BinaryOp::Eq | BinaryOp::Ne => 6,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => 7,
            BinaryOp::Shl | BinaryOp::Shr => 8,
            BinaryOp::Add | BinaryOp::Sub => 9,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 10,
        }
    }

    /// Map a punctuator to an operator.
    pub fn from_punct(punct: &str) -> Option<Self> {
        let op = match punct {
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Rem,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "<<" => BinaryOp::Shl,
            ">>" => BinaryOp::Shr,
            "<" => BinaryOp::Lt,
            ">" => BinaryOp::Gt,
            "<=" => BinaryOp::Le,
            ">=" => BinaryOp::Ge,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "&" => BinaryOp::BitAnd,
            "^" => BinaryOp::BitXor,
            "|" => BinaryOp::BitOr,
            "&&" => BinaryOp::LogicalAnd,
            "||" => BinaryOp::LogicalOr,
            _ => return None,
        };
        Some(op)
    }
}

/// Base of an integer literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Radix {
    Binary,
    Octal,
    Decimal,
    Hex,
}

/// An integer constant as written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntLiteral {
    pub value: u64,
    pub radix: Radix,
    /// `u`/`U` suffix present
    pub unsigned: bool,
    /// Number of `l`/`L` in the suffix (0, 1 or 2)
    pub longs: u8,
}

/// A character constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharLiteral {
    /// Code unit value before conversion to `int`
    pub value: u32,
    /// No encoding prefix: the value goes through plain `char`
    pub plain: bool,
}

/// A type name as written in a cast or `sizeof`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    /// Type specifiers in source order, qualifiers removed.
    /// Tagged types are kept as one entry, e.g. `enum WGPUFoo`.
    pub specifiers: Vec<String>,
    /// Number of `*` in the abstract declarator
    pub pointers: u8,
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.specifiers.join(" "))?;
        for _ in 0..self.pointers {
            write!(f, "*")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    Int(IntLiteral),
    Char(CharLiteral),
    Ident(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    Cast(TypeName, Box<Expr>),
    SizeofType(TypeName),
    SizeofExpr(Box<Expr>),
}

/// A constant expression with the location of its first token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: Location,
}

impl Expr {
    pub fn new(kind: ExprKind, location: Location) -> Self {
        Expr { kind, location }
    }
}

/// One `NAME [= expr]` entry of an enumerator list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumerator {
    pub name: String,
    pub value: Option<Expr>,
    pub location: Location,
}

/// An enum specifier with a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDecl {
    /// Tag, `None` for anonymous enums
    pub tag: Option<String>,
    /// Fixed underlying type (`enum X : uint32_t { ... }`)
    pub underlying: Option<TypeName>,
    pub enumerators: Vec<Enumerator>,
    pub location: Location,
}

/// What a typedef name stands for, as far as constant evaluation cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedefTarget {
    /// A plain arithmetic type, possibly through other typedefs
    Scalar(TypeName),
    /// Pointers, arrays, functions, records
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Typedef {
    pub name: String,
    pub target: TypedefTarget,
    pub location: Location,
}

/// Enums and typedefs of a translation unit, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationUnit {
    pub enums: Vec<EnumDecl>,
    pub typedefs: Vec<Typedef>,
}

impl TranslationUnit {
    /// Find the most recent typedef with the given name.
    pub fn typedef(&self, name: &str) -> Option<&Typedef> {
        self.typedefs.iter().rev().find(|t| t.name == name)
    }

    /// Total number of enumerators across all enums.
    pub fn enumerator_count(&self) -> usize {
        self.enums.iter().map(|e| e.enumerators.len()).sum()
    }
}
