//! Type checking and constant evaluation of enumerators.
//!
//! Every enumerator gets its value the way a C compiler would compute it:
//! integer literals are typed by base and suffix, operands go through the
//! integer promotions and the usual arithmetic conversions, results wrap to
//! the width of their type, and enumerators without an initializer continue
//! from the previous one. Type widths come from the target [`Abi`].

use std::collections::HashMap;

use super::host::Abi;
use super::types::{
    BinaryOp, EnumDecl, Expr, ExprKind, IntLiteral, Location, Radix, TranslationUnit, TypeName,
    TypedefTarget, UnaryOp,
};
use super::HeaderError;

/// An integer type: width and signedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntType {
    pub bits: u32,
    pub signed: bool,
}

impl IntType {
    pub const INT: IntType = IntType::new(32, true);
    pub const UINT: IntType = IntType::new(32, false);
    pub const LLONG: IntType = IntType::new(64, true);
    pub const ULLONG: IntType = IntType::new(64, false);

    pub const fn new(bits: u32, signed: bool) -> Self {
        IntType { bits, signed }
    }

    pub fn min(self) -> i128 {
        if self.signed {
            -(1i128 << (self.bits - 1))
        } else {
            0
        }
    }

    pub fn max(self) -> i128 {
        if self.signed {
            (1i128 << (self.bits - 1)) - 1
        } else {
            (1i128 << self.bits) - 1
        }
    }

    pub fn contains(self, value: i128) -> bool {
        self.min() <= value && value <= self.max()
    }

    /// Reduce `value` modulo 2^bits into this type's range.
    pub fn wrap(self, value: i128) -> i128 {
        let modulus = 1i128 << self.bits;
        let reduced = value.rem_euclid(modulus);
        if self.signed && reduced > self.max() {
            reduced - modulus
        } else {
            reduced
        }
    }

    /// Integer promotion: anything narrower than `int` becomes `int`.
    fn promote(self) -> IntType {
        if self.bits < IntType::INT.bits {
            IntType::INT
        } else {
            self
        }
    }

    /// The usual arithmetic conversions for two integer operands.
    fn common(self, other: IntType) -> IntType {
        let (a, b) = (self.promote(), other.promote());
        if a == b {
            return a;
        }
        if a.signed == b.signed {
            return if a.bits >= b.bits { a } else { b };
        }
        let (unsigned, signed) = if a.signed { (b, a) } else { (a, b) };
        if unsigned.bits >= signed.bits {
            unsigned
        } else {
            signed
        }
    }
}

impl std::fmt::Display for IntType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = if self.signed { "" } else { "u" };
        write!(f, "{}int{}", prefix, self.bits)
    }
}

/// What a type name resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    Int(IntType),
    Bool,
    /// Not usable in integer arithmetic; size in bytes if complete
    Opaque(Option<u32>),
}

/// A typed intermediate value. `value` is always within `ty`'s range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Value {
    value: i128,
    ty: IntType,
}

impl Value {
    fn new(value: i128, ty: IntType) -> Self {
        Value {
            value: ty.wrap(value),
            ty,
        }
    }

    fn int(value: bool) -> Self {
        Value::new(i128::from(value), IntType::INT)
    }

    fn convert(self, ty: IntType) -> Self {
        Value::new(self.value, ty)
    }
}

/// A declared enumerator with its evaluated value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumConstant {
    pub name: String,
    /// Tag of the declaring enum, if it has one
    pub scope: Option<String>,
    pub value: i64,
    pub location: Location,
}

/// All enumerators of a translation unit, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct EnumTable {
    entries: Vec<EnumConstant>,
    index: HashMap<String, usize>,
}

impl EnumTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an enumerator, returning the previous declaration on a clash.
    pub fn insert(&mut self, constant: EnumConstant) -> Result<(), &EnumConstant> {
        if let Some(&i) = self.index.get(&constant.name) {
            return Err(&self.entries[i]);
        }
        self.index.insert(constant.name.clone(), self.entries.len());
        self.entries.push(constant);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&EnumConstant> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EnumConstant> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a EnumTable {
    type Item = &'a EnumConstant;
    type IntoIter = std::slice::Iter<'a, EnumConstant>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Evaluate every enumerator of `unit`.
pub fn typecheck(unit: &TranslationUnit, abi: &Abi) -> Result<EnumTable, HeaderError> {
    let mut checker = Checker {
        unit,
        abi,
        table: EnumTable::new(),
        enum_types: HashMap::new(),
    };
    for decl in &unit.enums {
        checker.check_enum(decl)?;
    }
    Ok(checker.table)
}

/// Evaluate a single expression against an existing table.
pub fn evaluate(
    expr: &Expr,
    unit: &TranslationUnit,
    table: &EnumTable,
    abi: &Abi,
) -> Result<i128, HeaderError> {
    let checker = Checker {
        unit,
        abi,
        table: table.clone(),
        enum_types: HashMap::new(),
    };
    Ok(checker.eval(expr)?.value)
}

fn type_error(location: &Location, message: impl Into<String>) -> HeaderError {
    HeaderError::Typecheck {
        location: location.clone(),
        message: message.into(),
        note: None,
    }
}

/// Typedef chains longer than this are treated as cycles.
const MAX_TYPEDEF_DEPTH: usize = 32;

struct Checker<'a> {
    unit: &'a TranslationUnit,
    abi: &'a Abi,
    table: EnumTable,
    /// Integer type of each completed tagged enum
    enum_types: HashMap<String, IntType>,
}

impl Checker<'_> {
    fn long(&self) -> IntType {
        IntType::new(self.abi.long_bits, true)
    }

    fn ulong(&self) -> IntType {
        IntType::new(self.abi.long_bits, false)
    }

    fn size_t(&self) -> IntType {
        IntType::new(self.abi.size_bits(), false)
    }

    fn check_enum(&mut self, decl: &EnumDecl) -> Result<(), HeaderError> {
        let underlying = match &decl.underlying {
            Some(name) => match self.resolve(name, &decl.location)? {
                Scalar::Int(ty) => Some(ty),
                Scalar::Bool => Some(IntType::new(8, false)),
                Scalar::Opaque(_) => {
                    return Err(type_error(
                        &decl.location,
                        format!("invalid underlying type `{}` for enum", name),
                    ))
                }
            },
            None => None,
        };

        let mut previous: Option<i128> = None;
        let mut min = 0i128;
        let mut max = 0i128;

        for enumerator in &decl.enumerators {
            let value = match &enumerator.value {
                Some(expr) => self.eval(expr)?.value,
                None => {
                    let next = previous.map_or(0, |p| p + 1);
                    if next > i128::from(i64::MAX) {
                        return Err(type_error(
                            &enumerator.location,
                            format!("overflow in enumeration values at `{}`", enumerator.name),
                        ));
                    }
                    next
                }
            };

            if let Some(ty) = underlying {
                if !ty.contains(value) {
                    return Err(type_error(
                        &enumerator.location,
                        format!(
                            "enumerator value {} of `{}` is outside the range of its underlying type `{}`",
                            value, enumerator.name, ty
                        ),
                    ));
                }
            }
            if value < i128::from(i64::MIN) || value > i128::from(i64::MAX) {
                return Err(type_error(
                    &enumerator.location,
                    format!(
                        "enumerator value {} of `{}` does not fit in a 64-bit integer",
                        value, enumerator.name
                    ),
                ));
            }

            let constant = EnumConstant {
                name: enumerator.name.clone(),
                scope: decl.tag.clone(),
                value: value as i64,
                location: enumerator.location.clone(),
            };
            if let Err(prev) = self.table.insert(constant) {
                return Err(HeaderError::Typecheck {
                    location: enumerator.location.clone(),
                    message: format!("redefinition of enumerator `{}`", enumerator.name),
                    note: Some(format!("previous definition is at {}", prev.location)),
                });
            }

            tracing::trace!("{} = {}", enumerator.name, value);
            previous = Some(value);
            min = min.min(value);
            max = max.max(value);
        }

        if let Some(tag) = &decl.tag {
            let ty = underlying.unwrap_or_else(|| {
                if min < 0 {
                    if IntType::INT.contains(min) && IntType::INT.contains(max) {
                        IntType::INT
                    } else {
                        IntType::LLONG
                    }
                } else if IntType::UINT.contains(max) {
                    IntType::UINT
                } else {
                    IntType::LLONG
                }
            });
            self.enum_types.insert(tag.clone(), ty);
        }

        Ok(())
    }

    fn resolve(&self, name: &TypeName, location: &Location) -> Result<Scalar, HeaderError> {
        self.resolve_depth(name, location, 0)
    }

    fn resolve_depth(
        &self,
        name: &TypeName,
        location: &Location,
        depth: usize,
    ) -> Result<Scalar, HeaderError> {
        if name.pointers > 0 {
            return Ok(Scalar::Opaque(Some(self.abi.pointer_bits / 8)));
        }
        if depth > MAX_TYPEDEF_DEPTH {
            return Err(type_error(
                location,
                format!("typedef chain for `{}` is too deep", name),
            ));
        }

        let mut signed = None;
        let mut longs = 0u32;
        let (mut char_, mut short, mut int, mut bool_, mut void) = (false, false, false, false, false);
        let mut float_bytes = None;
        let mut complex = false;

        for spec in &name.specifiers {
            match spec.as_str() {
                "signed" | "__signed__" | "__signed" => signed = Some(true),
                "unsigned" | "__unsigned__" => signed = Some(false),
                "char" => char_ = true,
                "short" => short = true,
                "int" => int = true,
                "long" => longs += 1,
                "_Bool" => bool_ = true,
                "void" => void = true,
                "_Complex" => complex = true,
                "float" | "_Float32" => float_bytes = Some(4),
                "double" | "_Float64" => float_bytes = Some(8),
                "_Float16" => float_bytes = Some(2),
                "_Float128" | "__float128" => float_bytes = Some(16),
                "__int128" => return Ok(Scalar::Opaque(Some(16))),
                tagged if tagged.starts_with("enum ") => {
                    let tag = &tagged["enum ".len()..];
                    let ty = self.enum_types.get(tag).copied().unwrap_or(IntType::UINT);
                    return Ok(Scalar::Int(ty));
                }
                tagged if tagged.starts_with("struct ") || tagged.starts_with("union ") => {
                    return Ok(Scalar::Opaque(None));
                }
                typedef_name => {
                    return match self.unit.typedef(typedef_name).map(|t| &t.target) {
                        Some(TypedefTarget::Scalar(target)) => {
                            self.resolve_depth(target, location, depth + 1)
                        }
                        Some(TypedefTarget::Other) => Ok(Scalar::Opaque(None)),
                        None => Err(type_error(
                            location,
                            format!("unknown type name `{}`", typedef_name),
                        )),
                    };
                }
            }
        }

        let invalid = || type_error(location, format!("invalid type `{}`", name));

        if let Some(bytes) = float_bytes {
            let bytes = match (bytes, longs) {
                (8, 1) if self.abi.os == "windows" => 8,
                (8, 1) if self.abi.pointer_bits == 64 => 16,
                (8, 1) => 12,
                (b, 0) => b,
                _ => return Err(invalid()),
            };
            let bytes = if complex { bytes * 2 } else { bytes };
            return Ok(Scalar::Opaque(Some(bytes)));
        }
        if void {
            return Ok(Scalar::Opaque(None));
        }
        if bool_ {
            return Ok(Scalar::Bool);
        }

        let bits = match (char_, short, longs) {
            (true, false, 0) => 8,
            (false, true, 0) => 16,
            (false, false, 0) if int || signed.is_some() => 32,
            (false, false, 1) => self.abi.long_bits,
            (false, false, 2) => 64,
            _ => return Err(invalid()),
        };
        let signed = match signed {
            Some(s) => s,
            None if char_ => self.abi.char_signed,
            None => true,
        };
        Ok(Scalar::Int(IntType::new(bits, signed)))
    }

    fn literal_type(&self, lit: &IntLiteral, location: &Location) -> Result<IntType, HeaderError> {
        let (int, uint, long, ulong) = (IntType::INT, IntType::UINT, self.long(), self.ulong());
        let (llong, ullong) = (IntType::LLONG, IntType::ULLONG);
        let decimal = lit.radix == Radix::Decimal;

        let candidates: &[IntType] = match (lit.unsigned, lit.longs, decimal) {
            (false, 0, true) => &[int, long, llong],
            (false, 0, false) => &[int, uint, long, ulong, llong, ullong],
            (true, 0, _) => &[uint, ulong, ullong],
            (false, 1, true) => &[long, llong],
            (false, 1, false) => &[long, ulong, llong, ullong],
            (true, 1, _) => &[ulong, ullong],
            (false, _, true) => &[llong],
            (false, _, false) => &[llong, ullong],
            (true, _, _) => &[ullong],
        };

        let value = i128::from(lit.value);
        if let Some(ty) = candidates.iter().find(|ty| ty.contains(value)) {
            return Ok(*ty);
        }
        if ullong.contains(value) {
            // GCC accepts oversized decimal constants as unsigned.
            return Ok(ullong);
        }
        Err(type_error(
            location,
            "integer constant is too large for its type",
        ))
    }

    fn eval(&self, expr: &Expr) -> Result<Value, HeaderError> {
        let loc = &expr.location;
        match &expr.kind {
            ExprKind::Int(lit) => {
                let ty = self.literal_type(lit, loc)?;
                Ok(Value::new(i128::from(lit.value), ty))
            }
            ExprKind::Char(c) => {
                if c.plain {
                    let char_ty = IntType::new(8, self.abi.char_signed);
                    Ok(Value::new(i128::from(c.value), char_ty).convert(IntType::INT))
                } else {
                    Ok(Value::new(i128::from(c.value), IntType::INT))
                }
            }
            ExprKind::Ident(name) => match self.table.get(name) {
                Some(constant) => {
                    let value = i128::from(constant.value);
                    let ty = if IntType::INT.contains(value) {
                        IntType::INT
                    } else {
                        IntType::LLONG
                    };
                    Ok(Value::new(value, ty))
                }
                None => Err(type_error(
                    loc,
                    format!("use of undeclared identifier `{}`", name),
                )),
            },
            ExprKind::Unary(op, operand) => {
                let v = self.eval(operand)?;
                self.unary(*op, v, loc)
            }
            ExprKind::Binary(op, lhs, rhs) => self.binary(*op, lhs, rhs, loc),
            ExprKind::Conditional(cond, then, otherwise) => {
                let cond = self.eval(cond)?;
                let then = self.eval(then)?;
                let otherwise = self.eval(otherwise)?;
                let ty = then.ty.common(otherwise.ty);
                let chosen = if cond.value != 0 { then } else { otherwise };
                Ok(chosen.convert(ty))
            }
            ExprKind::Cast(name, operand) => {
                let v = self.eval(operand)?;
                match self.resolve(name, loc)? {
                    Scalar::Int(ty) => Ok(v.convert(ty)),
                    Scalar::Bool => Ok(Value::int(v.value != 0)),
                    Scalar::Opaque(_) => Err(type_error(
                        loc,
                        format!("cast to non-integer type `{}` in constant expression", name),
                    )),
                }
            }
            ExprKind::SizeofType(name) => {
                let bytes = match self.resolve(name, loc)? {
                    Scalar::Int(ty) => ty.bits / 8,
                    Scalar::Bool => 1,
                    Scalar::Opaque(Some(bytes)) => bytes,
                    Scalar::Opaque(None) => {
                        return Err(type_error(
                            loc,
                            format!("invalid application of `sizeof` to incomplete type `{}`", name),
                        ))
                    }
                };
                Ok(Value::new(i128::from(bytes), self.size_t()))
            }
            ExprKind::SizeofExpr(operand) => {
                let v = self.eval(operand)?;
                Ok(Value::new(i128::from(v.ty.bits / 8), self.size_t()))
            }
        }
    }

    fn unary(&self, op: UnaryOp, v: Value, loc: &Location) -> Result<Value, HeaderError> {
        let ty = v.ty.promote();
        let v = v.convert(ty);
        match op {
            UnaryOp::Plus => Ok(v),
            UnaryOp::Minus => {
                let raw = -v.value;
                if ty.signed && !ty.contains(raw) {
                    return Err(type_error(loc, "integer overflow in constant expression"));
                }
                Ok(Value::new(raw, ty))
            }
            UnaryOp::BitNot => Ok(Value::new(!v.value, ty)),
            UnaryOp::LogicalNot => Ok(Value::int(v.value == 0)),
        }
    }

    fn binary(&self, op: BinaryOp, lhs: &Expr, rhs: &Expr, loc: &Location) -> Result<Value, HeaderError> {
        let l = self.eval(lhs)?;

        // Short-circuit: the unevaluated operand may divide by zero.
        match op {
            BinaryOp::LogicalAnd if l.value == 0 => return Ok(Value::int(false)),
            BinaryOp::LogicalOr if l.value != 0 => return Ok(Value::int(true)),
            _ => {}
        }

        let r = self.eval(rhs)?;

        match op {
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => return Ok(Value::int(r.value != 0)),
            BinaryOp::Shl | BinaryOp::Shr => {
                let ty = l.ty.promote();
                let count = r.value;
                if count < 0 || count >= i128::from(ty.bits) {
                    return Err(type_error(
                        &rhs.location,
                        format!("shift count {} is out of range for `{}`", count, ty),
                    ));
                }
                let l = l.convert(ty);
                let raw = if op == BinaryOp::Shl {
                    l.value << count
                } else {
                    l.value >> count
                };
                return Ok(Value::new(raw, ty));
            }
            _ => {}
        }

        let ty = l.ty.common(r.ty);
        let (a, b) = (l.convert(ty).value, r.convert(ty).value);
        let overflow = || type_error(loc, "integer overflow in constant expression");

        let raw = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => match a.checked_mul(b) {
                Some(v) => v,
                None if !ty.signed => a.wrapping_mul(b),
                None => return Err(overflow()),
            },
            BinaryOp::Div | BinaryOp::Rem => {
                if b == 0 {
                    return Err(type_error(&rhs.location, "division by zero in constant expression"));
                }
                if op == BinaryOp::Div {
                    a / b
                } else {
                    a % b
                }
            }
            BinaryOp::BitAnd => a & b,
            BinaryOp::BitXor => a ^ b,
            BinaryOp::BitOr => a | b,
            BinaryOp::Lt => return Ok(Value::int(a < b)),
            BinaryOp::Gt => return Ok(Value::int(a > b)),
            BinaryOp::Le => return Ok(Value::int(a <= b)),
            BinaryOp::Ge => return Ok(Value::int(a >= b)),
            BinaryOp::Eq => return Ok(Value::int(a == b)),
            BinaryOp::Ne => return Ok(Value::int(a != b)),
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::LogicalAnd | BinaryOp::LogicalOr => {
                unreachable!("handled above")
            }
        };

        if ty.signed && !ty.contains(raw) {
            return Err(overflow());
        }
        Ok(Value::new(raw, ty))
    }
}

#[cfg(test)]
mod tests {
    use super::super::lexer::tokenize;
    use super::super::parser::{parse, parse_expression};
    use super::*;

    fn abi() -> Abi {
        Abi::new("linux", "x86_64").unwrap()
    }

    fn check(src: &str) -> Result<EnumTable, HeaderError> {
        let tokens = tokenize(src, "test.h").unwrap();
        let unit = parse(&tokens).unwrap();
        typecheck(&unit, &abi())
    }

    fn values(src: &str) -> Vec<(String, i64)> {
        check(src)
            .unwrap()
            .iter()
            .map(|c| (c.name.clone(), c.value))
            .collect()
    }

    fn eval_str(src: &str) -> Result<i128, HeaderError> {
        let tokens = tokenize(src, "expr").unwrap();
        let expr = parse_expression(&tokens).unwrap();
        evaluate(&expr, &TranslationUnit::default(), &EnumTable::new(), &abi())
    }

    fn v(name: &str, value: i64) -> (String, i64) {
        (name.to_string(), value)
    }

    #[test]
    fn test_implicit_values() {
        assert_eq!(
            values("enum E { A, B, C = 10, D, E2 = -3, F };"),
            vec![v("A", 0), v("B", 1), v("C", 10), v("D", 11), v("E2", -3), v("F", -2)]
        );
    }

    #[test]
    fn test_references_to_earlier_enumerators() {
        assert_eq!(
            values("enum X { X_A = 4 }; enum Y { Y_A = X_A * 2, Y_B = Y_A | 1 };"),
            vec![v("X_A", 4), v("Y_A", 8), v("Y_B", 9)]
        );
    }

    #[test]
    fn test_scope_and_location() {
        let table = check("enum Tagged { T_A };\nenum { U_A };").unwrap();
        let t = table.get("T_A").unwrap();
        assert_eq!(t.scope.as_deref(), Some("Tagged"));
        let u = table.get("U_A").unwrap();
        assert_eq!(u.scope, None);
        assert_eq!(u.location.line, 2);
    }

    #[test]
    fn test_force32_sentinel_value() {
        let table = check("enum E { E_Force32 = 0x7FFFFFFF };").unwrap();
        assert_eq!(table.get("E_Force32").unwrap().value, 0x7fff_ffff);
    }

    #[test]
    fn test_unsigned_arithmetic_wraps() {
        assert_eq!(eval_str("~0u").unwrap(), 0xffff_ffff);
        assert_eq!(eval_str("0u - 1").unwrap(), 0xffff_ffff);
        assert_eq!(eval_str("-1 + 0u").unwrap(), 0xffff_ffff);
        assert_eq!(eval_str("0xFFFFFFFF + 1").unwrap(), 0);
        assert_eq!(eval_str("(unsigned char)300").unwrap(), 44);
        assert_eq!(eval_str("(unsigned int)-1").unwrap(), 4_294_967_295);
    }

    #[test]
    fn test_literal_typing() {
        // Hex constants that do not fit int are unsigned int.
        assert_eq!(eval_str("0xFFFFFFFF > 0").unwrap(), 1);
        assert_eq!(eval_str("-0x80000000").unwrap(), 0x8000_0000);
        // Decimal constants that do not fit int become long.
        assert_eq!(eval_str("-2147483648").unwrap(), -2_147_483_648);
        assert_eq!(eval_str("sizeof(2147483648)").unwrap(), 8);
        assert_eq!(eval_str("sizeof(1)").unwrap(), 4);
        assert_eq!(eval_str("sizeof(1ll)").unwrap(), 8);
    }

    #[test]
    fn test_shifts() {
        assert_eq!(eval_str("1 << 4").unwrap(), 16);
        assert_eq!(eval_str("1 << 31").unwrap(), -2_147_483_648);
        assert_eq!(eval_str("1u << 31").unwrap(), 0x8000_0000);
        assert_eq!(eval_str("-16 >> 2").unwrap(), -4);
        assert_eq!(eval_str("1ull << 40").unwrap(), 1 << 40);
    }

    #[test]
    fn test_operators() {
        assert_eq!(eval_str("7 / 2").unwrap(), 3);
        assert_eq!(eval_str("-7 / 2").unwrap(), -3);
        assert_eq!(eval_str("-7 % 2").unwrap(), -1);
        assert_eq!(eval_str("(1 | 2) ^ 7 & 5").unwrap(), 6);
        assert_eq!(eval_str("3 > 2 && 2 > 1").unwrap(), 1);
        assert_eq!(eval_str("!5 || 0").unwrap(), 0);
        assert_eq!(eval_str("1 ? 10 : 20").unwrap(), 10);
        assert_eq!(eval_str("0 ? 10 : 20").unwrap(), 20);
        assert_eq!(eval_str("-1 < 0u").unwrap(), 0);
        assert_eq!(eval_str("'A' + 1").unwrap(), 66);
        assert_eq!(eval_str("'\\xff'").unwrap(), -1);
        assert_eq!(eval_str("(_Bool)42").unwrap(), 1);
        assert_eq!(eval_str("0 && 1 / 0").unwrap(), 0);
    }

    #[test]
    fn test_sizeof_types() {
        assert_eq!(eval_str("sizeof(char)").unwrap(), 1);
        assert_eq!(eval_str("sizeof(short)").unwrap(), 2);
        assert_eq!(eval_str("sizeof(long)").unwrap(), 8);
        assert_eq!(eval_str("sizeof(void *)").unwrap(), 8);
        assert_eq!(eval_str("sizeof(double)").unwrap(), 8);
        assert_eq!(eval_str("sizeof(long double)").unwrap(), 16);
    }

    #[test]
    fn test_typedef_casts() {
        assert_eq!(
            values(
                "typedef unsigned int uint32_t;\n\
                 typedef uint32_t WGPUFlags;\n\
                 enum F { F_All = (WGPUFlags)~0 >> 1, F_Size = sizeof(WGPUFlags) };"
            ),
            vec![v("F_All", 0x7fff_ffff), v("F_Size", 4)]
        );
    }

    #[test]
    fn test_enum_type_in_sizeof() {
        assert_eq!(
            values("enum A { A_X = 1 }; enum B { B_Size = sizeof(enum A) };"),
            vec![v("A_X", 1), v("B_Size", 4)]
        );
    }

    #[test]
    fn test_char_signedness_follows_abi() {
        let tokens = tokenize("'\\xff'", "expr").unwrap();
        let expr = parse_expression(&tokens).unwrap();
        let arm = Abi::new("linux", "aarch64").unwrap();
        let value = evaluate(&expr, &TranslationUnit::default(), &EnumTable::new(), &arm);
        assert_eq!(value.unwrap(), 255);
    }

    #[test]
    fn test_wide_values() {
        assert_eq!(
            values("enum W { W_Big = 0x100000000, W_Next, W_Neg = -1 };"),
            vec![v("W_Big", 0x1_0000_0000), v("W_Next", 0x1_0000_0001), v("W_Neg", -1)]
        );
    }

    #[test]
    fn test_undeclared_identifier() {
        let err = check("enum E {\n  A = B + 1\n};").unwrap_err();
        assert_eq!(err.to_string(), "test.h:2:7: use of undeclared identifier `B`");
    }

    #[test]
    fn test_redefinition() {
        let err = check("enum A { X };\nenum B { X };").unwrap_err();
        assert!(err.to_string().contains("redefinition of enumerator `X`"));
        match err {
            HeaderError::Typecheck { note, .. } => {
                assert_eq!(note.as_deref(), Some("previous definition is at test.h:1:10"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_division_by_zero() {
        let err = eval_str("1 / (2 - 2)").unwrap_err();
        assert!(err.to_string().contains("division by zero"));
    }

    #[test]
    fn test_bad_shift_count() {
        assert!(eval_str("1 << 32").unwrap_err().to_string().contains("shift count"));
        assert!(eval_str("1 >> -1").unwrap_err().to_string().contains("shift count"));
    }

    #[test]
    fn test_signed_overflow() {
        let err = eval_str("2147483647 + 1").unwrap_err();
        assert!(err.to_string().contains("overflow"));
        let err = eval_str("-(-2147483647 - 1)").unwrap_err();
        assert!(err.to_string().contains("overflow"));
    }

    #[test]
    fn test_out_of_range_enumerators() {
        let err = check("enum E { A = 0xFFFFFFFFFFFFFFFF };").unwrap_err();
        assert!(err.to_string().contains("does not fit in a 64-bit integer"));

        let err = check("enum E { A = 0x7FFFFFFFFFFFFFFF, B };").unwrap_err();
        assert!(err.to_string().contains("overflow in enumeration values at `B`"));

        let err = check("enum E : unsigned char { A = 255, B };").unwrap_err();
        assert!(err.to_string().contains("outside the range of its underlying type"));
    }

    #[test]
    fn test_invalid_casts() {
        assert!(eval_str("(float)1")
            .unwrap_err()
            .to_string()
            .contains("non-integer type"));
        let err = check("enum E { A = sizeof(struct S) };").unwrap_err();
        assert!(err.to_string().contains("incomplete type"));
    }

    #[test]
    fn test_int_type_wrap() {
        let i8t = IntType::new(8, true);
        assert_eq!(i8t.wrap(128), -128);
        assert_eq!(i8t.wrap(-129), 127);
        assert_eq!(IntType::UINT.wrap(-1), 0xffff_ffff);
        assert_eq!(IntType::INT.common(IntType::UINT), IntType::UINT);
        assert_eq!(IntType::LLONG.common(IntType::UINT), IntType::LLONG);
        assert_eq!(IntType::new(16, false).common(IntType::new(8, true)), IntType::INT);
    }
}
