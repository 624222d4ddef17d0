//! The type and expression universes.
//!
//! Types and expressions are immutable values behind `Arc` handles
//! (`Type`, `Expr`); all modification is copy-on-write. Every expression
//! carries its type via the `Typed` wrapper. Each kind has a stable tag
//! ordinal (declaration order) used by the content hash and the total order,
//! and by the SMT conversion table.

use crate::machine;
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub type Ident = Arc<String>;

pub fn str_ident(x: &str) -> Ident {
    Arc::new(x.to_string())
}

/// Wrapper attaching a type to an expression node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Typed<X> {
    pub typ: Type,
    pub x: X,
}

pub type Type = Arc<TypeX>;
pub type Expr = Arc<Typed<ExprX>>;

impl Typed<ExprX> {
    pub fn new(typ: Type, x: ExprX) -> Expr {
        Arc::new(Typed { typ, x })
    }
}

/// Composite member layout shared by struct and union types.
/// Member order is significant for equality and layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructDef {
    pub name: Ident,
    pub members: Vec<Type>,
    pub member_names: Vec<Ident>,
}

impl StructDef {
    /// Index and type of a named member.
    pub fn member(&self, name: &Ident) -> Option<(usize, &Type)> {
        self.member_names.iter().position(|n| n == name).map(|i| (i, &self.members[i]))
    }
}

/// The type universe. Variant order is load-bearing: it defines the tag
/// ordinal fed to the CRC and the first key of the total order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeX {
    Bool,
    Empty,
    Symbol(Ident),
    Struct(StructDef),
    Union(StructDef),
    Code,
    /// `size` is `None` for unbounded arrays; a non-constant size expression
    /// makes the width query fail with `DynamicSizedArray`.
    Array { subtype: Type, size: Option<Expr> },
    Pointer(Type),
    UnsignedBv(u32),
    SignedBv(u32),
    FixedBv { width: u32, integer_bits: u32 },
    Str(u32),
}

/// Recoverable width-query failures (spec error taxonomy class 3).
#[derive(Error, Debug, Clone)]
pub enum WidthError {
    #[error("width query on symbolic type")]
    SymbolicType,
    #[error("width query on dynamically sized array")]
    DynamicSizedArray(Option<Expr>),
}

impl TypeX {
    pub fn tag(&self) -> u8 {
        match self {
            TypeX::Bool => 0,
            TypeX::Empty => 1,
            TypeX::Symbol(_) => 2,
            TypeX::Struct(_) => 3,
            TypeX::Union(_) => 4,
            TypeX::Code => 5,
            TypeX::Array { .. } => 6,
            TypeX::Pointer(_) => 7,
            TypeX::UnsignedBv(_) => 8,
            TypeX::SignedBv(_) => 9,
            TypeX::FixedBv { .. } => 10,
            TypeX::Str(_) => 11,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        const NAMES: [&str; 12] = [
            "bool",
            "empty",
            "symbol",
            "struct",
            "union",
            "code",
            "array",
            "pointer",
            "unsignedbv",
            "signedbv",
            "fixedbv",
            "string",
        ];
        NAMES[self.tag() as usize]
    }

    /// Bit width of the type.
    pub fn width(&self) -> Result<u64, WidthError> {
        match self {
            TypeX::Bool => Ok(1),
            TypeX::Empty | TypeX::Code | TypeX::Symbol(_) => Err(WidthError::SymbolicType),
            TypeX::Struct(d) => {
                let mut total = 0u64;
                for m in &d.members {
                    total += m.width()?;
                }
                Ok(total)
            }
            TypeX::Union(d) => {
                let mut max = 0u64;
                for m in &d.members {
                    max = std::cmp::max(max, m.width()?);
                }
                Ok(max)
            }
            TypeX::Array { subtype, size } => {
                let elem = subtype.width()?;
                match size {
                    Some(e) => match &e.x {
                        ExprX::ConstantInt(n) => match n.to_u64() {
                            Some(k) => Ok(elem * k),
                            None => Err(WidthError::DynamicSizedArray(size.clone())),
                        },
                        _ => Err(WidthError::DynamicSizedArray(size.clone())),
                    },
                    None => Err(WidthError::DynamicSizedArray(None)),
                }
            }
            TypeX::Pointer(_) => Ok(machine::machine_model().word_width as u64),
            TypeX::UnsignedBv(w) | TypeX::SignedBv(w) => Ok(*w as u64),
            TypeX::FixedBv { width, .. } => Ok(*width as u64),
            TypeX::Str(n) => Ok(8 * (*n as u64)),
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, TypeX::SignedBv(_) | TypeX::FixedBv { .. })
    }

    pub fn is_bv(&self) -> bool {
        matches!(self, TypeX::UnsignedBv(_) | TypeX::SignedBv(_))
    }

    pub fn crc32(&self) -> u32 {
        let mut h = crc32fast::Hasher::new();
        self.do_crc(&mut h);
        h.finalize()
    }

    pub(crate) fn do_crc(&self, h: &mut crc32fast::Hasher) {
        h.update(&[self.tag()]);
        match self {
            TypeX::Bool | TypeX::Empty | TypeX::Code => {}
            TypeX::Symbol(name) => h.update(name.as_bytes()),
            TypeX::Struct(d) | TypeX::Union(d) => {
                h.update(d.name.as_bytes());
                for m in &d.members {
                    m.do_crc(h);
                }
                for n in &d.member_names {
                    h.update(n.as_bytes());
                }
            }
            TypeX::Array { subtype, size } => {
                subtype.do_crc(h);
                if let Some(e) = size {
                    e.do_crc(h);
                }
            }
            TypeX::Pointer(subtype) => subtype.do_crc(h),
            TypeX::UnsignedBv(w) | TypeX::SignedBv(w) => h.update(&w.to_le_bytes()),
            TypeX::FixedBv { width, integer_bits } => {
                h.update(&width.to_le_bytes());
                h.update(&integer_bits.to_le_bytes());
            }
            TypeX::Str(n) => h.update(&n.to_le_bytes()),
        }
    }
}

impl fmt::Display for TypeX {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeX::Symbol(name) => write!(f, "symbol({})", name),
            TypeX::Struct(d) => write!(f, "struct {}", d.name),
            TypeX::Union(d) => write!(f, "union {}", d.name),
            TypeX::Array { subtype, size } => match size {
                Some(e) => write!(f, "array({}, {})", subtype, e),
                None => write!(f, "array({}, inf)", subtype),
            },
            TypeX::Pointer(subtype) => write!(f, "pointer({})", subtype),
            TypeX::UnsignedBv(w) => write!(f, "unsignedbv({})", w),
            TypeX::SignedBv(w) => write!(f, "signedbv({})", w),
            TypeX::FixedBv { width, integer_bits } => {
                write!(f, "fixedbv({}, {})", width, integer_bits)
            }
            TypeX::Str(n) => write!(f, "string({})", n),
            _ => write!(f, "{}", self.kind_name()),
        }
    }
}

/// Renaming level of a symbol (see the symex crate for the transitions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RenameLevel {
    Level0,
    Level1,
    Level1Global,
    Level2,
    Level2Global,
}

/// Payload of a `Symbol` expression: interned base name plus renaming state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolData {
    pub name: Ident,
    pub rlevel: RenameLevel,
    pub level1_num: u32,
    pub level2_num: u32,
    pub thread_num: u32,
    /// CFG node attached by level-2 renaming.
    pub node_num: u32,
}

impl SymbolData {
    pub fn level0(name: Ident) -> SymbolData {
        SymbolData {
            name,
            rlevel: RenameLevel::Level0,
            level1_num: 0,
            level2_num: 0,
            thread_num: 0,
            node_num: 0,
        }
    }

    /// The fully-decorated solver-facing name. Suffix scheme: `@` level-1
    /// number, `!` thread, `&` node, `?` level-2 number. All four separators
    /// are legal SMT-LIB simple-symbol characters, so renamed names never
    /// need pipe quoting.
    pub fn full_name(&self) -> String {
        match self.rlevel {
            RenameLevel::Level0 | RenameLevel::Level1Global => self.name.to_string(),
            RenameLevel::Level1 => {
                format!("{}@{}!{}", self.name, self.level1_num, self.thread_num)
            }
            RenameLevel::Level2 => format!(
                "{}@{}!{}&{}?{}",
                self.name, self.level1_num, self.thread_num, self.node_num, self.level2_num
            ),
            RenameLevel::Level2Global => {
                format!("{}&{}?{}", self.name, self.node_num, self.level2_num)
            }
        }
    }
}

/// The expression universe. One variant per kind; variant order defines the
/// tag ordinal (must stay below 256 so tags fit in the CRC's single byte).
/// Scalar payload fields are declared before child expressions so that
/// "tag, then fields in declaration order" matches the CRC feeding order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExprX {
    ConstantInt(BigInt),
    /// Raw bit pattern of a fixed-point value at the type's width.
    ConstantFixedBv(BigInt),
    ConstantBool(bool),
    ConstantString(Ident),
    ConstantStruct(Vec<Expr>),
    ConstantUnion { init_field: Ident, value: Expr },
    ConstantArray(Vec<Expr>),
    ConstantArrayOf(Expr),
    Symbol(SymbolData),
    Typecast(Expr),
    If(Expr, Expr, Expr),
    Equality(Expr, Expr),
    NotEqual(Expr, Expr),
    LessThan(Expr, Expr),
    GreaterThan(Expr, Expr),
    LessThanEqual(Expr, Expr),
    GreaterThanEqual(Expr, Expr),
    Not(Expr),
    And(Expr, Expr),
    Or(Expr, Expr),
    Xor(Expr, Expr),
    Implies(Expr, Expr),
    BitAnd(Expr, Expr),
    BitOr(Expr, Expr),
    BitXor(Expr, Expr),
    BitNand(Expr, Expr),
    BitNor(Expr, Expr),
    BitNxor(Expr, Expr),
    LShr(Expr, Expr),
    Shl(Expr, Expr),
    AShr(Expr, Expr),
    Neg(Expr),
    Abs(Expr),
    Add(Expr, Expr),
    Sub(Expr, Expr),
    Mul(Expr, Expr),
    Div(Expr, Expr),
    Modulus(Expr, Expr),
    DynamicObject(Expr),
    SameObject(Expr, Expr),
    PointerOffset(Expr),
    PointerObject(Expr),
    AddressOf(Expr),
    ByteExtract { big_endian: bool, source: Expr, offset: Expr },
    ByteUpdate { big_endian: bool, source: Expr, offset: Expr, value: Expr },
    With { source: Expr, field: Expr, value: Expr },
    Member { name: Ident, source: Expr },
    Index { source: Expr, index: Expr },
    ZeroString(Expr),
    ZeroLengthString(Expr),
    IsNan(Expr),
    Overflow(Expr),
    OverflowCast { bits: u32, operand: Expr },
    OverflowNeg(Expr),
}

pub const NUM_EXPR_KINDS: usize = 54;

impl ExprX {
    pub fn tag(&self) -> u8 {
        match self {
            ExprX::ConstantInt(_) => 0,
            ExprX::ConstantFixedBv(_) => 1,
            ExprX::ConstantBool(_) => 2,
            ExprX::ConstantString(_) => 3,
            ExprX::ConstantStruct(_) => 4,
            ExprX::ConstantUnion { .. } => 5,
            ExprX::ConstantArray(_) => 6,
            ExprX::ConstantArrayOf(_) => 7,
            ExprX::Symbol(_) => 8,
            ExprX::Typecast(_) => 9,
            ExprX::If(..) => 10,
            ExprX::Equality(..) => 11,
            ExprX::NotEqual(..) => 12,
            ExprX::LessThan(..) => 13,
            ExprX::GreaterThan(..) => 14,
            ExprX::LessThanEqual(..) => 15,
            ExprX::GreaterThanEqual(..) => 16,
            ExprX::Not(_) => 17,
            ExprX::And(..) => 18,
            ExprX::Or(..) => 19,
            ExprX::Xor(..) => 20,
            ExprX::Implies(..) => 21,
            ExprX::BitAnd(..) => 22,
            ExprX::BitOr(..) => 23,
            ExprX::BitXor(..) => 24,
            ExprX::BitNand(..) => 25,
            ExprX::BitNor(..) => 26,
            ExprX::BitNxor(..) => 27,
            ExprX::LShr(..) => 28,
            ExprX::Shl(..) => 29,
            ExprX::AShr(..) => 30,
            ExprX::Neg(_) => 31,
            ExprX::Abs(_) => 32,
            ExprX::Add(..) => 33,
            ExprX::Sub(..) => 34,
            ExprX::Mul(..) => 35,
            ExprX::Div(..) => 36,
            ExprX::Modulus(..) => 37,
            ExprX::DynamicObject(_) => 38,
            ExprX::SameObject(..) => 39,
            ExprX::PointerOffset(_) => 40,
            ExprX::PointerObject(_) => 41,
            ExprX::AddressOf(_) => 42,
            ExprX::ByteExtract { .. } => 43,
            ExprX::ByteUpdate { .. } => 44,
            ExprX::With { .. } => 45,
            ExprX::Member { .. } => 46,
            ExprX::Index { .. } => 47,
            ExprX::ZeroString(_) => 48,
            ExprX::ZeroLengthString(_) => 49,
            ExprX::IsNan(_) => 50,
            ExprX::Overflow(_) => 51,
            ExprX::OverflowCast { .. } => 52,
            ExprX::OverflowNeg(_) => 53,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        const NAMES: [&str; NUM_EXPR_KINDS] = [
            "constant_int",
            "constant_fixedbv",
            "constant_bool",
            "constant_string",
            "constant_struct",
            "constant_union",
            "constant_array",
            "constant_array_of",
            "symbol",
            "typecast",
            "if",
            "equality",
            "notequal",
            "lessthan",
            "greaterthan",
            "lessthanequal",
            "greaterthanequal",
            "not",
            "and",
            "or",
            "xor",
            "implies",
            "bitand",
            "bitor",
            "bitxor",
            "bitnand",
            "bitnor",
            "bitnxor",
            "lshr",
            "shl",
            "ashr",
            "neg",
            "abs",
            "add",
            "sub",
            "mul",
            "div",
            "modulus",
            "dynamic_object",
            "same_object",
            "pointer_offset",
            "pointer_object",
            "address_of",
            "byte_extract",
            "byte_update",
            "with",
            "member",
            "index",
            "zero_string",
            "zero_length_string",
            "isnan",
            "overflow",
            "overflow_cast",
            "overflow_neg",
        ];
        NAMES[self.tag() as usize]
    }

    /// Child expressions in declaration order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            ExprX::ConstantInt(_)
            | ExprX::ConstantFixedBv(_)
            | ExprX::ConstantBool(_)
            | ExprX::ConstantString(_)
            | ExprX::Symbol(_) => vec![],
            ExprX::ConstantStruct(members) | ExprX::ConstantArray(members) => {
                members.iter().collect()
            }
            ExprX::ConstantUnion { value, .. } => vec![value],
            ExprX::ConstantArrayOf(e)
            | ExprX::Typecast(e)
            | ExprX::Not(e)
            | ExprX::Neg(e)
            | ExprX::Abs(e)
            | ExprX::DynamicObject(e)
            | ExprX::PointerOffset(e)
            | ExprX::PointerObject(e)
            | ExprX::AddressOf(e)
            | ExprX::ZeroString(e)
            | ExprX::ZeroLengthString(e)
            | ExprX::IsNan(e)
            | ExprX::Overflow(e)
            | ExprX::OverflowNeg(e) => vec![e],
            ExprX::OverflowCast { operand, .. } => vec![operand],
            ExprX::If(a, b, c) => vec![a, b, c],
            ExprX::Equality(a, b)
            | ExprX::NotEqual(a, b)
            | ExprX::LessThan(a, b)
            | ExprX::GreaterThan(a, b)
            | ExprX::LessThanEqual(a, b)
            | ExprX::GreaterThanEqual(a, b)
            | ExprX::And(a, b)
            | ExprX::Or(a, b)
            | ExprX::Xor(a, b)
            | ExprX::Implies(a, b)
            | ExprX::BitAnd(a, b)
            | ExprX::BitOr(a, b)
            | ExprX::BitXor(a, b)
            | ExprX::BitNand(a, b)
            | ExprX::BitNor(a, b)
            | ExprX::BitNxor(a, b)
            | ExprX::LShr(a, b)
            | ExprX::Shl(a, b)
            | ExprX::AShr(a, b)
            | ExprX::Add(a, b)
            | ExprX::Sub(a, b)
            | ExprX::Mul(a, b)
            | ExprX::Div(a, b)
            | ExprX::Modulus(a, b)
            | ExprX::SameObject(a, b) => vec![a, b],
            ExprX::ByteExtract { source, offset, .. } => vec![source, offset],
            ExprX::ByteUpdate { source, offset, value, .. } => vec![source, offset, value],
            ExprX::With { source, field, value } => vec![source, field, value],
            ExprX::Member { source, .. } => vec![source],
            ExprX::Index { source, index } => vec![source, index],
        }
    }

    /// Rebuild this node with each child replaced by `f(child)`.
    pub fn map_children(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> ExprX {
        match self {
            ExprX::ConstantInt(_)
            | ExprX::ConstantFixedBv(_)
            | ExprX::ConstantBool(_)
            | ExprX::ConstantString(_)
            | ExprX::Symbol(_) => self.clone(),
            ExprX::ConstantStruct(members) => {
                ExprX::ConstantStruct(members.iter().map(|e| f(e)).collect())
            }
            ExprX::ConstantArray(members) => {
                ExprX::ConstantArray(members.iter().map(|e| f(e)).collect())
            }
            ExprX::ConstantUnion { init_field, value } => {
                ExprX::ConstantUnion { init_field: init_field.clone(), value: f(value) }
            }
            ExprX::ConstantArrayOf(e) => ExprX::ConstantArrayOf(f(e)),
            ExprX::Typecast(e) => ExprX::Typecast(f(e)),
            ExprX::If(a, b, c) => ExprX::If(f(a), f(b), f(c)),
            ExprX::Equality(a, b) => ExprX::Equality(f(a), f(b)),
            ExprX::NotEqual(a, b) => ExprX::NotEqual(f(a), f(b)),
            ExprX::LessThan(a, b) => ExprX::LessThan(f(a), f(b)),
            ExprX::GreaterThan(a, b) => ExprX::GreaterThan(f(a), f(b)),
            ExprX::LessThanEqual(a, b) => ExprX::LessThanEqual(f(a), f(b)),
            ExprX::GreaterThanEqual(a, b) => ExprX::GreaterThanEqual(f(a), f(b)),
            ExprX::Not(e) => ExprX::Not(f(e)),
            ExprX::And(a, b) => ExprX::And(f(a), f(b)),
            ExprX::Or(a, b) => ExprX::Or(f(a), f(b)),
            ExprX::Xor(a, b) => ExprX::Xor(f(a), f(b)),
            ExprX::Implies(a, b) => ExprX::Implies(f(a), f(b)),
            ExprX::BitAnd(a, b) => ExprX::BitAnd(f(a), f(b)),
            ExprX::BitOr(a, b) => ExprX::BitOr(f(a), f(b)),
            ExprX::BitXor(a, b) => ExprX::BitXor(f(a), f(b)),
            ExprX::BitNand(a, b) => ExprX::BitNand(f(a), f(b)),
            ExprX::BitNor(a, b) => ExprX::BitNor(f(a), f(b)),
            ExprX::BitNxor(a, b) => ExprX::BitNxor(f(a), f(b)),
            ExprX::LShr(a, b) => ExprX::LShr(f(a), f(b)),
            ExprX::Shl(a, b) => ExprX::Shl(f(a), f(b)),
            ExprX::AShr(a, b) => ExprX::AShr(f(a), f(b)),
            ExprX::Neg(e) => ExprX::Neg(f(e)),
            ExprX::Abs(e) => ExprX::Abs(f(e)),
            ExprX::Add(a, b) => ExprX::Add(f(a), f(b)),
            ExprX::Sub(a, b) => ExprX::Sub(f(a), f(b)),
            ExprX::Mul(a, b) => ExprX::Mul(f(a), f(b)),
            ExprX::Div(a, b) => ExprX::Div(f(a), f(b)),
            ExprX::Modulus(a, b) => ExprX::Modulus(f(a), f(b)),
            ExprX::DynamicObject(e) => ExprX::DynamicObject(f(e)),
            ExprX::SameObject(a, b) => ExprX::SameObject(f(a), f(b)),
            ExprX::PointerOffset(e) => ExprX::PointerOffset(f(e)),
            ExprX::PointerObject(e) => ExprX::PointerObject(f(e)),
            ExprX::AddressOf(e) => ExprX::AddressOf(f(e)),
            ExprX::ByteExtract { big_endian, source, offset } => ExprX::ByteExtract {
                big_endian: *big_endian,
                source: f(source),
                offset: f(offset),
            },
            ExprX::ByteUpdate { big_endian, source, offset, value } => ExprX::ByteUpdate {
                big_endian: *big_endian,
                source: f(source),
                offset: f(offset),
                value: f(value),
            },
            ExprX::With { source, field, value } => {
                ExprX::With { source: f(source), field: f(field), value: f(value) }
            }
            ExprX::Member { name, source } => {
                ExprX::Member { name: name.clone(), source: f(source) }
            }
            ExprX::Index { source, index } => {
                ExprX::Index { source: f(source), index: f(index) }
            }
            ExprX::ZeroString(e) => ExprX::ZeroString(f(e)),
            ExprX::ZeroLengthString(e) => ExprX::ZeroLengthString(f(e)),
            ExprX::IsNan(e) => ExprX::IsNan(f(e)),
            ExprX::Overflow(e) => ExprX::Overflow(f(e)),
            ExprX::OverflowCast { bits, operand } => {
                ExprX::OverflowCast { bits: *bits, operand: f(operand) }
            }
            ExprX::OverflowNeg(e) => ExprX::OverflowNeg(f(e)),
        }
    }
}

impl Typed<ExprX> {
    pub fn crc32(&self) -> u32 {
        let mut h = crc32fast::Hasher::new();
        self.do_crc(&mut h);
        h.finalize()
    }

    /// Feed tag byte, the type, then fields in declaration order. `BigInt`
    /// payloads feed the big-endian magnitude, or a single 0 byte for zero.
    pub(crate) fn do_crc(&self, h: &mut crc32fast::Hasher) {
        h.update(&[self.x.tag()]);
        self.typ.do_crc(h);
        match &self.x {
            ExprX::ConstantInt(n) | ExprX::ConstantFixedBv(n) => crc_bigint(h, n),
            ExprX::ConstantBool(b) => h.update(&[*b as u8]),
            ExprX::ConstantString(s) => h.update(s.as_bytes()),
            ExprX::ConstantUnion { init_field, .. } => h.update(init_field.as_bytes()),
            ExprX::Symbol(sym) => {
                h.update(sym.name.as_bytes());
                h.update(&[sym.rlevel as u8]);
                h.update(&sym.level1_num.to_le_bytes());
                h.update(&sym.level2_num.to_le_bytes());
                h.update(&sym.thread_num.to_le_bytes());
                h.update(&sym.node_num.to_le_bytes());
            }
            ExprX::ByteExtract { big_endian, .. } | ExprX::ByteUpdate { big_endian, .. } => {
                h.update(&[*big_endian as u8])
            }
            ExprX::Member { name, .. } => h.update(name.as_bytes()),
            ExprX::OverflowCast { bits, .. } => h.update(&bits.to_le_bytes()),
            _ => {}
        }
        for c in self.x.children() {
            c.do_crc(h);
        }
    }
}

fn crc_bigint(h: &mut crc32fast::Hasher, n: &BigInt) {
    if n.is_zero() {
        h.update(&[0]);
    } else {
        let (_, bytes) = n.to_bytes_be();
        h.update(&bytes);
    }
}

// Total order: tag first, then type, then fields in declaration order
// (the derived enum order supplies the field comparison).
impl Ord for Typed<ExprX> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.x
            .tag()
            .cmp(&other.x.tag())
            .then_with(|| self.typ.cmp(&other.typ))
            .then_with(|| self.x.cmp(&other.x))
    }
}

impl PartialOrd for Typed<ExprX> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Typed<ExprX> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.x {
            ExprX::ConstantInt(n) | ExprX::ConstantFixedBv(n) => write!(f, "{}", n),
            ExprX::ConstantBool(b) => write!(f, "{}", b),
            ExprX::ConstantString(s) => write!(f, "{:?}", s.as_str()),
            ExprX::Symbol(sym) => write!(f, "{}", sym.full_name()),
            ExprX::Member { name, source } => write!(f, "(member {} {})", source, name),
            _ => {
                write!(f, "({}", self.x.kind_name())?;
                for c in self.x.children() {
                    write!(f, " {}", c)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Multi-line diagnostic rendering of an expression tree.
pub fn pretty(expr: &Expr, indent: usize) -> String {
    let pad = " ".repeat(indent);
    let mut out = format!("{}{} : {}", pad, expr.x.kind_name(), expr.typ);
    match &expr.x {
        ExprX::Symbol(sym) => out.push_str(&format!(" [{}]", sym.full_name())),
        ExprX::ConstantInt(n) => out.push_str(&format!(" [{}]", n)),
        ExprX::ConstantBool(b) => out.push_str(&format!(" [{}]", b)),
        _ => {}
    }
    for c in expr.x.children() {
        out.push('\n');
        out.push_str(&pretty(c, indent + 2));
    }
    out
}
