//! Smart constructors over the expression universe.
//!
//! Boolean connectives fold constants on construction; everything else
//! builds the node verbatim. Constructors that can compute their result type
//! do so (`mk_address_of`, `mk_member`, `mk_index`).

use crate::ast::{Expr, ExprX, Ident, SymbolData, Type, TypeX, Typed};
use crate::pool;
use num_bigint::BigInt;
use num_traits::ToPrimitive;

pub fn constant_int<N: Into<BigInt>>(n: N, typ: Type) -> Expr {
    Typed::new(typ, ExprX::ConstantInt(n.into()))
}

pub fn constant_bool(b: bool) -> Expr {
    Typed::new(pool::bool_type(), ExprX::ConstantBool(b))
}

pub fn constant_fixedbv(bits: BigInt, typ: Type) -> Expr {
    Typed::new(typ, ExprX::ConstantFixedBv(bits))
}

/// Parse a decimal (`"12.5"`, `"-3"`) or quotient (`"3/8"`) literal into
/// the scaled bit pattern of a fixed-point constant, rounding toward zero.
pub fn fixedbv_from_string(s: &str, typ: Type) -> Expr {
    let frac_bits = match &*typ {
        TypeX::FixedBv { width, integer_bits } => width - integer_bits,
        _ => panic!("internal error: fixed-point literal of type {}", typ),
    };
    let scale = BigInt::from(1u8) << frac_bits;
    let bits = if let Some((num, den)) = s.split_once('/') {
        let num: BigInt = num.parse().expect("malformed fixed-point numerator");
        let den: BigInt = den.parse().expect("malformed fixed-point denominator");
        num * scale / den
    } else if let Some((int_part, frac_part)) = s.split_once('.') {
        let negative = int_part.starts_with('-');
        let int_val: BigInt = if int_part == "-" || int_part.is_empty() {
            BigInt::from(0u8)
        } else {
            int_part.parse().expect("malformed fixed-point integer part")
        };
        let frac_val: BigInt = if frac_part.is_empty() {
            BigInt::from(0u8)
        } else {
            frac_part.parse().expect("malformed fixed-point fraction part")
        };
        let mut denom = BigInt::from(1u8);
        for _ in 0..frac_part.len() {
            denom *= 10;
        }
        let frac_scaled = frac_val * &scale / denom;
        let magnitude = int_val.magnitude() * scale.magnitude() + frac_scaled.magnitude();
        let signed = BigInt::from_biguint(
            if negative { num_bigint::Sign::Minus } else { num_bigint::Sign::Plus },
            magnitude,
        );
        signed
    } else {
        let v: BigInt = s.parse().expect("malformed fixed-point literal");
        v * scale
    };
    constant_fixedbv(bits, typ)
}

pub fn constant_string(s: &str) -> Expr {
    let typ = pool::intern(TypeX::Str(s.len() as u32));
    Typed::new(typ, ExprX::ConstantString(crate::ast::str_ident(s)))
}

/// Expand a string constant into a `constant_array` of `unsignedbv(8)` with
/// a trailing NUL, as required before array-level equality.
pub fn string_constant_to_array(e: &Expr) -> Expr {
    let s = match &e.x {
        ExprX::ConstantString(s) => s,
        _ => panic!("internal error: string_constant_to_array on {}", e.x.kind_name()),
    };
    let u8t = pool::uint_type(8);
    let mut elems: Vec<Expr> = s.bytes().map(|b| constant_int(b, u8t.clone())).collect();
    elems.push(constant_int(0u8, u8t.clone()));
    let size = constant_int(elems.len() as u64, pool::uint_type(64));
    let typ = pool::intern(TypeX::Array { subtype: u8t, size: Some(size) });
    Typed::new(typ, ExprX::ConstantArray(elems))
}

pub fn symbol_expr(name: Ident, typ: Type) -> Expr {
    Typed::new(typ, ExprX::Symbol(SymbolData::level0(name)))
}

pub fn symbol_data_expr(data: SymbolData, typ: Type) -> Expr {
    Typed::new(typ, ExprX::Symbol(data))
}

pub fn as_constant_int(e: &Expr) -> Option<&BigInt> {
    match &e.x {
        ExprX::ConstantInt(n) => Some(n),
        _ => None,
    }
}

pub fn as_constant_bool(e: &Expr) -> Option<bool> {
    match &e.x {
        ExprX::ConstantBool(b) => Some(*b),
        _ => None,
    }
}

pub fn as_constant_u64(e: &Expr) -> Option<u64> {
    as_constant_int(e).and_then(|n| n.to_u64())
}

pub fn is_constant(e: &Expr) -> bool {
    matches!(
        e.x,
        ExprX::ConstantInt(_)
            | ExprX::ConstantFixedBv(_)
            | ExprX::ConstantBool(_)
            | ExprX::ConstantString(_)
            | ExprX::ConstantStruct(_)
            | ExprX::ConstantUnion { .. }
            | ExprX::ConstantArray(_)
            | ExprX::ConstantArrayOf(_)
    )
}

pub fn mk_not(e: &Expr) -> Expr {
    match &e.x {
        ExprX::ConstantBool(b) => constant_bool(!b),
        ExprX::Not(inner) => inner.clone(),
        _ => Typed::new(pool::bool_type(), ExprX::Not(e.clone())),
    }
}

pub fn mk_and(e1: &Expr, e2: &Expr) -> Expr {
    match (&e1.x, &e2.x) {
        (ExprX::ConstantBool(false), _) | (_, ExprX::ConstantBool(false)) => constant_bool(false),
        (ExprX::ConstantBool(true), _) => e2.clone(),
        (_, ExprX::ConstantBool(true)) => e1.clone(),
        _ => Typed::new(pool::bool_type(), ExprX::And(e1.clone(), e2.clone())),
    }
}

pub fn mk_or(e1: &Expr, e2: &Expr) -> Expr {
    match (&e1.x, &e2.x) {
        (ExprX::ConstantBool(true), _) | (_, ExprX::ConstantBool(true)) => constant_bool(true),
        (ExprX::ConstantBool(false), _) => e2.clone(),
        (_, ExprX::ConstantBool(false)) => e1.clone(),
        _ => Typed::new(pool::bool_type(), ExprX::Or(e1.clone(), e2.clone())),
    }
}

pub fn mk_xor(e1: &Expr, e2: &Expr) -> Expr {
    Typed::new(pool::bool_type(), ExprX::Xor(e1.clone(), e2.clone()))
}

pub fn mk_implies(e1: &Expr, e2: &Expr) -> Expr {
    match (&e1.x, &e2.x) {
        (ExprX::ConstantBool(false), _) => constant_bool(true),
        (ExprX::ConstantBool(true), _) => e2.clone(),
        (_, ExprX::ConstantBool(true)) => constant_bool(true),
        (_, ExprX::ConstantBool(false)) => mk_not(e1),
        _ => Typed::new(pool::bool_type(), ExprX::Implies(e1.clone(), e2.clone())),
    }
}

pub fn mk_eq(e1: &Expr, e2: &Expr) -> Expr {
    Typed::new(pool::bool_type(), ExprX::Equality(e1.clone(), e2.clone()))
}

pub fn mk_notequal(e1: &Expr, e2: &Expr) -> Expr {
    Typed::new(pool::bool_type(), ExprX::NotEqual(e1.clone(), e2.clone()))
}

pub fn mk_lessthan(e1: &Expr, e2: &Expr) -> Expr {
    Typed::new(pool::bool_type(), ExprX::LessThan(e1.clone(), e2.clone()))
}

pub fn mk_greaterthan(e1: &Expr, e2: &Expr) -> Expr {
    Typed::new(pool::bool_type(), ExprX::GreaterThan(e1.clone(), e2.clone()))
}

pub fn mk_lessthanequal(e1: &Expr, e2: &Expr) -> Expr {
    Typed::new(pool::bool_type(), ExprX::LessThanEqual(e1.clone(), e2.clone()))
}

pub fn mk_greaterthanequal(e1: &Expr, e2: &Expr) -> Expr {
    Typed::new(pool::bool_type(), ExprX::GreaterThanEqual(e1.clone(), e2.clone()))
}

pub fn mk_if(cond: &Expr, then: &Expr, els: &Expr) -> Expr {
    Typed::new(then.typ.clone(), ExprX::If(cond.clone(), then.clone(), els.clone()))
}

pub fn mk_add(e1: &Expr, e2: &Expr) -> Expr {
    Typed::new(e1.typ.clone(), ExprX::Add(e1.clone(), e2.clone()))
}

pub fn mk_sub(e1: &Expr, e2: &Expr) -> Expr {
    Typed::new(e1.typ.clone(), ExprX::Sub(e1.clone(), e2.clone()))
}

pub fn mk_mul(e1: &Expr, e2: &Expr) -> Expr {
    Typed::new(e1.typ.clone(), ExprX::Mul(e1.clone(), e2.clone()))
}

pub fn mk_div(e1: &Expr, e2: &Expr) -> Expr {
    Typed::new(e1.typ.clone(), ExprX::Div(e1.clone(), e2.clone()))
}

pub fn mk_modulus(e1: &Expr, e2: &Expr) -> Expr {
    Typed::new(e1.typ.clone(), ExprX::Modulus(e1.clone(), e2.clone()))
}

pub fn mk_neg(e: &Expr) -> Expr {
    Typed::new(e.typ.clone(), ExprX::Neg(e.clone()))
}

pub fn mk_typecast(e: &Expr, to: Type) -> Expr {
    Typed::new(to, ExprX::Typecast(e.clone()))
}

/// `address_of(v: T)` has type `pointer(T)`.
pub fn mk_address_of(e: &Expr) -> Expr {
    Typed::new(pool::pointer_type(e.typ.clone()), ExprX::AddressOf(e.clone()))
}

pub fn mk_same_object(e1: &Expr, e2: &Expr) -> Expr {
    Typed::new(pool::bool_type(), ExprX::SameObject(e1.clone(), e2.clone()))
}

pub fn mk_pointer_object(e: &Expr) -> Expr {
    let w = crate::machine::machine_model().word_width;
    Typed::new(pool::uint_type(w), ExprX::PointerObject(e.clone()))
}

pub fn mk_pointer_offset(e: &Expr) -> Expr {
    let w = crate::machine::machine_model().word_width;
    Typed::new(pool::uint_type(w), ExprX::PointerOffset(e.clone()))
}

pub fn mk_member(source: &Expr, name: &Ident) -> Expr {
    let typ = match &*source.typ {
        TypeX::Struct(d) | TypeX::Union(d) => match d.member(name) {
            Some((_, t)) => t.clone(),
            None => panic!("internal error: member {} not in {}", name, source.typ),
        },
        _ => panic!("internal error: member access on {}", source.typ),
    };
    Typed::new(typ, ExprX::Member { name: name.clone(), source: source.clone() })
}

pub fn mk_index(source: &Expr, index: &Expr) -> Expr {
    let typ = match &*source.typ {
        TypeX::Array { subtype, .. } => subtype.clone(),
        TypeX::Str(_) => pool::uint_type(8),
        _ => panic!("internal error: index on {}", source.typ),
    };
    Typed::new(typ, ExprX::Index { source: source.clone(), index: index.clone() })
}

pub fn mk_with(source: &Expr, field: &Expr, value: &Expr) -> Expr {
    Typed::new(
        source.typ.clone(),
        ExprX::With { source: source.clone(), field: field.clone(), value: value.clone() },
    )
}

pub fn mk_byte_extract(source: &Expr, offset: &Expr, big_endian: bool) -> Expr {
    Typed::new(
        pool::uint_type(8),
        ExprX::ByteExtract { big_endian, source: source.clone(), offset: offset.clone() },
    )
}

pub fn mk_byte_update(source: &Expr, offset: &Expr, value: &Expr, big_endian: bool) -> Expr {
    Typed::new(
        source.typ.clone(),
        ExprX::ByteUpdate {
            big_endian,
            source: source.clone(),
            offset: offset.clone(),
            value: value.clone(),
        },
    )
}

/// `overflow(x)` is only defined over add, sub and mul.
pub fn mk_overflow(e: &Expr) -> Expr {
    match e.x {
        ExprX::Add(..) | ExprX::Sub(..) | ExprX::Mul(..) => {
            Typed::new(pool::bool_type(), ExprX::Overflow(e.clone()))
        }
        _ => panic!("internal error: overflow of {}", e.x.kind_name()),
    }
}

pub fn mk_overflow_cast(e: &Expr, bits: u32) -> Expr {
    Typed::new(pool::bool_type(), ExprX::OverflowCast { bits, operand: e.clone() })
}

pub fn mk_overflow_neg(e: &Expr) -> Expr {
    Typed::new(pool::bool_type(), ExprX::OverflowNeg(e.clone()))
}

pub fn mk_isnan(e: &Expr) -> Expr {
    Typed::new(pool::bool_type(), ExprX::IsNan(e.clone()))
}
