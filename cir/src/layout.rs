//! Byte-granular size and offset queries over types.
//!
//! Sizes round up to whole bytes per member. Dynamic-sized arrays surface as
//! a typed failure carrying the size expression; callers that can tolerate
//! the failure (pointer arithmetic on VLAs) must handle it explicitly.

use crate::ast::{Ident, Type, TypeX, WidthError};
use num_bigint::BigInt;

fn bits_to_bytes(bits: u64) -> u64 {
    (bits + 7) / 8
}

/// Size of a type in bytes.
pub fn type_byte_size(t: &Type) -> Result<BigInt, WidthError> {
    match &**t {
        TypeX::Struct(d) => {
            let mut total = BigInt::from(0u8);
            for m in &d.members {
                total += type_byte_size(m)?;
            }
            Ok(total)
        }
        TypeX::Union(d) => {
            let mut max = BigInt::from(0u8);
            for m in &d.members {
                let sz = type_byte_size(m)?;
                if sz > max {
                    max = sz;
                }
            }
            Ok(max)
        }
        TypeX::Array { subtype, size } => {
            let elem = type_byte_size(subtype)?;
            match size.as_ref().and_then(|e| crate::ast_util::as_constant_int(e)) {
                Some(n) => Ok(elem * n),
                None => Err(WidthError::DynamicSizedArray(size.clone())),
            }
        }
        _ => Ok(BigInt::from(bits_to_bytes(t.width()?))),
    }
}

/// Byte offset of a named member within a struct.
pub fn member_offset(t: &Type, member: &Ident) -> Result<BigInt, WidthError> {
    let d = match &**t {
        TypeX::Struct(d) => d,
        // All union members live at offset zero.
        TypeX::Union(_) => return Ok(BigInt::from(0u8)),
        _ => panic!("internal error: member_offset on {}", t),
    };
    let mut offset = BigInt::from(0u8);
    for (name, m) in d.member_names.iter().zip(d.members.iter()) {
        if name == member {
            return Ok(offset);
        }
        offset += type_byte_size(m)?;
    }
    panic!("internal error: member {} not in {}", member, t);
}

/// Bit offset of a named member within a struct.
pub fn member_bit_offset(t: &Type, member: &Ident) -> Result<u64, WidthError> {
    let d = match &**t {
        TypeX::Struct(d) => d,
        TypeX::Union(_) => return Ok(0),
        _ => panic!("internal error: member_bit_offset on {}", t),
    };
    let mut offset = 0u64;
    for (name, m) in d.member_names.iter().zip(d.members.iter()) {
        if name == member {
            return Ok(offset);
        }
        offset += m.width()?;
    }
    panic!("internal error: member {} not in {}", member, t);
}
