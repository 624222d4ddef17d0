//! Canonical shared handles for common types.
//!
//! The hot-path widths (8/16/32/64) and the nullary types are pre-built and
//! handed out without allocation; everything else is interned on first
//! request. The pool is process-wide and safe to read concurrently once the
//! IR is built.

use crate::ast::{Type, TypeX};
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

struct Pool {
    bool_type: Type,
    empty_type: Type,
    code_type: Type,
    uints: [Type; 4],
    ints: [Type; 4],
    other: RwLock<HashMap<TypeX, Type>>,
}

fn canonical_index(width: u32) -> Option<usize> {
    match width {
        8 => Some(0),
        16 => Some(1),
        32 => Some(2),
        64 => Some(3),
        _ => None,
    }
}

impl Pool {
    fn new() -> Pool {
        Pool {
            bool_type: Arc::new(TypeX::Bool),
            empty_type: Arc::new(TypeX::Empty),
            code_type: Arc::new(TypeX::Code),
            uints: [8, 16, 32, 64].map(|w| Arc::new(TypeX::UnsignedBv(w))),
            ints: [8, 16, 32, 64].map(|w| Arc::new(TypeX::SignedBv(w))),
            other: RwLock::new(HashMap::new()),
        }
    }

    fn intern(&self, t: TypeX) -> Type {
        match &t {
            TypeX::Bool => return self.bool_type.clone(),
            TypeX::Empty => return self.empty_type.clone(),
            TypeX::Code => return self.code_type.clone(),
            TypeX::UnsignedBv(w) => {
                if let Some(i) = canonical_index(*w) {
                    return self.uints[i].clone();
                }
            }
            TypeX::SignedBv(w) => {
                if let Some(i) = canonical_index(*w) {
                    return self.ints[i].clone();
                }
            }
            _ => {}
        }
        if let Some(found) = self.other.read().unwrap().get(&t) {
            return found.clone();
        }
        let mut map = self.other.write().unwrap();
        map.entry(t.clone()).or_insert_with(|| Arc::new(t)).clone()
    }
}

lazy_static! {
    static ref POOL: Pool = Pool::new();
}

pub fn bool_type() -> Type {
    POOL.bool_type.clone()
}

pub fn empty_type() -> Type {
    POOL.empty_type.clone()
}

pub fn code_type() -> Type {
    POOL.code_type.clone()
}

pub fn uint_type(width: u32) -> Type {
    match canonical_index(width) {
        Some(i) => POOL.uints[i].clone(),
        None => POOL.intern(TypeX::UnsignedBv(width)),
    }
}

pub fn int_type(width: u32) -> Type {
    match canonical_index(width) {
        Some(i) => POOL.ints[i].clone(),
        None => POOL.intern(TypeX::SignedBv(width)),
    }
}

pub fn intern(t: TypeX) -> Type {
    POOL.intern(t)
}

pub fn pointer_type(subtype: Type) -> Type {
    POOL.intern(TypeX::Pointer(subtype))
}
