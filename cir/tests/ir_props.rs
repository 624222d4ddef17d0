//! Structural laws on the type and expression universes: cloning, interning,
//! total ordering, and hash consistency, checked over generated IR trees.

use cir::ast::{Expr, ExprX, StructDef, Type, TypeX, Typed, WidthError};
use cir::ast_util::*;
use cir::pool;
use cir::symbol_table::{SymbolRecord, SymbolTable};
use num_bigint::BigInt;
use proptest::prelude::*;
use std::cmp::Ordering;
use std::sync::Arc;

fn leaf_type() -> impl Strategy<Value = Type> {
    prop_oneof![
        Just(pool::bool_type()),
        (1u32..=128).prop_map(pool::uint_type),
        (1u32..=128).prop_map(pool::int_type),
        (2u32..=64).prop_map(|w| pool::intern(TypeX::FixedBv { width: w, integer_bits: w / 2 })),
        (0u32..32).prop_map(|n| pool::intern(TypeX::Str(n))),
    ]
}

fn arb_type() -> impl Strategy<Value = Type> {
    leaf_type().prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(pool::pointer_type),
            (inner.clone(), 1u64..16).prop_map(|(t, k)| {
                let size = constant_int(k, pool::uint_type(64));
                pool::intern(TypeX::Array { subtype: t, size: Some(size) })
            }),
            (prop::collection::vec(inner, 1..4), "[a-z]{1,6}").prop_map(|(members, name)| {
                let member_names =
                    (0..members.len()).map(|i| cir::ast::str_ident(&format!("f{}", i))).collect();
                pool::intern(TypeX::Struct(StructDef {
                    name: cir::ast::str_ident(&name),
                    members,
                    member_names,
                }))
            }),
        ]
    })
}

fn leaf_expr() -> impl Strategy<Value = Expr> {
    prop_oneof![
        (any::<i64>(), 1u32..=64).prop_map(|(n, w)| constant_int(n, pool::int_type(w))),
        any::<bool>().prop_map(constant_bool),
        "[a-z]{1,8}".prop_map(|s| symbol_expr(cir::ast::str_ident(&s), pool::uint_type(32))),
        "[a-z]{0,8}".prop_map(|s| constant_string(&s)),
    ]
}

fn arb_expr() -> impl Strategy<Value = Expr> {
    leaf_expr().prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| mk_add(&a, &b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| mk_eq(&a, &b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| {
                Typed::new(pool::bool_type(), ExprX::And(a, b))
            }),
            inner.clone().prop_map(|e| Typed::new(e.typ.clone(), ExprX::Neg(e))),
            inner.clone().prop_map(|e| mk_address_of(&e)),
            (inner.clone(), inner.clone(), inner.clone())
                .prop_map(|(c, t, f)| Typed::new(t.typ.clone(), ExprX::If(c, t, f))),
        ]
    })
}

/// Structure-preserving deep copy: same value, fresh handles throughout.
fn deep_copy(e: &Expr) -> Expr {
    Typed::new(e.typ.clone(), e.x.map_children(&mut |c| deep_copy(c)))
}

proptest! {
    // Clones compare equal and share no mutable state (the handles are
    // immutable; a fresh deep copy is indistinguishable).
    #[test]
    fn clone_is_identity(e in arb_expr()) {
        let shallow = e.clone();
        let fresh = deep_copy(&e);
        prop_assert!(*shallow == *e);
        prop_assert!(*fresh == *e);
        prop_assert!(!Arc::ptr_eq(&fresh, &e));
    }

    // Interning returns a handle equal to the input with an equal hash.
    #[test]
    fn pool_intern_preserves_value(t in arb_type()) {
        let interned = pool::intern((*t).clone());
        prop_assert!(*interned == *t);
        prop_assert_eq!(interned.crc32(), t.crc32());
    }

    // The order is total.
    #[test]
    fn ordering_is_total(e1 in arb_expr(), e2 in arb_expr()) {
        let lt = *e1 < *e2;
        let gt = *e2 < *e1;
        let eq = *e1 == *e2;
        prop_assert_eq!([lt, gt, eq].iter().filter(|b| **b).count(), 1);
        match e1.cmp(&e2) {
            Ordering::Less => prop_assert!(lt),
            Ordering::Greater => prop_assert!(gt),
            Ordering::Equal => prop_assert!(eq),
        }
    }

    // Equal values hash equal, across distinct handles.
    #[test]
    fn crc_consistent_with_equality(e in arb_expr()) {
        let fresh = deep_copy(&e);
        prop_assert_eq!(e.crc32(), fresh.crc32());
    }

    #[test]
    fn type_crc_consistent(t in arb_type()) {
        prop_assert_eq!(t.crc32(), pool::intern((*t).clone()).crc32());
    }

    // Iteration order is insertion order.
    #[test]
    fn symbol_table_preserves_insertion_order(names in prop::collection::vec("[a-z]{1,10}", 1..20)) {
        let mut table = SymbolTable::new();
        let mut inserted = Vec::new();
        for name in names {
            let ident = cir::ast::str_ident(&name);
            if table.insert(SymbolRecord::new(ident.clone(), pool::uint_type(32))).is_ok() {
                inserted.push(ident);
            }
        }
        let order: Vec<_> = table.iter().map(|(n, _)| n.clone()).collect();
        prop_assert_eq!(order, inserted);
    }
}

#[test]
fn width_rules() {
    assert_eq!(pool::bool_type().width().unwrap(), 1);
    assert_eq!(pool::intern(TypeX::Str(7)).width().unwrap(), 56);
    assert_eq!(pool::uint_type(32).width().unwrap(), 32);

    let st = pool::intern(TypeX::Struct(StructDef {
        name: cir::ast::str_ident("s"),
        members: vec![pool::uint_type(8), pool::uint_type(16)],
        member_names: vec![cir::ast::str_ident("a"), cir::ast::str_ident("b")],
    }));
    assert_eq!(st.width().unwrap(), 24);

    let un = pool::intern(TypeX::Union(StructDef {
        name: cir::ast::str_ident("u"),
        members: vec![pool::uint_type(8), pool::uint_type(16)],
        member_names: vec![cir::ast::str_ident("a"), cir::ast::str_ident("b")],
    }));
    assert_eq!(un.width().unwrap(), 16);

    let arr = pool::intern(TypeX::Array {
        subtype: pool::uint_type(8),
        size: Some(constant_int(4u8, pool::uint_type(64))),
    });
    assert_eq!(arr.width().unwrap(), 32);

    assert!(matches!(pool::empty_type().width(), Err(WidthError::SymbolicType)));
    assert!(matches!(pool::code_type().width(), Err(WidthError::SymbolicType)));
    let sym = pool::intern(TypeX::Symbol(cir::ast::str_ident("tag")));
    assert!(matches!(sym.width(), Err(WidthError::SymbolicType)));
}

// Sizing a dynamic array is a typed failure, never a fallback value.
#[test]
fn dynamic_array_size_is_typed_failure() {
    let n = symbol_expr(cir::ast::str_ident("n"), pool::uint_type(64));
    let vla = pool::intern(TypeX::Array { subtype: pool::uint_type(8), size: Some(n) });
    assert!(matches!(vla.width(), Err(WidthError::DynamicSizedArray(_))));
    assert!(matches!(
        cir::layout::type_byte_size(&vla),
        Err(WidthError::DynamicSizedArray(_))
    ));

    let unbounded = pool::intern(TypeX::Array { subtype: pool::uint_type(8), size: None });
    assert!(matches!(unbounded.width(), Err(WidthError::DynamicSizedArray(None))));
}

#[test]
fn string_constant_expansion() {
    let s = constant_string("hi");
    let arr = string_constant_to_array(&s);
    match &arr.x {
        ExprX::ConstantArray(elems) => {
            assert_eq!(elems.len(), 3);
            assert_eq!(as_constant_u64(&elems[0]), Some(b'h' as u64));
            assert_eq!(as_constant_u64(&elems[2]), Some(0));
        }
        _ => panic!("expected constant_array"),
    }
    match &*arr.typ {
        TypeX::Array { subtype, .. } => assert_eq!(**subtype, TypeX::UnsignedBv(8)),
        _ => panic!("expected array type"),
    }
}

#[test]
fn symbol_table_duplicate_and_base_names() {
    let mut table = SymbolTable::new();
    let qualified = cir::ast::str_ident("c::main::x");
    let base = cir::ast::str_ident("x");
    let mut record = SymbolRecord::new(qualified.clone(), pool::uint_type(32));
    record.base_name = base.clone();
    table.insert(record).unwrap();

    // A second insert under the same name hands the record back.
    let dup = SymbolRecord::new(qualified.clone(), pool::uint_type(8));
    let rejected = table.insert(dup).unwrap_err();
    assert_eq!(rejected.name, qualified);
    assert_eq!(table.len(), 1);
    assert_eq!(*table.lookup(&qualified).unwrap().typ, TypeX::UnsignedBv(32));

    // Unqualified lookup resolves through the base-name index.
    assert_eq!(table.lookup_base_name(&base), &[qualified.clone()]);
    table.remove(&qualified).unwrap();
    assert!(table.lookup_base_name(&base).is_empty());
}

#[test]
fn symbol_full_names_by_level() {
    use cir::ast::{RenameLevel, SymbolData};
    let mut sym = SymbolData::level0(cir::ast::str_ident("x"));
    assert_eq!(sym.full_name(), "x");

    sym.rlevel = RenameLevel::Level1;
    sym.level1_num = 2;
    sym.thread_num = 1;
    assert_eq!(sym.full_name(), "x@2!1");

    sym.rlevel = RenameLevel::Level2;
    sym.level2_num = 5;
    sym.node_num = 7;
    assert_eq!(sym.full_name(), "x@2!1&7?5");

    sym.rlevel = RenameLevel::Level2Global;
    assert_eq!(sym.full_name(), "x&7?5");
}

#[test]
fn fixed_point_literals() {
    let t = pool::intern(TypeX::FixedBv { width: 8, integer_bits: 4 });
    let bits = |e: &Expr| match &e.x {
        ExprX::ConstantFixedBv(n) => n.clone(),
        _ => panic!("expected fixedbv constant"),
    };
    assert_eq!(bits(&fixedbv_from_string("2.5", t.clone())), BigInt::from(40));
    assert_eq!(bits(&fixedbv_from_string("3/8", t.clone())), BigInt::from(6));
    assert_eq!(bits(&fixedbv_from_string("-1.25", t.clone())), BigInt::from(-20));
    assert_eq!(bits(&fixedbv_from_string("3", t)), BigInt::from(48));
}

#[test]
fn member_offsets() {
    let st = pool::intern(TypeX::Struct(StructDef {
        name: cir::ast::str_ident("s"),
        members: vec![pool::uint_type(8), pool::uint_type(16), pool::uint_type(32)],
        member_names: vec![
            cir::ast::str_ident("a"),
            cir::ast::str_ident("b"),
            cir::ast::str_ident("c"),
        ],
    }));
    assert_eq!(cir::layout::member_offset(&st, &cir::ast::str_ident("a")).unwrap(), BigInt::from(0));
    assert_eq!(cir::layout::member_offset(&st, &cir::ast::str_ident("b")).unwrap(), BigInt::from(1));
    assert_eq!(cir::layout::member_offset(&st, &cir::ast::str_ident("c")).unwrap(), BigInt::from(3));
}
