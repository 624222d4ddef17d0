use crate::equation::{Equation, StepKind};
use crate::renaming::{get_original_name, Level1, Level2};
use cir::ast::{Expr, ExprX, RenameLevel, SymbolData};
use cir::ast_util::*;
use cir::location::Location;
use cir::pool;
use proptest::prelude::*;

fn sym(name: &str) -> Expr {
    symbol_expr(cir::ast::str_ident(name), pool::uint_type(32))
}

fn sym_data(e: &Expr) -> &SymbolData {
    match &e.x {
        ExprX::Symbol(s) => s,
        _ => panic!("not a symbol"),
    }
}

fn assert_no_level0(e: &Expr, under_address_of: bool) {
    match &e.x {
        ExprX::Symbol(s) => {
            if !under_address_of {
                assert_ne!(s.rlevel, RenameLevel::Level0, "level0 symbol {} survived", s.name);
            }
        }
        ExprX::AddressOf(_) => {}
        _ => {
            for c in e.x.children() {
                assert_no_level0(c, under_address_of);
            }
        }
    }
}

// After a level-1 rename, no level-0 symbol remains outside address_of.
#[test]
fn l1_rename_eliminates_level0() {
    let mut l1 = Level1::new(3);
    l1.declare(cir::ast::str_ident("x"), 2);

    let e = mk_add(&sym("x"), &mk_mul(&sym("g"), &sym("x")));
    let renamed = l1.rename(&e);
    assert_no_level0(&renamed, false);

    // Declared name gets the stored count and the thread id.
    match &renamed.x {
        ExprX::Add(a, _) => {
            let s = sym_data(a);
            assert_eq!(s.rlevel, RenameLevel::Level1);
            assert_eq!(s.level1_num, 2);
            assert_eq!(s.thread_num, 3);
        }
        _ => panic!("expected add"),
    }

    // Undeclared name becomes level1_global.
    match &renamed.x {
        ExprX::Add(_, b) => match &b.x {
            ExprX::Mul(g, _) => assert_eq!(sym_data(g).rlevel, RenameLevel::Level1Global),
            _ => panic!("expected mul"),
        },
        _ => unreachable!(),
    }
}

#[test]
fn l1_rename_skips_through_address_of_pointee() {
    let l1 = Level1::new(0);
    // address_of recurses into its operand, but an index expression under it
    // is renamed as a whole (the operand itself is walked).
    let e = mk_address_of(&sym("p"));
    let renamed = l1.rename(&e);
    match &renamed.x {
        ExprX::AddressOf(inner) => {
            assert_eq!(sym_data(inner).rlevel, RenameLevel::Level1Global);
        }
        _ => panic!("expected address_of"),
    }
}

#[test]
fn l1_current_number_defaults_to_zero() {
    let mut l1 = Level1::new(0);
    assert_eq!(l1.current_number(&cir::ast::str_ident("x")), 0);
    l1.declare(cir::ast::str_ident("x"), 5);
    assert_eq!(l1.current_number(&cir::ast::str_ident("x")), 5);
}

// Assignment versions advance monotonically.
#[test]
fn l2_versions_advance() {
    let l1 = Level1::new(0);
    let mut l2 = Level2::new();
    let x1 = l1.rename(&sym("x"));

    let mut last = 0;
    for _ in 0..5 {
        let versioned = l2.make_assignment(&x1, None);
        let s = sym_data(&versioned);
        assert!(s.level2_num > last);
        last = s.level2_num;

        let read = l2.rename(&x1);
        assert_eq!(sym_data(&read).level2_num, last);
    }
}

// Constant propagation through level 2.
#[test]
fn l2_constant_propagation() {
    let l1 = Level1::new(0);
    let mut l2 = Level2::new();
    let x = l1.rename(&sym("x"));
    let y = l1.rename(&sym("y"));

    // assign(x, 0) with constant 0
    let zero = constant_int(0u8, pool::uint_type(32));
    l2.make_assignment(&x, Some(zero.clone()));

    // Renaming the rhs of assign(y, x) substitutes the literal.
    assert_eq!(*l2.rename(&x), *zero);

    // assign(y, x) with no constant: y reads back as a symbol.
    l2.make_assignment(&y, None);
    match &l2.rename(&y).x {
        ExprX::Symbol(s) => assert_eq!(s.level2_num, 1),
        _ => panic!("expected symbol"),
    }

    // A further assignment without a constant clears the propagation.
    l2.make_assignment(&x, None);
    match &l2.rename(&x).x {
        ExprX::Symbol(s) => assert_eq!(s.level2_num, 2),
        _ => panic!("expected symbol"),
    }
}

#[test]
fn l2_reserved_names_pass_through() {
    let mut l2 = Level2::new();
    for name in ["NULL", "INVALID", "nondet$7"] {
        let e = sym(name);
        assert_eq!(*l2.rename(&e), *e);
        // Even after someone forces an entry for an unrelated name.
        l2.make_assignment(&Level1::new(0).rename(&sym("x")), None);
        assert_eq!(*l2.rename(&e), *e);
    }
}

#[test]
fn l2_renumber_forces_count() {
    let l1 = Level1::new(0);
    let mut l2 = Level2::new();
    let x = l1.rename(&sym("x"));

    l2.make_assignment(&x, None);
    l2.renumber(&x, 7, 42);
    let read = l2.rename(&x);
    let s = sym_data(&read);
    assert_eq!(s.level2_num, 7);
    assert_eq!(s.node_num, 42);

    // The next assignment continues from the forced count.
    let next = l2.make_assignment(&x, None);
    assert_eq!(sym_data(&next).level2_num, 8);
    assert_eq!(sym_data(&next).node_num, 42);
}

#[test]
#[should_panic(expected = "runs backwards")]
fn l2_renumber_cannot_run_backwards() {
    let l1 = Level1::new(0);
    let mut l2 = Level2::new();
    let x = l1.rename(&sym("x"));
    l2.renumber(&x, 5, 0);
    l2.renumber(&x, 3, 0);
}

// Stripping rename information recovers the original expression.
#[test]
fn get_original_name_round_trips() {
    let mut l1 = Level1::new(2);
    l1.declare(cir::ast::str_ident("x"), 1);
    let mut l2 = Level2::new();

    let e = mk_add(&sym("x"), &sym("g"));
    let r1 = l1.rename(&e);
    let r2 = l2.rename(&r1);

    assert_eq!(*get_original_name(&r1, RenameLevel::Level0), *e);
    assert_eq!(*get_original_name(&r2, RenameLevel::Level0), *e);

    // Stripping level2 down to level1 preserves the level-1 numbering.
    let back = get_original_name(&r2, RenameLevel::Level1);
    assert_eq!(*back, *r1);
}

#[test]
fn get_original_name_level0_is_noop() {
    let e = sym("x");
    assert_eq!(*get_original_name(&e, RenameLevel::Level1), *e);
}

fn renamed(name: &str, l2: u32) -> Expr {
    symbol_data_expr(
        SymbolData {
            name: cir::ast::str_ident(name),
            rlevel: RenameLevel::Level2,
            level1_num: 1,
            level2_num: l2,
            thread_num: 0,
            node_num: 0,
        },
        pool::uint_type(32),
    )
}

fn guard_true() -> Expr {
    constant_bool(true)
}

#[test]
fn duplicate_assignment_detection() {
    let mut eq = Equation::new();
    let x1 = renamed("x", 1);
    let v = constant_int(1u8, pool::uint_type(32));
    eq.assignment(guard_true(), x1.clone(), x1.clone(), v.clone(), Location::nil(), String::new());
    eq.assignment(guard_true(), x1.clone(), x1.clone(), v, Location::nil(), String::new());
    assert_eq!(eq.check_for_duplicate_assigns().len(), 1);
}

// Slicing keeps everything an assert transitively needs, and the
// simple slice never removes more than the standard slice.
#[test]
fn slicing() {
    let build = || {
        let mut eq = Equation::new();
        let v = constant_int(1u8, pool::uint_type(32));
        // a1 feeds the assert through a2; dead does not.
        let a1 = renamed("a", 1);
        let a2 = renamed("a", 2);
        let dead = renamed("dead", 1);
        eq.assignment(guard_true(), a1.clone(), a1.clone(), v.clone(), Location::nil(), String::new());
        eq.assignment(
            guard_true(),
            a2.clone(),
            a2.clone(),
            mk_add(&a1, &v),
            Location::nil(),
            String::new(),
        );
        eq.assignment(guard_true(), dead.clone(), dead.clone(), v.clone(), Location::nil(), String::new());
        eq.assume(guard_true(), mk_lessthan(&dead, &v), Location::nil());
        eq.assertion(
            guard_true(),
            mk_eq(&a2, &v),
            Location::nil(),
            "a2 is one".to_string(),
            vec![],
        );
        eq
    };

    let mut eq = build();
    let sliced = eq.slice(true);
    // The dead assume goes first on the backward pass, then the assignment
    // feeding only it.
    assert_eq!(sliced, 2);
    assert!(eq.steps()[0].is_assignment() && !eq.steps()[0].ignore);
    assert!(!eq.steps()[1].ignore);
    assert!(eq.steps()[2].ignore);
    assert!(eq.steps()[3].ignore);
    assert!(eq.steps()[4].is_assert() && !eq.steps()[4].ignore);

    // Without assume slicing, the assume keeps its assignment alive.
    let mut eq = build();
    assert_eq!(eq.slice(false), 0);

    // simple_slice drops nothing here: every lhs is read somewhere.
    let mut eq = build();
    let simple = eq.simple_slice();
    assert_eq!(simple, 0);
}

#[test]
fn simple_slice_drops_unread_assignment() {
    let mut eq = Equation::new();
    let v = constant_int(1u8, pool::uint_type(32));
    let dead = renamed("dead", 1);
    let live = renamed("live", 1);
    eq.assignment(guard_true(), dead.clone(), dead.clone(), v.clone(), Location::nil(), String::new());
    eq.assignment(guard_true(), live.clone(), live.clone(), v.clone(), Location::nil(), String::new());
    eq.assertion(guard_true(), mk_eq(&live, &v), Location::nil(), String::new(), vec![]);
    assert_eq!(eq.simple_slice(), 1);
    assert!(eq.steps()[0].ignore);
    assert!(!eq.steps()[1].ignore);
}

#[test]
fn get_ident_name_leaves_counters_alone() {
    let mut l1 = Level1::new(4);
    l1.declare(cir::ast::str_ident("x"), 9);
    let x = sym("x");
    let named = l1.get_ident_name(&x);
    let s = sym_data(&named);
    assert_eq!(s.rlevel, RenameLevel::Level1);
    assert_eq!(s.level1_num, 9);
    assert_eq!(s.thread_num, 4);
    // The counter itself is untouched.
    assert_eq!(l1.current_number(&cir::ast::str_ident("x")), 9);

    let g = l1.get_ident_name(&sym("g"));
    assert_eq!(sym_data(&g).rlevel, RenameLevel::Level1Global);
}

#[test]
fn renaming_state_dumps() {
    let mut l1 = Level1::new(0);
    l1.declare(cir::ast::str_ident("x"), 1);
    let mut out = Vec::new();
    l1.dump(&mut out);
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("x --> thread 0 count 1"));

    let mut l2 = Level2::new();
    l2.make_assignment(&l1.rename(&sym("x")), Some(constant_int(3u8, pool::uint_type(32))));
    let mut out = Vec::new();
    l2.dump(&mut out);
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("x@1!0 --> 3"), "{}", text);
}

#[test]
fn equation_dump_lists_live_steps() {
    let mut eq = Equation::new();
    let x = renamed("x", 1);
    let v = constant_int(0u8, pool::uint_type(32));
    eq.assignment(guard_true(), x.clone(), x.clone(), v.clone(), Location::nil(), String::new());
    eq.assertion(guard_true(), mk_eq(&x, &v), Location::nil(), "claim".to_string(), vec![]);
    eq.steps_mut()[0].ignore = true;
    let mut out = Vec::new();
    eq.dump(&mut out);
    let text = String::from_utf8(out).unwrap();
    assert!(!text.contains("ASSIGNMENT"));
    assert!(text.contains("ASSERT"));
    assert!(text.contains("// claim"));
}

proptest! {
    // Any interleaving of assignments and join renumbers keeps the version
    // a symbol reads back strictly non-decreasing.
    #[test]
    fn l2_versions_never_run_backwards(ops in prop::collection::vec(0u32..4, 1..40)) {
        let l1 = Level1::new(0);
        let mut l2 = Level2::new();
        let x = l1.rename(&sym("x"));
        let mut last = 0u32;
        for op in ops {
            match op {
                0 | 1 => {
                    l2.make_assignment(&x, None);
                }
                2 => {
                    let current = l2.current_number(&x);
                    l2.renumber(&x, current + op, 9);
                }
                _ => {}
            }
            let read = sym_data(&l2.rename(&x)).level2_num;
            prop_assert!(read >= last);
            last = read;
        }
    }

    // Stripping to level 0 inverts renaming for arbitrary add/mul chains.
    #[test]
    fn rename_strip_round_trip(names in prop::collection::vec("[a-z]{1,6}", 1..8)) {
        let mut l1 = Level1::new(1);
        l1.declare(cir::ast::str_ident(&names[0]), 3);
        let mut l2 = Level2::new();
        let mut e = sym(&names[0]);
        for name in &names[1..] {
            e = mk_add(&e, &sym(name));
        }
        let r = l2.rename(&l1.rename(&e));
        prop_assert_eq!(&*get_original_name(&r, RenameLevel::Level0), &*e);
    }
}

#[test]
fn equation_appends_in_order() {
    let mut eq = Equation::new();
    let x = renamed("x", 1);
    let v = constant_int(0u8, pool::uint_type(32));
    eq.assignment(guard_true(), x.clone(), x.clone(), v.clone(), Location::nil(), String::new());
    eq.assume(guard_true(), mk_eq(&x, &v), Location::nil());
    eq.assertion(guard_true(), mk_eq(&x, &v), Location::nil(), String::new(), vec![]);
    eq.renumber(guard_true(), x.clone(), v, Location::nil());
    let kinds: Vec<_> = eq.steps().iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![StepKind::Assignment, StepKind::Assume, StepKind::Assert, StepKind::Renumber]
    );
}
