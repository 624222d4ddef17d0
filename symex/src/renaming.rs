//! Two-level SSA renaming.
//!
//! Level 1 assigns per-thread version numbers to symbol declarations at
//! scope entry. Level 2 assigns a fresh value number on every assignment and
//! optionally substitutes a propagated constant. Both walks are
//! copy-on-write over the shared expression handles.

use cir::ast::{Expr, ExprX, Ident, RenameLevel, SymbolData, Typed};
use std::collections::HashMap;
use std::io::Write;
use tracing::trace;

/// Names that are never renamed: the null and invalid objects, and
/// nondeterministic inputs (already unique per occurrence).
fn is_reserved(name: &Ident) -> bool {
    name.as_str() == "NULL" || name.as_str() == "INVALID" || name.starts_with("nondet$")
}

/// Per-thread level-1 renaming state.
#[derive(Debug, Clone)]
pub struct Level1 {
    pub thread_id: u32,
    current_names: HashMap<Ident, u32>,
}

impl Level1 {
    pub fn new(thread_id: u32) -> Level1 {
        Level1 { thread_id, current_names: HashMap::new() }
    }

    /// Record a declaration: `name` now carries level-1 number `num` in this
    /// thread (called on function entry and scope events).
    pub fn declare(&mut self, name: Ident, num: u32) {
        self.current_names.insert(name, num);
    }

    pub fn current_number(&self, name: &Ident) -> u32 {
        self.current_names.get(name).copied().unwrap_or(0)
    }

    /// Rewrite every level-0 symbol to its level-1 version. Declared names
    /// get the stored count and this thread's id; undeclared names are
    /// file-scope and become `level1_global`. `address_of` recurses only
    /// into the addressed object.
    pub fn rename(&self, expr: &Expr) -> Expr {
        match &expr.x {
            ExprX::Symbol(sym) => {
                if sym.rlevel != RenameLevel::Level0 {
                    return expr.clone();
                }
                match self.current_names.get(&sym.name) {
                    Some(count) => Typed::new(
                        expr.typ.clone(),
                        ExprX::Symbol(SymbolData {
                            name: sym.name.clone(),
                            rlevel: RenameLevel::Level1,
                            level1_num: *count,
                            level2_num: 0,
                            thread_num: self.thread_id,
                            node_num: 0,
                        }),
                    ),
                    None => Typed::new(
                        expr.typ.clone(),
                        ExprX::Symbol(SymbolData {
                            rlevel: RenameLevel::Level1Global,
                            ..sym.clone()
                        }),
                    ),
                }
            }
            ExprX::AddressOf(obj) => {
                Typed::new(expr.typ.clone(), ExprX::AddressOf(self.rename(obj)))
            }
            _ => Typed::new(expr.typ.clone(), expr.x.map_children(&mut |c| self.rename(c))),
        }
    }

    /// Set the symbol's level to `level1` (declared) or `level1_global`
    /// without touching any counter state.
    pub fn get_ident_name(&self, expr: &Expr) -> Expr {
        let sym = expect_symbol(expr);
        let data = match self.current_names.get(&sym.name) {
            Some(count) => SymbolData {
                name: sym.name.clone(),
                rlevel: RenameLevel::Level1,
                level1_num: *count,
                level2_num: 0,
                thread_num: self.thread_id,
                node_num: 0,
            },
            None => SymbolData { rlevel: RenameLevel::Level1Global, ..sym.clone() },
        };
        Typed::new(expr.typ.clone(), ExprX::Symbol(data))
    }

    pub fn dump(&self, out: &mut dyn Write) {
        for (name, count) in &self.current_names {
            writeln!(out, "{} --> thread {} count {}", name, self.thread_id, count).unwrap();
        }
    }
}

/// Key identifying one logical variable instance at level 2: the same base
/// name in different scopes or threads gets distinct entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameRecord {
    pub base_name: Ident,
    pub l1_num: u32,
    pub t_num: u32,
    pub level: RenameLevel,
}

impl NameRecord {
    pub fn of(sym: &SymbolData) -> NameRecord {
        NameRecord {
            base_name: sym.name.clone(),
            l1_num: sym.level1_num,
            t_num: sym.thread_num,
            level: sym.rlevel,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct L2Entry {
    pub count: u32,
    pub node_id: u32,
    /// Propagated constant: when set, level-2 rename substitutes it for the
    /// symbol. A non-literal stored here must already be fully renamed.
    pub constant: Option<Expr>,
}

/// Value-numbering level-2 renaming state.
#[derive(Debug, Clone, Default)]
pub struct Level2 {
    current_names: HashMap<NameRecord, L2Entry>,
}

fn target_level(from: RenameLevel) -> RenameLevel {
    match from {
        RenameLevel::Level0 | RenameLevel::Level1Global => RenameLevel::Level2Global,
        _ => RenameLevel::Level2,
    }
}

impl Level2 {
    pub fn new() -> Level2 {
        Level2::default()
    }

    pub fn current_number(&self, expr: &Expr) -> u32 {
        let sym = expect_symbol(expr);
        self.current_names.get(&NameRecord::of(sym)).map(|e| e.count).unwrap_or(0)
    }

    /// Rewrite level-0/level-1 symbols to their current level-2 version, or
    /// to the stored constant where propagation applies. `address_of` halts
    /// recursion: addresses are level-1-final.
    pub fn rename(&self, expr: &Expr) -> Expr {
        match &expr.x {
            ExprX::Symbol(sym) => {
                if sym.rlevel == RenameLevel::Level2 || sym.rlevel == RenameLevel::Level2Global {
                    return expr.clone();
                }
                if is_reserved(&sym.name) {
                    return expr.clone();
                }
                let lev = target_level(sym.rlevel);
                match self.current_names.get(&NameRecord::of(sym)) {
                    Some(entry) => match &entry.constant {
                        Some(constant) => {
                            trace!(name = %sym.name, "constant propagation");
                            constant.clone()
                        }
                        None => Typed::new(
                            expr.typ.clone(),
                            ExprX::Symbol(SymbolData {
                                name: sym.name.clone(),
                                rlevel: lev,
                                level1_num: sym.level1_num,
                                level2_num: entry.count,
                                thread_num: sym.thread_num,
                                node_num: entry.node_id,
                            }),
                        ),
                    },
                    None => Typed::new(
                        expr.typ.clone(),
                        ExprX::Symbol(SymbolData {
                            name: sym.name.clone(),
                            rlevel: lev,
                            level1_num: sym.level1_num,
                            level2_num: 0,
                            thread_num: sym.thread_num,
                            node_num: 0,
                        }),
                    ),
                }
            }
            ExprX::AddressOf(_) => expr.clone(),
            _ => Typed::new(expr.typ.clone(), expr.x.map_children(&mut |c| self.rename(c))),
        }
    }

    /// Set the symbol's level-2 fields from the current entry without
    /// advancing any counter.
    pub fn get_ident_name(&self, expr: &Expr) -> Expr {
        let sym = expect_symbol(expr);
        let lev = target_level(sym.rlevel);
        let (count, node_id) = match self.current_names.get(&NameRecord::of(sym)) {
            Some(entry) => (entry.count, entry.node_id),
            None => (0, 0),
        };
        Typed::new(
            expr.typ.clone(),
            ExprX::Symbol(SymbolData {
                name: sym.name.clone(),
                rlevel: lev,
                level1_num: sym.level1_num,
                level2_num: count,
                thread_num: sym.thread_num,
                node_num: node_id,
            }),
        )
    }

    /// Record an assignment to `lhs` (a level-1 symbol): advance the value
    /// number, store the propagated constant (or clear it), and return the
    /// freshly renamed left-hand side carrying the new `(count, node_id)`.
    pub fn make_assignment(&mut self, lhs: &Expr, const_value: Option<Expr>) -> Expr {
        let sym = expect_symbol(lhs);
        assert!(
            sym.rlevel == RenameLevel::Level1 || sym.rlevel == RenameLevel::Level1Global,
            "internal error: make_assignment on {:?} symbol {}",
            sym.rlevel,
            sym.name
        );
        let entry = self.current_names.entry(NameRecord::of(sym)).or_default();
        entry.count += 1;
        entry.constant = const_value;
        trace!(name = %sym.name, count = entry.count, "make_assignment");
        Typed::new(
            lhs.typ.clone(),
            ExprX::Symbol(SymbolData {
                name: sym.name.clone(),
                rlevel: target_level(sym.rlevel),
                level1_num: sym.level1_num,
                level2_num: entry.count,
                thread_num: sym.thread_num,
                node_num: entry.node_id,
            }),
        )
    }

    /// Force the value number at a control-flow join. The new count must not
    /// run backwards.
    pub fn renumber(&mut self, lhs: &Expr, count: u32, node_id: u32) {
        let sym = expect_symbol(lhs);
        assert!(
            sym.rlevel == RenameLevel::Level1 || sym.rlevel == RenameLevel::Level1Global,
            "internal error: renumber on {:?} symbol {}",
            sym.rlevel,
            sym.name
        );
        let entry = self.current_names.entry(NameRecord::of(sym)).or_default();
        assert!(
            entry.count <= count,
            "internal error: renumber of {} runs backwards ({} -> {})",
            sym.name,
            entry.count,
            count
        );
        entry.count = count;
        entry.node_id = node_id;
    }

    pub fn dump(&self, out: &mut dyn Write) {
        for (record, entry) in &self.current_names {
            write!(out, "{}", record.base_name).unwrap();
            if record.level == RenameLevel::Level1 {
                write!(out, "@{}!{}", record.l1_num, record.t_num).unwrap();
            }
            write!(out, " --> ").unwrap();
            match &entry.constant {
                Some(c) => writeln!(out, "{}", c).unwrap(),
                None => writeln!(out, "node {} num {}", entry.node_id, entry.count).unwrap(),
            }
        }
    }
}

fn expect_symbol(expr: &Expr) -> &SymbolData {
    match &expr.x {
        ExprX::Symbol(sym) => sym,
        _ => panic!("internal error: expected symbol, got {}", expr.x.kind_name()),
    }
}

/// Strip renaming information down to `target`. `level1` and
/// `level1_global` are treated as equivalent targets; stripping to `level0`
/// also clears the thread and level-1 numbers. Symbols already below the
/// target are left untouched; a level-2 target is not a valid strip
/// direction.
pub fn get_original_name(expr: &Expr, target: RenameLevel) -> Expr {
    let mut walked = expr.x.map_children(&mut |c| get_original_name(c, target));
    if let ExprX::Symbol(sym) = &mut walked {
        let mut target = target;
        if target == RenameLevel::Level1 && sym.rlevel == RenameLevel::Level2Global {
            target = RenameLevel::Level1Global;
        }
        // Level1 and level1_global are equivalent targets; level 0 cannot be
        // stripped any further.
        let done = (target == RenameLevel::Level1 && sym.rlevel == RenameLevel::Level1Global)
            || sym.rlevel == RenameLevel::Level0;
        if !done {
            match target {
                RenameLevel::Level1 | RenameLevel::Level1Global => {
                    sym.rlevel = target;
                    sym.level2_num = 0;
                    sym.node_num = 0;
                }
                RenameLevel::Level0 => {
                    *sym = SymbolData::level0(sym.name.clone());
                }
                RenameLevel::Level2 | RenameLevel::Level2Global => {
                    panic!("internal error: cannot strip renaming up to {:?}", target)
                }
            }
        }
    }
    Typed::new(expr.typ.clone(), walked)
}
