//! The SSA equation: the ordered list of steps produced by symbolic
//! execution and handed to the SMT layer.

use cir::ast::{Expr, ExprX, Ident, SymbolData};
use cir::ast_util::mk_eq;
use cir::location::Location;
use std::any::Any;
use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Assignment,
    Assume,
    Assert,
    Renumber,
}

/// One record of the equation. `cond_ast` is filled in by the SMT layer
/// after conversion; it is opaque here.
#[derive(Clone)]
pub struct Step {
    pub kind: StepKind,
    pub guard: Expr,
    pub cond: Expr,
    pub lhs: Option<Expr>,
    pub original_lhs: Option<Expr>,
    pub rhs: Option<Expr>,
    pub source: Location,
    pub loop_number: u64,
    pub ignore: bool,
    pub comment: String,
    pub stack_trace: Vec<Ident>,
    pub cond_ast: Option<Arc<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("kind", &self.kind)
            .field("guard", &self.guard)
            .field("cond", &self.cond)
            .field("lhs", &self.lhs)
            .field("source", &self.source)
            .field("ignore", &self.ignore)
            .field("has_cond_ast", &self.cond_ast.is_some())
            .finish()
    }
}

impl Step {
    pub fn is_assignment(&self) -> bool {
        self.kind == StepKind::Assignment
    }

    pub fn is_assume(&self) -> bool {
        self.kind == StepKind::Assume
    }

    pub fn is_assert(&self) -> bool {
        self.kind == StepKind::Assert
    }
}

/// Identity of one fully-renamed SSA variable, used by the duplicate check
/// and the slicers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SsaName {
    name: Ident,
    l1: u32,
    l2: u32,
    thread: u32,
}

impl SsaName {
    fn of(sym: &SymbolData) -> SsaName {
        SsaName {
            name: sym.name.clone(),
            l1: sym.level1_num,
            l2: sym.level2_num,
            thread: sym.thread_num,
        }
    }
}

fn collect_symbols(expr: &Expr, out: &mut HashSet<SsaName>) {
    if let ExprX::Symbol(sym) = &expr.x {
        out.insert(SsaName::of(sym));
    }
    for c in expr.x.children() {
        collect_symbols(c, out);
    }
}

#[derive(Debug, Default)]
pub struct Equation {
    steps: Vec<Step>,
}

impl Equation {
    pub fn new() -> Equation {
        Equation::default()
    }

    pub fn assignment(
        &mut self,
        guard: Expr,
        lhs: Expr,
        original_lhs: Expr,
        rhs: Expr,
        source: Location,
        comment: String,
    ) {
        let cond = mk_eq(&lhs, &rhs);
        self.steps.push(Step {
            kind: StepKind::Assignment,
            guard,
            cond,
            lhs: Some(lhs),
            original_lhs: Some(original_lhs),
            rhs: Some(rhs),
            source,
            loop_number: 0,
            ignore: false,
            comment,
            stack_trace: Vec::new(),
            cond_ast: None,
        });
    }

    pub fn assume(&mut self, guard: Expr, cond: Expr, source: Location) {
        self.steps.push(Step {
            kind: StepKind::Assume,
            guard,
            cond,
            lhs: None,
            original_lhs: None,
            rhs: None,
            source,
            loop_number: 0,
            ignore: false,
            comment: String::new(),
            stack_trace: Vec::new(),
            cond_ast: None,
        });
    }

    pub fn assertion(
        &mut self,
        guard: Expr,
        cond: Expr,
        source: Location,
        comment: String,
        stack_trace: Vec<Ident>,
    ) {
        self.steps.push(Step {
            kind: StepKind::Assert,
            guard,
            cond,
            lhs: None,
            original_lhs: None,
            rhs: None,
            source,
            loop_number: 0,
            ignore: false,
            comment,
            stack_trace,
            cond_ast: None,
        });
    }

    /// Record a forced value-number change at a control-flow join.
    pub fn renumber(&mut self, guard: Expr, lhs: Expr, rhs: Expr, source: Location) {
        let cond = cir::ast_util::constant_bool(true);
        self.steps.push(Step {
            kind: StepKind::Renumber,
            guard,
            cond,
            lhs: Some(lhs),
            original_lhs: None,
            rhs: Some(rhs),
            source,
            loop_number: 0,
            ignore: false,
            comment: String::new(),
            stack_trace: Vec::new(),
            cond_ast: None,
        });
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn steps_mut(&mut self) -> &mut [Step] {
        &mut self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Flag any left-hand side assigned twice at the same SSA version,
    /// which indicates a renaming bug upstream. Returns the offending names.
    pub fn check_for_duplicate_assigns(&self) -> Vec<Ident> {
        let mut seen: HashSet<SsaName> = HashSet::new();
        let mut duplicates = Vec::new();
        for step in &self.steps {
            if step.kind != StepKind::Assignment {
                continue;
            }
            if let Some(lhs) = &step.lhs {
                if let ExprX::Symbol(sym) = &lhs.x {
                    if !seen.insert(SsaName::of(sym)) {
                        warn!(name = %sym.name, "duplicate SSA assignment");
                        duplicates.push(sym.name.clone());
                    }
                }
            }
        }
        duplicates
    }

    /// Program slicing: a deterministic backward pass that drops assignments
    /// whose left-hand side is never transitively needed by an assert (or a
    /// kept assume). With `slice_assumes`, assumes touching no needed symbol
    /// are dropped as well. Dropped steps are marked `ignore`, preserving
    /// the step order for trace reconstruction. Returns the number of
    /// sliced steps.
    pub fn slice(&mut self, slice_assumes: bool) -> usize {
        let mut needed: HashSet<SsaName> = HashSet::new();
        let mut sliced = 0;
        for step in self.steps.iter_mut().rev() {
            match step.kind {
                StepKind::Assert => {
                    collect_symbols(&step.cond, &mut needed);
                    collect_symbols(&step.guard, &mut needed);
                }
                StepKind::Assume => {
                    if slice_assumes {
                        let mut used = HashSet::new();
                        collect_symbols(&step.cond, &mut used);
                        if used.is_disjoint(&needed) {
                            step.ignore = true;
                            sliced += 1;
                            continue;
                        }
                    }
                    collect_symbols(&step.cond, &mut needed);
                    collect_symbols(&step.guard, &mut needed);
                }
                StepKind::Assignment => {
                    let lhs_needed = match step.lhs.as_ref().map(|l| &l.x) {
                        Some(ExprX::Symbol(sym)) => needed.contains(&SsaName::of(sym)),
                        // Aggregate left-hand sides are kept conservatively.
                        _ => true,
                    };
                    if lhs_needed {
                        if let Some(rhs) = &step.rhs {
                            collect_symbols(rhs, &mut needed);
                        }
                        collect_symbols(&step.guard, &mut needed);
                    } else {
                        step.ignore = true;
                        sliced += 1;
                    }
                }
                StepKind::Renumber => {}
            }
        }
        debug!(sliced, total = self.steps.len(), "sliced equation");
        sliced
    }

    /// The cheap slice: drop only assignments whose left-hand side is never
    /// read anywhere else in the equation.
    pub fn simple_slice(&mut self) -> usize {
        let mut read: HashSet<SsaName> = HashSet::new();
        for step in &self.steps {
            collect_symbols(&step.guard, &mut read);
            match step.kind {
                StepKind::Assignment => {
                    if let Some(rhs) = &step.rhs {
                        collect_symbols(rhs, &mut read);
                    }
                }
                _ => collect_symbols(&step.cond, &mut read),
            }
        }
        let mut sliced = 0;
        for step in self.steps.iter_mut() {
            if step.kind != StepKind::Assignment {
                continue;
            }
            if let Some(ExprX::Symbol(sym)) = step.lhs.as_ref().map(|l| &l.x) {
                if !read.contains(&SsaName::of(sym)) {
                    step.ignore = true;
                    sliced += 1;
                }
            }
        }
        sliced
    }

    /// Render every live step, in order (the verification-condition view).
    pub fn dump(&self, out: &mut dyn Write) {
        for (i, step) in self.steps.iter().enumerate() {
            if step.ignore {
                continue;
            }
            let kind = match step.kind {
                StepKind::Assignment => "ASSIGNMENT",
                StepKind::Assume => "ASSUME",
                StepKind::Assert => "ASSERT",
                StepKind::Renumber => "RENUMBER",
            };
            writeln!(out, "step {} {} at {}", i, kind, step.source).unwrap();
            if !step.comment.is_empty() {
                writeln!(out, "  // {}", step.comment).unwrap();
            }
            writeln!(out, "  guard: {}", step.guard).unwrap();
            writeln!(out, "  cond:  {}", step.cond).unwrap();
        }
    }
}
