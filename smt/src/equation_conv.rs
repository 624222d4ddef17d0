//! Conversion of a whole SSA equation into the solver.
//!
//! Steps convert in order: assignments and assumes are asserted under their
//! guards; assertion steps contribute negated-implication literals whose
//! disjunction forms the counterexample query. Each assert's literal is
//! recorded in the step's `cond_ast` so failing claims and traces can be
//! read back after a satisfiable solve.

use crate::ast::{AstRef, Tvt};
use crate::convert::{ConvError, Converter};
use cir::ast::Expr;
use symex::equation::{Equation, StepKind};
use std::sync::Arc;
use tracing::debug;

/// Lower every live step of the equation and assert the claim disjunction.
/// Returns the number of assertion literals produced.
pub fn convert_equation(conv: &mut Converter, eq: &mut Equation) -> Result<usize, ConvError> {
    let mut literals: Vec<AstRef> = Vec::new();
    for step in eq.steps_mut() {
        if step.ignore {
            continue;
        }
        let guard = conv.convert_ast(&step.guard)?;
        match step.kind {
            StepKind::Assignment | StepKind::Assume => {
                let cond = conv.convert_ast(&step.cond)?;
                let imp = conv.imply_ast(&guard, &cond);
                conv.assert_ast(&imp);
            }
            StepKind::Assert => {
                let cond = conv.convert_ast(&step.cond)?;
                let imp = conv.imply_ast(&guard, &cond);
                let literal = conv.invert_ast(&imp);
                step.cond_ast = Some(Arc::new(literal.clone()));
                literals.push(literal);
            }
            StepKind::Renumber => {}
        }
    }
    debug!(claims = literals.len(), steps = eq.len(), "converted equation");
    if !literals.is_empty() {
        let query = conv.make_disjunct(&literals);
        conv.assert_ast(&query);
    }
    Ok(literals.len())
}

/// Indices of assertion steps whose literal is true in the current model
/// (i.e. the claims that fired). Only meaningful after a Sat result.
pub fn failed_claims(conv: &mut Converter, eq: &Equation) -> Vec<usize> {
    let mut failed = Vec::new();
    for (i, step) in eq.steps().iter().enumerate() {
        if step.kind != StepKind::Assert {
            continue;
        }
        let literal = match step.cond_ast.as_ref().and_then(|a| a.downcast_ref::<AstRef>()) {
            Some(l) => l.clone(),
            None => continue,
        };
        if conv.l_get(&literal) == Tvt::True {
            failed.push(i);
        }
    }
    failed
}

/// One assignment of the counterexample trace: the step, its left-hand
/// side, and the concrete value the model gives it (when the solver
/// assigned one).
#[derive(Debug)]
pub struct TraceEntry {
    pub step_index: usize,
    pub lhs: Expr,
    pub original_lhs: Option<Expr>,
    pub value: Option<Expr>,
}

/// Reconstruct the assignment history from a satisfying model, in step
/// order.
pub fn build_trace(conv: &mut Converter, eq: &Equation) -> Vec<TraceEntry> {
    let mut trace = Vec::new();
    for (i, step) in eq.steps().iter().enumerate() {
        if step.ignore || step.kind != StepKind::Assignment {
            continue;
        }
        let lhs = match &step.lhs {
            Some(lhs) => lhs.clone(),
            None => continue,
        };
        let value = conv.get(&lhs);
        trace.push(TraceEntry {
            step_index: i,
            lhs,
            original_lhs: step.original_lhs.clone(),
            value,
        });
    }
    trace
}
