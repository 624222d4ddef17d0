//! The abstract solver interface and the name-keyed factory.
//!
//! The converter interacts with a solver only through this capability set;
//! every supported solver is driven in its SMT-LIB pipe mode.

use crate::ast::{AstRef, SmtFunc, SolveResult, Sort, Tvt};
use crate::convert::{Converter, SmtConfig};
use crate::process::SmtProcess;
use crate::smtlib::SmtLibBackend;
use cir::ast::Type;
use cir::symbol_table::SymbolTable;
use num_bigint::BigInt;
use std::sync::Arc;
use thiserror::Error;

pub trait Backend: Send {
    fn mk_func_app(&mut self, sort: &Sort, kind: SmtFunc, args: &[AstRef]) -> AstRef;
    fn mk_extract(&mut self, a: &AstRef, high: u64, low: u64, sort: &Sort) -> AstRef;
    fn mk_smt_int(&mut self, i: &BigInt) -> AstRef;
    fn mk_smt_real(&mut self, s: &str) -> AstRef;
    fn mk_smt_bvint(&mut self, i: &BigInt, sign: bool, width: u64) -> AstRef;
    fn mk_smt_bool(&mut self, val: bool) -> AstRef;
    fn mk_smt_symbol(&mut self, name: &str, sort: &Sort) -> AstRef;
    fn mk_struct_sort(&mut self, t: &Type) -> Sort;
    fn mk_union_sort(&mut self, t: &Type) -> Sort;
    /// Constant array with every cell holding `value`.
    fn mk_array_of(&mut self, value: &AstRef, domain_width: u64) -> AstRef;
    fn assert_ast(&mut self, a: &AstRef);
    fn push_ctx(&mut self);
    fn pop_ctx(&mut self);
    fn dec_solve(&mut self) -> SolveResult;
    fn l_get(&mut self, a: &AstRef) -> Tvt;
    fn get_bool(&mut self, a: &AstRef) -> Option<bool>;
    fn get_bv(&mut self, a: &AstRef) -> Option<BigInt>;
    fn get_array_elem(&mut self, a: &AstRef, idx: u64) -> Option<AstRef>;
    fn solver_text(&self) -> String;
}

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("unknown solver `{0}`")]
    UnknownSolver(String),
    #[error("could not launch solver `{0}`: {1}")]
    Launch(String, std::io::Error),
    #[error("unsupported configuration: {0}")]
    Unsupported(String),
}

/// Executable and arguments putting each solver into incremental SMT-LIB
/// pipe mode.
fn solver_command(name: &str) -> Result<(&'static str, &'static [&'static str]), SolverError> {
    match name {
        "z3" => Ok(("z3", &["-smt2", "-in"])),
        "cvc" => Ok(("cvc5", &["--lang", "smt2", "--incremental", "--produce-models"])),
        "boolector" => Ok(("boolector", &["--smt2", "--incremental"])),
        "bitwuzla" => Ok(("bitwuzla", &["--lang", "smt2"])),
        "mathsat" => Ok(("mathsat", &[])),
        "yices" => Ok(("yices-smt2", &["--incremental"])),
        _ => Err(SolverError::UnknownSolver(name.to_string())),
    }
}

/// Build a backend by solver name. `smtlib` attaches no process: the formula
/// is only recorded (and `dec_solve` reports `Smtlib`). Any other name
/// launches the solver executable over a pipe.
pub fn create_backend(
    name: &str,
    log: Option<Box<dyn std::io::Write + Send>>,
) -> Result<Box<dyn Backend>, SolverError> {
    if name == "smtlib" {
        return Ok(Box::new(SmtLibBackend::new(name, None, log)));
    }
    let (executable, args) = solver_command(name)?;
    let process = SmtProcess::launch(executable, args)
        .map_err(|e| SolverError::Launch(name.to_string(), e))?;
    Ok(Box::new(SmtLibBackend::new(name, Some(process), log)))
}

/// Factory entry point: backend plus converter in one step. `log` receives
/// the SMT-LIB transcript (the formula dump) when set.
pub fn create_solver(
    name: &str,
    cfg: SmtConfig,
    ns: Arc<SymbolTable>,
    log: Option<Box<dyn std::io::Write + Send>>,
) -> Result<Converter, SolverError> {
    let backend = create_backend(name, log)?;
    Converter::new(backend, cfg, ns)
}
