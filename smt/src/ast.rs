//! Solver-side vocabulary: sorts, the closed function-kind catalogue, and
//! the opaque AST handles backends hand back to the converter.

use cir::ast::Type;
use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

pub type Sort = Arc<SortX>;

/// Sort kinds double as bits so conversion-table entries can state which
/// operand sorts an operation permits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKind {
    Int = 1,
    Real = 2,
    Bv = 4,
    Array = 8,
    Bool = 16,
    Struct = 32,
    Union = 64,
}

pub const SORT_ALLINTS: u32 = SortKind::Int as u32 | SortKind::Real as u32 | SortKind::Bv as u32;
pub const SORT_BOOL: u32 = SortKind::Bool as u32;
pub const SORT_ARRAY: u32 = SortKind::Array as u32;
pub const SORT_ANY: u32 = 0xff;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SortX {
    Bool,
    Int,
    Real,
    Bv { width: u64 },
    Array { domain_width: u64, range: Sort },
    /// Flattened-tuple sort carrying the defining struct (or the pointer
    /// representation struct).
    Struct { def: Type },
    Union { def: Type },
}

impl SortX {
    pub fn kind(&self) -> SortKind {
        match self {
            SortX::Bool => SortKind::Bool,
            SortX::Int => SortKind::Int,
            SortX::Real => SortKind::Real,
            SortX::Bv { .. } => SortKind::Bv,
            SortX::Array { .. } => SortKind::Array,
            SortX::Struct { .. } => SortKind::Struct,
            SortX::Union { .. } => SortKind::Union,
        }
    }

    /// Bit width for bitvectors, range width for arrays.
    pub fn data_width(&self) -> u64 {
        match self {
            SortX::Bv { width } => *width,
            SortX::Array { range, .. } => range.data_width(),
            SortX::Bool => 1,
            _ => 0,
        }
    }

    pub fn domain_width(&self) -> u64 {
        match self {
            SortX::Array { domain_width, .. } => *domain_width,
            _ => 0,
        }
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, SortX::Bool)
    }
}

pub fn bool_sort() -> Sort {
    Arc::new(SortX::Bool)
}

pub fn int_sort() -> Sort {
    Arc::new(SortX::Int)
}

pub fn bv_sort(width: u64) -> Sort {
    Arc::new(SortX::Bv { width })
}

pub fn array_sort(domain_width: u64, range: Sort) -> Sort {
    Arc::new(SortX::Array { domain_width, range })
}

/// The closed catalogue of function kinds a backend can be asked to apply.
/// `Hacks` marks kinds the dispatcher must special-case; `Invalid` marks
/// conversion-table slots owned by a flattener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmtFunc {
    Hacks,
    Invalid,
    Int,
    Bool,
    BvInt,
    Real,
    Symbol,
    Add,
    BvAdd,
    Sub,
    BvSub,
    Mul,
    BvMul,
    Div,
    BvUDiv,
    BvSDiv,
    Mod,
    BvSMod,
    BvUMod,
    Shl,
    BvShl,
    BvAShr,
    Neg,
    BvNeg,
    BvLShr,
    BvNot,
    BvNxor,
    BvNor,
    BvNand,
    BvXor,
    BvOr,
    BvAnd,
    Implies,
    Xor,
    Or,
    And,
    Not,
    Lt,
    BvSLt,
    BvULt,
    Gt,
    BvSGt,
    BvUGt,
    LtE,
    BvSLtE,
    BvULtE,
    GtE,
    BvSGtE,
    BvUGtE,
    Eq,
    NotEq,
    Ite,
    Store,
    Select,
    Concat,
    Extract,
    Int2Real,
    Real2Int,
    Pow,
    IsInt,
}

impl SmtFunc {
    /// SMT-LIB operator spelling. `Extract` is indexed and handled by
    /// `mk_extract`; `NotEq` expands to `not`/`=` at the backend.
    pub fn smtlib_name(&self) -> &'static str {
        match self {
            SmtFunc::Add => "+",
            SmtFunc::BvAdd => "bvadd",
            SmtFunc::Sub => "-",
            SmtFunc::BvSub => "bvsub",
            SmtFunc::Mul => "*",
            SmtFunc::BvMul => "bvmul",
            SmtFunc::Div => "div",
            SmtFunc::BvUDiv => "bvudiv",
            SmtFunc::BvSDiv => "bvsdiv",
            SmtFunc::Mod => "mod",
            SmtFunc::BvSMod => "bvsrem",
            SmtFunc::BvUMod => "bvurem",
            SmtFunc::BvShl => "bvshl",
            SmtFunc::BvAShr => "bvashr",
            SmtFunc::Neg => "-",
            SmtFunc::BvNeg => "bvneg",
            SmtFunc::BvLShr => "bvlshr",
            SmtFunc::BvNot => "bvnot",
            SmtFunc::BvNxor => "bvxnor",
            SmtFunc::BvNor => "bvnor",
            SmtFunc::BvNand => "bvnand",
            SmtFunc::BvXor => "bvxor",
            SmtFunc::BvOr => "bvor",
            SmtFunc::BvAnd => "bvand",
            SmtFunc::Implies => "=>",
            SmtFunc::Xor => "xor",
            SmtFunc::Or => "or",
            SmtFunc::And => "and",
            SmtFunc::Not => "not",
            SmtFunc::Lt => "<",
            SmtFunc::BvSLt => "bvslt",
            SmtFunc::BvULt => "bvult",
            SmtFunc::Gt => ">",
            SmtFunc::BvSGt => "bvsgt",
            SmtFunc::BvUGt => "bvugt",
            SmtFunc::LtE => "<=",
            SmtFunc::BvSLtE => "bvsle",
            SmtFunc::BvULtE => "bvule",
            SmtFunc::GtE => ">=",
            SmtFunc::BvSGtE => "bvsge",
            SmtFunc::BvUGtE => "bvuge",
            SmtFunc::Eq => "=",
            SmtFunc::Ite => "ite",
            SmtFunc::Store => "store",
            SmtFunc::Select => "select",
            SmtFunc::Concat => "concat",
            SmtFunc::Int2Real => "to_real",
            SmtFunc::Real2Int => "to_int",
            SmtFunc::Pow => "^",
            SmtFunc::IsInt => "is_int",
            SmtFunc::Shl => "shl",
            _ => panic!("internal error: no SMT-LIB spelling for {:?}", self),
        }
    }
}

/// Abstract handle to a converted term. Backends store whatever they need
/// inside and downcast on the way back in.
pub trait SolverAst: Debug + Send + Sync {
    fn sort(&self) -> &Sort;
    fn as_any(&self) -> &dyn Any;
}

pub type AstRef = Arc<dyn SolverAst>;

/// Outcome of `dec_solve`. `Smtlib` means the formula was only dumped (no
/// solver process attached).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveResult {
    Sat,
    Unsat,
    Error(String),
    Smtlib,
}

/// Three-valued assignment of a boolean term in the current model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tvt {
    True,
    False,
    Unknown,
}
