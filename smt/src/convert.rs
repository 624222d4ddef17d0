//! The SMT converter core.
//!
//! Deconstructs IR expressions into solver function applications via the
//! conversion table, routing language-level constructs (pointers, tuples,
//! arrays, byte operations, casts, overflow checks) through the flatteners.
//! Owns the AST cache and the push/pop context stack; cache entries and
//! address-space allocations made above a popped level are reclaimed.

use crate::ast::{
    bool_sort, AstRef, SmtFunc, SolveResult, Sort, SortKind, SortX, Tvt, SORT_ALLINTS, SORT_ANY,
    SORT_BOOL,
};
use crate::backend::{Backend, SolverError};
use cir::ast::{Expr, ExprX, StructDef, Type, TypeX, WidthError};
use cir::ast_util;
use cir::symbol_table::SymbolTable;
use cir::{machine, pool};
use num_bigint::BigInt;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

/// Float encodings the driver may request; only the fixed-point bitvector
/// encoding is implemented by this converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatEncoding {
    FixedBv,
    FloatBv,
    Fp2Bv,
}

#[derive(Debug, Clone)]
pub struct SmtConfig {
    pub enable_cache: bool,
    /// true: QF_AUFLIRA (mathematical integers); false: QF_AUFBV.
    pub int_encoding: bool,
    pub tuple_support_native: bool,
    pub allow_bool_in_array_range: bool,
    pub can_init_infinite_arrays: bool,
    pub float_encoding: FloatEncoding,
}

impl Default for SmtConfig {
    fn default() -> SmtConfig {
        SmtConfig {
            enable_cache: true,
            int_encoding: false,
            tuple_support_native: false,
            allow_bool_in_array_range: true,
            can_init_infinite_arrays: true,
            float_encoding: FloatEncoding::FixedBv,
        }
    }
}

/// Recoverable conversion failures. Everything else in the converter is a
/// frontend bug and panics.
#[derive(Error, Debug)]
pub enum ConvError {
    #[error("cannot size type: {0}")]
    Width(#[from] WidthError),
}

pub(crate) struct CacheEntry {
    pub ast: AstRef,
    pub level: u32,
}

/// One conversion-table row: the function kind per encoding/signedness, the
/// operand count, and the operand sorts the operation permits.
pub struct OpConvert {
    pub int_mode: SmtFunc,
    pub signed_bv: SmtFunc,
    pub unsigned_bv: SmtFunc,
    pub args: u8,
    pub permitted: u32,
}

const fn row(
    int_mode: SmtFunc,
    signed_bv: SmtFunc,
    unsigned_bv: SmtFunc,
    args: u8,
    permitted: u32,
) -> OpConvert {
    OpConvert { int_mode, signed_bv, unsigned_bv, args, permitted }
}

const HACKS: OpConvert = row(SmtFunc::Hacks, SmtFunc::Hacks, SmtFunc::Hacks, 0, SORT_ANY);
const FLAT: OpConvert = row(SmtFunc::Invalid, SmtFunc::Invalid, SmtFunc::Invalid, 0, SORT_ANY);
const SORT_BV_ONLY: u32 = SortKind::Bv as u32;

/// Indexed by expression tag ordinal.
pub static CONVERT_TABLE: [OpConvert; cir::ast::NUM_EXPR_KINDS] = [
    HACKS, // constant_int
    HACKS, // constant_fixedbv
    HACKS, // constant_bool
    HACKS, // constant_string
    HACKS, // constant_struct
    HACKS, // constant_union
    HACKS, // constant_array
    HACKS, // constant_array_of
    HACKS, // symbol
    FLAT,  // typecast
    row(SmtFunc::Ite, SmtFunc::Ite, SmtFunc::Ite, 3, SORT_ANY), // if
    row(SmtFunc::Eq, SmtFunc::Eq, SmtFunc::Eq, 2, SORT_ANY),    // equality
    row(SmtFunc::NotEq, SmtFunc::NotEq, SmtFunc::NotEq, 2, SORT_ANY), // notequal
    row(SmtFunc::Lt, SmtFunc::BvSLt, SmtFunc::BvULt, 2, SORT_ALLINTS), // lessthan
    row(SmtFunc::Gt, SmtFunc::BvSGt, SmtFunc::BvUGt, 2, SORT_ALLINTS), // greaterthan
    row(SmtFunc::LtE, SmtFunc::BvSLtE, SmtFunc::BvULtE, 2, SORT_ALLINTS), // lessthanequal
    row(SmtFunc::GtE, SmtFunc::BvSGtE, SmtFunc::BvUGtE, 2, SORT_ALLINTS), // greaterthanequal
    row(SmtFunc::Not, SmtFunc::Not, SmtFunc::Not, 1, SORT_BOOL), // not
    row(SmtFunc::And, SmtFunc::And, SmtFunc::And, 2, SORT_BOOL), // and
    row(SmtFunc::Or, SmtFunc::Or, SmtFunc::Or, 2, SORT_BOOL),    // or
    row(SmtFunc::Xor, SmtFunc::Xor, SmtFunc::Xor, 2, SORT_BOOL), // xor
    row(SmtFunc::Implies, SmtFunc::Implies, SmtFunc::Implies, 2, SORT_BOOL), // implies
    row(SmtFunc::Invalid, SmtFunc::BvAnd, SmtFunc::BvAnd, 2, SORT_BV_ONLY), // bitand
    row(SmtFunc::Invalid, SmtFunc::BvOr, SmtFunc::BvOr, 2, SORT_BV_ONLY),   // bitor
    row(SmtFunc::Invalid, SmtFunc::BvXor, SmtFunc::BvXor, 2, SORT_BV_ONLY), // bitxor
    row(SmtFunc::Invalid, SmtFunc::BvNand, SmtFunc::BvNand, 2, SORT_BV_ONLY), // bitnand
    row(SmtFunc::Invalid, SmtFunc::BvNor, SmtFunc::BvNor, 2, SORT_BV_ONLY), // bitnor
    row(SmtFunc::Invalid, SmtFunc::BvNxor, SmtFunc::BvNxor, 2, SORT_BV_ONLY), // bitnxor
    row(SmtFunc::Invalid, SmtFunc::BvLShr, SmtFunc::BvLShr, 2, SORT_BV_ONLY), // lshr
    row(SmtFunc::Shl, SmtFunc::BvShl, SmtFunc::BvShl, 2, SORT_BV_ONLY),     // shl
    row(SmtFunc::Invalid, SmtFunc::BvAShr, SmtFunc::BvAShr, 2, SORT_BV_ONLY), // ashr
    row(SmtFunc::Neg, SmtFunc::BvNeg, SmtFunc::BvNeg, 1, SORT_ALLINTS),     // neg
    HACKS, // abs
    row(SmtFunc::Add, SmtFunc::BvAdd, SmtFunc::BvAdd, 2, SORT_ALLINTS), // add
    row(SmtFunc::Sub, SmtFunc::BvSub, SmtFunc::BvSub, 2, SORT_ALLINTS), // sub
    row(SmtFunc::Mul, SmtFunc::BvMul, SmtFunc::BvMul, 2, SORT_ALLINTS), // mul
    row(SmtFunc::Div, SmtFunc::BvSDiv, SmtFunc::BvUDiv, 2, SORT_ALLINTS), // div
    row(SmtFunc::Mod, SmtFunc::BvSMod, SmtFunc::BvUMod, 2, SORT_ALLINTS), // modulus
    FLAT,  // dynamic_object
    FLAT,  // same_object
    FLAT,  // pointer_offset
    FLAT,  // pointer_object
    FLAT,  // address_of
    FLAT,  // byte_extract
    FLAT,  // byte_update
    FLAT,  // with
    FLAT,  // member
    FLAT,  // index
    HACKS, // zero_string
    HACKS, // zero_length_string
    HACKS, // isnan
    FLAT,  // overflow
    FLAT,  // overflow_cast
    FLAT,  // overflow_neg
];

pub struct Converter {
    pub(crate) backend: Box<dyn Backend>,
    pub(crate) cfg: SmtConfig,
    pub(crate) ns: Arc<SymbolTable>,
    pub(crate) ctx_level: u32,
    cache: HashMap<Expr, CacheEntry>,
    fresh_map: HashMap<String, u32>,
    /// The two-field representation of pointer values.
    pub(crate) pointer_struct: Type,
    pub(crate) addr_space_type: Type,
    pub(crate) machine_uint: Type,
    /// Per-level object-id maps (renamed symbol -> object id); lookups
    /// search the whole stack, inserts go to the top.
    pub(crate) obj_ids: Vec<HashMap<String, u32>>,
    pub(crate) obj_id_count: Vec<u32>,
    /// Per-level address-space records: object id -> (start, end) symbols.
    pub(crate) addr_space_data: Vec<HashMap<u32, (String, String)>>,
    /// Version counter of the tracking-array symbol, per level.
    pub(crate) addr_space_sym_num: Vec<u32>,
    /// Defaults of free arrays standing in for unsupported infinite
    /// initializers; consulted lazily on select.
    pub(crate) lazy_array_defaults: Vec<(AstRef, AstRef)>,
}

impl Converter {
    pub fn new(
        backend: Box<dyn Backend>,
        cfg: SmtConfig,
        ns: Arc<SymbolTable>,
    ) -> Result<Converter, SolverError> {
        if cfg.float_encoding != FloatEncoding::FixedBv {
            return Err(SolverError::Unsupported(format!(
                "float encoding {:?} (only the fixed-point bitvector encoding is implemented)",
                cfg.float_encoding
            )));
        }
        if cfg.tuple_support_native {
            return Err(SolverError::Unsupported(
                "native tuple support (no shipped backend provides it)".to_string(),
            ));
        }
        let word = machine::machine_model().word_width;
        let machine_uint = pool::uint_type(word);
        let pointer_struct = pool::intern(TypeX::Struct(StructDef {
            name: cir::ast::str_ident("pointer_struct"),
            members: vec![machine_uint.clone(), machine_uint.clone()],
            member_names: vec![
                cir::ast::str_ident("pointer_object"),
                cir::ast::str_ident("pointer_offset"),
            ],
        }));
        let addr_space_type = pool::intern(TypeX::Struct(StructDef {
            name: cir::ast::str_ident("addr_space_tuple"),
            members: vec![machine_uint.clone(), machine_uint.clone()],
            member_names: vec![cir::ast::str_ident("start"), cir::ast::str_ident("end")],
        }));
        let mut converter = Converter {
            backend,
            cfg,
            ns,
            ctx_level: 0,
            cache: HashMap::new(),
            fresh_map: HashMap::new(),
            pointer_struct,
            addr_space_type,
            machine_uint,
            obj_ids: vec![HashMap::new()],
            obj_id_count: vec![0],
            addr_space_data: vec![HashMap::new()],
            addr_space_sym_num: vec![0],
            lazy_array_defaults: Vec::new(),
        };
        converter.init_addr_space_array();
        Ok(converter)
    }

    pub fn solver_text(&self) -> String {
        self.backend.solver_text()
    }

    // --- context stack ---------------------------------------------------

    pub fn push_ctx(&mut self) {
        self.ctx_level += 1;
        self.obj_ids.push(HashMap::new());
        self.obj_id_count.push(*self.obj_id_count.last().unwrap());
        self.addr_space_data.push(HashMap::new());
        self.addr_space_sym_num.push(*self.addr_space_sym_num.last().unwrap());
        self.backend.push_ctx();
        debug!(level = self.ctx_level, "push_ctx");
    }

    pub fn pop_ctx(&mut self) {
        assert!(self.ctx_level > 0, "internal error: pop_ctx on level 0");
        self.backend.pop_ctx();
        self.obj_ids.pop();
        self.obj_id_count.pop();
        self.addr_space_data.pop();
        self.addr_space_sym_num.pop();
        self.ctx_level -= 1;
        let level = self.ctx_level;
        self.cache.retain(|_, entry| entry.level <= level);
        debug!(level = self.ctx_level, "pop_ctx");
    }

    pub fn ctx_level(&self) -> u32 {
        self.ctx_level
    }

    // --- public conversion API -------------------------------------------

    pub fn convert_ast(&mut self, expr: &Expr) -> Result<AstRef, ConvError> {
        if self.cfg.enable_cache {
            if let Some(entry) = self.cache.get(expr) {
                trace!(kind = expr.x.kind_name(), "cache hit");
                return Ok(entry.ast.clone());
            }
        }
        let ast = self.convert_ast_nocache(expr)?;
        if self.cfg.enable_cache {
            self.cache
                .insert(expr.clone(), CacheEntry { ast: ast.clone(), level: self.ctx_level });
        }
        Ok(ast)
    }

    pub fn assert_ast(&mut self, a: &AstRef) {
        self.backend.assert_ast(a);
    }

    pub fn invert_ast(&mut self, a: &AstRef) -> AstRef {
        assert!(a.sort().is_bool(), "internal error: inverting non-boolean AST");
        self.backend.mk_func_app(&bool_sort(), SmtFunc::Not, &[a.clone()])
    }

    pub fn imply_ast(&mut self, a: &AstRef, b: &AstRef) -> AstRef {
        self.backend.mk_func_app(&bool_sort(), SmtFunc::Implies, &[a.clone(), b.clone()])
    }

    pub fn make_conjunct(&mut self, v: &[AstRef]) -> AstRef {
        match v.len() {
            0 => self.backend.mk_smt_bool(true),
            1 => v[0].clone(),
            _ => self.backend.mk_func_app(&bool_sort(), SmtFunc::And, v),
        }
    }

    pub fn make_disjunct(&mut self, v: &[AstRef]) -> AstRef {
        match v.len() {
            0 => self.backend.mk_smt_bool(false),
            1 => v[0].clone(),
            _ => self.backend.mk_func_app(&bool_sort(), SmtFunc::Or, v),
        }
    }

    pub fn dec_solve(&mut self) -> SolveResult {
        self.backend.dec_solve()
    }

    pub fn l_get(&mut self, a: &AstRef) -> Tvt {
        self.backend.l_get(a)
    }

    /// Retrieve a concrete value for `expr` after a satisfiable solve.
    pub fn get(&mut self, expr: &Expr) -> Option<Expr> {
        let ast = self.convert_ast(expr).ok()?;
        self.get_ast_value(&ast, &expr.typ)
    }

    pub(crate) fn get_ast_value(&mut self, ast: &AstRef, typ: &Type) -> Option<Expr> {
        match &**typ {
            TypeX::Bool => self.backend.get_bool(ast).map(ast_util::constant_bool),
            TypeX::UnsignedBv(_) | TypeX::SignedBv(_) => {
                let v = self.backend.get_bv(ast)?;
                Some(ast_util::constant_int(v, typ.clone()))
            }
            TypeX::FixedBv { .. } => {
                let v = self.backend.get_bv(ast)?;
                Some(ast_util::constant_fixedbv(v, typ.clone()))
            }
            TypeX::Pointer(_) | TypeX::Struct(_) | TypeX::Union(_) => {
                self.tuple_get(ast, typ)
            }
            TypeX::Array { subtype, size } => {
                // Arrays of tuples have no single solver-side value to read.
                if self.is_tuple_type(subtype) {
                    return None;
                }
                let n = size.as_ref().and_then(|s| ast_util::as_constant_u64(s))?;
                let mut elems = Vec::new();
                for i in 0..n {
                    let elem = self.backend.get_array_elem(ast, i)?;
                    elems.push(self.get_ast_value(&elem, subtype)?);
                }
                Some(cir::ast::Typed::new(typ.clone(), ExprX::ConstantArray(elems)))
            }
            _ => None,
        }
    }

    /// Assert that a boolean expression holds (or that its negation does).
    pub fn set_to(&mut self, expr: &Expr, value: bool) -> Result<(), ConvError> {
        let a = self.convert_ast(expr)?;
        let a = if value { a } else { self.invert_ast(&a) };
        self.assert_ast(&a);
        Ok(())
    }

    // --- fresh names ------------------------------------------------------

    pub fn mk_fresh_name(&mut self, tag: &str) -> String {
        let n = self.fresh_map.entry(tag.to_string()).or_insert(0);
        let name = format!("{}${}", tag, n);
        *n += 1;
        name
    }

    pub fn mk_fresh(&mut self, sort: &Sort, tag: &str) -> AstRef {
        let name = self.mk_fresh_name(tag);
        self.backend.mk_smt_symbol(&name, sort)
    }

    // --- sorts ------------------------------------------------------------

    pub fn convert_sort(&mut self, typ: &Type) -> Sort {
        match &**typ {
            TypeX::Bool => bool_sort(),
            TypeX::UnsignedBv(w) | TypeX::SignedBv(w) => {
                if self.cfg.int_encoding {
                    crate::ast::int_sort()
                } else {
                    crate::ast::bv_sort(*w as u64)
                }
            }
            TypeX::FixedBv { width, .. } => {
                if self.cfg.int_encoding {
                    Arc::new(SortX::Real)
                } else {
                    crate::ast::bv_sort(*width as u64)
                }
            }
            TypeX::Pointer(_) => {
                let def = self.pointer_struct.clone();
                self.backend.mk_struct_sort(&def)
            }
            TypeX::Struct(_) => self.backend.mk_struct_sort(typ),
            TypeX::Union(_) => self.backend.mk_union_sort(typ),
            TypeX::Array { subtype, .. } => {
                let domain_width = self.calculate_array_domain_width(typ);
                let mut range = self.convert_sort(subtype);
                if range.is_bool() && !self.cfg.allow_bool_in_array_range {
                    range = crate::ast::bv_sort(1);
                }
                crate::ast::array_sort(domain_width, range)
            }
            TypeX::Str(n) => {
                let size = ast_util::constant_int(*n + 1, pool::uint_type(64));
                let arr = pool::intern(TypeX::Array {
                    subtype: pool::uint_type(8),
                    size: Some(size),
                });
                self.convert_sort(&arr)
            }
            // Type symbols resolve through the program symbol table.
            TypeX::Symbol(_) => {
                let resolved = self.resolve_type(typ);
                self.convert_sort(&resolved)
            }
            TypeX::Empty | TypeX::Code => {
                panic!("internal error: no SMT sort for {}", typ)
            }
        }
    }

    /// Follow `symbol` types to their symbol-table definition.
    pub(crate) fn resolve_type(&self, t: &Type) -> Type {
        match &**t {
            TypeX::Symbol(tag) => match self.ns.lookup(tag) {
                Some(record) => {
                    let resolved = record.typ.clone();
                    self.resolve_type(&resolved)
                }
                None => panic!("internal error: unresolved type symbol {}", tag),
            },
            _ => t.clone(),
        }
    }

    // --- bool/bit bridging ------------------------------------------------

    /// ite(b, #b1, #b0)
    pub fn make_bool_bit(&mut self, a: &AstRef) -> AstRef {
        assert!(a.sort().is_bool(), "internal error: make_bool_bit on non-boolean");
        let one = self.backend.mk_smt_bvint(&BigInt::from(1u8), false, 1);
        let zero = self.backend.mk_smt_bvint(&BigInt::from(0u8), false, 1);
        let sort = crate::ast::bv_sort(1);
        self.backend.mk_func_app(&sort, SmtFunc::Ite, &[a.clone(), one, zero])
    }

    /// a == #b1
    pub fn make_bit_bool(&mut self, a: &AstRef) -> AstRef {
        assert!(
            matches!(**a.sort(), SortX::Bv { width: 1 }),
            "internal error: make_bit_bool on non-bit"
        );
        let one = self.backend.mk_smt_bvint(&BigInt::from(1u8), false, 1);
        self.backend.mk_func_app(&bool_sort(), SmtFunc::Eq, &[a.clone(), one])
    }

    // --- the dispatcher ---------------------------------------------------

    fn convert_ast_nocache(&mut self, expr: &Expr) -> Result<AstRef, ConvError> {
        trace!(kind = expr.x.kind_name(), "convert");
        match &expr.x {
            ExprX::ConstantInt(_)
            | ExprX::ConstantFixedBv(_)
            | ExprX::ConstantBool(_)
            | ExprX::ConstantString(_)
            | ExprX::ConstantStruct(_)
            | ExprX::ConstantUnion { .. }
            | ExprX::ConstantArray(_)
            | ExprX::ConstantArrayOf(_)
            | ExprX::Symbol(_) => self.convert_terminal(expr),

            ExprX::Typecast(_) => self.convert_typecast(expr),
            ExprX::AddressOf(_) => self.convert_addr_of(expr),
            ExprX::ByteExtract { .. } => self.convert_byte_extract(expr),
            ExprX::ByteUpdate { .. } => self.convert_byte_update(expr),
            ExprX::Member { .. } => self.convert_member(expr),
            ExprX::Index { .. } => self.convert_index(expr),
            ExprX::With { .. } => self.convert_with(expr),
            ExprX::Overflow(_) => self.overflow_arith(expr),
            ExprX::OverflowCast { .. } => self.overflow_cast(expr),
            ExprX::OverflowNeg(_) => self.overflow_neg(expr),
            ExprX::DynamicObject(_) => self.convert_dynamic_object(expr),
            ExprX::SameObject(a, b) => self.convert_same_object(a, b),
            ExprX::PointerObject(p) => {
                let ptr = self.convert_ast(p)?;
                Ok(self.pointer_object_field(&ptr))
            }
            ExprX::PointerOffset(p) => {
                let ptr = self.convert_ast(p)?;
                Ok(self.pointer_offset_field(&ptr))
            }

            ExprX::If(cond, then, els) => {
                let c = self.convert_ast(cond)?;
                if self.is_tuple_type(&then.typ) {
                    let t = self.convert_ast(then)?;
                    let f = self.convert_ast(els)?;
                    Ok(self.tuple_ite(&c, &t, &f, &then.typ))
                } else if self.is_tuple_array_type(&then.typ) {
                    let t = self.convert_ast(then)?;
                    let f = self.convert_ast(els)?;
                    Ok(self.tuple_array_ite(&c, &t, &f, &then.typ))
                } else {
                    let t = self.convert_ast(then)?;
                    let f = self.convert_ast(els)?;
                    let sort = t.sort().clone();
                    Ok(self.backend.mk_func_app(&sort, SmtFunc::Ite, &[c, t, f]))
                }
            }

            ExprX::Equality(a, b) => self.convert_equality(a, b),
            ExprX::NotEqual(a, b) => {
                let eq = self.convert_equality(a, b)?;
                Ok(self.invert_ast(&eq))
            }

            // Pointer arithmetic peels off before the table.
            ExprX::Add(a, b) | ExprX::Sub(a, b)
                if matches!(*a.typ, TypeX::Pointer(_)) || matches!(*b.typ, TypeX::Pointer(_)) =>
            {
                self.convert_pointer_arith(expr, a, b)
            }

            ExprX::LessThan(a, b)
            | ExprX::GreaterThan(a, b)
            | ExprX::LessThanEqual(a, b)
            | ExprX::GreaterThanEqual(a, b)
                if matches!(*a.typ, TypeX::Pointer(_)) && matches!(*b.typ, TypeX::Pointer(_)) =>
            {
                self.convert_ptr_cmp(expr, a, b)
            }

            // abs(x) expands to ite(x < 0, -x, x).
            ExprX::Abs(e) => {
                let zero = ast_util::constant_int(0u8, e.typ.clone());
                let expanded = ast_util::mk_if(
                    &ast_util::mk_lessthan(e, &zero),
                    &ast_util::mk_neg(e),
                    e,
                );
                self.convert_ast(&expanded)
            }

            // Fixed-point values are never NaN.
            ExprX::IsNan(_) => Ok(self.backend.mk_smt_bool(false)),

            // Legacy string-abstraction predicates: uninterpreted booleans.
            ExprX::ZeroString(_) => {
                let s = bool_sort();
                Ok(self.mk_fresh(&s, "zero_string"))
            }
            ExprX::ZeroLengthString(_) => {
                let s = bool_sort();
                Ok(self.mk_fresh(&s, "zero_length_string"))
            }

            _ => self.convert_via_table(expr),
        }
    }

    fn convert_via_table(&mut self, expr: &Expr) -> Result<AstRef, ConvError> {
        let entry = &CONVERT_TABLE[expr.x.tag() as usize];
        let children = expr.x.children();
        assert_eq!(
            children.len(),
            entry.args as usize,
            "internal error: arity mismatch converting {}",
            expr.x.kind_name()
        );

        let signed = children.first().map(|c| c.typ.is_signed()).unwrap_or(false);
        let func = if self.cfg.int_encoding {
            entry.int_mode
        } else if signed {
            entry.signed_bv
        } else {
            entry.unsigned_bv
        };
        match func {
            SmtFunc::Invalid => panic!(
                "internal error: {} is not expressible in {} encoding",
                expr.x.kind_name(),
                if self.cfg.int_encoding { "integer" } else { "bitvector" }
            ),
            SmtFunc::Shl if self.cfg.int_encoding => {
                panic!("internal error: shift is not expressible in integer encoding")
            }
            SmtFunc::Hacks => panic!(
                "internal error: {} fell through to the conversion table",
                expr.x.kind_name()
            ),
            _ => {}
        }

        let mut args = Vec::with_capacity(children.len());
        for c in &children {
            args.push(self.convert_ast(c)?);
        }
        for (c, a) in children.iter().zip(args.iter()) {
            let kind_bit = a.sort().kind() as u32;
            assert!(
                entry.permitted & kind_bit != 0,
                "internal error: operand {} of {} has impermissible sort {:?}",
                c.x.kind_name(),
                expr.x.kind_name(),
                a.sort()
            );
        }

        let result_sort = if *expr.typ == TypeX::Bool {
            bool_sort()
        } else if matches!(func, SmtFunc::Ite) {
            args[1].sort().clone()
        } else {
            args[0].sort().clone()
        };
        Ok(self.backend.mk_func_app(&result_sort, func, &args))
    }

    fn convert_equality(&mut self, a: &Expr, b: &Expr) -> Result<AstRef, ConvError> {
        if self.is_tuple_type(&a.typ) {
            let lhs = self.convert_ast(a)?;
            let rhs = self.convert_ast(b)?;
            return Ok(self.tuple_equality(&lhs, &rhs, &a.typ));
        }
        if self.is_tuple_array_type(&a.typ) {
            let lhs = self.convert_ast(a)?;
            let rhs = self.convert_ast(b)?;
            return Ok(self.tuple_array_equality(&lhs, &rhs, &a.typ));
        }
        // String constants compare at the array level.
        let a = self.expand_string_operand(a);
        let b = self.expand_string_operand(b);
        let lhs = self.convert_ast(&a)?;
        let rhs = self.convert_ast(&b)?;
        Ok(self.backend.mk_func_app(&bool_sort(), SmtFunc::Eq, &[lhs, rhs]))
    }

    fn expand_string_operand(&self, e: &Expr) -> Expr {
        match &e.x {
            ExprX::ConstantString(_) => ast_util::string_constant_to_array(e),
            _ => e.clone(),
        }
    }

    // --- terminals --------------------------------------------------------

    fn convert_terminal(&mut self, expr: &Expr) -> Result<AstRef, ConvError> {
        match &expr.x {
            ExprX::ConstantInt(n) => {
                if self.cfg.int_encoding {
                    Ok(self.backend.mk_smt_int(n))
                } else {
                    let width = expr.typ.width().expect("internal error: untyped int constant");
                    let signed = expr.typ.is_signed();
                    Ok(self.backend.mk_smt_bvint(n, signed, width))
                }
            }
            ExprX::ConstantFixedBv(bits) => {
                if self.cfg.int_encoding {
                    let frac = match &*expr.typ {
                        TypeX::FixedBv { width, integer_bits } => width - integer_bits,
                        _ => panic!("internal error: fixedbv constant of type {}", expr.typ),
                    };
                    let denom = BigInt::from(1u8) << frac;
                    Ok(self.backend.mk_smt_real(&format!("{}/{}", bits, denom)))
                } else {
                    let width = expr.typ.width().expect("internal error: unsized fixedbv");
                    Ok(self.backend.mk_smt_bvint(bits, true, width))
                }
            }
            ExprX::ConstantBool(b) => Ok(self.backend.mk_smt_bool(*b)),
            ExprX::ConstantString(_) => {
                let arr = ast_util::string_constant_to_array(expr);
                self.convert_ast(&arr)
            }
            ExprX::ConstantStruct(_) | ExprX::ConstantUnion { .. } => self.tuple_create(expr),
            ExprX::ConstantArray(_) | ExprX::ConstantArrayOf(_) => self.array_create(expr),
            ExprX::Symbol(sym) => {
                let name = sym.full_name();
                if self.is_tuple_type(&expr.typ) || self.is_tuple_array_type(&expr.typ) {
                    Ok(self.mk_tuple_symbol(&name, &expr.typ))
                } else {
                    let sort = self.convert_sort(&expr.typ);
                    Ok(self.backend.mk_smt_symbol(&name, &sort))
                }
            }
            _ => panic!("internal error: {} is not a terminal", expr.x.kind_name()),
        }
    }

    // --- helpers shared by the flatteners ---------------------------------

    /// Tuple-flattened types: structures and pointers.
    pub(crate) fn is_tuple_type(&self, t: &Type) -> bool {
        matches!(**t, TypeX::Struct(_) | TypeX::Union(_) | TypeX::Pointer(_))
    }

    pub(crate) fn is_tuple_array_type(&self, t: &Type) -> bool {
        match &**t {
            TypeX::Array { subtype, .. } => self.is_tuple_type(subtype),
            _ => false,
        }
    }

    /// The struct definition behind a tuple-flattened type.
    pub(crate) fn get_type_def(&self, t: &Type) -> (Type, StructDef) {
        let t = self.resolve_type(t);
        match &*t {
            TypeX::Struct(d) | TypeX::Union(d) => {
                let d = d.clone();
                (t, d)
            }
            TypeX::Pointer(_) => match &*self.pointer_struct {
                TypeX::Struct(d) => (self.pointer_struct.clone(), d.clone()),
                _ => unreachable!(),
            },
            _ => panic!("internal error: {} has no tuple definition", t),
        }
    }

    pub(crate) fn bv_width(&self, a: &AstRef) -> u64 {
        match &**a.sort() {
            SortX::Bv { width } => *width,
            _ => panic!("internal error: expected bitvector, got {:?}", a.sort()),
        }
    }
}
