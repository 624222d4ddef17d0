//! Pointer and address-space flattening.
//!
//! A pointer value is a two-field tuple `{pointer_object, pointer_offset}`.
//! Each addressed object gets an id and a `(start, end)` range, tracked both
//! in the converter (per context level) and in a solver-side array of
//! tuples updated by store chains, which supports inter-object comparison
//! and pointer/integer casts.

use crate::ast::{bool_sort, AstRef, SmtFunc, Sort};
use crate::convert::{ConvError, Converter};
use cir::ast::{Expr, ExprX, Type, TypeX};
use cir::ast_util;
use cir::{layout, machine, pool};
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use tracing::debug;

const NULL_OBJECT: u32 = 0;
const INVALID_OBJECT: u32 = 1;

fn obj_start_name(id: u32) -> String {
    format!("__CHECKER_ptr_obj_start_{}", id)
}

fn obj_end_name(id: u32) -> String {
    format!("__CHECKER_ptr_obj_end_{}", id)
}

fn addr_space_arr_name(n: u32) -> String {
    format!("__CHECKER_addr_space_arr_{}", n)
}

impl Converter {
    pub(crate) fn machine_word_sort(&mut self) -> Sort {
        let t = self.machine_uint.clone();
        self.convert_sort(&t)
    }

    pub(crate) fn machine_uint_const(&mut self, n: u64) -> AstRef {
        if self.cfg.int_encoding {
            self.backend.mk_smt_int(&BigInt::from(n))
        } else {
            let w = machine::machine_model().word_width as u64;
            self.backend.mk_smt_bvint(&BigInt::from(n), false, w)
        }
    }

    fn word_func_app(&mut self, func: SmtFunc, args: &[AstRef]) -> AstRef {
        let sort = self.machine_word_sort();
        self.backend.mk_func_app(&sort, func, args)
    }

    fn word_add(&mut self, a: &AstRef, b: &AstRef) -> AstRef {
        let func = if self.cfg.int_encoding { SmtFunc::Add } else { SmtFunc::BvAdd };
        self.word_func_app(func, &[a.clone(), b.clone()])
    }

    fn word_sub(&mut self, a: &AstRef, b: &AstRef) -> AstRef {
        let func = if self.cfg.int_encoding { SmtFunc::Sub } else { SmtFunc::BvSub };
        self.word_func_app(func, &[a.clone(), b.clone()])
    }

    fn word_mul(&mut self, a: &AstRef, b: &AstRef) -> AstRef {
        let func = if self.cfg.int_encoding { SmtFunc::Mul } else { SmtFunc::BvMul };
        self.word_func_app(func, &[a.clone(), b.clone()])
    }

    fn word_cmp(&mut self, func_int: SmtFunc, func_bv: SmtFunc, a: &AstRef, b: &AstRef) -> AstRef {
        let func = if self.cfg.int_encoding { func_int } else { func_bv };
        self.backend.mk_func_app(&bool_sort(), func, &[a.clone(), b.clone()])
    }

    pub(crate) fn pointer_object_field(&mut self, ptr: &AstRef) -> AstRef {
        let t = self.pointer_struct.clone();
        self.tuple_project(ptr, &t, 0)
    }

    pub(crate) fn pointer_offset_field(&mut self, ptr: &AstRef) -> AstRef {
        let t = self.pointer_struct.clone();
        self.tuple_project(ptr, &t, 1)
    }

    fn addr_space_arr_type(&self) -> Type {
        pool::intern(TypeX::Array { subtype: self.addr_space_type.clone(), size: None })
    }

    fn current_addr_space_array(&mut self) -> AstRef {
        let n = *self.addr_space_sym_num.last().unwrap();
        let t = self.addr_space_arr_type();
        self.mk_tuple_symbol(&addr_space_arr_name(n), &t)
    }

    /// Objects 0 and 1 are reserved for NULL and INVALID, pinned to the
    /// addresses 0 and 1.
    pub(crate) fn init_addr_space_array(&mut self) {
        self.obj_ids.last_mut().unwrap().insert("NULL".to_string(), NULL_OBJECT);
        self.obj_ids.last_mut().unwrap().insert("INVALID".to_string(), INVALID_OBJECT);
        *self.obj_id_count.last_mut().unwrap() = 2;

        for id in [NULL_OBJECT, INVALID_OBJECT] {
            let sort = self.machine_word_sort();
            let start = self.backend.mk_smt_symbol(&obj_start_name(id), &sort);
            let end = self.backend.mk_smt_symbol(&obj_end_name(id), &sort);
            let fixed = self.machine_uint_const(id as u64);
            let eq_start =
                self.backend.mk_func_app(&bool_sort(), SmtFunc::Eq, &[start.clone(), fixed.clone()]);
            let eq_end = self.backend.mk_func_app(&bool_sort(), SmtFunc::Eq, &[end.clone(), fixed]);
            self.assert_ast(&eq_start);
            self.assert_ast(&eq_end);
            self.bump_addrspace_array(id, &start, &end);
            self.addr_space_data
                .last_mut()
                .unwrap()
                .insert(id, (obj_start_name(id), obj_end_name(id)));
        }
    }

    /// Record `(start, end)` for an object id in the tracking array via a
    /// store chain on each field sub-array.
    pub(crate) fn bump_addrspace_array(&mut self, id: u32, start: &AstRef, end: &AstRef) {
        let arr_type = self.addr_space_arr_type();
        let old = self.current_addr_space_array();
        let n = *self.addr_space_sym_num.last().unwrap() + 1;
        *self.addr_space_sym_num.last_mut().unwrap() = n;
        let new = self.mk_tuple_symbol(&addr_space_arr_name(n), &arr_type);

        let domain_width = self.calculate_array_domain_width(&arr_type);
        let obj_idx = self.machine_uint_const(id as u64);
        let idx = self.fix_array_idx(&obj_idx, domain_width.max(1));
        for (field, value) in [(0usize, start), (1usize, end)] {
            let old_arr = self.tuple_array_project(&old, &arr_type, field);
            let new_arr = self.tuple_array_project(&new, &arr_type, field);
            let sort = old_arr.sort().clone();
            let stored = self.backend.mk_func_app(
                &sort,
                SmtFunc::Store,
                &[old_arr, idx.clone(), value.clone()],
            );
            let eq = self.backend.mk_func_app(&bool_sort(), SmtFunc::Eq, &[new_arr, stored]);
            self.assert_ast(&eq);
        }
    }

    pub(crate) fn get_cur_addrspace_ident(&self) -> String {
        addr_space_arr_name(*self.addr_space_sym_num.last().unwrap())
    }

    fn lookup_obj_id(&self, name: &str) -> Option<u32> {
        self.obj_ids.iter().rev().find_map(|level| level.get(name).copied())
    }

    fn addr_space_entries(&self) -> Vec<(u32, String, String)> {
        let mut entries: Vec<(u32, String, String)> = self
            .addr_space_data
            .iter()
            .flat_map(|level| level.iter().map(|(id, (s, e))| (*id, s.clone(), e.clone())))
            .collect();
        entries.sort_by_key(|(id, _, _)| *id);
        entries
    }

    /// The start address of an object, read from the tracking array.
    fn addr_space_start_of(&mut self, obj: &AstRef) -> AstRef {
        let arr_type = self.addr_space_arr_type();
        let arr = self.current_addr_space_array();
        let start_arr = self.tuple_array_project(&arr, &arr_type, 0);
        let domain_width = self.calculate_array_domain_width(&arr_type);
        let idx = self.fix_array_idx(obj, domain_width.max(1));
        let sort = self.machine_word_sort();
        self.backend.mk_func_app(&sort, SmtFunc::Select, &[start_arr, idx])
    }

    /// Allocate (or reuse) the object id for a named lvalue and build its
    /// pointer tuple. New objects get range symbols, disjointness against
    /// every live object, and a tracking-array bump.
    pub(crate) fn convert_identifier_pointer(
        &mut self,
        name: &str,
        pointee: &Type,
    ) -> Result<AstRef, ConvError> {
        let id = match self.lookup_obj_id(name) {
            Some(id) => id,
            None => {
                let id = *self.obj_id_count.last().unwrap();
                *self.obj_id_count.last_mut().unwrap() = id + 1;
                self.obj_ids.last_mut().unwrap().insert(name.to_string(), id);
                debug!(name, id, "new pointer object");

                // Sizing can fail for dynamically-sized objects; that is a
                // typed failure for the caller, not a silent fallback.
                let pointee = self.resolve_type(pointee);
                let size = match &*pointee {
                    TypeX::Empty => BigInt::from(1u8),
                    _ => layout::type_byte_size(&pointee)?,
                };
                let size = size.to_u64().expect("internal error: object size overflows u64");

                let sort = self.machine_word_sort();
                let start = self.backend.mk_smt_symbol(&obj_start_name(id), &sort);
                let end = self.backend.mk_smt_symbol(&obj_end_name(id), &sort);
                let size_const = self.machine_uint_const(size.saturating_sub(1));
                let end_expect = self.word_add(&start, &size_const);
                let eq_end =
                    self.backend.mk_func_app(&bool_sort(), SmtFunc::Eq, &[end.clone(), end_expect]);
                self.assert_ast(&eq_end);

                // Live objects occupy disjoint ranges.
                for (_, other_start, other_end) in self.addr_space_entries() {
                    let o_start = self.backend.mk_smt_symbol(&other_start, &sort);
                    let o_end = self.backend.mk_smt_symbol(&other_end, &sort);
                    let below =
                        self.word_cmp(SmtFunc::Lt, SmtFunc::BvULt, &end, &o_start);
                    let above =
                        self.word_cmp(SmtFunc::Gt, SmtFunc::BvUGt, &start, &o_end);
                    let disjoint =
                        self.backend.mk_func_app(&bool_sort(), SmtFunc::Or, &[below, above]);
                    self.assert_ast(&disjoint);
                }

                self.bump_addrspace_array(id, &start, &end);
                self.addr_space_data
                    .last_mut()
                    .unwrap()
                    .insert(id, (obj_start_name(id), obj_end_name(id)));
                id
            }
        };

        let ptr_type = self.pointer_struct.clone();
        let ptr = self.mk_tuple_symbol(&format!("&{}", name), &ptr_type);
        let obj_field = self.pointer_object_field(&ptr);
        let off_field = self.pointer_offset_field(&ptr);
        let obj_const = self.machine_uint_const(id as u64);
        let zero = self.machine_uint_const(0);
        let eq_obj = self.backend.mk_func_app(&bool_sort(), SmtFunc::Eq, &[obj_field, obj_const]);
        let eq_off = self.backend.mk_func_app(&bool_sort(), SmtFunc::Eq, &[off_field, zero]);
        self.assert_ast(&eq_obj);
        self.assert_ast(&eq_off);
        Ok(ptr)
    }

    pub(crate) fn convert_addr_of(&mut self, expr: &Expr) -> Result<AstRef, ConvError> {
        let inner = match &expr.x {
            ExprX::AddressOf(inner) => inner,
            _ => unreachable!(),
        };
        match &inner.x {
            ExprX::Symbol(sym) => {
                let name = sym.full_name();
                self.convert_identifier_pointer(&name, &inner.typ)
            }
            ExprX::Index { source, index } => {
                let base = ast_util::mk_address_of(source);
                let base_ptr = self.convert_addr_of(&base)?;
                let elem_size = match &*source.typ {
                    TypeX::Array { subtype, .. } => layout::type_byte_size(subtype)?,
                    _ => panic!("internal error: address of index into {}", source.typ),
                };
                self.offset_pointer(&base_ptr, index, &elem_size)
            }
            ExprX::Member { name, source } => {
                let base = ast_util::mk_address_of(source);
                let base_ptr = self.convert_addr_of(&base)?;
                let off = layout::member_offset(&source.typ, name)?;
                let off_const = ast_util::constant_int(off, self.machine_uint.clone());
                let one = BigInt::from(1u8);
                self.offset_pointer(&base_ptr, &off_const, &one)
            }
            ExprX::If(cond, then, els) => {
                let c = self.convert_ast(cond)?;
                let t = self.convert_addr_of(&ast_util::mk_address_of(then))?;
                let f = self.convert_addr_of(&ast_util::mk_address_of(els))?;
                let ptr_type = self.pointer_struct.clone();
                Ok(self.tuple_ite(&c, &t, &f, &ptr_type))
            }
            _ => panic!("internal error: address of {}", inner.x.kind_name()),
        }
    }

    /// `base` advanced by `index * elem_size` bytes.
    fn offset_pointer(
        &mut self,
        base: &AstRef,
        index: &Expr,
        elem_size: &BigInt,
    ) -> Result<AstRef, ConvError> {
        let idx = self.convert_ast(index)?;
        let word = machine::machine_model().word_width as u64;
        let idx = if self.cfg.int_encoding {
            idx
        } else {
            self.resize_bv(&idx, word, index.typ.is_signed())
        };
        let size =
            self.machine_uint_const(elem_size.to_u64().expect("internal error: element size"));
        let scaled = self.word_mul(&idx, &size);
        let old_off = self.pointer_offset_field(base);
        let new_off = self.word_add(&old_off, &scaled);
        let obj = self.pointer_object_field(base);
        self.make_pointer_value(&obj, &new_off)
    }

    /// A fresh pointer tuple with the given field values.
    fn make_pointer_value(&mut self, obj: &AstRef, off: &AstRef) -> Result<AstRef, ConvError> {
        let ptr_type = self.pointer_struct.clone();
        let result = self.tuple_fresh(&ptr_type);
        let obj_field = self.pointer_object_field(&result);
        let off_field = self.pointer_offset_field(&result);
        let eq_obj =
            self.backend.mk_func_app(&bool_sort(), SmtFunc::Eq, &[obj_field, obj.clone()]);
        let eq_off =
            self.backend.mk_func_app(&bool_sort(), SmtFunc::Eq, &[off_field, off.clone()]);
        self.assert_ast(&eq_obj);
        self.assert_ast(&eq_off);
        Ok(result)
    }

    pub(crate) fn convert_pointer_arith(
        &mut self,
        expr: &Expr,
        a: &Expr,
        b: &Expr,
    ) -> Result<AstRef, ConvError> {
        let a_ptr = matches!(*a.typ, TypeX::Pointer(_));
        let b_ptr = matches!(*b.typ, TypeX::Pointer(_));
        match (&expr.x, a_ptr, b_ptr) {
            // Pointer difference: byte distance scaled by the element size.
            (ExprX::Sub(..), true, true) => {
                let lhs = self.convert_ast(a)?;
                let rhs = self.convert_ast(b)?;
                let la = self.pointer_to_int(&lhs);
                let ra = self.pointer_to_int(&rhs);
                let diff = self.word_sub(&la, &ra);
                let pointee = match &*a.typ {
                    TypeX::Pointer(p) => p.clone(),
                    _ => unreachable!(),
                };
                let elem = match &*pointee {
                    TypeX::Empty => BigInt::from(1u8),
                    _ => layout::type_byte_size(&pointee)?,
                };
                let elem_const = self
                    .machine_uint_const(elem.to_u64().expect("internal error: element size"));
                let func = if self.cfg.int_encoding { SmtFunc::Div } else { SmtFunc::BvSDiv };
                let divided = self.word_func_app(func, &[diff, elem_const]);
                if self.cfg.int_encoding {
                    Ok(divided)
                } else {
                    let w = expr.typ.width().expect("internal error: unsized pointer diff");
                    Ok(self.resize_bv(&divided, w, true))
                }
            }
            (_, true, false) | (_, false, true) => {
                let (ptr_expr, int_expr) = if a_ptr { (a, b) } else { (b, a) };
                let pointee = match &*ptr_expr.typ {
                    TypeX::Pointer(p) => p.clone(),
                    _ => unreachable!(),
                };
                let elem = match &*pointee {
                    TypeX::Empty => BigInt::from(1u8),
                    _ => layout::type_byte_size(&pointee)?,
                };
                let base = self.convert_ast(ptr_expr)?;
                let index = match &expr.x {
                    ExprX::Sub(..) => ast_util::mk_neg(int_expr),
                    _ => int_expr.clone(),
                };
                self.offset_pointer(&base, &index, &elem)
            }
            _ => panic!(
                "internal error: pointer arithmetic {} on two pointers",
                expr.x.kind_name()
            ),
        }
    }

    /// Relational comparison of two pointers: offset order within one
    /// object, address order across objects.
    pub(crate) fn convert_ptr_cmp(
        &mut self,
        expr: &Expr,
        a: &Expr,
        b: &Expr,
    ) -> Result<AstRef, ConvError> {
        let (int_func, bv_func) = match &expr.x {
            ExprX::LessThan(..) => (SmtFunc::Lt, SmtFunc::BvULt),
            ExprX::GreaterThan(..) => (SmtFunc::Gt, SmtFunc::BvUGt),
            ExprX::LessThanEqual(..) => (SmtFunc::LtE, SmtFunc::BvULtE),
            ExprX::GreaterThanEqual(..) => (SmtFunc::GtE, SmtFunc::BvUGtE),
            _ => unreachable!(),
        };
        let lhs = self.convert_ast(a)?;
        let rhs = self.convert_ast(b)?;
        let obj_a = self.pointer_object_field(&lhs);
        let obj_b = self.pointer_object_field(&rhs);
        let off_a = self.pointer_offset_field(&lhs);
        let off_b = self.pointer_offset_field(&rhs);
        let same =
            self.backend.mk_func_app(&bool_sort(), SmtFunc::Eq, &[obj_a, obj_b]);
        let intra = self.word_cmp(int_func, bv_func, &off_a, &off_b);
        let addr_a = self.pointer_to_int(&lhs);
        let addr_b = self.pointer_to_int(&rhs);
        let inter = self.word_cmp(int_func, bv_func, &addr_a, &addr_b);
        Ok(self.backend.mk_func_app(&bool_sort(), SmtFunc::Ite, &[same, intra, inter]))
    }

    pub(crate) fn convert_same_object(&mut self, a: &Expr, b: &Expr) -> Result<AstRef, ConvError> {
        let lhs = self.convert_ast(a)?;
        let rhs = self.convert_ast(b)?;
        let obj_a = self.pointer_object_field(&lhs);
        let obj_b = self.pointer_object_field(&rhs);
        Ok(self.backend.mk_func_app(&bool_sort(), SmtFunc::Eq, &[obj_a, obj_b]))
    }

    /// Membership of the object in the dynamically-allocated set, tracked by
    /// an uninterpreted boolean array.
    pub(crate) fn convert_dynamic_object(&mut self, expr: &Expr) -> Result<AstRef, ConvError> {
        let inner = match &expr.x {
            ExprX::DynamicObject(inner) => inner,
            _ => unreachable!(),
        };
        let ptr = self.convert_ast(inner)?;
        let obj = self.pointer_object_field(&ptr);
        let domain_width = if self.cfg.int_encoding {
            0
        } else {
            machine::machine_model().word_width as u64
        };
        let arr_sort = crate::ast::array_sort(domain_width, bool_sort());
        let arr = self.backend.mk_smt_symbol("__CHECKER_is_dynamic", &arr_sort);
        Ok(self.backend.mk_func_app(&bool_sort(), SmtFunc::Select, &[arr, obj]))
    }

    /// The numeric address of a pointer: object start plus offset.
    pub(crate) fn pointer_to_int(&mut self, ptr: &AstRef) -> AstRef {
        let obj = self.pointer_object_field(ptr);
        let off = self.pointer_offset_field(ptr);
        let start = self.addr_space_start_of(&obj);
        self.word_add(&start, &off)
    }

    /// Decompose an integer into a pointer by matching it against every
    /// live object range; unmatched values map to the invalid object.
    pub(crate) fn int_to_pointer(&mut self, value: &AstRef) -> AstRef {
        let sort = self.machine_word_sort();
        let mut obj = self.machine_uint_const(INVALID_OBJECT as u64);
        let mut off = value.clone();
        for (id, start_name, end_name) in self.addr_space_entries() {
            let start = self.backend.mk_smt_symbol(&start_name, &sort);
            let end = self.backend.mk_smt_symbol(&end_name, &sort);
            let ge = self.word_cmp(SmtFunc::GtE, SmtFunc::BvUGtE, value, &start);
            let le = self.word_cmp(SmtFunc::LtE, SmtFunc::BvULtE, value, &end);
            let within = self.backend.mk_func_app(&bool_sort(), SmtFunc::And, &[ge, le]);
            let id_const = self.machine_uint_const(id as u64);
            let delta = self.word_sub(value, &start);
            obj = self.backend.mk_func_app(
                &sort,
                SmtFunc::Ite,
                &[within.clone(), id_const, obj],
            );
            off = self.backend.mk_func_app(&sort, SmtFunc::Ite, &[within, delta, off]);
        }
        self.make_pointer_value(&obj, &off)
            .expect("internal error: pointer composition cannot fail")
    }
}
