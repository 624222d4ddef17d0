//! Array conversion: select/store, member and with dispatch, constant
//! arrays, and the free-array fallback for solvers that cannot initialize
//! unbounded arrays.

use crate::ast::{AstRef, SmtFunc, SortX};
use crate::convert::{ConvError, Converter};
use cir::ast::{Expr, ExprX, Type, TypeX};
use cir::ast_util;
use cir::machine;
use num_bigint::BigInt;
use std::sync::Arc;

impl Converter {
    /// Bit width of the index domain: ceil(log2(size)) with a one-bit
    /// minimum; unbounded and dynamically-sized arrays index at machine
    /// word width. The integer encoding uses width 0, denoting an Int
    /// domain.
    pub(crate) fn calculate_array_domain_width(&self, typ: &Type) -> u64 {
        if self.cfg.int_encoding {
            return 0;
        }
        let size = match &**typ {
            TypeX::Array { size, .. } => size,
            TypeX::Str(n) => {
                return size_to_bit_width(*n as u64 + 1);
            }
            _ => panic!("internal error: domain width of {}", typ),
        };
        match size.as_ref().and_then(|s| ast_util::as_constant_u64(s)) {
            Some(n) => size_to_bit_width(n),
            None => machine::machine_model().word_width as u64,
        }
    }

    /// Resize a converted index to the array's domain width.
    pub(crate) fn fix_array_idx(&mut self, idx: &AstRef, domain_width: u64) -> AstRef {
        if self.cfg.int_encoding {
            return idx.clone();
        }
        let width = self.bv_width(idx);
        if width == domain_width {
            idx.clone()
        } else if width > domain_width {
            let sort = crate::ast::bv_sort(domain_width);
            self.backend.mk_extract(idx, domain_width - 1, 0, &sort)
        } else {
            self.convert_zero_ext(idx, domain_width - width)
        }
    }

    pub(crate) fn convert_member(&mut self, expr: &Expr) -> Result<AstRef, ConvError> {
        let (name, source) = match &expr.x {
            ExprX::Member { name, source } => (name, source),
            _ => unreachable!(),
        };
        let (_, def) = self.get_type_def(&source.typ);
        let idx = match def.member(name) {
            Some((i, _)) => i,
            None => panic!("internal error: member {} not in {}", name, source.typ),
        };
        let src = self.convert_ast(source)?;
        Ok(self.tuple_project(&src, &source.typ, idx))
    }

    pub(crate) fn convert_index(&mut self, expr: &Expr) -> Result<AstRef, ConvError> {
        let (source, index) = match &expr.x {
            ExprX::Index { source, index } => (source, index),
            _ => unreachable!(),
        };
        let src = self.convert_ast(source)?;
        let idx = self.convert_ast(index)?;
        if self.is_tuple_array_type(&source.typ) {
            let domain_width = self.calculate_array_domain_width(&source.typ);
            let idx = self.fix_array_idx(&idx, domain_width);
            return Ok(self.tuple_array_select(&src, &source.typ, &idx));
        }
        let (domain_width, range) = match &**src.sort() {
            SortX::Array { domain_width, range } => (*domain_width, range.clone()),
            _ => panic!("internal error: index into sort {:?}", src.sort()),
        };
        let idx = self.fix_array_idx(&idx, domain_width);
        self.apply_lazy_default(&src, &idx);
        let selected = self.backend.mk_func_app(&range, SmtFunc::Select, &[src, idx]);
        // Bridge flattened boolean ranges back to Bool.
        if *expr.typ == TypeX::Bool && !range.is_bool() {
            Ok(self.make_bit_bool(&selected))
        } else {
            Ok(selected)
        }
    }

    pub(crate) fn convert_with(&mut self, expr: &Expr) -> Result<AstRef, ConvError> {
        let (source, field, value) = match &expr.x {
            ExprX::With { source, field, value } => (source, field, value),
            _ => unreachable!(),
        };
        match &*source.typ {
            TypeX::Struct(_) | TypeX::Union(_) | TypeX::Pointer(_) => {
                let name = match &field.x {
                    ExprX::ConstantString(name) => name.clone(),
                    _ => panic!(
                        "internal error: with-field on {} is {}",
                        source.typ,
                        field.x.kind_name()
                    ),
                };
                let (_, def) = self.get_type_def(&source.typ);
                let idx = match def.member(&name) {
                    Some((i, _)) => i,
                    None => panic!("internal error: member {} not in {}", name, source.typ),
                };
                let src = self.convert_ast(source)?;
                let val = self.convert_ast(value)?;
                Ok(self.tuple_update(&src, &source.typ, idx, &val))
            }
            TypeX::Array { .. } => {
                let src = self.convert_ast(source)?;
                let idx = self.convert_ast(field)?;
                let domain_width = self.calculate_array_domain_width(&source.typ);
                let idx = self.fix_array_idx(&idx, domain_width);
                if self.is_tuple_array_type(&source.typ) {
                    let val = self.convert_ast(value)?;
                    return Ok(self.tuple_array_update(&src, &source.typ, &idx, &val));
                }
                let mut val = self.convert_ast(value)?;
                let range = match &**src.sort() {
                    SortX::Array { range, .. } => range.clone(),
                    _ => panic!("internal error: with on sort {:?}", src.sort()),
                };
                if val.sort().is_bool() && !range.is_bool() {
                    val = self.make_bool_bit(&val);
                }
                let sort = src.sort().clone();
                Ok(self.backend.mk_func_app(&sort, SmtFunc::Store, &[src, idx, val]))
            }
            _ => panic!("internal error: with on {}", source.typ),
        }
    }

    /// Constant arrays and `array_of` initializers.
    pub(crate) fn array_create(&mut self, expr: &Expr) -> Result<AstRef, ConvError> {
        match &expr.x {
            ExprX::ConstantArrayOf(init) => {
                if self.is_tuple_type(&init.typ) {
                    let array_type = expr.typ.clone();
                    return self.tuple_array_of(init, &array_type);
                }
                let domain_width = self.calculate_array_domain_width(&expr.typ);
                let mut val = self.convert_ast(init)?;
                if val.sort().is_bool() && !self.cfg.allow_bool_in_array_range {
                    val = self.make_bool_bit(&val);
                }
                Ok(self.mk_array_of_ast(&val, domain_width))
            }
            ExprX::ConstantArray(elems) => {
                let sort = self.convert_sort(&expr.typ);
                let name = self.mk_fresh_name("array_create");
                let arr = self.backend.mk_smt_symbol(&name, &sort);
                let domain_width = sort.domain_width();
                let range = match &*sort {
                    SortX::Array { range, .. } => range.clone(),
                    _ => unreachable!(),
                };
                for (i, elem) in elems.iter().enumerate() {
                    let mut val = self.convert_ast(elem)?;
                    if val.sort().is_bool() && !range.is_bool() {
                        val = self.make_bool_bit(&val);
                    }
                    let idx = if self.cfg.int_encoding {
                        self.backend.mk_smt_int(&BigInt::from(i))
                    } else {
                        self.backend.mk_smt_bvint(&BigInt::from(i), false, domain_width.max(1))
                    };
                    let cell = self.backend.mk_func_app(
                        &range,
                        SmtFunc::Select,
                        &[arr.clone(), idx],
                    );
                    let eq = self.backend.mk_func_app(
                        &crate::ast::bool_sort(),
                        SmtFunc::Eq,
                        &[cell, val],
                    );
                    self.assert_ast(&eq);
                }
                Ok(arr)
            }
            _ => panic!("internal error: array_create of {}", expr.x.kind_name()),
        }
    }

    /// A constant array in the solver, or a free array with a recorded
    /// default when the solver cannot initialize unbounded arrays; the
    /// default is asserted lazily per touched cell.
    pub(crate) fn mk_array_of_ast(&mut self, value: &AstRef, domain_width: u64) -> AstRef {
        if self.cfg.can_init_infinite_arrays {
            self.backend.mk_array_of(value, domain_width)
        } else {
            let sort = crate::ast::array_sort(domain_width, value.sort().clone());
            let name = self.mk_fresh_name("array_of");
            let arr = self.backend.mk_smt_symbol(&name, &sort);
            self.lazy_array_defaults.push((arr.clone(), value.clone()));
            arr
        }
    }

    /// If `src` is a free array standing in for a constant one, pin the
    /// selected cell to the default.
    pub(crate) fn apply_lazy_default(&mut self, src: &AstRef, idx: &AstRef) {
        let found = self
            .lazy_array_defaults
            .iter()
            .find(|(arr, _)| Arc::ptr_eq(arr, src))
            .map(|(_, default)| default.clone());
        if let Some(default) = found {
            let range = default.sort().clone();
            let cell = self.backend.mk_func_app(
                &range,
                SmtFunc::Select,
                &[src.clone(), idx.clone()],
            );
            let eq = self.backend.mk_func_app(
                &crate::ast::bool_sort(),
                SmtFunc::Eq,
                &[cell, default],
            );
            self.assert_ast(&eq);
        }
    }
}

pub(crate) fn size_to_bit_width(n: u64) -> u64 {
    let mut width = 1;
    while (1u64 << width) < n {
        width += 1;
    }
    width
}
