//! Typecast flattening: bool bridging, bitvector resizing, fixed-point
//! alignment, pointer/int composition and layout-compatible struct casts.

use crate::ast::{bool_sort, AstRef, SmtFunc, SortX};
use crate::convert::{ConvError, Converter};
use cir::ast::{Expr, ExprX, Type, TypeX};
use num_bigint::BigInt;

fn fixedbv_parts(t: &Type) -> (u64, u64) {
    match &**t {
        TypeX::FixedBv { width, integer_bits } => {
            (*width as u64, (*width - *integer_bits) as u64)
        }
        _ => panic!("internal error: {} is not a fixedbv", t),
    }
}

impl Converter {
    /// concat(0…0, a)
    pub(crate) fn convert_zero_ext(&mut self, a: &AstRef, topwidth: u64) -> AstRef {
        let zeros = self.backend.mk_smt_bvint(&BigInt::from(0u8), false, topwidth);
        let sort = crate::ast::bv_sort(self.bv_width(a) + topwidth);
        self.backend.mk_func_app(&sort, SmtFunc::Concat, &[zeros, a.clone()])
    }

    /// concat(ite(topbit, 1…1, 0…0), a)
    pub(crate) fn convert_sign_ext(&mut self, a: &AstRef, topwidth: u64) -> AstRef {
        let width = self.bv_width(a);
        let bit_sort = crate::ast::bv_sort(1);
        let topbit = self.backend.mk_extract(a, width - 1, width - 1, &bit_sort);
        let one_bit = self.backend.mk_smt_bvint(&BigInt::from(1u8), false, 1);
        let is_neg = self.backend.mk_func_app(&bool_sort(), SmtFunc::Eq, &[topbit, one_bit]);
        let ones_value = (BigInt::from(1u8) << topwidth) - 1;
        let ones = self.backend.mk_smt_bvint(&ones_value, false, topwidth);
        let zeros = self.backend.mk_smt_bvint(&BigInt::from(0u8), false, topwidth);
        let pad_sort = crate::ast::bv_sort(topwidth);
        let pad = self.backend.mk_func_app(&pad_sort, SmtFunc::Ite, &[is_neg, ones, zeros]);
        let sort = crate::ast::bv_sort(width + topwidth);
        self.backend.mk_func_app(&sort, SmtFunc::Concat, &[pad, a.clone()])
    }

    /// Bring a bitvector to `to_width`, extending per `signed` or
    /// truncating low bits.
    pub(crate) fn resize_bv(&mut self, a: &AstRef, to_width: u64, signed: bool) -> AstRef {
        let width = self.bv_width(a);
        if width == to_width {
            a.clone()
        } else if width > to_width {
            let sort = crate::ast::bv_sort(to_width);
            self.backend.mk_extract(a, to_width - 1, 0, &sort)
        } else if signed {
            self.convert_sign_ext(a, to_width - width)
        } else {
            self.convert_zero_ext(a, to_width - width)
        }
    }

    pub(crate) fn convert_typecast(&mut self, expr: &Expr) -> Result<AstRef, ConvError> {
        let from = match &expr.x {
            ExprX::Typecast(from) => from,
            _ => unreachable!(),
        };
        let to_type = &expr.typ;

        match (&*from.typ, &**to_type) {
            // --- to bool ---------------------------------------------------
            (TypeX::Bool, TypeX::Bool) => self.convert_ast(from),
            (TypeX::Pointer(_), TypeX::Bool) => {
                let ptr = self.convert_ast(from)?;
                let obj = self.pointer_object_field(&ptr);
                let off = self.pointer_offset_field(&ptr);
                let zero = self.machine_uint_const(0);
                let obj_null =
                    self.backend.mk_func_app(&bool_sort(), SmtFunc::Eq, &[obj, zero.clone()]);
                let off_null = self.backend.mk_func_app(&bool_sort(), SmtFunc::Eq, &[off, zero]);
                let is_null =
                    self.backend.mk_func_app(&bool_sort(), SmtFunc::And, &[obj_null, off_null]);
                Ok(self.invert_ast(&is_null))
            }
            (_, TypeX::Bool) => {
                let v = self.convert_ast(from)?;
                let zero = if self.cfg.int_encoding {
                    self.backend.mk_smt_int(&BigInt::from(0u8))
                } else {
                    let w = self.bv_width(&v);
                    self.backend.mk_smt_bvint(&BigInt::from(0u8), false, w)
                };
                let eq = self.backend.mk_func_app(&bool_sort(), SmtFunc::Eq, &[v, zero]);
                Ok(self.invert_ast(&eq))
            }

            // --- from bool -------------------------------------------------
            (TypeX::Bool, _) => {
                let b = self.convert_ast(from)?;
                let (one, zero) = if self.cfg.int_encoding {
                    (
                        self.backend.mk_smt_int(&BigInt::from(1u8)),
                        self.backend.mk_smt_int(&BigInt::from(0u8)),
                    )
                } else {
                    let w = to_type.width().expect("internal error: unsized cast target");
                    (
                        self.backend.mk_smt_bvint(&BigInt::from(1u8), false, w),
                        self.backend.mk_smt_bvint(&BigInt::from(0u8), false, w),
                    )
                };
                let sort = one.sort().clone();
                Ok(self.backend.mk_func_app(&sort, SmtFunc::Ite, &[b, one, zero]))
            }

            // --- pointer casts --------------------------------------------
            (TypeX::Pointer(_), TypeX::Pointer(_)) => self.convert_ast(from),
            (TypeX::Pointer(_), TypeX::UnsignedBv(_) | TypeX::SignedBv(_)) => {
                let ptr = self.convert_ast(from)?;
                let as_int = self.pointer_to_int(&ptr);
                if self.cfg.int_encoding {
                    Ok(as_int)
                } else {
                    let w = to_type.width().unwrap();
                    let signed = to_type.is_signed();
                    Ok(self.resize_bv(&as_int, w, signed))
                }
            }
            (TypeX::UnsignedBv(_) | TypeX::SignedBv(_), TypeX::Pointer(_)) => {
                let v = self.convert_ast(from)?;
                let word = cir::machine::machine_model().word_width as u64;
                let v = if self.cfg.int_encoding {
                    v
                } else {
                    self.resize_bv(&v, word, false)
                };
                Ok(self.int_to_pointer(&v))
            }

            // --- integer <-> integer --------------------------------------
            (
                TypeX::UnsignedBv(_) | TypeX::SignedBv(_),
                TypeX::UnsignedBv(w) | TypeX::SignedBv(w),
            ) => {
                let v = self.convert_ast(from)?;
                if self.cfg.int_encoding {
                    Ok(v)
                } else {
                    Ok(self.resize_bv(&v, *w as u64, from.typ.is_signed()))
                }
            }

            // --- fixed-point ----------------------------------------------
            (TypeX::FixedBv { .. }, TypeX::FixedBv { .. }) => {
                let v = self.convert_ast(from)?;
                if self.cfg.int_encoding {
                    return Ok(v);
                }
                let (_, from_frac) = fixedbv_parts(&from.typ);
                let (to_width, to_frac) = fixedbv_parts(to_type);
                let aligned = if to_frac > from_frac {
                    let zeros = self
                        .backend
                        .mk_smt_bvint(&BigInt::from(0u8), false, to_frac - from_frac);
                    let sort = crate::ast::bv_sort(self.bv_width(&v) + to_frac - from_frac);
                    self.backend.mk_func_app(&sort, SmtFunc::Concat, &[v, zeros])
                } else if to_frac < from_frac {
                    let w = self.bv_width(&v);
                    let sort = crate::ast::bv_sort(w - (from_frac - to_frac));
                    self.backend.mk_extract(&v, w - 1, from_frac - to_frac, &sort)
                } else {
                    v
                };
                Ok(self.resize_bv(&aligned, to_width, true))
            }
            (TypeX::UnsignedBv(_) | TypeX::SignedBv(_), TypeX::FixedBv { .. }) => {
                let v = self.convert_ast(from)?;
                if self.cfg.int_encoding {
                    let sort = std::sync::Arc::new(SortX::Real);
                    return Ok(self.backend.mk_func_app(&sort, SmtFunc::Int2Real, &[v]));
                }
                let (to_width, to_frac) = fixedbv_parts(to_type);
                let int_bits = to_width - to_frac;
                let resized = self.resize_bv(&v, int_bits, from.typ.is_signed());
                if to_frac == 0 {
                    Ok(resized)
                } else {
                    let zeros = self.backend.mk_smt_bvint(&BigInt::from(0u8), false, to_frac);
                    let sort = crate::ast::bv_sort(to_width);
                    Ok(self.backend.mk_func_app(&sort, SmtFunc::Concat, &[resized, zeros]))
                }
            }
            (TypeX::FixedBv { .. }, TypeX::UnsignedBv(w) | TypeX::SignedBv(w)) => {
                let v = self.convert_ast(from)?;
                if self.cfg.int_encoding {
                    let sort = crate::ast::int_sort();
                    return Ok(self.backend.mk_func_app(&sort, SmtFunc::Real2Int, &[v]));
                }
                let (from_width, from_frac) = fixedbv_parts(&from.typ);
                let integral = if from_frac == 0 {
                    v
                } else {
                    let sort = crate::ast::bv_sort(from_width - from_frac);
                    self.backend.mk_extract(&v, from_width - 1, from_frac, &sort)
                };
                Ok(self.resize_bv(&integral, *w as u64, true))
            }

            // --- structs ---------------------------------------------------
            (TypeX::Struct(from_def), TypeX::Struct(to_def)) => {
                assert!(
                    from_def.members == to_def.members,
                    "internal error: cast between layout-incompatible structs {} and {}",
                    from.typ,
                    to_type
                );
                let src = self.convert_ast(from)?;
                let fresh = self.tuple_fresh(to_type);
                let (_, def) = self.get_type_def(to_type);
                for i in 0..def.members.len() {
                    let sf = self.tuple_project(&src, &from.typ, i);
                    let tf = self.tuple_project(&fresh, to_type, i);
                    let eq = self.field_equality(&tf, &sf, &def.members[i]);
                    self.assert_ast(&eq);
                }
                Ok(fresh)
            }

            _ => panic!(
                "internal error: unsupported typecast {} -> {}",
                from.typ, to_type
            ),
        }
    }
}
