//! Overflow predicate flattening: the canonical bitvector formulas for
//! add/sub/mul overflow, cast-range checks, and negation of the minimum
//! value.

use crate::ast::{bool_sort, AstRef, SmtFunc};
use crate::convert::{ConvError, Converter};
use cir::ast::{Expr, ExprX};
use num_bigint::BigInt;

impl Converter {
    fn sign_bit(&mut self, a: &AstRef) -> AstRef {
        let w = self.bv_width(a);
        let sort = crate::ast::bv_sort(1);
        self.backend.mk_extract(a, w - 1, w - 1, &sort)
    }

    fn bits_eq(&mut self, a: &AstRef, b: &AstRef) -> AstRef {
        self.backend.mk_func_app(&bool_sort(), SmtFunc::Eq, &[a.clone(), b.clone()])
    }

    /// `overflow(add|sub|mul)`: true iff the operation wraps at the operand
    /// width and signedness.
    pub(crate) fn overflow_arith(&mut self, expr: &Expr) -> Result<AstRef, ConvError> {
        assert!(!self.cfg.int_encoding, "internal error: overflow check in integer encoding");
        let op = match &expr.x {
            ExprX::Overflow(op) => op,
            _ => unreachable!(),
        };
        let (lhs_e, rhs_e) = match &op.x {
            ExprX::Add(a, b) | ExprX::Sub(a, b) | ExprX::Mul(a, b) => (a, b),
            _ => panic!("internal error: overflow of {}", op.x.kind_name()),
        };
        let signed = lhs_e.typ.is_signed();
        let a = self.convert_ast(lhs_e)?;
        let b = self.convert_ast(rhs_e)?;
        let result = self.convert_ast(op)?;
        let w = self.bv_width(&a);

        match (&op.x, signed) {
            // Signed add: operands agree in sign, result does not.
            (ExprX::Add(..), true) => {
                let sa = self.sign_bit(&a);
                let sb = self.sign_bit(&b);
                let sr = self.sign_bit(&result);
                let same_in = self.bits_eq(&sa, &sb);
                let flipped = {
                    let eq = self.bits_eq(&sa, &sr);
                    self.invert_ast(&eq)
                };
                Ok(self.backend.mk_func_app(&bool_sort(), SmtFunc::And, &[same_in, flipped]))
            }
            // Unsigned add: wrapped iff the result dropped below an operand.
            (ExprX::Add(..), false) => {
                Ok(self.backend.mk_func_app(&bool_sort(), SmtFunc::BvULt, &[result, a]))
            }
            // Signed sub: operands differ in sign and the result leaves the
            // minuend's sign.
            (ExprX::Sub(..), true) => {
                let sa = self.sign_bit(&a);
                let sb = self.sign_bit(&b);
                let sr = self.sign_bit(&result);
                let differ = {
                    let eq = self.bits_eq(&sa, &sb);
                    self.invert_ast(&eq)
                };
                let flipped = {
                    let eq = self.bits_eq(&sa, &sr);
                    self.invert_ast(&eq)
                };
                Ok(self.backend.mk_func_app(&bool_sort(), SmtFunc::And, &[differ, flipped]))
            }
            // Unsigned sub: wrapped iff the subtrahend exceeds the minuend.
            (ExprX::Sub(..), false) => {
                Ok(self.backend.mk_func_app(&bool_sort(), SmtFunc::BvUGt, &[b, a]))
            }
            // Mul: multiply at double width and require the high half to be
            // the sign replication (signed) or zero (unsigned).
            (ExprX::Mul(..), _) => {
                let wide_sort = crate::ast::bv_sort(2 * w);
                let wa = if signed {
                    self.convert_sign_ext(&a, w)
                } else {
                    self.convert_zero_ext(&a, w)
                };
                let wb = if signed {
                    self.convert_sign_ext(&b, w)
                } else {
                    self.convert_zero_ext(&b, w)
                };
                let product = self.backend.mk_func_app(&wide_sort, SmtFunc::BvMul, &[wa, wb]);
                if signed {
                    // High half plus the top result bit must be all ones or
                    // all zeros.
                    let top_sort = crate::ast::bv_sort(w + 1);
                    let top = self.backend.mk_extract(&product, 2 * w - 1, w - 1, &top_sort);
                    let zeros = self.backend.mk_smt_bvint(&BigInt::from(0u8), false, w + 1);
                    let ones_val = (BigInt::from(1u8) << (w + 1)) - 1;
                    let ones = self.backend.mk_smt_bvint(&ones_val, false, w + 1);
                    let is_zeros = self.bits_eq(&top, &zeros);
                    let is_ones = self.bits_eq(&top, &ones);
                    let fits =
                        self.backend.mk_func_app(&bool_sort(), SmtFunc::Or, &[is_zeros, is_ones]);
                    Ok(self.invert_ast(&fits))
                } else {
                    let high_sort = crate::ast::bv_sort(w);
                    let high = self.backend.mk_extract(&product, 2 * w - 1, w, &high_sort);
                    let zeros = self.backend.mk_smt_bvint(&BigInt::from(0u8), false, w);
                    let fits = self.bits_eq(&high, &zeros);
                    Ok(self.invert_ast(&fits))
                }
            }
            _ => unreachable!(),
        }
    }

    /// `overflow_cast(n)`: the value does not fit in `n` bits.
    pub(crate) fn overflow_cast(&mut self, expr: &Expr) -> Result<AstRef, ConvError> {
        assert!(!self.cfg.int_encoding, "internal error: overflow check in integer encoding");
        let (bits, operand) = match &expr.x {
            ExprX::OverflowCast { bits, operand } => (*bits as u64, operand),
            _ => unreachable!(),
        };
        let a = self.convert_ast(operand)?;
        let w = self.bv_width(&a);
        assert!(bits >= 1 && bits <= w, "internal error: overflow_cast to {} bits of {}", bits, w);
        if bits == w {
            return Ok(self.backend.mk_smt_bool(false));
        }
        let signed = operand.typ.is_signed();
        if signed {
            let lo = -(BigInt::from(1u8) << (bits - 1));
            let hi = (BigInt::from(1u8) << (bits - 1)) - 1;
            let lo_c = self.backend.mk_smt_bvint(&lo, true, w);
            let hi_c = self.backend.mk_smt_bvint(&hi, true, w);
            let below =
                self.backend.mk_func_app(&bool_sort(), SmtFunc::BvSLt, &[a.clone(), lo_c]);
            let above = self.backend.mk_func_app(&bool_sort(), SmtFunc::BvSGt, &[a, hi_c]);
            Ok(self.backend.mk_func_app(&bool_sort(), SmtFunc::Or, &[below, above]))
        } else {
            let hi = (BigInt::from(1u8) << bits) - 1;
            let hi_c = self.backend.mk_smt_bvint(&hi, false, w);
            Ok(self.backend.mk_func_app(&bool_sort(), SmtFunc::BvUGt, &[a, hi_c]))
        }
    }

    /// `overflow_neg`: negation wraps only for the minimum signed value.
    pub(crate) fn overflow_neg(&mut self, expr: &Expr) -> Result<AstRef, ConvError> {
        assert!(!self.cfg.int_encoding, "internal error: overflow check in integer encoding");
        let operand = match &expr.x {
            ExprX::OverflowNeg(operand) => operand,
            _ => unreachable!(),
        };
        let a = self.convert_ast(operand)?;
        if !operand.typ.is_signed() {
            return Ok(self.backend.mk_smt_bool(false));
        }
        let w = self.bv_width(&a);
        let min = -(BigInt::from(1u8) << (w - 1));
        let min_c = self.backend.mk_smt_bvint(&min, true, w);
        Ok(self.backend.mk_func_app(&bool_sort(), SmtFunc::Eq, &[a, min_c]))
    }
}
