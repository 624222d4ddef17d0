//! Byte-granular memory operations.
//!
//! Sources flatten to a single bitvector (structs field by field, arrays as
//! a concat of selects) and the byte is carved out with extract, or spliced
//! back in with concat / mask arithmetic for symbolic offsets. Big-endian
//! mode flips byte indices around the object size.

use crate::ast::{AstRef, SmtFunc, SortX};
use crate::convert::{ConvError, Converter};
use cir::ast::{Expr, ExprX, Type, TypeX, Typed};
use cir::ast_util;
use num_bigint::BigInt;
use num_traits::ToPrimitive;

impl Converter {
    fn concat(&mut self, high: &AstRef, low: &AstRef) -> AstRef {
        let width = self.bv_width(high) + self.bv_width(low);
        let sort = crate::ast::bv_sort(width);
        self.backend.mk_func_app(&sort, SmtFunc::Concat, &[high.clone(), low.clone()])
    }

    /// Flatten a value to one bitvector, first member / element in the low
    /// bits.
    pub(crate) fn flatten_expr_to_bv(&mut self, expr: &Expr) -> Result<AstRef, ConvError> {
        let ast = self.convert_ast(expr)?;
        self.flatten_ast_to_bv(&ast, &expr.typ)
    }

    pub(crate) fn flatten_ast_to_bv(
        &mut self,
        ast: &AstRef,
        typ: &Type,
    ) -> Result<AstRef, ConvError> {
        assert!(!self.cfg.int_encoding, "internal error: byte-level operation in integer encoding");
        match &**typ {
            TypeX::UnsignedBv(_) | TypeX::SignedBv(_) | TypeX::FixedBv { .. } => Ok(ast.clone()),
            TypeX::Bool => Ok(self.make_bool_bit(ast)),
            TypeX::Struct(d) => {
                let mut acc: Option<AstRef> = None;
                for i in 0..d.members.len() {
                    let field = self.tuple_project(ast, typ, i);
                    let flat = self.flatten_ast_to_bv(&field, &d.members[i].clone())?;
                    acc = Some(match acc {
                        None => flat,
                        Some(low) => self.concat(&flat, &low),
                    });
                }
                Ok(acc.unwrap_or_else(|| {
                    panic!("internal error: flattening empty struct {}", typ)
                }))
            }
            TypeX::Array { subtype, .. } => {
                let n = typ.width()? / subtype.width()?;
                let domain_width = match &**ast.sort() {
                    SortX::Array { domain_width, .. } => *domain_width,
                    _ => panic!("internal error: array value of sort {:?}", ast.sort()),
                };
                let mut acc: Option<AstRef> = None;
                for i in 0..n {
                    let idx = self.backend.mk_smt_bvint(&BigInt::from(i), false, domain_width);
                    let range = match &**ast.sort() {
                        SortX::Array { range, .. } => range.clone(),
                        _ => unreachable!(),
                    };
                    let elem = self.backend.mk_func_app(
                        &range,
                        SmtFunc::Select,
                        &[ast.clone(), idx],
                    );
                    let flat = self.flatten_ast_to_bv(&elem, subtype)?;
                    acc = Some(match acc {
                        None => flat,
                        Some(low) => self.concat(&flat, &low),
                    });
                }
                Ok(acc
                    .unwrap_or_else(|| panic!("internal error: flattening empty array {}", typ)))
            }
            _ => panic!("internal error: cannot flatten {} to a bitvector", typ),
        }
    }

    pub(crate) fn convert_byte_extract(&mut self, expr: &Expr) -> Result<AstRef, ConvError> {
        let (big_endian, source, offset) = match &expr.x {
            ExprX::ByteExtract { big_endian, source, offset } => (*big_endian, source, offset),
            _ => unreachable!(),
        };
        let src = self.flatten_expr_to_bv(source)?;
        let total = self.bv_width(&src);
        assert!(total % 8 == 0, "internal error: byte extract from {}-bit object", total);
        let bytes = total / 8;
        match ast_util::as_constant_u64(offset) {
            Some(k) => {
                assert!(k < bytes, "internal error: byte extract offset {} of {} bytes", k, bytes);
                let byte = if big_endian { bytes - 1 - k } else { k };
                let sort = crate::ast::bv_sort(8);
                Ok(self.backend.mk_extract(&src, 8 * byte + 7, 8 * byte, &sort))
            }
            None => {
                let off = self.convert_ast(offset)?;
                let off = self.resize_bv(&off, total, false);
                let off = if big_endian {
                    let top =
                        self.backend.mk_smt_bvint(&BigInt::from(bytes - 1), false, total);
                    let sort = crate::ast::bv_sort(total);
                    self.backend.mk_func_app(&sort, SmtFunc::BvSub, &[top, off])
                } else {
                    off
                };
                let eight = self.backend.mk_smt_bvint(&BigInt::from(8u8), false, total);
                let sort = crate::ast::bv_sort(total);
                let shift = self.backend.mk_func_app(&sort, SmtFunc::BvMul, &[off, eight]);
                let shifted = self.backend.mk_func_app(&sort, SmtFunc::BvLShr, &[src, shift]);
                let byte_sort = crate::ast::bv_sort(8);
                Ok(self.backend.mk_extract(&shifted, 7, 0, &byte_sort))
            }
        }
    }

    pub(crate) fn convert_byte_update(&mut self, expr: &Expr) -> Result<AstRef, ConvError> {
        let (big_endian, source, offset, value) = match &expr.x {
            ExprX::ByteUpdate { big_endian, source, offset, value } => {
                (*big_endian, source, offset, value)
            }
            _ => unreachable!(),
        };
        // Structured sources: delegate the update into the member holding
        // the byte, then rebuild the tuple around it.
        if let TypeX::Struct(d) = &*source.typ {
            let k = match ast_util::as_constant_u64(offset) {
                Some(k) => k,
                None => panic!(
                    "internal error: symbolic byte update into structured type {}",
                    source.typ
                ),
            };
            let mut member_start = 0u64;
            for (i, (mname, mtype)) in d.member_names.iter().zip(d.members.iter()).enumerate() {
                let msize = cir::layout::type_byte_size(mtype)?
                    .to_u64()
                    .expect("internal error: member size overflows u64");
                if k < member_start + msize {
                    let member = ast_util::mk_member(source, mname);
                    let inner_off =
                        ast_util::constant_int(k - member_start, offset.typ.clone());
                    let updated = Typed::new(
                        mtype.clone(),
                        ExprX::ByteUpdate {
                            big_endian,
                            source: member,
                            offset: inner_off,
                            value: value.clone(),
                        },
                    );
                    let src = self.convert_ast(source)?;
                    let val = self.convert_ast(&updated)?;
                    return Ok(self.tuple_update(&src, &source.typ, i, &val));
                }
                member_start += msize;
            }
            panic!("internal error: byte update offset {} outside {}", k, source.typ);
        }

        let src = self.flatten_expr_to_bv(source)?;
        let val = self.convert_ast(value)?;
        assert_eq!(self.bv_width(&val), 8, "internal error: byte update value width");
        let total = self.bv_width(&src);
        assert!(total % 8 == 0, "internal error: byte update into {}-bit object", total);
        let bytes = total / 8;
        match ast_util::as_constant_u64(offset) {
            Some(k) => {
                assert!(k < bytes, "internal error: byte update offset {} of {} bytes", k, bytes);
                let byte = if big_endian { bytes - 1 - k } else { k };
                let mut pieces: Vec<AstRef> = Vec::new();
                if byte + 1 < bytes {
                    let sort = crate::ast::bv_sort(total - 8 * (byte + 1));
                    pieces.push(self.backend.mk_extract(&src, total - 1, 8 * (byte + 1), &sort));
                }
                pieces.push(val);
                if byte > 0 {
                    let sort = crate::ast::bv_sort(8 * byte);
                    pieces.push(self.backend.mk_extract(&src, 8 * byte - 1, 0, &sort));
                }
                let mut acc = pieces.pop().unwrap();
                while let Some(high) = pieces.pop() {
                    acc = self.concat(&high, &acc);
                }
                Ok(acc)
            }
            None => {
                // (src & ~(0xff << 8*off)) | (zext(value) << 8*off)
                let off = self.convert_ast(offset)?;
                let off = self.resize_bv(&off, total, false);
                let off = if big_endian {
                    let top =
                        self.backend.mk_smt_bvint(&BigInt::from(bytes - 1), false, total);
                    let sort = crate::ast::bv_sort(total);
                    self.backend.mk_func_app(&sort, SmtFunc::BvSub, &[top, off])
                } else {
                    off
                };
                let sort = crate::ast::bv_sort(total);
                let eight = self.backend.mk_smt_bvint(&BigInt::from(8u8), false, total);
                let shift = self.backend.mk_func_app(&sort, SmtFunc::BvMul, &[off, eight]);
                let ff = self.backend.mk_smt_bvint(&BigInt::from(0xffu8), false, total);
                let mask =
                    self.backend.mk_func_app(&sort, SmtFunc::BvShl, &[ff, shift.clone()]);
                let inv_mask = self.backend.mk_func_app(&sort, SmtFunc::BvNot, &[mask]);
                let cleared = self.backend.mk_func_app(&sort, SmtFunc::BvAnd, &[src, inv_mask]);
                let val_wide = self.resize_bv(&val, total, false);
                let inserted =
                    self.backend.mk_func_app(&sort, SmtFunc::BvShl, &[val_wide, shift]);
                Ok(self.backend.mk_func_app(&sort, SmtFunc::BvOr, &[cleared, inserted]))
            }
        }
    }
}
