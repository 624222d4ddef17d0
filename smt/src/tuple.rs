//! Tuple flattening by symbol prefix.
//!
//! Without native solver tuples, a tuple-sorted value is a family of scalar
//! solver symbols sharing a name prefix: field `f` of `v` is the solver
//! symbol `v.f`, recursively for nested tuples. Arrays of tuples become one
//! sub-array per field under the same naming scheme.

use crate::ast::{bool_sort, AstRef, SmtFunc, SolverAst, Sort, SortX};
use crate::convert::{ConvError, Converter};
use cir::ast::{Expr, ExprX, Type, TypeX, Typed};
use std::any::Any;
use std::sync::Arc;

/// A flattened tuple (or array-of-tuples) value: just the symbol prefix and
/// its sort. Field symbols materialize on projection.
#[derive(Debug)]
pub struct TupleAst {
    pub name: String,
    pub sort: Sort,
}

impl SolverAst for TupleAst {
    fn sort(&self) -> &Sort {
        &self.sort
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) fn tuple_name(a: &AstRef) -> &str {
    match a.as_any().downcast_ref::<TupleAst>() {
        Some(t) => &t.name,
        None => panic!("internal error: expected a flattened tuple, got {:?}", a),
    }
}

impl Converter {
    /// The tuple (or tuple-array) symbol for `name` at `typ`.
    pub(crate) fn mk_tuple_symbol(&mut self, name: &str, typ: &Type) -> AstRef {
        let sort = match &**typ {
            TypeX::Array { subtype, .. } => {
                let domain_width = self.calculate_array_domain_width(typ);
                let (def, _) = self.get_type_def(subtype);
                let range = self.backend.mk_struct_sort(&def);
                crate::ast::array_sort(domain_width, range)
            }
            _ => {
                let (def, _) = self.get_type_def(typ);
                match &**typ {
                    TypeX::Union(_) => self.backend.mk_union_sort(&def),
                    _ => self.backend.mk_struct_sort(&def),
                }
            }
        };
        Arc::new(TupleAst { name: name.to_string(), sort })
    }

    pub(crate) fn tuple_fresh(&mut self, typ: &Type) -> AstRef {
        let name = self.mk_fresh_name("tuple_fresh");
        self.mk_tuple_symbol(&name, typ)
    }

    /// Project field `idx` of a flattened tuple.
    pub(crate) fn tuple_project(&mut self, a: &AstRef, typ: &Type, idx: usize) -> AstRef {
        let (_, def) = self.get_type_def(typ);
        let member_type = def.members[idx].clone();
        let child = format!("{}.{}", tuple_name(a), def.member_names[idx]);
        if self.is_tuple_type(&member_type) || self.is_tuple_array_type(&member_type) {
            self.mk_tuple_symbol(&child, &member_type)
        } else {
            let sort = self.convert_sort(&member_type);
            self.backend.mk_smt_symbol(&child, &sort)
        }
    }

    /// Project the per-field sub-array of a flattened array-of-tuples.
    pub(crate) fn tuple_array_project(
        &mut self,
        a: &AstRef,
        array_type: &Type,
        idx: usize,
    ) -> AstRef {
        let (subtype, size) = match &**array_type {
            TypeX::Array { subtype, size } => (subtype.clone(), size.clone()),
            _ => panic!("internal error: tuple_array_project on {}", array_type),
        };
        let (_, def) = self.get_type_def(&subtype);
        let member_type = def.members[idx].clone();
        let child = format!("{}.{}", tuple_name(a), def.member_names[idx]);
        let member_array =
            cir::pool::intern(TypeX::Array { subtype: member_type.clone(), size });
        if self.is_tuple_type(&member_type) {
            self.mk_tuple_symbol(&child, &member_array)
        } else {
            let sort = self.convert_sort(&member_array);
            self.backend.mk_smt_symbol(&child, &sort)
        }
    }

    /// Equality of two values of `member_type`, dispatching tuples and
    /// arrays of tuples recursively.
    pub(crate) fn field_equality(
        &mut self,
        lhs: &AstRef,
        rhs: &AstRef,
        member_type: &Type,
    ) -> AstRef {
        if self.is_tuple_type(member_type) {
            self.tuple_equality(lhs, rhs, member_type)
        } else if self.is_tuple_array_type(member_type) {
            self.tuple_array_equality(lhs, rhs, member_type)
        } else {
            self.backend.mk_func_app(&bool_sort(), SmtFunc::Eq, &[lhs.clone(), rhs.clone()])
        }
    }

    /// Materialize a tuple constant: one symbol per field, each asserted
    /// equal to the converted member expression.
    pub(crate) fn tuple_create(&mut self, expr: &Expr) -> Result<AstRef, ConvError> {
        let name = self.mk_fresh_name("tuple_create");
        let result = self.mk_tuple_symbol(&name, &expr.typ);
        let (_, def) = self.get_type_def(&expr.typ);
        match &expr.x {
            ExprX::ConstantStruct(members) => {
                assert_eq!(
                    members.len(),
                    def.members.len(),
                    "internal error: struct constant arity vs {}",
                    expr.typ
                );
                for (i, member) in members.iter().enumerate() {
                    let val = self.convert_ast(member)?;
                    let field = self.tuple_project(&result, &expr.typ, i);
                    let eq = self.field_equality(&field, &val, &def.members[i]);
                    self.assert_ast(&eq);
                }
            }
            ExprX::ConstantUnion { init_field, value } => {
                let (i, _) = def
                    .member(init_field)
                    .unwrap_or_else(|| {
                        panic!("internal error: union field {} not in {}", init_field, expr.typ)
                    });
                let val = self.convert_ast(value)?;
                let field = self.tuple_project(&result, &expr.typ, i);
                let eq = self.field_equality(&field, &val, &def.members[i]);
                self.assert_ast(&eq);
            }
            _ => panic!("internal error: tuple_create of {}", expr.x.kind_name()),
        }
        Ok(result)
    }

    /// A fresh tuple equal to `a` except at field `idx`.
    pub(crate) fn tuple_update(
        &mut self,
        a: &AstRef,
        typ: &Type,
        idx: usize,
        value: &AstRef,
    ) -> AstRef {
        let name = self.mk_fresh_name("tuple_update");
        let result = self.mk_tuple_symbol(&name, typ);
        let (_, def) = self.get_type_def(typ);
        for i in 0..def.members.len() {
            let field = self.tuple_project(&result, typ, i);
            let rhs = if i == idx { value.clone() } else { self.tuple_project(a, typ, i) };
            let eq = self.field_equality(&field, &rhs, &def.members[i]);
            self.assert_ast(&eq);
        }
        result
    }

    /// Conjunction of field equalities, recursive for nested tuples.
    pub(crate) fn tuple_equality(&mut self, a: &AstRef, b: &AstRef, typ: &Type) -> AstRef {
        let (_, def) = self.get_type_def(typ);
        let mut conj = Vec::with_capacity(def.members.len());
        for i in 0..def.members.len() {
            let fa = self.tuple_project(a, typ, i);
            let fb = self.tuple_project(b, typ, i);
            conj.push(self.field_equality(&fa, &fb, &def.members[i]));
        }
        self.make_conjunct(&conj)
    }

    /// Field-wise ite into a fresh result tuple.
    pub(crate) fn tuple_ite(
        &mut self,
        cond: &AstRef,
        then: &AstRef,
        els: &AstRef,
        typ: &Type,
    ) -> AstRef {
        let name = self.mk_fresh_name("tuple_ite");
        let result = self.mk_tuple_symbol(&name, typ);
        self.tuple_ite_rec(cond, then, els, &result, typ);
        result
    }

    fn tuple_ite_rec(
        &mut self,
        cond: &AstRef,
        then: &AstRef,
        els: &AstRef,
        result: &AstRef,
        typ: &Type,
    ) {
        let (_, def) = self.get_type_def(typ);
        for i in 0..def.members.len() {
            let member_type = &def.members[i];
            let rf = self.tuple_project(result, typ, i);
            let tf = self.tuple_project(then, typ, i);
            let ef = self.tuple_project(els, typ, i);
            if self.is_tuple_type(member_type) {
                self.tuple_ite_rec(cond, &tf, &ef, &rf, &member_type.clone());
            } else {
                let sort = tf.sort().clone();
                let ite = self
                    .backend
                    .mk_func_app(&sort, SmtFunc::Ite, &[cond.clone(), tf, ef]);
                let eq = self.field_equality(&rf, &ite, member_type);
                self.assert_ast(&eq);
            }
        }
    }

    // --- arrays of tuples -------------------------------------------------

    /// Read one tuple element out of an array of tuples.
    pub(crate) fn tuple_array_select(
        &mut self,
        a: &AstRef,
        array_type: &Type,
        idx: &AstRef,
    ) -> AstRef {
        let subtype = match &**array_type {
            TypeX::Array { subtype, .. } => subtype.clone(),
            _ => panic!("internal error: tuple_array_select on {}", array_type),
        };
        let name = self.mk_fresh_name("tuple_select");
        let result = self.mk_tuple_symbol(&name, &subtype);
        let (_, def) = self.get_type_def(&subtype);
        for i in 0..def.members.len() {
            let member_type = def.members[i].clone();
            let member_array = self.tuple_array_project(a, array_type, i);
            let rf = self.tuple_project(&result, &subtype, i);
            if self.is_tuple_type(&member_type) {
                let nested_arr_type = member_array_type(array_type, &member_type);
                let value = self.tuple_array_select(&member_array, &nested_arr_type, idx);
                let eq = self.field_equality(&rf, &value, &member_type);
                self.assert_ast(&eq);
            } else {
                let range = match &**member_array.sort() {
                    SortX::Array { range, .. } => range.clone(),
                    _ => panic!("internal error: non-array field projection"),
                };
                let value = self.backend.mk_func_app(
                    &range,
                    SmtFunc::Select,
                    &[member_array, idx.clone()],
                );
                let eq = self.field_equality(&rf, &value, &member_type);
                self.assert_ast(&eq);
            }
        }
        result
    }

    /// A fresh array of tuples equal to `a` except at `idx`, which holds
    /// `value` (a flattened tuple).
    pub(crate) fn tuple_array_update(
        &mut self,
        a: &AstRef,
        array_type: &Type,
        idx: &AstRef,
        value: &AstRef,
    ) -> AstRef {
        let subtype = match &**array_type {
            TypeX::Array { subtype, .. } => subtype.clone(),
            _ => panic!("internal error: tuple_array_update on {}", array_type),
        };
        let name = self.mk_fresh_name("tuple_array_update");
        let result = self.mk_tuple_symbol(&name, array_type);
        let (_, def) = self.get_type_def(&subtype);
        for i in 0..def.members.len() {
            let member_type = def.members[i].clone();
            let old_arr = self.tuple_array_project(a, array_type, i);
            let new_arr = self.tuple_array_project(&result, array_type, i);
            if self.is_tuple_type(&member_type) {
                let nested_arr_type = member_array_type(array_type, &member_type);
                let vf = self.tuple_project(value, &subtype, i);
                let stored = self.tuple_array_update(&old_arr, &nested_arr_type, idx, &vf);
                let eq = self.tuple_array_equality(&new_arr, &stored, &nested_arr_type);
                self.assert_ast(&eq);
            } else {
                let vf = self.tuple_project(value, &subtype, i);
                let sort = old_arr.sort().clone();
                let stored = self.backend.mk_func_app(
                    &sort,
                    SmtFunc::Store,
                    &[old_arr, idx.clone(), vf],
                );
                let eq = self
                    .backend
                    .mk_func_app(&bool_sort(), SmtFunc::Eq, &[new_arr, stored]);
                self.assert_ast(&eq);
            }
        }
        result
    }

    pub(crate) fn tuple_array_equality(
        &mut self,
        a: &AstRef,
        b: &AstRef,
        array_type: &Type,
    ) -> AstRef {
        let subtype = match &**array_type {
            TypeX::Array { subtype, .. } => subtype.clone(),
            _ => panic!("internal error: tuple_array_equality on {}", array_type),
        };
        let (_, def) = self.get_type_def(&subtype);
        let mut conj = Vec::with_capacity(def.members.len());
        for i in 0..def.members.len() {
            let member_type = def.members[i].clone();
            let fa = self.tuple_array_project(a, array_type, i);
            let fb = self.tuple_array_project(b, array_type, i);
            if self.is_tuple_type(&member_type) {
                let nested_arr_type = member_array_type(array_type, &member_type);
                conj.push(self.tuple_array_equality(&fa, &fb, &nested_arr_type));
            } else {
                conj.push(self.backend.mk_func_app(&bool_sort(), SmtFunc::Eq, &[fa, fb]));
            }
        }
        self.make_conjunct(&conj)
    }

    pub(crate) fn tuple_array_ite(
        &mut self,
        cond: &AstRef,
        then: &AstRef,
        els: &AstRef,
        array_type: &Type,
    ) -> AstRef {
        let subtype = match &**array_type {
            TypeX::Array { subtype, .. } => subtype.clone(),
            _ => panic!("internal error: tuple_array_ite on {}", array_type),
        };
        let name = self.mk_fresh_name("tuple_array_ite");
        let result = self.mk_tuple_symbol(&name, array_type);
        let (_, def) = self.get_type_def(&subtype);
        for i in 0..def.members.len() {
            let member_type = def.members[i].clone();
            let tf = self.tuple_array_project(then, array_type, i);
            let ef = self.tuple_array_project(els, array_type, i);
            let rf = self.tuple_array_project(&result, array_type, i);
            if self.is_tuple_type(&member_type) {
                let nested_arr_type = member_array_type(array_type, &member_type);
                let ite = self.tuple_array_ite(cond, &tf, &ef, &nested_arr_type);
                let eq = self.tuple_array_equality(&rf, &ite, &nested_arr_type);
                self.assert_ast(&eq);
            } else {
                let sort = tf.sort().clone();
                let ite = self
                    .backend
                    .mk_func_app(&sort, SmtFunc::Ite, &[cond.clone(), tf, ef]);
                let eq = self.backend.mk_func_app(&bool_sort(), SmtFunc::Eq, &[rf, ite]);
                self.assert_ast(&eq);
            }
        }
        result
    }

    /// Constant array of tuples: one constant sub-array per field.
    pub(crate) fn tuple_array_of(
        &mut self,
        init: &Expr,
        array_type: &Type,
    ) -> Result<AstRef, ConvError> {
        let name = self.mk_fresh_name("tuple_array_of");
        let result = self.mk_tuple_symbol(&name, array_type);
        let (_, def) = self.get_type_def(&init.typ);
        let domain_width = self.calculate_array_domain_width(array_type);
        let members = match &init.x {
            ExprX::ConstantStruct(members) => members.clone(),
            _ => panic!("internal error: tuple_array_of of {}", init.x.kind_name()),
        };
        for (i, member) in members.iter().enumerate() {
            assert!(
                !self.is_tuple_type(&def.members[i]),
                "internal error: nested tuple_array_of is not flattened"
            );
            let val = self.convert_ast(member)?;
            let arr_of = self.mk_array_of_ast(&val, domain_width);
            let field_arr = self.tuple_array_project(&result, array_type, i);
            let eq = self
                .backend
                .mk_func_app(&bool_sort(), SmtFunc::Eq, &[field_arr, arr_of]);
            self.assert_ast(&eq);
        }
        Ok(result)
    }

    /// Reconstruct a concrete tuple value from the model.
    pub(crate) fn tuple_get(&mut self, ast: &AstRef, typ: &Type) -> Option<Expr> {
        let (def_type, def) = self.get_type_def(typ);
        let mut members = Vec::with_capacity(def.members.len());
        for i in 0..def.members.len() {
            let field = self.tuple_project(ast, typ, i);
            members.push(self.get_ast_value(&field, &def.members[i].clone())?);
        }
        // Pointer values come back as their two-field representation.
        Some(Typed::new(def_type, ExprX::ConstantStruct(members)))
    }
}

fn member_array_type(array_type: &Type, member_type: &Type) -> Type {
    match &**array_type {
        TypeX::Array { size, .. } => cir::pool::intern(TypeX::Array {
            subtype: member_type.clone(),
            size: size.clone(),
        }),
        _ => panic!("internal error: not an array type: {}", array_type),
    }
}
