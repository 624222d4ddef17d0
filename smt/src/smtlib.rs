//! The SMT-LIB backend: builds S-expression terms, streams them to a solver
//! process (or only to the dump log), and parses `check-sat` / `get-value`
//! replies.

use crate::ast::{AstRef, SmtFunc, SolveResult, SolverAst, Sort, SortX, Tvt};
use crate::emitter::Emitter;
use crate::printer::{bv_literal_node, declare_fun_node, node_to_string, str_to_node};
use crate::process::SmtProcess;
use cir::ast::Type;
use num_bigint::{BigInt, Sign};
use num_traits::Num;
use sise::Node;
use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
pub struct SmtLibAst {
    pub node: Node,
    pub sort: Sort,
}

impl SmtLibAst {
    pub fn new(node: Node, sort: Sort) -> AstRef {
        Arc::new(SmtLibAst { node, sort })
    }
}

impl SolverAst for SmtLibAst {
    fn sort(&self) -> &Sort {
        &self.sort
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Pull the S-expression out of an AST handle produced by this backend.
pub fn ast_node(a: &AstRef) -> &Node {
    match a.as_any().downcast_ref::<SmtLibAst>() {
        Some(ast) => &ast.node,
        None => panic!("internal error: foreign AST handed to the SMT-LIB backend"),
    }
}

pub struct SmtLibBackend {
    solver_name: String,
    emitter: Emitter,
    process: Option<SmtProcess>,
    /// Names declared at each context level, to declare each symbol once.
    declared: Vec<HashSet<String>>,
}

impl SmtLibBackend {
    /// `process` is `None` for dump-only operation (`dec_solve` then reports
    /// `Smtlib`).
    pub fn new(
        solver_name: &str,
        process: Option<SmtProcess>,
        log: Option<Box<dyn std::io::Write + Send>>,
    ) -> SmtLibBackend {
        let use_pipe = process.is_some();
        let mut backend = SmtLibBackend {
            solver_name: solver_name.to_string(),
            emitter: Emitter::new(use_pipe, log),
            process,
            declared: vec![HashSet::new()],
        };
        backend.emitter.log_set_option("produce-models", "true");
        backend
    }

    pub fn emitter(&mut self) -> &mut Emitter {
        &mut self.emitter
    }

    fn is_declared(&self, name: &str) -> bool {
        self.declared.iter().any(|level| level.contains(name))
    }

    /// Send everything buffered so far plus `extra`, returning the solver's
    /// reply lines. `None` without a process (the command still reaches the
    /// dump log).
    fn roundtrip(&mut self, extra: &Node) -> Option<Vec<String>> {
        self.emitter.log_node(extra);
        self.process.as_ref()?;
        let data = self.emitter.take_pipe_data();
        self.process.as_mut().map(|p| p.send_commands(data))
    }

    fn get_value_node(&mut self, term: &Node) -> Option<Node> {
        let query = Node::List(vec![
            str_to_node("get-value"),
            Node::List(vec![term.clone()]),
        ]);
        let lines = self.roundtrip(&query)?;
        let text = lines.join(" ");
        let mut parser = sise::Parser::new(text.as_bytes());
        let node = sise::read_into_tree(&mut parser).ok()?;
        // Reply shape: ((term value))
        match node {
            Node::List(pairs) => match pairs.into_iter().next()? {
                Node::List(pair) => pair.into_iter().nth(1),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Parse a value atom from a `get-value` reply: booleans, `#b`/`#x`
/// literals, `(_ bvN w)`, decimal numerals and `(- n)`.
pub fn parse_value_node(node: &Node) -> Option<BigInt> {
    match node {
        Node::Atom(a) => {
            if let Some(bits) = a.strip_prefix("#b") {
                BigInt::from_str_radix(bits, 2).ok()
            } else if let Some(hex) = a.strip_prefix("#x") {
                BigInt::from_str_radix(hex, 16).ok()
            } else {
                BigInt::from_str_radix(a, 10).ok()
            }
        }
        Node::List(items) => match items.as_slice() {
            [Node::Atom(u), Node::Atom(bv), _] if u == "_" && bv.starts_with("bv") => {
                BigInt::from_str_radix(&bv[2..], 10).ok()
            }
            [Node::Atom(minus), inner] if minus == "-" => parse_value_node(inner).map(|n| -n),
            _ => None,
        },
    }
}

impl crate::backend::Backend for SmtLibBackend {
    fn mk_func_app(&mut self, sort: &Sort, kind: SmtFunc, args: &[AstRef]) -> AstRef {
        let arg_nodes: Vec<Node> = args.iter().map(|a| ast_node(a).clone()).collect();
        let node = match kind {
            SmtFunc::NotEq => {
                let mut eq = vec![str_to_node("=")];
                eq.extend(arg_nodes);
                Node::List(vec![str_to_node("not"), Node::List(eq)])
            }
            _ => {
                let mut items = vec![str_to_node(kind.smtlib_name())];
                items.extend(arg_nodes);
                Node::List(items)
            }
        };
        SmtLibAst::new(node, sort.clone())
    }

    fn mk_extract(&mut self, a: &AstRef, high: u64, low: u64, sort: &Sort) -> AstRef {
        let op = Node::List(vec![
            str_to_node("_"),
            str_to_node("extract"),
            str_to_node(&high.to_string()),
            str_to_node(&low.to_string()),
        ]);
        SmtLibAst::new(Node::List(vec![op, ast_node(a).clone()]), sort.clone())
    }

    fn mk_smt_int(&mut self, i: &BigInt) -> AstRef {
        let node = if i.sign() == Sign::Minus {
            Node::List(vec![str_to_node("-"), str_to_node(&(-i).to_string())])
        } else {
            str_to_node(&i.to_string())
        };
        SmtLibAst::new(node, crate::ast::int_sort())
    }

    /// Reals arrive as decimal strings or `a/b` quotients.
    fn mk_smt_real(&mut self, s: &str) -> AstRef {
        let node = match s.split_once('/') {
            Some((num, den)) => {
                let num_node = if let Some(stripped) = num.strip_prefix('-') {
                    Node::List(vec![str_to_node("-"), str_to_node(stripped)])
                } else {
                    str_to_node(num)
                };
                Node::List(vec![str_to_node("/"), num_node, str_to_node(den)])
            }
            None => str_to_node(s),
        };
        SmtLibAst::new(node, Arc::new(SortX::Real))
    }

    fn mk_smt_bvint(&mut self, i: &BigInt, _sign: bool, width: u64) -> AstRef {
        SmtLibAst::new(bv_literal_node(i, width), crate::ast::bv_sort(width))
    }

    fn mk_smt_bool(&mut self, val: bool) -> AstRef {
        SmtLibAst::new(str_to_node(if val { "true" } else { "false" }), crate::ast::bool_sort())
    }

    fn mk_smt_symbol(&mut self, name: &str, sort: &Sort) -> AstRef {
        if !self.is_declared(name) {
            self.declared.last_mut().unwrap().insert(name.to_string());
            let decl = declare_fun_node(name, sort);
            self.emitter.log_node(&decl);
        }
        SmtLibAst::new(crate::printer::symbol_node(name), sort.clone())
    }

    fn mk_struct_sort(&mut self, t: &Type) -> Sort {
        Arc::new(SortX::Struct { def: t.clone() })
    }

    fn mk_union_sort(&mut self, t: &Type) -> Sort {
        Arc::new(SortX::Union { def: t.clone() })
    }

    fn mk_array_of(&mut self, value: &AstRef, domain_width: u64) -> AstRef {
        let sort = crate::ast::array_sort(domain_width, value.sort().clone());
        let node = crate::printer::const_array_node(&sort, ast_node(value).clone());
        SmtLibAst::new(node, sort)
    }

    fn assert_ast(&mut self, a: &AstRef) {
        assert!(a.sort().is_bool(), "internal error: asserting non-boolean AST {:?}", a);
        self.emitter.log_assert(ast_node(a));
    }

    fn push_ctx(&mut self) {
        self.declared.push(HashSet::new());
        self.emitter.log_push();
    }

    fn pop_ctx(&mut self) {
        assert!(self.declared.len() > 1, "internal error: context stack underflow");
        self.declared.pop();
        self.emitter.log_pop();
    }

    fn dec_solve(&mut self) -> SolveResult {
        match self.roundtrip(&Node::List(vec![str_to_node("check-sat")])) {
            None => SolveResult::Smtlib,
            Some(lines) => {
                debug!(?lines, "check-sat reply");
                match lines.iter().map(|l| l.trim()).find(|l| !l.is_empty()) {
                    Some("sat") => SolveResult::Sat,
                    Some("unsat") => SolveResult::Unsat,
                    Some(other) => SolveResult::Error(other.to_string()),
                    None => SolveResult::Error("no reply from solver".to_string()),
                }
            }
        }
    }

    fn l_get(&mut self, a: &AstRef) -> Tvt {
        match self.get_bool(a) {
            Some(true) => Tvt::True,
            Some(false) => Tvt::False,
            None => Tvt::Unknown,
        }
    }

    fn get_bool(&mut self, a: &AstRef) -> Option<bool> {
        let node = ast_node(a).clone();
        match self.get_value_node(&node)? {
            Node::Atom(s) if s == "true" => Some(true),
            Node::Atom(s) if s == "false" => Some(false),
            _ => None,
        }
    }

    fn get_bv(&mut self, a: &AstRef) -> Option<BigInt> {
        let node = ast_node(a).clone();
        let value = self.get_value_node(&node)?;
        parse_value_node(&value)
    }

    fn get_array_elem(&mut self, a: &AstRef, idx: u64) -> Option<AstRef> {
        let domain_width = a.sort().domain_width();
        let range = match &**a.sort() {
            SortX::Array { range, .. } => range.clone(),
            _ => panic!("internal error: get_array_elem on non-array sort"),
        };
        let idx_node = if domain_width == 0 {
            str_to_node(&idx.to_string())
        } else {
            bv_literal_node(&BigInt::from(idx), domain_width)
        };
        let select = Node::List(vec![str_to_node("select"), ast_node(a).clone(), idx_node]);
        Some(SmtLibAst::new(select, range))
    }

    fn solver_text(&self) -> String {
        match &self.process {
            Some(_) => format!("{} (SMT-LIB pipe)", self.solver_name),
            None => format!("{} (SMT-LIB dump only)", self.solver_name),
        }
    }
}

/// Readable form of a term, used by diagnostics and tests.
pub fn ast_text(a: &AstRef) -> String {
    node_to_string(ast_node(a))
}
