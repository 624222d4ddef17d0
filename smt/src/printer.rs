//! S-expression construction and rendering for the SMT-LIB surface.

use crate::ast::{Sort, SortX};
use num_bigint::BigInt;
use sise::Node;

pub fn str_to_node(s: &str) -> Node {
    Node::Atom(s.to_string())
}

pub fn macro_push_node(nodes: &mut Vec<Node>, node: Node) {
    // turn a - b into a-b
    let len = nodes.len();
    if len != 0 {
        if let Node::Atom(cur) = &node {
            if let Node::Atom(prev) = &nodes[len - 1] {
                if node == "-" || prev == ":" || (prev != "-" && prev.ends_with("-")) {
                    nodes[len - 1] = Node::Atom(prev.to_owned() + cur);
                    return;
                }
            }
        }
    }
    nodes.push(node);
}

/*
examples:
  node!(my_atom)
  node!((atom1 atom2 atom-3))
  node!((atom1 (10 20 30) atom-3))
  let x = node!((10 20 30));
  node!((atom1 {x} atom-3))
*/
#[macro_export]
macro_rules! node {
    ( - ) => { Node::Atom("-".to_string()) };
    ( { $x:expr } ) => { $x };
    ( [ $x:expr ] ) => { $x.clone() };
    ( $x:literal ) => { Node::Atom($x.to_string()) };
    ( ( $( $x:tt )* ) ) => {
        {
            #[allow(unused_mut)]
            let mut v = Vec::new();
            $($crate::printer::macro_push_node(&mut v, node!($x));)*
            Node::List(v)
        }
    };
    ( $x:tt ) => { Node::Atom(stringify!($x).to_string()) };
}

#[macro_export]
macro_rules! nodes {
   ( $( $x:tt )* ) => {
       {
           let mut v = Vec::new();
           $($crate::printer::macro_push_node(&mut v, node!($x));)*
           Node::List(v)
       }
   };
}

/// Symbols outside SMT-LIB's simple-symbol alphabet (renamed SSA variables
/// carry `#`) are pipe-quoted.
pub fn symbol_node(name: &str) -> Node {
    const EXTRA: &str = "~!@$%^&*_-+=<>.?/";
    let simple = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || EXTRA.contains(c));
    if simple {
        Node::Atom(name.to_string())
    } else {
        Node::Atom(format!("|{}|", name))
    }
}

pub fn node_to_string(node: &Node) -> String {
    match node {
        Node::Atom(a) => a.clone(),
        Node::List(items) => {
            let mut s = String::from("(");
            for (i, item) in items.iter().enumerate() {
                if i != 0 {
                    s.push(' ');
                }
                s.push_str(&node_to_string(item));
            }
            s.push(')');
            s
        }
    }
}

pub fn sort_to_node(sort: &Sort) -> Node {
    match &**sort {
        SortX::Bool => str_to_node("Bool"),
        SortX::Int => str_to_node("Int"),
        SortX::Real => str_to_node("Real"),
        SortX::Bv { width } => Node::List(vec![
            str_to_node("_"),
            str_to_node("BitVec"),
            str_to_node(&width.to_string()),
        ]),
        // A zero-width domain denotes the integer encoding's Int domain.
        SortX::Array { domain_width: 0, range } => Node::List(vec![
            str_to_node("Array"),
            str_to_node("Int"),
            sort_to_node(range),
        ]),
        SortX::Array { domain_width, range } => Node::List(vec![
            str_to_node("Array"),
            sort_to_node(&crate::ast::bv_sort(*domain_width)),
            sort_to_node(range),
        ]),
        SortX::Struct { def } | SortX::Union { def } => {
            panic!("internal error: tuple sort {} reached the printer unflattened", def)
        }
    }
}

/// `(_ bvN w)`: the value is taken modulo 2^w, so negative constants print
/// as their two's-complement bit pattern.
pub fn bv_literal_node(value: &BigInt, width: u64) -> Node {
    let modulus = BigInt::from(1u8) << width;
    let mut v = value % &modulus;
    if v < BigInt::from(0u8) {
        v += &modulus;
    }
    Node::List(vec![
        str_to_node("_"),
        str_to_node(&format!("bv{}", v)),
        str_to_node(&width.to_string()),
    ])
}

pub fn declare_fun_node(name: &str, sort: &Sort) -> Node {
    Node::List(vec![
        str_to_node("declare-fun"),
        symbol_node(name),
        Node::List(vec![]),
        sort_to_node(sort),
    ])
}

pub fn const_array_node(sort: &Sort, value: Node) -> Node {
    Node::List(vec![
        Node::List(vec![str_to_node("as"), str_to_node("const"), sort_to_node(sort)]),
        value,
    ])
}
