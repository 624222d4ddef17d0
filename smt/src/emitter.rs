//! Emission of SMT-LIB text, to the solver pipe and/or a log file.
//!
//! Every node that reaches the backend goes through here, so the log file is
//! a literal transcript of the solver conversation (the `smt-formula-only` /
//! `smt-formula-too` dump).

use crate::printer::node_to_string;
use crate::{node, nodes};
use sise::Node;
use std::io::Write;

pub struct Emitter {
    /// buffer for data to be sent across the pipe to the solver process
    pipe_buffer: Option<Vec<u8>>,
    /// log file
    log: Option<Box<dyn Write + Send>>,
    /// string of space characters representing current indentation level
    current_indent: String,
}

impl Emitter {
    pub fn new(use_pipe: bool, writer: Option<Box<dyn Write + Send>>) -> Self {
        let pipe_buffer = if use_pipe { Some(Vec::new()) } else { None };
        Emitter { pipe_buffer, log: writer, current_indent: String::new() }
    }

    pub fn set_log(&mut self, writer: Option<Box<dyn Write + Send>>) {
        self.log = writer;
    }

    fn is_none(&self) -> bool {
        self.pipe_buffer.is_none() && self.log.is_none()
    }

    /// Return all the data in pipe_buffer, and reset pipe_buffer to empty.
    pub fn take_pipe_data(&mut self) -> Vec<u8> {
        let data = self.pipe_buffer.take().expect("use_pipe must be set to true to take pipe");
        self.pipe_buffer = Some(Vec::new());
        data
    }

    fn indent(&mut self) {
        if self.log.is_some() {
            self.current_indent.push(' ');
        }
    }

    fn unindent(&mut self) {
        if self.log.is_some() {
            self.current_indent.pop();
        }
    }

    pub fn blank_line(&mut self) {
        if let Some(w) = &mut self.log {
            writeln!(w).unwrap();
            w.flush().unwrap();
        }
    }

    pub fn comment(&mut self, s: &str) {
        if let Some(w) = &mut self.log {
            writeln!(w, "{};; {}", self.current_indent, s).unwrap();
            w.flush().unwrap();
        }
    }

    pub fn log_node(&mut self, node: &Node) {
        let text = node_to_string(node);
        if let Some(w) = &mut self.pipe_buffer {
            writeln!(w, "{}", text).unwrap();
        }
        if let Some(w) = &mut self.log {
            writeln!(w, "{}{}", self.current_indent, text).unwrap();
            w.flush().unwrap();
        }
    }

    pub fn log_set_option(&mut self, option: &str, value: &str) {
        if !self.is_none() {
            self.log_node(&node!(
                (set-option {Node::Atom(":".to_owned() + option)} {Node::Atom(value.to_string())})
            ));
        }
    }

    pub fn log_push(&mut self) {
        if !self.is_none() {
            self.log_node(&nodes!(push));
            self.indent();
        }
    }

    pub fn log_pop(&mut self) {
        if !self.is_none() {
            self.unindent();
            self.log_node(&nodes!(pop));
        }
    }

    pub fn log_assert(&mut self, node: &Node) {
        if !self.is_none() {
            self.log_node(&nodes!(assert { node.clone() }));
        }
    }

    pub fn log_word(&mut self, s: &str) {
        if !self.is_none() {
            self.log_node(&Node::List(vec![Node::Atom(s.to_string())]));
        }
    }
}
