//! Source locations attached to symbols and SSA steps.

use crate::ast::{str_ident, Ident};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: Ident,
    pub line: u64,
    pub column: u64,
    pub function: Ident,
}

impl Location {
    pub fn new(file: &str, line: u64, column: u64, function: &str) -> Location {
        Location { file: str_ident(file), line, column, function: str_ident(function) }
    }

    /// Placeholder for synthesized nodes with no source counterpart.
    pub fn nil() -> Location {
        Location { file: Arc::new(String::new()), line: 0, column: 0, function: Arc::new(String::new()) }
    }

    pub fn is_nil(&self) -> bool {
        self.file.is_empty() && self.line == 0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nil() {
            return write!(f, "<built-in>");
        }
        write!(f, "{} line {}", self.file, self.line)?;
        if !self.function.is_empty() {
            write!(f, " function {}", self.function)?;
        }
        Ok(())
    }
}
