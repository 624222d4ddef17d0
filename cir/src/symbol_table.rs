//! The program symbol table.
//!
//! Name-keyed records with insertion order preserved for deterministic
//! emission, plus a base-name secondary index for unqualified lookup.

use crate::ast::{Expr, Ident, Type};
use crate::location::Location;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolFlags {
    pub is_type: bool,
    pub is_macro: bool,
    pub is_parameter: bool,
    pub lvalue: bool,
    pub static_lifetime: bool,
    pub file_local: bool,
    pub is_extern: bool,
}

#[derive(Debug, Clone)]
pub struct SymbolRecord {
    pub name: Ident,
    pub typ: Type,
    pub value: Option<Expr>,
    pub flags: SymbolFlags,
    pub location: Location,
    /// Source language, e.g. "C".
    pub mode: Ident,
    pub module: Ident,
    pub base_name: Ident,
    pub pretty_name: Ident,
}

impl SymbolRecord {
    pub fn new(name: Ident, typ: Type) -> SymbolRecord {
        SymbolRecord {
            base_name: name.clone(),
            pretty_name: name.clone(),
            name,
            typ,
            value: None,
            flags: SymbolFlags::default(),
            location: Location::nil(),
            mode: crate::ast::str_ident("C"),
            module: crate::ast::str_ident(""),
        }
    }

    pub fn with_value(mut self, value: Expr) -> SymbolRecord {
        self.value = Some(value);
        self
    }

    pub fn with_location(mut self, location: Location) -> SymbolRecord {
        self.location = location;
        self
    }
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: IndexMap<Ident, SymbolRecord>,
    base_names: HashMap<Ident, Vec<Ident>>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// Move a record into the table. On a duplicate name the record is handed
    /// back to the caller and the table is unchanged.
    pub fn insert(&mut self, symbol: SymbolRecord) -> Result<(), SymbolRecord> {
        if self.symbols.contains_key(&symbol.name) {
            return Err(symbol);
        }
        self.base_names.entry(symbol.base_name.clone()).or_default().push(symbol.name.clone());
        self.symbols.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    pub fn contains(&self, name: &Ident) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn lookup(&self, name: &Ident) -> Option<&SymbolRecord> {
        self.symbols.get(name)
    }

    /// In-place completion of an existing record (e.g. replacing a
    /// declaration's value with its definition).
    pub fn lookup_mut(&mut self, name: &Ident) -> Option<&mut SymbolRecord> {
        self.symbols.get_mut(name)
    }

    pub fn remove(&mut self, name: &Ident) -> Option<SymbolRecord> {
        let record = self.symbols.shift_remove(name)?;
        if let Some(names) = self.base_names.get_mut(&record.base_name) {
            names.retain(|n| n != name);
        }
        Some(record)
    }

    /// Qualified identifiers registered under an unqualified base name.
    pub fn lookup_base_name(&self, base_name: &Ident) -> &[Ident] {
        self.base_names.get(base_name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Ident, &SymbolRecord)> {
        self.symbols.iter()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl fmt::Display for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, record) in self.iter() {
            writeln!(f, "{}: {} ({})", name, record.typ, record.location)?;
        }
        Ok(())
    }
}
