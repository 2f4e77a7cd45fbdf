use std::fmt::Display;

use log::debug;

use crate::data_layout;
use crate::error::{CompileError, Result};
use crate::frame::Access;
use crate::tokenizer::Lexeme;

// prime bucket count
const TABLE_SIZE: usize = 211;
const PAD_WIDTH: usize = 15;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum VarType {
    Char,
    Int,
    Real,
}

impl VarType {
    pub fn size(&self) -> i64 {
        match self {
            VarType::Char | VarType::Int => data_layout::WORD_SIZE,
            VarType::Real => data_layout::REAL_SIZE,
        }
    }
}

impl Display for VarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VarType::Char => f.write_str("CHAR"),
            VarType::Int => f.write_str("INTEGER"),
            VarType::Real => f.write_str("REAL"),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Variable {
    pub ty: VarType,
    // running offset: from 0 upward for locals, from sizeOfParameters
    // downward for parameters
    pub offset: i64,
    pub size: i64,
    pub depth: usize,
    pub is_parameter: bool,
    pub by_reference: bool,
}

impl Variable {
    pub fn access(&self) -> Access {
        Access::of(self)
    }

    /// Bytes a formal takes in the parameter area. A by-reference formal
    /// holds a one-word address whatever its type.
    pub fn parameter_size(ty: VarType, by_reference: bool) -> i64 {
        if by_reference {
            data_layout::WORD_SIZE
        } else {
            ty.size()
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Constant {
    Int(i64),
    Real(f64),
}

impl Constant {
    pub fn ty(&self) -> VarType {
        match self {
            Constant::Int(_) => VarType::Int,
            Constant::Real(_) => VarType::Real,
        }
    }
}

impl Display for Constant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constant::Int(i) => write!(f, "{}", i),
            Constant::Real(r) => write!(f, "{:?}", r),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Parameter {
    pub ty: VarType,
    pub by_reference: bool,
}

#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Procedure {
    // assembly label, nested procedures are qualified by their parents
    pub label: String,
    pub parameters: Vec<Parameter>,
    pub size_of_locals: i64,
    pub size_of_parameters: i64,
}

impl Procedure {
    pub fn new(label: impl Into<String>) -> Procedure {
        Procedure {
            label: label.into(),
            ..Procedure::default()
        }
    }

    pub fn add_parameter(&mut self, var: &Variable) {
        self.parameters.push(Parameter {
            ty: var.ty,
            by_reference: var.by_reference,
        });
        self.size_of_parameters += var.size;
    }

    pub fn add_local(&mut self, var: &Variable) {
        self.size_of_locals += var.size;
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum EntryKind {
    // inserted by an identifier list, type mark not parsed yet
    Undefined,
    Variable(Variable),
    Constant(Constant),
    Procedure(Procedure),
    Module,
    Str(String),
}

impl EntryKind {
    fn name(&self) -> &'static str {
        match self {
            EntryKind::Undefined => "UNDEFINED",
            EntryKind::Variable(_) => "VARIABLE",
            EntryKind::Constant(_) => "CONSTANT",
            EntryKind::Procedure(_) => "PROCEDURE",
            EntryKind::Module => "MODULE",
            EntryKind::Str(_) => "STRING",
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Entry {
    pub name: String,
    pub lexeme: Lexeme,
    pub depth: usize,
    pub kind: EntryKind,
}

impl Entry {
    pub fn variable(&self) -> Option<&Variable> {
        match &self.kind {
            EntryKind::Variable(v) => Some(v),
            _ => None,
        }
    }

    pub fn procedure(&self) -> Option<&Procedure> {
        match &self.kind {
            EntryKind::Procedure(p) => Some(p),
            _ => None,
        }
    }

    pub fn procedure_mut(&mut self) -> Option<&mut Procedure> {
        match &mut self.kind {
            EntryKind::Procedure(p) => Some(p),
            _ => None,
        }
    }
}

impl Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<width$}{}",
            self.name,
            self.kind.name(),
            width = PAD_WIDTH
        )
    }
}

/// Handle of an entry, stays valid until the entry's depth is deleted.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct EntryId(usize);

/// Hash table of entries tagged with their declaration depth.
///
/// Every bucket holds handles in insertion order, so the innermost
/// declaration of a name is the last one of its bucket.
pub struct SymbolTable {
    buckets: Vec<Vec<EntryId>>,
    entries: Vec<Option<Entry>>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable {
            buckets: vec![Vec::new(); TABLE_SIZE],
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, name: &str, lexeme: Lexeme, depth: usize) -> Result<EntryId> {
        let bucket = hash(name);
        let exists = self.buckets[bucket]
            .iter()
            .map(|id| self.get(*id))
            .any(|e| e.name == name && e.depth == depth);
        if exists {
            return Err(CompileError::Redeclaration {
                line: lexeme.line,
                name: name.to_owned(),
            });
        }

        let id = EntryId(self.entries.len());
        self.entries.push(Some(Entry {
            name: name.to_owned(),
            lexeme,
            depth,
            kind: EntryKind::Undefined,
        }));
        self.buckets[bucket].push(id);
        Ok(id)
    }

    pub fn lookup(&self, name: &str) -> Option<EntryId> {
        self.buckets[hash(name)]
            .iter()
            .rev()
            .find(|id| self.get(**id).name == name)
            .copied()
    }

    pub fn get(&self, id: EntryId) -> &Entry {
        self.entries[id.0]
            .as_ref()
            .expect("entry handle used after its depth was deleted")
    }

    pub fn get_mut(&mut self, id: EntryId) -> &mut Entry {
        self.entries[id.0]
            .as_mut()
            .expect("entry handle used after its depth was deleted")
    }

    pub fn find(&self, name: &str) -> Option<&Entry> {
        self.lookup(name).map(|id| self.get(id))
    }

    pub fn delete_depth(&mut self, depth: usize) {
        let entries = &mut self.entries;
        for bucket in self.buckets.iter_mut() {
            bucket.retain(|id| {
                let keep = entries[id.0].as_ref().is_some_and(|e| e.depth != depth);
                if !keep {
                    entries[id.0] = None;
                }
                keep
            });
        }
    }

    /// Live entries at `depth` in declaration order.
    pub fn entries_at(&self, depth: usize) -> impl Iterator<Item = &Entry> + '_ {
        self.entries
            .iter()
            .flatten()
            .filter(move |e| e.depth == depth)
    }

    pub fn dump_depth(&self, depth: usize) -> Vec<&Entry> {
        debug!("Writing Depth {}", depth);
        let entries = self.entries_at(depth).collect::<Vec<_>>();
        for e in &entries {
            debug!("{}", e);
        }
        entries
    }
}

// PJW hash
fn hash(name: &str) -> usize {
    let mut h: u32 = 0;
    for c in name.chars() {
        h = (h << 4).wrapping_add(c as u32);
        let g = h & 0xf000_0000;
        if g != 0 {
            h ^= g >> 24;
            h ^= g;
        }
    }
    h as usize % TABLE_SIZE
}
