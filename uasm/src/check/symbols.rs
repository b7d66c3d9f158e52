use indexmap::IndexMap;

use arch::types::UvmType;

use crate::grammar::ast::SectionKind;
use crate::grammar::token::Span;

pub const PERM_READ: u8 = 0x1;
pub const PERM_WRITE: u8 = 0x2;
pub const PERM_EXECUTE: u8 = 0x4;

/// Permission byte for symbols declared in a section. The generator can
/// also re-derive this from the section kind itself.
pub fn section_perm(kind: SectionKind) -> u8 {
    match kind {
        SectionKind::Static => PERM_READ,
        SectionKind::Global => PERM_READ | PERM_WRITE,
        SectionKind::Code => PERM_READ | PERM_EXECUTE,
    }
}

/// One declared variable, as the generator wants to see it.
#[derive(Debug, Clone)]
pub struct VarEntry {
    pub span: Span,
    pub ty: UvmType,
    pub section: SectionKind,
    pub perm: u8,
}

/// Variable declarations across the static and global sections, in
/// declaration order. The table index doubles as the generator-facing
/// variable index.
#[derive(Debug, Default)]
pub struct VarTable {
    entries: IndexMap<String, VarEntry>,
}

impl VarTable {
    /// Inserts a declaration and returns its index, or `None` when the
    /// name is already taken.
    pub fn insert(&mut self, name: &str, entry: VarEntry) -> Option<u32> {
        if self.entries.contains_key(name) {
            return None;
        }
        let index = self.entries.len() as u32;
        self.entries.insert(name.to_string(), entry);
        Some(index)
    }

    pub fn get(&self, name: &str) -> Option<&VarEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VarEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }
}

/// One label definition. `vaddr` is a placeholder the generator fills in
/// once instruction addresses are laid out.
#[derive(Debug, Clone)]
pub struct LabelEntry {
    pub span: Span,
    pub vaddr: u64,
}

/// Label definitions of the code section, in definition order.
#[derive(Debug, Default)]
pub struct LabelTable {
    entries: IndexMap<String, LabelEntry>,
}

impl LabelTable {
    /// Inserts a definition and returns its index, or `None` when the
    /// name is already taken.
    pub fn insert(&mut self, name: &str, entry: LabelEntry) -> Option<u32> {
        if self.entries.contains_key(name) {
            return None;
        }
        let index = self.entries.len() as u32;
        self.entries.insert(name.to_string(), entry);
        Some(index)
    }

    pub fn get(&self, name: &str) -> Option<&LabelEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
