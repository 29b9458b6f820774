//! Member scopes for classes, packages and refinements
//!
//! A scope maps names to the symbols declared under them. Overloaded
//! members share one name, so each name keeps a short list. Iteration
//! follows entry order.

use super::id_types::{ScopeId, SymbolId};
use super::names::Name;
use indexmap::IndexMap;
use smallvec::SmallVec;

/// What kind of template a scope holds the members of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Class,
    Package,
    Refinement,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub owner: SymbolId,
    by_name: IndexMap<Name, SmallVec<[SymbolId; 1]>>,
    order: Vec<SymbolId>,
}

impl Scope {
    fn new(id: ScopeId, kind: ScopeKind, owner: SymbolId) -> Self {
        Self {
            id,
            kind,
            owner,
            by_name: IndexMap::new(),
            order: Vec::new(),
        }
    }

    /// Enter `sym` under `name`; entering the same symbol twice is a no-op
    pub fn enter(&mut self, name: Name, sym: SymbolId) {
        let slot = self.by_name.entry(name).or_default();
        if !slot.contains(&sym) {
            slot.push(sym);
            self.order.push(sym);
        }
    }

    /// First symbol entered under `name`
    pub fn lookup(&self, name: Name) -> SymbolId {
        self.by_name
            .get(&name)
            .and_then(|syms| syms.first().copied())
            .unwrap_or(SymbolId::NONE)
    }

    pub fn lookup_all(&self, name: Name) -> &[SymbolId] {
        self.by_name.get(&name).map(|s| s.as_slice()).unwrap_or(&[])
    }

    pub fn contains(&self, sym: SymbolId) -> bool {
        self.order.contains(&sym)
    }

    pub fn unlink(&mut self, name: Name, sym: SymbolId) -> bool {
        let Some(slot) = self.by_name.get_mut(&name) else {
            return false;
        };
        let before = slot.len();
        slot.retain(|s| *s != sym);
        if slot.len() == before {
            return false;
        }
        if slot.is_empty() {
            self.by_name.shift_remove(&name);
        }
        self.order.retain(|s| *s != sym);
        true
    }

    pub fn symbols(&self) -> &[SymbolId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Arena of scopes
#[derive(Debug, Clone, Default)]
pub struct ScopeTable {
    scopes: Vec<Scope>,
}

impl ScopeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, kind: ScopeKind, owner: SymbolId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(id, kind, owner));
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}
