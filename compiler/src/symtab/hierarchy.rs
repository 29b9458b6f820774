//! Class linearization, subclass tests, overriding and symbol ordering

use super::errors::{SymbolError, SymbolResult};
use super::flags::Flags;
use super::id_types::{SymbolId, TypeId};
use super::table::SymbolTable;
use super::types::{Type, TypeTable};
use std::cmp::Ordering;
use std::rc::Rc;

impl SymbolTable {
    /// The linearization of `class`: the class itself first, then its base
    /// classes with later parents taking precedence. Cached per period.
    pub fn base_classes(&mut self, class: SymbolId) -> SymbolResult<Rc<[SymbolId]>> {
        let period = self.current_period();
        if let Some((cached, memo_period)) = self.sym(class).class_data().and_then(|d| d.base_classes.clone()) {
            if memo_period == period {
                return Ok(cached);
            }
        }
        if !self.is_class(class) {
            return Ok(Rc::from(Vec::new()));
        }
        let info = self.info(class)?;
        self.enter_walk(class, "base classes")?;
        let result = self.linearize(class, info);
        self.reset_flag(class, Flags::TRANS_FLAG);
        let lin: Rc<[SymbolId]> = Rc::from(result?);
        if let Some(data) = self.sym_mut(class).class_data_mut() {
            data.base_classes = Some((lin.clone(), period));
        }
        Ok(lin)
    }

    fn linearize(&mut self, class: SymbolId, info: TypeId) -> SymbolResult<Vec<SymbolId>> {
        let mut lin: Vec<SymbolId> = Vec::new();
        for parent in self.parents_of(info) {
            let parent_class = self.type_symbol(parent)?;
            if !self.is_class(parent_class) || parent_class == class {
                continue;
            }
            let parent_lin = self.base_classes(parent_class)?;
            let mut merged: Vec<SymbolId> = parent_lin.iter().copied().filter(|c| !lin.contains(c)).collect();
            merged.extend(lin);
            lin = merged;
        }
        lin.insert(0, class);
        Ok(lin)
    }

    /// Mark `sym` as being walked; a symbol met again on its own walk has
    /// cyclic parents or bounds
    fn enter_walk(&mut self, sym: SymbolId, what: &str) -> SymbolResult<()> {
        if self.raw_flags(sym).contains(Flags::TRANS_FLAG) {
            return Err(SymbolError::CyclicReference {
                sym,
                pending: format!("{} of {}", what, self.show(sym)),
                trace: Vec::new(),
                display: self.show(sym),
            });
        }
        self.set_flag(sym, Flags::TRANS_FLAG);
        Ok(())
    }

    /// Register the bottom classes (`Nothing`, `Null`) for subclass tests
    pub fn set_bottom_classes(&mut self, nothing: SymbolId, null: SymbolId) {
        self.nothing_class = nothing;
        self.null_class = null;
    }

    fn is_bottom_class(&self, sym: SymbolId) -> bool {
        sym.exists() && (sym == self.nothing_class || sym == self.null_class)
    }

    /// `a` is `b` or has `b` among its base classes
    pub fn is_non_bottom_sub_class(&mut self, a: SymbolId, b: SymbolId) -> SymbolResult<bool> {
        if a == b {
            return Ok(true);
        }
        if !self.is_class(a) || !self.is_class(b) {
            return Ok(false);
        }
        Ok(self.base_classes(a)?.contains(&b))
    }

    /// Like `is_non_bottom_sub_class`, with `Nothing` below every class and
    /// `Null` below every class but `Nothing`
    pub fn is_sub_class(&mut self, a: SymbolId, b: SymbolId) -> SymbolResult<bool> {
        if self.is_non_bottom_sub_class(a, b)? {
            return Ok(true);
        }
        if a.exists() && a == self.nothing_class {
            return Ok(self.is_class(b));
        }
        if a.exists() && a == self.null_class {
            return Ok(self.is_class(b) && b != self.nothing_class);
        }
        Ok(false)
    }

    /// Length of the base type sequence used by `is_less`
    pub fn base_type_seq_length(&mut self, sym: SymbolId) -> SymbolResult<usize> {
        if self.is_class(sym) && !self.is_stub(sym) {
            return Ok(self.base_classes(sym)?.len());
        }
        if self.is_abstract_type(sym) || self.is_alias_type(sym) {
            let info = self.info(sym)?;
            let hi = self.upper_bound(info);
            let bound = self.type_symbol(hi)?;
            let inner = if bound.exists() && bound != sym {
                self.enter_walk(sym, "upper bound")?;
                let inner = self.base_type_seq_length(bound);
                self.reset_flag(sym, Flags::TRANS_FLAG);
                inner?
            } else {
                0
            };
            return Ok(if self.is_abstract_type(sym) { inner + 1 } else { inner });
        }
        Ok(0)
    }

    /// A strict total order on symbols: types before terms, types with
    /// longer base type sequences first, then creation order
    pub fn is_less(&mut self, a: SymbolId, b: SymbolId) -> SymbolResult<bool> {
        Ok(self.compare_symbols(a, b)? == Ordering::Less)
    }

    pub fn compare_symbols(&mut self, a: SymbolId, b: SymbolId) -> SymbolResult<Ordering> {
        if a == b {
            return Ok(Ordering::Equal);
        }
        Ok(match (self.is_type(a), self.is_type(b)) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (true, true) => {
                let la = self.base_type_seq_length(a)?;
                let lb = self.base_type_seq_length(b)?;
                lb.cmp(&la).then(a.cmp(&b))
            }
            (false, false) => a.cmp(&b),
        })
    }

    /// Whether two member types match for overriding purposes: same
    /// parameter shapes and matching results. Non-method types always match.
    fn matches_type(&mut self, a: TypeId, b: TypeId) -> SymbolResult<bool> {
        match (self.types.get(a).clone(), self.types.get(b).clone()) {
            (Type::Method { params: p1, result: r1 }, Type::Method { params: p2, result: r2 }) => {
                if p1.len() != p2.len() {
                    return Ok(false);
                }
                for (&x, &y) in p1.iter().zip(&p2) {
                    let tx = self.info(x)?;
                    let ty = self.info(y)?;
                    if !self.types.types_equal(tx, ty) {
                        return Ok(false);
                    }
                }
                self.matches_type(r1, r2)
            }
            (Type::Poly { tparams: t1, result: r1 }, Type::Poly { tparams: t2, result: r2 }) => {
                if t1.len() != t2.len() {
                    return Ok(false);
                }
                let r2 = self.types.subst_sym(r2, &t2, &t1);
                self.matches_type(r1, r2)
            }
            (Type::NullaryMethod { .. }, Type::NullaryMethod { .. }) => Ok(true),
            (Type::Method { .. } | Type::Poly { .. }, _) | (_, Type::Method { .. } | Type::Poly { .. }) => Ok(false),
            _ => Ok(true),
        }
    }

    /// The member of `of_class` that `sym` matches when both are seen from
    /// `site`, or `NoSymbol`
    pub fn matching_symbol(&mut self, sym: SymbolId, of_class: SymbolId, site: TypeId) -> SymbolResult<SymbolId> {
        let name = self.raw_name(sym);
        let candidates = self.decl_alternatives(of_class, name)?;
        for candidate in candidates {
            if candidate == sym || self.raw_flags(candidate).contains(Flags::PRIVATE) {
                continue;
            }
            if self.is_type(candidate) {
                return Ok(candidate);
            }
            let mine = self.member_type(site, sym)?;
            let theirs = self.member_type(site, candidate)?;
            if self.matches_type(mine, theirs)? {
                return Ok(candidate);
            }
        }
        Ok(SymbolId::NONE)
    }

    fn can_match_inherited(&self, sym: SymbolId) -> bool {
        let owner = self.raw_owner(sym);
        self.is_class(owner)
            && !self.is_constructor(sym)
            && !self.raw_flags(sym).contains(Flags::PRIVATE)
            && !self.is_local_dummy(sym)
    }

    /// The member of base class `of_class` that `sym` overrides
    pub fn overridden_symbol(&mut self, sym: SymbolId, of_class: SymbolId) -> SymbolResult<SymbolId> {
        if !self.can_match_inherited(sym) {
            return Ok(SymbolId::NONE);
        }
        let owner = self.raw_owner(sym);
        let site = self.this_type(owner);
        self.matching_symbol(sym, of_class, site)
    }

    /// The member of subclass `of_class` that overrides `sym`
    pub fn overriding_symbol(&mut self, sym: SymbolId, of_class: SymbolId) -> SymbolResult<SymbolId> {
        if !self.can_match_inherited(sym) {
            return Ok(SymbolId::NONE);
        }
        let owner = self.raw_owner(sym);
        if of_class == owner || !self.is_non_bottom_sub_class(of_class, owner)? {
            return Ok(SymbolId::NONE);
        }
        let site = self.this_type(of_class);
        self.matching_symbol(sym, of_class, site)
    }

    /// Every member `sym` overrides, nearest base class first
    pub fn all_overridden_symbols(&mut self, sym: SymbolId) -> SymbolResult<Vec<SymbolId>> {
        if !self.can_match_inherited(sym) {
            return Ok(Vec::new());
        }
        let owner = self.raw_owner(sym);
        let bases = self.base_classes(owner)?;
        let mut result = Vec::new();
        for &bc in bases.iter().skip(1) {
            let overridden = self.overridden_symbol(sym, bc)?;
            if overridden.exists() {
                result.push(overridden);
            }
        }
        Ok(result)
    }

    /// Whether `tp` is a reference to a bottom class
    pub fn is_bottom_type(&mut self, tp: TypeId) -> SymbolResult<bool> {
        if tp == TypeTable::NO_TYPE {
            return Ok(false);
        }
        let sym = self.type_symbol(tp)?;
        Ok(self.is_bottom_class(sym))
    }
}
