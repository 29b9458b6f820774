//! Type queries that need the symbol graph: type symbols, `this` types,
//! type constructors, base types, as-seen-from and member lookup.
//!
//! These cover what the symbol table itself relies on. The full type
//! lattice (subtyping, equivalence, inference) lives in the typer.

use super::errors::SymbolResult;
use super::flags::Flags;
use super::history::Info;
use super::id_types::{ScopeId, SymbolId, TypeId};
use super::names::Name;
use super::symbols::{MemberOfCache, SymbolKind, TypeCaches};
use super::table::SymbolTable;
use super::types::{Type, TypeMap, TypeTable};

/// Rewrites a type seen from inside `clazz` into one seen from `pre`
struct AsSeenFromMap<'a> {
    clazz: SymbolId,
    pre: TypeId,
    tparams: &'a [SymbolId],
    args: &'a [TypeId],
}

impl TypeMap for AsSeenFromMap<'_> {
    fn replace(&mut self, types: &mut TypeTable, tp: TypeId) -> Option<TypeId> {
        match types.get(tp) {
            Type::This(sym) if *sym == self.clazz => Some(self.pre),
            Type::TypeRef { sym, args, .. } if args.is_empty() && self.tparams.len() == self.args.len() => {
                let i = self.tparams.iter().position(|p| p == sym)?;
                Some(self.args[i])
            }
            _ => None,
        }
    }
}

impl SymbolTable {
    fn type_caches(&self, sym: SymbolId) -> Option<&TypeCaches> {
        match &self.sym(sym).kind {
            SymbolKind::AliasType(c) | SymbolKind::AbstractType(c) => Some(c),
            SymbolKind::TypeSkolem { caches, .. } => Some(caches),
            SymbolKind::Class(data) => Some(&data.caches),
            _ => None,
        }
    }

    /// The symbol a type is about, looking through aliases and singletons
    pub fn type_symbol(&mut self, tp: TypeId) -> SymbolResult<SymbolId> {
        match self.types.get(tp).clone() {
            Type::TypeRef { sym, .. } if self.is_alias_type(sym) => {
                let info = self.info(sym)?;
                let info = self.strip_poly(info);
                self.type_symbol(info)
            }
            Type::Single { sym, .. } => {
                let info = self.info(sym)?;
                let underlying = self.types.get(info).result_type().unwrap_or(info);
                self.type_symbol(underlying)
            }
            Type::Bounds { hi, .. } => self.type_symbol(hi),
            _ => Ok(self.types.type_symbol_direct(tp)),
        }
    }

    fn strip_poly(&self, tp: TypeId) -> TypeId {
        match self.types.get(tp) {
            Type::Poly { result, .. } => *result,
            _ => tp,
        }
    }

    /// Upper bound of an abstract type's info, the info itself otherwise
    pub(crate) fn upper_bound(&self, info: TypeId) -> TypeId {
        match self.types.get(self.strip_poly(info)) {
            Type::Bounds { hi, .. } => *hi,
            _ => self.strip_poly(info),
        }
    }

    /// Parents of a class info (possibly under a polymorphic type)
    pub(crate) fn parents_of(&self, info: TypeId) -> Vec<TypeId> {
        match self.types.get(self.strip_poly(info)) {
            Type::ClassInfo { parents, .. } | Type::Refined { parents, .. } => parents.clone(),
            _ => Vec::new(),
        }
    }

    fn scope_of(&self, info: TypeId) -> Option<ScopeId> {
        match self.types.get(self.strip_poly(info)) {
            Type::ClassInfo { decls, .. } | Type::Refined { decls, .. } => Some(*decls),
            _ => None,
        }
    }

    /// `C.this` for a class, `NoPrefix` for anything else
    pub fn this_type(&mut self, sym: SymbolId) -> TypeId {
        match self.sym(sym).class_data().map(|d| d.this_type) {
            Some(Some(tp)) => tp,
            Some(None) => {
                let tp = self.types.this_type(sym);
                if let Some(data) = self.sym_mut(sym).class_data_mut() {
                    data.this_type = Some(tp);
                }
                tp
            }
            None => TypeTable::NO_PREFIX,
        }
    }

    /// The unapplied type reference to a type symbol, cached for the run
    pub fn type_constructor(&mut self, sym: SymbolId) -> TypeId {
        let run = self.run_id;
        if let Some((tp, memo_run)) = self.type_caches(sym).and_then(|c| c.tycon) {
            if memo_run == run {
                return tp;
            }
        }
        let owner = self.raw_owner(sym);
        let pre = if self.is_class(owner) {
            self.this_type(owner)
        } else {
            TypeTable::NO_PREFIX
        };
        let tp = self.types.type_ref(pre, sym, []);
        if let Some(caches) = self.sym_mut(sym).kind.type_caches_mut() {
            caches.tycon = Some((tp, run));
        }
        tp
    }

    /// The type reference applied to the symbol's own type parameters,
    /// cached for the period
    pub fn tpe(&mut self, sym: SymbolId) -> SymbolResult<TypeId> {
        let period = self.current_period();
        if let Some((tp, memo_period)) = self.type_caches(sym).and_then(|c| c.tpe) {
            if memo_period == period {
                return Ok(tp);
            }
        }
        let tparams = self.type_params(sym)?;
        let tycon = self.type_constructor(sym);
        let tp = if tparams.is_empty() {
            tycon
        } else {
            let pre = match self.types.get(tycon) {
                Type::TypeRef { pre, .. } => *pre,
                _ => TypeTable::NO_PREFIX,
            };
            let args: Vec<TypeId> = tparams.iter().map(|&p| self.type_constructor(p)).collect();
            self.types.type_ref(pre, sym, args)
        };
        if let Some(caches) = self.sym_mut(sym).kind.type_caches_mut() {
            caches.tpe = Some((tp, period));
        }
        Ok(tp)
    }

    pub fn type_params(&mut self, sym: SymbolId) -> SymbolResult<Vec<SymbolId>> {
        if sym.is_none() {
            return Ok(Vec::new());
        }
        let info = self.info(sym)?;
        Ok(match self.types.get(info) {
            Type::Poly { tparams, .. } => tparams.clone(),
            _ => Vec::new(),
        })
    }

    /// The base type of `tp` with respect to `clazz`, or `NoType`
    pub fn base_type(&mut self, tp: TypeId, clazz: SymbolId) -> SymbolResult<TypeId> {
        match self.types.get(tp).clone() {
            Type::TypeRef { sym, args, .. } => {
                if sym == clazz {
                    return Ok(tp);
                }
                let info = self.info(sym)?;
                if self.is_class(sym) {
                    let tparams = self.type_params(sym)?;
                    for parent in self.parents_of(info) {
                        let parent = if tparams.len() == args.len() {
                            self.types.subst_types(parent, &tparams, &args)
                        } else {
                            parent
                        };
                        let base = self.base_type(parent, clazz)?;
                        if base != TypeTable::NO_TYPE {
                            return Ok(base);
                        }
                    }
                    Ok(TypeTable::NO_TYPE)
                } else if self.is_alias_type(sym) || self.is_abstract_type(sym) {
                    let hi = self.upper_bound(info);
                    self.base_type(hi, clazz)
                } else {
                    Ok(TypeTable::NO_TYPE)
                }
            }
            Type::This(sym) => {
                let self_tpe = self.tpe(sym)?;
                self.base_type(self_tpe, clazz)
            }
            Type::Single { sym, .. } => {
                let info = self.info(sym)?;
                let underlying = self.types.get(info).result_type().unwrap_or(info);
                self.base_type(underlying, clazz)
            }
            Type::Refined { parents, .. } | Type::ClassInfo { parents, .. } => {
                for parent in parents {
                    let base = self.base_type(parent, clazz)?;
                    if base != TypeTable::NO_TYPE {
                        return Ok(base);
                    }
                }
                Ok(TypeTable::NO_TYPE)
            }
            Type::Bounds { hi, .. } => self.base_type(hi, clazz),
            Type::Existential { underlying, .. } | Type::Annotated { underlying, .. } => {
                self.base_type(underlying, clazz)
            }
            _ => Ok(TypeTable::NO_TYPE),
        }
    }

    /// `tp`, written inside `clazz`, as seen from prefix `pre`
    pub fn as_seen_from(&mut self, tp: TypeId, pre: TypeId, clazz: SymbolId) -> SymbolResult<TypeId> {
        if pre == TypeTable::NO_PREFIX || pre == TypeTable::NO_TYPE || !self.is_class(clazz) {
            return Ok(tp);
        }
        let tparams = self.type_params(clazz)?;
        let base = self.base_type(pre, clazz)?;
        let args: Vec<TypeId> = match self.types.get(base) {
            Type::TypeRef { args, .. } => args.to_vec(),
            _ => Vec::new(),
        };
        let mut map = AsSeenFromMap {
            clazz,
            pre,
            tparams: &tparams,
            args: &args,
        };
        Ok(self.types.map(tp, &mut map))
    }

    /// The type of member `sym` as seen from `pre`
    pub fn member_type(&mut self, pre: TypeId, sym: SymbolId) -> SymbolResult<TypeId> {
        if self.is_method(sym) {
            return self.type_as_member_of(sym, pre);
        }
        let info = self.info(sym)?;
        let owner = self.owner(sym);
        self.as_seen_from(info, pre, owner)
    }

    /// `member_type` for methods, memoized on period, prefix and info
    pub fn type_as_member_of(&mut self, method: SymbolId, pre: TypeId) -> SymbolResult<TypeId> {
        let info = self.info(method)?;
        let period = self.current_period();
        if let SymbolKind::Method(data) = &self.sym(method).kind {
            if let Some(memo) = data.member_of {
                if memo.period == period && memo.pre == pre && memo.info == info {
                    return Ok(memo.result);
                }
            }
        }
        let owner = self.owner(method);
        let result = self.as_seen_from(info, pre, owner)?;
        if let SymbolKind::Method(data) = &mut self.sym_mut(method).kind {
            data.member_of = Some(MemberOfCache {
                period,
                pre,
                info,
                result,
            });
        }
        Ok(result)
    }

    // ========================================================================
    // Member lookup
    // ========================================================================

    /// The class whose scope holds the members of `owner`
    fn member_holder(&self, owner: SymbolId) -> SymbolId {
        if self.is_module(owner) {
            self.module_class(owner)
        } else {
            owner
        }
    }

    /// Every declaration of `owner` named `name`, in entry order
    pub fn decl_alternatives(&mut self, owner: SymbolId, name: Name) -> SymbolResult<Vec<SymbolId>> {
        let holder = self.member_holder(owner);
        if holder.is_none() {
            return Ok(Vec::new());
        }
        let info = self.info(holder)?;
        Ok(match self.scope_of(info) {
            Some(scope) => self.scopes.get(scope).lookup_all(name).to_vec(),
            None => Vec::new(),
        })
    }

    /// The declaration of `owner` named `name`; several alternatives come
    /// back as one overloaded symbol
    pub fn decl(&mut self, owner: SymbolId, name: Name) -> SymbolResult<SymbolId> {
        let alts = self.decl_alternatives(owner, name)?;
        Ok(self.single_or_overloaded(owner, alts))
    }

    fn single_or_overloaded(&mut self, owner: SymbolId, alts: Vec<SymbolId>) -> SymbolId {
        match alts.len() {
            0 => SymbolId::NONE,
            1 => alts[0],
            _ => {
                let holder = self.member_holder(owner);
                let pre = self.this_type(holder);
                self.new_overloaded(pre, alts)
            }
        }
    }

    /// All declarations of `owner`, in entry order
    pub fn decls(&mut self, owner: SymbolId) -> SymbolResult<Vec<SymbolId>> {
        let holder = self.member_holder(owner);
        if holder.is_none() {
            return Ok(Vec::new());
        }
        let info = self.info(holder)?;
        Ok(match self.scope_of(info) {
            Some(scope) => self.scopes.get(scope).symbols().to_vec(),
            None => Vec::new(),
        })
    }

    /// A member of `owner` named `name`, declared or inherited.
    /// Private members of base classes are not inherited.
    pub fn member(&mut self, owner: SymbolId, name: Name) -> SymbolResult<SymbolId> {
        let holder = self.member_holder(owner);
        if !self.is_class(holder) {
            return Ok(SymbolId::NONE);
        }
        let bases = self.base_classes(holder)?;
        for &bc in bases.iter() {
            let mut alts = self.decl_alternatives(bc, name)?;
            if bc != holder {
                alts.retain(|&s| !self.raw_flags(s).contains(Flags::PRIVATE));
            }
            if !alts.is_empty() {
                return Ok(self.single_or_overloaded(bc, alts));
            }
        }
        Ok(SymbolId::NONE)
    }

    /// The alternatives of an overloaded symbol, `[sym]` otherwise
    pub fn alternatives(&self, sym: SymbolId) -> Vec<SymbolId> {
        if self.is_overloaded(sym) {
            if let Some(Info::Type(tp)) = self.sym(sym).history.as_ref().map(|h| &h.info) {
                if let Type::Overloaded { alts, .. } = self.types.get(*tp) {
                    return alts.clone();
                }
            }
        }
        vec![sym]
    }

    /// The companion module of a class, the companion class of a module or
    /// module class, or `NoSymbol`
    pub fn companion_symbol(&mut self, sym: SymbolId) -> SymbolResult<SymbolId> {
        if self.is_stub(sym) {
            self.stub_failure(sym)?;
            return Ok(SymbolId::NONE);
        }
        if self.is_package(sym) || self.is_package_class(sym) || sym.is_none() {
            return Ok(SymbolId::NONE);
        }
        let (anchor, want_module) = if self.is_module_class(sym) {
            (self.source_module(sym), false)
        } else if self.is_module(sym) {
            (sym, false)
        } else if self.is_class(sym) {
            (sym, true)
        } else {
            return Ok(SymbolId::NONE);
        };
        if anchor.is_none() {
            return Ok(SymbolId::NONE);
        }
        let owner = self.raw_owner(anchor);
        if !self.is_class(owner) {
            return Ok(SymbolId::NONE);
        }
        let raw = self.raw_name(anchor);
        let name = if want_module { raw.to_term_name() } else { raw.to_type_name() };
        let alts = self.decl_alternatives(owner, name)?;
        Ok(alts
            .into_iter()
            .find(|&s| {
                if want_module {
                    self.is_module(s)
                } else {
                    self.is_class(s) && !self.is_module_class(s)
                }
            })
            .unwrap_or(SymbolId::NONE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symtab::scopes::ScopeKind;
    use diagnostics::Position;

    /// class Box[T] { def get: T }; class IntBox extends Box[Int]
    fn boxes(table: &mut SymbolTable) -> (SymbolId, SymbolId, SymbolId, SymbolId, SymbolId) {
        let owner = table.empty_package_class();
        let names = (
            table.names.type_name("Box"),
            table.names.type_name("T"),
            table.names.term_name("get"),
            table.names.type_name("IntBox"),
            table.names.type_name("Int"),
        );
        let int = table.new_class_symbol(owner, names.4, Position::NONE, Flags::FINAL);
        let int_scope = table.scopes.create(ScopeKind::Class, int);
        let int_info = table.types.class_info(vec![], int_scope, int);
        table.set_info(int, int_info);

        let bx = table.new_class_symbol(owner, names.0, Position::NONE, Flags::NONE);
        let t = table.new_type_parameter(bx, names.1, Flags::NONE);
        let bounds = table.types.bounds(TypeTable::NO_TYPE, TypeTable::NO_TYPE);
        table.set_info(t, bounds);
        let scope = table.scopes.create(ScopeKind::Class, bx);
        let get = table.new_method_symbol(bx, names.2, Position::NONE, Flags::NONE);
        let t_ref = table.type_constructor(t);
        let get_info = table.types.nullary_method_type(t_ref);
        table.set_info(get, get_info);
        table.scopes.get_mut(scope).enter(names.2, get);
        let class_info = table.types.class_info(vec![], scope, bx);
        let poly = table.types.poly_type(vec![t], class_info);
        table.set_info(bx, poly);

        let ib = table.new_class_symbol(owner, names.3, Position::NONE, Flags::NONE);
        let int_ref = table.type_constructor(int);
        let box_tycon = table.type_constructor(bx);
        let pre = match table.types.get(box_tycon) {
            Type::TypeRef { pre, .. } => *pre,
            _ => unreachable!(),
        };
        let parent = table.types.type_ref(pre, bx, [int_ref]);
        let ib_scope = table.scopes.create(ScopeKind::Class, ib);
        let ib_info = table.types.class_info(vec![parent], ib_scope, ib);
        table.set_info(ib, ib_info);
        (bx, t, get, ib, int)
    }

    #[test]
    fn test_caches_are_stable() {
        let mut table = SymbolTable::new();
        let (bx, t, _, _, _) = boxes(&mut table);
        let tycon = table.type_constructor(bx);
        assert_eq!(table.type_constructor(bx), tycon);
        let tpe = table.tpe(bx).unwrap();
        assert_eq!(table.tpe(bx).unwrap(), tpe);
        let t_tycon = table.type_constructor(t);
        match table.types.get(tpe) {
            Type::TypeRef { sym, args, .. } => {
                assert_eq!(*sym, bx);
                assert_eq!(args.as_slice(), &[t_tycon]);
            }
            other => panic!("unexpected {:?}", other),
        }
        let this = table.this_type(bx);
        assert_eq!(table.this_type(bx), this);
        assert_eq!(table.this_type(t), TypeTable::NO_PREFIX);
    }

    #[test]
    fn test_member_type_substitutes_type_args() {
        let mut table = SymbolTable::new();
        let (bx, _, get, ib, int) = boxes(&mut table);
        let ib_tpe = table.tpe(ib).unwrap();
        let base = table.base_type(ib_tpe, bx).unwrap();
        assert_ne!(base, TypeTable::NO_TYPE);

        let seen = table.member_type(ib_tpe, get).unwrap();
        match table.types.get(seen) {
            Type::NullaryMethod { result } => assert_eq!(table.type_symbol(*result).unwrap(), int),
            other => panic!("unexpected {:?}", other),
        }
        // memoized on the same key
        assert_eq!(table.type_as_member_of(get, ib_tpe).unwrap(), seen);
    }

    #[test]
    fn test_inherited_member_lookup() {
        let mut table = SymbolTable::new();
        let (bx, _, get, ib, _) = boxes(&mut table);
        let name = table.raw_name(get);
        assert_eq!(table.member(ib, name).unwrap(), get);
        assert_eq!(table.decl(ib, name).unwrap(), SymbolId::NONE);
        assert_eq!(table.decls(bx).unwrap(), vec![get]);
    }

    #[test]
    fn test_overloaded_decl() {
        let mut table = SymbolTable::new();
        let (bx, _, get, _, _) = boxes(&mut table);
        let name = table.raw_name(get);
        let other = table.new_method_symbol(bx, name, Position::NONE, Flags::NONE);
        table.enter_in_owner_scope(bx, other);
        let over = table.decl(bx, name).unwrap();
        assert!(table.is_overloaded(over));
        assert_eq!(table.alternatives(over), vec![get, other]);
        assert_eq!(table.alternatives(get), vec![get]);
    }

    #[test]
    fn test_companions() {
        let mut table = SymbolTable::new();
        let owner = table.empty_package_class();
        let name = table.names.type_name("Pair");
        let class = table.new_class_symbol(owner, name, Position::NONE, Flags::CASE);
        table.enter_in_owner_scope(owner, class);
        let module_class = table.new_module_class(owner, name, Position::NONE, Flags::NONE);
        let module = table.new_linked_module(owner, module_class, Flags::NONE);
        table.enter_in_owner_scope(owner, module);

        assert_eq!(table.companion_symbol(class).unwrap(), module);
        assert_eq!(table.companion_symbol(module).unwrap(), class);
        assert_eq!(table.companion_symbol(module_class).unwrap(), class);
    }
}
