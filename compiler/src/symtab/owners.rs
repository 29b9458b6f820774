//! Ownership and naming queries
//!
//! Owners form a tree rooted at `NoSymbol`. Once classes are flattened
//! (see `Phase::flat_classes`) nested classes report their enclosing package
//! class as owner and a `$`-joined name.

use super::errors::{SymbolError, SymbolResult};
use super::flags::Flags;
use super::id_types::{SymbolId, TypeId};
use super::names::Name;
use super::symbols::SymbolKind;
use super::table::SymbolTable;
use super::types::{Constant, Type};

impl SymbolTable {
    pub fn raw_owner(&self, sym: SymbolId) -> SymbolId {
        self.sym(sym).owner
    }

    /// The owner in the current phase
    pub fn owner(&self, sym: SymbolId) -> SymbolId {
        let raw = self.raw_owner(sym);
        if !self.needs_flat_owner(sym) {
            return raw;
        }
        let mut owner = raw;
        while owner.exists() && !self.is_package_class(owner) {
            owner = self.raw_owner(owner);
        }
        owner
    }

    fn needs_flat_owner(&self, sym: SymbolId) -> bool {
        (self.is_class(sym) || self.is_module(sym))
            && self.phase().flat_classes()
            && self.raw_owner(sym).exists()
            && !self.is_package_class(self.raw_owner(sym))
    }

    /// Move `sym` under `new_owner`
    pub fn set_owner(&mut self, sym: SymbolId, new_owner: SymbolId) -> SymbolResult<()> {
        if sym == new_owner || self.is_nested_in(new_owner, sym) {
            return Err(SymbolError::OwnerCycle { sym, new_owner });
        }
        let s = self.sym_mut(sym);
        s.owner = new_owner;
        if let Some(data) = s.class_data_mut() {
            data.flat_name = None;
        }
        Ok(())
    }

    /// The owner, skipping package object classes
    pub fn effective_owner(&self, sym: SymbolId) -> SymbolId {
        let owner = self.owner(sym);
        if self.is_package_object_class(owner) {
            self.owner(owner)
        } else {
            owner
        }
    }

    /// `sym` followed by its raw owners, up to but excluding `NoSymbol`
    pub fn owner_chain(&self, sym: SymbolId) -> Vec<SymbolId> {
        std::iter::successors(Some(sym), |&s| Some(self.raw_owner(s)))
            .take_while(|s| s.exists())
            .collect()
    }

    /// Whether `that` is `sym` or one of its raw owners
    pub fn is_nested_in(&self, sym: SymbolId, that: SymbolId) -> bool {
        let mut cur = sym;
        while cur.exists() {
            if cur == that {
                return true;
            }
            cur = self.raw_owner(cur);
        }
        false
    }

    /// The innermost class enclosing `sym`, `sym` itself if it is a class
    pub fn encl_class(&self, sym: SymbolId) -> SymbolId {
        let mut cur = sym;
        while cur.exists() && !self.is_class(cur) {
            cur = self.owner(cur);
        }
        cur
    }

    /// The class whose instance is the outer instance of `sym`
    pub fn outer_class(&self, sym: SymbolId) -> SymbolId {
        if sym.is_none() {
            return SymbolId::NONE;
        }
        let owner = self.owner(sym);
        if self.is_class(owner) {
            owner
        } else if self.is_class(sym) && self.raw_flags(sym).contains(Flags::INCONSTRUCTOR) {
            // A class local to a constructor sees past the constructed class
            let encl = self.encl_class(owner);
            self.outer_class(encl)
        } else {
            self.outer_class(owner)
        }
    }

    pub fn raw_name(&self, sym: SymbolId) -> Name {
        self.sym(sym).name
    }

    pub fn set_name(&mut self, sym: SymbolId, name: Name) {
        let s = self.sym_mut(sym);
        s.name = name;
        if let Some(data) = s.class_data_mut() {
            data.flat_name = None;
        }
    }

    /// The name in the current phase. Nested classes are renamed
    /// `Outer$Inner` once classes are flat; the result is memoized per run.
    pub fn name(&mut self, sym: SymbolId) -> Name {
        let raw = self.raw_name(sym);
        if !self.is_class(sym) || !self.needs_flat_owner(sym) {
            return raw;
        }
        let run = self.run_id;
        if let Some((name, memo_run)) = self.sym(sym).class_data().and_then(|d| d.flat_name) {
            if memo_run == run {
                return name;
            }
        }
        let raw_owner = self.raw_owner(sym);
        let outer = self.encl_class(raw_owner);
        let outer_name = if outer.exists() {
            self.name(outer)
        } else {
            self.raw_name(raw_owner)
        };
        let text = format!("{}${}", self.names.as_str(outer_name), self.names.as_str(raw));
        let flat = self.names.name_like(&text, raw);
        if let Some(data) = self.sym_mut(sym).class_data_mut() {
            data.flat_name = Some((flat, run));
        }
        flat
    }

    pub fn decoded_name(&self, sym: SymbolId) -> &str {
        self.names.as_str(self.raw_name(sym))
    }

    /// Dot-separated path from the outermost package
    pub fn full_name(&self, sym: SymbolId) -> String {
        self.full_name_with(sym, '.')
    }

    pub fn full_name_with(&self, sym: SymbolId, separator: char) -> String {
        let name = self.decoded_name(sym);
        if sym.is_none() || self.is_root(sym) {
            return name.to_string();
        }
        let owner = self.effective_owner(sym);
        if owner.is_none() || self.is_effective_root(owner) {
            return name.to_string();
        }
        let prefix = self.full_name_with(self.encl_class(owner), separator);
        format!("{}{}{}", prefix, separator, name)
    }

    /// Human readable kind, as used in messages
    pub fn kind_string(&self, sym: SymbolId) -> &'static str {
        let flags = self.raw_flags(sym);
        match self.kind(sym) {
            SymbolKind::NoSymbol => "<none>",
            SymbolKind::Stub(_) => {
                if self.raw_name(sym).is_type_name() {
                    "class"
                } else {
                    "value"
                }
            }
            SymbolKind::Free(_) => {
                if self.raw_name(sym).is_type_name() {
                    "free type"
                } else {
                    "free term"
                }
            }
            SymbolKind::Module { .. } if flags.contains(Flags::PACKAGE) => "package",
            SymbolKind::Module { .. } => "object",
            SymbolKind::Method(_) if self.is_constructor(sym) => "constructor",
            SymbolKind::Method(_) => "method",
            SymbolKind::Term { .. } if flags.contains(Flags::MUTABLE) => "variable",
            SymbolKind::Term { .. } => "value",
            SymbolKind::AliasType(_) => "type",
            SymbolKind::AbstractType(_) | SymbolKind::TypeSkolem { .. } => {
                if flags.contains(Flags::PARAM) {
                    "type parameter"
                } else if flags.contains(Flags::EXISTENTIAL) {
                    "existential type"
                } else {
                    "type"
                }
            }
            SymbolKind::Class(_) => {
                if self.is_refinement_class(sym) {
                    "refinement class"
                } else if self.is_package_class(sym) {
                    "package class"
                } else if self.is_package_object_class(sym) {
                    "package object class"
                } else if self.is_module_class(sym) {
                    "object"
                } else if flags.contains(Flags::TRAIT) {
                    "trait"
                } else {
                    "class"
                }
            }
        }
    }

    /// `kind name`, e.g. "class Foo"
    pub fn show(&self, sym: SymbolId) -> String {
        format!("{} {}", self.kind_string(sym), self.decoded_name(sym))
    }

    /// Render a type for messages and dumps. Never forces a lazy info;
    /// parameters whose info is still pending print as `?`.
    pub fn show_type(&self, tp: TypeId) -> String {
        match self.types.get(tp) {
            Type::NoType => "<notype>".to_string(),
            Type::NoPrefix => "<noprefix>".to_string(),
            Type::Error => "<error>".to_string(),
            Type::Wildcard => "?".to_string(),
            Type::This(sym) => format!("{}.this", self.decoded_name(*sym)),
            Type::Single { sym, .. } => format!("{}.type", self.full_name(*sym)),
            Type::Super { this, sup } => {
                format!("{}.super[{}]", self.show_type(*this), self.show_type(*sup))
            }
            Type::Constant(c) => format!("{}({})", c.kind_name(), self.show_constant(c)),
            Type::TypeRef { sym, args, .. } => {
                let name = self.full_name(*sym);
                if args.is_empty() {
                    name
                } else {
                    format!("{}[{}]", name, self.show_types(args))
                }
            }
            Type::Bounds { lo, hi } => format!(" >: {} <: {}", self.show_type(*lo), self.show_type(*hi)),
            Type::Refined { parents, decls, .. } => format!(
                "{} {{ {} decls }}",
                self.show_types(parents),
                self.scopes.get(*decls).len()
            ),
            Type::ClassInfo { parents, decls, class } => format!(
                "{} extends {} {{ {} decls }}",
                self.decoded_name(*class),
                self.show_types(parents),
                self.scopes.get(*decls).len()
            ),
            Type::Method { params, result } => {
                let params: Vec<String> = params
                    .iter()
                    .map(|&p| format!("{}: {}", self.decoded_name(p), self.show_current_info(p)))
                    .collect();
                format!("({}){}", params.join(", "), self.show_type(*result))
            }
            Type::NullaryMethod { result } => format!("=> {}", self.show_type(*result)),
            Type::Poly { tparams, result } => {
                let names: Vec<&str> = tparams.iter().map(|&t| self.decoded_name(t)).collect();
                format!("[{}]{}", names.join(", "), self.show_type(*result))
            }
            Type::Existential { quantified, underlying } => {
                let names: Vec<&str> = quantified.iter().map(|&t| self.decoded_name(t)).collect();
                format!("{} forSome {{ {} }}", self.show_type(*underlying), names.join("; "))
            }
            Type::Annotated { annotations, underlying } => {
                let annots: Vec<String> = annotations.iter().map(|a| format!("@{}", self.show_type(a.atp))).collect();
                format!("{} {}", self.show_type(*underlying), annots.join(" "))
            }
            Type::Overloaded { alts, .. } => format!("<overloaded: {} alternatives>", alts.len()),
        }
    }

    fn show_types(&self, tps: &[TypeId]) -> String {
        let parts: Vec<String> = tps.iter().map(|&t| self.show_type(t)).collect();
        parts.join(", ")
    }

    fn show_current_info(&self, sym: SymbolId) -> String {
        match self.sym(sym).history().and_then(|h| h.info.as_type()) {
            Some(tp) => self.show_type(tp),
            None => "?".to_string(),
        }
    }

    fn show_constant(&self, c: &Constant) -> String {
        match c {
            Constant::Unit => "()".to_string(),
            Constant::Boolean(b) => b.to_string(),
            Constant::Byte(v) => v.to_string(),
            Constant::Short(v) => v.to_string(),
            Constant::Char(v) => match char::from_u32(u32::from(*v)) {
                Some(ch) => format!("{:?}", ch),
                None => format!("\\u{:04x}", v),
            },
            Constant::Int(v) => v.to_string(),
            Constant::Long(v) => format!("{}L", v),
            Constant::Float(_) => format!("{}f", c.as_f32().unwrap_or_default()),
            Constant::Double(_) => c.as_f64().unwrap_or_default().to_string(),
            Constant::String(s) => format!("{:?}", s),
            Constant::Null => "null".to_string(),
            Constant::Class(tp) => format!("classOf[{}]", self.show_type(*tp)),
            Constant::Enum(sym) => self.full_name(*sym),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symtab::phase::{PhaseChain, PhaseSpec};
    use crate::symtab::types::TypeTable;
    use diagnostics::Position;

    fn nested(table: &mut SymbolTable) -> (SymbolId, SymbolId, SymbolId) {
        let root = table.root_class();
        let p = table.names.term_name("p");
        let pkg = table.new_package(root, p);
        let pkg_class = table.module_class(pkg);
        let outer = table.names.type_name("Outer");
        let inner = table.names.type_name("Inner");
        let o = table.new_class_symbol(pkg_class, outer, Position::NONE, Flags::NONE);
        let i = table.new_class_symbol(o, inner, Position::NONE, Flags::NONE);
        (pkg_class, o, i)
    }

    #[test]
    fn test_full_name_and_chain() {
        let mut table = SymbolTable::new();
        let (pkg_class, o, i) = nested(&mut table);
        assert_eq!(table.full_name(i), "p.Outer.Inner");
        assert_eq!(table.full_name_with(i, '$'), "p$Outer$Inner");
        assert_eq!(table.owner_chain(i), vec![i, o, pkg_class, table.root_class()]);
        assert!(table.is_nested_in(i, pkg_class));
        assert!(!table.is_nested_in(pkg_class, i));
        assert_eq!(table.encl_class(i), i);
        assert_eq!(table.show(o), "class Outer");
    }

    #[test]
    fn test_set_owner_rejects_cycles() {
        let mut table = SymbolTable::new();
        let (_, o, i) = nested(&mut table);
        let err = table.set_owner(o, i).unwrap_err();
        assert!(matches!(err, SymbolError::OwnerCycle { .. }));
        assert!(table.set_owner(o, o).is_err());
        let empty = table.empty_package_class();
        table.set_owner(i, empty).unwrap();
        assert_eq!(table.raw_owner(i), empty);
    }

    #[test]
    fn test_flat_owner_and_name() {
        let mut table = SymbolTable::new();
        table.install_phases(PhaseChain::new(&[
            PhaseSpec::new("typer"),
            PhaseSpec::new("flatten"),
            PhaseSpec::new("jvm"),
        ]));
        let (pkg_class, o, i) = nested(&mut table);
        assert_eq!(table.owner(i), o);
        let raw = table.raw_name(i);
        assert_eq!(table.name(i), raw);

        table.set_phase(3);
        assert_eq!(table.owner(i), pkg_class);
        let flat = table.name(i);
        assert_eq!(table.names.as_str(flat), "Outer$Inner");
        assert!(flat.is_type_name());
        assert_eq!(table.name(o), table.raw_name(o));
    }

    #[test]
    fn test_outer_class_of_constructor_local_class() {
        let mut table = SymbolTable::new();
        let (pkg_class, o, _) = nested(&mut table);
        let ctor = table.new_method_symbol(o, crate::symtab::names::nme::CONSTRUCTOR, Position::NONE, Flags::NONE);
        let local = table.names.type_name("Local");
        let plain = table.new_class_symbol(ctor, local, Position::NONE, Flags::NONE);
        assert_eq!(table.outer_class(plain), o);
        let in_ctor = table.new_class_symbol(ctor, local, Position::NONE, Flags::INCONSTRUCTOR);
        assert_eq!(table.outer_class(in_ctor), pkg_class);
        assert_eq!(table.kind_string(ctor), "constructor");
    }

    #[test]
    fn test_show_type_does_not_force_infos() {
        let mut table = SymbolTable::new();
        let (_, o, _) = nested(&mut table);
        let three = table.types.constant_type(Constant::Int(3));
        let applied = table.types.type_ref(TypeTable::NO_PREFIX, o, [three]);
        assert_eq!(table.show_type(applied), "p.Outer[Int(3)]");

        let m = table.names.term_name("m");
        let method = table.new_method_symbol(o, m, Position::NONE, Flags::METHOD);
        let x = table.names.term_name("x");
        let param = table.new_value_parameter(method, x, Flags::NONE);
        let mt = table.types.method_type(vec![param], three);
        assert_eq!(table.show_type(mt), "(x: ?)Int(3)");
        assert_eq!(table.show_type(TypeTable::NO_TYPE), "<notype>");
    }
}
