//! Symbol records and symbol creation
//!
//! Every named entity is a `Symbol` stored in the `SymbolTable` arena and
//! addressed by `SymbolId`. The variant-specific state lives in the closed
//! `SymbolKind` enum; behavior shared by all variants is implemented on the
//! table, which has the phase context that flags and infos depend on.

use super::annotations::AnnotationInfo;
use super::errors::{SymbolError, SymbolResult};
use super::flags::Flags;
use super::history::{Info, TypeHistory};
use super::id_types::{RunId, SymbolId, TypeId};
use super::names::{nme, Name};
use super::phase::Period;
use super::scopes::ScopeKind;
use super::table::SymbolTable;
use super::types::{Type, TypeTable};
use diagnostics::Position;
use indexmap::IndexSet;
use smallvec::SmallVec;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Flags every package symbol and package class carries
pub const PACKAGE_FLAGS: Flags = Flags::from_bits(
    Flags::MODULE.bits() | Flags::PACKAGE.bits() | Flags::FINAL.bits() | Flags::JAVA.bits(),
);

/// Caches shared by all type symbols
#[derive(Debug, Clone, Default)]
pub struct TypeCaches {
    /// Unapplied type reference, valid for one run
    pub(crate) tycon: Option<(TypeId, RunId)>,
    /// Type reference applied to the type parameters, valid for one period
    pub(crate) tpe: Option<(TypeId, Period)>,
}

/// Memo of the last `type_as_member_of` computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MemberOfCache {
    pub period: Period,
    pub pre: TypeId,
    pub info: TypeId,
    pub result: TypeId,
}

#[derive(Debug, Clone)]
pub struct MethodData {
    /// Accessed or aliased symbol, e.g. the target of a super accessor
    pub(crate) referenced: SymbolId,
    pub(crate) member_of: Option<MemberOfCache>,
}

impl Default for MethodData {
    fn default() -> Self {
        Self {
            referenced: SymbolId::NONE,
            member_of: None,
        }
    }
}

/// Which kind of template a class symbol stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassFlavor {
    Plain,
    Refinement,
    ModuleClass,
    PackageClass,
    PackageObjectClass,
}

#[derive(Debug, Clone)]
pub struct ClassData {
    pub flavor: ClassFlavor,
    /// The symbol standing for `this`; the class itself unless a self type was given
    pub(crate) this_sym: SymbolId,
    /// For module classes, the module whose class this is
    pub(crate) source_module: SymbolId,
    pub(crate) associated_file: Option<String>,
    pub(crate) children: IndexSet<SymbolId>,
    pub(crate) caches: TypeCaches,
    pub(crate) this_type: Option<TypeId>,
    pub(crate) base_classes: Option<(Rc<[SymbolId]>, Period)>,
    pub(crate) flat_name: Option<(Name, RunId)>,
}

impl ClassData {
    fn new(flavor: ClassFlavor, this_sym: SymbolId) -> Self {
        Self {
            flavor,
            this_sym,
            source_module: SymbolId::NONE,
            associated_file: None,
            children: IndexSet::new(),
            caches: TypeCaches::default(),
            this_type: None,
            base_classes: None,
            flat_name: None,
        }
    }
}

/// A placeholder for a symbol missing from the classpath
#[derive(Debug, Clone)]
pub struct StubData {
    pub message: String,
}

/// A symbol that lives outside the owner tree
#[derive(Debug, Clone)]
pub struct FreeData {
    pub origin: String,
}

/// The closed set of symbol variants
#[derive(Debug, Clone)]
pub enum SymbolKind {
    NoSymbol,
    Term { referenced: SymbolId },
    Method(MethodData),
    Module { module_class: SymbolId },
    AliasType(TypeCaches),
    AbstractType(TypeCaches),
    TypeSkolem { caches: TypeCaches, origin: SymbolId },
    Class(Box<ClassData>),
    Stub(StubData),
    Free(FreeData),
}

impl SymbolKind {
    pub fn name(&self) -> &'static str {
        match self {
            SymbolKind::NoSymbol => "NoSymbol",
            SymbolKind::Term { .. } => "TermSymbol",
            SymbolKind::Method(_) => "MethodSymbol",
            SymbolKind::Module { .. } => "ModuleSymbol",
            SymbolKind::AliasType(_) => "AliasTypeSymbol",
            SymbolKind::AbstractType(_) => "AbstractTypeSymbol",
            SymbolKind::TypeSkolem { .. } => "TypeSkolem",
            SymbolKind::Class(data) => match data.flavor {
                ClassFlavor::Plain => "ClassSymbol",
                ClassFlavor::Refinement => "RefinementClassSymbol",
                ClassFlavor::ModuleClass => "ModuleClassSymbol",
                ClassFlavor::PackageClass => "PackageClassSymbol",
                ClassFlavor::PackageObjectClass => "PackageObjectClassSymbol",
            },
            SymbolKind::Stub(_) => "StubSymbol",
            SymbolKind::Free(_) => "FreeSymbol",
        }
    }

    pub(crate) fn type_caches_mut(&mut self) -> Option<&mut TypeCaches> {
        match self {
            SymbolKind::AliasType(c) | SymbolKind::AbstractType(c) => Some(c),
            SymbolKind::TypeSkolem { caches, .. } => Some(caches),
            SymbolKind::Class(data) => Some(&mut data.caches),
            _ => None,
        }
    }

    /// Copy of this kind for a clone: links are kept, caches are dropped
    fn fresh_copy(&self, this_sym: SymbolId) -> SymbolKind {
        match self {
            SymbolKind::Method(data) => SymbolKind::Method(MethodData {
                referenced: data.referenced,
                member_of: None,
            }),
            SymbolKind::AliasType(_) => SymbolKind::AliasType(TypeCaches::default()),
            SymbolKind::AbstractType(_) => SymbolKind::AbstractType(TypeCaches::default()),
            SymbolKind::TypeSkolem { origin, .. } => SymbolKind::TypeSkolem {
                caches: TypeCaches::default(),
                origin: *origin,
            },
            SymbolKind::Class(data) => {
                let mut copy = ClassData::new(data.flavor, this_sym);
                copy.source_module = data.source_module;
                copy.associated_file = data.associated_file.clone();
                SymbolKind::Class(Box::new(copy))
            }
            other => other.clone(),
        }
    }
}

/// Typed side data attached to a symbol, at most one value per type
#[derive(Clone, Default)]
pub struct Attachments(SmallVec<[Rc<dyn Any>; 1]>);

impl Attachments {
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.iter().find_map(|a| (**a).downcast_ref::<T>())
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.get::<T>().is_some()
    }

    pub fn update<T: Any>(&mut self, value: T) {
        self.remove::<T>();
        self.0.push(Rc::new(value));
    }

    pub fn remove<T: Any>(&mut self) {
        self.0.retain(|a| !(**a).is::<T>());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Attachments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attachments({})", self.0.len())
    }
}

/// A symbol record
#[derive(Debug, Clone)]
pub struct Symbol {
    pub(crate) id: SymbolId,
    pub(crate) name: Name,
    pub(crate) owner: SymbolId,
    pub(crate) raw_flags: Flags,
    pub(crate) flags_initialized: bool,
    pub(crate) pos: Position,
    pub(crate) private_within: SymbolId,
    pub(crate) annotations: Vec<AnnotationInfo>,
    pub(crate) attachments: Attachments,
    pub(crate) history: Option<Rc<TypeHistory>>,
    pub(crate) valid_to: Period,
    pub(crate) kind: SymbolKind,
}

impl Symbol {
    pub(crate) fn new(id: SymbolId, owner: SymbolId, name: Name, flags: Flags, kind: SymbolKind) -> Self {
        Self {
            id,
            name,
            owner,
            raw_flags: flags,
            flags_initialized: !flags.is_empty(),
            pos: Position::NONE,
            private_within: SymbolId::NONE,
            annotations: Vec::new(),
            attachments: Attachments::default(),
            history: None,
            valid_to: Period::NONE,
            kind,
        }
    }

    pub fn id(&self) -> SymbolId {
        self.id
    }

    pub fn kind(&self) -> &SymbolKind {
        &self.kind
    }

    pub fn pos(&self) -> Position {
        self.pos
    }

    pub fn raw_flags(&self) -> Flags {
        self.raw_flags
    }

    pub fn history(&self) -> Option<&Rc<TypeHistory>> {
        self.history.as_ref()
    }

    pub fn valid_to(&self) -> Period {
        self.valid_to
    }

    pub(crate) fn class_data(&self) -> Option<&ClassData> {
        match &self.kind {
            SymbolKind::Class(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn class_data_mut(&mut self) -> Option<&mut ClassData> {
        match &mut self.kind {
            SymbolKind::Class(data) => Some(data),
            _ => None,
        }
    }
}

// ============================================================================
// Creation
// ============================================================================

impl SymbolTable {
    pub(crate) fn alloc_symbol(&mut self, owner: SymbolId, name: Name, flags: Flags, kind: SymbolKind) -> SymbolId {
        let id = SymbolId::from_raw(self.symbols.len() as u32);
        self.symbols.push(Symbol::new(id, owner, name, flags, kind));
        log::trace!("new {} {} owned by {}", self.symbols[id.index()].kind.name(), id, owner);
        id
    }

    fn alloc_class(&mut self, owner: SymbolId, name: Name, flags: Flags, flavor: ClassFlavor) -> SymbolId {
        let id = SymbolId::from_raw(self.symbols.len() as u32);
        self.alloc_symbol(owner, name, flags, SymbolKind::Class(Box::new(ClassData::new(flavor, id))))
    }

    /// Create a term symbol, picking the variant from the flags
    pub fn new_term_symbol(&mut self, owner: SymbolId, name: Name, pos: Position, flags: Flags) -> SymbolId {
        if flags.contains(Flags::METHOD) {
            self.new_method_symbol(owner, name, pos, flags)
        } else if flags.contains(Flags::PACKAGE) {
            let module = self.alloc_symbol(owner, name.to_term_name(), flags | PACKAGE_FLAGS, SymbolKind::Module {
                module_class: SymbolId::NONE,
            });
            self.sym_mut(module).pos = pos;
            module
        } else if flags.contains(Flags::MODULE) {
            self.new_module_symbol(owner, name, pos, flags)
        } else {
            let term = self.alloc_symbol(owner, name.to_term_name(), flags, SymbolKind::Term {
                referenced: SymbolId::NONE,
            });
            self.sym_mut(term).pos = pos;
            term
        }
    }

    pub fn new_method_symbol(&mut self, owner: SymbolId, name: Name, pos: Position, flags: Flags) -> SymbolId {
        let sym = self.alloc_symbol(
            owner,
            name.to_term_name(),
            flags | Flags::METHOD,
            SymbolKind::Method(MethodData::default()),
        );
        self.sym_mut(sym).pos = pos;
        sym
    }

    pub fn new_value_parameter(&mut self, owner: SymbolId, name: Name, flags: Flags) -> SymbolId {
        self.new_term_symbol(owner, name, Position::NONE, flags | Flags::PARAM)
    }

    pub fn new_module_symbol(&mut self, owner: SymbolId, name: Name, pos: Position, flags: Flags) -> SymbolId {
        let sym = self.alloc_symbol(
            owner,
            name.to_term_name(),
            flags | Flags::MODULE,
            SymbolKind::Module {
                module_class: SymbolId::NONE,
            },
        );
        self.sym_mut(sym).pos = pos;
        sym
    }

    /// Create a module whose class is `module_class`, linking both ways
    pub fn new_linked_module(&mut self, owner: SymbolId, module_class: SymbolId, flags: Flags) -> SymbolId {
        let name = self.raw_name(module_class).to_term_name();
        let pos = self.sym(module_class).pos;
        let module = self.new_module_symbol(owner, name, pos, flags);
        self.connect_module_to_class(module, module_class);
        module
    }

    pub(crate) fn connect_module_to_class(&mut self, module: SymbolId, module_class: SymbolId) {
        if let SymbolKind::Module { module_class: slot } = &mut self.sym_mut(module).kind {
            *slot = module_class;
        }
        if let Some(data) = self.sym_mut(module_class).class_data_mut() {
            data.source_module = module;
        }
    }

    /// Create a class symbol, picking the flavor from name and flags
    pub fn new_class_symbol(&mut self, owner: SymbolId, name: Name, pos: Position, flags: Flags) -> SymbolId {
        let name = name.to_type_name();
        let (flavor, flags) = if name.same_spelling(nme::REFINE_CLASS) {
            (ClassFlavor::Refinement, flags)
        } else if flags.contains(Flags::PACKAGE) {
            (ClassFlavor::PackageClass, flags | PACKAGE_FLAGS)
        } else if name.same_spelling(nme::PACKAGE) {
            (ClassFlavor::PackageObjectClass, flags | Flags::MODULE)
        } else if flags.contains(Flags::MODULE) {
            (ClassFlavor::ModuleClass, flags)
        } else {
            (ClassFlavor::Plain, flags)
        };
        let sym = self.alloc_class(owner, name, flags, flavor);
        self.sym_mut(sym).pos = pos;
        sym
    }

    pub fn new_module_class(&mut self, owner: SymbolId, name: Name, pos: Position, flags: Flags) -> SymbolId {
        self.new_class_symbol(owner, name, pos, flags | Flags::MODULE)
    }

    pub fn new_refinement_class(&mut self, owner: SymbolId, pos: Position) -> SymbolId {
        self.new_class_symbol(owner, nme::REFINE_CLASS, pos, Flags::NONE)
    }

    /// Create a package: a package module, its package class and an empty
    /// member scope. The package is entered into the owner's scope.
    pub fn new_package(&mut self, owner: SymbolId, name: Name) -> SymbolId {
        let owner_class = self.module_class(owner).or_else(|| owner);
        let module = self.new_term_symbol(owner_class, name.to_term_name(), Position::NONE, PACKAGE_FLAGS);
        let class = self.new_class_symbol(owner_class, name.to_type_name(), Position::NONE, PACKAGE_FLAGS);
        self.connect_module_to_class(module, class);
        let decls = self.scopes.create(ScopeKind::Package, class);
        let info = self.types.class_info(Vec::new(), decls, class);
        self.set_info(class, info);
        let tpe = self.types.type_ref(TypeTable::NO_PREFIX, class, []);
        self.set_info(module, tpe);
        self.enter_in_owner_scope(owner_class, module);
        module
    }

    /// Create a type symbol that is not a class
    pub fn new_non_class_symbol(&mut self, owner: SymbolId, name: Name, pos: Position, flags: Flags) -> SymbolId {
        if name.is_term_name() {
            self.new_term_symbol(owner, name, pos, flags)
        } else if flags.contains(Flags::DEFERRED) {
            self.new_abstract_type(owner, name, pos, flags)
        } else {
            self.new_alias_type(owner, name, pos, flags)
        }
    }

    pub fn new_alias_type(&mut self, owner: SymbolId, name: Name, pos: Position, flags: Flags) -> SymbolId {
        let sym = self.alloc_symbol(owner, name.to_type_name(), flags, SymbolKind::AliasType(TypeCaches::default()));
        self.sym_mut(sym).pos = pos;
        sym
    }

    pub fn new_abstract_type(&mut self, owner: SymbolId, name: Name, pos: Position, flags: Flags) -> SymbolId {
        let sym = self.alloc_symbol(
            owner,
            name.to_type_name(),
            flags | Flags::DEFERRED,
            SymbolKind::AbstractType(TypeCaches::default()),
        );
        self.sym_mut(sym).pos = pos;
        sym
    }

    pub fn new_type_parameter(&mut self, owner: SymbolId, name: Name, flags: Flags) -> SymbolId {
        self.new_abstract_type(owner, name, Position::NONE, flags | Flags::PARAM | Flags::DEFERRED)
    }

    pub fn new_existential(&mut self, owner: SymbolId, name: Name, pos: Position) -> SymbolId {
        self.new_abstract_type(owner, name, pos, Flags::EXISTENTIAL | Flags::DEFERRED)
    }

    /// A skolem standing for `origin`; it starts out sharing the origin's info
    pub fn new_type_skolem(&mut self, owner: SymbolId, origin: SymbolId) -> SymbolId {
        let (name, flags, pos, history, valid_to) = {
            let o = self.sym(origin);
            (o.name, o.raw_flags - Flags::NOT_CLONED, o.pos, o.history.clone(), o.valid_to)
        };
        let sym = self.alloc_symbol(owner, name, flags, SymbolKind::TypeSkolem {
            caches: TypeCaches::default(),
            origin,
        });
        let s = self.sym_mut(sym);
        s.pos = pos;
        s.history = history;
        s.valid_to = valid_to;
        sym
    }

    /// A stub standing in for a missing symbol; using it reports `message`
    pub fn new_stub_symbol(&mut self, owner: SymbolId, name: Name, message: impl Into<String>) -> SymbolId {
        let message = message.into();
        if self.settings.debug {
            let owner_name = self.full_name(owner);
            log::warn!(
                "creating stub symbol to defer error for {}.{}: {}",
                owner_name,
                self.names.as_str(name),
                message
            );
        }
        self.alloc_symbol(owner, name, Flags::SYNTHETIC, SymbolKind::Stub(StubData { message }))
    }

    pub fn new_free_term(&mut self, name: Name, flags: Flags, origin: impl Into<String>) -> SymbolId {
        self.alloc_symbol(
            SymbolId::NONE,
            name.to_term_name(),
            flags,
            SymbolKind::Free(FreeData { origin: origin.into() }),
        )
    }

    pub fn new_free_type(&mut self, name: Name, flags: Flags, origin: impl Into<String>) -> SymbolId {
        self.alloc_symbol(
            SymbolId::NONE,
            name.to_type_name(),
            flags,
            SymbolKind::Free(FreeData { origin: origin.into() }),
        )
    }

    /// The dummy owner of expressions in a class template (`<local C>`)
    pub fn new_local_dummy(&mut self, class: SymbolId) -> SymbolId {
        let text = format!("<local {}>", self.names.as_str(self.raw_name(class)));
        let name = self.names.term_name(&text);
        let sym = self.alloc_symbol(class, name, Flags::NONE, SymbolKind::Term {
            referenced: SymbolId::NONE,
        });
        self.set_info(sym, TypeTable::NO_TYPE);
        sym
    }

    /// An overloaded symbol standing for `alts` as seen from `pre`
    pub fn new_overloaded(&mut self, pre: TypeId, alts: Vec<SymbolId>) -> SymbolId {
        let first = alts.first().copied().unwrap_or(SymbolId::NONE);
        let (owner, name) = (self.raw_owner(first), self.raw_name(first));
        let sym = self.alloc_symbol(owner, name, Flags::OVERLOADED, SymbolKind::Term {
            referenced: SymbolId::NONE,
        });
        let info = self.types.alloc(Type::Overloaded { pre, alts });
        self.set_info(sym, info);
        sym
    }

    /// Enter `sym` into the member scope of `owner`'s current class info.
    /// Owners whose info is not yet a class info are left untouched.
    pub fn enter_in_owner_scope(&mut self, owner: SymbolId, sym: SymbolId) -> bool {
        let Some(decls) = self.decls_scope_direct(owner) else {
            return false;
        };
        let name = self.raw_name(sym);
        self.scopes.get_mut(decls).enter(name, sym);
        true
    }

    // ========================================================================
    // Flags
    // ========================================================================

    pub fn raw_flags(&self, sym: SymbolId) -> Flags {
        self.sym(sym).raw_flags
    }

    /// Flags visible in the current phase
    pub fn flags(&self, sym: SymbolId) -> Flags {
        self.sym(sym).raw_flags.visible_under(self.phase().flag_mask())
    }

    /// True if any of `mask` is visible in the current phase
    pub fn has_flag(&self, sym: SymbolId, mask: Flags) -> bool {
        self.flags(sym).contains(mask)
    }

    pub fn has_all_flags(&self, sym: SymbolId, mask: Flags) -> bool {
        self.flags(sym).contains_all(mask)
    }

    pub fn set_flag(&mut self, sym: SymbolId, mask: Flags) {
        self.sym_mut(sym).raw_flags.insert(mask);
    }

    pub fn reset_flag(&mut self, sym: SymbolId, mask: Flags) {
        self.sym_mut(sym).raw_flags.remove(mask);
    }

    /// Set the flag word of a symbol created without flags
    pub fn init_flags(&mut self, sym: SymbolId, flags: Flags) -> SymbolResult<()> {
        let s = self.sym_mut(sym);
        if s.flags_initialized {
            return Err(SymbolError::Internal(format!(
                "flags of {} initialized twice ({:?} -> {:?})",
                sym, s.raw_flags, flags
            )));
        }
        s.raw_flags = flags | (s.raw_flags & Flags::LOCKED);
        s.flags_initialized = true;
        Ok(())
    }

    /// Clear the flag word, allowing `init_flags` again
    pub fn reset_flags(&mut self, sym: SymbolId) {
        let s = self.sym_mut(sym);
        s.raw_flags = s.raw_flags & Flags::LOCKED;
        s.flags_initialized = false;
    }

    // ========================================================================
    // Kind predicates
    // ========================================================================

    pub fn kind(&self, sym: SymbolId) -> &SymbolKind {
        &self.sym(sym).kind
    }

    pub fn is_term(&self, sym: SymbolId) -> bool {
        sym.exists() && self.sym(sym).name.is_term_name()
    }

    pub fn is_type(&self, sym: SymbolId) -> bool {
        sym.exists() && self.sym(sym).name.is_type_name()
    }

    pub fn is_class(&self, sym: SymbolId) -> bool {
        match &self.sym(sym).kind {
            SymbolKind::Class(_) => true,
            SymbolKind::Stub(_) => self.is_type(sym),
            _ => false,
        }
    }

    fn class_flavor(&self, sym: SymbolId) -> Option<ClassFlavor> {
        self.sym(sym).class_data().map(|d| d.flavor)
    }

    pub fn is_module_class(&self, sym: SymbolId) -> bool {
        matches!(
            self.class_flavor(sym),
            Some(ClassFlavor::ModuleClass | ClassFlavor::PackageClass | ClassFlavor::PackageObjectClass)
        )
    }

    pub fn is_package_class(&self, sym: SymbolId) -> bool {
        self.class_flavor(sym) == Some(ClassFlavor::PackageClass)
    }

    pub fn is_package_object_class(&self, sym: SymbolId) -> bool {
        self.class_flavor(sym) == Some(ClassFlavor::PackageObjectClass)
    }

    pub fn is_refinement_class(&self, sym: SymbolId) -> bool {
        self.class_flavor(sym) == Some(ClassFlavor::Refinement)
    }

    pub fn is_module(&self, sym: SymbolId) -> bool {
        matches!(self.sym(sym).kind, SymbolKind::Module { .. })
    }

    pub fn is_package(&self, sym: SymbolId) -> bool {
        self.is_module(sym) && self.sym(sym).raw_flags.contains(Flags::PACKAGE)
    }

    pub fn is_method(&self, sym: SymbolId) -> bool {
        matches!(self.sym(sym).kind, SymbolKind::Method(_))
    }

    pub fn is_alias_type(&self, sym: SymbolId) -> bool {
        matches!(self.sym(sym).kind, SymbolKind::AliasType(_))
    }

    pub fn is_abstract_type(&self, sym: SymbolId) -> bool {
        matches!(self.sym(sym).kind, SymbolKind::AbstractType(_) | SymbolKind::TypeSkolem { .. })
    }

    pub fn is_type_parameter(&self, sym: SymbolId) -> bool {
        self.is_type(sym) && self.sym(sym).raw_flags.contains(Flags::PARAM)
    }

    pub fn is_value_parameter(&self, sym: SymbolId) -> bool {
        self.is_term(sym) && self.sym(sym).raw_flags.contains(Flags::PARAM)
    }

    pub fn is_existential(&self, sym: SymbolId) -> bool {
        self.is_type(sym) && self.sym(sym).raw_flags.contains(Flags::EXISTENTIAL)
    }

    pub fn is_type_skolem(&self, sym: SymbolId) -> bool {
        matches!(self.sym(sym).kind, SymbolKind::TypeSkolem { .. })
    }

    pub fn is_stub(&self, sym: SymbolId) -> bool {
        matches!(self.sym(sym).kind, SymbolKind::Stub(_))
    }

    pub fn is_free(&self, sym: SymbolId) -> bool {
        matches!(self.sym(sym).kind, SymbolKind::Free(_))
    }

    pub fn is_overloaded(&self, sym: SymbolId) -> bool {
        self.sym(sym).raw_flags.contains(Flags::OVERLOADED)
    }

    pub fn is_constructor(&self, sym: SymbolId) -> bool {
        self.is_term(sym) && self.sym(sym).name == nme::CONSTRUCTOR
    }

    pub fn is_local_dummy(&self, sym: SymbolId) -> bool {
        self.is_term(sym) && self.names.is_local_dummy_name(self.sym(sym).name)
    }

    pub fn is_root(&self, sym: SymbolId) -> bool {
        sym == self.root_class || sym == self.root_package
    }

    /// Roots under which names are printed unqualified
    pub fn is_effective_root(&self, sym: SymbolId) -> bool {
        self.is_root(sym) || sym == self.empty_package || sym == self.empty_package_class
    }

    // ========================================================================
    // Links and side data
    // ========================================================================

    /// The class of a module, or NoSymbol
    pub fn module_class(&self, sym: SymbolId) -> SymbolId {
        match self.sym(sym).kind {
            SymbolKind::Module { module_class } => module_class,
            _ => SymbolId::NONE,
        }
    }

    /// The module of a module class, or NoSymbol
    pub fn source_module(&self, sym: SymbolId) -> SymbolId {
        self.sym(sym)
            .class_data()
            .map(|d| d.source_module)
            .unwrap_or(SymbolId::NONE)
    }

    /// The symbol a term or method aliases, or NoSymbol
    pub fn referenced(&self, sym: SymbolId) -> SymbolId {
        match &self.sym(sym).kind {
            SymbolKind::Term { referenced } => *referenced,
            SymbolKind::Method(data) => data.referenced,
            SymbolKind::Module { module_class } => *module_class,
            _ => SymbolId::NONE,
        }
    }

    pub fn set_referenced(&mut self, sym: SymbolId, target: SymbolId) -> SymbolResult<()> {
        if !matches!(self.sym(sym).kind, SymbolKind::Term { .. } | SymbolKind::Method(_)) {
            return Err(SymbolError::Internal(format!(
                "{} cannot alias {}",
                self.show(sym),
                self.show(target)
            )));
        }
        match &mut self.sym_mut(sym).kind {
            SymbolKind::Term { referenced } => *referenced = target,
            SymbolKind::Method(data) => data.referenced = target,
            _ => {}
        }
        Ok(())
    }

    /// The symbol a skolem stands for, or NoSymbol
    pub fn skolem_origin(&self, sym: SymbolId) -> SymbolId {
        match self.sym(sym).kind {
            SymbolKind::TypeSkolem { origin, .. } => origin,
            _ => SymbolId::NONE,
        }
    }

    /// Origin description of a free symbol
    pub fn free_origin(&self, sym: SymbolId) -> Option<&str> {
        match &self.sym(sym).kind {
            SymbolKind::Free(data) => Some(&data.origin),
            _ => None,
        }
    }

    pub fn pos(&self, sym: SymbolId) -> Position {
        self.sym(sym).pos
    }

    pub fn set_pos(&mut self, sym: SymbolId, pos: Position) {
        self.sym_mut(sym).pos = pos;
    }

    pub fn private_within(&self, sym: SymbolId) -> SymbolId {
        self.sym(sym).private_within
    }

    pub fn set_private_within(&mut self, sym: SymbolId, boundary: SymbolId) {
        self.sym_mut(sym).private_within = boundary;
    }

    pub fn annotations(&self, sym: SymbolId) -> &[AnnotationInfo] {
        &self.sym(sym).annotations
    }

    pub fn add_annotation(&mut self, sym: SymbolId, annotation: AnnotationInfo) {
        self.sym_mut(sym).annotations.push(annotation);
    }

    pub fn set_annotations(&mut self, sym: SymbolId, annotations: Vec<AnnotationInfo>) {
        self.sym_mut(sym).annotations = annotations;
    }

    pub fn attachments(&self, sym: SymbolId) -> &Attachments {
        &self.sym(sym).attachments
    }

    pub fn attachments_mut(&mut self, sym: SymbolId) -> &mut Attachments {
        &mut self.sym_mut(sym).attachments
    }

    pub fn associated_file(&self, class: SymbolId) -> Option<&str> {
        self.sym(class).class_data().and_then(|d| d.associated_file.as_deref())
    }

    pub fn set_associated_file(&mut self, class: SymbolId, file: impl Into<String>) {
        if let Some(data) = self.sym_mut(class).class_data_mut() {
            data.associated_file = Some(file.into());
        }
    }

    /// Known direct subclasses, in registration order
    pub fn children(&self, class: SymbolId) -> Vec<SymbolId> {
        self.sym(class)
            .class_data()
            .map(|d| d.children.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Register `child` as a direct subclass; returns false for duplicates
    pub fn add_child(&mut self, class: SymbolId, child: SymbolId) -> bool {
        match self.sym_mut(class).class_data_mut() {
            Some(data) => data.children.insert(child),
            None => false,
        }
    }

    /// The symbol standing for `this` inside `class`
    pub fn this_sym(&self, class: SymbolId) -> SymbolId {
        self.sym(class).class_data().map(|d| d.this_sym).unwrap_or(class)
    }

    /// Give `class` an explicit self type
    pub fn set_self_type(&mut self, class: SymbolId, self_type: Info) {
        let this_sym = self.new_this_sym(class);
        match self_type {
            Info::Type(tp) => self.set_info(this_sym, tp),
            Info::Lazy(lazy) => self.set_lazy_info(this_sym, lazy),
        }
    }

    fn new_this_sym(&mut self, class: SymbolId) -> SymbolId {
        let this_sym = self.alloc_symbol(class, nme::THIS, Flags::SYNTHETIC, SymbolKind::Term {
            referenced: SymbolId::NONE,
        });
        if let Some(data) = self.sym_mut(class).class_data_mut() {
            data.this_sym = this_sym;
        }
        this_sym
    }

    // ========================================================================
    // Cloning
    // ========================================================================

    /// Clone `sym` under `new_owner`, optionally with new flags and name.
    ///
    /// The clone gets the raw flags (never LOCKED), private-within boundary,
    /// annotations and attachments of the original. A completed info is
    /// copied with the original replaced by the clone and with fresh copies
    /// of method and type parameters; a lazy info is shared.
    pub fn clone_symbol(
        &mut self,
        sym: SymbolId,
        new_owner: SymbolId,
        flags: Option<Flags>,
        name: Option<Name>,
    ) -> SymbolResult<SymbolId> {
        let original = self.sym(sym).clone();
        let id = SymbolId::from_raw(self.symbols.len() as u32);
        let mut copy = Symbol::new(
            id,
            new_owner,
            name.unwrap_or(original.name),
            flags.unwrap_or(original.raw_flags) - Flags::NOT_CLONED,
            original.kind.fresh_copy(id),
        );
        copy.pos = original.pos;
        copy.private_within = original.private_within;
        copy.annotations = original.annotations.clone();
        copy.attachments = original.attachments.clone();
        self.symbols.push(copy);

        if let Some(history) = &original.history {
            match &history.info {
                Info::Lazy(lazy) => self.set_lazy_info(id, lazy.clone()),
                Info::Type(_) => {
                    let info = self.raw_info_type(sym)?;
                    let cloned = self.clone_info(info, sym, id)?;
                    self.set_info(id, cloned);
                }
            }
        }

        // A custom self type gets its own `this` symbol
        let this_sym = original.class_data().map(|d| d.this_sym).unwrap_or(sym);
        if this_sym != sym {
            let new_this = self.new_this_sym(id);
            if let Some(history) = self.sym(this_sym).history.clone() {
                match &history.info {
                    Info::Lazy(lazy) => self.set_lazy_info(new_this, lazy.clone()),
                    Info::Type(tp) => {
                        let tp = self.types.subst_sym(*tp, &[sym], &[id]);
                        self.set_info(new_this, tp);
                    }
                }
            }
        }
        Ok(id)
    }

    /// Copy `info` for a clone of `original`, cloning method and type params
    fn clone_info(&mut self, info: TypeId, original: SymbolId, clone: SymbolId) -> SymbolResult<TypeId> {
        let params: Vec<SymbolId> = match self.types.get(info) {
            Type::Method { params, .. } => params.clone(),
            Type::Poly { tparams, .. } => tparams.clone(),
            _ => Vec::new(),
        };
        let mut fresh = Vec::with_capacity(params.len());
        for &p in &params {
            fresh.push(self.clone_symbol(p, clone, None, None)?);
        }
        let mut from = params;
        let mut to = fresh;
        from.push(original);
        to.push(clone);
        // Parameter infos may mention sibling parameters
        for &p in &to[..to.len() - 1] {
            if let Some(tp) = self.sym(p).history.as_ref().and_then(|h| h.info.as_type()) {
                let tp1 = self.types.subst_sym(tp, &from, &to);
                if tp1 != tp {
                    self.set_info(p, tp1);
                }
            }
        }
        Ok(self.types.subst_sym(info, &from, &to))
    }
}
