//! Entry table, memoization and symbol decoding
//!
//! The unpickler indexes every entry up front, then decodes on demand:
//! `at(i, decoder)` decodes entry `i` once and memoizes the result. Infos are
//! attached as lazy references into the same unpickler, so the state is
//! shared behind an `Rc` and mutated through `Cell`/`RefCell` only between
//! decoder calls.

use super::buffer::PickleBuffer;
use super::error::{DecodeError, DecodeResult};
use super::format::{self, *};
use super::lazy_ref::LazyTypeRef;
use crate::symtab::{
    nme, AnnotationInfo, ClassfileAnnotArg, Constant, Flags, Info, Modifiers, Name, PickledFlagTable, RunId,
    ScopeId, ScopeKind, SymbolId, SymbolTable, Tree, TypeId,
};
use diagnostics::symtab::SymtabDiagnostics;
use diagnostics::Position;
use fxhash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A decoded (or not yet decoded) entry
#[derive(Debug, Clone)]
pub(crate) enum Entry {
    Empty,
    InProgress,
    Name(Name),
    Symbol(SymbolId),
    Type(TypeId),
    Constant(Constant),
    Annotation(Rc<AnnotationInfo>),
    ClassfileArg(Rc<ClassfileAnnotArg>),
    Tree(Rc<Tree>),
    Modifiers(Modifiers),
}

pub(crate) type Decoder = fn(&Rc<Unpickler>, &mut SymbolTable, usize) -> DecodeResult<Entry>;

/// Moves the read cursor for the lifetime of the guard
struct CursorGuard<'a> {
    buf: &'a PickleBuffer,
    saved: usize,
}

impl<'a> CursorGuard<'a> {
    fn jump(buf: &'a PickleBuffer, to: usize) -> Self {
        let saved = buf.read_index();
        buf.set_read_index(to);
        Self { buf, saved }
    }
}

impl Drop for CursorGuard<'_> {
    fn drop(&mut self) {
        self.buf.set_read_index(self.saved);
    }
}

pub(crate) struct Unpickler {
    pub(super) buf: PickleBuffer,
    index: Vec<usize>,
    entries: RefCell<Vec<Entry>>,
    class_root: SymbolId,
    module_root: SymbolId,
    pub(super) file: String,
    pub(super) flag_table: &'static PickledFlagTable,
    sym_scopes: RefCell<FxHashMap<SymbolId, ScopeId>>,
    /// The symbol whose info is being read, named in missing-symbol messages
    pub(super) completing: Cell<SymbolId>,
    pub(super) run_id: RunId,
}

impl Unpickler {
    /// Check the header and index the entries of the pickle at `offset`
    pub(crate) fn new(
        table: &SymbolTable,
        bytes: &[u8],
        offset: usize,
        class_root: SymbolId,
        module_root: SymbolId,
        file: &str,
    ) -> DecodeResult<Rc<Self>> {
        let buf = PickleBuffer::from_bytes(bytes.to_vec(), offset);
        let major = buf.read_nat()?;
        let minor = buf.read_nat()?;
        let flag_table = if major == MAJOR_VERSION && minor <= MINOR_VERSION {
            PickledFlagTable::for_version(major, minor)
        } else {
            None
        };
        let flag_table = flag_table.ok_or(DecodeError::Version { major, minor })?;
        let count = buf.read_nat()? as usize;
        let index = buf.create_index(count)?;
        log::debug!("{}: format {}.{}, {} entries", file, major, minor, count);

        Ok(Rc::new(Self {
            buf,
            entries: RefCell::new(vec![Entry::Empty; index.len()]),
            index,
            class_root,
            module_root,
            file: file.to_string(),
            flag_table,
            sym_scopes: RefCell::new(FxHashMap::default()),
            completing: Cell::new(class_root),
            run_id: table.run_id(),
        }))
    }

    pub(crate) fn entry_count(&self) -> usize {
        self.index.len()
    }

    /// Pass 1 enters every symbol definition; pass 2 attaches symbol
    /// annotations and children once all symbols exist.
    pub(crate) fn run(self: &Rc<Self>, table: &mut SymbolTable) -> DecodeResult<()> {
        let mut deferred = Vec::new();
        for i in 0..self.index.len() {
            let tag = self.tag_at(i)?;
            if is_symbol_def_tag(tag) && !(tag == CLASS_SYM && self.is_refinement_entry(table, i)?) {
                self.symbol_at(table, i)?;
            } else if tag == SYMANNOT || tag == CHILDREN {
                deferred.push(i);
            }
        }
        log::debug!("{}: pass 1 done, {} deferred entries", self.file, deferred.len());

        for i in deferred {
            let _cursor = CursorGuard::jump(&self.buf, self.index[i]);
            match self.tag_at(i)? {
                SYMANNOT => self.read_symbol_annotation(table)?,
                _ => self.read_children(table)?,
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Entry table
    // ---------------------------------------------------------------------

    fn start_of(&self, i: usize) -> DecodeResult<usize> {
        self.index.get(i).copied().ok_or(DecodeError::BadRef { index: i })
    }

    pub(super) fn tag_at(&self, i: usize) -> DecodeResult<u8> {
        self.buf.peek_byte(self.start_of(i)?)
    }

    pub(super) fn unexpected(&self, i: usize) -> DecodeError {
        match self.tag_at(i) {
            Ok(tag) => DecodeError::UnknownTag { tag, index: i },
            Err(err) => err,
        }
    }

    /// Decode entry `i` with `decode`, or return the memoized result
    pub(super) fn at(self: &Rc<Self>, table: &mut SymbolTable, i: usize, decode: Decoder) -> DecodeResult<Entry> {
        let start = self.start_of(i)?;
        match &self.entries.borrow()[i] {
            Entry::Empty => {}
            Entry::InProgress => return Err(DecodeError::Reentrant { index: i }),
            done => return Ok(done.clone()),
        }
        self.entries.borrow_mut()[i] = Entry::InProgress;
        log::trace!("{}: decoding entry {} ({})", self.file, i, format::tag_name(self.buf.peek_byte(start)?));

        let result = {
            let _cursor = CursorGuard::jump(&self.buf, start);
            decode(self, table, i)
        };

        let mut entries = self.entries.borrow_mut();
        match result {
            Ok(entry) => {
                if !matches!(entries[i], Entry::InProgress) {
                    return Err(DecodeError::Malformed(format!("entry {} decoded twice", i)));
                }
                entries[i] = entry.clone();
                Ok(entry)
            }
            Err(err) => {
                entries[i] = Entry::Empty;
                Err(err)
            }
        }
    }

    pub(super) fn name_at(self: &Rc<Self>, table: &mut SymbolTable, i: usize) -> DecodeResult<Name> {
        match self.at(table, i, Self::read_name)? {
            Entry::Name(name) => Ok(name),
            _ => Err(self.unexpected(i)),
        }
    }

    pub(super) fn symbol_at(self: &Rc<Self>, table: &mut SymbolTable, i: usize) -> DecodeResult<SymbolId> {
        match self.at(table, i, Self::read_symbol)? {
            Entry::Symbol(sym) => Ok(sym),
            _ => Err(self.unexpected(i)),
        }
    }

    pub(super) fn read_name_ref(self: &Rc<Self>, table: &mut SymbolTable) -> DecodeResult<Name> {
        let i = self.buf.read_nat()? as usize;
        self.name_at(table, i)
    }

    pub(super) fn read_symbol_ref(self: &Rc<Self>, table: &mut SymbolTable) -> DecodeResult<SymbolId> {
        let i = self.buf.read_nat()? as usize;
        self.symbol_at(table, i)
    }

    pub(super) fn is_name_entry(&self, i: usize) -> DecodeResult<bool> {
        Ok(is_name_tag(self.tag_at(i)?))
    }

    fn is_symbol_ref(&self, i: usize) -> DecodeResult<bool> {
        Ok(is_symbol_tag(self.tag_at(i)?))
    }

    /// A class entry named `<refinement>`; those are decoded with their type
    fn is_refinement_entry(self: &Rc<Self>, table: &mut SymbolTable, i: usize) -> DecodeResult<bool> {
        let name_ref = {
            let _cursor = CursorGuard::jump(&self.buf, self.start_of(i)?);
            self.buf.read_byte()?;
            self.buf.read_nat()?;
            self.buf.read_nat()? as usize
        };
        Ok(self.name_at(table, name_ref)?.same_spelling(nme::REFINE_CLASS))
    }

    /// The member scope collecting the unpickled members of `owner`
    pub(super) fn sym_scope(&self, table: &mut SymbolTable, owner: SymbolId) -> ScopeId {
        if let Some(scope) = self.sym_scopes.borrow().get(&owner) {
            return *scope;
        }
        let kind = if table.is_refinement_class(owner) {
            ScopeKind::Refinement
        } else if table.is_package_class(owner) {
            ScopeKind::Package
        } else {
            ScopeKind::Class
        };
        let scope = table.scopes.create(kind, owner);
        self.sym_scopes.borrow_mut().insert(owner, scope);
        scope
    }

    // ---------------------------------------------------------------------
    // Names and symbols
    // ---------------------------------------------------------------------

    fn read_name(self: &Rc<Self>, table: &mut SymbolTable, i: usize) -> DecodeResult<Entry> {
        let tag = self.buf.read_byte()?;
        let len = self.buf.read_nat()? as usize;
        let bytes = self.buf.read_slice(len)?;
        let text = std::str::from_utf8(bytes)
            .map_err(|e| DecodeError::Malformed(format!("name entry {} is not UTF-8: {}", i, e)))?;
        let name = match tag {
            TERM_NAME => table.names.term_name(text),
            TYPE_NAME => table.names.type_name(text),
            _ => return Err(DecodeError::UnknownTag { tag, index: i }),
        };
        Ok(Entry::Name(name))
    }

    fn read_symbol(self: &Rc<Self>, table: &mut SymbolTable, i: usize) -> DecodeResult<Entry> {
        let tag = self.buf.read_byte()?;
        let end = self.buf.read_end()?;
        match tag {
            NONE_SYM => return Ok(Entry::Symbol(SymbolId::NONE)),
            EXT_REF | EXT_MOD_CLASS_REF => return self.read_external(table, tag, end).map(Entry::Symbol),
            TYPE_SYM | ALIAS_SYM | CLASS_SYM | MODULE_SYM | VAL_SYM => {}
            _ => return Err(DecodeError::UnknownTag { tag, index: i }),
        }

        let name = self.read_name_ref(table)?;
        let owner = self.read_symbol_ref(table)?;
        let flags = self.flag_table.pickled_to_raw(self.buf.read_long_nat()?);
        let pflags = flags.intersection(Flags::PICKLED_FLAGS);
        let mut info_ref = self.buf.read_nat()? as usize;
        let private_within = if self.is_symbol_ref(info_ref)? {
            let boundary = self.symbol_at(table, info_ref)?;
            info_ref = self.buf.read_nat()? as usize;
            boundary
        } else {
            SymbolId::NONE
        };

        let (class_root, module_root) = (self.class_root, self.module_root);
        let is_class_root = name == table.raw_name(class_root) && owner == table.raw_owner(class_root);
        let is_module_root = name == table.raw_name(module_root) && owner == table.raw_owner(module_root);

        let sym = match tag {
            TYPE_SYM | ALIAS_SYM => table.new_non_class_symbol(owner, name.to_type_name(), Position::NONE, pflags),
            CLASS_SYM => {
                // a module class shares its name with the companion class
                let module_class = table.module_class(module_root);
                let sym = if is_class_root && flags.contains(Flags::MODULE) && module_class.exists() {
                    table.set_flag(module_class, pflags);
                    module_class
                } else if is_class_root && !flags.contains(Flags::MODULE) {
                    table.set_flag(class_root, pflags);
                    class_root
                } else {
                    table.new_class_symbol(owner, name.to_type_name(), Position::NONE, pflags)
                };
                if self.buf.read_index() < end {
                    let self_ref = self.buf.read_nat()? as usize;
                    let self_type = LazyTypeRef::new(self.clone(), self_ref, None);
                    table.set_self_type(sym, Info::Lazy(Rc::new(self_type)));
                }
                sym
            }
            MODULE_SYM => {
                if is_module_root {
                    table.set_flag(module_root, pflags);
                    module_root
                } else {
                    let tp = self.type_at(table, info_ref)?;
                    let module_class = table.types.type_symbol_direct(tp);
                    table.new_linked_module(owner, module_class, pflags)
                }
            }
            _ => {
                if is_module_root {
                    return Err(DecodeError::Malformed(format!(
                        "value entry {} has the name of the module root",
                        i
                    )));
                }
                table.new_term_symbol(owner, name.to_term_name(), Position::NONE, pflags)
            }
        };

        table.set_private_within(sym, private_within);
        let alias = if self.buf.read_index() < end {
            Some(self.buf.read_nat()? as usize)
        } else {
            None
        };
        table.set_lazy_info(sym, Rc::new(LazyTypeRef::new(self.clone(), info_ref, alias)));

        if self.enters_owner_scope(table, owner, sym) {
            let scope = self.sym_scope(table, owner);
            let member = table.raw_name(sym);
            table.scopes.get_mut(scope).enter(member, sym);
        }
        Ok(Entry::Symbol(sym))
    }

    fn enters_owner_scope(&self, table: &SymbolTable, owner: SymbolId, sym: SymbolId) -> bool {
        let name = table.raw_name(sym);
        table.is_class(owner)
            && sym != self.class_root
            && sym != self.module_root
            && !table.is_module_class(sym)
            && !table.is_refinement_class(sym)
            && !table.is_type_parameter(sym)
            && !table.is_existential(sym)
            && !name.same_spelling(nme::LOCAL_CHILD)
            && !table.names.is_local_dummy_name(name)
    }

    /// Resolve a reference to a symbol defined elsewhere. Tried in order: a
    /// local dummy, the owner's member, the expanded name of a private
    /// member, the missing hook, and finally a stub that reports on use.
    fn read_external(self: &Rc<Self>, table: &mut SymbolTable, tag: u8, end: usize) -> DecodeResult<SymbolId> {
        let name = self.read_name_ref(table)?;
        let owner = if self.buf.read_index() < end {
            self.read_symbol_ref(table)?
        } else {
            table.root_class()
        };
        let module_class = tag == EXT_MOD_CLASS_REF;

        if table.names.is_local_dummy_name(name) {
            return Ok(table.new_local_dummy(owner));
        }

        let found = self.from_name(table, owner, name, module_class)?;
        if found.exists() {
            return Ok(found);
        }

        let expanded = format!(
            "{}{}{}",
            table.full_name_with(owner, '$'),
            table.names.as_str(nme::EXPAND_SEPARATOR),
            table.names.as_str(name)
        );
        let expanded = table.names.name_like(&expanded, name);
        let found = self.from_name(table, owner, expanded, module_class)?;
        if found.exists() {
            return Ok(found);
        }

        let hooked = table.missing_hook(owner, name);
        let hooked = if module_class { table.module_class(hooked) } else { hooked };
        if hooked.exists() {
            return Ok(hooked);
        }

        let message = table.missing_message(owner, name, self.completing.get(), &self.file);
        if table.settings.debug {
            let owner_name = table.full_name(owner);
            let diagnostic = SymtabDiagnostics::deferred_stub(&owner_name, table.names.as_str(name));
            table.report(diagnostic);
        }
        // a missing module class is stubbed as a class
        let stub_name = if module_class { name.to_type_name() } else { name };
        Ok(table.new_stub_symbol(owner, stub_name, message))
    }

    fn from_name(
        &self,
        table: &mut SymbolTable,
        owner: SymbolId,
        name: Name,
        module_class: bool,
    ) -> DecodeResult<SymbolId> {
        if name.same_spelling(nme::ROOT) {
            return Ok(table.root_class());
        }
        if name.same_spelling(nme::ROOTPKG) {
            return Ok(table.root_package());
        }
        if table.is_stub(owner) || !owner.exists() {
            return Ok(SymbolId::NONE);
        }
        let decl = table.decl(owner, name)?;
        Ok(if module_class { table.module_class(decl) } else { decl })
    }

    // ---------------------------------------------------------------------
    // Pass 2
    // ---------------------------------------------------------------------

    fn read_symbol_annotation(self: &Rc<Self>, table: &mut SymbolTable) -> DecodeResult<()> {
        self.buf.read_byte()?;
        let end = self.buf.read_end()?;
        let target = self.read_symbol_ref(table)?;
        let annotation = self.read_annotation_info(table, end)?;
        table.add_annotation(target, annotation);
        Ok(())
    }

    fn read_children(self: &Rc<Self>, table: &mut SymbolTable) -> DecodeResult<()> {
        self.buf.read_byte()?;
        let end = self.buf.read_end()?;
        let target = self.read_symbol_ref(table)?;
        while self.buf.read_index() < end {
            let child = self.read_symbol_ref(table)?;
            table.add_child(target, child);
        }
        Ok(())
    }
}
