//! Writing a class and its companion module into the pickle format
//!
//! Entries get their index on first visit, before their components are
//! visited, so shared and cyclic references resolve to one entry. Symbols
//! owned by the roots (transitively), parameters, existentials and
//! refinement classes are written as definitions; everything else becomes
//! an external reference resolved by name on the reading side.

use super::buffer::PickleBuffer;
use super::error::PickleError;
use super::format::*;
use crate::symtab::{
    nme, AnnotationInfo, ClassfileAnnotArg, Constant, Flags, Modifiers, Name, PickledFlagTable, SymbolError,
    SymbolId, SymbolTable, Tree, TreeTag, Type, TypeId,
};
use fxhash::FxHashMap;

struct RawEntry {
    tag: u8,
    payload: PickleBuffer,
}

pub struct Pickler<'t> {
    table: &'t mut SymbolTable,
    class_root: SymbolId,
    module_root: SymbolId,
    flag_table: &'static PickledFlagTable,
    entries: Vec<Option<RawEntry>>,
    names: FxHashMap<Name, usize>,
    symbols: FxHashMap<SymbolId, usize>,
    types: FxHashMap<TypeId, usize>,
    constants: FxHashMap<Constant, usize>,
}

/// Pickle `class_root` and `module_root` (either may be `NoSymbol`)
pub fn pickle(table: &mut SymbolTable, class_root: SymbolId, module_root: SymbolId) -> Result<Vec<u8>, PickleError> {
    let mut pickler = Pickler::new(table, class_root, module_root);
    pickler.put_roots()?;
    Ok(pickler.finish())
}

impl<'t> Pickler<'t> {
    pub fn new(table: &'t mut SymbolTable, class_root: SymbolId, module_root: SymbolId) -> Self {
        Self {
            table,
            class_root,
            module_root,
            flag_table: &PickledFlagTable::V5,
            entries: Vec::new(),
            names: FxHashMap::default(),
            symbols: FxHashMap::default(),
            types: FxHashMap::default(),
            constants: FxHashMap::default(),
        }
    }

    pub fn put_roots(&mut self) -> Result<(), PickleError> {
        for root in [self.class_root, self.module_root] {
            if root.exists() {
                self.put_symbol(root)?;
            }
        }
        log::debug!("pickled {} entries", self.entries.len());
        Ok(())
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Header, entry count and every entry in index order
    pub fn finish(self) -> Vec<u8> {
        let mut out = PickleBuffer::new();
        out.write_nat(MAJOR_VERSION);
        out.write_nat(MINOR_VERSION);
        out.write_nat(self.entries.len() as u32);
        for entry in self.entries.into_iter().flatten() {
            out.write_byte(entry.tag);
            out.write_nat(entry.payload.len() as u32);
            out.write_bytes(entry.payload.bytes());
        }
        out.into_bytes()
    }

    fn reserve(&mut self) -> usize {
        self.entries.push(None);
        self.entries.len() - 1
    }

    fn fill(&mut self, i: usize, tag: u8, payload: PickleBuffer) {
        self.entries[i] = Some(RawEntry { tag, payload });
    }

    fn push(&mut self, tag: u8, payload: PickleBuffer) -> usize {
        let i = self.reserve();
        self.fill(i, tag, payload);
        i
    }

    fn info_of(&mut self, sym: SymbolId) -> Result<TypeId, PickleError> {
        self.table.info(sym).map_err(|err| match err {
            SymbolError::MissingRequirement { .. } => PickleError::Missing(err),
            other => PickleError::Unpicklable(format!("info of {}: {}", self.table.show(sym), other)),
        })
    }

    // ---------------------------------------------------------------------
    // Names and symbols
    // ---------------------------------------------------------------------

    fn put_name(&mut self, name: Name) -> usize {
        if let Some(&i) = self.names.get(&name) {
            return i;
        }
        let mut payload = PickleBuffer::new();
        payload.write_bytes(self.table.names.as_str(name).as_bytes());
        let tag = if name.is_type_name() { TYPE_NAME } else { TERM_NAME };
        let i = self.push(tag, payload);
        self.names.insert(name, i);
        i
    }

    fn is_pickle_root(&self, sym: SymbolId) -> bool {
        sym == self.class_root
            || sym == self.module_root
            || (self.module_root.exists() && sym == self.table.module_class(self.module_root))
    }

    /// Whether `sym` is written as a definition
    fn is_local(&self, sym: SymbolId) -> bool {
        let t = &self.table;
        sym.exists()
            && !t.is_package_class(sym)
            && !t.is_stub(sym)
            && (self.is_pickle_root(sym)
                || t.is_refinement_class(sym)
                || t.is_existential(sym)
                || t.has_flag(sym, Flags::PARAM)
                || self.is_local(t.raw_owner(sym)))
    }

    fn put_symbol(&mut self, sym: SymbolId) -> Result<usize, PickleError> {
        if let Some(&i) = self.symbols.get(&sym) {
            return Ok(i);
        }
        let i = self.reserve();
        self.symbols.insert(sym, i);
        if sym.is_none() {
            self.fill(i, NONE_SYM, PickleBuffer::new());
        } else if self.is_local(sym) {
            self.put_symbol_def(i, sym)?;
        } else {
            self.put_external(i, sym)?;
        }
        Ok(i)
    }

    fn put_symbol_def(&mut self, i: usize, sym: SymbolId) -> Result<(), PickleError> {
        let t = &self.table;
        let tag = if t.is_class(sym) {
            CLASS_SYM
        } else if t.is_module(sym) {
            MODULE_SYM
        } else if t.is_alias_type(sym) {
            ALIAS_SYM
        } else if t.is_type(sym) {
            TYPE_SYM
        } else {
            VAL_SYM
        };
        let flags = self.flag_table.raw_to_pickled(t.raw_flags(sym));
        let private_within = t.private_within(sym);
        let (raw_name, raw_owner) = (t.raw_name(sym), t.raw_owner(sym));

        let name_ref = self.put_name(raw_name);
        let owner_ref = self.put_symbol(raw_owner)?;
        let within_ref = if private_within.exists() {
            Some(self.put_symbol(private_within)?)
        } else {
            None
        };
        let info = self.info_of(sym)?;
        let info_ref = self.put_type(info)?;

        let trailing = if tag == CLASS_SYM {
            let this_sym = self.table.this_sym(sym);
            if this_sym != sym && this_sym.exists() {
                let self_type = self.info_of(this_sym)?;
                Some(self.put_type(self_type)?)
            } else {
                None
            }
        } else if tag == VAL_SYM && self.table.referenced(sym).exists() {
            let alias = self.table.referenced(sym);
            Some(self.put_symbol(alias)?)
        } else {
            None
        };

        let mut payload = PickleBuffer::new();
        payload.write_nat(name_ref as u32);
        payload.write_nat(owner_ref as u32);
        payload.write_long_nat(flags);
        if let Some(within) = within_ref {
            payload.write_nat(within as u32);
        }
        payload.write_nat(info_ref as u32);
        if let Some(extra) = trailing {
            payload.write_nat(extra as u32);
        }
        self.fill(i, tag, payload);

        for annotation in self.table.annotations(sym).to_vec() {
            self.put_symbol_annotation(sym, &annotation)?;
        }
        if tag == CLASS_SYM {
            let children = self.table.children(sym);
            if !children.is_empty() {
                self.put_children(sym, &children)?;
            }
        }
        Ok(())
    }

    fn put_external(&mut self, i: usize, sym: SymbolId) -> Result<(), PickleError> {
        let module_class = self.table.is_module_class(sym);
        let raw_name = self.table.raw_name(sym);
        let name = if module_class { raw_name.to_term_name() } else { raw_name };
        let owner = self.table.raw_owner(sym);

        let name_ref = self.put_name(name);
        let owner_ref = if owner.exists() && !self.table.is_root(owner) {
            Some(self.put_symbol(owner)?)
        } else {
            None
        };

        let mut payload = PickleBuffer::new();
        payload.write_nat(name_ref as u32);
        if let Some(owner_ref) = owner_ref {
            payload.write_nat(owner_ref as u32);
        }
        let tag = if module_class { EXT_MOD_CLASS_REF } else { EXT_REF };
        self.fill(i, tag, payload);
        Ok(())
    }

    fn put_symbol_annotation(&mut self, target: SymbolId, annotation: &AnnotationInfo) -> Result<(), PickleError> {
        let target_ref = self.put_symbol(target)?;
        let mut payload = PickleBuffer::new();
        payload.write_nat(target_ref as u32);
        self.write_annotation_body(&mut payload, annotation)?;
        self.push(SYMANNOT, payload);
        Ok(())
    }

    fn put_children(&mut self, class: SymbolId, children: &[SymbolId]) -> Result<(), PickleError> {
        let mut refs = vec![self.put_symbol(class)?];
        for &child in children {
            refs.push(self.put_symbol(child)?);
        }
        self.push(CHILDREN, refs_payload(&refs));
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Types
    // ---------------------------------------------------------------------

    fn put_type(&mut self, tp: TypeId) -> Result<usize, PickleError> {
        if let Some(&i) = self.types.get(&tp) {
            return Ok(i);
        }
        let i = self.reserve();
        self.types.insert(tp, i);

        let mut refs = Vec::new();
        let mut members = Vec::new();
        let tag = match self.table.types.get(tp).clone() {
            Type::NoType => NO_TPE,
            Type::NoPrefix => NO_PREFIX_TPE,
            Type::Error | Type::Wildcard | Type::Overloaded { .. } => {
                let shape = self.table.types.get(tp).shape();
                return Err(PickleError::Unpicklable(format!("{} type", shape)));
            }
            Type::This(sym) => {
                refs.push(self.put_symbol(sym)?);
                THIS_TPE
            }
            Type::Single { pre, sym } => {
                refs.push(self.put_type(pre)?);
                refs.push(self.put_symbol(sym)?);
                SINGLE_TPE
            }
            Type::Super { this, sup } => {
                refs.push(self.put_type(this)?);
                refs.push(self.put_type(sup)?);
                SUPER_TPE
            }
            Type::Constant(value) => {
                refs.push(self.put_constant(&value)?);
                CONSTANT_TPE
            }
            Type::TypeRef { pre, sym, args } => {
                refs.push(self.put_type(pre)?);
                refs.push(self.put_symbol(sym)?);
                for arg in args {
                    refs.push(self.put_type(arg)?);
                }
                TYPEREF_TPE
            }
            Type::Bounds { lo, hi } => {
                refs.push(self.put_type(lo)?);
                refs.push(self.put_type(hi)?);
                TYPEBOUNDS_TPE
            }
            Type::Refined { parents, decls, class } | Type::ClassInfo { parents, decls, class } => {
                let refined = matches!(self.table.types.get(tp), Type::Refined { .. });
                refs.push(self.put_symbol(class)?);
                for parent in parents {
                    refs.push(self.put_type(parent)?);
                }
                members = self.table.scopes.get(decls).symbols().to_vec();
                if refined { REFINED_TPE } else { CLASSINFO_TPE }
            }
            Type::Method { params, result } => {
                refs.push(self.put_type(result)?);
                for param in params {
                    refs.push(self.put_symbol(param)?);
                }
                METHOD_TPE
            }
            Type::NullaryMethod { result } => {
                refs.push(self.put_type(result)?);
                POLY_TPE
            }
            Type::Poly { tparams, result } => {
                refs.push(self.put_type(result)?);
                for tparam in tparams {
                    refs.push(self.put_symbol(tparam)?);
                }
                POLY_TPE
            }
            Type::Existential { quantified, underlying } => {
                refs.push(self.put_type(underlying)?);
                for sym in quantified {
                    refs.push(self.put_symbol(sym)?);
                }
                EXISTENTIAL_TPE
            }
            Type::Annotated { annotations, underlying } => {
                refs.push(self.put_type(underlying)?);
                for annotation in &annotations {
                    refs.push(self.put_annotation(annotation)?);
                }
                ANNOTATED_TPE
            }
        };
        self.fill(i, tag, refs_payload(&refs));

        for member in members {
            self.put_symbol(member)?;
        }
        Ok(i)
    }

    // ---------------------------------------------------------------------
    // Constants, annotations and trees
    // ---------------------------------------------------------------------

    fn put_constant(&mut self, value: &Constant) -> Result<usize, PickleError> {
        if let Some(&i) = self.constants.get(value) {
            return Ok(i);
        }
        let mut payload = PickleBuffer::new();
        let tag = match value {
            Constant::Unit => LITERAL_UNIT,
            Constant::Null => LITERAL_NULL,
            Constant::Boolean(b) => {
                payload.write_long(*b as i64);
                LITERAL_BOOLEAN
            }
            Constant::Byte(v) => {
                payload.write_long(*v as i64);
                LITERAL_BYTE
            }
            Constant::Short(v) => {
                payload.write_long(*v as i64);
                LITERAL_SHORT
            }
            Constant::Char(v) => {
                payload.write_long(*v as i64);
                LITERAL_CHAR
            }
            Constant::Int(v) => {
                payload.write_long(*v as i64);
                LITERAL_INT
            }
            Constant::Long(v) => {
                payload.write_long(*v);
                LITERAL_LONG
            }
            Constant::Float(bits) => {
                payload.write_long(*bits as i32 as i64);
                LITERAL_FLOAT
            }
            Constant::Double(bits) => {
                payload.write_long(*bits as i64);
                LITERAL_DOUBLE
            }
            Constant::String(text) => {
                let name = self.table.names.term_name(text);
                payload.write_nat(self.put_name(name) as u32);
                LITERAL_STRING
            }
            Constant::Class(tp) => {
                payload.write_nat(self.put_type(*tp)? as u32);
                LITERAL_CLASS
            }
            Constant::Enum(sym) => {
                payload.write_nat(self.put_symbol(*sym)? as u32);
                LITERAL_ENUM
            }
        };
        let i = self.push(tag, payload);
        self.constants.insert(value.clone(), i);
        Ok(i)
    }

    fn put_annotation(&mut self, annotation: &AnnotationInfo) -> Result<usize, PickleError> {
        let i = self.reserve();
        let mut payload = PickleBuffer::new();
        self.write_annotation_body(&mut payload, annotation)?;
        self.fill(i, ANNOT_INFO, payload);
        Ok(i)
    }

    fn write_annotation_body(
        &mut self,
        payload: &mut PickleBuffer,
        annotation: &AnnotationInfo,
    ) -> Result<(), PickleError> {
        payload.write_nat(self.put_type(annotation.atp)? as u32);
        for arg in &annotation.args {
            let arg_ref = match (&arg.constant, arg.tag) {
                (Some(value), TreeTag::Literal) => self.put_constant(value)?,
                _ => self.put_tree(arg)?,
            };
            payload.write_nat(arg_ref as u32);
        }
        for (name, value) in &annotation.assocs {
            payload.write_nat(self.put_name(*name) as u32);
            payload.write_nat(self.put_classfile_arg(value)? as u32);
        }
        Ok(())
    }

    fn put_classfile_arg(&mut self, arg: &ClassfileAnnotArg) -> Result<usize, PickleError> {
        match arg {
            ClassfileAnnotArg::Literal(value) => self.put_constant(value),
            ClassfileAnnotArg::Nested(annotation) => self.put_annotation(annotation),
            ClassfileAnnotArg::Array(elems) => {
                let i = self.reserve();
                let mut refs = Vec::with_capacity(elems.len());
                for elem in elems {
                    refs.push(self.put_classfile_arg(elem)?);
                }
                self.fill(i, ANNOT_ARG_ARRAY, refs_payload(&refs));
                Ok(i)
            }
        }
    }

    fn put_tree(&mut self, tree: &Tree) -> Result<usize, PickleError> {
        let i = self.reserve();
        let mut payload = PickleBuffer::new();
        payload.write_byte(tree.tag.code());
        if !tree.is_empty() {
            payload.write_nat(self.put_type(tree.tpe)? as u32);
        }
        let layout = tree.tag.layout();
        if layout.symbol {
            payload.write_nat(self.put_symbol(tree.symbol)? as u32);
        }
        if layout.modifiers {
            let r = self.put_modifiers(tree.modifiers.as_ref())?;
            payload.write_nat(r as u32);
        }
        if layout.name {
            let name = tree.name.ok_or_else(|| missing_field(tree, "name"))?;
            payload.write_nat(self.put_name(name) as u32);
        }
        if layout.constant {
            let value = tree.constant.as_ref().ok_or_else(|| missing_field(tree, "constant"))?;
            payload.write_nat(self.put_constant(value)? as u32);
        }
        for child in &tree.children {
            payload.write_nat(self.put_tree(child)? as u32);
        }
        self.fill(i, TREE, payload);
        Ok(i)
    }

    fn put_modifiers(&mut self, mods: Option<&Modifiers>) -> Result<usize, PickleError> {
        let (flags, within) = match mods {
            Some(m) => (m.flags, m.private_within),
            None => (Flags::NONE, nme::NO_NAME),
        };
        let pickled = self.flag_table.raw_to_pickled(flags);
        let mut payload = PickleBuffer::new();
        payload.write_nat((pickled >> 32) as u32);
        payload.write_nat((pickled & 0xffff_ffff) as u32);
        payload.write_nat(self.put_name(within) as u32);
        Ok(self.push(MODIFIERS, payload))
    }
}

fn refs_payload(refs: &[usize]) -> PickleBuffer {
    let mut payload = PickleBuffer::new();
    for &r in refs {
        payload.write_nat(r as u32);
    }
    payload
}

fn missing_field(tree: &Tree, field: &str) -> PickleError {
    PickleError::Unpicklable(format!("{:?} tree without a {}", tree.tag, field))
}
