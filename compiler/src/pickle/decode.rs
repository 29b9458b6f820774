//! Decoders for type, constant, annotation and tree entries

use super::error::{DecodeError, DecodeResult};
use super::format::*;
use super::unpickler::{Entry, Unpickler};
use crate::symtab::{
    AnnotationInfo, ClassfileAnnotArg, Constant, Flags, Modifiers, SymbolId, SymbolTable, Tree, TreeTag, Type,
    TypeId, TypeTable,
};
use std::rc::Rc;

impl Unpickler {
    pub(super) fn type_at(self: &Rc<Self>, table: &mut SymbolTable, i: usize) -> DecodeResult<TypeId> {
        match self.at(table, i, Self::read_type)? {
            Entry::Type(tp) => Ok(tp),
            _ => Err(self.unexpected(i)),
        }
    }

    pub(super) fn constant_at(self: &Rc<Self>, table: &mut SymbolTable, i: usize) -> DecodeResult<Constant> {
        match self.at(table, i, Self::read_constant)? {
            Entry::Constant(value) => Ok(value),
            _ => Err(self.unexpected(i)),
        }
    }

    fn annotation_at(self: &Rc<Self>, table: &mut SymbolTable, i: usize) -> DecodeResult<Rc<AnnotationInfo>> {
        match self.at(table, i, Self::read_annotation)? {
            Entry::Annotation(annotation) => Ok(annotation),
            _ => Err(self.unexpected(i)),
        }
    }

    fn tree_at(self: &Rc<Self>, table: &mut SymbolTable, i: usize) -> DecodeResult<Rc<Tree>> {
        match self.at(table, i, Self::read_tree)? {
            Entry::Tree(tree) => Ok(tree),
            _ => Err(self.unexpected(i)),
        }
    }

    fn modifiers_at(self: &Rc<Self>, table: &mut SymbolTable, i: usize) -> DecodeResult<Modifiers> {
        match self.at(table, i, Self::read_modifiers)? {
            Entry::Modifiers(mods) => Ok(mods),
            _ => Err(self.unexpected(i)),
        }
    }

    fn read_type_ref(self: &Rc<Self>, table: &mut SymbolTable) -> DecodeResult<TypeId> {
        let i = self.buf.read_nat()? as usize;
        self.type_at(table, i)
    }

    fn read_constant_ref(self: &Rc<Self>, table: &mut SymbolTable) -> DecodeResult<Constant> {
        let i = self.buf.read_nat()? as usize;
        self.constant_at(table, i)
    }

    fn read_types(self: &Rc<Self>, table: &mut SymbolTable, end: usize) -> DecodeResult<Vec<TypeId>> {
        self.buf.until(end, || self.read_type_ref(table))
    }

    fn read_symbols(self: &Rc<Self>, table: &mut SymbolTable, end: usize) -> DecodeResult<Vec<SymbolId>> {
        self.buf.until(end, || self.read_symbol_ref(table))
    }

    // ---------------------------------------------------------------------
    // Types
    // ---------------------------------------------------------------------

    fn read_type(self: &Rc<Self>, table: &mut SymbolTable, i: usize) -> DecodeResult<Entry> {
        let tag = self.buf.read_byte()?;
        let end = self.buf.read_end()?;
        let tp = match tag {
            NO_TPE => TypeTable::NO_TYPE,
            NO_PREFIX_TPE => TypeTable::NO_PREFIX,
            THIS_TPE => {
                let sym = self.read_symbol_ref(table)?;
                table.types.this_type(sym)
            }
            SINGLE_TPE => {
                let pre = self.read_type_ref(table)?;
                let sym = self.read_symbol_ref(table)?;
                table.types.single_type(pre, sym)
            }
            SUPER_TPE => {
                let this = self.read_type_ref(table)?;
                let sup = self.read_type_ref(table)?;
                table.types.alloc(Type::Super { this, sup })
            }
            CONSTANT_TPE => {
                let value = self.read_constant_ref(table)?;
                table.types.constant_type(value)
            }
            TYPEREF_TPE => {
                let pre = self.read_type_ref(table)?;
                let sym = self.read_symbol_ref(table)?;
                let args = self.read_types(table, end)?;
                table.types.type_ref(pre, sym, args)
            }
            TYPEBOUNDS_TPE => {
                let lo = self.read_type_ref(table)?;
                let hi = self.read_type_ref(table)?;
                table.types.bounds(lo, hi)
            }
            REFINED_TPE | CLASSINFO_TPE => {
                let class = self.read_symbol_ref(table)?;
                let parents = self.read_types(table, end)?;
                let decls = self.sym_scope(table, class);
                if tag == REFINED_TPE {
                    table.types.alloc(Type::Refined { parents, decls, class })
                } else {
                    table.types.class_info(parents, decls, class)
                }
            }
            METHOD_TPE | IMPLICIT_METHOD_TPE => {
                let result = self.read_type_ref(table)?;
                let params = self.read_symbols(table, end)?;
                if tag == IMPLICIT_METHOD_TPE {
                    for &param in &params {
                        table.set_flag(param, Flags::IMPLICIT);
                    }
                }
                // parameters of an overloaded reference cannot be told apart
                if params.iter().any(|&p| table.is_overloaded(p)) {
                    TypeTable::NO_TYPE
                } else {
                    table.types.method_type(params, result)
                }
            }
            POLY_TPE => {
                let result = self.read_type_ref(table)?;
                let tparams = self.read_symbols(table, end)?;
                table.types.poly_type(tparams, result)
            }
            EXISTENTIAL_TPE => {
                let underlying = self.read_type_ref(table)?;
                let quantified = self.read_symbols(table, end)?;
                if quantified.is_empty() {
                    underlying
                } else {
                    table.types.alloc(Type::Existential { quantified, underlying })
                }
            }
            ANNOTATED_TPE => {
                let underlying = self.read_type_ref(table)?;
                let annotations = self.buf.until(end, || {
                    let r = self.buf.read_nat()? as usize;
                    self.annotation_at(table, r).map(|a| (*a).clone())
                })?;
                table.types.alloc(Type::Annotated { annotations, underlying })
            }
            DEBRUIJN_INDEX_TPE => {
                return Err(DecodeError::Malformed(format!("obsolete de Bruijn index type in entry {}", i)));
            }
            _ => return Err(DecodeError::UnknownTag { tag, index: i }),
        };
        Ok(Entry::Type(tp))
    }

    // ---------------------------------------------------------------------
    // Constants
    // ---------------------------------------------------------------------

    fn read_constant(self: &Rc<Self>, table: &mut SymbolTable, i: usize) -> DecodeResult<Entry> {
        let tag = self.buf.read_byte()?;
        let len = self.buf.read_nat()? as usize;
        let value = match tag {
            LITERAL_UNIT => Constant::Unit,
            LITERAL_BOOLEAN => Constant::Boolean(self.buf.read_long(len)? != 0),
            LITERAL_BYTE => Constant::Byte(self.buf.read_long(len)? as i8),
            LITERAL_SHORT => Constant::Short(self.buf.read_long(len)? as i16),
            LITERAL_CHAR => Constant::Char(self.buf.read_long(len)? as u16),
            LITERAL_INT => Constant::Int(self.buf.read_long(len)? as i32),
            LITERAL_LONG => Constant::Long(self.buf.read_long(len)?),
            LITERAL_FLOAT => Constant::Float(self.buf.read_long(len)? as i32 as u32),
            LITERAL_DOUBLE => Constant::Double(self.buf.read_long(len)? as u64),
            LITERAL_STRING => {
                let name = self.read_name_ref(table)?;
                Constant::String(table.names.as_str(name).to_string())
            }
            LITERAL_NULL => Constant::Null,
            LITERAL_CLASS => Constant::Class(self.read_type_ref(table)?),
            LITERAL_ENUM => Constant::Enum(self.read_symbol_ref(table)?),
            _ => return Err(DecodeError::UnknownTag { tag, index: i }),
        };
        Ok(Entry::Constant(value))
    }

    // ---------------------------------------------------------------------
    // Annotations
    // ---------------------------------------------------------------------

    fn read_annotation(self: &Rc<Self>, table: &mut SymbolTable, i: usize) -> DecodeResult<Entry> {
        let tag = self.buf.read_byte()?;
        if tag != ANNOT_INFO {
            return Err(DecodeError::UnknownTag { tag, index: i });
        }
        let end = self.buf.read_end()?;
        let annotation = self.read_annotation_info(table, end)?;
        Ok(Entry::Annotation(Rc::new(annotation)))
    }

    /// The body shared by `ANNOTINFO` and `SYMANNOT` entries: the annotation
    /// type, then positional arguments and `(name, argument)` pairs
    pub(super) fn read_annotation_info(
        self: &Rc<Self>,
        table: &mut SymbolTable,
        end: usize,
    ) -> DecodeResult<AnnotationInfo> {
        let atp = self.read_type_ref(table)?;
        let mut annotation = AnnotationInfo::new(atp);
        while self.buf.read_index() < end {
            let arg_ref = self.buf.read_nat()? as usize;
            if self.is_name_entry(arg_ref)? {
                let name = self.name_at(table, arg_ref)?;
                let value_ref = self.buf.read_nat()? as usize;
                let value = self.classfile_arg_at(table, value_ref)?;
                annotation.assocs.push((name, value));
            } else {
                let arg = self.annotation_arg_at(table, arg_ref)?;
                annotation.args.push(arg);
            }
        }
        Ok(annotation)
    }

    /// A positional argument is a tree entry or a bare constant
    fn annotation_arg_at(self: &Rc<Self>, table: &mut SymbolTable, i: usize) -> DecodeResult<Tree> {
        if self.tag_at(i)? == TREE {
            return Ok((*self.tree_at(table, i)?).clone());
        }
        let value = self.constant_at(table, i)?;
        let tpe = table.types.constant_type(value.clone());
        Ok(Tree::literal(value, tpe))
    }

    fn classfile_arg_at(self: &Rc<Self>, table: &mut SymbolTable, i: usize) -> DecodeResult<ClassfileAnnotArg> {
        match self.tag_at(i)? {
            ANNOT_INFO => {
                let nested = self.annotation_at(table, i)?;
                Ok(ClassfileAnnotArg::Nested(Box::new((*nested).clone())))
            }
            ANNOT_ARG_ARRAY => match self.at(table, i, Self::read_annotation_array)? {
                Entry::ClassfileArg(arg) => Ok((*arg).clone()),
                _ => Err(self.unexpected(i)),
            },
            _ => Ok(ClassfileAnnotArg::Literal(self.constant_at(table, i)?)),
        }
    }

    fn read_annotation_array(self: &Rc<Self>, table: &mut SymbolTable, _i: usize) -> DecodeResult<Entry> {
        self.buf.read_byte()?;
        let end = self.buf.read_end()?;
        let elems = self.buf.until(end, || {
            let r = self.buf.read_nat()? as usize;
            self.classfile_arg_at(table, r)
        })?;
        Ok(Entry::ClassfileArg(Rc::new(ClassfileAnnotArg::Array(elems))))
    }

    // ---------------------------------------------------------------------
    // Trees
    // ---------------------------------------------------------------------

    /// `TREE` entries: the tree tag, a type unless the tree is empty, the
    /// fixed fields of the tag's layout, then child trees up to the end
    fn read_tree(self: &Rc<Self>, table: &mut SymbolTable, i: usize) -> DecodeResult<Entry> {
        let tag = self.buf.read_byte()?;
        if tag != TREE {
            return Err(DecodeError::UnknownTag { tag, index: i });
        }
        let end = self.buf.read_end()?;
        let code = self.buf.read_byte()?;
        let tree_tag = TreeTag::from_u8(code)
            .ok_or_else(|| DecodeError::Malformed(format!("unknown tree tag {} in entry {}", code, i)))?;

        let mut tree = Tree::new(tree_tag);
        if tree_tag != TreeTag::Empty {
            tree.tpe = self.read_type_ref(table)?;
        }
        let layout = tree_tag.layout();
        if layout.symbol {
            tree.symbol = self.read_symbol_ref(table)?;
        }
        if layout.modifiers {
            let r = self.buf.read_nat()? as usize;
            tree.modifiers = Some(self.modifiers_at(table, r)?);
        }
        if layout.name {
            tree.name = Some(self.read_name_ref(table)?);
        }
        if layout.constant {
            tree.constant = Some(self.read_constant_ref(table)?);
        }
        tree.children = self.buf.until(end, || {
            let r = self.buf.read_nat()? as usize;
            self.tree_at(table, r).map(|t| (*t).clone())
        })?;
        Ok(Entry::Tree(Rc::new(tree)))
    }

    fn read_modifiers(self: &Rc<Self>, table: &mut SymbolTable, i: usize) -> DecodeResult<Entry> {
        let tag = self.buf.read_byte()?;
        if tag != MODIFIERS {
            return Err(DecodeError::UnknownTag { tag, index: i });
        }
        self.buf.read_end()?;
        let hi = self.buf.read_nat()? as u64;
        let lo = self.buf.read_nat()? as u64;
        let flags = self.flag_table.pickled_to_raw((hi << 32) | lo);
        let private_within = self.read_name_ref(table)?;
        Ok(Entry::Modifiers(Modifiers { flags, private_within }))
    }
}
