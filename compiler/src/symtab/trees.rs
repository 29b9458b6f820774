//! Generic trees carried by pickled annotations
//!
//! Signature files only need trees for annotation arguments, so every tree
//! shape is one generic node: the tag says what it is, and the optional
//! fields carry whatever that shape has. The field layout of each tag is
//! fixed by `TreeTag::layout`, which the reader and the writer share.

use super::flags::Flags;
use super::id_types::{SymbolId, TypeId};
use super::names::Name;
use super::types::{Constant, TypeTable};

/// Fields stored for a tree tag, in wire order after the type reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeLayout {
    pub symbol: bool,
    pub modifiers: bool,
    pub name: bool,
    pub constant: bool,
}

const NONE: TreeLayout = TreeLayout { symbol: false, modifiers: false, name: false, constant: false };
const SYM: TreeLayout = TreeLayout { symbol: true, ..NONE };
const SYM_NAME: TreeLayout = TreeLayout { symbol: true, name: true, ..NONE };
const DEF: TreeLayout = TreeLayout { symbol: true, modifiers: true, name: true, constant: false };
const NAME: TreeLayout = TreeLayout { name: true, ..NONE };
const CONST: TreeLayout = TreeLayout { constant: true, ..NONE };

macro_rules! tree_tags {
    ($($variant:ident = $code:literal => $layout:expr,)*) => {
        /// Tree shape tags as stored in `TREE` entries
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum TreeTag {
            $($variant = $code,)*
        }

        impl TreeTag {
            pub fn from_u8(code: u8) -> Option<TreeTag> {
                match code {
                    $($code => Some(TreeTag::$variant),)*
                    _ => None,
                }
            }

            pub fn layout(self) -> TreeLayout {
                match self {
                    $(TreeTag::$variant => $layout,)*
                }
            }
        }
    };
}

tree_tags! {
    Empty = 1 => NONE,
    Package = 2 => SYM,
    Class = 3 => DEF,
    Module = 4 => DEF,
    ValDef = 5 => DEF,
    DefDef = 6 => DEF,
    TypeDef = 7 => DEF,
    LabelDef = 8 => SYM_NAME,
    Import = 9 => SYM,
    Template = 12 => SYM,
    Block = 13 => NONE,
    CaseDef = 14 => NONE,
    Alternative = 16 => NONE,
    Star = 17 => NONE,
    Bind = 18 => SYM_NAME,
    UnApply = 19 => NONE,
    ArrayValue = 20 => NONE,
    Function = 21 => SYM,
    Assign = 22 => NONE,
    If = 23 => NONE,
    Match = 24 => NONE,
    Return = 25 => SYM,
    Try = 26 => NONE,
    Throw = 27 => NONE,
    New = 28 => NONE,
    Typed = 29 => NONE,
    TypeApply = 30 => NONE,
    Apply = 31 => NONE,
    ApplyDynamic = 32 => SYM,
    Super = 33 => SYM_NAME,
    This = 34 => SYM_NAME,
    Select = 35 => SYM_NAME,
    Ident = 36 => SYM_NAME,
    Literal = 37 => CONST,
    TypeTree = 38 => NONE,
    Annotated = 39 => NONE,
    SingletonTypeTree = 40 => NONE,
    SelectFromTypeTree = 41 => NAME,
    CompoundTypeTree = 42 => NONE,
    AppliedTypeTree = 43 => NONE,
    TypeBoundsTree = 44 => NONE,
    ExistentialTypeTree = 45 => NONE,
}

impl TreeTag {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Modifiers of definition trees
#[derive(Debug, Clone, PartialEq)]
pub struct Modifiers {
    pub flags: Flags,
    pub private_within: Name,
}

/// A generic tree node
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    pub tag: TreeTag,
    pub tpe: TypeId,
    pub symbol: SymbolId,
    pub modifiers: Option<Modifiers>,
    pub name: Option<Name>,
    pub constant: Option<Constant>,
    pub children: Vec<Tree>,
}

impl Tree {
    pub fn new(tag: TreeTag) -> Self {
        Self {
            tag,
            tpe: TypeTable::NO_TYPE,
            symbol: SymbolId::NONE,
            modifiers: None,
            name: None,
            constant: None,
            children: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new(TreeTag::Empty)
    }

    pub fn literal(value: Constant, tpe: TypeId) -> Self {
        Self {
            constant: Some(value),
            tpe,
            ..Self::new(TreeTag::Literal)
        }
    }

    pub fn with_children(mut self, children: Vec<Tree>) -> Self {
        self.children = children;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tag == TreeTag::Empty
    }

    /// Number of nodes in this tree, itself included
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(Tree::size).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_codes_round_trip() {
        for code in 0..=60u8 {
            if let Some(tag) = TreeTag::from_u8(code) {
                assert_eq!(tag.code(), code);
            }
        }
        assert_eq!(TreeTag::from_u8(10), None);
        assert_eq!(TreeTag::from_u8(37), Some(TreeTag::Literal));
    }

    #[test]
    fn test_layouts() {
        assert!(TreeTag::Literal.layout().constant);
        assert!(TreeTag::DefDef.layout().modifiers);
        assert!(!TreeTag::Apply.layout().symbol);
        assert!(TreeTag::Select.layout().name);
    }

    #[test]
    fn test_tree_size() {
        let tree = Tree::new(TreeTag::Apply).with_children(vec![
            Tree::new(TreeTag::Ident),
            Tree::literal(Constant::Int(1), TypeTable::NO_TYPE),
        ]);
        assert_eq!(tree.size(), 3);
        assert!(!tree.is_empty());
    }
}
