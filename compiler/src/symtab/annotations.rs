//! Annotation values attached to symbols and annotated types

use super::id_types::TypeId;
use super::names::Name;
use super::trees::Tree;
use super::types::Constant;

/// Argument of a classfile-style (named) annotation argument
#[derive(Debug, Clone, PartialEq)]
pub enum ClassfileAnnotArg {
    Literal(Constant),
    Nested(Box<AnnotationInfo>),
    Array(Vec<ClassfileAnnotArg>),
}

/// An annotation: its type, positional tree arguments and named arguments
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationInfo {
    pub atp: TypeId,
    pub args: Vec<Tree>,
    pub assocs: Vec<(Name, ClassfileAnnotArg)>,
}

impl AnnotationInfo {
    pub fn new(atp: TypeId) -> Self {
        Self {
            atp,
            args: Vec::new(),
            assocs: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<Tree>) -> Self {
        self.args = args;
        self
    }

    pub fn with_assoc(mut self, name: Name, arg: ClassfileAnnotArg) -> Self {
        self.assocs.push((name, arg));
        self
    }

    /// Named argument lookup
    pub fn assoc(&self, name: Name) -> Option<&ClassfileAnnotArg> {
        self.assocs.iter().find(|(n, _)| *n == name).map(|(_, a)| a)
    }

    /// Constant value of the first positional argument, when it is a literal
    pub fn const_arg(&self) -> Option<&Constant> {
        self.args.first().and_then(|t| t.constant.as_ref())
    }
}
