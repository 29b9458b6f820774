//! Type representation and the type arena
//!
//! Types are immutable values stored in a `TypeTable` and addressed by
//! `TypeId`. Symbols referenced from types are `SymbolId`s into the owning
//! `SymbolTable`, so a type never borrows a symbol. Features:
//! - Fixed sentinel ids for `NoType`, `NoPrefix`, the error type and `_`
//! - Structure-preserving maps that only allocate when something changed
//! - Structural equality (`types_equal`) independent of allocation identity

use super::annotations::AnnotationInfo;
use super::id_types::{ScopeId, SymbolId, TypeId};
use smallvec::SmallVec;

/// Type arguments are almost always short
pub type TypeArgs = SmallVec<[TypeId; 2]>;

/// A compile-time constant
///
/// Floating point values are stored as raw bits so constants can be hashed
/// and compared for identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Unit,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(u32),
    Double(u64),
    String(String),
    Null,
    /// A class literal; the payload is the referenced type
    Class(TypeId),
    /// An enum constant; the payload is the enum value's symbol
    Enum(SymbolId),
}

impl Constant {
    pub fn float(value: f32) -> Self {
        Constant::Float(value.to_bits())
    }

    pub fn double(value: f64) -> Self {
        Constant::Double(value.to_bits())
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Constant::Float(bits) => Some(f32::from_bits(*bits)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Constant::Double(bits) => Some(f64::from_bits(*bits)),
            _ => None,
        }
    }

    /// Integral payload widened to i64, as stored in the pickle format
    pub fn as_long(&self) -> Option<i64> {
        match *self {
            Constant::Unit | Constant::Null => Some(0),
            Constant::Boolean(b) => Some(b as i64),
            Constant::Byte(v) => Some(v as i64),
            Constant::Short(v) => Some(v as i64),
            Constant::Char(v) => Some(v as i64),
            Constant::Int(v) => Some(v as i64),
            Constant::Long(v) => Some(v),
            Constant::Float(bits) => Some(bits as i64),
            Constant::Double(bits) => Some(bits as i64),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Constant::Unit => "Unit",
            Constant::Boolean(_) => "Boolean",
            Constant::Byte(_) => "Byte",
            Constant::Short(_) => "Short",
            Constant::Char(_) => "Char",
            Constant::Int(_) => "Int",
            Constant::Long(_) => "Long",
            Constant::Float(_) => "Float",
            Constant::Double(_) => "Double",
            Constant::String(_) => "String",
            Constant::Null => "Null",
            Constant::Class(_) => "Class",
            Constant::Enum(_) => "Enum",
        }
    }
}

/// The closed set of type shapes
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    NoType,
    NoPrefix,
    Error,
    Wildcard,
    This(SymbolId),
    Single { pre: TypeId, sym: SymbolId },
    Super { this: TypeId, sup: TypeId },
    Constant(Constant),
    TypeRef { pre: TypeId, sym: SymbolId, args: TypeArgs },
    Bounds { lo: TypeId, hi: TypeId },
    Refined { parents: Vec<TypeId>, decls: ScopeId, class: SymbolId },
    ClassInfo { parents: Vec<TypeId>, decls: ScopeId, class: SymbolId },
    Method { params: Vec<SymbolId>, result: TypeId },
    NullaryMethod { result: TypeId },
    Poly { tparams: Vec<SymbolId>, result: TypeId },
    Existential { quantified: Vec<SymbolId>, underlying: TypeId },
    Annotated { annotations: Vec<AnnotationInfo>, underlying: TypeId },
    Overloaded { pre: TypeId, alts: Vec<SymbolId> },
}

impl Type {
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Type::NoType | Type::NoPrefix | Type::Error | Type::Wildcard)
    }

    /// Short shape name used in debug output and error messages
    pub fn shape(&self) -> &'static str {
        match self {
            Type::NoType => "NoType",
            Type::NoPrefix => "NoPrefix",
            Type::Error => "ErrorType",
            Type::Wildcard => "WildcardType",
            Type::This(_) => "ThisType",
            Type::Single { .. } => "SingleType",
            Type::Super { .. } => "SuperType",
            Type::Constant(_) => "ConstantType",
            Type::TypeRef { .. } => "TypeRef",
            Type::Bounds { .. } => "TypeBounds",
            Type::Refined { .. } => "RefinedType",
            Type::ClassInfo { .. } => "ClassInfoType",
            Type::Method { .. } => "MethodType",
            Type::NullaryMethod { .. } => "NullaryMethodType",
            Type::Poly { .. } => "PolyType",
            Type::Existential { .. } => "ExistentialType",
            Type::Annotated { .. } => "AnnotatedType",
            Type::Overloaded { .. } => "OverloadedType",
        }
    }

    /// Result type for method-like types, the type itself otherwise
    pub fn result_type(&self) -> Option<TypeId> {
        match self {
            Type::Method { result, .. }
            | Type::NullaryMethod { result }
            | Type::Poly { result, .. } => Some(*result),
            _ => None,
        }
    }
}

/// A structural rewrite over types
///
/// `replace` may substitute a whole subtree; otherwise the map descends into
/// the parts and rebuilds the node only if a part changed.
pub trait TypeMap {
    fn replace(&mut self, _types: &mut TypeTable, _tp: TypeId) -> Option<TypeId> {
        None
    }

    fn map_symbol(&mut self, sym: SymbolId) -> SymbolId {
        sym
    }
}

/// Replace every reference to `from[i]` by `to[i]`
pub struct SubstSymMap<'a> {
    pub from: &'a [SymbolId],
    pub to: &'a [SymbolId],
}

impl TypeMap for SubstSymMap<'_> {
    fn map_symbol(&mut self, sym: SymbolId) -> SymbolId {
        match self.from.iter().position(|&s| s == sym) {
            Some(i) => self.to.get(i).copied().unwrap_or(sym),
            None => sym,
        }
    }
}

/// Replace unapplied references to `from[i]` by the type `to[i]`
pub struct SubstTypeMap<'a> {
    pub from: &'a [SymbolId],
    pub to: &'a [TypeId],
}

impl TypeMap for SubstTypeMap<'_> {
    fn replace(&mut self, types: &mut TypeTable, tp: TypeId) -> Option<TypeId> {
        match types.get(tp) {
            Type::TypeRef { sym, args, .. } if args.is_empty() => {
                let i = self.from.iter().position(|s| s == sym)?;
                self.to.get(i).copied()
            }
            _ => None,
        }
    }
}

/// Arena of types with fixed sentinel ids
#[derive(Debug, Clone)]
pub struct TypeTable {
    types: Vec<Type>,
}

impl TypeTable {
    pub const NO_TYPE: TypeId = TypeId(0);
    pub const NO_PREFIX: TypeId = TypeId(1);
    pub const ERROR: TypeId = TypeId(2);
    pub const WILDCARD: TypeId = TypeId(3);

    pub fn new() -> Self {
        let mut types = Vec::with_capacity(256);
        types.push(Type::NoType);
        types.push(Type::NoPrefix);
        types.push(Type::Error);
        types.push(Type::Wildcard);
        Self { types }
    }

    /// Store a type; sentinel shapes map to their fixed ids
    pub fn alloc(&mut self, ty: Type) -> TypeId {
        match ty {
            Type::NoType => Self::NO_TYPE,
            Type::NoPrefix => Self::NO_PREFIX,
            Type::Error => Self::ERROR,
            Type::Wildcard => Self::WILDCARD,
            other => {
                let id = TypeId(self.types.len() as u32);
                self.types.push(other);
                id
            }
        }
    }

    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.index()]
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.len() <= 4
    }

    pub fn is_no_type(&self, id: TypeId) -> bool {
        id == Self::NO_TYPE
    }

    pub fn is_error(&self, id: TypeId) -> bool {
        id == Self::ERROR
    }

    pub fn type_ref(&mut self, pre: TypeId, sym: SymbolId, args: impl IntoIterator<Item = TypeId>) -> TypeId {
        self.alloc(Type::TypeRef {
            pre,
            sym,
            args: args.into_iter().collect(),
        })
    }

    pub fn this_type(&mut self, sym: SymbolId) -> TypeId {
        self.alloc(Type::This(sym))
    }

    pub fn single_type(&mut self, pre: TypeId, sym: SymbolId) -> TypeId {
        self.alloc(Type::Single { pre, sym })
    }

    pub fn constant_type(&mut self, value: Constant) -> TypeId {
        self.alloc(Type::Constant(value))
    }

    pub fn bounds(&mut self, lo: TypeId, hi: TypeId) -> TypeId {
        self.alloc(Type::Bounds { lo, hi })
    }

    pub fn class_info(&mut self, parents: Vec<TypeId>, decls: ScopeId, class: SymbolId) -> TypeId {
        self.alloc(Type::ClassInfo { parents, decls, class })
    }

    pub fn method_type(&mut self, params: Vec<SymbolId>, result: TypeId) -> TypeId {
        self.alloc(Type::Method { params, result })
    }

    pub fn nullary_method_type(&mut self, result: TypeId) -> TypeId {
        self.alloc(Type::NullaryMethod { result })
    }

    /// A polymorphic type; no type parameters collapses to a nullary method
    pub fn poly_type(&mut self, tparams: Vec<SymbolId>, result: TypeId) -> TypeId {
        if tparams.is_empty() {
            self.nullary_method_type(result)
        } else {
            self.alloc(Type::Poly { tparams, result })
        }
    }

    /// Apply `map` to `tp`, preserving the id of every unchanged subtree
    pub fn map(&mut self, tp: TypeId, map: &mut dyn TypeMap) -> TypeId {
        if let Some(replaced) = map.replace(self, tp) {
            return replaced;
        }
        let rebuilt = match self.get(tp).clone() {
            Type::NoType | Type::NoPrefix | Type::Error | Type::Wildcard | Type::Constant(_) => None,
            Type::This(sym) => {
                let sym1 = map.map_symbol(sym);
                (sym1 != sym).then_some(Type::This(sym1))
            }
            Type::Single { pre, sym } => {
                let pre1 = self.map(pre, map);
                let sym1 = map.map_symbol(sym);
                (pre1 != pre || sym1 != sym).then_some(Type::Single { pre: pre1, sym: sym1 })
            }
            Type::Super { this, sup } => {
                let this1 = self.map(this, map);
                let sup1 = self.map(sup, map);
                (this1 != this || sup1 != sup).then_some(Type::Super { this: this1, sup: sup1 })
            }
            Type::TypeRef { pre, sym, args } => {
                let pre1 = self.map(pre, map);
                let sym1 = map.map_symbol(sym);
                let args1: TypeArgs = args.iter().map(|&a| self.map(a, map)).collect();
                (pre1 != pre || sym1 != sym || args1 != args).then_some(Type::TypeRef {
                    pre: pre1,
                    sym: sym1,
                    args: args1,
                })
            }
            Type::Bounds { lo, hi } => {
                let lo1 = self.map(lo, map);
                let hi1 = self.map(hi, map);
                (lo1 != lo || hi1 != hi).then_some(Type::Bounds { lo: lo1, hi: hi1 })
            }
            Type::Refined { parents, decls, class } => {
                let parents1 = self.map_all(&parents, map);
                (parents1 != parents).then_some(Type::Refined { parents: parents1, decls, class })
            }
            Type::ClassInfo { parents, decls, class } => {
                let parents1 = self.map_all(&parents, map);
                (parents1 != parents).then_some(Type::ClassInfo { parents: parents1, decls, class })
            }
            Type::Method { params, result } => {
                let params1 = map_symbols(&params, map);
                let result1 = self.map(result, map);
                (params1 != params || result1 != result).then_some(Type::Method {
                    params: params1,
                    result: result1,
                })
            }
            Type::NullaryMethod { result } => {
                let result1 = self.map(result, map);
                (result1 != result).then_some(Type::NullaryMethod { result: result1 })
            }
            Type::Poly { tparams, result } => {
                let tparams1 = map_symbols(&tparams, map);
                let result1 = self.map(result, map);
                (tparams1 != tparams || result1 != result).then_some(Type::Poly {
                    tparams: tparams1,
                    result: result1,
                })
            }
            Type::Existential { quantified, underlying } => {
                let quantified1 = map_symbols(&quantified, map);
                let underlying1 = self.map(underlying, map);
                (quantified1 != quantified || underlying1 != underlying).then_some(Type::Existential {
                    quantified: quantified1,
                    underlying: underlying1,
                })
            }
            Type::Annotated { annotations, underlying } => {
                let underlying1 = self.map(underlying, map);
                (underlying1 != underlying).then_some(Type::Annotated {
                    annotations,
                    underlying: underlying1,
                })
            }
            Type::Overloaded { pre, alts } => {
                let pre1 = self.map(pre, map);
                let alts1 = map_symbols(&alts, map);
                (pre1 != pre || alts1 != alts).then_some(Type::Overloaded { pre: pre1, alts: alts1 })
            }
        };
        match rebuilt {
            Some(ty) => self.alloc(ty),
            None => tp,
        }
    }

    fn map_all(&mut self, tps: &[TypeId], map: &mut dyn TypeMap) -> Vec<TypeId> {
        tps.iter().map(|&t| self.map(t, map)).collect()
    }

    pub fn subst_sym(&mut self, tp: TypeId, from: &[SymbolId], to: &[SymbolId]) -> TypeId {
        if from.is_empty() {
            return tp;
        }
        self.map(tp, &mut SubstSymMap { from, to })
    }

    pub fn subst_types(&mut self, tp: TypeId, from: &[SymbolId], to: &[TypeId]) -> TypeId {
        if from.is_empty() {
            return tp;
        }
        self.map(tp, &mut SubstTypeMap { from, to })
    }

    /// Structural equality; symbols compare by id, scopes by id
    pub fn types_equal(&self, a: TypeId, b: TypeId) -> bool {
        if a == b {
            return true;
        }
        match (self.get(a), self.get(b)) {
            (Type::This(s1), Type::This(s2)) => s1 == s2,
            (Type::Single { pre: p1, sym: s1 }, Type::Single { pre: p2, sym: s2 }) => {
                s1 == s2 && self.types_equal(*p1, *p2)
            }
            (Type::Super { this: t1, sup: u1 }, Type::Super { this: t2, sup: u2 }) => {
                self.types_equal(*t1, *t2) && self.types_equal(*u1, *u2)
            }
            (Type::Constant(c1), Type::Constant(c2)) => match (c1, c2) {
                (Constant::Class(t1), Constant::Class(t2)) => self.types_equal(*t1, *t2),
                _ => c1 == c2,
            },
            (
                Type::TypeRef { pre: p1, sym: s1, args: a1 },
                Type::TypeRef { pre: p2, sym: s2, args: a2 },
            ) => s1 == s2 && self.types_equal(*p1, *p2) && self.all_equal(a1, a2),
            (Type::Bounds { lo: l1, hi: h1 }, Type::Bounds { lo: l2, hi: h2 }) => {
                self.types_equal(*l1, *l2) && self.types_equal(*h1, *h2)
            }
            (
                Type::Refined { parents: p1, decls: d1, .. },
                Type::Refined { parents: p2, decls: d2, .. },
            )
            | (
                Type::ClassInfo { parents: p1, decls: d1, .. },
                Type::ClassInfo { parents: p2, decls: d2, .. },
            ) => d1 == d2 && self.all_equal(p1, p2),
            (Type::Method { params: p1, result: r1 }, Type::Method { params: p2, result: r2 }) => {
                p1 == p2 && self.types_equal(*r1, *r2)
            }
            (Type::NullaryMethod { result: r1 }, Type::NullaryMethod { result: r2 }) => {
                self.types_equal(*r1, *r2)
            }
            (Type::Poly { tparams: t1, result: r1 }, Type::Poly { tparams: t2, result: r2 }) => {
                t1 == t2 && self.types_equal(*r1, *r2)
            }
            (
                Type::Existential { quantified: q1, underlying: u1 },
                Type::Existential { quantified: q2, underlying: u2 },
            ) => q1 == q2 && self.types_equal(*u1, *u2),
            (
                Type::Annotated { annotations: a1, underlying: u1 },
                Type::Annotated { annotations: a2, underlying: u2 },
            ) => a1 == a2 && self.types_equal(*u1, *u2),
            (Type::Overloaded { pre: p1, alts: a1 }, Type::Overloaded { pre: p2, alts: a2 }) => {
                a1 == a2 && self.types_equal(*p1, *p2)
            }
            _ => false,
        }
    }

    fn all_equal(&self, a: &[TypeId], b: &[TypeId]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| self.types_equal(x, y))
    }

    /// The symbol a type is "about", without completing anything
    pub fn type_symbol_direct(&self, tp: TypeId) -> SymbolId {
        match self.get(tp) {
            Type::TypeRef { sym, .. } | Type::This(sym) => *sym,
            Type::Refined { class, .. } | Type::ClassInfo { class, .. } => *class,
            Type::Annotated { underlying, .. } | Type::Existential { underlying, .. } => {
                self.type_symbol_direct(*underlying)
            }
            Type::Poly { result, .. } | Type::NullaryMethod { result } => {
                self.type_symbol_direct(*result)
            }
            _ => SymbolId::NONE,
        }
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

fn map_symbols(syms: &[SymbolId], map: &mut dyn TypeMap) -> Vec<SymbolId> {
    syms.iter().map(|&s| map.map_symbol(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(n: u32) -> SymbolId {
        SymbolId::from_raw(n)
    }

    #[test]
    fn test_sentinels_have_fixed_ids() {
        let mut types = TypeTable::new();
        assert_eq!(types.alloc(Type::NoType), TypeTable::NO_TYPE);
        assert_eq!(types.alloc(Type::Error), TypeTable::ERROR);
        assert_eq!(types.alloc(Type::Wildcard), TypeTable::WILDCARD);
        assert!(types.is_empty());
    }

    #[test]
    fn test_subst_sym_preserves_unchanged_ids() {
        let mut types = TypeTable::new();
        let pre = types.this_type(sym(1));
        let int = types.type_ref(pre, sym(5), []);
        let list = types.type_ref(pre, sym(6), [int]);

        assert_eq!(types.subst_sym(list, &[sym(9)], &[sym(10)]), list);

        let renamed = types.subst_sym(list, &[sym(5)], &[sym(7)]);
        assert_ne!(renamed, list);
        match types.get(renamed) {
            Type::TypeRef { sym: s, args, .. } => {
                assert_eq!(*s, sym(6));
                assert_eq!(types.type_symbol_direct(args[0]), sym(7));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_subst_types_replaces_type_params() {
        let mut types = TypeTable::new();
        let t_param = types.type_ref(TypeTable::NO_PREFIX, sym(3), []);
        let int = types.type_ref(TypeTable::NO_PREFIX, sym(4), []);
        let method = types.method_type(vec![sym(8)], t_param);
        let applied = types.subst_types(method, &[sym(3)], &[int]);
        assert_eq!(types.get(applied).result_type(), Some(int));
    }

    #[test]
    fn test_structural_equality() {
        let mut types = TypeTable::new();
        let a = types.type_ref(TypeTable::NO_PREFIX, sym(4), []);
        let b = types.type_ref(TypeTable::NO_PREFIX, sym(4), []);
        let c = types.type_ref(TypeTable::NO_PREFIX, sym(5), []);
        assert_ne!(a, b);
        assert!(types.types_equal(a, b));
        assert!(!types.types_equal(a, c));
        let k1 = types.constant_type(Constant::double(1.5));
        let k2 = types.constant_type(Constant::double(1.5));
        assert!(types.types_equal(k1, k2));
    }

    #[test]
    fn test_poly_without_params_is_nullary() {
        let mut types = TypeTable::new();
        let res = types.type_ref(TypeTable::NO_PREFIX, sym(4), []);
        let poly = types.poly_type(vec![], res);
        assert!(matches!(types.get(poly), Type::NullaryMethod { .. }));
    }
}
