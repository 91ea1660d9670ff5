//! Base type system interface.
//!
//! Base types are the host language's own types, before any qualifier is
//! attached. The engine treats the oracle as authoritative: if it says two
//! base types are related, the engine only adds the qualifier half of the
//! judgment on top.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::fmt::Write as _;

/// Interned handle for a base type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BaseTypeId(pub u32);

/// Identifier of a class or interface declaration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

/// Identifier of a generic type parameter (class or method).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeParamId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveKind {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    /// Widening primitive conversion (identity included).
    pub fn widens_to(self, target: PrimitiveKind) -> bool {
        use PrimitiveKind::*;
        if self == target {
            return true;
        }
        match self {
            Byte => matches!(target, Short | Int | Long | Float | Double),
            Short | Char => matches!(target, Int | Long | Float | Double),
            Int => matches!(target, Long | Float | Double),
            Long => matches!(target, Float | Double),
            Float => target == Double,
            Double | Boolean => false,
        }
    }
}

/// Structural data of a base type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BaseTypeData {
    /// A class or interface use, with one argument per declared type
    /// parameter (or none for a raw use).
    Declared {
        class: ClassId,
        args: SmallVec<[BaseTypeId; 2]>,
    },
    Array(BaseTypeId),
    TypeVariable(TypeParamId),
    Primitive(PrimitiveKind),
    Null,
    Void,
    Error,
}

/// Structural classification shared by base and qualified types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    Declared,
    Array,
    TypeVariable,
    Executable,
    Primitive,
    Other,
}

bitflags::bitflags! {
    /// Variance of a type parameter.
    ///
    /// - `COVARIANT`: arguments compare in the same direction as the use
    /// - `CONTRAVARIANT`: arguments compare in the opposite direction
    /// - both (`INVARIANT`): arguments must be equivalent
    /// - neither (`BIVARIANT`): the argument does not constrain the use
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Variance: u8 {
        const COVARIANT = 1 << 0;
        const CONTRAVARIANT = 1 << 1;
        const INVARIANT = Self::COVARIANT.bits() | Self::CONTRAVARIANT.bits();
        const BIVARIANT = 0;
    }
}

impl Variance {
    pub fn is_covariant(self) -> bool {
        self == Variance::COVARIANT
    }

    pub fn is_contravariant(self) -> bool {
        self == Variance::CONTRAVARIANT
    }

    pub fn is_invariant(self) -> bool {
        self == Variance::INVARIANT
    }

    pub fn is_bivariant(self) -> bool {
        self.is_empty()
    }
}

/// A class or interface declaration as the base type system sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDecl {
    pub name: String,
    pub type_params: Vec<TypeParamId>,
    /// Direct supertypes, written in terms of `type_params`.
    pub supertypes: Vec<BaseTypeId>,
    pub is_interface: bool,
}

/// A generic type parameter declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeParamDecl {
    pub name: String,
    pub upper_bound: BaseTypeId,
    /// Declared use-site variance, if the host language has one.
    pub variance: Option<Variance>,
}

/// The base type system, as consumed by the qualifier engine.
///
/// Implementations must be immutable from the engine's point of view;
/// `intern` may allocate new handles but never changes existing ones.
pub trait BaseTypeOracle: Send + Sync {
    fn lookup(&self, id: BaseTypeId) -> Option<BaseTypeData>;

    fn intern(&self, data: BaseTypeData) -> BaseTypeId;

    fn class(&self, id: ClassId) -> Option<&ClassDecl>;

    fn type_param(&self, id: TypeParamId) -> Option<&TypeParamDecl>;

    /// The root class of the reference type hierarchy.
    fn object_class(&self) -> ClassId;

    /// Base subtyping: reflexive, transitive, covariant arrays, `null` below
    /// every reference type, invariant type arguments.
    fn is_subtype(&self, sub: BaseTypeId, sup: BaseTypeId) -> bool;

    fn object(&self) -> BaseTypeId {
        self.intern(BaseTypeData::Declared {
            class: self.object_class(),
            args: SmallVec::new(),
        })
    }

    fn null(&self) -> BaseTypeId {
        self.intern(BaseTypeData::Null)
    }

    fn shape(&self, id: BaseTypeId) -> Shape {
        match self.lookup(id) {
            Some(BaseTypeData::Declared { .. }) => Shape::Declared,
            Some(BaseTypeData::Array(_)) => Shape::Array,
            Some(BaseTypeData::TypeVariable(_)) => Shape::TypeVariable,
            Some(BaseTypeData::Primitive(_)) => Shape::Primitive,
            Some(BaseTypeData::Null | BaseTypeData::Void | BaseTypeData::Error) | None => {
                Shape::Other
            }
        }
    }

    fn type_arguments(&self, id: BaseTypeId) -> SmallVec<[BaseTypeId; 2]> {
        match self.lookup(id) {
            Some(BaseTypeData::Declared { args, .. }) => args,
            _ => SmallVec::new(),
        }
    }

    fn class_of(&self, id: BaseTypeId) -> Option<ClassId> {
        match self.lookup(id) {
            Some(BaseTypeData::Declared { class, .. }) => Some(class),
            _ => None,
        }
    }

    /// The generic declaration viewed from inside: `C<T1, .., Tn>`.
    fn declared_type(&self, class: ClassId) -> BaseTypeId {
        let args = self
            .class(class)
            .map(|decl| {
                decl.type_params
                    .iter()
                    .map(|&p| self.intern(BaseTypeData::TypeVariable(p)))
                    .collect()
            })
            .unwrap_or_default();
        self.intern(BaseTypeData::Declared { class, args })
    }

    /// Replace type-variable leaves according to `subst`.
    fn substitute(&self, id: BaseTypeId, subst: &FxHashMap<TypeParamId, BaseTypeId>) -> BaseTypeId {
        if subst.is_empty() {
            return id;
        }
        match self.lookup(id) {
            Some(BaseTypeData::TypeVariable(p)) => subst.get(&p).copied().unwrap_or(id),
            Some(BaseTypeData::Declared { class, args }) => {
                let args = args.iter().map(|&a| self.substitute(a, subst)).collect();
                self.intern(BaseTypeData::Declared { class, args })
            }
            Some(BaseTypeData::Array(elem)) => {
                let elem = self.substitute(elem, subst);
                self.intern(BaseTypeData::Array(elem))
            }
            _ => id,
        }
    }

    /// Direct supertypes of a base type, with the use's type arguments
    /// substituted into the declared supertypes.
    fn direct_supertypes(&self, id: BaseTypeId) -> Vec<BaseTypeId> {
        match self.lookup(id) {
            Some(BaseTypeData::Declared { class, args }) => {
                let Some(decl) = self.class(class) else {
                    return Vec::new();
                };
                if decl.supertypes.is_empty() {
                    return if class == self.object_class() {
                        Vec::new()
                    } else {
                        vec![self.object()]
                    };
                }
                let subst: FxHashMap<TypeParamId, BaseTypeId> =
                    if args.len() == decl.type_params.len() {
                        decl.type_params.iter().copied().zip(args).collect()
                    } else {
                        FxHashMap::default()
                    };
                decl.supertypes
                    .iter()
                    .map(|&sup| self.substitute(sup, &subst))
                    .collect()
            }
            Some(BaseTypeData::Array(_)) => vec![self.object()],
            Some(BaseTypeData::TypeVariable(p)) => self
                .type_param(p)
                .map(|decl| vec![decl.upper_bound])
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Java-like rendering of a base type, for diagnostics and tracing.
    fn display(&self, id: BaseTypeId) -> String {
        let mut out = String::new();
        match self.lookup(id) {
            Some(BaseTypeData::Declared { class, args }) => {
                out.push_str(self.class(class).map_or("<unknown>", |c| c.name.as_str()));
                if !args.is_empty() {
                    out.push('<');
                    for (i, &arg) in args.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        out.push_str(&self.display(arg));
                    }
                    out.push('>');
                }
            }
            Some(BaseTypeData::Array(elem)) => {
                let _ = write!(out, "{}[]", self.display(elem));
            }
            Some(BaseTypeData::TypeVariable(p)) => {
                out.push_str(self.type_param(p).map_or("<unknown>", |d| d.name.as_str()));
            }
            Some(BaseTypeData::Primitive(kind)) => out.push_str(kind.name()),
            Some(BaseTypeData::Null) => out.push_str("null"),
            Some(BaseTypeData::Void) => out.push_str("void"),
            Some(BaseTypeData::Error) | None => out.push_str("<error>"),
        }
        out
    }
}
