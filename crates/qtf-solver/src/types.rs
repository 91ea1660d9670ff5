//! Qualified type representation.
//!
//! A `QualifiedType` mirrors a base type node for node and attaches exactly
//! one qualifier to every node. Executables have no qualifier of their own;
//! their return, parameter and receiver types carry them.
//!
//! Trees are immutable values. Every transformation (`with_qualifier`,
//! `map_qualifiers`, substitution) builds a new tree.
//!
//! A type variable use records only its parameter and its own qualifier.
//! Its bounds are looked up through the factory when a comparison needs
//! them, which keeps F-bounded parameters (`T extends Comparable<T>`) finite.

use qtf_model::{BaseTypeData, BaseTypeId, BaseTypeOracle, ElementId, Shape, TypeParamId};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QualifiedDeclaredType<Q> {
    pub base: BaseTypeId,
    pub qualifier: Q,
    /// One entry per base type argument; empty for raw uses.
    pub type_arguments: Vec<QualifiedType<Q>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QualifiedArrayType<Q> {
    pub base: BaseTypeId,
    pub qualifier: Q,
    pub component: Box<QualifiedType<Q>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QualifiedTypeVariable<Q> {
    pub base: BaseTypeId,
    pub qualifier: Q,
    pub param: TypeParamId,
    /// The use carries a written qualifier (`@A T`), which overrides the
    /// primary qualifier of whatever the variable is instantiated with.
    pub explicit: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QualifiedExecutableType<Q> {
    pub element: ElementId,
    pub return_type: Box<QualifiedType<Q>>,
    pub parameter_types: Vec<QualifiedType<Q>>,
    /// `None` for static methods and constructors.
    pub receiver_type: Option<Box<QualifiedType<Q>>>,
    /// Type parameters of the executable itself that are still free.
    pub type_variables: Vec<QualifiedTypeVariable<Q>>,
}

/// Primitive and "other" (null, void, error) leaves.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QualifiedLeafType<Q> {
    pub base: BaseTypeId,
    pub qualifier: Q,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum QualifiedType<Q> {
    Declared(QualifiedDeclaredType<Q>),
    Array(QualifiedArrayType<Q>),
    TypeVariable(QualifiedTypeVariable<Q>),
    Executable(QualifiedExecutableType<Q>),
    Primitive(QualifiedLeafType<Q>),
    Other(QualifiedLeafType<Q>),
}

/// Declared bounds of a type parameter.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QualifiedTypeParameterBounds<Q> {
    pub upper: QualifiedType<Q>,
    pub lower: QualifiedType<Q>,
}

impl<Q: Clone> QualifiedType<Q> {
    pub fn shape(&self) -> Shape {
        match self {
            QualifiedType::Declared(_) => Shape::Declared,
            QualifiedType::Array(_) => Shape::Array,
            QualifiedType::TypeVariable(_) => Shape::TypeVariable,
            QualifiedType::Executable(_) => Shape::Executable,
            QualifiedType::Primitive(_) => Shape::Primitive,
            QualifiedType::Other(_) => Shape::Other,
        }
    }

    /// The qualifier at the root of the tree (none for executables).
    pub fn qualifier(&self) -> Option<&Q> {
        match self {
            QualifiedType::Declared(d) => Some(&d.qualifier),
            QualifiedType::Array(a) => Some(&a.qualifier),
            QualifiedType::TypeVariable(v) => Some(&v.qualifier),
            QualifiedType::Primitive(l) | QualifiedType::Other(l) => Some(&l.qualifier),
            QualifiedType::Executable(_) => None,
        }
    }

    pub fn base(&self) -> Option<BaseTypeId> {
        match self {
            QualifiedType::Declared(d) => Some(d.base),
            QualifiedType::Array(a) => Some(a.base),
            QualifiedType::TypeVariable(v) => Some(v.base),
            QualifiedType::Primitive(l) | QualifiedType::Other(l) => Some(l.base),
            QualifiedType::Executable(_) => None,
        }
    }

    /// Replace the root qualifier. Executables are returned unchanged.
    pub fn with_qualifier(self, qualifier: Q) -> Self {
        match self {
            QualifiedType::Declared(d) => QualifiedType::Declared(QualifiedDeclaredType {
                qualifier,
                ..d
            }),
            QualifiedType::Array(a) => QualifiedType::Array(QualifiedArrayType { qualifier, ..a }),
            QualifiedType::TypeVariable(v) => {
                QualifiedType::TypeVariable(QualifiedTypeVariable { qualifier, ..v })
            }
            QualifiedType::Primitive(l) => {
                QualifiedType::Primitive(QualifiedLeafType { qualifier, ..l })
            }
            QualifiedType::Other(l) => QualifiedType::Other(QualifiedLeafType { qualifier, ..l }),
            exe @ QualifiedType::Executable(_) => exe,
        }
    }

    pub fn as_declared(&self) -> Option<&QualifiedDeclaredType<Q>> {
        match self {
            QualifiedType::Declared(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_executable(&self) -> Option<&QualifiedExecutableType<Q>> {
        match self {
            QualifiedType::Executable(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_executable(self) -> Option<QualifiedExecutableType<Q>> {
        match self {
            QualifiedType::Executable(e) => Some(e),
            _ => None,
        }
    }

    /// Whether both trees describe the same base type, node for node.
    ///
    /// Qualifiers are ignored. This is the invariant every hook result and
    /// refinement is validated against.
    pub fn same_shape(&self, other: &Self) -> bool {
        match (self, other) {
            (QualifiedType::Declared(a), QualifiedType::Declared(b)) => {
                a.base == b.base
                    && a.type_arguments.len() == b.type_arguments.len()
                    && a.type_arguments
                        .iter()
                        .zip(&b.type_arguments)
                        .all(|(x, y)| x.same_shape(y))
            }
            (QualifiedType::Array(a), QualifiedType::Array(b)) => {
                a.base == b.base && a.component.same_shape(&b.component)
            }
            (QualifiedType::TypeVariable(a), QualifiedType::TypeVariable(b)) => {
                a.base == b.base && a.param == b.param
            }
            (QualifiedType::Executable(a), QualifiedType::Executable(b)) => a.same_shape(b),
            (QualifiedType::Primitive(a), QualifiedType::Primitive(b))
            | (QualifiedType::Other(a), QualifiedType::Other(b)) => a.base == b.base,
            _ => false,
        }
    }

    /// Rebuild the tree bottom-up, mapping every qualifier through `f`.
    pub fn map_qualifiers(&self, f: &mut impl FnMut(&Q) -> Q) -> Self {
        match self {
            QualifiedType::Declared(d) => {
                let type_arguments = d.type_arguments.iter().map(|a| a.map_qualifiers(f)).collect();
                QualifiedType::Declared(QualifiedDeclaredType {
                    base: d.base,
                    qualifier: f(&d.qualifier),
                    type_arguments,
                })
            }
            QualifiedType::Array(a) => {
                let component = Box::new(a.component.map_qualifiers(f));
                QualifiedType::Array(QualifiedArrayType {
                    base: a.base,
                    qualifier: f(&a.qualifier),
                    component,
                })
            }
            QualifiedType::TypeVariable(v) => QualifiedType::TypeVariable(v.map_qualifiers(f)),
            QualifiedType::Executable(e) => QualifiedType::Executable(e.map_qualifiers(f)),
            QualifiedType::Primitive(l) => QualifiedType::Primitive(QualifiedLeafType {
                base: l.base,
                qualifier: f(&l.qualifier),
            }),
            QualifiedType::Other(l) => QualifiedType::Other(QualifiedLeafType {
                base: l.base,
                qualifier: f(&l.qualifier),
            }),
        }
    }

    /// Every qualifier in the tree, root first.
    pub fn qualifiers(&self) -> Vec<&Q> {
        let mut out = Vec::new();
        self.collect_qualifiers(&mut out);
        out
    }

    fn collect_qualifiers<'a>(&'a self, out: &mut Vec<&'a Q>) {
        match self {
            QualifiedType::Declared(d) => {
                out.push(&d.qualifier);
                for arg in &d.type_arguments {
                    arg.collect_qualifiers(out);
                }
            }
            QualifiedType::Array(a) => {
                out.push(&a.qualifier);
                a.component.collect_qualifiers(out);
            }
            QualifiedType::TypeVariable(v) => out.push(&v.qualifier),
            QualifiedType::Executable(e) => {
                e.return_type.collect_qualifiers(out);
                for p in &e.parameter_types {
                    p.collect_qualifiers(out);
                }
                if let Some(r) = &e.receiver_type {
                    r.collect_qualifiers(out);
                }
            }
            QualifiedType::Primitive(l) | QualifiedType::Other(l) => out.push(&l.qualifier),
        }
    }
}

impl<Q: Clone> QualifiedTypeVariable<Q> {
    pub fn map_qualifiers(&self, f: &mut impl FnMut(&Q) -> Q) -> Self {
        QualifiedTypeVariable {
            base: self.base,
            qualifier: f(&self.qualifier),
            param: self.param,
            explicit: self.explicit,
        }
    }
}

impl<Q: Clone> QualifiedExecutableType<Q> {
    pub fn same_shape(&self, other: &Self) -> bool {
        self.element == other.element
            && self.return_type.same_shape(&other.return_type)
            && self.parameter_types.len() == other.parameter_types.len()
            && self
                .parameter_types
                .iter()
                .zip(&other.parameter_types)
                .all(|(a, b)| a.same_shape(b))
            && match (&self.receiver_type, &other.receiver_type) {
                (Some(a), Some(b)) => a.same_shape(b),
                (None, None) => true,
                _ => false,
            }
            && self.type_variables.len() == other.type_variables.len()
            && self
                .type_variables
                .iter()
                .zip(&other.type_variables)
                .all(|(a, b)| a.param == b.param)
    }

    pub fn map_qualifiers(&self, f: &mut impl FnMut(&Q) -> Q) -> Self {
        QualifiedExecutableType {
            element: self.element,
            return_type: Box::new(self.return_type.map_qualifiers(f)),
            parameter_types: self.parameter_types.iter().map(|p| p.map_qualifiers(f)).collect(),
            receiver_type: self
                .receiver_type
                .as_ref()
                .map(|r| Box::new(r.map_qualifiers(f))),
            type_variables: self.type_variables.iter().map(|v| v.map_qualifiers(f)).collect(),
        }
    }
}

// =============================================================================
// Rendering
// =============================================================================

/// Java-like rendering of a qualified type, e.g. `@A List<@B String>`.
///
/// Arrays put the array's own qualifier before the brackets, so
/// `@A String @B []` is an array qualified `B` of strings qualified `A`.
pub struct DisplayQualifiedType<'a, Q> {
    ty: &'a QualifiedType<Q>,
    oracle: &'a dyn BaseTypeOracle,
}

impl<Q: Clone> QualifiedType<Q> {
    pub fn display<'a>(&'a self, oracle: &'a dyn BaseTypeOracle) -> DisplayQualifiedType<'a, Q> {
        DisplayQualifiedType { ty: self, oracle }
    }
}

impl<Q: Clone + fmt::Debug> fmt::Display for DisplayQualifiedType<'_, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_type(f, self.ty, self.oracle)
    }
}

fn write_type<Q: Clone + fmt::Debug>(
    f: &mut fmt::Formatter<'_>,
    ty: &QualifiedType<Q>,
    oracle: &dyn BaseTypeOracle,
) -> fmt::Result {
    match ty {
        QualifiedType::Declared(d) => {
            let name = match oracle.lookup(d.base) {
                Some(BaseTypeData::Declared { class, .. }) => oracle
                    .class(class)
                    .map_or_else(|| "<unknown>".to_string(), |c| c.name.clone()),
                _ => oracle.display(d.base),
            };
            write!(f, "@{:?} {name}", d.qualifier)?;
            if !d.type_arguments.is_empty() {
                f.write_str("<")?;
                for (i, arg) in d.type_arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_type(f, arg, oracle)?;
                }
                f.write_str(">")?;
            }
            Ok(())
        }
        QualifiedType::Array(a) => {
            write_type(f, &a.component, oracle)?;
            write!(f, " @{:?} []", a.qualifier)
        }
        QualifiedType::TypeVariable(v) => {
            write!(f, "@{:?} {}", v.qualifier, oracle.display(v.base))
        }
        QualifiedType::Primitive(l) | QualifiedType::Other(l) => {
            write!(f, "@{:?} {}", l.qualifier, oracle.display(l.base))
        }
        QualifiedType::Executable(e) => {
            if !e.type_variables.is_empty() {
                f.write_str("<")?;
                for (i, v) in e.type_variables.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&oracle.display(v.base))?;
                }
                f.write_str("> ")?;
            }
            f.write_str("(")?;
            if let Some(receiver) = &e.receiver_type {
                write_type(f, receiver, oracle)?;
                f.write_str(" this")?;
                if !e.parameter_types.is_empty() {
                    f.write_str(", ")?;
                }
            }
            for (i, p) in e.parameter_types.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_type(f, p, oracle)?;
            }
            f.write_str(") -> ")?;
            write_type(f, &e.return_type, oracle)
        }
    }
}

/// Base type described by a qualified tree with its arguments, for
/// rebuilding a parent's base after its children changed.
pub(crate) fn rebuild_base<Q: Clone>(
    oracle: &dyn BaseTypeOracle,
    ty: &QualifiedType<Q>,
) -> Option<BaseTypeId> {
    match ty {
        QualifiedType::Declared(d) if !d.type_arguments.is_empty() => {
            let class = oracle.class_of(d.base)?;
            let args = d
                .type_arguments
                .iter()
                .map(QualifiedType::base)
                .collect::<Option<_>>()?;
            Some(oracle.intern(BaseTypeData::Declared { class, args }))
        }
        QualifiedType::Array(a) => {
            let component = a.component.base()?;
            Some(oracle.intern(BaseTypeData::Array(component)))
        }
        other => other.base(),
    }
}

#[cfg(test)]
#[path = "../tests/types_tests.rs"]
mod tests;
