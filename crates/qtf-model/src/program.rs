//! Program model: declarations, written types and expression trees.
//!
//! Qualifier annotations are ordinary data here: every written type node may
//! carry one explicit qualifier, and class declarations may carry a declared
//! qualifier and a default for their members. `Q` is the checker's qualifier
//! type; the model never interprets it.

use crate::base::{BaseTypeId, BaseTypeOracle, ClassId, TypeParamId};
use crate::store::BaseTypeStore;
use qtf_common::SourceLocation;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeSyntaxId(pub u32);

/// A written type.
///
/// `children` mirrors the base type: type arguments for a declared type, the
/// component for an array, nothing otherwise.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeSyntax<Q> {
    pub base: BaseTypeId,
    pub annotation: Option<Q>,
    pub children: SmallVec<[TypeSyntaxId; 2]>,
    pub label: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Class,
    Field,
    Method,
    Constructor,
    Parameter,
    Local,
    TypeParameter,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassElement<Q> {
    pub name: String,
    pub class: ClassId,
    /// Qualifier of unannotated uses of this class.
    pub qualifier: Option<Q>,
    /// Qualifier for unannotated positions in this class's members.
    pub member_default: Option<Q>,
    pub type_params: Vec<ElementId>,
    pub supertypes: Vec<TypeSyntaxId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableElement {
    pub name: String,
    pub ty: TypeSyntaxId,
    /// Declaring class (fields) or executable (parameters, locals).
    pub enclosing: ElementId,
    pub is_static: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutableElement {
    pub name: String,
    pub owner: ElementId,
    pub type_params: Vec<ElementId>,
    pub params: Vec<ElementId>,
    pub return_type: TypeSyntaxId,
    /// Explicitly written receiver type, if any.
    pub receiver: Option<TypeSyntaxId>,
    pub is_static: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeParameterElement<Q> {
    pub name: String,
    pub param: TypeParamId,
    pub upper_bound: TypeSyntaxId,
    /// Explicit qualifier on the (implicit `null`) lower bound.
    pub lower_qualifier: Option<Q>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Element<Q> {
    Class(ClassElement<Q>),
    Field(VariableElement),
    Method(ExecutableElement),
    Constructor(ExecutableElement),
    Parameter(VariableElement),
    Local(VariableElement),
    TypeParameter(TypeParameterElement<Q>),
}

impl<Q> Element<Q> {
    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Class(_) => ElementKind::Class,
            Element::Field(_) => ElementKind::Field,
            Element::Method(_) => ElementKind::Method,
            Element::Constructor(_) => ElementKind::Constructor,
            Element::Parameter(_) => ElementKind::Parameter,
            Element::Local(_) => ElementKind::Local,
            Element::TypeParameter(_) => ElementKind::TypeParameter,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Element::Class(c) => &c.name,
            Element::Field(v) | Element::Parameter(v) | Element::Local(v) => &v.name,
            Element::Method(e) | Element::Constructor(e) => &e.name,
            Element::TypeParameter(t) => &t.name,
        }
    }

    pub fn as_class(&self) -> Option<&ClassElement<Q>> {
        match self {
            Element::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_executable(&self) -> Option<&ExecutableElement> {
        match self {
            Element::Method(e) | Element::Constructor(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&VariableElement> {
        match self {
            Element::Field(v) | Element::Parameter(v) | Element::Local(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_type_parameter(&self) -> Option<&TypeParameterElement<Q>> {
        match self {
            Element::TypeParameter(t) => Some(t),
            _ => None,
        }
    }

    /// Whether the member is accessed without a receiver instance.
    pub fn is_static(&self) -> bool {
        match self {
            Element::Field(v) => v.is_static,
            Element::Method(e) => e.is_static,
            Element::Constructor(_) => true,
            _ => false,
        }
    }
}

/// A type argument at a generic call site.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeArgument {
    /// Written explicitly (`Util.<@A String>id(x)`).
    Explicit(TypeSyntaxId),
    /// Supplied by the host's base-type inference.
    Inferred(BaseTypeId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeKind {
    Literal,
    Ident(ElementId),
    /// `this` inside the given class.
    This(ElementId),
    FieldAccess {
        receiver: TreeId,
        field: ElementId,
    },
    MethodInvocation {
        receiver: Option<TreeId>,
        method: ElementId,
        args: Vec<TreeId>,
        type_args: Vec<TypeArgument>,
    },
    NewClass {
        class_type: TypeSyntaxId,
        constructor: ElementId,
        args: Vec<TreeId>,
        type_args: Vec<TypeArgument>,
    },
    Cast {
        ty: TypeSyntaxId,
        expr: TreeId,
    },
    ArrayAccess {
        array: TreeId,
        index: TreeId,
    },
    NewArray {
        ty: TypeSyntaxId,
        elements: Vec<TreeId>,
    },
    Assign {
        lhs: TreeId,
        rhs: TreeId,
    },
    Conditional {
        condition: TreeId,
        then: TreeId,
        otherwise: TreeId,
    },
    Binary {
        lhs: TreeId,
        rhs: TreeId,
    },
}

/// An expression node. `base` is the base type the host inferred for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tree {
    pub base: BaseTypeId,
    pub kind: TreeKind,
    pub label: Option<String>,
}

/// An immutable program under check.
pub struct Program<Q> {
    pub(crate) store: Arc<BaseTypeStore>,
    pub(crate) elements: Vec<Element<Q>>,
    pub(crate) syntax: Vec<TypeSyntax<Q>>,
    pub(crate) trees: Vec<Tree>,
    pub(crate) class_elements: FxHashMap<ClassId, ElementId>,
    pub(crate) type_param_elements: FxHashMap<TypeParamId, ElementId>,
}

impl<Q> std::fmt::Debug for Program<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("elements", &self.elements.len())
            .field("syntax", &self.syntax.len())
            .field("trees", &self.trees.len())
            .finish_non_exhaustive()
    }
}

impl<Q> Program<Q> {
    pub fn store(&self) -> &Arc<BaseTypeStore> {
        &self.store
    }

    pub fn oracle(&self) -> &dyn BaseTypeOracle {
        &*self.store
    }

    pub fn element(&self, id: ElementId) -> Option<&Element<Q>> {
        self.elements.get(id.0 as usize)
    }

    pub fn type_syntax(&self, id: TypeSyntaxId) -> Option<&TypeSyntax<Q>> {
        self.syntax.get(id.0 as usize)
    }

    pub fn tree(&self, id: TreeId) -> Option<&Tree> {
        self.trees.get(id.0 as usize)
    }

    pub fn class_element(&self, class: ClassId) -> Option<ElementId> {
        self.class_elements.get(&class).copied()
    }

    pub fn type_param_element(&self, param: TypeParamId) -> Option<ElementId> {
        self.type_param_elements.get(&param).copied()
    }

    /// The class element that declares `element` (itself for a class).
    pub fn enclosing_class(&self, element: ElementId) -> Option<ElementId> {
        let mut current = element;
        // Parameters point at executables, executables at classes.
        for _ in 0..3 {
            match self.element(current)? {
                Element::Class(_) => return Some(current),
                Element::Field(v) | Element::Parameter(v) | Element::Local(v) => {
                    current = v.enclosing;
                }
                Element::Method(e) | Element::Constructor(e) => current = e.owner,
                Element::TypeParameter(_) => return None,
            }
        }
        None
    }

    /// Location used when reporting a diagnostic against `tree`.
    pub fn location(&self, tree: TreeId) -> SourceLocation {
        match self.tree(tree).and_then(|t| t.label.as_deref()) {
            Some(label) => SourceLocation::new(label),
            None => SourceLocation::new(format!("tree#{}", tree.0)),
        }
    }

    pub fn type_location(&self, ty: TypeSyntaxId) -> SourceLocation {
        match self.type_syntax(ty).and_then(|t| t.label.as_deref()) {
            Some(label) => SourceLocation::new(label),
            None => SourceLocation::new(format!("type#{}", ty.0)),
        }
    }

    /// Location used when reporting a diagnostic against a declaration.
    pub fn element_location(&self, element: ElementId) -> SourceLocation {
        let Some(el) = self.element(element) else {
            return SourceLocation::new(format!("element#{}", element.0));
        };
        match self.enclosing_class(element).and_then(|c| self.element(c)) {
            Some(class) if !matches!(el, Element::Class(_)) => {
                SourceLocation::new(format!("{}.{}", class.name(), el.name()))
            }
            _ => SourceLocation::new(el.name().to_string()),
        }
    }

    pub fn elements(&self) -> impl Iterator<Item = (ElementId, &Element<Q>)> {
        self.elements
            .iter()
            .enumerate()
            .map(|(i, e)| (ElementId(i as u32), e))
    }
}
