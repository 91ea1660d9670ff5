//! Incremental construction of a [`Program`].
//!
//! Hosts lower their AST through this builder: declare classes and members,
//! write types (optionally annotated), then add the expression trees that the
//! checker will visit. Base types of trees are computed here from the
//! declarations, standing in for the host's own base-type inference.
//!
//! ```ignore
//! let mut b = ProgramBuilder::<Taint>::new();
//! let string = b.class("String", &[]);
//! let ty = b.declared_with(string, &[], Taint::Untainted);
//! let util = b.class("Util", &[]);
//! let f = b.field(util, "clean", ty);
//! let program = b.build();
//! ```

use crate::base::{
    BaseTypeData, BaseTypeId, BaseTypeOracle, ClassId, PrimitiveKind, TypeParamId, Variance,
};
use crate::program::{
    ClassElement, Element, ElementId, ExecutableElement, Program, Tree, TreeId, TreeKind,
    TypeArgument, TypeParameterElement, TypeSyntax, TypeSyntaxId, VariableElement,
};
use crate::store::BaseTypeStore;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::trace;

pub struct ProgramBuilder<Q> {
    store: BaseTypeStore,
    elements: Vec<Element<Q>>,
    syntax: Vec<TypeSyntax<Q>>,
    trees: Vec<Tree>,
    class_elements: FxHashMap<ClassId, ElementId>,
    type_param_elements: FxHashMap<TypeParamId, ElementId>,
}

impl<Q> Default for ProgramBuilder<Q> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Q> ProgramBuilder<Q> {
    /// A builder whose only class is the implicit root `Object`.
    pub fn new() -> Self {
        let store = BaseTypeStore::new();
        let mut builder = ProgramBuilder {
            store,
            elements: Vec::new(),
            syntax: Vec::new(),
            trees: Vec::new(),
            class_elements: FxHashMap::default(),
            type_param_elements: FxHashMap::default(),
        };
        let object_class = builder.store.object_class();
        let id = builder.push_element(Element::Class(ClassElement {
            name: "Object".to_string(),
            class: object_class,
            qualifier: None,
            member_default: None,
            type_params: Vec::new(),
            supertypes: Vec::new(),
        }));
        builder.class_elements.insert(object_class, id);
        builder
    }

    pub fn store(&self) -> &BaseTypeStore {
        &self.store
    }

    /// The element of the root class.
    pub fn object_class(&self) -> ElementId {
        ElementId(0)
    }

    pub fn element(&self, id: ElementId) -> Option<&Element<Q>> {
        self.elements.get(id.0 as usize)
    }

    fn push_element(&mut self, element: Element<Q>) -> ElementId {
        let id = ElementId(self.elements.len() as u32);
        self.elements.push(element);
        id
    }

    fn push_syntax(&mut self, syntax: TypeSyntax<Q>) -> TypeSyntaxId {
        let id = TypeSyntaxId(self.syntax.len() as u32);
        self.syntax.push(syntax);
        id
    }

    fn push_tree(&mut self, base: BaseTypeId, kind: TreeKind) -> TreeId {
        let id = TreeId(self.trees.len() as u32);
        self.trees.push(Tree {
            base,
            kind,
            label: None,
        });
        id
    }

    fn class_id(&self, class: ElementId) -> Option<ClassId> {
        self.element(class)
            .and_then(Element::as_class)
            .map(|c| c.class)
    }

    /// Base type denoted by a written type.
    pub fn syntax_base(&self, ty: TypeSyntaxId) -> BaseTypeId {
        self.syntax
            .get(ty.0 as usize)
            .map_or_else(|| self.store.error(), |s| s.base)
    }

    fn tree_base(&self, tree: TreeId) -> BaseTypeId {
        self.trees
            .get(tree.0 as usize)
            .map_or_else(|| self.store.error(), |t| t.base)
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    /// Declare a class with the given type parameters (each bounded by an
    /// unannotated `Object`).
    pub fn class(&mut self, name: &str, type_params: &[&str]) -> ElementId {
        let (class, params) = self.store.add_class(name, type_params);
        let mut param_elements = Vec::with_capacity(params.len());
        for (&param, &param_name) in params.iter().zip(type_params) {
            let bound = self.object_type();
            let el = self.push_element(Element::TypeParameter(TypeParameterElement {
                name: param_name.to_string(),
                param,
                upper_bound: bound,
                lower_qualifier: None,
            }));
            self.type_param_elements.insert(param, el);
            param_elements.push(el);
        }
        let id = self.push_element(Element::Class(ClassElement {
            name: name.to_string(),
            class,
            qualifier: None,
            member_default: None,
            type_params: param_elements,
            supertypes: Vec::new(),
        }));
        self.class_elements.insert(class, id);
        trace!(name, class = class.0, "declared class");
        id
    }

    /// Declare an interface; identical to [`Self::class`] apart from the flag.
    pub fn interface(&mut self, name: &str, type_params: &[&str]) -> ElementId {
        let id = self.class(name, type_params);
        if let Some(class) = self.class_id(id) {
            self.store.set_interface(class, true);
        }
        id
    }

    /// Type parameter elements of a class or executable, in declaration order.
    pub fn type_params(&self, owner: ElementId) -> Vec<ElementId> {
        match self.element(owner) {
            Some(Element::Class(c)) => c.type_params.clone(),
            Some(Element::Method(e) | Element::Constructor(e)) => e.type_params.clone(),
            _ => Vec::new(),
        }
    }

    /// Qualifier given to unannotated uses of the class.
    pub fn annotate_class(&mut self, class: ElementId, qualifier: Q) {
        if let Some(Element::Class(c)) = self.elements.get_mut(class.0 as usize) {
            c.qualifier = Some(qualifier);
        }
    }

    /// Qualifier given to unannotated positions of the class's members.
    pub fn member_default(&mut self, class: ElementId, qualifier: Q) {
        if let Some(Element::Class(c)) = self.elements.get_mut(class.0 as usize) {
            c.member_default = Some(qualifier);
        }
    }

    /// Add a written direct supertype (`extends` / `implements` clause).
    pub fn extends(&mut self, class: ElementId, supertype: TypeSyntaxId) {
        let base = self.syntax_base(supertype);
        if let Some(Element::Class(c)) = self.elements.get_mut(class.0 as usize) {
            c.supertypes.push(supertype);
            self.store.add_supertype(c.class, base);
        }
    }

    pub fn set_variance(&mut self, type_param: ElementId, variance: Variance) {
        if let Some(Element::TypeParameter(t)) = self.element(type_param) {
            let param = t.param;
            self.store.set_variance(param, variance);
        }
    }

    pub fn set_upper_bound(&mut self, type_param: ElementId, bound: TypeSyntaxId) {
        let base = self.syntax_base(bound);
        if let Some(Element::TypeParameter(t)) = self.elements.get_mut(type_param.0 as usize) {
            t.upper_bound = bound;
            self.store.set_upper_bound(t.param, base);
        }
    }

    /// Explicit qualifier on a type parameter's lower bound.
    pub fn set_lower_qualifier(&mut self, type_param: ElementId, qualifier: Q) {
        if let Some(Element::TypeParameter(t)) = self.elements.get_mut(type_param.0 as usize) {
            t.lower_qualifier = Some(qualifier);
        }
    }

    // =========================================================================
    // Written types
    // =========================================================================

    pub fn declared(&mut self, class: ElementId, args: &[TypeSyntaxId]) -> TypeSyntaxId {
        let base = match self.class_id(class) {
            Some(id) => {
                let arg_bases: Vec<BaseTypeId> = args.iter().map(|&a| self.syntax_base(a)).collect();
                self.store.declared(id, &arg_bases)
            }
            None => self.store.error(),
        };
        self.push_syntax(TypeSyntax {
            base,
            annotation: None,
            children: args.iter().copied().collect(),
            label: None,
        })
    }

    pub fn declared_with(
        &mut self,
        class: ElementId,
        args: &[TypeSyntaxId],
        qualifier: Q,
    ) -> TypeSyntaxId {
        let id = self.declared(class, args);
        self.annotate(id, qualifier)
    }

    pub fn object_type(&mut self) -> TypeSyntaxId {
        let base = self.store.object();
        self.leaf(base)
    }

    pub fn array_of(&mut self, component: TypeSyntaxId) -> TypeSyntaxId {
        let base = self.store.array(self.syntax_base(component));
        self.push_syntax(TypeSyntax {
            base,
            annotation: None,
            children: SmallVec::from_slice(&[component]),
            label: None,
        })
    }

    pub fn primitive(&mut self, kind: PrimitiveKind) -> TypeSyntaxId {
        let base = self.store.primitive(kind);
        self.leaf(base)
    }

    /// A use of a type parameter.
    pub fn type_var(&mut self, type_param: ElementId) -> TypeSyntaxId {
        let base = match self.element(type_param) {
            Some(Element::TypeParameter(t)) => self.store.type_var(t.param),
            _ => self.store.error(),
        };
        self.leaf(base)
    }

    pub fn void_type(&mut self) -> TypeSyntaxId {
        let base = self.store.void();
        self.leaf(base)
    }

    fn leaf(&mut self, base: BaseTypeId) -> TypeSyntaxId {
        self.push_syntax(TypeSyntax {
            base,
            annotation: None,
            children: SmallVec::new(),
            label: None,
        })
    }

    /// Write an explicit qualifier on an existing type node.
    pub fn annotate(&mut self, ty: TypeSyntaxId, qualifier: Q) -> TypeSyntaxId {
        if let Some(node) = self.syntax.get_mut(ty.0 as usize) {
            node.annotation = Some(qualifier);
        }
        ty
    }

    // =========================================================================
    // Members
    // =========================================================================

    pub fn field(&mut self, class: ElementId, name: &str, ty: TypeSyntaxId) -> ElementId {
        self.push_element(Element::Field(VariableElement {
            name: name.to_string(),
            ty,
            enclosing: class,
            is_static: false,
        }))
    }

    /// Declare a method returning `void`; see [`Self::returns`].
    pub fn method(&mut self, class: ElementId, name: &str) -> ElementId {
        let return_type = self.void_type();
        self.push_element(Element::Method(ExecutableElement {
            name: name.to_string(),
            owner: class,
            type_params: Vec::new(),
            params: Vec::new(),
            return_type,
            receiver: None,
            is_static: false,
        }))
    }

    /// Declare a constructor; its return type is the class's own generic
    /// declaration, unannotated.
    pub fn constructor(&mut self, class: ElementId) -> ElementId {
        let params: Vec<ElementId> = self.type_params(class);
        let args: Vec<TypeSyntaxId> = params.iter().map(|&p| self.type_var(p)).collect();
        let return_type = self.declared(class, &args);
        self.push_element(Element::Constructor(ExecutableElement {
            name: "<init>".to_string(),
            owner: class,
            type_params: Vec::new(),
            params: Vec::new(),
            return_type,
            receiver: None,
            is_static: false,
        }))
    }

    /// Declare a type parameter of a generic method or constructor.
    pub fn method_type_param(&mut self, executable: ElementId, name: &str) -> ElementId {
        let param = self.store.add_type_param(name);
        let bound = self.object_type();
        let el = self.push_element(Element::TypeParameter(TypeParameterElement {
            name: name.to_string(),
            param,
            upper_bound: bound,
            lower_qualifier: None,
        }));
        self.type_param_elements.insert(param, el);
        if let Some(Element::Method(e) | Element::Constructor(e)) =
            self.elements.get_mut(executable.0 as usize)
        {
            e.type_params.push(el);
        }
        el
    }

    pub fn param(&mut self, executable: ElementId, name: &str, ty: TypeSyntaxId) -> ElementId {
        let el = self.push_element(Element::Parameter(VariableElement {
            name: name.to_string(),
            ty,
            enclosing: executable,
            is_static: false,
        }));
        if let Some(Element::Method(e) | Element::Constructor(e)) =
            self.elements.get_mut(executable.0 as usize)
        {
            e.params.push(el);
        }
        el
    }

    pub fn local(&mut self, executable: ElementId, name: &str, ty: TypeSyntaxId) -> ElementId {
        self.push_element(Element::Local(VariableElement {
            name: name.to_string(),
            ty,
            enclosing: executable,
            is_static: false,
        }))
    }

    pub fn returns(&mut self, executable: ElementId, ty: TypeSyntaxId) {
        if let Some(Element::Method(e) | Element::Constructor(e)) =
            self.elements.get_mut(executable.0 as usize)
        {
            e.return_type = ty;
        }
    }

    /// Write an explicit receiver type (`void m(@Q C this)`).
    pub fn receiver(&mut self, executable: ElementId, ty: TypeSyntaxId) {
        if let Some(Element::Method(e) | Element::Constructor(e)) =
            self.elements.get_mut(executable.0 as usize)
        {
            e.receiver = Some(ty);
        }
    }

    pub fn set_static(&mut self, member: ElementId) {
        match self.elements.get_mut(member.0 as usize) {
            Some(Element::Field(v)) => v.is_static = true,
            Some(Element::Method(e)) => e.is_static = true,
            _ => {}
        }
    }

    // =========================================================================
    // Expression trees
    // =========================================================================

    /// Base type of `declared` seen through a receiver of type `receiver`.
    fn member_base(
        &self,
        receiver: Option<BaseTypeId>,
        owner: ElementId,
        declared: BaseTypeId,
        method_subst: &FxHashMap<TypeParamId, BaseTypeId>,
    ) -> BaseTypeId {
        let mut subst = method_subst.clone();
        if let (Some(receiver), Some(class)) = (receiver, self.class_id(owner)) {
            if let (Some(view), Some(decl)) =
                (self.store.as_super(receiver, class), self.store.class(class))
            {
                let args = self.store.type_arguments(view);
                if args.len() == decl.type_params.len() {
                    subst.extend(decl.type_params.iter().copied().zip(args));
                }
            }
        }
        self.store.substitute(declared, &subst)
    }

    /// A tree with an explicitly supplied base type and kind.
    pub fn tree(&mut self, base: BaseTypeId, kind: TreeKind) -> TreeId {
        self.push_tree(base, kind)
    }

    pub fn literal(&mut self, base: BaseTypeId) -> TreeId {
        self.push_tree(base, TreeKind::Literal)
    }

    pub fn null_literal(&mut self) -> TreeId {
        let base = self.store.null();
        self.push_tree(base, TreeKind::Literal)
    }

    /// A reference to a field, parameter or local.
    pub fn ident(&mut self, element: ElementId) -> TreeId {
        let base = match self.element(element).and_then(Element::as_variable) {
            Some(v) => self.syntax_base(v.ty),
            None => self.store.error(),
        };
        self.push_tree(base, TreeKind::Ident(element))
    }

    pub fn this(&mut self, class: ElementId) -> TreeId {
        let base = match self.class_id(class) {
            Some(id) => self.store.declared_type(id),
            None => self.store.error(),
        };
        self.push_tree(base, TreeKind::This(class))
    }

    pub fn field_access(&mut self, receiver: TreeId, field: ElementId) -> TreeId {
        let base = match self.element(field).and_then(Element::as_variable) {
            Some(v) => {
                let declared = self.syntax_base(v.ty);
                let receiver_base = self.tree_base(receiver);
                self.member_base(Some(receiver_base), v.enclosing, declared, &FxHashMap::default())
            }
            None => self.store.error(),
        };
        self.push_tree(base, TreeKind::FieldAccess { receiver, field })
    }

    pub fn call(&mut self, receiver: Option<TreeId>, method: ElementId, args: &[TreeId]) -> TreeId {
        self.call_with(receiver, method, args, &[])
    }

    /// A method invocation with type arguments for the method's own type
    /// parameters (explicit syntax or base types inferred by the host).
    pub fn call_with(
        &mut self,
        receiver: Option<TreeId>,
        method: ElementId,
        args: &[TreeId],
        type_args: &[TypeArgument],
    ) -> TreeId {
        let base = self.executable_result_base(receiver, method, type_args);
        self.push_tree(
            base,
            TreeKind::MethodInvocation {
                receiver,
                method,
                args: args.to_vec(),
                type_args: type_args.to_vec(),
            },
        )
    }

    fn executable_result_base(
        &self,
        receiver: Option<TreeId>,
        executable: ElementId,
        type_args: &[TypeArgument],
    ) -> BaseTypeId {
        let Some(exe) = self.element(executable).and_then(Element::as_executable) else {
            return self.store.error();
        };
        let mut method_subst = FxHashMap::default();
        for (tp, arg) in exe.type_params.iter().zip(type_args) {
            if let Some(Element::TypeParameter(t)) = self.element(*tp) {
                let arg_base = match *arg {
                    TypeArgument::Explicit(syntax) => self.syntax_base(syntax),
                    TypeArgument::Inferred(base) => base,
                };
                method_subst.insert(t.param, arg_base);
            }
        }
        let declared = self.syntax_base(exe.return_type);
        let receiver_base = receiver.map(|r| self.tree_base(r));
        self.member_base(receiver_base, exe.owner, declared, &method_subst)
    }

    /// `new C<..>(args)`; the tree's base type is the written class type.
    pub fn new_class(
        &mut self,
        class_type: TypeSyntaxId,
        constructor: ElementId,
        args: &[TreeId],
    ) -> TreeId {
        self.new_class_with(class_type, constructor, args, &[])
    }

    pub fn new_class_with(
        &mut self,
        class_type: TypeSyntaxId,
        constructor: ElementId,
        args: &[TreeId],
        type_args: &[TypeArgument],
    ) -> TreeId {
        let base = self.syntax_base(class_type);
        self.push_tree(
            base,
            TreeKind::NewClass {
                class_type,
                constructor,
                args: args.to_vec(),
                type_args: type_args.to_vec(),
            },
        )
    }

    pub fn cast(&mut self, ty: TypeSyntaxId, expr: TreeId) -> TreeId {
        let base = self.syntax_base(ty);
        self.push_tree(base, TreeKind::Cast { ty, expr })
    }

    pub fn array_access(&mut self, array: TreeId, index: TreeId) -> TreeId {
        let base = match self.store.lookup(self.tree_base(array)) {
            Some(BaseTypeData::Array(component)) => component,
            _ => self.store.error(),
        };
        self.push_tree(base, TreeKind::ArrayAccess { array, index })
    }

    pub fn new_array(&mut self, ty: TypeSyntaxId, elements: &[TreeId]) -> TreeId {
        let base = self.syntax_base(ty);
        self.push_tree(
            base,
            TreeKind::NewArray {
                ty,
                elements: elements.to_vec(),
            },
        )
    }

    pub fn assign(&mut self, lhs: TreeId, rhs: TreeId) -> TreeId {
        let base = self.tree_base(lhs);
        self.push_tree(base, TreeKind::Assign { lhs, rhs })
    }

    /// `c ? a : b`; the base type is the wider branch, or `Object` when the
    /// branches are unrelated.
    pub fn conditional(&mut self, condition: TreeId, then: TreeId, otherwise: TreeId) -> TreeId {
        let (a, b) = (self.tree_base(then), self.tree_base(otherwise));
        let base = if self.store.is_subtype(a, b) {
            b
        } else if self.store.is_subtype(b, a) {
            a
        } else {
            self.store.object()
        };
        self.push_tree(
            base,
            TreeKind::Conditional {
                condition,
                then,
                otherwise,
            },
        )
    }

    /// A binary operation whose result base type is decided by the host.
    pub fn binary(&mut self, lhs: TreeId, rhs: TreeId, base: BaseTypeId) -> TreeId {
        self.push_tree(base, TreeKind::Binary { lhs, rhs })
    }

    /// Name a tree for diagnostics.
    pub fn label(&mut self, tree: TreeId, label: impl Into<String>) -> TreeId {
        if let Some(t) = self.trees.get_mut(tree.0 as usize) {
            t.label = Some(label.into());
        }
        tree
    }

    /// Name a written type for diagnostics.
    pub fn label_type(&mut self, ty: TypeSyntaxId, label: impl Into<String>) -> TypeSyntaxId {
        if let Some(node) = self.syntax.get_mut(ty.0 as usize) {
            node.label = Some(label.into());
        }
        ty
    }

    pub fn build(self) -> Program<Q> {
        trace!(
            elements = self.elements.len(),
            trees = self.trees.len(),
            "program built"
        );
        Program {
            store: Arc::new(self.store),
            elements: self.elements,
            syntax: self.syntax,
            trees: self.trees,
            class_elements: self.class_elements,
            type_param_elements: self.type_param_elements,
        }
    }
}

#[cfg(test)]
#[path = "../tests/builder_tests.rs"]
mod tests;
