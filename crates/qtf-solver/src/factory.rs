//! The qualified type factory.
//!
//! `QualifiedTypeFactory` is the query surface a checker's traversal calls;
//! `DefaultQualifiedTypeFactory` implements it over a [`Program`], a
//! [`QualifierHierarchy`] and the checker's defaults, hooks and refiner.
//!
//! The implementation is spread over several files by concern:
//!
//! - `factory.rs`: construction, element and written-type typing, defaults
//! - `supertypes.rs`: direct supertypes, `as_super`, uses of generic classes
//! - `members.rs`: member types seen through a receiver
//! - `expression.rs`: expression trees
//! - `call.rs`: method and constructor uses, with inference
//! - `bounds.rs`: type parameter bounds and use-site argument checks
//!
//! Nothing is cached: every query rebuilds its result from the program, so
//! a factory is `Sync` and may be queried from several threads at once.

use crate::defaults::{QualifierDefaults, TypeUseLocation};
use crate::errors::{LatticeError, QualError};
use crate::hooks::{CheckerHooks, ExecutableUse, NoHooks};
use crate::lattice::{Qualifier, QualifierHierarchy, render};
use crate::options::EngineOptions;
use crate::refine::{NoRefinement, TypeRefiner};
use crate::type_hierarchy::{SubtypeEnv, TypeHierarchy};
use crate::types::{
    QualifiedArrayType, QualifiedDeclaredType, QualifiedExecutableType, QualifiedLeafType,
    QualifiedType, QualifiedTypeParameterBounds, QualifiedTypeVariable,
};
use qtf_common::limits::MAX_BOUND_CHAIN;
use qtf_model::{
    BaseTypeData, BaseTypeId, BaseTypeOracle, ClassElement, ClassId, Element, ElementId,
    ExecutableElement, Program, TreeId, TypeParamId, TypeSyntaxId,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Query interface of the engine.
///
/// The hook-named methods run the checker's hook on the engine's default
/// result and validate what comes back.
pub trait QualifiedTypeFactory<Q: Qualifier> {
    /// Qualified type of a declaration: fields, parameters and locals get
    /// their declared type, methods and constructors an executable type,
    /// classes their generic declaration.
    fn qualified_type_of_element(&self, element: ElementId) -> Result<QualifiedType<Q>, QualError>;

    /// Qualified type of an expression, after refinement.
    fn qualified_type_of_tree(&self, tree: TreeId) -> Result<QualifiedType<Q>, QualError>;

    fn qualified_type_from_type_syntax(&self, syntax: TypeSyntaxId) -> Result<QualifiedType<Q>, QualError>;

    fn qualified_type_parameter_bounds(
        &self,
        type_param: ElementId,
    ) -> Result<QualifiedTypeParameterBounds<Q>, QualError>;

    fn qualifier_hierarchy(&self) -> &QualifierHierarchy<Q>;

    fn type_hierarchy(&self) -> TypeHierarchy<'_, Q>;

    fn post_direct_supertypes(
        &self,
        subtype: &QualifiedType<Q>,
        supertypes: Vec<QualifiedType<Q>>,
    ) -> Result<Vec<QualifiedType<Q>>, QualError>;

    fn post_as_member_of(
        &self,
        member_type: QualifiedType<Q>,
        receiver: &QualifiedType<Q>,
        member: ElementId,
    ) -> Result<QualifiedType<Q>, QualError>;

    fn type_variables_from_use(
        &self,
        ty: &QualifiedDeclaredType<Q>,
        class: ElementId,
    ) -> Result<Vec<QualifiedTypeVariable<Q>>, QualError>;

    fn method_from_use(&self, tree: TreeId) -> Result<ExecutableUse<Q>, QualError>;

    fn constructor_from_use(&self, tree: TreeId) -> Result<ExecutableUse<Q>, QualError>;
}

pub struct DefaultQualifiedTypeFactory<Q: Qualifier> {
    pub(crate) program: Arc<Program<Q>>,
    pub(crate) lattice: Arc<QualifierHierarchy<Q>>,
    pub(crate) options: EngineOptions,
    pub(crate) defaults: Box<dyn QualifierDefaults<Q>>,
    pub(crate) hooks: Box<dyn CheckerHooks<Q>>,
    pub(crate) refiner: Box<dyn TypeRefiner<Q>>,
}

impl<Q: Qualifier> std::fmt::Debug for DefaultQualifiedTypeFactory<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultQualifiedTypeFactory")
            .field("program", &self.program)
            .field("qualifiers", &self.lattice.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<Q: Qualifier> DefaultQualifiedTypeFactory<Q> {
    pub fn new(
        program: Arc<Program<Q>>,
        lattice: Arc<QualifierHierarchy<Q>>,
        defaults: impl QualifierDefaults<Q> + 'static,
    ) -> Self {
        DefaultQualifiedTypeFactory {
            program,
            lattice,
            options: EngineOptions::default(),
            defaults: Box::new(defaults),
            hooks: Box::new(NoHooks),
            refiner: Box::new(NoRefinement),
        }
    }

    pub fn with_hooks(mut self, hooks: impl CheckerHooks<Q> + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn with_refiner(mut self, refiner: impl TypeRefiner<Q> + 'static) -> Self {
        self.refiner = Box::new(refiner);
        self
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn program(&self) -> &Program<Q> {
        &self.program
    }

    pub fn oracle(&self) -> &dyn BaseTypeOracle {
        self.program.oracle()
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Shorthand for `type_hierarchy().is_subtype(..)`.
    pub fn is_subtype(&self, sub: &QualifiedType<Q>, sup: &QualifiedType<Q>) -> Result<bool, QualError> {
        self.type_hierarchy().is_subtype(sub, sup)
    }

    /// Unannotated qualified type of `base` at `location`.
    pub fn default_type(
        &self,
        base: BaseTypeId,
        location: TypeUseLocation,
    ) -> Result<QualifiedType<Q>, QualError> {
        let oracle = self.oracle();
        Ok(match oracle.lookup(base) {
            Some(BaseTypeData::Declared { class, args }) => {
                let type_arguments = args
                    .iter()
                    .map(|&a| self.default_type(a, TypeUseLocation::TypeArgument))
                    .collect::<Result<_, _>>()?;
                QualifiedType::Declared(QualifiedDeclaredType {
                    base,
                    qualifier: match self.class_qualifier(class) {
                        Some(q) => self.in_lattice(q)?,
                        None => self.defaulted(location, base)?,
                    },
                    type_arguments,
                })
            }
            Some(BaseTypeData::Array(component)) => QualifiedType::Array(QualifiedArrayType {
                base,
                qualifier: self.defaulted(location, base)?,
                component: Box::new(self.default_type(component, TypeUseLocation::ArrayComponent)?),
            }),
            Some(BaseTypeData::TypeVariable(param)) => {
                QualifiedType::TypeVariable(self.type_variable_use(param, base, None)?)
            }
            Some(BaseTypeData::Primitive(_)) => QualifiedType::Primitive(QualifiedLeafType {
                base,
                qualifier: self.defaulted(location, base)?,
            }),
            _ => QualifiedType::Other(QualifiedLeafType {
                base,
                qualifier: self.defaulted(location, base)?,
            }),
        })
    }

    /// `q`, if it belongs to the lattice in force.
    pub(crate) fn in_lattice(&self, q: Q) -> Result<Q, QualError> {
        if self.lattice.contains(&q) {
            Ok(q)
        } else {
            Err(LatticeError::UnknownQualifier(render(&q)).into())
        }
    }

    pub(crate) fn defaulted(&self, location: TypeUseLocation, base: BaseTypeId) -> Result<Q, QualError> {
        self.in_lattice(self.defaults.default_qualifier(location, base))
    }

    /// Rejects types from checker code holding a qualifier the lattice does
    /// not know.
    pub(crate) fn check_qualifiers(&self, ty: &QualifiedType<Q>) -> Result<(), QualError> {
        match ty.qualifiers().into_iter().find(|q| !self.lattice.contains(q)) {
            Some(q) => Err(LatticeError::UnknownQualifier(render(q)).into()),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Program lookups
    // =========================================================================

    pub(crate) fn element(&self, id: ElementId) -> Result<&Element<Q>, QualError> {
        self.program.element(id).ok_or(QualError::UnknownElement(id))
    }

    pub(crate) fn class_element(&self, id: ElementId) -> Result<&ClassElement<Q>, QualError> {
        self.element(id)?.as_class().ok_or_else(|| QualError::NotA {
            what: self.program.element_location(id).to_string(),
            expected: "class",
        })
    }

    pub(crate) fn executable_element(&self, id: ElementId) -> Result<&ExecutableElement, QualError> {
        self.element(id)?.as_executable().ok_or_else(|| QualError::NotA {
            what: self.program.element_location(id).to_string(),
            expected: "method or constructor",
        })
    }

    /// Declared qualifier of unannotated uses of `class`.
    pub(crate) fn class_qualifier(&self, class: ClassId) -> Option<Q> {
        let id = self.program.class_element(class)?;
        self.program.element(id)?.as_class()?.qualifier.clone()
    }

    /// Member default of the class enclosing `element`.
    pub(crate) fn member_default(&self, element: ElementId) -> Option<Q> {
        let class = self.program.enclosing_class(element)?;
        self.program.element(class)?.as_class()?.member_default.clone()
    }

    // =========================================================================
    // Written types
    // =========================================================================

    /// Qualified type of a written type at `location`.
    ///
    /// Unannotated nodes take, in order: `member_default`, the declared
    /// qualifier of the named class, then the checker's default for the
    /// location. Type variable uses never take a member default.
    pub(crate) fn syntax_type(
        &self,
        id: TypeSyntaxId,
        location: TypeUseLocation,
        member_default: Option<&Q>,
    ) -> Result<QualifiedType<Q>, QualError> {
        let syntax = self
            .program
            .type_syntax(id)
            .ok_or(QualError::UnknownTypeSyntax(id))?;
        let base = syntax.base;
        let resolve = |class: Option<ClassId>| {
            syntax
                .annotation
                .clone()
                .or_else(|| member_default.cloned())
                .or_else(|| class.and_then(|c| self.class_qualifier(c)))
                .map_or_else(|| self.defaulted(location, base), |q| self.in_lattice(q))
        };
        Ok(match self.oracle().lookup(base) {
            Some(BaseTypeData::Declared { class, .. }) => {
                let type_arguments = syntax
                    .children
                    .iter()
                    .map(|&c| self.syntax_type(c, TypeUseLocation::TypeArgument, member_default))
                    .collect::<Result<_, _>>()?;
                QualifiedType::Declared(QualifiedDeclaredType {
                    base,
                    qualifier: resolve(Some(class))?,
                    type_arguments,
                })
            }
            Some(BaseTypeData::Array(_)) => {
                let &component = syntax.children.first().ok_or_else(|| QualError::NotA {
                    what: format!("type syntax {}", id.0),
                    expected: "array type with a component",
                })?;
                QualifiedType::Array(QualifiedArrayType {
                    base,
                    qualifier: resolve(None)?,
                    component: Box::new(self.syntax_type(
                        component,
                        TypeUseLocation::ArrayComponent,
                        member_default,
                    )?),
                })
            }
            Some(BaseTypeData::TypeVariable(param)) => QualifiedType::TypeVariable(
                self.type_variable_use(param, base, syntax.annotation.clone())?,
            ),
            Some(BaseTypeData::Primitive(_)) => QualifiedType::Primitive(QualifiedLeafType {
                base,
                qualifier: resolve(None)?,
            }),
            _ => QualifiedType::Other(QualifiedLeafType {
                base,
                qualifier: resolve(None)?,
            }),
        })
    }

    /// A use of a type variable. Without an annotation the use carries the
    /// primary qualifier of the variable's upper bound.
    pub(crate) fn type_variable_use(
        &self,
        param: TypeParamId,
        base: BaseTypeId,
        annotation: Option<Q>,
    ) -> Result<QualifiedTypeVariable<Q>, QualError> {
        Ok(match annotation {
            Some(qualifier) => QualifiedTypeVariable {
                base,
                qualifier: self.in_lattice(qualifier)?,
                param,
                explicit: true,
            },
            None => QualifiedTypeVariable {
                base,
                qualifier: self.bound_qualifier(param)?,
                param,
                explicit: false,
            },
        })
    }

    /// Primary qualifier of `param`'s upper bound, following bounds that are
    /// themselves type variables without descending into type arguments.
    fn bound_qualifier(&self, param: TypeParamId) -> Result<Q, QualError> {
        let oracle = self.oracle();
        let mut current = param;
        for _ in 0..MAX_BOUND_CHAIN {
            let Some(element) = self.program.type_param_element(current) else {
                let bound = oracle
                    .type_param(current)
                    .map_or_else(|| oracle.object(), |d| d.upper_bound);
                return self.defaulted(TypeUseLocation::UpperBound, bound);
            };
            let tp = self.element(element)?.as_type_parameter().ok_or_else(|| QualError::NotA {
                what: self.program.element_location(element).to_string(),
                expected: "type parameter",
            })?;
            let bound = self
                .program
                .type_syntax(tp.upper_bound)
                .ok_or(QualError::UnknownTypeSyntax(tp.upper_bound))?;
            if let Some(q) = &bound.annotation {
                return self.in_lattice(q.clone());
            }
            match oracle.lookup(bound.base) {
                Some(BaseTypeData::TypeVariable(next)) => current = next,
                Some(BaseTypeData::Declared { class, .. }) => {
                    return match self.class_qualifier(class) {
                        Some(q) => self.in_lattice(q),
                        None => self.defaulted(TypeUseLocation::UpperBound, bound.base),
                    };
                }
                _ => {
                    return self.defaulted(TypeUseLocation::UpperBound, bound.base);
                }
            }
        }
        warn!(param = param.0, "type parameter bound chain too long");
        Ok(self.lattice.top().clone())
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn element_type(&self, id: ElementId) -> Result<QualifiedType<Q>, QualError> {
        let md = self.member_default(id);
        match self.element(id)? {
            Element::Class(_) => self.class_type(id),
            Element::Field(v) => self.syntax_type(v.ty, TypeUseLocation::Field, md.as_ref()),
            Element::Parameter(v) => self.syntax_type(v.ty, TypeUseLocation::Parameter, md.as_ref()),
            Element::Local(v) => self.syntax_type(v.ty, TypeUseLocation::Local, md.as_ref()),
            Element::Method(e) | Element::Constructor(e) => {
                Ok(QualifiedType::Executable(self.executable_type(id, e, md.as_ref())?))
            }
            Element::TypeParameter(tp) => {
                let base = self.oracle().intern(BaseTypeData::TypeVariable(tp.param));
                Ok(QualifiedType::TypeVariable(self.type_variable_use(tp.param, base, None)?))
            }
        }
    }

    /// The generic declaration of a class, `@Q C<T1, .., Tn>`.
    fn class_type(&self, class: ElementId) -> Result<QualifiedType<Q>, QualError> {
        let decl = self.class_element(class)?;
        let base = self.oracle().declared_type(decl.class);
        let qualifier = match decl.qualifier.clone() {
            Some(q) => self.in_lattice(q)?,
            None => self.defaulted(TypeUseLocation::ClassDeclaration, base)?,
        };
        self.generic_declaration(decl.class, qualifier)
    }

    /// Type of `this` inside `class`.
    pub(crate) fn implicit_receiver(&self, class: ElementId) -> Result<QualifiedType<Q>, QualError> {
        let decl = self.class_element(class)?;
        let base = self.oracle().declared_type(decl.class);
        let qualifier = match decl.member_default.clone().or_else(|| decl.qualifier.clone()) {
            Some(q) => self.in_lattice(q)?,
            None => self.defaulted(TypeUseLocation::Receiver, base)?,
        };
        self.generic_declaration(decl.class, qualifier)
    }

    fn generic_declaration(&self, class: ClassId, qualifier: Q) -> Result<QualifiedType<Q>, QualError> {
        let oracle = self.oracle();
        let params = oracle
            .class(class)
            .map(|c| c.type_params.clone())
            .unwrap_or_default();
        let type_arguments = params
            .into_iter()
            .map(|p| {
                let base = oracle.intern(BaseTypeData::TypeVariable(p));
                self.type_variable_use(p, base, None).map(QualifiedType::TypeVariable)
            })
            .collect::<Result<_, _>>()?;
        Ok(QualifiedType::Declared(QualifiedDeclaredType {
            base: oracle.declared_type(class),
            qualifier,
            type_arguments,
        }))
    }

    fn executable_type(
        &self,
        id: ElementId,
        exe: &ExecutableElement,
        md: Option<&Q>,
    ) -> Result<QualifiedExecutableType<Q>, QualError> {
        let return_type = self.syntax_type(exe.return_type, TypeUseLocation::Return, md)?;
        let parameter_types = exe
            .params
            .iter()
            .map(|&p| {
                let v = self.element(p)?.as_variable().ok_or_else(|| QualError::NotA {
                    what: self.program.element_location(p).to_string(),
                    expected: "parameter",
                })?;
                self.syntax_type(v.ty, TypeUseLocation::Parameter, md)
            })
            .collect::<Result<_, _>>()?;
        let is_constructor = matches!(self.element(id)?, Element::Constructor(_));
        let receiver_type = match exe.receiver {
            Some(written) => Some(Box::new(self.syntax_type(written, TypeUseLocation::Receiver, md)?)),
            None if exe.is_static || is_constructor => None,
            None => Some(Box::new(self.implicit_receiver(exe.owner)?)),
        };
        let type_variables = exe
            .type_params
            .iter()
            .map(|&tp| match self.element(tp)? {
                Element::TypeParameter(t) => {
                    let base = self.oracle().intern(BaseTypeData::TypeVariable(t.param));
                    self.type_variable_use(t.param, base, None)
                }
                _ => Err(QualError::NotA {
                    what: self.program.element_location(tp).to_string(),
                    expected: "type parameter",
                }),
            })
            .collect::<Result<_, _>>()?;
        Ok(QualifiedExecutableType {
            element: id,
            return_type: Box::new(return_type),
            parameter_types,
            receiver_type,
            type_variables,
        })
    }
}

impl<Q: Qualifier> SubtypeEnv<Q> for DefaultQualifiedTypeFactory<Q> {
    fn oracle(&self) -> &dyn BaseTypeOracle {
        self.program.oracle()
    }

    fn as_super(
        &self,
        ty: &QualifiedType<Q>,
        class: ClassId,
    ) -> Result<Option<QualifiedType<Q>>, QualError> {
        DefaultQualifiedTypeFactory::as_super(self, ty, class)
    }

    fn type_variable_bounds(
        &self,
        param: TypeParamId,
    ) -> Result<QualifiedTypeParameterBounds<Q>, QualError> {
        self.bounds_of_param(param)
    }
}

impl<Q: Qualifier> QualifiedTypeFactory<Q> for DefaultQualifiedTypeFactory<Q> {
    fn qualified_type_of_element(&self, element: ElementId) -> Result<QualifiedType<Q>, QualError> {
        let ty = self.element_type(element)?;
        debug!(
            element = %self.program.element_location(element),
            ty = %ty.display(self.oracle()),
            "element type"
        );
        Ok(ty)
    }

    fn qualified_type_of_tree(&self, tree: TreeId) -> Result<QualifiedType<Q>, QualError> {
        self.tree_type(tree)
    }

    fn qualified_type_from_type_syntax(&self, syntax: TypeSyntaxId) -> Result<QualifiedType<Q>, QualError> {
        self.syntax_type(syntax, TypeUseLocation::Other, None)
    }

    fn qualified_type_parameter_bounds(
        &self,
        type_param: ElementId,
    ) -> Result<QualifiedTypeParameterBounds<Q>, QualError> {
        self.declared_bounds(type_param)
    }

    fn qualifier_hierarchy(&self) -> &QualifierHierarchy<Q> {
        &self.lattice
    }

    fn type_hierarchy(&self) -> TypeHierarchy<'_, Q> {
        TypeHierarchy::new(&self.lattice, self, &self.options)
    }

    fn post_direct_supertypes(
        &self,
        subtype: &QualifiedType<Q>,
        supertypes: Vec<QualifiedType<Q>>,
    ) -> Result<Vec<QualifiedType<Q>>, QualError> {
        self.hooked_direct_supertypes(subtype, supertypes)
    }

    fn post_as_member_of(
        &self,
        member_type: QualifiedType<Q>,
        receiver: &QualifiedType<Q>,
        member: ElementId,
    ) -> Result<QualifiedType<Q>, QualError> {
        self.hooked_member_type(member_type, receiver, member)
    }

    fn type_variables_from_use(
        &self,
        ty: &QualifiedDeclaredType<Q>,
        class: ElementId,
    ) -> Result<Vec<QualifiedTypeVariable<Q>>, QualError> {
        self.hooked_use_variables(ty, class)
    }

    fn method_from_use(&self, tree: TreeId) -> Result<ExecutableUse<Q>, QualError> {
        self.method_use(tree)
    }

    fn constructor_from_use(&self, tree: TreeId) -> Result<ExecutableUse<Q>, QualError> {
        self.constructor_use(tree)
    }
}

#[cfg(test)]
#[path = "../tests/factory_tests.rs"]
mod tests;
