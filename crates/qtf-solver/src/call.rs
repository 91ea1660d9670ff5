//! Method and constructor uses.
//!
//! A use is the called executable seen through its receiver (or the
//! constructed type), with every type parameter of the executable itself
//! instantiated: from explicit type arguments when written, otherwise by
//! inference over the argument types (see [`crate::infer`]).

use crate::defaults::TypeUseLocation;
use crate::errors::{InferenceError, LatticeError, QualError};
use crate::factory::{DefaultQualifiedTypeFactory, QualifiedTypeFactory};
use crate::hooks::ExecutableUse;
use crate::infer::InferenceContext;
use crate::instantiate::QualifiedSubstitution;
use crate::lattice::{Qualifier, render};
use crate::options::UninferredPolicy;
use crate::types::{QualifiedExecutableType, QualifiedType};
use qtf_model::{BaseTypeId, TreeId, TreeKind, TypeArgument, TypeParamId};
use tracing::debug;

impl<Q: Qualifier> DefaultQualifiedTypeFactory<Q> {
    pub(crate) fn method_use(&self, id: TreeId) -> Result<ExecutableUse<Q>, QualError> {
        let tree = self.program.tree(id).ok_or(QualError::UnknownTree(id))?;
        let TreeKind::MethodInvocation {
            receiver,
            method,
            args,
            type_args,
        } = &tree.kind
        else {
            return Err(QualError::NotA {
                what: self.program.location(id).to_string(),
                expected: "method invocation",
            });
        };
        self.executable_element(*method)?;
        let member = match receiver {
            Some(r) => {
                let receiver_type = self.tree_type(*r)?;
                self.as_member_of(*method, &receiver_type)?
            }
            None => self.qualified_type_of_element(*method)?,
        };
        let executable = self.expect_executable(id, member)?;
        let arguments = args
            .iter()
            .map(|&a| self.tree_type(a))
            .collect::<Result<Vec<_>, _>>()?;
        let result = self.instantiate_use(id, &executable, &arguments, type_args)?;
        let adjusted = self.hooks.method_from_use(self, id, result.clone());
        self.validate_use("method_from_use", &result, adjusted)
    }

    pub(crate) fn constructor_use(&self, id: TreeId) -> Result<ExecutableUse<Q>, QualError> {
        let tree = self.program.tree(id).ok_or(QualError::UnknownTree(id))?;
        let TreeKind::NewClass {
            class_type,
            constructor,
            args,
            type_args,
        } = &tree.kind
        else {
            return Err(QualError::NotA {
                what: self.program.location(id).to_string(),
                expected: "object creation",
            });
        };
        self.executable_element(*constructor)?;
        let written = self.qualified_type_from_type_syntax(*class_type)?;
        let declared = self.expect_executable(id, self.qualified_type_of_element(*constructor)?)?;

        // The written type instantiates the class's own type parameters.
        let subst = match &written {
            QualifiedType::Declared(d) => match self.oracle().class_of(d.base) {
                Some(class) => self.use_substitution(d, class)?,
                None => QualifiedSubstitution::new(),
            },
            _ => QualifiedSubstitution::new(),
        };
        let mut executable = subst.apply_executable(self.oracle(), &declared);
        if self.is_annotated(*class_type)
            && let Some(q) = written.qualifier()
        {
            let ret = executable.return_type.as_ref().clone().with_qualifier(q.clone());
            executable.return_type = Box::new(ret);
        }

        let arguments = args
            .iter()
            .map(|&a| self.tree_type(a))
            .collect::<Result<Vec<_>, _>>()?;
        let result = self.instantiate_use(id, &executable, &arguments, type_args)?;
        let adjusted = self.hooks.constructor_from_use(self, id, result.clone());
        self.validate_use("constructor_from_use", &result, adjusted)
    }

    fn expect_executable(
        &self,
        id: TreeId,
        ty: QualifiedType<Q>,
    ) -> Result<QualifiedExecutableType<Q>, QualError> {
        let display = ty.display(self.oracle()).to_string();
        ty.into_executable().ok_or_else(|| QualError::NotA {
            what: format!("{display} at {}", self.program.location(id)),
            expected: "executable type",
        })
    }

    fn validate_use(
        &self,
        hook: &'static str,
        computed: &ExecutableUse<Q>,
        adjusted: ExecutableUse<Q>,
    ) -> Result<ExecutableUse<Q>, QualError> {
        if adjusted.same_shape(computed) {
            for ty in &adjusted.type_arguments {
                self.check_qualifiers(ty)?;
            }
            self.check_qualifiers(&QualifiedType::Executable(adjusted.executable.clone()))?;
            return Ok(adjusted);
        }
        let oracle = self.oracle();
        Err(QualError::HookShape {
            hook,
            expected: QualifiedType::Executable(computed.executable.clone())
                .display(oracle)
                .to_string(),
            found: QualifiedType::Executable(adjusted.executable)
                .display(oracle)
                .to_string(),
        })
    }

    /// Instantiate the executable's own type parameters at a call site.
    fn instantiate_use(
        &self,
        id: TreeId,
        executable: &QualifiedExecutableType<Q>,
        arguments: &[QualifiedType<Q>],
        type_args: &[TypeArgument],
    ) -> Result<ExecutableUse<Q>, QualError> {
        if arguments.len() != executable.parameter_types.len() {
            return Err(QualError::ShapeMismatch {
                context: "call arguments",
                left: format!("{} arguments at {}", arguments.len(), self.program.location(id)),
                right: format!("{} parameters", executable.parameter_types.len()),
            });
        }
        if executable.type_variables.is_empty() {
            return Ok(ExecutableUse {
                executable: executable.clone(),
                type_arguments: Vec::new(),
            });
        }
        let type_arguments = self.infer_type_arguments(id, executable, arguments, type_args)?;
        let subst = QualifiedSubstitution::from_pairs(
            executable
                .type_variables
                .iter()
                .map(|v| v.param)
                .zip(type_arguments.iter().cloned()),
        );
        Ok(ExecutableUse {
            executable: subst.apply_executable(self.oracle(), executable),
            type_arguments,
        })
    }

    fn infer_type_arguments(
        &self,
        id: TreeId,
        executable: &QualifiedExecutableType<Q>,
        arguments: &[QualifiedType<Q>],
        type_args: &[TypeArgument],
    ) -> Result<Vec<QualifiedType<Q>>, QualError> {
        let oracle = self.oracle();
        let mut cx = InferenceContext::new(&self.lattice, self.program.location(id));
        let vars: Vec<_> = executable
            .type_variables
            .iter()
            .map(|v| cx.fresh_type_param(v.param))
            .collect();
        for (v, &var) in executable.type_variables.iter().zip(&vars) {
            if let QualifiedType::TypeVariable(bound) = self.bounds_of_param(v.param)?.upper
                && let Some(other) = cx.find_type_param(bound.param)
            {
                cx.unify_vars(var, other);
            }
        }
        for (formal, actual) in executable.parameter_types.iter().zip(arguments) {
            cx.collect(self, formal, actual)?;
        }

        let mut type_arguments = Vec::with_capacity(vars.len());
        for (i, (v, &var)) in executable.type_variables.iter().zip(&vars).enumerate() {
            if let Some(&TypeArgument::Explicit(syntax)) = type_args.get(i) {
                type_arguments.push(self.syntax_type(syntax, TypeUseLocation::TypeArgument, None)?);
                continue;
            }
            let name = oracle
                .type_param(v.param)
                .map_or_else(|| format!("#{}", v.param.0), |d| d.name.clone());
            let bounds = self.bounds_of_param(v.param)?;
            let qualifier = match cx.resolve(var, &name)? {
                Some(q) => q,
                None => self.in_lattice(self.uninferred_qualifier(id, v.param))?,
            };
            if let Some(upper) = bounds.upper.qualifier()
                && !self.lattice.is_subtype(&qualifier, upper)
            {
                return Err(cx.failure(InferenceError::BoundViolation {
                    param: name,
                    inferred: render(&qualifier),
                    bound: render(upper),
                }));
            }
            debug!(param = %name, qualifier = ?qualifier, "inferred type argument");

            let hint = match type_args.get(i) {
                Some(&TypeArgument::Inferred(base)) => Some(base),
                _ => None,
            };
            let candidates = cx.constraints(var).candidates.clone();
            let merged = self.merge_candidates(&cx, &name, &candidates, hint)?;
            let ty = match merged {
                Some(ty) => ty,
                None => {
                    let base = hint
                        .or_else(|| bounds.upper.base())
                        .unwrap_or_else(|| oracle.object());
                    self.default_type(base, TypeUseLocation::TypeArgument)?
                }
            };
            type_arguments.push(ty.with_qualifier(qualifier));
        }
        Ok(type_arguments)
    }

    fn uninferred_qualifier(&self, id: TreeId, param: TypeParamId) -> Q {
        self.program
            .type_param_element(param)
            .and_then(|el| self.hooks.uninferred_type_argument(self, id, el))
            .unwrap_or_else(|| match self.options.uninferred_qualifier {
                UninferredPolicy::Top => self.lattice.top().clone(),
                UninferredPolicy::Bottom => self.lattice.bottom().clone(),
            })
    }

    /// Node-wise join of the argument types that flowed into one type
    /// parameter, when they all share a shape (and match the host's base
    /// type argument, if it supplied one). A nested position without a
    /// join fails the inference like a root qualifier would.
    fn merge_candidates(
        &self,
        cx: &InferenceContext<'_, Q>,
        param: &str,
        candidates: &[QualifiedType<Q>],
        hint: Option<BaseTypeId>,
    ) -> Result<Option<QualifiedType<Q>>, QualError> {
        let Some((first, rest)) = candidates.split_first() else {
            return Ok(None);
        };
        if hint.is_some_and(|h| first.base() != Some(h)) || !rest.iter().all(|c| c.same_shape(first)) {
            return Ok(None);
        }
        let hierarchy = self.type_hierarchy();
        let mut merged = first.clone();
        for c in rest {
            merged = match hierarchy.least_upper_bound(&merged, c) {
                Ok(ty) => ty,
                Err(QualError::Lattice(LatticeError::NoLeastUpperBound(a, b))) => {
                    return Err(cx.failure(InferenceError::NoLeastUpperBound {
                        param: param.to_string(),
                        qualifiers: vec![a, b],
                    }));
                }
                Err(other) => return Err(other),
            };
        }
        Ok(Some(merged))
    }
}
