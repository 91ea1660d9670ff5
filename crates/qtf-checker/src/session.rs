//! Checking session.
//!
//! A `CheckSession` walks nothing by itself: the host's traversal calls one
//! `check_*` method per construct. Every method asks the factory for the
//! qualified types involved and compares them with the type hierarchy.
//!
//! Errors split in two:
//!
//! - findings about the checked program (an incompatible flow, a failed
//!   call-site inference) become diagnostics and the session continues
//! - broken checker definitions (hook results of the wrong shape, missing
//!   lattice joins, unknown ids) are returned as `Err` and end the session

use crate::messages;
use qtf_common::diagnostics::{codes, format_message};
use qtf_common::{Diagnostic, DiagnosticCollector, SourceLocation};
use qtf_model::{Element, ElementId, TreeId, TreeKind, TypeSyntaxId};
use qtf_solver::{
    DefaultQualifiedTypeFactory, ExecutableUse, QualError, QualifiedExecutableType, QualifiedType,
    QualifiedTypeFactory, Qualifier,
};
use std::sync::Arc;
use tracing::{debug, trace, warn};

pub struct CheckSession<Q: Qualifier> {
    factory: Arc<DefaultQualifiedTypeFactory<Q>>,
    diagnostics: DiagnosticCollector,
}

impl<Q: Qualifier> CheckSession<Q> {
    pub fn new(factory: Arc<DefaultQualifiedTypeFactory<Q>>) -> Self {
        CheckSession {
            factory,
            diagnostics: DiagnosticCollector::new(),
        }
    }

    pub fn factory(&self) -> &DefaultQualifiedTypeFactory<Q> {
        &self.factory
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.diagnostics()
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.take_diagnostics()
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.error_count()
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.diagnostics.has_code(code)
    }

    // =========================================================================
    // Checks
    // =========================================================================

    /// `target = value` where `target` is a field, parameter or local.
    pub fn check_assignment(&mut self, target: ElementId, value: TreeId) -> Result<(), QualError> {
        let factory = Arc::clone(&self.factory);
        let Some(required) = self.recover(factory.qualified_type_of_element(target))? else {
            return Ok(());
        };
        let Some(found) = self.recover(factory.qualified_type_of_tree(value))? else {
            return Ok(());
        };
        if factory.is_subtype(&found, &required)? {
            return Ok(());
        }
        let program = factory.program();
        let target_location = program.element_location(target);
        let message = format_message(
            messages::ASSIGNMENT_INCOMPATIBLE,
            &[
                &target_location.to_string(),
                &found.display(factory.oracle()).to_string(),
                &required.display(factory.oracle()).to_string(),
            ],
        );
        self.report(
            Diagnostic::error(program.location(value), codes::ASSIGNMENT_INCOMPATIBLE, message)
                .with_related(target_location, messages::DECLARED_HERE),
        );
        Ok(())
    }

    /// `lhs = rhs` between two expressions.
    pub fn check_tree_assignment(&mut self, lhs: TreeId, rhs: TreeId) -> Result<(), QualError> {
        let factory = Arc::clone(&self.factory);
        let Some(required) = self.recover(factory.qualified_type_of_tree(lhs))? else {
            return Ok(());
        };
        let Some(found) = self.recover(factory.qualified_type_of_tree(rhs))? else {
            return Ok(());
        };
        if factory.is_subtype(&found, &required)? {
            return Ok(());
        }
        let program = factory.program();
        let message = format_message(
            messages::ASSIGNMENT_INCOMPATIBLE,
            &[
                &program.location(lhs).to_string(),
                &found.display(factory.oracle()).to_string(),
                &required.display(factory.oracle()).to_string(),
            ],
        );
        self.report(Diagnostic::error(
            program.location(rhs),
            codes::ASSIGNMENT_INCOMPATIBLE,
            message,
        ));
        Ok(())
    }

    /// A method invocation: the receiver and every argument against the
    /// method as instantiated at this call.
    pub fn check_method_invocation(&mut self, tree: TreeId) -> Result<(), QualError> {
        let factory = Arc::clone(&self.factory);
        let (receiver, args) = match factory.program().tree(tree).map(|t| &t.kind) {
            Some(TreeKind::MethodInvocation { receiver, args, .. }) => (*receiver, args.clone()),
            Some(_) => {
                return Err(QualError::NotA {
                    what: factory.program().location(tree).to_string(),
                    expected: "method invocation",
                });
            }
            None => return Err(QualError::UnknownTree(tree)),
        };
        let Some(use_) = self.recover(factory.method_from_use(tree))? else {
            return Ok(());
        };
        let receiver_type = match receiver {
            Some(r) => match self.recover(factory.qualified_type_of_tree(r))? {
                Some(ty) => Some((r, ty)),
                None => return Ok(()),
            },
            None => None,
        };
        self.check_call(tree, &use_, receiver_type, &args)
    }

    /// An object creation: the arguments against the constructor as
    /// instantiated at this call, and the written class type's arguments
    /// against their bounds.
    pub fn check_constructor_invocation(&mut self, tree: TreeId) -> Result<(), QualError> {
        let factory = Arc::clone(&self.factory);
        let (class_type, args) = match factory.program().tree(tree).map(|t| &t.kind) {
            Some(TreeKind::NewClass {
                class_type, args, ..
            }) => (*class_type, args.clone()),
            Some(_) => {
                return Err(QualError::NotA {
                    what: factory.program().location(tree).to_string(),
                    expected: "object creation",
                });
            }
            None => return Err(QualError::UnknownTree(tree)),
        };
        let written = factory.qualified_type_from_type_syntax(class_type)?;
        self.check_type_arguments_at(&written, factory.program().location(tree))?;
        let Some(use_) = self.recover(factory.constructor_from_use(tree))? else {
            return Ok(());
        };
        self.check_call(tree, &use_, None, &args)
    }

    /// `return tree` inside `method`.
    pub fn check_return(&mut self, method: ElementId, tree: TreeId) -> Result<(), QualError> {
        let factory = Arc::clone(&self.factory);
        let executable = self.executable_of(method)?;
        let Some(found) = self.recover(factory.qualified_type_of_tree(tree))? else {
            return Ok(());
        };
        let required = &*executable.return_type;
        if factory.is_subtype(&found, required)? {
            return Ok(());
        }
        let program = factory.program();
        let message = format_message(
            messages::RETURN_INCOMPATIBLE,
            &[
                &program.element_location(method).to_string(),
                &found.display(factory.oracle()).to_string(),
                &required.display(factory.oracle()).to_string(),
            ],
        );
        self.report(Diagnostic::error(
            program.location(tree),
            codes::RETURN_INCOMPATIBLE,
            message,
        ));
        Ok(())
    }

    /// `overrider` overriding `overridden`, with the overridden method seen
    /// as a member of the overrider's class.
    pub fn check_override(
        &mut self,
        overrider: ElementId,
        overridden: ElementId,
    ) -> Result<(), QualError> {
        let factory = Arc::clone(&self.factory);
        let program = factory.program();
        let owner = match program.element(overrider) {
            Some(Element::Method(e)) => e.owner,
            Some(_) => {
                return Err(QualError::NotA {
                    what: program.element_location(overrider).to_string(),
                    expected: "method",
                });
            }
            None => return Err(QualError::UnknownElement(overrider)),
        };
        let sub = self.executable_of(overrider)?;
        let class_type = factory.qualified_type_of_element(owner)?;
        let member = factory.as_member_of(overridden, &class_type)?;
        let sup = match member {
            QualifiedType::Executable(e) => e,
            other => {
                return Err(QualError::NotA {
                    what: other.display(factory.oracle()).to_string(),
                    expected: "method type",
                });
            }
        };
        if factory.type_hierarchy().is_override_compatible(&sub, &sup)? {
            trace!(
                overrider = %program.element_location(overrider),
                overridden = %program.element_location(overridden),
                "override ok"
            );
            return Ok(());
        }
        let sub_ty = QualifiedType::Executable(sub);
        let sup_ty = QualifiedType::Executable(sup);
        let overridden_location = program.element_location(overridden);
        let message = format_message(
            messages::OVERRIDE_INVALID,
            &[
                &program.element_location(overrider).to_string(),
                &overridden_location.to_string(),
                &sub_ty.display(factory.oracle()).to_string(),
                &sup_ty.display(factory.oracle()).to_string(),
            ],
        );
        self.report(
            Diagnostic::error(
                program.element_location(overrider),
                codes::OVERRIDE_INVALID,
                message,
            )
            .with_related(overridden_location, messages::OVERRIDDEN_HERE),
        );
        Ok(())
    }

    /// A written parameterized type: every type argument within the bounds
    /// of its parameter.
    pub fn check_type_use(&mut self, syntax: TypeSyntaxId) -> Result<(), QualError> {
        let factory = Arc::clone(&self.factory);
        let ty = factory.qualified_type_from_type_syntax(syntax)?;
        self.check_type_arguments_at(&ty, factory.program().type_location(syntax))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn check_call(
        &mut self,
        tree: TreeId,
        use_: &ExecutableUse<Q>,
        receiver: Option<(TreeId, QualifiedType<Q>)>,
        args: &[TreeId],
    ) -> Result<(), QualError> {
        let factory = Arc::clone(&self.factory);
        let mut arguments = Vec::with_capacity(args.len());
        for &arg in args {
            match self.recover(factory.qualified_type_of_tree(arg))? {
                Some(ty) => arguments.push(ty),
                None => return Ok(()),
            }
        }
        let executable = &use_.executable;
        let compat = factory.type_hierarchy().are_arguments_compatible(
            executable,
            receiver.as_ref().map(|(_, ty)| ty),
            &arguments,
        )?;
        debug!(
            call = %factory.program().location(tree),
            ok = compat.is_ok(),
            "call checked"
        );
        if compat.is_ok() {
            return Ok(());
        }

        let program = factory.program();
        let oracle = factory.oracle();
        let callee = program.element_location(executable.element).to_string();
        if let (false, Some((r, found)), Some(required)) = (
            compat.receiver_ok,
            receiver.as_ref(),
            executable.receiver_type.as_deref(),
        ) {
            let message = format_message(
                messages::RECEIVER_INCOMPATIBLE,
                &[
                    &callee,
                    &found.display(oracle).to_string(),
                    &required.display(oracle).to_string(),
                ],
            );
            self.report(Diagnostic::error(
                program.location(*r),
                codes::RECEIVER_INCOMPATIBLE,
                message,
            ));
        }
        for &i in &compat.incompatible_arguments {
            let (Some(&arg), Some(found), Some(required)) = (
                args.get(i),
                arguments.get(i),
                executable.parameter_types.get(i),
            ) else {
                continue;
            };
            let message = format_message(
                messages::ARGUMENT_INCOMPATIBLE,
                &[
                    &(i + 1).to_string(),
                    &callee,
                    &found.display(oracle).to_string(),
                    &required.display(oracle).to_string(),
                ],
            );
            self.report(Diagnostic::error(
                program.location(arg),
                codes::ARGUMENT_INCOMPATIBLE,
                message,
            ));
        }
        Ok(())
    }

    fn check_type_arguments_at(
        &mut self,
        ty: &QualifiedType<Q>,
        location: SourceLocation,
    ) -> Result<(), QualError> {
        let factory = Arc::clone(&self.factory);
        let oracle = factory.oracle();
        for violation in factory.check_type_arguments(ty)? {
            let class = oracle.class(violation.class).map_or_else(
                || format!("class#{}", violation.class.0),
                |c| c.name.clone(),
            );
            let message = format_message(
                messages::TYPE_ARGUMENT_INCOMPATIBLE,
                &[
                    &(violation.index + 1).to_string(),
                    &class,
                    &violation.argument.display(oracle).to_string(),
                    &violation.bounds.lower.display(oracle).to_string(),
                    &violation.bounds.upper.display(oracle).to_string(),
                ],
            );
            self.report(Diagnostic::error(
                location.clone(),
                codes::TYPE_ARGUMENT_INCOMPATIBLE,
                message,
            ));
        }
        Ok(())
    }

    fn executable_of(&self, element: ElementId) -> Result<QualifiedExecutableType<Q>, QualError> {
        match self.factory.qualified_type_of_element(element)? {
            QualifiedType::Executable(e) => Ok(e),
            _ => Err(QualError::NotA {
                what: self.factory.program().element_location(element).to_string(),
                expected: "method or constructor",
            }),
        }
    }

    /// Turn a non-fatal error into a diagnostic; `Ok(None)` tells the caller
    /// to abandon the current check.
    fn recover<T>(&mut self, result: Result<T, QualError>) -> Result<Option<T>, QualError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(QualError::Inference { location, source }) => {
                let message = format_message(messages::INFERENCE_FAILED, &[&source.to_string()]);
                self.report(Diagnostic::error(location, codes::INFERENCE_FAILED, message));
                Ok(None)
            }
            Err(err) => {
                warn!(error = %err, "checking session aborted");
                Err(err)
            }
        }
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        debug!(%diagnostic, "diagnostic");
        self.diagnostics.push(diagnostic);
    }
}

#[cfg(test)]
#[path = "../tests/session_tests.rs"]
mod tests;
