//! A `post_as_member_of` hook that resolves `@PolyTainted` members to the
//! qualifier of the receiver they are accessed through.

mod common;

use common::{Taint, taint_factory};
use qtf_checker::CheckSession;
use qtf_common::diagnostics::codes;
use qtf_model::{ElementId, ProgramBuilder, TreeId};
use qtf_solver::{
    CheckerHooks, DefaultQualifiedTypeFactory, QualError, QualifiedType, QualifiedTypeFactory,
};
use std::sync::Arc;

struct ReceiverPolymorphism;

impl CheckerHooks<Taint> for ReceiverPolymorphism {
    fn post_as_member_of(
        &self,
        _factory: &DefaultQualifiedTypeFactory<Taint>,
        member_type: QualifiedType<Taint>,
        receiver: &QualifiedType<Taint>,
        _member: ElementId,
    ) -> QualifiedType<Taint> {
        let Some(&actual) = receiver.qualifier() else {
            return member_type;
        };
        member_type.map_qualifiers(&mut |&q| if q == Taint::PolyTainted { actual } else { q })
    }
}

/// Replaces every member type with the receiver's type.
struct ReturnsReceiver;

impl CheckerHooks<Taint> for ReturnsReceiver {
    fn post_as_member_of(
        &self,
        _factory: &DefaultQualifiedTypeFactory<Taint>,
        _member_type: QualifiedType<Taint>,
        receiver: &QualifiedType<Taint>,
        _member: ElementId,
    ) -> QualifiedType<Taint> {
        receiver.clone()
    }
}

struct Boxes {
    b: ProgramBuilder<Taint>,
    sink: ElementId,
    clean_value: TreeId,
    dirty_value: TreeId,
    clean_get: TreeId,
    dirty_get: TreeId,
}

// class Box { @PolyTainted String value; @PolyTainted String get() }
// @Untainted Box clean; @Tainted Box dirty; @Untainted String sink;
fn boxes() -> Boxes {
    let mut b = ProgramBuilder::new();
    let string = b.class("String", &[]);
    let holder = b.class("Box", &[]);
    let poly = b.declared_with(string, &[], Taint::PolyTainted);
    let value = b.field(holder, "value", poly);
    let get = b.method(holder, "get");
    let poly = b.declared_with(string, &[], Taint::PolyTainted);
    b.returns(get, poly);

    let main = b.class("Main", &[]);
    let run = b.method(main, "run");
    let clean_ty = b.declared_with(holder, &[], Taint::Untainted);
    let clean = b.local(run, "clean", clean_ty);
    let dirty_ty = b.declared_with(holder, &[], Taint::Tainted);
    let dirty = b.local(run, "dirty", dirty_ty);
    let sink_ty = b.declared_with(string, &[], Taint::Untainted);
    let sink = b.local(run, "sink", sink_ty);

    let clean_ref = b.ident(clean);
    let dirty_ref = b.ident(dirty);
    let clean_value = b.field_access(clean_ref, value);
    b.label(clean_value, "clean.value");
    let dirty_value = b.field_access(dirty_ref, value);
    b.label(dirty_value, "dirty.value");
    let clean_get = b.call(Some(clean_ref), get, &[]);
    b.label(clean_get, "clean.get()");
    let dirty_get = b.call(Some(dirty_ref), get, &[]);
    b.label(dirty_get, "dirty.get()");

    Boxes {
        b,
        sink,
        clean_value,
        dirty_value,
        clean_get,
        dirty_get,
    }
}

#[test]
fn test_field_takes_the_receiver_qualifier() {
    let bx = boxes();
    let factory = taint_factory(bx.b.build()).with_hooks(ReceiverPolymorphism);
    let ty = |t| factory.qualified_type_of_tree(t).unwrap();
    assert_eq!(ty(bx.clean_value).qualifier(), Some(&Taint::Untainted));
    assert_eq!(ty(bx.dirty_value).qualifier(), Some(&Taint::Tainted));

    let mut session = CheckSession::new(Arc::new(factory));
    session.check_assignment(bx.sink, bx.clean_value).unwrap();
    assert!(session.diagnostics().is_empty());
    session.check_assignment(bx.sink, bx.dirty_value).unwrap();
    assert_eq!(session.diagnostics().len(), 1);
    assert_eq!(session.diagnostics()[0].location.node, "dirty.value");
}

#[test]
fn test_method_return_takes_the_receiver_qualifier() {
    let bx = boxes();
    let factory = taint_factory(bx.b.build()).with_hooks(ReceiverPolymorphism);
    let mut session = CheckSession::new(Arc::new(factory));

    session.check_method_invocation(bx.clean_get).unwrap();
    session.check_method_invocation(bx.dirty_get).unwrap();
    session.check_assignment(bx.sink, bx.clean_get).unwrap();
    assert!(session.diagnostics().is_empty());

    session.check_assignment(bx.sink, bx.dirty_get).unwrap();
    assert!(session.has_code(codes::ASSIGNMENT_INCOMPATIBLE));
    assert_eq!(session.diagnostics()[0].location.node, "dirty.get()");
}

#[test]
fn test_without_the_hook_poly_members_stay_poly() {
    let bx = boxes();
    let mut session = CheckSession::new(Arc::new(taint_factory(bx.b.build())));
    let ty = session.factory().qualified_type_of_tree(bx.clean_value).unwrap();
    assert_eq!(ty.qualifier(), Some(&Taint::PolyTainted));

    session.check_assignment(bx.sink, bx.clean_value).unwrap();
    assert_eq!(session.error_count(), 1);
}

#[test]
fn test_hook_changing_the_member_shape_ends_the_session() {
    let bx = boxes();
    let factory = taint_factory(bx.b.build()).with_hooks(ReturnsReceiver);
    let mut session = CheckSession::new(Arc::new(factory));

    let err = session.check_assignment(bx.sink, bx.clean_value).unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, QualError::HookShape { hook: "post_as_member_of", .. }));
    assert!(session.diagnostics().is_empty());
}
