//! Engine options loaded from JSON fixtures change what a session reports.

mod common;

use common::{Taint, taint_factory};
use qtf_checker::CheckSession;
use qtf_common::diagnostics::codes;
use qtf_common::limits::MAX_SUBTYPE_DEPTH;
use qtf_model::{ElementId, ProgramBuilder, TreeId};
use qtf_solver::{EngineOptions, QualError, UninferredPolicy};
use std::sync::Arc;

const ENGINE_OPTIONS: &str = include_str!("fixtures/engine_options.json");
const UNKNOWN_OPTION: &str = include_str!("fixtures/unknown_option.json");

struct Ids {
    base_accept: ElementId,
    sub_accept: ElementId,
    sink: ElementId,
    make_call: TreeId,
}

// class Base { void accept(@Untainted String s) }
// class Sub extends Base { void accept(String s) }
// static <T> T make(); @Untainted Object sink = make();
fn session(options: EngineOptions) -> (CheckSession<Taint>, Ids) {
    let mut b = ProgramBuilder::new();
    let string = b.class("String", &[]);
    let base = b.class("Base", &[]);
    let base_accept = b.method(base, "accept");
    let clean = b.declared_with(string, &[], Taint::Untainted);
    b.param(base_accept, "s", clean);
    let sub = b.class("Sub", &[]);
    let base_ty = b.declared(base, &[]);
    b.extends(sub, base_ty);
    let sub_accept = b.method(sub, "accept");
    let raw = b.declared(string, &[]);
    b.param(sub_accept, "s", raw);

    let factory_class = b.class("Factory", &[]);
    let make = b.method(factory_class, "make");
    b.set_static(make);
    let t = b.method_type_param(make, "T");
    let t_ret = b.type_var(t);
    b.returns(make, t_ret);

    let main = b.class("Main", &[]);
    let run = b.method(main, "run");
    let sink_ty = b.object_type();
    b.annotate(sink_ty, Taint::Untainted);
    let sink = b.local(run, "sink", sink_ty);
    let make_call = b.call(None, make, &[]);
    b.label(make_call, "make()");

    let factory = taint_factory(b.build()).with_options(options);
    let ids = Ids {
        base_accept,
        sub_accept,
        sink,
        make_call,
    };
    (CheckSession::new(Arc::new(factory)), ids)
}

#[test]
fn test_fixture_parses_into_engine_options() {
    let raw: serde_json::Value = serde_json::from_str(ENGINE_OPTIONS).unwrap();
    assert_eq!(raw["parameter_contravariance"], serde_json::Value::Bool(true));

    let options = EngineOptions::from_json(ENGINE_OPTIONS).unwrap();
    assert!(options.parameter_contravariance);
    assert_eq!(options.uninferred_qualifier, UninferredPolicy::Bottom);
    // Omitted fields keep their defaults.
    assert_eq!(options.max_subtype_depth, MAX_SUBTYPE_DEPTH);

    let written: serde_json::Value = serde_json::from_str(&options.to_json().unwrap()).unwrap();
    assert_eq!(written["uninferred_qualifier"], "bottom");
    assert_eq!(written["max_subtype_depth"], MAX_SUBTYPE_DEPTH);
}

#[test]
fn test_unknown_option_is_rejected() {
    let err = EngineOptions::from_json(UNKNOWN_OPTION).unwrap_err();
    assert!(err.is_fatal());
    match err {
        QualError::InvalidOptions(message) => assert!(message.contains("strict_nulls")),
        other => panic!("expected invalid options, got {other:?}"),
    }
}

#[test]
fn test_parameter_contravariance_accepts_a_wider_override() {
    let (mut strict, ids) = session(EngineOptions::default());
    strict.check_override(ids.sub_accept, ids.base_accept).unwrap();
    assert!(strict.has_code(codes::OVERRIDE_INVALID));

    let options = EngineOptions::from_json(ENGINE_OPTIONS).unwrap();
    let (mut relaxed, ids) = session(options);
    relaxed.check_override(ids.sub_accept, ids.base_accept).unwrap();
    assert!(relaxed.diagnostics().is_empty());
}

#[test]
fn test_uninferred_policy_decides_unconstrained_results() {
    let (mut top, ids) = session(EngineOptions::default());
    top.check_assignment(ids.sink, ids.make_call).unwrap();
    assert_eq!(top.diagnostics().len(), 1);
    assert_eq!(top.diagnostics()[0].location.node, "make()");

    let options = EngineOptions::from_json(ENGINE_OPTIONS).unwrap();
    let (mut bottom, ids) = session(options);
    bottom.check_assignment(ids.sink, ids.make_call).unwrap();
    assert!(bottom.diagnostics().is_empty());
}
