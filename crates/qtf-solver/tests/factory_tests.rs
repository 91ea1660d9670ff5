use super::*;
use crate::options::UninferredPolicy;
use crate::test_support::{Level, Poset, level_factory, poset_factory};
use qtf_model::{PrimitiveKind, ProgramBuilder, TypeArgument};

fn primary<Q: Qualifier>(ty: &QualifiedType<Q>) -> Q {
    ty.qualifier().cloned().unwrap()
}

// =============================================================================
// Elements and written types
// =============================================================================

#[test]
fn test_explicit_annotation_wins_over_default() {
    let mut b = ProgramBuilder::new();
    let string = b.class("String", &[]);
    let holder = b.class("Holder", &[]);
    let mid = b.declared_with(string, &[], Level::Mid);
    let plain = b.declared(string, &[]);
    let annotated = b.field(holder, "annotated", mid);
    let unannotated = b.field(holder, "unannotated", plain);
    let factory = level_factory(b.build());

    let ty = factory.qualified_type_of_element(annotated).unwrap();
    assert_eq!(primary(&ty), Level::Mid);
    let ty = factory.qualified_type_of_element(unannotated).unwrap();
    assert_eq!(primary(&ty), Level::Top);
}

#[test]
fn test_class_qualifier_applies_to_unannotated_uses() {
    let mut b = ProgramBuilder::new();
    let string = b.class("String", &[]);
    b.annotate_class(string, Level::Mid);
    let holder = b.class("Holder", &[]);
    let plain = b.declared(string, &[]);
    let top = b.declared_with(string, &[], Level::Top);
    let f = b.field(holder, "f", plain);
    let g = b.field(holder, "g", top);
    let factory = level_factory(b.build());

    assert_eq!(primary(&factory.qualified_type_of_element(f).unwrap()), Level::Mid);
    assert_eq!(primary(&factory.qualified_type_of_element(g).unwrap()), Level::Top);
    assert_eq!(primary(&factory.qualified_type_of_element(string).unwrap()), Level::Mid);
}

#[test]
fn test_member_default_skips_type_variable_uses() {
    let mut b = ProgramBuilder::new();
    let string = b.class("String", &[]);
    let safe = b.class("Safe", &["T"]);
    b.member_default(safe, Level::Bottom);
    let t = b.type_params(safe)[0];
    let plain = b.declared(string, &[]);
    let top = b.declared_with(string, &[], Level::Top);
    let t_use = b.type_var(t);
    let f = b.field(safe, "f", plain);
    let g = b.field(safe, "g", top);
    let h = b.field(safe, "h", t_use);
    let factory = level_factory(b.build());

    assert_eq!(primary(&factory.qualified_type_of_element(f).unwrap()), Level::Bottom);
    assert_eq!(primary(&factory.qualified_type_of_element(g).unwrap()), Level::Top);
    let h_ty = factory.qualified_type_of_element(h).unwrap();
    assert_eq!(h_ty.shape(), qtf_model::Shape::TypeVariable);
    assert_eq!(primary(&h_ty), Level::Top);
}

#[test]
fn test_receivers_and_static_methods() {
    let mut b = ProgramBuilder::new();
    let c = b.class("C", &[]);
    let m = b.method(c, "m");
    let written = b.method(c, "written");
    let recv = b.declared_with(c, &[], Level::Bottom);
    b.receiver(written, recv);
    let s = b.method(c, "s");
    b.set_static(s);
    let ctor = b.constructor(c);
    let factory = level_factory(b.build());

    let exe = |el| factory.qualified_type_of_element(el).unwrap().into_executable().unwrap();
    assert_eq!(exe(m).receiver_type.map(|r| primary(&r)), Some(Level::Top));
    assert_eq!(exe(written).receiver_type.map(|r| primary(&r)), Some(Level::Bottom));
    assert!(exe(s).receiver_type.is_none());
    assert!(exe(ctor).receiver_type.is_none());
}

#[test]
fn test_type_parameter_bounds() {
    let mut b = ProgramBuilder::new();
    let util = b.class("Util", &[]);
    let m = b.method(util, "m");
    let t = b.method_type_param(m, "T");
    let bound = b.object_type();
    b.annotate(bound, Level::Mid);
    b.set_upper_bound(t, bound);
    b.set_lower_qualifier(t, Level::Mid);
    let u = b.method_type_param(m, "U");
    let factory = level_factory(b.build());

    let bounds = factory.qualified_type_parameter_bounds(t).unwrap();
    assert_eq!(primary(&bounds.upper), Level::Mid);
    assert_eq!(primary(&bounds.lower), Level::Mid);
    assert_eq!(bounds.lower.shape(), qtf_model::Shape::Other);

    let bounds = factory.qualified_type_parameter_bounds(u).unwrap();
    assert_eq!(primary(&bounds.upper), Level::Top);
    assert_eq!(primary(&bounds.lower), Level::Bottom);

    let err = factory.qualified_type_parameter_bounds(util).unwrap_err();
    assert!(matches!(err, QualError::NotA { .. }));
}

#[test]
fn test_bound_chain_supplies_the_qualifier() {
    let mut b = ProgramBuilder::new();
    let util = b.class("Util", &[]);
    let m = b.method(util, "m");
    let s = b.method_type_param(m, "S");
    let s_bound = b.object_type();
    b.annotate(s_bound, Level::Mid);
    b.set_upper_bound(s, s_bound);
    let t = b.method_type_param(m, "T");
    let s_use = b.type_var(s);
    b.set_upper_bound(t, s_use);
    let t_use = b.type_var(t);
    let factory = level_factory(b.build());

    let ty = factory.qualified_type_from_type_syntax(t_use).unwrap();
    assert_eq!(primary(&ty), Level::Mid);
}

#[test]
fn test_unknown_ids_are_errors() {
    let b = ProgramBuilder::<Level>::new();
    let factory = level_factory(b.build());
    assert!(matches!(
        factory.qualified_type_of_element(ElementId(99)),
        Err(QualError::UnknownElement(ElementId(99)))
    ));
    assert!(matches!(
        factory.qualified_type_of_tree(TreeId(7)),
        Err(QualError::UnknownTree(TreeId(7)))
    ));
    assert!(matches!(
        factory.qualified_type_from_type_syntax(TypeSyntaxId(3)),
        Err(QualError::UnknownTypeSyntax(TypeSyntaxId(3)))
    ));
}

// =============================================================================
// Expressions
// =============================================================================

#[test]
fn test_literals_use_the_literal_default() {
    let mut b = ProgramBuilder::new();
    let int = b.primitive(PrimitiveKind::Int);
    let int_base = b.syntax_base(int);
    let lit = b.literal(int_base);
    let null = b.null_literal();
    let factory = level_factory(b.build());

    assert_eq!(primary(&factory.qualified_type_of_tree(lit).unwrap()), Level::Bottom);
    let null_ty = factory.qualified_type_of_tree(null).unwrap();
    assert_eq!(null_ty.shape(), qtf_model::Shape::Other);
    assert_eq!(primary(&null_ty), Level::Bottom);
}

#[test]
fn test_field_access_substitutes_receiver_arguments() {
    let mut b = ProgramBuilder::new();
    let string = b.class("String", &[]);
    let boxed = b.class("Box", &["T"]);
    let t = b.type_params(boxed)[0];
    let t_use = b.type_var(t);
    let value = b.field(boxed, "value", t_use);
    let caller_class = b.class("Caller", &[]);
    let caller = b.method(caller_class, "run");
    let s_mid = b.declared_with(string, &[], Level::Mid);
    let box_mid = b.declared(boxed, &[s_mid]);
    let local = b.local(caller, "b", box_mid);
    let recv = b.ident(local);
    let access = b.field_access(recv, value);
    let this = b.this(boxed);
    let self_access = b.field_access(this, value);
    let factory = level_factory(b.build());

    let ty = factory.qualified_type_of_tree(access).unwrap();
    assert_eq!(ty.shape(), qtf_model::Shape::Declared);
    assert_eq!(primary(&ty), Level::Mid);
    // Inside the class the field is still a use of `T`.
    let ty = factory.qualified_type_of_tree(self_access).unwrap();
    assert_eq!(ty.shape(), qtf_model::Shape::TypeVariable);
}

#[test]
fn test_casts_keep_operand_qualifier_unless_annotated() {
    let mut b = ProgramBuilder::new();
    let string = b.class("String", &[]);
    let c = b.class("C", &[]);
    let m = b.method(c, "m");
    let object_mid = b.object_type();
    b.annotate(object_mid, Level::Mid);
    let local = b.local(m, "o", object_mid);
    let plain = b.declared(string, &[]);
    let top = b.declared_with(string, &[], Level::Top);
    let e1 = b.ident(local);
    let cast_plain = b.cast(plain, e1);
    let e2 = b.ident(local);
    let cast_top = b.cast(top, e2);
    let factory = level_factory(b.build());

    assert_eq!(primary(&factory.qualified_type_of_tree(cast_plain).unwrap()), Level::Mid);
    assert_eq!(primary(&factory.qualified_type_of_tree(cast_top).unwrap()), Level::Top);
}

#[test]
fn test_conditional_and_binary_join_operands() {
    let mut b = ProgramBuilder::new();
    let string = b.class("String", &[]);
    let c = b.class("C", &[]);
    let m = b.method(c, "m");
    let s_mid = b.declared_with(string, &[], Level::Mid);
    let s_bottom = b.declared_with(string, &[], Level::Bottom);
    let int_mid = b.primitive(PrimitiveKind::Int);
    b.annotate(int_mid, Level::Mid);
    let boolean = b.primitive(PrimitiveKind::Boolean);
    let bool_base = b.syntax_base(boolean);
    let int_base = b.syntax_base(int_mid);

    let x = b.local(m, "x", s_mid);
    let y = b.local(m, "y", s_bottom);
    let n = b.local(m, "n", int_mid);

    let cond = b.literal(bool_base);
    let then = b.ident(x);
    let otherwise = b.ident(y);
    let same_shape = b.conditional(cond, then, otherwise);

    let cond = b.literal(bool_base);
    let then = b.ident(x);
    let null = b.null_literal();
    let with_null = b.conditional(cond, then, null);

    let lhs = b.ident(n);
    let rhs = b.literal(int_base);
    let sum = b.binary(lhs, rhs, int_base);
    let factory = level_factory(b.build());

    assert_eq!(primary(&factory.qualified_type_of_tree(same_shape).unwrap()), Level::Mid);
    let ty = factory.qualified_type_of_tree(with_null).unwrap();
    assert_eq!(ty.shape(), qtf_model::Shape::Declared);
    assert_eq!(primary(&ty), Level::Mid);
    assert_eq!(primary(&factory.qualified_type_of_tree(sum).unwrap()), Level::Mid);
}

#[test]
fn test_arrays_and_assignments() {
    let mut b = ProgramBuilder::new();
    let string = b.class("String", &[]);
    let c = b.class("C", &[]);
    let m = b.method(c, "m");
    let s_mid = b.declared_with(string, &[], Level::Mid);
    let arr = b.array_of(s_mid);
    let a = b.local(m, "a", arr);
    let int = b.primitive(PrimitiveKind::Int);
    let int_base = b.syntax_base(int);

    let array = b.ident(a);
    let index = b.literal(int_base);
    let element = b.array_access(array, index);

    let s_bottom = b.declared_with(string, &[], Level::Bottom);
    let new_arr_ty = b.array_of(s_bottom);
    let created = b.new_array(new_arr_ty, &[]);

    let lhs = b.ident(a);
    let assign = b.assign(lhs, created);

    let s_local = b.local(m, "s", s_mid);
    let not_array = b.ident(s_local);
    let index = b.literal(int_base);
    let bad = b.array_access(not_array, index);
    let factory = level_factory(b.build());

    assert_eq!(primary(&factory.qualified_type_of_tree(element).unwrap()), Level::Mid);
    let ty = factory.qualified_type_of_tree(created).unwrap();
    assert_eq!(ty.qualifiers(), vec![&Level::Top, &Level::Bottom]);
    let ty = factory.qualified_type_of_tree(assign).unwrap();
    assert_eq!(ty.qualifiers(), vec![&Level::Top, &Level::Mid]);
    assert!(matches!(
        factory.qualified_type_of_tree(bad),
        Err(QualError::NotA { expected: "array type", .. })
    ));
}

#[test]
fn test_object_creation_uses_the_written_type() {
    let mut b = ProgramBuilder::new();
    let string = b.class("String", &[]);
    let boxed = b.class("Box", &["T"]);
    let ctor = b.constructor(boxed);
    let s_mid = b.declared_with(string, &[], Level::Mid);
    let plain = b.declared(boxed, &[s_mid]);
    let s_mid2 = b.declared_with(string, &[], Level::Mid);
    let annotated = b.declared_with(boxed, &[s_mid2], Level::Bottom);
    let n1 = b.new_class(plain, ctor, &[]);
    let n2 = b.new_class(annotated, ctor, &[]);
    let factory = level_factory(b.build());

    let ty = factory.qualified_type_of_tree(n1).unwrap();
    assert_eq!(ty.qualifiers(), vec![&Level::Top, &Level::Mid]);
    let ty = factory.qualified_type_of_tree(n2).unwrap();
    assert_eq!(ty.qualifiers(), vec![&Level::Bottom, &Level::Mid]);

    let used = factory.constructor_from_use(n2).unwrap();
    assert_eq!(used.executable.return_type.qualifiers(), vec![&Level::Bottom, &Level::Mid]);
    assert!(used.type_arguments.is_empty());
}

// =============================================================================
// Generic calls
// =============================================================================

struct Calls {
    b: ProgramBuilder<Level>,
    string: ElementId,
    caller: ElementId,
    id: ElementId,
    pick: ElementId,
    make: ElementId,
}

/// `static <T> T id(T x)`, `static <T> T pick(T a, T b)` and
/// `static <T> T make()`.
fn calls() -> Calls {
    let mut b = ProgramBuilder::new();
    let string = b.class("String", &[]);
    let util = b.class("Util", &[]);

    let id = b.method(util, "id");
    b.set_static(id);
    let t = b.method_type_param(id, "T");
    let ret = b.type_var(t);
    b.returns(id, ret);
    let p = b.type_var(t);
    b.param(id, "x", p);

    let pick = b.method(util, "pick");
    b.set_static(pick);
    let t = b.method_type_param(pick, "T");
    let ret = b.type_var(t);
    b.returns(pick, ret);
    let p = b.type_var(t);
    b.param(pick, "a", p);
    let p = b.type_var(t);
    b.param(pick, "b", p);

    let make = b.method(util, "make");
    b.set_static(make);
    let t = b.method_type_param(make, "T");
    let ret = b.type_var(t);
    b.returns(make, ret);

    let caller = b.method(util, "caller");
    Calls {
        b,
        string,
        caller,
        id,
        pick,
        make,
    }
}

impl Calls {
    fn arg(&mut self, q: Level) -> TreeId {
        let ty = self.b.declared_with(self.string, &[], q);
        let local = self.b.local(self.caller, "v", ty);
        self.b.ident(local)
    }
}

#[test]
fn test_inference_picks_the_argument_qualifier() {
    let mut c = calls();
    let arg = c.arg(Level::Mid);
    let call = c.b.call(None, c.id, &[arg]);
    let factory = level_factory(c.b.build());

    let ty = factory.qualified_type_of_tree(call).unwrap();
    assert_eq!(ty.shape(), qtf_model::Shape::Declared);
    assert_eq!(primary(&ty), Level::Mid);

    let used = factory.method_from_use(call).unwrap();
    assert_eq!(used.type_arguments.len(), 1);
    assert_eq!(primary(&used.type_arguments[0]), Level::Mid);
    assert!(used.executable.type_variables.is_empty());
}

#[test]
fn test_inference_joins_several_arguments() {
    let mut c = calls();
    let a = c.arg(Level::Mid);
    let b = c.arg(Level::Top);
    let call = c.b.call(None, c.pick, &[a, b]);
    let factory = level_factory(c.b.build());
    assert_eq!(primary(&factory.qualified_type_of_tree(call).unwrap()), Level::Top);
}

#[test]
fn test_inference_without_a_join_is_a_finding() {
    let mut b = ProgramBuilder::new();
    let string = b.class("String", &[]);
    let util = b.class("Util", &[]);
    let pick = b.method(util, "pick");
    b.set_static(pick);
    let t = b.method_type_param(pick, "T");
    let ret = b.type_var(t);
    b.returns(pick, ret);
    let p = b.type_var(t);
    b.param(pick, "a", p);
    let p = b.type_var(t);
    b.param(pick, "b", p);
    let caller = b.method(util, "caller");
    let a_ty = b.declared_with(string, &[], Poset::A);
    let b_ty = b.declared_with(string, &[], Poset::B);
    let x = b.local(caller, "x", a_ty);
    let y = b.local(caller, "y", b_ty);
    let x = b.ident(x);
    let y = b.ident(y);
    let call = b.call(None, pick, &[x, y]);
    b.label(call, "pick(x, y)");
    let factory = poset_factory(b.build());

    let err = factory.qualified_type_of_tree(call).unwrap_err();
    assert!(!err.is_fatal());
    let QualError::Inference { location, source } = err else {
        panic!("expected an inference failure");
    };
    assert_eq!(location.node, "pick(x, y)");
    assert!(matches!(source, crate::errors::InferenceError::NoLeastUpperBound { .. }));
}

#[test]
fn test_nested_arguments_without_a_join_are_a_finding() {
    let mut b = ProgramBuilder::new();
    let string = b.class("String", &[]);
    let list = b.class("List", &["E"]);
    let util = b.class("Util", &[]);
    let pick = b.method(util, "pick");
    b.set_static(pick);
    let t = b.method_type_param(pick, "T");
    let ret = b.type_var(t);
    b.returns(pick, ret);
    let p = b.type_var(t);
    b.param(pick, "a", p);
    let p = b.type_var(t);
    b.param(pick, "b", p);
    let caller = b.method(util, "caller");
    let s_a = b.declared_with(string, &[], Poset::A);
    let list_a = b.declared_with(list, &[s_a], Poset::C);
    let s_b = b.declared_with(string, &[], Poset::B);
    let list_b = b.declared_with(list, &[s_b], Poset::C);
    let x = b.local(caller, "xs", list_a);
    let y = b.local(caller, "ys", list_b);
    let x = b.ident(x);
    let y = b.ident(y);
    let call = b.call(None, pick, &[x, y]);
    b.label(call, "pick(xs, ys)");
    let factory = poset_factory(b.build());

    // The roots agree on `C`; only the element qualifiers have no join.
    let err = factory.method_from_use(call).unwrap_err();
    assert!(!err.is_fatal());
    let QualError::Inference { location, source } = err else {
        panic!("expected an inference failure");
    };
    assert_eq!(location.node, "pick(xs, ys)");
    match source {
        crate::errors::InferenceError::NoLeastUpperBound { param, qualifiers } => {
            assert_eq!(param, "T");
            assert_eq!(qualifiers, vec!["A".to_string(), "B".to_string()]);
        }
        other => panic!("expected a missing join, got {other:?}"),
    }
}

#[test]
fn test_explicit_type_arguments_are_not_inferred() {
    let mut c = calls();
    let arg = c.arg(Level::Mid);
    let explicit = c.b.declared_with(c.string, &[], Level::Bottom);
    let call = c
        .b
        .call_with(None, c.id, &[arg], &[TypeArgument::Explicit(explicit)]);
    let factory = level_factory(c.b.build());
    assert_eq!(primary(&factory.qualified_type_of_tree(call).unwrap()), Level::Bottom);
}

#[test]
fn test_unconstrained_type_argument_follows_policy_then_hook() {
    struct PreferMid;
    impl CheckerHooks<Level> for PreferMid {
        fn uninferred_type_argument(
            &self,
            _factory: &DefaultQualifiedTypeFactory<Level>,
            _tree: TreeId,
            _type_param: ElementId,
        ) -> Option<Level> {
            Some(Level::Mid)
        }
    }

    let build = || {
        let mut c = calls();
        let call = c.b.call(None, c.make, &[]);
        (c.b.build(), call)
    };

    let (program, call) = build();
    let factory = level_factory(program);
    assert_eq!(primary(&factory.qualified_type_of_tree(call).unwrap()), Level::Top);

    let (program, call) = build();
    let factory = level_factory(program).with_options(EngineOptions {
        uninferred_qualifier: UninferredPolicy::Bottom,
        ..EngineOptions::default()
    });
    assert_eq!(primary(&factory.qualified_type_of_tree(call).unwrap()), Level::Bottom);

    let (program, call) = build();
    let factory = level_factory(program).with_hooks(PreferMid);
    assert_eq!(primary(&factory.qualified_type_of_tree(call).unwrap()), Level::Mid);
}

#[test]
fn test_inferred_qualifier_must_respect_the_bound() {
    let mut b = ProgramBuilder::new();
    let string = b.class("String", &[]);
    let util = b.class("Util", &[]);
    let id = b.method(util, "id");
    b.set_static(id);
    let t = b.method_type_param(id, "T");
    let bound = b.object_type();
    b.annotate(bound, Level::Mid);
    b.set_upper_bound(t, bound);
    let p = b.type_var(t);
    b.param(id, "x", p);
    let caller = b.method(util, "caller");
    let top = b.declared_with(string, &[], Level::Top);
    let local = b.local(caller, "s", top);
    let arg = b.ident(local);
    let call = b.call(None, id, &[arg]);
    let factory = level_factory(b.build());

    let err = factory.qualified_type_of_tree(call).unwrap_err();
    assert!(matches!(
        err,
        QualError::Inference {
            source: crate::errors::InferenceError::BoundViolation { .. },
            ..
        }
    ));
}

#[test]
fn test_call_arity_mismatch_is_fatal() {
    let mut c = calls();
    let call = c.b.call(None, c.id, &[]);
    let factory = level_factory(c.b.build());
    let err = factory.qualified_type_of_tree(call).unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, QualError::ShapeMismatch { .. }));
}

// =============================================================================
// Hooks and refinement
// =============================================================================

#[test]
fn test_receiver_polymorphic_member_hook() {
    /// Fields take the qualifier of the receiver they are read through.
    struct ReceiverPolymorphic;
    impl CheckerHooks<Level> for ReceiverPolymorphic {
        fn post_as_member_of(
            &self,
            _factory: &DefaultQualifiedTypeFactory<Level>,
            member_type: QualifiedType<Level>,
            receiver: &QualifiedType<Level>,
            _member: ElementId,
        ) -> QualifiedType<Level> {
            match receiver.qualifier() {
                Some(q) => member_type.with_qualifier(*q),
                None => member_type,
            }
        }
    }

    let mut b = ProgramBuilder::new();
    let string = b.class("String", &[]);
    let node = b.class("Node", &[]);
    let s = b.declared_with(string, &[], Level::Bottom);
    let name = b.field(node, "name", s);
    let c = b.class("C", &[]);
    let m = b.method(c, "m");
    let node_mid = b.declared_with(node, &[], Level::Mid);
    let local = b.local(m, "n", node_mid);
    let recv = b.ident(local);
    let access = b.field_access(recv, name);
    let factory = level_factory(b.build()).with_hooks(ReceiverPolymorphic);

    assert_eq!(primary(&factory.qualified_type_of_tree(access).unwrap()), Level::Mid);
}

#[test]
fn test_member_hook_must_keep_the_shape() {
    struct Breaks;
    impl CheckerHooks<Level> for Breaks {
        fn post_as_member_of(
            &self,
            factory: &DefaultQualifiedTypeFactory<Level>,
            _member_type: QualifiedType<Level>,
            _receiver: &QualifiedType<Level>,
            _member: ElementId,
        ) -> QualifiedType<Level> {
            QualifiedType::Other(QualifiedLeafType {
                base: factory.oracle().null(),
                qualifier: Level::Top,
            })
        }
    }

    let mut b = ProgramBuilder::new();
    let string = b.class("String", &[]);
    let node = b.class("Node", &[]);
    let s = b.declared(string, &[]);
    let name = b.field(node, "name", s);
    let this = b.this(node);
    let access = b.field_access(this, name);
    let factory = level_factory(b.build()).with_hooks(Breaks);

    let err = factory.qualified_type_of_tree(access).unwrap_err();
    assert!(matches!(err, QualError::HookShape { hook: "post_as_member_of", .. }));
}

#[test]
fn test_method_hook_may_change_qualifiers_only() {
    struct RaiseReturn;
    impl CheckerHooks<Level> for RaiseReturn {
        fn method_from_use(
            &self,
            _factory: &DefaultQualifiedTypeFactory<Level>,
            _tree: TreeId,
            mut result: ExecutableUse<Level>,
        ) -> ExecutableUse<Level> {
            let ret = result.executable.return_type.as_ref().clone();
            result.executable.return_type = Box::new(ret.with_qualifier(Level::Top));
            result
        }
    }
    struct DropTypeArguments;
    impl CheckerHooks<Level> for DropTypeArguments {
        fn method_from_use(
            &self,
            _factory: &DefaultQualifiedTypeFactory<Level>,
            _tree: TreeId,
            mut result: ExecutableUse<Level>,
        ) -> ExecutableUse<Level> {
            result.type_arguments.clear();
            result
        }
    }

    let build = || {
        let mut c = calls();
        let arg = c.arg(Level::Bottom);
        let call = c.b.call(None, c.id, &[arg]);
        (c.b.build(), call)
    };

    let (program, call) = build();
    let factory = level_factory(program).with_hooks(RaiseReturn);
    assert_eq!(primary(&factory.qualified_type_of_tree(call).unwrap()), Level::Top);

    let (program, call) = build();
    let factory = level_factory(program).with_hooks(DropTypeArguments);
    let err = factory.method_from_use(call).unwrap_err();
    assert!(matches!(err, QualError::HookShape { hook: "method_from_use", .. }));
}

#[test]
fn test_qualifiers_outside_the_lattice_are_rejected() {
    struct LowerToMid;
    impl TypeRefiner<Level> for LowerToMid {
        fn refine(
            &self,
            _factory: &DefaultQualifiedTypeFactory<Level>,
            _tree: TreeId,
            ty: QualifiedType<Level>,
        ) -> QualifiedType<Level> {
            ty.with_qualifier(Level::Mid)
        }
    }
    struct MidMembers;
    impl CheckerHooks<Level> for MidMembers {
        fn post_as_member_of(
            &self,
            _factory: &DefaultQualifiedTypeFactory<Level>,
            member_type: QualifiedType<Level>,
            _receiver: &QualifiedType<Level>,
            _member: ElementId,
        ) -> QualifiedType<Level> {
            member_type.with_qualifier(Level::Mid)
        }
    }

    struct Fixture {
        program: Program<Level>,
        plain: TypeSyntaxId,
        annotated: TypeSyntaxId,
        literal: TreeId,
        access: TreeId,
    }
    let fixture = || {
        let mut b = ProgramBuilder::new();
        let string = b.class("String", &[]);
        let plain = b.declared(string, &[]);
        let annotated = b.declared_with(string, &[], Level::Mid);
        let base = b.syntax_base(plain);
        let literal = b.literal(base);
        let node = b.class("Node", &[]);
        let s = b.declared_with(string, &[], Level::Bottom);
        let name = b.field(node, "name", s);
        let this = b.this(node);
        let access = b.field_access(this, name);
        Fixture {
            program: b.build(),
            plain,
            annotated,
            literal,
            access,
        }
    };
    // `Bottom < Top`, without `Mid`.
    let factory = |program: Program<Level>, fallback: Level| {
        let lattice = crate::lattice::LatticeBuilder::chain([Level::Bottom, Level::Top])
            .build()
            .unwrap();
        DefaultQualifiedTypeFactory::new(
            Arc::new(program),
            Arc::new(lattice),
            crate::defaults::DefaultTable::new(fallback),
        )
    };
    let unknown_mid = |err: QualError| {
        assert!(err.is_fatal());
        assert_eq!(err, QualError::Lattice(LatticeError::UnknownQualifier("Mid".into())));
    };

    let f = fixture();
    let defaults_mid = factory(f.program, Level::Mid);
    unknown_mid(defaults_mid.qualified_type_from_type_syntax(f.plain).unwrap_err());
    unknown_mid(defaults_mid.default_type(defaults_mid.oracle().object(), TypeUseLocation::Other).unwrap_err());

    let f = fixture();
    let annotations = factory(f.program, Level::Top);
    assert!(annotations.qualified_type_from_type_syntax(f.plain).is_ok());
    unknown_mid(annotations.qualified_type_from_type_syntax(f.annotated).unwrap_err());

    let f = fixture();
    let refined = factory(f.program, Level::Top).with_refiner(LowerToMid);
    unknown_mid(refined.qualified_type_of_tree(f.literal).unwrap_err());

    let f = fixture();
    let hooked = factory(f.program, Level::Top).with_hooks(MidMembers);
    unknown_mid(hooked.qualified_type_of_tree(f.access).unwrap_err());
}

#[test]
fn test_supertype_hook_must_keep_the_list() {
    struct DropAll;
    impl CheckerHooks<Level> for DropAll {
        fn post_direct_supertypes(
            &self,
            _factory: &DefaultQualifiedTypeFactory<Level>,
            _subtype: &QualifiedType<Level>,
            _supertypes: Vec<QualifiedType<Level>>,
        ) -> Vec<QualifiedType<Level>> {
            Vec::new()
        }
    }

    let mut b = ProgramBuilder::new();
    let string = b.class("String", &[]);
    let s = b.declared(string, &[]);
    let o = b.object_type();
    let factory = level_factory(b.build()).with_hooks(DropAll);
    let s = factory.qualified_type_from_type_syntax(s).unwrap();
    let o = factory.qualified_type_from_type_syntax(o).unwrap();

    let err = factory.direct_supertypes(&s).unwrap_err();
    assert!(matches!(err, QualError::SupertypeArity { .. }), "{err}");
    // Subtyping goes through the same hook and fails the same way.
    assert!(factory.is_subtype(&s, &o).is_err());
}

#[test]
fn test_type_variable_hook_must_keep_one_per_parameter() {
    struct NoVariables;
    impl CheckerHooks<Level> for NoVariables {
        fn type_variables_from_use(
            &self,
            _factory: &DefaultQualifiedTypeFactory<Level>,
            _ty: &QualifiedDeclaredType<Level>,
            _class: ElementId,
            _variables: Vec<QualifiedTypeVariable<Level>>,
        ) -> Vec<QualifiedTypeVariable<Level>> {
            Vec::new()
        }
    }

    let mut b = ProgramBuilder::new();
    let string = b.class("String", &[]);
    let list = b.class("List", &["E"]);
    let s = b.declared(string, &[]);
    let list_s = b.declared(list, &[s]);
    let factory = level_factory(b.build()).with_hooks(NoVariables);
    let ty = factory.qualified_type_from_type_syntax(list_s).unwrap();
    let QualifiedType::Declared(d) = &ty else {
        panic!("expected a declared type");
    };

    let err = factory.type_variables_from_use(d, list).unwrap_err();
    assert_eq!(
        err,
        QualError::TypeVariableArity {
            ty: "@Top List<@Top String>".into(),
            expected: 1,
            found: 0,
        }
    );
}

#[test]
fn test_refiner_adjusts_expression_types() {
    struct LiteralsAreMid;
    impl TypeRefiner<Level> for LiteralsAreMid {
        fn refine(
            &self,
            _factory: &DefaultQualifiedTypeFactory<Level>,
            _tree: TreeId,
            ty: QualifiedType<Level>,
        ) -> QualifiedType<Level> {
            ty.with_qualifier(Level::Mid)
        }
    }
    struct ToNull;
    impl TypeRefiner<Level> for ToNull {
        fn refine(
            &self,
            factory: &DefaultQualifiedTypeFactory<Level>,
            _tree: TreeId,
            _ty: QualifiedType<Level>,
        ) -> QualifiedType<Level> {
            QualifiedType::Other(QualifiedLeafType {
                base: factory.oracle().null(),
                qualifier: Level::Bottom,
            })
        }
    }

    let build = || {
        let mut b = ProgramBuilder::new();
        let int = b.primitive(PrimitiveKind::Int);
        let base = b.syntax_base(int);
        let lit = b.literal(base);
        (b.build(), lit)
    };

    let (program, lit) = build();
    let factory = level_factory(program).with_refiner(LiteralsAreMid);
    assert_eq!(primary(&factory.qualified_type_of_tree(lit).unwrap()), Level::Mid);

    let (program, lit) = build();
    let factory = level_factory(program).with_refiner(ToNull);
    let err = factory.qualified_type_of_tree(lit).unwrap_err();
    assert!(matches!(err, QualError::HookShape { hook: "refine", .. }));
}

// =============================================================================
// Options and sharing
// =============================================================================

#[test]
fn test_options_from_json() {
    let options = EngineOptions::from_json(r#"{ "parameter_contravariance": true }"#).unwrap();
    assert!(options.parameter_contravariance);
    assert!(options.array_covariance);
    assert_eq!(options.uninferred_qualifier, UninferredPolicy::Top);

    let options = EngineOptions::from_json(
        r#"{ "default_variance": "covariant", "supertype_qualifiers": "top", "uninferred_qualifier": "bottom" }"#,
    )
    .unwrap();
    assert_eq!(options.default_variance, crate::options::VariancePolicy::Covariant);
    assert_eq!(options.supertype_qualifiers, crate::options::SupertypePolicy::Top);
    let again = EngineOptions::from_json(&options.to_json().unwrap()).unwrap();
    assert_eq!(again, options);

    let err = EngineOptions::from_json(r#"{ "strictness": 3 }"#).unwrap_err();
    assert!(matches!(err, QualError::InvalidOptions(_)));
}

#[test]
fn test_factory_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DefaultQualifiedTypeFactory<Level>>();
}
