use super::*;
use crate::base::Shape;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
enum Q {
    Top,
    Bottom,
}

#[test]
fn test_class_declares_type_parameters_and_element() {
    let mut b = ProgramBuilder::<Q>::new();
    let list = b.class("List", &["E"]);
    let params = b.type_params(list);
    assert_eq!(params.len(), 1);
    let program = b.build();

    let class = program.element(list).and_then(Element::as_class).unwrap();
    assert_eq!(class.name, "List");
    assert_eq!(program.class_element(class.class), Some(list));
    let tp = program
        .element(params[0])
        .and_then(Element::as_type_parameter)
        .unwrap();
    assert_eq!(tp.name, "E");
    assert_eq!(program.type_param_element(tp.param), Some(params[0]));
    // Implicit bound is an unannotated Object.
    let bound = program.type_syntax(tp.upper_bound).unwrap();
    assert_eq!(bound.base, program.oracle().object());
    assert_eq!(bound.annotation, None);
}

#[test]
fn test_written_types_mirror_base_types() {
    let mut b = ProgramBuilder::<Q>::new();
    let string = b.class("String", &[]);
    let list = b.class("List", &["E"]);
    let s = b.declared_with(string, &[], Q::Bottom);
    let list_s = b.declared(list, &[s]);
    let arr = b.array_of(list_s);
    let program = b.build();

    let arr_syntax = program.type_syntax(arr).unwrap();
    assert_eq!(program.oracle().shape(arr_syntax.base), Shape::Array);
    assert_eq!(arr_syntax.children.as_slice(), &[list_s]);
    assert_eq!(program.oracle().display(arr_syntax.base), "List<String>[]");
    assert_eq!(program.type_syntax(s).unwrap().annotation, Some(Q::Bottom));
    assert_eq!(program.type_syntax(list_s).unwrap().annotation, None);
}

#[test]
fn test_class_annotations_and_supertypes() {
    let mut b = ProgramBuilder::<Q>::new();
    let list = b.interface("List", &["E"]);
    let array_list = b.class("ArrayList", &["T"]);
    let t = b.type_params(array_list)[0];
    let t_use = b.type_var(t);
    let list_t = b.declared(list, &[t_use]);
    b.extends(array_list, list_t);
    b.annotate_class(array_list, Q::Top);
    b.member_default(array_list, Q::Bottom);
    let program = b.build();

    let class = program.element(array_list).and_then(Element::as_class).unwrap();
    assert_eq!(class.qualifier, Some(Q::Top));
    assert_eq!(class.member_default, Some(Q::Bottom));
    assert_eq!(class.supertypes, vec![list_t]);
    let decl = program.oracle().class(class.class).unwrap();
    assert_eq!(decl.supertypes.len(), 1);
}

#[test]
fn test_field_access_base_is_seen_through_receiver() {
    let mut b = ProgramBuilder::<Q>::new();
    let string = b.class("String", &[]);
    let boxed = b.class("Box", &["T"]);
    let t = b.type_params(boxed)[0];
    let t_use = b.type_var(t);
    let value = b.field(boxed, "value", t_use);
    let s = b.declared(string, &[]);
    let box_s = b.declared(boxed, &[s]);
    let main = b.class("Main", &[]);
    let local_box = b.field(main, "b", box_s);
    let receiver = b.ident(local_box);
    let access = b.field_access(receiver, value);
    let program = b.build();

    let tree = program.tree(access).unwrap();
    assert_eq!(program.oracle().display(tree.base), "String");
}

#[test]
fn test_generic_call_base_uses_type_arguments() {
    let mut b = ProgramBuilder::<Q>::new();
    let string = b.class("String", &[]);
    let util = b.class("Util", &[]);
    let id = b.method(util, "id");
    b.set_static(id);
    let t = b.method_type_param(id, "T");
    let t_use = b.type_var(t);
    b.param(id, "x", t_use);
    let ret = b.type_var(t);
    b.returns(id, ret);
    let s = b.declared(string, &[]);
    let arg = b.literal(b.syntax_base(s));
    let call = b.call_with(None, id, &[arg], &[TypeArgument::Explicit(s)]);
    let program = b.build();

    let method = program.element(id).and_then(Element::as_executable).unwrap();
    assert!(method.is_static);
    assert_eq!(method.type_params, vec![t]);
    assert_eq!(method.params.len(), 1);
    assert_eq!(program.oracle().display(program.tree(call).unwrap().base), "String");
}

#[test]
fn test_conditional_takes_wider_branch() {
    let mut b = ProgramBuilder::<Q>::new();
    let string = b.class("String", &[]);
    let s = b.declared(string, &[]);
    let main = b.class("Main", &[]);
    let f = b.field(main, "s", s);
    let cond = b.literal(b.store().primitive(PrimitiveKind::Boolean));
    let a = b.ident(f);
    let n = b.null_literal();
    let c = b.conditional(cond, a, n);
    let program = b.build();
    assert_eq!(program.oracle().display(program.tree(c).unwrap().base), "String");
}

#[test]
fn test_locations_prefer_labels() {
    let mut b = ProgramBuilder::<Q>::new();
    let main = b.class("Main", &[]);
    let m = b.method(main, "run");
    let lit = b.null_literal();
    b.label(lit, "Main.java:3");
    let other = b.null_literal();
    let object = b.object_type();
    b.label_type(object, "Main.java:5");
    let unlabelled = b.object_type();
    let program = b.build();

    assert_eq!(program.location(lit).to_string(), "Main.java:3");
    assert_eq!(program.location(other).to_string(), format!("tree#{}", other.0));
    assert_eq!(program.type_location(object).to_string(), "Main.java:5");
    assert_eq!(program.type_location(unlabelled).to_string(), format!("type#{}", unlabelled.0));
    assert_eq!(program.element_location(m).to_string(), "Main.run");
    assert_eq!(program.element_location(main).to_string(), "Main");
    assert_eq!(program.enclosing_class(m), Some(main));
}
