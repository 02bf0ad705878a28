use ros_x::Builder;
use ros_x::context::{XContext, XContextBuilder};
use ros_x::node::XNode;
use ros_x::parameter::{Parameter, ParameterType};

fn ctx() -> XContext {
    XContextBuilder::default()
        .build()
        .expect("failed to create context")
}

fn node(ctx: &XContext) -> XNode {
    ctx.create_node("param_node")
        .build()
        .expect("failed to create node")
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn batch_sets_apply_in_order_and_always_succeed() {
    let ctx = ctx();
    let node = node(&ctx);

    let results = node.set_parameters([
        Parameter::new("a.b", 1i64),
        Parameter::new("a.b", 2i64),
    ]);
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.successful));

    let got = node.get_parameters(&names(&["a.b"]));
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].as_integer(), Some(2));
}

#[test]
fn atomic_set_merges_batch_over_existing_store() {
    let ctx = ctx();
    let node = node(&ctx);

    node.set_parameters([Parameter::new("x", 1i64)]);
    let result = node.set_parameters_atomically([
        Parameter::new("x", 2i64),
        Parameter::new("y", 3i64),
    ]);
    assert!(result.successful);
    assert_eq!(node.parameters().len(), 2);
    assert_eq!(node.get_parameters(&names(&["x"]))[0].as_integer(), Some(2));
    assert_eq!(node.get_parameters(&names(&["y"]))[0].as_integer(), Some(3));
}

#[test]
fn atomic_set_preserves_untouched_entries() {
    let ctx = ctx();
    let node = node(&ctx);

    node.set_parameters([Parameter::new("x", 1i64), Parameter::new("z", 9i64)]);
    node.set_parameters_atomically([Parameter::new("x", 2i64)]);

    assert_eq!(node.parameters().len(), 2);
    assert_eq!(node.get_parameters(&names(&["x"]))[0].as_integer(), Some(2));
    assert_eq!(node.get_parameters(&names(&["z"]))[0].as_integer(), Some(9));
}

#[test]
fn get_parameters_returns_store_order_not_request_order() {
    let ctx = ctx();
    let node = node(&ctx);

    node.set_parameters([
        Parameter::new("zeta", true),
        Parameter::new("alpha", false),
    ]);
    let got = node.get_parameters(&names(&["zeta", "alpha", "missing"]));
    assert_eq!(got.len(), 2);
    assert_eq!(got[0].name(), "alpha");
    assert_eq!(got[1].name(), "zeta");
}

#[test]
fn describe_parameters_reports_types_in_store_order() {
    let ctx = ctx();
    let node = node(&ctx);

    node.set_parameters([
        Parameter::new("speed", 1.5f64),
        Parameter::new("frame", "base_link"),
    ]);
    let descriptors = node.describe_parameters(&names(&["speed", "frame"]));
    assert_eq!(descriptors.len(), 2);
    assert_eq!(descriptors[0].name, "frame");
    assert_eq!(descriptors[0].parameter_type, ParameterType::String);
    assert_eq!(descriptors[1].name, "speed");
    assert_eq!(descriptors[1].parameter_type, ParameterType::Double);
}

#[test]
fn type_query_covers_the_whole_store_with_placeholders() {
    let ctx = ctx();
    let node = node(&ctx);

    node.set_parameters([
        Parameter::new("x", 7i64),
        Parameter::new("y", "hello"),
    ]);
    let types = node.get_parameter_types(&names(&["x"]));
    // One slot per stored entry, requested or not.
    assert_eq!(types.len(), 2);
    assert_eq!(types[0], ParameterType::Integer);
    assert_eq!(types[1], ParameterType::NotSet);
}

#[test]
fn list_parameters_emits_one_result_per_matching_entry() {
    let ctx = ctx();
    let node = node(&ctx);

    node.set_parameters([
        Parameter::new("a.b", 1i64),
        Parameter::new("a.b.c", 2i64),
        Parameter::new("z.q", 3i64),
    ]);

    // Depth 1: only "a.b" sits directly under "a".
    let results = node.list_parameters(&names(&["a"]), 1);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].parameter_names, vec!["a.b".to_string()]);
    assert_eq!(results[0].parameter_prefixes, vec!["a".to_string()]);

    // Depth 2 also reaches "a.b.c"; results stay per-entry, not merged.
    let results = node.list_parameters(&names(&["a"]), 2);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].parameter_names, vec!["a.b".to_string()]);
    assert_eq!(results[0].parameter_prefixes, vec!["a".to_string()]);
    assert_eq!(results[1].parameter_names, vec!["a.b.c".to_string()]);
    assert_eq!(results[1].parameter_prefixes, vec!["a.b".to_string()]);
}

#[test]
fn list_parameters_ignores_names_without_the_separator() {
    let ctx = ctx();
    let node = node(&ctx);

    node.set_parameters([
        Parameter::new("a", 1i64),
        Parameter::new("ab.c", 2i64),
    ]);
    assert!(node.list_parameters(&names(&["a"]), 5).is_empty());
}

#[test]
fn parameters_survive_until_overwritten() {
    let ctx = ctx();
    let node = node(&ctx);

    node.set_parameters([Parameter::new("keep", 1i64)]);
    node.set_parameters([Parameter::new("other", 2i64)]);
    assert_eq!(
        node.get_parameters(&names(&["keep"]))[0].as_integer(),
        Some(1)
    );

    node.set_parameters([Parameter::new("keep", 5i64)]);
    assert_eq!(
        node.get_parameters(&names(&["keep"]))[0].as_integer(),
        Some(5)
    );
}
