use super::*;
use crate::{
    error::ErrorClass,
    model::{CollectionKind, EntityModel},
    test_support::order_schema,
};

#[test]
fn enumeration_covers_every_reachable_path() {
    let schema = order_schema();
    let paths = enumerate_paths(&schema, "Order").expect("paths");

    let dotted: Vec<String> = paths.iter().map(ToString::to_string).collect();
    assert_eq!(dotted.len(), 5);
    for expected in [
        "shipping_address",
        "line_items",
        "coupons",
        "notes",
        "line_items.adjustments",
    ] {
        assert!(dotted.contains(&expected.to_string()), "missing {expected}");
    }
    // Deeper paths come strictly after every shorter one.
    assert_eq!(dotted[4], "line_items.adjustments");
}

#[test]
fn enumeration_is_non_decreasing_in_length() {
    let schema = order_schema();
    let paths = enumerate_paths(&schema, "Order").expect("paths");

    assert!(paths.windows(2).all(|w| w[0].len() <= w[1].len()));
}

#[test]
fn unknown_root_type_is_rejected() {
    let schema = order_schema();
    let err = enumerate_paths(&schema, "Ghost").expect_err("unknown type");
    assert_eq!(err.class, ErrorClass::Unsupported);
}

#[test]
fn mutual_ownership_cycle_is_rejected() {
    let schema = AggregateSchema::builder()
        .entity(EntityModel::new("A", "id").with_entity("b", "B", CollectionKind::One))
        .entity(EntityModel::new("B", "id").with_entity("a", "A", CollectionKind::One))
        .build()
        .expect("schema builds; cycles surface at enumeration");

    let err = enumerate_paths(&schema, "A").expect_err("cycle");
    assert_eq!(err.class, ErrorClass::Unsupported);
    assert!(err.message.contains("cyclic ownership"));
}

#[test]
fn self_ownership_cycle_is_rejected() {
    let schema = AggregateSchema::builder()
        .entity(EntityModel::new("A", "id").with_entity("child", "A", CollectionKind::One))
        .build()
        .expect("schema builds");

    let err = enumerate_paths(&schema, "A").expect_err("cycle");
    assert!(err.message.contains("cyclic ownership"));
}

#[test]
fn nesting_beyond_the_depth_limit_is_rejected() {
    let mut builder = AggregateSchema::builder();
    let levels = crate::MAX_PATH_DEPTH + 2;
    for i in 0..levels {
        let mut model = EntityModel::new(format!("T{i}"), "id");
        if i + 1 < levels {
            model = model.with_entity("next", format!("T{}", i + 1), CollectionKind::One);
        }
        builder = builder.entity(model);
    }
    let schema = builder.build().expect("schema builds");

    let err = enumerate_paths(&schema, "T0").expect_err("too deep");
    assert_eq!(err.class, ErrorClass::Unsupported);
    assert!(err.message.contains("depth"));
}

#[test]
fn parent_and_prefix_walk_upward() {
    let schema = order_schema();
    let paths = enumerate_paths(&schema, "Order").expect("paths");
    let deep = paths.iter().find(|p| p.len() == 2).expect("deep path");

    let parent = deep.parent().expect("has a parent");
    assert_eq!(parent.to_string(), "line_items");
    assert!(parent.parent().is_none());

    assert_eq!(deep.prefix(1).to_string(), "line_items");
    assert_eq!(deep.prefix(99).to_string(), deep.to_string());
}

#[test]
fn qualification_follows_the_leaf_collection() {
    let schema = order_schema();
    let paths = enumerate_paths(&schema, "Order").expect("paths");

    let by_name = |name: &str| {
        paths
            .iter()
            .find(|p| p.to_string() == name)
            .expect("path exists")
    };

    assert!(by_name("line_items").is_qualified());
    assert!(by_name("notes").is_qualified());
    assert!(!by_name("coupons").is_qualified());
    assert!(!by_name("shipping_address").is_qualified());
}
