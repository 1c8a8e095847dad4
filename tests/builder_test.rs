//! Model type construction: validation, inheritance and override remapping.

use std::rc::Rc;

use parentage::domain::{
    Child, ConfigurationError, DomainError, Hierarchy, ModelType, ModelTypeBuilder, TypeRegistry,
    Value,
};
use parentage::util::naming::{fname_of, fqualname_of};
use parentage::util::testing::init_test_setup;

// ============================================================
// Configuration errors
// ============================================================

#[test]
fn given_undeclared_parent_when_build_then_unknown_parent() {
    init_test_setup();
    let entity = ModelType::entity();
    let err = ModelTypeBuilder::new("Model")
        .child("leaf", Child::new(&entity, "Leaf").with_parent("_nowhere"))
        .build()
        .unwrap_err();

    assert_eq!(
        err,
        ConfigurationError::UnknownParent {
            model: "Model".into(),
            field: "leaf".into(),
            parent: "_nowhere".into(),
        }
    );
}

#[test]
fn given_mutual_parents_when_build_then_cyclic() {
    init_test_setup();
    let entity = ModelType::entity();
    let err = ModelTypeBuilder::new("Model")
        .child("a", Child::new(&entity, "A").with_parent("b"))
        .child("b", Child::new(&entity, "B").with_parent("a"))
        .build()
        .unwrap_err();

    assert!(matches!(err, ConfigurationError::CyclicParent { .. }));
}

#[test]
fn given_repeated_attribute_when_build_then_duplicate() {
    init_test_setup();
    let entity = ModelType::entity();
    let err = ModelTypeBuilder::new("Model")
        .child("leaf", Child::new(&entity, "Leaf"))
        .data("leaf", "shadow")
        .build()
        .unwrap_err();

    assert_eq!(
        err,
        ConfigurationError::DuplicateAttribute {
            model: "Model".into(),
            attribute: "leaf".into(),
        }
    );
}

// ============================================================
// Inheritance
// ============================================================

#[test]
fn given_derived_model_when_instantiated_then_inherited_fields_wired() {
    init_test_setup();
    let entity = ModelType::entity();
    let base = ModelTypeBuilder::new("Base")
        .child("_hidden", Child::new(&entity, "Hidden"))
        .build()
        .unwrap();
    let derived = ModelTypeBuilder::new("Derived")
        .extends(&base)
        .child("leaf", Child::new(&entity, "Leaf").with_parent("_hidden"))
        .build()
        .unwrap();

    assert!(derived.is_subtype_of(&base));
    assert!(derived.is_subtype_of(&entity));
    assert!(!base.is_subtype_of(&derived));
    assert_eq!(derived.fields().len(), 2);

    let mut h = Hierarchy::new();
    let m = h.instantiate(&derived, "TestModel").unwrap();
    let hidden = h.field(m, "_hidden").unwrap();
    let leaf = h.field(m, "leaf").unwrap();

    assert_eq!(h.parent_chain(leaf), vec![hidden, m]);
}

#[test]
fn given_redeclared_field_when_built_then_derived_declaration_wins() {
    init_test_setup();
    let entity = ModelType::entity();
    let base = ModelTypeBuilder::new("Base")
        .child("leaf", Child::new(&entity, "BaseLeaf"))
        .build()
        .unwrap();
    let derived = ModelTypeBuilder::new("Derived")
        .extends(&base)
        .child("leaf", Child::new(&entity, "DerivedLeaf"))
        .build()
        .unwrap();

    assert_eq!(derived.fields().len(), 1);

    let mut h = Hierarchy::new();
    let m = h.instantiate(&derived, "TestModel").unwrap();
    let leaf = h.field(m, "leaf").unwrap();
    assert_eq!(h.name(leaf).unwrap(), "DerivedLeaf");
}

/// Base declares `leaf` under `_hidden`; the derived type moves `_hidden` under `_top`.
fn base_with_hidden_leaf() -> Rc<ModelType> {
    let entity = ModelType::entity();
    ModelTypeBuilder::new("Base")
        .child("_hidden", Child::new(&entity, "Hidden"))
        .child("leaf", Child::new(&entity, "Leaf").with_parent("_hidden"))
        .build()
        .unwrap()
}

#[test]
fn given_redeclared_override_parent_when_reading_inherited_field_then_chain_is_stable() {
    init_test_setup();
    let entity = ModelType::entity();
    let base = base_with_hidden_leaf();
    let derived = ModelTypeBuilder::new("Derived")
        .extends(&base)
        .child("_top", Child::new(&entity, "Top"))
        .child("_hidden", Child::new(&entity, "Hidden").with_parent("_top"))
        .build()
        .unwrap();

    assert_eq!(derived.accessor("leaf").unwrap().override_depth(), 2);

    let mut h = Hierarchy::new();
    let m = h.instantiate(&derived, "M").unwrap();
    let hidden = h.field(m, "_hidden").unwrap();
    assert_eq!(h.display(hidden).to_string(), "'Hidden' in 'Top' in 'M'");

    let leaf = h.field(m, "leaf").unwrap();
    let top = h.field(m, "_top").unwrap();
    assert_eq!(
        h.display(leaf).to_string(),
        "'Leaf' in 'Hidden' in 'Top' in 'M'"
    );
    assert_eq!(h.parent_chain(leaf), vec![hidden, top, m]);

    // Re-reading in any order keeps the same wiring
    h.field(m, "leaf").unwrap();
    h.field(m, "_hidden").unwrap();
    assert_eq!(h.display(hidden).to_string(), "'Hidden' in 'Top' in 'M'");
    assert_eq!(h.parent_chain(leaf), vec![hidden, top, m]);
    assert_eq!(
        h.get_attr(m, "leaf").unwrap(),
        Value::Node(leaf),
        "attribute access goes through the recomposed accessor"
    );
    assert_eq!(h.parent_chain(leaf), vec![hidden, top, m]);

    // The base type keeps its own wiring
    let plain = h.instantiate(&base, "Plain").unwrap();
    let plain_leaf = h.field(plain, "leaf").unwrap();
    assert_eq!(
        h.display(plain_leaf).to_string(),
        "'Leaf' in 'Hidden' in 'Plain'"
    );
}

#[test]
fn given_non_child_shadowing_inherited_parent_when_build_then_shadowed_parent() {
    init_test_setup();
    let base = base_with_hidden_leaf();

    let by_method = ModelTypeBuilder::new("Derived")
        .extends(&base)
        .method("_hidden", |_, _, _| Ok(Value::Unit))
        .build()
        .unwrap_err();
    let by_data = ModelTypeBuilder::new("Derived")
        .extends(&base)
        .data("_hidden", "not a child")
        .build()
        .unwrap_err();

    let expected = ConfigurationError::ShadowedParent {
        model: "Derived".into(),
        field: "leaf".into(),
        parent: "_hidden".into(),
    };
    assert_eq!(by_method, expected);
    assert_eq!(by_data, expected);
}

#[test]
fn given_own_child_naming_shadowed_base_field_when_build_then_shadowed_parent() {
    init_test_setup();
    let entity = ModelType::entity();
    let base = ModelTypeBuilder::new("Base")
        .child("_hidden", Child::new(&entity, "Hidden"))
        .build()
        .unwrap();

    let err = ModelTypeBuilder::new("Derived")
        .extends(&base)
        .data("_hidden", "not a child")
        .child("leaf", Child::new(&entity, "Leaf").with_parent("_hidden"))
        .build()
        .unwrap_err();

    assert!(matches!(err, ConfigurationError::ShadowedParent { .. }));
}

#[test]
fn given_unreferenced_base_field_shadowed_by_data_when_instantiated_then_data_wins() {
    init_test_setup();
    let entity = ModelType::entity();
    let base = ModelTypeBuilder::new("Base")
        .child("leaf", Child::new(&entity, "Leaf"))
        .build()
        .unwrap();
    let derived = ModelTypeBuilder::new("Derived")
        .extends(&base)
        .data("leaf", "plain data")
        .build()
        .unwrap();

    let mut h = Hierarchy::new();
    let m = h.instantiate(&derived, "M").unwrap();

    assert!(derived.fields().is_empty());
    assert_eq!(h.len(), 1);
    assert_eq!(h.get_attr(m, "leaf").unwrap(), Value::Text("plain data".into()));
    assert!(matches!(
        h.field(m, "leaf"),
        Err(DomainError::AttributeNotFound { .. })
    ));
}

#[test]
fn given_model_tree_when_subclasses_of_then_walks_recursively() {
    init_test_setup();
    let base = ModelTypeBuilder::new("Base").module("pages").build().unwrap();
    let middle = ModelTypeBuilder::new("Middle").extends(&base).build().unwrap();
    let bottom = ModelTypeBuilder::new("Bottom").extends(&middle).build().unwrap();

    let mut registry = TypeRegistry::new();
    registry.register(base.clone()).unwrap();
    registry.register(middle).unwrap();
    registry.register(bottom).unwrap();

    let mut names: Vec<String> = registry
        .subclasses_of(&base)
        .iter()
        .map(|t| t.name().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["Bottom", "Middle"]);
    assert_eq!(registry.subclasses_of(&ModelType::entity()).len(), 3);

    assert_eq!(fname_of(&base), "pages.Base");
    assert_eq!(fqualname_of(&base), "pages.Base");
}

#[test]
fn given_registered_name_when_register_again_then_duplicate_model() {
    let mut registry = TypeRegistry::new();
    let again = ModelTypeBuilder::new("Entity").build().unwrap();

    assert_eq!(
        registry.register(again).unwrap_err(),
        ConfigurationError::DuplicateModel {
            model: "Entity".into()
        }
    );
}
