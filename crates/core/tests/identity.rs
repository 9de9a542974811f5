mod common;

use common::{CPP, Fixture, double, int, namespace, sorted};
use symdex_api::{DeclRole, Entity, EntityKind, LinkageId, ResolutionFailure, TypeRef};
use symdex_core::IndexError;
use symdex_core::node::{BindingView, NodeType, TypedNode, flags};
use symdex_core::unit::SourceUnit;

#[test]
fn test_equal_entities_share_one_record() {
    let fx = Fixture::new();
    let widget = Entity::builder(EntityKind::Class, "Widget")
        .owner(&namespace("app", None))
        .build();
    let first = fx.add(&widget);

    // Built independently, equal in every semantic respect.
    let again = Entity::builder(EntityKind::Class, "Widget")
        .owner(&namespace("app", None))
        .build();
    assert_eq!(fx.add(&again), first);

    let app = fx.one("app");
    assert_eq!(fx.index.lookup(app, "Widget", false).unwrap(), vec![first]);
    assert_eq!(fx.one("app::Widget"), first);
    assert_eq!(fx.index.qualified_name(first).unwrap(), "app::Widget");
}

#[test]
fn test_overloads_are_distinct_records() {
    let fx = Fixture::new();
    let math = namespace("math", None);
    let by_int = Entity::builder(EntityKind::Function, "abs")
        .owner(&math)
        .parameter("x", int())
        .returns(int())
        .build();
    let by_double = Entity::builder(EntityKind::Function, "abs")
        .owner(&math)
        .parameter("x", double())
        .returns(double())
        .build();

    let a = fx.add(&by_int);
    let b = fx.add(&by_double);
    assert_ne!(a, b);
    assert_eq!(fx.add(&by_int), a);

    let scope = fx.one("math");
    assert_eq!(
        sorted(fx.index.lookup(scope, "abs", false).unwrap()),
        sorted(vec![a, b])
    );
    assert_eq!(fx.index.parameters(b).unwrap().len(), 1);
}

#[test]
fn test_parameter_names_do_not_change_identity() {
    let fx = Fixture::new();
    let decl = Entity::builder(EntityKind::Function, "scale")
        .parameter("factor", double())
        .build();
    let def = Entity::builder(EntityKind::Function, "scale")
        .parameter("f", double())
        .definition()
        .build();
    let rec = fx.add(&decl);
    assert_eq!(fx.add(&def), rec);
    let db = fx.index.database();
    let params = fx.index.parameters(rec).unwrap();
    assert_eq!(params[0].binding().name(db).unwrap(), "f");
}

#[test]
fn test_definition_updates_a_declaration_in_place() {
    let fx = Fixture::new();
    let decl = Entity::builder(EntityKind::Function, "run")
        .parameter("n", int())
        .build();
    let rec = fx.add(&decl);
    let db = fx.index.database();
    assert_eq!(BindingView(rec).role(db).unwrap(), DeclRole::Declaration);

    assert_eq!(fx.add(&decl.with_role(DeclRole::Definition)), rec);
    assert_eq!(BindingView(rec).role(db).unwrap(), DeclRole::Definition);

    // A later declaration says less than what is stored.
    assert_eq!(fx.add(&decl), rec);
    assert_eq!(BindingView(rec).role(db).unwrap(), DeclRole::Definition);
}

#[test]
fn test_reference_never_mutates_the_record() {
    let fx = Fixture::new();
    let counter = Entity::builder(EntityKind::Variable, "counter")
        .declared_type(int())
        .build();
    let rec = fx.add(&counter);
    let db = fx.index.database();
    let before = BindingView(rec).flags(db).unwrap();

    let reference = Entity::builder(EntityKind::Variable, "counter")
        .declared_type(double())
        .reference()
        .build();
    assert_eq!(fx.add(&reference), rec);
    assert_eq!(BindingView(rec).flags(db).unwrap(), before);
    match fx.index.get_node(rec).unwrap() {
        TypedNode::Variable(view) => assert_eq!(
            view.declared_type(db).unwrap(),
            Some(symdex_core::IndexType::Builtin(symdex_api::BuiltinType::Int))
        ),
        other => panic!("unexpected node {:?}", other),
    }
}

#[test]
fn test_member_declaration_replaces_friend_only() {
    let fx = Fixture::new();
    let friend = Entity::builder(EntityKind::Function, "swap").friend().build();
    let rec = fx.add(&friend);
    let db = fx.index.database();
    assert!(BindingView(rec).is_friend_only(db).unwrap());

    let plain = Entity::builder(EntityKind::Function, "swap").build();
    assert_eq!(fx.add(&plain), rec);
    assert!(!BindingView(rec).is_friend_only(db).unwrap());
}

#[test]
fn test_lookup_survives_cache_invalidation() {
    let fx = Fixture::new();
    let geo = namespace("geo", None);
    let names = ["Point", "Line", "Polygon"];
    let mut records = Vec::new();
    for name in names {
        records.push(fx.add(&Entity::builder(EntityKind::Class, name).owner(&geo).build()));
    }
    let scope = fx.one("geo");
    for (name, rec) in names.iter().zip(&records) {
        assert!(fx.index.lookup(scope, name, false).unwrap().contains(rec));
    }

    // Adding a member drops the scope's cached map.
    let circle = fx.add(&Entity::builder(EntityKind::Class, "Circle").owner(&geo).build());
    for (name, rec) in names.iter().zip(&records) {
        assert!(fx.index.lookup(scope, name, false).unwrap().contains(rec));
    }
    fx.index.clear_caches();
    assert_eq!(fx.index.lookup(scope, "Circle", false).unwrap(), vec![circle]);
    assert_eq!(fx.index.members(scope).unwrap().len(), 4);
}

#[test]
fn test_prefix_lookup() {
    let fx = Fixture::new();
    let geo = namespace("geo", None);
    let point = fx.add(&Entity::builder(EntityKind::Class, "Point").owner(&geo).build());
    let polygon = fx.add(&Entity::builder(EntityKind::Class, "Polygon").owner(&geo).build());
    fx.add(&Entity::builder(EntityKind::Class, "Line").owner(&geo).build());

    let scope = fx.one("geo");
    assert_eq!(
        sorted(fx.index.lookup(scope, "P", true).unwrap()),
        sorted(vec![point, polygon])
    );
    assert!(fx.index.lookup(scope, "Q", true).unwrap().is_empty());
    assert_eq!(
        sorted(fx.index.find_qualified(&CPP, "geo::Po", true).unwrap()),
        sorted(vec![point, polygon])
    );
    // Only the last segment is a prefix.
    assert!(fx.index.find_qualified(&CPP, "ge::Point", true).unwrap().is_empty());
}

#[test]
fn test_class_members_use_a_list() {
    let fx = Fixture::new();
    let shape = Entity::builder(EntityKind::Class, "Shape").build();
    let area = Entity::builder(EntityKind::Method, "area")
        .owner(&shape)
        .returns(double())
        .build();
    let sides = Entity::builder(EntityKind::Field, "sides")
        .owner(&shape)
        .declared_type(int())
        .build();
    let area_rec = fx.add(&area);
    let sides_rec = fx.add(&sides);

    let shape_rec = fx.one("Shape");
    assert_eq!(fx.index.lookup(shape_rec, "area", false).unwrap(), vec![area_rec]);
    assert_eq!(fx.one("Shape::sides"), sides_rec);
    assert_eq!(fx.index.qualified_name(area_rec).unwrap(), "Shape::area");
}

#[test]
fn test_unnamed_namespace_members_are_hoisted() {
    let fx = Fixture::new();
    let outer = namespace("outer", None);
    let anonymous = namespace("", Some(&outer));
    let hidden = Entity::builder(EntityKind::Variable, "hidden")
        .owner(&anonymous)
        .declared_type(int())
        .build();
    let rec = fx.add(&hidden);
    assert_eq!(fx.one("outer::hidden"), rec);
    assert_eq!(fx.index.qualified_name(rec).unwrap(), "outer::hidden");
}

#[test]
fn test_find_binding_never_creates() {
    let fx = Fixture::new();
    let ghost = Entity::builder(EntityKind::Class, "Ghost")
        .owner(&namespace("nowhere", None))
        .build();
    assert_eq!(fx.index.find_binding(&CPP, &ghost).unwrap(), None);
    assert!(fx.qualified("nowhere").is_empty());

    let rec = fx.add(&ghost);
    assert_eq!(fx.index.find_binding(&CPP, &ghost).unwrap(), Some(rec));
}

#[test]
fn test_function_local_entities_are_skipped() {
    let fx = Fixture::new();
    let main = Entity::builder(EntityKind::Function, "main").returns(int()).build();
    let local = Entity::builder(EntityKind::Class, "Local").owner(&main).build();
    assert_eq!(fx.index.add_binding(&CPP, &local).unwrap(), None);
}

#[test]
fn test_resolution_failure_leaves_the_rest_of_the_unit_indexed() {
    let fx = Fixture::new();
    let app = namespace("app", None);
    let mut entities = Vec::new();
    for name in ["a", "b", "c", "d"] {
        entities.push(
            Entity::builder(EntityKind::Variable, name)
                .owner(&app)
                .declared_type(int())
                .build(),
        );
    }
    entities.insert(
        2,
        Entity::builder(EntityKind::Variable, "broken")
            .owner(&app)
            .declared_type(TypeRef::Problem("unknown type name".into()))
            .build(),
    );

    let report = fx
        .index
        .index_unit(&CPP, &SourceUnit::new("app.cpp"), &entities)
        .unwrap();
    assert_eq!(report.added, 4);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].entity, "broken");
    assert!(matches!(
        report.failures[0].error,
        ResolutionFailure::ProblemType { .. }
    ));
    for name in ["app::a", "app::b", "app::c", "app::d"] {
        fx.one(name);
    }
    assert!(fx.qualified("app::broken").is_empty());
}

#[test]
fn test_problem_entities_are_rejected() {
    let fx = Fixture::new();
    let problem = Entity::builder(EntityKind::Class, "Oops")
        .problem("expected `;`")
        .build();
    let err = fx.index.add_binding(&CPP, &problem).unwrap_err();
    assert!(!err.is_fatal());
    assert!(fx.qualified("Oops").is_empty());
}

#[test]
fn test_unregistered_linkage_is_an_error() {
    let fx = Fixture::new();
    let entity = Entity::builder(EntityKind::Function, "puts").build();
    assert!(matches!(
        fx.index.add_binding(&LinkageId::C, &entity),
        Err(IndexError::UnknownLinkage(_))
    ));
}

#[test]
fn test_enumerators_follow_their_predecessor() {
    let fx = Fixture::new();
    let color = Entity::builder(EntityKind::Enumeration, "Color")
        .declared_type(int())
        .scoped()
        .build();
    let red = fx.add(&Entity::builder(EntityKind::Enumerator, "Red").owner(&color).value(3).build());
    let green = fx.add(&Entity::builder(EntityKind::Enumerator, "Green").owner(&color).build());

    let db = fx.index.database();
    let value = |rec| match fx.index.get_node(rec).unwrap() {
        TypedNode::Enumerator(view) => view.value(db).unwrap(),
        other => panic!("unexpected node {:?}", other),
    };
    assert_eq!(value(red), 3);
    assert_eq!(value(green), 4);
    let color_rec = fx.one("Color");
    assert!(BindingView(color_rec).has_flag(db, flags::SCOPED_ENUM).unwrap());
    assert_eq!(
        fx.index.get_node(color_rec).unwrap().binding().unwrap().tag(db).unwrap(),
        NodeType::Enumeration
    );
}
