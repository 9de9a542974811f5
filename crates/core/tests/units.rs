mod common;

use common::{CPP, Fixture, int, namespace, open_cpp};
use std::sync::atomic::{AtomicBool, Ordering};
use symdex_api::{
    DeclRole, Entity, EntityKind, RecordId, ResolutionFailure, TemplateArgument, TypeRef,
};
use symdex_core::node::{
    BindingView, FunctionView, InstanceView, NodeType, TypedNode, flags, tag_of,
};
use symdex_core::storage::Database;
use symdex_core::unit::SourceUnit;
use symdex_core::{DeclarationInfo, IndexConfig, IndexType, IndexVisitor, Result, Visit};

fn no_implicit_members() -> IndexConfig {
    IndexConfig {
        synthesize_implicit_members: false,
        ..Default::default()
    }
}

#[test]
fn test_removing_a_unit_frees_what_only_it_declared() {
    let fx = Fixture::with_config(no_implicit_members());
    let lib = namespace("lib", None);
    let entities = vec![
        Entity::builder(EntityKind::Class, "A").owner(&lib).build(),
        Entity::builder(EntityKind::Function, "f")
            .owner(&lib)
            .parameter("x", int())
            .definition()
            .build(),
    ];
    let report = fx
        .index
        .index_unit(&CPP, &SourceUnit::with_content("a.h", b"..."), &entities)
        .unwrap();
    assert_eq!(report.added, 2);
    assert!(report.failures.is_empty());

    let a = fx.one("lib::A");
    let f = fx.one("lib::f");
    assert_eq!(
        fx.index.declarations(a).unwrap(),
        vec![DeclarationInfo {
            unit: "a.h".to_string(),
            role: DeclRole::Declaration,
        }]
    );
    assert_eq!(fx.index.declarations(f).unwrap()[0].role, DeclRole::Definition);
    let units = fx.index.units().unwrap();
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].declarations, 2);
    let free_before = fx.index.stats().unwrap().free_bytes;

    assert!(fx.index.remove_unit("a.h").unwrap());
    assert!(fx.qualified("lib::A").is_empty());
    // The namespace only existed to hold them.
    assert!(fx.qualified("lib").is_empty());
    assert!(fx.index.units().unwrap().is_empty());
    assert!(fx.index.stats().unwrap().free_bytes > free_before);
    assert!(!fx.index.remove_unit("a.h").unwrap());
}

#[test]
fn test_binding_survives_while_another_unit_declares_it() {
    let fx = Fixture::with_config(no_implicit_members());
    let a = Entity::builder(EntityKind::Class, "A").build();
    fx.index
        .index_unit(&CPP, &SourceUnit::new("a.h"), &[a.clone()])
        .unwrap();
    let g = Entity::builder(EntityKind::Function, "g").definition().build();
    fx.index
        .index_unit(
            &CPP,
            &SourceUnit::new("b.cpp"),
            &[a.with_role(DeclRole::Definition), g],
        )
        .unwrap();
    let rec = fx.one("A");
    assert_eq!(fx.index.declarations(rec).unwrap().len(), 2);

    fx.index.remove_unit("a.h").unwrap();
    assert_eq!(fx.one("A"), rec);
    assert_eq!(
        fx.index.declarations(rec).unwrap(),
        vec![DeclarationInfo {
            unit: "b.cpp".to_string(),
            role: DeclRole::Definition,
        }]
    );

    fx.index.remove_unit("b.cpp").unwrap();
    assert!(fx.qualified("A").is_empty());
    assert!(fx.qualified("g").is_empty());
}

#[test]
fn test_reindexing_a_unit_drops_what_it_no_longer_declares() {
    let fx = Fixture::with_config(no_implicit_members());
    let a = Entity::builder(EntityKind::Variable, "a").declared_type(int()).build();
    let b = Entity::builder(EntityKind::Variable, "b").declared_type(int()).build();
    let unit = SourceUnit::new("m.cpp");
    fx.index.index_unit(&CPP, &unit, &[a.clone(), b]).unwrap();
    let a_rec = fx.one("a");

    fx.index.index_unit(&CPP, &unit, &[a]).unwrap();
    assert_eq!(fx.one("a"), a_rec);
    assert!(fx.qualified("b").is_empty());
    assert_eq!(fx.index.declarations(a_rec).unwrap().len(), 1);
}

#[test]
fn test_removing_a_template_frees_its_instances() {
    let fx = Fixture::with_config(no_implicit_members());
    let boxed = Entity::builder(EntityKind::ClassTemplate, "Box")
        .template_type_parameter("T")
        .build();
    let of_int = Entity::builder(EntityKind::Class, "Box")
        .instance_of(&boxed, vec![TemplateArgument::Type(int())])
        .build();
    fx.index
        .index_unit(&CPP, &SourceUnit::new("box.h"), &[boxed, of_int])
        .unwrap();
    let template = fx.one("Box");
    assert_eq!(fx.index.instances(template).unwrap().len(), 1);

    fx.index.remove_unit("box.h").unwrap();
    assert!(fx.qualified("Box").is_empty());
}

fn declared_type(fx: &Fixture, rec: RecordId) -> Option<IndexType> {
    match fx.index.get_node(rec).unwrap() {
        TypedNode::Variable(view) => view.declared_type(fx.index.database()).unwrap(),
        other => panic!("unexpected node {:?}", other),
    }
}

#[test]
fn test_referenced_binding_outlives_its_declaring_unit() {
    let fx = Fixture::with_config(no_implicit_members());
    let foo = Entity::builder(EntityKind::Class, "Foo").build();
    fx.index
        .index_unit(&CPP, &SourceUnit::new("a.h"), &[foo.clone()])
        .unwrap();
    let foo_ptr = TypeRef::pointer(TypeRef::named(&foo));
    let p = Entity::builder(EntityKind::Variable, "p")
        .declared_type(foo_ptr.clone())
        .build();
    let take = Entity::builder(EntityKind::Function, "take")
        .parameter("x", foo_ptr)
        .build();
    fx.index
        .index_unit(&CPP, &SourceUnit::new("b.cpp"), &[p, take])
        .unwrap();
    let foo_rec = fx.one("Foo");
    let take_foo = fx.one("take");

    fx.index.remove_unit("a.h").unwrap();
    assert_eq!(fx.one("Foo"), foo_rec);
    assert_eq!(
        fx.index.declarations(foo_rec).unwrap(),
        vec![DeclarationInfo {
            unit: "b.cpp".to_string(),
            role: DeclRole::Reference,
        }]
    );

    // A new class of the same size must not take over the record.
    let bar = Entity::builder(EntityKind::Class, "Bar").build();
    let take_bar = Entity::builder(EntityKind::Function, "take")
        .parameter("x", TypeRef::pointer(TypeRef::named(&bar)))
        .build();
    fx.index
        .index_unit(&CPP, &SourceUnit::new("c.h"), &[bar, take_bar])
        .unwrap();
    let bar_rec = fx.one("Bar");
    assert_ne!(bar_rec, foo_rec);
    assert_eq!(
        declared_type(&fx, fx.one("p")),
        Some(IndexType::Pointer(Box::new(IndexType::Binding(foo_rec))))
    );
    assert_eq!(fx.qualified("take").len(), 2);
    assert!(fx.qualified("take").contains(&take_foo));

    fx.index.remove_unit("b.cpp").unwrap();
    assert!(fx.qualified("Foo").is_empty());
    assert!(fx.qualified("p").is_empty());
    assert_eq!(fx.qualified("take").len(), 1);
    assert_eq!(fx.one("Bar"), bar_rec);
}

#[test]
fn test_removing_a_partial_specialization_rematches_instances() {
    let fx = Fixture::with_config(no_implicit_members());
    let holder = Entity::builder(EntityKind::ClassTemplate, "Holder")
        .template_type_parameter("T")
        .build();
    let of_int_ptr = Entity::builder(EntityKind::Class, "Holder")
        .instance_of(&holder, vec![TemplateArgument::Type(TypeRef::pointer(int()))])
        .build();
    fx.index
        .index_unit(&CPP, &SourceUnit::new("h.h"), &[holder.clone(), of_int_ptr])
        .unwrap();
    let pointers = Entity::builder(EntityKind::PartialSpecialization, "Holder")
        .template_type_parameter("U")
        .partial_of(
            &holder,
            vec![TemplateArgument::Type(TypeRef::pointer(TypeRef::parameter("U", 0)))],
        )
        .build();
    fx.index
        .index_unit(&CPP, &SourceUnit::new("p.h"), &[pointers])
        .unwrap();

    let template = fx.one("Holder");
    let partial = fx.index.partial_specializations(template).unwrap()[0];
    let instance = fx.index.instances(template).unwrap()[0];
    let db = fx.index.database();
    assert_eq!(InstanceView(instance).pattern(db).unwrap(), Some(partial));

    fx.index.remove_unit("p.h").unwrap();
    assert!(fx.index.partial_specializations(template).unwrap().is_empty());
    assert_eq!(InstanceView(instance).pattern(db).unwrap(), None);
    assert!(fx.index.get_node(instance).is_ok());
    assert_eq!(fx.index.instances(template).unwrap(), vec![instance]);
}

#[test]
fn test_failed_addition_leaves_nothing_behind() {
    let fx = Fixture::with_config(no_implicit_members());
    let boxed = Entity::builder(EntityKind::ClassTemplate, "Box")
        .template_type_parameter("T")
        .build();
    fx.index
        .index_unit(&CPP, &SourceUnit::new("box.h"), &[boxed.clone()])
        .unwrap();
    let free_before = fx.index.stats().unwrap().free_bytes;

    let problem = || TypeRef::Problem("unknown type name".into());
    let handle = Entity::builder(EntityKind::Class, "Handle")
        .owner(&namespace("lib", None))
        .build();
    let box_of_int = Entity::builder(EntityKind::Class, "Box")
        .instance_of(&boxed, vec![TemplateArgument::Type(int())])
        .build();
    let tools_box = Entity::builder(EntityKind::ClassTemplate, "Box")
        .owner(&namespace("tools", None))
        .template_type_parameter("T")
        .build();
    let entities = vec![
        // Parent scope first, then the bad parameter.
        Entity::builder(EntityKind::Function, "f")
            .owner(&namespace("ghost", None))
            .parameter("x", problem())
            .build(),
        // A referenced class and a new instance, then the bad parameter.
        Entity::builder(EntityKind::Function, "g")
            .parameter("h", TypeRef::pointer(TypeRef::named(&handle)))
            .parameter("b", TypeRef::named(&box_of_int))
            .parameter("x", problem())
            .build(),
        // A template in a new scope, then a bad argument.
        Entity::builder(EntityKind::Class, "Box")
            .instance_of(&tools_box, vec![TemplateArgument::Type(problem())])
            .build(),
    ];
    let report = fx
        .index
        .index_unit(&CPP, &SourceUnit::new("bad.cpp"), &entities)
        .unwrap();
    assert_eq!(report.added, 0);
    assert_eq!(report.failures.len(), 3);

    for name in ["ghost", "lib", "tools", "g"] {
        assert!(fx.qualified(name).is_empty(), "{} was left behind", name);
    }
    assert!(fx.index.instances(fx.one("Box")).unwrap().is_empty());
    let bad = fx
        .index
        .units()
        .unwrap()
        .into_iter()
        .find(|unit| unit.path == "bad.cpp")
        .unwrap();
    assert_eq!(bad.declarations, 0);
    assert!(fx.index.stats().unwrap().free_bytes > free_before);
}

#[test]
fn test_oversize_types_fail_only_their_entity() {
    let fx = Fixture::with_config(no_implicit_members());
    let wide = namespace("wide", None);
    let entities = vec![
        Entity::builder(EntityKind::Variable, "big")
            .owner(&wide)
            .declared_type(TypeRef::Dependent("x".repeat(64 * 1024)))
            .build(),
        Entity::builder(EntityKind::Variable, "ok")
            .owner(&wide)
            .declared_type(int())
            .build(),
    ];
    let report = fx
        .index
        .index_unit(&CPP, &SourceUnit::new("wide.cpp"), &entities)
        .unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures[0].error,
        ResolutionFailure::PayloadTooLarge(_)
    ));
    fx.one("wide::ok");
    assert!(fx.qualified("wide::big").is_empty());
}

#[test]
fn test_lookups_alongside_a_writer_see_every_member() {
    let fx = Fixture::with_config(no_implicit_members());
    let pool = Entity::builder(EntityKind::Class, "Pool").definition().build();
    let field = |name: &str| {
        Entity::builder(EntityKind::Field, name)
            .owner(&pool)
            .declared_type(int())
            .build()
    };
    fx.add(&field("seed"));
    let scope = fx.one("Pool");
    let names: Vec<String> = (0..64).map(|i| format!("item{}", i)).collect();

    let done = AtomicBool::new(false);
    std::thread::scope(|threads| {
        for _ in 0..2 {
            threads.spawn(|| {
                while !done.load(Ordering::Acquire) {
                    let _ = fx.index.lookup(scope, "seed", false);
                }
            });
        }
        for name in &names {
            fx.add(&field(name));
        }
        done.store(true, Ordering::Release);
    });

    for name in &names {
        assert_eq!(
            fx.index.lookup(scope, name, false).unwrap().len(),
            1,
            "{} is missing from the rebuilt map",
            name
        );
    }
}

#[test]
fn test_implicit_constructors_are_synthesized() {
    let fx = Fixture::new();
    let ui = namespace("ui", None);
    let widget = Entity::builder(EntityKind::Class, "Widget")
        .owner(&ui)
        .definition()
        .build();
    fx.index
        .index_unit(&CPP, &SourceUnit::new("widget.h"), &[widget.clone()])
        .unwrap();
    let class = fx.one("ui::Widget");
    let db = fx.index.database();

    let ctors = fx.index.lookup(class, "Widget", false).unwrap();
    assert_eq!(ctors.len(), 2);
    let mut arities = Vec::new();
    for ctor in &ctors {
        assert_eq!(tag_of(db, *ctor).unwrap(), NodeType::Constructor);
        assert!(BindingView(*ctor).has_flag(db, flags::IMPLICIT).unwrap());
        arities.push(FunctionView(*ctor).parameter_count(db).unwrap());
    }
    arities.sort();
    assert_eq!(arities, vec![0, 1]);

    // A user constructor retires the implicit default one.
    let user = Entity::builder(EntityKind::Constructor, "Widget")
        .owner(&widget)
        .parameter("id", int())
        .build();
    let user_rec = fx.add(&user);
    let ctors = fx.index.lookup(class, "Widget", false).unwrap();
    assert_eq!(ctors.len(), 2);
    assert!(ctors.contains(&user_rec));
    assert!(!BindingView(user_rec).has_flag(db, flags::IMPLICIT).unwrap());
    for ctor in ctors.iter().filter(|c| **c != user_rec) {
        assert_eq!(FunctionView(*ctor).parameter_count(db).unwrap(), 1);
    }
}

#[test]
fn test_implicit_constructors_can_be_disabled() {
    let fx = Fixture::with_config(no_implicit_members());
    fx.add(&Entity::builder(EntityKind::Class, "Plain").definition().build());
    let class = fx.one("Plain");
    assert!(fx.index.lookup(class, "Plain", false).unwrap().is_empty());
}

#[test]
fn test_index_survives_reopening() {
    let fx = Fixture::with_config(no_implicit_members());
    let vec = Entity::builder(EntityKind::ClassTemplate, "Vec")
        .owner(&namespace("core", None))
        .template_type_parameter("T")
        .build();
    let of_int = Entity::builder(EntityKind::Class, "Vec")
        .instance_of(&vec, vec![TemplateArgument::Type(int())])
        .build();
    fx.index
        .index_unit(&CPP, &SourceUnit::new("vec.h"), &[vec.clone(), of_int.clone()])
        .unwrap();
    let template = fx.one("core::Vec");
    let instance = fx.index.instances(template).unwrap()[0];
    fx.index.flush().unwrap();
    let path = fx.path();
    let dir = fx.dir;
    drop(fx.index);

    let index = open_cpp(&path, no_implicit_members());
    assert_eq!(index.lookup_qualified(&CPP, "core::Vec").unwrap(), vec![template]);
    assert_eq!(index.add_binding(&CPP, &of_int).unwrap(), Some(instance));
    assert_eq!(index.template_parameters(template).unwrap().len(), 1);
    assert_eq!(index.units().unwrap()[0].path, "vec.h");
    assert_eq!(index.stats().unwrap().linkages, vec!["C++".to_string()]);
    drop(dir);
}

#[test]
fn test_foreign_files_are_rebuilt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.db");
    std::fs::write(&path, vec![0xAB; 64]).unwrap();
    assert!(Database::open(&path).is_err());

    let index =
        symdex_core::SymbolIndex::open_or_rebuild(&path, IndexConfig::default()).unwrap();
    assert!(index.stats().unwrap().linkages.is_empty());
}

struct Outline {
    lines: Vec<String>,
    skip: &'static str,
}

impl IndexVisitor for Outline {
    fn visit(&mut self, db: &Database, node: TypedNode, depth: usize) -> Result<Visit> {
        let Some(binding) = node.binding() else {
            return Ok(Visit::Continue);
        };
        let name = binding.name(db)?;
        self.lines.push(format!("{}{}", "  ".repeat(depth), name));
        if name == self.skip {
            return Ok(Visit::SkipChildren);
        }
        Ok(Visit::Continue)
    }
}

#[test]
fn test_visit_walks_scopes_and_can_prune() {
    let fx = Fixture::with_config(no_implicit_members());
    let outer = namespace("outer", None);
    let inner = namespace("inner", Some(&outer));
    fx.add(&Entity::builder(EntityKind::Class, "Kept").owner(&outer).build());
    fx.add(&Entity::builder(EntityKind::Class, "Pruned").owner(&inner).build());

    let root = fx.index.global_scope(&CPP).unwrap();
    let mut outline = Outline {
        lines: Vec::new(),
        skip: "inner",
    };
    fx.index.visit(root, &mut outline).unwrap();
    assert!(outline.lines.contains(&"  outer".to_string()));
    assert!(outline.lines.contains(&"    Kept".to_string()));
    assert!(outline.lines.contains(&"    inner".to_string()));
    assert!(!outline.lines.iter().any(|line| line.trim() == "Pruned"));
}

#[test]
fn test_global_scope_renders_as_separator() {
    let fx = Fixture::new();
    let root: RecordId = fx.index.global_scope(&CPP).unwrap();
    assert_eq!(fx.index.qualified_name(root).unwrap(), "::");
    assert_eq!(fx.index.name(root).unwrap(), "C++");
}
