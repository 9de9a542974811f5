mod common;

use common::{Fixture, double, int, namespace};
use symdex_api::{Entity, EntityKind, TemplateArgument, TypeRef};
use symdex_core::node::{
    BindingView, InstanceView, NodeType, PartialView, SpecializationView, flags, tag_of,
};
use symdex_core::{IndexArgument, IndexType};

fn class_template(name: &str, params: &[&str]) -> Entity {
    let mut builder = Entity::builder(EntityKind::ClassTemplate, name);
    for param in params {
        builder = builder.template_type_parameter(param);
    }
    builder.build()
}

fn instance(template: &Entity, arguments: Vec<TypeRef>) -> Entity {
    Entity::builder(EntityKind::Class, &template.name)
        .instance_of(
            template,
            arguments.into_iter().map(TemplateArgument::Type).collect(),
        )
        .build()
}

#[test]
fn test_instances_are_cached_by_argument_list() {
    let fx = Fixture::new();
    let vec = class_template("Vec", &["T"]);
    let vec_rec = fx.add(&vec);

    let of_int = fx.add(&instance(&vec, vec![int()]));
    assert_eq!(fx.add(&instance(&vec, vec![int()])), of_int);
    let of_double = fx.add(&instance(&vec, vec![double()]));
    assert_ne!(of_int, of_double);

    assert_eq!(fx.index.instances(vec_rec).unwrap(), vec![of_int, of_double]);
    assert_eq!(
        fx.index.argument_map(of_int).unwrap(),
        Some(vec![(0, IndexArgument::Type(IndexType::Builtin(symdex_api::BuiltinType::Int)))])
    );
    let db = fx.index.database();
    assert_eq!(tag_of(db, of_int).unwrap(), NodeType::ClassInstance);
    assert_eq!(SpecializationView(of_int).specialized(db).unwrap(), vec_rec);
}

#[test]
fn test_instance_cache_is_rebuilt_from_storage() {
    let fx = Fixture::new();
    let vec = class_template("Vec", &["T"]);
    fx.add(&vec);
    let of_int = fx.add(&instance(&vec, vec![int()]));
    fx.index.clear_caches();
    assert_eq!(fx.add(&instance(&vec, vec![int()])), of_int);
}

#[test]
fn test_typedef_arguments_key_like_their_target() {
    let fx = Fixture::new();
    let vec = class_template("Vec", &["T"]);
    fx.add(&vec);
    let alias = Entity::builder(EntityKind::Typedef, "my_int")
        .declared_type(int())
        .build();
    fx.add(&alias);

    let of_int = fx.add(&instance(&vec, vec![int()]));
    assert_eq!(fx.add(&instance(&vec, vec![TypeRef::named(&alias)])), of_int);
}

#[test]
fn test_template_parameters_are_configured_before_add_returns() {
    let fx = Fixture::new();
    let array = Entity::builder(EntityKind::ClassTemplate, "Array")
        .template_type_parameter("T")
        .template_value_parameter("N", int())
        .template_type_parameter_with_default("Ptr", TypeRef::pointer(TypeRef::parameter("T", 0)))
        .build();
    let rec = fx.add(&array);
    let db = fx.index.database();
    assert!(!BindingView(rec).has_flag(db, flags::NOT_CONFIGURED).unwrap());

    let params = fx.index.template_parameters(rec).unwrap();
    assert_eq!(params.len(), 3);
    for (i, param) in params.iter().enumerate() {
        assert_eq!(param.position(db).unwrap(), i as u16);
        assert_eq!(param.binding().parent(db).unwrap(), rec);
    }
    assert_eq!(params[1].binding().tag(db).unwrap(), NodeType::TemplateValueParameter);
    assert_eq!(
        params[1].value_type(db).unwrap(),
        Some(IndexType::Builtin(symdex_api::BuiltinType::Int))
    );
    // The default refers back to the template's own first parameter.
    assert_eq!(
        params[2].default_argument(db).unwrap(),
        Some(IndexArgument::Type(IndexType::Pointer(Box::new(
            IndexType::TemplateParameter {
                owner: rec,
                position: 0,
            }
        ))))
    );
}

#[test]
fn test_default_arguments_complete_the_instance_key() {
    let fx = Fixture::new();
    let std_ns = namespace("std", None);
    let allocator = Entity::builder(EntityKind::ClassTemplate, "allocator")
        .owner(&std_ns)
        .template_type_parameter("T")
        .build();
    let allocator_of_t = Entity::builder(EntityKind::Class, "allocator")
        .owner(&std_ns)
        .instance_of(
            &allocator,
            vec![TemplateArgument::Type(TypeRef::parameter("T", 0))],
        )
        .reference()
        .build();
    let vector = Entity::builder(EntityKind::ClassTemplate, "vector")
        .owner(&std_ns)
        .template_type_parameter("T")
        .template_type_parameter_with_default("Alloc", TypeRef::named(&allocator_of_t))
        .build();
    fx.add(&allocator);
    let vector_rec = fx.add(&vector);

    let short = fx.add(&instance(&vector, vec![int()]));
    let allocator_of_int = instance(&allocator, vec![int()]);
    let spelled_out = fx.add(&instance(
        &vector,
        vec![int(), TypeRef::named(&allocator_of_int)],
    ));
    assert_eq!(short, spelled_out);
    assert_eq!(fx.index.instances(vector_rec).unwrap(), vec![short]);
    assert_eq!(fx.index.argument_map(short).unwrap().unwrap().len(), 2);

    // The dependent default stays a deferred instance of its own.
    let allocator_rec = fx.one("std::allocator");
    let db = fx.index.database();
    let tags: Vec<NodeType> = fx
        .index
        .instances(allocator_rec)
        .unwrap()
        .into_iter()
        .map(|rec| tag_of(db, rec).unwrap())
        .collect();
    assert_eq!(
        tags,
        vec![NodeType::DeferredClassInstance, NodeType::ClassInstance]
    );
}

#[test]
fn test_partial_specialization_is_selected_for_matching_instances() {
    let fx = Fixture::new();
    let holder = class_template("Holder", &["T"]);
    let holder_rec = fx.add(&holder);
    // Exists before the partial specialization does.
    let of_char_ptr = fx.add(&instance(&holder, vec![TypeRef::pointer(TypeRef::builtin(
        symdex_api::BuiltinType::Char,
    ))]));

    let pointers = Entity::builder(EntityKind::PartialSpecialization, "Holder")
        .template_type_parameter("U")
        .partial_of(
            &holder,
            vec![TemplateArgument::Type(TypeRef::pointer(TypeRef::parameter("U", 0)))],
        )
        .build();
    let partial = fx.add(&pointers);
    assert_eq!(fx.add(&pointers), partial);

    let db = fx.index.database();
    assert!(PartialView(partial).is_configured(db).unwrap());
    assert_eq!(PartialView(partial).primary(db).unwrap(), holder_rec);
    assert_eq!(fx.index.partial_specializations(holder_rec).unwrap(), vec![partial]);
    assert_eq!(fx.index.template_parameters(partial).unwrap().len(), 1);

    let of_int_ptr = fx.add(&instance(&holder, vec![TypeRef::pointer(int())]));
    let of_int = fx.add(&instance(&holder, vec![int()]));
    assert_eq!(InstanceView(of_int_ptr).pattern(db).unwrap(), Some(partial));
    assert_eq!(InstanceView(of_int).pattern(db).unwrap(), None);
    assert_eq!(InstanceView(of_char_ptr).pattern(db).unwrap(), Some(partial));
}

#[test]
fn test_explicit_specialization_takes_over_the_instance() {
    let fx = Fixture::new();
    let holder = class_template("Holder", &["T"]);
    fx.add(&holder);
    let implicit = fx.add(&instance(&holder, vec![int()]));

    let explicit = Entity::builder(EntityKind::Class, "Holder")
        .explicit_specialization_of(&holder, vec![TemplateArgument::Type(int())])
        .build();
    assert_eq!(fx.add(&explicit), implicit);
    let db = fx.index.database();
    assert!(InstanceView(implicit).is_explicit(db).unwrap());
    assert_eq!(InstanceView(implicit).pattern(db).unwrap(), None);
}

#[test]
fn test_dependent_instance_is_deferred() {
    let fx = Fixture::new();
    let holder = class_template("Holder", &["T"]);
    let holder_rec = fx.add(&holder);
    let take = Entity::builder(EntityKind::FunctionTemplate, "take")
        .template_type_parameter("T")
        .parameter(
            "h",
            TypeRef::named(
                &Entity::builder(EntityKind::Class, "Holder")
                    .instance_of(
                        &holder,
                        vec![TemplateArgument::Type(TypeRef::parameter("T", 0))],
                    )
                    .reference()
                    .build(),
            ),
        )
        .build();
    fx.add(&take);
    let concrete = fx.add(&instance(&holder, vec![int()]));

    let db = fx.index.database();
    let instances = fx.index.instances(holder_rec).unwrap();
    assert_eq!(instances.len(), 2);
    let deferred = instances[0];
    assert_ne!(deferred, concrete);
    assert_eq!(tag_of(db, deferred).unwrap(), NodeType::DeferredClassInstance);
    assert!(InstanceView(deferred).is_deferred(db).unwrap());
    assert!(!InstanceView(concrete).is_deferred(db).unwrap());
}

#[test]
fn test_function_template_instances() {
    let fx = Fixture::new();
    let max = Entity::builder(EntityKind::FunctionTemplate, "max")
        .template_type_parameter("T")
        .parameter("a", TypeRef::parameter("T", 0))
        .parameter("b", TypeRef::parameter("T", 0))
        .returns(TypeRef::parameter("T", 0))
        .build();
    let max_rec = fx.add(&max);
    let max_of_int = Entity::builder(EntityKind::Function, "max")
        .instance_of(&max, vec![TemplateArgument::Type(int())])
        .parameter("a", int())
        .parameter("b", int())
        .returns(int())
        .build();
    let rec = fx.add(&max_of_int);
    assert_eq!(fx.add(&max_of_int), rec);

    let db = fx.index.database();
    assert_eq!(tag_of(db, rec).unwrap(), NodeType::FunctionInstance);
    assert_eq!(fx.index.instances(max_rec).unwrap(), vec![rec]);
    assert_eq!(fx.index.parameters(rec).unwrap().len(), 2);
    assert_eq!(fx.index.template_parameters(max_rec).unwrap().len(), 1);
    // Instances hang off their template, not off the scope.
    assert_eq!(fx.qualified("max"), vec![max_rec]);
}

#[test]
fn test_member_specialization_uses_its_owner_arguments() {
    let fx = Fixture::new();
    let vec = class_template("Vec", &["T"]);
    let size = Entity::builder(EntityKind::Method, "size")
        .owner(&vec)
        .returns(int())
        .build();
    let size_rec = fx.add(&size);
    let vec_of_int = instance(&vec, vec![int()]);
    let owner = fx.add(&vec_of_int);

    let size_of_int = Entity::builder(EntityKind::Method, "size")
        .owner(&vec_of_int)
        .member_of_specialization(&size)
        .returns(int())
        .build();
    let rec = fx.add(&size_of_int);

    let db = fx.index.database();
    assert_eq!(tag_of(db, rec).unwrap(), NodeType::FunctionSpecialization);
    assert_eq!(SpecializationView(rec).specialized(db).unwrap(), size_rec);
    assert_eq!(fx.index.lookup(owner, "size", false).unwrap(), vec![rec]);
    assert_eq!(
        fx.index.argument_map(rec).unwrap(),
        fx.index.argument_map(owner).unwrap()
    );
    assert_eq!(fx.index.argument_map(size_rec).unwrap(), None);
}
