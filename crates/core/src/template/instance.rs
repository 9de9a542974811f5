use super::deduce::select_partial;
use crate::error::Result;
use crate::linkage::factory;
use crate::linkage::{IndexSession, Observation, SessionMode, implicit, merge};
use crate::node::directory::{argmap_field, instances_field, next_instance_field, template_params_field};
use crate::node::layout::{class_instance, template_param};
use crate::node::{
    BindingView, InstanceView, NodeType, SpecializationView, TemplateParameterView, flags,
    parent_of, tag_of, walk_list,
};
use crate::storage::Database;
use crate::types::key::{arguments_key, is_dependent_argument};
use crate::types::{IndexArgument, IndexType, codec, from_argument_map, to_argument_map};
use std::collections::HashMap;
use symdex_api::{
    Entity, EntityKind, RecordId, ResolutionFailure, Specialization, SpecializationKind,
};
use tracing::debug;

/// Resolve an instance or explicit specialization entity.
pub(crate) fn adapt_instance(
    s: &mut IndexSession<'_>,
    entity: &Entity,
    spec: &Specialization,
    obs: Observation,
) -> Result<Option<RecordId>> {
    // The template's parameters must exist before defaults are read.
    let mark = s.deferred.len();
    let template = s.adapt(&spec.specialized, Observation::reference());
    s.drain_to(mark)?;
    let Some(template) = template? else {
        return missing_template(s, entity);
    };
    let compatible = match tag_of(s.db, template)? {
        NodeType::ClassTemplate => entity.kind.is_class_like(),
        NodeType::FunctionTemplate => entity.kind.is_function_like(),
        _ => false,
    };
    if !compatible {
        return Err(ResolutionFailure::NotATemplate(entity.name.clone()).into());
    }
    let Some(arguments) = s.adapt_arguments(entity, &spec.arguments)? else {
        return Ok(None);
    };
    let explicit = spec.kind == SpecializationKind::Explicit;
    instance_of(s, template, arguments, entity, obs, explicit)
}

fn missing_template(s: &IndexSession<'_>, entity: &Entity) -> Result<Option<RecordId>> {
    match s.mode {
        SessionMode::FindOnly => Ok(None),
        SessionMode::Create => Err(ResolutionFailure::NotATemplate(entity.name.clone()).into()),
    }
}

/// Find or create the instance of `template` for `arguments`.
///
/// Omitted trailing arguments are completed from the template's defaults
/// first, so `vector<int>` and `vector<int, allocator<int>>` meet.
pub(crate) fn instance_of(
    s: &mut IndexSession<'_>,
    template: RecordId,
    arguments: Vec<IndexArgument>,
    entity: &Entity,
    obs: Observation,
    explicit: bool,
) -> Result<Option<RecordId>> {
    let db = s.db;
    let template_tag = tag_of(db, template)?;
    let Some(arguments) = complete_arguments(s, template, arguments)? else {
        return Ok(None);
    };
    let key = arguments_key(db, &arguments)?;
    let entries = s
        .caches
        .instances
        .entries(template, || scan_instances(db, template))?;
    let cached = entries.get(&key).map(|entry| *entry.value());

    if let Some(rec) = cached {
        if s.mode == SessionMode::Create {
            let tag = tag_of(db, rec)?;
            if explicit {
                BindingView(rec).set_flag(db, flags::EXPLICIT_SPEC, true)?;
                if tag.is_class_like() {
                    db.put_rec(rec.at(class_instance::PATTERN), RecordId::NULL)?;
                }
            }
            let Some(shape) = factory::prepare_shape(s, entity)? else {
                return Ok(Some(rec));
            };
            merge::merge(s, rec, tag, entity, obs, &shape)?;
            implicit::observe(s, rec, tag, parent_of(db, rec)?, entity, obs)?;
        }
        return Ok(Some(rec));
    }
    if s.mode == SessionMode::FindOnly {
        return Ok(None);
    }

    let mut dependent = false;
    for argument in &arguments {
        dependent |= is_dependent_argument(db, argument)?;
    }
    let tag = match template_tag {
        NodeType::ClassTemplate if dependent => NodeType::DeferredClassInstance,
        NodeType::ClassTemplate => NodeType::ClassInstance,
        NodeType::FunctionTemplate => NodeType::FunctionInstance,
        _ => return Err(ResolutionFailure::NotATemplate(entity.name.clone()).into()),
    };
    let Some(shape) = factory::prepare_shape(s, entity)? else {
        return Ok(None);
    };
    let map = to_argument_map(arguments.clone());
    codec::check_encoded(&map)?;
    let parent = parent_of(db, template)?;
    let name = BindingView(template).name(db)?;
    let rec = factory::create(s, entity, tag, parent, &name, Some(template), &shape, obs)?;
    let view = BindingView(rec);
    view.set_flag(db, flags::DEFERRED, dependent)?;
    view.set_flag(db, flags::EXPLICIT_SPEC, explicit)?;
    if let Some(field) = argmap_field(tag) {
        db.put_rec(rec.at(field), codec::write_argument_map(db, rec, &map)?)?;
    }
    if tag == NodeType::ClassInstance && !explicit {
        if let Some(partial) = select_partial(db, template, &arguments)? {
            db.put_rec(rec.at(class_instance::PATTERN), partial)?;
        }
    }
    append_instance(db, template, template_tag, rec, tag)?;
    s.caches.instances.insert(template, key.clone(), rec);
    s.note_created(rec);
    debug!("Created {} {}{} at {}", tag, name, key, rec);
    implicit::observe(s, rec, tag, parent, entity, obs)?;
    Ok(Some(rec))
}

/// Instances are appended so that iteration follows creation order.
fn append_instance(
    db: &Database,
    template: RecordId,
    template_tag: NodeType,
    rec: RecordId,
    tag: NodeType,
) -> Result<()> {
    let (Some(head), Some(next)) = (instances_field(template_tag), next_instance_field(tag)) else {
        return Ok(());
    };
    let mut addr = template.at(head);
    loop {
        let current = db.get_rec(addr)?;
        if current.is_null() {
            return db.put_rec(addr, rec);
        }
        let offset = next_instance_field(tag_of(db, current)?).unwrap_or(next);
        addr = current.at(offset);
    }
}

/// Key -> instance map of `template`, read from its instance list.
pub(crate) fn scan_instances(db: &Database, template: RecordId) -> Result<HashMap<String, RecordId>> {
    let tag = tag_of(db, template)?;
    let Some(head) = instances_field(tag) else {
        return Ok(HashMap::new());
    };
    let mut out = HashMap::new();
    let next = match tag {
        NodeType::FunctionTemplate => next_instance_field(NodeType::FunctionInstance),
        _ => next_instance_field(NodeType::ClassInstance),
    };
    let Some(next) = next else {
        return Ok(out);
    };
    for rec in walk_list(db, db.get_rec(template.at(head))?, next)? {
        let arguments = from_argument_map(InstanceView(rec).argument_map(db)?);
        out.insert(arguments_key(db, &arguments)?, rec);
    }
    Ok(out)
}

fn template_parameters(db: &Database, template: RecordId) -> Result<Vec<TemplateParameterView>> {
    let Some(field) = template_params_field(tag_of(db, template)?) else {
        return Ok(Vec::new());
    };
    Ok(walk_list(db, db.get_rec(template.at(field))?, template_param::NEXT_PARAM)?
        .into_iter()
        .map(TemplateParameterView)
        .collect())
}

/// Append default arguments for omitted trailing parameters.
///
/// Stops at the first parameter without a usable default; packs never take
/// defaults.
fn complete_arguments(
    s: &mut IndexSession<'_>,
    template: RecordId,
    mut arguments: Vec<IndexArgument>,
) -> Result<Option<Vec<IndexArgument>>> {
    let parameters = template_parameters(s.db, template)?;
    for parameter in parameters.iter().skip(arguments.len()) {
        if parameter.is_pack(s.db)? {
            break;
        }
        let Some(default) = parameter.default_argument(s.db)? else {
            break;
        };
        match substitute_argument(s, &default, template, &arguments)? {
            Substituted::Done(argument) => arguments.push(argument),
            Substituted::Unbound => break,
            Substituted::NotIndexed => return Ok(None),
        }
    }
    Ok(Some(arguments))
}

enum Substituted<T> {
    Done(T),
    /// Refers to a parameter without an argument.
    Unbound,
    /// Needs an instance that does not exist (find-only mode).
    NotIndexed,
}

macro_rules! substituted {
    ($e:expr) => {
        match $e {
            Substituted::Done(value) => value,
            Substituted::Unbound => return Ok(Substituted::Unbound),
            Substituted::NotIndexed => return Ok(Substituted::NotIndexed),
        }
    };
}

fn substitute_argument(
    s: &mut IndexSession<'_>,
    argument: &IndexArgument,
    template: RecordId,
    arguments: &[IndexArgument],
) -> Result<Substituted<IndexArgument>> {
    Ok(match argument {
        IndexArgument::Type(ty) => {
            Substituted::Done(IndexArgument::Type(substituted!(substitute_type(
                s, ty, template, arguments
            )?)))
        }
        IndexArgument::ValueParameter { owner, position } if *owner == template => {
            match arguments.get(*position as usize) {
                Some(value) => Substituted::Done(value.clone()),
                None => Substituted::Unbound,
            }
        }
        other => Substituted::Done(other.clone()),
    })
}

fn substitute_type(
    s: &mut IndexSession<'_>,
    ty: &IndexType,
    template: RecordId,
    arguments: &[IndexArgument],
) -> Result<Substituted<IndexType>> {
    let inner = |s: &mut IndexSession<'_>, ty: &IndexType| -> Result<Substituted<Box<IndexType>>> {
        Ok(Substituted::Done(Box::new(substituted!(substitute_type(
            s, ty, template, arguments
        )?))))
    };
    Ok(Substituted::Done(match ty {
        IndexType::TemplateParameter { owner, position } if *owner == template => {
            match arguments.get(*position as usize) {
                Some(IndexArgument::Type(bound)) => bound.clone(),
                _ => return Ok(Substituted::Unbound),
            }
        }
        IndexType::Binding(rec) if tag_of(s.db, *rec)? == NodeType::DeferredClassInstance => {
            substituted!(reinstantiate(s, *rec, template, arguments)?)
        }
        IndexType::Pointer(p) => IndexType::Pointer(substituted!(inner(s, p)?)),
        IndexType::LValueReference(p) => IndexType::LValueReference(substituted!(inner(s, p)?)),
        IndexType::RValueReference(p) => IndexType::RValueReference(substituted!(inner(s, p)?)),
        IndexType::Qualified {
            is_const,
            is_volatile,
            inner: p,
        } => IndexType::Qualified {
            is_const: *is_const,
            is_volatile: *is_volatile,
            inner: substituted!(inner(s, p)?),
        },
        IndexType::Array { size, element } => IndexType::Array {
            size: *size,
            element: substituted!(inner(s, element)?),
        },
        IndexType::Function {
            return_type,
            parameters,
        } => {
            let return_type = substituted!(inner(s, return_type)?);
            let mut substituted_parameters = Vec::with_capacity(parameters.len());
            for parameter in parameters {
                substituted_parameters.push(*substituted!(inner(s, parameter)?));
            }
            IndexType::Function {
                return_type,
                parameters: substituted_parameters,
            }
        }
        other => other.clone(),
    }))
}

/// `allocator<T>` inside a default of `vector<T>`, re-keyed for concrete `T`.
fn reinstantiate(
    s: &mut IndexSession<'_>,
    deferred: RecordId,
    template: RecordId,
    arguments: &[IndexArgument],
) -> Result<Substituted<IndexType>> {
    let db = s.db;
    let generic = SpecializationView(deferred).specialized(db)?;
    let mut substituted = Vec::new();
    for argument in from_argument_map(InstanceView(deferred).argument_map(db)?) {
        substituted.push(substituted!(substitute_argument(
            s, &argument, template, arguments
        )?));
    }
    let name = BindingView(generic).name(db)?;
    let entity = Entity::builder(EntityKind::Class, &name).reference().build();
    Ok(
        match instance_of(s, generic, substituted, &entity, Observation::reference(), false)? {
            Some(rec) => {
                s.record_reference(rec)?;
                Substituted::Done(IndexType::Binding(rec))
            }
            None => Substituted::NotIndexed,
        },
    )
}
