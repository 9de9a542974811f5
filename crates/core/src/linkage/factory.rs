//! Allocation and population of binding records.
//!
//! Everything that can fail for semantic reasons (types, signatures) is
//! computed before a record is allocated, and a record is only linked into
//! its scope by the caller once population has succeeded.

use super::session::{IndexSession, Observation};
use crate::error::Result;
use crate::gc;
use crate::node::directory::{specialized_field, template_params_field};
use crate::node::layout::{
    base, binding, class, enumeration, enumerator, field, function, method, node, parameter,
    template_param, value_param, variable,
};
use crate::node::{BindingView, NodeType, flags, tag_of};
use crate::types::{IndexArgument, IndexType, codec, key};
use std::sync::Arc;
use symdex_api::{DeclRole, Entity, RecordId, ResolutionFailure, TemplateParameterKind};

/// A function parameter ready to be stored.
#[derive(Debug, Clone)]
pub(crate) struct PreparedParameter {
    pub name: String,
    pub ty: IndexType,
    pub has_default: bool,
}

/// The identity-bearing part of an entity: its parameters and signature.
#[derive(Debug, Clone, Default)]
pub(crate) struct Shape {
    pub parameters: Vec<PreparedParameter>,
    pub signature: u64,
}

/// Types stored with a binding but not part of its identity.
#[derive(Debug, Clone, Default)]
struct Payload {
    declared_type: Option<IndexType>,
    return_type: Option<IndexType>,
}

/// Compute parameters and signature; `None` when a parameter type is not
/// indexed (find-only mode).
pub(crate) fn prepare_shape(s: &mut IndexSession<'_>, entity: &Entity) -> Result<Option<Shape>> {
    if !entity.kind.is_function_like() {
        return Ok(Some(Shape::default()));
    }
    s.keying.push(entity.clone());
    let parameters = prepare_parameters(s, entity);
    s.keying.pop();
    let Some(parameters) = parameters? else {
        return Ok(None);
    };
    let rules = Arc::clone(&s.linkage.rules);
    let signature = if rules.is_overloadable(entity.kind) {
        let keys = parameters
            .iter()
            .map(|p| key::type_key(s.db, &p.ty))
            .collect::<Result<Vec<_>>>()?;
        rules.signature_memento(&keys, entity.function)
    } else {
        0
    };
    Ok(Some(Shape {
        parameters,
        signature,
    }))
}

fn prepare_parameters(
    s: &mut IndexSession<'_>,
    entity: &Entity,
) -> Result<Option<Vec<PreparedParameter>>> {
    let mut out = Vec::with_capacity(entity.parameters.len());
    for info in &entity.parameters {
        let Some(ty) = s.adapt_type(entity, &info.ty)? else {
            return Ok(None);
        };
        check_storable(&ty)?;
        out.push(PreparedParameter {
            name: info.name.clone(),
            ty,
            has_default: info.has_default,
        });
    }
    Ok(Some(out))
}

fn prepare_payload(s: &mut IndexSession<'_>, entity: &Entity) -> Result<Payload> {
    s.keying.push(entity.clone());
    let payload = prepare_payload_keyed(s, entity);
    s.keying.pop();
    payload
}

fn prepare_payload_keyed(s: &mut IndexSession<'_>, entity: &Entity) -> Result<Payload> {
    let mut payload = Payload::default();
    if let Some(ty) = &entity.declared_type {
        let ty = required(s.adapt_type(entity, ty)?, entity)?;
        check_storable(&ty)?;
        payload.declared_type = Some(ty);
    }
    if let Some(ty) = &entity.return_type {
        let ty = required(s.adapt_type(entity, ty)?, entity)?;
        check_storable(&ty)?;
        payload.return_type = Some(ty);
    }
    Ok(payload)
}

/// Reject a type whose blob would not fit, with its owners bound to the
/// widest record id.
fn check_storable(ty: &IndexType) -> Result<()> {
    codec::check_encoded(&ty.with_owner(RecordId::NULL, RecordId(u32::MAX)))
}

fn required<T>(value: Option<T>, entity: &Entity) -> Result<T> {
    value.ok_or_else(|| {
        ResolutionFailure::ProblemType {
            entity: entity.name.clone(),
            reason: "type is not indexed".to_string(),
        }
        .into()
    })
}

/// Allocate and populate a record for `entity`; the caller links it.
#[allow(clippy::too_many_arguments)]
pub(crate) fn create(
    s: &mut IndexSession<'_>,
    entity: &Entity,
    tag: NodeType,
    parent: RecordId,
    name: &str,
    generic: Option<RecordId>,
    shape: &Shape,
    obs: Observation,
) -> Result<RecordId> {
    let payload = prepare_payload(s, entity)?;
    let db = s.db;
    let rec = db.malloc(tag.record_size() as usize)?;
    let mut bits = obs.role.to_bits();
    if obs.friend {
        bits |= flags::FRIEND_ONLY;
    }
    if s.synthesizing {
        bits |= flags::IMPLICIT;
    }
    write_header(s, rec, tag, parent, name, bits)?;
    if let (Some(generic), Some(field)) = (generic, specialized_field(tag)) {
        db.put_rec(rec.at(field), generic)?;
    }
    populate(s, rec, tag, parent, entity, shape, &payload)?;
    Ok(rec)
}

fn write_header(
    s: &IndexSession<'_>,
    rec: RecordId,
    tag: NodeType,
    parent: RecordId,
    name: &str,
    bits: u16,
) -> Result<()> {
    let db = s.db;
    db.put_u16(rec.at(node::TYPE), tag as u16)?;
    db.put_rec(rec.at(node::PARENT), parent)?;
    let name = codec::write_string(db, rec, name.as_bytes())?;
    db.put_rec(rec.at(binding::NAME), name)?;
    db.put_rec(rec.at(binding::LINKAGE), s.linkage.record)?;
    db.put_u16(rec.at(binding::FLAGS), bits)
}

fn populate(
    s: &mut IndexSession<'_>,
    rec: RecordId,
    tag: NodeType,
    parent: RecordId,
    entity: &Entity,
    shape: &Shape,
    payload: &Payload,
) -> Result<()> {
    let db = s.db;
    if tag.is_class_like() {
        db.put_u16(rec.at(class::KEY), entity.class_key.to_bits())?;
        schedule_bases(s, rec, entity);
    }
    match tag {
        NodeType::Enumeration => {
            write_type_field(s, rec, rec.at(enumeration::UNDERLYING), &payload.declared_type)?;
            BindingView(rec).set_flag(db, flags::SCOPED_ENUM, entity.scoped_enum)?;
        }
        NodeType::Enumerator => {
            let value = match entity.enumerator_value {
                Some(value) => value,
                None => implicit_enumerator_value(s, parent)?,
            };
            db.put_i64(rec.at(enumerator::VALUE), value)?;
        }
        NodeType::Typedef | NodeType::Variable | NodeType::Field | NodeType::FieldSpecialization => {
            write_type_field(s, rec, rec.at(variable::TYPE), &payload.declared_type)?;
            if matches!(tag, NodeType::Field | NodeType::FieldSpecialization) {
                db.put_u16(rec.at(field::VISIBILITY), entity.visibility.to_bits())?;
            }
        }
        _ => {}
    }
    if tag.is_function_like() {
        write_function(s, rec, tag, entity, shape, payload)?;
    }
    // Partial specializations schedule their own configuration.
    if tag.is_template() && tag != NodeType::PartialSpecialization {
        schedule_template_parameters(s, rec, entity)?;
    }
    Ok(())
}

/// C/C++ rule: an enumerator without initializer follows its predecessor.
fn implicit_enumerator_value(s: &IndexSession<'_>, enumeration_rec: RecordId) -> Result<i64> {
    if tag_of(s.db, enumeration_rec)? != NodeType::Enumeration {
        return Ok(0);
    }
    // Members are prepended, so the head is the latest enumerator.
    let latest = s.db.get_rec(enumeration_rec.at(enumeration::MEMBERS))?;
    if latest.is_null() || tag_of(s.db, latest)? != NodeType::Enumerator {
        return Ok(0);
    }
    Ok(s.db.get_i64(latest.at(enumerator::VALUE))?.wrapping_add(1))
}

fn write_type_field(
    s: &IndexSession<'_>,
    rec: RecordId,
    addr: u32,
    ty: &Option<IndexType>,
) -> Result<()> {
    let old = s.db.get_rec(addr)?;
    codec::free_data(s.db, old)?;
    let blob = match ty {
        Some(ty) => codec::write_type(s.db, rec, &ty.with_owner(RecordId::NULL, rec))?,
        None => RecordId::NULL,
    };
    s.db.put_rec(addr, blob)
}

fn write_function(
    s: &mut IndexSession<'_>,
    rec: RecordId,
    tag: NodeType,
    entity: &Entity,
    shape: &Shape,
    payload: &Payload,
) -> Result<()> {
    let db = s.db;
    db.put_u64(rec.at(function::SIGNATURE), shape.signature)?;
    write_parameters(s, rec, &shape.parameters)?;
    write_type_field(s, rec, rec.at(function::RETURN_TYPE), &payload.return_type)?;
    db.put_u16(rec.at(function::TRAITS), entity.function.to_bits())?;
    if crate::node::directory::has_method_block(tag) {
        db.put_u16(rec.at(method::VISIBILITY), entity.visibility.to_bits())?;
    }
    Ok(())
}

fn write_parameters(
    s: &IndexSession<'_>,
    function_rec: RecordId,
    parameters: &[PreparedParameter],
) -> Result<()> {
    let db = s.db;
    gc::free_parameters(db, function_rec)?;
    let mut records = Vec::with_capacity(parameters.len());
    for (position, prepared) in parameters.iter().enumerate() {
        let rec = db.malloc(parameter::SIZE as usize)?;
        let bits = if prepared.has_default {
            DeclRole::Declaration.to_bits() | flags::HAS_DEFAULT
        } else {
            DeclRole::Declaration.to_bits()
        };
        write_header(s, rec, NodeType::Parameter, function_rec, &prepared.name, bits)?;
        let ty = prepared.ty.with_owner(RecordId::NULL, function_rec);
        db.put_rec(rec.at(parameter::TYPE), codec::write_type(db, rec, &ty)?)?;
        db.put_u16(rec.at(parameter::POSITION), position as u16)?;
        records.push(rec);
    }
    link_in_order(s, &records, parameter::NEXT_PARAM)?;
    db.put_rec(
        function_rec.at(function::FIRST_PARAM),
        records.first().copied().unwrap_or(RecordId::NULL),
    )?;
    db.put_u16(function_rec.at(function::PARAM_COUNT), records.len() as u16)
}

fn link_in_order(s: &IndexSession<'_>, records: &[RecordId], next_offset: u32) -> Result<()> {
    for pair in records.windows(2) {
        s.db.put_rec(pair[0].at(next_offset), pair[1])?;
    }
    Ok(())
}

fn schedule_bases(s: &mut IndexSession<'_>, rec: RecordId, entity: &Entity) {
    if entity.bases.is_empty() {
        return;
    }
    let entity = entity.clone();
    s.deferred
        .push(move |s: &mut IndexSession<'_>| configure_bases(s, rec, &entity));
}

/// Store base specifiers once the class exists, so bases may mention it.
fn configure_bases(s: &mut IndexSession<'_>, class_rec: RecordId, entity: &Entity) -> Result<()> {
    let db = s.db;
    if !db.get_rec(class_rec.at(class::FIRST_BASE))?.is_null() {
        return Ok(());
    }
    let mut records = Vec::with_capacity(entity.bases.len());
    for specifier in &entity.bases {
        let ty = required(s.adapt_type(entity, &specifier.ty)?, entity)?;
        let rec = db.malloc(base::SIZE as usize)?;
        db.put_u16(rec.at(node::TYPE), NodeType::Base as u16)?;
        db.put_rec(rec.at(node::PARENT), class_rec)?;
        db.put_rec(rec.at(base::TYPE), codec::write_type(db, rec, &ty)?)?;
        db.put_u16(rec.at(base::VISIBILITY), specifier.visibility.to_bits())?;
        db.put_u16(rec.at(base::IS_VIRTUAL), specifier.is_virtual as u16)?;
        records.push(rec);
    }
    link_in_order(s, &records, base::NEXT)?;
    if let Some(first) = records.first() {
        db.put_rec(class_rec.at(class::FIRST_BASE), *first)?;
    }
    Ok(())
}

/// Mark `rec` unconfigured and queue the creation of its parameter list.
pub(crate) fn schedule_template_parameters(
    s: &mut IndexSession<'_>,
    rec: RecordId,
    entity: &Entity,
) -> Result<()> {
    if entity.template_parameters.is_empty() {
        return Ok(());
    }
    BindingView(rec).set_flag(s.db, flags::NOT_CONFIGURED, true)?;
    let entity = entity.clone();
    s.deferred.push(move |s: &mut IndexSession<'_>| {
        configure_template_parameters(s, rec, &entity)
    });
    Ok(())
}

/// Create the template parameter records of `owner`. Runs at most once.
pub(crate) fn configure_template_parameters(
    s: &mut IndexSession<'_>,
    owner: RecordId,
    entity: &Entity,
) -> Result<()> {
    let db = s.db;
    let tag = tag_of(db, owner)?;
    let Some(field) = template_params_field(tag) else {
        return Ok(());
    };
    if db.get_rec(owner.at(field))?.is_null() {
        let mut records = Vec::with_capacity(entity.template_parameters.len());
        for (position, info) in entity.template_parameters.iter().enumerate() {
            let (param_tag, default, value_type) = match &info.kind {
                TemplateParameterKind::Type { default } => {
                    let default = match default {
                        Some(ty) => s.adapt_type(entity, ty)?.map(IndexArgument::Type),
                        None => None,
                    };
                    (NodeType::TemplateTypeParameter, default, None)
                }
                TemplateParameterKind::Value { ty, default } => (
                    NodeType::TemplateValueParameter,
                    default.map(IndexArgument::Value),
                    s.adapt_type(entity, ty)?,
                ),
            };
            let rec = db.malloc(param_tag.record_size() as usize)?;
            let mut bits = DeclRole::Declaration.to_bits();
            if info.is_pack {
                bits |= flags::PACK;
            }
            write_header(s, rec, param_tag, owner, &info.name, bits)?;
            db.put_u16(rec.at(template_param::POSITION), position as u16)?;
            if let Some(default) = default {
                db.put_rec(
                    rec.at(template_param::DEFAULT),
                    codec::write_argument(db, rec, &default)?,
                )?;
            }
            if let Some(ty) = value_type {
                db.put_rec(rec.at(value_param::TYPE), codec::write_type(db, rec, &ty)?)?;
            }
            records.push(rec);
        }
        link_in_order(s, &records, template_param::NEXT_PARAM)?;
        if let Some(first) = records.first() {
            db.put_rec(owner.at(field), *first)?;
        }
    }
    if tag != NodeType::PartialSpecialization {
        BindingView(owner).set_flag(db, flags::NOT_CONFIGURED, false)?;
    }
    Ok(())
}

/// Rewrite the kind-specific data of `rec` from a stronger observation.
pub(crate) fn refresh(
    s: &mut IndexSession<'_>,
    rec: RecordId,
    tag: NodeType,
    entity: &Entity,
    shape: &Shape,
) -> Result<()> {
    let payload = prepare_payload(s, entity)?;
    let db = s.db;
    if tag.is_class_like() {
        db.put_u16(rec.at(class::KEY), entity.class_key.to_bits())?;
        if !entity.bases.is_empty() {
            gc::free_bases(db, rec)?;
            schedule_bases(s, rec, entity);
        }
    }
    match tag {
        NodeType::Enumeration => {
            if payload.declared_type.is_some() {
                write_type_field(s, rec, rec.at(enumeration::UNDERLYING), &payload.declared_type)?;
            }
            BindingView(rec).set_flag(db, flags::SCOPED_ENUM, entity.scoped_enum)?;
        }
        NodeType::Enumerator => {
            if let Some(value) = entity.enumerator_value {
                db.put_i64(rec.at(enumerator::VALUE), value)?;
            }
        }
        NodeType::Typedef | NodeType::Variable | NodeType::Field | NodeType::FieldSpecialization => {
            if payload.declared_type.is_some() {
                write_type_field(s, rec, rec.at(variable::TYPE), &payload.declared_type)?;
            }
            if matches!(tag, NodeType::Field | NodeType::FieldSpecialization) {
                db.put_u16(rec.at(field::VISIBILITY), entity.visibility.to_bits())?;
            }
        }
        _ => {}
    }
    if tag.is_function_like() {
        write_function(s, rec, tag, entity, shape, &payload)?;
    }
    if tag.is_template() && tag != NodeType::PartialSpecialization && !entity.template_parameters.is_empty() {
        gc::free_template_parameters(db, rec)?;
        schedule_template_parameters(s, rec, entity)?;
    }
    Ok(())
}
