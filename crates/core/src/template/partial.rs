use super::deduce::select_partial;
use crate::error::Result;
use crate::linkage::factory::{self, Shape};
use crate::linkage::{IndexSession, Observation, SessionMode, merge};
use crate::node::layout::{class_instance, class_template, partial};
use crate::node::{BindingView, ClassTemplateView, InstanceView, NodeType, PartialView, flags, parent_of, tag_of};
use crate::storage::Database;
use crate::types::key::arguments_key;
use crate::types::{codec, from_argument_map};
use symdex_api::{Entity, RecordId, ResolutionFailure, Specialization};
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

/// Resolve a partial specialization of a class template.
///
/// Identity is the primary template plus the signature of the argument
/// pattern, with the partial's own parameters keyed by position only.
pub(crate) fn adapt_partial(
    s: &mut IndexSession<'_>,
    entity: &Entity,
    spec: &Specialization,
    obs: Observation,
) -> Result<Option<RecordId>> {
    let mark = s.deferred.len();
    let primary = s.adapt(&spec.specialized, Observation::reference());
    s.drain_to(mark)?;
    let primary = match primary? {
        Some(primary) => primary,
        None if s.mode == SessionMode::FindOnly => return Ok(None),
        None => return Err(ResolutionFailure::NotATemplate(entity.name.clone()).into()),
    };
    let db = s.db;
    if tag_of(db, primary)? != NodeType::ClassTemplate {
        return Err(ResolutionFailure::NotATemplate(entity.name.clone()).into());
    }

    s.keying.push(entity.clone());
    let pattern = s.adapt_arguments(entity, &spec.arguments);
    s.keying.pop();
    let Some(pattern) = pattern? else {
        return Ok(None);
    };
    let signature = xxh3_64(arguments_key(db, &pattern)?.as_bytes());

    let shape = Shape::default();
    for existing in ClassTemplateView(primary).partials(db)? {
        if existing.signature(db)? == signature {
            if s.mode == SessionMode::Create {
                merge::merge(s, existing.0, NodeType::PartialSpecialization, entity, obs, &shape)?;
            }
            return Ok(Some(existing.0));
        }
    }
    if s.mode == SessionMode::FindOnly {
        return Ok(None);
    }

    let parent = parent_of(db, primary)?;
    let name = BindingView(primary).name(db)?;
    let tag = NodeType::PartialSpecialization;
    let rec = factory::create(s, entity, tag, parent, &name, Some(primary), &shape, obs)?;
    db.put_u64(rec.at(partial::SIGNATURE), signature)?;
    link_partial(db, primary, rec, signature)?;
    BindingView(rec).set_flag(db, flags::NOT_CONFIGURED, true)?;
    s.note_created(rec);

    // LIFO: parameters first, then the pattern that refers to them.
    let pattern_entity = entity.clone();
    let pattern_spec = spec.clone();
    s.deferred.push(move |s: &mut IndexSession<'_>| {
        configure_partial_arguments(s, rec, &pattern_entity, &pattern_spec)
    });
    if !entity.template_parameters.is_empty() {
        let params_entity = entity.clone();
        s.deferred.push(move |s: &mut IndexSession<'_>| {
            factory::configure_template_parameters(s, rec, &params_entity)
        });
    }
    debug!("Created partial specialization of {} at {} ({:016x})", name, rec, signature);
    Ok(Some(rec))
}

/// Keep the primary's partial list sorted by signature.
fn link_partial(db: &Database, primary: RecordId, rec: RecordId, signature: u64) -> Result<()> {
    let mut addr = primary.at(class_template::FIRST_PARTIAL);
    loop {
        let current = db.get_rec(addr)?;
        if current.is_null() || PartialView(current).signature(db)? > signature {
            db.put_rec(rec.at(partial::NEXT_PARTIAL), current)?;
            return db.put_rec(addr, rec);
        }
        addr = current.at(partial::NEXT_PARTIAL);
    }
}

/// Store the pattern with the partial's own parameters bound to its record,
/// then re-match the primary's existing instances.
fn configure_partial_arguments(
    s: &mut IndexSession<'_>,
    rec: RecordId,
    entity: &Entity,
    spec: &Specialization,
) -> Result<()> {
    let db = s.db;
    if PartialView(rec).is_configured(db)? {
        return Ok(());
    }
    s.type_context.push(entity.clone());
    let pattern = s.adapt_arguments(entity, &spec.arguments);
    s.type_context.pop();
    let Some(pattern) = pattern? else {
        return Ok(());
    };
    db.put_rec(rec.at(partial::ARGS), codec::write_arguments(db, rec, &pattern)?)?;
    BindingView(rec).set_flag(db, flags::NOT_CONFIGURED, false)?;

    reselect_patterns(db, PartialView(rec).primary(db)?)
}

/// Point every implicit instance of `primary` at its best matching partial
/// specialization, or at none.
pub(crate) fn reselect_patterns(db: &Database, primary: RecordId) -> Result<()> {
    for instance in ClassTemplateView(primary).instances(db)? {
        if tag_of(db, instance)? != NodeType::ClassInstance || InstanceView(instance).is_explicit(db)? {
            continue;
        }
        let arguments = from_argument_map(InstanceView(instance).argument_map(db)?);
        let selected = select_partial(db, primary, &arguments)?.unwrap_or(RecordId::NULL);
        db.put_rec(instance.at(class_instance::PATTERN), selected)?;
    }
    Ok(())
}
