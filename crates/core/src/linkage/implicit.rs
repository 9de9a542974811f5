//! Implicitly declared special members.
//!
//! A class definition without user-declared constructors gets an implicit
//! default constructor and an implicit copy constructor. Declaring any
//! constructor later retires the implicit default one.

use super::session::{IndexSession, Observation, SessionMode};
use crate::error::Result;
use crate::gc::Reclaimer;
use crate::node::{BindingView, FunctionView, NodeType, flags, tag_of};
use crate::scope::ScopeIndex;
use std::sync::Arc;
use symdex_api::{DeclRole, Entity, EntityKind, RecordId, TypeRef, Visibility};
use tracing::debug;

/// React to `entity` having been adapted to `rec` inside `parent`.
pub(crate) fn observe(
    s: &mut IndexSession<'_>,
    rec: RecordId,
    tag: NodeType,
    parent: RecordId,
    entity: &Entity,
    obs: Observation,
) -> Result<()> {
    if s.synthesizing || s.mode == SessionMode::FindOnly || obs.role == DeclRole::Reference {
        return Ok(());
    }
    if tag == NodeType::Constructor {
        return retire_default_constructors(s, rec, parent, entity);
    }
    let synthesizes = matches!(
        tag,
        NodeType::Class | NodeType::ClassSpecialization | NodeType::ClassInstance
    );
    let enabled = s.config.synthesize_implicit_members
        && s.linkage.rules.supports_kind(EntityKind::Constructor);
    if synthesizes && obs.role == DeclRole::Definition && enabled {
        let class = entity.clone();
        s.deferred
            .push(move |s: &mut IndexSession<'_>| synthesize(s, rec, &class));
    }
    Ok(())
}

fn constructors(s: &IndexSession<'_>, class_rec: RecordId, name: &str) -> Result<Vec<RecordId>> {
    let rules = Arc::clone(&s.linkage.rules);
    let scope = ScopeIndex::new(s.db, rules.as_ref(), s.caches);
    let mut out = Vec::new();
    for rec in scope.lookup(class_rec, name.as_bytes(), false)? {
        if tag_of(s.db, rec)? == NodeType::Constructor {
            out.push(rec);
        }
    }
    Ok(out)
}

fn synthesize(s: &mut IndexSession<'_>, class_rec: RecordId, class: &Entity) -> Result<()> {
    let mut user_declared = false;
    for ctor in constructors(s, class_rec, &class.name)? {
        if !BindingView(ctor).has_flag(s.db, flags::IMPLICIT)? {
            user_declared = true;
        }
    }
    if user_declared {
        return Ok(());
    }
    let default_ctor = Entity::builder(EntityKind::Constructor, &class.name)
        .owner(class)
        .visibility(Visibility::Public)
        .build();
    let copy_ctor = Entity::builder(EntityKind::Constructor, &class.name)
        .owner(class)
        .visibility(Visibility::Public)
        .parameter("", TypeRef::const_ref(TypeRef::named(class)))
        .build();

    s.synthesizing = true;
    let result = adapt_all(s, &[default_ctor, copy_ctor]);
    s.synthesizing = false;
    result?;
    debug!("Synthesized implicit constructors of {} at {}", class.name, class_rec);
    Ok(())
}

fn adapt_all(s: &mut IndexSession<'_>, entities: &[Entity]) -> Result<()> {
    for entity in entities {
        s.adapt(entity, Observation::declaration())?;
    }
    Ok(())
}

/// A user constructor replaces the implicit default constructor.
fn retire_default_constructors(
    s: &mut IndexSession<'_>,
    declared: RecordId,
    class_rec: RecordId,
    entity: &Entity,
) -> Result<()> {
    let mut retired = Vec::new();
    for ctor in constructors(s, class_rec, &entity.name)? {
        if ctor == declared || !BindingView(ctor).has_flag(s.db, flags::IMPLICIT)? {
            continue;
        }
        if FunctionView(ctor).parameter_count(s.db)? == 0 {
            retired.push(ctor);
        }
    }
    if retired.is_empty() {
        return Ok(());
    }
    let rules = Arc::clone(&s.linkage.rules);
    let mut reclaimer = Reclaimer::new(s.db, rules.as_ref(), s.caches);
    for ctor in &retired {
        reclaimer.free_binding(*ctor)?;
        debug!("Retired implicit default constructor {} of {}", ctor, class_rec);
    }
    for rec in reclaimer.into_freed() {
        s.forget(rec);
    }
    Ok(())
}
