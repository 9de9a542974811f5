use super::factory::{self, Shape};
use super::session::{IndexSession, Observation};
use crate::error::Result;
use crate::node::{BindingView, NodeType, flags};
use symdex_api::{DeclRole, Entity, RecordId};
use symdex_plugin::{MergeDecision, ObservedState};
use tracing::debug;

/// Fold a new observation of `entity` into the stored record `rec`.
pub(crate) fn merge(
    s: &mut IndexSession<'_>,
    rec: RecordId,
    tag: NodeType,
    entity: &Entity,
    obs: Observation,
    shape: &Shape,
) -> Result<()> {
    let db = s.db;
    let view = BindingView(rec);
    let bits = view.flags(db)?;
    if bits & flags::IMPLICIT != 0 && !s.synthesizing && obs.role != DeclRole::Reference {
        view.set_flag(db, flags::IMPLICIT, false)?;
    }

    let stored = ObservedState {
        role: DeclRole::from_bits(bits & flags::ROLE_MASK),
        friend_only: bits & flags::FRIEND_ONLY != 0,
    };
    let incoming = ObservedState {
        role: obs.role,
        friend_only: obs.friend,
    };
    if s.linkage.rules.merge_decision(stored, incoming) == MergeDecision::Keep {
        return Ok(());
    }

    let role = stored.role.max(incoming.role);
    let friend_only = stored.friend_only && incoming.friend_only;
    let mut updated = view.flags(db)? & !(flags::ROLE_MASK | flags::FRIEND_ONLY);
    updated |= role.to_bits();
    if friend_only {
        updated |= flags::FRIEND_ONLY;
    }
    view.set_flags(db, updated)?;
    if incoming.role >= stored.role {
        factory::refresh(s, rec, tag, entity, shape)?;
    }
    debug!(
        "Updated {} {} at {}: {:?} -> {:?}",
        tag, entity.name, rec, stored.role, role
    );
    Ok(())
}
