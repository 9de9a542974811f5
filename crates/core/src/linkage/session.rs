use super::Linkage;
use crate::cache::IndexCaches;
use crate::config::IndexConfig;
use crate::deferred::DeferredQueue;
use crate::error::Result;
use crate::gc::Reclaimer;
use crate::node::layout::declaration;
use crate::node::{DeclarationView, NodeType, tag_of};
use crate::storage::Database;
use crate::unit;
use std::collections::HashMap;
use std::sync::Arc;
use symdex_api::{DeclRole, Entity, EntityKind, RecordId};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Missing bindings (and their scopes) are created.
    Create,
    /// Read-only: a missing scope means a missing binding.
    FindOnly,
}

/// What one parser observation says about an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub role: DeclRole,
    pub friend: bool,
}

impl Observation {
    pub fn of(entity: &Entity) -> Self {
        Self {
            role: entity.role,
            friend: entity.friend,
        }
    }

    /// Mentioned as an enclosing scope or inside a type.
    pub fn reference() -> Self {
        Self {
            role: DeclRole::Reference,
            friend: false,
        }
    }

    pub fn declaration() -> Self {
        Self {
            role: DeclRole::Declaration,
            friend: false,
        }
    }
}

/// Parameters live in their owner's lists and are never declared on their own.
pub(crate) fn is_owned(tag: NodeType) -> bool {
    tag.entity_kind()
        .is_some_and(|k| k.is_template_parameter() || k == EntityKind::Parameter)
}

/// Lengths of the per-addition logs when an addition started.
#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    deferred: usize,
    created: usize,
    cells: usize,
}

/// Explicit context of one run of additions against one linkage.
///
/// Holds what would otherwise be ambient state: the deferred configuration
/// queue, the entities already resolved in this run, and the entities whose
/// identity is being computed before their record exists.
pub struct IndexSession<'a> {
    pub(crate) db: &'a Database,
    pub(crate) linkage: &'a Linkage,
    pub(crate) caches: &'a IndexCaches,
    pub(crate) config: &'a IndexConfig,
    pub(crate) unit: Option<RecordId>,
    pub(crate) mode: SessionMode,
    pub(crate) deferred: DeferredQueue<IndexSession<'a>>,
    pub(crate) resolved: HashMap<Entity, RecordId>,
    /// Entities being keyed; their own template parameters get a null owner.
    pub(crate) keying: Vec<Entity>,
    /// Entities whose types are being adapted, innermost last.
    pub(crate) type_context: Vec<Entity>,
    pub(crate) depth: usize,
    pub(crate) synthesizing: bool,
    declared: HashMap<RecordId, RecordId>,
    /// Bindings linked by the running addition, oldest first.
    created: Vec<RecordId>,
    /// Declaration cells added by the running addition, as (binding, cell).
    cells: Vec<(RecordId, RecordId)>,
}

impl<'a> IndexSession<'a> {
    pub fn new(
        db: &'a Database,
        linkage: &'a Linkage,
        caches: &'a IndexCaches,
        config: &'a IndexConfig,
        mode: SessionMode,
    ) -> Self {
        Self {
            db,
            linkage,
            caches,
            config,
            unit: None,
            mode,
            deferred: DeferredQueue::new(),
            resolved: HashMap::new(),
            keying: Vec::new(),
            type_context: Vec::new(),
            depth: 0,
            synthesizing: false,
            declared: HashMap::new(),
            created: Vec::new(),
            cells: Vec::new(),
        }
    }

    /// Record declaration cells against `unit` for every binding adapted.
    pub fn with_unit(mut self, unit: RecordId) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Add or adapt `entity`, then run every configuration step it queued.
    ///
    /// `Ok(None)` means the entity is deliberately not indexed (for example
    /// a function-local class). On a resolution failure, the scopes, types
    /// and declaration cells this addition created are removed again.
    pub fn add_binding(&mut self, entity: &Entity) -> Result<Option<RecordId>> {
        let mark = self.checkpoint();
        let result = self.adapt(entity, Observation::of(entity));
        match &result {
            Err(err) if err.is_fatal() => {
                self.deferred.clear();
                return result;
            }
            Err(err) => {
                debug!("Rolling back {}: {}", entity.name, err);
                self.rollback(mark)?;
                return result;
            }
            Ok(_) => {}
        }
        self.drain()?;
        self.created.truncate(mark.created);
        self.cells.truncate(mark.cells);
        result
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            deferred: self.deferred.len(),
            created: self.created.len(),
            cells: self.cells.len(),
        }
    }

    /// Undo a failed addition: drop its queued steps and declaration cells,
    /// then free the bindings it created that nothing else holds.
    fn rollback(&mut self, mark: Checkpoint) -> Result<()> {
        self.deferred.truncate(mark.deferred);
        let cells: Vec<_> = self.cells.drain(mark.cells..).collect();
        for (binding, cell) in cells.into_iter().rev() {
            unit::unlink_declaration(self.db, cell)?;
            self.declared.remove(&binding);
        }
        let created: Vec<_> = self.created.drain(mark.created..).collect();
        if created.is_empty() {
            return Ok(());
        }
        let rules = Arc::clone(&self.linkage.rules);
        let mut reclaimer = Reclaimer::new(self.db, rules.as_ref(), self.caches);
        let freed = reclaimer.discard(&created)?;
        for rec in reclaimer.into_freed() {
            self.forget(rec);
        }
        debug!("Rolled back {} of {} created bindings", freed, created.len());
        Ok(())
    }

    /// Resolve `entity` to its record without creating anything.
    pub fn find_binding(&mut self, entity: &Entity) -> Result<Option<RecordId>> {
        match self.adapt(entity, Observation::reference()) {
            Err(err) if !err.is_fatal() => {
                debug!("Lookup of {} failed: {}", entity.name, err);
                Ok(None)
            }
            other => other,
        }
    }

    /// Run deferred actions until the queue is empty.
    pub fn drain(&mut self) -> Result<()> {
        self.drain_to(0)
    }

    /// Run deferred actions pushed after the queue had `mark` entries.
    pub(crate) fn drain_to(&mut self, mark: usize) -> Result<()> {
        while self.deferred.len() > mark {
            let Some(action) = self.deferred.pop() else {
                break;
            };
            if let Err(err) = action(self) {
                if err.is_fatal() {
                    self.deferred.clear();
                    return Err(err);
                }
                debug!("Deferred configuration skipped: {}", err);
            }
        }
        Ok(())
    }

    /// Note that the current unit observed `binding` with `role`.
    pub(crate) fn record_declaration(&mut self, binding: RecordId, role: DeclRole) -> Result<()> {
        let Some(unit) = self.unit else {
            return Ok(());
        };
        if self.mode == SessionMode::FindOnly {
            return Ok(());
        }
        if let Some(&cell) = self.declared.get(&binding) {
            if role > DeclarationView(cell).role(self.db)? {
                self.db.put_u16(cell.at(declaration::ROLE), role.to_bits())?;
            }
            return Ok(());
        }
        let cell = unit::add_declaration(self.db, binding, unit, role)?;
        self.declared.insert(binding, cell);
        self.cells.push((binding, cell));
        Ok(())
    }

    /// Note that a type stored by the current unit points at `binding`, so
    /// that it stays allocated while the unit is indexed.
    pub(crate) fn record_reference(&mut self, binding: RecordId) -> Result<()> {
        if binding.is_null() || self.unit.is_none() {
            return Ok(());
        }
        let tag = tag_of(self.db, binding)?;
        if !tag.is_binding() || is_owned(tag) {
            return Ok(());
        }
        self.record_declaration(binding, DeclRole::Reference)
    }

    /// Remember that the running addition linked `rec` into the index.
    pub(crate) fn note_created(&mut self, rec: RecordId) {
        self.created.push(rec);
    }

    /// Drop everything this session remembers about a freed record.
    pub(crate) fn forget(&mut self, rec: RecordId) {
        self.declared.remove(&rec);
        self.resolved.retain(|_, resolved| *resolved != rec);
        self.created.retain(|created| *created != rec);
        self.cells.retain(|(binding, _)| *binding != rec);
    }
}
