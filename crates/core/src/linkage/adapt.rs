//! The add-or-adapt algorithm for plain (non-instance) bindings.

use super::factory;
use super::implicit;
use super::merge;
use super::session::{IndexSession, Observation, SessionMode, is_owned};
use crate::error::Result;
use crate::node::directory::{members_field, template_params_field};
use crate::node::layout::template_param;
use crate::node::{BindingView, FunctionView, NodeType, tag_of, walk_list};
use crate::scope::{MemberKey, ScopeIndex};
use crate::template;
use std::sync::Arc;
use symdex_api::{DeclRole, Entity, EntityKind, RecordId, ResolutionFailure, SpecializationKind};
use tracing::debug;

/// Longest name stored for a binding.
pub const MAX_NAME_LEN: usize = 4096;

const MAX_ADAPT_DEPTH: usize = 128;

impl IndexSession<'_> {
    /// Resolve `entity` to its record, creating it (and its scopes) in
    /// create mode.
    pub(crate) fn adapt(&mut self, entity: &Entity, obs: Observation) -> Result<Option<RecordId>> {
        if obs.role == DeclRole::Reference {
            if let Some(&rec) = self.resolved.get(entity) {
                return Ok(Some(rec));
            }
        }
        if self.keying.contains(entity) {
            return Err(ResolutionFailure::ProblemType {
                entity: entity.name.clone(),
                reason: "type refers to the entity it belongs to".to_string(),
            }
            .into());
        }
        if self.depth >= MAX_ADAPT_DEPTH {
            return Err(ResolutionFailure::UnresolvedScope(entity.name.clone()).into());
        }
        self.depth += 1;
        let result = self.adapt_uncached(entity, obs);
        self.depth -= 1;

        let Some(rec) = result? else {
            return Ok(None);
        };
        self.resolved.insert(entity.clone(), rec);
        if obs.role != DeclRole::Reference && !is_owned(tag_of(self.db, rec)?) {
            self.record_declaration(rec, obs.role)?;
        }
        Ok(Some(rec))
    }

    fn adapt_uncached(&mut self, entity: &Entity, obs: Observation) -> Result<Option<RecordId>> {
        let rules = Arc::clone(&self.linkage.rules);
        if let Some(problem) = &entity.problem {
            debug!("Problem entity {}: {}", entity.name, problem);
            return Err(ResolutionFailure::ProblemEntity(entity.name.clone()).into());
        }
        let kind = entity.kind;
        // Parameters sit inside functions but belong to their owner's lists.
        if kind.is_template_parameter() || kind == EntityKind::Parameter {
            return self.adapt_owned_parameter(entity);
        }
        if entity.is_function_local() {
            debug!("Skipping function-local {} {}", entity.kind, entity.name);
            return Ok(None);
        }
        let needs_templates = kind.is_template() || entity.specialization.is_some();
        if !rules.supports_kind(kind) || (needs_templates && !rules.supports_templates()) {
            return Err(ResolutionFailure::Unsupported {
                kind: kind.as_str(),
                name: entity.name.clone(),
                linkage: self.linkage.id.to_string(),
            }
            .into());
        }
        if entity.name.len() > MAX_NAME_LEN {
            let head: String = entity.name.chars().take(32).collect();
            return Err(ResolutionFailure::NameTooLong(head).into());
        }
        match &entity.specialization {
            Some(spec) if kind == EntityKind::PartialSpecialization => {
                template::adapt_partial(self, entity, spec, obs)
            }
            None if kind == EntityKind::PartialSpecialization => {
                Err(ResolutionFailure::NotATemplate(entity.name.clone()).into())
            }
            Some(spec) if spec.kind != SpecializationKind::Member => {
                template::adapt_instance(self, entity, spec, obs)
            }
            _ => self.adapt_plain(entity, obs),
        }
    }

    /// Scope that will hold `entity`: its adapted owner, skipping unnamed
    /// namespaces, or the linkage's global scope.
    pub(crate) fn adapt_parent(&mut self, entity: &Entity) -> Result<Option<RecordId>> {
        let mut owner = entity.owner();
        while let Some(candidate) = owner {
            let unnamed = candidate.kind == EntityKind::Namespace && candidate.name.is_empty();
            if unnamed && self.linkage.rules.skip_unnamed_namespaces() {
                owner = candidate.owner();
            } else {
                break;
            }
        }
        let Some(owner) = owner else {
            return Ok(Some(self.linkage.global_scope()));
        };
        match self.adapt(owner, Observation::reference())? {
            Some(scope) if members_field(tag_of(self.db, scope)?).is_some() => Ok(Some(scope)),
            None if self.mode == SessionMode::FindOnly => Ok(None),
            _ => Err(ResolutionFailure::UnresolvedScope(entity.name.clone()).into()),
        }
    }

    fn adapt_plain(&mut self, entity: &Entity, obs: Observation) -> Result<Option<RecordId>> {
        let Some(parent) = self.adapt_parent(entity)? else {
            return Ok(None);
        };
        let mut tag = NodeType::for_kind(entity.kind);
        let mut generic = None;
        if let Some(spec) = &entity.specialization {
            if let Some(specialized_tag) = NodeType::member_specialization_for(entity.kind) {
                match self.adapt(&spec.specialized, Observation::reference())? {
                    Some(rec) => {
                        tag = specialized_tag;
                        generic = Some(rec);
                    }
                    None if self.mode == SessionMode::FindOnly => return Ok(None),
                    None => {
                        return Err(ResolutionFailure::NotATemplate(entity.name.clone()).into());
                    }
                }
            }
        }
        let Some(shape) = factory::prepare_shape(self, entity)? else {
            return Ok(None);
        };
        let rules = Arc::clone(&self.linkage.rules);
        let scope = ScopeIndex::new(self.db, rules.as_ref(), self.caches);
        let key = MemberKey::new(entity.name.as_bytes(), tag, shape.signature);

        if let Some(existing) = scope.find(parent, &key)? {
            if self.mode == SessionMode::Create {
                merge::merge(self, existing, tag, entity, obs, &shape)?;
                implicit::observe(self, existing, tag, parent, entity, obs)?;
            }
            return Ok(Some(existing));
        }
        if self.mode == SessionMode::FindOnly {
            return Ok(None);
        }

        let rec = factory::create(self, entity, tag, parent, &entity.name, generic, &shape, obs)?;
        scope.add_member(parent, rec)?;
        self.note_created(rec);
        debug!("Created {} {} at {} in {}", tag, entity.name, rec, parent);
        implicit::observe(self, rec, tag, parent, entity, obs)?;
        Ok(Some(rec))
    }

    /// Template and function parameters live in their owner's lists.
    fn adapt_owned_parameter(&mut self, entity: &Entity) -> Result<Option<RecordId>> {
        let Some(owner_entity) = entity.owner() else {
            return Err(ResolutionFailure::UnresolvedScope(entity.name.clone()).into());
        };
        let Some(owner) = self.adapt(owner_entity, Observation::reference())? else {
            return Ok(None);
        };
        let owner_tag = tag_of(self.db, owner)?;
        let candidates: Vec<RecordId> = if entity.kind == EntityKind::Parameter {
            if !owner_tag.is_function_like() {
                return Ok(None);
            }
            FunctionView(owner)
                .parameters(self.db)?
                .into_iter()
                .map(|p| p.0)
                .collect()
        } else {
            match template_params_field(owner_tag) {
                Some(field) => {
                    walk_list(self.db, self.db.get_rec(owner.at(field))?, template_param::NEXT_PARAM)?
                }
                None => return Ok(None),
            }
        };
        for candidate in candidates {
            if BindingView(candidate).name(self.db)? == entity.name {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}
