//! Freeing bindings that no source unit declares any more.

use crate::cache::IndexCaches;
use crate::error::Result;
use crate::node::directory::{
    argmap_field, instances_field, members_field, next_instance_field, specialized_field,
    template_params_field, type_field,
};
use crate::node::layout::{
    base, binding, class, class_template, function, parameter, partial, template_param, value_param,
};
use crate::node::{NodeType, parent_of, tag_of, walk_list};
use crate::scope::ScopeIndex;
use crate::storage::{BTree, Database};
use crate::template;
use crate::types::codec;
use crate::unit;
use crate::visit;
use std::collections::HashSet;
use symdex_api::RecordId;
use symdex_plugin::LinkageRules;
use tracing::debug;

/// Free the parameter records of a function and reset its list.
pub(crate) fn free_parameters(db: &Database, function_rec: RecordId) -> Result<()> {
    let first = db.get_rec(function_rec.at(function::FIRST_PARAM))?;
    for rec in walk_list(db, first, parameter::NEXT_PARAM)? {
        codec::free_data(db, db.get_rec(rec.at(parameter::TYPE))?)?;
        codec::free_data(db, db.get_rec(rec.at(binding::NAME))?)?;
        db.free(rec)?;
    }
    db.put_rec(function_rec.at(function::FIRST_PARAM), RecordId::NULL)?;
    db.put_u16(function_rec.at(function::PARAM_COUNT), 0)
}

pub(crate) fn free_bases(db: &Database, class_rec: RecordId) -> Result<()> {
    let first = db.get_rec(class_rec.at(class::FIRST_BASE))?;
    for rec in walk_list(db, first, base::NEXT)? {
        codec::free_data(db, db.get_rec(rec.at(base::TYPE))?)?;
        db.free(rec)?;
    }
    db.put_rec(class_rec.at(class::FIRST_BASE), RecordId::NULL)
}

pub(crate) fn free_template_parameters(db: &Database, owner: RecordId) -> Result<()> {
    let tag = tag_of(db, owner)?;
    let Some(field) = template_params_field(tag) else {
        return Ok(());
    };
    let first = db.get_rec(owner.at(field))?;
    for rec in walk_list(db, first, template_param::NEXT_PARAM)? {
        codec::free_data(db, db.get_rec(rec.at(template_param::DEFAULT))?)?;
        if tag_of(db, rec)? == NodeType::TemplateValueParameter {
            codec::free_data(db, db.get_rec(rec.at(value_param::TYPE))?)?;
        }
        codec::free_data(db, db.get_rec(rec.at(binding::NAME))?)?;
        db.free(rec)?;
    }
    db.put_rec(owner.at(field), RecordId::NULL)
}

fn has_declarations(db: &Database, rec: RecordId) -> Result<bool> {
    Ok(!db.get_rec(rec.at(binding::FIRST_DECL))?.is_null())
}

/// Frees bindings with everything they exclusively own.
pub struct Reclaimer<'a> {
    db: &'a Database,
    rules: &'a dyn LinkageRules,
    caches: &'a IndexCaches,
    freed: HashSet<RecordId>,
}

impl<'a> Reclaimer<'a> {
    pub fn new(db: &'a Database, rules: &'a dyn LinkageRules, caches: &'a IndexCaches) -> Self {
        Self {
            db,
            rules,
            caches,
            freed: HashSet::new(),
        }
    }

    fn scopes(&self) -> ScopeIndex<'a> {
        ScopeIndex::new(self.db, self.rules, self.caches)
    }

    /// Unlink `rec` from its container, then free it and its substructures.
    pub fn free_binding(&mut self, rec: RecordId) -> Result<()> {
        if self.freed.contains(&rec) {
            return Ok(());
        }
        self.unlink(rec)?;
        self.release(rec)
    }

    /// Free the bindings among `candidates` that no unit declares and that
    /// contain nothing declared, then any parent left empty by that.
    /// Returns the number of bindings freed.
    pub fn collect(&mut self, candidates: Vec<RecordId>) -> Result<usize> {
        let before = self.freed.len();
        let mut work = candidates;
        while let Some(rec) = work.pop() {
            if self.freed.contains(&rec) {
                continue;
            }
            let tag = tag_of(self.db, rec)?;
            if !tag.is_binding() || self.is_live(rec)? {
                continue;
            }
            let parent = self.container(rec, tag)?;
            self.free_binding(rec)?;
            if let Some(parent) = parent {
                work.push(parent);
            }
        }
        let freed = self.freed.len() - before;
        if freed > 0 {
            debug!("Reclaimed {} records", freed);
        }
        Ok(freed)
    }

    /// Free `created`, newest first, except what something still declares.
    ///
    /// Unlike [`collect`](Self::collect) this never climbs to containers
    /// outside `created`. Returns the number of bindings freed.
    pub fn discard(&mut self, created: &[RecordId]) -> Result<usize> {
        let before = self.freed.len();
        for &rec in created.iter().rev() {
            if self.freed.contains(&rec) || self.is_live(rec)? {
                continue;
            }
            self.free_binding(rec)?;
        }
        Ok(self.freed.len() - before)
    }

    pub fn freed(&self) -> &HashSet<RecordId> {
        &self.freed
    }

    pub fn into_freed(self) -> HashSet<RecordId> {
        self.freed
    }

    /// Declared by some unit, or holding something that is.
    fn is_live(&self, rec: RecordId) -> Result<bool> {
        if has_declarations(self.db, rec)? {
            return Ok(true);
        }
        for child in self.owned_bindings(rec)? {
            if self.is_live(child)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Bindings whose lifetime is bound to `rec`: members, partial
    /// specializations and instances.
    fn owned_bindings(&self, rec: RecordId) -> Result<Vec<RecordId>> {
        if tag_of(self.db, rec)? == NodeType::Linkage {
            return Ok(Vec::new());
        }
        visit::children(&self.scopes(), self.db, rec)
    }

    /// Record holding `rec`: its template for instances and partials, else
    /// its scope. Linkages are never candidates.
    fn container(&self, rec: RecordId, tag: NodeType) -> Result<Option<RecordId>> {
        let holder = if tag.is_instance() || tag == NodeType::PartialSpecialization {
            match specialized_field(tag) {
                Some(field) => self.db.get_rec(rec.at(field))?,
                None => RecordId::NULL,
            }
        } else {
            parent_of(self.db, rec)?
        };
        if holder.is_null() || tag_of(self.db, holder)? == NodeType::Linkage {
            return Ok(None);
        }
        Ok(Some(holder))
    }

    fn unlink(&self, rec: RecordId) -> Result<()> {
        let db = self.db;
        let tag = tag_of(db, rec)?;
        if tag.is_instance() {
            let Some(field) = specialized_field(tag) else {
                return Ok(());
            };
            let template = db.get_rec(rec.at(field))?;
            if let Some(head) = instances_field(tag_of(db, template)?) {
                self.unlink_from_list(template.at(head), rec, |current| {
                    Ok(current.at(next_instance_field(tag_of(db, current)?).unwrap_or(0)))
                })?;
            }
            self.caches.instances.invalidate(template);
            return Ok(());
        }
        if tag == NodeType::PartialSpecialization {
            let primary = db.get_rec(rec.at(partial::PRIMARY))?;
            self.unlink_from_list(primary.at(class_template::FIRST_PARTIAL), rec, |current| {
                Ok(current.at(partial::NEXT_PARTIAL))
            })?;
            // Instances matched against it fall back to the next best pattern.
            return template::reselect_patterns(db, primary);
        }
        let parent = parent_of(db, rec)?;
        if !parent.is_null() && members_field(tag_of(db, parent)?).is_some() {
            self.scopes().remove_member(parent, rec)?;
        }
        Ok(())
    }

    fn unlink_from_list(
        &self,
        head_addr: u32,
        target: RecordId,
        next_addr: impl Fn(RecordId) -> Result<u32>,
    ) -> Result<()> {
        let mut addr = head_addr;
        loop {
            let current = self.db.get_rec(addr)?;
            if current.is_null() {
                return Ok(());
            }
            if current == target {
                let after = self.db.get_rec(next_addr(current)?)?;
                return self.db.put_rec(addr, after);
            }
            addr = next_addr(current)?;
        }
    }

    /// Free `rec` and everything it owns; containers are not touched.
    fn release(&mut self, rec: RecordId) -> Result<()> {
        if !self.freed.insert(rec) {
            return Ok(());
        }
        let db = self.db;
        let tag = tag_of(db, rec)?;
        let owned = self.owned_bindings(rec)?;
        if let Some(field) = members_field(tag) {
            let head = db.get_rec(rec.at(field))?;
            if !head.is_null() && tag_of(db, head)? == NodeType::BTreeNode {
                BTree::new(db, rec.at(field)).free_all()?;
            }
            db.put_rec(rec.at(field), RecordId::NULL)?;
            self.caches.names.invalidate(rec);
        }
        if instances_field(tag).is_some() {
            self.caches.instances.invalidate(rec);
        }
        for child in owned {
            self.release(child)?;
        }

        free_template_parameters(db, rec)?;
        if tag.is_class_like() {
            free_bases(db, rec)?;
        }
        if tag.is_function_like() {
            free_parameters(db, rec)?;
            codec::free_data(db, db.get_rec(rec.at(function::RETURN_TYPE))?)?;
        }
        if let Some(field) = type_field(tag) {
            codec::free_data(db, db.get_rec(rec.at(field))?)?;
        }
        if let Some(field) = argmap_field(tag) {
            codec::free_data(db, db.get_rec(rec.at(field))?)?;
        }
        if tag == NodeType::PartialSpecialization {
            codec::free_data(db, db.get_rec(rec.at(partial::ARGS))?)?;
        }
        for cell in unit::declarations_of(db, rec)? {
            unit::unlink_declaration(db, cell.0)?;
        }
        codec::free_data(db, db.get_rec(rec.at(binding::NAME))?)?;
        db.free(rec)
    }
}
