//! The public face of a symbol index file.

use crate::cache::IndexCaches;
use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use crate::gc::Reclaimer;
use crate::linkage::{IndexSession, Linkage, SessionMode, stored_linkages};
use crate::node::directory::{argmap_field, template_params_field};
use crate::node::layout::template_param;
use crate::node::{
    BaseView, BindingView, ClassTemplateView, ClassView, FunctionView, InstanceView, LinkageView,
    NodeType, ParameterView, SourceUnitView, TemplateParameterView, TypedNode, get_node, parent_of,
    tag_of, walk_list,
};
use crate::scope::ScopeIndex;
use crate::storage::{Database, DatabaseStats};
use crate::types::ArgumentMap;
use crate::unit::{self, SourceUnit, UnitFailure, UnitReport};
use crate::visit::{self, IndexVisitor};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use symdex_api::{DeclRole, Entity, LinkageId, RecordId};
use symdex_plugin::LinkageRules;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub path: PathBuf,
    pub chunks: usize,
    pub allocated_bytes: u64,
    pub free_bytes: u64,
    /// Linkages stored in the file, registered or not.
    pub linkages: Vec<String>,
    pub units: usize,
    pub cached_scopes: usize,
    pub cached_templates: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitSummary {
    pub record: RecordId,
    pub path: String,
    pub content_hash: u64,
    pub timestamp: u64,
    pub declarations: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclarationInfo {
    pub unit: String,
    pub role: DeclRole,
}

/// A persistent symbol index.
///
/// Writes (`add_binding`, `index_unit`, `remove_unit`) are serialized by a
/// writer lock; lookups may run alongside them and only ever see fully
/// linked records.
pub struct SymbolIndex {
    db: Database,
    config: IndexConfig,
    linkages: DashMap<LinkageId, Arc<Linkage>>,
    caches: IndexCaches,
    writer: Mutex<()>,
}

impl std::fmt::Debug for SymbolIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolIndex")
            .field("path", &self.db.path())
            .field("linkages", &self.linkages.len())
            .finish()
    }
}

impl SymbolIndex {
    pub fn open(path: &Path, config: IndexConfig) -> Result<Self> {
        Ok(Self::with_database(Database::open(path)?, config))
    }

    /// Open `path`, discarding it first if it has another format.
    pub fn open_or_rebuild(path: &Path, config: IndexConfig) -> Result<Self> {
        Ok(Self::with_database(Database::open_or_create(path)?, config))
    }

    fn with_database(db: Database, config: IndexConfig) -> Self {
        let caches = IndexCaches::new(&config);
        Self {
            db,
            config,
            linkages: DashMap::new(),
            caches,
            writer: Mutex::new(()),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    // ---- linkages ----

    /// Make a language available, creating its root record on first use.
    pub fn register_linkage(&self, rules: Arc<dyn LinkageRules>) -> Result<Arc<Linkage>> {
        let _guard = self.writer.lock().map_err(|_| IndexError::Poisoned)?;
        let linkage = Arc::new(Linkage::attach(&self.db, rules)?);
        self.linkages
            .insert(linkage.id.clone(), Arc::clone(&linkage));
        Ok(linkage)
    }

    pub fn linkage(&self, id: &LinkageId) -> Result<Arc<Linkage>> {
        self.linkages
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| IndexError::UnknownLinkage(id.to_string()))
    }

    pub fn linkages(&self) -> Vec<Arc<Linkage>> {
        self.linkages
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn global_scope(&self, id: &LinkageId) -> Result<RecordId> {
        Ok(self.linkage(id)?.global_scope())
    }

    /// Registered linkage that `rec` belongs to.
    fn linkage_of(&self, rec: RecordId) -> Result<Arc<Linkage>> {
        let tag = tag_of(&self.db, rec)?;
        let root = match tag {
            NodeType::Linkage => rec,
            t if t.is_binding() => BindingView(rec).linkage(&self.db)?,
            _ => {
                return Err(IndexError::corrupt(format!(
                    "{} ({}) does not belong to a linkage",
                    rec, tag
                )));
            }
        };
        self.linkages
            .iter()
            .find(|entry| entry.value().record == root)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                let name = LinkageView(root)
                    .name(&self.db)
                    .unwrap_or_else(|_| root.to_string());
                IndexError::UnknownLinkage(name)
            })
    }

    // ---- writes ----

    /// Add or adapt one entity. `Ok(None)` when it is deliberately not
    /// indexed; a resolution failure leaves the index untouched.
    pub fn add_binding(&self, id: &LinkageId, entity: &Entity) -> Result<Option<RecordId>> {
        let linkage = self.linkage(id)?;
        let _guard = self.writer.lock().map_err(|_| IndexError::Poisoned)?;
        let mut session = IndexSession::new(
            &self.db,
            &linkage,
            &self.caches,
            &self.config,
            SessionMode::Create,
        );
        session.add_binding(entity)
    }

    /// Re-index `unit`: drop what it declared before, add `entities`, then
    /// free bindings no unit declares any more.
    pub fn index_unit(
        &self,
        id: &LinkageId,
        source: &SourceUnit,
        entities: &[Entity],
    ) -> Result<UnitReport> {
        let linkage = self.linkage(id)?;
        let _guard = self.writer.lock().map_err(|_| IndexError::Poisoned)?;
        let unit_rec = unit::find_or_create_unit(&self.db, source)?;
        let previous = unit::clear_unit(&self.db, unit_rec)?;

        let mut report = UnitReport {
            unit: unit_rec,
            ..Default::default()
        };
        {
            let mut session = IndexSession::new(
                &self.db,
                &linkage,
                &self.caches,
                &self.config,
                SessionMode::Create,
            )
            .with_unit(unit_rec);
            for entity in entities {
                match session.add_binding(entity) {
                    Ok(Some(_)) => report.added += 1,
                    Ok(None) => report.skipped += 1,
                    Err(IndexError::Resolution(error)) => {
                        warn!("Skipping {} in {}: {}", entity.name, source.path, error);
                        report.failures.push(UnitFailure {
                            entity: entity.name.clone(),
                            error,
                        });
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        let reclaimed = self.reclaim(previous)?;
        info!(
            "Indexed {}: {} added, {} skipped, {} failed, {} reclaimed",
            source.path,
            report.added,
            report.skipped,
            report.failures.len(),
            reclaimed
        );
        Ok(report)
    }

    /// Forget `path` and every binding only it declared.
    pub fn remove_unit(&self, path: &str) -> Result<bool> {
        let _guard = self.writer.lock().map_err(|_| IndexError::Poisoned)?;
        let Some(unit_rec) = unit::find_unit(&self.db, path)? else {
            return Ok(false);
        };
        let touched = unit::free_unit(&self.db, unit_rec)?;
        let reclaimed = self.reclaim(touched)?;
        info!("Removed unit {} ({} bindings reclaimed)", path, reclaimed);
        Ok(true)
    }

    /// Free undeclared bindings among `candidates`, per linkage.
    fn reclaim(&self, candidates: Vec<RecordId>) -> Result<usize> {
        let mut by_linkage: HashMap<RecordId, Vec<RecordId>> = HashMap::new();
        for rec in candidates {
            let root = BindingView(rec).linkage(&self.db)?;
            by_linkage.entry(root).or_default().push(rec);
        }
        let mut total = 0;
        for (root, records) in by_linkage {
            let Some(linkage) = self
                .linkages
                .iter()
                .find(|entry| entry.value().record == root)
                .map(|entry| Arc::clone(entry.value()))
            else {
                debug!("Leaving {} records of unregistered linkage {}", records.len(), root);
                continue;
            };
            let mut reclaimer = Reclaimer::new(&self.db, linkage.rules.as_ref(), &self.caches);
            total += reclaimer.collect(records)?;
        }
        Ok(total)
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush(self.config.sync_on_flush)
    }

    pub fn clear_caches(&self) {
        self.caches.clear();
    }

    // ---- reads ----

    /// Resolve `entity` without creating anything.
    pub fn find_binding(&self, id: &LinkageId, entity: &Entity) -> Result<Option<RecordId>> {
        let linkage = self.linkage(id)?;
        let mut session = IndexSession::new(
            &self.db,
            &linkage,
            &self.caches,
            &self.config,
            SessionMode::FindOnly,
        );
        session.find_binding(entity)
    }

    pub fn get_node(&self, rec: RecordId) -> Result<TypedNode> {
        get_node(&self.db, rec)
    }

    /// Members of `scope` named `name` (or starting with it, with `prefix`).
    pub fn lookup(&self, scope: RecordId, name: &str, prefix: bool) -> Result<Vec<RecordId>> {
        let linkage = self.linkage_of(scope)?;
        ScopeIndex::new(&self.db, linkage.rules.as_ref(), &self.caches).lookup(
            scope,
            name.as_bytes(),
            prefix,
        )
    }

    pub fn members(&self, scope: RecordId) -> Result<Vec<RecordId>> {
        let linkage = self.linkage_of(scope)?;
        ScopeIndex::new(&self.db, linkage.rules.as_ref(), &self.caches).members(scope)
    }

    /// Resolve `a::b::C` scope by scope from the global scope.
    pub fn lookup_qualified(&self, id: &LinkageId, qualified: &str) -> Result<Vec<RecordId>> {
        self.find_qualified(id, qualified, false)
    }

    /// Like [`SymbolIndex::lookup_qualified`]; with `prefix` the last
    /// segment matches every name it begins.
    pub fn find_qualified(
        &self,
        id: &LinkageId,
        qualified: &str,
        prefix: bool,
    ) -> Result<Vec<RecordId>> {
        let linkage = self.linkage(id)?;
        let segments = linkage.rules.naming_convention().parse(qualified);
        let scopes = ScopeIndex::new(&self.db, linkage.rules.as_ref(), &self.caches);
        let mut current = vec![linkage.global_scope()];
        for (i, segment) in segments.iter().enumerate() {
            let last = i + 1 == segments.len();
            let mut next = Vec::new();
            for scope in &current {
                for rec in scopes.lookup(*scope, segment.as_bytes(), last && prefix)? {
                    if last || scopes.is_scope(rec)? {
                        next.push(rec);
                    }
                }
            }
            if next.is_empty() {
                return Ok(next);
            }
            current = next;
        }
        Ok(current)
    }

    /// Depth-first walk from `root`.
    pub fn visit(&self, root: RecordId, visitor: &mut dyn IndexVisitor) -> Result<()> {
        let linkage = self.linkage_of(root)?;
        let scopes = ScopeIndex::new(&self.db, linkage.rules.as_ref(), &self.caches);
        visit::walk(&scopes, &self.db, root, visitor)?;
        Ok(())
    }

    pub fn name(&self, rec: RecordId) -> Result<String> {
        match tag_of(&self.db, rec)? {
            NodeType::Linkage => LinkageView(rec).name(&self.db),
            t if t.is_binding() => BindingView(rec).name(&self.db),
            t => Ok(t.to_string()),
        }
    }

    /// Qualified name rendered with the linkage's naming convention.
    pub fn qualified_name(&self, rec: RecordId) -> Result<String> {
        let linkage = self.linkage_of(rec)?;
        let naming = linkage.rules.naming_convention();
        let mut segments = Vec::new();
        let mut current = rec;
        while !current.is_null() {
            let tag = tag_of(&self.db, current)?;
            if tag == NodeType::Linkage {
                break;
            }
            if tag.is_binding() {
                segments.push(BindingView(current).name(&self.db)?);
            }
            current = parent_of(&self.db, current)?;
        }
        if segments.is_empty() {
            return Ok(naming.separator().to_string());
        }
        segments.reverse();
        Ok(naming.render(&segments))
    }

    // ---- stored structure ----

    pub fn instances(&self, template: RecordId) -> Result<Vec<RecordId>> {
        Ok(match tag_of(&self.db, template)? {
            NodeType::ClassTemplate => ClassTemplateView(template).instances(&self.db)?,
            NodeType::FunctionTemplate => {
                crate::node::FunctionTemplateView(template).instances(&self.db)?
            }
            _ => Vec::new(),
        })
    }

    pub fn partial_specializations(&self, template: RecordId) -> Result<Vec<RecordId>> {
        if tag_of(&self.db, template)? != NodeType::ClassTemplate {
            return Ok(Vec::new());
        }
        Ok(ClassTemplateView(template)
            .partials(&self.db)?
            .into_iter()
            .map(|p| p.0)
            .collect())
    }

    pub fn template_parameters(&self, template: RecordId) -> Result<Vec<TemplateParameterView>> {
        let Some(field) = template_params_field(tag_of(&self.db, template)?) else {
            return Ok(Vec::new());
        };
        let first = self.db.get_rec(template.at(field))?;
        Ok(walk_list(&self.db, first, template_param::NEXT_PARAM)?
            .into_iter()
            .map(TemplateParameterView)
            .collect())
    }

    pub fn parameters(&self, function: RecordId) -> Result<Vec<ParameterView>> {
        if !tag_of(&self.db, function)?.is_function_like() {
            return Ok(Vec::new());
        }
        FunctionView(function).parameters(&self.db)
    }

    pub fn bases(&self, class: RecordId) -> Result<Vec<BaseView>> {
        if !tag_of(&self.db, class)?.is_class_like() {
            return Ok(Vec::new());
        }
        ClassView(class).bases(&self.db)
    }

    /// Argument map of an instance; member specializations answer with the
    /// map of the nearest enclosing instance.
    pub fn argument_map(&self, rec: RecordId) -> Result<Option<ArgumentMap>> {
        let mut current = rec;
        while !current.is_null() {
            let tag = tag_of(&self.db, current)?;
            if argmap_field(tag).is_some() {
                return Ok(Some(InstanceView(current).argument_map(&self.db)?));
            }
            if !tag.is_specialization() {
                return Ok(None);
            }
            current = parent_of(&self.db, current)?;
        }
        Ok(None)
    }

    /// Units declaring `binding`, with the strongest role each observed.
    pub fn declarations(&self, binding: RecordId) -> Result<Vec<DeclarationInfo>> {
        let mut out = Vec::new();
        for cell in unit::declarations_of(&self.db, binding)? {
            out.push(DeclarationInfo {
                unit: SourceUnitView(cell.unit(&self.db)?).path(&self.db)?,
                role: cell.role(&self.db)?,
            });
        }
        Ok(out)
    }

    pub fn units(&self) -> Result<Vec<UnitSummary>> {
        let mut out = Vec::new();
        for rec in unit::units(&self.db)? {
            let view = SourceUnitView(rec);
            let mut declarations = 0;
            let mut cell = view.first_declaration(&self.db)?;
            while !cell.is_null() {
                declarations += 1;
                cell = self
                    .db
                    .get_rec(cell.at(crate::node::layout::declaration::NEXT_IN_UNIT))?;
            }
            out.push(UnitSummary {
                record: rec,
                path: view.path(&self.db)?,
                content_hash: view.content_hash(&self.db)?,
                timestamp: view.timestamp(&self.db)?,
                declarations,
            });
        }
        Ok(out)
    }

    pub fn stats(&self) -> Result<IndexStats> {
        let DatabaseStats {
            chunks,
            allocated_bytes,
            free_bytes,
        } = self.db.stats()?;
        let mut linkages = Vec::new();
        for rec in stored_linkages(&self.db)? {
            linkages.push(LinkageView(rec).name(&self.db)?);
        }
        Ok(IndexStats {
            path: self.db.path().to_path_buf(),
            chunks,
            allocated_bytes,
            free_bytes,
            linkages,
            units: unit::units(&self.db)?.len(),
            cached_scopes: self.caches.names.len(),
            cached_templates: self.caches.instances.len(),
        })
    }
}
