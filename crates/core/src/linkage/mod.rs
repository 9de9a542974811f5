//! Linkages and identity resolution ("add or adapt").
//!
//! A linkage is the per-language root of the index: it owns the global scope
//! of that language and carries the [`LinkageRules`] that decide identity.

mod adapt;
pub(crate) mod factory;
pub(crate) mod implicit;
pub(crate) mod merge;
pub mod session;
mod types;

pub use adapt::MAX_NAME_LEN;
pub use session::{IndexSession, Observation, SessionMode};

use crate::error::Result;
use crate::node::layout::{linkage, node};
use crate::node::{LinkageView, NodeType, walk_list};
use crate::storage::{Database, header};
use crate::types::codec;
use std::sync::Arc;
use symdex_api::{LinkageId, RecordId};
use symdex_plugin::LinkageRules;
use tracing::info;

/// A registered linkage: its stored root record plus its rules.
#[derive(Debug, Clone)]
pub struct Linkage {
    pub id: LinkageId,
    /// Linkage record; its `GLOBAL` field anchors the global scope.
    pub record: RecordId,
    pub rules: Arc<dyn LinkageRules>,
}

impl Linkage {
    /// Find the stored root of `rules`' linkage, creating it on first use.
    pub fn attach(db: &Database, rules: Arc<dyn LinkageRules>) -> Result<Self> {
        let id = rules.linkage_id();
        let record = match find_linkage_record(db, id.as_str())? {
            Some(record) => record,
            None => {
                let record = db.malloc(linkage::SIZE as usize)?;
                db.put_u16(record.at(node::TYPE), NodeType::Linkage as u16)?;
                let name = codec::write_string(db, record, id.as_str().as_bytes())?;
                db.put_rec(record.at(linkage::NAME), name)?;
                db.put_rec(record.at(linkage::NEXT_LINKAGE), db.get_rec(header::LINKAGES)?)?;
                db.put_rec(header::LINKAGES, record)?;
                info!("Created linkage {} at {}", id, record);
                record
            }
        };
        Ok(Self { id, record, rules })
    }

    pub fn global_scope(&self) -> RecordId {
        self.record
    }
}

pub fn find_linkage_record(db: &Database, name: &str) -> Result<Option<RecordId>> {
    for record in stored_linkages(db)? {
        if LinkageView(record).name(db)? == name {
            return Ok(Some(record));
        }
    }
    Ok(None)
}

/// Every linkage record in the file, registered or not.
pub fn stored_linkages(db: &Database) -> Result<Vec<RecordId>> {
    walk_list(db, db.get_rec(header::LINKAGES)?, linkage::NEXT_LINKAGE)
}
