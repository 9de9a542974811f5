//! Identity of a member within its scope: name, stored kind, signature.

use crate::error::Result;
use crate::node::layout::function;
use crate::node::{BindingView, NodeType, tag_of};
use crate::storage::{Database, RecordComparator};
use std::cmp::Ordering;
use symdex_api::RecordId;
use symdex_plugin::LinkageRules;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberKey {
    pub name: Vec<u8>,
    pub tag: NodeType,
    /// Signature memento of overloadable kinds, `0` otherwise.
    pub signature: u64,
}

impl MemberKey {
    pub fn new(name: impl Into<Vec<u8>>, tag: NodeType, signature: u64) -> Self {
        Self {
            name: name.into(),
            tag,
            signature,
        }
    }

    pub fn of_record(db: &Database, rec: RecordId) -> Result<Self> {
        let tag = tag_of(db, rec)?;
        Ok(Self {
            name: BindingView(rec).name_bytes(db)?,
            tag,
            signature: stored_signature(db, rec, tag)?,
        })
    }

    /// Position of `rec` relative to this key.
    pub fn compare_record(
        &self,
        db: &Database,
        rules: &dyn LinkageRules,
        rec: RecordId,
    ) -> Result<Ordering> {
        let other = MemberKey::of_record(db, rec)?;
        Ok(other.compare(self, rules))
    }

    pub fn compare(&self, other: &MemberKey, rules: &dyn LinkageRules) -> Ordering {
        rules
            .compare_names(&self.name, &other.name)
            .then((self.tag as u16).cmp(&(other.tag as u16)))
            .then(self.signature.cmp(&other.signature))
    }
}

pub fn stored_signature(db: &Database, rec: RecordId, tag: NodeType) -> Result<u64> {
    if tag.is_function_like() {
        db.get_u64(rec.at(function::SIGNATURE))
    } else {
        Ok(0)
    }
}

/// Total order of the members of one scope tree.
pub struct MemberOrder<'a> {
    pub db: &'a Database,
    pub rules: &'a dyn LinkageRules,
}

impl RecordComparator for MemberOrder<'_> {
    fn compare(&self, a: RecordId, b: RecordId) -> Result<Ordering> {
        let a = MemberKey::of_record(self.db, a)?;
        let b = MemberKey::of_record(self.db, b)?;
        Ok(a.compare(&b, self.rules))
    }
}
