//! Per-scope member storage and name lookup.
//!
//! A scope anchors either an intrusive list of members (threaded through
//! `binding::NEXT_MEMBER`) or a B-tree ordered by [`MemberKey`]. Which one a
//! scope uses is chosen by the linkage when the first member is linked in;
//! afterwards the anchor's target tells them apart.

pub mod key;

pub use key::{MemberKey, MemberOrder, stored_signature};

use crate::cache::IndexCaches;
use crate::cache::names::NameMap;
use crate::error::{IndexError, Result};
use crate::node::directory::members_field;
use crate::node::layout::binding;
use crate::node::{BindingView, NodeType, tag_of, walk_list};
use crate::storage::{BTree, BTreeVisitor, Database};
use std::cmp::Ordering;
use symdex_api::RecordId;
use symdex_plugin::{LinkageRules, MemberStorage};
use tracing::trace;

/// Scope operations of one linkage.
pub struct ScopeIndex<'a> {
    db: &'a Database,
    rules: &'a dyn LinkageRules,
    caches: &'a IndexCaches,
}

enum Anchor {
    Empty(u32),
    List(u32, RecordId),
    Tree(u32),
}

impl<'a> ScopeIndex<'a> {
    pub fn new(db: &'a Database, rules: &'a dyn LinkageRules, caches: &'a IndexCaches) -> Self {
        Self { db, rules, caches }
    }

    fn anchor(&self, scope: RecordId) -> Result<Anchor> {
        let tag = tag_of(self.db, scope)?;
        let field = members_field(tag)
            .ok_or_else(|| IndexError::corrupt(format!("{} ({}) is not a scope", scope, tag)))?;
        let addr = scope.at(field);
        let head = self.db.get_rec(addr)?;
        if head.is_null() {
            return Ok(Anchor::Empty(addr));
        }
        if tag_of(self.db, head)? == NodeType::BTreeNode {
            Ok(Anchor::Tree(addr))
        } else {
            Ok(Anchor::List(addr, head))
        }
    }

    fn storage_for(&self, scope: RecordId) -> Result<MemberStorage> {
        let tag = tag_of(self.db, scope)?;
        if tag == NodeType::Linkage {
            return Ok(MemberStorage::BTree);
        }
        Ok(match tag.entity_kind() {
            Some(kind) => self.rules.member_storage(kind),
            None => MemberStorage::None,
        })
    }

    /// Whether `scope` can hold members at all.
    pub fn is_scope(&self, scope: RecordId) -> Result<bool> {
        Ok(members_field(tag_of(self.db, scope)?).is_some())
    }

    /// Link a fully populated `child` into `scope`.
    pub fn add_member(&self, scope: RecordId, child: RecordId) -> Result<()> {
        match self.anchor(scope)? {
            Anchor::Empty(addr) => match self.storage_for(scope)? {
                MemberStorage::BTree => self.tree_insert(addr, child)?,
                MemberStorage::List => self.db.put_rec(addr, child)?,
                MemberStorage::None => {
                    return Err(IndexError::corrupt(format!(
                        "{} does not accept members",
                        scope
                    )));
                }
            },
            Anchor::List(addr, head) => {
                self.db.put_rec(child.at(binding::NEXT_MEMBER), head)?;
                self.db.put_rec(addr, child)?;
            }
            Anchor::Tree(addr) => self.tree_insert(addr, child)?,
        }
        self.caches.names.invalidate(scope);
        Ok(())
    }

    fn tree_insert(&self, addr: u32, child: RecordId) -> Result<()> {
        let order = MemberOrder {
            db: self.db,
            rules: self.rules,
        };
        let stored = BTree::new(self.db, addr).insert(child, &order)?;
        if stored != child {
            return Err(IndexError::corrupt(format!(
                "{} collides with existing member {}",
                child, stored
            )));
        }
        Ok(())
    }

    /// Unlink `child` from `scope`; returns whether it was a member.
    pub fn remove_member(&self, scope: RecordId, child: RecordId) -> Result<bool> {
        let removed = match self.anchor(scope)? {
            Anchor::Empty(_) => false,
            Anchor::List(addr, head) => {
                let next = self.db.get_rec(child.at(binding::NEXT_MEMBER))?;
                if head == child {
                    self.db.put_rec(addr, next)?;
                    true
                } else {
                    let mut removed = false;
                    for member in walk_list(self.db, head, binding::NEXT_MEMBER)? {
                        if self.db.get_rec(member.at(binding::NEXT_MEMBER))? == child {
                            self.db.put_rec(member.at(binding::NEXT_MEMBER), next)?;
                            removed = true;
                            break;
                        }
                    }
                    removed
                }
            }
            Anchor::Tree(addr) => {
                let order = MemberOrder {
                    db: self.db,
                    rules: self.rules,
                };
                BTree::new(self.db, addr).delete(child, &order)?
            }
        };
        if removed {
            self.db.put_rec(child.at(binding::NEXT_MEMBER), RecordId::NULL)?;
            self.caches.names.invalidate(scope);
        }
        Ok(removed)
    }

    /// The member of `scope` stored under exactly `key`.
    pub fn find(&self, scope: RecordId, key: &MemberKey) -> Result<Option<RecordId>> {
        match self.anchor(scope)? {
            Anchor::Empty(_) => Ok(None),
            Anchor::List(_, head) => {
                for member in walk_list(self.db, head, binding::NEXT_MEMBER)? {
                    if key.compare_record(self.db, self.rules, member)? == Ordering::Equal {
                        return Ok(Some(member));
                    }
                }
                Ok(None)
            }
            Anchor::Tree(addr) => {
                let mut probe = KeyProbe {
                    db: self.db,
                    rules: self.rules,
                    key,
                    found: None,
                };
                BTree::new(self.db, addr).accept(&mut probe)?;
                Ok(probe.found)
            }
        }
    }

    /// Visit members in storage order; `f` returns `false` to stop.
    pub fn for_each_member(
        &self,
        scope: RecordId,
        f: &mut dyn FnMut(RecordId) -> Result<bool>,
    ) -> Result<()> {
        match self.anchor(scope)? {
            Anchor::Empty(_) => Ok(()),
            Anchor::List(_, head) => {
                for member in walk_list(self.db, head, binding::NEXT_MEMBER)? {
                    if !f(member)? {
                        break;
                    }
                }
                Ok(())
            }
            Anchor::Tree(addr) => BTree::new(self.db, addr).for_each(f),
        }
    }

    pub fn members(&self, scope: RecordId) -> Result<Vec<RecordId>> {
        let mut out = Vec::new();
        self.for_each_member(scope, &mut |member| {
            out.push(member);
            Ok(true)
        })?;
        Ok(out)
    }

    /// Members named `name`, or whose name starts with `name` when `prefix`.
    pub fn lookup(&self, scope: RecordId, name: &[u8], prefix: bool) -> Result<Vec<RecordId>> {
        if prefix {
            return self.prefix_scan(scope, name);
        }
        if let Some(map) = self.caches.names.get(scope) {
            return Ok(map.get(name).cloned().unwrap_or_default());
        }
        let generation = self.caches.names.generation();
        let mut map = NameMap::new();
        self.for_each_member(scope, &mut |member| {
            map.entry(BindingView(member).name_bytes(self.db)?)
                .or_default()
                .push(member);
            Ok(true)
        })?;
        trace!("Rebuilt name cache of {} ({} names)", scope, map.len());
        let map = self.caches.names.insert(scope, generation, map);
        Ok(map.get(name).cloned().unwrap_or_default())
    }

    fn prefix_scan(&self, scope: RecordId, prefix: &[u8]) -> Result<Vec<RecordId>> {
        let mut out = Vec::new();
        match self.anchor(scope)? {
            Anchor::Empty(_) => {}
            Anchor::List(_, head) => {
                for member in walk_list(self.db, head, binding::NEXT_MEMBER)? {
                    if BindingView(member).name_bytes(self.db)?.starts_with(prefix) {
                        out.push(member);
                    }
                }
            }
            Anchor::Tree(addr) => {
                let mut range = PrefixRange {
                    db: self.db,
                    rules: self.rules,
                    prefix,
                    out: &mut out,
                };
                BTree::new(self.db, addr).accept(&mut range)?;
            }
        }
        Ok(out)
    }
}

struct KeyProbe<'k> {
    db: &'k Database,
    rules: &'k dyn LinkageRules,
    key: &'k MemberKey,
    found: Option<RecordId>,
}

impl BTreeVisitor for KeyProbe<'_> {
    fn compare(&mut self, record: RecordId) -> Result<Ordering> {
        self.key.compare_record(self.db, self.rules, record)
    }

    fn visit(&mut self, record: RecordId) -> Result<bool> {
        self.found = Some(record);
        Ok(false)
    }
}

/// Members whose name starts with `prefix`; relies on names ordering
/// their prefixes contiguously.
struct PrefixRange<'k> {
    db: &'k Database,
    rules: &'k dyn LinkageRules,
    prefix: &'k [u8],
    out: &'k mut Vec<RecordId>,
}

impl BTreeVisitor for PrefixRange<'_> {
    fn compare(&mut self, record: RecordId) -> Result<Ordering> {
        let name = BindingView(record).name_bytes(self.db)?;
        if name.starts_with(self.prefix) {
            return Ok(Ordering::Equal);
        }
        Ok(self.rules.compare_names(&name, self.prefix))
    }

    fn visit(&mut self, record: RecordId) -> Result<bool> {
        self.out.push(record);
        Ok(true)
    }
}
