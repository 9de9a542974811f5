//! Depth-first traversal of the stored structure.

use crate::error::Result;
use crate::node::directory::{instances_field, members_field, next_instance_field};
use crate::node::layout::{class_template, partial};
use crate::node::{NodeType, TypedNode, get_node, tag_of, walk_list};
use crate::scope::ScopeIndex;
use crate::storage::Database;
use symdex_api::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Continue,
    /// Do not descend into this node's children.
    SkipChildren,
    Stop,
}

pub trait IndexVisitor {
    fn visit(&mut self, db: &Database, node: TypedNode, depth: usize) -> Result<Visit>;

    /// Called after the children of a node that was descended into.
    fn leave(&mut self, _db: &Database, _node: TypedNode, _depth: usize) -> Result<()> {
        Ok(())
    }
}

/// Children of `rec`: scope members, then partial specializations and
/// instances of templates.
pub fn children(scopes: &ScopeIndex<'_>, db: &Database, rec: RecordId) -> Result<Vec<RecordId>> {
    let tag = tag_of(db, rec)?;
    let mut out = Vec::new();
    if members_field(tag).is_some() {
        out.extend(scopes.members(rec)?);
    }
    if tag == NodeType::ClassTemplate {
        let first = db.get_rec(rec.at(class_template::FIRST_PARTIAL))?;
        out.extend(walk_list(db, first, partial::NEXT_PARTIAL)?);
    }
    if let Some(head) = instances_field(tag) {
        let mut current = db.get_rec(rec.at(head))?;
        while !current.is_null() {
            out.push(current);
            let Some(next) = next_instance_field(tag_of(db, current)?) else {
                break;
            };
            current = db.get_rec(current.at(next))?;
        }
    }
    Ok(out)
}

/// Walk the tree under `root`; returns `false` if the visitor stopped.
pub fn walk(
    scopes: &ScopeIndex<'_>,
    db: &Database,
    root: RecordId,
    visitor: &mut dyn IndexVisitor,
) -> Result<bool> {
    walk_at(scopes, db, root, visitor, 0)
}

fn walk_at(
    scopes: &ScopeIndex<'_>,
    db: &Database,
    rec: RecordId,
    visitor: &mut dyn IndexVisitor,
    depth: usize,
) -> Result<bool> {
    let node = get_node(db, rec)?;
    match visitor.visit(db, node, depth)? {
        Visit::Stop => return Ok(false),
        Visit::SkipChildren => return Ok(true),
        Visit::Continue => {}
    }
    for child in children(scopes, db, rec)? {
        if !walk_at(scopes, db, child, visitor, depth + 1)? {
            return Ok(false);
        }
    }
    visitor.leave(db, node, depth)?;
    Ok(true)
}
