//! Source units and the declaration cells that tie bindings to them.
//!
//! Each cell sits on two doubly linked lists at once: the declarations of
//! its binding and the declarations of its unit. Units are kept in a B-tree
//! ordered by path, rooted in the file header.

use crate::error::Result;
use crate::node::layout::{binding, declaration, node, source_unit};
use crate::node::{DeclarationView, NodeType, SourceUnitView};
use crate::storage::{BTree, BTreeVisitor, Database, RecordComparator, header};
use crate::types::codec;
use serde::Serialize;
use std::cmp::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};
use symdex_api::{DeclRole, RecordId, ResolutionFailure};
use xxhash_rust::xxh3::xxh3_64;

/// A file as presented for indexing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceUnit {
    pub path: String,
    pub content_hash: u64,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
}

impl SourceUnit {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content_hash: 0,
            timestamp: now(),
        }
    }

    pub fn with_content(path: impl Into<String>, content: &[u8]) -> Self {
        Self {
            content_hash: xxh3_64(content),
            ..Self::new(path)
        }
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure {
    pub entity: String,
    pub error: ResolutionFailure,
}

/// Outcome of indexing one unit.
#[derive(Debug, Clone, Default)]
pub struct UnitReport {
    pub unit: RecordId,
    pub added: usize,
    /// Entities deliberately not indexed (function-local and the like).
    pub skipped: usize,
    pub failures: Vec<UnitFailure>,
}

struct UnitOrder<'a> {
    db: &'a Database,
}

impl RecordComparator for UnitOrder<'_> {
    fn compare(&self, a: RecordId, b: RecordId) -> Result<Ordering> {
        Ok(path_of(self.db, a)?.cmp(&path_of(self.db, b)?))
    }
}

struct PathProbe<'a> {
    db: &'a Database,
    path: &'a [u8],
    found: Option<RecordId>,
}

impl BTreeVisitor for PathProbe<'_> {
    fn compare(&mut self, record: RecordId) -> Result<Ordering> {
        Ok(path_of(self.db, record)?.as_slice().cmp(self.path))
    }

    fn visit(&mut self, record: RecordId) -> Result<bool> {
        self.found = Some(record);
        Ok(false)
    }
}

fn path_of(db: &Database, unit: RecordId) -> Result<Vec<u8>> {
    codec::read_string(db, db.get_rec(unit.at(source_unit::PATH))?)
}

fn units_tree(db: &Database) -> BTree<'_> {
    BTree::new(db, header::UNITS)
}

pub fn find_unit(db: &Database, path: &str) -> Result<Option<RecordId>> {
    let mut probe = PathProbe {
        db,
        path: path.as_bytes(),
        found: None,
    };
    units_tree(db).accept(&mut probe)?;
    Ok(probe.found)
}

/// The stored unit for `unit.path`, with hash and timestamp refreshed.
pub fn find_or_create_unit(db: &Database, unit: &SourceUnit) -> Result<RecordId> {
    let rec = match find_unit(db, &unit.path)? {
        Some(rec) => rec,
        None => {
            let rec = db.malloc(source_unit::SIZE as usize)?;
            db.put_u16(rec.at(node::TYPE), NodeType::SourceUnit as u16)?;
            let path = codec::write_string(db, rec, unit.path.as_bytes())?;
            db.put_rec(rec.at(source_unit::PATH), path)?;
            units_tree(db).insert(rec, &UnitOrder { db })?;
            rec
        }
    };
    db.put_u64(rec.at(source_unit::CONTENT_HASH), unit.content_hash)?;
    db.put_u64(rec.at(source_unit::TIMESTAMP), unit.timestamp)?;
    Ok(rec)
}

/// Every unit, ordered by path.
pub fn units(db: &Database) -> Result<Vec<RecordId>> {
    units_tree(db).records()
}

/// Link a new declaration cell at the front of both lists.
pub fn add_declaration(
    db: &Database,
    binding_rec: RecordId,
    unit: RecordId,
    role: DeclRole,
) -> Result<RecordId> {
    let cell = db.malloc(declaration::SIZE as usize)?;
    db.put_u16(cell.at(node::TYPE), NodeType::Declaration as u16)?;
    db.put_rec(cell.at(node::PARENT), unit)?;
    db.put_rec(cell.at(declaration::BINDING), binding_rec)?;
    db.put_rec(cell.at(declaration::UNIT), unit)?;
    db.put_u16(cell.at(declaration::ROLE), role.to_bits())?;

    let binding_head = db.get_rec(binding_rec.at(binding::FIRST_DECL))?;
    db.put_rec(cell.at(declaration::NEXT_IN_BINDING), binding_head)?;
    if !binding_head.is_null() {
        db.put_rec(binding_head.at(declaration::PREV_IN_BINDING), cell)?;
    }
    db.put_rec(binding_rec.at(binding::FIRST_DECL), cell)?;

    let unit_head = db.get_rec(unit.at(source_unit::FIRST_DECL))?;
    db.put_rec(cell.at(declaration::NEXT_IN_UNIT), unit_head)?;
    if !unit_head.is_null() {
        db.put_rec(unit_head.at(declaration::PREV_IN_UNIT), cell)?;
    }
    db.put_rec(unit.at(source_unit::FIRST_DECL), cell)?;
    Ok(cell)
}

/// Remove `cell` from both lists and free it.
pub fn unlink_declaration(db: &Database, cell: RecordId) -> Result<()> {
    let view = DeclarationView(cell);
    unlink_from(
        db,
        cell,
        view.binding(db)?.at(binding::FIRST_DECL),
        declaration::NEXT_IN_BINDING,
        declaration::PREV_IN_BINDING,
    )?;
    unlink_from(
        db,
        cell,
        view.unit(db)?.at(source_unit::FIRST_DECL),
        declaration::NEXT_IN_UNIT,
        declaration::PREV_IN_UNIT,
    )?;
    db.free(cell)
}

fn unlink_from(db: &Database, cell: RecordId, head_addr: u32, next_off: u32, prev_off: u32) -> Result<()> {
    let next = db.get_rec(cell.at(next_off))?;
    let prev = db.get_rec(cell.at(prev_off))?;
    if prev.is_null() {
        db.put_rec(head_addr, next)?;
    } else {
        db.put_rec(prev.at(next_off), next)?;
    }
    if !next.is_null() {
        db.put_rec(next.at(prev_off), prev)?;
    }
    Ok(())
}

/// Drop every declaration of `unit`; returns the bindings they named.
pub fn clear_unit(db: &Database, unit: RecordId) -> Result<Vec<RecordId>> {
    let mut touched = Vec::new();
    loop {
        let cell = SourceUnitView(unit).first_declaration(db)?;
        if cell.is_null() {
            break;
        }
        let binding_rec = DeclarationView(cell).binding(db)?;
        if !touched.contains(&binding_rec) {
            touched.push(binding_rec);
        }
        unlink_declaration(db, cell)?;
    }
    Ok(touched)
}

/// Clear `unit`, then remove it from the unit tree and free it.
pub fn free_unit(db: &Database, unit: RecordId) -> Result<Vec<RecordId>> {
    let touched = clear_unit(db, unit)?;
    units_tree(db).delete(unit, &UnitOrder { db })?;
    codec::free_data(db, db.get_rec(unit.at(source_unit::PATH))?)?;
    db.free(unit)?;
    Ok(touched)
}

/// Declaration cells of `binding_rec`, newest first.
pub fn declarations_of(db: &Database, binding_rec: RecordId) -> Result<Vec<DeclarationView>> {
    let mut out = Vec::new();
    let mut cell = db.get_rec(binding_rec.at(binding::FIRST_DECL))?;
    while !cell.is_null() {
        out.push(DeclarationView(cell));
        cell = db.get_rec(cell.at(declaration::NEXT_IN_BINDING))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fake_binding(db: &Database) -> RecordId {
        let rec = db.malloc(binding::SIZE as usize).unwrap();
        db.put_u16(rec.at(node::TYPE), NodeType::Variable as u16).unwrap();
        rec
    }

    #[test]
    fn test_units_are_found_by_path() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("db")).unwrap();
        let b = find_or_create_unit(&db, &SourceUnit::new("src/b.cpp")).unwrap();
        let a = find_or_create_unit(&db, &SourceUnit::new("src/a.cpp")).unwrap();

        assert_eq!(find_unit(&db, "src/a.cpp").unwrap(), Some(a));
        assert_eq!(find_unit(&db, "src/c.cpp").unwrap(), None);
        assert_eq!(
            find_or_create_unit(&db, &SourceUnit::new("src/b.cpp")).unwrap(),
            b
        );
        assert_eq!(units(&db).unwrap(), vec![a, b]);
    }

    #[test]
    fn test_declaration_lists_stay_consistent() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("db")).unwrap();
        let unit_a = find_or_create_unit(&db, &SourceUnit::new("a.h")).unwrap();
        let unit_b = find_or_create_unit(&db, &SourceUnit::new("b.cpp")).unwrap();
        let x = fake_binding(&db);
        let y = fake_binding(&db);

        add_declaration(&db, x, unit_a, DeclRole::Declaration).unwrap();
        add_declaration(&db, y, unit_a, DeclRole::Definition).unwrap();
        add_declaration(&db, x, unit_b, DeclRole::Definition).unwrap();
        assert_eq!(declarations_of(&db, x).unwrap().len(), 2);

        let touched = clear_unit(&db, unit_a).unwrap();
        assert_eq!(touched.len(), 2);
        assert!(declarations_of(&db, y).unwrap().is_empty());
        let remaining = declarations_of(&db, x).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].unit(&db).unwrap(), unit_b);
        assert_eq!(remaining[0].role(&db).unwrap(), DeclRole::Definition);
    }

    #[test]
    fn test_free_unit_removes_it_from_the_tree() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("db")).unwrap();
        let unit = find_or_create_unit(&db, &SourceUnit::with_content("a.cpp", b"int x;")).unwrap();
        assert_ne!(SourceUnitView(unit).content_hash(&db).unwrap(), 0);
        free_unit(&db, unit).unwrap();
        assert_eq!(find_unit(&db, "a.cpp").unwrap(), None);
        assert!(units(&db).unwrap().is_empty());
    }
}
