use super::database::Database;
use crate::error::{IndexError, Result};
use crate::node::NodeType;
use std::cmp::Ordering;
use symdex_api::RecordId;

const DEGREE: usize = 8;
pub const MAX_KEYS: usize = 2 * DEGREE - 1;
const MIN_KEYS: usize = DEGREE - 1;

// Node record: [tag][parent][count u16][keys..][children..]
const COUNT: u32 = 6;
const KEYS: u32 = 8;
const CHILDREN: u32 = KEYS + (MAX_KEYS as u32) * 4;
const NODE_SIZE: u32 = CHILDREN + (MAX_KEYS as u32 + 1) * 4;

/// Total order over the records stored in one tree.
pub trait RecordComparator {
    fn compare(&self, a: RecordId, b: RecordId) -> Result<Ordering>;
}

/// Range traversal over a tree.
pub trait BTreeVisitor {
    /// Position of `record` relative to the range of interest.
    fn compare(&mut self, record: RecordId) -> Result<Ordering>;
    /// Called for every record comparing `Equal`; return `false` to stop.
    fn visit(&mut self, record: RecordId) -> Result<bool>;
}

/// B-tree of record ids whose root pointer lives at `root_addr`.
pub struct BTree<'a> {
    db: &'a Database,
    root_addr: u32,
}

impl<'a> BTree<'a> {
    pub fn new(db: &'a Database, root_addr: u32) -> Self {
        Self { db, root_addr }
    }

    fn root(&self) -> Result<RecordId> {
        self.db.get_rec(self.root_addr)
    }

    fn set_root(&self, node: RecordId) -> Result<()> {
        self.db.put_rec(self.root_addr, node)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.root()?.is_null())
    }

    // ---- node accessors ----

    fn count(&self, node: RecordId) -> Result<usize> {
        Ok(self.db.get_u16(node.at(COUNT))? as usize)
    }

    fn set_count(&self, node: RecordId, count: usize) -> Result<()> {
        self.db.put_u16(node.at(COUNT), count as u16)
    }

    fn key(&self, node: RecordId, i: usize) -> Result<RecordId> {
        self.db.get_rec(node.at(KEYS + i as u32 * 4))
    }

    fn set_key(&self, node: RecordId, i: usize, key: RecordId) -> Result<()> {
        self.db.put_rec(node.at(KEYS + i as u32 * 4), key)
    }

    fn child(&self, node: RecordId, i: usize) -> Result<RecordId> {
        self.db.get_rec(node.at(CHILDREN + i as u32 * 4))
    }

    fn set_child(&self, node: RecordId, i: usize, child: RecordId) -> Result<()> {
        self.db.put_rec(node.at(CHILDREN + i as u32 * 4), child)
    }

    fn is_leaf(&self, node: RecordId) -> Result<bool> {
        Ok(self.child(node, 0)?.is_null())
    }

    fn alloc_node(&self) -> Result<RecordId> {
        let node = self.db.malloc(NODE_SIZE as usize)?;
        self.db.put_u16(node.at(0), NodeType::BTreeNode as u16)?;
        Ok(node)
    }

    // ---- lookup ----

    /// Find the stored record equal to `key` under `cmp`.
    pub fn find(&self, key: RecordId, cmp: &dyn RecordComparator) -> Result<Option<RecordId>> {
        let mut node = self.root()?;
        while !node.is_null() {
            let n = self.count(node)?;
            let mut i = 0;
            while i < n {
                match cmp.compare(self.key(node, i)?, key)? {
                    Ordering::Less => i += 1,
                    Ordering::Equal => return Ok(Some(self.key(node, i)?)),
                    Ordering::Greater => break,
                }
            }
            if self.is_leaf(node)? {
                return Ok(None);
            }
            node = self.child(node, i)?;
        }
        Ok(None)
    }

    /// Visit every record the visitor considers `Equal`, in order.
    pub fn accept(&self, visitor: &mut dyn BTreeVisitor) -> Result<()> {
        let root = self.root()?;
        if !root.is_null() {
            self.accept_node(root, visitor)?;
        }
        Ok(())
    }

    fn accept_node(&self, node: RecordId, visitor: &mut dyn BTreeVisitor) -> Result<bool> {
        let n = self.count(node)?;
        let leaf = self.is_leaf(node)?;
        for i in 0..n {
            let key = self.key(node, i)?;
            let order = visitor.compare(key)?;
            if order != Ordering::Less && !leaf && !self.accept_node(self.child(node, i)?, visitor)? {
                return Ok(false);
            }
            match order {
                Ordering::Less => {}
                Ordering::Equal => {
                    if !visitor.visit(key)? {
                        return Ok(false);
                    }
                }
                Ordering::Greater => return Ok(true),
            }
        }
        if !leaf {
            return self.accept_node(self.child(node, n)?, visitor);
        }
        Ok(true)
    }

    /// In-order walk of every record; `f` returns `false` to stop.
    pub fn for_each(&self, f: &mut dyn FnMut(RecordId) -> Result<bool>) -> Result<()> {
        struct All<'f>(&'f mut dyn FnMut(RecordId) -> Result<bool>);
        impl BTreeVisitor for All<'_> {
            fn compare(&mut self, _record: RecordId) -> Result<Ordering> {
                Ok(Ordering::Equal)
            }
            fn visit(&mut self, record: RecordId) -> Result<bool> {
                (self.0)(record)
            }
        }
        self.accept(&mut All(f))
    }

    pub fn records(&self) -> Result<Vec<RecordId>> {
        let mut out = Vec::new();
        self.for_each(&mut |rec| {
            out.push(rec);
            Ok(true)
        })?;
        Ok(out)
    }

    // ---- insertion ----

    /// Insert `key`, or return the record already stored under an equal key.
    pub fn insert(&self, key: RecordId, cmp: &dyn RecordComparator) -> Result<RecordId> {
        if let Some(existing) = self.find(key, cmp)? {
            return Ok(existing);
        }
        let mut root = self.root()?;
        if root.is_null() {
            root = self.alloc_node()?;
            self.set_key(root, 0, key)?;
            self.set_count(root, 1)?;
            self.set_root(root)?;
            return Ok(key);
        }
        if self.count(root)? == MAX_KEYS {
            let new_root = self.alloc_node()?;
            self.set_child(new_root, 0, root)?;
            self.split_child(new_root, 0)?;
            self.set_root(new_root)?;
            root = new_root;
        }
        self.insert_nonfull(root, key, cmp)?;
        Ok(key)
    }

    fn split_child(&self, parent: RecordId, i: usize) -> Result<()> {
        let full = self.child(parent, i)?;
        let leaf = self.is_leaf(full)?;
        let sibling = self.alloc_node()?;

        for j in 0..MIN_KEYS {
            self.set_key(sibling, j, self.key(full, j + DEGREE)?)?;
            self.set_key(full, j + DEGREE, RecordId::NULL)?;
        }
        if !leaf {
            for j in 0..DEGREE {
                self.set_child(sibling, j, self.child(full, j + DEGREE)?)?;
                self.set_child(full, j + DEGREE, RecordId::NULL)?;
            }
        }
        self.set_count(sibling, MIN_KEYS)?;
        let median = self.key(full, DEGREE - 1)?;
        self.set_key(full, DEGREE - 1, RecordId::NULL)?;
        self.set_count(full, MIN_KEYS)?;

        let n = self.count(parent)?;
        for j in (i + 1..=n).rev() {
            self.set_child(parent, j + 1, self.child(parent, j)?)?;
        }
        self.set_child(parent, i + 1, sibling)?;
        for j in (i..n).rev() {
            self.set_key(parent, j + 1, self.key(parent, j)?)?;
        }
        self.set_key(parent, i, median)?;
        self.set_count(parent, n + 1)
    }

    fn insert_nonfull(&self, mut node: RecordId, key: RecordId, cmp: &dyn RecordComparator) -> Result<()> {
        loop {
            let n = self.count(node)?;
            let mut i = n;
            if self.is_leaf(node)? {
                while i > 0 && cmp.compare(key, self.key(node, i - 1)?)? == Ordering::Less {
                    self.set_key(node, i, self.key(node, i - 1)?)?;
                    i -= 1;
                }
                self.set_key(node, i, key)?;
                return self.set_count(node, n + 1);
            }
            while i > 0 && cmp.compare(key, self.key(node, i - 1)?)? == Ordering::Less {
                i -= 1;
            }
            if self.count(self.child(node, i)?)? == MAX_KEYS {
                self.split_child(node, i)?;
                if cmp.compare(key, self.key(node, i)?)? == Ordering::Greater {
                    i += 1;
                }
            }
            node = self.child(node, i)?;
        }
    }

    // ---- deletion ----

    /// Remove the record equal to `key`; returns whether one was found.
    pub fn delete(&self, key: RecordId, cmp: &dyn RecordComparator) -> Result<bool> {
        let root = self.root()?;
        if root.is_null() {
            return Ok(false);
        }
        let removed = self.delete_from(root, key, cmp)?;
        if self.count(root)? == 0 {
            let replacement = self.child(root, 0)?;
            self.set_root(replacement)?;
            self.db.free(root)?;
        }
        Ok(removed)
    }

    fn delete_from(&self, node: RecordId, key: RecordId, cmp: &dyn RecordComparator) -> Result<bool> {
        let n = self.count(node)?;
        let mut i = 0;
        let mut order = Ordering::Greater;
        while i < n {
            order = cmp.compare(self.key(node, i)?, key)?;
            if order != Ordering::Less {
                break;
            }
            i += 1;
        }
        let found = i < n && order == Ordering::Equal;
        let leaf = self.is_leaf(node)?;

        if found && leaf {
            for j in i..n - 1 {
                self.set_key(node, j, self.key(node, j + 1)?)?;
            }
            self.set_key(node, n - 1, RecordId::NULL)?;
            self.set_count(node, n - 1)?;
            return Ok(true);
        }

        if found {
            let left = self.child(node, i)?;
            let right = self.child(node, i + 1)?;
            if self.count(left)? > MIN_KEYS {
                let pred = self.max_key(left)?;
                self.set_key(node, i, pred)?;
                return self.delete_from(left, pred, cmp);
            }
            if self.count(right)? > MIN_KEYS {
                let succ = self.min_key(right)?;
                self.set_key(node, i, succ)?;
                return self.delete_from(right, succ, cmp);
            }
            self.merge(node, i)?;
            return self.delete_from(left, key, cmp);
        }

        if leaf {
            return Ok(false);
        }

        let mut i = i;
        let child = self.child(node, i)?;
        if self.count(child)? == MIN_KEYS {
            if i > 0 && self.count(self.child(node, i - 1)?)? > MIN_KEYS {
                self.rotate_right(node, i)?;
            } else if i < n && self.count(self.child(node, i + 1)?)? > MIN_KEYS {
                self.rotate_left(node, i)?;
            } else if i < n {
                self.merge(node, i)?;
            } else {
                self.merge(node, i - 1)?;
                i -= 1;
            }
        }
        self.delete_from(self.child(node, i)?, key, cmp)
    }

    fn max_key(&self, mut node: RecordId) -> Result<RecordId> {
        while !self.is_leaf(node)? {
            node = self.child(node, self.count(node)?)?;
        }
        let n = self.count(node)?;
        if n == 0 {
            return Err(IndexError::corrupt("empty b-tree node"));
        }
        self.key(node, n - 1)
    }

    fn min_key(&self, mut node: RecordId) -> Result<RecordId> {
        while !self.is_leaf(node)? {
            node = self.child(node, 0)?;
        }
        self.key(node, 0)
    }

    /// Move the last key of child `i - 1` up and the separator down into child `i`.
    fn rotate_right(&self, node: RecordId, i: usize) -> Result<()> {
        let child = self.child(node, i)?;
        let left = self.child(node, i - 1)?;
        let cn = self.count(child)?;
        let ln = self.count(left)?;
        let leaf = self.is_leaf(child)?;

        for j in (0..cn).rev() {
            self.set_key(child, j + 1, self.key(child, j)?)?;
        }
        if !leaf {
            for j in (0..=cn).rev() {
                self.set_child(child, j + 1, self.child(child, j)?)?;
            }
            self.set_child(child, 0, self.child(left, ln)?)?;
            self.set_child(left, ln, RecordId::NULL)?;
        }
        self.set_key(child, 0, self.key(node, i - 1)?)?;
        self.set_key(node, i - 1, self.key(left, ln - 1)?)?;
        self.set_key(left, ln - 1, RecordId::NULL)?;
        self.set_count(left, ln - 1)?;
        self.set_count(child, cn + 1)
    }

    /// Move the first key of child `i + 1` up and the separator down into child `i`.
    fn rotate_left(&self, node: RecordId, i: usize) -> Result<()> {
        let child = self.child(node, i)?;
        let right = self.child(node, i + 1)?;
        let cn = self.count(child)?;
        let rn = self.count(right)?;
        let leaf = self.is_leaf(child)?;

        self.set_key(child, cn, self.key(node, i)?)?;
        if !leaf {
            self.set_child(child, cn + 1, self.child(right, 0)?)?;
        }
        self.set_key(node, i, self.key(right, 0)?)?;
        for j in 0..rn - 1 {
            self.set_key(right, j, self.key(right, j + 1)?)?;
        }
        self.set_key(right, rn - 1, RecordId::NULL)?;
        if !leaf {
            for j in 0..rn {
                self.set_child(right, j, self.child(right, j + 1)?)?;
            }
            self.set_child(right, rn, RecordId::NULL)?;
        }
        self.set_count(right, rn - 1)?;
        self.set_count(child, cn + 1)
    }

    /// Fold child `i + 1` and the separator key `i` into child `i`.
    fn merge(&self, node: RecordId, i: usize) -> Result<()> {
        let left = self.child(node, i)?;
        let right = self.child(node, i + 1)?;
        let ln = self.count(left)?;
        let rn = self.count(right)?;
        let leaf = self.is_leaf(left)?;

        self.set_key(left, ln, self.key(node, i)?)?;
        for j in 0..rn {
            self.set_key(left, ln + 1 + j, self.key(right, j)?)?;
        }
        if !leaf {
            for j in 0..=rn {
                self.set_child(left, ln + 1 + j, self.child(right, j)?)?;
            }
        }
        self.set_count(left, ln + 1 + rn)?;

        let n = self.count(node)?;
        for j in i..n - 1 {
            self.set_key(node, j, self.key(node, j + 1)?)?;
        }
        for j in i + 1..n {
            self.set_child(node, j, self.child(node, j + 1)?)?;
        }
        self.set_key(node, n - 1, RecordId::NULL)?;
        self.set_child(node, n, RecordId::NULL)?;
        self.set_count(node, n - 1)?;
        self.db.free(right)
    }

    /// Free every node of the tree; the stored records are left alone.
    pub fn free_all(&self) -> Result<()> {
        let root = self.root()?;
        if !root.is_null() {
            self.free_node(root)?;
        }
        self.set_root(RecordId::NULL)
    }

    fn free_node(&self, node: RecordId) -> Result<()> {
        if !self.is_leaf(node)? {
            for i in 0..=self.count(node)? {
                self.free_node(self.child(node, i)?)?;
            }
        }
        self.db.free(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Keys are records holding a u32 value at offset 0.
    struct ValueCmp<'a>(&'a Database);

    impl RecordComparator for ValueCmp<'_> {
        fn compare(&self, a: RecordId, b: RecordId) -> Result<Ordering> {
            Ok(self.0.get_u32(a.0)?.cmp(&self.0.get_u32(b.0)?))
        }
    }

    fn value(db: &Database, v: u32) -> RecordId {
        let rec = db.malloc(4).unwrap();
        db.put_u32(rec.0, v).unwrap();
        rec
    }

    fn values(db: &Database, tree: &BTree) -> Vec<u32> {
        tree.records()
            .unwrap()
            .into_iter()
            .map(|r| db.get_u32(r.0).unwrap())
            .collect()
    }

    fn setup() -> (tempfile::TempDir, Database, RecordId) {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("db")).unwrap();
        let anchor = db.malloc(4).unwrap();
        (dir, db, anchor)
    }

    #[test]
    fn test_insert_keeps_order_and_rejects_duplicates() {
        let (_dir, db, anchor) = setup();
        let tree = BTree::new(&db, anchor.0);
        let cmp = ValueCmp(&db);
        for v in (0..200).map(|i| (i * 37) % 200) {
            tree.insert(value(&db, v), &cmp).unwrap();
        }
        let first = tree.find(value(&db, 42), &cmp).unwrap().unwrap();
        let again = tree.insert(value(&db, 42), &cmp).unwrap();
        assert_eq!(first, again);
        assert_eq!(values(&db, &tree), (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn test_delete_rebalances() {
        let (_dir, db, anchor) = setup();
        let tree = BTree::new(&db, anchor.0);
        let cmp = ValueCmp(&db);
        let mut recs = Vec::new();
        for v in 0..300 {
            let rec = value(&db, v);
            tree.insert(rec, &cmp).unwrap();
            recs.push(rec);
        }
        for v in (0..300).filter(|v| v % 3 != 0) {
            assert!(tree.delete(recs[v as usize], &cmp).unwrap());
        }
        assert!(!tree.delete(value(&db, 1), &cmp).unwrap());
        assert_eq!(
            values(&db, &tree),
            (0..300).filter(|v| v % 3 == 0).collect::<Vec<_>>()
        );
        for v in (0..300).filter(|v| v % 3 == 0) {
            assert!(tree.delete(recs[v as usize], &cmp).unwrap());
        }
        assert!(tree.is_empty().unwrap());
    }

    #[test]
    fn test_accept_visits_range_only() {
        struct Range<'a> {
            db: &'a Database,
            lo: u32,
            hi: u32,
            seen: Vec<u32>,
        }
        impl BTreeVisitor for Range<'_> {
            fn compare(&mut self, record: RecordId) -> Result<Ordering> {
                let v = self.db.get_u32(record.0)?;
                Ok(if v < self.lo {
                    Ordering::Less
                } else if v > self.hi {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                })
            }
            fn visit(&mut self, record: RecordId) -> Result<bool> {
                self.seen.push(self.db.get_u32(record.0)?);
                Ok(true)
            }
        }

        let (_dir, db, anchor) = setup();
        let tree = BTree::new(&db, anchor.0);
        let cmp = ValueCmp(&db);
        for v in 0..100 {
            tree.insert(value(&db, v), &cmp).unwrap();
        }
        let mut range = Range {
            db: &db,
            lo: 40,
            hi: 59,
            seen: Vec::new(),
        };
        tree.accept(&mut range).unwrap();
        assert_eq!(range.seen, (40..60).collect::<Vec<_>>());
    }

    #[test]
    fn test_free_all_releases_nodes() {
        let (_dir, db, anchor) = setup();
        let tree = BTree::new(&db, anchor.0);
        let cmp = ValueCmp(&db);
        for v in 0..64 {
            tree.insert(value(&db, v), &cmp).unwrap();
        }
        let before = db.stats().unwrap().free_bytes;
        tree.free_all().unwrap();
        assert!(tree.is_empty().unwrap());
        assert!(db.stats().unwrap().free_bytes > before);
    }
}
