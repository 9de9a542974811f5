pub mod btree;
pub mod database;

pub use btree::{BTree, BTreeVisitor, RecordComparator};
pub use database::{CHUNK_SIZE, Database, DatabaseStats, header};
