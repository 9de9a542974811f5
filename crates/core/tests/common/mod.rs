#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use symdex_api::{BuiltinType, Entity, EntityKind, LinkageId, RecordId, TypeRef};
use symdex_core::{IndexConfig, SymbolIndex};
use symdex_cpp::CppLinkage;
use tempfile::TempDir;

pub const CPP: LinkageId = LinkageId::CPP;

pub struct Fixture {
    pub dir: TempDir,
    pub index: SymbolIndex,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(IndexConfig::default())
    }

    pub fn with_config(config: IndexConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let index = open_cpp(&dir.path().join("index.db"), config);
        Self { dir, index }
    }

    pub fn path(&self) -> std::path::PathBuf {
        self.dir.path().join("index.db")
    }

    /// Add `entity`, expecting it to be indexed.
    pub fn add(&self, entity: &Entity) -> RecordId {
        self.index
            .add_binding(&CPP, entity)
            .unwrap()
            .unwrap_or_else(|| panic!("{} was not indexed", entity.name))
    }

    pub fn qualified(&self, name: &str) -> Vec<RecordId> {
        self.index.lookup_qualified(&CPP, name).unwrap()
    }

    pub fn one(&self, name: &str) -> RecordId {
        let found = self.qualified(name);
        assert_eq!(found.len(), 1, "expected exactly one {}", name);
        found[0]
    }
}

pub fn open_cpp(path: &Path, config: IndexConfig) -> SymbolIndex {
    let index = SymbolIndex::open(path, config).unwrap();
    index.register_linkage(Arc::new(CppLinkage)).unwrap();
    index
}

pub fn namespace(name: &str, owner: Option<&Entity>) -> Entity {
    let builder = Entity::builder(EntityKind::Namespace, name);
    match owner {
        Some(owner) => builder.owner(owner).build(),
        None => builder.build(),
    }
}

pub fn int() -> TypeRef {
    TypeRef::builtin(BuiltinType::Int)
}

pub fn double() -> TypeRef {
    TypeRef::builtin(BuiltinType::Double)
}

pub fn sorted(mut records: Vec<RecordId>) -> Vec<RecordId> {
    records.sort();
    records
}
