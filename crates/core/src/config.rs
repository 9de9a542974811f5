use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use xxhash_rust::xxh3::xxh3_64;

pub const DEFAULT_INDEX_DIR: &str = ".symdex/indices";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct IndexConfig {
    /// Scopes whose derived name map is kept; exceeding it drops every entry.
    pub name_cache_capacity: usize,
    /// Templates whose instance map is kept in memory.
    pub instance_cache_capacity: usize,
    pub synthesize_implicit_members: bool,
    /// fsync after writing dirty chunks.
    pub sync_on_flush: bool,
    pub log_dir: Option<PathBuf>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name_cache_capacity: 1024,
            instance_cache_capacity: 4096,
            synthesize_implicit_members: true,
            sync_on_flush: true,
            log_dir: None,
        }
    }
}

impl IndexConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: IndexConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `SYMDEX_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(value) = env_var("SYMDEX_NAME_CACHE_CAPACITY") {
            config.name_cache_capacity = parse_env("SYMDEX_NAME_CACHE_CAPACITY", &value)?;
        }
        if let Some(value) = env_var("SYMDEX_INSTANCE_CACHE_CAPACITY") {
            config.instance_cache_capacity = parse_env("SYMDEX_INSTANCE_CACHE_CAPACITY", &value)?;
        }
        if let Some(value) = env_var("SYMDEX_SYNTHESIZE_IMPLICIT") {
            config.synthesize_implicit_members = parse_env("SYMDEX_SYNTHESIZE_IMPLICIT", &value)?;
        }
        if let Some(value) = env_var("SYMDEX_LOG_DIR") {
            config.log_dir = Some(PathBuf::from(value));
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.name_cache_capacity == 0 || self.instance_cache_capacity == 0 {
            return Err(IndexError::Config(
                "cache capacities must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Gets the base directory for storing indices, supporting SYMDEX_INDEX_DIR env var.
    pub fn base_index_dir() -> PathBuf {
        if let Some(dir) = env_var("SYMDEX_INDEX_DIR") {
            return PathBuf::from(dir);
        }
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(DEFAULT_INDEX_DIR)
    }

    /// Stable index file location for a project root.
    pub fn index_path_for(project_root: &Path) -> PathBuf {
        let canonical = project_root
            .canonicalize()
            .unwrap_or_else(|_| project_root.to_path_buf());
        let hash = xxh3_64(canonical.to_string_lossy().as_bytes());
        Self::base_index_dir().join(format!("{:016x}.symdex", hash))
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| IndexError::Config(format!("invalid value `{}` for {}", value, name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("symdex.json");
        std::fs::write(&path, r#"{ "name_cache_capacity": 8, "sync_on_flush": false }"#).unwrap();

        let config = IndexConfig::load(&path).unwrap();
        assert_eq!(config.name_cache_capacity, 8);
        assert!(!config.sync_on_flush);
        assert_eq!(config.instance_cache_capacity, 4096);
        assert!(config.synthesize_implicit_members);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("symdex.json");
        std::fs::write(&path, r#"{ "instance_cache_capacity": 0 }"#).unwrap();
        assert!(matches!(
            IndexConfig::load(&path),
            Err(IndexError::Config(_))
        ));
    }

    #[test]
    fn test_index_path_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let a = IndexConfig::index_path_for(dir.path());
        let b = IndexConfig::index_path_for(dir.path());
        assert_eq!(a, b);
        assert!(a.to_string_lossy().ends_with(".symdex"));
    }
}
