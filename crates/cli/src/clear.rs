use std::path::{Path, PathBuf};
use symdex_core::IndexConfig;
use tracing::info;

pub fn run(path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = path {
        info!("Clearing index at: {}...", path.display());
        if path.is_file() {
            std::fs::remove_file(&path)?;
            println!("Removed {}", path.display());
        } else {
            println!("No index at {}", path.display());
        }
    } else {
        let base = IndexConfig::base_index_dir();
        info!("Clearing all indices at: {}...", base.display());
        let removed = clear_dir(&base)?;
        println!("Removed {} index files from {}", removed, base.display());
    }
    Ok(())
}

/// Remove every `*.symdex` file directly under `dir`.
fn clear_dir(dir: &Path) -> std::io::Result<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "symdex") {
            std::fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_dir_only_removes_index_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.symdex"), b"").unwrap();
        std::fs::write(dir.path().join("b.symdex"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        assert_eq!(clear_dir(dir.path()).unwrap(), 2);
        assert!(dir.path().join("notes.txt").exists());
        assert_eq!(clear_dir(&dir.path().join("missing")).unwrap(), 0);
    }
}
