//! Discovery of instance directories under the game root.

use crate::error::{InstanceError, Result};
use common::InstanceId;
use std::path::Path;
use tracing::debug;

/// List immediate subdirectories of `root` whose names start with `prefix`.
///
/// Order is whatever the directory iterator yields; callers must not rely
/// on it being stable across scans. No caching, no side effects.
pub fn scan(root: &Path, prefix: &str) -> Result<Vec<InstanceId>> {
    let entries = std::fs::read_dir(root).map_err(|e| InstanceError::io(root, e))?;

    let mut ids = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| InstanceError::io(root, e))?;
        let file_type = entry.file_type().map_err(|e| InstanceError::io(entry.path(), e))?;
        if !file_type.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with(prefix) {
            ids.push(InstanceId::new(name));
        }
    }

    debug!(root = %root.display(), count = ids.len(), "instance scan complete");
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_returns_only_prefixed_directories() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("game01")).unwrap();
        std::fs::create_dir(root.path().join("game02")).unwrap();
        std::fs::create_dir(root.path().join("backup")).unwrap();
        // A plain file with the prefix must not qualify.
        std::fs::write(root.path().join("game03"), b"not a dir").unwrap();

        let mut ids = scan(root.path(), "game").unwrap();
        ids.sort();

        assert_eq!(ids, vec![InstanceId::new("game01"), InstanceId::new("game02")]);
    }

    #[test]
    fn scan_of_empty_root_is_empty() {
        let root = tempfile::tempdir().unwrap();
        assert!(scan(root.path(), "game").unwrap().is_empty());
    }

    #[test]
    fn scan_fails_on_unreadable_root() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("does-not-exist");

        let err = scan(&missing, "game").unwrap_err();
        assert!(matches!(err, InstanceError::Io { .. }));
    }
}
