//! Policy table persistence
//!
//! A table is stored as one JSON blob per agent name at `<dir>/<name>.agent`.
//! Writes go to a temporary sibling first and are renamed into place, so a
//! reader never observes a partially written table.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::error::Result;
use crate::policy::PolicyTable;
use crate::state::Action;

const BLOB_EXTENSION: &str = "agent";

/// Location of the blob for an agent name
pub fn blob_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{BLOB_EXTENSION}"))
}

/// Write a table under `name`, replacing any previous blob
pub async fn write_table<A: Action>(
    dir: &Path,
    name: &str,
    table: &PolicyTable<A>,
) -> Result<PathBuf> {
    let path = blob_path(dir, name);
    let tmp = dir.join(format!("{name}.{BLOB_EXTENSION}.tmp"));
    let body = serde_json::to_vec(table)?;

    fs::create_dir_all(dir).await?;
    fs::write(&tmp, &body).await?;
    if let Err(e) = fs::rename(&tmp, &path).await {
        if let Err(cleanup) = fs::remove_file(&tmp).await {
            warn!("Failed to remove {:?}: {}", tmp, cleanup);
        }
        return Err(e.into());
    }

    debug!("Wrote {} states ({} bytes) to {:?}", table.len(), body.len(), path);
    Ok(path)
}

/// Read the table stored under `name`. A missing blob yields `None`.
pub async fn read_table<A: Action>(dir: &Path, name: &str) -> Result<Option<PolicyTable<A>>> {
    let path = blob_path(dir, name);
    let body = match fs::read(&path).await {
        Ok(body) => body,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No stored table at {:?}", path);
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let table: PolicyTable<A> = serde_json::from_slice(&body)?;
    debug!("Read {} states from {:?}", table.len(), path);
    Ok(Some(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QLearnError;
    use crate::state::State;
    use serde_json::json;

    #[test]
    fn test_blob_path() {
        let path = blob_path(Path::new("/tmp/agents"), "player-agent-1");
        assert_eq!(path, PathBuf::from("/tmp/agents/player-agent-1.agent"));
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = PolicyTable::new();
        table.update(&State::new(json!("A")), &1u32, 3.0, &[0, 1]);
        table.update(&State::new(json!({"x": 1})), &0u32, -0.3, &[0, 1]);

        let path = write_table(dir.path(), "test", &table).await.unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("test.agent.tmp").exists());

        let loaded: PolicyTable<u32> = read_table(dir.path(), "test").await.unwrap().unwrap();
        assert_eq!(loaded, table);
    }

    #[tokio::test]
    async fn test_failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // a non-empty directory at the target path makes the rename fail
        let target = blob_path(dir.path(), "blocked");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("occupied"), "x").unwrap();

        let table: PolicyTable<u32> = PolicyTable::new();
        let result = write_table(dir.path(), "blocked", &table).await;

        assert!(matches!(result, Err(QLearnError::Io(_))));
        assert!(!dir.path().join("blocked.agent.tmp").exists());
    }

    #[tokio::test]
    async fn test_read_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded: Option<PolicyTable<u32>> = read_table(dir.path(), "absent").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_read_reward_keyed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let body = r#"{"\"A\"":[{"action":1,"reward":3},{"action":0,"reward":0}]}"#;
        std::fs::write(dir.path().join("legacy.agent"), body).unwrap();

        let loaded: PolicyTable<u32> = read_table(dir.path(), "legacy").await.unwrap().unwrap();
        let best = loaded.best(r#""A""#).unwrap();
        assert_eq!(best.action, 1);
        assert_eq!(best.value, 3.0);
    }

    #[tokio::test]
    async fn test_read_malformed_is_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.agent"), "{not json").unwrap();

        let result: Result<Option<PolicyTable<u32>>> = read_table(dir.path(), "broken").await;
        assert!(matches!(result, Err(QLearnError::Serialization(_))));
    }
}
