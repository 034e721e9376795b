//! Persistent client identity
//!
//! Each client host keeps a UUID in a small text file. The value names the
//! client's working directory on the share, so repeated runs from the same host
//! reuse one directory and concurrent hosts never collide.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// Default file holding the client UUID
pub const DEFAULT_CLIENT_ID_FILE: &str = "client_uuid.txt";

/// Load the client UUID from `path`, creating and persisting one if needed
///
/// An existing non-empty file is returned as-is (trimmed). A missing or empty
/// file gets a freshly generated v4 UUID written to it.
pub fn load_or_create_client_id(path: &Path) -> Result<String> {
    if path.exists() {
        let stored = fs::read_to_string(path)
            .with_context(|| format!("Failed to read client id file: {}", path.display()))?;
        let stored = stored.trim();
        if !stored.is_empty() {
            return Ok(stored.to_string());
        }
    }

    let id = Uuid::new_v4().to_string();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create directory for client id: {}", parent.display())
            })?;
        }
    }
    fs::write(path, &id)
        .with_context(|| format!("Failed to write client id file: {}", path.display()))?;
    tracing::info!("Generated new client id {} ({})", id, path.display());
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_and_reuses_id() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("client_uuid.txt");

        let first = load_or_create_client_id(&path).unwrap();
        assert!(Uuid::parse_str(&first).is_ok());
        assert!(path.exists());

        let second = load_or_create_client_id(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_existing_value_trimmed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("id");
        fs::write(&path, "  my-client \n").unwrap();

        assert_eq!(load_or_create_client_id(&path).unwrap(), "my-client");
    }

    #[test]
    fn test_empty_file_regenerated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("id");
        fs::write(&path, "\n").unwrap();

        let id = load_or_create_client_id(&path).unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_eq!(fs::read_to_string(&path).unwrap(), id);
    }

    #[test]
    fn test_nested_directory_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state/nested/id");
        let id = load_or_create_client_id(&path).unwrap();
        assert!(!id.is_empty());
        assert!(path.exists());
    }
}
