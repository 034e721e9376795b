//! Mounted-share backend
//!
//! Treats `<address>/<share>` as the root of a share that the operating system
//! has already mounted (kernel SMB or NFS client). Sessions and trees are
//! lightweight here, but every file operation goes through the mount and so
//! still exercises the remote server.

use super::{
    AccessIntent, CreateDisposition, Credentials, RemoteFile, SessionError, SessionResult,
    ShareConnector, ShareSession, ShareTree,
};
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::os::unix::fs::FileExt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Connector for shares mounted on the local filesystem
#[derive(Debug, Default, Clone)]
pub struct LocalConnector;

impl LocalConnector {
    pub fn new() -> Self {
        Self
    }
}

impl ShareConnector for LocalConnector {
    fn connect(&self, address: &str, _credentials: &Credentials) -> SessionResult<Box<dyn ShareSession>> {
        let root = PathBuf::from(address);
        match fs::metadata(&root) {
            Ok(meta) if meta.is_dir() => Ok(Box::new(LocalSession { root })),
            Ok(_) => Err(SessionError::Connect {
                address: address.to_string(),
                reason: "not a directory".to_string(),
            }),
            Err(e) => Err(SessionError::Connect {
                address: address.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

struct LocalSession {
    root: PathBuf,
}

impl ShareSession for LocalSession {
    fn attach(&mut self, share: &str) -> SessionResult<Arc<dyn ShareTree>> {
        let share_root = self.root.join(share);
        match fs::metadata(&share_root) {
            Ok(meta) if meta.is_dir() => Ok(Arc::new(LocalTree { root: share_root })),
            Ok(_) => Err(SessionError::Attach {
                share: share.to_string(),
                reason: "not a directory".to_string(),
            }),
            Err(e) => Err(SessionError::Attach {
                share: share.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn disconnect(&mut self) -> SessionResult<()> {
        Ok(())
    }
}

struct LocalTree {
    root: PathBuf,
}

impl LocalTree {
    /// Resolve a share-relative path, refusing anything that escapes the share
    fn resolve(&self, path: &str) -> SessionResult<PathBuf> {
        let relative = Path::new(path);
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(SessionError::Permanent(format!(
                        "path escapes share root: {}",
                        path
                    )))
                }
            }
        }
        Ok(self.root.join(relative))
    }
}

impl ShareTree for LocalTree {
    fn open(
        &self,
        path: &str,
        access: AccessIntent,
        disposition: CreateDisposition,
    ) -> SessionResult<Box<dyn RemoteFile>> {
        let full = self.resolve(path)?;

        if disposition == CreateDisposition::OpenOrCreateDirectory {
            fs::create_dir_all(&full)?;
            return Ok(Box::new(LocalFile {
                path: full,
                file: None,
                delete_on_close: false,
            }));
        }

        let mut options = OpenOptions::new();
        match access {
            AccessIntent::Read | AccessIntent::Delete => {
                options.read(true);
            }
            AccessIntent::Write => {
                options.write(true);
            }
            AccessIntent::ReadWrite => {
                options.read(true).write(true);
            }
        }
        if disposition == CreateDisposition::CreateOrOverwrite {
            options.write(true).create(true).truncate(true);
        }

        let file = options.open(&full).map_err(|e| match e.kind() {
            ErrorKind::NotFound => SessionError::NotFound(path.to_string()),
            _ => SessionError::Io(e),
        })?;

        Ok(Box::new(LocalFile {
            path: full,
            file: Some(file),
            delete_on_close: access == AccessIntent::Delete,
        }))
    }

    fn disconnect(&self) -> SessionResult<()> {
        Ok(())
    }
}

struct LocalFile {
    path: PathBuf,
    /// `None` for directory handles
    file: Option<File>,
    delete_on_close: bool,
}

impl LocalFile {
    fn file(&self) -> SessionResult<&File> {
        self.file.as_ref().ok_or_else(|| {
            SessionError::Permanent(format!("{} is a directory handle", self.path.display()))
        })
    }
}

impl RemoteFile for LocalFile {
    fn read_at(&self, offset: u64, length: usize) -> SessionResult<Vec<u8>> {
        let mut buf = vec![0u8; length];
        let n = self.file()?.read_at(&mut buf, offset)?;
        if n == 0 && length > 0 {
            return Err(SessionError::EndOfFile);
        }
        buf.truncate(n);
        Ok(buf)
    }

    fn write_at(&self, offset: u64, data: &[u8]) -> SessionResult<usize> {
        Ok(self.file()?.write_at(data, offset)?)
    }

    fn end_of_file(&self) -> SessionResult<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    fn flush(&self) -> SessionResult<()> {
        match &self.file {
            Some(file) => Ok(file.sync_data()?),
            None => Ok(()),
        }
    }

    fn close(self: Box<Self>) -> SessionResult<()> {
        let LocalFile { path, file, delete_on_close } = *self;
        drop(file);
        if delete_on_close {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn attach(dir: &TempDir) -> Arc<dyn ShareTree> {
        fs::create_dir(dir.path().join("share")).unwrap();
        let connector = LocalConnector::new();
        let mut session = connector
            .connect(dir.path().to_str().unwrap(), &Credentials::default())
            .unwrap();
        session.attach("share").unwrap()
    }

    #[test]
    fn test_connect_missing_root() {
        let connector = LocalConnector::new();
        let result = connector.connect("/nonexistent/tempest/root", &Credentials::default());
        assert!(matches!(result, Err(SessionError::Connect { .. })));
    }

    #[test]
    fn test_attach_missing_share() {
        let dir = TempDir::new().unwrap();
        let connector = LocalConnector::new();
        let mut session = connector
            .connect(dir.path().to_str().unwrap(), &Credentials::default())
            .unwrap();
        assert!(matches!(session.attach("nope"), Err(SessionError::Attach { .. })));
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let tree = attach(&dir);

        tree.open("client", AccessIntent::ReadWrite, CreateDisposition::OpenOrCreateDirectory)
            .unwrap()
            .close()
            .unwrap();

        let file = tree
            .open("client/data.0", AccessIntent::ReadWrite, CreateDisposition::CreateOrOverwrite)
            .unwrap();
        assert_eq!(file.write_at(0, b"hello world").unwrap(), 11);
        file.flush().unwrap();
        assert_eq!(file.end_of_file().unwrap(), 11);
        file.close().unwrap();

        let file = tree
            .open("client/data.0", AccessIntent::Read, CreateDisposition::OpenExisting)
            .unwrap();
        assert_eq!(file.read_at(6, 64).unwrap(), b"world");
        assert!(file.read_at(11, 64).unwrap_err().is_end_of_file());
        file.close().unwrap();
    }

    #[test]
    fn test_open_missing_file() {
        let dir = TempDir::new().unwrap();
        let tree = attach(&dir);
        let result = tree.open("missing", AccessIntent::Read, CreateDisposition::OpenExisting);
        assert!(matches!(result, Err(SessionError::NotFound(_))));
    }

    #[test]
    fn test_delete_on_close() {
        let dir = TempDir::new().unwrap();
        let tree = attach(&dir);
        tree.open("victim", AccessIntent::Write, CreateDisposition::CreateOrOverwrite)
            .unwrap()
            .close()
            .unwrap();
        assert!(dir.path().join("share/victim").exists());

        tree.open("victim", AccessIntent::Delete, CreateDisposition::OpenExisting)
            .unwrap()
            .close()
            .unwrap();
        assert!(!dir.path().join("share/victim").exists());
    }

    #[test]
    fn test_path_escape_rejected() {
        let dir = TempDir::new().unwrap();
        let tree = attach(&dir);
        let result = tree.open("../outside", AccessIntent::Write, CreateDisposition::CreateOrOverwrite);
        assert!(matches!(result, Err(SessionError::Permanent(_))));
    }
}
