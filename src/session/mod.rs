//! Remote file session abstraction
//!
//! This module defines the capability the load engine consumes to talk to a
//! network file share. The wire protocol itself (negotiation, session setup,
//! tree connect, per-operation framing) lives behind these traits; the engine
//! only ever sees a connector, a session, a tree and open file handles.
//!
//! # Layers
//!
//! - **ShareConnector**: establishes an authenticated [`ShareSession`] to a server
//! - **ShareSession**: one authenticated attachment, able to attach to shares
//! - **ShareTree**: an attached share, able to open files and directories
//! - **RemoteFile**: an open handle supporting positioned reads and writes
//!
//! Every operation is synchronous and may fail with a transient or permanent
//! [`SessionError`]. End of file is reported as [`SessionError::EndOfFile`] and
//! is a loop sentinel rather than a failure.
//!
//! # Backends
//!
//! - [`local::LocalConnector`]: a share mounted on the local filesystem
//! - [`mock::MockConnector`]: in-memory share with fault injection (tests)

pub mod local;
pub mod mock;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by remote file operations
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Connection to {address} failed: {reason}")]
    Connect { address: String, reason: String },

    #[error("Attach to share '{share}' failed: {reason}")]
    Attach { share: String, reason: String },

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("End of file")]
    EndOfFile,

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Permanent failure: {0}")]
    Permanent(String),

    #[error("File size mismatch: expected {expected}, got {actual}")]
    ShortFile { expected: u64, actual: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Whether a retry has a reasonable chance of succeeding
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionError::Transient(_) | SessionError::ShortFile { .. } | SessionError::Io(_)
        )
    }

    /// Whether this is the end-of-file sentinel
    pub fn is_end_of_file(&self) -> bool {
        matches!(self, SessionError::EndOfFile)
    }
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Access requested when opening a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessIntent {
    Read,
    Write,
    ReadWrite,
    /// Open for deletion; the path is removed when the handle closes
    Delete,
}

/// What to do when the opened path does or does not exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateDisposition {
    /// Fail with `NotFound` if the file does not exist
    OpenExisting,
    /// Create the file, truncating any existing content
    CreateOrOverwrite,
    /// Open the directory, creating it if missing (idempotent)
    OpenOrCreateDirectory,
}

/// Credentials presented when establishing a session
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Establishes authenticated sessions against a server
///
/// One connector is shared by every session task of a run, so it must be
/// `Send + Sync`. Each call to `connect` yields an independent session.
pub trait ShareConnector: Send + Sync {
    /// Connect and authenticate to `address`
    fn connect(&self, address: &str, credentials: &Credentials) -> SessionResult<Box<dyn ShareSession>>;

    /// Short backend name for logs and summaries
    fn name(&self) -> &'static str;
}

/// One authenticated session, owned by exactly one session task
pub trait ShareSession: Send {
    /// Attach to the named share
    fn attach(&mut self, share: &str) -> SessionResult<Arc<dyn ShareTree>>;

    /// Release the session and its connection
    fn disconnect(&mut self) -> SessionResult<()>;
}

/// An attached share
///
/// Trees are `Sync` so that a bounded group of scoped threads belonging to one
/// task can issue operations on it concurrently.
pub trait ShareTree: Send + Sync {
    /// Open `path` with the given access intent and create disposition
    fn open(
        &self,
        path: &str,
        access: AccessIntent,
        disposition: CreateDisposition,
    ) -> SessionResult<Box<dyn RemoteFile>>;

    /// Detach from the share
    fn disconnect(&self) -> SessionResult<()>;
}

/// An open file or directory handle
pub trait RemoteFile: Send + Sync {
    /// Read up to `length` bytes at `offset`
    ///
    /// Returns an empty buffer or `SessionError::EndOfFile` at end of file.
    fn read_at(&self, offset: u64, length: usize) -> SessionResult<Vec<u8>>;

    /// Write `data` at `offset`, returning the number of bytes accepted
    fn write_at(&self, offset: u64, data: &[u8]) -> SessionResult<usize>;

    /// Current end-of-file position
    fn end_of_file(&self) -> SessionResult<u64>;

    /// Flush buffered data to the server
    fn flush(&self) -> SessionResult<()>;

    /// Close the handle, applying delete-on-close if requested at open time
    fn close(self: Box<Self>) -> SessionResult<()>;
}

/// Join a directory and a file name into a share-relative path
pub fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    }
}

/// Run `f` against an open handle and close it on every exit path
///
/// The result of `f` takes precedence over a close failure, which is only
/// surfaced when `f` itself succeeded.
pub fn with_file<T>(
    file: Box<dyn RemoteFile>,
    f: impl FnOnce(&dyn RemoteFile) -> SessionResult<T>,
) -> SessionResult<T> {
    let result = f(file.as_ref());
    let closed = file.close();
    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            tracing::debug!("Close after failed operation also failed: {}", close_err);
            Err(e)
        }
    }
}
