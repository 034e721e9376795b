//! Mock share backend for testing
//!
//! This module provides an in-memory implementation of the session traits. It
//! never touches the network or the disk, which keeps engine tests fast and
//! deterministic, and it can inject the failure modes a busy file server
//! produces.
//!
//! # Features
//!
//! - Configurable connect and attach failures
//! - Transient failures for the first K data operations
//! - Reads that always fail, writes that are silently discarded
//! - Failing delete-on-close for cleanup tests
//! - Operation recording and open-handle accounting
//!
//! # Example
//!
//! ```
//! use tempest::session::{AccessIntent, CreateDisposition, Credentials, ShareConnector};
//! use tempest::session::mock::MockConnector;
//!
//! let connector = MockConnector::new();
//! let mut session = connector.connect("server", &Credentials::default()).unwrap();
//! let tree = session.attach("share").unwrap();
//!
//! let file = tree
//!     .open("data.0", AccessIntent::Write, CreateDisposition::CreateOrOverwrite)
//!     .unwrap();
//! file.write_at(0, &[1u8; 4096]).unwrap();
//! file.close().unwrap();
//!
//! assert_eq!(connector.file_size("data.0"), Some(4096));
//! ```

use super::{
    AccessIntent, CreateDisposition, Credentials, RemoteFile, SessionError, SessionResult,
    ShareConnector, ShareSession, ShareTree,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Kind of operation recorded by the mock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOpKind {
    Open,
    Read,
    Write,
    Flush,
    Close,
    Delete,
}

/// Record of an operation for test verification
#[derive(Debug, Clone)]
pub struct MockOpRecord {
    pub kind: MockOpKind,
    pub path: String,
    pub offset: u64,
    pub length: usize,
}

#[derive(Default)]
struct MockState {
    files: Mutex<HashMap<String, Vec<u8>>>,
    dirs: Mutex<HashSet<String>>,
    ops: Mutex<Vec<MockOpRecord>>,

    connect_failures: AtomicU32,
    fail_attach: AtomicBool,
    transient_failures: AtomicU32,
    fail_reads: AtomicBool,
    fail_directory_create: AtomicBool,
    fail_deletes: AtomicBool,
    discard_writes: AtomicU32,
    latency: Mutex<Option<Duration>>,

    connects: AtomicUsize,
    session_disconnects: AtomicUsize,
    tree_disconnects: AtomicUsize,
    open_handles: AtomicUsize,
}

impl MockState {
    fn record(&self, kind: MockOpKind, path: &str, offset: u64, length: usize) {
        self.ops.lock().unwrap().push(MockOpRecord {
            kind,
            path: path.to_string(),
            offset,
            length,
        });
    }

    fn simulate_latency(&self) {
        let latency = *self.latency.lock().unwrap();
        if let Some(delay) = latency {
            std::thread::sleep(delay);
        }
    }

    /// Consume one injected transient failure, if any remain
    fn take_transient(&self) -> bool {
        self.transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn take_discard(&self) -> bool {
        self.discard_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// In-memory share connector with fault injection
///
/// Clones share the same underlying state, so a test can keep one handle for
/// configuration and inspection while the engine uses another.
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<MockState>,
}

impl MockConnector {
    /// Create a healthy mock share with no injected failures
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` connect attempts (`u32::MAX` fails forever)
    pub fn set_connect_failures(&self, count: u32) {
        self.state.connect_failures.store(count, Ordering::SeqCst);
    }

    /// Make every attach fail
    pub fn set_fail_attach(&self, fail: bool) {
        self.state.fail_attach.store(fail, Ordering::SeqCst);
    }

    /// Fail the next `count` reads/writes with a transient error
    pub fn set_transient_failures(&self, count: u32) {
        self.state.transient_failures.store(count, Ordering::SeqCst);
    }

    /// Make every read fail with a permanent error
    pub fn set_fail_reads(&self, fail: bool) {
        self.state.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make directory creation fail
    pub fn set_fail_directory_create(&self, fail: bool) {
        self.state.fail_directory_create.store(fail, Ordering::SeqCst);
    }

    /// Make delete-on-close fail, leaving the file in place
    pub fn set_fail_deletes(&self, fail: bool) {
        self.state.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Accept the next `count` writes without storing them (the server
    /// "loses" data); `u32::MAX` loses every write
    pub fn set_discard_writes(&self, count: u32) {
        self.state.discard_writes.store(count, Ordering::SeqCst);
    }

    /// Delay every data operation by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.state.latency.lock().unwrap() = latency;
    }

    /// Pre-populate a file
    pub fn insert_file(&self, path: &str, data: Vec<u8>) {
        self.state.files.lock().unwrap().insert(path.to_string(), data);
    }

    pub fn file_size(&self, path: &str) -> Option<u64> {
        self.state.files.lock().unwrap().get(path).map(|d| d.len() as u64)
    }

    pub fn file_count(&self) -> usize {
        self.state.files.lock().unwrap().len()
    }

    pub fn has_directory(&self, path: &str) -> bool {
        self.state.dirs.lock().unwrap().contains(path)
    }

    /// Number of successful connects
    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn session_disconnects(&self) -> usize {
        self.state.session_disconnects.load(Ordering::SeqCst)
    }

    pub fn tree_disconnects(&self) -> usize {
        self.state.tree_disconnects.load(Ordering::SeqCst)
    }

    /// Handles opened but not yet closed
    pub fn open_handles(&self) -> usize {
        self.state.open_handles.load(Ordering::SeqCst)
    }

    /// Copy of all recorded operations
    pub fn operations(&self) -> Vec<MockOpRecord> {
        self.state.ops.lock().unwrap().clone()
    }

    pub fn count_ops(&self, kind: MockOpKind) -> usize {
        self.state.ops.lock().unwrap().iter().filter(|op| op.kind == kind).count()
    }
}

impl ShareConnector for MockConnector {
    fn connect(&self, address: &str, _credentials: &Credentials) -> SessionResult<Box<dyn ShareSession>> {
        let failed = self
            .state
            .connect_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                0 => None,
                u32::MAX => Some(u32::MAX),
                n => Some(n - 1),
            })
            .is_ok();
        if failed {
            return Err(SessionError::Connect {
                address: address.to_string(),
                reason: "connection refused (injected)".to_string(),
            });
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            state: self.state.clone(),
        }))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

struct MockSession {
    state: Arc<MockState>,
}

impl ShareSession for MockSession {
    fn attach(&mut self, share: &str) -> SessionResult<Arc<dyn ShareTree>> {
        if self.state.fail_attach.load(Ordering::SeqCst) {
            return Err(SessionError::Attach {
                share: share.to_string(),
                reason: "access denied (injected)".to_string(),
            });
        }
        Ok(Arc::new(MockTree {
            state: self.state.clone(),
        }))
    }

    fn disconnect(&mut self) -> SessionResult<()> {
        self.state.session_disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MockTree {
    state: Arc<MockState>,
}

impl ShareTree for MockTree {
    fn open(
        &self,
        path: &str,
        access: AccessIntent,
        disposition: CreateDisposition,
    ) -> SessionResult<Box<dyn RemoteFile>> {
        self.state.record(MockOpKind::Open, path, 0, 0);

        match disposition {
            CreateDisposition::OpenOrCreateDirectory => {
                if self.state.fail_directory_create.load(Ordering::SeqCst) {
                    return Err(SessionError::Permanent(format!(
                        "cannot create directory {} (injected)",
                        path
                    )));
                }
                self.state.dirs.lock().unwrap().insert(path.to_string());
            }
            CreateDisposition::CreateOrOverwrite => {
                self.state.files.lock().unwrap().insert(path.to_string(), Vec::new());
            }
            CreateDisposition::OpenExisting => {
                if !self.state.files.lock().unwrap().contains_key(path) {
                    return Err(SessionError::NotFound(path.to_string()));
                }
            }
        }

        self.state.open_handles.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockFile {
            state: self.state.clone(),
            path: path.to_string(),
            delete_on_close: access == AccessIntent::Delete,
        }))
    }

    fn disconnect(&self) -> SessionResult<()> {
        self.state.tree_disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MockFile {
    state: Arc<MockState>,
    path: String,
    delete_on_close: bool,
}

impl RemoteFile for MockFile {
    fn read_at(&self, offset: u64, length: usize) -> SessionResult<Vec<u8>> {
        self.state.simulate_latency();
        self.state.record(MockOpKind::Read, &self.path, offset, length);

        if self.state.take_transient() {
            return Err(SessionError::Transient("read interrupted (injected)".to_string()));
        }
        if self.state.fail_reads.load(Ordering::SeqCst) {
            return Err(SessionError::Permanent("read failed (injected)".to_string()));
        }

        let files = self.state.files.lock().unwrap();
        let data = files
            .get(&self.path)
            .ok_or_else(|| SessionError::NotFound(self.path.clone()))?;
        let start = offset as usize;
        if start >= data.len() {
            return Err(SessionError::EndOfFile);
        }
        let end = (start + length).min(data.len());
        Ok(data[start..end].to_vec())
    }

    fn write_at(&self, offset: u64, data: &[u8]) -> SessionResult<usize> {
        self.state.simulate_latency();
        self.state.record(MockOpKind::Write, &self.path, offset, data.len());

        if self.state.take_transient() {
            return Err(SessionError::Transient("write interrupted (injected)".to_string()));
        }
        if self.state.take_discard() {
            return Ok(data.len());
        }

        let mut files = self.state.files.lock().unwrap();
        let contents = files.entry(self.path.clone()).or_default();
        let start = offset as usize;
        let end = start + data.len();
        if contents.len() < end {
            contents.resize(end, 0);
        }
        contents[start..end].copy_from_slice(data);
        Ok(data.len())
    }

    fn end_of_file(&self) -> SessionResult<u64> {
        let files = self.state.files.lock().unwrap();
        files
            .get(&self.path)
            .map(|d| d.len() as u64)
            .ok_or_else(|| SessionError::NotFound(self.path.clone()))
    }

    fn flush(&self) -> SessionResult<()> {
        self.state.record(MockOpKind::Flush, &self.path, 0, 0);
        Ok(())
    }

    fn close(self: Box<Self>) -> SessionResult<()> {
        self.state.record(MockOpKind::Close, &self.path, 0, 0);
        self.state.open_handles.fetch_sub(1, Ordering::SeqCst);

        if self.delete_on_close {
            if self.state.fail_deletes.load(Ordering::SeqCst) {
                return Err(SessionError::Permanent(format!(
                    "sharing violation deleting {} (injected)",
                    self.path
                )));
            }
            self.state.record(MockOpKind::Delete, &self.path, 0, 0);
            self.state.files.lock().unwrap().remove(&self.path);
        }
        Ok(())
    }
}
