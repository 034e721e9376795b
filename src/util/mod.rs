//! Shared utilities: retry, client identity, logging, payloads, formatting

pub mod buffer;
pub mod identity;
pub mod logging;
pub mod retry;
pub mod time;
