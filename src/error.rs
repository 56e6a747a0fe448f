//! Error type shared by the reactor and the HTTP layer.
//!
//! Only setup failures surface here. Per-connection and protocol errors are
//! handled where they occur and never reach the caller.

use std::collections::TryReserveError;
use std::io;
use std::os::fd::RawFd;

use thiserror::Error;

/// Errors produced while building or mutating reactor and server state.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to grow registration table to {capacity} entries")]
    TableGrowth {
        capacity: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("failed to allocate poll set for {entries} descriptors")]
    PollSet {
        entries: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("invalid descriptor {0}")]
    InvalidDescriptor(RawFd),

    #[error("descriptor {0} is not registered")]
    NotRegistered(RawFd),

    #[error("{op} failed: {source}")]
    Socket {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("route path must not be empty")]
    EmptyRoutePath,

    #[error("failed to grow route table to {capacity} entries")]
    RouteTableGrowth {
        capacity: usize,
        #[source]
        source: TryReserveError,
    },
}

impl Error {
    /// Wraps the current `errno` as a socket error for the named call.
    pub(crate) fn last_os(op: &'static str) -> Self {
        Self::Socket {
            op,
            source: io::Error::last_os_error(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
