//! Socket plumbing for the HTTP layer.
//!
//! - [`connection`]: the [`Connection`](connection::Connection) view handed to route handlers
//! - `socket`: raw listening sockets, accept, read, send and close

pub mod connection;
pub(crate) mod socket;
