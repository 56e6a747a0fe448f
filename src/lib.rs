//! Single-threaded `poll(2)` reactor with a minimal HTTP routing layer.
//!
//! # Architecture
//!
//! - **Reactor**: owns a table of descriptor registrations, waits on `poll(2)`
//!   and calls each ready descriptor's [`EventHandler`]
//! - **HttpServer**: registers a listening socket, drains accepts, and
//!   registers every client for read readiness
//! - **Router**: reads one request, tokenizes the request line and hands the
//!   raw bytes to the first route whose path matches exactly, or answers 400/404
//! - **Builders**: [`ReactorBuilder`] and [`ServerBuilder`] for configuration
//!
//! Everything runs on the thread that calls [`Reactor::run`]. Handlers run to
//! completion one after another and must never block.

mod builder;
mod error;
pub mod http;
pub mod net;
pub mod reactor;

pub use builder::{DEFAULT_PORT, DEFAULT_READ_BUFFER_SIZE, ReactorBuilder, ServerBuilder};
pub use error::{Error, Result};
pub use http::response::{DEFAULT_BARE_BODY, Response};
pub use http::router::RouteHandler;
pub use http::server::HttpServer;
pub use net::connection::Connection;
pub use reactor::core::{EventHandler, Reactor};
pub use reactor::interest::{Interest, Ready};
