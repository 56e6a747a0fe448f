//! Fluent builders for reactor and server construction.
//!
//! Every setting has a default matching the plain constructors, so
//! `ReactorBuilder::new().build()` is the same as `Reactor::new()`.

use crate::error::Result;
use crate::http::response::{DEFAULT_BARE_BODY, Response};
use crate::http::server::{HttpServer, ServerConfig};
use crate::net::socket::Socket;
use crate::reactor::core::{DEFAULT_POLL_TIMEOUT, Reactor};
use crate::reactor::registry::INITIAL_CAPACITY;

use std::net::Ipv4Addr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;

/// Builder for [`Reactor`] instances.
///
/// # Example
/// ```ignore
/// let reactor = ReactorBuilder::new()
///     .capacity(128)
///     .poll_timeout(Duration::from_millis(250))
///     .build()?;
/// ```
pub struct ReactorBuilder {
    capacity: usize,
    poll_timeout: Duration,
}

impl Default for ReactorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReactorBuilder {
    /// Creates a builder with the default capacity (64) and poll timeout
    /// (one second).
    ///
    /// # Returns
    /// A builder whose [`build`](Self::build) yields the same reactor as
    /// [`Reactor::new`].
    pub fn new() -> Self {
        Self {
            capacity: INITIAL_CAPACITY,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    /// Initial registration table capacity. Doubles whenever it fills up.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// How long each iteration of [`Reactor::run`] waits for readiness.
    ///
    /// This only bounds how long the loop sleeps; it is not a deadline for
    /// any descriptor.
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Creates the reactor.
    ///
    /// # Errors
    /// [`Error::TableGrowth`](crate::Error::TableGrowth) if the initial table
    /// cannot be allocated.
    pub fn build(self) -> Result<Reactor> {
        Reactor::with_config(self.capacity, self.poll_timeout)
    }
}

/// Builder for [`HttpServer`] instances.
///
/// # Example
/// ```ignore
/// let server = ServerBuilder::new(0)
///     .host(Ipv4Addr::LOCALHOST)
///     .read_buffer_size(1024)
///     .build(&mut reactor)?;
/// println!("listening on {}", server.local_addr());
/// ```
pub struct ServerBuilder {
    host: Ipv4Addr,
    port: u16,
    backlog: i32,
    read_buffer_size: usize,
    bare_body: String,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PORT)
    }
}

impl ServerBuilder {
    /// Creates a builder for a server on `port`.
    ///
    /// # Arguments
    /// * `port` - Port to bind; `0` lets the kernel pick one.
    ///
    /// # Returns
    /// A builder bound to all interfaces with a `SOMAXCONN` backlog, a
    /// 4096-byte read buffer and the default bare-mode body.
    pub fn new(port: u16) -> Self {
        Self {
            host: Ipv4Addr::UNSPECIFIED,
            port,
            backlog: libc::SOMAXCONN,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            bare_body: DEFAULT_BARE_BODY.to_owned(),
        }
    }

    /// Address to bind. Defaults to all interfaces.
    pub fn host(mut self, host: Ipv4Addr) -> Self {
        self.host = host;
        self
    }

    /// Replaces the port given to [`new`](Self::new).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Pending-connection queue length passed to `listen(2)`.
    ///
    /// The kernel may clamp it. Defaults to `SOMAXCONN`.
    pub fn backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Size of the per-read buffer. Requests longer than this minus one
    /// byte are truncated.
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(2);
        self
    }

    /// Body served in bare mode, before any route is added.
    pub fn bare_body(mut self, body: impl Into<String>) -> Self {
        self.bare_body = body.into();
        self
    }

    /// Opens the listening socket and registers it with `reactor`.
    ///
    /// Nothing stays open or registered if any step fails.
    pub fn build(self, reactor: &mut Reactor) -> Result<HttpServer> {
        let listener = Socket::listen(self.host, self.port, self.backlog)?;
        let config = ServerConfig {
            read_buffer_size: self.read_buffer_size,
            bare_response: Response::ok().body(self.bare_body).to_bytes(),
        };

        HttpServer::listen(reactor, listener, config)
    }
}
