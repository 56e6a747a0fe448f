//! HTTP server on top of the reactor.
//!
//! The server owns a listening socket and a route table. It installs two
//! reactor handlers:
//! - an accept handler on the listener, which drains the backlog and
//!   registers each client for read readiness;
//! - a client handler, shared by every connection, which performs a single
//!   read, parses the request line and routes it.
//!
//! Connection states: awaiting data, then either dispatched to a route
//! handler, or answered with a fixed 400/404 (or the bare-mode 200) and
//! closed, or closed silently on EOF, a read error, or once the server has
//! been shut down.

use crate::builder::ServerBuilder;
use crate::error::{Error, Result};
use crate::http::request::RequestLine;
use crate::http::response::{BAD_REQUEST, NOT_FOUND};
use crate::http::router::{RouteHandler, RouteTable};
use crate::net::connection::{Connection, close_registered, respond_and_close};
use crate::net::socket::{self, Socket};
use crate::reactor::core::{EventHandler, Reactor};
use crate::reactor::event::{is_would_block, set_nonblocking};
use crate::reactor::interest::{Interest, Ready};

use std::cell::RefCell;
use std::mem;
use std::net::SocketAddr;
use std::os::fd::RawFd;
use std::rc::Rc;
use tracing::{debug, error, info, trace, warn};

pub(crate) struct ServerConfig {
    pub(crate) read_buffer_size: usize,
    pub(crate) bare_response: Vec<u8>,
}

struct ServerInner {
    listener: RefCell<Option<Socket>>,
    listen_fd: RawFd,
    local_addr: SocketAddr,
    routing: RefCell<Routing>,
    config: ServerConfig,
}

enum Routing {
    /// No route added yet; every request gets the bare response.
    Bare,
    Table(RouteTable),
    /// Shut down; late requests are dropped unanswered.
    Closed,
}

enum Outcome {
    Bare,
    BadRequest,
    NotFound,
    Closed,
    Route(Rc<dyn RouteHandler>),
}

impl ServerInner {
    fn route(&self, request: &[u8], fd: RawFd) -> Outcome {
        let routing = self.routing.borrow();
        let routes = match &*routing {
            Routing::Table(routes) => routes,
            Routing::Bare => return Outcome::Bare,
            Routing::Closed => return Outcome::Closed,
        };

        let line = match RequestLine::parse(request) {
            Ok(line) => line,
            Err(err) => {
                debug!(fd, ?err, "malformed request line");
                return Outcome::BadRequest;
            }
        };

        let method = line.method.escape_ascii();
        let path = line.path.escape_ascii();
        match routes.find(line.path) {
            Some(handler) => {
                debug!(fd, %method, %path, "dispatching request");
                Outcome::Route(handler)
            }
            None => {
                debug!(fd, %method, %path, "no route");
                Outcome::NotFound
            }
        }
    }
}

struct AcceptHandler {
    server: Rc<ServerInner>,
    client: Rc<dyn EventHandler>,
}

impl EventHandler for AcceptHandler {
    fn on_ready(&self, reactor: &mut Reactor, fd: RawFd, _ready: Ready) {
        let mut accepted = 0usize;

        loop {
            let client = match socket::accept_client(fd) {
                Ok(client) => client,
                Err(err) if is_would_block(&err) => break,
                Err(err) => {
                    error!(listener = fd, error = %err, "accept failed");
                    break;
                }
            };

            if let Err(err) = set_nonblocking(client) {
                warn!(fd = client, error = %err, "failed to make client non-blocking");
                socket::close(client);
                continue;
            }

            if let Err(err) = reactor.register(client, Interest::READABLE, Some(self.client.clone()))
            {
                error!(fd = client, error = %err, "failed to register client");
                socket::close(client);
                continue;
            }

            accepted += 1;
            trace!(fd = client, "accepted connection");
        }

        if accepted > 0 {
            debug!(port = self.server.local_addr.port(), accepted, "accepted connections");
        }
    }
}

struct ClientHandler {
    server: Rc<ServerInner>,
}

impl EventHandler for ClientHandler {
    fn on_ready(&self, reactor: &mut Reactor, fd: RawFd, ready: Ready) {
        trace!(fd, hangup = ready.is_hangup(), error = ready.is_error(), "client ready");

        let mut buf = vec![0u8; self.server.config.read_buffer_size];
        // Reads stop one byte short of the buffer.
        let limit = buf.len() - 1;

        let read = match socket::read(fd, &mut buf[..limit]) {
            Ok(0) => {
                trace!(fd, "peer closed connection");
                close_registered(reactor, fd);
                return;
            }
            Ok(read) => read,
            Err(err) => {
                debug!(fd, error = %err, "read failed");
                close_registered(reactor, fd);
                return;
            }
        };

        let request = &buf[..read];
        trace!(fd, request = %String::from_utf8_lossy(request), "received request");

        match self.server.route(request, fd) {
            Outcome::Bare => respond_and_close(reactor, fd, &self.server.config.bare_response),
            Outcome::BadRequest => respond_and_close(reactor, fd, BAD_REQUEST),
            Outcome::NotFound => respond_and_close(reactor, fd, NOT_FOUND),
            Outcome::Closed => {
                debug!(fd, "server shut down, dropping request");
                close_registered(reactor, fd);
            }
            Outcome::Route(handler) => handler.handle(Connection::new(fd, reactor), request),
        }
    }
}

/// A listening HTTP server driven by a [`Reactor`].
///
/// Until the first route is added the server runs in bare mode and answers
/// every request with a fixed 200 response.
///
/// # Example
/// ```ignore
/// let mut reactor = Reactor::new()?;
/// let mut server = HttpServer::bind(&mut reactor, 8080)?;
/// server.add_route("/hello", |mut conn: Connection<'_>, _request: &[u8]| {
///     let _ = conn.respond(&Response::ok().body("hi"));
///     conn.close();
/// })?;
/// reactor.run()?;
/// ```
pub struct HttpServer {
    inner: Rc<ServerInner>,
}

impl HttpServer {
    /// Binds `0.0.0.0:port` with default settings and registers the listener.
    pub fn bind(reactor: &mut Reactor, port: u16) -> Result<Self> {
        ServerBuilder::new(port).build(reactor)
    }

    pub(crate) fn listen(
        reactor: &mut Reactor,
        listener: Socket,
        config: ServerConfig,
    ) -> Result<Self> {
        let listen_fd = listener.as_raw_fd();
        let local_addr = listener.local_addr().map_err(|source| Error::Socket {
            op: "getsockname",
            source,
        })?;

        let inner = Rc::new(ServerInner {
            listener: RefCell::new(Some(listener)),
            listen_fd,
            local_addr,
            routing: RefCell::new(Routing::Bare),
            config,
        });

        let client: Rc<dyn EventHandler> = Rc::new(ClientHandler {
            server: inner.clone(),
        });
        let accept: Rc<dyn EventHandler> = Rc::new(AcceptHandler {
            server: inner.clone(),
            client,
        });

        // On failure the handlers and `inner` drop here, closing the socket.
        reactor.register(listen_fd, Interest::READABLE, Some(accept))?;

        info!("HTTP server listening on port {}", local_addr.port());

        Ok(Self { inner })
    }

    /// Appends a route served by a closure.
    ///
    /// # Errors
    /// [`Error::EmptyRoutePath`] for an empty path, [`Error::RouteTableGrowth`]
    /// if the table cannot grow.
    pub fn add_route<F>(&mut self, path: &str, handler: F) -> Result<()>
    where
        F: Fn(Connection<'_>, &[u8]) + 'static,
    {
        self.add_route_handler(path, Rc::new(handler))
    }

    /// Appends a route served by a shared handler object.
    pub fn add_route_handler(&mut self, path: &str, handler: Rc<dyn RouteHandler>) -> Result<()> {
        if path.is_empty() {
            return Err(Error::EmptyRoutePath);
        }

        let mut routing = self.inner.routing.borrow_mut();
        let mut table = match mem::replace(&mut *routing, Routing::Bare) {
            Routing::Table(table) => table,
            Routing::Bare | Routing::Closed => RouteTable::new()?,
        };

        let pushed = table.push(path, handler);
        debug!(path, routes = table.len(), "added route");
        *routing = Routing::Table(table);
        pushed
    }

    /// True while no route has been added.
    pub fn is_bare(&self) -> bool {
        matches!(*self.inner.routing.borrow(), Routing::Bare)
    }

    /// Number of routes added so far.
    pub fn route_count(&self) -> usize {
        match &*self.inner.routing.borrow() {
            Routing::Table(table) => table.len(),
            Routing::Bare | Routing::Closed => 0,
        }
    }

    /// Paths in match order.
    pub fn route_paths(&self) -> Vec<String> {
        match &*self.inner.routing.borrow() {
            Routing::Table(table) => {
                table.routes().iter().map(|route| route.path().to_owned()).collect()
            }
            Routing::Bare | Routing::Closed => Vec::new(),
        }
    }

    /// The address the listener is bound to.
    ///
    /// # Returns
    /// The bound [`SocketAddr`]; with port `0` requested, this carries the
    /// port the kernel picked.
    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    /// Shorthand for `local_addr().port()`.
    pub fn port(&self) -> u16 {
        self.inner.local_addr.port()
    }

    /// Descriptor of the listening socket, as registered with the reactor.
    pub fn listener_fd(&self) -> RawFd {
        self.inner.listen_fd
    }

    /// Deregisters and closes the listener, and drops the route table.
    ///
    /// Connections already accepted stay registered; a request arriving on
    /// one of them afterwards is closed without a response.
    pub fn shutdown(self, reactor: &mut Reactor) {
        if reactor.deregister(self.inner.listen_fd).is_err() {
            debug!(fd = self.inner.listen_fd, "listener was not registered");
        }

        self.inner.listener.borrow_mut().take();
        *self.inner.routing.borrow_mut() = Routing::Closed;
        info!(port = self.port(), "HTTP server shut down");
    }
}
