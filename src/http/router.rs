use crate::error::{Error, Result};
use crate::net::connection::Connection;

use std::rc::Rc;

pub(crate) const INITIAL_ROUTE_CAPACITY: usize = 64;

/// Capability invoked for a request whose path matched a route.
///
/// Receives the connection and the raw request bytes exactly as read. The
/// handler is responsible for writing a response and closing the connection.
pub trait RouteHandler {
    fn handle(&self, conn: Connection<'_>, request: &[u8]);
}

impl<F> RouteHandler for F
where
    F: Fn(Connection<'_>, &[u8]),
{
    fn handle(&self, conn: Connection<'_>, request: &[u8]) {
        self(conn, request)
    }
}

/// A literal request path and the handler that serves it.
#[derive(Clone)]
pub struct Route {
    path: Box<str>,
    handler: Rc<dyn RouteHandler>,
}

impl Route {
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Ordered routes, matched first to last by exact path equality.
pub(crate) struct RouteTable {
    routes: Vec<Route>,
    capacity: usize,
}

impl RouteTable {
    pub(crate) fn new() -> Result<Self> {
        let capacity = INITIAL_ROUTE_CAPACITY;
        let mut routes = Vec::new();
        routes
            .try_reserve_exact(capacity)
            .map_err(|source| Error::RouteTableGrowth { capacity, source })?;

        Ok(Self { routes, capacity })
    }

    pub(crate) fn len(&self) -> usize {
        self.routes.len()
    }

    pub(crate) fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub(crate) fn push(&mut self, path: &str, handler: Rc<dyn RouteHandler>) -> Result<()> {
        if path.is_empty() {
            return Err(Error::EmptyRoutePath);
        }

        if self.routes.len() == self.capacity {
            let new_capacity = self.capacity.saturating_mul(2);
            self.routes
                .try_reserve_exact(new_capacity - self.routes.len())
                .map_err(|source| Error::RouteTableGrowth {
                    capacity: new_capacity,
                    source,
                })?;
            self.capacity = new_capacity;
        }

        self.routes.push(Route {
            path: path.into(),
            handler,
        });
        Ok(())
    }

    /// Handler of the first route whose path equals `path` byte for byte.
    pub(crate) fn find(&self, path: &[u8]) -> Option<Rc<dyn RouteHandler>> {
        self.routes
            .iter()
            .find(|route| route.path.as_bytes() == path)
            .map(|route| Rc::clone(&route.handler))
    }
}
