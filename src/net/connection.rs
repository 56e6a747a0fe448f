use crate::http::response::Response;
use crate::net::socket;
use crate::reactor::core::Reactor;

use std::io;
use std::os::fd::RawFd;
use tracing::{debug, trace};

/// A client connection handed to a route handler.
///
/// The handler owns the rest of the connection's life: it writes a response
/// and calls [`close`](Self::close). Dropping a `Connection` does nothing, so
/// a handler that never closes leaves the descriptor registered and open.
pub struct Connection<'a> {
    fd: RawFd,
    reactor: &'a mut Reactor,
}

impl<'a> Connection<'a> {
    pub(crate) fn new(fd: RawFd, reactor: &'a mut Reactor) -> Self {
        Self { fd, reactor }
    }

    /// The client socket's descriptor.
    pub fn descriptor(&self) -> RawFd {
        self.fd
    }

    /// The reactor driving this connection.
    pub fn reactor(&mut self) -> &mut Reactor {
        &mut *self.reactor
    }

    /// One non-blocking write attempt; returns how many bytes went out.
    pub fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        socket::send(self.fd, buf)
    }

    /// Writes `response` with a single attempt, logging a short write.
    pub fn respond(&mut self, response: &Response) -> io::Result<usize> {
        let bytes = response.to_bytes();
        let written = self.write(&bytes)?;
        if written < bytes.len() {
            debug!(
                fd = self.fd,
                status = response.status(),
                written,
                total = bytes.len(),
                "short response write"
            );
        } else {
            trace!(fd = self.fd, status = response.status(), "response sent");
        }

        Ok(written)
    }

    /// Deregisters the descriptor and closes it.
    pub fn close(self) {
        close_registered(self.reactor, self.fd);
    }
}

/// Deregisters `fd` before closing it so it is never dispatched after close.
pub(crate) fn close_registered(reactor: &mut Reactor, fd: RawFd) {
    if reactor.deregister(fd).is_err() {
        debug!(fd, "closing descriptor that was not registered");
    }
    socket::close(fd);
}

/// Best-effort single write of a fixed response, then close.
pub(crate) fn respond_and_close(reactor: &mut Reactor, fd: RawFd, response: &[u8]) {
    match socket::send(fd, response) {
        Ok(written) if written < response.len() => {
            debug!(fd, written, total = response.len(), "short response write");
        }
        Ok(_) => {}
        Err(err) => debug!(fd, error = %err, "response write failed"),
    }

    close_registered(reactor, fd);
}
