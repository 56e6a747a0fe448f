//! Raw IPv4 stream sockets.
//!
//! The listening socket is owned by [`Socket`] and closed on drop, so a
//! failed setup step releases everything acquired before it. Accepted client
//! descriptors are plain [`RawFd`]s: their lifetime is driven by the router
//! and route handlers, which close them explicitly.

use crate::error::{Error, Result};
use crate::reactor::event::set_nonblocking;

use libc::{
    AF_INET, ECONNABORTED, EINTR, SO_REUSEADDR, SOCK_STREAM, SOL_SOCKET, accept, bind, c_int,
    c_void, getsockname, in_addr, listen, setsockopt, sockaddr, sockaddr_in, socket, socklen_t,
};
use std::io;
use std::mem;
use std::net::{Ipv4Addr, SocketAddr};
use std::os::fd::RawFd;
use std::ptr;

#[cfg(target_os = "linux")]
const SEND_FLAGS: c_int = libc::MSG_NOSIGNAL;
#[cfg(not(target_os = "linux"))]
const SEND_FLAGS: c_int = 0;

pub(crate) struct Socket {
    fd: RawFd,
}

impl Socket {
    /// Opens a non-blocking listening socket on `host:port`.
    ///
    /// Performs, in order: socket, `SO_REUSEADDR`, bind, listen, non-blocking.
    /// The descriptor is closed if any step fails.
    pub(crate) fn listen(host: Ipv4Addr, port: u16, backlog: c_int) -> Result<Self> {
        let fd = unsafe { socket(AF_INET, SOCK_STREAM, 0) };
        if fd < 0 {
            return Err(Error::last_os("socket"));
        }
        let listener = Self { fd };

        let enable: c_int = 1;
        let ret = unsafe {
            setsockopt(
                listener.fd,
                SOL_SOCKET,
                SO_REUSEADDR,
                &enable as *const c_int as *const c_void,
                mem::size_of::<c_int>() as socklen_t,
            )
        };
        if ret < 0 {
            return Err(Error::last_os("setsockopt"));
        }

        let addr = socketaddr_to_sockaddr(host, port);
        let ret = unsafe {
            bind(
                listener.fd,
                &addr as *const sockaddr_in as *const sockaddr,
                mem::size_of::<sockaddr_in>() as socklen_t,
            )
        };
        if ret < 0 {
            return Err(Error::last_os("bind"));
        }

        if unsafe { listen(listener.fd, backlog) } < 0 {
            return Err(Error::last_os("listen"));
        }

        set_nonblocking(listener.fd).map_err(|source| Error::Socket {
            op: "fcntl",
            source,
        })?;

        Ok(listener)
    }

    pub(crate) fn as_raw_fd(&self) -> RawFd {
        self.fd
    }

    pub(crate) fn local_addr(&self) -> io::Result<SocketAddr> {
        let mut addr: sockaddr_in = unsafe { mem::zeroed() };
        let mut length = mem::size_of::<sockaddr_in>() as socklen_t;
        let ret = unsafe {
            getsockname(
                self.fd,
                &mut addr as *mut sockaddr_in as *mut sockaddr,
                &mut length,
            )
        };

        if ret < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(sockaddr_to_socketaddr(&addr))
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        close(self.fd);
    }
}

/// Accepts one pending connection on a non-blocking listener.
///
/// Interrupted and aborted handshakes are retried. A would-block error means
/// the backlog is drained.
pub(crate) fn accept_client(listener: RawFd) -> io::Result<RawFd> {
    loop {
        let fd = unsafe { accept(listener, ptr::null_mut(), ptr::null_mut()) };
        if fd >= 0 {
            return Ok(fd);
        }

        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(code) if code == EINTR || code == ECONNABORTED => continue,
            _ => return Err(err),
        }
    }
}

pub(crate) fn read(fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
    let res = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut c_void, buf.len()) };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(res as usize)
}

/// One `send` attempt. Short writes are returned as-is.
pub(crate) fn send(fd: RawFd, buf: &[u8]) -> io::Result<usize> {
    let res = unsafe { libc::send(fd, buf.as_ptr() as *const c_void, buf.len(), SEND_FLAGS) };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(res as usize)
}

pub(crate) fn close(fd: RawFd) {
    unsafe {
        libc::close(fd);
    }
}

fn socketaddr_to_sockaddr(host: Ipv4Addr, port: u16) -> sockaddr_in {
    let mut addr: sockaddr_in = unsafe { mem::zeroed() };

    #[cfg(any(
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd"
    ))]
    {
        addr.sin_len = mem::size_of::<sockaddr_in>() as u8;
    }

    addr.sin_family = AF_INET as libc::sa_family_t;
    addr.sin_port = port.to_be();
    addr.sin_addr = in_addr {
        s_addr: u32::from(host).to_be(),
    };
    addr
}

fn sockaddr_to_socketaddr(addr: &sockaddr_in) -> SocketAddr {
    let ip = Ipv4Addr::from(u32::from_be(addr.sin_addr.s_addr));
    let port = u16::from_be(addr.sin_port);

    SocketAddr::from((ip, port))
}
