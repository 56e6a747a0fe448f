use libc::{EAGAIN, EWOULDBLOCK, F_GETFL, F_SETFL, O_NONBLOCK, c_int, fcntl, nfds_t, poll, pollfd};
use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

pub(crate) struct PollSet(Vec<pollfd>);

impl PollSet {
    pub(crate) fn new(fds: Vec<pollfd>) -> Self {
        Self(fds)
    }

    pub(crate) fn entry(fd: RawFd, events: libc::c_short) -> pollfd {
        pollfd {
            fd,
            events,
            revents: 0,
        }
    }

    pub(crate) fn revents(&self, index: usize) -> libc::c_short {
        self.0[index].revents
    }

    /// Blocks until a descriptor is ready or `timeout` elapses.
    ///
    /// `None` waits indefinitely. Returns the number of descriptors with
    /// non-zero `revents`.
    pub(crate) fn wait(&mut self, timeout: Option<Duration>) -> io::Result<usize> {
        let ret = unsafe {
            poll(
                self.0.as_mut_ptr(),
                self.0.len() as nfds_t,
                timeout_ms(timeout),
            )
        };

        if ret < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(ret as usize)
    }
}

fn timeout_ms(timeout: Option<Duration>) -> c_int {
    match timeout {
        None => -1,
        Some(duration) => duration.as_millis().min(c_int::MAX as u128) as c_int,
    }
}

pub(crate) fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = unsafe { fcntl(fd, F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }

    if unsafe { fcntl(fd, F_SETFL, flags | O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

pub(crate) fn is_would_block(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(code) if code == EAGAIN || code == EWOULDBLOCK)
}
