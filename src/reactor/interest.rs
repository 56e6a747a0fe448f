use libc::{POLLERR, POLLHUP, POLLIN, POLLNVAL, POLLOUT, c_short};
use std::fmt;
use std::ops::BitOr;

/// The set of readiness kinds a registration wants to be told about.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interest(c_short);

impl Interest {
    pub const READABLE: Self = Self(POLLIN);
    pub const WRITABLE: Self = Self(POLLOUT);

    pub fn is_readable(self) -> bool {
        self.0 & POLLIN != 0
    }

    pub fn is_writable(self) -> bool {
        self.0 & POLLOUT != 0
    }

    pub(crate) fn as_poll_events(self) -> c_short {
        self.0
    }
}

impl BitOr for Interest {
    type Output = Self;

    fn bitor(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl fmt::Debug for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interest")
            .field("readable", &self.is_readable())
            .field("writable", &self.is_writable())
            .finish()
    }
}

/// Readiness bits reported by `poll(2)` for one descriptor.
///
/// Besides the requested kinds this may carry hangup, error or
/// invalid-descriptor bits, which the kernel reports unconditionally.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ready(c_short);

impl Ready {
    pub(crate) fn from_revents(revents: c_short) -> Self {
        Self(revents)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_readable(self) -> bool {
        self.0 & POLLIN != 0
    }

    pub fn is_writable(self) -> bool {
        self.0 & POLLOUT != 0
    }

    pub fn is_hangup(self) -> bool {
        self.0 & POLLHUP != 0
    }

    pub fn is_error(self) -> bool {
        self.0 & (POLLERR | POLLNVAL) != 0
    }

    /// Raw `revents` value.
    pub fn bits(self) -> c_short {
        self.0
    }
}

impl fmt::Debug for Ready {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ready({:#06x})", self.0)
    }
}
