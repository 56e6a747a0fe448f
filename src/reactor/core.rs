use crate::error::{Error, Result};
use crate::reactor::event::PollSet;
use crate::reactor::interest::{Interest, Ready};
use crate::reactor::registry::{INITIAL_CAPACITY, Inserted, Registration, RegistrationTable};

use std::os::fd::RawFd;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, error, trace, warn};

pub(crate) const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(1000);

/// Capability invoked by the reactor when a registered descriptor is ready.
///
/// The handler object carries whatever context the registrant needs. It runs
/// on the reactor thread and must not block; any blocking call stalls every
/// other descriptor. The `&mut Reactor` lets it register or deregister
/// descriptors, which takes effect from the next iteration on.
pub trait EventHandler {
    fn on_ready(&self, reactor: &mut Reactor, fd: RawFd, ready: Ready);
}

impl<F> EventHandler for F
where
    F: Fn(&mut Reactor, RawFd, Ready),
{
    fn on_ready(&self, reactor: &mut Reactor, fd: RawFd, ready: Ready) {
        self(reactor, fd, ready)
    }
}

/// Single-threaded `poll(2)` reactor.
///
/// Owns a table of registrations, at most one per descriptor. Each iteration
/// snapshots the table into a poll set, waits up to the poll timeout, and
/// calls the handler of every descriptor that reported readiness, in table
/// order.
///
/// # Example
/// ```ignore
/// let mut reactor = Reactor::new()?;
/// reactor.register(fd, Interest::READABLE, Some(Rc::new(|r: &mut Reactor, fd, ready| {
///     // read from fd ...
/// })))?;
/// reactor.run()?;
/// ```
pub struct Reactor {
    table: RegistrationTable,
    poll_timeout: Duration,
    stopping: bool,
}

impl Reactor {
    /// Creates a reactor with the default table capacity and poll timeout.
    ///
    /// # Returns
    /// An empty reactor with room for 64 registrations and a one second poll
    /// timeout, or [`Error::TableGrowth`] if the table cannot be allocated.
    pub fn new() -> Result<Self> {
        Self::with_config(INITIAL_CAPACITY, DEFAULT_POLL_TIMEOUT)
    }

    /// Creates a reactor whose table starts with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_config(capacity, DEFAULT_POLL_TIMEOUT)
    }

    pub(crate) fn with_config(capacity: usize, poll_timeout: Duration) -> Result<Self> {
        Ok(Self {
            table: RegistrationTable::with_capacity(capacity)?,
            poll_timeout,
            stopping: false,
        })
    }

    /// Registers `fd`, or replaces its interest and handler if already present.
    ///
    /// A descriptor registered without a handler is still polled but never
    /// dispatched.
    ///
    /// # Errors
    /// [`Error::InvalidDescriptor`] for a negative descriptor, and
    /// [`Error::TableGrowth`] if the table is full and cannot grow. In both
    /// cases the table is left as it was.
    pub fn register(
        &mut self,
        fd: RawFd,
        interest: Interest,
        handler: Option<Rc<dyn EventHandler>>,
    ) -> Result<()> {
        if fd < 0 {
            return Err(Error::InvalidDescriptor(fd));
        }

        match self.table.insert(fd, interest, handler)? {
            Inserted::New => trace!(fd, ?interest, "registered descriptor"),
            Inserted::Replaced => trace!(fd, ?interest, "replaced registration"),
        }

        Ok(())
    }

    /// Removes the registration for `fd`.
    ///
    /// Must be called before the descriptor is closed so it is never
    /// dispatched after close.
    ///
    /// # Errors
    /// [`Error::NotRegistered`] if `fd` has no registration.
    pub fn deregister(&mut self, fd: RawFd) -> Result<Registration> {
        let removed = self.table.remove(fd).ok_or(Error::NotRegistered(fd))?;
        trace!(fd, "deregistered descriptor");
        Ok(removed)
    }

    /// Whether `fd` currently has a registration.
    ///
    /// # Example
    /// ```ignore
    /// reactor.register(fd, Interest::READABLE, None)?;
    /// assert!(reactor.is_registered(fd));
    /// reactor.deregister(fd)?;
    /// assert!(!reactor.is_registered(fd));
    /// ```
    pub fn is_registered(&self, fd: RawFd) -> bool {
        self.table.get(fd).is_some()
    }

    /// The interest `fd` is registered with, if any.
    pub fn interest(&self, fd: RawFd) -> Option<Interest> {
        self.table.get(fd).map(|r| r.interest)
    }

    /// Registered descriptors in dispatch order.
    pub fn descriptors(&self) -> Vec<RawFd> {
        self.table.entries().iter().map(|r| r.fd).collect()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Declared capacity of the registration table.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Wait bound used by each iteration of [`run`](Self::run).
    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    /// Asks [`run`](Self::run) to return after the current iteration.
    pub fn stop(&mut self) {
        self.stopping = true;
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping
    }

    /// Runs iterations until [`stop`](Self::stop) is called.
    ///
    /// `poll(2)` failures are logged and retried. The loop only fails if the
    /// per-iteration poll set cannot be allocated.
    pub fn run(&mut self) -> Result<()> {
        debug!(
            registrations = self.table.len(),
            timeout_ms = self.poll_timeout.as_millis() as u64,
            "reactor running"
        );

        while !self.stopping {
            if let Err(err) = self.turn(Some(self.poll_timeout)) {
                error!(error = %err, "reactor stopped");
                return Err(err);
            }
        }

        self.stopping = false;
        debug!("reactor stopped");
        Ok(())
    }

    /// Runs a single iteration and returns how many handlers were called.
    ///
    /// The poll set is a snapshot of the table taken before waiting. Handlers
    /// may change the table; a snapshot entry is skipped if its descriptor
    /// has been deregistered (or deregistered and registered again) since the
    /// snapshot was taken. New registrations are picked up next iteration.
    pub fn turn(&mut self, timeout: Option<Duration>) -> Result<usize> {
        let entries = self.table.len();

        let mut fds = Vec::new();
        let mut tokens = Vec::new();
        fds.try_reserve_exact(entries)
            .and_then(|_| tokens.try_reserve_exact(entries))
            .map_err(|source| Error::PollSet { entries, source })?;

        for registration in self.table.entries() {
            fds.push(PollSet::entry(
                registration.fd,
                registration.interest.as_poll_events(),
            ));
            tokens.push((registration.fd, registration.token));
        }

        let mut poll_set = PollSet::new(fds);
        match poll_set.wait(timeout) {
            Ok(0) => return Ok(0),
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "poll failed, retrying next iteration");
                return Ok(0);
            }
        }

        let mut dispatched = 0;
        for (index, &(fd, token)) in tokens.iter().enumerate() {
            let ready = Ready::from_revents(poll_set.revents(index));
            if ready.is_empty() {
                continue;
            }

            let handler = match self.table.get(fd) {
                Some(live) if live.token == token => live.handler.clone(),
                _ => {
                    trace!(fd, "descriptor changed during dispatch, skipping");
                    continue;
                }
            };

            let Some(handler) = handler else {
                continue;
            };

            trace!(fd, revents = ready.bits(), "dispatching");
            handler.on_ready(self, fd, ready);
            dispatched += 1;
        }

        Ok(dispatched)
    }
}
