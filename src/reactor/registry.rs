//! Registration table owned by the [`Reactor`](super::core::Reactor).
//!
//! Entries live in a dense vector so a poll set can be built by walking it
//! in order. A side index maps each descriptor to its slot; removal swaps the
//! last entry into the freed slot and patches that one index entry.

use crate::error::{Error, Result};
use crate::reactor::core::EventHandler;
use crate::reactor::interest::Interest;

use std::collections::HashMap;
use std::os::fd::RawFd;
use std::rc::Rc;

pub(crate) const INITIAL_CAPACITY: usize = 64;

/// One descriptor's interest and the handler it is dispatched to.
#[derive(Clone)]
pub struct Registration {
    pub(crate) fd: RawFd,
    pub(crate) interest: Interest,
    pub(crate) handler: Option<Rc<dyn EventHandler>>,
    pub(crate) token: u64,
}

impl Registration {
    pub fn descriptor(&self) -> RawFd {
        self.fd
    }

    pub fn interest(&self) -> Interest {
        self.interest
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }
}

pub(crate) enum Inserted {
    New,
    Replaced,
}

pub(crate) struct RegistrationTable {
    entries: Vec<Registration>,
    index: HashMap<RawFd, usize>,
    capacity: usize,
    next_token: u64,
}

impl RegistrationTable {
    pub(crate) fn with_capacity(capacity: usize) -> Result<Self> {
        let capacity = capacity.max(1);
        let mut entries = Vec::new();
        entries
            .try_reserve_exact(capacity)
            .map_err(|source| Error::TableGrowth { capacity, source })?;

        Ok(Self {
            entries,
            index: HashMap::new(),
            capacity,
            next_token: 1,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn entries(&self) -> &[Registration] {
        &self.entries
    }

    pub(crate) fn get(&self, fd: RawFd) -> Option<&Registration> {
        self.index.get(&fd).map(|&slot| &self.entries[slot])
    }

    /// Inserts a registration, or replaces the existing one for `fd` in place.
    ///
    /// A replacement keeps its slot and token and never reaches the append
    /// path, so one descriptor can never appear twice.
    pub(crate) fn insert(
        &mut self,
        fd: RawFd,
        interest: Interest,
        handler: Option<Rc<dyn EventHandler>>,
    ) -> Result<Inserted> {
        if let Some(&slot) = self.index.get(&fd) {
            let entry = &mut self.entries[slot];
            entry.interest = interest;
            entry.handler = handler;
            return Ok(Inserted::Replaced);
        }

        if self.entries.len() == self.capacity {
            self.grow()?;
        }

        let token = self.next_token;
        self.next_token = self.next_token.wrapping_add(1).max(1);

        self.index.insert(fd, self.entries.len());
        self.entries.push(Registration {
            fd,
            interest,
            handler,
            token,
        });

        Ok(Inserted::New)
    }

    pub(crate) fn remove(&mut self, fd: RawFd) -> Option<Registration> {
        let slot = self.index.remove(&fd)?;
        let removed = self.entries.swap_remove(slot);

        if let Some(moved) = self.entries.get(slot) {
            self.index.insert(moved.fd, slot);
        }

        Some(removed)
    }

    // Reserves up to the doubled capacity before committing it. On failure
    // nothing is touched.
    fn grow(&mut self) -> Result<()> {
        let new_capacity = self.capacity.saturating_mul(2);
        let additional = new_capacity - self.entries.len();

        self.entries
            .try_reserve_exact(additional)
            .map_err(|source| Error::TableGrowth {
                capacity: new_capacity,
                source,
            })?;
        self.index
            .try_reserve(additional)
            .map_err(|source| Error::TableGrowth {
                capacity: new_capacity,
                source,
            })?;

        self.capacity = new_capacity;
        Ok(())
    }
}
