//! Readiness-based I/O reactor.
//!
//! This module provides a single-threaded `poll(2)` event loop:
//! - [`core`]: the [`Reactor`](core::Reactor) and the [`EventHandler`](core::EventHandler) capability
//! - [`interest`]: registration masks and reported readiness bits
//! - [`registry`]: the descriptor registration table
//! - `event`: thin wrappers over `poll` and `fcntl`

pub mod core;
pub(crate) mod event;
pub mod interest;
pub mod registry;
