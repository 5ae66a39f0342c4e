//! # oxo-core
//!
//! Pure logic for the oxo client (no I/O, instant tests).
//!
//! This crate turns a decoded [`GameRecord`](oxo_types::GameRecord) into the
//! client-local [`SessionView`] and decides peer liveness, without any
//! network or clock access of its own.
//!
//! ## Design Philosophy
//!
//! All functions in this crate are **pure** - they take input (including the
//! current time) and produce output without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about the view a given record produces
//!
//! The actual I/O (command submission, snapshot fetch, timers) is performed
//! by `oxo-client`, which interprets what these functions return.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod liveness;
pub mod view;

pub use liveness::{peer_alive, peer_marker, PEER_TIMEOUT_MS};
pub use view::{derive, Derivation, SessionView};
