//! # sync-core
//!
//! Pure logic for roomsync (no I/O, instant tests).
//!
//! This crate implements the message store, the live feed state machine and
//! the markup encoder without any network or timer I/O, enabling fast unit
//! tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (backend calls, timers, shared ownership) is performed by
//! `sync-client`, which interprets the actions produced by these state
//! machines.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod markup;
pub mod state;
pub mod store;

pub use markup::{encode, LINE_BREAK};
pub use state::{Action, ConnectionState, Event, RetryPolicy, DEFAULT_RETRY_DELAY};
pub use store::{MessageStore, ReplaceOutcome};
