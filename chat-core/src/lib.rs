//! # chat-core
//!
//! Pure logic for pollchat (no I/O, instant tests).
//!
//! This crate implements the state machine and merge rules for the message
//! feed without any network or disk I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (HTTP, timers, disk) is performed by `chat-client`, which
//! interprets the actions produced by these state machines.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod failure;
pub mod log;
pub mod state;

pub use failure::{describe_failure, UserAction, TRANSIENT_FAILURE};
pub use log::{LogView, Merge};
pub use state::{Action, BackoffPolicy, Event, FeedEvent, PollState, DEFAULT_MAX_BACKOFF_TICKS};
