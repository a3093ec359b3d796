//! Poll cycle state machine for pollchat.
//!
//! This module provides a pure, side-effect-free state machine for the
//! message feed refresh cycle. The state machine takes events as input and
//! produces a new state plus a list of actions to execute.
//!
//! The actual I/O (timers, HTTP requests) is performed by chat-client,
//! not by this module. This enables instant unit testing without network mocks.

use pollchat_types::{ErrorKind, Message};

/// Default cap on ticks skipped after repeated transient failures.
pub const DEFAULT_MAX_BACKOFF_TICKS: u32 = 15;

/// Poll cycle state machine - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    /// Not running; ticks and late responses are ignored.
    Stopped,
    /// Running with no request in flight.
    Idle {
        /// Consecutive transient failures so far.
        failures: u32,
        /// Ticks still to skip before the next poll.
        skip_ticks: u32,
    },
    /// One list request outstanding.
    Polling {
        /// Consecutive transient failures before this request.
        failures: u32,
    },
}

/// Backoff applied to consecutive transient poll failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Upper bound on ticks skipped between attempts.
    pub max_skip_ticks: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_skip_ticks: DEFAULT_MAX_BACKOFF_TICKS,
        }
    }
}

impl BackoffPolicy {
    /// Ticks to skip after the given number of consecutive failures.
    ///
    /// Formula: min(max_skip_ticks, 2^(failures-1) - 1), so the first
    /// failure retries on the very next tick.
    pub fn skip_ticks(&self, failures: u32) -> u32 {
        if failures <= 1 {
            return 0;
        }
        let exp = (failures - 1).min(31);
        let skip = (1u64 << exp) - 1;
        skip.min(u64::from(self.max_skip_ticks)) as u32
    }
}

impl PollState {
    /// Create a new state machine in the Stopped state.
    pub fn new() -> Self {
        Self::Stopped
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (chat-client)
    /// is responsible for executing the returned actions.
    pub fn on_event(self, event: Event, policy: BackoffPolicy) -> (Self, Vec<Action>) {
        match (self, event) {
            // From Stopped
            (Self::Stopped, Event::Start) => (
                Self::Idle {
                    failures: 0,
                    skip_ticks: 0,
                },
                vec![Action::StartTimer, Action::EmitEvent(FeedEvent::Started)],
            ),

            // From Idle
            (
                Self::Idle {
                    failures,
                    skip_ticks,
                },
                Event::Tick,
            ) if skip_ticks > 0 => (
                Self::Idle {
                    failures,
                    skip_ticks: skip_ticks - 1,
                },
                vec![],
            ),
            (Self::Idle { failures, .. }, Event::Tick | Event::RefreshRequested) => {
                (Self::Polling { failures }, vec![Action::IssuePoll])
            }

            // From Polling
            (Self::Polling { .. }, Event::PollSucceeded { messages }) => (
                Self::Idle {
                    failures: 0,
                    skip_ticks: 0,
                },
                vec![Action::ReplaceLog { messages }],
            ),
            (Self::Polling { .. }, Event::PollFailed { kind, error }) if kind.forces_logout() => {
                (Self::Stopped, teardown(FeedEvent::SessionRejected { error }))
            }
            (Self::Polling { failures }, Event::PollFailed { kind, error }) => {
                let failures = failures.saturating_add(1);
                (
                    Self::Idle {
                        failures,
                        skip_ticks: policy.skip_ticks(failures),
                    },
                    vec![Action::EmitEvent(FeedEvent::TransientFailure {
                        kind,
                        error,
                        failures,
                    })],
                )
            }

            // From any running state
            (Self::Idle { .. } | Self::Polling { .. }, Event::AuthRejected { error }) => {
                (Self::Stopped, teardown(FeedEvent::SessionRejected { error }))
            }
            (Self::Idle { .. } | Self::Polling { .. }, Event::Stop) => (
                Self::Stopped,
                vec![
                    Action::CancelTimer,
                    Action::ClearLog,
                    Action::EmitEvent(FeedEvent::Stopped),
                ],
            ),

            // Ticks while Polling are dropped, late responses after Stop are
            // discarded, everything else is an invalid transition.
            (state, _) => (state, vec![]),
        }
    }

    /// Check if the cycle is running (Idle or Polling).
    pub fn is_running(&self) -> bool {
        !matches!(self, Self::Stopped)
    }

    /// Check if a list request is outstanding.
    pub fn is_polling(&self) -> bool {
        matches!(self, Self::Polling { .. })
    }

    /// Consecutive transient failures so far.
    pub fn failures(&self) -> u32 {
        match self {
            Self::Stopped => 0,
            Self::Idle { failures, .. } | Self::Polling { failures } => *failures,
        }
    }
}

impl Default for PollState {
    fn default() -> Self {
        Self::new()
    }
}

fn teardown(event: FeedEvent) -> Vec<Action> {
    vec![
        Action::CancelTimer,
        Action::ClearLog,
        Action::ClearSession,
        Action::EmitEvent(event),
    ]
}

/// Events that drive the poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Synchronizer started (login or restored session).
    Start,
    /// Fixed-interval timer fired.
    Tick,
    /// Caller asked for an immediate refresh.
    RefreshRequested,
    /// List request returned the full history.
    PollSucceeded {
        /// Messages as returned by the server.
        messages: Vec<Message>,
    },
    /// List request failed.
    PollFailed {
        /// Normalized failure kind.
        kind: ErrorKind,
        /// Error message describing the failure.
        error: String,
    },
    /// A send was rejected with an authentication error.
    AuthRejected {
        /// Error message describing the failure.
        error: String,
    },
    /// Logout or shutdown requested.
    Stop,
}

/// Actions to be executed by the chat-client.
///
/// These are instructions, not side effects. The chat-client interprets
/// these and performs the actual I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Start the fixed-interval timer.
    StartTimer,
    /// Issue one list request.
    IssuePoll,
    /// Replace the local view with a poll response.
    ReplaceLog {
        /// The authoritative message sequence.
        messages: Vec<Message>,
    },
    /// Stop the interval timer.
    CancelTimer,
    /// Drop the local view.
    ClearLog,
    /// Remove the stored credential and identity.
    ClearSession,
    /// Emit an event to the application.
    EmitEvent(FeedEvent),
}

/// Events emitted to the application layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// The poll cycle started.
    Started,
    /// The local view changed after a poll or a confirmed send.
    Updated {
        /// Messages in the view.
        total: usize,
        /// Messages new to the view.
        added: usize,
    },
    /// A poll failed with a transient error; the cycle keeps running.
    TransientFailure {
        /// Normalized failure kind.
        kind: ErrorKind,
        /// Error message describing the failure.
        error: String,
        /// Consecutive failures so far.
        failures: u32,
    },
    /// The server rejected the credential; the session was torn down.
    SessionRejected {
        /// Error message describing the rejection.
        error: String,
    },
    /// The poll cycle stopped.
    Stopped,
    /// The user logged out; presentation should show the login view.
    SignedOut,
}
