//! FeedSync - the message log synchronizer.
//!
//! This module provides [`FeedSync`], which owns the local copy of the
//! message log and keeps it in step with the service.
//!
//! # Architecture
//!
//! FeedSync uses the pure poll state machine (from chat-core) for the
//! refresh cycle and interprets its actions to perform the actual I/O via
//! the [`Gateway`] trait.
//!
//! ```text
//! timer tick ─┐
//! refresh() ──┼→ PollState (chat-core) → actions → Gateway / LogView / events
//! append() ───┘
//! ```
//!
//! Every start of the cycle gets a generation number. Cancelling the timer
//! bumps it, so a request that completes after a stop (or a stop and a new
//! start) is recognized as stale and dropped instead of touching the view.
//!
//! # Example
//!
//! ```ignore
//! let feed = FeedSync::new(Arc::new(gateway), session, &ClientConfig::default());
//! feed.start();
//! feed.append("hello").await?;
//! for message in feed.messages() {
//!     println!("{}: {}", message.author_username, message.content);
//! }
//! ```

use pollchat_core::{Action, BackoffPolicy, Event, FeedEvent, LogView, PollState};
use pollchat_types::{Message, MessageId, PostMessageRequest};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::gateway::{Gateway, GatewayError};
use crate::session::SessionStore;

/// Events buffered per subscriber before the oldest are dropped.
const EVENT_CAPACITY: usize = 64;

/// Shortest timer period; `tokio::time::interval` rejects zero.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// The message log synchronizer.
///
/// Cheap to clone; clones drive the same cycle and share the same view.
pub struct FeedSync<G: Gateway + 'static> {
    inner: Arc<FeedInner<G>>,
}

impl<G: Gateway + 'static> Clone for FeedSync<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct FeedInner<G: Gateway + 'static> {
    gateway: Arc<G>,
    session: SessionStore,
    policy: BackoffPolicy,
    interval: Duration,
    state: Mutex<PollState>,
    log: RwLock<LogView>,
    generation: AtomicU64,
    timer: Mutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<FeedEvent>,
}

impl<G: Gateway + 'static> FeedSync<G> {
    /// Create a stopped synchronizer.
    ///
    /// An interval below one millisecond (including zero) is raised to one
    /// millisecond.
    pub fn new(gateway: Arc<G>, session: SessionStore, config: &ClientConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(FeedInner {
                gateway,
                session,
                policy: config.backoff_policy(),
                interval: config.poll_interval().max(MIN_INTERVAL),
                state: Mutex::new(PollState::new()),
                log: RwLock::new(LogView::new()),
                generation: AtomicU64::new(0),
                timer: Mutex::new(None),
                events,
            }),
        }
    }

    /// Start the refresh cycle. The first poll runs immediately.
    ///
    /// No-op if already running. Must be called within a Tokio runtime.
    pub fn start(&self) {
        self.inner.dispatch(Event::Start, None);
    }

    /// Stop the refresh cycle and drop the local view.
    ///
    /// Cancels the timer; a poll still in flight is discarded when it
    /// completes. No-op if already stopped.
    pub fn stop(&self) {
        self.inner.dispatch(Event::Stop, None);
    }

    /// Poll once right now, outside the timer.
    ///
    /// Returns `false` without polling when the cycle is stopped or a poll
    /// is already in flight.
    pub async fn refresh(&self) -> bool {
        match self.inner.dispatch(Event::RefreshRequested, None) {
            Some(generation) => {
                // Spawned so that dropping this future cannot strand the
                // cycle in Polling.
                let poll = tokio::spawn(Arc::clone(&self.inner).poll_once(generation));
                if let Err(e) = poll.await {
                    warn!(error = %e, "Refresh task failed");
                }
                true
            }
            None => false,
        }
    }

    /// Send a message and add it to the view once the service confirms it.
    ///
    /// Content that is empty after trimming is rejected here, before the
    /// gateway sees it. Nothing is inserted before confirmation. If a poll
    /// already brought the message in, the view is left as is. On failure
    /// the view is not touched, and an authentication error tears the
    /// session down.
    pub async fn append(&self, content: &str) -> Result<Message, GatewayError> {
        let request = PostMessageRequest::new(content)?;
        let generation = self.inner.generation();

        match self.inner.gateway.post_message(&request.content).await {
            Ok(message) => {
                self.inner.confirm(message.clone(), generation);
                Ok(message)
            }
            Err(e) if e.kind().forces_logout() => {
                self.inner.reject(e.to_string(), generation);
                Err(e)
            }
            Err(e) => {
                debug!(error = %e, "Send failed");
                Err(e)
            }
        }
    }

    /// Snapshot of the local view, ascending by id.
    pub fn messages(&self) -> Vec<Message> {
        self.inner.read_log().snapshot()
    }

    /// Messages newer than `after`, ascending by id. `None` returns the
    /// whole view.
    pub fn messages_after(&self, after: Option<MessageId>) -> Vec<Message> {
        let log = self.inner.read_log();
        match after {
            Some(id) => log.after(id),
            None => log.snapshot(),
        }
    }

    /// Whether the refresh cycle is running.
    pub fn is_running(&self) -> bool {
        self.inner.lock_state().is_running()
    }

    /// Current state of the refresh cycle.
    pub fn state(&self) -> PollState {
        self.inner.lock_state().clone()
    }

    /// Receive feed events.
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn emit(&self, event: FeedEvent) {
        self.inner.emit(event);
    }
}

impl<G: Gateway + 'static> FeedInner<G> {
    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn lock_state(&self) -> MutexGuard<'_, PollState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read_log(&self) -> RwLockReadGuard<'_, LogView> {
        self.log.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_log(&self) -> RwLockWriteGuard<'_, LogView> {
        self.log.write().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_timer(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Feed an event to the state machine.
    ///
    /// `issued_in` is the generation the event belongs to; events from an
    /// older generation are dropped. Returns the generation to poll under
    /// when the transition asked for a poll.
    fn dispatch(self: &Arc<Self>, event: Event, issued_in: Option<u64>) -> Option<u64> {
        let mut state = self.lock_state();
        if let Some(generation) = issued_in {
            if generation != self.generation() {
                debug!(generation, "Dropping event from a stopped cycle");
                return None;
            }
        }
        self.transition(&mut state, event)
    }

    /// Apply one transition. Actions run with the state lock held so that
    /// a stop can never interleave with half-applied actions.
    fn transition(self: &Arc<Self>, state: &mut PollState, event: Event) -> Option<u64> {
        let (next, actions) = std::mem::take(state).on_event(event, self.policy);
        *state = next;

        let mut poll = None;
        for action in actions {
            match action {
                Action::StartTimer => self.start_timer(),
                Action::IssuePoll => poll = Some(self.generation()),
                Action::ReplaceLog { messages } => self.replace_log(messages),
                Action::CancelTimer => self.cancel_timer(),
                Action::ClearLog => self.write_log().clear(),
                Action::ClearSession => {
                    self.session.clear_session();
                }
                Action::EmitEvent(event) => self.emit(event),
            }
        }
        poll
    }

    fn start_timer(self: &Arc<Self>) {
        let generation = self.generation();
        let weak = Arc::downgrade(self);
        let period = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                // The first tick completes immediately.
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                if inner.generation() != generation {
                    break;
                }
                if let Some(poll_generation) = inner.dispatch(Event::Tick, Some(generation)) {
                    tokio::spawn(inner.poll_once(poll_generation));
                }
            }
        });

        if let Some(previous) = self.lock_timer().replace(handle) {
            previous.abort();
        }
        debug!(generation, interval_ms = period.as_millis() as u64, "Poll timer started");
    }

    fn cancel_timer(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(handle) = self.lock_timer().take() {
            handle.abort();
        }
        debug!(generation, "Poll timer cancelled");
    }

    async fn poll_once(self: Arc<Self>, generation: u64) {
        debug!(generation, "Polling messages");
        let event = match self.gateway.list_messages().await {
            Ok(messages) => Event::PollSucceeded { messages },
            Err(e) => Event::PollFailed {
                kind: e.kind(),
                error: e.to_string(),
            },
        };
        self.dispatch(event, Some(generation));
    }

    fn replace_log(&self, messages: Vec<Message>) {
        let merge = self.write_log().replace_with(messages);
        if merge.duplicates > 0 {
            warn!(
                duplicates = merge.duplicates,
                "Poll response repeated message ids; kept first occurrence"
            );
        }
        debug!(total = merge.total, added = merge.added, "Feed refreshed");
        self.emit(FeedEvent::Updated {
            total: merge.total,
            added: merge.added,
        });
    }

    fn confirm(&self, message: Message, generation: u64) {
        let state = self.lock_state();
        if generation != self.generation() || !state.is_running() {
            debug!(id = %message.id, "Discarding send confirmation for a stopped feed");
            return;
        }

        let mut log = self.write_log();
        let id = message.id;
        if log.append_confirmed(message) {
            let total = log.len();
            drop(log);
            self.emit(FeedEvent::Updated { total, added: 1 });
        } else {
            debug!(id = %id, "Sent message already in view");
        }
    }

    fn reject(self: &Arc<Self>, error: String, generation: u64) {
        let mut state = self.lock_state();
        if generation != self.generation() {
            // The session this send belonged to is already gone.
            debug!(generation, "Ignoring auth rejection from a stopped cycle");
            return;
        }
        if state.is_running() {
            self.transition(&mut state, Event::AuthRejected { error });
        } else {
            self.session.clear_session();
            self.emit(FeedEvent::SessionRejected { error });
        }
    }

    fn emit(&self, event: FeedEvent) {
        match &event {
            FeedEvent::Started => info!("Feed started"),
            FeedEvent::Stopped => info!("Feed stopped"),
            FeedEvent::SignedOut => info!("Signed out"),
            FeedEvent::TransientFailure {
                kind,
                error,
                failures,
            } => warn!(%kind, %error, failures, "Poll failed, will retry"),
            FeedEvent::SessionRejected { error } => {
                warn!(%error, "Credential rejected, session torn down")
            }
            FeedEvent::Updated { .. } => {}
        }
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl<G: Gateway + 'static> Drop for FeedInner<G> {
    fn drop(&mut self) {
        let timer = self.timer.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = timer.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockGateway;
    use chrono::Utc;
    use pollchat_types::{AuthResponse, Credential, ErrorKind, Identity, UserId};

    const INTERVAL: Duration = Duration::from_millis(2000);

    fn alice() -> Identity {
        Identity {
            id: UserId::new(1),
            username: "alice".into(),
            profile_picture: String::new(),
        }
    }

    fn msg(id: u64, content: &str) -> Message {
        Message {
            id: MessageId::new(id),
            author_id: UserId::new(1),
            author_username: "alice".into(),
            author_picture: String::new(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    fn ids(feed: &FeedSync<MockGateway>) -> Vec<u64> {
        feed.messages().iter().map(|m| m.id.value()).collect()
    }

    /// Authenticated session, mock gateway recording it, and a stopped feed.
    fn setup() -> (FeedSync<MockGateway>, MockGateway, SessionStore) {
        let session = SessionStore::in_memory();
        session.set_session(Credential::new("tok"), alice());
        let gateway = MockGateway::new().with_session(session.clone());
        let config = ClientConfig::default().with_poll_interval(INTERVAL);
        let feed = FeedSync::new(Arc::new(gateway.clone()), session.clone(), &config);
        (feed, gateway, session)
    }

    /// Let spawned tasks run to their next await point.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    // ===========================================
    // Poll Cycle Tests
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn start_polls_immediately() {
        let (feed, gateway, _session) = setup();
        gateway.set_history(vec![msg(1, "a")]);

        feed.start();
        settle().await;

        assert_eq!(gateway.list_count(), 1);
        assert_eq!(ids(&feed), vec![1]);
        assert!(feed.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn polls_on_every_interval() {
        let (feed, gateway, _session) = setup();
        feed.start();
        settle().await;

        tokio::time::sleep(INTERVAL * 3).await;
        settle().await;

        assert_eq!(gateway.list_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_still_polls() {
        let session = SessionStore::in_memory();
        session.set_session(Credential::new("tok"), alice());
        let gateway = MockGateway::new().with_session(session.clone());
        let config = ClientConfig {
            poll_interval_ms: 0,
            ..ClientConfig::default()
        };
        let feed = FeedSync::new(Arc::new(gateway.clone()), session, &config);

        feed.start();
        settle().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        settle().await;

        assert!(feed.is_running());
        assert!(gateway.list_count() >= 2, "polls: {}", gateway.list_count());
    }

    #[tokio::test(start_paused = true)]
    async fn successive_polls_replace_view() {
        let (feed, gateway, _session) = setup();
        gateway.queue_list(Ok(vec![msg(1, "a")]));
        gateway.queue_list(Ok(vec![msg(1, "a"), msg(2, "b")]));

        feed.start();
        settle().await;
        assert_eq!(ids(&feed), vec![1]);

        tokio::time::sleep(INTERVAL).await;
        settle().await;
        assert_eq!(ids(&feed), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn messages_after_returns_only_newer() {
        let (feed, gateway, _session) = setup();
        gateway.set_history(vec![msg(1, "a"), msg(2, "b"), msg(3, "c")]);
        feed.start();
        settle().await;

        let newer: Vec<u64> = feed
            .messages_after(Some(MessageId::new(1)))
            .iter()
            .map(|m| m.id.value())
            .collect();
        assert_eq!(newer, vec![2, 3]);
        assert_eq!(feed.messages_after(None).len(), 3);
        assert!(feed.messages_after(Some(MessageId::new(3))).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_service_never_has_two_polls_in_flight() {
        let (feed, gateway, _session) = setup();
        gateway.set_latency(INTERVAL * 3);

        feed.start();
        tokio::time::sleep(INTERVAL * 10).await;
        settle().await;

        assert_eq!(gateway.max_in_flight(), 1);
        assert!(gateway.list_count() >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_keep_cycle_running() {
        let (feed, gateway, session) = setup();
        gateway.queue_list(Err(GatewayError::Network("down".into())));
        gateway.queue_list(Err(GatewayError::Server("boom".into())));
        gateway.set_history(vec![msg(1, "a")]);
        let mut events = feed.subscribe();

        feed.start();
        settle().await;
        tokio::time::sleep(INTERVAL * 4).await;
        settle().await;

        assert!(feed.is_running());
        assert!(session.is_authenticated());
        assert_eq!(ids(&feed), vec![1]);

        let mut saw_failure = false;
        while let Ok(event) = events.try_recv() {
            if let FeedEvent::TransientFailure { kind, .. } = event {
                assert!(kind.is_transient());
                saw_failure = true;
            }
        }
        assert!(saw_failure);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_failures_back_off() {
        let (feed, gateway, _session) = setup();
        gateway.fail_lists(Some(GatewayError::Server("boom".into())));

        feed.start();
        settle().await;
        // Ticks at 0..=20 intervals; failures skip 0, 1, 3, 7 ticks.
        for _ in 0..20 {
            tokio::time::sleep(INTERVAL).await;
            settle().await;
        }

        let polls = gateway.list_count();
        assert!(polls < 21, "expected backoff, got {} polls", polls);
        assert!(polls >= 4, "expected retries, got {} polls", polls);
    }

    #[tokio::test(start_paused = true)]
    async fn auth_error_on_poll_tears_down() {
        let (feed, gateway, session) = setup();
        gateway.queue_list(Ok(vec![msg(1, "a")]));
        gateway.queue_list(Err(GatewayError::Auth("Invalid token".into())));
        let mut events = feed.subscribe();

        feed.start();
        settle().await;
        tokio::time::sleep(INTERVAL).await;
        settle().await;

        assert!(!session.is_authenticated());
        assert!(!feed.is_running());
        assert!(feed.messages().is_empty());

        let polls = gateway.list_count();
        tokio::time::sleep(INTERVAL * 5).await;
        settle().await;
        assert_eq!(gateway.list_count(), polls, "poll observed after teardown");

        let mut rejected = false;
        while let Ok(event) = events.try_recv() {
            rejected |= matches!(event, FeedEvent::SessionRejected { .. });
        }
        assert!(rejected);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_timer_and_discards_late_response() {
        let (feed, gateway, _session) = setup();
        gateway.set_history(vec![msg(1, "a")]);
        gateway.set_latency(Duration::from_millis(500));

        feed.start();
        settle().await;
        // First poll is in flight.
        feed.stop();
        tokio::time::sleep(INTERVAL * 3).await;
        settle().await;

        assert!(feed.messages().is_empty());
        assert_eq!(gateway.list_count(), 1);
        assert!(!feed.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_ignores_response_from_previous_cycle() {
        let (feed, gateway, _session) = setup();
        gateway.set_latency(Duration::from_millis(500));
        gateway.queue_list(Ok(vec![msg(9, "stale")]));
        gateway.set_history(vec![msg(1, "fresh")]);

        feed.start();
        settle().await;
        feed.stop();
        feed.start();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        settle().await;

        assert_eq!(ids(&feed), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_skips_while_poll_in_flight() {
        let (feed, gateway, _session) = setup();
        gateway.set_latency(Duration::from_millis(500));

        feed.start();
        settle().await;
        assert!(!feed.refresh().await);

        tokio::time::sleep(Duration::from_millis(600)).await;
        settle().await;
        assert!(feed.refresh().await);
        assert_eq!(gateway.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn refresh_when_stopped_does_nothing() {
        let (feed, gateway, _session) = setup();
        assert!(!feed.refresh().await);
        assert_eq!(gateway.list_count(), 0);
    }

    // ===========================================
    // Append Tests
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn append_adds_confirmed_message() {
        let (feed, gateway, _session) = setup();
        gateway.set_history(vec![msg(1, "a")]);
        feed.start();
        settle().await;

        let sent = feed.append("hello").await.unwrap();

        assert_eq!(sent.id, MessageId::new(2));
        assert_eq!(ids(&feed), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_append_makes_no_call() {
        let (feed, gateway, _session) = setup();
        feed.start();
        settle().await;
        let before = feed.messages();

        let err = feed.append("  \t").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(gateway.post_count(), 0);
        assert_eq!(feed.messages(), before);
    }

    /// Gateway that accepts anything and counts posts.
    #[derive(Default)]
    struct PermissiveGateway {
        posts: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Gateway for PermissiveGateway {
        async fn login(&self, _: &str, _: &str) -> Result<AuthResponse, GatewayError> {
            Err(GatewayError::Auth("unused".into()))
        }

        async fn register(
            &self,
            _: &str,
            _: &str,
            _: &str,
        ) -> Result<AuthResponse, GatewayError> {
            Err(GatewayError::Auth("unused".into()))
        }

        async fn list_messages(&self) -> Result<Vec<Message>, GatewayError> {
            Ok(Vec::new())
        }

        async fn post_message(&self, content: &str) -> Result<Message, GatewayError> {
            let n = self.posts.fetch_add(1, Ordering::SeqCst) as u64 + 1;
            Ok(msg(n, content))
        }
    }

    #[tokio::test]
    async fn blank_append_is_rejected_before_any_gateway() {
        let session = SessionStore::in_memory();
        session.set_session(Credential::new("tok"), alice());
        let gateway = Arc::new(PermissiveGateway::default());
        let feed = FeedSync::new(Arc::clone(&gateway), session, &ClientConfig::default());

        let err = feed.append("   ").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(gateway.posts.load(Ordering::SeqCst), 0);
        assert!(feed.append("hi").await.is_ok());
        assert_eq!(gateway.posts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_append_leaves_view_unchanged() {
        let (feed, gateway, session) = setup();
        gateway.set_history(vec![msg(1, "a")]);
        feed.start();
        settle().await;
        let before = feed.messages();

        for error in [
            GatewayError::Network("down".into()),
            GatewayError::Server("boom".into()),
            GatewayError::Validation("too long".into()),
        ] {
            gateway.queue_post(Err(error));
            assert!(feed.append("hello").await.is_err());
            assert_eq!(feed.messages(), before);
        }
        assert!(session.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn append_after_poll_saw_it_keeps_one_copy() {
        let (feed, gateway, _session) = setup();
        gateway.queue_list(Ok(vec![msg(4, "x"), msg(5, "hello")]));
        gateway.queue_post(Ok(msg(5, "hello")));
        feed.start();
        settle().await;

        feed.append("hello").await.unwrap();

        assert_eq!(ids(&feed), vec![4, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_after_append_keeps_one_copy() {
        let (feed, gateway, _session) = setup();
        feed.start();
        settle().await;

        let sent = feed.append("hello").await.unwrap();
        tokio::time::sleep(INTERVAL).await;
        settle().await;

        let count = feed.messages().iter().filter(|m| m.id == sent.id).count();
        assert_eq!(count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn auth_error_on_append_tears_down() {
        let (feed, gateway, session) = setup();
        feed.start();
        settle().await;
        gateway.queue_post(Err(GatewayError::Auth("Invalid token".into())));

        let err = feed.append("hello").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert!(!session.is_authenticated());
        assert!(!feed.is_running());

        let polls = gateway.list_count();
        tokio::time::sleep(INTERVAL * 3).await;
        settle().await;
        assert_eq!(gateway.list_count(), polls);
    }

    #[tokio::test]
    async fn auth_error_on_append_clears_session_when_stopped() {
        let (feed, gateway, session) = setup();
        gateway.queue_post(Err(GatewayError::Auth("Invalid token".into())));

        assert!(feed.append("hello").await.is_err());
        assert!(!session.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn confirmation_after_stop_is_discarded() {
        let (feed, gateway, _session) = setup();
        feed.start();
        settle().await;
        gateway.set_latency(Duration::from_millis(500));

        let sender = feed.clone();
        let pending = tokio::spawn(async move { sender.append("late").await });
        settle().await;
        feed.stop();

        assert!(pending.await.unwrap().is_ok());
        assert!(feed.messages().is_empty());
    }
}
