//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use crate::client::{ApiError, AskRequest};
use crate::db::ConversationEntry;
use crate::runtime::{spawn_session, SessionHandle, SessionUpdate};
use crate::state_machine::SessionMode;
use crate::typing::{TypingConfig, TypingSimulator};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

// ============================================================================
// Mock Chat Client
// ============================================================================

/// Mock chat client that returns queued results
pub struct MockChatClient {
    answers: Mutex<VecDeque<Result<String, ApiError>>>,
    tours: Mutex<VecDeque<Result<Vec<String>, ApiError>>>,
    configured: bool,
    /// Record of all ask requests made
    pub requests: Mutex<Vec<AskRequest>>,
    /// Number of tour fetches made
    pub tour_fetches: AtomicUsize,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self {
            answers: Mutex::new(VecDeque::new()),
            tours: Mutex::new(VecDeque::new()),
            configured: true,
            requests: Mutex::new(Vec::new()),
            tour_fetches: AtomicUsize::new(0),
        }
    }

    /// A client with no endpoint; the session must never call it
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    pub fn queue_answer(&self, answer: impl Into<String>) {
        self.answers.lock().unwrap().push_back(Ok(answer.into()));
    }

    pub fn queue_ask_error(&self, error: ApiError) {
        self.answers.lock().unwrap().push_back(Err(error));
    }

    pub fn queue_tour<S: Into<String>>(&self, script: impl IntoIterator<Item = S>) {
        let script = script.into_iter().map(Into::into).collect();
        self.tours.lock().unwrap().push_back(Ok(script));
    }

    pub fn queue_tour_error(&self, error: ApiError) {
        self.tours.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<AskRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn tour_fetch_count(&self) -> usize {
        self.tour_fetches.load(Ordering::SeqCst)
    }
}

impl Default for MockChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn ask(&self, request: &AskRequest) -> Result<String, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::network("No mock response queued")))
    }

    async fn fetch_tour(&self) -> Result<Vec<String>, ApiError> {
        self.tour_fetches.fetch_add(1, Ordering::SeqCst);
        self.tours
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::network("No mock tour queued")))
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

// ============================================================================
// Delayed Mock Chat Client (for cancellation and busy testing)
// ============================================================================

/// Mock chat client with configurable delay on every call
pub struct DelayedMockChatClient {
    inner: MockChatClient,
    delay: Duration,
    /// Notified when a call starts (for test synchronization)
    pub request_started: Arc<Notify>,
}

impl DelayedMockChatClient {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MockChatClient::new(),
            delay,
            request_started: Arc::new(Notify::new()),
        }
    }

    pub fn queue_answer(&self, answer: impl Into<String>) {
        self.inner.queue_answer(answer);
    }

    pub fn recorded_requests(&self) -> Vec<AskRequest> {
        self.inner.recorded_requests()
    }
}

#[async_trait]
impl ChatClient for DelayedMockChatClient {
    async fn ask(&self, request: &AskRequest) -> Result<String, ApiError> {
        self.request_started.notify_one();
        tokio::time::sleep(self.delay).await;
        self.inner.ask(request).await
    }

    async fn fetch_tour(&self) -> Result<Vec<String>, ApiError> {
        self.request_started.notify_one();
        tokio::time::sleep(self.delay).await;
        self.inner.fetch_tour().await
    }

    fn is_configured(&self) -> bool {
        true
    }
}

// ============================================================================
// In-Memory History
// ============================================================================

/// History persistence that keeps the snapshot in memory and records saves
pub struct InMemoryHistory {
    stored: Mutex<Vec<ConversationEntry>>,
    saves: Mutex<Vec<Vec<ConversationEntry>>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::seeded(Vec::new())
    }

    /// Start with a previously persisted history
    pub fn seeded(entries: Vec<ConversationEntry>) -> Self {
        Self {
            stored: Mutex::new(entries),
            saves: Mutex::new(Vec::new()),
        }
    }

    /// The currently persisted history
    pub fn stored(&self) -> Vec<ConversationEntry> {
        self.stored.lock().unwrap().clone()
    }

    /// Every snapshot passed to `save`, in order
    pub fn saves(&self) -> Vec<Vec<ConversationEntry>> {
        self.saves.lock().unwrap().clone()
    }
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryPersistence for InMemoryHistory {
    fn load(&self) -> Vec<ConversationEntry> {
        self.stored()
    }

    fn save(&self, history: &[ConversationEntry]) {
        *self.stored.lock().unwrap() = history.to_vec();
        self.saves.lock().unwrap().push(history.to_vec());
    }
}

// ============================================================================
// Test Session Builder
// ============================================================================

/// Helper for building test sessions with minimal boilerplate
pub struct TestSession<C: ChatClient + 'static> {
    pub history: Arc<InMemoryHistory>,
    pub client: Arc<C>,
    pub handle: SessionHandle,
    pub updates: broadcast::Receiver<SessionUpdate>,
    /// Every update received so far, in order
    pub seen: Vec<SessionUpdate>,
}

impl TestSession<MockChatClient> {
    /// Create a test session with an instant mock client
    pub fn new() -> TestSessionBuilder<MockChatClient> {
        TestSessionBuilder::new(MockChatClient::new())
    }
}

pub struct TestSessionBuilder<C> {
    client: C,
    history: Vec<ConversationEntry>,
    typing: TypingConfig,
}

impl<C: ChatClient + 'static> TestSessionBuilder<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            history: Vec::new(),
            typing: TypingConfig {
                base: Duration::from_millis(10),
                per_char: Duration::ZERO,
                max: Duration::from_millis(50),
            },
        }
    }

    pub fn history(mut self, entries: Vec<ConversationEntry>) -> Self {
        self.history = entries;
        self
    }

    pub fn typing(mut self, typing: TypingConfig) -> Self {
        self.typing = typing;
        self
    }

    pub fn build(self) -> TestSession<C> {
        let history = Arc::new(InMemoryHistory::seeded(self.history));
        let client = Arc::new(self.client);

        let (handle, updates) = spawn_session(
            "test-session",
            history.clone(),
            client.clone(),
            TypingSimulator::new(self.typing),
        );

        TestSession {
            history,
            client,
            handle,
            updates,
            seen: Vec::new(),
        }
    }
}

impl<C: ChatClient + 'static> TestSession<C> {
    /// Wait for an update matching `predicate`, recording everything received
    pub async fn wait_for(
        &mut self,
        timeout: Duration,
        predicate: impl Fn(&SessionUpdate) -> bool,
    ) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.updates.recv()).await {
                Ok(Ok(update)) => {
                    let matched = predicate(&update);
                    self.seen.push(update);
                    if matched {
                        return true;
                    }
                }
                _ => continue,
            }
        }
        false
    }

    /// Wait for the session to announce `mode`
    pub async fn wait_for_mode(&mut self, mode: SessionMode, timeout: Duration) -> bool {
        self.wait_for(timeout, |u| *u == SessionUpdate::ModeChanged { mode })
            .await
    }

    /// The persisted history, which mirrors the store after every mutation
    pub fn entries(&self) -> Vec<ConversationEntry> {
        self.history.stored()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::transition::CANCELLED_MESSAGE;

    const WAIT: Duration = Duration::from_secs(2);

    fn is_rejected(update: &SessionUpdate) -> bool {
        matches!(update, SessionUpdate::Rejected { .. })
    }

    #[tokio::test]
    async fn test_mock_chat_client() {
        let mock = MockChatClient::new();
        mock.queue_answer("Hello");
        let request = AskRequest {
            question: "Hi".to_string(),
            history: vec![],
        };

        assert_eq!(mock.ask(&request).await.unwrap(), "Hello");
        // Second call should fail (no more responses)
        assert!(mock.ask(&request).await.is_err());
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_init_reports_hydrated_history() {
        let stored = vec![
            ConversationEntry::user("What is a block?"),
            ConversationEntry::bot("A block is..."),
        ];
        let mut session = TestSession::new().history(stored.clone()).build();

        let expected = SessionUpdate::Init {
            entries: stored,
            mode: SessionMode::Idle,
        };
        assert!(session.wait_for(WAIT, |u| *u == expected).await);
        // Init is always the first update
        assert_eq!(session.seen.len(), 1);
    }

    /// Integration test: a question is answered
    #[tokio::test]
    async fn test_ask_appends_user_then_bot() {
        let client = MockChatClient::new();
        client.queue_answer("A block is...");

        let mut session = TestSessionBuilder::new(client).build();
        session.handle.ask("What is a block?").await.unwrap();

        assert!(session.wait_for_mode(SessionMode::Idle, WAIT).await);
        assert_eq!(
            session.entries(),
            vec![
                ConversationEntry::user("What is a block?"),
                ConversationEntry::bot("A block is..."),
            ]
        );

        // The request carries the history including the new question
        let requests = session.client.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].question, "What is a block?");
        assert_eq!(
            requests[0].history,
            vec![ConversationEntry::user("What is a block?")]
        );

        assert!(session.seen.contains(&SessionUpdate::ModeChanged {
            mode: SessionMode::Answering
        }));
        assert!(session.seen.contains(&SessionUpdate::Typing { active: true }));
        assert!(session.seen.contains(&SessionUpdate::Typing { active: false }));
    }

    #[tokio::test]
    async fn test_ask_http_error_appends_error_entry() {
        let client = MockChatClient::new();
        client.queue_ask_error(ApiError::protocol(500, "overloaded"));

        let mut session = TestSessionBuilder::new(client).build();
        session.handle.ask("hi").await.unwrap();

        assert!(session.wait_for_mode(SessionMode::Idle, WAIT).await);
        assert_eq!(
            session.entries(),
            vec![
                ConversationEntry::user("hi"),
                ConversationEntry::error("API Error: 500 - overloaded"),
            ]
        );
    }

    #[tokio::test]
    async fn test_ask_sends_prior_history() {
        let client = MockChatClient::new();
        client.queue_answer("second answer");

        let mut session = TestSessionBuilder::new(client)
            .history(vec![
                ConversationEntry::user("first"),
                ConversationEntry::bot("first answer"),
            ])
            .build();
        session.handle.ask("second").await.unwrap();

        assert!(session.wait_for_mode(SessionMode::Idle, WAIT).await);
        let requests = session.client.recorded_requests();
        assert_eq!(requests[0].history.len(), 3);
        assert_eq!(session.entries().len(), 4);
    }

    /// Integration test: the tour replaces history and plays in order
    #[tokio::test]
    async fn test_tour_replaces_history_and_plays_in_order() {
        let client = MockChatClient::new();
        client.queue_tour(["Hi", "Welcome"]);

        let mut session = TestSessionBuilder::new(client)
            .history(vec![ConversationEntry::user("old question")])
            .build();

        let start = tokio::time::Instant::now();
        session.handle.start_tour().await.unwrap();
        assert!(session.wait_for_mode(SessionMode::Idle, WAIT).await);

        // Each step waits out the 10ms typing delay before the next
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert_eq!(
            session.entries(),
            vec![ConversationEntry::bot("Hi"), ConversationEntry::bot("Welcome")]
        );

        let appended: Vec<&SessionUpdate> = session
            .seen
            .iter()
            .filter(|u| matches!(u, SessionUpdate::Cleared | SessionUpdate::EntryAppended { .. }))
            .collect();
        assert_eq!(appended.len(), 3);
        assert_eq!(appended[0], &SessionUpdate::Cleared);

        // Typing is hidden before the session goes idle
        let n = session.seen.len();
        assert_eq!(session.seen[n - 2], SessionUpdate::Typing { active: false });
    }

    #[tokio::test]
    async fn test_tour_payload_error_aborts_immediately() {
        let client = MockChatClient::new();
        client.queue_tour_error(ApiError::payload("invalid type: string, expected a sequence"));

        let mut session = TestSessionBuilder::new(client)
            .history(vec![ConversationEntry::user("old question")])
            .build();
        session.handle.start_tour().await.unwrap();

        assert!(session.wait_for_mode(SessionMode::Idle, WAIT).await);
        let entries = session.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, crate::db::EntryKind::Error);
        assert!(entries[0].text.starts_with("API Error: unexpected response format"));
    }

    #[tokio::test]
    async fn test_empty_tour_returns_to_idle() {
        let client = MockChatClient::new();
        client.queue_tour(Vec::<String>::new());

        let mut session = TestSessionBuilder::new(client).build();
        session.handle.start_tour().await.unwrap();

        assert!(session.wait_for_mode(SessionMode::Idle, WAIT).await);
        assert!(session.entries().is_empty());
    }

    /// Integration test: commands issued while busy are rejected, not queued
    #[tokio::test]
    async fn test_busy_session_rejects_commands() {
        let client = DelayedMockChatClient::new(Duration::from_millis(300));
        client.queue_answer("first answer");
        let request_started = client.request_started.clone();

        let mut session = TestSessionBuilder::new(client).build();
        session.handle.ask("first").await.unwrap();

        tokio::time::timeout(Duration::from_secs(1), request_started.notified())
            .await
            .expect("ask request should start");

        session.handle.ask("second").await.unwrap();
        session.handle.start_tour().await.unwrap();
        session.handle.clear().await.unwrap();

        assert!(session.wait_for_mode(SessionMode::Idle, WAIT).await);
        assert_eq!(session.seen.iter().filter(|u| is_rejected(u)).count(), 3);
        assert_eq!(
            session.entries(),
            vec![
                ConversationEntry::user("first"),
                ConversationEntry::bot("first answer"),
            ]
        );
        assert_eq!(session.client.recorded_requests().len(), 1);
        assert_eq!(session.client.inner.tour_fetch_count(), 0);
    }

    /// Integration test: cancel during a slow ask
    #[tokio::test]
    async fn test_cancel_during_ask() {
        let client = DelayedMockChatClient::new(Duration::from_secs(5));
        client.queue_answer("Response that should be discarded");
        let request_started = client.request_started.clone();

        let mut session = TestSessionBuilder::new(client).build();
        let start = tokio::time::Instant::now();
        session.handle.ask("Hello").await.unwrap();

        tokio::time::timeout(Duration::from_secs(1), request_started.notified())
            .await
            .expect("ask request should start");
        session.handle.cancel().await.unwrap();

        assert!(session.wait_for_mode(SessionMode::Idle, WAIT).await);
        assert!(
            start.elapsed() < Duration::from_secs(2),
            "Cancellation should be fast, took {:?}",
            start.elapsed()
        );
        assert_eq!(
            session.entries(),
            vec![
                ConversationEntry::user("Hello"),
                ConversationEntry::error(CANCELLED_MESSAGE),
            ]
        );
    }

    /// Answers every question with `re: <question>`, immediately
    struct EchoChatClient;

    #[async_trait]
    impl ChatClient for EchoChatClient {
        async fn ask(&self, request: &AskRequest) -> Result<String, ApiError> {
            Ok(format!("re: {}", request.question))
        }

        async fn fetch_tour(&self) -> Result<Vec<String>, ApiError> {
            Ok(Vec::new())
        }

        fn is_configured(&self) -> bool {
            true
        }
    }

    /// An answer racing a cancel must never settle the question asked next
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cancelled_answer_never_settles_next_question() {
        for _ in 0..50 {
            let mut session = TestSessionBuilder::new(EchoChatClient).build();
            session.handle.ask("q1").await.unwrap();
            session.handle.cancel().await.unwrap();
            session.handle.ask("q2").await.unwrap();

            let second_answer = SessionUpdate::EntryAppended {
                entry: ConversationEntry::bot("re: q2"),
            };
            assert!(session.wait_for(WAIT, |u| *u == second_answer).await);

            let entries = session.entries();
            let asked = entries
                .iter()
                .position(|e| *e == ConversationEntry::user("q2"))
                .expect("second question should be recorded");
            assert_eq!(entries[asked + 1..], [ConversationEntry::bot("re: q2")]);
            assert!(!entries[asked..].contains(&ConversationEntry::bot("re: q1")));
        }
    }

    #[tokio::test]
    async fn test_dropping_handle_stops_session() {
        let client = DelayedMockChatClient::new(Duration::from_secs(5));
        client.queue_answer("never delivered");
        let request_started = client.request_started.clone();

        let session = TestSessionBuilder::new(client).build();
        session.handle.ask("Hello").await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), request_started.notified())
            .await
            .expect("ask request should start");

        let TestSession {
            handle,
            mut updates,
            ..
        } = session;
        drop(handle);

        // The runtime exits with the call still in flight and closes the channel
        let closed = tokio::time::timeout(WAIT, async {
            loop {
                if let Err(broadcast::error::RecvError::Closed) = updates.recv().await {
                    break;
                }
            }
        })
        .await;
        assert!(closed.is_ok(), "session should stop once its handle is dropped");
    }

    #[tokio::test]
    async fn test_cancel_during_tour_keeps_played_entries() {
        let client = MockChatClient::new();
        client.queue_tour(["Hi", "Welcome", "Bye"]);

        let mut session = TestSessionBuilder::new(client)
            .typing(TypingConfig {
                base: Duration::from_secs(5),
                per_char: Duration::ZERO,
                max: Duration::from_secs(5),
            })
            .build();
        session.handle.start_tour().await.unwrap();

        let first = SessionUpdate::EntryAppended {
            entry: ConversationEntry::bot("Hi"),
        };
        assert!(session.wait_for(WAIT, |u| *u == first).await);
        session.handle.cancel().await.unwrap();

        assert!(session.wait_for_mode(SessionMode::Idle, WAIT).await);
        assert_eq!(session.entries(), vec![ConversationEntry::bot("Hi")]);
        assert!(session.seen.contains(&SessionUpdate::Typing { active: false }));
    }

    #[tokio::test]
    async fn test_cancel_when_idle_is_rejected() {
        let mut session = TestSession::new().build();
        session.handle.cancel().await.unwrap();

        let expected = SessionUpdate::Rejected {
            reason: "Nothing to cancel".to_string(),
        };
        assert!(session.wait_for(WAIT, |u| *u == expected).await);
        assert!(session.history.saves().is_empty());
    }

    #[tokio::test]
    async fn test_blank_question_is_rejected() {
        let mut session = TestSession::new().build();
        session.handle.ask("   ").await.unwrap();

        assert!(session.wait_for(WAIT, is_rejected).await);
        assert!(session.entries().is_empty());
        assert!(session.client.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_client_fails_fast() {
        let mut session = TestSessionBuilder::new(MockChatClient::unconfigured()).build();
        session.handle.ask("hi").await.unwrap();

        let is_error_entry = |u: &SessionUpdate| {
            matches!(u, SessionUpdate::EntryAppended { entry } if entry.kind == crate::db::EntryKind::Error)
        };
        assert!(session.wait_for(WAIT, is_error_entry).await);
        assert_eq!(
            session.entries(),
            vec![
                ConversationEntry::user("hi"),
                ConversationEntry::error(ApiError::not_configured().message),
            ]
        );
        assert!(session.client.recorded_requests().is_empty());
        assert!(!session
            .seen
            .iter()
            .any(|u| matches!(u, SessionUpdate::ModeChanged { .. } | SessionUpdate::Typing { .. })));
    }

    #[tokio::test]
    async fn test_clear_persists_empty_history() {
        let mut session = TestSession::new()
            .history(vec![ConversationEntry::user("old")])
            .build();
        session.handle.clear().await.unwrap();

        assert!(session.wait_for(WAIT, |u| *u == SessionUpdate::Cleared).await);
        assert!(session.entries().is_empty());
        assert_eq!(session.history.saves(), vec![Vec::<ConversationEntry>::new()]);
    }

    #[tokio::test]
    async fn test_every_mutation_is_saved() {
        let client = MockChatClient::new();
        client.queue_tour(["Hi", "Welcome"]);

        let mut session = TestSessionBuilder::new(client).build();
        session.handle.start_tour().await.unwrap();
        assert!(session.wait_for_mode(SessionMode::Idle, WAIT).await);

        // clear, then one save per tour message
        let saves = session.history.saves();
        assert_eq!(saves.len(), 3);
        assert!(saves[0].is_empty());
        assert_eq!(saves[1], vec![ConversationEntry::bot("Hi")]);
        assert_eq!(saves[2].len(), 2);
    }
}
