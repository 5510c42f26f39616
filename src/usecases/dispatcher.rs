//! Event dispatcher: drives filter -> query -> format -> reply per chat event.
//!
//! The connection backlog is drained sequentially, in arrival order, before
//! any live event is handled. Live events then run concurrently, one task
//! per accepted event; the only state shared across handlers is the
//! read-only startup snapshot (policy, query builder, reply format).

use crate::domain::{AccessDecision, ChatEvent, ChatMessage, DomainError, ReplyFormat};
use crate::ports::{ChatGateway, SearchGateway};
use crate::usecases::access_policy::AccessPolicy;
use crate::usecases::formatter;
use crate::usecases::query_builder::QueryBuilder;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
pub struct EventDispatcher {
    chat: Arc<dyn ChatGateway>,
    search: Arc<dyn SearchGateway>,
    policy: Arc<AccessPolicy>,
    queries: Arc<QueryBuilder>,
    reply_format: ReplyFormat,
}

impl EventDispatcher {
    pub fn new(
        chat: Arc<dyn ChatGateway>,
        search: Arc<dyn SearchGateway>,
        policy: AccessPolicy,
        queries: QueryBuilder,
        reply_format: ReplyFormat,
    ) -> Self {
        Self {
            chat,
            search,
            policy: Arc::new(policy),
            queries: Arc::new(queries),
            reply_format,
        }
    }

    /// Run until interrupted (Ctrl-C) or the transport fails.
    pub async fn run(&self) -> Result<(), DomainError> {
        self.run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    }

    /// Run until `shutdown` completes or the transport fails. In-flight
    /// handlers are drained to completion on either exit path.
    ///
    /// The shutdown future is created once for the whole run and polled by
    /// reference in both phases, so a stop request arriving while an event
    /// handler runs inline is retained and honored at the next loop
    /// boundary.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) -> Result<(), DomainError> {
        tokio::pin!(shutdown);

        if !self.drain_backlog(shutdown.as_mut()).await? {
            return Ok(());
        }

        info!("serving live events");
        let mut handlers: JoinSet<()> = JoinSet::new();

        let outcome = loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("interrupt received; draining in-flight handlers");
                    break Ok(());
                }
                Some(result) = handlers.join_next(), if !handlers.is_empty() => {
                    if let Err(e) = result {
                        error!(error = %e, "event handler panicked");
                    }
                }
                event = self.chat.next_event() => match event {
                    Ok(ChatEvent::Message(message)) => {
                        let dispatcher = self.clone();
                        handlers.spawn(async move { dispatcher.handle_event(message).await });
                    }
                    Ok(ChatEvent::CaughtUp) => {
                        debug!("spurious catch-up marker in live phase");
                    }
                    Err(e) => break Err(e),
                },
            }
        };

        while let Some(result) = handlers.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "event handler panicked");
            }
        }
        outcome
    }

    /// Process the connection backlog one event at a time, in arrival order,
    /// until the transport reports it has caught up. Returns `false` when a
    /// stop request arrived mid-drain and the live phase must not start.
    async fn drain_backlog(
        &self,
        mut shutdown: Pin<&mut impl Future<Output = ()>>,
    ) -> Result<bool, DomainError> {
        info!("draining connection backlog");
        let mut replayed = 0usize;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!(replayed, "interrupt received during catch-up");
                    return Ok(false);
                }
                event = self.chat.next_event() => match event? {
                    ChatEvent::Message(message) => {
                        replayed += 1;
                        self.handle_event(message).await;
                    }
                    ChatEvent::CaughtUp => break,
                },
            }
        }
        info!(replayed, "backlog drained");
        Ok(true)
    }

    /// Per-event pipeline. Never returns an error: every failure is settled
    /// here so sibling events stay unaffected.
    async fn handle_event(&self, message: ChatMessage) {
        if message.is_self {
            debug!(message_id = message.id, "skipping own message");
            return;
        }

        let username = message
            .sender
            .as_ref()
            .and_then(|sender| sender.username.as_deref());
        if let AccessDecision::Deny { reason } = self.policy.check(username) {
            debug!(
                message_id = message.id,
                chat_id = message.chat_id,
                reason = %reason,
                "skipping message"
            );
            return;
        }

        let Some(request) = self.queries.build(&message.text) else {
            debug!(message_id = message.id, "skipping bot command");
            return;
        };

        let body = match self.search.search(&request).await {
            Ok(hit) => match formatter::format_response(hit.as_ref(), self.reply_format) {
                Ok(body) => body,
                Err(e) => {
                    warn!(
                        message_id = message.id,
                        error = %e,
                        "archive hit unusable; answering not-found"
                    );
                    formatter::not_found(self.reply_format)
                }
            },
            Err(e) => {
                warn!(message_id = message.id, error = %e, "search failed");
                formatter::unavailable(self.reply_format)
            }
        };

        if let Err(e) = self.chat.reply(&message, &body).await {
            warn!(
                message_id = message.id,
                chat_id = message.chat_id,
                error = %e,
                "reply failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArchiveHit, ArchiveSender, SearchRequest, Sender};
    use chrono::Utc;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;

    struct FakeChat {
        events: Mutex<VecDeque<ChatEvent>>,
        replies: Mutex<Vec<(i32, String)>>,
        fail_replies: bool,
    }

    impl FakeChat {
        fn new(events: Vec<ChatEvent>) -> Self {
            Self {
                events: Mutex::new(events.into()),
                replies: Mutex::new(Vec::new()),
                fail_replies: false,
            }
        }

        fn replied_ids(&self) -> Vec<i32> {
            self.replies.lock().unwrap().iter().map(|(id, _)| *id).collect()
        }

        fn reply_bodies(&self) -> Vec<String> {
            self.replies
                .lock()
                .unwrap()
                .iter()
                .map(|(_, body)| body.clone())
                .collect()
        }
    }

    #[async_trait::async_trait]
    impl ChatGateway for FakeChat {
        async fn next_event(&self) -> Result<ChatEvent, DomainError> {
            self.events
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| DomainError::ChatGateway("event stream closed".to_string()))
        }

        async fn reply(&self, to: &ChatMessage, body: &str) -> Result<(), DomainError> {
            if self.fail_replies {
                return Err(DomainError::ReplySend("flood wait".to_string()));
            }
            self.replies.lock().unwrap().push((to.id, body.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeSearch {
        hit: Option<ArchiveHit>,
        fail: bool,
        delay_ms_by_term: HashMap<String, u64>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl SearchGateway for FakeSearch {
        async fn search(&self, request: &SearchRequest) -> Result<Option<ArchiveHit>, DomainError> {
            self.calls.lock().unwrap().push(request.term.clone());
            if let Some(ms) = self.delay_ms_by_term.get(&request.term) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            if self.fail {
                return Err(DomainError::SearchBackend("connection refused".to_string()));
            }
            Ok(self.hit.clone())
        }
    }

    fn message(id: i32, text: &str) -> ChatMessage {
        ChatMessage {
            id,
            chat_id: 100,
            sender: Some(Sender {
                id: 1,
                username: Some("alice".to_string()),
                display_name: "Alice".to_string(),
            }),
            text: text.to_string(),
            timestamp: Utc::now(),
            is_self: false,
            is_edit: false,
        }
    }

    fn archive_hit() -> ArchiveHit {
        ArchiveHit {
            chat: "General".to_string(),
            timestamp: "2023-05-01T14:30:00".to_string(),
            sender: ArchiveSender {
                username: Some("jdoe".to_string()),
                first_name: Some("Jane".to_string()),
                last_name: Some("Doe".to_string()),
            },
            message: "hello world".to_string(),
        }
    }

    fn dispatcher(
        chat: Arc<FakeChat>,
        search: Arc<FakeSearch>,
        banned: Vec<String>,
    ) -> EventDispatcher {
        EventDispatcher::new(
            chat,
            search,
            AccessPolicy::new(banned),
            QueryBuilder::new("telegram"),
            ReplyFormat::Text,
        )
    }

    #[tokio::test]
    async fn test_own_messages_are_never_searched_or_answered() {
        let chat = Arc::new(FakeChat::new(Vec::new()));
        let search = Arc::new(FakeSearch::default());
        let d = dispatcher(chat.clone(), search.clone(), Vec::new());

        let mut own = message(1, "hello world");
        own.is_self = true;
        d.handle_event(own).await;

        assert!(search.calls.lock().unwrap().is_empty());
        assert!(chat.replied_ids().is_empty());
    }

    #[tokio::test]
    async fn test_banned_sender_is_dropped_silently() {
        let chat = Arc::new(FakeChat::new(Vec::new()));
        let search = Arc::new(FakeSearch::default());
        let d = dispatcher(chat.clone(), search.clone(), vec!["alice".to_string()]);

        d.handle_event(message(1, "hello world")).await;

        assert!(search.calls.lock().unwrap().is_empty());
        assert!(chat.replied_ids().is_empty());
    }

    #[tokio::test]
    async fn test_start_command_never_reaches_search() {
        let chat = Arc::new(FakeChat::new(Vec::new()));
        let search = Arc::new(FakeSearch::default());
        let d = dispatcher(chat.clone(), search.clone(), Vec::new());

        d.handle_event(message(1, "/start")).await;

        assert!(search.calls.lock().unwrap().is_empty());
        assert!(chat.replied_ids().is_empty());
    }

    #[tokio::test]
    async fn test_accepted_message_gets_provenance_reply() {
        let chat = Arc::new(FakeChat::new(Vec::new()));
        let search = Arc::new(FakeSearch {
            hit: Some(archive_hit()),
            ..FakeSearch::default()
        });
        let d = dispatcher(chat.clone(), search.clone(), Vec::new());

        d.handle_event(message(7, "hello world")).await;

        assert_eq!(search.calls.lock().unwrap().as_slice(), ["hello world"]);
        assert_eq!(chat.replied_ids(), vec![7]);
        let body = &chat.reply_bodies()[0];
        assert!(body.contains("chat: **General**"));
        assert!(body.contains("login: **jdoe**"));
    }

    #[tokio::test]
    async fn test_no_hit_answers_not_found_sentinel() {
        let chat = Arc::new(FakeChat::new(Vec::new()));
        let search = Arc::new(FakeSearch::default());
        let d = dispatcher(chat.clone(), search.clone(), Vec::new());

        d.handle_event(message(7, "hello world")).await;

        assert_eq!(chat.reply_bodies(), vec![formatter::NOT_FOUND.to_string()]);
    }

    #[tokio::test]
    async fn test_search_failure_answers_unavailable() {
        let chat = Arc::new(FakeChat::new(Vec::new()));
        let search = Arc::new(FakeSearch {
            fail: true,
            ..FakeSearch::default()
        });
        let d = dispatcher(chat.clone(), search.clone(), Vec::new());

        d.handle_event(message(7, "hello world")).await;

        assert_eq!(
            chat.reply_bodies(),
            vec![formatter::SEARCH_UNAVAILABLE.to_string()]
        );
    }

    #[tokio::test]
    async fn test_search_failure_answer_honors_json_mode() {
        let chat = Arc::new(FakeChat::new(Vec::new()));
        let search = Arc::new(FakeSearch {
            fail: true,
            ..FakeSearch::default()
        });
        let d = EventDispatcher::new(
            chat.clone(),
            search,
            AccessPolicy::new(Vec::new()),
            QueryBuilder::new("telegram"),
            ReplyFormat::Json,
        );

        d.handle_event(message(7, "hello world")).await;

        assert_eq!(
            chat.reply_bodies(),
            vec!["\"Search is unavailable right now, please try again later\"".to_string()]
        );
    }

    #[tokio::test]
    async fn test_malformed_hit_degrades_to_not_found() {
        let mut hit = archive_hit();
        hit.timestamp = "not a date".to_string();
        let chat = Arc::new(FakeChat::new(Vec::new()));
        let search = Arc::new(FakeSearch {
            hit: Some(hit),
            ..FakeSearch::default()
        });
        let d = dispatcher(chat.clone(), search.clone(), Vec::new());

        d.handle_event(message(7, "hello world")).await;

        assert_eq!(chat.reply_bodies(), vec![formatter::NOT_FOUND.to_string()]);
    }

    #[tokio::test]
    async fn test_reply_failure_is_contained() {
        let mut chat = FakeChat::new(Vec::new());
        chat.fail_replies = true;
        let chat = Arc::new(chat);
        let search = Arc::new(FakeSearch::default());
        let d = dispatcher(chat.clone(), search.clone(), Vec::new());

        d.handle_event(message(7, "hello world")).await;

        assert!(chat.replied_ids().is_empty());
    }

    #[tokio::test]
    async fn test_backlog_is_sequential_and_precedes_live_events() {
        // Arrival timeline: two backlog messages, the catch-up marker, then
        // two live messages, then the stream closes. The first backlog
        // search and the first live search are slowed down; backlog order
        // must hold anyway, while live replies may overtake each other.
        let chat = Arc::new(FakeChat::new(vec![
            ChatEvent::Message(message(1, "backlog one")),
            ChatEvent::Message(message(2, "backlog two")),
            ChatEvent::CaughtUp,
            ChatEvent::Message(message(3, "live slow")),
            ChatEvent::Message(message(4, "live fast")),
        ]));
        let search = Arc::new(FakeSearch {
            delay_ms_by_term: HashMap::from([
                ("backlog one".to_string(), 40),
                ("live slow".to_string(), 40),
            ]),
            ..FakeSearch::default()
        });
        let d = dispatcher(chat.clone(), search.clone(), Vec::new());

        let result = d.run().await;
        assert!(matches!(result, Err(DomainError::ChatGateway(_))));

        // Backlog strictly in arrival order, live handled concurrently, and
        // every in-flight handler drained before run returned.
        assert_eq!(chat.replied_ids(), vec![1, 2, 4, 3]);
    }

    #[tokio::test]
    async fn test_interrupt_during_backlog_drain_stops_before_later_events() {
        // The stop request lands while the first backlog handler is running
        // inline. It must still take effect at the next loop boundary: the
        // second event stays untouched and the live phase never starts.
        let chat = Arc::new(FakeChat::new(vec![
            ChatEvent::Message(message(1, "backlog one")),
            ChatEvent::Message(message(2, "backlog two")),
            ChatEvent::CaughtUp,
        ]));
        let search = Arc::new(FakeSearch {
            delay_ms_by_term: HashMap::from([("backlog one".to_string(), 40)]),
            ..FakeSearch::default()
        });
        let d = dispatcher(chat.clone(), search.clone(), Vec::new());

        let outcome = d
            .run_until(tokio::time::sleep(Duration::from_millis(20)))
            .await;

        assert!(outcome.is_ok());
        assert_eq!(search.calls.lock().unwrap().as_slice(), ["backlog one"]);
        assert_eq!(chat.replied_ids(), vec![1]);
    }
}
