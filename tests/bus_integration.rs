//! Integration tests for the dispatch core.
//!
//! These tests verify the end-to-end flow over in-memory adapters:
//! 1. Commands mutate the conversation aggregate through the repository
//! 2. Queued events leave through the outbound transport, inline events
//!    are drained in-process before `handle` returns
//! 3. The cache-aside repository keeps the durable tier authoritative
//! 4. Event handler failures are retried and never fail the command

use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

use thread_relay::adapters::blob::InMemoryBlobStore;
use thread_relay::adapters::cache::InMemoryCacheStore;
use thread_relay::adapters::repository::CachedConversationRepository;
use thread_relay::adapters::runtime::MockAgentRuntime;
use thread_relay::adapters::store::InMemoryConversationStore;
use thread_relay::adapters::transport::InMemoryTransport;
use thread_relay::application::{build_bus, CoreDependencies, MessageBus, RetryPolicy};
use thread_relay::domain::conversation::PlatformContext;
use thread_relay::domain::foundation::{ErrorCode, SessionId, UserId};
use thread_relay::domain::messaging::{
    Command, CompleteConversationTurn, FailConversationTurn, GetConversation, Message, Query,
    StartConversationTurn,
};
use thread_relay::ports::{CacheStore, ConversationRepository};

struct Harness {
    bus: MessageBus,
    cache: Arc<InMemoryCacheStore>,
    store: Arc<InMemoryConversationStore>,
    blob: Arc<InMemoryBlobStore>,
    transport: Arc<InMemoryTransport>,
    runtime: Arc<MockAgentRuntime>,
    repository: Arc<CachedConversationRepository>,
}

fn harness_with_runtime(runtime: MockAgentRuntime) -> Harness {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let cache = Arc::new(InMemoryCacheStore::new());
    let store = Arc::new(InMemoryConversationStore::new());
    let blob = Arc::new(InMemoryBlobStore::new());
    let transport = Arc::new(InMemoryTransport::new());
    let runtime = Arc::new(runtime);
    let repository = Arc::new(CachedConversationRepository::new(
        cache.clone(),
        store.clone(),
        blob.clone(),
        None,
    ));

    let deps = CoreDependencies {
        repository: repository.clone(),
        runtime: runtime.clone(),
        transport: transport.clone(),
    };
    let bus = build_bus(&deps, RetryPolicy::new(3, Duration::from_millis(1)));

    Harness {
        bus,
        cache,
        store,
        blob,
        transport,
        runtime,
        repository,
    }
}

fn harness() -> Harness {
    harness_with_runtime(MockAgentRuntime::new())
}

fn user() -> UserId {
    UserId::new("U1").unwrap()
}

fn context() -> PlatformContext {
    PlatformContext::new("slack", "C042", "1724.0031")
}

fn start_turn(message: &str) -> Message {
    Message::from(Command::StartConversationTurn(StartConversationTurn {
        user_id: user(),
        context: context(),
        message: message.to_string(),
    }))
}

fn complete_turn(session: &str, cost: Option<f64>) -> Message {
    Message::from(Command::CompleteConversationTurn(CompleteConversationTurn {
        user_id: user(),
        context: context(),
        session_id: SessionId::new(session).unwrap(),
        cost_usd: cost,
    }))
}

fn fail_turn(partial: Option<&str>, error: &str) -> Message {
    Message::from(Command::FailConversationTurn(FailConversationTurn {
        user_id: user(),
        context: context(),
        partial_session_id: partial.map(|s| SessionId::new(s).unwrap()),
        error_message: error.to_string(),
    }))
}

fn get_conversation() -> Message {
    Message::from(Query::GetConversation(GetConversation {
        user_id: user(),
        context: context(),
    }))
}

#[tokio::test]
async fn start_turn_creates_the_conversation_and_queues_the_started_event() {
    let h = harness();

    let result = h.bus.handle(start_turn("hello")).await.unwrap();

    assert_eq!(result["turn_index"], 0);
    assert!(result["conversation_id"].is_string());

    // The started event left through the transport, on its routed channel.
    assert_eq!(h.transport.sent_on("conversation-events"), 1);
    let (_, message) = &h.transport.sent()[0];
    let event = message.unwrap_event().unwrap();
    assert_eq!(event.name(), "conversation.turn_started.v1");

    // Durable row written, cache warmed.
    assert_eq!(h.store.len(), 1);
    assert_eq!(h.cache.len(), 1);
}

#[tokio::test]
async fn second_start_while_in_flight_is_rejected() {
    let h = harness();
    h.bus.handle(start_turn("first")).await.unwrap();

    let err = h.bus.handle(start_turn("second")).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::TurnAlreadyInFlight);

    // The failed command queued nothing extra.
    assert_eq!(h.transport.sent().len(), 1);
}

#[tokio::test]
async fn complete_turn_records_the_session_and_queries_see_it() {
    let h = harness();
    h.bus.handle(start_turn("hello")).await.unwrap();
    h.bus.handle(complete_turn("s1", Some(0.02))).await.unwrap();

    let view = h.bus.handle(get_conversation()).await.unwrap();
    assert_eq!(view["latest_session_id"], "s1");
    assert_eq!(view["turns"][0]["status"], "completed");
    assert_eq!(view["turns"][0]["cost_usd"], 0.02);

    // start + complete each queued one event.
    assert_eq!(h.transport.sent_on("conversation-events"), 2);
}

#[tokio::test]
async fn completed_turn_allows_the_next_start() {
    let h = harness();
    h.bus.handle(start_turn("one")).await.unwrap();
    h.bus.handle(complete_turn("s1", None)).await.unwrap();

    let result = h.bus.handle(start_turn("two")).await.unwrap();
    assert_eq!(result["turn_index"], 1);
}

#[tokio::test]
async fn failed_turn_keeps_the_partial_session_out_of_latest() {
    let h = harness();
    h.bus.handle(start_turn("hello")).await.unwrap();
    h.bus
        .handle(fail_turn(Some("s-partial"), "runtime died"))
        .await
        .unwrap();

    let view = h.bus.handle(get_conversation()).await.unwrap();
    assert_eq!(view["latest_session_id"], JsonValue::Null);
    assert_eq!(view["turns"][0]["status"], "failed");
    assert_eq!(view["turns"][0]["session_id"], "s-partial");
    assert_eq!(view["turns"][0]["error_message"], "runtime died");
}

#[tokio::test]
async fn query_for_an_unknown_conversation_returns_null() {
    let h = harness();
    let view = h.bus.handle(get_conversation()).await.unwrap();
    assert_eq!(view, JsonValue::Null);
}

#[tokio::test]
async fn completing_without_a_conversation_is_not_found() {
    let h = harness();
    let err = h.bus.handle(complete_turn("s1", None)).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ConversationNotFound);
}

#[tokio::test]
async fn queued_events_do_not_invoke_in_process_handlers() {
    let session = SessionId::new("s1").unwrap();
    let h = harness_with_runtime(
        MockAgentRuntime::new().with_exported_session(session, b"transcript".to_vec()),
    );

    h.bus.handle(start_turn("hello")).await.unwrap();
    h.bus.handle(complete_turn("s1", None)).await.unwrap();

    // The completed event was queued outbound; the in-process history
    // handler only runs when the event comes back as an inbound message.
    assert_eq!(h.transport.sent_on("conversation-events"), 2);
    assert!(h.blob.is_empty());
}

#[tokio::test]
async fn inbound_completed_event_persists_the_session_history() {
    let session = SessionId::new("s1").unwrap();
    let h = harness_with_runtime(
        MockAgentRuntime::new().with_exported_session(session.clone(), b"transcript".to_vec()),
    );

    h.bus.handle(start_turn("hello")).await.unwrap();
    h.bus.handle(complete_turn("s1", None)).await.unwrap();

    // Replay the queued completed event as an inbound message, as a
    // transport consumer would.
    let (_, queued) = h.transport.sent().pop().unwrap();
    let event = queued.unwrap_event().unwrap();
    h.bus.handle(Message::Event(event)).await.unwrap();

    assert_eq!(
        h.repository
            .get_session_history(&user(), &session)
            .await
            .unwrap(),
        Some(b"transcript".to_vec())
    );
    assert_eq!(h.blob.keys(), vec!["sessions/U1/s1.jsonl".to_string()]);
}

#[tokio::test]
async fn inbound_failed_event_salvages_the_partial_session() {
    let session = SessionId::new("s-partial").unwrap();
    let h = harness_with_runtime(
        MockAgentRuntime::new().with_exported_session(session.clone(), b"partial".to_vec()),
    );

    h.bus.handle(start_turn("hello")).await.unwrap();
    h.bus
        .handle(fail_turn(Some("s-partial"), "runtime died"))
        .await
        .unwrap();

    let (_, queued) = h.transport.sent().pop().unwrap();
    let event = queued.unwrap_event().unwrap();
    h.bus.handle(Message::Event(event)).await.unwrap();

    assert_eq!(
        h.repository
            .get_session_history(&user(), &session)
            .await
            .unwrap(),
        Some(b"partial".to_vec())
    );
}

#[tokio::test]
async fn failed_event_without_partial_session_salvages_nothing() {
    let h = harness();
    h.bus.handle(start_turn("hello")).await.unwrap();
    h.bus.handle(fail_turn(None, "runtime died")).await.unwrap();

    let (_, queued) = h.transport.sent().pop().unwrap();
    let event = queued.unwrap_event().unwrap();
    h.bus.handle(Message::Event(event)).await.unwrap();

    assert!(h.blob.is_empty());
}

#[tokio::test]
async fn flaky_event_handler_is_retried_until_it_sticks() {
    let session = SessionId::new("s1").unwrap();
    let h = harness_with_runtime(
        MockAgentRuntime::new().with_exported_session(session.clone(), b"transcript".to_vec()),
    );
    h.bus.handle(start_turn("hello")).await.unwrap();
    h.bus.handle(complete_turn("s1", None)).await.unwrap();
    let (_, queued) = h.transport.sent().pop().unwrap();
    let event = queued.unwrap_event().unwrap();

    // First two export attempts fail, the third succeeds; the handler's
    // retry wrapper absorbs the failures.
    h.runtime.fail_export_times(2);

    h.bus.handle(Message::Event(event)).await.unwrap();

    assert_eq!(
        h.repository
            .get_session_history(&user(), &session)
            .await
            .unwrap(),
        Some(b"transcript".to_vec())
    );
}

#[tokio::test]
async fn permanently_failing_event_handler_is_swallowed() {
    let h = harness();
    h.bus.handle(start_turn("hello")).await.unwrap();
    h.bus.handle(complete_turn("s1", None)).await.unwrap();
    let (_, queued) = h.transport.sent().pop().unwrap();
    let event = queued.unwrap_event().unwrap();

    h.runtime.fail_export(true);
    assert!(h.bus.handle(Message::Event(event)).await.is_ok());
    assert!(h.blob.is_empty());
}

#[tokio::test]
async fn transport_send_failure_fails_the_command() {
    let h = harness();
    h.transport.fail_sends(true);

    let err = h.bus.handle(start_turn("hello")).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::QueueSendFailed);

    // The aggregate was persisted before the transport was asked to send.
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn reads_after_cache_eviction_fall_back_to_durable() {
    let h = harness();
    h.bus.handle(start_turn("hello")).await.unwrap();

    // Simulate cache eviction, with backfill also unavailable.
    let key = context().cache_key(&user());
    h.cache.delete(&key).await.unwrap();
    h.cache.fail_puts(true);

    let fetches_before = h.store.fetch_calls();
    let view = h.bus.handle(get_conversation()).await.unwrap();
    assert_eq!(view["turns"][0]["status"], "started");
    assert_eq!(h.store.fetch_calls(), fetches_before + 1);
}

#[tokio::test]
async fn cache_read_failure_surfaces_as_a_storage_error() {
    let h = harness();
    h.bus.handle(start_turn("hello")).await.unwrap();

    let fetches_before = h.store.fetch_calls();
    h.cache.fail_gets(true);

    let err = h.bus.handle(get_conversation()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::StorageError);
    assert_eq!(err.detail("entity"), Some("Conversation"));
    assert_eq!(err.detail("backend"), Some("cache"));

    // The durable tier was never consulted.
    assert_eq!(h.store.fetch_calls(), fetches_before);
}

#[tokio::test]
async fn durable_failure_surfaces_as_a_storage_error() {
    let h = harness();
    h.bus.handle(start_turn("hello")).await.unwrap();

    let key = context().cache_key(&user());
    h.cache.delete(&key).await.unwrap();
    h.store.fail_fetches(true);

    let err = h.bus.handle(get_conversation()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::StorageError);
    assert_eq!(err.detail("entity"), Some("Conversation"));
    assert_eq!(err.detail("backend"), Some("database"));
}
