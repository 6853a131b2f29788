//! Chat session bridge to the external agent runtime.
//!
//! Every message send goes through the same preflight: probe the runtime's
//! health, and if it is not ready push credentials and start it. A start
//! failure is fatal for the send; a failed session restore is logged and
//! skipped, because the runtime can still answer without the old history.
//! The raw byte stream the runtime returns is decoded into structured
//! events here, frame by frame, tolerating frames split across chunks.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::domain::foundation::{CoreError, SessionId, UserId};
use crate::ports::{
    AgentRuntime, ConversationRepository, RuntimeByteStream, RuntimeCredentials, RuntimeEvent,
    RuntimeHealth,
};

/// Structured runtime events after SSE decoding.
pub type RuntimeEventStream = Pin<Box<dyn Stream<Item = Result<RuntimeEvent, CoreError>> + Send>>;

/// Bridges chat messages to the external runtime and decodes its responses.
pub struct ChatSessionService {
    runtime: Arc<dyn AgentRuntime>,
    repository: Arc<dyn ConversationRepository>,
    credentials: RuntimeCredentials,
}

impl ChatSessionService {
    pub fn new(
        runtime: Arc<dyn AgentRuntime>,
        repository: Arc<dyn ConversationRepository>,
        credentials: RuntimeCredentials,
    ) -> Self {
        Self {
            runtime,
            repository,
            credentials,
        }
    }

    /// Sends a chat message and returns the decoded response stream.
    ///
    /// Passing a `session_id` continues that session; `None` starts a fresh
    /// one. The stream's terminal [`RuntimeEvent::Result`] carries the
    /// session id the runtime settled on and the accumulated cost.
    ///
    /// # Errors
    ///
    /// - `RuntimeStartFailed` / `RuntimeUnavailable` when the runtime cannot
    ///   be brought up
    /// - `RuntimeRequestFailed` when the send itself is rejected
    pub async fn process_message(
        &self,
        user_id: &UserId,
        text: &str,
        session_id: Option<&SessionId>,
    ) -> Result<RuntimeEventStream, CoreError> {
        self.ensure_runtime_ready(user_id, session_id).await?;
        let bytes = self.runtime.send_message(text, session_id).await?;
        Ok(decode_sse_stream(bytes))
    }

    /// Brings the runtime to a ready state, restoring session history into
    /// a freshly started instance when a continued session needs it.
    async fn ensure_runtime_ready(
        &self,
        user_id: &UserId,
        session_id: Option<&SessionId>,
    ) -> Result<(), CoreError> {
        match self.runtime.health().await {
            Ok(RuntimeHealth::Ready) => return Ok(()),
            Ok(health) => {
                info!(?health, "runtime not ready, starting it");
            }
            Err(err) => {
                warn!(%err, "runtime health probe failed, attempting cold start");
            }
        }

        self.runtime.push_credentials(&self.credentials).await?;
        self.runtime.start().await?;

        // A restarted runtime lost its in-memory sessions. Restoring the
        // persisted history is best effort: without it the session simply
        // continues without its earlier turns.
        if let Some(session_id) = session_id {
            self.restore_session_history(user_id, session_id).await;
        }

        Ok(())
    }

    async fn restore_session_history(&self, user_id: &UserId, session_id: &SessionId) {
        match self.repository.get_session_history(user_id, session_id).await {
            Ok(Some(history)) => {
                if let Err(err) = self.runtime.restore_session(session_id, &history).await {
                    warn!(
                        %err,
                        session_id = session_id.as_str(),
                        "session restore failed, continuing without history"
                    );
                }
            }
            Ok(None) => {
                debug!(
                    session_id = session_id.as_str(),
                    "no persisted history for session"
                );
            }
            Err(err) => {
                warn!(
                    %err,
                    session_id = session_id.as_str(),
                    "could not read session history, continuing without it"
                );
            }
        }
    }
}

/// Accumulates raw bytes and yields complete SSE frames.
///
/// Frames are terminated by a blank line, with either LF or CRLF line
/// endings. Chunks may split a frame at any byte, including mid-codepoint,
/// so the buffer stays `Vec<u8>` until a whole frame is available.
struct SseFrameDecoder {
    buffer: Vec<u8>,
}

impl SseFrameDecoder {
    fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Feeds a chunk and returns every frame it completed.
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some((end, terminator)) = next_frame_boundary(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..end + terminator).collect();
            frames.push(String::from_utf8_lossy(&frame[..end]).into_owned());
        }
        frames
    }

    /// Flushes a trailing frame the stream ended without terminating.
    fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        let text = String::from_utf8_lossy(&rest);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// Finds the earliest blank-line frame terminator, LF or CRLF.
///
/// Returns the frame's byte length and the terminator's.
fn next_frame_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer
        .windows(2)
        .position(|window| window == b"\n\n")
        .map(|at| (at, 2));
    let crlf = buffer
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|at| (at, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Parses one SSE frame into a runtime event.
///
/// Corrupt frames are logged and skipped rather than ending the stream; a
/// single garbled frame must not swallow the rest of a response.
fn decode_frame(frame: &str) -> Option<RuntimeEvent> {
    let data = frame
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter_map(|line| {
            line.strip_prefix("data: ")
                .or_else(|| line.strip_prefix("data:"))
        })
        .collect::<Vec<_>>()
        .join("\n");

    if data.is_empty() {
        return None;
    }

    match serde_json::from_str::<RuntimeEvent>(&data) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(%err, "skipping undecodable runtime frame");
            None
        }
    }
}

/// Decodes a raw runtime byte stream into structured events.
fn decode_sse_stream(bytes: RuntimeByteStream) -> RuntimeEventStream {
    struct DecodeState {
        bytes: RuntimeByteStream,
        decoder: SseFrameDecoder,
        pending: VecDeque<Result<RuntimeEvent, CoreError>>,
        done: bool,
    }

    let state = DecodeState {
        bytes,
        decoder: SseFrameDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    Box::pin(futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.done {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    for frame in state.decoder.push(&chunk) {
                        if let Some(event) = decode_frame(&frame) {
                            state.pending.push_back(Ok(event));
                        }
                    }
                }
                Some(Err(err)) => {
                    state.done = true;
                    state.pending.push_back(Err(err));
                }
                None => {
                    state.done = true;
                    if let Some(frame) = state.decoder.finish() {
                        if let Some(event) = decode_frame(&frame) {
                            state.pending.push_back(Ok(event));
                        }
                    }
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    mod frame_decoder {
        use super::*;

        #[test]
        fn yields_nothing_for_a_partial_frame() {
            let mut decoder = SseFrameDecoder::new();
            assert!(decoder.push(b"data: {\"type\":").is_empty());
        }

        #[test]
        fn completes_a_frame_split_across_chunks() {
            let mut decoder = SseFrameDecoder::new();
            assert!(decoder.push(b"data: {\"type\":\"assistant\",").is_empty());
            let frames = decoder.push(b"\"text\":\"hi\"}\n\n");
            assert_eq!(frames, vec!["data: {\"type\":\"assistant\",\"text\":\"hi\"}"]);
        }

        #[test]
        fn splits_multiple_frames_in_one_chunk() {
            let mut decoder = SseFrameDecoder::new();
            let frames = decoder.push(b"data: a\n\ndata: b\n\n");
            assert_eq!(frames, vec!["data: a", "data: b"]);
        }

        #[test]
        fn splits_crlf_delimited_frames() {
            let mut decoder = SseFrameDecoder::new();
            let frames = decoder.push(b"data: a\r\n\r\ndata: b\r\n\r\n");
            assert_eq!(frames, vec!["data: a", "data: b"]);
        }

        #[test]
        fn completes_a_crlf_frame_split_across_chunks() {
            let mut decoder = SseFrameDecoder::new();
            assert!(decoder.push(b"data: {\"type\":\"assistant\"}\r\n").is_empty());
            let frames = decoder.push(b"\r\n");
            assert_eq!(frames, vec!["data: {\"type\":\"assistant\"}"]);
        }

        #[test]
        fn handles_mixed_line_endings_in_stream_order() {
            let mut decoder = SseFrameDecoder::new();
            let frames = decoder.push(b"data: a\n\ndata: b\r\n\r\ndata: c\n\n");
            assert_eq!(frames, vec!["data: a", "data: b", "data: c"]);
        }

        #[test]
        fn finish_flushes_an_unterminated_trailing_frame() {
            let mut decoder = SseFrameDecoder::new();
            assert!(decoder.push(b"data: tail").is_empty());
            assert_eq!(decoder.finish(), Some("data: tail".to_string()));
            assert_eq!(decoder.finish(), None);
        }
    }

    mod frame_parsing {
        use super::*;

        #[test]
        fn parses_an_assistant_frame() {
            let event = decode_frame("data: {\"type\":\"assistant\",\"text\":\"hi\"}").unwrap();
            assert_eq!(
                event,
                RuntimeEvent::Assistant {
                    text: "hi".to_string(),
                    session_id: None,
                }
            );
        }

        #[test]
        fn joins_multi_line_data_fields() {
            let event = decode_frame(
                "data: {\"type\":\"assistant\",\ndata: \"text\":\"hi\"}",
            );
            assert!(event.is_some());
        }

        #[test]
        fn strips_carriage_returns() {
            let event = decode_frame("data: {\"type\":\"assistant\",\"text\":\"hi\"}\r");
            assert!(event.is_some());
        }

        #[test]
        fn skips_corrupt_frames() {
            assert!(decode_frame("data: {not json").is_none());
        }

        #[test]
        fn ignores_comment_and_event_lines() {
            assert!(decode_frame(": keepalive").is_none());
            assert!(decode_frame("event: ping").is_none());
        }
    }

    mod stream_decoding {
        use super::*;

        fn byte_stream(chunks: Vec<Result<Vec<u8>, CoreError>>) -> RuntimeByteStream {
            Box::pin(futures::stream::iter(chunks))
        }

        #[tokio::test]
        async fn decodes_a_full_exchange_ending_with_a_result() {
            let chunks = vec![
                Ok(b"data: {\"type\":\"assistant\",\"text\":\"hel".to_vec()),
                Ok(b"lo\"}\n\ndata: {\"type\":\"result\",\"session_id\":\"s1\",\"total_cost_usd\":0.02}\n\n".to_vec()),
            ];
            let events: Vec<_> = decode_sse_stream(byte_stream(chunks)).collect().await;

            assert_eq!(events.len(), 2);
            assert_eq!(
                events[0].as_ref().unwrap(),
                &RuntimeEvent::Assistant {
                    text: "hello".to_string(),
                    session_id: None,
                }
            );
            assert!(events[1].as_ref().unwrap().is_terminal());
        }

        #[tokio::test]
        async fn decodes_a_crlf_delimited_exchange() {
            let chunks = vec![
                Ok(b"data: {\"type\":\"assistant\",\"text\":\"hi\"}\r\n\r\n".to_vec()),
                Ok(b"data: {\"type\":\"result\",\"session_id\":\"s1\"}\r\n\r\n".to_vec()),
            ];
            let events: Vec<_> = decode_sse_stream(byte_stream(chunks)).collect().await;

            assert_eq!(events.len(), 2);
            assert_eq!(
                events[0].as_ref().unwrap(),
                &RuntimeEvent::Assistant {
                    text: "hi".to_string(),
                    session_id: None,
                }
            );
            assert!(events[1].as_ref().unwrap().is_terminal());
        }

        #[tokio::test]
        async fn corrupt_frames_are_skipped_not_fatal() {
            let chunks = vec![Ok(
                b"data: garbage\n\ndata: {\"type\":\"assistant\",\"text\":\"ok\"}\n\n".to_vec(),
            )];
            let events: Vec<_> = decode_sse_stream(byte_stream(chunks)).collect().await;
            assert_eq!(events.len(), 1);
            assert!(events[0].is_ok());
        }

        #[tokio::test]
        async fn trailing_frame_without_terminator_is_flushed() {
            let chunks = vec![Ok(
                b"data: {\"type\":\"result\",\"session_id\":\"s9\"}".to_vec()
            )];
            let events: Vec<_> = decode_sse_stream(byte_stream(chunks)).collect().await;
            assert_eq!(events.len(), 1);
            assert!(events[0].as_ref().unwrap().is_terminal());
        }

        #[tokio::test]
        async fn transport_errors_surface_then_end_the_stream() {
            use crate::domain::foundation::{Backend, ErrorCode, StorageOp};
            let chunks = vec![
                Ok(b"data: {\"type\":\"assistant\",\"text\":\"a\"}\n\n".to_vec()),
                Err(CoreError::infrastructure(
                    ErrorCode::RuntimeRequestFailed,
                    Backend::Runtime,
                    StorageOp::Read,
                    "connection reset",
                )),
            ];
            let events: Vec<_> = decode_sse_stream(byte_stream(chunks)).collect().await;
            assert_eq!(events.len(), 2);
            assert!(events[0].is_ok());
            assert!(events[1].is_err());
        }
    }

    mod preflight {
        use super::*;
        use crate::domain::conversation::{Conversation, PlatformContext};
        use async_trait::async_trait;
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Mutex;

        struct StubRuntime {
            health: RuntimeHealth,
            starts: AtomicU32,
            credential_pushes: AtomicU32,
            restores: Mutex<Vec<SessionId>>,
            fail_start: bool,
            fail_restore: bool,
        }

        impl StubRuntime {
            fn new(health: RuntimeHealth) -> Self {
                Self {
                    health,
                    starts: AtomicU32::new(0),
                    credential_pushes: AtomicU32::new(0),
                    restores: Mutex::new(Vec::new()),
                    fail_start: false,
                    fail_restore: false,
                }
            }
        }

        #[async_trait]
        impl AgentRuntime for StubRuntime {
            async fn health(&self) -> Result<RuntimeHealth, CoreError> {
                Ok(self.health)
            }

            async fn push_credentials(
                &self,
                _credentials: &RuntimeCredentials,
            ) -> Result<(), CoreError> {
                self.credential_pushes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }

            async fn start(&self) -> Result<(), CoreError> {
                self.starts.fetch_add(1, Ordering::SeqCst);
                if self.fail_start {
                    Err(CoreError::domain(
                        crate::domain::foundation::ErrorCode::RuntimeStartFailed,
                        "won't start",
                    ))
                } else {
                    Ok(())
                }
            }

            async fn restore_session(
                &self,
                session_id: &SessionId,
                _history: &[u8],
            ) -> Result<(), CoreError> {
                self.restores.lock().unwrap().push(session_id.clone());
                if self.fail_restore {
                    Err(CoreError::domain(
                        crate::domain::foundation::ErrorCode::RuntimeRequestFailed,
                        "restore rejected",
                    ))
                } else {
                    Ok(())
                }
            }

            async fn send_message(
                &self,
                _text: &str,
                _session_id: Option<&SessionId>,
            ) -> Result<RuntimeByteStream, CoreError> {
                Ok(Box::pin(futures::stream::iter(vec![Ok(
                    b"data: {\"type\":\"result\",\"session_id\":\"s1\"}\n\n".to_vec(),
                )])))
            }

            async fn export_session(
                &self,
                _session_id: &SessionId,
            ) -> Result<Option<Vec<u8>>, CoreError> {
                Ok(None)
            }
        }

        struct StubRepository {
            history: Option<Vec<u8>>,
        }

        #[async_trait]
        impl ConversationRepository for StubRepository {
            async fn find_by_user_and_context(
                &self,
                _user_id: &UserId,
                _context: &PlatformContext,
            ) -> Result<Option<Conversation>, CoreError> {
                Ok(None)
            }

            async fn save(&self, _conversation: &Conversation) -> Result<(), CoreError> {
                Ok(())
            }

            async fn delete(&self, _conversation: &Conversation) -> Result<(), CoreError> {
                Ok(())
            }

            async fn exists(
                &self,
                _user_id: &UserId,
                _context: &PlatformContext,
            ) -> Result<bool, CoreError> {
                Ok(false)
            }

            async fn save_session_history(
                &self,
                _user_id: &UserId,
                _session_id: &SessionId,
                _history: &[u8],
                _project_id: Option<&str>,
            ) -> Result<(), CoreError> {
                Ok(())
            }

            async fn get_session_history(
                &self,
                _user_id: &UserId,
                _session_id: &SessionId,
            ) -> Result<Option<Vec<u8>>, CoreError> {
                Ok(self.history.clone())
            }

            async fn delete_session_history(
                &self,
                _user_id: &UserId,
                _session_id: &SessionId,
            ) -> Result<(), CoreError> {
                Ok(())
            }
        }

        fn service(runtime: Arc<StubRuntime>, history: Option<Vec<u8>>) -> ChatSessionService {
            ChatSessionService::new(
                runtime,
                Arc::new(StubRepository { history }),
                RuntimeCredentials::new("tok"),
            )
        }

        #[tokio::test]
        async fn ready_runtime_is_not_restarted() {
            let runtime = Arc::new(StubRuntime::new(RuntimeHealth::Ready));
            let svc = service(runtime.clone(), None);
            let user = UserId::new("U1").unwrap();

            svc.process_message(&user, "hi", None).await.unwrap();

            assert_eq!(runtime.starts.load(Ordering::SeqCst), 0);
            assert_eq!(runtime.credential_pushes.load(Ordering::SeqCst), 0);
        }

        #[tokio::test]
        async fn unavailable_runtime_gets_credentials_then_start() {
            let runtime = Arc::new(StubRuntime::new(RuntimeHealth::Unavailable));
            let svc = service(runtime.clone(), None);
            let user = UserId::new("U1").unwrap();

            svc.process_message(&user, "hi", None).await.unwrap();

            assert_eq!(runtime.credential_pushes.load(Ordering::SeqCst), 1);
            assert_eq!(runtime.starts.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn start_failure_is_fatal() {
            let mut runtime = StubRuntime::new(RuntimeHealth::Unavailable);
            runtime.fail_start = true;
            let svc = service(Arc::new(runtime), None);
            let user = UserId::new("U1").unwrap();

            assert!(svc.process_message(&user, "hi", None).await.is_err());
        }

        #[tokio::test]
        async fn restart_restores_persisted_history_for_continued_sessions() {
            let runtime = Arc::new(StubRuntime::new(RuntimeHealth::Unavailable));
            let svc = service(runtime.clone(), Some(b"{\"turn\":1}\n".to_vec()));
            let user = UserId::new("U1").unwrap();
            let session = SessionId::new("s1").unwrap();

            svc.process_message(&user, "hi", Some(&session)).await.unwrap();

            assert_eq!(runtime.restores.lock().unwrap().as_slice(), &[session]);
        }

        #[tokio::test]
        async fn restore_failure_does_not_fail_the_send() {
            let mut runtime = StubRuntime::new(RuntimeHealth::Unavailable);
            runtime.fail_restore = true;
            let svc = service(Arc::new(runtime), Some(b"history".to_vec()));
            let user = UserId::new("U1").unwrap();
            let session = SessionId::new("s1").unwrap();

            assert!(svc.process_message(&user, "hi", Some(&session)).await.is_ok());
        }

        #[tokio::test]
        async fn missing_history_skips_restore() {
            let runtime = Arc::new(StubRuntime::new(RuntimeHealth::Starting));
            let svc = service(runtime.clone(), None);
            let user = UserId::new("U1").unwrap();
            let session = SessionId::new("s1").unwrap();

            svc.process_message(&user, "hi", Some(&session)).await.unwrap();

            assert!(runtime.restores.lock().unwrap().is_empty());
        }
    }
}
