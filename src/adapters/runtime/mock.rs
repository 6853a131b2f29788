//! Scripted mock runtime for tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use crate::domain::foundation::{CoreError, ErrorCode, SessionId};
use crate::ports::{AgentRuntime, RuntimeByteStream, RuntimeCredentials, RuntimeHealth};

/// Scripted [`AgentRuntime`] double.
///
/// Health answers follow a scripted sequence (then stay at the last value),
/// responses replay canned SSE chunks, and every interaction is recorded
/// for assertions.
pub struct MockAgentRuntime {
    health_script: Mutex<VecDeque<RuntimeHealth>>,
    response_chunks: Mutex<Vec<Vec<u8>>>,
    exported: Mutex<HashMap<SessionId, Vec<u8>>>,
    sent_messages: Mutex<Vec<(String, Option<SessionId>)>>,
    restored: Mutex<Vec<SessionId>>,
    start_calls: AtomicU32,
    credential_pushes: AtomicU32,
    fail_start: AtomicBool,
    export_failures_left: AtomicU32,
}

impl Default for MockAgentRuntime {
    fn default() -> Self {
        Self {
            health_script: Mutex::new(VecDeque::new()),
            response_chunks: Mutex::new(vec![
                b"data: {\"type\":\"result\",\"session_id\":\"mock-session\"}\n\n".to_vec(),
            ]),
            exported: Mutex::new(HashMap::new()),
            sent_messages: Mutex::new(Vec::new()),
            restored: Mutex::new(Vec::new()),
            start_calls: AtomicU32::new(0),
            credential_pushes: AtomicU32::new(0),
            fail_start: AtomicBool::new(false),
            export_failures_left: AtomicU32::new(0),
        }
    }
}

impl MockAgentRuntime {
    /// A runtime that reports `Ready` and answers with a terminal result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the health answers; after the script runs out the runtime
    /// reports `Ready`.
    pub fn with_health_sequence(self, sequence: Vec<RuntimeHealth>) -> Self {
        *self.health_script.lock().unwrap_or_else(|e| e.into_inner()) = sequence.into();
        self
    }

    /// Replaces the canned response chunks.
    pub fn with_response_chunks(self, chunks: Vec<Vec<u8>>) -> Self {
        *self.response_chunks.lock().unwrap_or_else(|e| e.into_inner()) = chunks;
        self
    }

    /// Seeds a transcript to be returned by `export_session`.
    pub fn with_exported_session(self, session_id: SessionId, transcript: Vec<u8>) -> Self {
        self.exported
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(session_id, transcript);
        self
    }

    pub fn fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    pub fn fail_export(&self, fail: bool) {
        self.export_failures_left
            .store(if fail { u32::MAX } else { 0 }, Ordering::SeqCst);
    }

    /// Fails the next `n` export calls, then succeeds.
    pub fn fail_export_times(&self, n: u32) {
        self.export_failures_left.store(n, Ordering::SeqCst);
    }

    pub fn start_calls(&self) -> u32 {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn credential_pushes(&self) -> u32 {
        self.credential_pushes.load(Ordering::SeqCst)
    }

    pub fn sent_messages(&self) -> Vec<(String, Option<SessionId>)> {
        self.sent_messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn restored_sessions(&self) -> Vec<SessionId> {
        self.restored.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl AgentRuntime for MockAgentRuntime {
    async fn health(&self) -> Result<RuntimeHealth, CoreError> {
        let mut script = self.health_script.lock().unwrap_or_else(|e| e.into_inner());
        Ok(script.pop_front().unwrap_or(RuntimeHealth::Ready))
    }

    async fn push_credentials(&self, _credentials: &RuntimeCredentials) -> Result<(), CoreError> {
        self.credential_pushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn start(&self) -> Result<(), CoreError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(CoreError::domain(
                ErrorCode::RuntimeStartFailed,
                "scripted start failure",
            ));
        }
        Ok(())
    }

    async fn restore_session(
        &self,
        session_id: &SessionId,
        _history: &[u8],
    ) -> Result<(), CoreError> {
        self.restored
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(session_id.clone());
        Ok(())
    }

    async fn send_message(
        &self,
        text: &str,
        session_id: Option<&SessionId>,
    ) -> Result<RuntimeByteStream, CoreError> {
        self.sent_messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((text.to_string(), session_id.cloned()));
        let chunks: Vec<Result<Vec<u8>, CoreError>> = self
            .response_chunks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .map(Ok)
            .collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn export_session(&self, session_id: &SessionId) -> Result<Option<Vec<u8>>, CoreError> {
        let left = self.export_failures_left.load(Ordering::SeqCst);
        if left > 0 {
            if left != u32::MAX {
                self.export_failures_left.fetch_sub(1, Ordering::SeqCst);
            }
            return Err(CoreError::domain(
                ErrorCode::RuntimeRequestFailed,
                "scripted export failure",
            ));
        }
        let exported = self.exported.lock().unwrap_or_else(|e| e.into_inner());
        Ok(exported.get(session_id).cloned())
    }
}
