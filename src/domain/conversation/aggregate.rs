//! Conversation aggregate entity.
//!
//! # Aggregate Boundary
//!
//! Conversation is an aggregate root that owns its turns.
//! - Turns are created and transitioned only through the Conversation
//! - At most one turn is in flight (non-terminal) at a time
//! - Each mutation appends a domain event to an internal buffer; the caller
//!   drains the buffer with `collect_events` after persisting, so aggregate
//!   logic stays storage-agnostic

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ConversationId, CoreError, ErrorCode, SessionId, Timestamp, UserId};
use crate::domain::messaging::{
    ConversationTurnCompleted, ConversationTurnFailed, ConversationTurnStarted, Event,
    EventPayload,
};

use super::context::PlatformContext;
use super::turn::{ConversationTurn, TurnStatus};

/// Conversation aggregate - a multi-turn interaction with one platform user
/// in one platform context.
///
/// # Invariants
///
/// - `id` is globally unique
/// - `platform_user_id` and `context` are immutable after creation
/// - `turns` is append-only; existing turns only change status
/// - At most one turn is non-terminal at any time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    platform_user_id: UserId,
    context: PlatformContext,
    /// Latest externally-durable runtime session, if any.
    latest_session_id: Option<SessionId>,
    turns: Vec<ConversationTurn>,
    created_at: Timestamp,
    updated_at: Timestamp,
    /// Not-yet-published domain events; never persisted.
    #[serde(skip)]
    pending_events: Vec<Event>,
}

impl Conversation {
    /// Starts a brand-new conversation: no turns, no session.
    pub fn start_new(platform_user_id: UserId, context: PlatformContext) -> Self {
        let now = Timestamp::now();
        Self {
            id: ConversationId::new(),
            platform_user_id,
            context,
            latest_session_id: None,
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
            pending_events: Vec::new(),
        }
    }

    /// Reconstitutes a conversation from persistence (no validation).
    pub fn reconstitute(
        id: ConversationId,
        platform_user_id: UserId,
        context: PlatformContext,
        latest_session_id: Option<SessionId>,
        turns: Vec<ConversationTurn>,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            platform_user_id,
            context,
            latest_session_id,
            turns,
            created_at,
            updated_at,
            pending_events: Vec::new(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the conversation ID.
    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    /// Returns the platform user this conversation belongs to.
    pub fn platform_user_id(&self) -> &UserId {
        &self.platform_user_id
    }

    /// Returns the platform context (the natural external key).
    pub fn context(&self) -> &PlatformContext {
        &self.context
    }

    /// Returns the latest durable runtime session, if any.
    pub fn latest_session_id(&self) -> Option<&SessionId> {
        self.latest_session_id.as_ref()
    }

    /// Returns all turns in order.
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Returns the number of turns.
    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    /// Returns when the conversation was created.
    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    /// Returns when the conversation was last updated.
    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    /// Returns true while a turn is started but not yet terminal.
    pub fn has_turn_in_flight(&self) -> bool {
        self.turns.last().is_some_and(ConversationTurn::is_in_flight)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Opens a new turn for a user message.
    ///
    /// # Errors
    ///
    /// - `TurnAlreadyInFlight` if the previous turn has not reached a
    ///   terminal state
    pub fn start_turn(&mut self, user_message: impl Into<String>) -> Result<(), CoreError> {
        if self.has_turn_in_flight() {
            return Err(CoreError::domain(
                ErrorCode::TurnAlreadyInFlight,
                "a turn is already in flight for this conversation",
            )
            .with_detail("conversation_id", self.id.to_string()));
        }

        let user_message = user_message.into();
        self.turns.push(ConversationTurn::started(user_message.clone()));
        self.touch();

        self.pending_events.push(Event::queued(
            EventPayload::ConversationTurnStarted(ConversationTurnStarted {
                conversation_id: self.id,
                user_id: self.platform_user_id.clone(),
                context: self.context.clone(),
                user_message,
                turn_index: self.turns.len() - 1,
            }),
        ));
        Ok(())
    }

    /// Transitions the in-flight turn to completed and records the session
    /// the runtime settled on.
    ///
    /// # Errors
    ///
    /// - `NoTurnInFlight` if there is no started turn to complete
    pub fn complete_turn(
        &mut self,
        session_id: SessionId,
        cost_usd: Option<f64>,
    ) -> Result<(), CoreError> {
        let turn_index = self.in_flight_index()?;
        let turn = &mut self.turns[turn_index];
        turn.status = TurnStatus::Completed;
        turn.session_id = Some(session_id.clone());
        turn.cost_usd = cost_usd;

        self.latest_session_id = Some(session_id.clone());
        self.touch();

        self.pending_events.push(Event::queued(
            EventPayload::ConversationTurnCompleted(ConversationTurnCompleted {
                conversation_id: self.id,
                user_id: self.platform_user_id.clone(),
                session_id,
                cost_usd,
                turn_index,
            }),
        ));
        Ok(())
    }

    /// Transitions the in-flight turn to failed.
    ///
    /// `partial_session_id` is whatever session id was captured before the
    /// failure, so downstream consumers can still attempt persistence or
    /// cleanup for partially-streamed responses.
    ///
    /// # Errors
    ///
    /// - `NoTurnInFlight` if there is no started turn to fail
    pub fn fail_turn(
        &mut self,
        partial_session_id: Option<SessionId>,
        error_message: impl Into<String>,
    ) -> Result<(), CoreError> {
        let turn_index = self.in_flight_index()?;
        let error_message = error_message.into();
        let turn = &mut self.turns[turn_index];
        turn.status = TurnStatus::Failed;
        turn.session_id = partial_session_id.clone();
        turn.error_message = Some(error_message.clone());
        self.touch();

        self.pending_events.push(Event::queued(
            EventPayload::ConversationTurnFailed(ConversationTurnFailed {
                conversation_id: self.id,
                user_id: self.platform_user_id.clone(),
                partial_session_id,
                error_message,
                turn_index,
            }),
        ));
        Ok(())
    }

    /// Drains the buffered domain events: returns them in append order and
    /// clears the buffer, so a second call yields nothing.
    pub fn collect_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.pending_events)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Private helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn in_flight_index(&self) -> Result<usize, CoreError> {
        match self.turns.last() {
            Some(turn) if turn.is_in_flight() => Ok(self.turns.len() - 1),
            _ => Err(CoreError::domain(
                ErrorCode::NoTurnInFlight,
                "no turn is in flight for this conversation",
            )
            .with_detail("conversation_id", self.id.to_string())),
        }
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}
