//! Orchestrator - runs one conversation turn per inbound message
//!
//! Each turn is stateless apart from the session record: the position is
//! recomputed from the stored dialogue context, the dialogue engine is
//! advanced, its context is written back, and the handler registered for
//! the position decides the reply.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use sessionstore::{PhoneNumber, SessionUpdate};
use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

use super::handlers::{Collaborators, PositionHandler, TurnInput, standard_handlers};
use super::outcome::{CLEARED_REPLY, Diagnostic, InboundMessage, ResetReason, TurnError, TurnOutcome};
use super::position::{ConversationPosition, PositionTable};
use crate::dialogue::DialogueEngine;

/// Command that wipes the sender's session before anything else runs
const CLEAR_COMMAND: &str = "clear";

/// Whether a message body is the reset command
pub fn is_clear_command(body: &str) -> bool {
    body.trim().eq_ignore_ascii_case(CLEAR_COMMAND)
}

/// Top-level conversation state machine
pub struct Orchestrator {
    engine: Arc<dyn DialogueEngine>,
    positions: PositionTable,
    services: Collaborators,
    handlers: HashMap<ConversationPosition, Arc<dyn PositionHandler>>,
}

impl Orchestrator {
    /// Create an orchestrator with the standard handler for every position
    pub fn new(engine: Arc<dyn DialogueEngine>, positions: PositionTable, services: Collaborators) -> Self {
        debug!("Orchestrator::new: called");
        Self {
            engine,
            positions,
            services,
            handlers: standard_handlers(),
        }
    }

    /// Replace the handler for a position
    pub fn register(&mut self, position: ConversationPosition, handler: Arc<dyn PositionHandler>) {
        debug!(%position, "register: called");
        self.handlers.insert(position, handler);
    }

    /// Handle one inbound message
    ///
    /// Errors are logged here and returned to the transport; no reply is
    /// produced for a failed turn.
    pub async fn handle(&self, message: InboundMessage) -> Result<TurnOutcome, TurnError> {
        let turn_id = Uuid::now_v7();
        let span = info_span!("turn", %turn_id);

        async move {
            let started = Instant::now();
            let result = self.run_turn(message).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match &result {
                Ok(outcome) => info!(
                    elapsed_ms,
                    position = %outcome.position,
                    diagnostics = outcome.diagnostics.len(),
                    "Turn completed"
                ),
                Err(e) => error!(elapsed_ms, error = %e, "Turn failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_turn(&self, message: InboundMessage) -> Result<TurnOutcome, TurnError> {
        debug!("run_turn: called");
        let (phone, text) = message.validate()?;
        info!(%phone, body = %text, "Message received");

        if is_clear_command(&text) {
            return self.clear(&phone).await;
        }

        let record = self.services.sessions.get(&phone).await?;
        let prior = record.as_ref().and_then(|r| r.dialogue_context.as_ref());
        let node = prior.and_then(|context| self.engine.current_node(context));
        let position = self.positions.resolve(node.as_deref());
        debug!(%phone, ?node, %position, "run_turn: position resolved");

        let turn = self.engine.advance(prior, &text).await?;
        let next = self.positions.resolve(turn.node_id.as_deref());
        debug!(%phone, node = ?turn.node_id, %next, "run_turn: dialogue advanced");

        let mut update = SessionUpdate::default();
        if let Some(context) = turn.context {
            update = update.with_context(context);
        }
        if let Some(question) = next.question()
            && next.question() != position.question()
        {
            update = update.ask(question);
        }
        if !update.is_empty() {
            self.services.sessions.put(&phone, update).await?;
        }

        let input = TurnInput {
            phone: &phone,
            text: &text,
            position,
            engine_reply: &turn.reply,
            record: record.as_ref(),
        };
        let mut outcome = match self.handlers.get(&position) {
            Some(handler) => handler.handle(&input, &self.services).await?,
            None => {
                debug!(%position, "run_turn: no handler registered, passing reply through");
                TurnOutcome::text(turn.reply.as_str())
            }
        };
        outcome.position = position;

        for diagnostic in &outcome.diagnostics {
            debug!(%phone, ?diagnostic, "run_turn: diagnostic");
        }
        if let Some(record) = self.services.sessions.get(&phone).await? {
            info!(%phone, survey = %record.summary(), "Survey context");
        }

        Ok(outcome)
    }

    async fn clear(&self, phone: &PhoneNumber) -> Result<TurnOutcome, TurnError> {
        debug!(%phone, "clear: called");
        let existed = self.services.sessions.delete(phone).await?;
        info!(%phone, existed, "Cleared persisted context");
        Ok(TurnOutcome::text(CLEARED_REPLY).with_diagnostics(vec![Diagnostic::SessionReset {
            reason: ResetReason::ClearCommand,
        }]))
    }
}
