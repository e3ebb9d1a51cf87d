//! Per-position turn handlers
//!
//! The orchestrator looks the current position up in a handler table; each
//! handler decides what to persist and what to reply.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sessionstore::{GeoPoint, PhoneNumber, SessionRecord, SessionUpdate, SurveyQuestion};
use tracing::{debug, error, info, warn};

use super::address::AddressResolutionStep;
use super::confirmation::{Confirmation, parse_confirmation};
use super::outcome::{Diagnostic, NOT_IN_DANGER_REPLY, RESTART_REPLY, ResetReason, TurnError, TurnOutcome};
use super::position::ConversationPosition;
use crate::geo::{Geocoder, LocationTracker, MediaPreview};
use crate::geofence::Geofence;
use crate::session::{SessionRepository, ZoneSource};

/// Services a handler may call during a turn
#[derive(Clone)]
pub struct Collaborators {
    pub sessions: Arc<dyn SessionRepository>,
    pub zones: Arc<dyn ZoneSource>,
    pub geocoder: Arc<dyn Geocoder>,
    pub tracker: Arc<dyn LocationTracker>,
    pub preview: Arc<dyn MediaPreview>,
    pub geofence: Geofence,
}

impl Collaborators {
    /// Whether a point lies in any disaster zone, reading the zones fresh
    pub async fn in_disaster_zone(&self, point: GeoPoint) -> Result<bool, TurnError> {
        let zones = self.zones.zones().await?;
        Ok(self.geofence.contains(point, &zones))
    }
}

/// What a handler gets to see of the current turn
#[derive(Debug)]
pub struct TurnInput<'a> {
    pub phone: &'a PhoneNumber,

    /// The survivor's message, untrimmed
    pub text: &'a str,

    /// Position the message is answering
    pub position: ConversationPosition,

    /// Reply the dialogue engine generated for this message
    pub engine_reply: &'a str,

    /// Session record as it was before this turn
    pub record: Option<&'a SessionRecord>,
}

/// Strategy for one conversation position
#[async_trait]
pub trait PositionHandler: Send + Sync {
    async fn handle(&self, input: &TurnInput<'_>, services: &Collaborators) -> Result<TurnOutcome, TurnError>;
}

/// Handler table for the intake flow
pub fn standard_handlers() -> HashMap<ConversationPosition, Arc<dyn PositionHandler>> {
    let mut handlers: HashMap<ConversationPosition, Arc<dyn PositionHandler>> = HashMap::new();
    handlers.insert(ConversationPosition::Other, Arc::new(PassThrough));
    handlers.insert(ConversationPosition::AddressInput, Arc::new(AddressResolutionStep));
    handlers.insert(ConversationPosition::AddressConfirmation, Arc::new(AddressConfirmation));
    handlers.insert(
        ConversationPosition::InjuryConfirmation,
        Arc::new(SurveyAnswer::new(SurveyQuestion::Injured)),
    );
    handlers.insert(
        ConversationPosition::HasVehicle,
        Arc::new(SurveyAnswer::new(SurveyQuestion::HasVehicle)),
    );
    handlers.insert(
        ConversationPosition::HasSpaceInVehicle,
        Arc::new(SurveyAnswer::new(SurveyQuestion::HasSpaceInVehicle)),
    );
    handlers
}

/// Parse a yes/no reply and persist it for the question
async fn record_answer(
    input: &TurnInput<'_>,
    services: &Collaborators,
    question: SurveyQuestion,
) -> Result<(Confirmation, Vec<Diagnostic>), TurnError> {
    debug!(phone = %input.phone, %question, "record_answer: called");
    let mut diagnostics = Vec::new();
    let confirmation = parse_confirmation(input.text);
    if !confirmation.recognized {
        diagnostics.push(Diagnostic::UnrecognizedConfirmation {
            question,
            text: input.text.to_string(),
        });
    }

    let asked = input.record.map(|r| r.slot(question).was_asked()).unwrap_or(false);
    if !asked {
        warn!(phone = %input.phone, %question, "Answer received for a question never recorded as asked");
        diagnostics.push(Diagnostic::AnswerWithoutQuestion { question });
    }

    services
        .sessions
        .put(input.phone, SessionUpdate::default().answer(question, confirmation.value))
        .await?;
    info!(phone = %input.phone, %question, answer = confirmation.value, "Survey answer persisted");

    Ok((confirmation, diagnostics))
}

/// Reply with whatever the dialogue engine said
pub struct PassThrough;

#[async_trait]
impl PositionHandler for PassThrough {
    async fn handle(&self, input: &TurnInput<'_>, _services: &Collaborators) -> Result<TurnOutcome, TurnError> {
        debug!(position = %input.position, "PassThrough::handle: called");
        Ok(TurnOutcome::text(input.engine_reply))
    }
}

/// Persist a yes/no answer and pass the engine's reply through
pub struct SurveyAnswer {
    question: SurveyQuestion,
}

impl SurveyAnswer {
    pub fn new(question: SurveyQuestion) -> Self {
        Self { question }
    }
}

#[async_trait]
impl PositionHandler for SurveyAnswer {
    async fn handle(&self, input: &TurnInput<'_>, services: &Collaborators) -> Result<TurnOutcome, TurnError> {
        debug!(question = %self.question, "SurveyAnswer::handle: called");
        let (_, diagnostics) = record_answer(input, services, self.question).await?;
        Ok(TurnOutcome::text(input.engine_reply).with_diagnostics(diagnostics))
    }
}

/// Confirm the stored address and decide whether the survivor is at risk
///
/// Only a confirmed address inside a disaster zone keeps the conversation
/// going; every other outcome deletes the session.
pub struct AddressConfirmation;

#[async_trait]
impl PositionHandler for AddressConfirmation {
    async fn handle(&self, input: &TurnInput<'_>, services: &Collaborators) -> Result<TurnOutcome, TurnError> {
        debug!(phone = %input.phone, "AddressConfirmation::handle: called");
        let (confirmation, mut diagnostics) =
            record_answer(input, services, SurveyQuestion::AddressConfirmed).await?;

        let address = services.sessions.get(input.phone).await?.and_then(|r| r.address);
        let Some(address) = address else {
            error!(
                phone = %input.phone,
                "User sent confirmation but address was not found in session, clearing session"
            );
            services.sessions.delete(input.phone).await?;
            diagnostics.push(Diagnostic::SessionReset {
                reason: ResetReason::MissingAddress,
            });
            return Ok(TurnOutcome::text(RESTART_REPLY).with_diagnostics(diagnostics));
        };

        let reason = if !confirmation.value {
            Some(ResetReason::AddressNotConfirmed)
        } else if !services.in_disaster_zone(address.point()).await? {
            Some(ResetReason::OutsideDisasterZone)
        } else {
            None
        };

        match reason {
            Some(reason) => {
                info!(phone = %input.phone, address = %address.formatted, ?reason, "Survivor not in immediate danger");
                services.sessions.delete(input.phone).await?;
                diagnostics.push(Diagnostic::SessionReset { reason });
                Ok(TurnOutcome::text(NOT_IN_DANGER_REPLY).with_diagnostics(diagnostics))
            }
            None => {
                info!(phone = %input.phone, address = %address.formatted, "Survivor inside a disaster zone");
                Ok(TurnOutcome::text(input.engine_reply).with_diagnostics(diagnostics))
            }
        }
    }
}
