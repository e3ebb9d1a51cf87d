//! Turn inputs, outcomes and errors

use serde::Serialize;
use sessionstore::{PhoneNumber, SurveyQuestion};
use thiserror::Error;
use tracing::debug;

use super::ConversationPosition;
use crate::dialogue::DialogueError;
use crate::geo::GeoError;
use crate::session::SessionError;

/// Reply to the reset command
pub const CLEARED_REPLY: &str = "Cleared persisted context";

/// Reply when the survivor is outside every disaster zone or rejects their address
pub const NOT_IN_DANGER_REPLY: &str = "You are not in immediate danger. Please keep safe and stay in your location. \
                                       Response back if your status changes.";

/// Reply when an address confirmation arrives with no address on file
pub const RESTART_REPLY: &str = "Something went wrong, please reply to start over again";

/// Message as received from the transport
#[derive(Debug, Clone, Default)]
pub struct InboundMessage {
    /// Sender's phone number
    pub from: Option<String>,

    /// Message text
    pub body: Option<String>,
}

impl InboundMessage {
    pub fn new(from: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            from: Some(from.into()),
            body: Some(body.into()),
        }
    }

    /// Both fields are required; a blank sender is as good as none
    pub fn validate(self) -> Result<(PhoneNumber, String), TurnError> {
        debug!(from = ?self.from, "validate: called");
        let body = self
            .body
            .ok_or_else(|| TurnError::InvalidInput("message body not present".to_string()))?;
        let from = self
            .from
            .ok_or_else(|| TurnError::InvalidInput("sender phone number not present".to_string()))?;
        let phone = PhoneNumber::parse(&from).map_err(|e| TurnError::InvalidInput(e.to_string()))?;
        Ok((phone, body))
    }
}

/// Conditions that degrade a reply without failing the turn
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A yes/no reply was neither yes nor no; recorded as no
    UnrecognizedConfirmation { question: SurveyQuestion, text: String },

    /// The geocoder did not return exactly one match; nothing was stored
    UnresolvedAddress { text: String, candidates: Vec<String> },

    /// The geocoder call failed; treated as no match
    GeocodeFailed { text: String, error: String },

    /// An answer arrived for a question the session never recorded asking
    AnswerWithoutQuestion { question: SurveyQuestion },

    /// The session record was deleted
    SessionReset { reason: ResetReason },
}

/// Why a session was reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetReason {
    /// The survivor sent the reset command
    ClearCommand,
    /// Confirmed address lies outside every disaster zone
    OutsideDisasterZone,
    /// The survivor did not confirm their address
    AddressNotConfirmed,
    /// Address confirmation arrived with no address on file
    MissingAddress,
}

/// Result of one conversation turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    /// Text sent back to the survivor
    pub reply: String,

    /// Media link attached to the reply
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,

    /// Position the incoming message was answering
    pub position: ConversationPosition,

    /// Soft conditions observed during the turn
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl TurnOutcome {
    /// Plain text reply with no media
    pub fn text(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            media: None,
            position: ConversationPosition::Other,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_media(mut self, media: Option<String>) -> Self {
        self.media = media;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics.extend(diagnostics);
        self
    }

    /// Whether the turn ended with the session being deleted
    pub fn reset_reason(&self) -> Option<ResetReason> {
        self.diagnostics.iter().find_map(|d| match d {
            Diagnostic::SessionReset { reason } => Some(*reason),
            _ => None,
        })
    }
}

/// Errors that fail a turn outright
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Dialogue error: {0}")]
    Dialogue(#[from] DialogueError),

    #[error("Location tracking failed: {0}")]
    Tracker(#[source] GeoError),

    #[error("Map preview failed: {0}")]
    Preview(#[source] GeoError),
}

impl TurnError {
    /// Whether the request itself was at fault
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, TurnError::InvalidInput(_))
    }
}
