//! Conversation core
//!
//! Maps an inbound message plus the persisted session into a position, runs
//! the handler for that position, and returns the reply for the survivor.

mod address;
mod confirmation;
mod handlers;
mod orchestrator;
mod outcome;
mod position;

pub use address::AddressResolutionStep;
pub use confirmation::{Confirmation, parse_confirmation};
pub use handlers::{
    AddressConfirmation, Collaborators, PassThrough, PositionHandler, SurveyAnswer, TurnInput, standard_handlers,
};
pub use orchestrator::{Orchestrator, is_clear_command};
pub use outcome::{
    CLEARED_REPLY, Diagnostic, InboundMessage, NOT_IN_DANGER_REPLY, RESTART_REPLY, ResetReason, TurnError, TurnOutcome,
};
pub use position::{ConversationPosition, PositionTable};
