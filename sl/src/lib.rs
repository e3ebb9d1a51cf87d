//! SOSLine - SMS disaster-response intake
//!
//! A survivor texts the service; each message drives one turn of a
//! multi-step dialogue that collects an address, confirms injury and
//! transport status, and decides whether the survivor is inside an active
//! disaster zone.
//!
//! # Core Concepts
//!
//! - **Stateless turns**: the conversation position is recomputed every turn
//!   from the stored dialogue context; only the session record persists
//! - **Fixed positions**: dialogue node ids map onto a closed set of positions,
//!   each with its own handler
//! - **Geodesic containment**: a point is in danger when it lies within the
//!   radius of any stored disaster zone
//! - **Degrade, don't fail**: ambiguous addresses and unrecognized answers
//!   keep the conversation going and are reported as diagnostics
//!
//! # Modules
//!
//! - [`conversation`] - Orchestrator, position handlers, confirmation parsing
//! - [`geofence`] - Haversine distance and zone containment
//! - [`session`] - Actor owning the session store
//! - [`dialogue`] - Dialogue engine trait and Watson Assistant client
//! - [`geo`] - Geocoder, location tracker and map preview collaborators
//! - [`server`] - HTTP webhook transport
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod conversation;
pub mod dialogue;
pub mod geo;
pub mod geofence;
pub mod server;
pub mod session;

// Re-export commonly used types
pub use config::Config;
pub use conversation::{
    Collaborators, ConversationPosition, Diagnostic, InboundMessage, Orchestrator, PositionHandler, PositionTable,
    ResetReason, TurnError, TurnOutcome,
};
pub use dialogue::{DialogueEngine, DialogueError, DialogueTurn, WatsonAssistant};
pub use geo::{CandidateAddress, GeoError, Geocoder, LocationTracker, MediaPreview};
pub use geofence::{Geofence, haversine_km};
pub use session::{SessionError, SessionManager, SessionRepository, ZoneSource};
