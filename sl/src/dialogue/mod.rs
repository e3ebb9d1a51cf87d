//! Dialogue engine collaborator
//!
//! The engine classifies free text and walks its own conversation graph.
//! This crate only sees the generated reply, the id of the node the engine
//! stopped at, and an opaque context blob that is stored between turns.

use async_trait::async_trait;
use sessionstore::DialogueContext;

mod error;
mod watson;

pub use error::DialogueError;
pub use watson::{WatsonAssistant, dialog_stack_node};

/// Result of advancing the dialogue by one message
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueTurn {
    /// Updated context to persist, when the engine produced one
    pub context: Option<DialogueContext>,

    /// Reply generated for the survivor
    pub reply: String,

    /// Node the engine stopped at
    pub node_id: Option<String>,
}

/// Opaque intent classifier and dialogue walker
#[async_trait]
pub trait DialogueEngine: Send + Sync {
    /// Feed one user message, resuming from the prior context if any
    async fn advance(&self, prior: Option<&DialogueContext>, text: &str) -> Result<DialogueTurn, DialogueError>;

    /// Node id recorded in a context this engine produced
    fn current_node(&self, context: &DialogueContext) -> Option<String>;
}
