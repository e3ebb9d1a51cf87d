//! Conversation positions and the node table that resolves them

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sessionstore::SurveyQuestion;
use tracing::debug;

/// Where the survivor is in the intake flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversationPosition {
    /// Anything this core does not act on
    #[default]
    Other,
    /// Waiting for a free-text address
    AddressInput,
    /// Waiting for yes/no on the resolved address
    AddressConfirmation,
    /// Waiting for yes/no on injuries
    InjuryConfirmation,
    /// Waiting for yes/no on vehicle access
    HasVehicle,
    /// Waiting for yes/no on free seats in the vehicle
    HasSpaceInVehicle,
}

impl ConversationPosition {
    pub const ALL: [ConversationPosition; 6] = [
        ConversationPosition::Other,
        ConversationPosition::AddressInput,
        ConversationPosition::AddressConfirmation,
        ConversationPosition::InjuryConfirmation,
        ConversationPosition::HasVehicle,
        ConversationPosition::HasSpaceInVehicle,
    ];

    /// The yes/no question answered at this position, if any
    pub fn question(&self) -> Option<SurveyQuestion> {
        match self {
            Self::AddressConfirmation => Some(SurveyQuestion::AddressConfirmed),
            Self::InjuryConfirmation => Some(SurveyQuestion::Injured),
            Self::HasVehicle => Some(SurveyQuestion::HasVehicle),
            Self::HasSpaceInVehicle => Some(SurveyQuestion::HasSpaceInVehicle),
            Self::Other | Self::AddressInput => None,
        }
    }
}

impl std::fmt::Display for ConversationPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Other => write!(f, "other"),
            Self::AddressInput => write!(f, "address-input"),
            Self::AddressConfirmation => write!(f, "address-confirmation"),
            Self::InjuryConfirmation => write!(f, "injury-confirmation"),
            Self::HasVehicle => write!(f, "has-vehicle"),
            Self::HasSpaceInVehicle => write!(f, "has-space-in-vehicle"),
        }
    }
}

/// Node ids of the intake dialogue as deployed with the assistant workspace
const BUILTIN_NODES: [(&str, ConversationPosition); 5] = [
    ("address_input", ConversationPosition::AddressInput),
    ("address_confirmation", ConversationPosition::AddressConfirmation),
    ("injury_confirmation", ConversationPosition::InjuryConfirmation),
    ("has_vehicle", ConversationPosition::HasVehicle),
    ("has_space_in_vehicle", ConversationPosition::HasSpaceInVehicle),
];

/// Static mapping from dialogue node id to conversation position
///
/// Built once at startup and read-only afterwards.
#[derive(Debug, Clone)]
pub struct PositionTable {
    nodes: HashMap<String, ConversationPosition>,
}

impl Default for PositionTable {
    fn default() -> Self {
        Self {
            nodes: BUILTIN_NODES
                .iter()
                .map(|(id, position)| (id.to_string(), *position))
                .collect(),
        }
    }
}

impl PositionTable {
    /// Built-in nodes plus deployment-specific ones; the latter win on conflict
    pub fn with_overrides<'a>(overrides: impl IntoIterator<Item = (&'a String, &'a ConversationPosition)>) -> Self {
        let mut table = Self::default();
        for (id, position) in overrides {
            debug!(%id, %position, "PositionTable::with_overrides: adding node");
            table.nodes.insert(id.clone(), *position);
        }
        table
    }

    /// Resolve a node id; absent or unknown ids are `Other`
    pub fn resolve(&self, node_id: Option<&str>) -> ConversationPosition {
        debug!(?node_id, "resolve: called");
        match node_id {
            Some(id) => {
                let position = self.nodes.get(id.trim()).copied().unwrap_or_default();
                debug!(%id, %position, "resolve: resolved");
                position
            }
            None => {
                debug!("resolve: no node id");
                ConversationPosition::Other
            }
        }
    }
}
