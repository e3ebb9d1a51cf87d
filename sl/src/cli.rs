//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// SOSLine - SMS disaster-response intake
#[derive(Parser)]
#[command(
    name = "sosline",
    about = "SMS disaster-response intake: conversation state machine and geofence engine",
    version,
    after_help = "Logs are written to: ~/.local/share/sosline/logs/sosline.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    pub log_level: tracing::Level,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run the SMS webhook server
    Serve {
        /// Override the configured bind address
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Run one conversation turn locally, as if an SMS had arrived
    Send {
        /// Sender phone number
        #[arg(long)]
        from: String,

        /// Message text
        body: String,
    },

    /// Inspect or reset stored sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Manage disaster zones
    Zones {
        #[command(subcommand)]
        action: ZoneAction,
    },

    /// Check whether a point lies in any disaster zone
    Check {
        /// Longitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Latitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
    },
}

/// Session subcommands
#[derive(Subcommand)]
pub enum SessionAction {
    /// Show the session stored for a phone number
    Show { phone: String },

    /// List all sessions, most recently updated first
    List,

    /// Delete the session stored for a phone number
    Clear { phone: String },
}

/// Disaster zone subcommands
#[derive(Subcommand)]
pub enum ZoneAction {
    /// List disaster zones
    List,

    /// Add a zone, or replace the one with the same name
    Add {
        /// Zone name
        name: String,

        /// Center longitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Center latitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Containment radius; the configured default when omitted
        #[arg(short, long)]
        radius_km: Option<f64>,
    },

    /// Remove a zone by name
    Remove { name: String },
}

/// Output format for query commands
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Path of the log file written by the binary
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sosline")
        .join("logs")
        .join("sosline.log")
}
