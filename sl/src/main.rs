//! SOSLine - SMS disaster-response intake
//!
//! CLI entry point for serving the webhook and administering sessions and zones.

use std::fs;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{info, warn};

use sessionstore::{DisasterZone, GeoPoint, PhoneNumber};
use sosline::cli::{Cli, Command, OutputFormat, SessionAction, ZoneAction, get_log_path};
use sosline::config::Config;
use sosline::conversation::{Collaborators, InboundMessage, Orchestrator, PositionTable, TurnOutcome};
use sosline::dialogue::WatsonAssistant;
use sosline::geo::{GoogleGeocoder, LocationTracker, MapboxTracker, NoopTracker, StaticMapPreview};
use sosline::geofence::Geofence;
use sosline::server;
use sosline::session::{SessionManager, SessionRepository, ZoneSource};

fn setup_logging(level: tracing::Level) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());
    let log_path = get_log_path();

    // Write to the log file; fall back to stderr when it cannot be created
    let log_file = log_path
        .parent()
        .map(fs::create_dir_all)
        .transpose()
        .and_then(|_| fs::File::create(&log_path));

    match log_file {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_writer(file)
                .with_ansi(false)
                .with_env_filter(filter)
                .init();
            info!("Logging initialized (level: {})", level);
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init();
            warn!("Failed to create log file {}: {}", log_path.display(), e);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.log_level).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(
        "SOSLine loaded config: db={}, radius-km={}",
        config.storage.db_path.display(),
        config.geofence.radius_km
    );

    let sessions = SessionManager::open(&config.storage.db_path).context("Failed to open session store")?;

    let result = match cli.command {
        Command::Serve { bind } => cmd_serve(&config, sessions.clone(), bind).await,
        Command::Send { from, body } => cmd_send(&config, sessions.clone(), from, body, &cli.format).await,
        Command::Session { action } => cmd_session(&sessions, action, &cli.format).await,
        Command::Zones { action } => cmd_zones(&config, &sessions, action, &cli.format).await,
        Command::Check { lon, lat } => cmd_check(&config, &sessions, lon, lat, &cli.format).await,
    };

    if let Err(e) = sessions.shutdown().await {
        warn!("Failed to stop session manager: {}", e);
    }
    result
}

/// Wire the orchestrator to the configured collaborators
fn build_orchestrator(config: &Config, sessions: SessionManager) -> Result<Orchestrator> {
    config.validate().context("Invalid configuration")?;

    let engine = WatsonAssistant::from_config(&config.dialogue).context("Failed to create dialogue client")?;
    let geocoder = GoogleGeocoder::from_config(&config.geocoder).context("Failed to create geocoder")?;
    let preview = StaticMapPreview::from_config(&config.preview);
    let tracker: Arc<dyn LocationTracker> = match config.tracker.provider.as_str() {
        "none" => Arc::new(NoopTracker),
        "mapbox" => Arc::new(MapboxTracker::from_config(&config.tracker).context("Failed to create tracker")?),
        other => return Err(eyre::eyre!("Unknown tracker provider: {}. Use: none or mapbox", other)),
    };

    let services = Collaborators {
        sessions: Arc::new(sessions.clone()),
        zones: Arc::new(sessions),
        geocoder: Arc::new(geocoder),
        tracker,
        preview: Arc::new(preview),
        geofence: Geofence::new(config.geofence.radius_km),
    };
    let positions = PositionTable::with_overrides(&config.dialogue.nodes);

    Ok(Orchestrator::new(Arc::new(engine), positions, services))
}

async fn cmd_serve(config: &Config, sessions: SessionManager, bind: Option<String>) -> Result<()> {
    let orchestrator = build_orchestrator(config, sessions)?;
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());

    println!("{} Listening on http://{}/message", "✓".green(), bind);
    server::serve(&bind, Arc::new(orchestrator)).await
}

async fn cmd_send(
    config: &Config,
    sessions: SessionManager,
    from: String,
    body: String,
    format: &OutputFormat,
) -> Result<()> {
    let orchestrator = build_orchestrator(config, sessions)?;
    let outcome = orchestrator
        .handle(InboundMessage::new(from, body))
        .await
        .context("Turn failed")?;
    print_outcome(&outcome, format)
}

fn print_outcome(outcome: &TurnOutcome, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(outcome)?),
        OutputFormat::Text => {
            println!("{}", outcome.reply);
            if let Some(media) = &outcome.media {
                println!("{} {}", "media:".dimmed(), media.cyan());
            }
            println!("{} {}", "position:".dimmed(), outcome.position);
            for diagnostic in &outcome.diagnostics {
                println!("{} {:?}", "!".yellow(), diagnostic);
            }
        }
    }
    Ok(())
}

async fn cmd_session(sessions: &SessionManager, action: SessionAction, format: &OutputFormat) -> Result<()> {
    match action {
        SessionAction::Show { phone } => {
            let phone = PhoneNumber::parse(&phone)?;
            let Some(record) = sessions.get(&phone).await? else {
                println!("No session for {}", phone);
                return Ok(());
            };
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
                OutputFormat::Text => {
                    println!("{} {}", phone.to_string().cyan(), record.summary());
                    if let Some(address) = &record.address {
                        println!("  location: {}", address.location);
                    }
                    println!("  updated:  {}", format_timestamp(record.updated_at));
                }
            }
        }

        SessionAction::List => {
            let records = sessions.list_sessions().await?;
            match format {
                OutputFormat::Json => {
                    let entries: Vec<_> = records
                        .iter()
                        .map(|(phone, record)| serde_json::json!({ "phone": phone, "record": record }))
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&entries)?);
                }
                OutputFormat::Text => {
                    if records.is_empty() {
                        println!("No sessions");
                    }
                    for (phone, record) in &records {
                        println!(
                            "{} {} {}",
                            phone.to_string().cyan(),
                            format_timestamp(record.updated_at).dimmed(),
                            record.summary()
                        );
                    }
                }
            }
        }

        SessionAction::Clear { phone } => {
            let phone = PhoneNumber::parse(&phone)?;
            if sessions.delete(&phone).await? {
                println!("{} Cleared session for {}", "✓".green(), phone);
            } else {
                println!("No session for {}", phone);
            }
        }
    }
    Ok(())
}

async fn cmd_zones(config: &Config, sessions: &SessionManager, action: ZoneAction, format: &OutputFormat) -> Result<()> {
    match action {
        ZoneAction::List => {
            let zones = sessions.zones().await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&zones)?),
                OutputFormat::Text => {
                    if zones.is_empty() {
                        println!("No disaster zones");
                    }
                    let geofence = Geofence::new(config.geofence.radius_km);
                    for zone in &zones {
                        println!(
                            "{} center={} radius={:.1} km",
                            zone.name.yellow(),
                            zone.center,
                            geofence.radius_of(zone)
                        );
                    }
                }
            }
        }

        ZoneAction::Add {
            name,
            lon,
            lat,
            radius_km,
        } => {
            let zone = DisasterZone::new(name, GeoPoint::from_lon_lat(lon, lat), radius_km);
            sessions.upsert_zone(zone.clone()).await?;
            println!("{} Saved zone {} at {}", "✓".green(), zone.name.yellow(), zone.center);
        }

        ZoneAction::Remove { name } => {
            if sessions.remove_zone(&name).await? {
                println!("{} Removed zone {}", "✓".green(), name.yellow());
            } else {
                println!("No zone named {}", name);
            }
        }
    }
    Ok(())
}

async fn cmd_check(config: &Config, sessions: &SessionManager, lon: f64, lat: f64, format: &OutputFormat) -> Result<()> {
    let point = GeoPoint::from_lon_lat(lon, lat);
    if !point.is_valid() {
        return Err(eyre::eyre!("Coordinates out of range: {}", point));
    }

    let geofence = Geofence::new(config.geofence.radius_km);
    let zones = sessions.zones().await?;
    let inside = geofence.contains(point, &zones);
    let nearest = geofence.nearest(point, &zones);

    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "point": point,
                "inside": inside,
                "nearest": nearest.map(|(zone, km)| serde_json::json!({ "zone": zone.name, "distance-km": km })),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            if inside {
                println!("{} {} is inside a disaster zone", "!".red().bold(), point);
            } else {
                println!("{} {} is outside all disaster zones", "✓".green(), point);
            }
            if let Some((zone, km)) = nearest {
                println!("  nearest: {} ({:.2} km)", zone.name.yellow(), km);
            }
        }
    }
    Ok(())
}

fn format_timestamp(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ms.to_string())
}
