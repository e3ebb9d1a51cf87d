//! Integration tests for SOSLine
//!
//! Drives full conversations through the HTTP transport against an on-disk
//! session store, with scripted stand-ins for the external services.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sessionstore::{
    ConfirmationSlot, DialogueContext, DisasterZone, GeoPoint, PhoneNumber, SessionStore,
};
use sosline::config::PreviewConfig;
use sosline::conversation::{Collaborators, Orchestrator, PositionTable};
use sosline::dialogue::{DialogueEngine, DialogueError, DialogueTurn, dialog_stack_node};
use sosline::geo::{CandidateAddress, GeoError, Geocoder, LocationTracker, StaticMapPreview};
use sosline::geofence::Geofence;
use sosline::server;
use sosline::session::{SessionManager, SessionRepository};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const PHONE: &str = "+15551234567";

// =============================================================================
// Scripted collaborators
// =============================================================================

/// Replays (node, reply) pairs and builds Watson-shaped contexts
struct ScriptedDialogue {
    script: Vec<(&'static str, &'static str)>,
    next: Mutex<usize>,
}

impl ScriptedDialogue {
    fn new(script: Vec<(&'static str, &'static str)>) -> Self {
        Self {
            script,
            next: Mutex::new(0),
        }
    }
}

#[async_trait]
impl DialogueEngine for ScriptedDialogue {
    async fn advance(&self, _prior: Option<&DialogueContext>, _text: &str) -> Result<DialogueTurn, DialogueError> {
        let mut next = self.next.lock().unwrap();
        let (node, reply) = *self
            .script
            .get(*next)
            .ok_or_else(|| DialogueError::InvalidResponse("script exhausted".to_string()))?;
        *next += 1;

        let context = serde_json::json!({
            "conversation_id": "conv-1",
            "system": { "dialog_stack": [{ "dialog_node": node }] },
        });
        Ok(DialogueTurn {
            context: Some(DialogueContext::new(context)),
            reply: reply.to_string(),
            node_id: Some(node.to_string()),
        })
    }

    fn current_node(&self, context: &DialogueContext) -> Option<String> {
        dialog_stack_node(context.as_value())
    }
}

/// Resolves every query to one fixed address
struct FixedGeocoder(CandidateAddress);

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn lookup(&self, _text: &str) -> Result<Vec<CandidateAddress>, GeoError> {
        Ok(vec![self.0.clone()])
    }
}

#[derive(Default)]
struct RecordingTracker(Mutex<Vec<GeoPoint>>);

#[async_trait]
impl LocationTracker for RecordingTracker {
    async fn track(&self, _phone: &PhoneNumber, location: GeoPoint) -> Result<(), GeoError> {
        self.0.lock().unwrap().push(location);
        Ok(())
    }
}

// =============================================================================
// Harness
// =============================================================================

struct TestServer {
    base_url: String,
    sessions: SessionManager,
    tracker: Arc<RecordingTracker>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<eyre::Result<()>>,
    _temp_dir: TempDir,
}

impl TestServer {
    async fn start(script: Vec<(&'static str, &'static str)>, zone: Option<DisasterZone>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = SessionStore::open(temp_dir.path().join("sosline.db")).expect("Failed to open store");
        let sessions = SessionManager::spawn(store);
        if let Some(zone) = zone {
            sessions.upsert_zone(zone).await.expect("Failed to add zone");
        }

        let tracker = Arc::new(RecordingTracker::default());
        let preview = StaticMapPreview::from_config(&PreviewConfig {
            api_key_env: "SOSLINE_TEST_UNSET_PREVIEW_KEY".to_string(),
            ..PreviewConfig::default()
        });
        let geocoder = FixedGeocoder(CandidateAddress {
            formatted: "123 Main St, Springfield, IL 62701, USA".to_string(),
            location: GeoPoint::from_lon_lat(-89.6501, 39.7817),
            place_id: Some("place-1".to_string()),
        });

        let services = Collaborators {
            sessions: Arc::new(sessions.clone()),
            zones: Arc::new(sessions.clone()),
            geocoder: Arc::new(geocoder),
            tracker: tracker.clone(),
            preview: Arc::new(preview),
            geofence: Geofence::new(10.0),
        };
        let orchestrator = Orchestrator::new(Arc::new(ScriptedDialogue::new(script)), PositionTable::default(), services);

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(server::serve_on(listener, Arc::new(orchestrator), async move {
            let _ = rx.await;
        }));

        Self {
            base_url,
            sessions,
            tracker,
            shutdown: Some(tx),
            handle,
            _temp_dir: temp_dir,
        }
    }

    async fn send(&self, body: &str) -> (u16, String) {
        let response = reqwest::Client::new()
            .post(format!("{}/message", self.base_url))
            .form(&[("From", PHONE), ("Body", body), ("MessageSid", "SM0001")])
            .send()
            .await
            .expect("Request failed");
        let status = response.status().as_u16();
        (status, response.text().await.expect("Failed to read body"))
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let result = tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("Server did not stop");
        assert!(result.expect("Server task panicked").is_ok());
    }
}

fn phone() -> PhoneNumber {
    PhoneNumber::parse(PHONE).unwrap()
}

// =============================================================================
// Conversation Tests
// =============================================================================

#[tokio::test]
async fn test_liveness_endpoint() {
    let server = TestServer::start(vec![], None).await;
    let body = reqwest::get(format!("{}/message", server.base_url))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "Saving the world.");
    server.stop().await;
}

#[tokio::test]
async fn test_full_intake_inside_disaster_zone() {
    let script = vec![
        ("address_input", "Please tell us your address."),
        ("address_confirmation", "Is this your address?"),
        ("injury_confirmation", "Are you injured?"),
        ("has_vehicle", "Do you have a vehicle?"),
        ("has_space_in_vehicle", "Do you have space for others?"),
        ("goodbye", "Help is on the way."),
    ];
    let zone = DisasterZone::new("flood", GeoPoint::from_lon_lat(-89.65, 39.78), Some(5.0));
    let server = TestServer::start(script, Some(zone)).await;

    let (status, body) = server.send("help").await;
    assert_eq!(status, 200);
    assert!(body.contains("<Body>Please tell us your address.</Body>"));

    let (_, body) = server.send("123 Main St, Springfield").await;
    assert!(body.contains("<Body>Is this your address? [123 Main St, Springfield, IL 62701, USA]</Body>"));
    assert!(body.contains("<Media>https://maps.googleapis.com/maps/api/staticmap?"));
    assert!(body.contains("&amp;zoom=16"));
    assert_eq!(server.tracker.0.lock().unwrap().len(), 1);

    let (_, body) = server.send("Yes").await;
    assert!(body.contains("<Body>Are you injured?</Body>"));

    let (_, body) = server.send("no").await;
    assert!(body.contains("<Body>Do you have a vehicle?</Body>"));

    let (_, body) = server.send("yes").await;
    assert!(body.contains("<Body>Do you have space for others?</Body>"));

    let (_, body) = server.send("not sure").await;
    assert!(body.contains("<Body>Help is on the way.</Body>"));

    let record = server.sessions.get(&phone()).await.unwrap().expect("session should exist");
    let address = record.address.as_ref().expect("address should be stored");
    assert_eq!(address.place_id.as_deref(), Some("place-1"));
    assert_eq!(record.address_confirmed, ConfirmationSlot::Answered(true));
    assert_eq!(record.injured, ConfirmationSlot::Answered(false));
    assert_eq!(record.has_vehicle, ConfirmationSlot::Answered(true));
    assert_eq!(record.has_space_in_vehicle, ConfirmationSlot::Answered(false));

    let (_, body) = server.send(" CLEAR ").await;
    assert!(body.contains("<Body>Cleared persisted context</Body>"));
    assert!(server.sessions.get(&phone()).await.unwrap().is_none());

    server.stop().await;
}

#[tokio::test]
async fn test_intake_outside_disaster_zone_resets() {
    let script = vec![
        ("address_input", "Please tell us your address."),
        ("address_confirmation", "Is this your address?"),
        ("injury_confirmation", "Are you injured?"),
    ];
    // Chicago, far outside the 10 km radius
    let zone = DisasterZone::new("storm", GeoPoint::from_lon_lat(-87.6298, 41.8781), None);
    let server = TestServer::start(script, Some(zone)).await;

    server.send("help").await;
    server.send("123 Main St, Springfield").await;
    let (status, body) = server.send("yes").await;

    assert_eq!(status, 200);
    assert!(body.contains("You are not in immediate danger."));
    assert!(!body.contains("<Media>"));
    assert!(server.sessions.get(&phone()).await.unwrap().is_none());

    server.stop().await;
}

#[tokio::test]
async fn test_missing_sender_is_rejected() {
    let server = TestServer::start(vec![("address_input", "unused")], None).await;
    let response = reqwest::Client::new()
        .post(format!("{}/message", server.base_url))
        .form(&[("Body", "help")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    server.stop().await;
}

#[tokio::test]
async fn test_session_survives_store_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("sosline.db");

    {
        let mut store = SessionStore::open(&path).unwrap();
        store
            .put(
                &phone(),
                sessionstore::SessionUpdate::default()
                    .with_context(DialogueContext::new(serde_json::json!({
                        "system": { "dialog_stack": [{ "dialog_node": "has_vehicle" }] }
                    })))
                    .ask(sessionstore::SurveyQuestion::HasVehicle),
            )
            .unwrap();
    }

    let sessions = SessionManager::spawn(SessionStore::open(&path).unwrap());
    let record = sessions.get(&phone()).await.unwrap().unwrap();
    assert_eq!(record.has_vehicle, ConfirmationSlot::Pending);
    let node = record
        .dialogue_context
        .as_ref()
        .and_then(|c| dialog_stack_node(c.as_value()));
    assert_eq!(node.as_deref(), Some("has_vehicle"));
}
