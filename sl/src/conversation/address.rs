//! Address resolution at the address-input position

use async_trait::async_trait;
use sessionstore::{ResolvedAddress, SessionUpdate};
use tracing::{debug, error, info, warn};

use super::handlers::{Collaborators, PositionHandler, TurnInput};
use super::outcome::{Diagnostic, TurnError, TurnOutcome};
use crate::geo::CandidateAddress;

/// Geocode free text and, on a unique match, store, track and preview it
///
/// Zero or several matches leave the session untouched and pass the engine's
/// reply through unchanged, with a diagnostic describing what was seen.
pub struct AddressResolutionStep;

impl AddressResolutionStep {
    async fn candidates(input: &TurnInput<'_>, services: &Collaborators) -> (Vec<CandidateAddress>, Vec<Diagnostic>) {
        match services.geocoder.lookup(input.text).await {
            Ok(candidates) => (candidates, Vec::new()),
            Err(e) => {
                error!(phone = %input.phone, error = %e, "Geocoding failed");
                let diagnostic = Diagnostic::GeocodeFailed {
                    text: input.text.to_string(),
                    error: e.to_string(),
                };
                (Vec::new(), vec![diagnostic])
            }
        }
    }
}

#[async_trait]
impl PositionHandler for AddressResolutionStep {
    async fn handle(&self, input: &TurnInput<'_>, services: &Collaborators) -> Result<TurnOutcome, TurnError> {
        debug!(phone = %input.phone, text = %input.text, "AddressResolutionStep::handle: called");
        let (mut candidates, mut diagnostics) = Self::candidates(input, services).await;

        if candidates.len() != 1 {
            if candidates.is_empty() {
                warn!(phone = %input.phone, text = %input.text, "No address found for input");
            } else {
                error!(
                    phone = %input.phone,
                    text = %input.text,
                    count = candidates.len(),
                    "Ambiguous address input, expected exactly one match"
                );
            }
            diagnostics.push(Diagnostic::UnresolvedAddress {
                text: input.text.to_string(),
                candidates: candidates.into_iter().map(|c| c.formatted).collect(),
            });
            return Ok(TurnOutcome::text(input.engine_reply).with_diagnostics(diagnostics));
        }

        let address: ResolvedAddress = candidates.remove(0).into();
        info!(phone = %input.phone, address = %address.formatted, location = %address.location, "Address resolved");

        services
            .sessions
            .put(input.phone, SessionUpdate::default().with_address(address.clone()))
            .await?;

        services
            .tracker
            .track(input.phone, address.point())
            .await
            .map_err(TurnError::Tracker)?;

        let media = services
            .preview
            .preview_for(&address.formatted)
            .await
            .map_err(TurnError::Preview)?;

        let reply = format!("{} [{}]", input.engine_reply, address.formatted);
        Ok(TurnOutcome::text(reply)
            .with_media(Some(media))
            .with_diagnostics(diagnostics))
    }
}
