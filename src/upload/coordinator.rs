/// Single-flight upload coordination
///
/// At most one upload is live. Starting a new one cancels its predecessor
/// first, and a superseded upload can never settle into the screen.
use std::future::Future;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use super::client::{SpeciesClient, UploadError};
use crate::state::data::IdentificationResult;

/// Identifies one upload attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTicket(u64);

/// How an upload attempt ended, as seen by the event loop
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Identified(IdentificationResult),
    /// Superseded. Never shown.
    Cancelled,
    /// Any other failure; the reason is for logs only
    Failed(String),
}

impl From<Result<IdentificationResult, UploadError>> for UploadOutcome {
    fn from(result: Result<IdentificationResult, UploadError>) -> Self {
        match result {
            Ok(identified) => UploadOutcome::Identified(identified),
            Err(UploadError::Cancelled) => UploadOutcome::Cancelled,
            Err(e) => UploadOutcome::Failed(e.to_string()),
        }
    }
}

#[derive(Debug)]
struct ActiveUpload {
    ticket: UploadTicket,
    token: CancellationToken,
}

#[derive(Debug)]
pub struct UploadCoordinator {
    client: SpeciesClient,
    active: Option<ActiveUpload>,
    issued: u64,
}

impl UploadCoordinator {
    pub fn new(client: SpeciesClient) -> Self {
        Self {
            client,
            active: None,
            issued: 0,
        }
    }

    /// Whether an upload is currently live
    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    /// Begin uploading `photo`, cancelling any upload still in flight
    ///
    /// The returned future does the work; drive it on the runtime and hand
    /// its output back to [`UploadCoordinator::settle`] with the ticket.
    pub fn start(
        &mut self,
        photo: PathBuf,
    ) -> (UploadTicket, impl Future<Output = UploadOutcome> + Send + 'static) {
        self.cancel_active();

        self.issued += 1;
        let ticket = UploadTicket(self.issued);
        let token = CancellationToken::new();
        self.active = Some(ActiveUpload {
            ticket,
            token: token.clone(),
        });

        tracing::debug!("Upload {:?} started for {}", ticket, photo.display());

        let client = self.client.clone();
        let upload = async move { UploadOutcome::from(client.identify(&photo, &token).await) };

        (ticket, upload)
    }

    /// Cancel the live upload, if any
    pub fn cancel_active(&mut self) {
        if let Some(active) = self.active.take() {
            active.token.cancel();
            tracing::info!("⏹️  Upload {:?} superseded", active.ticket);
        }
    }

    /// Decide what, if anything, a finished upload puts on screen
    ///
    /// Returns `None` for superseded or cancelled attempts. Failures become
    /// the generic failed result.
    pub fn settle(
        &mut self,
        ticket: UploadTicket,
        outcome: UploadOutcome,
    ) -> Option<IdentificationResult> {
        let current = matches!(
            &self.active,
            Some(active) if active.ticket == ticket && !active.token.is_cancelled()
        );
        if !current {
            tracing::debug!("Dropping stale upload {:?}", ticket);
            return None;
        }

        match outcome {
            UploadOutcome::Identified(result) => {
                self.active = None;
                Some(result)
            }
            UploadOutcome::Failed(reason) => {
                self.active = None;
                tracing::warn!("⚠️  Identification failed: {}", reason);
                Some(IdentificationResult::failed())
            }
            UploadOutcome::Cancelled => {
                // Only the token produces this, and it was checked above
                tracing::warn!("Upload {:?} reported cancellation without a cancel", ticket);
                None
            }
        }
    }
}
