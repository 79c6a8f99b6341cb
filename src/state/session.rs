/// Capture → upload → result lifecycle for one screen
///
/// ```text
///   Idle ──capture──▶ Capturing ──developed──▶ Uploading ──settled──▶ Showing
///    ▲                  │  ▲                      │                     │
///    │                  │  └──────capture─────────┘                     │
///    │                  └──────────capture failed──────────────────────▶│
///    └───────────────────────────────reset──────────────────────────────┘
/// ```
///
/// Capturing while an upload is live supersedes it: the upload is cancelled
/// and its photo discarded.
use std::fmt;
use std::future::Future;

use super::data::{CapturedPhoto, IdentificationResult};
use crate::camera::CameraSurface;
use crate::upload::{UploadCoordinator, UploadOutcome, UploadTicket};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Camera live, nothing captured
    Idle,
    /// Shutter fired, still being developed
    Capturing,
    /// Still on its way to the endpoint
    Uploading,
    /// Identification (or the failure result) on screen
    Showing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Capturing => "capturing",
            Phase::Uploading => "uploading",
            Phase::Showing => "showing a result",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {action} while {phase}")]
pub struct TransitionError {
    pub action: &'static str,
    pub phase: Phase,
}

/// Everything one screen instance owns
#[derive(Debug)]
pub struct Session {
    phase: Phase,
    camera: CameraSurface,
    photo: Option<CapturedPhoto>,
    result: Option<IdentificationResult>,
    uploads: UploadCoordinator,
}

impl Session {
    pub fn new(camera: CameraSurface, uploads: UploadCoordinator) -> Self {
        Self {
            phase: Phase::Idle,
            camera,
            photo: None,
            result: None,
            uploads,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn camera(&self) -> &CameraSurface {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut CameraSurface {
        &mut self.camera
    }

    pub fn photo(&self) -> Option<&CapturedPhoto> {
        self.photo.as_ref()
    }

    pub fn result(&self) -> Option<&IdentificationResult> {
        self.result.as_ref()
    }

    /// Whether the shutter may fire now
    pub fn can_capture(&self) -> bool {
        matches!(self.phase, Phase::Idle | Phase::Uploading)
    }

    /// Shutter fired on a frame
    pub fn begin_capture(&mut self) -> Result<(), TransitionError> {
        self.require(self.can_capture(), "capture")?;

        if self.phase == Phase::Uploading {
            self.uploads.cancel_active();
            if let Some(superseded) = self.photo.take() {
                superseded.discard_file();
            }
        }

        self.phase = Phase::Capturing;
        Ok(())
    }

    /// The frame could not be developed
    pub fn capture_failed(&mut self, reason: &str) -> Result<(), TransitionError> {
        self.require(self.phase == Phase::Capturing, "fail a capture")?;

        tracing::warn!("⚠️  Capture failed: {}", reason);
        self.result = Some(IdentificationResult::failed());
        self.phase = Phase::Showing;
        Ok(())
    }

    /// The still is ready: send it off
    ///
    /// The returned future performs the upload; feed its output to
    /// [`Session::finish_upload`] together with the ticket.
    pub fn start_upload(
        &mut self,
        photo: CapturedPhoto,
    ) -> Result<(UploadTicket, impl Future<Output = UploadOutcome> + Send + 'static), TransitionError>
    {
        if let Err(e) = self.require(self.phase == Phase::Capturing, "upload") {
            photo.discard_file();
            return Err(e);
        }

        if let Some(previous) = self.photo.take() {
            previous.discard_file();
        }

        let (ticket, upload) = self.uploads.start(photo.path.clone());
        self.photo = Some(photo);
        self.phase = Phase::Uploading;
        Ok((ticket, upload))
    }

    /// An upload finished. Returns whether it changed the screen.
    pub fn finish_upload(&mut self, ticket: UploadTicket, outcome: UploadOutcome) -> bool {
        if self.phase != Phase::Uploading {
            tracing::debug!("Ignoring upload {:?} while {}", ticket, self.phase);
            return false;
        }

        let Some(result) = self.uploads.settle(ticket, outcome) else {
            return false;
        };

        if let Some(photo) = &self.photo {
            photo.discard_file();
        }
        self.result = Some(result);
        self.phase = Phase::Showing;
        true
    }

    /// Clear photo and result and re-arm the camera
    pub fn reset(&mut self) -> Result<(), TransitionError> {
        self.require(self.phase == Phase::Showing, "reset")?;

        if let Some(photo) = self.photo.take() {
            photo.discard_file();
        }
        self.result = None;
        self.camera = self.camera.rearm();
        self.phase = Phase::Idle;
        Ok(())
    }

    fn require(&self, allowed: bool, action: &'static str) -> Result<(), TransitionError> {
        if allowed {
            Ok(())
        } else {
            Err(TransitionError {
                action,
                phase: self.phase,
            })
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.uploads.is_busy() {
            tracing::debug!("Screen closed with an upload in flight");
            self.uploads.cancel_active();
        }
        if let Some(photo) = &self.photo {
            photo.discard_file();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Permission;
    use crate::config::Config;
    use crate::upload::SpeciesClient;
    use chrono::Utc;
    use std::path::Path;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_for(config: &Config) -> Session {
        let mut camera = CameraSurface::new(config.capture_dir.clone());
        camera.set_permission(Permission::Granted);
        let uploads = UploadCoordinator::new(SpeciesClient::new(config).unwrap());
        Session::new(camera, uploads)
    }

    fn offline_session(root: &Path) -> Session {
        session_for(&Config::for_test("http://127.0.0.1:1", root))
    }

    fn photo_at(root: &Path, name: &str) -> CapturedPhoto {
        let path = root.join(name);
        std::fs::write(&path, b"jpeg").unwrap();
        CapturedPhoto {
            path,
            captured_at: Utc::now(),
            width: 4,
            height: 3,
            preview_jpeg: vec![1, 2, 3],
        }
    }

    fn lion() -> IdentificationResult {
        IdentificationResult {
            scientific_name: "Panthera leo".to_string(),
            common_name: "Lion".to_string(),
            description: "A <b>large</b> cat.".to_string(),
        }
    }

    #[tokio::test]
    async fn test_happy_path_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = offline_session(dir.path());
        assert_eq!(session.phase(), Phase::Idle);

        session.begin_capture().unwrap();
        assert_eq!(session.phase(), Phase::Capturing);

        let photo = photo_at(dir.path(), "a.jpg");
        let still = photo.path.clone();
        let (ticket, _upload) = session.start_upload(photo).unwrap();
        assert_eq!(session.phase(), Phase::Uploading);

        assert!(session.finish_upload(ticket, UploadOutcome::Identified(lion())));
        assert_eq!(session.phase(), Phase::Showing);
        assert_eq!(session.result(), Some(&lion()));
        assert!(session.photo().is_some(), "preview stays on screen");
        assert!(!still.exists(), "still is deleted once the upload settles");

        session.reset().unwrap();
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.result().is_none());
        assert!(session.photo().is_none());
    }

    #[tokio::test]
    async fn test_failure_lands_in_showing() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = offline_session(dir.path());

        session.begin_capture().unwrap();
        let (ticket, _upload) = session.start_upload(photo_at(dir.path(), "a.jpg")).unwrap();
        assert!(session.finish_upload(ticket, UploadOutcome::Failed("HTTP 500".into())));

        assert_eq!(session.phase(), Phase::Showing);
        assert_eq!(session.result(), Some(&IdentificationResult::failed()));
    }

    #[tokio::test]
    async fn test_capture_failure_lands_in_showing() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = offline_session(dir.path());

        session.begin_capture().unwrap();
        session.capture_failed("not an image").unwrap();

        assert_eq!(session.phase(), Phase::Showing);
        assert!(session.result().unwrap().is_failure());
    }

    #[tokio::test]
    async fn test_superseded_upload_never_shows() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = offline_session(dir.path());

        session.begin_capture().unwrap();
        let first = photo_at(dir.path(), "a.jpg");
        let first_still = first.path.clone();
        let (ticket_a, _a) = session.start_upload(first).unwrap();

        // Second capture while A is in flight
        session.begin_capture().unwrap();
        assert!(!first_still.exists(), "superseded still is discarded");

        // A resolves in the middle of B's capture
        assert!(!session.finish_upload(ticket_a, UploadOutcome::Identified(lion())));
        assert_eq!(session.phase(), Phase::Capturing);
        assert!(session.result().is_none());

        let (ticket_b, _b) = session.start_upload(photo_at(dir.path(), "b.jpg")).unwrap();
        assert!(!session.finish_upload(ticket_a, UploadOutcome::Identified(lion())));
        assert_eq!(session.phase(), Phase::Uploading);

        let tiger = IdentificationResult {
            scientific_name: "Panthera tigris".to_string(),
            common_name: "Tiger".to_string(),
            description: String::new(),
        };
        assert!(session.finish_upload(ticket_b, UploadOutcome::Identified(tiger.clone())));
        assert_eq!(session.result(), Some(&tiger));
    }

    #[tokio::test]
    async fn test_cancelled_outcome_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = offline_session(dir.path());

        session.begin_capture().unwrap();
        let (ticket, _upload) = session.start_upload(photo_at(dir.path(), "a.jpg")).unwrap();
        session.begin_capture().unwrap();

        assert!(!session.finish_upload(ticket, UploadOutcome::Cancelled));
        assert_eq!(session.phase(), Phase::Capturing);
    }

    #[tokio::test]
    async fn test_illegal_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = offline_session(dir.path());

        assert_eq!(
            session.reset(),
            Err(TransitionError { action: "reset", phase: Phase::Idle })
        );
        assert!(session.capture_failed("x").is_err());

        let stray = photo_at(dir.path(), "stray.jpg");
        let stray_still = stray.path.clone();
        assert!(session.start_upload(stray).is_err());
        assert!(!stray_still.exists(), "rejected still is not leaked");

        session.begin_capture().unwrap();
        assert!(!session.can_capture());
        assert!(session.begin_capture().is_err());
        assert!(session.reset().is_err(), "no way back to idle from capturing");

        session.capture_failed("x").unwrap();
        assert!(!session.can_capture());
        assert!(session.begin_capture().is_err());
    }

    #[tokio::test]
    async fn test_reset_rearms_camera() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = offline_session(dir.path());

        session.begin_capture().unwrap();
        session.capture_failed("x").unwrap();
        session.reset().unwrap();

        assert_eq!(session.camera().permission(), Permission::Granted);
        assert_eq!(session.camera().last_frame(), None);
        assert!(session.can_capture());
    }

    #[tokio::test]
    async fn test_end_to_end_against_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "scientific_name": "Panthera leo",
                "common_name": "Lion",
                "description": "A <b>large</b> cat."
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = Config::for_test(&server.uri(), dir.path());
        let mut session = session_for(&config);

        session.begin_capture().unwrap();
        let (ticket, upload) = session.start_upload(photo_at(dir.path(), "a.jpg")).unwrap();
        let outcome = tokio::time::timeout(Duration::from_secs(5), upload).await.unwrap();

        assert!(session.finish_upload(ticket, outcome));
        assert_eq!(session.result(), Some(&lion()));
        assert_eq!(std::fs::read_dir(&config.scratch_dir).unwrap().count(), 0);
    }
}
