/// Species identification upload module
///
/// This module handles:
/// - Scratch copies of captured stills (scratch.rs)
/// - The multipart request to the identification endpoint (client.rs)
/// - Single-flight coordination and cancellation (coordinator.rs)

pub mod client;
pub mod coordinator;
pub mod scratch;

pub use client::{SpeciesClient, UploadError};
pub use coordinator::{UploadCoordinator, UploadOutcome, UploadTicket};
