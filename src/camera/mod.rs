/// Camera surface
///
/// The shutter opens a native picker on the frame source (a tethered camera
/// drop folder, a phone sync folder, ...). The picked frame is developed into
/// a JPEG still inside the capture directory, which is the one resource the
/// camera needs access to.
///
/// - Still development (develop.rs)

pub mod develop;

use rfd::FileDialog;
use std::path::{Path, PathBuf};

pub use develop::develop;

/// Frame formats the shutter offers
const FRAME_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "webp", "tif", "tiff", "bmp"];

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not develop frame: {0}")]
    Image(#[from] image::ImageError),
    #[error("capture worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Access to the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Not asked yet
    Undetermined,
    Granted,
    Denied,
}

/// The live camera for one screen instance
#[derive(Debug)]
pub struct CameraSurface {
    capture_dir: PathBuf,
    permission: Permission,
    /// Frame the shutter last fired on; what the viewfinder holds
    last_frame: Option<PathBuf>,
}

impl CameraSurface {
    pub fn new(capture_dir: PathBuf) -> Self {
        Self {
            capture_dir,
            permission: Permission::Undetermined,
            last_frame: None,
        }
    }

    /// A fresh surface on the same directory with the same permission
    ///
    /// Drops whatever frame the viewfinder was holding.
    pub fn rearm(&self) -> Self {
        Self {
            capture_dir: self.capture_dir.clone(),
            permission: self.permission,
            last_frame: None,
        }
    }

    pub fn capture_dir(&self) -> &Path {
        &self.capture_dir
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    pub fn set_permission(&mut self, permission: Permission) {
        self.permission = permission;
    }

    pub fn last_frame(&self) -> Option<&Path> {
        self.last_frame.as_deref()
    }

    /// Fire the shutter: let the user pick a frame
    ///
    /// Returns `None` if permission is missing or the picker was dismissed.
    pub fn open_shutter(&mut self) -> Option<PathBuf> {
        if self.permission != Permission::Granted {
            return None;
        }

        let mut dialog = FileDialog::new()
            .set_title("Take Photo")
            .add_filter("Images", &FRAME_EXTENSIONS);
        if let Some(dir) = self.last_frame.as_deref().and_then(Path::parent) {
            dialog = dialog.set_directory(dir);
        }

        let frame = dialog.pick_file()?;
        self.last_frame = Some(frame.clone());
        Some(frame)
    }
}

/// Ask for camera access by making sure the capture directory is usable
///
/// On success, stills left over from an earlier run (a window closed while
/// a frame was still developing) are removed.
pub async fn request_permission(capture_dir: PathBuf) -> Permission {
    if let Err(e) = tokio::fs::create_dir_all(&capture_dir).await {
        tracing::warn!("🚫 Camera unavailable, {}: {}", capture_dir.display(), e);
        return Permission::Denied;
    }

    match tokio::fs::metadata(&capture_dir).await {
        Ok(meta) if meta.is_dir() && !meta.permissions().readonly() => {
            tracing::info!("📷 Camera ready, captures go to {}", capture_dir.display());
            sweep_stale_stills(&capture_dir).await;
            Permission::Granted
        }
        Ok(_) => {
            tracing::warn!("🚫 Capture directory is not writable: {}", capture_dir.display());
            Permission::Denied
        }
        Err(e) => {
            tracing::warn!("🚫 Camera unavailable, {}: {}", capture_dir.display(), e);
            Permission::Denied
        }
    }
}

/// Delete developed stills nobody owns any more
///
/// Only called before the first capture of a screen, so every still found
/// belongs to a previous run.
async fn sweep_stale_stills(capture_dir: &Path) -> usize {
    let mut entries = match tokio::fs::read_dir(capture_dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("⚠️  Cannot scan {}: {}", capture_dir.display(), e);
            return 0;
        }
    };

    let mut removed = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
        if !is_file || !is_still_name(&path) {
            continue;
        }
        match tokio::fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("⚠️  Could not delete stale still {}: {}", path.display(), e),
        }
    }

    if removed > 0 {
        tracing::info!("🔄 Removed {} stale stills", removed);
    }
    removed
}

fn is_still_name(path: &Path) -> bool {
    let has_prefix = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(develop::STILL_PREFIX));
    let has_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == develop::STILL_EXTENSION);
    has_prefix && has_extension
}
