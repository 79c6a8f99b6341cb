/// Scratch copies of captured stills
///
/// The upload never reads the capture itself. It works on a uniquely named
/// copy in the scratch directory, and that copy is removed when the guard is
/// dropped: after success, after an error, or when the upload future is
/// dropped mid-flight.
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tempfile::{NamedTempFile, TempPath};

#[derive(Debug)]
pub struct ScratchCopy {
    path: TempPath,
}

impl ScratchCopy {
    /// Copy `source` into a fresh file under `scratch_dir`
    ///
    /// The copy runs on the blocking pool through the handle the guard owns,
    /// so a dropped future still ends with the file deleted once the worker
    /// finishes.
    pub async fn create(scratch_dir: &Path, source: &Path) -> io::Result<Self> {
        let scratch_dir = scratch_dir.to_path_buf();
        let source = source.to_path_buf();

        let file = tokio::task::spawn_blocking(move || copy_blocking(&scratch_dir, &source))
            .await
            .map_err(io::Error::other)??;

        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole copy for the request body
    pub async fn read(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

fn copy_blocking(scratch_dir: &Path, source: &Path) -> io::Result<NamedTempFile> {
    fs::create_dir_all(scratch_dir)?;

    // Dropping `named` on any error below deletes the file
    let mut named = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(".jpg")
        .tempfile_in(scratch_dir)?;
    let mut original = File::open(source)?;
    io::copy(&mut original, named.as_file_mut())?;

    tracing::debug!("📋 Scratch copy {} <- {}", named.path().display(), source.display());
    Ok(named)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_copy_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("capture.jpg");
        std::fs::write(&source, b"fake jpeg bytes").unwrap();
        let scratch_dir = dir.path().join("scratch");

        let copy = ScratchCopy::create(&scratch_dir, &source).await.unwrap();
        let copied = copy.path().to_path_buf();

        assert_ne!(copied, source);
        assert!(copied.starts_with(&scratch_dir));
        assert_eq!(copy.read().await.unwrap(), b"fake jpeg bytes");

        drop(copy);
        assert!(!copied.exists());
        assert!(source.exists(), "the capture itself is left alone");
    }

    #[tokio::test]
    async fn test_copies_get_unique_names() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("capture.jpg");
        std::fs::write(&source, b"x").unwrap();

        let a = ScratchCopy::create(dir.path(), &source).await.unwrap();
        let b = ScratchCopy::create(dir.path(), &source).await.unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn test_missing_source_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let scratch_dir = dir.path().join("scratch");

        let result = ScratchCopy::create(&scratch_dir, &dir.path().join("missing.jpg")).await;
        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(&scratch_dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_create_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("capture.jpg");
        std::fs::write(&source, vec![0xAB; 16 * 1024 * 1024]).unwrap();
        let scratch_dir = dir.path().join("scratch");

        // Abandon copies at every stage, from before the worker starts to mid-copy
        for i in 0..60u64 {
            let create = ScratchCopy::create(&scratch_dir, &source);
            let _ = tokio::time::timeout(Duration::from_micros(i * 50), create).await;
        }

        // Detached workers finish on their own; their output is dropped with them
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut leftovers = usize::MAX;
        while Instant::now() < deadline {
            leftovers = std::fs::read_dir(&scratch_dir).map(|d| d.count()).unwrap_or(0);
            if leftovers == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(leftovers, 0);
    }
}
