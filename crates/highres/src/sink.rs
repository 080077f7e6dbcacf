//! Writes captures to disk.

use std::path::{Path, PathBuf};

use highres_core::{EncodedImage, ImageSink, PersistError};

/// Saves each capture as `<dir>/<filename>`.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    /// Creates a sink writing into `dir`. The directory is created on first use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a capture with `filename` is written to.
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }
}

impl ImageSink for FileSink {
    async fn persist(&self, image: &EncodedImage) -> Result<(), PersistError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&image.filename);
        std::fs::write(&path, &image.bytes)?;
        log::info!("Saved {} ({} bytes)", path.display(), image.bytes.len());
        Ok(())
    }
}
