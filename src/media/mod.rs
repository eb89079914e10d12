// Audio extraction
//
// - Commands: ffmpeg command builder and runner
// - Processor: ffmpeg-backed AudioExtractor
// - AudioArtifact: temporary WAV file owned by a single pipeline run

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::debug;

pub use commands::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::{Result, SubgenError};

/// Turns a video into an audio file the transcriber can read
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    async fn extract_audio(&self, video_path: &Path) -> Result<AudioArtifact>;
}

/// Temporary audio file scoped to one pipeline run.
///
/// The file is deleted when the artifact is dropped, so every exit path of the
/// run removes it. `remove` does the same eagerly and reports failures.
#[derive(Debug)]
pub struct AudioArtifact {
    path: TempPath,
}

impl AudioArtifact {
    /// Reserve an empty `.wav` file named after the video stem.
    pub fn create(work_dir: Option<&Path>, stem: &str) -> Result<Self> {
        let prefix = format!("{}_", stem);
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).suffix(".wav");

        let file = match work_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                builder.tempfile_in(dir)?
            }
            None => builder.tempfile()?,
        };

        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    /// Take ownership of an existing file.
    pub fn from_path<P: Into<PathBuf>>(path: P) -> Result<Self> {
        Ok(Self {
            path: TempPath::try_from_path(path.into())?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now. Already missing files count as removed.
    pub fn remove(self) -> Result<()> {
        let removed = self.path.to_path_buf();
        match self.path.close() {
            Ok(()) => {
                debug!("Removed temporary audio {}", removed.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SubgenError::Io(e)),
        }
    }
}

/// Factory for audio extractor instances
pub struct AudioExtractorFactory;

impl AudioExtractorFactory {
    /// Create the default extractor implementation (FFmpeg-based)
    pub fn create_extractor(config: MediaConfig) -> Box<dyn AudioExtractor> {
        Box::new(processor::FfmpegExtractor::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = AudioArtifact::create(Some(dir.path()), "clip").unwrap();
        let path = artifact.path().to_path_buf();

        assert!(path.exists());
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("clip_"));
        assert_eq!(path.extension().unwrap(), "wav");

        drop(artifact);
        assert!(!path.exists());
    }

    #[test]
    fn test_remove_deletes_file_eagerly() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = AudioArtifact::create(Some(dir.path()), "clip").unwrap();
        let path = artifact.path().to_path_buf();

        artifact.remove().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_remove_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.wav");
        std::fs::write(&path, b"RIFF").unwrap();

        let artifact = AudioArtifact::from_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(artifact.remove().is_ok());
    }
}
