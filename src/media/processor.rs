use async_trait::async_trait;
use std::path::Path;
use tracing::info;

use crate::config::MediaConfig;
use crate::error::{Result, SubgenError};
use super::{AudioArtifact, AudioExtractor, MediaCommandBuilder};

/// ffmpeg-backed audio extractor
pub struct FfmpegExtractor {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl FfmpegExtractor {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);

        Self {
            config,
            command_builder,
        }
    }

    /// Check that ffmpeg can be executed
    pub async fn check_availability(&self) -> Result<()> {
        let version = self.version_info().await?;
        info!("Media processor is available: {}", version);
        Ok(())
    }

    /// First line of `ffmpeg -version`
    pub async fn version_info(&self) -> Result<String> {
        let stdout = self.command_builder.version_check().execute().await?;
        Ok(stdout.lines().next().unwrap_or("Unknown version").to_string())
    }
}

#[async_trait]
impl AudioExtractor for FfmpegExtractor {
    async fn extract_audio(&self, video_path: &Path) -> Result<AudioArtifact> {
        if !video_path.is_file() {
            return Err(SubgenError::InvalidPath(format!(
                "Video file not found at {}",
                video_path.display()
            )));
        }

        let stem = video_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio".to_string());

        let artifact = AudioArtifact::create(self.config.work_dir.as_deref(), &stem)?;

        info!("Extracting audio from {} to {}", video_path.display(), artifact.path().display());

        let command = self.command_builder.extract_audio(
            video_path,
            artifact.path(),
            self.config.sample_rate,
            self.config.channels,
        );
        command.execute().await?;

        info!("Audio extraction completed");
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[tokio::test]
    async fn test_missing_video_is_invalid_path() {
        let extractor = FfmpegExtractor::new(MediaConfig::default());
        let err = extractor
            .extract_audio(Path::new("/definitely/not/here.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, SubgenError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_failed_extraction_leaves_no_artifact() {
        let temp = assert_fs::TempDir::new().unwrap();
        let video = temp.child("clip.mp4");
        video.write_binary(b"not really a video").unwrap();
        let work_dir = temp.child("work");

        let config = MediaConfig {
            binary_path: "/nonexistent/ffmpeg-binary".to_string(),
            work_dir: Some(work_dir.path().to_path_buf()),
            ..MediaConfig::default()
        };
        let extractor = FfmpegExtractor::new(config);

        let err = extractor.extract_audio(video.path()).await.unwrap_err();
        assert!(matches!(err, SubgenError::Extraction(_)));
        assert_eq!(std::fs::read_dir(work_dir.path()).unwrap().count(), 0);
    }
}
