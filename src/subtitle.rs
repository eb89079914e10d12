use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::error::{Result, SubgenError};
use crate::transcript::TranslatedSegment;

/// Renders subtitle entries to a file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubtitleFormatter: Send + Sync {
    /// Write `segments` to `output_path` and return the path written.
    async fn write(&self, segments: &[TranslatedSegment], output_path: &Path) -> Result<PathBuf>;

    /// File extension of the produced format
    fn extension(&self) -> &'static str;
}

/// SubRip (.srt) writer
#[derive(Debug, Clone, Default)]
pub struct SrtFormatter;

#[async_trait]
impl SubtitleFormatter for SrtFormatter {
    async fn write(&self, segments: &[TranslatedSegment], output_path: &Path) -> Result<PathBuf> {
        info!("Generating SRT file: {}", output_path.display());

        let srt_content = render_srt(segments);

        fs::write(output_path, srt_content).await.map_err(|e| {
            SubgenError::Formatting(format!("Failed to write {}: {}", output_path.display(), e))
        })?;

        info!("SRT file generated successfully");
        Ok(output_path.to_path_buf())
    }

    fn extension(&self) -> &'static str {
        "srt"
    }
}

/// Render SRT text. Entries are numbered consecutively from 1; segments whose
/// text is blank are left out.
pub fn render_srt(segments: &[TranslatedSegment]) -> String {
    let mut srt_content = String::new();

    let entries = segments
        .iter()
        .map(|seg| (seg, seg.translated_text.trim()))
        .filter(|(_, text)| !text.is_empty());

    for (index, (segment, text)) in entries.enumerate() {
        srt_content.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_srt_time(segment.start),
            format_srt_time(segment.end),
            text
        ));
    }

    srt_content
}

/// `<dir>/<stem>.<ext>` beside the source video
pub fn subtitle_path_for(video_path: &Path, extension: &str) -> PathBuf {
    video_path.with_extension(extension)
}

/// Format time in seconds to SRT time format (HH:MM:SS,mmm)
fn format_srt_time(seconds: f64) -> String {
    let total_milliseconds = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}
