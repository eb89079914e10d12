use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::TranscriberConfig;
use crate::error::{Result, SubgenError};
use crate::transcript::{Segment, Transcript};
use super::Transcriber;

/// whisper.cpp `-oj` output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppOutput {
    pub result: Option<WhisperCppResult>,
    pub transcription: Vec<WhisperCppSegment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppResult {
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppSegment {
    pub offsets: WhisperCppOffsets,
    pub text: String,
}

/// Offsets in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppOffsets {
    pub from: i64,
    pub to: i64,
}

impl From<WhisperCppOutput> for Transcript {
    fn from(output: WhisperCppOutput) -> Self {
        let segments = output
            .transcription
            .into_iter()
            .filter(|seg| !seg.text.trim().is_empty())
            .filter(|seg| {
                let valid = seg.offsets.to > seg.offsets.from.max(0);
                if !valid {
                    warn!(
                        "Skipping segment with empty time range {}-{}ms: {}",
                        seg.offsets.from,
                        seg.offsets.to,
                        seg.text.trim()
                    );
                }
                valid
            })
            .map(|seg| {
                let start = seg.offsets.from.max(0) as f64 / 1000.0;
                let end = seg.offsets.to as f64 / 1000.0;
                Segment::new(start, end, seg.text.trim())
            })
            .collect();

        Transcript::new(output.result.map(|r| r.language), segments)
    }
}

/// Runs the whisper.cpp CLI and reads back its JSON output
pub struct WhisperCppTranscriber {
    config: TranscriberConfig,
}

impl WhisperCppTranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }

    fn build_command(&self, audio_path: &Path, output_prefix: &Path) -> Command {
        let mut cmd = Command::new(&self.config.binary_path);
        cmd.arg("-m").arg(&self.config.model)
            .arg("-f").arg(audio_path)
            .arg("-oj")
            .arg("-of").arg(output_prefix)
            .arg("-bs").arg(self.config.beam_size.to_string())
            .arg("-np");

        match &self.config.language {
            Some(lang) => cmd.arg("-l").arg(lang),
            None => cmd.arg("-l").arg("auto"),
        };

        if let Some(threads) = self.config.threads {
            cmd.arg("-t").arg(threads.to_string());
        }

        cmd.stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Transcriber for WhisperCppTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript> {
        info!("Transcribing {} with model {}", audio_path.display(), self.config.model);

        let temp_dir = tempfile::tempdir()
            .map_err(|e| SubgenError::Transcription(format!("Failed to create temp directory: {}", e)))?;
        let output_prefix = temp_dir.path().join("transcript");

        let mut cmd = self.build_command(audio_path, &output_prefix);
        debug!("Executing transcriber command: {:?}", cmd);

        let output = cmd.output().await.map_err(|e| {
            SubgenError::Transcription(format!("Failed to execute {}: {}", self.config.binary_path, e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SubgenError::Transcription(format!("Whisper failed: {}", stderr.trim())));
        }

        let json_file = output_prefix.with_extension("json");
        let json_content = tokio::fs::read_to_string(&json_file)
            .await
            .map_err(|e| SubgenError::Transcription(format!("Failed to read output: {}", e)))?;

        let transcript = parse_whisper_json(&json_content)?;
        info!(
            "Transcription produced {} segments (language: {})",
            transcript.segments.len(),
            transcript.language.as_deref().unwrap_or("unknown")
        );

        Ok(transcript)
    }
}

pub fn parse_whisper_json(content: &str) -> Result<Transcript> {
    let output: WhisperCppOutput = serde_json::from_str(content)
        .map_err(|e| SubgenError::Transcription(format!("Failed to parse whisper.cpp JSON: {}", e)))?;
    Ok(output.into())
}
