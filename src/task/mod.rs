// Task tracking
//
// - Store: process-wide id -> task map with whole-record replacement
// - Orchestrator: submission, background execution, status queries

pub mod orchestrator;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

pub use orchestrator::*;
pub use store::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    AudioExtraction,
    Transcription,
    Translation,
    SrtGeneration,
    Cleanup,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AudioExtraction => "audio_extraction",
            Self::Transcription => "transcription",
            Self::Translation => "translation",
            Self::SrtGeneration => "srt_generation",
            Self::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wall-clock seconds per stage. `total` is kept equal to the sum of the
/// recorded stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTimings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_extraction: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub srt_generation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
}

impl StageTimings {
    pub fn record(&mut self, stage: Stage, seconds: f64) {
        *self.slot_mut(stage) = Some(seconds);
        self.total = Some(self.stage_sum());
    }

    pub fn get(&self, stage: Stage) -> Option<f64> {
        match stage {
            Stage::AudioExtraction => self.audio_extraction,
            Stage::Transcription => self.transcription,
            Stage::Translation => self.translation,
            Stage::SrtGeneration => self.srt_generation,
            Stage::Cleanup => self.cleanup,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total.is_none()
    }

    fn slot_mut(&mut self, stage: Stage) -> &mut Option<f64> {
        match stage {
            Stage::AudioExtraction => &mut self.audio_extraction,
            Stage::Transcription => &mut self.transcription,
            Stage::Translation => &mut self.translation,
            Stage::SrtGeneration => &mut self.srt_generation,
            Stage::Cleanup => &mut self.cleanup,
        }
    }

    fn stage_sum(&self) -> f64 {
        [
            self.audio_extraction,
            self.transcription,
            self.translation,
            self.srt_generation,
            self.cleanup,
        ]
        .iter()
        .flatten()
        .sum()
    }
}

/// One subtitle-generation request and its lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub status: TaskStatus,
    pub video_path: PathBuf,
    pub srt_path: Option<PathBuf>,
    pub error: Option<String>,
    /// Stage currently running, while processing
    pub stage: Option<Stage>,
    pub timings: StageTimings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: Uuid, video_path: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: TaskStatus::Pending,
            video_path,
            srt_path: None,
            error: None,
            stage: None,
            timings: StageTimings::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
