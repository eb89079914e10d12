// Translation
//
// - Context: batched translation with a read-only window of preceding segments
// - Ollama: the LLM-backed translation provider
//
// Whether translation happens at all is decided once, when the stage is built
// from configuration: without a target language the pipeline passes source
// text straight through.

pub mod context;
pub mod ollama;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub use context::*;
pub use ollama::*;

use crate::config::TranslateConfig;
use crate::error::Result;
use crate::transcript::{Transcript, TranslatedSegment};

/// One provider call: translate `texts`, reading `context` for disambiguation only.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub target_language: String,
    pub source_language: Option<String>,
    pub context: Vec<String>,
    pub texts: Vec<String>,
}

/// External text-in, text-out translation capability.
///
/// Implementations return one string per entry of `request.texts`, in order.
/// They may fail or return the wrong number of entries; callers cope with both.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    async fn translate_batch(&self, request: &BatchRequest) -> Result<Vec<String>>;
}

/// The translation step of the pipeline, fixed at configuration time
pub enum TranslationStage {
    Contextual(ContextualTranslator),
    PassThrough,
}

impl TranslationStage {
    pub fn from_config(config: &TranslateConfig) -> Result<Self> {
        match &config.target_language {
            Some(target) => {
                let provider = Arc::new(OllamaProvider::new(config.clone())?);
                info!(
                    "Translation enabled: target={}, model={}, batch_size={}, context_window={}",
                    target, config.model, config.batch_size, config.context_window_size
                );
                Ok(Self::Contextual(ContextualTranslator::new(
                    provider,
                    target.clone(),
                    config.batch_size,
                    config.context_window_size,
                )))
            }
            None => {
                info!("No target language configured, subtitles keep the source language");
                Ok(Self::PassThrough)
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Contextual(_))
    }

    pub async fn run(&self, transcript: &Transcript) -> Vec<TranslatedSegment> {
        match self {
            Self::Contextual(translator) => {
                translator
                    .translate(&transcript.segments, transcript.language.as_deref())
                    .await
            }
            Self::PassThrough => transcript
                .segments
                .iter()
                .map(TranslatedSegment::untranslated)
                .collect(),
        }
    }
}
