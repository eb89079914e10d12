use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::transcript::{Segment, TranslatedSegment};
use super::{BatchRequest, TranslationProvider};

/// Index ranges of one provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    /// Preceding segments sent as read-only context
    pub context: Range<usize>,
    /// Segments to translate
    pub targets: Range<usize>,
}

/// Split `len` segments into consecutive batches of `batch_size`, each with up
/// to `context_window` preceding segments as context. The last batch may be
/// smaller.
pub fn plan_batches(len: usize, batch_size: usize, context_window: usize) -> Vec<BatchPlan> {
    let batch_size = batch_size.max(1);

    (0..len)
        .step_by(batch_size)
        .map(|start| BatchPlan {
            context: start.saturating_sub(context_window)..start,
            targets: start..(start + batch_size).min(len),
        })
        .collect()
}

/// Batched translation with a sliding window of preceding source segments.
///
/// Never fails as a whole: a batch whose provider call errors, or whose reply
/// does not hold exactly one string per segment, keeps its source text.
/// Batches are independent and there are no retries.
pub struct ContextualTranslator {
    provider: Arc<dyn TranslationProvider>,
    target_language: String,
    batch_size: usize,
    context_window: usize,
}

impl ContextualTranslator {
    pub fn new(
        provider: Arc<dyn TranslationProvider>,
        target_language: String,
        batch_size: usize,
        context_window: usize,
    ) -> Self {
        Self {
            provider,
            target_language,
            batch_size: batch_size.max(1),
            context_window,
        }
    }

    /// Translate `segments`, returning the same number of entries in the same order.
    pub async fn translate(
        &self,
        segments: &[Segment],
        source_language: Option<&str>,
    ) -> Vec<TranslatedSegment> {
        let plans = plan_batches(segments.len(), self.batch_size, self.context_window);
        let total_batches = plans.len();
        info!(
            "Starting contextual translation to {}: {} segments in {} batches",
            self.target_language,
            segments.len(),
            total_batches
        );

        let mut translated = Vec::with_capacity(segments.len());
        let mut fallback_batches = 0;

        for (idx, plan) in plans.into_iter().enumerate() {
            let targets = &segments[plan.targets.clone()];
            let request = BatchRequest {
                target_language: self.target_language.clone(),
                source_language: source_language.map(str::to_string),
                context: segments[plan.context.clone()].iter().map(|s| s.text.clone()).collect(),
                texts: targets.iter().map(|s| s.text.clone()).collect(),
            };

            info!(
                "┌─ Translating batch {}/{} (segments {}-{}, {} context)",
                idx + 1,
                total_batches,
                plan.targets.start + 1,
                plan.targets.end,
                request.context.len()
            );

            match self.provider.translate_batch(&request).await {
                Ok(lines) if lines.len() == targets.len() => {
                    for (segment, line) in targets.iter().zip(lines.iter()) {
                        debug!("│ {} => {}", segment.text, line);
                        translated.push(TranslatedSegment::with_translation(segment, Some(line.as_str())));
                    }
                    info!("└─ Batch {}/{} translated", idx + 1, total_batches);
                }
                Ok(lines) => {
                    warn!(
                        "└─ Batch {}/{}: expected {} translations, got {}; keeping source text",
                        idx + 1,
                        total_batches,
                        targets.len(),
                        lines.len()
                    );
                    fallback_batches += 1;
                    translated.extend(targets.iter().map(TranslatedSegment::untranslated));
                }
                Err(e) => {
                    warn!("└─ Batch {}/{} failed: {}; keeping source text", idx + 1, total_batches, e);
                    fallback_batches += 1;
                    translated.extend(targets.iter().map(TranslatedSegment::untranslated));
                }
            }
        }

        if fallback_batches > 0 {
            warn!(
                "{} of {} batches fell back to source text",
                fallback_batches, total_batches
            );
        }

        translated
    }
}
