use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Result, SubgenError};
use crate::media::{AudioArtifact, AudioExtractor, AudioExtractorFactory};
use crate::subtitle::{SrtFormatter, SubtitleFormatter, subtitle_path_for};
use crate::task::{Stage, StageTimings};
use crate::transcribe::{Transcriber, TranscriberFactory};
use crate::translate::TranslationStage;

const VIDEO_EXTENSIONS: [&str; 8] = ["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm", "m4v"];

/// Receives stage boundaries while a workflow runs
pub trait StageObserver: Send + Sync {
    fn stage_started(&self, _stage: Stage) {}

    fn stage_finished(&self, _stage: Stage, _timings: &StageTimings) {}
}

/// Observer that ignores every event
pub struct NoopObserver;

impl StageObserver for NoopObserver {}

/// Result of one workflow run. Timings cover every stage that ran, including
/// the ones before a failure.
#[derive(Debug)]
pub struct WorkflowRun {
    pub timings: StageTimings,
    pub outcome: Result<PathBuf>,
}

/// Video to subtitle file: extraction, transcription, translation, SRT
/// generation and cleanup, strictly in that order.
pub struct Workflow {
    extractor: Arc<dyn AudioExtractor>,
    transcriber: Arc<dyn Transcriber>,
    translation: TranslationStage,
    formatter: Arc<dyn SubtitleFormatter>,
}

impl Workflow {
    pub fn new(
        extractor: Arc<dyn AudioExtractor>,
        transcriber: Arc<dyn Transcriber>,
        translation: TranslationStage,
        formatter: Arc<dyn SubtitleFormatter>,
    ) -> Self {
        Self {
            extractor,
            transcriber,
            translation,
            formatter,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        Ok(Self::new(
            Arc::from(AudioExtractorFactory::create_extractor(config.media.clone())),
            Arc::from(TranscriberFactory::create_default(config.transcriber.clone())),
            TranslationStage::from_config(&config.translate)?,
            Arc::new(SrtFormatter),
        ))
    }

    /// Run every stage for one video. The temporary audio is removed whatever
    /// the outcome, and the cleanup stage is always timed.
    pub async fn run(
        &self,
        video_path: &Path,
        observer: &dyn StageObserver,
        cancel: &CancellationToken,
    ) -> WorkflowRun {
        info!("Processing video: {}", video_path.display());

        let mut timings = StageTimings::default();
        let mut artifact = None;

        let outcome = self
            .run_stages(video_path, observer, cancel, &mut timings, &mut artifact)
            .await;

        observer.stage_started(Stage::Cleanup);
        let started = Instant::now();
        if let Some(artifact) = artifact {
            if let Err(e) = artifact.remove() {
                warn!("Failed to remove temporary audio for {}: {}", video_path.display(), e);
            }
        }
        timings.record(Stage::Cleanup, started.elapsed().as_secs_f64());
        observer.stage_finished(Stage::Cleanup, &timings);

        match &outcome {
            Ok(srt_path) => info!(
                "Finished {} -> {} in {:.2}s",
                video_path.display(),
                srt_path.display(),
                timings.total.unwrap_or_default()
            ),
            Err(e) => warn!("Failed {}: {}", video_path.display(), e),
        }

        WorkflowRun { timings, outcome }
    }

    /// Run the workflow to completion, for callers that do not track progress
    pub async fn process_file(&self, video_path: &Path) -> Result<PathBuf> {
        if !video_path.is_file() {
            return Err(SubgenError::InvalidPath(format!(
                "File '{}' does not exist",
                video_path.display()
            )));
        }

        self.run(video_path, &NoopObserver, &CancellationToken::new())
            .await
            .outcome
    }

    async fn run_stages(
        &self,
        video_path: &Path,
        observer: &dyn StageObserver,
        cancel: &CancellationToken,
        timings: &mut StageTimings,
        artifact: &mut Option<AudioArtifact>,
    ) -> Result<PathBuf> {
        let audio = timed(
            Stage::AudioExtraction,
            observer,
            cancel,
            timings,
            self.extractor.extract_audio(video_path),
        )
        .await?;
        let audio_path = audio.path().to_path_buf();
        *artifact = Some(audio);

        let transcript = timed(
            Stage::Transcription,
            observer,
            cancel,
            timings,
            self.transcriber.transcribe(&audio_path),
        )
        .await?;
        if transcript.is_empty() {
            warn!("No speech detected in {}", video_path.display());
        }

        let translated = if self.translation.is_enabled() {
            let translated = timed(Stage::Translation, observer, cancel, timings, async {
                Ok(self.translation.run(&transcript).await)
            })
            .await?;
            let unchanged = translated.iter().filter(|s| s.is_unchanged()).count();
            if unchanged > 0 {
                debug!("{} of {} segments are unchanged from the source text", unchanged, translated.len());
            }
            translated
        } else {
            self.translation.run(&transcript).await
        };

        let srt_path = subtitle_path_for(video_path, self.formatter.extension());
        timed(
            Stage::SrtGeneration,
            observer,
            cancel,
            timings,
            self.formatter.write(&translated, &srt_path),
        )
        .await
    }
}

/// Run one stage future, recording its wall-clock time even when it fails.
/// A cancelled token stops the workflow before the stage starts.
async fn timed<T, F>(
    stage: Stage,
    observer: &dyn StageObserver,
    cancel: &CancellationToken,
    timings: &mut StageTimings,
    stage_future: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(SubgenError::Cancelled);
    }

    observer.stage_started(stage);
    let started = Instant::now();
    let result = stage_future.await;
    let elapsed = started.elapsed().as_secs_f64();
    timings.record(stage, elapsed);
    observer.stage_finished(stage, timings);

    match &result {
        Ok(_) => info!("Stage {} completed in {:.2}s", stage, elapsed),
        Err(e) => warn!("Stage {} failed after {:.2}s: {}", stage, elapsed, e),
    }

    result
}

/// Expand directories into the video files they contain; files pass through.
pub fn collect_videos(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut videos = Vec::new();

    for path in paths {
        if !path.is_dir() {
            videos.push(path.clone());
            continue;
        }

        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_video_file(e.path()))
            .map(|e| e.path().to_path_buf())
            .collect();
        found.sort();

        info!("Found {} video files in {}", found.len(), path.display());
        videos.extend(found);
    }

    videos
}

fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MockAudioExtractor;
    use crate::subtitle::MockSubtitleFormatter;
    use crate::transcribe::MockTranscriber;
    use crate::transcript::{Segment, Transcript};
    use crate::translate::{ContextualTranslator, MockTranslationProvider};
    use assert_fs::prelude::*;
    use std::sync::Mutex;

    fn extractor_into(dir: PathBuf) -> MockAudioExtractor {
        let mut extractor = MockAudioExtractor::new();
        extractor.expect_extract_audio().returning(move |_| {
            let path = dir.join("clip_audio.wav");
            std::fs::write(&path, b"RIFF").unwrap();
            AudioArtifact::from_path(path)
        });
        extractor
    }

    fn transcriber_with(segments: Vec<Segment>) -> MockTranscriber {
        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .returning(move |_| Ok(Transcript::new(Some("ja".into()), segments.clone())));
        transcriber
    }

    fn srt_formatter() -> Arc<dyn SubtitleFormatter> {
        Arc::new(SrtFormatter)
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl StageObserver for RecordingObserver {
        fn stage_started(&self, stage: Stage) {
            self.events.lock().unwrap().push(format!("start:{}", stage));
        }

        fn stage_finished(&self, stage: Stage, _timings: &StageTimings) {
            self.events.lock().unwrap().push(format!("end:{}", stage));
        }
    }

    #[tokio::test]
    async fn test_pass_through_run_writes_srt_and_cleans_up() {
        let temp = assert_fs::TempDir::new().unwrap();
        let video = temp.child("clip.mp4");
        video.write_binary(b"video").unwrap();

        let workflow = Workflow::new(
            Arc::new(extractor_into(temp.path().to_path_buf())),
            Arc::new(transcriber_with(vec![Segment::new(0.0, 1.0, "こんにちは")])),
            TranslationStage::PassThrough,
            srt_formatter(),
        );

        let observer = RecordingObserver::default();
        let run = workflow.run(video.path(), &observer, &CancellationToken::new()).await;

        let srt_path = run.outcome.unwrap();
        assert_eq!(srt_path, temp.path().join("clip.srt"));
        assert_eq!(
            std::fs::read_to_string(&srt_path).unwrap(),
            "1\n00:00:00,000 --> 00:00:01,000\nこんにちは\n\n"
        );
        assert!(!temp.path().join("clip_audio.wav").exists());

        assert!(run.timings.translation.is_none());
        assert!(run.timings.audio_extraction.is_some());
        assert!(run.timings.cleanup.is_some());
        assert_eq!(
            *observer.events.lock().unwrap(),
            vec![
                "start:audio_extraction",
                "end:audio_extraction",
                "start:transcription",
                "end:transcription",
                "start:srt_generation",
                "end:srt_generation",
                "start:cleanup",
                "end:cleanup",
            ]
        );
    }

    #[tokio::test]
    async fn test_unreachable_provider_still_completes_with_source_text() {
        let temp = assert_fs::TempDir::new().unwrap();
        let video = temp.child("clip.mp4");
        video.write_binary(b"video").unwrap();

        let mut provider = MockTranslationProvider::new();
        provider
            .expect_translate_batch()
            .returning(|_| Err(SubgenError::TranslationProvider("connection refused".into())));
        let translator = ContextualTranslator::new(Arc::new(provider), "en".into(), 5, 3);

        let workflow = Workflow::new(
            Arc::new(extractor_into(temp.path().to_path_buf())),
            Arc::new(transcriber_with(vec![
                Segment::new(0.0, 1.0, "一"),
                Segment::new(1.0, 2.0, "二"),
            ])),
            TranslationStage::Contextual(translator),
            srt_formatter(),
        );

        let run = workflow.run(video.path(), &NoopObserver, &CancellationToken::new()).await;

        assert!(run.outcome.is_ok());
        assert!(run.timings.translation.is_some());
        let srt = std::fs::read_to_string(temp.path().join("clip.srt")).unwrap();
        assert!(srt.contains("一") && srt.contains("二"));
    }

    #[tokio::test]
    async fn test_transcription_failure_keeps_earlier_timings_and_removes_audio() {
        let temp = assert_fs::TempDir::new().unwrap();
        let video = temp.child("clip.mp4");
        video.write_binary(b"video").unwrap();

        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .returning(|_| Err(SubgenError::Transcription("model missing".into())));
        let mut formatter = MockSubtitleFormatter::new();
        formatter.expect_extension().return_const("srt");
        formatter.expect_write().never();

        let workflow = Workflow::new(
            Arc::new(extractor_into(temp.path().to_path_buf())),
            Arc::new(transcriber),
            TranslationStage::PassThrough,
            Arc::new(formatter),
        );

        let run = workflow.run(video.path(), &NoopObserver, &CancellationToken::new()).await;

        assert!(matches!(run.outcome, Err(SubgenError::Transcription(_))));
        assert!(run.timings.audio_extraction.is_some());
        assert!(run.timings.transcription.is_some());
        assert!(run.timings.srt_generation.is_none());
        assert!(run.timings.cleanup.is_some());
        assert!(!temp.path().join("clip_audio.wav").exists());
        assert!(!temp.path().join("clip.srt").exists());
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_first_stage() {
        let mut extractor = MockAudioExtractor::new();
        extractor.expect_extract_audio().never();

        let workflow = Workflow::new(
            Arc::new(extractor),
            Arc::new(MockTranscriber::new()),
            TranslationStage::PassThrough,
            srt_formatter(),
        );

        let cancel = CancellationToken::new();
        cancel.cancel();
        let run = workflow.run(Path::new("clip.mp4"), &NoopObserver, &cancel).await;

        assert!(matches!(run.outcome, Err(SubgenError::Cancelled)));
        assert!(run.timings.audio_extraction.is_none());
        assert!(run.timings.cleanup.is_some());
    }

    #[tokio::test]
    async fn test_process_file_rejects_missing_video() {
        let workflow = Workflow::new(
            Arc::new(MockAudioExtractor::new()),
            Arc::new(MockTranscriber::new()),
            TranslationStage::PassThrough,
            srt_formatter(),
        );

        let err = workflow.process_file(Path::new("missing.mp4")).await.unwrap_err();
        assert!(matches!(err, SubgenError::InvalidPath(_)));
    }

    #[test]
    fn test_collect_videos_walks_directories() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("season1/ep1.MP4").touch().unwrap();
        temp.child("season1/ep2.mkv").touch().unwrap();
        temp.child("season1/notes.txt").touch().unwrap();
        let single = temp.child("extra.mov");
        single.touch().unwrap();

        let videos = collect_videos(&[temp.path().join("season1"), single.path().to_path_buf()]);

        assert_eq!(
            videos,
            vec![
                temp.path().join("season1/ep1.MP4"),
                temp.path().join("season1/ep2.mkv"),
                temp.path().join("extra.mov"),
            ]
        );
    }
}
