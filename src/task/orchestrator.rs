use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{Stage, StageTimings, Task, TaskStatus, TaskStore};
use crate::error::{Result, SubgenError};
use crate::workflow::{StageObserver, Workflow};

/// Handle to a task that is still running in the background
#[derive(Debug, Clone)]
pub struct TaskHandle {
    pub id: Uuid,
    pub cancel: CancellationToken,
}

/// Accepts subtitle requests, runs them in the background and answers
/// status queries from the task store.
pub struct Orchestrator {
    store: Arc<TaskStore>,
    workflow: Arc<Workflow>,
    media_root: Option<PathBuf>,
    running: Arc<Mutex<HashMap<Uuid, TaskHandle>>>,
}

impl Orchestrator {
    pub fn new(store: Arc<TaskStore>, workflow: Arc<Workflow>, media_root: Option<PathBuf>) -> Self {
        Self {
            store,
            workflow,
            media_root,
            running: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of tasks whose background work has not finished
    pub fn in_flight(&self) -> usize {
        self.running.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Relative paths are taken from the media root when one is configured.
    pub fn resolve_path(&self, video_path: &str) -> Result<PathBuf> {
        let trimmed = video_path.trim();
        if trimmed.is_empty() {
            return Err(SubgenError::InvalidPath("video_path must not be empty".to_string()));
        }

        let path = Path::new(trimmed);
        Ok(match &self.media_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        })
    }

    /// Validate the path, record a pending task and start it in the
    /// background. Returns as soon as the task is recorded.
    pub fn submit(&self, video_path: &str) -> Result<Uuid> {
        let path = self.resolve_path(video_path)?;
        if !path.is_file() {
            return Err(SubgenError::InvalidPath(format!(
                "Video file not found at {}",
                path.display()
            )));
        }

        let task = self.store.create(path.clone());
        let handle = TaskHandle {
            id: task.id,
            cancel: CancellationToken::new(),
        };
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(task.id, handle.clone());

        info!("Accepted task {} for {}", task.id, path.display());

        let store = self.store.clone();
        let workflow = self.workflow.clone();
        let running = self.running.clone();

        tokio::spawn(async move {
            let id = handle.id;
            let worker = tokio::spawn(execute(store.clone(), workflow, path, handle));

            if let Err(e) = worker.await {
                error!("Task {} worker aborted: {}", id, e);
                store.update(&id, |t| {
                    t.status = TaskStatus::Error;
                    t.error = Some(format!("Task execution aborted: {}", e));
                    t.srt_path = None;
                    t.stage = None;
                });
            }

            running.lock().unwrap_or_else(PoisonError::into_inner).remove(&id);
        });

        Ok(task.id)
    }

    /// Current snapshot of a task
    pub fn get_status(&self, id: &Uuid) -> Result<Task> {
        self.store
            .get(id)
            .ok_or_else(|| SubgenError::NotFound(id.to_string()))
    }

    /// Request cancellation. The running task stops at its next stage boundary
    /// and finishes in the error state; finished tasks are unaffected.
    pub fn cancel(&self, id: &Uuid) -> Result<()> {
        let task = self.get_status(id)?;
        if task.is_terminal() {
            return Ok(());
        }

        if let Some(handle) = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
        {
            info!("Cancelling task {}", id);
            handle.cancel.cancel();
        }
        Ok(())
    }
}

/// Mirrors stage progress into the task store
struct TaskProgress {
    store: Arc<TaskStore>,
    id: Uuid,
}

impl StageObserver for TaskProgress {
    fn stage_started(&self, stage: Stage) {
        self.store.update(&self.id, |t| {
            t.status = TaskStatus::Processing;
            t.stage = Some(stage);
        });
    }

    fn stage_finished(&self, _stage: Stage, timings: &StageTimings) {
        self.store.update(&self.id, |t| t.timings = timings.clone());
    }
}

async fn execute(store: Arc<TaskStore>, workflow: Arc<Workflow>, video_path: PathBuf, handle: TaskHandle) {
    let progress = TaskProgress {
        store: store.clone(),
        id: handle.id,
    };

    let run = workflow.run(&video_path, &progress, &handle.cancel).await;

    match run.outcome {
        Ok(srt_path) => {
            info!("Task {} completed: {}", handle.id, srt_path.display());
            store.update(&handle.id, |t| {
                t.status = TaskStatus::Completed;
                t.srt_path = Some(srt_path);
                t.error = None;
                t.stage = None;
                t.timings = run.timings;
            });
        }
        Err(e) => {
            if e.is_fatal_stage_error() {
                warn!("Task {} failed: {}", handle.id, e);
            } else {
                error!("Task {} failed unexpectedly: {}", handle.id, e);
            }
            store.update(&handle.id, |t| {
                t.status = TaskStatus::Error;
                t.error = Some(e.to_string());
                t.srt_path = None;
                t.stage = None;
                t.timings = run.timings;
            });
        }
    }
}
