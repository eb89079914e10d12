use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::Task;

/// Process-wide task map.
///
/// Records are never mutated in place: every update builds a new `Task` and
/// swaps it in under the write lock, so readers always see a whole record.
/// The lock is never held across an await point.
///
/// Finished tasks are kept forever unless a retention period is set, in which
/// case terminal tasks older than it are evicted on the next insert.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: RwLock<HashMap<Uuid, Arc<Task>>>,
    retention: Option<Duration>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Option<Duration>) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            retention,
        }
    }

    /// Insert a new pending task under a fresh id.
    pub fn create(&self, video_path: PathBuf) -> Task {
        self.evict_expired();

        let mut tasks = self.write();
        let mut id = Uuid::new_v4();
        while tasks.contains_key(&id) {
            id = Uuid::new_v4();
        }

        let task = Task::new(id, video_path);
        tasks.insert(id, Arc::new(task.clone()));
        debug!("Created task {} for {}", id, task.video_path.display());
        task
    }

    /// Snapshot of a task
    pub fn get(&self, id: &Uuid) -> Option<Task> {
        let entry = self.read().get(id).cloned();
        entry.map(|task| (*task).clone())
    }

    /// Apply `f` to a copy of the task and store the copy. Terminal tasks are
    /// left untouched. Returns the stored record.
    pub fn update<F>(&self, id: &Uuid, f: F) -> Option<Task>
    where
        F: FnOnce(&mut Task),
    {
        let mut tasks = self.write();
        let current = tasks.get(id)?;

        if current.is_terminal() {
            debug!("Ignoring update to finished task {}", id);
            return Some((**current).clone());
        }

        let mut next = (**current).clone();
        f(&mut next);
        next.updated_at = Utc::now();

        tasks.insert(*id, Arc::new(next.clone()));
        Some(next)
    }

    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(Utc::now())
    }

    /// Drop terminal tasks last updated more than the retention period before `now`.
    pub fn evict_expired_at(&self, now: DateTime<Utc>) -> usize {
        let Some(retention) = self.retention else {
            return 0;
        };
        let Ok(retention) = chrono::Duration::from_std(retention) else {
            return 0;
        };
        // Retention reaching past the representable range keeps everything
        let Some(cutoff) = now.checked_sub_signed(retention) else {
            return 0;
        };

        let mut tasks = self.write();
        let before = tasks.len();
        tasks.retain(|_, task| !(task.is_terminal() && task.updated_at < cutoff));
        let evicted = before - tasks.len();

        if evicted > 0 {
            info!("Evicted {} finished tasks older than {:?}", evicted, retention);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, Arc<Task>>> {
        self.tasks.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, Arc<Task>>> {
        self.tasks.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;

    #[test]
    fn test_create_and_get() {
        let store = TaskStore::new();
        let task = store.create(PathBuf::from("/videos/a.mp4"));

        let fetched = store.get(&task.id).unwrap();
        assert_eq!(fetched.status, TaskStatus::Pending);
        assert_eq!(fetched.video_path, PathBuf::from("/videos/a.mp4"));
        assert!(store.get(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_update_replaces_record() {
        let store = TaskStore::new();
        let task = store.create(PathBuf::from("a.mp4"));
        let before = store.get(&task.id).unwrap();

        let updated = store
            .update(&task.id, |t| t.status = TaskStatus::Processing)
            .unwrap();

        assert_eq!(updated.status, TaskStatus::Processing);
        assert_eq!(before.status, TaskStatus::Pending);
        assert!(store.update(&Uuid::new_v4(), |_| {}).is_none());
    }

    #[test]
    fn test_terminal_tasks_are_immutable() {
        let store = TaskStore::new();
        let task = store.create(PathBuf::from("a.mp4"));
        store.update(&task.id, |t| {
            t.status = TaskStatus::Completed;
            t.srt_path = Some(PathBuf::from("a.srt"));
        });

        let after = store
            .update(&task.id, |t| {
                t.status = TaskStatus::Error;
                t.srt_path = None;
            })
            .unwrap();

        assert_eq!(after.status, TaskStatus::Completed);
        assert_eq!(store.get(&task.id).unwrap(), after);
    }

    #[test]
    fn test_retention_evicts_only_old_terminal_tasks() {
        let store = TaskStore::with_retention(Some(Duration::from_secs(60)));
        let done = store.create(PathBuf::from("done.mp4"));
        let running = store.create(PathBuf::from("running.mp4"));
        store.update(&done.id, |t| t.status = TaskStatus::Completed);
        store.update(&running.id, |t| t.status = TaskStatus::Processing);

        assert_eq!(store.evict_expired_at(Utc::now()), 0);

        let later = Utc::now() + chrono::Duration::seconds(120);
        assert_eq!(store.evict_expired_at(later), 1);
        assert!(store.get(&done.id).is_none());
        assert!(store.get(&running.id).is_some());
    }

    #[test]
    fn test_huge_retention_keeps_everything() {
        let store = TaskStore::with_retention(Some(Duration::from_secs(10_000_000_000_000)));
        let task = store.create(PathBuf::from("a.mp4"));
        store.update(&task.id, |t| t.status = TaskStatus::Completed);

        assert_eq!(store.evict_expired_at(Utc::now()), 0);
        store.create(PathBuf::from("b.mp4"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_no_retention_keeps_everything() {
        let store = TaskStore::new();
        let task = store.create(PathBuf::from("a.mp4"));
        store.update(&task.id, |t| t.status = TaskStatus::Error);

        let much_later = Utc::now() + chrono::Duration::days(365);
        assert_eq!(store.evict_expired_at(much_later), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_concurrent_updates_to_distinct_tasks() {
        let store = Arc::new(TaskStore::new());
        let ids: Vec<Uuid> = (0..8)
            .map(|i| store.create(PathBuf::from(format!("{}.mp4", i))).id)
            .collect();

        let handles: Vec<_> = ids
            .iter()
            .copied()
            .map(|id| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        store.update(&id, |t| t.status = TaskStatus::Processing);
                    }
                    store.update(&id, |t| t.status = TaskStatus::Completed);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(ids
            .iter()
            .all(|id| store.get(id).unwrap().status == TaskStatus::Completed));
    }
}
