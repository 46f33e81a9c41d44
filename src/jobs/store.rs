//! In-memory job store
//!
//! Owns every job record. Mutations go through the map's per-entry locking;
//! readers get clones. Jobs older than the retention TTL are swept on every
//! insert and by an hourly background task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use crate::types::{Job, JobStatus, ResearchData};

/// How long jobs are retained, in hours.
const JOB_RETENTION_HOURS: i64 = 24;

/// Background sweep interval.
const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

struct JobEntry {
    job: Job,
    cancel: Arc<AtomicBool>,
}

/// Store for all jobs in the process
#[derive(Default)]
pub struct JobStore {
    jobs: DashMap<Uuid, JobEntry>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new job, returning the cancel flag shared with its
    /// background task. Sweeps expired jobs first.
    pub fn insert(&self, job: Job) -> Arc<AtomicBool> {
        self.sweep();
        let cancel = Arc::new(AtomicBool::new(false));
        let id = job.id;
        self.jobs.insert(
            id,
            JobEntry {
                job,
                cancel: Arc::clone(&cancel),
            },
        );
        cancel
    }

    pub fn get(&self, id: &Uuid) -> Option<Job> {
        self.jobs.get(id).map(|entry| entry.job.clone())
    }

    pub fn active_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|entry| entry.job.status == JobStatus::Processing)
            .count()
    }

    /// Apply a mutation to a job if it still exists. Bumps `updated_at`.
    pub fn update<F: FnOnce(&mut Job)>(&self, id: &Uuid, mutate: F) -> bool {
        match self.jobs.get_mut(id) {
            Some(mut entry) => {
                mutate(&mut entry.job);
                entry.job.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Advance progress. Progress is monotonic: a lower value than the
    /// current one is ignored, the step label still updates.
    pub fn set_progress(&self, id: &Uuid, progress: u8, step: &str) {
        self.update(id, |job| {
            job.progress = job.progress.max(progress.min(100));
            job.step = step.to_string();
        });
    }

    pub fn add_warning(&self, id: &Uuid, warning: String) {
        self.update(id, |job| job.warnings.push(warning));
    }

    /// Transition a processing job to completed with its result payload.
    pub fn mark_completed(&self, id: &Uuid, data: ResearchData, processing_time_ms: u64) {
        self.update(id, |job| {
            if job.status != JobStatus::Processing {
                return;
            }
            job.status = JobStatus::Completed;
            job.progress = 100;
            job.step = "completed".to_string();
            job.completed_at = Some(Utc::now());
            job.processing_time_ms = Some(processing_time_ms);
            job.data = Some(data);
        });
    }

    /// Transition a processing job to failed with a stage label and stable
    /// message.
    pub fn mark_failed(&self, id: &Uuid, stage: &str, message: String) {
        self.update(id, |job| {
            if job.status != JobStatus::Processing {
                return;
            }
            job.status = JobStatus::Failed;
            job.step = stage.to_string();
            job.failed_at = Some(Utc::now());
            job.error = Some(message);
        });
    }

    /// Cancel and remove a job. The cancel flag stays shared with the
    /// background task, which observes it at the next stage boundary.
    /// Returns false when the job does not exist.
    pub fn delete(&self, id: &Uuid) -> bool {
        match self.jobs.remove(id) {
            Some((_, entry)) => {
                entry.cancel.store(true, Ordering::Relaxed);
                info!("job {} deleted", id);
                true
            }
            None => false,
        }
    }

    /// Remove jobs older than the retention TTL.
    pub fn sweep(&self) {
        let cutoff = Utc::now() - chrono::Duration::hours(JOB_RETENTION_HOURS);
        let before = self.jobs.len();
        self.jobs.retain(|_, entry| entry.job.created_at > cutoff);
        let removed = before - self.jobs.len();
        if removed > 0 {
            debug!("swept {} expired jobs", removed);
        }
    }

    /// Run the hourly retention sweep until shutdown.
    pub fn spawn_sweeper(self: &Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            interval.tick().await; // immediate first tick
            loop {
                tokio::select! {
                    _ = interval.tick() => store.sweep(),
                    _ = shutdown.recv() => break,
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResearchOptions;

    fn make_job() -> Job {
        Job::new(
            "https://example.com".to_string(),
            "2756".to_string(),
            None,
            "de".to_string(),
            ResearchOptions::default(),
        )
    }

    #[test]
    fn test_insert_and_get() {
        let store = JobStore::new();
        let job = make_job();
        let id = job.id;
        store.insert(job);

        let fetched = store.get(&id).unwrap();
        assert_eq!(fetched.status, JobStatus::Processing);
        assert_eq!(store.active_count(), 1);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let store = JobStore::new();
        let job = make_job();
        let id = job.id;
        store.insert(job);

        store.set_progress(&id, 50, "enriching");
        store.set_progress(&id, 30, "late update");
        let job = store.get(&id).unwrap();
        assert_eq!(job.progress, 50);
        assert_eq!(job.step, "late update");
    }

    #[test]
    fn test_delete_sets_cancel_flag() {
        let store = JobStore::new();
        let job = make_job();
        let id = job.id;
        let cancel = store.insert(job);

        assert!(store.delete(&id));
        assert!(cancel.load(Ordering::Relaxed));
        assert!(store.get(&id).is_none());
        assert!(!store.delete(&id));
    }

    #[test]
    fn test_mark_failed_only_from_processing() {
        let store = JobStore::new();
        let job = make_job();
        let id = job.id;
        store.insert(job);

        store.mark_failed(&id, "scanning", "boom".to_string());
        store.mark_failed(&id, "clustering", "later".to_string());
        let job = store.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.step, "scanning");
        assert_eq!(job.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_sweep_removes_expired() {
        let store = JobStore::new();
        let mut job = make_job();
        job.created_at = Utc::now() - chrono::Duration::hours(25);
        let id = job.id;
        store.insert(job);

        store.sweep();
        assert!(store.get(&id).is_none());
    }

    #[test]
    fn test_sweep_keeps_fresh_jobs() {
        let store = JobStore::new();
        let job = make_job();
        let id = job.id;
        store.insert(job);
        store.sweep();
        assert!(store.get(&id).is_some());
    }
}
