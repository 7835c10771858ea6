use std::{fmt::Display, future::Future};

use async_trait::async_trait;
use featureform_provider::ProviderError;
use log::{debug, warn};
use tokio::sync::watch;

use crate::{JobError, JobType};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Success,
    Failed,
}

impl JobStatus {
    pub fn is_ended(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match &self {
                JobStatus::Running => "Running",
                JobStatus::Success => "Success",
                JobStatus::Failed => "Failed",
            }
        )
    }
}

/**
 * Handle on the outcome of a running job
 */
#[async_trait]
pub trait CompletionWatcher: Display + Send + Sync {
    /**
     * Block until the job ends, every call returns the same outcome
     */
    async fn wait(&self) -> Result<(), JobError>;

    fn is_complete(&self) -> bool;

    fn status(&self) -> JobStatus;
}

fn status_of(result: &Result<(), JobError>) -> JobStatus {
    match result {
        Ok(_) => JobStatus::Success,
        Err(_) => JobStatus::Failed,
    }
}

/**
 * Watcher of a job that already finished inline
 */
pub struct SyncWatcher {
    result: Result<(), JobError>,
}

impl SyncWatcher {
    pub fn new(result: Result<(), JobError>) -> Self {
        Self { result }
    }
}

impl Display for SyncWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.result {
            Ok(_) => write!(f, "Runner completed"),
            Err(e) => write!(f, "Runner failed: {}", e),
        }
    }
}

#[async_trait]
impl CompletionWatcher for SyncWatcher {
    async fn wait(&self) -> Result<(), JobError> {
        self.result.clone()
    }

    fn is_complete(&self) -> bool {
        true
    }

    fn status(&self) -> JobStatus {
        status_of(&self.result)
    }
}

/**
 * Watcher of a job running on a background task
 */
pub struct AsyncWatcher {
    job: JobType,
    resource: String,
    receiver: watch::Receiver<Option<Result<(), JobError>>>,
}

impl AsyncWatcher {
    pub fn spawn<F>(job: JobType, resource: String, task: F) -> Self
    where
        F: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        let (sender, receiver) = watch::channel(None);
        let label = format!("{} job on {}", job, resource);
        tokio::spawn(async move {
            let result = task.await;
            debug!("{} ended, success: {}", label, result.is_ok());
            if sender.send(Some(result)).is_err() {
                warn!("{} ended with nobody watching", label);
            }
        });
        Self {
            job,
            resource,
            receiver,
        }
    }

    fn lost(&self) -> JobError {
        JobError::execution(
            self.job,
            &self.resource,
            ProviderError::Backend("job task ended without reporting a result".to_string()),
        )
    }
}

impl Display for AsyncWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} job on {}: {}", self.job, self.resource, self.status())
    }
}

#[async_trait]
impl CompletionWatcher for AsyncWatcher {
    async fn wait(&self) -> Result<(), JobError> {
        let mut receiver = self.receiver.clone();
        let outcome = receiver
            .wait_for(Option::is_some)
            .await
            .map(|result| (*result).clone())
            .ok()
            .flatten();
        outcome.unwrap_or_else(|| Err(self.lost()))
    }

    fn is_complete(&self) -> bool {
        self.status().is_ended()
    }

    fn status(&self) -> JobStatus {
        match &*self.receiver.borrow() {
            Some(result) => status_of(result),
            // Sender gone without a result
            None if self.receiver.has_changed().is_err() => JobStatus::Failed,
            None => JobStatus::Running,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::Notify;

    use super::*;

    #[tokio::test]
    async fn sync_watcher() {
        let ok = SyncWatcher::new(Ok(()));
        assert!(ok.is_complete());
        assert_eq!(ok.status(), JobStatus::Success);
        assert!(ok.wait().await.is_ok());

        let failed = SyncWatcher::new(Err(JobError::InvalidArguments("bad".to_string())));
        assert_eq!(failed.status(), JobStatus::Failed);
        assert!(failed.wait().await.is_err());
        assert!(failed.wait().await.is_err());
        assert_eq!(failed.to_string(), "Runner failed: Invalid arguments: bad");
    }

    #[tokio::test]
    async fn async_watcher_releases_all_waiters() {
        let gate = Arc::new(Notify::new());
        let task_gate = gate.clone();
        let watcher = AsyncWatcher::spawn(JobType::Materialize, "fare:v1".to_string(), async move {
            task_gate.notified().await;
            Ok(())
        });
        assert_eq!(watcher.status(), JobStatus::Running);
        assert!(!watcher.is_complete());

        let waiters = futures::future::join_all((0..16).map(|_| watcher.wait()));
        gate.notify_one();
        let results = waiters.await;
        assert!(results.iter().all(|r| r.is_ok()));
        assert!(watcher.is_complete());
        assert_eq!(watcher.status(), JobStatus::Success);
        assert!(watcher.wait().await.is_ok());
    }

    #[tokio::test]
    async fn async_watcher_reports_failure() {
        let watcher = AsyncWatcher::spawn(JobType::CopyToOnline, "fare:v1".to_string(), async {
            Err(JobError::InvalidArguments("boom".to_string()))
        });
        let err = watcher.wait().await.unwrap_err();
        assert_eq!(err, JobError::InvalidArguments("boom".to_string()));
        assert_eq!(watcher.status(), JobStatus::Failed);
    }

    #[tokio::test]
    async fn async_watcher_lost_task() {
        let watcher = AsyncWatcher::spawn(JobType::Materialize, "fare:v1".to_string(), async {
            if true {
                panic!("task died");
            }
            Ok(())
        });
        let err = watcher.wait().await.unwrap_err();
        assert!(matches!(err, JobError::JobExecutionFailure { .. }));
        assert_eq!(watcher.status(), JobStatus::Failed);
    }
}
