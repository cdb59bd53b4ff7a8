//! Bounded in-process job pool for report requests.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::notify::{self, SlackNotifier};
use crate::report::{ReportError, ReportOutcome, ReportRequest, ReportService};

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("job pool shut down before the job started")]
    Closed,

    #[error("job task failed: {0}")]
    Join(#[from] JoinError),
}

/// Produces a report for one request.
pub trait ReportRunner: Send + Sync + 'static {
    fn run(
        &self,
        request: &ReportRequest,
    ) -> impl Future<Output = Result<ReportOutcome, ReportError>> + Send;
}

impl ReportRunner for ReportService {
    async fn run(&self, request: &ReportRequest) -> Result<ReportOutcome, ReportError> {
        ReportService::run(self, request).await
    }
}

#[derive(Debug, Clone)]
pub struct JobInfo {
    pub id: Uuid,
    pub request: ReportRequest,
}

/// Told how every job ended.
pub trait JobObserver: Send + Sync + 'static {
    fn on_success(
        &self,
        job: &JobInfo,
        outcome: &ReportOutcome,
    ) -> impl Future<Output = ()> + Send;

    fn on_failure(&self, job: &JobInfo, error: &ReportError) -> impl Future<Output = ()> + Send;
}

/// Logs job results and posts a failure notice to the job's channel.
#[derive(Clone, Default)]
pub struct ChatObserver {
    notifier: Option<SlackNotifier>,
}

impl ChatObserver {
    pub fn new(notifier: Option<SlackNotifier>) -> Self {
        Self { notifier }
    }
}

impl JobObserver for ChatObserver {
    async fn on_success(&self, job: &JobInfo, outcome: &ReportOutcome) {
        info!(
            job = %job.id,
            research = outcome.research,
            patents = outcome.patents,
            news = outcome.news,
            datasets = outcome.datasets.len(),
            "report finished"
        );
    }

    async fn on_failure(&self, job: &JobInfo, error: &ReportError) {
        error!(job = %job.id, query = %job.request.query, error = %error, "report failed");
        let (Some(notifier), Some(channel)) = (&self.notifier, &job.request.channel) else {
            return;
        };
        let payload = notify::failure_payload(channel, &job.request.query, &error.to_string());
        if let Err(e) = notifier.post(&payload).await {
            warn!(job = %job.id, error = %e, "could not post failure notice");
        }
    }
}

/// Handle to a submitted job.
pub struct JobHandle {
    pub id: Uuid,
    handle: JoinHandle<Result<ReportOutcome, JobError>>,
}

impl JobHandle {
    pub async fn wait(self) -> Result<ReportOutcome, JobError> {
        self.handle.await?
    }
}

/// Runs each job on its own task, at most `max_concurrent` at a time.
pub struct Dispatcher<R, O> {
    runner: Arc<R>,
    observer: Arc<O>,
    permits: Arc<Semaphore>,
}

impl<R: ReportRunner, O: JobObserver> Dispatcher<R, O> {
    pub fn new(runner: R, observer: O, max_concurrent: usize) -> Self {
        Self {
            runner: Arc::new(runner),
            observer: Arc::new(observer),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn submit(&self, request: ReportRequest) -> JobHandle {
        let job = JobInfo {
            id: Uuid::new_v4(),
            request,
        };
        let id = job.id;
        let runner = Arc::clone(&self.runner);
        let observer = Arc::clone(&self.observer);
        let permits = Arc::clone(&self.permits);
        info!(job = %id, query = %job.request.query, "job queued");

        let handle = tokio::spawn(async move {
            let _permit = permits.acquire_owned().await.map_err(|_| JobError::Closed)?;
            info!(job = %job.id, "job started");

            // The report runs on its own task so a panic still reaches the observer.
            let request = job.request.clone();
            let task = tokio::spawn(async move { runner.run(&request).await });
            let result = match task.await {
                Ok(result) => result,
                Err(e) if e.is_panic() => Err(ReportError::Panicked(panic_message(e.into_panic()))),
                Err(e) => return Err(JobError::Join(e)),
            };
            match &result {
                Ok(outcome) => observer.on_success(&job, outcome).await,
                Err(e) => observer.on_failure(&job, e).await,
            }
            result.map_err(JobError::from)
        });

        JobHandle { id, handle }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast_ref::<&str>() {
            Some(message) => (*message).to_string(),
            None => "unknown panic".to_string(),
        },
    }
}
