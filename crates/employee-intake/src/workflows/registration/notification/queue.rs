use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::NotificationOrchestrator;
use crate::workflows::registration::domain::EmployeeSubmission;

/// Work item for the notification stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationJob {
    pub submission: EmployeeSubmission,
    pub update_flow: bool,
}

/// Fire-and-forget hand-off of notification jobs.
pub trait NotificationDispatch: Send + Sync {
    fn enqueue(&self, job: NotificationJob);
}

/// Queue drained by a single background worker that runs the blocking notification
/// stage off the async executor. Dropping every handle lets the worker finish.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    sender: mpsc::UnboundedSender<NotificationJob>,
}

impl NotificationQueue {
    /// Spawns the worker on the current Tokio runtime.
    pub fn spawn(orchestrator: Arc<NotificationOrchestrator>) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(drain(orchestrator, receiver));
        (Self { sender }, worker)
    }
}

async fn drain(
    orchestrator: Arc<NotificationOrchestrator>,
    mut receiver: mpsc::UnboundedReceiver<NotificationJob>,
) {
    while let Some(job) = receiver.recv().await {
        let orchestrator = Arc::clone(&orchestrator);
        let outcome = tokio::task::spawn_blocking(move || {
            orchestrator.prepare(&job.submission, job.update_flow)
        })
        .await;

        match outcome {
            Ok(Ok(Some(plan))) => debug!(flow = plan.flow.label(), "notification job finished"),
            Ok(Ok(None)) => debug!("notification job skipped"),
            Ok(Err(err)) => error!(error = %err, "notification stage failed"),
            Err(err) => error!(error = %err, "notification task panicked"),
        }
    }
    debug!("notification queue closed");
}

impl NotificationDispatch for NotificationQueue {
    fn enqueue(&self, job: NotificationJob) {
        if let Err(rejected) = self.sender.send(job) {
            warn!(
                document = %rejected.0.submission.document_number,
                "notification worker stopped; job dropped"
            );
        }
    }
}
