//! Host task runner abstraction

use std::sync::{Mutex, PoisonError};

use futures::future::BoxFuture;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::warn;

/// Work handed to the host, nothing is returned to the caller
pub type Task = BoxFuture<'static, ()>;

/// Executes work off the calling thread at the host's discretion
pub trait TaskRunner: Send + Sync {
    fn spawn(&self, task: Task);
}

/// Runs tasks on a tokio runtime and keeps track of them so the host can
/// wait for in-flight work before shutting down.
pub struct TokioRunner {
    handle: Handle,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl TokioRunner {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Wait until every spawned task, including tasks spawned while
    /// waiting, has finished.
    pub async fn wait_idle(&self) {
        loop {
            let pending: Vec<_> = self
                .tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .drain(..)
                .collect();

            if pending.is_empty() {
                return;
            }

            for task in pending {
                if let Err(e) = task.await {
                    warn!("Background task failed: {}", e);
                }
            }
        }
    }
}

impl TaskRunner for TokioRunner {
    fn spawn(&self, task: Task) {
        let handle = self.handle.spawn(task);
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|t| !t.is_finished());
        tasks.push(handle);
    }
}
