use anyhow::{Result, anyhow};
use parking_lot::Mutex;
use std::sync::Arc;
use strand_event::Cancel;
use tokio::task::{AbortHandle, JoinSet};
use tracing::Instrument;

struct Exit {
    name: Arc<str>,
    result: Result<()>,
}

/// Structured task scope.
///
/// Every background unit of work belongs to a scope,
/// which bounds its lifetime: the scope hands each
/// task a child of its cancellation signal, can wait
/// for all of them, and aborts whatever is left when
/// it is dropped. A task that fails cancels the scope
/// signal, so that its siblings unwind too.
///
/// The scope itself is owned by the coordinator, tasks
/// only ever see its cancellation signal.
pub struct Scope {
    name: Arc<str>,
    cancel: Cancel,
    tasks: Mutex<JoinSet<Exit>>,
}

impl Scope {
    /// Create a scope cancelled together with `parent`.
    pub fn new(name: &str, parent: &Cancel) -> Self {
        Self {
            name: Arc::from(name),
            cancel: parent.child(),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The signal handed to every task of the scope.
    pub fn cancel(&self) -> &Cancel {
        &self.cancel
    }

    /// Spawn a named task into the scope.
    ///
    /// The task is started with the scope's signal and
    /// runs within a tracing span carrying its name.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn spawn<F, Fut>(&self, name: &str, f: F) -> AbortHandle
    where
        F: FnOnce(Cancel) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let name: Arc<str> = Arc::from(name);
        let span = tracing::debug_span!("task", scope = %self.name, name = %name);
        let cancel = self.cancel.clone();
        let future = f(cancel.clone());
        let task = async move {
            let result = future.await;
            if result.is_err() {
                cancel.cancel();
            }
            Exit { name, result }
        };
        self.tasks.lock().spawn(task.instrument(span))
    }

    /// Number of tasks not joined yet.
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait for every task of the scope.
    ///
    /// Returns the first failure, after all tasks have
    /// finished. Later failures are logged only.
    pub async fn join(self) -> Result<()> {
        let Scope {
            name,
            cancel: _,
            tasks,
        } = self;
        let mut tasks = tasks.into_inner();
        let mut first_err = None;
        while let Some(joined) = tasks.join_next().await {
            let err = match joined {
                Ok(Exit { name: task, result }) => match result {
                    Ok(()) => {
                        tracing::debug!(scope = %name, task = %task, "task finished");
                        continue;
                    }
                    Err(err) => err.context(format!("task {task} failed")),
                },
                Err(err) if err.is_cancelled() => {
                    tracing::debug!(scope = %name, "task aborted");
                    continue;
                }
                Err(err) => anyhow!("task panicked: {err}"),
            };
            tracing::warn!(scope = %name, "{err:#}");
            if first_err.is_none() {
                first_err = Some(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Cancel every task of the scope, then join them.
    pub async fn shutdown(self) -> Result<()> {
        self.cancel.cancel();
        self.join().await
    }
}
