use crate::cancel::Cancel;
use crate::chan::{Channel, Reader};
use crate::error::{Error, Result};
use crate::handler::{Fired, Handler};
use futures::future::{BoxFuture, select_all};
use std::time::Duration;

/// Readiness event source trait.
///
/// The caller can check if the event source is
/// ready by polling the `ready` method, and wait
/// for readiness by the `wait` method. Neither of
/// them consumes anything from the source.
pub trait ReadyWait: Send + Sync {
    fn ready(&self) -> bool;

    /// Resolves to `true` once ready, or `false` once
    /// the source is exhausted and will never be ready.
    fn wait<'a>(&'a self, cancel: &'a Cancel) -> BoxFuture<'a, Result<bool>>;
}

impl<T> AsRef<Reader<T>> for Reader<T> {
    fn as_ref(&self) -> &Reader<T> {
        self
    }
}

impl<T> AsRef<Reader<T>> for Channel<T> {
    fn as_ref(&self) -> &Reader<T> {
        self.reader()
    }
}

/// Type-erased select case.
trait Arm: Send {
    /// Consume one value and start its handler,
    /// `None` if nothing is buffered.
    fn try_fire(&mut self, cancel: &Cancel) -> Option<Fired>;

    fn source(&self) -> &dyn ReadyWait;
}

struct Case<'a, T> {
    reader: &'a Reader<T>,
    handler: Option<Handler<T>>,
}

impl<'a, T> Arm for Case<'a, T>
where
    T: Send + 'static,
{
    fn try_fire(&mut self, cancel: &Cancel) -> Option<Fired> {
        let value = self.reader.try_read()?;
        Some(match self.handler.as_mut() {
            Some(handler) => handler.fire(value, cancel),
            None => Fired::Done(Ok(())),
        })
    }

    fn source(&self) -> &dyn ReadyWait {
        self.reader
    }
}

struct Fallback {
    after: Duration,
    action: Option<Box<dyn FnMut() + Send>>,
}

/// Result of one select evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selected {
    /// The case registered at this index consumed
    /// a value and ran its handler.
    Case(usize),

    /// No case was ready, the default action ran.
    Default,

    /// Nothing was consumed and nothing ran.
    ///
    /// Either no case was ready on a non-blocking
    /// pass without default, or the case that woke
    /// the wait lost its value to a competing reader
    /// before the rescan.
    Idle,
}

/// Multi-way select statement.
///
/// A select statement is built once from an ordered
/// list of channel read cases plus an optional
/// default, and then evaluated any number of times.
/// Each evaluation runs exactly one case handler, or
/// the default, or nothing when it is cancelled.
///
/// When several cases are ready at once, the one
/// registered first wins. The tie-break is
/// deterministic on purpose so that event loops
/// replay identically under test; callers who need
/// fairness should rotate their registration order.
///
/// Cases borrow the read side of their channels, the
/// channels stay owned by whoever created them.
pub struct Select<'a> {
    arms: Vec<Box<dyn Arm + 'a>>,
    fallback: Option<Fallback>,
}

impl<'a> Select<'a> {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            arms: Vec::new(),
            fallback: None,
        }
    }

    /// Register a receive case with a handler.
    pub fn recv<S, T>(mut self, source: &'a S, handler: Handler<T>) -> Self
    where
        S: AsRef<Reader<T>>,
        T: Send + 'static,
    {
        self.arms.push(Box::new(Case {
            reader: source.as_ref(),
            handler: Some(handler),
        }));
        self
    }

    /// Register a receive case run inline.
    pub fn recv_sync<S, T, F>(self, source: &'a S, f: F) -> Self
    where
        S: AsRef<Reader<T>>,
        T: Send + 'static,
        F: FnMut(T) + Send + 'static,
    {
        self.recv(source, Handler::new_sync(f))
    }

    /// Register a receive case whose handler is
    /// awaited before the evaluation returns.
    pub fn recv_async<S, T, F, Fut>(self, source: &'a S, f: F) -> Self
    where
        S: AsRef<Reader<T>>,
        T: Send + 'static,
        F: FnMut(T, Cancel) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.recv(source, Handler::new_async(f))
    }

    /// Register a receive case without handler.
    ///
    /// The case still counts as ready and drains
    /// its value, for when only the occurrence of a
    /// value matters.
    pub fn recv_any<S, T>(mut self, source: &'a S) -> Self
    where
        S: AsRef<Reader<T>>,
        T: Send + 'static,
    {
        self.arms.push(Box::new(Case {
            reader: source.as_ref(),
            handler: None,
        }));
        self
    }

    /// Run `action` immediately when no case is ready.
    ///
    /// An evaluation with such a default never waits.
    pub fn default<F>(self, action: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.default_after(Duration::ZERO, action)
    }

    /// Run `action` when no case becomes ready
    /// within `after`.
    pub fn default_after<F>(mut self, after: Duration, action: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.fallback = Some(Fallback {
            after,
            action: Some(Box::new(action)),
        });
        self
    }

    /// Fail with [`Error::Timeout`] when no case
    /// becomes ready within `after`.
    pub fn timeout(mut self, after: Duration) -> Self {
        self.fallback = Some(Fallback {
            after,
            action: None,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.arms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arms.is_empty()
    }

    /// Evaluate the statement once.
    ///
    /// Ready cases are scanned in registration order
    /// and the first one runs. Otherwise a zero-timeout
    /// default runs at once, or the evaluation waits
    /// for any case to become ready (bounded by the
    /// default timeout, if any) and scans once more.
    ///
    /// Cancellation before anything is ready returns
    /// [`Error::Cancelled`] without consuming anything,
    /// and the statement may be evaluated again. A
    /// failing handler surfaces as [`Error::Handler`],
    /// its value stays consumed. When every case's
    /// channel is completed and drained, the wait
    /// fails with [`Error::Completed`].
    pub async fn evaluate(&mut self, cancel: &Cancel) -> Result<Selected> {
        if let Some(index) = self.scan(cancel).await? {
            return Ok(Selected::Case(index));
        }
        let deadline = self.fallback.as_ref().map(|fallback| fallback.after);
        if deadline.is_some_and(|after| after.is_zero()) {
            return self.fall_back();
        }
        let sources: Vec<&dyn ReadyWait> = self.arms.iter().map(|arm| arm.source()).collect();
        if !wait_ready(sources, cancel, deadline).await? {
            return self.fall_back();
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match self.scan(cancel).await? {
            Some(index) => Ok(Selected::Case(index)),
            None => {
                tracing::trace!("select woke up but lost the race");
                Ok(Selected::Idle)
            }
        }
    }

    /// Evaluate without waiting for readiness.
    ///
    /// Runs the first ready case, or else the default
    /// action regardless of its timeout, or else
    /// returns [`Selected::Idle`].
    pub async fn try_evaluate(&mut self, cancel: &Cancel) -> Result<Selected> {
        if let Some(index) = self.scan(cancel).await? {
            return Ok(Selected::Case(index));
        }
        match self.fallback.as_mut().and_then(|f| f.action.as_mut()) {
            Some(action) => {
                action();
                Ok(Selected::Default)
            }
            None => Ok(Selected::Idle),
        }
    }

    async fn scan(&mut self, cancel: &Cancel) -> Result<Option<usize>> {
        for (index, arm) in self.arms.iter_mut().enumerate() {
            let Some(fired) = arm.try_fire(cancel) else {
                continue;
            };
            fired.complete().await.map_err(Error::Handler)?;
            return Ok(Some(index));
        }
        Ok(None)
    }

    fn fall_back(&mut self) -> Result<Selected> {
        // Only reachable with a fallback configured.
        let Some(fallback) = self.fallback.as_mut() else {
            return Ok(Selected::Idle);
        };
        match fallback.action.as_mut() {
            Some(action) => {
                action();
                Ok(Selected::Default)
            }
            None => Err(Error::Timeout(fallback.after)),
        }
    }
}

/// Wait until any source is ready (`true`) or the
/// deadline expires (`false`).
async fn wait_ready(
    sources: Vec<&dyn ReadyWait>,
    cancel: &Cancel,
    deadline: Option<Duration>,
) -> Result<bool> {
    // XXX: the waits run under a linked child, so
    // the pending ones are unwound as soon as we
    // are done, without touching caller's signal.
    let linked = cancel.child();
    tracing::trace!(cases = sources.len(), ?deadline, "select waiting");
    let expired = async {
        match deadline {
            Some(after) => tokio::time::sleep(after).await,
            None => futures::future::pending().await,
        }
    };
    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        _ = expired => Ok(false),
        ready = any_ready(&sources, &linked) => ready.map(|()| true),
    };
    linked.cancel();
    outcome
}

async fn any_ready(sources: &[&dyn ReadyWait], cancel: &Cancel) -> Result<()> {
    if sources.is_empty() {
        return futures::future::pending().await;
    }
    let mut waits: Vec<_> = sources.iter().map(|source| source.wait(cancel)).collect();
    while !waits.is_empty() {
        let (ready, _, rest) = select_all(waits).await;
        if ready? {
            return Ok(());
        }
        // Completed and drained, never ready again.
        waits = rest;
    }
    Err(Error::Completed)
}
