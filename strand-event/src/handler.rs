use crate::cancel::Cancel;
use futures::future::BoxFuture;

/// Outcome of a select case handler.
pub type HandlerResult = anyhow::Result<()>;

/// AsyncHandlerTrait that is dyn-compatible.
///
/// A closure returning a future has an unnameable
/// future type, but the select engine must store
/// handlers of different cases side by side, so we
/// pay the price of boxing the futures.
pub trait AsyncHandlerTrait<E>: Send {
    fn call_mut_boxed(&mut self, e: E, cancel: Cancel) -> BoxFuture<'static, HandlerResult>;
}

impl<E, F, Fut> AsyncHandlerTrait<E> for F
where
    F: FnMut(E, Cancel) -> Fut + Send,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call_mut_boxed(&mut self, e: E, cancel: Cancel) -> BoxFuture<'static, HandlerResult> {
        Box::pin((*self)(e, cancel))
    }
}

/// Handler for dynamically dispatching values
/// received by a select case.
///
/// A handler is either synchronous, run inline by
/// the select engine, or asynchronous, awaited to
/// completion before the evaluation returns.
pub enum Handler<E> {
    Sync(Box<dyn FnMut(E) -> HandlerResult + Send>),
    Async(Box<dyn AsyncHandlerTrait<E>>),
}

/// Handler invocation in flight.
pub(crate) enum Fired {
    Done(HandlerResult),
    Pending(BoxFuture<'static, HandlerResult>),
}

impl Fired {
    pub(crate) async fn complete(self) -> HandlerResult {
        match self {
            Fired::Done(result) => result,
            Fired::Pending(future) => future.await,
        }
    }
}

impl<E> Handler<E>
where
    E: Send + 'static,
{
    pub fn new_sync<F>(mut f: F) -> Handler<E>
    where
        F: FnMut(E) + Send + 'static,
    {
        Handler::new_sync_result(move |e| {
            f(e);
            Ok(())
        })
    }

    pub fn new_sync_result<F>(f: F) -> Handler<E>
    where
        F: FnMut(E) -> HandlerResult + Send + 'static,
    {
        Handler::Sync(Box::new(f))
    }

    pub fn new_async<F, Fut>(mut f: F) -> Handler<E>
    where
        F: FnMut(E, Cancel) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Handler::new_async_result(move |e, cancel| {
            let future = f(e, cancel);
            async move {
                future.await;
                Ok(())
            }
        })
    }

    pub fn new_async_result<F, Fut>(f: F) -> Handler<E>
    where
        F: FnMut(E, Cancel) -> Fut + Send + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Handler::Async(Box::new(f))
    }

    pub(crate) fn fire(&mut self, e: E, cancel: &Cancel) -> Fired {
        match self {
            Handler::Sync(f) => Fired::Done(f(e)),
            Handler::Async(f) => Fired::Pending(f.call_mut_boxed(e, cancel.clone())),
        }
    }
}
