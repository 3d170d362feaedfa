use crate::cancel::Cancel;
use crate::error::{Error, Result, WriteError};
use crate::select::ReadyWait;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::pin::pin;
use std::sync::Arc;
use tokio::sync::Notify;

/// Capacity mode of a [`Channel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    Unbounded,
    /// At most `n` buffered values, `n >= 1`.
    Bounded(usize),
}

impl Capacity {
    fn admits(&self, len: usize) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Bounded(n) => len < *n,
        }
    }
}

struct Mailbox<T> {
    queue: VecDeque<T>,
    completed: bool,
}

struct Shared<T> {
    mailbox: Mutex<Mailbox<T>>,
    capacity: Capacity,
    readable: Notify,
    writable: Notify,
}

impl<T> Shared<T> {
    fn try_read(&self) -> Option<T> {
        let value = self.mailbox.lock().queue.pop_front()?;
        if let Capacity::Bounded(_) = self.capacity {
            self.writable.notify_waiters();
        }
        Some(value)
    }

    fn try_write(&self, value: T) -> std::result::Result<(), WriteError<T>> {
        let mut mailbox = self.mailbox.lock();
        if mailbox.completed {
            return Err(WriteError::new(value, Error::Completed));
        }
        if !self.capacity.admits(mailbox.queue.len()) {
            return Err(WriteError::new(value, Error::Full));
        }
        mailbox.queue.push_back(value);
        drop(mailbox);
        self.readable.notify_waiters();
        Ok(())
    }

    /// `Some(true)` if a value is buffered, `Some(false)`
    /// if completed and drained, `None` if must wait.
    fn readiness(&self) -> Option<bool> {
        let mailbox = self.mailbox.lock();
        if !mailbox.queue.is_empty() {
            Some(true)
        } else if mailbox.completed {
            Some(false)
        } else {
            None
        }
    }

    async fn wait_to_read(&self, cancel: &Cancel) -> Result<bool> {
        loop {
            let mut notified = pin!(self.readable.notified());
            notified.as_mut().enable();
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if let Some(ready) = self.readiness() {
                return Ok(ready);
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = notified.as_mut() => {}
            }
        }
    }

    async fn write(&self, value: T, cancel: &Cancel) -> std::result::Result<(), WriteError<T>> {
        let mut value = value;
        loop {
            let mut notified = pin!(self.writable.notified());
            notified.as_mut().enable();
            if cancel.is_cancelled() {
                return Err(WriteError::new(value, Error::Cancelled));
            }
            match self.try_write(value) {
                Ok(()) => return Ok(()),
                Err(err) if matches!(err.reason(), Error::Full) => value = err.into_inner(),
                Err(err) => return Err(err),
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(WriteError::new(value, Error::Cancelled));
                }
                _ = notified.as_mut() => {}
            }
        }
    }

    fn close(&self) -> bool {
        let mut mailbox = self.mailbox.lock();
        if mailbox.completed {
            return false;
        }
        mailbox.completed = true;
        drop(mailbox);
        self.readable.notify_waiters();
        self.writable.notify_waiters();
        true
    }
}

/// Read side of a [`Channel`].
///
/// Readers are what select cases and tickers
/// hand around: they can observe and consume
/// values, but never write nor close. Cloning
/// a reader yields another handle to the same
/// channel, and every value is delivered to
/// exactly one of the racing readers.
pub struct Reader<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Reader<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Reader<T> {
    /// Consume the head value without waiting.
    ///
    /// Returns `None` if nothing is buffered,
    /// whether or not the channel is completed.
    pub fn try_read(&self) -> Option<T> {
        self.shared.try_read()
    }

    /// Wait until the channel can be read.
    ///
    /// Resolves to `true` once a value is buffered,
    /// so that a following [`Reader::try_read`] is
    /// likely (but under racing readers not
    /// guaranteed) to succeed, and to `false` once
    /// the channel is completed and drained. Nothing
    /// is consumed either way, nor when the wait is
    /// unwound by `cancel` with [`Error::Cancelled`].
    pub async fn wait_to_read(&self, cancel: &Cancel) -> Result<bool> {
        self.shared.wait_to_read(cancel).await
    }

    /// Wait for and consume the head value.
    ///
    /// Fails with [`Error::Completed`] once the channel
    /// is completed and drained.
    pub async fn read(&self, cancel: &Cancel) -> Result<T> {
        loop {
            if let Some(value) = self.try_read() {
                return Ok(value);
            }
            if !self.wait_to_read(cancel).await? {
                return Err(Error::Completed);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.shared.mailbox.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_completed(&self) -> bool {
        self.shared.mailbox.lock().completed
    }

    /// Whether the channel is completed and no
    /// buffered value is left to read.
    pub fn is_drained(&self) -> bool {
        self.shared.readiness() == Some(false)
    }

    pub fn capacity(&self) -> Capacity {
        self.shared.capacity
    }
}

impl<T> ReadyWait for Reader<T>
where
    T: Send,
{
    fn ready(&self) -> bool {
        self.shared.readiness() == Some(true)
    }

    fn wait<'a>(&'a self, cancel: &'a Cancel) -> BoxFuture<'a, Result<bool>> {
        Box::pin(self.wait_to_read(cancel))
    }
}

/// Typed FIFO channel.
///
/// The channel is a mailbox guarded by a mutex,
/// with explicit capacity and completion. Any
/// number of writers and readers may share it
/// by cloning the handle. Once [`Channel::close`]
/// is called no more writes are accepted, yet
/// buffered values remain readable until drained.
pub struct Channel<T> {
    reader: Reader<T>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            reader: self.reader.clone(),
        }
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<T> std::fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mailbox = self.reader.shared.mailbox.lock();
        f.debug_struct("Channel")
            .field("capacity", &self.reader.shared.capacity)
            .field("len", &mailbox.queue.len())
            .field("completed", &mailbox.completed)
            .finish()
    }
}

impl<T> Channel<T> {
    /// Create a channel.
    ///
    /// # Panics
    ///
    /// Panics on [`Capacity::Bounded`] with zero capacity.
    pub fn new(capacity: Capacity) -> Self {
        assert!(
            capacity != Capacity::Bounded(0),
            "bounded channel capacity must be positive"
        );
        let shared = Shared {
            mailbox: Mutex::new(Mailbox {
                queue: VecDeque::new(),
                completed: false,
            }),
            capacity,
            readable: Notify::new(),
            writable: Notify::new(),
        };
        Self {
            reader: Reader {
                shared: Arc::new(shared),
            },
        }
    }

    pub fn unbounded() -> Self {
        Self::new(Capacity::Unbounded)
    }

    pub fn bounded(capacity: usize) -> Self {
        Self::new(Capacity::Bounded(capacity))
    }

    /// The read side of this channel.
    pub fn reader(&self) -> &Reader<T> {
        &self.reader
    }

    /// Write without waiting.
    ///
    /// Fails with [`Error::Full`] on a bounded channel
    /// at capacity, or [`Error::Completed`] after close,
    /// handing the value back in both cases.
    pub fn try_write(&self, value: T) -> std::result::Result<(), WriteError<T>> {
        self.reader.shared.try_write(value)
    }

    /// Write, waiting for room on a bounded channel.
    pub async fn write(&self, value: T, cancel: &Cancel) -> std::result::Result<(), WriteError<T>> {
        self.reader.shared.write(value, cancel).await
    }

    /// Mark the channel completed.
    ///
    /// Idempotent, returns whether this call was the
    /// one completing it. Buffered values are kept.
    pub fn close(&self) -> bool {
        self.reader.shared.close()
    }

    pub fn try_read(&self) -> Option<T> {
        self.reader.try_read()
    }

    pub async fn wait_to_read(&self, cancel: &Cancel) -> Result<bool> {
        self.reader.wait_to_read(cancel).await
    }

    pub async fn read(&self, cancel: &Cancel) -> Result<T> {
        self.reader.read(cancel).await
    }

    pub fn len(&self) -> usize {
        self.reader.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reader.is_empty()
    }

    pub fn is_completed(&self) -> bool {
        self.reader.is_completed()
    }

    pub fn is_drained(&self) -> bool {
        self.reader.is_drained()
    }

    pub fn capacity(&self) -> Capacity {
        self.reader.capacity()
    }
}

#[cfg(test)]
mod test {
    use crate::cancel::Cancel;
    use crate::chan::{Capacity, Channel};
    use crate::error::Error;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_fifo_and_close() {
        let ch = Channel::unbounded();
        ch.try_write(1).unwrap();
        ch.try_write(2).unwrap();
        assert!(ch.close());
        assert!(!ch.close());

        let err = ch.try_write(3).unwrap_err();
        assert!(matches!(err.reason(), Error::Completed));
        assert_eq!(err.into_inner(), 3);

        assert!(ch.is_completed());
        assert!(!ch.is_drained());
        assert_eq!(ch.try_read(), Some(1));
        assert_eq!(ch.try_read(), Some(2));
        assert_eq!(ch.try_read(), None);
        assert!(ch.is_drained());
    }

    #[test]
    fn test_bounded_full() {
        let ch = Channel::bounded(1);
        assert_eq!(ch.capacity(), Capacity::Bounded(1));
        ch.try_write("a").unwrap();
        let err = ch.try_write("b").unwrap_err();
        assert!(matches!(err.reason(), Error::Full));
        assert_eq!(ch.try_read(), Some("a"));
        ch.try_write("b").unwrap();
    }

    #[test]
    #[should_panic]
    fn test_zero_capacity() {
        let _ = Channel::<()>::bounded(0);
    }

    #[tokio::test]
    async fn test_wait_to_read() {
        let ch = Channel::unbounded();
        let cancel = Cancel::new();
        let writer = ch.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            writer.try_write(5usize).unwrap();
        });
        assert!(ch.wait_to_read(&cancel).await.unwrap());
        // Waiting does not consume.
        assert_eq!(ch.len(), 1);
        assert_eq!(ch.read(&cancel).await.unwrap(), 5);

        ch.close();
        assert!(!ch.wait_to_read(&cancel).await.unwrap());
        assert!(matches!(ch.read(&cancel).await, Err(Error::Completed)));
    }

    #[tokio::test]
    async fn test_wait_cancelled() {
        let ch = Channel::<usize>::unbounded();
        let cancel = Cancel::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });
        let result = ch.wait_to_read(&cancel).await;
        assert!(matches!(result, Err(Error::Cancelled)));

        // The channel is still usable afterwards.
        ch.try_write(1).unwrap();
        assert_eq!(ch.read(&Cancel::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_bounded_write_waits_for_room() {
        let ch = Channel::bounded(1);
        let cancel = Cancel::new();
        ch.try_write(1usize).unwrap();

        let writer = ch.clone();
        let writer_cancel = cancel.clone();
        let pending = tokio::spawn(async move { writer.write(2, &writer_cancel).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!pending.is_finished());

        assert_eq!(ch.try_read(), Some(1));
        pending.await.unwrap().unwrap();
        assert_eq!(ch.try_read(), Some(2));
    }

    #[tokio::test]
    async fn test_write_cancel_returns_value() {
        let ch = Channel::bounded(1);
        ch.try_write(1usize).unwrap();
        let cancel = Cancel::new();
        cancel.cancel();
        let err = ch.write(2, &cancel).await.unwrap_err();
        assert!(matches!(err.reason(), Error::Cancelled));
        assert_eq!(err.into_inner(), 2);
        assert_eq!(ch.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_exactly_once_delivery() {
        const VALUES: usize = 1000;
        const READERS: usize = 4;
        let ch = Channel::unbounded();
        let total = Arc::new(AtomicUsize::new(0));
        let count = Arc::new(AtomicUsize::new(0));

        let mut readers = Vec::new();
        for _ in 0..READERS {
            let reader = ch.reader().clone();
            let total = total.clone();
            let count = count.clone();
            readers.push(tokio::spawn(async move {
                let cancel = Cancel::new();
                while let Ok(v) = reader.read(&cancel).await {
                    total.fetch_add(v, Ordering::SeqCst);
                    count.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        for v in 1..=VALUES {
            ch.try_write(v).unwrap();
            if v % 100 == 0 {
                tokio::task::yield_now().await;
            }
        }
        ch.close();
        for reader in readers {
            reader.await.unwrap();
        }
        assert_eq!(count.load(Ordering::SeqCst), VALUES);
        assert_eq!(total.load(Ordering::SeqCst), VALUES * (VALUES + 1) / 2);
    }
}
