//! Counting rendezvous barrier.
//!
//! A [`WaitGroup`] waits for a collection of workers
//! to finish. The coordinator calls `add` with the
//! number of workers to wait for, each worker calls
//! `done` when finished, and `wait` suspends until
//! the counter drops back to zero.
//!
//! Note that the `add` calls taking the counter from
//! zero to positive must happen before the `wait`
//! they are meant to hold up. Decrements, or `add`
//! calls on an already positive counter, may happen
//! at any time. Typically this means calling `add`
//! before spawning the workers.
//!
//! The counter runs in epochs: once it drops to zero
//! all waiters of the epoch are released together,
//! and a later `add` starts a new epoch which later
//! waiters wait on instead.

use crate::cancel::{Cancel, Latch};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;

struct State {
    count: usize,
    epoch: Arc<Latch>,
}

/// Counting rendezvous barrier.
///
/// Cloning the wait group yields another handle
/// to the same counter, which is how workers get
/// hold of it.
#[derive(Clone)]
pub struct WaitGroup {
    state: Arc<Mutex<State>>,
}

impl Default for WaitGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WaitGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitGroup")
            .field("count", &self.count())
            .finish()
    }
}

impl WaitGroup {
    pub fn new() -> Self {
        let state = State {
            count: 0,
            epoch: Arc::new(Latch::new_set()),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Add `delta`, which may be negative, to the counter.
    ///
    /// When the counter drops to zero every waiter is
    /// released. A delta that would take the counter
    /// below zero fails with [`Error::NegativeCounter`]
    /// and leaves the counter as it was.
    pub fn add(&self, delta: isize) -> Result<()> {
        let mut state = self.state.lock();
        let count = state
            .count
            .checked_add_signed(delta)
            .ok_or(Error::NegativeCounter {
                count: state.count,
                delta,
            })?;
        if state.count == 0 && count > 0 {
            state.epoch = Arc::new(Latch::new());
        }
        if state.count > 0 && count == 0 {
            state.epoch.set();
        }
        state.count = count;
        Ok(())
    }

    /// Decrement the counter by one.
    pub fn done(&self) -> Result<()> {
        self.add(-1)
    }

    pub fn count(&self) -> usize {
        self.state.lock().count
    }

    /// Wait until the counter drops to zero.
    ///
    /// The wait is bound to the epoch current at the
    /// time of the call. It returns at once if the
    /// counter is zero, and is unwound by `cancel`
    /// with [`Error::Cancelled`].
    pub async fn wait(&self, cancel: &Cancel) -> Result<()> {
        let epoch = self.state.lock().epoch.clone();
        if epoch.is_set() {
            return Ok(());
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            _ = epoch.wait() => Ok(()),
        }
    }

    /// Block the current thread until the counter
    /// drops to zero.
    ///
    /// Must not be called from within an async task,
    /// use [`WaitGroup::wait`] there.
    pub fn wait_blocking(&self) {
        let epoch = self.state.lock().epoch.clone();
        futures::executor::block_on(epoch.wait());
    }
}

#[cfg(test)]
mod test {
    use crate::cancel::Cancel;
    use crate::error::Error;
    use crate::wait_group::WaitGroup;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_zero_does_not_wait() {
        let wg = WaitGroup::new();
        wg.wait(&Cancel::new()).await.unwrap();
        wg.add(0).unwrap();
        wg.wait(&Cancel::new()).await.unwrap();
    }

    #[test]
    fn test_negative_fails_fast() {
        let wg = WaitGroup::new();
        let err = wg.done().unwrap_err();
        assert!(matches!(err, Error::NegativeCounter { count: 0, delta: -1 }));
        assert_eq!(wg.count(), 0);

        wg.add(2).unwrap();
        assert!(wg.add(-3).is_err());
        assert_eq!(wg.count(), 2);
        wg.add(-2).unwrap();
        assert_eq!(wg.count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_four_workers() {
        let wg = WaitGroup::new();
        let finished = Arc::new(AtomicUsize::new(0));
        wg.add(4).unwrap();
        for i in 0..4u64 {
            let wg = wg.clone();
            let finished = finished.clone();
            tokio::spawn(async move {
                let delay = (i * 7919) % 23 + 1;
                tokio::time::sleep(Duration::from_millis(delay)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                wg.done().unwrap();
            });
        }
        wg.wait(&Cancel::new()).await.unwrap();
        assert_eq!(finished.load(Ordering::SeqCst), 4);
        assert_eq!(wg.count(), 0);
    }

    #[tokio::test]
    async fn test_waiters_released_together() {
        let wg = WaitGroup::new();
        wg.add(1).unwrap();
        let mut waiters = Vec::new();
        for _ in 0..3 {
            let wg = wg.clone();
            waiters.push(tokio::spawn(async move { wg.wait(&Cancel::new()).await }));
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(waiters.iter().all(|w| !w.is_finished()));
        wg.done().unwrap();
        for waiter in waiters {
            waiter.await.unwrap().unwrap();
        }
    }

    #[tokio::test]
    async fn test_new_epoch_after_rearm() {
        let wg = WaitGroup::new();
        wg.add(1).unwrap();
        wg.done().unwrap();
        wg.wait(&Cancel::new()).await.unwrap();

        // Waiters after re-arming must not be satisfied
        // by the epoch that already completed.
        wg.add(1).unwrap();
        let waiter = {
            let wg = wg.clone();
            tokio::spawn(async move { wg.wait(&Cancel::new()).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());
        wg.done().unwrap();
        waiter.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_wait_cancelled() {
        let wg = WaitGroup::new();
        wg.add(1).unwrap();
        let cancel = Cancel::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            trigger.cancel();
        });
        assert!(matches!(wg.wait(&cancel).await, Err(Error::Cancelled)));
        // Cancelling the wait does not touch the counter.
        assert_eq!(wg.count(), 1);
    }

    #[test]
    fn test_wait_blocking() {
        let wg = WaitGroup::new();
        wg.add(3).unwrap();
        let workers: Vec<_> = (0..3)
            .map(|_| {
                let wg = wg.clone();
                std::thread::spawn(move || {
                    std::thread::sleep(Duration::from_millis(5));
                    wg.done().unwrap();
                })
            })
            .collect();
        wg.wait_blocking();
        assert_eq!(wg.count(), 0);
        for worker in workers {
            worker.join().unwrap();
        }
    }
}
