use crate::chan::{Channel, Reader};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

/// Repeating timer.
///
/// A ticker publishes the current [`Instant`] into
/// its capacity-1 channel once every period,
/// starting one period after construction. A tick
/// that finds the previous one still unconsumed is
/// dropped, and boundaries missed by a stalled
/// scheduler are skipped instead of bunched, so the
/// timer keeps its long-run cadence regardless of
/// how slow its reader is.
///
/// The ticker owns its timer task and its channel.
/// Once stopped it never delivers again and cannot
/// be restarted, create a new one instead. Dropping
/// the ticker stops it.
pub struct Ticker {
    period: Duration,
    chan: Channel<Instant>,
    task: JoinHandle<()>,
}

impl Ticker {
    /// Start a ticker with the given period.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero, or if called
    /// outside of a tokio runtime.
    pub fn new(period: Duration) -> Self {
        assert!(!period.is_zero(), "ticker period must be positive");
        let chan = Channel::bounded(1);
        let first = Instant::now() + period;
        let task = tokio::spawn(Self::run(first, period, chan.clone()));
        tracing::debug!(?period, "ticker started");
        Self { period, chan, task }
    }

    async fn run(first: Instant, period: Duration, chan: Channel<Instant>) {
        let mut interval = interval_at(first, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            let tick = interval.tick().await;
            match chan.try_write(tick) {
                Ok(()) => {}
                Err(err) if err.reason().is_shutdown() => return,
                Err(_) => tracing::trace!(?period, "ticker dropped a tick"),
            }
        }
    }

    /// The channel ticks are delivered on.
    pub fn chan(&self) -> &Reader<Instant> {
        self.chan.reader()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_stopped(&self) -> bool {
        self.chan.is_completed()
    }

    /// Stop the ticker.
    ///
    /// No tick is delivered afterwards, a stale tick
    /// still sitting in the channel is discarded and
    /// the channel completes. Idempotent.
    pub fn stop(&self) {
        // Closing first rejects any tick racing with us,
        // so the drain below leaves the channel empty.
        if self.chan.close() {
            tracing::debug!(period = ?self.period, "ticker stopped");
        }
        while self.chan.try_read().is_some() {}
        self.task.abort();
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod test {
    use crate::cancel::Cancel;
    use crate::error::Error;
    use crate::ticker::Ticker;
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_on_period_boundaries() {
        let start = Instant::now();
        let ticker = Ticker::new(Duration::from_secs(1));
        let cancel = Cancel::new();
        for n in 1..=3u32 {
            let tick = ticker.chan().read(&cancel).await.unwrap();
            assert!(tick - start >= Duration::from_secs(n as u64));
            assert!(start.elapsed() < Duration::from_secs(n as u64) + Duration::from_millis(500));
        }
        ticker.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_reader_drops_ticks() {
        let start = Instant::now();
        let ticker = Ticker::new(Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(550)).await;

        // Only one tick was kept while nobody read.
        assert_eq!(ticker.chan().len(), 1);
        let stale = ticker.chan().try_read().unwrap();
        assert!(stale - start < Duration::from_millis(200));

        // The cadence is unaffected by the dropped ticks.
        let next = ticker.chan().read(&Cancel::new()).await.unwrap();
        assert_eq!(next - start, Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_discards_stale_tick() {
        let ticker = Ticker::new(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(ticker.chan().len(), 1);

        ticker.stop();
        ticker.stop();
        assert!(ticker.is_stopped());
        assert_eq!(ticker.chan().try_read(), None);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let result = ticker.chan().read(&Cancel::new()).await;
        assert!(matches!(result, Err(Error::Completed)));
    }

    #[test]
    #[should_panic]
    fn test_zero_period() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        runtime.block_on(async {
            let _ = Ticker::new(Duration::ZERO);
        });
    }
}
