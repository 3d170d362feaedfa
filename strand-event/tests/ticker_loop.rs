//! Wall-clock ticker scenarios.
//!
//! These run on real time on purpose, to check the
//! ticker against an actual scheduler instead of the
//! paused test clock.

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use strand_event::{Cancel, Channel, Select, Selected, Ticker};
use tokio::time::Instant;

// The default timer resolution on some platforms is 15.6 ms.
const ACCEPTABLE_ERROR: Duration = Duration::from_micros(15_600);

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_double_ticker() {
    let start = Instant::now();
    let ticker = Ticker::new(Duration::from_secs(1));
    let cancel = Cancel::new();

    let sent_at1 = ticker.chan().read(&cancel).await.unwrap();
    let duration1 = start.elapsed();
    let off_by1 = sent_at1.elapsed();

    let sent_at2 = ticker.chan().read(&cancel).await.unwrap();
    let duration2 = start.elapsed();
    let off_by2 = sent_at2.elapsed();

    ticker.stop();

    assert!(duration1 >= Duration::from_secs(1) - ACCEPTABLE_ERROR, "duration1 {duration1:?}");
    assert!(duration1 < Duration::from_millis(1500), "duration1 {duration1:?}");
    assert!(off_by1 < Duration::from_millis(500), "off_by1 {off_by1:?}");

    assert!(duration2 >= Duration::from_secs(2) - ACCEPTABLE_ERROR, "duration2 {duration2:?}");
    assert!(duration2 < Duration::from_millis(2500), "duration2 {duration2:?}");
    assert!(off_by2 < Duration::from_millis(500), "off_by2 {off_by2:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stopped_ticker_never_fires() {
    let ticker = Ticker::new(Duration::from_millis(100));
    let cancel = Cancel::new();
    ticker.chan().read(&cancel).await.unwrap();
    ticker.stop();

    let replacement = Ticker::new(Duration::from_millis(300));
    let started = Instant::now();
    let mut select = Select::new()
        .recv_sync(ticker.chan(), |_| panic!("stopped ticker delivered a tick"))
        .recv_any(replacement.chan());
    assert_eq!(select.evaluate(&cancel).await.unwrap(), Selected::Case(1));
    assert!(started.elapsed() >= Duration::from_millis(300) - ACCEPTABLE_ERROR);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ticker_loop_with_exit_chan() {
    const PERIOD: Duration = Duration::from_millis(100);
    let start = Instant::now();
    let ticker = Ticker::new(PERIOD);
    let exit_chan = Channel::<()>::unbounded();
    let recheck_chan = Channel::<()>::unbounded();

    let times = Arc::new(Mutex::new(Vec::new()));
    let running = Arc::new(AtomicBool::new(true));
    let (tick_times, recheck_times, stop) = (times.clone(), times.clone(), running.clone());
    let mut select = Select::new()
        .recv_sync(ticker.chan(), move |_| tick_times.lock().push(start.elapsed()))
        .recv_sync(&recheck_chan, move |_| recheck_times.lock().push(start.elapsed()))
        .recv_sync(&exit_chan, move |()| stop.store(false, Ordering::SeqCst));

    let cancel = Cancel::new();
    while running.load(Ordering::SeqCst) {
        select.evaluate(&cancel).await.unwrap();
        if times.lock().len() >= 10 {
            let _ = exit_chan.try_write(());
        }
    }
    ticker.stop();

    let duration = start.elapsed();
    assert_eq!(times.lock().len(), 10);
    assert!(duration >= PERIOD * 10 - ACCEPTABLE_ERROR, "duration {duration:?}");
    assert!(duration < PERIOD * 11, "duration {duration:?}");
}

