use anyhow::Result;
use std::time::Duration;
use strand::event::{Cancel, Channel, Select, Selected, Ticker, WaitGroup};
use strand::task::Scope;

// NOTE: set WORKERS to change the number of producers.
fn workers() -> usize {
    std::env::var("WORKERS")
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(4)
}

#[strand::main]
async fn main(cancel: Cancel) -> Result<()> {
    let scope = Scope::new("heartbeat", &cancel);
    let messages = Channel::<String>::bounded(8);
    let wg = WaitGroup::new();

    for id in 0..workers() {
        wg.add(1)?;
        let (messages, wg) = (messages.clone(), wg.clone());
        scope.spawn(&format!("producer-{id}"), move |cancel| async move {
            for seq in 0..3 {
                tokio::time::sleep(Duration::from_millis(150 * (id as u64 + 1))).await;
                if messages.write(format!("producer {id} says {seq}"), &cancel).await.is_err() {
                    break;
                }
            }
            wg.done()?;
            Ok(())
        });
    }

    // Close the mailbox once every producer is done,
    // the select below then sees the case drained.
    let (closer, closing) = (messages.clone(), wg.clone());
    scope.spawn("closer", move |cancel| async move {
        closing.wait(&cancel).await?;
        closer.close();
        Ok(())
    });

    let heartbeat = Ticker::new(Duration::from_millis(250));
    let mut select = Select::new()
        .recv_sync(&messages, |message: String| tracing::info!("{message}"))
        .recv_sync(heartbeat.chan(), |_| tracing::info!("heartbeat"));
    loop {
        match select.evaluate(&cancel).await {
            Ok(Selected::Idle) => tracing::trace!("lost a race for a ready case"),
            Ok(_) => {}
            Err(err) if err.is_shutdown() => break,
            Err(err) => return Err(err.into()),
        }
        if messages.is_drained() {
            break;
        }
    }
    drop(select);
    heartbeat.stop();
    scope.shutdown().await
}
