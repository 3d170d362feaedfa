use crate::error::Result;
use strand_event::{Cancel, Channel};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Forward everything read from `reader` into `chan`.
///
/// Each successful read becomes one message of at most
/// `chunk` bytes. The channel is closed whenever the
/// pump stops, be it on end of stream, read failure,
/// cancellation, or the channel being closed from the
/// consumer side, so a select over the channel observes
/// the connection going away as a drained case.
///
/// Returns the number of bytes forwarded. Only a read
/// failure is reported as an error.
///
/// # Panics
///
/// Panics if `chunk` is zero.
pub async fn pump_reads<R>(
    mut reader: R,
    chan: &Channel<Vec<u8>>,
    chunk: usize,
    cancel: &Cancel,
) -> Result<u64>
where
    R: AsyncRead + Unpin,
{
    assert!(chunk > 0, "pump chunk size must be non-zero");
    let mut total = 0u64;
    let mut buf = vec![0u8; chunk];
    let result = loop {
        let n = tokio::select! {
            biased;
            _ = cancel.cancelled() => break Ok(total),
            n = reader.read(&mut buf) => match n {
                Ok(n) => n,
                Err(err) => break Err(err.into()),
            },
        };
        if n == 0 {
            tracing::debug!(total, "read pump reached end of stream");
            break Ok(total);
        }
        if let Err(err) = chan.write(buf[..n].to_vec(), cancel).await {
            tracing::debug!(total, "read pump stopped: {}", err.reason());
            break Ok(total);
        }
        total += n as u64;
    };
    chan.close();
    result
}
