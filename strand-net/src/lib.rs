//! Connection contract of strand clients.
//!
//! Protocol layers obtain their connections through
//! [`dial`], and surface their readiness to a select
//! statement through [`pump_reads`]: the pump turns
//! the read half of a connection into a channel, which
//! is then registered as just another case next to
//! heartbeat tickers and exit channels.
//!
//! Only the stream-oriented `"tcp"` network is known.

pub mod error;
pub use error::{NetError, Result};

pub mod addr;
pub use addr::{Network, join_host_port, split_host_port};

#[doc(hidden)]
pub mod dial;
pub use dial::{Conn, TcpConn, dial, dial_timeout};

#[doc(hidden)]
pub mod pump;
pub use pump::pump_reads;
