//! CSP-style concurrency primitives for long-lived
//! messaging clients.
//!
//! This crate gathers the strand crates under a
//! single name:
//!
//! - [`event`]: channels, select, wait groups,
//!   tickers and cancellation.
//! - [`task`]: the runtime and structured task scopes.
//! - [`net`]: the dial contract and read pumps.
//! - [`entry`]: the `#[strand::main]` entrypoint.

pub use strand_event as event;
pub use strand_net as net;
pub use strand_task as task;

pub use strand_entry as entry;
pub use strand_entry::main;
