//! CSP-style event primitives.
//!
//! This crate emulates the primitives of
//! communicating sequential processes on the top
//! of the tokio runtime, for driving the event
//! loops of long-lived network clients:
//!
//! - The `Channel` is a typed FIFO mailbox with
//!   blocking and non-blocking reads and an explicit
//!   completion. Everything else is built around it.
//! - The `Select` statement multiplexes the read
//!   sides of many channels, and runs exactly one
//!   ready case (or a default) per evaluation.
//!   A connection read loop typically selects over
//!   "data arrived", "heartbeat ticked" and "exit
//!   requested" in one statement.
//! - The `Ticker` delivers timestamps periodically
//!   through a channel of capacity one.
//! - The `WaitGroup` is a counting rendezvous for
//!   fanning workers out and in.
//!
//! Every suspending operation takes a `Cancel`,
//! and unwinding a wait through it never leaves a
//! side effect behind: no value is consumed and no
//! counter is touched.
//!
//! There are no global instances of anything, every
//! primitive is constructed and handed explicitly to
//! whoever needs it.

pub mod error;
pub use error::{Error, ErrorKind, Result, WriteError};

#[doc(hidden)]
pub mod cancel;
pub use cancel::Cancel;

#[doc(hidden)]
pub mod handler;
pub use handler::{AsyncHandlerTrait, Handler, HandlerResult};

#[doc(hidden)]
pub mod chan;
pub use chan::{Capacity, Channel, Reader};

#[doc(hidden)]
pub mod select;
pub use select::{ReadyWait, Select, Selected};

#[doc(hidden)]
pub mod wait_group;
pub use wait_group::WaitGroup;

#[doc(hidden)]
pub mod ticker;
pub use ticker::Ticker;

pub mod prelude {
    //! Prelude to making life easy for
    //! [this module](crate) users.
    //!
    //! The prelude will import the traits to make the
    //! trait methods visible to the rust compiler, and
    //! then clobber them immediately. Therefore, user
    //! must explicitly import the type they need.
    pub use crate::AsyncHandlerTrait as _;
    pub use crate::ReadyWait as _;
}

#[doc(hidden)]
#[cfg(test)]
pub(crate) mod testutil;
