//! Async-based task framework.
//!
//! The tokio runtime multiplexes every logical flow
//! of a client (a connection read loop, a heartbeat,
//! a message handler pool) onto a few worker threads.
//! That is exactly what we want, but shear tokio lets
//! anyone spawn a detached task that outlives whoever
//! started it, and nobody is left to observe its
//! failure or to stop it on shutdown.
//!
//! This is why the task framework comes in. We build
//! the runtime for the entrypoint, and we provide the
//! `Scope`, so that background work is always owned
//! by some coordinator that bounds its lifetime.

pub mod framework;

#[doc(hidden)]
pub mod scope;
pub use scope::Scope;
