use strand_event::Cancel;
use strand_task::framework;

pub mod logging;

/// Result type that is forwarded to make it easy
/// for code generation.
pub type Result<T> = anyhow::Result<T>;

/// Intended entrypoint of strand applications.
///
/// The task framework is configured from the
/// environment, see [`framework::Config::from_env`].
pub fn entrypoint<F, Fut>(f: F) -> Result<()>
where
    F: FnOnce(Cancel) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    logging::init();
    let cfg = framework::Config::from_env()?;
    entrypoint_with(cfg, f)
}

/// Entrypoint with an explicit framework configuration.
///
/// The future produced by `f` runs on the current thread
/// while the framework's workers carry whatever it spawns.
/// It receives the root cancellation signal, which fires
/// on Ctrl-C.
pub fn entrypoint_with<F, Fut>(cfg: framework::Config, f: F) -> Result<()>
where
    F: FnOnce(Cancel) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let taskfx = framework::initialize(cfg)?;
    tracing::debug!(
        worker_threads = taskfx.status().worker_threads(),
        "entering main"
    );

    let root = Cancel::new();
    let interrupt = root.clone();
    let watcher = taskfx.handle().spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupted, shutting down");
                interrupt.cancel();
            }
            Err(err) => tracing::warn!("cannot listen for ctrl-c: {err}"),
        }
    });

    let result = taskfx.block_on(f(root));
    watcher.abort();
    if let Err(err) = &result {
        tracing::error!("main failed: {err:#}");
    }
    result
}

pub use strand_entry_macros::main;
