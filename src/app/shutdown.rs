//! Graceful shutdown handling.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancels `cancel` on the first Ctrl-C.
///
/// The returned task should be aborted once the run finishes normally.
pub fn spawn_interrupt_listener(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupt received, stopping input and flushing buffered records...");
            cancel.cancel();
        }
    })
}

/// Stops the background tasks that run alongside ingest.
///
/// Flushing the writer is left to the caller so its error can be reported.
pub async fn shutdown_gracefully(
    cancel: CancellationToken,
    logging_task: Option<JoinHandle<()>>,
    interrupt_listener: JoinHandle<()>,
) {
    cancel.cancel();
    if let Some(logging_task) = logging_task {
        let _ = logging_task.await;
    }
    interrupt_listener.abort();
}
