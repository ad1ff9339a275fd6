use propagation_probe_core::prelude::ShutdownHandle;
use tokio::signal;

/// Trigger the shutdown signal on Ctrl-C so that an interrupted run still reaches teardown and
/// report finalization.
pub(crate) fn start_shutdown_listener(
    runtime: &tokio::runtime::Runtime,
) -> anyhow::Result<ShutdownHandle> {
    let handle = ShutdownHandle::default();

    let listener_handle = handle.clone();
    runtime.spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            listener_handle.shutdown();
            println!("Received shutdown signal, shutting down...");
        }
    });

    Ok(handle)
}
