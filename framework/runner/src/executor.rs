use std::future::Future;

use propagation_probe_core::prelude::{ShutdownHandle, ShutdownSignalError};

/// Runs async work for step hooks, racing every future against the shutdown signal.
#[derive(Debug)]
pub struct Executor {
    runtime: tokio::runtime::Runtime,
    shutdown_handle: ShutdownHandle,
}

impl Executor {
    pub(crate) fn new(runtime: tokio::runtime::Runtime, shutdown_handle: ShutdownHandle) -> Self {
        Self {
            runtime,
            shutdown_handle,
        }
    }

    /// Run async code in place, blocking until it completes.
    ///
    /// The future is cancelled if the runner shuts down, in which case the returned error wraps
    /// a [ShutdownSignalError]. A future that does not support cancellation may prevent the
    /// runner from shutting down.
    pub fn execute_in_place<T>(
        &self,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        let mut shutdown_listener = self.shutdown_handle.new_listener();
        self.runtime.block_on(async move {
            tokio::select! {
                result = fut => result,
                _ = shutdown_listener.wait_for_shutdown() => {
                    Err(anyhow::anyhow!(ShutdownSignalError::default()))
                },
            }
        })
    }

    /// Run async code in place without racing it against the shutdown signal.
    ///
    /// Teardown uses this: best-effort cleanup of transient resources has to run to completion
    /// even when the run was interrupted, otherwise an aborted run leaks branches and files
    /// into the external repository.
    pub fn execute_to_completion<T>(
        &self,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        self.runtime.block_on(fut)
    }

    /// Submit async code to run in the background.
    ///
    /// The future is not cancelled on shutdown and the runner does not wait for it. Step hooks
    /// should use [Executor::execute_in_place] so their work settles before the step does.
    pub fn spawn(&self, fut: impl Future<Output = ()> + Send + 'static) {
        self.runtime.spawn(fut);
    }
}
