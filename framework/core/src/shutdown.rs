use tokio::sync::broadcast::{error::TryRecvError, Receiver, Sender};

/// Broadcasts a shutdown signal to every listener handed out by [ShutdownHandle::new_listener].
///
/// The runner installs one of these and triggers it on Ctrl-C, so that a run which is interrupted
/// partway still reaches its teardown and report finalization.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Sender<()>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            sender: tokio::sync::broadcast::channel(1).0,
        }
    }

    pub fn shutdown(&self) {
        if let Err(e) = self.sender.send(()) {
            // Fails when nobody is listening, which is harmless.
            log::debug!("No listeners for shutdown signal: {e:?}");
        }
    }

    pub fn new_listener(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
        }
    }
}

/// Receiving side of the shutdown signal.
#[derive(Debug)]
pub struct ShutdownListener {
    receiver: Receiver<()>,
}

impl ShutdownListener {
    /// Point in time check whether the shutdown signal has been sent.
    pub fn should_shutdown(&mut self) -> bool {
        match self.receiver.try_recv() {
            Ok(()) => true,
            Err(TryRecvError::Closed) => true,
            Err(_) => false,
        }
    }

    /// Wait for the shutdown signal. Safe to race against other futures so that in-flight work
    /// can be cancelled when the signal arrives.
    pub async fn wait_for_shutdown(&mut self) {
        // A closed channel means the handle is gone, which is as good as a shutdown.
        let _ = self.receiver.recv().await;
    }
}

/// The error produced when in-flight work is cancelled by the shutdown signal.
#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct ShutdownSignalError {
    msg: String,
}

impl Default for ShutdownSignalError {
    fn default() -> Self {
        Self {
            msg: "Execution cancelled by shutdown signal".to_string(),
        }
    }
}
