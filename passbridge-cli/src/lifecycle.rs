//! Process lifecycle: announce the surface, then live until told to exit.

use passbridge_core::Operation;
use tokio::sync::mpsc;

use crate::exit_codes;
use crate::protocol::Outgoing;

/// The `register` message announcing every operation under `namespace`.
pub fn registration(namespace: &str) -> Outgoing {
    Outgoing::Register {
        namespace: namespace.to_string(),
        operations: Operation::ALL.iter().map(|op| op.name()).collect(),
    }
}

/// Sending half of the exit signal. Cloneable; the first code sent wins.
#[derive(Debug, Clone)]
pub struct ExitHandle {
    tx: mpsc::UnboundedSender<i32>,
}

impl ExitHandle {
    pub fn exit(&self, code: i32) {
        if self.tx.send(code).is_err() {
            tracing::debug!(code, "Exit already in progress");
        }
    }
}

/// Receiving half, held by the controlling task.
#[derive(Debug)]
pub struct ExitWaiter {
    rx: mpsc::UnboundedReceiver<i32>,
}

impl ExitWaiter {
    /// Block until an exit code arrives.
    ///
    /// If every handle is dropped without signalling (the serving thread
    /// died), the process ends with a general error.
    pub async fn wait(mut self) -> i32 {
        self.rx.recv().await.unwrap_or(exit_codes::GENERAL_ERROR)
    }
}

pub fn exit_signal() -> (ExitHandle, ExitWaiter) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ExitHandle { tx }, ExitWaiter { rx })
}
