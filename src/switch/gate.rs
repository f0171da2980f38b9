use std::sync::Arc;
use tokio::sync::watch;

/// Open/closed signal shared between the switch critical section and readers.
///
/// Readers call [`ReadinessGate::wait_open`] before touching the catalog; a
/// switch holds a [`GateClosed`] guard for its whole critical section.
#[derive(Clone, Debug)]
pub struct ReadinessGate {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    /// A gate that starts open.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(true);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_open(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves immediately while open; otherwise waits for the next reopen.
    pub async fn wait_open(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|open| *open).await;
    }

    /// Close the gate until the returned guard is dropped.
    pub fn close(&self) -> GateClosed {
        self.tx.send_replace(false);
        GateClosed { gate: self.clone() }
    }
}

/// Reopens the gate on drop, on every exit path of the critical section.
#[must_use = "the gate reopens as soon as this guard is dropped"]
#[derive(Debug)]
pub struct GateClosed {
    gate: ReadinessGate,
}

impl Drop for GateClosed {
    fn drop(&mut self) {
        self.gate.tx.send_replace(true);
    }
}
