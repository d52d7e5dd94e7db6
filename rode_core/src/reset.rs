//! Asynchronous reset signalling.
//!
//! The reset source (button watcher thread, signal handler) only enqueues an
//! event; the tick loop consumes it at the top of the next tick, so zeroing
//! the count and the forced flush happen inside the single thread that owns
//! all tracker state. No storage I/O ever runs in the caller's context.

use crossbeam_channel as xch;

/// Cloneable handle for interrupt-like contexts. `trigger` never blocks:
/// the channel holds one slot and a reset already queued is coalesced.
#[derive(Debug, Clone)]
pub struct ResetHandle {
    tx: xch::Sender<()>,
}

impl ResetHandle {
    pub fn trigger(&self) {
        let _ = self.tx.try_send(());
    }
}

pub(crate) fn channel() -> (ResetHandle, xch::Receiver<()>) {
    let (tx, rx) = xch::bounded(1);
    (ResetHandle { tx }, rx)
}
