//! Packages band-power snapshots into wire messages and hands them to the transport.

use eeg_types::{encode_snapshot, BandPowerSnapshot, SnapshotMessage};
use tracing::debug;

use crate::error::PipelineResult;

/// The transport's "send to all current subscribers" capability.
///
/// Implementations must be callable from a thread other than the one running
/// the transport's accept loop. Delivery is best effort: no acknowledgement,
/// no retry, and a slow or vanished subscriber is the transport's problem.
pub trait Broadcaster: Send {
    /// Sends `payload` to every subscriber connected right now and returns
    /// how many were reached.
    fn broadcast(&self, payload: String) -> usize;
}

impl<B: Broadcaster + Sync> Broadcaster for std::sync::Arc<B> {
    fn broadcast(&self, payload: String) -> usize {
        (**self).broadcast(payload)
    }
}

pub struct SnapshotEmitter<B> {
    broadcaster: B,
    emitted: u64,
}

impl<B: Broadcaster> SnapshotEmitter<B> {
    pub fn new(broadcaster: B) -> Self {
        Self {
            broadcaster,
            emitted: 0,
        }
    }

    /// Encodes `{time, data}` and broadcasts it. Fire and forget.
    pub fn emit(&mut self, snapshot: BandPowerSnapshot, timestamp: f64) -> PipelineResult<()> {
        let payload = encode_snapshot(&SnapshotMessage::new(timestamp, snapshot))?;
        let receivers = self.broadcaster.broadcast(payload);
        self.emitted += 1;
        debug!(
            receivers,
            emitted = self.emitted,
            dominant = %snapshot.dominant(),
            "snapshot broadcast"
        );
        Ok(())
    }

    /// Number of snapshots emitted so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn broadcaster(&self) -> &B {
        &self.broadcaster
    }
}
