//! Status slots
//!
//! A slot is a single-assignment cell carrying the final status of an upstream
//! project to one downstream consumer. Every dependency edge gets its own slot
//! so no cell is shared between readers.

use crate::order::BuildOrder;
use crate::status::UpToDateStatus;
use keel_config::ProjectId;
use std::collections::HashMap;
use tokio::sync::oneshot;
use tracing::trace;

/// Producer half of a slot
#[derive(Debug)]
pub struct StatusSender {
    upstream: ProjectId,
    tx: oneshot::Sender<UpToDateStatus>,
}

/// Consumer half of a slot
#[derive(Debug)]
pub struct StatusReceiver {
    upstream: ProjectId,
    rx: oneshot::Receiver<UpToDateStatus>,
}

/// Create an empty slot for the edge from `upstream` to one consumer
pub fn status_slot(upstream: ProjectId) -> (StatusSender, StatusReceiver) {
    let (tx, rx) = oneshot::channel();
    (
        StatusSender {
            upstream: upstream.clone(),
            tx,
        },
        StatusReceiver { upstream, rx },
    )
}

impl StatusSender {
    /// Fill the slot. Consuming `self` makes a second fill impossible.
    pub fn fill(self, status: UpToDateStatus) {
        // The consumer may already be gone after a panic; nothing to do then
        if self.tx.send(status).is_err() {
            trace!(upstream = %self.upstream, "status slot consumer dropped");
        }
    }
}

impl StatusReceiver {
    pub fn upstream(&self) -> &ProjectId {
        &self.upstream
    }

    /// Block until the slot is filled.
    ///
    /// Returns `None` when the producer went away without filling it.
    pub fn wait(self) -> Option<UpToDateStatus> {
        self.rx.blocking_recv().ok()
    }
}

/// Slots of one invocation, grouped by the project that owns each half
#[derive(Debug, Default)]
pub struct SlotWiring {
    senders: HashMap<ProjectId, Vec<StatusSender>>,
    receivers: HashMap<ProjectId, Vec<StatusReceiver>>,
}

impl SlotWiring {
    /// One fresh slot per surviving edge of the build order
    pub fn for_order(order: &BuildOrder) -> Self {
        let mut wiring = Self::default();
        for id in order.order() {
            for upstream in order.upstream(id) {
                let (tx, rx) = status_slot(upstream.clone());
                wiring.senders.entry(upstream.clone()).or_default().push(tx);
                wiring.receivers.entry(id.clone()).or_default().push(rx);
            }
        }
        wiring
    }

    /// Senders `id` fills, one per downstream consumer
    pub fn take_senders(&mut self, id: &ProjectId) -> Vec<StatusSender> {
        self.senders.remove(id).unwrap_or_default()
    }

    /// Receivers `id` waits on, in reference order
    pub fn take_receivers(&mut self, id: &ProjectId) -> Vec<StatusReceiver> {
        self.receivers.remove(id).unwrap_or_default()
    }
}
