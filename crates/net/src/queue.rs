use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use sightline_view::{EmitError, ServerMessage, UpdateSink};

/// Create a connected queue pair for one observer.
pub fn outbound_channel() -> (OutboundQueue, OutboundReceiver) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (OutboundQueue { tx }, OutboundReceiver { rx })
}

/// Producer half, owned by the simulation thread.
#[derive(Debug, Clone)]
pub struct OutboundQueue {
    tx: Sender<ServerMessage>,
}

impl OutboundQueue {
    pub fn push(&self, message: ServerMessage) -> Result<(), EmitError> {
        self.tx.send(message).map_err(|_| EmitError::Disconnected)
    }

    /// Messages waiting to be written.
    pub fn backlog(&self) -> usize {
        self.tx.len()
    }
}

impl UpdateSink for OutboundQueue {
    fn enqueue(&mut self, message: ServerMessage) -> Result<(), EmitError> {
        self.push(message)
    }
}

/// Consumer half, owned by the network thread.
#[derive(Debug)]
pub struct OutboundReceiver {
    rx: Receiver<ServerMessage>,
}

impl OutboundReceiver {
    /// Move every pending message into `out` without blocking. Returns
    /// `false` once the producer is gone and nothing is left.
    pub fn drain_into(&self, out: &mut Vec<ServerMessage>) -> bool {
        loop {
            match self.rx.try_recv() {
                Ok(message) => out.push(message),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    /// Drain pending messages, ignoring whether the producer is still there.
    pub fn poll(&self) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        self.drain_into(&mut out);
        out
    }

    /// Block for the next message, up to `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ServerMessage> {
        self.rx.recv_timeout(timeout).ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
