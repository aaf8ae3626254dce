//! Transport side of observer updates.
//!
//! The simulation thread enqueues [`ServerMessage`](sightline_view::ServerMessage)s
//! into an [`OutboundQueue`]; a [`NetworkWorker`] on its own thread drains the
//! matching [`OutboundReceiver`], frames each message and writes it out.
//!
//! # Invariants
//! - Enqueue never blocks the simulation thread.
//! - Messages for one observer are written in enqueue order.
//! - A broken connection is detached alone; others keep flowing.

mod codec;
mod queue;
mod worker;

pub use codec::{CodecError, MAX_FRAME_LEN, decode_frame, encode_frame};
pub use queue::{OutboundQueue, OutboundReceiver, outbound_channel};
pub use worker::{FrameSink, NetError, NetworkWorker, WorkerStats};

pub fn crate_info() -> &'static str {
    "sightline-net v0.1.0"
}
