//! Collaborator interfaces consumed by the quantum log.
//!
//! The log treats messages as opaque payloads: all it needs from a message is
//! a stable serialized byte form and a heartbeat classification. Delivery
//! destinations are mailboxes identified by a `u32` id, and `deliver` is a
//! fire-and-forget hand-off, non-blocking and infallible from the log's
//! point of view.

use std::io;
use std::sync::Arc;

/// An inter-node protocol message as seen by the quantum log.
///
/// Implementations must produce a stable encoding: the same message encodes
/// to the same bytes every time, so the logged form matches what a replay
/// would reconstruct.
pub trait Message: Send + Sync + 'static {
    /// The message's wire encoding, stripped of transport-layer framing.
    ///
    /// # Errors
    ///
    /// Encoding failures are tolerated by the worker loop: the envelope is
    /// logged as failed and skipped, and the log continues.
    fn encode(&self) -> io::Result<Vec<u8>>;

    /// Whether this message is a heartbeat.
    ///
    /// Heartbeats carry no state that must survive a crash beyond "more
    /// recent heartbeat wins", so they are always delivered immediately,
    /// never gated on a flush.
    fn is_heartbeat(&self) -> bool {
        false
    }
}

/// A delivery destination for logged messages.
pub trait Mailbox: Send + Sync + 'static {
    /// Stable identifier recorded in each envelope's header.
    fn id(&self) -> u32;

    /// Hand a message off to this destination.
    ///
    /// Called either at submission time (fire-and-forget mode, and always
    /// for heartbeats) or by the worker thread after the flush covering the
    /// message's write offset has completed (wait-for-commit mode). Must not
    /// block.
    fn deliver(&self, message: Arc<dyn Message>);
}
