//! Commit-quantum durability log.
//!
//! One quantum file records every inter-node protocol message received
//! between two consistency checkpoints. The writer is the authoritative
//! durability mechanism for in-flight state: on restart, the host replays
//! the quantum covering the interval since its last checkpoint.
//!
//! # Invariants enforced
//!
//! - Log-write order equals submission order (single FIFO queue, single
//!   consumer)
//! - A wait-for-commit delivery never fires before the force covering the
//!   message's write offset
//! - Sync batches are delivered in full and in order, or not at all
//! - No envelope spans two mapped windows
//! - No producer thread ever blocks on disk I/O

mod envelope;
mod errors;
mod reader;
mod scheduler;
mod window;
mod worker;
mod writer;

pub use envelope::{Envelope, ENVELOPE_HEADER_BYTES};
pub use errors::{QuantumError, QuantumResult, Severity};
pub use reader::QuantumReader;
pub use window::{MappedWindow, NeedsRotation, DEFAULT_WINDOW_CAPACITY};
pub use writer::QuantumWriter;

use std::time::Duration;

/// Default sync scheduler period.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(200);

/// Durability contract selected per deployment.
///
/// The mode decides *when* a message is delivered to its destination;
/// every submitted message is written to the log in either mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurabilityMode {
    /// Deliver at submission time, independent of any flush.
    FireAndForget,
    /// Withhold delivery of non-heartbeat messages until a flush covering
    /// their write offset has completed.
    WaitForCommit,
}

/// Configuration for one quantum writer.
#[derive(Debug, Clone)]
pub struct QuantumConfig {
    /// Sync scheduler period.
    pub flush_interval: Duration,
    /// Durability contract.
    pub mode: DurabilityMode,
    /// Mapped-window capacity. The default is just under 2^31 bytes; tests
    /// shrink it to exercise rotation.
    pub window_capacity: usize,
}

impl Default for QuantumConfig {
    fn default() -> Self {
        Self {
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            mode: DurabilityMode::FireAndForget,
            window_capacity: DEFAULT_WINDOW_CAPACITY,
        }
    }
}

impl QuantumConfig {
    /// Config with the wait-for-commit contract.
    pub fn wait_for_commit(flush_interval: Duration) -> Self {
        Self {
            flush_interval,
            mode: DurabilityMode::WaitForCommit,
            ..Self::default()
        }
    }

    /// Config with the fire-and-forget contract.
    pub fn fire_and_forget(flush_interval: Duration) -> Self {
        Self {
            flush_interval,
            mode: DurabilityMode::FireAndForget,
            ..Self::default()
        }
    }
}

/// Lifecycle of one quantum writer. Transitions are one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantumState {
    /// Accepting submissions; worker and sync scheduler running.
    Active,
    /// `close` requested; final sync injected, worker draining.
    Closing,
    /// File handle released, window unmapped, threads joined.
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_fire_and_forget() {
        let config = QuantumConfig::default();
        assert_eq!(config.mode, DurabilityMode::FireAndForget);
        assert_eq!(config.flush_interval, DEFAULT_FLUSH_INTERVAL);
        assert_eq!(config.window_capacity, DEFAULT_WINDOW_CAPACITY);
    }

    #[test]
    fn mode_constructors() {
        let wait = QuantumConfig::wait_for_commit(Duration::from_millis(50));
        assert_eq!(wait.mode, DurabilityMode::WaitForCommit);
        assert_eq!(wait.flush_interval, Duration::from_millis(50));

        let fire = QuantumConfig::fire_and_forget(Duration::from_millis(50));
        assert_eq!(fire.mode, DurabilityMode::FireAndForget);
    }

    #[test]
    fn default_window_capacity_is_under_2_pow_31() {
        assert!(DEFAULT_WINDOW_CAPACITY < 1usize << 31);
    }
}
