//! Observability for the quantum log.
//!
//! Structured JSON logging only: the log writer emits one line per event,
//! synchronously, with deterministic key ordering. Observability is
//! read-only: a logging failure must never affect the durability path.

mod logger;

pub use logger::{Logger, Severity};
