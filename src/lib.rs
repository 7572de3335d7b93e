//! quantalog - per-host commit-quantum durability log
//!
//! Records every inter-node protocol message a host receives between two
//! consistency checkpoints, and notifies each message's destination mailbox
//! once the message's durability requirement is satisfied.

pub mod message;
pub mod observability;
pub mod quantum;
