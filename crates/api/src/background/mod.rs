//! Long-running background tasks spawned by the binary.

pub mod attempt_pruning;
