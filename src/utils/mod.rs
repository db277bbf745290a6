//! Shared utilities: latency parsing.

pub mod latency;

pub use latency::{parse_latency_to_picos, Latency, LatencyError};
