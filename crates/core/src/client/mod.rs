//! Remote workflow service client.
//!
//! This module provides the `RemoteApi` trait covering the service's
//! create/status/outputs/upload operations, and the reqwest-backed
//! `RunningHubClient`. Responses are decoded once into typed results here;
//! nothing downstream inspects raw JSON.

mod envelope;
mod runninghub;
mod types;

pub use runninghub::RunningHubClient;
pub use types::*;
