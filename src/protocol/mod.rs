//! Kafka wire protocol, restricted to the messages needed to inspect and move log directories.
//!
//! # References
//! - <https://kafka.apache.org/protocol>

pub mod api_key;
pub mod api_version;
pub mod error;
pub mod frame;
pub mod messages;
pub mod primitives;
#[cfg(test)]
mod test_utils;
pub mod traits;
mod vec_builder;
