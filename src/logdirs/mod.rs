//! Inspecting and relocating partition log directories.
//!
//! Tokens given on the command line are parsed by [`spec`], partitions selected as "all" are resolved through
//! [`resolve`], and [`describe`]/[`alter`] send a single request to a [`LogDirTarget`](crate::client::target::LogDirTarget).
//! Results are normalized into [`model`] types and rendered by [`render`].

pub mod alter;
pub mod describe;
pub mod error;
pub mod model;
pub mod render;
pub mod resolve;
pub mod spec;

#[cfg(test)]
mod test_utils;

pub use error::{Error, Result, SyntaxError};
