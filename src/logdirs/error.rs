use std::num::ParseIntError;

use thiserror::Error;

/// Why a single `topic[:partitions]` token could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SyntaxError {
    #[error("topic name is empty")]
    EmptyTopic,

    #[error("partition list after ':' is empty")]
    EmptyPartitionList,

    #[error("invalid partition \"{value}\": {source}")]
    InvalidPartition {
        value: String,
        source: ParseIntError,
    },

    #[error("partition {0} is negative")]
    NegativePartition(i32),
}

/// Failure of a log-dirs command.
///
/// Per-directory and per-partition errors reported by brokers are data, not errors; they end up in the model.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("improper topic partitions format on \"{token}\": {source}")]
    Syntax { token: String, source: SyntaxError },

    #[error(
        "improper format for dest-dir on \"{token}\" (expected topic:partitions=dir, got {parts} part(s) after splitting on '=')"
    )]
    InvalidDestination { token: String, parts: usize },

    #[error("move on \"{token}\" has an empty destination directory")]
    EmptyDestination { token: String },

    #[error("move on \"{token}\" must name explicit partitions")]
    MissingPartitions { token: String },

    #[error("unable to request metadata to determine partitions on topics: {0}")]
    Metadata(#[source] crate::client::error::Error),

    #[error("unable to describe log dirs: {0}")]
    Describe(#[source] crate::client::error::Error),

    #[error("unable to alter replica log dirs: {0}")]
    Alter(#[source] crate::client::error::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
