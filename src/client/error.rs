use thiserror::Error;

pub use crate::messenger::RequestError;
pub use crate::protocol::error::Error as ProtocolError;

/// What a failed request was about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestContext {
    /// Request was for a topic.
    Topic(String),

    /// Request was sent to a specific broker and covers everything it hosts.
    Broker(i32),
}

impl std::fmt::Display for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Topic(topic) => write!(f, "topic \"{topic}\""),
            Self::Broker(broker) => write!(f, "broker {broker}"),
        }
    }
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Connection error: {0}")]
    Connection(#[from] crate::connection::Error),

    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    #[error(
        "Server error for {request}: {protocol_error}{}",
        error_message.as_deref().map(|m| format!(" ({m})")).unwrap_or_default()
    )]
    ServerError {
        protocol_error: ProtocolError,
        error_message: Option<String>,
        request: RequestContext,
    },

    #[error("Broker {0} is not part of the cluster")]
    UnknownBroker(i32),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
