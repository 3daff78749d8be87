//! Plain TCP transport to a broker.

use thiserror::Error;
use tokio::net::TcpStream;
use tracing::debug;

pub type Transport = TcpStream;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("IO Error: {0}")]
    IO(#[from] std::io::Error),
}

pub async fn connect(broker: &str) -> Result<Transport, Error> {
    let stream = TcpStream::connect(broker).await?;

    // requests are small and latency bound
    stream.set_nodelay(true)?;

    debug!(broker, peer = ?stream.peer_addr().ok(), "TCP connection established");
    Ok(stream)
}
