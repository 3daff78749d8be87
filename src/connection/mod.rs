//! Broker discovery and connection management.

use std::collections::HashMap;
use std::sync::Arc;

use rand::prelude::*;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    messenger::{Messenger, RequestError, SyncVersionsError},
    protocol::messages::{MetadataRequest, MetadataRequestTopic, MetadataResponse, RequestBody},
    throttle::log_throttle,
};

pub use self::topology::{Broker, BrokerTopology};
use self::transport::Transport;

mod topology;
mod transport;

/// A connection to a broker.
pub type BrokerConnection = Arc<Messenger<Transport>>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("error getting cluster metadata: {0}")]
    Metadata(#[from] RequestError),

    #[error("error connecting to broker \"{broker}\": {error}")]
    Transport {
        broker: String,
        error: transport::Error,
    },

    #[error("cannot sync versions with broker \"{broker}\": {error}")]
    SyncVersions {
        broker: String,
        error: SyncVersionsError,
    },

    #[error("no bootstrap brokers configured")]
    NoBrokers,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Maintains connections to the brokers of one cluster.
///
/// Bootstrap brokers are only used until the first metadata response tells us the real topology. Connections are
/// opened lazily and then reused for the lifetime of the connector.
#[derive(Debug)]
pub struct BrokerConnector {
    /// Brokers used to bootstrap this pool
    bootstrap_brokers: Vec<String>,

    /// Discovered brokers in the cluster, including bootstrap brokers
    pub(crate) topology: BrokerTopology,

    /// Connections by broker ID.
    connections: Mutex<HashMap<i32, BrokerConnection>>,

    /// The connection used for cluster-wide requests such as metadata lookups.
    arbitrary_broker: Mutex<Option<BrokerConnection>>,

    client_id: Arc<str>,

    /// Maximum size of a message received from a broker.
    max_message_size: usize,
}

impl BrokerConnector {
    pub fn new(bootstrap_brokers: Vec<String>, client_id: Arc<str>, max_message_size: usize) -> Self {
        Self {
            bootstrap_brokers,
            topology: Default::default(),
            connections: Mutex::new(HashMap::new()),
            arbitrary_broker: Mutex::new(None),
            client_id,
            max_message_size,
        }
    }

    /// Fetches the cluster topology without asking for any topic.
    pub async fn refresh_metadata(&self) -> Result<()> {
        self.request_metadata(Some(vec![])).await?;
        Ok(())
    }

    /// Requests metadata for `topics` from an arbitrary broker, `None` asks for all topics.
    ///
    /// The broker list of the response updates the topology.
    pub async fn request_metadata(&self, topics: Option<Vec<String>>) -> Result<MetadataResponse> {
        let broker = self.arbitrary_connection().await?;

        let request = MetadataRequest {
            topics: topics.map(|topics| {
                topics
                    .into_iter()
                    .map(|name| MetadataRequestTopic { name })
                    .collect()
            }),
            allow_auto_topic_creation: None,
        };

        let response = match broker.request(request).await {
            Ok(response) => response,
            Err(e) => {
                // the next lookup picks another broker
                self.arbitrary_broker.lock().await.take();
                return Err(e.into());
            }
        };

        log_throttle(MetadataRequest::API_KEY, None, response.throttle_time_ms);

        for id in self.topology.update(&response.brokers) {
            if self.connections.lock().await.remove(&id).is_some() {
                debug!(broker = id, "Dropped connection to moved broker");
            }
        }

        Ok(response)
    }

    /// Returns all brokers known from the last metadata response.
    pub fn brokers(&self) -> Vec<Broker> {
        self.topology.get_brokers()
    }

    /// Returns a connection to the broker with the given ID, or `None` if the ID is not part of the topology.
    pub async fn connect(&self, broker_id: i32) -> Result<Option<BrokerConnection>> {
        let Some(broker) = self.topology.get_broker(broker_id) else {
            return Ok(None);
        };

        let mut connections = self.connections.lock().await;
        if let Some(connection) = connections.get(&broker_id) {
            return Ok(Some(Arc::clone(connection)));
        }

        let connection = self.connect_to(&broker.address()).await?;
        info!(broker = broker_id, address = %broker, "Connected to broker");
        connections.insert(broker_id, Arc::clone(&connection));

        Ok(Some(connection))
    }

    /// Returns the cached arbitrary connection, or connects to the first broker that accepts.
    ///
    /// Known brokers are tried before bootstrap brokers, each group in random order.
    async fn arbitrary_connection(&self) -> Result<BrokerConnection> {
        let mut current = self.arbitrary_broker.lock().await;
        if let Some(connection) = current.as_ref() {
            return Ok(Arc::clone(connection));
        }

        let mut known: Vec<String> = self
            .topology
            .get_brokers()
            .iter()
            .map(Broker::address)
            .collect();
        let mut bootstrap = self.bootstrap_brokers.clone();
        {
            let mut rng = thread_rng();
            known.shuffle(&mut rng);
            bootstrap.shuffle(&mut rng);
        }

        let mut last_error = None;
        for address in known.into_iter().chain(bootstrap) {
            match self.connect_to(&address).await {
                Ok(connection) => {
                    info!(broker = %address, "Established arbitrary broker connection");
                    *current = Some(Arc::clone(&connection));
                    return Ok(connection);
                }
                Err(e) => {
                    warn!(broker = %address, %e, "Failed to connect to broker");
                    last_error = Some(e);
                }
            }
        }

        let e = last_error.unwrap_or(Error::NoBrokers);
        error!(%e, "Cannot connect to any broker");
        Err(e)
    }

    async fn connect_to(&self, address: &str) -> Result<BrokerConnection> {
        let transport = transport::connect(address)
            .await
            .map_err(|error| Error::Transport {
                broker: address.to_string(),
                error,
            })?;

        let messenger = Messenger::new(
            transport,
            self.max_message_size,
            Arc::clone(&self.client_id),
        );
        messenger
            .sync_versions()
            .await
            .map_err(|error| Error::SyncVersions {
                broker: address.to_string(),
                error,
            })?;

        Ok(Arc::new(messenger))
    }
}
