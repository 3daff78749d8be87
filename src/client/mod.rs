use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    build_info::DEFAULT_CLIENT_ID,
    connection::{Broker, BrokerConnector},
    logdirs::resolve::MetadataLookup,
    topic::Topic,
};

pub mod error;
pub mod target;

use error::{Error, ProtocolError, RequestContext, Result};
use target::{BrokerTarget, ClusterTarget, LogDirTarget};

/// Builder for [`Client`].
pub struct ClientBuilder {
    bootstrap_brokers: Vec<String>,
    client_id: Option<Arc<str>>,
    max_message_size: usize,
}

impl ClientBuilder {
    /// Create a new [`ClientBuilder`] with the list of bootstrap brokers
    pub fn new(bootstrap_brokers: Vec<String>) -> Self {
        Self {
            bootstrap_brokers,
            client_id: None,
            max_message_size: 100 * 1024 * 1024, // 100MB
        }
    }

    /// Sets client ID.
    pub fn client_id(mut self, client_id: impl Into<Arc<str>>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set maximum size (in bytes) of message frames that can be received from a broker.
    ///
    /// Describing every directory of a large broker produces big responses. Setting this too small makes those
    /// requests fail.
    pub fn max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    /// Build [`Client`], fetching the cluster topology once.
    pub async fn build(self) -> Result<Client> {
        let brokers = Arc::new(BrokerConnector::new(
            self.bootstrap_brokers,
            self.client_id
                .unwrap_or_else(|| Arc::from(DEFAULT_CLIENT_ID)),
            self.max_message_size,
        ));
        brokers.refresh_metadata().await?;

        Ok(Client { brokers })
    }
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder").finish_non_exhaustive()
    }
}

/// Top-level cluster-wide client.
///
/// Answers metadata lookups and hands out [`LogDirTarget`]s for a single broker or the whole cluster.
///
/// Must be constructed using [`ClientBuilder`].
#[derive(Debug)]
pub struct Client {
    brokers: Arc<BrokerConnector>,
}

impl Client {
    /// Returns a list of brokers from cluster topology
    pub fn brokers(&self) -> Vec<Broker> {
        self.brokers.brokers()
    }

    /// Fetches the partition layout of `topics`.
    ///
    /// Fails if any topic is unknown or reports an error.
    pub async fn fetch_metadata(&self, topics: &[String]) -> Result<Vec<Topic>> {
        let response = self
            .brokers
            .request_metadata(Some(topics.to_vec()))
            .await?;

        let mut found = Vec::with_capacity(response.topics.len());
        for topic in response.topics {
            if let Some(protocol_error) = topic.error {
                return Err(Error::ServerError {
                    protocol_error,
                    error_message: None,
                    request: RequestContext::Topic(topic.name),
                });
            }
            found.push(Topic::from(topic));
        }

        if let Some(missing) = topics
            .iter()
            .find(|name| !found.iter().any(|t| &t.name == *name))
        {
            return Err(Error::ServerError {
                protocol_error: ProtocolError::UnknownTopicOrPartition,
                error_message: None,
                request: RequestContext::Topic(missing.clone()),
            });
        }

        Ok(found)
    }

    /// Returns a target that sends every request to `broker_id`.
    pub fn broker_target(&self, broker_id: i32) -> BrokerTarget {
        BrokerTarget::new(broker_id, Arc::clone(&self.brokers))
    }

    /// Returns a target that spreads requests over the cluster.
    pub fn cluster_target(&self) -> ClusterTarget {
        ClusterTarget::new(Arc::clone(&self.brokers))
    }

    /// Picks the target for a broker flag, negative values select the whole cluster.
    pub fn target(&self, broker: i32) -> Box<dyn LogDirTarget> {
        if broker < 0 {
            Box::new(self.cluster_target())
        } else {
            Box::new(self.broker_target(broker))
        }
    }
}

#[async_trait]
impl MetadataLookup for Client {
    async fn partitions(&self, topics: &[String]) -> Result<BTreeMap<String, Vec<i32>>> {
        Ok(self
            .fetch_metadata(topics)
            .await?
            .into_iter()
            .map(|topic| {
                let partitions = topic.partition_ids();
                (topic.name, partitions)
            })
            .collect())
    }
}
