//! Where log-dir requests are sent: one fixed broker or the partition leaders of the whole cluster.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, TryStreamExt};
use tracing::{debug, warn};

use super::error::{Error, ProtocolError, RequestContext, Result};
use crate::{
    connection::{BrokerConnection, BrokerConnector},
    protocol::messages::{
        AlterReplicaLogDir, AlterReplicaLogDirPartitionResult, AlterReplicaLogDirTopic,
        AlterReplicaLogDirTopicResult, AlterReplicaLogDirsRequest, DescribableLogDirTopic,
        DescribeLogDirsRequest, DescribeLogDirsResult, RequestBody,
    },
    throttle::log_throttle,
    topic::Topic,
};

/// Broker flag value that selects the whole cluster instead of one broker.
///
/// Every negative value is treated the same way.
pub const ANY_BROKER: i32 = -1;

/// Sends log-dir requests and returns the raw per-directory or per-topic results.
///
/// Errors embedded in results are returned as data. Only failures that make the whole answer unusable are errors.
#[async_trait]
pub trait LogDirTarget: Debug + Send + Sync {
    async fn describe_log_dirs(
        &self,
        request: DescribeLogDirsRequest,
    ) -> Result<Vec<DescribeLogDirsResult>>;

    async fn alter_replica_log_dirs(
        &self,
        request: AlterReplicaLogDirsRequest,
    ) -> Result<Vec<AlterReplicaLogDirTopicResult>>;
}

/// Sends every request to one broker as is.
#[derive(Debug)]
pub struct BrokerTarget {
    broker_id: i32,
    brokers: Arc<BrokerConnector>,
}

impl BrokerTarget {
    pub(super) fn new(broker_id: i32, brokers: Arc<BrokerConnector>) -> Self {
        Self { broker_id, brokers }
    }
}

#[async_trait]
impl LogDirTarget for BrokerTarget {
    async fn describe_log_dirs(
        &self,
        request: DescribeLogDirsRequest,
    ) -> Result<Vec<DescribeLogDirsResult>> {
        describe_on(&self.brokers, self.broker_id, request).await
    }

    async fn alter_replica_log_dirs(
        &self,
        request: AlterReplicaLogDirsRequest,
    ) -> Result<Vec<AlterReplicaLogDirTopicResult>> {
        alter_on(&self.brokers, self.broker_id, request).await
    }
}

/// Leader broker by topic and partition.
type Leaders = HashMap<(String, i32), i32>;

/// Splits requests by partition leader and merges the answers.
///
/// An unscoped describe goes to every broker instead, so the result covers all replicas.
#[derive(Debug)]
pub struct ClusterTarget {
    brokers: Arc<BrokerConnector>,
}

impl ClusterTarget {
    pub(super) fn new(brokers: Arc<BrokerConnector>) -> Self {
        Self { brokers }
    }

    /// Current leader of every partition of `topics` that has one.
    ///
    /// Topics the cluster reports an error for, or does not report at all, are returned with their error instead.
    async fn leaders(
        &self,
        topics: Vec<String>,
    ) -> Result<(Leaders, HashMap<String, ProtocolError>)> {
        let response = self.brokers.request_metadata(Some(topics.clone())).await?;

        let mut leaders = HashMap::new();
        let mut errors: HashMap<String, ProtocolError> = topics
            .into_iter()
            .map(|topic| (topic, ProtocolError::UnknownTopicOrPartition))
            .collect();
        for topic in response.topics {
            if let Some(e) = topic.error {
                warn!(topic = %topic.name, %e, "Cannot determine partition leaders");
                errors.insert(topic.name, e);
                continue;
            }
            errors.remove(&topic.name);

            let topic = Topic::from(topic);
            for (partition, info) in &topic.partitions {
                if let Some(leader) = info.leader() {
                    leaders.insert((topic.name.clone(), *partition), leader);
                }
            }
        }
        Ok((leaders, errors))
    }
}

#[async_trait]
impl LogDirTarget for ClusterTarget {
    async fn describe_log_dirs(
        &self,
        request: DescribeLogDirsRequest,
    ) -> Result<Vec<DescribeLogDirsResult>> {
        let Some(topics) = request.topics else {
            let brokers = self.brokers.brokers();
            debug!(brokers = brokers.len(), "Describing log dirs on every broker");

            let results: Vec<Vec<_>> = brokers
                .into_iter()
                .map(|broker| {
                    describe_on(
                        &self.brokers,
                        broker.id,
                        DescribeLogDirsRequest {
                            topics: None,
                            tagged_fields: None,
                        },
                    )
                })
                .collect::<FuturesUnordered<_>>()
                .try_collect()
                .await?;
            return Ok(results.into_iter().flatten().collect());
        };

        if topics.is_empty() {
            return Ok(vec![]);
        }

        let names = topics.iter().map(|t| t.topic.clone()).collect();
        let (leaders, errors) = self.leaders(names).await?;

        if let Some((topic, protocol_error)) = topics
            .iter()
            .find_map(|t| errors.get(&t.topic).map(|e| (&t.topic, *e)))
        {
            return Err(Error::ServerError {
                protocol_error,
                error_message: None,
                request: RequestContext::Topic(topic.clone()),
            });
        }

        let mut by_leader: BTreeMap<i32, BTreeMap<String, Vec<i32>>> = BTreeMap::new();
        for topic in topics {
            for partition in topic.partitions {
                match leaders.get(&(topic.topic.clone(), partition)) {
                    Some(leader) => by_leader
                        .entry(*leader)
                        .or_default()
                        .entry(topic.topic.clone())
                        .or_default()
                        .push(partition),
                    None => warn!(
                        topic = %topic.topic,
                        partition,
                        "No leader known, skipping partition",
                    ),
                }
            }
        }

        let results: Vec<Vec<_>> = by_leader
            .into_iter()
            .map(|(leader, topics)| {
                let request = DescribeLogDirsRequest {
                    topics: Some(
                        topics
                            .into_iter()
                            .map(|(topic, partitions)| DescribableLogDirTopic {
                                topic,
                                partitions,
                                tagged_fields: None,
                            })
                            .collect(),
                    ),
                    tagged_fields: None,
                };
                describe_on(&self.brokers, leader, request)
            })
            .collect::<FuturesUnordered<_>>()
            .try_collect()
            .await?;

        Ok(results.into_iter().flatten().collect())
    }

    async fn alter_replica_log_dirs(
        &self,
        request: AlterReplicaLogDirsRequest,
    ) -> Result<Vec<AlterReplicaLogDirTopicResult>> {
        let names: BTreeSet<String> = request
            .dirs
            .iter()
            .flat_map(|dir| dir.topics.iter().map(|t| t.name.clone()))
            .collect();
        if names.is_empty() {
            return Ok(vec![]);
        }
        let (leaders, errors) = self.leaders(names.into_iter().collect()).await?;

        // leader -> dir -> topic -> partitions, keeps one entry per dir in every split request
        let mut by_leader: BTreeMap<i32, BTreeMap<String, BTreeMap<String, Vec<i32>>>> =
            BTreeMap::new();
        let mut leaderless: BTreeMap<String, Vec<i32>> = BTreeMap::new();
        for dir in request.dirs {
            for topic in dir.topics {
                for partition in topic.partitions {
                    match leaders.get(&(topic.name.clone(), partition)) {
                        Some(leader) => by_leader
                            .entry(*leader)
                            .or_default()
                            .entry(dir.path.clone())
                            .or_default()
                            .entry(topic.name.clone())
                            .or_default()
                            .push(partition),
                        None => leaderless
                            .entry(topic.name.clone())
                            .or_default()
                            .push(partition),
                    }
                }
            }
        }

        let results: Vec<Vec<_>> = by_leader
            .into_iter()
            .map(|(leader, dirs)| {
                let request = AlterReplicaLogDirsRequest {
                    dirs: dirs
                        .into_iter()
                        .map(|(path, topics)| AlterReplicaLogDir {
                            path,
                            topics: topics
                                .into_iter()
                                .map(|(name, partitions)| AlterReplicaLogDirTopic {
                                    name,
                                    partitions,
                                    tagged_fields: None,
                                })
                                .collect(),
                            tagged_fields: None,
                        })
                        .collect(),
                    tagged_fields: None,
                };
                alter_on(&self.brokers, leader, request)
            })
            .collect::<FuturesUnordered<_>>()
            .try_collect()
            .await?;

        let mut results: Vec<_> = results.into_iter().flatten().collect();
        results.extend(leaderless.into_iter().map(|(topic_name, partitions)| {
            // a topic without error that still lacks a leader is reported as unknown
            let error = errors
                .get(&topic_name)
                .copied()
                .unwrap_or(ProtocolError::UnknownTopicOrPartition);
            warn!(topic = %topic_name, ?partitions, %error, "Cannot move partitions without a leader");
            AlterReplicaLogDirTopicResult {
                topic_name,
                partitions: partitions
                    .into_iter()
                    .map(|partition_index| AlterReplicaLogDirPartitionResult {
                        partition_index,
                        error: Some(error),
                        tagged_fields: None,
                    })
                    .collect(),
                tagged_fields: None,
            }
        }));

        Ok(results)
    }
}

async fn connection(brokers: &BrokerConnector, broker_id: i32) -> Result<BrokerConnection> {
    brokers
        .connect(broker_id)
        .await?
        .ok_or(Error::UnknownBroker(broker_id))
}

async fn describe_on(
    brokers: &BrokerConnector,
    broker_id: i32,
    request: DescribeLogDirsRequest,
) -> Result<Vec<DescribeLogDirsResult>> {
    let broker = connection(brokers, broker_id).await?;
    let response = broker.request(request).await?;

    log_throttle(
        DescribeLogDirsRequest::API_KEY,
        Some(broker_id),
        Some(response.throttle_time_ms),
    );

    if let Some(protocol_error) = response.error {
        return Err(Error::ServerError {
            protocol_error,
            error_message: None,
            request: RequestContext::Broker(broker_id),
        });
    }

    debug!(
        broker = broker_id,
        dirs = response.results.len(),
        "Described log dirs",
    );
    Ok(response.results)
}

async fn alter_on(
    brokers: &BrokerConnector,
    broker_id: i32,
    request: AlterReplicaLogDirsRequest,
) -> Result<Vec<AlterReplicaLogDirTopicResult>> {
    let broker = connection(brokers, broker_id).await?;
    let response = broker.request(request).await?;

    log_throttle(
        AlterReplicaLogDirsRequest::API_KEY,
        Some(broker_id),
        Some(response.throttle_time_ms),
    );

    debug!(
        broker = broker_id,
        topics = response.results.len(),
        "Altered replica log dirs",
    );
    Ok(response.results)
}
