//! In-process Kafka cluster that answers the requests `logdirs` sends, using the crate's own codecs.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;

use logdirs::logdirs::model::ReplicaOffsets;
use logdirs::protocol::{
    api_key::ApiKey,
    api_version::ApiVersion,
    error::Error as ProtocolError,
    frame::{AsyncMessageRead, AsyncMessageWrite},
    messages::{
        AlterReplicaLogDirPartitionResult, AlterReplicaLogDirTopicResult,
        AlterReplicaLogDirsRequest, AlterReplicaLogDirsResponse, ApiVersionsRequest,
        ApiVersionsResponse, ApiVersionsResponseApiKey, DescribeLogDirsPartition,
        DescribeLogDirsRequest, DescribeLogDirsResponse, DescribeLogDirsResult,
        DescribeLogDirsTopic, MetadataRequest, MetadataResponse, MetadataResponseBroker,
        MetadataResponsePartition, MetadataResponseTopic, ReadVersionedType, RequestBody,
        RequestHeader, ResponseHeader, WriteVersionedType,
    },
};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};

const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

pub struct Replica {
    pub broker: i32,
    pub dir: &'static str,
    pub topic: &'static str,
    pub partition: i32,
    pub size: i64,
    pub offsets: ReplicaOffsets,
}

/// Log dirs per broker, a dir with an error is offline.
pub type Dirs = BTreeMap<i32, Vec<(&'static str, Option<ProtocolError>)>>;

/// Topic name to `(partition, leader)`, a negative leader means none.
pub type Layout = BTreeMap<&'static str, Vec<(i32, i32)>>;

pub struct MockCluster {
    addresses: BTreeMap<i32, SocketAddr>,
    dirs: Dirs,
    layout: Layout,
    replicas: Vec<Replica>,
    topic_errors: Mutex<BTreeMap<String, ProtocolError>>,
    describe_requests: Mutex<Vec<(i32, DescribeLogDirsRequest)>>,
    alter_requests: Mutex<Vec<(i32, AlterReplicaLogDirsRequest)>>,
}

impl MockCluster {
    /// Binds one listener per broker in `dirs` and serves until the runtime shuts down.
    pub async fn start(dirs: Dirs, layout: Layout, replicas: Vec<Replica>) -> Arc<Self> {
        let mut listeners = vec![];
        let mut addresses = BTreeMap::new();
        for id in dirs.keys() {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            addresses.insert(*id, listener.local_addr().unwrap());
            listeners.push((*id, listener));
        }

        let cluster = Arc::new(Self {
            addresses,
            dirs,
            layout,
            replicas,
            topic_errors: Mutex::new(BTreeMap::new()),
            describe_requests: Mutex::new(vec![]),
            alter_requests: Mutex::new(vec![]),
        });

        for (id, listener) in listeners {
            let cluster = Arc::clone(&cluster);
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    tokio::spawn(Arc::clone(&cluster).serve(id, stream));
                }
            });
        }

        cluster
    }

    pub fn address(&self, broker: i32) -> String {
        self.addresses[&broker].to_string()
    }

    /// Makes metadata report `error` for `topic` from now on.
    pub fn fail_topic(&self, topic: &str, error: ProtocolError) {
        self.topic_errors.lock().insert(topic.to_string(), error);
    }

    pub fn describe_requests(&self) -> Vec<(i32, DescribeLogDirsRequest)> {
        self.describe_requests.lock().clone()
    }

    pub fn alter_requests(&self) -> Vec<(i32, AlterReplicaLogDirsRequest)> {
        self.alter_requests.lock().clone()
    }

    async fn serve(self: Arc<Self>, broker: i32, mut stream: TcpStream) {
        while let Ok(message) = stream.read_message(MAX_MESSAGE_SIZE).await {
            let response = self.handle(broker, &message);
            if stream.write_message(&response).await.is_err() {
                return;
            }
        }
    }

    fn handle(&self, broker: i32, message: &[u8]) -> Vec<u8> {
        let peek = RequestHeader::read_versioned(&mut Cursor::new(message), ApiVersion(1)).unwrap();
        let version = peek.request_api_version;

        match peek.request_api_key {
            ApiKey::ApiVersions => {
                reply::<ApiVersionsRequest, _>(message, version, |_| self.api_versions())
            }
            ApiKey::Metadata => {
                reply::<MetadataRequest, _>(message, version, |request| self.metadata(request))
            }
            ApiKey::DescribeLogDirs => reply::<DescribeLogDirsRequest, _>(message, version, |request| {
                let response = self.describe_log_dirs(broker, &request);
                self.describe_requests.lock().push((broker, request));
                response
            }),
            ApiKey::AlterReplicaLogDirs => {
                reply::<AlterReplicaLogDirsRequest, _>(message, version, |request| {
                    let response = self.alter_replica_log_dirs(broker, &request);
                    self.alter_requests.lock().push((broker, request));
                    response
                })
            }
            key => panic!("unexpected request {key:?}"),
        }
    }

    fn api_versions(&self) -> ApiVersionsResponse {
        let supported = |api_key: ApiKey, max: i16| ApiVersionsResponseApiKey {
            api_key,
            min_version: ApiVersion(0),
            max_version: ApiVersion(max),
            tagged_fields: None,
        };

        ApiVersionsResponse {
            error_code: None,
            api_keys: vec![
                supported(ApiKey::Metadata, 4),
                supported(ApiKey::ApiVersions, 3),
                supported(ApiKey::AlterReplicaLogDirs, 2),
                supported(ApiKey::DescribeLogDirs, 4),
            ],
            throttle_time_ms: Some(0),
            tagged_fields: None,
        }
    }

    fn metadata(&self, request: MetadataRequest) -> MetadataResponse {
        let names: Vec<String> = match request.topics {
            Some(topics) => topics.into_iter().map(|t| t.name).collect(),
            None => self.layout.keys().map(|name| name.to_string()).collect(),
        };

        let topic_errors = self.topic_errors.lock().clone();
        let topics = names
            .into_iter()
            .map(|name| match self.layout.get(name.as_str()) {
                _ if topic_errors.contains_key(&name) => MetadataResponseTopic {
                    error: topic_errors.get(&name).copied(),
                    name,
                    is_internal: Some(false),
                    partitions: vec![],
                },
                Some(partitions) => {
                    let partitions = partitions
                        .iter()
                        .map(|(partition, leader)| MetadataResponsePartition {
                            error: None,
                            partition_index: *partition,
                            leader_id: *leader,
                            replica_nodes: self.hosts(&name, *partition),
                            isr_nodes: self.hosts(&name, *partition),
                        })
                        .collect();
                    MetadataResponseTopic {
                        error: None,
                        name,
                        is_internal: Some(false),
                        partitions,
                    }
                }
                None => MetadataResponseTopic {
                    error: Some(ProtocolError::UnknownTopicOrPartition),
                    name,
                    is_internal: Some(false),
                    partitions: vec![],
                },
            })
            .collect();

        MetadataResponse {
            throttle_time_ms: Some(0),
            brokers: self
                .addresses
                .iter()
                .map(|(id, address)| MetadataResponseBroker {
                    node_id: *id,
                    host: address.ip().to_string(),
                    port: i32::from(address.port()),
                    rack: None,
                })
                .collect(),
            cluster_id: Some("mock".to_string()),
            controller_id: Some(1),
            topics,
        }
    }

    fn hosts(&self, topic: &str, partition: i32) -> Vec<i32> {
        let mut brokers: Vec<i32> = self
            .replicas
            .iter()
            .filter(|r| r.topic == topic && r.partition == partition && !r.offsets.is_future())
            .map(|r| r.broker)
            .collect();
        brokers.dedup();
        brokers
    }

    fn describe_log_dirs(&self, broker: i32, request: &DescribeLogDirsRequest) -> DescribeLogDirsResponse {
        let selected = |topic: &str, partition: i32| match &request.topics {
            None => true,
            Some(topics) => topics
                .iter()
                .any(|t| t.topic == topic && t.partitions.contains(&partition)),
        };

        let results = self.dirs[&broker]
            .iter()
            .map(|(dir, error)| {
                let mut topics: BTreeMap<&str, Vec<DescribeLogDirsPartition>> = BTreeMap::new();
                if error.is_none() {
                    for replica in self.replicas.iter().filter(|r| {
                        r.broker == broker && r.dir == *dir && selected(r.topic, r.partition)
                    }) {
                        topics
                            .entry(replica.topic)
                            .or_default()
                            .push(DescribeLogDirsPartition {
                                partition_index: replica.partition,
                                partition_size: replica.size,
                                offset_lag: replica.offsets.offset_lag(),
                                is_future_key: replica.offsets.is_future(),
                                tagged_fields: None,
                            });
                    }
                }

                DescribeLogDirsResult {
                    error: *error,
                    log_dir: dir.to_string(),
                    topics: topics
                        .into_iter()
                        .map(|(name, partitions)| DescribeLogDirsTopic {
                            name: name.to_string(),
                            partitions,
                            tagged_fields: None,
                        })
                        .collect(),
                    total_bytes: error.is_none().then_some(1 << 30),
                    usable_bytes: error.is_none().then_some(1 << 29),
                    tagged_fields: None,
                }
            })
            .collect();

        DescribeLogDirsResponse {
            throttle_time_ms: 0,
            error: None,
            results,
            tagged_fields: None,
        }
    }

    fn alter_replica_log_dirs(
        &self,
        broker: i32,
        request: &AlterReplicaLogDirsRequest,
    ) -> AlterReplicaLogDirsResponse {
        let mut results: BTreeMap<String, Vec<AlterReplicaLogDirPartitionResult>> = BTreeMap::new();
        for dir in &request.dirs {
            let online = self.dirs[&broker]
                .iter()
                .any(|(path, error)| *path == dir.path && error.is_none());

            for topic in &dir.topics {
                for partition in &topic.partitions {
                    let hosted = self.replicas.iter().any(|r| {
                        r.broker == broker && r.topic == topic.name && r.partition == *partition
                    });
                    let error = if !online {
                        Some(ProtocolError::LogDirNotFound)
                    } else if !hosted {
                        Some(ProtocolError::ReplicaNotAvailable)
                    } else {
                        None
                    };

                    results
                        .entry(topic.name.clone())
                        .or_default()
                        .push(AlterReplicaLogDirPartitionResult {
                            partition_index: *partition,
                            error,
                            tagged_fields: None,
                        });
                }
            }
        }

        AlterReplicaLogDirsResponse {
            throttle_time_ms: 0,
            results: results
                .into_iter()
                .map(|(topic_name, partitions)| AlterReplicaLogDirTopicResult {
                    topic_name,
                    partitions,
                    tagged_fields: None,
                })
                .collect(),
            tagged_fields: None,
        }
    }
}

/// Decodes a request of type `T`, answers it with `f` and encodes the response including its header.
fn reply<T, F>(message: &[u8], version: ApiVersion, f: F) -> Vec<u8>
where
    T: RequestBody + for<'a> ReadVersionedType<Cursor<&'a [u8]>>,
    T::ResponseBody: WriteVersionedType<Vec<u8>>,
    F: FnOnce(T) -> T::ResponseBody,
{
    let request_header_version =
        RequestHeader::version(version >= T::FIRST_TAGGED_FIELD_IN_REQUEST_VERSION);
    let response_header_version =
        ResponseHeader::version(version >= T::FIRST_TAGGED_FIELD_IN_RESPONSE_VERSION);

    let mut cursor = Cursor::new(message);
    let header = RequestHeader::read_versioned(&mut cursor, request_header_version).unwrap();
    let request = T::read_versioned(&mut cursor, version).unwrap();
    assert_eq!(cursor.position() as usize, message.len(), "trailing request bytes");

    let response = f(request);

    let mut buf = vec![];
    ResponseHeader {
        correlation_id: header.correlation_id,
        tagged_fields: None,
    }
    .write_versioned(&mut buf, response_header_version)
    .unwrap();
    response.write_versioned(&mut buf, version).unwrap();
    buf
}
