//! Normalized results of describe and move requests.

use serde::{Serialize, Serializer};

use crate::protocol::{
    error::Error as ProtocolError,
    messages::{
        AlterReplicaLogDirTopicResult, DescribeLogDirsPartition, DescribeLogDirsResult,
        DescribeLogDirsTopic,
    },
};

#[cfg(test)]
use proptest::prelude::*;

/// One log directory on one broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct LogDirDescriptor {
    /// Absolute path of the directory.
    pub path: String,

    /// Directory-level failure, e.g. the directory is offline.
    ///
    /// When set, [`topics`](Self::topics) carries no meaningful data.
    #[serde(serialize_with = "serialize_error")]
    #[cfg_attr(test, proptest(strategy = "any::<i16>().prop_map(ProtocolError::new)"))]
    pub error: Option<ProtocolError>,

    #[cfg_attr(
        test,
        proptest(strategy = "prop::collection::vec(any::<TopicDirEntry>(), 0..4)")
    )]
    pub topics: Vec<TopicDirEntry>,

    /// Size of the volume holding the directory, if the broker reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<i64>,

    /// Usable space on the volume holding the directory, if the broker reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usable_bytes: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct TopicDirEntry {
    pub topic: String,

    #[cfg_attr(
        test,
        proptest(strategy = "prop::collection::vec(any::<PartitionDirEntry>(), 0..4)")
    )]
    pub partitions: Vec<PartitionDirEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct PartitionDirEntry {
    pub partition: i32,

    /// Bytes of log segments of this partition in this directory.
    pub size: i64,

    /// See [`ReplicaOffsets::offset_lag`], computed by the broker.
    pub offset_lag: i64,

    /// The directory will replace the current log of the replica once it caught up.
    pub is_future: bool,
}

/// Outcome of moving one partition replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveOutcome {
    pub topic: String,
    pub partition: i32,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<ProtocolError>,
}

/// Log end offsets a broker uses to compute the offset lag of a replica in a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicaOffsets {
    /// The current log of the replica.
    Current {
        high_watermark: i64,
        log_end_offset: i64,
    },

    /// A future log, catching up with the current log of the same replica.
    Future {
        local_log_end_offset: i64,
        future_log_end_offset: i64,
    },
}

impl ReplicaOffsets {
    /// How far the log in this directory is behind.
    ///
    /// A current log that is ahead of the high watermark has no lag, a future log is compared to the current one
    /// as is.
    pub fn offset_lag(&self) -> i64 {
        match *self {
            Self::Current {
                high_watermark,
                log_end_offset,
            } => (high_watermark - log_end_offset).max(0),
            Self::Future {
                local_log_end_offset,
                future_log_end_offset,
            } => local_log_end_offset - future_log_end_offset,
        }
    }

    pub fn is_future(&self) -> bool {
        matches!(self, Self::Future { .. })
    }
}

impl From<DescribeLogDirsResult> for LogDirDescriptor {
    fn from(result: DescribeLogDirsResult) -> Self {
        Self {
            path: result.log_dir,
            error: result.error,
            topics: result.topics.into_iter().map(Into::into).collect(),
            // -1 means the broker does not know
            total_bytes: result.total_bytes.filter(|b| *b >= 0),
            usable_bytes: result.usable_bytes.filter(|b| *b >= 0),
        }
    }
}

impl From<DescribeLogDirsTopic> for TopicDirEntry {
    fn from(topic: DescribeLogDirsTopic) -> Self {
        Self {
            topic: topic.name,
            partitions: topic.partitions.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<DescribeLogDirsPartition> for PartitionDirEntry {
    fn from(partition: DescribeLogDirsPartition) -> Self {
        Self {
            partition: partition.partition_index,
            size: partition.partition_size,
            offset_lag: partition.offset_lag,
            is_future: partition.is_future_key,
        }
    }
}

/// Flattens move results into one outcome per partition.
pub fn move_outcomes(results: Vec<AlterReplicaLogDirTopicResult>) -> Vec<MoveOutcome> {
    results
        .into_iter()
        .flat_map(|topic| {
            let name = topic.topic_name;
            topic
                .partitions
                .into_iter()
                .map(move |partition| MoveOutcome {
                    topic: name.clone(),
                    partition: partition.partition_index,
                    error: partition.error,
                })
        })
        .collect()
}

/// Sorts directories by path, their topics by name and those partitions by index.
///
/// The sort is stable, so directories with the same path (reported by different brokers) keep their order and
/// normalizing twice changes nothing.
pub fn normalize_log_dirs(dirs: &mut [LogDirDescriptor]) {
    dirs.sort_by(|a, b| a.path.cmp(&b.path));
    for dir in dirs {
        dir.topics.sort_by(|a, b| a.topic.cmp(&b.topic));
        for topic in &mut dir.topics {
            topic.partitions.sort_by_key(|p| p.partition);
        }
    }
}

/// Sorts outcomes by topic, then partition.
pub fn normalize_outcomes(outcomes: &mut [MoveOutcome]) {
    outcomes.sort_by(|a, b| (&a.topic, a.partition).cmp(&(&b.topic, b.partition)));
}

#[derive(Serialize)]
struct ErrorView {
    code: i16,
    name: &'static str,
    message: String,
}

fn serialize_error<S>(error: &Option<ProtocolError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    error
        .map(|e| ErrorView {
            code: e.code(),
            name: e.name(),
            message: e.to_string(),
        })
        .serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::AlterReplicaLogDirPartitionResult;

    fn partition(partition: i32) -> PartitionDirEntry {
        PartitionDirEntry {
            partition,
            size: 0,
            offset_lag: 0,
            is_future: false,
        }
    }

    fn dir(path: &str, topics: Vec<TopicDirEntry>) -> LogDirDescriptor {
        LogDirDescriptor {
            path: path.to_string(),
            error: None,
            topics,
            total_bytes: None,
            usable_bytes: None,
        }
    }

    #[test]
    fn offset_lag_of_current_log_is_floored() {
        let lag = |high_watermark, log_end_offset| {
            ReplicaOffsets::Current {
                high_watermark,
                log_end_offset,
            }
            .offset_lag()
        };
        assert_eq!(lag(100, 120), 0);
        assert_eq!(lag(100, 80), 20);
        assert_eq!(lag(100, 100), 0);
    }

    #[test]
    fn offset_lag_of_future_log() {
        let offsets = ReplicaOffsets::Future {
            local_log_end_offset: 500,
            future_log_end_offset: 320,
        };
        assert_eq!(offsets.offset_lag(), 180);
        assert!(offsets.is_future());
    }

    #[test]
    fn normalize_sorts_every_level() {
        let mut dirs = vec![
            dir(
                "/b",
                vec![TopicDirEntry {
                    topic: "t".to_string(),
                    partitions: vec![partition(0)],
                }],
            ),
            dir(
                "/a",
                vec![
                    TopicDirEntry {
                        topic: "z".to_string(),
                        partitions: vec![partition(2), partition(0), partition(1)],
                    },
                    TopicDirEntry {
                        topic: "y".to_string(),
                        partitions: vec![],
                    },
                ],
            ),
        ];

        normalize_log_dirs(&mut dirs);

        assert_eq!(
            dirs.iter().map(|d| d.path.as_str()).collect::<Vec<_>>(),
            vec!["/a", "/b"]
        );
        assert_eq!(
            dirs[0]
                .topics
                .iter()
                .map(|t| t.topic.as_str())
                .collect::<Vec<_>>(),
            vec!["y", "z"]
        );
        assert_eq!(
            dirs[0].topics[1]
                .partitions
                .iter()
                .map(|p| p.partition)
                .collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn unknown_volume_size_is_dropped() {
        let descriptor = LogDirDescriptor::from(DescribeLogDirsResult {
            error: None,
            log_dir: "/a".to_string(),
            topics: vec![],
            total_bytes: Some(-1),
            usable_bytes: Some(512),
            tagged_fields: None,
        });
        assert_eq!(descriptor.total_bytes, None);
        assert_eq!(descriptor.usable_bytes, Some(512));
    }

    #[test]
    fn outcomes_are_flattened_and_sorted() {
        let mut outcomes = move_outcomes(vec![
            AlterReplicaLogDirTopicResult {
                topic_name: "foo".to_string(),
                partitions: vec![
                    AlterReplicaLogDirPartitionResult {
                        partition_index: 2,
                        error: ProtocolError::new(57),
                        tagged_fields: None,
                    },
                    AlterReplicaLogDirPartitionResult {
                        partition_index: 1,
                        error: None,
                        tagged_fields: None,
                    },
                ],
                tagged_fields: None,
            },
            AlterReplicaLogDirTopicResult {
                topic_name: "bar".to_string(),
                partitions: vec![AlterReplicaLogDirPartitionResult {
                    partition_index: 3,
                    error: None,
                    tagged_fields: None,
                }],
                tagged_fields: None,
            },
        ]);
        normalize_outcomes(&mut outcomes);

        assert_eq!(
            outcomes
                .iter()
                .map(|o| (o.topic.as_str(), o.partition, o.error))
                .collect::<Vec<_>>(),
            vec![
                ("bar", 3, None),
                ("foo", 1, None),
                ("foo", 2, Some(ProtocolError::LogDirNotFound)),
            ]
        );
    }

    #[test]
    fn json_shape() {
        let descriptor = LogDirDescriptor {
            path: "/a".to_string(),
            error: Some(ProtocolError::KafkaStorageError),
            topics: vec![],
            total_bytes: Some(1024),
            usable_bytes: None,
        };

        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "path": "/a",
                "error": {
                    "code": 56,
                    "name": "KAFKA_STORAGE_ERROR",
                    "message": "KAFKA_STORAGE_ERROR: Disk error when trying to access log file on the disk.",
                },
                "topics": [],
                "total_bytes": 1024,
            })
        );
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(
            mut dirs in prop::collection::vec(any::<LogDirDescriptor>(), 0..5),
        ) {
            normalize_log_dirs(&mut dirs);
            let once = dirs.clone();
            normalize_log_dirs(&mut dirs);
            prop_assert_eq!(once, dirs);
        }

        #[test]
        fn current_offset_lag_is_never_negative(high_watermark in 0..i64::MAX / 2, log_end_offset in 0..i64::MAX / 2) {
            let lag = ReplicaOffsets::Current { high_watermark, log_end_offset }.offset_lag();
            prop_assert!(lag >= 0);
        }
    }
}
