use std::collections::BTreeMap;

use crate::protocol::messages::MetadataResponseTopic;

/// Partition layout of one topic as reported by the metadata API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    /// The name of this topic.
    pub name: String,

    /// Partition information
    pub partitions: BTreeMap<i32, Partition>,
}

impl Topic {
    /// Partition IDs in ascending order.
    pub fn partition_ids(&self) -> Vec<i32> {
        self.partitions.keys().copied().collect()
    }
}

impl From<MetadataResponseTopic> for Topic {
    fn from(topic: MetadataResponseTopic) -> Self {
        Self {
            name: topic.name,
            partitions: topic
                .partitions
                .into_iter()
                .map(|p| {
                    (
                        p.partition_index,
                        Partition {
                            leader_id: p.leader_id,
                        },
                    )
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Partition {
    /// The ID of the leader broker, negative while there is none.
    pub leader_id: i32,
}

impl Partition {
    pub fn leader(&self) -> Option<i32> {
        (self.leader_id >= 0).then_some(self.leader_id)
    }
}
