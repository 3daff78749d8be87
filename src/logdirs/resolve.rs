//! Expands "all partitions" selections through a metadata lookup.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tracing::debug;

use super::{
    error::{Error, Result},
    spec::{PartitionSelector, TopicPartitionSpec},
};
use crate::client::error::{Error as ClientError, ProtocolError, RequestContext};

/// Topics mapped to a concrete set of partitions.
pub type ResolvedSpec = BTreeMap<String, BTreeSet<i32>>;

/// Source of the partition layout of topics.
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    /// Returns the partition IDs of every requested topic.
    ///
    /// Topics the cluster does not know may be missing from the result.
    async fn partitions(
        &self,
        topics: &[String],
    ) -> Result<BTreeMap<String, Vec<i32>>, ClientError>;
}

/// Replaces every [`PartitionSelector::All`] in `spec` with the partitions the cluster reports.
///
/// At most one lookup is issued, covering exactly the topics that need it.
pub async fn resolve_partitions(
    spec: TopicPartitionSpec,
    lookup: &dyn MetadataLookup,
) -> Result<ResolvedSpec> {
    let unresolved = spec.unresolved_topics();
    let mut known = if unresolved.is_empty() {
        BTreeMap::new()
    } else {
        debug!(topics = ?unresolved, "Looking up partitions");
        lookup
            .partitions(&unresolved)
            .await
            .map_err(Error::Metadata)?
    };

    spec.into_iter()
        .map(|(topic, selector)| {
            let partitions = match selector {
                PartitionSelector::Explicit(partitions) => partitions,
                PartitionSelector::All => match known.remove(&topic) {
                    Some(partitions) => partitions.into_iter().collect(),
                    None => {
                        return Err(Error::Metadata(ClientError::ServerError {
                            protocol_error: ProtocolError::UnknownTopicOrPartition,
                            error_message: None,
                            request: RequestContext::Topic(topic),
                        }))
                    }
                },
            };
            Ok((topic, partitions))
        })
        .collect()
}
