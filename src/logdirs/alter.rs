//! Moving partition replicas between log directories.

use std::collections::BTreeMap;

use tracing::debug;

use super::{
    error::{Error, Result},
    model::{move_outcomes, normalize_outcomes, MoveOutcome},
    resolve::ResolvedSpec,
    spec::{parse_token, PartitionSelector},
};
use crate::client::target::LogDirTarget;
use crate::protocol::messages::{AlterReplicaLogDir, AlterReplicaLogDirTopic, AlterReplicaLogDirsRequest};

/// Destination directory mapped to the partitions that should move there.
pub type DestinationGroup = BTreeMap<String, ResolvedSpec>;

/// Parses `topic:p1,p2=/dest` tokens and groups them by destination.
///
/// The same topic moving to the same destination in several tokens has its partitions merged.
pub fn parse_destinations<I, S>(tokens: I) -> Result<DestinationGroup>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut group = DestinationGroup::new();

    for token in tokens {
        let token = token.as_ref();

        let parts: Vec<&str> = token.split('=').collect();
        let &[spec, destination] = parts.as_slice() else {
            return Err(Error::InvalidDestination {
                token: token.to_string(),
                parts: parts.len(),
            });
        };

        if destination.is_empty() {
            return Err(Error::EmptyDestination {
                token: token.to_string(),
            });
        }

        let (topic, selector) = parse_token(spec).map_err(|source| Error::Syntax {
            token: token.to_string(),
            source,
        })?;
        let PartitionSelector::Explicit(partitions) = selector else {
            return Err(Error::MissingPartitions {
                token: token.to_string(),
            });
        };

        group
            .entry(destination.to_string())
            .or_default()
            .entry(topic)
            .or_default()
            .extend(partitions);
    }

    Ok(group)
}

/// One request entry per destination directory.
pub fn build_request(group: DestinationGroup) -> AlterReplicaLogDirsRequest {
    AlterReplicaLogDirsRequest {
        dirs: group
            .into_iter()
            .map(|(path, topics)| AlterReplicaLogDir {
                path,
                topics: topics
                    .into_iter()
                    .map(|(name, partitions)| AlterReplicaLogDirTopic {
                        name,
                        partitions: partitions.into_iter().collect(),
                        tagged_fields: None,
                    })
                    .collect(),
                tagged_fields: None,
            })
            .collect(),
        tagged_fields: None,
    }
}

/// Moves the replicas named by `tokens` and reports one outcome per partition.
///
/// Malformed tokens fail before anything is sent. Brokers refusing individual moves is not an error, see
/// [`MoveOutcome::error`].
pub async fn alter<S>(tokens: &[S], target: &dyn LogDirTarget) -> Result<Vec<MoveOutcome>>
where
    S: AsRef<str> + Sync,
{
    let group = parse_destinations(tokens)?;
    if group.is_empty() {
        return Ok(vec![]);
    }

    debug!(destinations = group.len(), "Moving replicas");

    let results = target
        .alter_replica_log_dirs(build_request(group))
        .await
        .map_err(Error::Alter)?;

    let mut outcomes = move_outcomes(results);
    normalize_outcomes(&mut outcomes);
    Ok(outcomes)
}
