//! Describing where partitions are stored.

use tracing::debug;

use super::{
    error::{Error, Result},
    model::{normalize_log_dirs, LogDirDescriptor},
    resolve::{resolve_partitions, MetadataLookup, ResolvedSpec},
    spec::TopicPartitionSpec,
};
use crate::client::target::LogDirTarget;
use crate::protocol::messages::{DescribableLogDirTopic, DescribeLogDirsRequest};

/// Builds a request for the given scope, `None` describes every directory of the target.
pub fn build_request(scope: Option<ResolvedSpec>) -> DescribeLogDirsRequest {
    DescribeLogDirsRequest {
        topics: scope.map(|spec| {
            spec.into_iter()
                .map(|(topic, partitions)| DescribableLogDirTopic {
                    topic,
                    partitions: partitions.into_iter().collect(),
                    tagged_fields: None,
                })
                .collect()
        }),
        tagged_fields: None,
    }
}

/// Describes the log directories holding the partitions selected by `tokens`.
///
/// Without tokens every directory of the target is described. The result is normalized, see
/// [`normalize_log_dirs`].
pub async fn describe<S>(
    tokens: &[S],
    lookup: &dyn MetadataLookup,
    target: &dyn LogDirTarget,
) -> Result<Vec<LogDirDescriptor>>
where
    S: AsRef<str> + Sync,
{
    let scope = if tokens.is_empty() {
        None
    } else {
        let spec = TopicPartitionSpec::parse(tokens)?;
        Some(resolve_partitions(spec, lookup).await?)
    };

    let request = build_request(scope);
    debug!(
        topics = request.topics.as_ref().map(|t| t.len()),
        "Describing log dirs",
    );

    let results = target
        .describe_log_dirs(request)
        .await
        .map_err(Error::Describe)?;

    let mut dirs: Vec<LogDirDescriptor> = results.into_iter().map(Into::into).collect();
    normalize_log_dirs(&mut dirs);
    Ok(dirs)
}
