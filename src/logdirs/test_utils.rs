use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::resolve::MetadataLookup;
use crate::client::{error::Error as ClientError, target::LogDirTarget};
use crate::protocol::messages::{
    AlterReplicaLogDirTopicResult, AlterReplicaLogDirsRequest, DescribeLogDirsRequest,
    DescribeLogDirsResult,
};

/// Metadata lookup backed by a fixed topic layout.
#[derive(Debug, Default)]
pub struct FakeLookup {
    pub topics: BTreeMap<String, Vec<i32>>,
    pub calls: AtomicUsize,
    pub requested: Mutex<Vec<String>>,
    pub fail: bool,
}

impl FakeLookup {
    pub fn with(topics: &[(&str, &[i32])]) -> Self {
        Self {
            topics: topics
                .iter()
                .map(|(topic, partitions)| (topic.to_string(), partitions.to_vec()))
                .collect(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataLookup for FakeLookup {
    async fn partitions(
        &self,
        topics: &[String],
    ) -> Result<BTreeMap<String, Vec<i32>>, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().extend(topics.iter().cloned());

        if self.fail {
            return Err(ClientError::UnknownBroker(3));
        }
        Ok(topics
            .iter()
            .filter_map(|t| self.topics.get(t).map(|p| (t.clone(), p.clone())))
            .collect())
    }
}

/// Records requests and answers with canned results.
#[derive(Debug, Default)]
pub struct FakeTarget {
    pub describe_results: Vec<DescribeLogDirsResult>,
    pub alter_results: Vec<AlterReplicaLogDirTopicResult>,
    pub describe_requests: Mutex<Vec<DescribeLogDirsRequest>>,
    pub alter_requests: Mutex<Vec<AlterReplicaLogDirsRequest>>,
    pub fail: bool,
}

#[async_trait]
impl LogDirTarget for FakeTarget {
    async fn describe_log_dirs(
        &self,
        request: DescribeLogDirsRequest,
    ) -> Result<Vec<DescribeLogDirsResult>, ClientError> {
        self.describe_requests.lock().push(request);
        if self.fail {
            return Err(ClientError::UnknownBroker(7));
        }
        Ok(self.describe_results.clone())
    }

    async fn alter_replica_log_dirs(
        &self,
        request: AlterReplicaLogDirsRequest,
    ) -> Result<Vec<AlterReplicaLogDirTopicResult>, ClientError> {
        self.alter_requests.lock().push(request);
        if self.fail {
            return Err(ClientError::UnknownBroker(7));
        }
        Ok(self.alter_results.clone())
    }
}
