use std::io::{Read, Write};

use super::{
    read_array, write_array, ReadVersionedError, ReadVersionedType, RequestBody,
    WriteVersionedError, WriteVersionedType,
};
use crate::protocol::{
    api_key::ApiKey,
    api_version::{ApiVersion, ApiVersionRange},
    error::Error,
    primitives::TaggedFields,
    traits::{ReadCompactType, ReadType, WriteCompactType, WriteType},
};

#[cfg(test)]
use proptest::prelude::*;

const FIRST_FLEXIBLE_VERSION: i16 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterReplicaLogDirsRequest {
    /// The alterations to make for each directory.
    ///
    /// Brokers expect every path at most once.
    pub dirs: Vec<AlterReplicaLogDir>,

    /// The tagged fields.
    ///
    /// Added in version 2
    pub tagged_fields: Option<TaggedFields>,
}

impl RequestBody for AlterReplicaLogDirsRequest {
    type ResponseBody = AlterReplicaLogDirsResponse;

    const API_KEY: ApiKey = ApiKey::AlterReplicaLogDirs;

    const API_VERSION_RANGE: ApiVersionRange = ApiVersionRange::new(0, 2);

    const FIRST_TAGGED_FIELD_IN_REQUEST_VERSION: ApiVersion = ApiVersion(FIRST_FLEXIBLE_VERSION);
}

impl<W> WriteVersionedType<W> for AlterReplicaLogDirsRequest
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        let v = version.0;
        assert!(v <= 2);
        let flexible = v >= FIRST_FLEXIBLE_VERSION;

        write_array(writer, version, flexible, Some(&self.dirs))?;
        if flexible {
            self.tagged_fields.write(writer)?;
        }

        Ok(())
    }
}

impl<R> ReadVersionedType<R> for AlterReplicaLogDirsRequest
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0;
        assert!(v <= 2);
        let flexible = v >= FIRST_FLEXIBLE_VERSION;

        Ok(Self {
            dirs: read_array(reader, version, flexible)?.unwrap_or_default(),
            tagged_fields: flexible.then(|| TaggedFields::read(reader)).transpose()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterReplicaLogDir {
    /// The absolute directory path.
    pub path: String,

    /// The topics to add to the directory.
    pub topics: Vec<AlterReplicaLogDirTopic>,

    /// The tagged fields.
    ///
    /// Added in version 2
    pub tagged_fields: Option<TaggedFields>,
}

impl<W> WriteVersionedType<W> for AlterReplicaLogDir
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        let v = version.0;
        assert!(v <= 2);
        let flexible = v >= FIRST_FLEXIBLE_VERSION;

        if flexible {
            self.path.write_compact(writer)?;
        } else {
            self.path.write(writer)?;
        }
        write_array(writer, version, flexible, Some(&self.topics))?;
        if flexible {
            self.tagged_fields.write(writer)?;
        }

        Ok(())
    }
}

impl<R> ReadVersionedType<R> for AlterReplicaLogDir
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0;
        assert!(v <= 2);
        let flexible = v >= FIRST_FLEXIBLE_VERSION;

        let path = if flexible {
            String::read_compact(reader)?
        } else {
            String::read(reader)?
        };
        let topics = read_array(reader, version, flexible)?.unwrap_or_default();
        let tagged_fields = flexible.then(|| TaggedFields::read(reader)).transpose()?;

        Ok(Self {
            path,
            topics,
            tagged_fields,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterReplicaLogDirTopic {
    /// The topic name.
    pub name: String,

    /// The partition indexes.
    pub partitions: Vec<i32>,

    /// The tagged fields.
    ///
    /// Added in version 2
    pub tagged_fields: Option<TaggedFields>,
}

impl<W> WriteVersionedType<W> for AlterReplicaLogDirTopic
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        let v = version.0;
        assert!(v <= 2);

        if v >= FIRST_FLEXIBLE_VERSION {
            self.name.write_compact(writer)?;
            self.partitions.write_compact(writer)?;
            self.tagged_fields.write(writer)?;
        } else {
            self.name.write(writer)?;
            self.partitions.write(writer)?;
        }

        Ok(())
    }
}

impl<R> ReadVersionedType<R> for AlterReplicaLogDirTopic
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0;
        assert!(v <= 2);

        if v >= FIRST_FLEXIBLE_VERSION {
            Ok(Self {
                name: String::read_compact(reader)?,
                partitions: Vec::<i32>::read_compact(reader)?,
                tagged_fields: Some(TaggedFields::read(reader)?),
            })
        } else {
            Ok(Self {
                name: String::read(reader)?,
                partitions: Vec::<i32>::read(reader)?,
                tagged_fields: None,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct AlterReplicaLogDirsResponse {
    /// Duration in milliseconds for which the request was throttled due to a quota violation, or zero if the request
    /// did not violate any quota.
    pub throttle_time_ms: i32,

    /// The results for each topic.
    #[cfg_attr(
        test,
        proptest(strategy = "prop::collection::vec(any::<AlterReplicaLogDirTopicResult>(), 0..3)")
    )]
    pub results: Vec<AlterReplicaLogDirTopicResult>,

    /// The tagged fields.
    ///
    /// Added in version 2
    pub tagged_fields: Option<TaggedFields>,
}

impl<R> ReadVersionedType<R> for AlterReplicaLogDirsResponse
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0;
        assert!(v <= 2);
        let flexible = v >= FIRST_FLEXIBLE_VERSION;

        Ok(Self {
            throttle_time_ms: i32::read(reader)?,
            results: read_array(reader, version, flexible)?.unwrap_or_default(),
            tagged_fields: flexible.then(|| TaggedFields::read(reader)).transpose()?,
        })
    }
}

impl<W> WriteVersionedType<W> for AlterReplicaLogDirsResponse
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        let v = version.0;
        assert!(v <= 2);
        let flexible = v >= FIRST_FLEXIBLE_VERSION;

        self.throttle_time_ms.write(writer)?;
        write_array(writer, version, flexible, Some(&self.results))?;
        if flexible {
            self.tagged_fields.write(writer)?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct AlterReplicaLogDirTopicResult {
    /// The name of the topic.
    pub topic_name: String,

    /// The results for each partition.
    #[cfg_attr(
        test,
        proptest(
            strategy = "prop::collection::vec(any::<AlterReplicaLogDirPartitionResult>(), 0..3)"
        )
    )]
    pub partitions: Vec<AlterReplicaLogDirPartitionResult>,

    /// The tagged fields.
    ///
    /// Added in version 2
    pub tagged_fields: Option<TaggedFields>,
}

impl<R> ReadVersionedType<R> for AlterReplicaLogDirTopicResult
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0;
        assert!(v <= 2);
        let flexible = v >= FIRST_FLEXIBLE_VERSION;

        let topic_name = if flexible {
            String::read_compact(reader)?
        } else {
            String::read(reader)?
        };
        let partitions = read_array(reader, version, flexible)?.unwrap_or_default();
        let tagged_fields = flexible.then(|| TaggedFields::read(reader)).transpose()?;

        Ok(Self {
            topic_name,
            partitions,
            tagged_fields,
        })
    }
}

impl<W> WriteVersionedType<W> for AlterReplicaLogDirTopicResult
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        let v = version.0;
        assert!(v <= 2);
        let flexible = v >= FIRST_FLEXIBLE_VERSION;

        if flexible {
            self.topic_name.write_compact(writer)?;
        } else {
            self.topic_name.write(writer)?;
        }
        write_array(writer, version, flexible, Some(&self.partitions))?;
        if flexible {
            self.tagged_fields.write(writer)?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct AlterReplicaLogDirPartitionResult {
    /// The partition index.
    pub partition_index: i32,

    /// The error for this partition, if any.
    #[cfg_attr(test, proptest(strategy = "any::<i16>().prop_map(Error::new)"))]
    pub error: Option<Error>,

    /// The tagged fields.
    ///
    /// Added in version 2
    pub tagged_fields: Option<TaggedFields>,
}

impl<R> ReadVersionedType<R> for AlterReplicaLogDirPartitionResult
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0;
        assert!(v <= 2);

        Ok(Self {
            partition_index: i32::read(reader)?,
            error: Error::new(i16::read(reader)?),
            tagged_fields: (v >= FIRST_FLEXIBLE_VERSION)
                .then(|| TaggedFields::read(reader))
                .transpose()?,
        })
    }
}

impl<W> WriteVersionedType<W> for AlterReplicaLogDirPartitionResult
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        let v = version.0;
        assert!(v <= 2);

        self.partition_index.write(writer)?;
        self.error.map(|e| e.code()).unwrap_or(0).write(writer)?;
        if v >= FIRST_FLEXIBLE_VERSION {
            self.tagged_fields.write(writer)?;
        }

        Ok(())
    }
}
