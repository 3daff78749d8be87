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

/// Version 2 switched to the flexible encoding.
const FIRST_FLEXIBLE_VERSION: i16 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeLogDirsRequest {
    /// Each topic that we want to describe log directories for.
    ///
    /// `None` asks for every directory and every partition, which is not the same as an empty list.
    pub topics: Option<Vec<DescribableLogDirTopic>>,

    /// The tagged fields.
    ///
    /// Added in version 2
    pub tagged_fields: Option<TaggedFields>,
}

impl RequestBody for DescribeLogDirsRequest {
    type ResponseBody = DescribeLogDirsResponse;

    const API_KEY: ApiKey = ApiKey::DescribeLogDirs;

    const API_VERSION_RANGE: ApiVersionRange = ApiVersionRange::new(0, 4);

    const FIRST_TAGGED_FIELD_IN_REQUEST_VERSION: ApiVersion = ApiVersion(FIRST_FLEXIBLE_VERSION);
}

impl<W> WriteVersionedType<W> for DescribeLogDirsRequest
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        let v = version.0;
        assert!(v <= 4);
        let flexible = v >= FIRST_FLEXIBLE_VERSION;

        write_array(writer, version, flexible, self.topics.as_deref())?;
        if flexible {
            self.tagged_fields.write(writer)?;
        }

        Ok(())
    }
}

impl<R> ReadVersionedType<R> for DescribeLogDirsRequest
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0;
        assert!(v <= 4);
        let flexible = v >= FIRST_FLEXIBLE_VERSION;

        Ok(Self {
            topics: read_array(reader, version, flexible)?,
            tagged_fields: flexible.then(|| TaggedFields::read(reader)).transpose()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribableLogDirTopic {
    /// The topic name
    pub topic: String,

    /// The partition indexes.
    pub partitions: Vec<i32>,

    /// The tagged fields.
    ///
    /// Added in version 2
    pub tagged_fields: Option<TaggedFields>,
}

impl<W> WriteVersionedType<W> for DescribableLogDirTopic
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        let v = version.0;
        assert!(v <= 4);

        if v >= FIRST_FLEXIBLE_VERSION {
            self.topic.write_compact(writer)?;
            self.partitions.write_compact(writer)?;
            self.tagged_fields.write(writer)?;
        } else {
            self.topic.write(writer)?;
            self.partitions.write(writer)?;
        }

        Ok(())
    }
}

impl<R> ReadVersionedType<R> for DescribableLogDirTopic
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0;
        assert!(v <= 4);

        if v >= FIRST_FLEXIBLE_VERSION {
            Ok(Self {
                topic: String::read_compact(reader)?,
                partitions: Vec::<i32>::read_compact(reader)?,
                tagged_fields: Some(TaggedFields::read(reader)?),
            })
        } else {
            Ok(Self {
                topic: String::read(reader)?,
                partitions: Vec::<i32>::read(reader)?,
                tagged_fields: None,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct DescribeLogDirsResponse {
    /// The duration in milliseconds for which the request was throttled due to a quota violation, or zero if the
    /// request did not violate any quota.
    pub throttle_time_ms: i32,

    /// The top-level error code.
    ///
    /// Added in version 3
    #[cfg_attr(test, proptest(strategy = "any::<i16>().prop_map(Error::new)"))]
    pub error: Option<Error>,

    /// The log directories.
    #[cfg_attr(
        test,
        proptest(strategy = "prop::collection::vec(any::<DescribeLogDirsResult>(), 0..2)")
    )]
    pub results: Vec<DescribeLogDirsResult>,

    /// The tagged fields.
    ///
    /// Added in version 2
    pub tagged_fields: Option<TaggedFields>,
}

impl<R> ReadVersionedType<R> for DescribeLogDirsResponse
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0;
        assert!(v <= 4);
        let flexible = v >= FIRST_FLEXIBLE_VERSION;

        let throttle_time_ms = i32::read(reader)?;
        let error = if v >= 3 {
            Error::new(i16::read(reader)?)
        } else {
            None
        };
        let results = read_array(reader, version, flexible)?.unwrap_or_default();
        let tagged_fields = flexible.then(|| TaggedFields::read(reader)).transpose()?;

        Ok(Self {
            throttle_time_ms,
            error,
            results,
            tagged_fields,
        })
    }
}

impl<W> WriteVersionedType<W> for DescribeLogDirsResponse
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        let v = version.0;
        assert!(v <= 4);
        let flexible = v >= FIRST_FLEXIBLE_VERSION;

        if v < 3 && self.error.is_some() {
            return Err(WriteVersionedError::FieldNotAvailable {
                version,
                field: "error_code".to_string(),
            });
        }

        self.throttle_time_ms.write(writer)?;
        if v >= 3 {
            self.error.map(|e| e.code()).unwrap_or(0).write(writer)?;
        }
        write_array(writer, version, flexible, Some(&self.results))?;
        if flexible {
            self.tagged_fields.write(writer)?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct DescribeLogDirsResult {
    /// The error for this directory, e.g. `KAFKA_STORAGE_ERROR` when it is offline.
    #[cfg_attr(test, proptest(strategy = "any::<i16>().prop_map(Error::new)"))]
    pub error: Option<Error>,

    /// The absolute log directory path.
    pub log_dir: String,

    /// Each topic.
    #[cfg_attr(
        test,
        proptest(strategy = "prop::collection::vec(any::<DescribeLogDirsTopic>(), 0..2)")
    )]
    pub topics: Vec<DescribeLogDirsTopic>,

    /// The total size in bytes of the volume the log directory is in, -1 if unknown.
    ///
    /// Added in version 4
    pub total_bytes: Option<i64>,

    /// The usable size in bytes of the volume the log directory is in, -1 if unknown.
    ///
    /// Added in version 4
    pub usable_bytes: Option<i64>,

    /// The tagged fields.
    ///
    /// Added in version 2
    pub tagged_fields: Option<TaggedFields>,
}

impl<R> ReadVersionedType<R> for DescribeLogDirsResult
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0;
        assert!(v <= 4);
        let flexible = v >= FIRST_FLEXIBLE_VERSION;

        let error = Error::new(i16::read(reader)?);
        let log_dir = if flexible {
            String::read_compact(reader)?
        } else {
            String::read(reader)?
        };
        let topics = read_array(reader, version, flexible)?.unwrap_or_default();
        let total_bytes = (v >= 4).then(|| i64::read(reader)).transpose()?;
        let usable_bytes = (v >= 4).then(|| i64::read(reader)).transpose()?;
        let tagged_fields = flexible.then(|| TaggedFields::read(reader)).transpose()?;

        Ok(Self {
            error,
            log_dir,
            topics,
            total_bytes,
            usable_bytes,
            tagged_fields,
        })
    }
}

impl<W> WriteVersionedType<W> for DescribeLogDirsResult
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        let v = version.0;
        assert!(v <= 4);
        let flexible = v >= FIRST_FLEXIBLE_VERSION;

        self.error.map(|e| e.code()).unwrap_or(0).write(writer)?;
        if flexible {
            self.log_dir.write_compact(writer)?;
        } else {
            self.log_dir.write(writer)?;
        }
        write_array(writer, version, flexible, Some(&self.topics))?;
        if v >= 4 {
            self.total_bytes.unwrap_or(-1).write(writer)?;
            self.usable_bytes.unwrap_or(-1).write(writer)?;
        }
        if flexible {
            self.tagged_fields.write(writer)?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct DescribeLogDirsTopic {
    /// The topic name.
    pub name: String,

    #[cfg_attr(
        test,
        proptest(strategy = "prop::collection::vec(any::<DescribeLogDirsPartition>(), 0..3)")
    )]
    pub partitions: Vec<DescribeLogDirsPartition>,

    /// The tagged fields.
    ///
    /// Added in version 2
    pub tagged_fields: Option<TaggedFields>,
}

impl<R> ReadVersionedType<R> for DescribeLogDirsTopic
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0;
        assert!(v <= 4);
        let flexible = v >= FIRST_FLEXIBLE_VERSION;

        let name = if flexible {
            String::read_compact(reader)?
        } else {
            String::read(reader)?
        };
        let partitions = read_array(reader, version, flexible)?.unwrap_or_default();
        let tagged_fields = flexible.then(|| TaggedFields::read(reader)).transpose()?;

        Ok(Self {
            name,
            partitions,
            tagged_fields,
        })
    }
}

impl<W> WriteVersionedType<W> for DescribeLogDirsTopic
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        let v = version.0;
        assert!(v <= 4);
        let flexible = v >= FIRST_FLEXIBLE_VERSION;

        if flexible {
            self.name.write_compact(writer)?;
        } else {
            self.name.write(writer)?;
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
pub struct DescribeLogDirsPartition {
    /// The partition index.
    pub partition_index: i32,

    /// The size of the log segments in this partition in bytes.
    pub partition_size: i64,

    /// The lag of the log's LEO w.r.t. partition's HW (if it is the current log for the partition) or current
    /// replica's LEO (if it is the future log for the partition).
    pub offset_lag: i64,

    /// True if this log is created by AlterReplicaLogDirsRequest and will replace the current log of the replica in
    /// the future.
    pub is_future_key: bool,

    /// The tagged fields.
    ///
    /// Added in version 2
    pub tagged_fields: Option<TaggedFields>,
}

impl<R> ReadVersionedType<R> for DescribeLogDirsPartition
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0;
        assert!(v <= 4);

        Ok(Self {
            partition_index: i32::read(reader)?,
            partition_size: i64::read(reader)?,
            offset_lag: i64::read(reader)?,
            is_future_key: bool::read(reader)?,
            tagged_fields: (v >= FIRST_FLEXIBLE_VERSION)
                .then(|| TaggedFields::read(reader))
                .transpose()?,
        })
    }
}

impl<W> WriteVersionedType<W> for DescribeLogDirsPartition
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        let v = version.0;
        assert!(v <= 4);

        self.partition_index.write(writer)?;
        self.partition_size.write(writer)?;
        self.offset_lag.write(writer)?;
        self.is_future_key.write(writer)?;
        if v >= FIRST_FLEXIBLE_VERSION {
            self.tagged_fields.write(writer)?;
        }

        Ok(())
    }
}
