use std::io::{Read, Write};

use crate::protocol::{
    api_key::ApiKey,
    api_version::{ApiVersion, ApiVersionRange},
    error::Error as ApiError,
    primitives::TaggedFields,
    traits::{ReadCompactType, ReadType, WriteCompactType, WriteType},
};

use super::{
    read_array, write_array, ReadVersionedError, ReadVersionedType, RequestBody,
    WriteVersionedError, WriteVersionedType,
};

#[cfg(test)]
use proptest::prelude::*;

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct ApiVersionsRequest {
    /// The name of the client.
    ///
    /// Added in version 3.
    pub client_software_name: Option<String>,

    /// The version of the client.
    ///
    /// Added in version 3.
    pub client_software_version: Option<String>,

    /// The tagged fields.
    ///
    /// Added in version 3.
    pub tagged_fields: Option<TaggedFields>,
}

impl<R> ReadVersionedType<R> for ApiVersionsRequest
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0;
        assert!(v <= 3);

        Ok(Self {
            client_software_name: (v >= 3).then(|| String::read_compact(reader)).transpose()?,
            client_software_version: (v >= 3).then(|| String::read_compact(reader)).transpose()?,
            tagged_fields: (v >= 3).then(|| TaggedFields::read(reader)).transpose()?,
        })
    }
}

impl<W> WriteVersionedType<W> for ApiVersionsRequest
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        let v = version.0;
        assert!(v <= 3);

        if v >= 3 {
            // both fields are non-nullable compact strings
            self.client_software_name
                .clone()
                .unwrap_or_default()
                .write_compact(writer)?;
            self.client_software_version
                .clone()
                .unwrap_or_default()
                .write_compact(writer)?;

            self.tagged_fields.write(writer)?;
        }

        Ok(())
    }
}

impl RequestBody for ApiVersionsRequest {
    type ResponseBody = ApiVersionsResponse;
    const API_KEY: ApiKey = ApiKey::ApiVersions;
    const API_VERSION_RANGE: ApiVersionRange = ApiVersionRange::new(0, 3);
    const FIRST_TAGGED_FIELD_IN_REQUEST_VERSION: ApiVersion = ApiVersion(3);

    // Brokers answer ApiVersions with a v0 response header even for v3 requests, so that clients can parse the
    // reply before knowing which versions are supported.
    const FIRST_TAGGED_FIELD_IN_RESPONSE_VERSION: ApiVersion = ApiVersion(i16::MAX);
}

#[derive(Debug, PartialEq, Eq, Clone)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct ApiVersionsResponseApiKey {
    /// The API index.
    pub api_key: ApiKey,

    /// The minimum supported version, inclusive.
    pub min_version: ApiVersion,

    /// The maximum supported version, inclusive.
    pub max_version: ApiVersion,

    /// The tagged fields.
    ///
    /// Added in version 3
    pub tagged_fields: Option<TaggedFields>,
}

impl ApiVersionsResponseApiKey {
    /// Advertised range, `None` if the broker sent an inverted range.
    pub fn range(&self) -> Option<ApiVersionRange> {
        ApiVersionRange::try_new(self.min_version, self.max_version)
    }
}

impl<R> ReadVersionedType<R> for ApiVersionsResponseApiKey
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0;
        assert!(v <= 3);

        Ok(Self {
            api_key: i16::read(reader)?.into(),
            min_version: ApiVersion(i16::read(reader)?),
            max_version: ApiVersion(i16::read(reader)?),
            tagged_fields: (v >= 3).then(|| TaggedFields::read(reader)).transpose()?,
        })
    }
}

// this is not technically required for production but helpful for testing
impl<W> WriteVersionedType<W> for ApiVersionsResponseApiKey
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        let v = version.0;
        assert!(v <= 3);

        i16::from(self.api_key).write(writer)?;
        self.min_version.0.write(writer)?;
        self.max_version.0.write(writer)?;

        if v >= 3 {
            self.tagged_fields.write(writer)?;
        }

        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct ApiVersionsResponse {
    /// The top-level error code.
    #[cfg_attr(test, proptest(strategy = "any::<i16>().prop_map(ApiError::new)"))]
    pub error_code: Option<ApiError>,

    /// The APIs supported by the broker.
    // tell proptest to only generate small vectors, otherwise tests take forever
    #[cfg_attr(
        test,
        proptest(strategy = "prop::collection::vec(any::<ApiVersionsResponseApiKey>(), 0..2)")
    )]
    pub api_keys: Vec<ApiVersionsResponseApiKey>,

    /// The duration in milliseconds for which the request was throttled due to a quota violation, or zero if the
    /// request did not violate any quota.
    ///
    /// Added in version 1
    pub throttle_time_ms: Option<i32>,

    /// The tagged fields.
    ///
    /// Added in version 3
    pub tagged_fields: Option<TaggedFields>,
}

impl<R> ReadVersionedType<R> for ApiVersionsResponse
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0;
        assert!(v <= 3);

        let error_code = ApiError::new(i16::read(reader)?);
        let api_keys = read_array(reader, version, v >= 3)?.unwrap_or_default();
        let throttle_time_ms = (v >= 1).then(|| i32::read(reader)).transpose()?;
        let tagged_fields = (v >= 3).then(|| TaggedFields::read(reader)).transpose()?;

        Ok(Self {
            error_code,
            api_keys,
            throttle_time_ms,
            tagged_fields,
        })
    }
}

// this is not technically required for production but helpful for testing
impl<W> WriteVersionedType<W> for ApiVersionsResponse
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        let v = version.0;
        assert!(v <= 3);

        self.error_code.map(|e| e.code()).unwrap_or(0).write(writer)?;
        write_array(writer, version, v >= 3, Some(&self.api_keys))?;

        if v >= 1 {
            // defaults to "no throttle"
            self.throttle_time_ms.unwrap_or(0).write(writer)?;
        }

        if v >= 3 {
            self.tagged_fields.write(writer)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::test_utils::{
        assert_read_versioned, assert_write_versioned, test_roundtrip_versioned,
    };
    use crate::protocol::primitives::UnsignedVarint;

    test_roundtrip_versioned!(
        ApiVersionsResponse,
        ApiVersionsRequest::API_VERSION_RANGE.min(),
        ApiVersionsRequest::API_VERSION_RANGE.max(),
        test_roundtrip_api_versions_response
    );

    #[test]
    fn request_v0_is_empty() {
        let req = ApiVersionsRequest {
            client_software_name: None,
            client_software_version: None,
            tagged_fields: None,
        };
        assert_write_versioned!(req, 0, Vec::<u8>::new());
    }

    #[test]
    fn request_v3() {
        let req = ApiVersionsRequest {
            client_software_name: Some("logdirs".to_string()),
            client_software_version: Some("0.1.0".to_string()),
            tagged_fields: None,
        };
        assert_write_versioned!(
            req,
            3,
            vec![
                0x08, b'l', b'o', b'g', b'd', b'i', b'r', b's', // client software name
                0x06, b'0', b'.', b'1', b'.', b'0', // client software version
                0x00, // tagged fields
            ]
        );
    }

    #[test]
    fn response_v0() {
        assert_read_versioned!(
            ApiVersionsResponse,
            [
                0x00, 0x00, // error code
                0x00, 0x00, 0x00, 0x01, // api keys length
                0x00, 0x23, // api key DescribeLogDirs
                0x00, 0x00, // min version
                0x00, 0x04, // max version
            ]
            .as_ref(),
            0,
            ApiVersionsResponse {
                error_code: None,
                api_keys: vec![ApiVersionsResponseApiKey {
                    api_key: ApiKey::DescribeLogDirs,
                    min_version: ApiVersion(0),
                    max_version: ApiVersion(4),
                    tagged_fields: None,
                }],
                throttle_time_ms: None,
                tagged_fields: None,
            }
        );
    }

    #[test]
    fn response_v3() {
        assert_read_versioned!(
            ApiVersionsResponse,
            [
                0x00, 0x00, // no error
                0x02, // compact array length 1
                0x00, 0x22, 0x00, 0x00, 0x00, 0x02, 0x00, // AlterReplicaLogDirs 0..2, tagged fields
                0x00, 0x00, 0x00, 0x00, // throttle time
                0x01, 0x01, 0x08, // one tagged field, tag 1, 8 bytes
                0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            ]
            .as_ref(),
            3,
            ApiVersionsResponse {
                error_code: None,
                api_keys: vec![ApiVersionsResponseApiKey {
                    api_key: ApiKey::AlterReplicaLogDirs,
                    min_version: ApiVersion(0),
                    max_version: ApiVersion(2),
                    tagged_fields: Some(TaggedFields::default()),
                }],
                throttle_time_ms: Some(0),
                tagged_fields: Some(TaggedFields(vec![(
                    UnsignedVarint(1),
                    vec![0, 0, 0, 0, 0, 0, 0, 0],
                )])),
            }
        );
    }

    #[test]
    fn inverted_range_is_ignored() {
        let key = ApiVersionsResponseApiKey {
            api_key: ApiKey::Metadata,
            min_version: ApiVersion(2),
            max_version: ApiVersion(1),
            tagged_fields: None,
        };
        assert_eq!(key.range(), None);
    }
}
