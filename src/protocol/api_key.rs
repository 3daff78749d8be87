//! ApiKey to tag request types.
//!
//! Only the APIs this crate speaks get a named variant; everything else a broker advertises is kept as
//! [`ApiKey::Unknown`] so that it still roundtrips.
//!
//! # References
//! - <https://kafka.apache.org/protocol#protocol_api_keys>

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum ApiKey {
    Metadata,
    ApiVersions,
    AlterReplicaLogDirs,
    DescribeLogDirs,
    Unknown(i16),
}

impl From<i16> for ApiKey {
    fn from(key: i16) -> Self {
        match key {
            3 => Self::Metadata,
            18 => Self::ApiVersions,
            34 => Self::AlterReplicaLogDirs,
            35 => Self::DescribeLogDirs,
            _ => Self::Unknown(key),
        }
    }
}

impl From<ApiKey> for i16 {
    fn from(key: ApiKey) -> Self {
        match key {
            ApiKey::Metadata => 3,
            ApiKey::ApiVersions => 18,
            ApiKey::AlterReplicaLogDirs => 34,
            ApiKey::DescribeLogDirs => 35,
            ApiKey::Unknown(code) => code,
        }
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "Unknown({code})"),
            known => write!(f, "{known:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_roundrip_int16(code: i16) {
            let api_key = ApiKey::from(code);
            let code2 = i16::from(api_key);
            assert_eq!(code, code2);
        }

        #[test]
        fn test_roundrip_api_key(key: ApiKey) {
            let key = match key {
                // Ensure key is actually unknown
                ApiKey::Unknown(x) => ApiKey::from(x),
                _ => key,
            };

            let code = i16::from(key);
            let key2 = ApiKey::from(code);
            assert_eq!(key, key2);
        }
    }

    #[test]
    fn display() {
        assert_eq!(ApiKey::DescribeLogDirs.to_string(), "DescribeLogDirs");
        assert_eq!(ApiKey::from(0).to_string(), "Unknown(0)");
    }
}
