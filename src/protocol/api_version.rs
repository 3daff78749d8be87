#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct ApiVersion(pub i16);

impl From<i16> for ApiVersion {
    fn from(value: i16) -> Self {
        ApiVersion(value)
    }
}

impl ApiVersion {
    pub const fn new(value: i16) -> ApiVersion {
        ApiVersion(value)
    }
}

impl std::fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ApiVersionRange {
    min: ApiVersion,
    max: ApiVersion,
}

impl ApiVersionRange {
    pub const fn new(min: i16, max: i16) -> Self {
        assert!(min <= max);

        Self {
            min: ApiVersion(min),
            max: ApiVersion(max),
        }
    }

    /// Builds a range from untrusted input, e.g. an `ApiVersions` response.
    pub fn try_new(min: ApiVersion, max: ApiVersion) -> Option<Self> {
        (min <= max).then_some(Self { min, max })
    }

    pub fn min(&self) -> ApiVersion {
        self.min
    }

    pub fn max(&self) -> ApiVersion {
        self.max
    }

    /// Highest version contained in both ranges, if they overlap.
    pub fn highest_common(&self, other: &Self) -> Option<ApiVersion> {
        if self.min <= other.max && other.min <= self.max {
            Some(self.max.min(other.max))
        } else {
            None
        }
    }
}

impl std::fmt::Display for ApiVersionRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_common() {
        let client = ApiVersionRange::new(0, 4);

        assert_eq!(
            client.highest_common(&ApiVersionRange::new(1, 9)),
            Some(ApiVersion(4))
        );
        assert_eq!(
            client.highest_common(&ApiVersionRange::new(2, 3)),
            Some(ApiVersion(3))
        );
        assert_eq!(client.highest_common(&ApiVersionRange::new(5, 9)), None);
    }

    #[test]
    fn try_new_rejects_inverted_range() {
        assert_eq!(ApiVersionRange::try_new(ApiVersion(2), ApiVersion(1)), None);
        assert_eq!(
            ApiVersionRange::try_new(ApiVersion(1), ApiVersion(2)),
            Some(ApiVersionRange::new(1, 2))
        );
    }
}
