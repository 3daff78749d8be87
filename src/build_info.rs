//! Information about the build, sent to brokers as part of the handshake.

/// Client ID used when the user does not configure one.
pub const DEFAULT_CLIENT_ID: &str = "logdirs";

/// Reported as `client_software_name` in `ApiVersions` v3+.
pub const SOFTWARE_NAME: &str = env!("CARGO_PKG_NAME");

/// Reported as `client_software_version` in `ApiVersions` v3+.
pub const SOFTWARE_VERSION: &str = env!("CARGO_PKG_VERSION");
