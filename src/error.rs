use thiserror::Error;

use crate::fault::ApiError;
use crate::transport::TransportError;

/// Errors returned by Cinder client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Version identifier or endpoint URL does not name a supported API version.
    #[error("{0}")]
    UnsupportedVersion(String),

    /// Base URL is not a valid absolute URL.
    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    /// Endpoint path could not be joined to the base URL.
    #[error("invalid endpoint path '{0}'")]
    InvalidPath(String),

    /// A required configuration value (environment variable) is not set.
    #[error("missing configuration value {0}")]
    MissingConfiguration(&'static str),

    /// No endpoint could be resolved for the volume service.
    #[error("endpoint not found: {0}")]
    EndpointNotFound(String),

    /// More than one catalog endpoint matched the requested filters.
    #[error("found more than one valid endpoint: {0:?}")]
    AmbiguousEndpoints(Vec<String>),

    /// Direct authentication completed but did not yield usable credentials.
    #[error("authorization failure: {0}")]
    AuthorizationFailure(String),

    /// Service returned a fault (HTTP status >= 400).
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The transport or session failed before a response was available.
    ///
    /// Session errors are carried here untouched, never remapped to [`ApiError`].
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Payload could not be serialized or parsed as JSON.
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Returns the service fault when this error came from an HTTP status >= 400.
    pub fn as_api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(fault) => Some(fault),
            _ => None,
        }
    }
}
