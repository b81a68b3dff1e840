//! Blocking Rust client for the OpenStack Cinder block-storage REST API.
//!
//! Public API layers:
//! - [`get_client_class`]/[`get_volume_api_from_url`]: API version resolution.
//! - [`HttpClient`]: direct-auth client holding its own [`Credentials`].
//! - [`SessionClient`]: client delegating auth and transport to a [`Session`].
//! - [`v1::Client`]/[`v2::Client`]/[`VersionedClient`]: per-version facades.
//! - [`ClientError`]/[`ApiError`]: unified error type and typed service faults.
//!
//! Debug logging goes through `tracing`; secrets are masked before anything
//! is emitted (see [`redact`]).

mod catalog;
mod client;
mod config;
mod error;
mod fault;
mod http_client;
pub mod redact;
mod session_client;
mod transport;
pub mod v1;
pub mod v2;
mod version;

#[cfg(test)]
mod test_support;

/// Endpoint selection for the identity catalog and sessions.
pub use catalog::{EndpointFilter, Interface, ServiceCatalog};
/// Versioned client facades and their backends.
pub use client::{Backend, VersionedClient, VolumeClient};
/// HTTP primitives used in client signatures.
pub use reqwest::{Method, StatusCode};
/// Direct-auth configuration.
pub use config::{Credentials, HttpOptions};
/// Error type returned by all client operations.
pub use error::ClientError;
/// Typed service faults.
pub use fault::{ApiError, FaultKind, from_response};
/// Direct-auth HTTP client.
pub use http_client::{HttpClient, RequestLog, USER_AGENT};
/// Session-backed client.
pub use session_client::SessionClient;
/// Transport capability and request/response descriptors.
pub use transport::{
    ReqwestTransport, Request, RequestOptions, Response, Session, Transport, TransportError,
};
/// API version resolution.
pub use version::{
    API_VERSION_HEADER, ApiMicroversion, ApiVersion, get_client_class, get_volume_api_from_url,
};
