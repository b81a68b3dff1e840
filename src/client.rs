use std::fmt;

use reqwest::Method;
use serde_json::Value;

use crate::config::{Credentials, HttpOptions};
use crate::http_client::HttpClient;
use crate::session_client::SessionClient;
use crate::transport::{RequestOptions, Response, Session};
use crate::version::{ApiVersion, get_client_class};
use crate::{ClientError, v1, v2};

/// Transport flavour behind a versioned client.
pub enum Backend {
    /// Client holds credentials and authenticates on its own.
    Http(HttpClient),
    /// Authentication and transport are delegated to a session.
    Session(SessionClient<Box<dyn Session>>),
}

impl Backend {
    /// Sends a request to `url`, relative to the volume endpoint.
    pub fn request(
        &mut self,
        url: &str,
        method: Method,
        options: RequestOptions,
    ) -> Result<(Response, Option<Value>), ClientError> {
        match self {
            Self::Http(client) => client.cs_request(url, method, options),
            Self::Session(client) => client.request(url, method, options),
        }
    }

    /// Authenticates up front; sessions are already authenticated.
    pub fn authenticate(&mut self) -> Result<(), ClientError> {
        match self {
            Self::Http(client) => client.authenticate(),
            Self::Session(_) => Ok(()),
        }
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(client) => f.debug_tuple("Http").field(client).finish(),
            Self::Session(client) => f
                .debug_struct("Session")
                .field("api_version", &client.api_version())
                .field("microversion", &client.microversion())
                .finish_non_exhaustive(),
        }
    }
}

/// Behaviour shared by the per-version clients.
pub trait VolumeClient: Sized {
    /// Major API version served by this client.
    const API_VERSION: ApiVersion;

    fn from_backend(backend: Backend) -> Self;

    fn backend(&self) -> &Backend;

    fn backend_mut(&mut self) -> &mut Backend;

    /// Creates a direct-auth client looking up this version's service type.
    fn from_credentials(credentials: Credentials, options: HttpOptions) -> Result<Self, ClientError> {
        let options = options.with_service_type(Self::API_VERSION.service_type());
        Ok(Self::from_backend(Backend::Http(HttpClient::new(credentials, options)?)))
    }

    /// Creates a client on top of an authenticated session.
    fn from_session(session: Box<dyn Session>) -> Self {
        Self::from_backend(Backend::Session(
            SessionClient::new(session).with_api_version(Self::API_VERSION),
        ))
    }

    fn api_version(&self) -> ApiVersion {
        Self::API_VERSION
    }

    fn authenticate(&mut self) -> Result<(), ClientError> {
        self.backend_mut().authenticate()
    }

    fn get(&mut self, url: &str) -> Result<(Response, Option<Value>), ClientError> {
        self.backend_mut()
            .request(url, Method::GET, RequestOptions::new())
    }

    fn post(&mut self, url: &str, body: Value) -> Result<(Response, Option<Value>), ClientError> {
        self.backend_mut()
            .request(url, Method::POST, RequestOptions::new().with_body(body))
    }

    fn put(&mut self, url: &str, body: Value) -> Result<(Response, Option<Value>), ClientError> {
        self.backend_mut()
            .request(url, Method::PUT, RequestOptions::new().with_body(body))
    }

    fn delete(&mut self, url: &str) -> Result<(Response, Option<Value>), ClientError> {
        self.backend_mut()
            .request(url, Method::DELETE, RequestOptions::new())
    }
}

/// A client for whichever version a version string names.
#[derive(Debug)]
pub enum VersionedClient {
    V1(v1::Client),
    V2(v2::Client),
}

impl VersionedClient {
    /// Builds a direct-auth client for `version` (`"1"` or `"2"`).
    pub fn from_credentials(
        version: &str,
        credentials: Credentials,
        options: HttpOptions,
    ) -> Result<Self, ClientError> {
        Ok(match get_client_class(version)? {
            ApiVersion::V1 => Self::V1(v1::Client::from_credentials(credentials, options)?),
            ApiVersion::V2 => Self::V2(v2::Client::from_credentials(credentials, options)?),
        })
    }

    /// Builds a session-backed client for `version` (`"1"` or `"2"`).
    pub fn from_session(version: &str, session: Box<dyn Session>) -> Result<Self, ClientError> {
        Ok(match get_client_class(version)? {
            ApiVersion::V1 => Self::V1(v1::Client::from_session(session)),
            ApiVersion::V2 => Self::V2(v2::Client::from_session(session)),
        })
    }

    pub fn api_version(&self) -> ApiVersion {
        match self {
            Self::V1(client) => client.api_version(),
            Self::V2(client) => client.api_version(),
        }
    }

    pub fn backend_mut(&mut self) -> &mut Backend {
        match self {
            Self::V1(client) => client.backend_mut(),
            Self::V2(client) => client.backend_mut(),
        }
    }

    /// Sends a request relative to the volume endpoint.
    pub fn request(
        &mut self,
        url: &str,
        method: Method,
        options: RequestOptions,
    ) -> Result<(Response, Option<Value>), ClientError> {
        self.backend_mut().request(url, method, options)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::{Method, StatusCode};
    use serde_json::json;

    use super::{Backend, VersionedClient, VolumeClient};
    use crate::config::{Credentials, HttpOptions};
    use crate::test_support::FakeSession;
    use crate::transport::{RequestOptions, Response, Session};
    use crate::version::ApiVersion;
    use crate::{ClientError, v1, v2};

    fn shared_session() -> Arc<FakeSession> {
        Arc::new(
            FakeSession::replying(Response::new(StatusCode::OK).with_text(r#"{"volumes": []}"#))
                .with_endpoint("http://cinder:8776/v2/p1"),
        )
    }

    #[test]
    fn version_string_selects_client() {
        let session = shared_session();
        let v1 = VersionedClient::from_session("1", Box::new(Arc::clone(&session)))
            .expect("v1 supported");
        let v2 = VersionedClient::from_session("2", Box::new(Arc::clone(&session)))
            .expect("v2 supported");

        assert!(matches!(v1, VersionedClient::V1(_)));
        assert_eq!(v1.api_version(), ApiVersion::V1);
        assert!(matches!(v2, VersionedClient::V2(_)));
        assert_eq!(v2.api_version(), ApiVersion::V2);
    }

    #[test]
    fn unknown_version_is_rejected() {
        let error = VersionedClient::from_session("9", Box::new(shared_session()))
            .expect_err("unsupported");
        assert!(matches!(error, ClientError::UnsupportedVersion(_)));

        let error = VersionedClient::from_credentials(
            "0",
            Credentials::new("user", "http://keystone:5000/v2.0"),
            HttpOptions::default(),
        )
        .expect_err("unsupported");
        assert!(matches!(error, ClientError::UnsupportedVersion(_)));
    }

    #[test]
    fn session_backed_client_sends_through_session() {
        let session = shared_session();
        let mut client = v2::Client::from_session(Box::new(Arc::clone(&session)));

        client.authenticate().expect("sessions need no auth");
        let (_, body) = client.get("/volumes").expect("ok");

        assert_eq!(body, Some(json!({"volumes": []})));
        let sent = session.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, Method::GET);
        assert_eq!(sent[0].url, "/volumes");
    }

    #[test]
    fn versioned_client_forwards_requests() {
        let session = shared_session();
        let mut client = VersionedClient::from_session("1", Box::new(Arc::clone(&session)))
            .expect("v1 supported");

        client
            .request(
                "/volumes",
                Method::POST,
                RequestOptions::new().with_body(json!({"volume": {"size": 1}})),
            )
            .expect("ok");

        let sent = session.sent();
        assert_eq!(sent[0].body, Some(json!({"volume": {"size": 1}})));
    }

    #[test]
    fn per_version_service_types() {
        let session = shared_session();
        let v1 = v1::Client::from_session(Box::new(Arc::clone(&session)));
        let Backend::Session(inner) = v1.backend() else {
            panic!("expected a session backend");
        };
        assert_eq!(inner.api_version(), Some(ApiVersion::V1));

        let dyn_session: Box<dyn Session> = Box::new(session);
        let v2 = v2::Client::from_session(dyn_session);
        assert_eq!(v2.api_version(), ApiVersion::V2);
    }
}
