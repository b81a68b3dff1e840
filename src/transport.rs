use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::catalog::EndpointFilter;

/// Header carrying the request id assigned by OpenStack services.
pub const OPENSTACK_REQUEST_ID_HEADER: &str = "x-openstack-request-id";
/// Legacy request id header still emitted by some deployments.
pub const COMPUTE_REQUEST_ID_HEADER: &str = "x-compute-request-id";

/// Errors raised by a [`Transport`] or [`Session`] before a response exists.
///
/// Clients propagate these unchanged; they never go through fault mapping.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The session could not obtain or refresh authorization.
    #[error("authorization failure: {0}")]
    AuthorizationFailure(String),

    /// The session rejected the supplied credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The session could not resolve an endpoint for the request.
    #[error("endpoint not found: {0}")]
    EndpointNotFound(String),

    /// The remote host refused the connection.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// HTTP transport-layer request failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl TransportError {
    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_connect() {
            Self::ConnectionRefused(error.to_string())
        } else {
            Self::Request(error)
        }
    }
}

/// One outgoing HTTP request.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
    /// Passed through to sessions that can map HTTP errors themselves.
    ///
    /// Clients in this crate always send `false` and map faults on their own.
    pub raise_exc: bool,
}

/// Per-call headers and body supplied by the caller.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestOptions {
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl RequestOptions {
    /// Returns empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns options with an extra header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Returns options carrying a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A completed HTTP exchange.
#[derive(Clone, Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub text: String,
}

impl Response {
    /// Creates an empty response with the given status.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            text: String::new(),
        }
    }

    /// Returns the response with a raw text body.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Returns the response with an extra header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Parses the body as JSON.
    ///
    /// Returns `None` for empty bodies and bodies that are not JSON.
    pub fn json(&self) -> Option<Value> {
        if self.text.trim().is_empty() {
            return None;
        }
        serde_json::from_str(&self.text).ok()
    }

    /// Returns a header value when present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Returns the service-assigned request id, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.header(OPENSTACK_REQUEST_ID_HEADER)
            .or_else(|| self.header(COMPUTE_REQUEST_ID_HEADER))
    }

    /// Returns `true` when the status code denotes a fault.
    pub fn is_error(&self) -> bool {
        self.status.as_u16() >= 400
    }
}

/// Sends one request and returns the raw response, whatever its status.
pub trait Transport {
    fn send(&self, request: Request) -> Result<Response, TransportError>;
}

/// An externally owned, already authenticated session.
///
/// Sessions perform authentication and transport on their own; clients only
/// ask them to resolve the service endpoint and send requests.
pub trait Session: Transport {
    /// Resolves the service endpoint matching `filter`.
    fn get_endpoint(&self, filter: &EndpointFilter) -> Result<Option<String>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: Request) -> Result<Response, TransportError> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: Request) -> Result<Response, TransportError> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: Request) -> Result<Response, TransportError> {
        (**self).send(request)
    }
}

impl<S: Session + ?Sized> Session for &S {
    fn get_endpoint(&self, filter: &EndpointFilter) -> Result<Option<String>, TransportError> {
        (**self).get_endpoint(filter)
    }
}

impl<S: Session + ?Sized> Session for Box<S> {
    fn get_endpoint(&self, filter: &EndpointFilter) -> Result<Option<String>, TransportError> {
        (**self).get_endpoint(filter)
    }
}

impl<S: Session + ?Sized> Session for Arc<S> {
    fn get_endpoint(&self, filter: &EndpointFilter) -> Result<Option<String>, TransportError> {
        (**self).get_endpoint(filter)
    }
}

/// Blocking [`Transport`] backed by `reqwest`.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    http: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Creates a transport with default settings.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_settings(None, false)
    }

    /// Creates a transport with an optional request timeout.
    ///
    /// `insecure` disables TLS certificate verification.
    pub fn with_settings(timeout: Option<Duration>, insecure: bool) -> Result<Self, TransportError> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        if insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }
        Ok(Self {
            http: builder.build()?,
        })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: Request) -> Result<Response, TransportError> {
        let mut builder = self.http.request(request.method, request.url.as_str());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().map_err(TransportError::from_reqwest)?;
        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text()?;

        Ok(Response {
            status,
            headers,
            text,
        })
    }
}

/// Sets `name` to `value`, dropping any existing entry that differs only in case.
pub(crate) fn set_header(
    headers: &mut BTreeMap<String, String>,
    name: &str,
    value: impl Into<String>,
) {
    headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
    headers.insert(name.to_owned(), value.into());
}

/// Sets `name` unless the caller already supplied it under any casing.
pub(crate) fn insert_default_header(
    headers: &mut BTreeMap<String, String>,
    name: &str,
    value: impl Into<String>,
) {
    if !headers.keys().any(|existing| existing.eq_ignore_ascii_case(name)) {
        headers.insert(name.to_owned(), value.into());
    }
}

/// Logs the request id of a completed call.
///
/// Called exactly once per response by every client in this crate.
pub(crate) fn log_request_id(response: &Response, method: &Method, url: &str, service_name: &str) {
    if let Some(request_id) = response.request_id() {
        debug!(
            request_id,
            service = service_name,
            "{method} call to {service_name} for {url} used request id {request_id}"
        );
    }
}
