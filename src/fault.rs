//! Mapping of HTTP fault responses to typed errors.
//!
//! The volume service reports failures with a fault envelope: a JSON object
//! with a single key naming the fault, whose value carries `message`, `code`
//! and sometimes `details`:
//!
//! ```json
//! {"overLimitFault": {"message": "This request was rate-limited.", "code": 413}}
//! ```

use std::fmt;

use reqwest::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;

use crate::transport::Response;

/// Fault classes keyed by HTTP status code.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FaultKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    NotAcceptable,
    Conflict,
    OverLimit,
    HttpNotImplemented,
    /// Any status >= 400 without a dedicated kind.
    ClientException,
}

const FAULT_KINDS: &[(u16, FaultKind)] = &[
    (400, FaultKind::BadRequest),
    (401, FaultKind::Unauthorized),
    (403, FaultKind::Forbidden),
    (404, FaultKind::NotFound),
    (405, FaultKind::MethodNotAllowed),
    (406, FaultKind::NotAcceptable),
    (409, FaultKind::Conflict),
    (413, FaultKind::OverLimit),
    (501, FaultKind::HttpNotImplemented),
];

impl FaultKind {
    /// Looks up the kind registered for `status`, falling back to
    /// [`FaultKind::ClientException`].
    pub fn from_status(status: StatusCode) -> Self {
        FAULT_KINDS
            .iter()
            .find(|(code, _)| *code == status.as_u16())
            .map_or(Self::ClientException, |(_, kind)| *kind)
    }

    /// Message used when the response body does not carry one.
    pub fn default_message(self) -> &'static str {
        match self {
            Self::BadRequest => "Bad request",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not found",
            Self::MethodNotAllowed => "Method Not Allowed",
            Self::NotAcceptable => "Not Acceptable",
            Self::Conflict => "Conflict",
            Self::OverLimit => "Over limit",
            Self::HttpNotImplemented => "HTTP Not Implemented",
            Self::ClientException => "Unknown Error",
        }
    }

    /// Stable name of the kind, as used in log output.
    pub fn name(self) -> &'static str {
        match self {
            Self::BadRequest => "BadRequest",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "NotFound",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::NotAcceptable => "NotAcceptable",
            Self::Conflict => "Conflict",
            Self::OverLimit => "OverLimit",
            Self::HttpNotImplemented => "HTTPNotImplemented",
            Self::ClientException => "ClientException",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A service fault decoded from a response with status >= 400.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("{}", self.render())]
pub struct ApiError {
    pub kind: FaultKind,
    pub status: StatusCode,
    pub message: String,
    pub details: Option<String>,
    /// The `code` field of the fault envelope, when present.
    pub code: Option<String>,
    pub request_id: Option<String>,
    /// Seconds to wait before retrying; only set for [`FaultKind::OverLimit`].
    pub retry_after: Option<u64>,
    pub method: Option<Method>,
    pub url: Option<String>,
}

impl ApiError {
    /// Creates a fault of the kind registered for `status` with its default message.
    pub fn new(status: StatusCode) -> Self {
        let kind = FaultKind::from_status(status);
        Self {
            kind,
            status,
            message: kind.default_message().to_owned(),
            details: None,
            code: None,
            request_id: None,
            retry_after: None,
            method: None,
            url: None,
        }
    }

    fn render(&self) -> String {
        let mut rendered = format!("{} (HTTP {})", self.message, self.status.as_u16());
        if let Some(request_id) = &self.request_id {
            rendered.push_str(&format!(" (Request-ID: {request_id})"));
        }
        rendered
    }
}

/// Builds the typed fault for a response.
///
/// `body` is the parsed JSON body, if any. Only meaningful for responses with
/// status >= 400.
pub fn from_response(
    response: &Response,
    body: Option<&Value>,
    method: Option<&Method>,
    url: Option<&str>,
) -> ApiError {
    let mut error = ApiError::new(response.status);
    error.request_id = response.request_id().map(str::to_owned);
    error.method = method.cloned();
    error.url = url.map(str::to_owned);

    if error.kind == FaultKind::OverLimit {
        error.retry_after = Some(
            response
                .header("retry-after")
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(0),
        );
    }

    if let Some(body) = body {
        error.message = "n/a".to_owned();
        error.details = Some("n/a".to_owned());

        // Object keys keep document order, so this is the first fault written.
        if let Some(fault) = body.as_object().and_then(|envelope| envelope.values().next()) {
            if let Some(message) = fault.get("message").and_then(scalar_to_string) {
                error.message = message;
            }
            if let Some(details) = fault.get("details").and_then(scalar_to_string) {
                error.details = Some(details);
            }
            error.code = fault.get("code").and_then(scalar_to_string);
        }
    }

    error
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
