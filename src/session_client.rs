use reqwest::{Method, Url};
use serde_json::Value;

use crate::catalog::{EndpointFilter, Interface};
use crate::fault;
use crate::transport::{self, Request, RequestOptions, Response, Session};
use crate::version::{API_VERSION_HEADER, ApiMicroversion, ApiVersion};
use crate::ClientError;

/// Volume API client delegating authentication and transport to a [`Session`].
///
/// The session resolves the endpoint and relative request URLs; this client
/// adds version headers, logs request ids and maps faults.
#[derive(Clone, Debug)]
pub struct SessionClient<S> {
    session: S,
    api_version: Option<ApiVersion>,
    microversion: Option<ApiMicroversion>,
    filter: EndpointFilter,
}

impl<S: Session> SessionClient<S> {
    /// Wraps `session`, targeting the `volume` service on its public interface.
    pub fn new(session: S) -> Self {
        Self {
            session,
            api_version: None,
            microversion: None,
            filter: EndpointFilter::new("volume"),
        }
    }

    /// Selects a major API version; also selects its catalog service type.
    #[must_use]
    pub fn with_api_version(mut self, api_version: ApiVersion) -> Self {
        self.api_version = Some(api_version);
        self.filter.service_type = api_version.service_type().to_owned();
        self
    }

    /// Requests a microversion on every call.
    #[must_use]
    pub fn with_microversion(mut self, microversion: ApiMicroversion) -> Self {
        self.microversion = Some(microversion);
        self
    }

    #[must_use]
    pub fn with_service_type(mut self, service_type: impl Into<String>) -> Self {
        self.filter.service_type = service_type.into();
        self
    }

    #[must_use]
    pub fn with_interface(mut self, interface: Interface) -> Self {
        self.filter.interface = interface;
        self
    }

    #[must_use]
    pub fn with_region_name(mut self, region_name: impl Into<String>) -> Self {
        self.filter.region_name = Some(region_name.into());
        self
    }

    #[must_use]
    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.filter.service_name = Some(service_name.into());
        self
    }

    pub fn api_version(&self) -> Option<ApiVersion> {
        self.api_version
    }

    pub fn microversion(&self) -> Option<ApiMicroversion> {
        self.microversion
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Returns the volume endpoint resolved by the session.
    pub fn get_endpoint(&self) -> Result<String, ClientError> {
        self.session.get_endpoint(&self.filter)?.ok_or_else(|| {
            ClientError::EndpointNotFound(format!(
                "session has no {} endpoint for service type '{}'",
                self.filter.interface, self.filter.service_type
            ))
        })
    }

    /// Returns scheme, host and port of the volume endpoint, with path `/`.
    pub fn get_base_url(&self) -> Result<Url, ClientError> {
        let endpoint = self.get_endpoint()?;
        let mut url =
            Url::parse(&endpoint).map_err(|_| ClientError::InvalidBaseUrl(endpoint.clone()))?;
        url.set_path("/");
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }

    /// Sends a request through the session.
    ///
    /// Errors raised by the session itself are returned as
    /// [`ClientError::Transport`] unchanged. Completed responses always get
    /// their request id logged; statuses >= 400 become [`ClientError::Api`].
    pub fn request(
        &self,
        url: &str,
        method: Method,
        options: RequestOptions,
    ) -> Result<(Response, Option<Value>), ClientError> {
        let mut headers = options.headers;
        transport::insert_default_header(&mut headers, "Accept", "application/json");
        if let Some(value) = self.microversion.and_then(ApiMicroversion::header_value) {
            transport::set_header(&mut headers, API_VERSION_HEADER, value);
        }

        let response = self.session.send(Request {
            method: method.clone(),
            url: url.to_owned(),
            headers,
            body: options.body,
            raise_exc: false,
        })?;

        transport::log_request_id(&response, &method, url, self.service_name());

        let body = response.json();
        if response.is_error() {
            return Err(fault::from_response(&response, body.as_ref(), Some(&method), Some(url)).into());
        }
        Ok((response, body))
    }

    /// Sends a `GET`.
    pub fn get(&self, url: &str) -> Result<(Response, Option<Value>), ClientError> {
        self.request(url, Method::GET, RequestOptions::new())
    }

    /// Sends a `POST` with a JSON body.
    pub fn post(&self, url: &str, body: Value) -> Result<(Response, Option<Value>), ClientError> {
        self.request(url, Method::POST, RequestOptions::new().with_body(body))
    }

    /// Sends a `PUT` with a JSON body.
    pub fn put(&self, url: &str, body: Value) -> Result<(Response, Option<Value>), ClientError> {
        self.request(url, Method::PUT, RequestOptions::new().with_body(body))
    }

    /// Sends a `DELETE`.
    pub fn delete(&self, url: &str) -> Result<(Response, Option<Value>), ClientError> {
        self.request(url, Method::DELETE, RequestOptions::new())
    }

    fn service_name(&self) -> &str {
        self.filter
            .service_name
            .as_deref()
            .unwrap_or(&self.filter.service_type)
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderName, HeaderValue};
    use reqwest::{Method, StatusCode};
    use serde_json::json;
    use tracing_test::traced_test;

    use super::SessionClient;
    use crate::fault::FaultKind;
    use crate::test_support::{FakeSession, count_lines};
    use crate::transport::{RequestOptions, Response, TransportError};
    use crate::version::ApiVersion;
    use crate::ClientError;

    const REQUEST_ID_LINE: &str = "used request id req-1";

    fn reply(status: u16, body: &serde_json::Value) -> Response {
        Response::new(StatusCode::from_u16(status).expect("valid status"))
            .with_header(
                HeaderName::from_static("x-openstack-request-id"),
                HeaderValue::from_static("req-1"),
            )
            .with_text(body.to_string())
    }

    fn create_volume() -> RequestOptions {
        RequestOptions::new().with_body(json!({
            "volume": {"status": "creating", "imageRef": "username", "attach_status": "detached"},
            "authenticated": "True"
        }))
    }

    fn assert_request_id_logged_once(lines: &[&str]) -> Result<(), String> {
        match count_lines(lines, REQUEST_ID_LINE) {
            1 => Ok(()),
            n => Err(format!("expected one request id line, found {n}")),
        }
    }

    #[test]
    fn base_url_drops_path() {
        let session = FakeSession::replying(Response::new(StatusCode::OK))
            .with_endpoint("http://192.168.122.104:8776/v3/de50d1f33a38415fadfd3e1dea28f4d3");
        let client = SessionClient::new(&session).with_microversion("3.0".parse().expect("valid"));

        let base = client.get_base_url().expect("endpoint resolves");
        assert_eq!(base.as_str(), "http://192.168.122.104:8776/");
    }

    #[test]
    fn base_url_requires_an_endpoint() {
        let session = FakeSession::replying(Response::new(StatusCode::OK));
        let error = SessionClient::new(&session)
            .get_base_url()
            .expect_err("no endpoint");
        assert!(matches!(error, ClientError::EndpointNotFound(_)));
    }

    #[test]
    #[traced_test]
    fn accepted_response_is_returned_unchanged() {
        let body = json!({
            "text": {"volume": {"status": "creating", "id": "431253c0-e203-4da2-88df-60c756942aaf", "size": 1}},
            "code": 202
        });
        let session = FakeSession::replying(reply(202, &body));
        let client = SessionClient::new(&session);

        let (response, parsed) = client
            .request("/volumes", Method::POST, create_volume())
            .expect("202 is not a fault");

        assert_eq!(response.status, StatusCode::ACCEPTED);
        assert_eq!(parsed, Some(body));
        logs_assert(assert_request_id_logged_once);
    }

    #[test]
    #[traced_test]
    fn bad_request_is_mapped() {
        let body = json!({
            "badRequest": {
                "message": "Invalid image identifier or unable to access requested image.",
                "code": 400
            }
        });
        let session = FakeSession::replying(reply(400, &body));
        let client = SessionClient::new(&session);

        let error = client
            .request("/volumes", Method::POST, create_volume())
            .expect_err("400 is a fault");

        assert_eq!(
            error.as_api_error().map(|fault| fault.kind),
            Some(FaultKind::BadRequest)
        );
        logs_assert(assert_request_id_logged_once);
    }

    #[test]
    #[traced_test]
    fn over_limit_is_mapped() {
        let body = json!({"overLimitFault": {"message": "This request was rate-limited.", "code": 413}});
        let session = FakeSession::replying(reply(413, &body));
        let client = SessionClient::new(&session);

        let error = client.get("/volumes").expect_err("413 is a fault");

        let fault = error.as_api_error().expect("api error");
        assert_eq!(fault.kind, FaultKind::OverLimit);
        assert_eq!(fault.message, "This request was rate-limited.");
        logs_assert(assert_request_id_logged_once);
    }

    #[test]
    #[traced_test]
    fn session_authorization_failure_propagates_unmapped() {
        let session =
            FakeSession::failing(|| TransportError::AuthorizationFailure("token expired".to_owned()));
        let client = SessionClient::new(&session);

        let error = client
            .request("/volumes", Method::POST, create_volume())
            .expect_err("session fails");

        assert!(matches!(
            error,
            ClientError::Transport(TransportError::AuthorizationFailure(_))
        ));
        assert!(error.as_api_error().is_none());
        assert!(!logs_contain("used request id"));
    }

    #[test]
    fn microversion_header_is_sent_when_minor_is_set() {
        let session = FakeSession::replying(Response::new(StatusCode::OK));

        SessionClient::new(&session)
            .with_microversion("3.27".parse().expect("valid"))
            .get("/volumes")
            .expect("ok");
        SessionClient::new(&session)
            .with_microversion("3.0".parse().expect("valid"))
            .get("/volumes")
            .expect("ok");

        let sent = session.sent();
        assert_eq!(
            sent[0].headers.get("OpenStack-API-Version").map(String::as_str),
            Some("volume 3.27")
        );
        assert!(!sent[1].headers.contains_key("OpenStack-API-Version"));
        assert!(sent.iter().all(|request| !request.raise_exc));
    }

    #[test]
    fn caller_headers_are_matched_without_case() {
        let session = FakeSession::replying(Response::new(StatusCode::OK));
        let options = RequestOptions::new()
            .with_header("accept", "text/plain")
            .with_header("openstack-api-version", "volume 3.0");

        SessionClient::new(&session)
            .with_microversion("3.27".parse().expect("valid"))
            .request("/volumes", Method::GET, options)
            .expect("ok");

        let sent = session.sent();
        assert_eq!(sent[0].headers.len(), 2);
        assert_eq!(sent[0].headers["accept"], "text/plain");
        assert_eq!(sent[0].headers["OpenStack-API-Version"], "volume 3.27");
    }

    #[test]
    fn api_version_selects_service_type() {
        let session = FakeSession::replying(Response::new(StatusCode::OK))
            .with_endpoint("http://cinder:8776/v2/p1");
        let client = SessionClient::new(&session).with_api_version(ApiVersion::V2);

        assert_eq!(client.api_version(), Some(ApiVersion::V2));
        assert_eq!(client.filter.service_type, "volumev2");
        assert_eq!(client.get_endpoint().expect("endpoint"), "http://cinder:8776/v2/p1");
    }
}
