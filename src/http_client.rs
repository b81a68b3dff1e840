use std::collections::BTreeMap;
use std::fmt;

use reqwest::{Method, Url};
use serde_json::{Value, json};
use tracing::debug;

use crate::catalog::{EndpointFilter, ServiceCatalog};
use crate::config::{Credentials, HttpOptions};
use crate::fault;
use crate::redact::Redactor;
use crate::transport::{self, ReqwestTransport, Request, RequestOptions, Response, Transport};
use crate::ClientError;

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = concat!("cinder-client-rs/", env!("CARGO_PKG_VERSION"));

/// Headers and JSON-encoded body of a request, as handed to
/// [`HttpClient::http_log_req`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestLog {
    pub headers: Option<BTreeMap<String, String>>,
    pub data: Option<String>,
}

/// Blocking volume API client that authenticates with its own credentials.
///
/// Authentication happens lazily on the first [`Self::cs_request`]; the
/// resulting token and management URL are kept for later calls.
pub struct HttpClient<T = ReqwestTransport> {
    credentials: Credentials,
    auth_url: Url,
    options: HttpOptions,
    transport: T,
    auth_token: Option<String>,
    management_url: Option<String>,
}

impl<T: fmt::Debug> fmt::Debug for HttpClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("credentials", &self.credentials)
            .field("auth_url", &self.auth_url.as_str())
            .field("options", &self.options)
            .field("transport", &self.transport)
            .field("authenticated", &self.auth_token.is_some())
            .field("management_url", &self.management_url)
            .finish()
    }
}

impl HttpClient<ReqwestTransport> {
    /// Creates a client sending requests through `reqwest`.
    pub fn new(credentials: Credentials, options: HttpOptions) -> Result<Self, ClientError> {
        let transport = ReqwestTransport::with_settings(options.timeout, options.insecure)?;
        Self::with_transport(credentials, options, transport)
    }
}

impl<T: Transport> HttpClient<T> {
    /// Creates a client sending requests through `transport`.
    pub fn with_transport(
        credentials: Credentials,
        options: HttpOptions,
        transport: T,
    ) -> Result<Self, ClientError> {
        let auth_url = Url::parse(credentials.auth_url())
            .map_err(|_| ClientError::InvalidBaseUrl(credentials.auth_url().to_owned()))?;

        // A token obtained out of band is only usable with a known endpoint.
        let (auth_token, management_url) = match (&options.auth_token, &options.bypass_url) {
            (Some(token), Some(url)) => (Some(token.clone()), Some(url.clone())),
            _ => (None, None),
        };

        Ok(Self {
            credentials,
            auth_url,
            options,
            transport,
            auth_token,
            management_url,
        })
    }

    pub fn http_log_debug(&self) -> bool {
        self.options.http_log_debug
    }

    pub fn set_http_log_debug(&mut self, enabled: bool) {
        self.options.http_log_debug = enabled;
    }

    /// Token from the last successful authentication.
    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    /// Volume endpoint from the last successful authentication.
    pub fn management_url(&self) -> Option<&str> {
        self.management_url.as_deref()
    }

    /// Logs an outgoing request as a `curl` command line plus its body.
    ///
    /// Sensitive headers and body fields are masked, and any value masked in
    /// either place is also scrubbed from the rest of the output.
    pub fn http_log_req(&self, method: &Method, url: &str, log: &RequestLog) {
        if !self.options.http_log_debug {
            return;
        }

        let mut redactor = self.redactor();

        let mut command = format!("curl -g -i -X {method} {url}");
        if let Some(headers) = &log.headers {
            for (name, value) in headers {
                let shown = redactor.header_value(name, value);
                command.push_str(&format!(" -H \"{name}: {shown}\""));
            }
        }

        let body = log.data.as_deref().map(|data| {
            match serde_json::from_str::<Value>(data) {
                Ok(parsed) => redactor.json(&parsed).to_string(),
                Err(_) => "<omitted: body is not valid JSON>".to_owned(),
            }
        });

        debug!("REQ: {}", redactor.scrub(&command));
        if let Some(body) = body {
            debug!("REQ BODY: {}", redactor.scrub(&body));
        }
    }

    /// Logs a response status line, headers and body with secrets masked.
    pub fn http_log_resp(&self, response: &Response) {
        if !self.options.http_log_debug {
            return;
        }

        let mut redactor = self.redactor();

        let headers: Vec<String> = response
            .headers
            .iter()
            .map(|(name, value)| {
                let value = String::from_utf8_lossy(value.as_bytes());
                format!("{name}: {}", redactor.header_value(name.as_str(), &value))
            })
            .collect();

        let body = match response.json() {
            Some(parsed) => redactor.json(&parsed).to_string(),
            None => response.text.clone(),
        };

        debug!(
            "RESP: [{}] {{{}}}",
            response.status.as_u16(),
            redactor.scrub(&headers.join(", "))
        );
        debug!("RESP BODY: {}", redactor.scrub(&body));
    }

    /// Sends a request to an absolute `url`.
    ///
    /// Returns the response and its parsed JSON body; statuses >= 400 become
    /// [`ClientError::Api`].
    pub fn request(
        &self,
        url: &str,
        method: Method,
        options: RequestOptions,
    ) -> Result<(Response, Option<Value>), ClientError> {
        let mut headers = options.headers;
        transport::set_header(&mut headers, "User-Agent", USER_AGENT);
        transport::set_header(&mut headers, "Accept", "application/json");
        if options.body.is_some() {
            transport::set_header(&mut headers, "Content-Type", "application/json");
        }

        let data = options.body.as_ref().map(serde_json::to_string).transpose()?;
        self.http_log_req(
            &method,
            url,
            &RequestLog {
                headers: Some(headers.clone()),
                data,
            },
        );

        let response = self.transport.send(Request {
            method: method.clone(),
            url: url.to_owned(),
            headers,
            body: options.body,
            raise_exc: false,
        })?;

        self.http_log_resp(&response);
        transport::log_request_id(&response, &method, url, self.service_name());

        let body = response.json();
        if response.is_error() {
            return Err(fault::from_response(&response, body.as_ref(), Some(&method), Some(url)).into());
        }
        Ok((response, body))
    }

    /// Obtains a token and the volume endpoint from the identity service.
    ///
    /// Auth URLs containing `v2.0` use identity v2.0 password auth; any other
    /// URL uses the legacy header exchange.
    pub fn authenticate(&mut self) -> Result<(), ClientError> {
        let (token, endpoint) = if self.auth_url.path().contains("v2.0") {
            self.v2_auth()?
        } else {
            self.v1_auth()?
        };

        self.auth_token = Some(token);
        self.management_url = Some(self.options.bypass_url.clone().unwrap_or(endpoint));
        Ok(())
    }

    /// Sends an authenticated request to a path relative to the volume endpoint.
    pub fn cs_request(
        &mut self,
        path: &str,
        method: Method,
        options: RequestOptions,
    ) -> Result<(Response, Option<Value>), ClientError> {
        if self.auth_token.is_none() || self.management_url.is_none() {
            self.authenticate()?;
        }

        let (Some(token), Some(management_url)) = (&self.auth_token, &self.management_url) else {
            return Err(ClientError::AuthorizationFailure(
                "authentication did not provide a token and endpoint".to_owned(),
            ));
        };

        let url = build_url(management_url, path)?;
        let mut options = options.with_header("X-Auth-Token", token.clone());
        if let Some(project) = self.project_header() {
            options = options.with_header("X-Auth-Project-Id", project);
        }

        self.request(url.as_str(), method, options)
    }

    /// Sends an authenticated `GET`.
    pub fn get(&mut self, path: &str) -> Result<(Response, Option<Value>), ClientError> {
        self.cs_request(path, Method::GET, RequestOptions::new())
    }

    /// Sends an authenticated `POST` with a JSON body.
    pub fn post(&mut self, path: &str, body: Value) -> Result<(Response, Option<Value>), ClientError> {
        self.cs_request(path, Method::POST, RequestOptions::new().with_body(body))
    }

    /// Sends an authenticated `PUT` with a JSON body.
    pub fn put(&mut self, path: &str, body: Value) -> Result<(Response, Option<Value>), ClientError> {
        self.cs_request(path, Method::PUT, RequestOptions::new().with_body(body))
    }

    /// Sends an authenticated `DELETE`.
    pub fn delete(&mut self, path: &str) -> Result<(Response, Option<Value>), ClientError> {
        self.cs_request(path, Method::DELETE, RequestOptions::new())
    }

    fn v2_auth(&self) -> Result<(String, String), ClientError> {
        let mut auth = json!({
            "passwordCredentials": {
                "username": self.credentials.username(),
                "password": self.credentials.password().unwrap_or_default(),
            }
        });
        if let Some(tenant_id) = self.credentials.tenant_id() {
            auth["tenantId"] = json!(tenant_id);
        } else if let Some(project) = self.credentials.project() {
            auth["tenantName"] = json!(project);
        }

        let token_url = build_url(self.auth_url.as_str(), "tokens")?;
        let (_, body) = self.request(
            token_url.as_str(),
            Method::POST,
            RequestOptions::new().with_body(json!({ "auth": auth })),
        )?;
        let body = body.ok_or_else(|| {
            ClientError::AuthorizationFailure("identity service returned an empty body".to_owned())
        })?;

        let catalog = ServiceCatalog::from_body(&body)?;
        let endpoint = match &self.options.bypass_url {
            Some(url) => url.clone(),
            None => catalog.url_for(&self.endpoint_filter())?,
        };
        Ok((catalog.token_id().to_owned(), endpoint))
    }

    fn v1_auth(&self) -> Result<(String, String), ClientError> {
        let mut options = RequestOptions::new()
            .with_header("X-Auth-User", self.credentials.username())
            .with_header("X-Auth-Key", self.credentials.password().unwrap_or_default());
        if let Some(project) = self.credentials.project() {
            options = options.with_header("X-Auth-Project-Id", project);
        }

        let (response, _) = self.request(self.auth_url.as_str(), Method::GET, options)?;

        let token = response.header("x-auth-token").ok_or_else(|| {
            ClientError::AuthorizationFailure("response carries no X-Auth-Token".to_owned())
        })?;
        let endpoint = response
            .header("x-server-management-url")
            .map(str::to_owned)
            .or_else(|| self.options.bypass_url.clone())
            .ok_or_else(|| {
                ClientError::AuthorizationFailure(
                    "response carries no X-Server-Management-Url".to_owned(),
                )
            })?;
        Ok((token.to_owned(), endpoint))
    }

    fn endpoint_filter(&self) -> EndpointFilter {
        let mut filter = EndpointFilter::new(self.options.service_type.clone())
            .with_interface(self.options.endpoint_type);
        if let Some(region) = &self.options.region_name {
            filter = filter.with_region_name(region.clone());
        }
        if let Some(name) = &self.options.service_name {
            filter = filter.with_service_name(name.clone());
        }
        filter
    }

    fn project_header(&self) -> Option<String> {
        self.credentials
            .project()
            .or(self.credentials.tenant_id())
            .map(str::to_owned)
    }

    fn service_name(&self) -> &str {
        self.options
            .service_name
            .as_deref()
            .unwrap_or(&self.options.service_type)
    }

    fn redactor(&self) -> Redactor {
        let mut redactor = Redactor::new();
        if let Some(password) = self.credentials.password() {
            redactor.add_secret(password);
        }
        if let Some(token) = &self.auth_token {
            redactor.add_secret(token.clone());
        }
        redactor
    }
}

fn build_url(base: &str, path: &str) -> Result<Url, ClientError> {
    let base =
        Url::parse(base).map_err(|_| ClientError::InvalidBaseUrl(base.to_owned()))?;
    let relative = path.trim_start_matches('/');
    ensure_trailing_slash(base)
        .join(relative)
        .map_err(|_| ClientError::InvalidPath(path.to_owned()))
}

fn ensure_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let mut path = url.path().to_owned();
        path.push('/');
        url.set_path(&path);
    }
    url
}
