use std::fmt;
use std::time::Duration;

use crate::ClientError;
use crate::catalog::Interface;

/// Identity credentials used by [`crate::HttpClient`] for direct authentication.
///
/// Fixed for the lifetime of a client.
#[derive(Clone, Eq, PartialEq)]
pub struct Credentials {
    username: String,
    password: Option<String>,
    project: Option<String>,
    tenant_id: Option<String>,
    auth_url: String,
}

impl Credentials {
    /// Creates credentials for `username` against the identity endpoint `auth_url`.
    pub fn new(username: impl Into<String>, auth_url: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: None,
            project: None,
            tenant_id: None,
            auth_url: auth_url.into(),
        }
    }

    /// Loads credentials from the standard `OS_*` environment variables.
    ///
    /// `OS_USERNAME` and `OS_AUTH_URL` are required. Project names are read
    /// from `OS_TENANT_NAME` or `OS_PROJECT_NAME`, ids from `OS_TENANT_ID` or
    /// `OS_PROJECT_ID`.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let first = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| lookup(*name).filter(|value| !value.is_empty()))
        };

        let username =
            first(&["OS_USERNAME"]).ok_or(ClientError::MissingConfiguration("OS_USERNAME"))?;
        let auth_url =
            first(&["OS_AUTH_URL"]).ok_or(ClientError::MissingConfiguration("OS_AUTH_URL"))?;

        Ok(Self {
            username,
            password: first(&["OS_PASSWORD"]),
            project: first(&["OS_TENANT_NAME", "OS_PROJECT_NAME"]),
            tenant_id: first(&["OS_TENANT_ID", "OS_PROJECT_ID"]),
            auth_url,
        })
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the project (tenant) name.
    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Sets the project (tenant) id, preferred over the name when authenticating.
    #[must_use]
    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| crate::redact::REDACTED))
            .field("project", &self.project)
            .field("tenant_id", &self.tenant_id)
            .field("auth_url", &self.auth_url)
            .finish()
    }
}

/// Tunables for [`crate::HttpClient`].
#[derive(Clone)]
pub struct HttpOptions {
    pub http_log_debug: bool,
    pub timeout: Option<Duration>,
    /// Skip TLS certificate verification.
    pub insecure: bool,
    pub service_type: String,
    pub service_name: Option<String>,
    pub endpoint_type: Interface,
    pub region_name: Option<String>,
    /// Endpoint used instead of the one found in the service catalog.
    pub bypass_url: Option<String>,
    /// Token obtained out of band; used together with `bypass_url`.
    pub auth_token: Option<String>,
}

impl fmt::Debug for HttpOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpOptions")
            .field("http_log_debug", &self.http_log_debug)
            .field("timeout", &self.timeout)
            .field("insecure", &self.insecure)
            .field("service_type", &self.service_type)
            .field("service_name", &self.service_name)
            .field("endpoint_type", &self.endpoint_type)
            .field("region_name", &self.region_name)
            .field("bypass_url", &self.bypass_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| crate::redact::REDACTED))
            .finish()
    }
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            http_log_debug: false,
            timeout: None,
            insecure: false,
            service_type: "volume".to_owned(),
            service_name: None,
            endpoint_type: Interface::Public,
            region_name: None,
            bypass_url: None,
            auth_token: None,
        }
    }
}

impl HttpOptions {
    #[must_use]
    pub fn with_http_log_debug(mut self, enabled: bool) -> Self {
        self.http_log_debug = enabled;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    #[must_use]
    pub fn with_service_type(mut self, service_type: impl Into<String>) -> Self {
        self.service_type = service_type.into();
        self
    }

    #[must_use]
    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = Some(service_name.into());
        self
    }

    #[must_use]
    pub fn with_endpoint_type(mut self, endpoint_type: Interface) -> Self {
        self.endpoint_type = endpoint_type;
        self
    }

    #[must_use]
    pub fn with_region_name(mut self, region_name: impl Into<String>) -> Self {
        self.region_name = Some(region_name.into());
        self
    }

    #[must_use]
    pub fn with_bypass_url(mut self, bypass_url: impl Into<String>) -> Self {
        self.bypass_url = Some(bypass_url.into());
        self
    }

    #[must_use]
    pub fn with_auth_token(mut self, auth_token: impl Into<String>) -> Self {
        self.auth_token = Some(auth_token.into());
        self
    }
}
