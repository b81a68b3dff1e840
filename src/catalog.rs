use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use crate::ClientError;

/// Which of a service's published endpoints to use.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Interface {
    #[default]
    Public,
    Internal,
    Admin,
}

impl Interface {
    /// Name used by sessions (`public`, `internal`, `admin`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Internal => "internal",
            Self::Admin => "admin",
        }
    }

    /// Key of the endpoint URL in an identity v2.0 catalog entry.
    pub fn catalog_key(self) -> &'static str {
        match self {
            Self::Public => "publicURL",
            Self::Internal => "internalURL",
            Self::Admin => "adminURL",
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interface {
    type Err = ClientError;

    /// Accepts both session names (`public`) and catalog keys (`publicURL`).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "public" | "publicURL" => Ok(Self::Public),
            "internal" | "internalURL" => Ok(Self::Internal),
            "admin" | "adminURL" => Ok(Self::Admin),
            other => Err(ClientError::EndpointNotFound(format!(
                "unknown endpoint type '{other}'"
            ))),
        }
    }
}

/// Criteria selecting one endpoint of the volume service.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EndpointFilter {
    pub service_type: String,
    pub interface: Interface,
    pub region_name: Option<String>,
    pub service_name: Option<String>,
}

impl EndpointFilter {
    pub fn new(service_type: impl Into<String>) -> Self {
        Self {
            service_type: service_type.into(),
            interface: Interface::default(),
            region_name: None,
            service_name: None,
        }
    }

    #[must_use]
    pub fn with_interface(mut self, interface: Interface) -> Self {
        self.interface = interface;
        self
    }

    #[must_use]
    pub fn with_region_name(mut self, region_name: impl Into<String>) -> Self {
        self.region_name = Some(region_name.into());
        self
    }

    #[must_use]
    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = Some(service_name.into());
        self
    }
}

/// Token and service catalog returned by identity v2.0 password auth.
#[derive(Clone, Debug, Deserialize)]
pub struct ServiceCatalog {
    access: Access,
}

#[derive(Clone, Debug, Deserialize)]
struct Access {
    token: Token,
    #[serde(rename = "serviceCatalog", default)]
    service_catalog: Vec<CatalogEntry>,
}

#[derive(Clone, Debug, Deserialize)]
struct Token {
    id: String,
}

#[derive(Clone, Debug, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    endpoints: Vec<CatalogEndpoint>,
}

#[derive(Clone, Debug, Deserialize)]
struct CatalogEndpoint {
    #[serde(default)]
    region: Option<String>,
    #[serde(rename = "publicURL", default)]
    public_url: Option<String>,
    #[serde(rename = "internalURL", default)]
    internal_url: Option<String>,
    #[serde(rename = "adminURL", default)]
    admin_url: Option<String>,
}

impl CatalogEndpoint {
    fn url(&self, interface: Interface) -> Option<&str> {
        match interface {
            Interface::Public => self.public_url.as_deref(),
            Interface::Internal => self.internal_url.as_deref(),
            Interface::Admin => self.admin_url.as_deref(),
        }
    }
}

impl ServiceCatalog {
    /// Decodes a token response body.
    pub fn from_body(body: &Value) -> Result<Self, ClientError> {
        Ok(Self::deserialize(body)?)
    }

    /// Returns the issued token id.
    pub fn token_id(&self) -> &str {
        &self.access.token.id
    }

    /// Returns the single endpoint URL matching `filter`.
    ///
    /// Fails with [`ClientError::EndpointNotFound`] when nothing matches and
    /// [`ClientError::AmbiguousEndpoints`] when more than one endpoint does.
    pub fn url_for(&self, filter: &EndpointFilter) -> Result<String, ClientError> {
        let matches: Vec<&str> = self
            .access
            .service_catalog
            .iter()
            .filter(|entry| entry.service_type == filter.service_type)
            .filter(|entry| match (&filter.service_name, &entry.name) {
                (Some(wanted), Some(name)) => wanted == name,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .flat_map(|entry| entry.endpoints.iter())
            .filter(|endpoint| match &filter.region_name {
                Some(region) => endpoint.region.as_deref() == Some(region.as_str()),
                None => true,
            })
            .filter_map(|endpoint| endpoint.url(filter.interface))
            .collect();

        match matches.as_slice() {
            [] => Err(ClientError::EndpointNotFound(format!(
                "no {} endpoint for service type '{}'",
                filter.interface.catalog_key(),
                filter.service_type
            ))),
            [single] => Ok((*single).to_owned()),
            many => Err(ClientError::AmbiguousEndpoints(
                many.iter().map(|url| (*url).to_owned()).collect(),
            )),
        }
    }
}
