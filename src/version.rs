use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::ClientError;

/// Major volume API versions with a client implementation.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ApiVersion {
    /// Served by [`crate::v1::Client`].
    V1,
    /// Served by [`crate::v2::Client`].
    V2,
}

const CLIENT_CLASSES: &[(&str, ApiVersion)] = &[("1", ApiVersion::V1), ("2", ApiVersion::V2)];

impl ApiVersion {
    /// Version tag as used in configuration (`"1"`, `"2"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "1",
            Self::V2 => "2",
        }
    }

    /// URL path segment announcing this version (`"v1"`, `"v2"`).
    pub fn url_segment(self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
        }
    }

    /// Catalog service type registered for this version.
    pub fn service_type(self) -> &'static str {
        match self {
            Self::V1 => "volume",
            Self::V2 => "volumev2",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiVersion {
    type Err = ClientError;

    fn from_str(version: &str) -> Result<Self, Self::Err> {
        get_client_class(version)
    }
}

/// Resolves a version tag to its client implementation.
///
/// Matching is exact and case-sensitive.
pub fn get_client_class(version: &str) -> Result<ApiVersion, ClientError> {
    CLIENT_CLASSES
        .iter()
        .find(|(tag, _)| *tag == version)
        .map(|(_, api_version)| *api_version)
        .ok_or_else(|| {
            ClientError::UnsupportedVersion(format!(
                "Invalid client version '{version}'. must be one of: {}",
                supported_tags()
            ))
        })
}

/// Extracts the version tag from an endpoint URL such as
/// `http://host:8776/v2/<project-id>`.
pub fn get_volume_api_from_url(url: &str) -> Result<&'static str, ClientError> {
    let unsupported = || {
        ClientError::UnsupportedVersion(format!(
            "Invalid client version in '{url}'. must be one of: {}",
            supported_tags()
        ))
    };

    let parsed = Url::parse(url).map_err(|_| unsupported())?;
    let segments: Vec<&str> = parsed.path().split('/').collect();

    CLIENT_CLASSES
        .iter()
        .find(|(_, api_version)| segments.contains(&api_version.url_segment()))
        .map(|(tag, _)| *tag)
        .ok_or_else(unsupported)
}

fn supported_tags() -> String {
    CLIENT_CLASSES
        .iter()
        .map(|(tag, _)| *tag)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Header used to request a volume API microversion.
pub const API_VERSION_HEADER: &str = "OpenStack-API-Version";

/// A `major.minor` microversion such as `3.0` or `3.27`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ApiMicroversion {
    pub major: u16,
    pub minor: u16,
}

impl ApiMicroversion {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    /// Value of the `OpenStack-API-Version` header, or `None` for `X.0`.
    ///
    /// The service treats a missing header as the base version, so `X.0` is
    /// never sent explicitly.
    pub fn header_value(self) -> Option<String> {
        (self.minor != 0).then(|| format!("volume {self}"))
    }
}

impl fmt::Display for ApiMicroversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ApiMicroversion {
    type Err = ClientError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            ClientError::UnsupportedVersion(format!(
                "'{value}' is not a valid microversion; expected 'X.Y'"
            ))
        };
        let (major, minor) = value.split_once('.').ok_or_else(invalid)?;
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}
