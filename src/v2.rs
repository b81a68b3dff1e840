//! Volume API v2 (`volumev2` service type).

use crate::client::{Backend, VolumeClient};
use crate::version::ApiVersion;

/// Client for the v2 volume API.
#[derive(Debug)]
pub struct Client {
    backend: Backend,
}

impl VolumeClient for Client {
    const API_VERSION: ApiVersion = ApiVersion::V2;

    fn from_backend(backend: Backend) -> Self {
        Self { backend }
    }

    fn backend(&self) -> &Backend {
        &self.backend
    }

    fn backend_mut(&mut self) -> &mut Backend {
        &mut self.backend
    }
}
