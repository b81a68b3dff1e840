//! Volume API v1 (`volume` service type).

use crate::client::{Backend, VolumeClient};
use crate::version::ApiVersion;

/// Client for the v1 volume API.
#[derive(Debug)]
pub struct Client {
    backend: Backend,
}

impl VolumeClient for Client {
    const API_VERSION: ApiVersion = ApiVersion::V1;

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
