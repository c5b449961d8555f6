use std::sync::Arc;
use std::time::Duration;

use crate::application::rovers::RoverService;
use crate::cache::CacheBackend;

#[derive(Clone)]
pub struct HttpState {
    pub rovers: Arc<RoverService>,
    pub request_timeout: Duration,
}

impl HttpState {
    pub fn new(rovers: Arc<RoverService>, request_timeout: Duration) -> Self {
        Self {
            rovers,
            request_timeout,
        }
    }

    pub fn cache_backend(&self) -> &CacheBackend {
        self.rovers.cache().backend()
    }
}
