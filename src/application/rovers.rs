//! Rover lookups served through the cache-aside resolver.

use std::sync::Arc;

use tracing::instrument;

use crate::{
    application::provider::{ProviderError, RoverProvider},
    cache::{CacheAside, CacheKey},
    domain::{EarthDate, Manifest, PhotoSet, RoverId, Sol},
};

#[derive(Clone)]
pub struct RoverService {
    provider: Arc<dyn RoverProvider>,
    cache: Arc<CacheAside>,
}

impl RoverService {
    pub fn new(provider: Arc<dyn RoverProvider>, cache: Arc<CacheAside>) -> Self {
        Self { provider, cache }
    }

    pub fn cache(&self) -> &CacheAside {
        &self.cache
    }

    #[instrument(skip_all, fields(rover = %rover))]
    pub async fn manifest(&self, rover: &RoverId) -> Result<Manifest, ProviderError> {
        let key = CacheKey::manifest(rover);
        self.cache
            .resolve(&key, || self.provider.fetch_manifest(rover))
            .await
    }

    #[instrument(skip_all, fields(rover = %rover, sol = %sol))]
    pub async fn photos_by_sol(&self, rover: &RoverId, sol: Sol) -> Result<PhotoSet, ProviderError> {
        let key = CacheKey::sol(rover, sol);
        self.cache
            .resolve(&key, || self.provider.fetch_photos_by_sol(rover, sol))
            .await
    }

    #[instrument(skip_all, fields(rover = %rover, earth_date = %date))]
    pub async fn photos_by_earth_date(
        &self,
        rover: &RoverId,
        date: &EarthDate,
    ) -> Result<PhotoSet, ProviderError> {
        let key = CacheKey::earth_date(rover, date);
        self.cache
            .resolve(&key, || self.provider.fetch_photos_by_earth_date(rover, date))
            .await
    }
}
