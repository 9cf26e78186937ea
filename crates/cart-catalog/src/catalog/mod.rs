//! Service Catalogue
//!
//! Read access to the marketplace's service entities.

mod memory;

pub use memory::MemoryCatalog;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::Service;

/// Service lookup (Strategy pattern)
///
/// Implement this for whatever backs the marketplace listings.
#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    /// Fetch one service, `None` when it does not exist
    async fn get_service(&self, id: u64) -> Result<Option<Service>>;

    /// Fetch several services, skipping missing ones
    async fn get_services(&self, ids: &[u64]) -> Result<Vec<Service>> {
        let mut services = Vec::new();
        for id in ids {
            if let Some(service) = self.get_service(*id).await? {
                services.push(service);
            }
        }
        Ok(services)
    }

    /// Catalogue name
    fn name(&self) -> &str;
}
