//! In-memory Catalogue
//!
//! For testing and demo purposes.

use async_trait::async_trait;
use rust_decimal_macros::dec;
use serde_json::json;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::ServiceCatalog;
use crate::error::Result;
use crate::model::Service;

/// Catalogue backed by a map
pub struct MemoryCatalog {
    services: RwLock<HashMap<u64, Service>>,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_services(services: impl IntoIterator<Item = Service>) -> Self {
        Self {
            services: RwLock::new(services.into_iter().map(|s| (s.id, s)).collect()),
        }
    }

    /// A handful of listings covering every price source
    pub fn with_demo_services() -> Self {
        Self::with_services([
            Service::new(101, "Logo Design", "/services/logo-design")
                .with_thumbnail("/assets/img/logo-design.jpg")
                .with_meta("_price", json!("49.00"))
                .with_package("basic", "Basic", dec!(49.00))
                .with_package("standard", "Standard", dec!(89.00))
                .with_package("premium", "Premium", dec!(149.00))
                .with_addon(1, "Source files", dec!(15.00))
                .with_addon(2, "Express delivery", dec!(25.00)),
            Service::new(102, "WordPress Setup", "/services/wordpress-setup")
                .with_thumbnail("/assets/img/wordpress-setup.jpg")
                .with_meta("_service_price", json!(120)),
            Service::new(103, "SEO Audit", "/services/seo-audit")
                .with_meta("_regular_price", json!("75.50")),
            Service::new(104, "Consultation Call", "/services/consultation")
                .with_meta("price", json!(0)),
            Service::new(105, "Custom Quote", "/services/custom-quote")
                .with_meta("_price", json!("")),
        ])
    }

    pub async fn insert(&self, service: Service) {
        self.services.write().await.insert(service.id, service);
    }

    pub async fn len(&self) -> usize {
        self.services.read().await.len()
    }
}

#[async_trait]
impl ServiceCatalog for MemoryCatalog {
    async fn get_service(&self, id: u64) -> Result<Option<Service>> {
        Ok(self.services.read().await.get(&id).cloned())
    }

    fn name(&self) -> &str {
        "MemoryCatalog"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_catalog() {
        let catalog = MemoryCatalog::with_demo_services();

        let logo = catalog.get_service(101).await.unwrap().unwrap();
        assert_eq!(logo.title, "Logo Design");
        assert_eq!(logo.package("premium").unwrap().price, dec!(149.00));
        assert!(catalog.get_service(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_services_skips_missing() {
        let catalog = MemoryCatalog::with_demo_services();

        let services = catalog.get_services(&[101, 999, 103]).await.unwrap();
        let ids: Vec<u64> = services.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![101, 103]);
    }

    #[tokio::test]
    async fn test_insert_replaces() {
        let catalog = MemoryCatalog::new();
        catalog.insert(Service::new(1, "A", "/a")).await;
        catalog.insert(Service::new(1, "B", "/b")).await;

        assert_eq!(catalog.len().await, 1);
        assert_eq!(catalog.get_service(1).await.unwrap().unwrap().title, "B");
    }
}
