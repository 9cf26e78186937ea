//! Error Types for the Service Catalogue

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Price resolver error: {0}")]
    Resolver(#[from] cart_core::CartError),
}
