//! Domain library for the product catalog.
//!
//! Holds the product entity and transfer object, the repository port (trait),
//! the field mapper, and error definitions. Keep adapters and IO concerns out
//! of this crate; the only store living here is the in-memory one used for
//! tests and volatile runs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Integer identifier assigned by the store on first save.
pub type ProductId = i64;

/// Persisted product record.
#[derive(Clone, Debug, PartialEq)]
pub struct Product {
    /// `None` until the store assigns one.
    pub id: Option<ProductId>,
    pub name: String,
    pub quantity: i32,
    pub price: f64,
    pub notes: Option<String>,
}

impl Product {
    /// Build an unsaved product (no id yet).
    pub fn new<S: Into<String>>(name: S, quantity: i32, price: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            quantity,
            price,
            notes: None,
        }
    }
}

/// Boundary-facing representation of a product.
///
/// Callers may send any `id`; the service decides what the id ends up being
/// (cleared on create, forced to the path id on update).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductDto {
    #[serde(default)]
    pub id: Option<ProductId>,
    pub name: String,
    pub quantity: i32,
    pub price: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Repository port for persisting and loading products.
pub trait ProductRepository: Send + Sync {
    /// All products in the store's natural order.
    fn find_all(&self) -> Result<Vec<Product>, CoreError>;
    fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, CoreError>;
    /// Upsert keyed by id. A product without an id gets a fresh one; a product
    /// with an id overwrites that record, or is inserted under it if absent.
    /// Returns the product as stored, id populated.
    fn save(&self, product: Product) -> Result<Product, CoreError>;
    /// Removing an absent id is a no-op.
    fn delete_by_id(&self, id: ProductId) -> Result<(), CoreError>;
}

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No product with the requested id. The message names the id.
    #[error("{0}")]
    NotFound(String),
    #[error("repository error: {0}")]
    Repository(String),
}

impl CoreError {
    pub fn product_not_found(id: ProductId) -> Self {
        Self::NotFound(format!("product with id {id} not found"))
    }

    pub fn product_not_deletable(id: ProductId) -> Self {
        Self::NotFound(format!(
            "unable to delete product with id {id}: product does not exist"
        ))
    }
}

pub mod adapters;
pub mod mapper;
pub mod service;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_new_has_no_id() {
        let p = Product::new("Keyboard", 3, 49.9);
        assert_eq!(p.id, None);
        assert_eq!(p.name, "Keyboard");
        assert!(p.notes.is_none());
    }

    #[test]
    fn not_found_messages_name_the_id() {
        let err = CoreError::product_not_found(42);
        assert_eq!(err.to_string(), "product with id 42 not found");

        let err = CoreError::product_not_deletable(7);
        assert!(err.to_string().contains("id 7"));
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn dto_deserializes_without_id_or_notes() {
        let dto: ProductDto =
            serde_json::from_str(r#"{"name":"Mouse","quantity":2,"price":10.5}"#).unwrap();
        assert_eq!(dto.id, None);
        assert_eq!(dto.notes, None);
        assert_eq!(dto.quantity, 2);
    }
}
