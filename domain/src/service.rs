use tracing::debug;

use crate::{CoreError, Product, ProductDto, ProductId, ProductRepository};

/// Application service for the product catalog.
///
/// Holds no state of its own beyond the repository it was built with, so a
/// single instance can be shared across concurrent callers. Consistency under
/// concurrent writes to the same id is left to the repository.
pub struct ProductService<R: ProductRepository> {
    repo: R,
}

impl<R: ProductRepository> ProductService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Every stored product, in the repository's natural order.
    pub fn list_all(&self) -> Result<Vec<ProductDto>, CoreError> {
        Ok(self
            .repo
            .find_all()?
            .into_iter()
            .map(ProductDto::from)
            .collect())
    }

    /// Fetch a single product or fail with `NotFound`.
    pub fn get_by_id(&self, id: ProductId) -> Result<ProductDto, CoreError> {
        match self.repo.find_by_id(id)? {
            Some(product) => Ok(product.into()),
            None => Err(CoreError::product_not_found(id)),
        }
    }

    /// Create a product. Any id on the incoming dto is discarded; the returned
    /// dto carries the id the repository assigned.
    pub fn create(&self, mut dto: ProductDto) -> Result<ProductDto, CoreError> {
        dto.id = None;
        let saved = self.repo.save(Product::from(dto.clone()))?;
        dto.id = saved.id;
        debug!(id = ?dto.id, "product created");
        Ok(dto)
    }

    /// Delete an existing product or fail with `NotFound`.
    pub fn delete(&self, id: ProductId) -> Result<(), CoreError> {
        if self.repo.find_by_id(id)?.is_none() {
            return Err(CoreError::product_not_deletable(id));
        }
        self.repo.delete_by_id(id)?;
        debug!(id, "product deleted");
        Ok(())
    }

    /// Overwrite the product stored under `id` with the dto's fields.
    ///
    /// The dto id is forced to `id`. There is no existence check: an unknown
    /// id is inserted as a new record. The dto is returned as given, not
    /// re-read from the repository.
    pub fn update(&self, id: ProductId, mut dto: ProductDto) -> Result<ProductDto, CoreError> {
        dto.id = Some(id);
        self.repo.save(Product::from(dto.clone()))?;
        debug!(id, "product updated");
        Ok(dto)
    }
}
