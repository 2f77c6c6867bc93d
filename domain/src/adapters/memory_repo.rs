use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::{CoreError, Product, ProductId, ProductRepository};

/// In-memory product store. Records are kept ordered by id and a mutex guards
/// both the map and the id sequence.
pub struct InMemoryProductRepo {
    inner: Mutex<State>,
}

struct State {
    products: BTreeMap<ProductId, Product>,
    /// `None` once every id up to `ProductId::MAX` has been handed out or seen.
    next_id: Option<ProductId>,
}

impl InMemoryProductRepo {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(State {
                products: BTreeMap::new(),
                next_id: Some(1),
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, CoreError> {
        self.inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))
    }
}

impl Default for InMemoryProductRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductRepository for InMemoryProductRepo {
    fn find_all(&self) -> Result<Vec<Product>, CoreError> {
        let state = self.lock()?;
        Ok(state.products.values().cloned().collect())
    }

    fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, CoreError> {
        let state = self.lock()?;
        Ok(state.products.get(&id).cloned())
    }

    fn save(&self, mut product: Product) -> Result<Product, CoreError> {
        let mut state = self.lock()?;
        let id = match product.id {
            Some(id) => id,
            None => state
                .next_id
                .ok_or_else(|| CoreError::Repository("id space exhausted".into()))?,
        };
        // Keep the sequence ahead of every id seen, assigned or caller-provided.
        if state.next_id.is_some_and(|next| id >= next) {
            state.next_id = id.checked_add(1);
        }
        product.id = Some(id);
        state.products.insert(id, product.clone());
        Ok(product)
    }

    fn delete_by_id(&self, id: ProductId) -> Result<(), CoreError> {
        let mut state = self.lock()?;
        state.products.remove(&id);
        Ok(())
    }
}
