//! Field-by-field conversion between the stored entity and the transfer object.

use crate::{Product, ProductDto};

impl From<Product> for ProductDto {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            quantity: p.quantity,
            price: p.price,
            notes: p.notes,
        }
    }
}

impl From<ProductDto> for Product {
    fn from(dto: ProductDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            quantity: dto.quantity,
            price: dto.price,
            notes: dto.notes,
        }
    }
}
