use std::sync::Arc;

use uuid::Uuid;

use super::errors::DomainError;
use super::order::Order;

/// Persistence port for order aggregates.
///
/// Each call is its own transaction. `save` inserts when the order has no
/// identifier and otherwise overwrites the stored row and its line items,
/// failing with `Conflict` when the stored version moved on since the order
/// was loaded. Deleting an order removes its line items with it.
pub trait OrderRepository: Send + Sync + 'static {
    fn save(&self, order: Order) -> Result<Order, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn find_all(&self) -> Result<Vec<Order>, DomainError>;
    fn exists_by_id(&self, id: Uuid) -> Result<bool, DomainError>;
    fn delete_by_id(&self, id: Uuid) -> Result<(), DomainError>;
}

macro_rules! forward_repository {
    ($wrapper:ident) => {
        impl<R: OrderRepository + ?Sized> OrderRepository for $wrapper<R> {
            fn save(&self, order: Order) -> Result<Order, DomainError> {
                (**self).save(order)
            }

            fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
                (**self).find_by_id(id)
            }

            fn find_all(&self) -> Result<Vec<Order>, DomainError> {
                (**self).find_all()
            }

            fn exists_by_id(&self, id: Uuid) -> Result<bool, DomainError> {
                (**self).exists_by_id(id)
            }

            fn delete_by_id(&self, id: Uuid) -> Result<(), DomainError> {
                (**self).delete_by_id(id)
            }
        }
    };
}

forward_repository!(Box);
forward_repository!(Arc);
