use std::sync::{PoisonError, RwLock};

use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::Order;
use crate::domain::ports::OrderRepository;

/// In-memory order store.
///
/// Behaves like the Postgres repository (store-assigned identifiers, version
/// checks on save, whole-collection item replacement) without a database.
/// Orders are listed in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<Vec<Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of line items held across all orders.
    pub fn line_item_count(&self) -> Result<usize, DomainError> {
        let orders = self.orders.read().map_err(poisoned)?;
        Ok(orders.iter().map(|o| o.items.len()).sum())
    }
}

fn poisoned<T>(_: PoisonError<T>) -> DomainError {
    DomainError::Internal("order store lock poisoned".to_string())
}

fn assign_item_ids(order: &mut Order) {
    for item in &mut order.items {
        item.id = Some(Uuid::new_v4());
    }
}

impl OrderRepository for InMemoryOrderRepository {
    fn save(&self, mut order: Order) -> Result<Order, DomainError> {
        let mut orders = self.orders.write().map_err(poisoned)?;

        match order.id {
            None => {
                order.id = Some(Uuid::new_v4());
                order.version = 1;
                assign_item_ids(&mut order);
                orders.push(order.clone());
            }
            Some(id) => {
                let existing = orders
                    .iter_mut()
                    .find(|o| o.id == Some(id))
                    .ok_or(DomainError::NotFound(id))?;
                if existing.version != order.version {
                    return Err(DomainError::Conflict(id));
                }
                order.version += 1;
                assign_item_ids(&mut order);
                *existing = order.clone();
            }
        }

        Ok(order)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let orders = self.orders.read().map_err(poisoned)?;
        Ok(orders.iter().find(|o| o.id == Some(id)).cloned())
    }

    fn find_all(&self) -> Result<Vec<Order>, DomainError> {
        let orders = self.orders.read().map_err(poisoned)?;
        Ok(orders.clone())
    }

    fn exists_by_id(&self, id: Uuid) -> Result<bool, DomainError> {
        let orders = self.orders.read().map_err(poisoned)?;
        Ok(orders.iter().any(|o| o.id == Some(id)))
    }

    fn delete_by_id(&self, id: Uuid) -> Result<(), DomainError> {
        let mut orders = self.orders.write().map_err(poisoned)?;
        orders.retain(|o| o.id != Some(id));
        Ok(())
    }
}
