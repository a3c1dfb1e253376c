use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderDetails, OrderState};
use crate::domain::ports::OrderRepository;

/// Service type shared with the HTTP layer, independent of the store backend.
pub type DynOrderService = OrderService<Box<dyn OrderRepository>>;

/// The only mutator of order aggregates.
///
/// Every operation is a single load/modify/save against the repository.
/// Concurrent writers to the same order are detected by the repository's
/// version check and surface as `DomainError::Conflict`; nothing is retried.
pub struct OrderService<R> {
    repo: R,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_order(&self, details: OrderDetails) -> Result<Order, DomainError> {
        let order = self.repo.save(Order::create(details, Utc::now()))?;
        log::info!(
            "Created order {} with {} item(s)",
            display_id(&order),
            order.items.len()
        );
        Ok(order)
    }

    pub fn list_orders(&self) -> Result<Vec<Order>, DomainError> {
        self.repo.find_all()
    }

    /// Absence is a normal outcome here, not an error.
    pub fn get_order(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        self.repo.find_by_id(id)
    }

    pub fn update_order(&self, id: Uuid, details: OrderDetails) -> Result<Order, DomainError> {
        let mut order = self.load(id)?;

        if let Err(e) = order.replace_details(details) {
            log::warn!("Rejected update of order {}: {}", id, e);
            return Err(e);
        }

        let order = self.repo.save(order)?;
        log::info!("Updated order {} ({} item(s))", id, order.items.len());
        Ok(order)
    }

    pub fn change_state(&self, id: Uuid, target: &str) -> Result<Order, DomainError> {
        let mut order = self.load(id)?;
        let target: OrderState = target.parse()?;
        let from = order.state;

        if let Err(e) = order.transition_to(target) {
            log::warn!("Rejected transition of order {} to {}: {}", id, target, e);
            return Err(e);
        }

        let order = self.repo.save(order)?;
        log::info!("Order {} moved from {} to {}", id, from, target);
        Ok(order)
    }

    pub fn delete_order(&self, id: Uuid) -> Result<(), DomainError> {
        if !self.repo.exists_by_id(id)? {
            return Err(DomainError::NotFound(id));
        }
        self.repo.delete_by_id(id)?;
        log::info!("Deleted order {}", id);
        Ok(())
    }

    fn load(&self, id: Uuid) -> Result<Order, DomainError> {
        self.repo.find_by_id(id)?.ok_or(DomainError::NotFound(id))
    }
}

fn display_id(order: &Order) -> String {
    order
        .id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "<unsaved>".to_string())
}
