use thiserror::Error;
use uuid::Uuid;

use super::order::OrderState;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Order not found: {0}")]
    NotFound(Uuid),
    #[error("Order in final state {0} cannot be modified")]
    FinalState(OrderState),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Cannot move order from {from} to {to}; mark it RETURNED if the delivery failed")]
    IllegalTransition { from: OrderState, to: OrderState },
    #[error("Order {0} was modified concurrently")]
    Conflict(Uuid),
    #[error("Internal error: {0}")]
    Internal(String),
}
