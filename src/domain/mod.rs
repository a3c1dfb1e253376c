pub mod errors;
pub mod order;
pub mod ports;

pub use errors::DomainError;
pub use order::{LineItem, Order, OrderDetails, OrderState};
pub use ports::OrderRepository;
