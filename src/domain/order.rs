use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

/// Lifecycle state of an order.
///
/// `Created` is the only initial state. `Delivered`, `Cancelled` and
/// `Returned` are terminal: once reached, the order accepts no further
/// field updates or transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    #[default]
    Created,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderState {
    pub const ALL: [OrderState; 6] = [
        OrderState::Created,
        OrderState::Confirmed,
        OrderState::Shipped,
        OrderState::Delivered,
        OrderState::Cancelled,
        OrderState::Returned,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderState::Delivered | OrderState::Cancelled | OrderState::Returned
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderState::Created => "CREATED",
            OrderState::Confirmed => "CONFIRMED",
            OrderState::Shipped => "SHIPPED",
            OrderState::Delivered => "DELIVERED",
            OrderState::Cancelled => "CANCELLED",
            OrderState::Returned => "RETURNED",
        }
    }

    /// Checks whether an order in `self` may move to `target`.
    ///
    /// Every move out of a non-terminal state is allowed except
    /// `Shipped -> Cancelled`.
    pub fn ensure_transition(self, target: OrderState) -> Result<(), DomainError> {
        if self.is_terminal() {
            return Err(DomainError::FinalState(self));
        }
        if self == OrderState::Shipped && target == OrderState::Cancelled {
            return Err(DomainError::IllegalTransition {
                from: self,
                to: target,
            });
        }
        Ok(())
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive parse of a state name.
impl FromStr for OrderState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderState::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::InvalidState(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    /// Assigned by the store when the item is written.
    pub id: Option<Uuid>,
    pub name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

impl LineItem {
    pub fn new(name: impl Into<String>, quantity: i32, unit_price: BigDecimal) -> Self {
        Self {
            id: None,
            name: name.into(),
            quantity,
            unit_price,
        }
    }

    fn detached(self) -> Self {
        Self { id: None, ..self }
    }
}

/// The caller-editable part of an order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDetails {
    pub customer_name: String,
    pub customer_contact: String,
    pub total_amount: BigDecimal,
    pub items: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    /// `None` until the order has been saved for the first time.
    pub id: Option<Uuid>,
    pub customer_name: String,
    pub customer_contact: String,
    pub total_amount: BigDecimal,
    pub state: OrderState,
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped by the store on every save.
    pub version: i64,
    pub items: Vec<LineItem>,
}

impl Order {
    /// Builds a new, not yet persisted order in state `Created`, stamped with
    /// `now` truncated to microseconds, the precision Postgres keeps.
    /// Identifiers on the supplied items are dropped.
    pub fn create(details: OrderDetails, now: DateTime<Utc>) -> Self {
        let OrderDetails {
            customer_name,
            customer_contact,
            total_amount,
            items,
        } = details;

        Self {
            id: None,
            customer_name,
            customer_contact,
            total_amount,
            state: OrderState::Created,
            created_at: now.trunc_subsecs(6),
            version: 0,
            items: items.into_iter().map(LineItem::detached).collect(),
        }
    }

    /// Overwrites the customer fields and total, and replaces the whole
    /// line-item collection. Identifier, state, creation time and version are
    /// left as they are.
    pub fn replace_details(&mut self, details: OrderDetails) -> Result<(), DomainError> {
        if self.state.is_terminal() {
            return Err(DomainError::FinalState(self.state));
        }

        self.customer_name = details.customer_name;
        self.customer_contact = details.customer_contact;
        self.total_amount = details.total_amount;

        self.items.clear();
        self.items
            .extend(details.items.into_iter().map(LineItem::detached));
        Ok(())
    }

    pub fn transition_to(&mut self, target: OrderState) -> Result<(), DomainError> {
        self.state.ensure_transition(target)?;
        self.state = target;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn details(items: Vec<LineItem>) -> OrderDetails {
        OrderDetails {
            customer_name: "Jose".to_string(),
            customer_contact: "12345".to_string(),
            total_amount: BigDecimal::from(100),
            items,
        }
    }

    fn stored(state: OrderState) -> Order {
        let mut order = Order::create(
            details(vec![LineItem {
                id: None,
                name: "Keyboard".to_string(),
                quantity: 1,
                unit_price: BigDecimal::from(40),
            }]),
            Utc::now(),
        );
        order.id = Some(Uuid::new_v4());
        order.items[0].id = Some(Uuid::new_v4());
        order.version = 3;
        order.state = state;
        order
    }

    #[test]
    fn terminal_states() {
        let terminal: Vec<_> = OrderState::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![
                OrderState::Delivered,
                OrderState::Cancelled,
                OrderState::Returned
            ]
        );
    }

    #[test]
    fn transition_matrix_is_exhaustive() {
        for from in OrderState::ALL {
            for to in OrderState::ALL {
                let result = from.ensure_transition(to);
                match (from, to) {
                    (f, _) if f.is_terminal() => {
                        assert!(
                            matches!(result, Err(DomainError::FinalState(s)) if s == f),
                            "{from} -> {to} should be rejected as final"
                        );
                    }
                    (OrderState::Shipped, OrderState::Cancelled) => {
                        assert!(
                            matches!(
                                result,
                                Err(DomainError::IllegalTransition {
                                    from: OrderState::Shipped,
                                    to: OrderState::Cancelled
                                })
                            ),
                            "{from} -> {to} should be illegal"
                        );
                    }
                    _ => assert!(result.is_ok(), "{from} -> {to} should be allowed"),
                }
            }
        }
    }

    #[test]
    fn shipped_can_be_returned() {
        assert!(OrderState::Shipped
            .ensure_transition(OrderState::Returned)
            .is_ok());
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("shipped".parse::<OrderState>().unwrap(), OrderState::Shipped);
        assert_eq!("Confirmed".parse::<OrderState>().unwrap(), OrderState::Confirmed);
        assert_eq!("RETURNED".parse::<OrderState>().unwrap(), OrderState::Returned);
    }

    #[test]
    fn parse_rejects_unknown_names() {
        for input in ["", "PENDING", "ship", " SHIPPED", "CANCELED"] {
            let err = input.parse::<OrderState>().unwrap_err();
            assert!(matches!(err, DomainError::InvalidState(ref s) if s == input));
        }
    }

    #[test]
    fn display_round_trips_through_parse() {
        for state in OrderState::ALL {
            assert_eq!(state.to_string().parse::<OrderState>().unwrap(), state);
        }
    }

    #[test]
    fn serde_uses_upper_case_names() {
        assert_eq!(
            serde_json::to_string(&OrderState::Cancelled).unwrap(),
            "\"CANCELLED\""
        );
        let state: OrderState = serde_json::from_str("\"CONFIRMED\"").unwrap();
        assert_eq!(state, OrderState::Confirmed);
    }

    #[test]
    fn create_keeps_microsecond_precision() {
        let now = Utc
            .with_ymd_and_hms(2024, 5, 1, 12, 0, 43)
            .unwrap()
            .with_nanosecond(157_683_414)
            .unwrap();

        let order = Order::create(details(vec![]), now);

        assert_eq!(order.created_at.nanosecond(), 157_683_000);
        assert_eq!(order.created_at.timestamp(), now.timestamp());
    }

    #[test]
    fn create_forces_initial_state_and_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut item = LineItem::new("Mouse", 2, BigDecimal::from(15));
        item.id = Some(Uuid::new_v4());

        let order = Order::create(details(vec![item]), now);

        assert_eq!(order.id, None);
        assert_eq!(order.state, OrderState::Created);
        assert_eq!(order.created_at, now);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].id, None);
        assert_eq!(order.items[0].name, "Mouse");
    }

    #[test]
    fn replace_details_swaps_items_wholesale() {
        let mut order = stored(OrderState::Confirmed);
        let id = order.id;
        let created_at = order.created_at;

        let mut new_details = details(vec![
            LineItem::new("Monitor", 1, BigDecimal::from(200)),
            LineItem::new("Cable", 3, BigDecimal::from(5)),
        ]);
        new_details.customer_name = "Juan".to_string();
        new_details.total_amount = BigDecimal::from(215);

        order.replace_details(new_details).unwrap();

        assert_eq!(order.customer_name, "Juan");
        assert_eq!(order.total_amount, BigDecimal::from(215));
        assert_eq!(order.id, id);
        assert_eq!(order.created_at, created_at);
        assert_eq!(order.state, OrderState::Confirmed);
        assert_eq!(order.version, 3);
        let names: Vec<_> = order.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Monitor", "Cable"]);
        assert!(order.items.iter().all(|i| i.id.is_none()));
    }

    #[test]
    fn replace_details_with_no_items_empties_order() {
        let mut order = stored(OrderState::Created);
        order.replace_details(details(vec![])).unwrap();
        assert!(order.items.is_empty());
    }

    #[test]
    fn replace_details_rejected_in_terminal_state() {
        for state in OrderState::ALL.into_iter().filter(|s| s.is_terminal()) {
            let mut order = stored(state);
            let before = order.clone();
            let err = order.replace_details(details(vec![])).unwrap_err();
            assert!(matches!(err, DomainError::FinalState(s) if s == state));
            assert_eq!(order, before);
        }
    }

    #[test]
    fn transition_to_updates_state_only_when_allowed() {
        let mut order = stored(OrderState::Shipped);
        assert!(order.transition_to(OrderState::Cancelled).is_err());
        assert_eq!(order.state, OrderState::Shipped);

        order.transition_to(OrderState::Returned).unwrap();
        assert_eq!(order.state, OrderState::Returned);
    }
}
