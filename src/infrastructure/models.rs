use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::{line_items, orders};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_contact: String,
    pub total_amount: BigDecimal,
    pub state: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow<'a> {
    pub id: Uuid,
    pub customer_name: &'a str,
    pub customer_contact: &'a str,
    pub total_amount: &'a BigDecimal,
    pub state: &'a str,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

/// Columns rewritten when an existing order is saved. `created_at` is never
/// part of it.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = orders)]
pub struct OrderChangeset<'a> {
    pub customer_name: &'a str,
    pub customer_contact: &'a str,
    pub total_amount: &'a BigDecimal,
    pub state: &'a str,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = line_items)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LineItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = line_items)]
pub struct NewLineItemRow<'a> {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub name: &'a str,
    pub quantity: i32,
    pub unit_price: &'a BigDecimal,
}
