use chrono::Utc;
use diesel::dsl::exists;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{LineItem, Order, OrderState};
use crate::domain::ports::OrderRepository;
use crate::schema::{line_items, orders};

use super::models::{LineItemRow, NewLineItemRow, NewOrderRow, OrderChangeset, OrderRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

// ── Row mapping ───────────────────────────────────────────────────────────────

fn to_domain(row: OrderRow, items: Vec<LineItemRow>) -> Result<Order, DomainError> {
    let state: OrderState = row.state.parse().map_err(|_| {
        DomainError::Internal(format!(
            "order {} has unknown state '{}' in the store",
            row.id, row.state
        ))
    })?;

    Ok(Order {
        id: Some(row.id),
        customer_name: row.customer_name,
        customer_contact: row.customer_contact,
        total_amount: row.total_amount,
        state,
        created_at: row.created_at,
        version: row.version,
        items: items
            .into_iter()
            .map(|i| LineItem {
                id: Some(i.id),
                name: i.name,
                quantity: i.quantity,
                unit_price: i.unit_price,
            })
            .collect(),
    })
}

/// Writes the full item collection of `order_id`, assigning fresh identifiers.
fn insert_items(
    conn: &mut PgConnection,
    order_id: Uuid,
    items: &mut [LineItem],
) -> Result<(), DomainError> {
    if items.is_empty() {
        return Ok(());
    }

    let ids: Vec<Uuid> = items.iter().map(|_| Uuid::new_v4()).collect();
    let rows: Vec<NewLineItemRow> = items
        .iter()
        .zip(&ids)
        .zip(0..)
        .map(|((item, id), position)| NewLineItemRow {
            id: *id,
            order_id,
            position,
            name: &item.name,
            quantity: item.quantity,
            unit_price: &item.unit_price,
        })
        .collect();

    diesel::insert_into(line_items::table)
        .values(&rows)
        .execute(conn)?;

    for (item, id) in items.iter_mut().zip(ids) {
        item.id = Some(id);
    }
    Ok(())
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderRepository for DieselOrderRepository {
    fn save(&self, mut order: Order) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let order_id = match order.id {
                None => {
                    let order_id = Uuid::new_v4();
                    diesel::insert_into(orders::table)
                        .values(&NewOrderRow {
                            id: order_id,
                            customer_name: &order.customer_name,
                            customer_contact: &order.customer_contact,
                            total_amount: &order.total_amount,
                            state: order.state.as_str(),
                            version: 1,
                            created_at: order.created_at,
                        })
                        .execute(conn)?;
                    order.version = 1;
                    order_id
                }
                Some(order_id) => {
                    // Only touch the row if nobody saved it since it was loaded.
                    let updated = diesel::update(
                        orders::table
                            .filter(orders::id.eq(order_id))
                            .filter(orders::version.eq(order.version)),
                    )
                    .set(&OrderChangeset {
                        customer_name: &order.customer_name,
                        customer_contact: &order.customer_contact,
                        total_amount: &order.total_amount,
                        state: order.state.as_str(),
                        version: order.version + 1,
                        updated_at: Utc::now(),
                    })
                    .execute(conn)?;

                    if updated == 0 {
                        let still_there: bool =
                            diesel::select(exists(orders::table.filter(orders::id.eq(order_id))))
                                .get_result(conn)?;
                        return Err(if still_there {
                            DomainError::Conflict(order_id)
                        } else {
                            DomainError::NotFound(order_id)
                        });
                    }

                    diesel::delete(line_items::table.filter(line_items::order_id.eq(order_id)))
                        .execute(conn)?;
                    order.version += 1;
                    order_id
                }
            };

            insert_items(conn, order_id, &mut order.items)?;
            order.id = Some(order_id);
            Ok(order)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let order = orders::table
                .filter(orders::id.eq(id))
                .select(OrderRow::as_select())
                .first(conn)
                .optional()?;

            let Some(order) = order else {
                return Ok(None);
            };

            let items = LineItemRow::belonging_to(&order)
                .select(LineItemRow::as_select())
                .order(line_items::position.asc())
                .load(conn)?;

            to_domain(order, items).map(Some)
        })
    }

    fn find_all(&self) -> Result<Vec<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let rows: Vec<OrderRow> = orders::table
                .select(OrderRow::as_select())
                .order(orders::created_at.asc())
                .load(conn)?;

            let items = LineItemRow::belonging_to(&rows)
                .select(LineItemRow::as_select())
                .order(line_items::position.asc())
                .load::<LineItemRow>(conn)?
                .grouped_by(&rows);

            rows.into_iter()
                .zip(items)
                .map(|(row, items)| to_domain(row, items))
                .collect()
        })
    }

    fn exists_by_id(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let found: bool = diesel::select(exists(orders::table.filter(orders::id.eq(id))))
            .get_result(&mut conn)?;
        Ok(found)
    }

    fn delete_by_id(&self, id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        // line_items rows go with it through ON DELETE CASCADE.
        diesel::delete(orders::table.filter(orders::id.eq(id))).execute(&mut conn)?;
        Ok(())
    }
}
