use std::borrow::Cow;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::application::DynOrderService;
use crate::domain::errors::DomainError;
use crate::domain::order::{LineItem, Order, OrderDetails, OrderState};
use crate::errors::{AppError, ErrorBody, FieldError};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    /// Ignored; line item identifiers are assigned when the order is saved.
    #[serde(default)]
    #[schema(value_type = Option<Uuid>)]
    pub id: Option<IgnoredAny>,
    #[validate(
        custom(function = "not_blank"),
        length(max = 100, message = "must not exceed 100 characters")
    )]
    pub name: String,
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub quantity: i32,
    /// Decimal price, as a JSON number or string, e.g. "9.99"
    #[validate(custom(function = "positive"))]
    #[schema(value_type = String, example = "9.99")]
    pub unit_price: BigDecimal,
}

/// Inbound order. `id`, `state` and `createdAt` are accepted in any shape so
/// that a response can be sent back as-is, but they are never read.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    #[serde(default)]
    #[schema(value_type = Option<Uuid>)]
    pub id: Option<IgnoredAny>,
    #[validate(
        custom(function = "not_blank"),
        length(max = 100, message = "must not exceed 100 characters")
    )]
    pub customer_name: String,
    #[validate(
        custom(function = "not_blank"),
        length(max = 100, message = "must not exceed 100 characters")
    )]
    pub customer_contact: String,
    #[validate(custom(function = "positive"))]
    #[schema(value_type = String, example = "100.00")]
    pub total_amount: BigDecimal,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "CREATED")]
    pub state: Option<IgnoredAny>,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub created_at: Option<IgnoredAny>,
    /// Absent or `null` means no items.
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(nested)]
    pub items: Vec<LineItemRequest>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItemResponse {
    pub id: Option<Uuid>,
    pub name: String,
    pub quantity: i32,
    #[schema(value_type = String, example = "9.99")]
    pub unit_price: BigDecimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Option<Uuid>,
    pub customer_name: String,
    pub customer_contact: String,
    #[schema(value_type = String, example = "100.00")]
    pub total_amount: BigDecimal,
    #[schema(value_type = String, example = "CREATED")]
    pub state: OrderState,
    pub created_at: DateTime<Utc>,
    pub items: Vec<LineItemResponse>,
}

#[derive(Debug, Deserialize)]
pub struct StateChangeParams {
    /// Target state name, matched case-insensitively.
    pub state: String,
}

// ── Mapping ──────────────────────────────────────────────────────────────────

impl From<LineItemRequest> for LineItem {
    fn from(req: LineItemRequest) -> Self {
        LineItem::new(req.name, req.quantity, req.unit_price)
    }
}

impl From<OrderRequest> for OrderDetails {
    fn from(req: OrderRequest) -> Self {
        OrderDetails {
            customer_name: req.customer_name,
            customer_contact: req.customer_contact,
            total_amount: req.total_amount,
            items: req.items.into_iter().map(LineItem::from).collect(),
        }
    }
}

impl From<LineItem> for LineItemResponse {
    fn from(item: LineItem) -> Self {
        LineItemResponse {
            id: item.id,
            name: item.name,
            quantity: item.quantity,
            unit_price: item.unit_price,
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        OrderResponse {
            id: order.id,
            customer_name: order.customer_name,
            customer_contact: order.customer_contact,
            total_amount: order.total_amount,
            state: order.state,
            created_at: order.created_at,
            items: order.items.into_iter().map(LineItemResponse::from).collect(),
        }
    }
}

// ── Validation ───────────────────────────────────────────────────────────────

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("not_blank", "must not be blank"));
    }
    Ok(())
}

fn positive(value: &BigDecimal) -> Result<(), ValidationError> {
    if *value <= BigDecimal::from(0) {
        return Err(invalid("positive", "must be greater than zero"));
    }
    Ok(())
}

/// `customer_name` -> `customerName`, matching the JSON keys.
fn json_field_name(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn collect_field_errors(errors: &ValidationErrors, prefix: &str, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let path = format!("{}{}", prefix, json_field_name(field));
        match kind {
            ValidationErrorsKind::Field(errs) => {
                out.extend(errs.iter().map(|e| FieldError {
                    field: path.clone(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                }));
            }
            ValidationErrorsKind::Struct(inner) => {
                collect_field_errors(inner, &format!("{path}."), out);
            }
            ValidationErrorsKind::List(entries) => {
                for (index, inner) in entries {
                    collect_field_errors(inner, &format!("{path}[{index}]."), out);
                }
            }
        }
    }
}

/// Flattens validator output into `(field, message)` pairs, sorted by field.
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    collect_field_errors(errors, "", &mut out);
    out.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.message.cmp(&b.message)));
    out
}

fn validated(req: OrderRequest) -> Result<OrderRequest, AppError> {
    req.validate()
        .map_err(|e| AppError::Validation(field_errors(&e)))?;
    Ok(req)
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /api/orders
///
/// Returns every stored order with its line items.
#[utoipa::path(
    get,
    path = "/api/orders",
    responses(
        (status = 200, description = "All orders", body = [OrderResponse]),
        (status = 500, description = "Internal server error", body = ErrorBody),
    ),
    tag = "orders"
)]
pub async fn list_orders(service: web::Data<DynOrderService>) -> Result<HttpResponse, AppError> {
    let orders = web::block(move || service.list_orders()).await??;

    let body: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// POST /api/orders
///
/// Creates a new order. The order always starts in `CREATED` with the current
/// time as its creation timestamp, whatever the request says.
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = OrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody),
    ),
    tag = "orders"
)]
pub async fn create_order(
    service: web::Data<DynOrderService>,
    body: web::Json<OrderRequest>,
) -> Result<HttpResponse, AppError> {
    let details = OrderDetails::from(validated(body.into_inner())?);

    let order = web::block(move || service.create_order(details)).await??;

    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /api/orders/{id}
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody),
    ),
    tag = "orders"
)]
pub async fn get_order(
    service: web::Data<DynOrderService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || service.get_order(order_id)).await??;

    match order {
        Some(order) => Ok(HttpResponse::Ok().json(OrderResponse::from(order))),
        None => Err(DomainError::NotFound(order_id).into()),
    }
}

/// PUT /api/orders/{id}
///
/// Overwrites the customer fields and total, and replaces the line items
/// wholesale. Orders in a final state are rejected.
#[utoipa::path(
    put,
    path = "/api/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    request_body = OrderRequest,
    responses(
        (status = 200, description = "Order updated", body = OrderResponse),
        (status = 400, description = "Validation failed or order in final state", body = ErrorBody),
        (status = 404, description = "Order not found", body = ErrorBody),
        (status = 409, description = "Order modified concurrently", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody),
    ),
    tag = "orders"
)]
pub async fn update_order(
    service: web::Data<DynOrderService>,
    path: web::Path<Uuid>,
    body: web::Json<OrderRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let details = OrderDetails::from(validated(body.into_inner())?);

    let order = web::block(move || service.update_order(order_id, details)).await??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// PATCH /api/orders/{id}/state?state=SHIPPED
#[utoipa::path(
    patch,
    path = "/api/orders/{id}/state",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("state" = String, Query, description = "Target state, case-insensitive"),
    ),
    responses(
        (status = 200, description = "State changed", body = OrderResponse),
        (status = 400, description = "Unknown state, final state or illegal transition", body = ErrorBody),
        (status = 404, description = "Order not found", body = ErrorBody),
        (status = 409, description = "Order modified concurrently", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody),
    ),
    tag = "orders"
)]
pub async fn change_state(
    service: web::Data<DynOrderService>,
    path: web::Path<Uuid>,
    query: web::Query<StateChangeParams>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let target = query.into_inner().state;

    let order = web::block(move || service.change_state(order_id, &target)).await??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// DELETE /api/orders/{id}
#[utoipa::path(
    delete,
    path = "/api/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 404, description = "Order not found", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody),
    ),
    tag = "orders"
)]
pub async fn delete_order(
    service: web::Data<DynOrderService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    web::block(move || service.delete_order(order_id)).await??;

    Ok(HttpResponse::NoContent().finish())
}

/// Registers the order routes and the extractor error handlers.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("Malformed request body: {err}")).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("Invalid query string: {err}")).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("Invalid order id: {err}")).into()
    }))
    .service(
        web::scope("/api/orders")
            .route("", web::get().to(list_orders))
            .route("", web::post().to(create_order))
            .route("/{id}", web::get().to(get_order))
            .route("/{id}", web::put().to(update_order))
            .route("/{id}", web::delete().to(delete_order))
            .route("/{id}/state", web::patch().to(change_state)),
    );
}
