pub mod orders;

use utoipa::OpenApi;

use crate::errors::{ErrorBody, FieldError};

#[derive(OpenApi)]
#[openapi(
    paths(
        orders::list_orders,
        orders::create_order,
        orders::get_order,
        orders::update_order,
        orders::change_state,
        orders::delete_order,
    ),
    components(schemas(
        orders::OrderRequest,
        orders::LineItemRequest,
        orders::OrderResponse,
        orders::LineItemResponse,
        ErrorBody,
        FieldError,
    )),
    tags((name = "orders", description = "Order lifecycle management"))
)]
pub struct ApiDoc;
