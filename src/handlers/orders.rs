use axum::{
    extract::{Extension, State},
    response::Response,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    entities::OrderStatus,
    errors::ServiceError,
    handlers::common::{
        created_response, success_response, validate_input, AppJson, AppPath, AppQuery,
    },
    services::orders::CreateOrderInput,
    AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(length(min = 10, max = 500, message = "Shipping address must be at least 10 characters"))]
    pub shipping_address: String,
    pub payment_method_id: Uuid,
    /// Restricts checkout to these cart lines; omit or send an empty list to check out the whole cart
    pub cart_item_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConfirmOrderRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct OrderStatusFilter {
    pub status: Option<OrderStatus>,
}

/// Check out the caller's cart
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Create order",
    description = "Convert the caller's cart, or the selected cart items, into an order with a pending payment",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = crate::services::orders::OrderView,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Empty cart, insufficient stock or invalid input", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Payment method not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(request): AppJson<CreateOrderRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;

    let order = state
        .services
        .orders
        .create_order(
            user.user_id,
            CreateOrderInput {
                shipping_address: request.shipping_address.trim().to_string(),
                payment_method_id: request.payment_method_id,
                cart_item_ids: request.cart_item_ids,
            },
        )
        .await?;

    Ok(created_response("Order created successfully", order))
}

/// The caller's orders, newest first
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    summary = "List my orders",
    responses(
        (status = 200, description = "Orders retrieved", body = [crate::services::orders::OrderView]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, ServiceError> {
    let orders = state.services.orders.list_orders(user.user_id).await?;
    Ok(success_response(orders))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    description = "Owners see their own orders; admins see any order",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order retrieved", body = crate::services::orders::OrderView),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Response, ServiceError> {
    let order = state.services.orders.get_order(&user, id).await?;
    Ok(success_response(order))
}

#[utoipa::path(
    patch,
    path = "/api/v1/orders/{id}/confirm",
    summary = "Set order status (admin)",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = ConfirmOrderRequest,
    responses(
        (status = 200, description = "Order updated", body = crate::services::orders::OrderView),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Only admins can confirm orders", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn confirm_order(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<ConfirmOrderRequest>,
) -> Result<Response, ServiceError> {
    let order = state
        .services
        .orders
        .confirm_order(&admin, id, request.status)
        .await?;
    Ok(success_response(order))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/all",
    summary = "List all orders (admin)",
    params(OrderStatusFilter),
    responses(
        (status = 200, description = "Orders retrieved", body = [crate::services::orders::OrderView]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    AppQuery(filter): AppQuery<OrderStatusFilter>,
) -> Result<Response, ServiceError> {
    let orders = state
        .services
        .orders
        .list_all_orders(&admin, filter.status)
        .await?;
    Ok(success_response(orders))
}
