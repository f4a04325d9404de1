use axum::{
    extract::{Extension, State},
    response::Response,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::common::{success_response, validate_input, AppJson, AppPath},
    AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub book_id: Uuid,
    #[validate(range(min = 1, max = 1000))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateCartItemRequest {
    #[validate(range(min = 1, max = 1000))]
    pub quantity: i32,
}

#[utoipa::path(
    get,
    path = "/api/v1/cart",
    summary = "Get my cart",
    responses(
        (status = 200, description = "Cart with items", body = crate::services::cart::CartView),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, ServiceError> {
    let cart = state.services.cart.get_cart(user.user_id).await?;
    Ok(success_response(cart))
}

#[utoipa::path(
    post,
    path = "/api/v1/cart",
    summary = "Add a book to my cart",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Updated cart", body = crate::services::cart::CartView),
        (status = 400, description = "Insufficient stock or invalid quantity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(request): AppJson<AddToCartRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    let cart = state
        .services
        .cart
        .add_item(user.user_id, request.book_id, request.quantity)
        .await?;
    Ok(success_response(cart))
}

#[utoipa::path(
    patch,
    path = "/api/v1/cart/items/{id}",
    summary = "Change a cart line's quantity",
    params(("id" = Uuid, Path, description = "Cart item ID")),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = crate::services::cart::CartView),
        (status = 400, description = "Insufficient stock or invalid quantity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart item not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "cart"
)]
pub async fn update_cart_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<UpdateCartItemRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    let cart = state
        .services
        .cart
        .update_item(user.user_id, id, request.quantity)
        .await?;
    Ok(success_response(cart))
}

#[utoipa::path(
    delete,
    path = "/api/v1/cart/items/{id}",
    summary = "Remove a cart line",
    params(("id" = Uuid, Path, description = "Cart item ID")),
    responses(
        (status = 200, description = "Updated cart", body = crate::services::cart::CartView),
        (status = 404, description = "Cart item not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "cart"
)]
pub async fn remove_cart_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Response, ServiceError> {
    let cart = state.services.cart.remove_item(user.user_id, id).await?;
    Ok(success_response(cart))
}

#[utoipa::path(
    delete,
    path = "/api/v1/cart",
    summary = "Empty my cart",
    responses(
        (status = 200, description = "Emptied cart", body = crate::services::cart::CartView),
    ),
    security(("Bearer" = [])),
    tag = "cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, ServiceError> {
    let cart = state.services.cart.clear(user.user_id).await?;
    Ok(success_response(cart))
}
