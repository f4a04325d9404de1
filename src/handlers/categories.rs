use axum::{extract::State, response::Response};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    errors::ServiceError,
    handlers::common::{created_response, success_response, validate_input, AppJson},
    AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    summary = "List book categories",
    responses(
        (status = 200, description = "Categories with book counts", body = [crate::services::categories::CategoryView]),
    ),
    tag = "books"
)]
pub async fn list_categories(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let categories = state.services.categories.list_categories().await?;
    Ok(success_response(categories))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    summary = "Create a category (admin)",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = crate::services::categories::CategoryView),
        (status = 400, description = "Validation error", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already in use", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "books"
)]
pub async fn create_category(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateCategoryRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    let category = state
        .services
        .categories
        .create_category(request.name.trim().to_string(), request.description)
        .await?;
    Ok(created_response("Category created", category))
}
