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
    entities::UserRole,
    errors::ServiceError,
    handlers::common::{message_response, success_response, validate_input, AppJson, AppPath},
    services::users::UserChanges,
    AppState,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub full_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    pub role: Option<UserRole>,
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    summary = "List accounts (admin)",
    responses(
        (status = 200, description = "Accounts, newest first", body = [crate::services::users::UserView]),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "users"
)]
pub async fn list_users(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let users = state.services.users.list_users().await?;
    Ok(success_response(users))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    summary = "Get an account (admin)",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Account", body = crate::services::users::UserView),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Response, ServiceError> {
    let user = state.services.users.get_user(id).await?;
    Ok(success_response(user))
}

#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    summary = "Edit an account or change its role (admin)",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Account updated", body = crate::services::users::UserView),
        (status = 400, description = "Validation error", body = crate::errors::ErrorResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already in use", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<UpdateUserRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    let user = state
        .services
        .users
        .update_user(
            id,
            UserChanges {
                full_name: request.full_name,
                email: request.email,
                phone: request.phone,
                address: request.address,
                role: request.role,
            },
        )
        .await?;
    Ok(success_response(user))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    summary = "Delete an account (admin)",
    description = "Refused while the account has placed or confirmed any order",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "Account has order history", body = crate::errors::ErrorResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.users.delete_user(admin.user_id, id).await?;
    Ok(message_response("User deleted successfully"))
}
