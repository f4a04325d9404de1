use axum::{
    extract::{Extension, State},
    response::Response,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::common::{
        created_response, message_response, success_response, validate_input, AppJson,
    },
    services::users::{ProfileChanges, Registration},
    AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 128, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub full_name: String,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub full_name: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 6, max = 128, message = "Password must be at least 6 characters"))]
    pub new_password: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    summary = "Create an account",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = crate::services::users::AuthResponse),
        (status = 400, description = "Validation error", body = crate::errors::ErrorResponse),
        (status = 409, description = "User already exists", body = crate::errors::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    let session = state
        .services
        .users
        .register(Registration {
            username: request.username,
            email: request.email,
            password: request.password,
            full_name: request.full_name,
            phone: request.phone,
            address: request.address,
        })
        .await?;
    Ok(created_response("Registration successful", session))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    summary = "Log in",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = crate::services::users::AuthResponse),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    let session = state
        .services
        .users
        .login(&request.email, &request.password)
        .await?;
    Ok(success_response(session))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/profile",
    summary = "My profile",
    responses(
        (status = 200, description = "Profile", body = crate::services::users::UserView),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "auth"
)]
pub async fn profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, ServiceError> {
    let profile = state.services.users.profile(user.user_id).await?;
    Ok(success_response(profile))
}

#[utoipa::path(
    put,
    path = "/api/v1/auth/profile",
    summary = "Update my profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = crate::services::users::UserView),
        (status = 400, description = "Validation error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "auth"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(request): AppJson<UpdateProfileRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    let profile = state
        .services
        .users
        .update_profile(
            user.user_id,
            ProfileChanges {
                full_name: request.full_name,
                phone: request.phone,
                address: request.address,
            },
        )
        .await?;
    Ok(success_response(profile))
}

#[utoipa::path(
    put,
    path = "/api/v1/auth/change-password",
    summary = "Change my password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Current password is incorrect", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "auth"
)]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(request): AppJson<ChangePasswordRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    state
        .services
        .users
        .change_password(
            user.user_id,
            &request.current_password,
            &request.new_password,
        )
        .await?;
    Ok(message_response("Password changed successfully"))
}
