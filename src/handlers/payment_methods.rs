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
pub struct CreatePaymentMethodRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[utoipa::path(
    get,
    path = "/api/v1/payment-methods",
    summary = "List active payment methods",
    responses(
        (status = 200, description = "Payment methods", body = [crate::services::payment_methods::PaymentMethodView]),
    ),
    tag = "payments"
)]
pub async fn list_payment_methods(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let methods = state.services.payment_methods.list_active().await?;
    Ok(success_response(methods))
}

#[utoipa::path(
    post,
    path = "/api/v1/payment-methods",
    summary = "Create payment method (admin)",
    request_body = CreatePaymentMethodRequest,
    responses(
        (status = 201, description = "Payment method created", body = crate::services::payment_methods::PaymentMethodView),
        (status = 400, description = "Validation error", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already in use", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "payments"
)]
pub async fn create_payment_method(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreatePaymentMethodRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    let method = state
        .services
        .payment_methods
        .create(
            request.name.trim().to_string(),
            request.description,
            request.is_active,
        )
        .await?;
    Ok(created_response("Payment method created", method))
}
