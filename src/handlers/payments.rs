use axum::{
    extract::{Extension, State},
    response::Response,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::common::{success_response, AppJson, AppPath},
    services::payments::PaymentOutcome,
    AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProcessPaymentRequest {
    pub status: PaymentOutcome,
}

/// Record the provider's verdict for a pending payment
#[utoipa::path(
    post,
    path = "/api/v1/payments/{id}/process",
    summary = "Process payment",
    description = "Completes or fails a pending payment. A failed payment cancels the order and returns its stock.",
    params(("id" = Uuid, Path, description = "Payment ID")),
    request_body = ProcessPaymentRequest,
    responses(
        (status = 200, description = "Payment processed", body = crate::services::orders::PaymentView),
        (status = 400, description = "Payment already processed", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller does not own the order", body = crate::errors::ErrorResponse),
        (status = 404, description = "Payment not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "payments"
)]
pub async fn process_payment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<ProcessPaymentRequest>,
) -> Result<Response, ServiceError> {
    let payment = state
        .services
        .payments
        .process_payment(&user, id, request.status)
        .await?;
    Ok(success_response(payment))
}
