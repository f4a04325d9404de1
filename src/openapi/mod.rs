use axum::{routing::get, Json, Router};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

/// Registers the `Bearer` JWT scheme referenced by protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bookstore API",
        version = "1.0.0",
        description = r#"
# Bookstore API

Catalog browsing, carts, checkout, payments, ratings and admin order handling.

## Authentication

Protected endpoints take a JWT issued by `/api/v1/auth/login` or `/api/v1/auth/register`:

```
Authorization: Bearer <token>
```

## Responses

Successful calls return `{"success": true, "message": ..., "data": ...}`.
Failures return `{"success": false, "error": ..., "message": ..., "errors": [...]}`.
"#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and profile"),
        (name = "books", description = "Catalog and categories"),
        (name = "cart", description = "Shopping cart"),
        (name = "orders", description = "Checkout and order history"),
        (name = "payments", description = "Payment methods and processing"),
        (name = "ratings", description = "Book reviews and review votes"),
        (name = "users", description = "Account administration"),
        (name = "health", description = "Health checks")
    ),
    paths(
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::profile,
        crate::handlers::auth::update_profile,
        crate::handlers::auth::change_password,

        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,

        crate::handlers::books::list_books,
        crate::handlers::books::get_book,
        crate::handlers::books::create_book,
        crate::handlers::books::update_book,
        crate::handlers::books::delete_book,
        crate::handlers::categories::list_categories,
        crate::handlers::categories::create_category,

        crate::handlers::cart::get_cart,
        crate::handlers::cart::add_to_cart,
        crate::handlers::cart::update_cart_item,
        crate::handlers::cart::remove_cart_item,
        crate::handlers::cart::clear_cart,

        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::confirm_order,
        crate::handlers::orders::list_all_orders,

        crate::handlers::payments::process_payment,
        crate::handlers::payment_methods::list_payment_methods,
        crate::handlers::payment_methods::create_payment_method,

        crate::handlers::ratings::create_rating,
        crate::handlers::ratings::list_book_ratings,
        crate::handlers::ratings::book_average_rating,
        crate::handlers::ratings::my_ratings,
        crate::handlers::ratings::update_rating,
        crate::handlers::ratings::delete_rating,
        crate::handlers::ratings::list_all_ratings,
        crate::handlers::ratings::admin_delete_rating,
        crate::handlers::ratings::my_rating_for_book,
        crate::handlers::ratings::vote_rating,
        crate::handlers::ratings::remove_vote,
        crate::handlers::ratings::get_vote,

        crate::handlers::health::health,
        crate::handlers::health::status,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::auth::AccessToken,
            crate::entities::OrderStatus,
            crate::entities::PaymentStatus,
            crate::entities::UserRole,

            crate::handlers::auth::RegisterRequest,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::UpdateProfileRequest,
            crate::handlers::auth::ChangePasswordRequest,
            crate::handlers::users::UpdateUserRequest,
            crate::services::users::UserView,
            crate::services::users::AuthResponse,

            crate::handlers::books::CreateBookRequest,
            crate::handlers::books::UpdateBookRequest,
            crate::services::books::BookView,
            crate::services::books::BookSort,
            crate::services::books::SortOrder,
            crate::handlers::categories::CreateCategoryRequest,
            crate::services::categories::CategoryView,

            crate::handlers::cart::AddToCartRequest,
            crate::handlers::cart::UpdateCartItemRequest,
            crate::services::cart::CartView,
            crate::services::cart::CartItemView,
            crate::services::cart::CartBook,

            crate::handlers::orders::CreateOrderRequest,
            crate::handlers::orders::ConfirmOrderRequest,
            crate::services::orders::OrderView,
            crate::services::orders::OrderItemView,
            crate::services::orders::PaymentView,

            crate::handlers::payments::ProcessPaymentRequest,
            crate::services::payments::PaymentOutcome,
            crate::handlers::payment_methods::CreatePaymentMethodRequest,
            crate::services::payment_methods::PaymentMethodView,

            crate::handlers::ratings::CreateRatingRequest,
            crate::handlers::ratings::UpdateRatingRequest,
            crate::services::ratings::RatingView,
            crate::services::ratings::RatingSummary,
            crate::services::ratings::VoteCounts,
            crate::handlers::ratings::VoteRequest,
            crate::handlers::ratings::UserVoteView,

            crate::handlers::health::HealthResponse,
            crate::handlers::health::StatusResponse,
            crate::handlers::health::ComponentStatus,
        )
    )
)]
pub struct ApiDocV1;

/// Serves the generated document at `/api-docs/openapi.json`
pub fn openapi_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDocV1::openapi()) }),
    )
}
