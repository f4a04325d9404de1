use axum::{extract::State, response::Response};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    errors::ServiceError,
    handlers::common::{
        created_response, message_response, success_response, validate_input, AppJson, AppPath,
        AppQuery,
    },
    services::books::{BookChanges, BookQuery, BookSort, NewBook, SortOrder},
    AppState,
};

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price < Decimal::ZERO {
        return Err(ValidationError::new("price_must_not_be_negative"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: Option<String>,
    #[validate(custom = "validate_price")]
    pub price: Decimal,
    #[validate(range(min = 0))]
    pub stock: i32,
    #[validate(url)]
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "validate_price")]
    pub price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    #[validate(url)]
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListBooksParams {
    /// Only books filed under this category
    pub category_id: Option<Uuid>,
    /// Whitespace-separated terms matched against title, description and category name
    pub search: Option<String>,
    pub sort_by: Option<BookSort>,
    pub order: Option<SortOrder>,
}

#[utoipa::path(
    get,
    path = "/api/v1/books",
    summary = "Browse the catalog",
    params(ListBooksParams),
    responses(
        (status = 200, description = "Books with average ratings", body = [crate::services::books::BookView]),
    ),
    tag = "books"
)]
pub async fn list_books(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<ListBooksParams>,
) -> Result<Response, ServiceError> {
    let books = state
        .services
        .books
        .list_books(BookQuery {
            category_id: params.category_id,
            search: params.search,
            sort_by: params.sort_by,
            order: params.order,
        })
        .await?;
    Ok(success_response(books))
}

#[utoipa::path(
    get,
    path = "/api/v1/books/{id}",
    summary = "Get a book",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book", body = crate::services::books::BookView),
        (status = 404, description = "Book not found", body = crate::errors::ErrorResponse),
    ),
    tag = "books"
)]
pub async fn get_book(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Response, ServiceError> {
    let book = state.services.books.get_book(id).await?;
    Ok(success_response(book))
}

#[utoipa::path(
    post,
    path = "/api/v1/books",
    summary = "Add a book (admin)",
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Book created", body = crate::services::books::BookView),
        (status = 400, description = "Validation error", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "books"
)]
pub async fn create_book(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateBookRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    let book = state
        .services
        .books
        .create_book(NewBook {
            title: request.title.trim().to_string(),
            description: request.description,
            price: request.price,
            stock: request.stock,
            image_url: request.image_url,
            category_id: request.category_id,
        })
        .await?;
    Ok(created_response("Book created successfully", book))
}

#[utoipa::path(
    put,
    path = "/api/v1/books/{id}",
    summary = "Update a book (admin)",
    params(("id" = Uuid, Path, description = "Book ID")),
    request_body = UpdateBookRequest,
    responses(
        (status = 200, description = "Book updated", body = crate::services::books::BookView),
        (status = 400, description = "Validation error", body = crate::errors::ErrorResponse),
        (status = 404, description = "Book or category not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "books"
)]
pub async fn update_book(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<UpdateBookRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    let book = state
        .services
        .books
        .update_book(
            id,
            BookChanges {
                title: request.title,
                description: request.description,
                price: request.price,
                stock: request.stock,
                image_url: request.image_url,
                category_id: request.category_id,
            },
        )
        .await?;
    Ok(success_response(book))
}

#[utoipa::path(
    delete,
    path = "/api/v1/books/{id}",
    summary = "Delete a book (admin)",
    description = "Refused when the book appears in any order",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book deleted"),
        (status = 400, description = "Book exists in order history", body = crate::errors::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "books"
)]
pub async fn delete_book(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.books.delete_book(id).await?;
    Ok(message_response("Book deleted successfully"))
}
