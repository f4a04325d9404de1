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
    handlers::common::{
        created_response, message_response, success_response, success_with_message,
        validate_input, AppJson, AppPath,
    },
    services::ratings::{NewRating, VoteCounts},
    AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRatingRequest {
    pub book_id: Uuid,
    #[validate(range(min = 1, max = 5))]
    pub stars: i16,
    #[validate(length(max = 2000))]
    pub content: Option<String>,
    #[serde(default)]
    pub replace_if_exists: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateRatingRequest {
    #[validate(range(min = 1, max = 5))]
    pub stars: Option<i16>,
    #[validate(length(max = 2000))]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    /// `1` for helpful, `-1` for unhelpful
    pub vote_type: i16,
}

/// The caller's vote next to the rating's totals
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserVoteView {
    pub vote_type: Option<i16>,
    pub upvotes: i64,
    pub downvotes: i64,
}

#[utoipa::path(
    post,
    path = "/api/v1/ratings",
    summary = "Rate a book",
    request_body = CreateRatingRequest,
    responses(
        (status = 201, description = "Rating saved", body = crate::services::ratings::RatingView),
        (status = 400, description = "Validation error", body = crate::errors::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Already reviewed", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "ratings"
)]
pub async fn create_rating(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(request): AppJson<CreateRatingRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    let rating = state
        .services
        .ratings
        .create_rating(
            user.user_id,
            NewRating {
                book_id: request.book_id,
                stars: request.stars,
                content: request.content,
                replace_if_exists: request.replace_if_exists,
            },
        )
        .await?;
    Ok(created_response("Rating saved", rating))
}

#[utoipa::path(
    get,
    path = "/api/v1/ratings/book/{id}",
    summary = "Ratings for a book",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses((status = 200, description = "Ratings", body = [crate::services::ratings::RatingView])),
    tag = "ratings"
)]
pub async fn list_book_ratings(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Response, ServiceError> {
    let ratings = state.services.ratings.list_for_book(id).await?;
    Ok(success_response(ratings))
}

#[utoipa::path(
    get,
    path = "/api/v1/ratings/book/{id}/average",
    summary = "Average rating for a book",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Average and count", body = crate::services::ratings::RatingSummary),
        (status = 404, description = "Book not found", body = crate::errors::ErrorResponse),
    ),
    tag = "ratings"
)]
pub async fn book_average_rating(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Response, ServiceError> {
    let summary = state.services.ratings.average_for_book(id).await?;
    Ok(success_response(summary))
}

#[utoipa::path(
    get,
    path = "/api/v1/ratings/my-ratings",
    summary = "My ratings",
    responses((status = 200, description = "Ratings", body = [crate::services::ratings::RatingView])),
    security(("Bearer" = [])),
    tag = "ratings"
)]
pub async fn my_ratings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, ServiceError> {
    let ratings = state.services.ratings.list_for_user(user.user_id).await?;
    Ok(success_response(ratings))
}

#[utoipa::path(
    patch,
    path = "/api/v1/ratings/{id}",
    summary = "Edit my rating",
    params(("id" = Uuid, Path, description = "Rating ID")),
    request_body = UpdateRatingRequest,
    responses(
        (status = 200, description = "Rating updated", body = crate::services::ratings::RatingView),
        (status = 404, description = "Rating not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "ratings"
)]
pub async fn update_rating(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<UpdateRatingRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    let rating = state
        .services
        .ratings
        .update_rating(user.user_id, id, request.stars, request.content)
        .await?;
    Ok(success_response(rating))
}

#[utoipa::path(
    delete,
    path = "/api/v1/ratings/{id}",
    summary = "Delete my rating",
    params(("id" = Uuid, Path, description = "Rating ID")),
    responses(
        (status = 200, description = "Rating deleted"),
        (status = 404, description = "Rating not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "ratings"
)]
pub async fn delete_rating(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.ratings.delete_rating(user.user_id, id).await?;
    Ok(message_response("Rating deleted"))
}

#[utoipa::path(
    get,
    path = "/api/v1/ratings/all",
    summary = "All ratings (admin)",
    responses(
        (status = 200, description = "Ratings", body = [crate::services::ratings::RatingView]),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "ratings"
)]
pub async fn list_all_ratings(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let ratings = state.services.ratings.list_all().await?;
    Ok(success_response(ratings))
}

#[utoipa::path(
    delete,
    path = "/api/v1/ratings/admin/{id}",
    summary = "Delete any rating (admin)",
    params(("id" = Uuid, Path, description = "Rating ID")),
    responses(
        (status = 200, description = "Rating deleted"),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Rating not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "ratings"
)]
pub async fn admin_delete_rating(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.ratings.delete_any(id).await?;
    Ok(message_response("Rating deleted"))
}

#[utoipa::path(
    get,
    path = "/api/v1/ratings/my-rating/{id}",
    summary = "My rating of a book",
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "The caller's rating, or null", body = Option<crate::services::ratings::RatingView>),
    ),
    security(("Bearer" = [])),
    tag = "ratings"
)]
pub async fn my_rating_for_book(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Response, ServiceError> {
    let rating = state
        .services
        .ratings
        .my_rating_for_book(user.user_id, id)
        .await?;
    let message = if rating.is_some() {
        "User rating fetched successfully"
    } else {
        "No rating found for this book"
    };
    Ok(success_with_message(message, rating))
}

#[utoipa::path(
    post,
    path = "/api/v1/ratings/{id}/vote",
    summary = "Vote on a rating",
    description = "Repeating the current vote withdraws it",
    params(("id" = Uuid, Path, description = "Rating ID")),
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Vote recorded; returns the new totals", body = VoteCounts),
        (status = 400, description = "Bad vote type or own rating", body = crate::errors::ErrorResponse),
        (status = 404, description = "Rating not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "ratings"
)]
pub async fn vote_rating(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<VoteRequest>,
) -> Result<Response, ServiceError> {
    let (outcome, counts) = state
        .services
        .ratings
        .vote(user.user_id, id, request.vote_type)
        .await?;
    Ok(success_with_message(outcome.message(), counts))
}

#[utoipa::path(
    delete,
    path = "/api/v1/ratings/{id}/vote",
    summary = "Withdraw my vote",
    params(("id" = Uuid, Path, description = "Rating ID")),
    responses(
        (status = 200, description = "Vote removed"),
        (status = 404, description = "Vote not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "ratings"
)]
pub async fn remove_vote(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.ratings.remove_vote(user.user_id, id).await?;
    Ok(message_response("Vote removed successfully"))
}

#[utoipa::path(
    get,
    path = "/api/v1/ratings/{id}/vote",
    summary = "My vote and the vote totals",
    params(("id" = Uuid, Path, description = "Rating ID")),
    responses(
        (status = 200, description = "Vote state", body = UserVoteView),
        (status = 404, description = "Rating not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "ratings"
)]
pub async fn get_vote(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Response, ServiceError> {
    let ratings = &state.services.ratings;
    let counts = ratings.vote_counts(id).await?;
    let vote_type = ratings.user_vote(user.user_id, id).await?;
    Ok(success_response(UserVoteView {
        vote_type,
        upvotes: counts.upvotes,
        downvotes: counts.downvotes,
    }))
}
