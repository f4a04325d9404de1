use crate::{
    db::DatabaseAccess,
    entities::{
        book, rating,
        rating_vote::{self, DOWNVOTE, UPVOTE},
    },
    errors::ServiceError,
    services::books::rating_stats,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

pub const MIN_STARS: i16 = 1;
pub const MAX_STARS: i16 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RatingView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub stars: i16,
    pub content: Option<String>,
    pub upvotes: i64,
    pub downvotes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RatingView {
    fn new(model: rating::Model, votes: VoteCounts) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            book_id: model.book_id,
            stars: model.stars,
            content: model.content,
            upvotes: votes.upvotes,
            downvotes: votes.downvotes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Helpful (`upvotes`) and unhelpful (`downvotes`) marks on one rating
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VoteCounts {
    pub upvotes: i64,
    pub downvotes: i64,
}

/// What a vote request did to the caller's existing vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Created,
    Updated,
    /// Repeating the same vote withdraws it
    Removed,
}

impl VoteOutcome {
    pub fn message(self) -> &'static str {
        match self {
            VoteOutcome::Created => "Vote created successfully",
            VoteOutcome::Updated => "Vote updated successfully",
            VoteOutcome::Removed => "Vote removed successfully",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RatingSummary {
    pub average: f64,
    pub count: i64,
}

#[derive(Debug, Clone)]
pub struct NewRating {
    pub book_id: Uuid,
    pub stars: i16,
    pub content: Option<String>,
    pub replace_if_exists: bool,
}

fn check_stars(stars: i16) -> Result<(), ServiceError> {
    if !(MIN_STARS..=MAX_STARS).contains(&stars) {
        return Err(ServiceError::ValidationError(format!(
            "Stars must be between {} and {}",
            MIN_STARS, MAX_STARS
        )));
    }
    Ok(())
}

fn check_vote_type(vote_type: i16) -> Result<(), ServiceError> {
    if vote_type != UPVOTE && vote_type != DOWNVOTE {
        return Err(ServiceError::ValidationError(
            "Vote type must be 1 (upvote) or -1 (downvote)".into(),
        ));
    }
    Ok(())
}

async fn vote_counts_for<C: ConnectionTrait>(
    conn: &C,
    rating_ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, VoteCounts>, DbErr> {
    if rating_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(Uuid, i16, i64)> = rating_vote::Entity::find()
        .select_only()
        .column(rating_vote::Column::RatingId)
        .column(rating_vote::Column::VoteType)
        .column_as(Expr::col(rating_vote::Column::Id).count(), "vote_count")
        .filter(rating_vote::Column::RatingId.is_in(rating_ids))
        .group_by(rating_vote::Column::RatingId)
        .group_by(rating_vote::Column::VoteType)
        .into_tuple()
        .all(conn)
        .await?;

    let mut counts: HashMap<Uuid, VoteCounts> = HashMap::new();
    for (rating_id, vote_type, count) in rows {
        let entry = counts.entry(rating_id).or_default();
        if vote_type == UPVOTE {
            entry.upvotes = count;
        } else {
            entry.downvotes = count;
        }
    }
    Ok(counts)
}

/// Attaches vote counts to `ratings` with one grouped query.
async fn rating_views<C: ConnectionTrait>(
    conn: &C,
    ratings: Vec<rating::Model>,
) -> Result<Vec<RatingView>, DbErr> {
    let counts = vote_counts_for(conn, ratings.iter().map(|r| r.id).collect()).await?;
    Ok(ratings
        .into_iter()
        .map(|r| {
            let votes = counts.get(&r.id).copied().unwrap_or_default();
            RatingView::new(r, votes)
        })
        .collect())
}

async fn single_view<C: ConnectionTrait>(
    conn: &C,
    rating: rating::Model,
) -> Result<RatingView, ServiceError> {
    rating_views(conn, vec![rating])
        .await?
        .pop()
        .ok_or_else(|| ServiceError::not_found("Rating"))
}

#[derive(Clone)]
pub struct RatingService {
    db: DatabaseAccess,
}

impl RatingService {
    pub fn new(db: DatabaseAccess) -> Self {
        Self { db }
    }

    /// One rating per user and book; a repeat either replaces or conflicts.
    #[instrument(skip(self, input), fields(book_id = %input.book_id))]
    pub async fn create_rating(
        &self,
        user_id: Uuid,
        input: NewRating,
    ) -> Result<RatingView, ServiceError> {
        check_stars(input.stars)?;

        let saved = self
            .db
            .transaction("ratings.create", move |txn| {
                let input = input.clone();
                Box::pin(async move {
                    book::Entity::find_by_id(input.book_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("Book"))?;

                    let existing = rating::Entity::find()
                        .filter(rating::Column::UserId.eq(user_id))
                        .filter(rating::Column::BookId.eq(input.book_id))
                        .one(txn)
                        .await?;

                    let now = Utc::now();
                    let saved = match existing {
                        Some(_) if !input.replace_if_exists => {
                            return Err(ServiceError::Conflict(
                                "You have reviewed this book before".into(),
                            ))
                        }
                        Some(previous) => {
                            let mut active: rating::ActiveModel = previous.into();
                            active.stars = Set(input.stars);
                            active.content = Set(input.content);
                            active.updated_at = Set(now);
                            active.update(txn).await?
                        }
                        None => {
                            rating::ActiveModel {
                                id: Set(Uuid::new_v4()),
                                user_id: Set(user_id),
                                book_id: Set(input.book_id),
                                stars: Set(input.stars),
                                content: Set(input.content),
                                created_at: Set(now),
                                updated_at: Set(now),
                            }
                            .insert(txn)
                            .await?
                        }
                    };
                    single_view(txn, saved).await
                })
            })
            .await?;

        info!(rating_id = %saved.id, stars = saved.stars, "Rating saved");
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn list_for_book(&self, book_id: Uuid) -> Result<Vec<RatingView>, ServiceError> {
        self.db
            .execute("ratings.list_for_book", move |conn| {
                Box::pin(async move {
                    let ratings = rating::Entity::find()
                        .filter(rating::Column::BookId.eq(book_id))
                        .order_by_desc(rating::Column::CreatedAt)
                        .all(conn)
                        .await?;
                    rating_views(conn, ratings).await
                })
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn average_for_book(&self, book_id: Uuid) -> Result<RatingSummary, ServiceError> {
        let stats = self
            .db
            .execute("ratings.average_for_book", move |conn| {
                Box::pin(async move {
                    if book::Entity::find_by_id(book_id).one(conn).await?.is_none() {
                        return Ok(None);
                    }
                    Ok(Some(rating_stats(conn, vec![book_id]).await?))
                })
            })
            .await?
            .ok_or_else(|| ServiceError::not_found("Book"))?;

        let (average, count) = stats.get(&book_id).copied().unwrap_or((0.0, 0));
        Ok(RatingSummary { average, count })
    }

    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<RatingView>, ServiceError> {
        self.db
            .execute("ratings.list_for_user", move |conn| {
                Box::pin(async move {
                    let ratings = rating::Entity::find()
                        .filter(rating::Column::UserId.eq(user_id))
                        .order_by_desc(rating::Column::CreatedAt)
                        .all(conn)
                        .await?;
                    rating_views(conn, ratings).await
                })
            })
            .await
    }

    /// The caller's rating of one book, if they left one
    #[instrument(skip(self))]
    pub async fn my_rating_for_book(
        &self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> Result<Option<RatingView>, ServiceError> {
        self.db
            .execute("ratings.mine_for_book", move |conn| {
                Box::pin(async move {
                    let found = rating::Entity::find()
                        .filter(rating::Column::UserId.eq(user_id))
                        .filter(rating::Column::BookId.eq(book_id))
                        .one(conn)
                        .await?;
                    match found {
                        Some(rating) => Ok(rating_views(conn, vec![rating]).await?.pop()),
                        None => Ok(None),
                    }
                })
            })
            .await
    }

    #[instrument(skip(self, content))]
    pub async fn update_rating(
        &self,
        user_id: Uuid,
        rating_id: Uuid,
        stars: Option<i16>,
        content: Option<String>,
    ) -> Result<RatingView, ServiceError> {
        if let Some(stars) = stars {
            check_stars(stars)?;
        }

        let updated = self
            .db
            .transaction("ratings.update", move |txn| {
                let content = content.clone();
                Box::pin(async move {
                    let existing = rating::Entity::find_by_id(rating_id)
                        .filter(rating::Column::UserId.eq(user_id))
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("Rating"))?;

                    let mut active: rating::ActiveModel = existing.into();
                    if let Some(stars) = stars {
                        active.stars = Set(stars);
                    }
                    if let Some(content) = content {
                        active.content = Set(Some(content));
                    }
                    active.updated_at = Set(Utc::now());
                    let updated = active.update(txn).await?;
                    single_view(txn, updated).await
                })
            })
            .await?;

        Ok(updated)
    }

    /// Deletes the caller's own rating
    #[instrument(skip(self))]
    pub async fn delete_rating(&self, user_id: Uuid, rating_id: Uuid) -> Result<(), ServiceError> {
        let result = self
            .db
            .execute("ratings.delete", move |conn| {
                Box::pin(
                    rating::Entity::delete_many()
                        .filter(rating::Column::Id.eq(rating_id))
                        .filter(rating::Column::UserId.eq(user_id))
                        .exec(conn),
                )
            })
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Rating"));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<RatingView>, ServiceError> {
        self.db
            .execute("ratings.list_all", |conn| {
                Box::pin(async move {
                    let ratings = rating::Entity::find()
                        .order_by_desc(rating::Column::CreatedAt)
                        .all(conn)
                        .await?;
                    rating_views(conn, ratings).await
                })
            })
            .await
    }

    /// Moderation delete, no ownership check
    #[instrument(skip(self))]
    pub async fn delete_any(&self, rating_id: Uuid) -> Result<(), ServiceError> {
        let result = self
            .db
            .execute("ratings.delete_any", move |conn| {
                Box::pin(rating::Entity::delete_by_id(rating_id).exec(conn))
            })
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Rating"));
        }
        info!(%rating_id, "Rating removed by admin");
        Ok(())
    }

    /// Upvote (`1`) or downvote (`-1`) someone else's rating. Repeating the
    /// current vote withdraws it; the opposite vote replaces it.
    #[instrument(skip(self))]
    pub async fn vote(
        &self,
        user_id: Uuid,
        rating_id: Uuid,
        vote_type: i16,
    ) -> Result<(VoteOutcome, VoteCounts), ServiceError> {
        check_vote_type(vote_type)?;

        let (outcome, counts) = self
            .db
            .transaction("ratings.vote", move |txn| {
                Box::pin(async move {
                    let rating = rating::Entity::find_by_id(rating_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("Rating"))?;
                    if rating.user_id == user_id {
                        return Err(ServiceError::InvalidOperation(
                            "You cannot vote on your own rating".into(),
                        ));
                    }

                    let existing = rating_vote::Entity::find()
                        .filter(rating_vote::Column::RatingId.eq(rating_id))
                        .filter(rating_vote::Column::UserId.eq(user_id))
                        .one(txn)
                        .await?;

                    let now = Utc::now();
                    let outcome = match existing {
                        Some(vote) if vote.vote_type == vote_type => {
                            rating_vote::Entity::delete_by_id(vote.id).exec(txn).await?;
                            VoteOutcome::Removed
                        }
                        Some(vote) => {
                            let mut active: rating_vote::ActiveModel = vote.into();
                            active.vote_type = Set(vote_type);
                            active.updated_at = Set(now);
                            active.update(txn).await?;
                            VoteOutcome::Updated
                        }
                        None => {
                            rating_vote::ActiveModel {
                                id: Set(Uuid::new_v4()),
                                rating_id: Set(rating_id),
                                user_id: Set(user_id),
                                vote_type: Set(vote_type),
                                created_at: Set(now),
                                updated_at: Set(now),
                            }
                            .insert(txn)
                            .await?;
                            VoteOutcome::Created
                        }
                    };

                    let counts = vote_counts_for(txn, vec![rating_id])
                        .await?
                        .remove(&rating_id)
                        .unwrap_or_default();
                    Ok((outcome, counts))
                })
            })
            .await?;

        info!(%rating_id, ?outcome, "Rating vote recorded");
        Ok((outcome, counts))
    }

    /// Withdraws the caller's vote on a rating
    #[instrument(skip(self))]
    pub async fn remove_vote(&self, user_id: Uuid, rating_id: Uuid) -> Result<(), ServiceError> {
        let result = self
            .db
            .execute("ratings.remove_vote", move |conn| {
                Box::pin(
                    rating_vote::Entity::delete_many()
                        .filter(rating_vote::Column::RatingId.eq(rating_id))
                        .filter(rating_vote::Column::UserId.eq(user_id))
                        .exec(conn),
                )
            })
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Vote"));
        }
        Ok(())
    }

    /// The caller's current vote on a rating: `Some(1)`, `Some(-1)` or `None`
    #[instrument(skip(self))]
    pub async fn user_vote(
        &self,
        user_id: Uuid,
        rating_id: Uuid,
    ) -> Result<Option<i16>, ServiceError> {
        let vote = self
            .db
            .execute("ratings.user_vote", move |conn| {
                Box::pin(
                    rating_vote::Entity::find()
                        .filter(rating_vote::Column::RatingId.eq(rating_id))
                        .filter(rating_vote::Column::UserId.eq(user_id))
                        .one(conn),
                )
            })
            .await?;
        Ok(vote.map(|v| v.vote_type))
    }

    #[instrument(skip(self))]
    pub async fn vote_counts(&self, rating_id: Uuid) -> Result<VoteCounts, ServiceError> {
        let counts = self
            .db
            .execute("ratings.vote_counts", move |conn| {
                Box::pin(async move {
                    if rating::Entity::find_by_id(rating_id).one(conn).await?.is_none() {
                        return Ok(None);
                    }
                    Ok(Some(
                        vote_counts_for(conn, vec![rating_id])
                            .await?
                            .remove(&rating_id)
                            .unwrap_or_default(),
                    ))
                })
            })
            .await?;

        counts.ok_or_else(|| ServiceError::not_found("Rating"))
    }
}
