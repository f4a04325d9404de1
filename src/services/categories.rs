use crate::{
    db::DatabaseAccess,
    entities::{book, category},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub book_count: i64,
    pub created_at: DateTime<Utc>,
}

impl CategoryView {
    fn new(model: category::Model, book_count: i64) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            book_count,
            created_at: model.created_at,
        }
    }
}

#[derive(Clone)]
pub struct CategoryService {
    db: DatabaseAccess,
}

impl CategoryService {
    pub fn new(db: DatabaseAccess) -> Self {
        Self { db }
    }

    /// Every category by name, with how many books are filed under it
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<CategoryView>, ServiceError> {
        self.db
            .execute("categories.list", |conn| {
                Box::pin(async move {
                    let categories = category::Entity::find()
                        .order_by_asc(category::Column::Name)
                        .all(conn)
                        .await?;

                    let counts: HashMap<Uuid, i64> = book::Entity::find()
                        .select_only()
                        .column(book::Column::CategoryId)
                        .column_as(Expr::col(book::Column::Id).count(), "book_count")
                        .filter(book::Column::CategoryId.is_not_null())
                        .group_by(book::Column::CategoryId)
                        .into_tuple::<(Uuid, i64)>()
                        .all(conn)
                        .await?
                        .into_iter()
                        .collect();

                    Ok(categories
                        .into_iter()
                        .map(|c| {
                            let count = counts.get(&c.id).copied().unwrap_or(0);
                            CategoryView::new(c, count)
                        })
                        .collect::<Vec<_>>())
                })
            })
            .await
    }

    #[instrument(skip(self, description))]
    pub async fn create_category(
        &self,
        name: String,
        description: Option<String>,
    ) -> Result<CategoryView, ServiceError> {
        let created = self
            .db
            .transaction("categories.create", move |txn| {
                let name = name.clone();
                let description = description.clone();
                Box::pin(async move {
                    let exists = category::Entity::find()
                        .filter(category::Column::Name.eq(name.as_str()))
                        .one(txn)
                        .await?
                        .is_some();
                    if exists {
                        return Err(ServiceError::Conflict("Category already exists".into()));
                    }

                    Ok(category::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        name: Set(name),
                        description: Set(description),
                        created_at: Set(Utc::now()),
                    }
                    .insert(txn)
                    .await?)
                })
            })
            .await?;

        info!(category_id = %created.id, name = %created.name, "Category created");
        Ok(CategoryView::new(created, 0))
    }
}
