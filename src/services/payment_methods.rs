use crate::{db::DatabaseAccess, entities::payment_method, errors::ServiceError};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<payment_method::Model> for PaymentMethodView {
    fn from(model: payment_method::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            is_active: model.is_active,
            created_at: model.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PaymentMethodService {
    db: DatabaseAccess,
}

impl PaymentMethodService {
    pub fn new(db: DatabaseAccess) -> Self {
        Self { db }
    }

    /// Methods a customer may pick at checkout
    #[instrument(skip(self))]
    pub async fn list_active(&self) -> Result<Vec<PaymentMethodView>, ServiceError> {
        let methods = self
            .db
            .execute("payment_methods.list_active", |conn| {
                Box::pin(
                    payment_method::Entity::find()
                        .filter(payment_method::Column::IsActive.eq(true))
                        .order_by_asc(payment_method::Column::Name)
                        .all(conn),
                )
            })
            .await?;
        Ok(methods.into_iter().map(PaymentMethodView::from).collect())
    }

    #[instrument(skip(self, description))]
    pub async fn create(
        &self,
        name: String,
        description: Option<String>,
        is_active: bool,
    ) -> Result<PaymentMethodView, ServiceError> {
        let created = self
            .db
            .transaction("payment_methods.create", move |txn| {
                let name = name.clone();
                let description = description.clone();
                Box::pin(async move {
                    let exists = payment_method::Entity::find()
                        .filter(payment_method::Column::Name.eq(name.as_str()))
                        .one(txn)
                        .await?
                        .is_some();
                    if exists {
                        return Err(ServiceError::Conflict(
                            "Payment method already exists".into(),
                        ));
                    }

                    Ok(payment_method::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        name: Set(name),
                        description: Set(description),
                        is_active: Set(is_active),
                        created_at: Set(Utc::now()),
                    }
                    .insert(txn)
                    .await?)
                })
            })
            .await?;

        info!(payment_method_id = %created.id, name = %created.name, "Payment method created");
        Ok(created.into())
    }
}
