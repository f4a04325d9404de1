use crate::{
    auth::{AccessToken, AuthService},
    db::DatabaseAccess,
    entities::{cart, order, user, UserRole},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Admin edit of another account. Absent fields are left as they are.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Option<UserRole>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for UserView {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            full_name: model.full_name,
            phone: model.phone,
            address: model.address,
            role: model.role,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserView,
    pub token: AccessToken,
}

/// Registration, login, profile maintenance and admin account management
#[derive(Clone)]
pub struct UserService {
    db: DatabaseAccess,
    auth: Arc<AuthService>,
    event_sender: Option<Arc<EventSender>>,
}

impl UserService {
    pub fn new(
        db: DatabaseAccess,
        auth: Arc<AuthService>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db,
            auth,
            event_sender,
        }
    }

    /// Creates the account and its cart together.
    #[instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register(&self, registration: Registration) -> Result<AuthResponse, ServiceError> {
        let password_hash = self.auth.hash_password(&registration.password).await?;
        let email = registration.email.trim().to_lowercase();
        let username = registration.username.trim().to_string();

        let created = self
            .db
            .transaction("users.register", move |txn| {
                let registration = registration.clone();
                let password_hash = password_hash.clone();
                let email = email.clone();
                let username = username.clone();
                Box::pin(async move {
                    let taken = user::Entity::find()
                        .filter(
                            Condition::any()
                                .add(user::Column::Email.eq(email.as_str()))
                                .add(user::Column::Username.eq(username.as_str())),
                        )
                        .one(txn)
                        .await?
                        .is_some();
                    if taken {
                        return Err(ServiceError::Conflict("User already exists".into()));
                    }

                    let now = Utc::now();
                    let user = user::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        username: Set(username),
                        email: Set(email),
                        password_hash: Set(password_hash),
                        full_name: Set(registration.full_name),
                        phone: Set(registration.phone),
                        address: Set(registration.address),
                        role: Set(UserRole::User),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await?;

                    cart::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        user_id: Set(user.id),
                        total: Set(Decimal::ZERO),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await?;

                    Ok(user)
                })
            })
            .await?;

        let token = self.auth.generate_token(&created)?;
        info!(user_id = %created.id, "User registered");

        if let Some(sender) = &self.event_sender {
            sender.send_or_log(Event::UserRegistered(created.id)).await;
        }

        Ok(AuthResponse {
            user: created.into(),
            token,
        })
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ServiceError> {
        let email = email.trim().to_lowercase();
        let found = self
            .db
            .execute("users.find_by_email", move |conn| {
                let email = email.clone();
                Box::pin(async move {
                    user::Entity::find()
                        .filter(user::Column::Email.eq(email))
                        .one(conn)
                        .await
                })
            })
            .await?;

        let invalid = || ServiceError::Unauthorized("Invalid credentials".into());
        let Some(user) = found else {
            warn!("login attempt for unknown email");
            return Err(invalid());
        };
        if !self
            .auth
            .verify_password(password, &user.password_hash)
            .await?
        {
            warn!(user_id = %user.id, "login attempt with wrong password");
            return Err(invalid());
        }

        let token = self.auth.generate_token(&user)?;
        info!(user_id = %user.id, "User logged in");
        Ok(AuthResponse {
            user: user.into(),
            token,
        })
    }

    #[instrument(skip(self))]
    pub async fn profile(&self, user_id: Uuid) -> Result<UserView, ServiceError> {
        self.db
            .execute("users.profile", move |conn| {
                Box::pin(user::Entity::find_by_id(user_id).one(conn))
            })
            .await?
            .map(UserView::from)
            .ok_or_else(|| ServiceError::not_found("User"))
    }

    #[instrument(skip(self, changes))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        changes: ProfileChanges,
    ) -> Result<UserView, ServiceError> {
        let updated = self
            .db
            .transaction("users.update_profile", move |txn| {
                let changes = changes.clone();
                Box::pin(async move {
                    let user = user::Entity::find_by_id(user_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("User"))?;

                    let mut active: user::ActiveModel = user.into();
                    if let Some(full_name) = changes.full_name {
                        active.full_name = Set(full_name);
                    }
                    if let Some(phone) = changes.phone {
                        active.phone = Set(Some(phone));
                    }
                    if let Some(address) = changes.address {
                        active.address = Set(Some(address));
                    }
                    active.updated_at = Set(Utc::now());
                    Ok(active.update(txn).await?)
                })
            })
            .await?;

        Ok(updated.into())
    }

    /// Replaces the caller's password after checking the current one.
    #[instrument(skip(self, current_password, new_password))]
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        let user = self
            .db
            .execute("users.find_for_password_change", move |conn| {
                Box::pin(user::Entity::find_by_id(user_id).one(conn))
            })
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?;

        if !self
            .auth
            .verify_password(current_password, &user.password_hash)
            .await?
        {
            warn!(%user_id, "password change with wrong current password");
            return Err(ServiceError::InvalidOperation(
                "Current password is incorrect".into(),
            ));
        }

        let password_hash = self.auth.hash_password(new_password).await?;
        self.db
            .execute("users.change_password", move |conn| {
                let mut active: user::ActiveModel = user.clone().into();
                active.password_hash = Set(password_hash.clone());
                active.updated_at = Set(Utc::now());
                Box::pin(async move { active.update(conn).await })
            })
            .await?;

        info!(%user_id, "Password changed");
        Ok(())
    }

    /// Every account, newest first
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<UserView>, ServiceError> {
        let users = self
            .db
            .execute("users.list", |conn| {
                Box::pin(
                    user::Entity::find()
                        .order_by_desc(user::Column::CreatedAt)
                        .all(conn),
                )
            })
            .await?;
        Ok(users.into_iter().map(UserView::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, user_id: Uuid) -> Result<UserView, ServiceError> {
        self.profile(user_id).await
    }

    /// Admin edit, including role changes
    #[instrument(skip(self, changes))]
    pub async fn update_user(
        &self,
        user_id: Uuid,
        changes: UserChanges,
    ) -> Result<UserView, ServiceError> {
        let email = changes.email.as_deref().map(|e| e.trim().to_lowercase());

        let updated = self
            .db
            .transaction("users.update", move |txn| {
                let changes = changes.clone();
                let email = email.clone();
                Box::pin(async move {
                    let user = user::Entity::find_by_id(user_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("User"))?;

                    if let Some(email) = &email {
                        let taken = user::Entity::find()
                            .filter(user::Column::Email.eq(email.as_str()))
                            .filter(user::Column::Id.ne(user_id))
                            .one(txn)
                            .await?
                            .is_some();
                        if taken {
                            return Err(ServiceError::Conflict("Email already in use".into()));
                        }
                    }

                    let mut active: user::ActiveModel = user.into();
                    if let Some(full_name) = changes.full_name {
                        active.full_name = Set(full_name);
                    }
                    if let Some(email) = email {
                        active.email = Set(email);
                    }
                    if let Some(phone) = changes.phone {
                        active.phone = Set(Some(phone));
                    }
                    if let Some(address) = changes.address {
                        active.address = Set(Some(address));
                    }
                    if let Some(role) = changes.role {
                        active.role = Set(role);
                    }
                    active.updated_at = Set(Utc::now());
                    Ok(active.update(txn).await?)
                })
            })
            .await?;

        info!(%user_id, role = updated.role.as_str(), "User updated by admin");
        Ok(updated.into())
    }

    /// Removes an account with no order history. The cart, ratings and votes
    /// go with it.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, admin_id: Uuid, user_id: Uuid) -> Result<(), ServiceError> {
        if admin_id == user_id {
            return Err(ServiceError::InvalidOperation(
                "You cannot delete your own account".into(),
            ));
        }

        self.db
            .transaction("users.delete", move |txn| {
                Box::pin(async move {
                    user::Entity::find_by_id(user_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("User"))?;

                    let placed = order::Entity::find()
                        .filter(order::Column::UserId.eq(user_id))
                        .count(txn)
                        .await?;
                    if placed > 0 {
                        return Err(ServiceError::InvalidOperation(format!(
                            "Cannot delete user because they have {placed} order(s) in history. \
                             Consider deactivating the account instead."
                        )));
                    }

                    let confirmed = order::Entity::find()
                        .filter(order::Column::ConfirmedById.eq(user_id))
                        .count(txn)
                        .await?;
                    if confirmed > 0 {
                        return Err(ServiceError::InvalidOperation(format!(
                            "Cannot delete user because they have confirmed {confirmed} order(s). \
                             Consider deactivating the account instead."
                        )));
                    }

                    user::Entity::delete_by_id(user_id).exec(txn).await?;
                    Ok(())
                })
            })
            .await?;

        info!(%user_id, "User deleted");
        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::UserDeleted {
                    user_id,
                    deleted_by: admin_id,
                })
                .await;
        }
        Ok(())
    }
}
