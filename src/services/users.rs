use crate::{
    auth::rbac,
    entities::user::{self, Entity as User},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn validate_role(role: &str) -> Result<(), ValidationError> {
    if rbac::is_known_role(role) {
        Ok(())
    } else {
        let mut err = ValidationError::new("role");
        err.message = Some("Must be one of: admin, employee, viewer".into());
        Err(err)
    }
}

/// Staff accounts. Users are only ever created and listed.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn create_user(&self, input: CreateUserInput) -> Result<Uuid, ServiceError> {
        input.validate()?;

        if self.find_user(&input.username).await?.is_some() {
            return Err(ServiceError::Conflict("User already exists".to_string()));
        }

        let id = Uuid::new_v4();
        let user = user::ActiveModel {
            id: Set(id),
            username: Set(input.username),
            password: Set(input.password),
            role: Set(input.role),
            name: Set(input.name),
            family_name: Set(input.family_name),
            photo: Set(input.photo),
            created_at: Set(Utc::now()),
        };
        user.insert(&*self.db)
            .await
            .map_err(|e| ServiceError::from_write_error(e, "User already exists"))?;

        counter!("carstock.users.created", 1);
        info!(user_id = %id, "Created user");
        Ok(id)
    }

    /// All users, oldest first. Credentials are never included.
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<UserSummary>, ServiceError> {
        let users = User::find()
            .order_by_asc(user::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(users.into_iter().map(UserSummary::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn find_user(&self, username: &str) -> Result<Option<user::Model>, ServiceError> {
        User::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await
            .map_err(Into::into)
    }
}

/// Input for creating a user. `password` is the client-side SHA-256 hex digest.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateUserInput {
    #[validate(length(min = 1, max = 64, message = "Username must be 1-64 characters"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password hash is required"))]
    pub password: String,
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    pub family_name: Option<String>,
    #[validate(custom = "validate_role")]
    pub role: String,
    pub photo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub family_name: Option<String>,
    pub role: String,
    pub photo: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserSummary {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            name: user.name,
            family_name: user.family_name,
            role: user.role,
            photo: user.photo,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::memory_db;
    use assert_matches::assert_matches;

    fn input(username: &str, role: &str) -> CreateUserInput {
        CreateUserInput {
            username: username.to_string(),
            password: crate::common::sha256_hex("secret"),
            name: "Ali".to_string(),
            family_name: None,
            role: role.to_string(),
            photo: None,
        }
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let svc = UserService::new(memory_db().await);
        svc.create_user(input("ali", "employee")).await.unwrap();
        let err = svc.create_user(input("ali", "viewer")).await.unwrap_err();
        assert_matches!(err, ServiceError::Conflict(msg) if msg == "User already exists");
    }

    #[tokio::test]
    async fn unknown_role_is_rejected() {
        let svc = UserService::new(memory_db().await);
        let err = svc.create_user(input("sara", "owner")).await.unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(_));
    }

    #[tokio::test]
    async fn list_omits_credentials() {
        let svc = UserService::new(memory_db().await);
        svc.create_user(input("ali", "admin")).await.unwrap();
        svc.create_user(input("sara", "viewer")).await.unwrap();

        let users = svc.list_users().await.unwrap();
        assert_eq!(users.len(), 2);
        let json = serde_json::to_value(&users).unwrap();
        assert!(json[0].get("password").is_none());
    }
}
