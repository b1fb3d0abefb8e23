use crate::{
    common::constant_time_eq,
    entities::{
        session::{self, Entity as Session},
        user::{self, Entity as User},
    },
    errors::ServiceError,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use rand::{rngs::OsRng, RngCore};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

const TOKEN_BYTES: usize = 32;

/// Opaque bearer token: 256 bits from the OS CSPRNG, URL-safe base64 without padding
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Login and server-side session lifecycle
#[derive(Clone)]
pub struct SessionService {
    db: Arc<DatabaseConnection>,
    ttl: Duration,
}

impl SessionService {
    pub fn new(db: Arc<DatabaseConnection>, ttl: Duration) -> Self {
        Self { db, ttl }
    }

    /// Checks the supplied credential hash and issues a fresh session
    #[instrument(skip(self, password_hash))]
    pub async fn login(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<LoginResponse, ServiceError> {
        let user = User::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                counter!("carstock.auth.login_failures", 1, "reason" => "unknown_user");
                ServiceError::NotFound("Invalid username".to_string())
            })?;

        if !constant_time_eq(&user.password, password_hash) {
            counter!("carstock.auth.login_failures", 1, "reason" => "bad_password");
            warn!(username, "Rejected login with wrong password");
            return Err(ServiceError::InvalidCredential("Invalid password".to_string()));
        }

        let token = generate_token();
        let expires_at = Utc::now() + self.ttl;
        self.create_session(&token, &user.username, &user.role, expires_at)
            .await?;

        counter!("carstock.auth.logins", 1);
        info!(username, "User logged in");
        Ok(LoginResponse {
            token,
            expires_at,
            user: SessionUser {
                username: user.username,
                name: user.name,
                role: user.role,
            },
        })
    }

    /// Stores a session exactly as given
    #[instrument(skip(self, token))]
    pub async fn create_session(
        &self,
        token: &str,
        username: &str,
        role: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let session = session::ActiveModel {
            id: Set(Uuid::new_v4()),
            token: Set(token.to_string()),
            username: Set(username.to_string()),
            role: Set(role.to_string()),
            expires_at: Set(expires_at),
            created_at: Set(Utc::now()),
        };
        session.insert(&*self.db).await?;
        Ok(())
    }

    /// Identity behind a token, or `None` when it is unknown or expired
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<Option<SessionIdentity>, ServiceError> {
        if token.is_empty() {
            return Ok(None);
        }
        let now = Utc::now();
        let session = Session::find()
            .filter(session::Column::Token.eq(token))
            .filter(session::Column::ExpiresAt.gt(now))
            .one(&*self.db)
            .await?;

        Ok(session
            .filter(|s| s.is_active_at(now))
            .map(|s| SessionIdentity {
                username: s.username,
                role: s.role,
            }))
    }

    /// Deletes every session carrying the token. Unknown tokens are a no-op.
    #[instrument(skip_all)]
    pub async fn destroy(&self, token: &str) -> Result<(), ServiceError> {
        let result = Session::delete_many()
            .filter(session::Column::Token.eq(token))
            .exec(&*self.db)
            .await?;
        debug!(deleted = result.rows_affected, "Destroyed session");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SessionIdentity {
    pub username: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionUser {
    pub username: String,
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: SessionUser,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::sha256_hex;
    use crate::services::test_support::memory_db;
    use crate::services::users::{CreateUserInput, UserService};
    use assert_matches::assert_matches;

    async fn setup() -> SessionService {
        let db = memory_db().await;
        UserService::new(db.clone())
            .create_user(CreateUserInput {
                username: "ali".into(),
                password: sha256_hex("secret"),
                name: "Ali".into(),
                family_name: Some("Hassan".into()),
                role: "employee".into(),
                photo: None,
            })
            .await
            .unwrap();
        SessionService::new(db, Duration::days(7))
    }

    #[test]
    fn tokens_are_256_bit_url_safe() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(URL_SAFE_NO_PAD.decode(&a).unwrap().len(), 32);
        assert!(!a.contains('=') && !a.contains('+') && !a.contains('/'));
    }

    #[tokio::test]
    async fn login_verify_and_destroy() {
        let svc = setup().await;
        let login = svc.login("ali", &sha256_hex("secret")).await.unwrap();
        assert_eq!(login.user.role, "employee");
        assert!(login.expires_at > Utc::now() + Duration::days(6));

        let identity = svc.verify(&login.token).await.unwrap().unwrap();
        assert_eq!(
            identity,
            SessionIdentity {
                username: "ali".into(),
                role: "employee".into()
            }
        );

        svc.destroy(&login.token).await.unwrap();
        assert!(svc.verify(&login.token).await.unwrap().is_none());
        svc.destroy(&login.token).await.unwrap();
    }

    #[tokio::test]
    async fn login_failures_are_distinguished() {
        let svc = setup().await;
        assert_matches!(
            svc.login("nobody", "x").await,
            Err(ServiceError::NotFound(msg)) if msg == "Invalid username"
        );
        assert_matches!(
            svc.login("ali", &sha256_hex("wrong")).await,
            Err(ServiceError::InvalidCredential(msg)) if msg == "Invalid password"
        );
    }

    #[tokio::test]
    async fn expired_sessions_do_not_verify() {
        let svc = setup().await;
        svc.create_session("old", "ali", "employee", Utc::now() - Duration::seconds(1))
            .await
            .unwrap();
        svc.create_session("fresh", "ali", "viewer", Utc::now() + Duration::hours(1))
            .await
            .unwrap();

        assert!(svc.verify("old").await.unwrap().is_none());
        assert_eq!(svc.verify("fresh").await.unwrap().unwrap().role, "viewer");
        assert!(svc.verify("missing").await.unwrap().is_none());
    }
}
