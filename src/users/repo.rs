use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::users::repo_types::{NewUser, User};

/// Returned by `create` when the e-mail is already taken.
#[derive(Debug, thiserror::Error)]
#[error("email already registered: {0}")]
pub struct DuplicateEmail(pub String);

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn create(&self, user: NewUser) -> anyhow::Result<User>;
    async fn set_enabled(&self, id: Uuid, enabled: bool) -> anyhow::Result<()>;
    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, enabled, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, enabled, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn create(&self, user: NewUser) -> anyhow::Result<User> {
        let inserted = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, enabled, created_at, updated_at
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await;

        match inserted {
            Ok(created) => Ok(created),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(DuplicateEmail(user.email).into())
            }
            Err(e) => Err(anyhow::Error::new(e).context("insert user")),
        }
    }

    async fn set_enabled(&self, id: Uuid, enabled: bool) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET enabled = $2, updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(enabled)
        .execute(&self.db)
        .await
        .context("update user enabled flag")?;
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET password_hash = $2, updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.db)
        .await
        .context("update user password")?;
        Ok(())
    }
}
