use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{NewVerificationToken, TokenType, VerificationToken, VerificationTokenRow};

#[async_trait]
pub trait VerificationTokenRepository: Send + Sync {
    async fn create(&self, token: NewVerificationToken) -> anyhow::Result<VerificationToken>;
    async fn find_by_digest(&self, digest: &[u8]) -> anyhow::Result<Option<VerificationToken>>;
    /// Most recently created token of `token_type` for the user.
    async fn find_latest(
        &self,
        user_id: Uuid,
        token_type: TokenType,
    ) -> anyhow::Result<Option<VerificationToken>>;
    /// Sets the activation flag; `false` when it was already set.
    async fn mark_activated(&self, id: Uuid) -> anyhow::Result<bool>;
    /// Marks the token as used; `false` when it was already used.
    async fn consume(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgVerificationTokenRepository {
    db: PgPool,
}

impl PgVerificationTokenRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VerificationTokenRepository for PgVerificationTokenRepository {
    async fn create(&self, token: NewVerificationToken) -> anyhow::Result<VerificationToken> {
        let row = sqlx::query_as::<_, VerificationTokenRow>(
            r#"
            INSERT INTO verification_tokens (user_id, token_type, token_digest, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, token_type, token_digest, activated,
                      created_at, expires_at, consumed_at
            "#,
        )
        .bind(token.user_id)
        .bind(token.token_type.as_str())
        .bind(&token.token_digest)
        .bind(token.expires_at)
        .fetch_one(&self.db)
        .await
        .context("insert verification token")?;
        row.try_into()
    }

    async fn find_by_digest(&self, digest: &[u8]) -> anyhow::Result<Option<VerificationToken>> {
        let row = sqlx::query_as::<_, VerificationTokenRow>(
            r#"
            SELECT id, user_id, token_type, token_digest, activated,
                   created_at, expires_at, consumed_at
              FROM verification_tokens
             WHERE token_digest = $1
            "#,
        )
        .bind(digest)
        .fetch_optional(&self.db)
        .await
        .context("find verification token")?;
        row.map(TryInto::try_into).transpose()
    }

    async fn find_latest(
        &self,
        user_id: Uuid,
        token_type: TokenType,
    ) -> anyhow::Result<Option<VerificationToken>> {
        let row = sqlx::query_as::<_, VerificationTokenRow>(
            r#"
            SELECT id, user_id, token_type, token_digest, activated,
                   created_at, expires_at, consumed_at
              FROM verification_tokens
             WHERE user_id = $1 AND token_type = $2
             ORDER BY created_at DESC
             LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(token_type.as_str())
        .fetch_optional(&self.db)
        .await
        .context("find latest verification token")?;
        row.map(TryInto::try_into).transpose()
    }

    async fn mark_activated(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE verification_tokens
               SET activated = true
             WHERE id = $1 AND activated = false
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await
        .context("activate verification token")?;
        Ok(result.rows_affected() > 0)
    }

    async fn consume(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE verification_tokens
               SET consumed_at = now()
             WHERE id = $1 AND consumed_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await
        .context("consume verification token")?;
        Ok(result.rows_affected() > 0)
    }
}
