use serde::Serialize;
use sqlx::FromRow;
use subtle::ConstantTimeEq;
use time::OffsetDateTime;
use uuid::Uuid;

use super::token::digest;

/// What a verification token authorizes.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    Registration,
    ResetPassword,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Registration => "REGISTRATION",
            TokenType::ResetPassword => "RESET_PASSWORD",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "REGISTRATION" => Ok(TokenType::Registration),
            "RESET_PASSWORD" => Ok(TokenType::ResetPassword),
            other => anyhow::bail!("unknown token type {other}"),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct VerificationTokenRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_type: String,
    pub token_digest: Vec<u8>,
    pub activated: bool,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub consumed_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct VerificationToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_type: TokenType,
    pub token_digest: Vec<u8>, // SHA-256 of the mailed UUID
    pub activated: bool,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub consumed_at: Option<OffsetDateTime>,
}

impl TryFrom<VerificationTokenRow> for VerificationToken {
    type Error = anyhow::Error;

    fn try_from(r: VerificationTokenRow) -> anyhow::Result<Self> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            token_type: TokenType::parse(&r.token_type)?,
            token_digest: r.token_digest,
            activated: r.activated,
            created_at: r.created_at,
            expires_at: r.expires_at,
            consumed_at: r.consumed_at,
        })
    }
}

impl VerificationToken {
    /// Constant-time check that `raw` is the UUID this token was issued for.
    pub fn matches(&self, raw: &Uuid) -> bool {
        digest(raw).as_slice().ct_eq(&self.token_digest).into()
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NewVerificationToken {
    pub user_id: Uuid,
    pub token_type: TokenType,
    pub token_digest: Vec<u8>,
    pub expires_at: OffsetDateTime,
}
