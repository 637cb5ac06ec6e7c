use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Access tokens authenticate requests; refresh tokens only travel in the
/// `refreshToken` cookie and are exchanged for a new pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
}

impl Claims {
    pub fn new(
        user_id: Uuid,
        kind: TokenKind,
        issuer: &str,
        audience: &str,
        ttl: Duration,
        now: OffsetDateTime,
    ) -> Self {
        let iat = now.unix_timestamp().max(0) as usize;
        Self {
            sub: user_id,
            iat,
            exp: iat + ttl.as_secs() as usize,
            iss: issuer.to_string(),
            aud: audience.to_string(),
            kind,
        }
    }
}
