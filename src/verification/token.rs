use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AppError;

/// Fresh one-time token value. Only its digest is ever persisted.
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

pub fn digest(raw: &Uuid) -> Vec<u8> {
    Sha256::digest(raw.as_bytes()).to_vec()
}

/// Parse a token taken from a link; anything that is not a UUID is rejected.
pub fn parse(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::InvalidToken)
}
