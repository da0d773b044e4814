//! Utility functions for the lobby coordinator

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Generate a new unique session ID
pub fn generate_session_id() -> Uuid {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Hex-encoded SHA-256 digest of a join password
pub fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Lowercased form used for block-list storage and lookups
pub fn normalize_handle(handle: &str) -> String {
    handle.to_lowercase()
}
