use sha2::{Digest, Sha256};

pub const ACTIVATION_TOKEN_HOURS: i64 = 72;

/// Random opaque token handed to the client. Only its hash is stored.
pub fn generate() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

pub fn hash(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
