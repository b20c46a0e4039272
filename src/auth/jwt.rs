use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ACCESS_TOKEN_MINUTES: i64 = 30;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub staff: bool,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, is_staff: bool) -> Self {
        Self {
            sub: user_id,
            staff: is_staff,
            exp: (Utc::now() + Duration::minutes(ACCESS_TOKEN_MINUTES)).timestamp(),
        }
    }
}

pub fn encode_token(claims: &Claims, secret: &str) -> Result<String, String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| format!("JWT encode failed: {e}"))
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("JWT decode failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_identity() {
        let user_id = Uuid::now_v7();
        let token = encode_token(&Claims::new(user_id, true), "secret").unwrap();
        let claims = decode_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, user_id);
        assert!(claims.staff);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = encode_token(&Claims::new(Uuid::now_v7(), false), "secret").unwrap();
        assert!(decode_token(&token, "other").is_err());
    }
}
