use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Session token lifetime (7 days).
const TOKEN_TTL_SECS: i64 = 7 * 24 * 3600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The client/barber uid from the identity provider.
    pub sub: String,
    pub email: String,
    pub exp: i64,
}

/// Mint an HS256 session token for a signed-in user.
pub fn mint_token(
    uid: &str,
    email: &str,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: uid.to_string(),
        email: email.to_string(),
        exp: Utc::now().timestamp() + TOKEN_TTL_SECS,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, secret: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}

/// Extract claims from an `Authorization: Bearer <token>` header.
pub fn extract_claims(auth_header: &str, secret: &str) -> Option<Claims> {
    let token = auth_header.strip_prefix("Bearer ")?;
    verify_token(token, secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_verify_round_trip() {
        let token = mint_token("uid-1", "a@b.dev", "secret").unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, "uid-1");
        assert_eq!(claims.email, "a@b.dev");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = mint_token("uid-1", "a@b.dev", "secret").unwrap();
        assert!(verify_token(&token, "other").is_none());
    }

    #[test]
    fn test_header_must_be_bearer() {
        let token = mint_token("uid-1", "a@b.dev", "secret").unwrap();
        assert!(extract_claims(&format!("Bearer {token}"), "secret").is_some());
        assert!(extract_claims(&token, "secret").is_none());
        assert!(extract_claims("Basic abc", "secret").is_none());
    }
}
