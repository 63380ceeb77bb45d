// 🔐 Session Tokens + Password Hashing
//
// Sessions are stateless: a signed, expiring JWT held by the client is the
// entire session. There is no server-side session table and no revocation
// list; logout just clears the client's cookie.

use anyhow::{Context, Result};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::entities::Role;

/// Cookie that carries the session token.
pub const TOKEN_COOKIE: &str = "canvass-token";

/// Signed session payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user id
    pub sub: String,
    /// Login name, for display
    pub username: String,
    /// Access role baked into the token at login
    pub role: Role,
    /// Issued at (unix timestamp)
    pub iat: i64,
    /// Expiration (unix timestamp)
    pub exp: i64,
}

/// Issue a signed session token for a logged-in user.
pub fn sign_token(user_id: &str, username: &str, role: Role, secret: &str, ttl_secs: i64) -> Result<String> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        role,
        iat: now,
        exp: now + ttl_secs,
    };

    let key = EncodingKey::from_secret(secret.as_bytes());
    jsonwebtoken::encode(&Header::default(), &claims, &key).context("Failed to sign session token")
}

/// Validate a session token and recover its claims.
///
/// Rejects bad signatures and expired tokens; callers map the error to an
/// unauthorized response.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let data = jsonwebtoken::decode::<Claims>(token, &key, &Validation::default())
        .context("Invalid session token")?;
    Ok(data.claims)
}

/// Hash a password with argon2id, producing a PHC string for storage.
/// Used only at provisioning time (seeding).
pub fn hash_password(password: &str) -> Result<String> {
    use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
    use argon2::Argon2;

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// Verify a login attempt against a stored argon2id hash.
/// A malformed stored hash verifies as false rather than erroring.
pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::Argon2;
    use password_hash::{PasswordHash, PasswordVerifier};

    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_token_round_trip() {
        let token = sign_token("user-1", "agent", Role::Agent, SECRET, 3600).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.username, "agent");
        assert_eq!(claims.role, Role::Agent);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = sign_token("user-1", "agent", Role::Agent, SECRET, 3600).unwrap();
        assert!(verify_token(&token, "other-secret").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        // Default validation has 60s leeway, so expire well past it
        let token = sign_token("user-1", "admin", Role::Admin, SECRET, -3600).unwrap();
        assert!(verify_token(&token, SECRET).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(verify_token("not.a.token", SECRET).is_err());
    }

    #[test]
    fn test_password_hash_verify() {
        let hash = hash_password("admin123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("admin123", &hash));
        assert!(!verify_password("admin124", &hash));
    }

    #[test]
    fn test_verify_password_bad_hash() {
        assert!(!verify_password("whatever", "not-a-phc-string"));
    }
}
