// Password hashing and signed session tokens.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{MarketError, MarketResult};
use crate::model::user::{User, UserType};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Longest accepted session lifetime, one year.
pub const MAX_TOKEN_TTL_HOURS: u64 = 24 * 365;

// ---------------------------------------------------------------------------
// Passwords
// ---------------------------------------------------------------------------

/// Hash a password into an Argon2id PHC string.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))
}

/// Check a password against a stored PHC string. A malformed hash never
/// verifies.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub email: String,
    pub user_type: UserType,
    pub unique_id: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 session tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    /// `ttl_hours` is clamped to `1..=MAX_TOKEN_TTL_HOURS`.
    pub fn new(secret: &str, ttl_hours: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::hours(ttl_hours.clamp(1, MAX_TOKEN_TTL_HOURS) as i64),
        }
    }

    pub fn issue(&self, user: &User) -> MarketResult<String> {
        self.issue_at(user, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> MarketResult<String> {
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            user_type: user.user_type,
            unique_id: user.unique_id.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| MarketError::Storage(anyhow::anyhow!("failed to sign token: {e}")))
    }

    /// Decode and validate a token. Bad signatures, malformed input and
    /// expired tokens are all `Unauthorized`.
    pub fn verify(&self, token: &str) -> MarketResult<Claims> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("token rejected: {e}");
                MarketError::Unauthorized("Invalid or expired token".into())
            })
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let token = header_value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::user::BasicInfo;
    use crate::model::ReviewStatus;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn user() -> User {
        let now = Utc::now();
        User {
            id: "user-1".into(),
            email: "ada@example.com".into(),
            name: "Ada".into(),
            user_type: UserType::Investor,
            unique_id: "INV-001".into(),
            status: ReviewStatus::Approved,
            company: String::new(),
            phone: String::new(),
            basic_info: BasicInfo::default(),
            created_at: now,
            last_active: now,
            is_active: true,
        }
    }

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn same_password_hashes_differently() {
        let a = hash_password("correct horse").unwrap();
        let b = hash_password("correct horse").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
        assert!(!verify_password("", ""));
    }

    #[test]
    fn token_round_trip_carries_identity() {
        let tokens = TokenService::new(SECRET, 24);
        let token = tokens.issue(&user()).unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.user_type, UserType::Investor);
        assert_eq!(claims.unique_id, "INV-001");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let tokens = TokenService::new(SECRET, 1);
        let token = tokens
            .issue_at(&user(), Utc::now() - Duration::hours(2))
            .unwrap();
        assert!(matches!(
            tokens.verify(&token),
            Err(MarketError::Unauthorized(_))
        ));
    }

    #[test]
    fn token_signed_with_other_secret_is_unauthorized() {
        let token = TokenService::new("another-secret-another-secret-xx", 24)
            .issue(&user())
            .unwrap();
        let tokens = TokenService::new(SECRET, 24);
        assert!(matches!(
            tokens.verify(&token),
            Err(MarketError::Unauthorized(_))
        ));
        assert!(tokens.verify("garbage").is_err());
    }

    #[test]
    fn oversized_ttl_is_clamped_to_a_year() {
        let tokens = TokenService::new(SECRET, u64::MAX);
        let token = tokens.issue(&user()).unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, MAX_TOKEN_TTL_HOURS as i64 * 3600);
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Bearer   "), None);
        assert_eq!(bearer_token("Basic abc"), None);
    }
}
