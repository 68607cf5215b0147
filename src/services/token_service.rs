//! Bearer token issuing and validation (HS256 JWT).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    config::JwtConfig,
    error::{AppError, AppResult, INVALID_TOKEN},
};

/// Lifetime of an issued token.
pub const TOKEN_VALIDITY_HOURS: i64 = 2;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
}

impl TokenIssuer {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
        }
    }

    pub fn issue(&self, user_id: i32, email: &str) -> AppResult<IssuedToken> {
        self.issue_at(user_id, email, Utc::now())
    }

    fn issue_at(&self, user_id: i32, email: &str, now: DateTime<Utc>) -> AppResult<IssuedToken> {
        let expires_at = now
            .checked_add_signed(Duration::hours(TOKEN_VALIDITY_HOURS))
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Every failed check (signature, issuer, audience, expiry) yields the same rejection.
    pub fn validate(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["sub", "exp", "iss", "aud"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|err| {
                tracing::debug!(error = %err, "token rejected");
                AppError::Unauthorized(INVALID_TOKEN)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.into(),
            issuer: "storefront-api".into(),
            audience: "storefront-clients".into(),
        }
    }

    #[test]
    fn issued_token_validates_and_carries_identity() {
        let issuer = TokenIssuer::new(&config("test-secret"));
        let issued = issuer.issue(42, "a@x.com").unwrap();

        let claims = issuer.validate(&issued.token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.exp - claims.iat, TOKEN_VALIDITY_HOURS * 3600);
    }

    #[test]
    fn rejects_token_signed_with_other_key() {
        let forged = TokenIssuer::new(&config("other-secret"))
            .issue(1, "a@x.com")
            .unwrap();
        let err = TokenIssuer::new(&config("test-secret"))
            .validate(&forged.token)
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(INVALID_TOKEN)));
    }

    #[test]
    fn rejects_wrong_audience_and_issuer() {
        let issuer = TokenIssuer::new(&config("test-secret"));

        let mut other = config("test-secret");
        other.audience = "someone-else".into();
        let token = TokenIssuer::new(&other).issue(1, "a@x.com").unwrap().token;
        assert!(issuer.validate(&token).is_err());

        let mut other = config("test-secret");
        other.issuer = "someone-else".into();
        let token = TokenIssuer::new(&other).issue(1, "a@x.com").unwrap().token;
        assert!(issuer.validate(&token).is_err());
    }

    #[test]
    fn expired_and_forged_tokens_are_rejected_identically() {
        let issuer = TokenIssuer::new(&config("test-secret"));
        let expired = issuer
            .issue_at(1, "a@x.com", Utc::now() - Duration::hours(3))
            .unwrap();
        let forged = TokenIssuer::new(&config("other-secret"))
            .issue(1, "a@x.com")
            .unwrap();

        let a = issuer.validate(&expired.token).unwrap_err().to_string();
        let b = issuer.validate(&forged.token).unwrap_err().to_string();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_garbage() {
        let issuer = TokenIssuer::new(&config("test-secret"));
        assert!(issuer.validate("not-a-token").is_err());
    }
}
