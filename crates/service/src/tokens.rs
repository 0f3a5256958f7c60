//! Bearer credentials
//!
//! Signed, time-bounded claims carried in the `Authorization` header.
//! Verification failures distinguish an expired credential (the caller
//! should refresh) from an invalid one (the caller should re-authenticate).

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ServiceError};

/// Verified claims attached to a request.
#[derive(Debug, Clone)]
pub struct BearerClaims {
    pub account_id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    iat: i64,
    exp: i64,
}

/// Issues and verifies bearer credentials (HS256).
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime_secs: i64,
}

impl TokenIssuer {
    /// Builds an issuer from the configured signing secret and lifetime.
    #[must_use]
    pub fn new(secret: &[u8], lifetime_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            lifetime_secs,
        }
    }

    /// Signs a bearer credential for the account.
    pub fn issue(&self, account_id: Uuid, email: Option<&str>) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: account_id.to_string(),
            email: email.map(str::to_string),
            iat: now,
            exp: now + self.lifetime_secs,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ServiceError::internal(format!("token signing: {e}")))
    }

    /// Verifies a bearer credential and extracts its claims.
    pub fn verify(&self, token: &str) -> Result<BearerClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            let expired = matches!(
                e.kind(),
                jsonwebtoken::errors::ErrorKind::ExpiredSignature
            );
            ServiceError::Unauthenticated { expired }
        })?;
        let account_id = data
            .claims
            .sub
            .parse::<Uuid>()
            .map_err(|_| ServiceError::Unauthenticated { expired: false })?;
        Ok(BearerClaims {
            account_id,
            email: data.claims.email,
        })
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("lifetime_secs", &self.lifetime_secs)
            .finish_non_exhaustive()
    }
}
