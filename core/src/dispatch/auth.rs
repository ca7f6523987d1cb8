// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Worker token issuance and validation. A registered worker receives an
//! HMAC-signed bearer token (24h expiry) it presents on every subsequent
//! request, via either the `Authorization: Bearer` header or
//! `X-Worker-Token`.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::dispatch::error::DispatchError;

const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// Claims carried by a worker token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerClaims {
    #[serde(rename = "workerId")]
    pub worker_id: String,
    pub hostname: String,
    pub exp: i64,
    pub iat: i64,
}

/// Issues and validates worker bearer tokens against a single HMAC secret.
pub struct WorkerTokenService {
    secret: String,
    ttl_hours: i64,
}

impl WorkerTokenService {
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
        }
    }

    /// Overrides the default 24h token lifetime, per a deployment's
    /// `security.workerTokenTtlHours` setting.
    pub fn with_ttl_hours(mut self, ttl_hours: i64) -> Self {
        self.ttl_hours = ttl_hours;
        self
    }

    pub fn issue(&self, worker_id: &str, hostname: &str) -> Result<String, DispatchError> {
        let now = Utc::now();
        let claims = WorkerClaims {
            worker_id: worker_id.to_string(),
            hostname: hostname.to_string(),
            exp: (now + Duration::hours(self.ttl_hours)).timestamp(),
            iat: now.timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| DispatchError::Internal(format!("token signing failed: {e}")))
    }

    pub fn validate(&self, token: &str) -> Result<WorkerClaims, DispatchError> {
        decode::<WorkerClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| DispatchError::Unauthorized)
    }

    /// Extract a bearer token from either the standard `Authorization`
    /// header or the `X-Worker-Token` fallback, per §6.
    pub fn extract_token<'a>(
        authorization: Option<&'a str>,
        worker_token_header: Option<&'a str>,
    ) -> Option<&'a str> {
        if let Some(auth) = authorization {
            if let Some(token) = auth.strip_prefix("Bearer ") {
                return Some(token);
            }
        }
        worker_token_header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_validates_back_to_same_claims() {
        let service = WorkerTokenService::new("test-secret".to_string());
        let token = service.issue("w1", "host1").unwrap();
        let claims = service.validate(&token).unwrap();
        assert_eq!(claims.worker_id, "w1");
        assert_eq!(claims.hostname, "host1");
    }

    #[test]
    fn validate_rejects_garbage_token() {
        let service = WorkerTokenService::new("test-secret".to_string());
        assert!(service.validate("not-a-token").is_err());
    }

    #[test]
    fn validate_rejects_token_signed_with_different_secret() {
        let issuer = WorkerTokenService::new("secret-a".to_string());
        let verifier = WorkerTokenService::new("secret-b".to_string());
        let token = issuer.issue("w1", "host1").unwrap();
        assert!(verifier.validate(&token).is_err());
    }

    #[test]
    fn extract_token_prefers_bearer_header() {
        let extracted = WorkerTokenService::extract_token(Some("Bearer abc123"), Some("other"));
        assert_eq!(extracted, Some("abc123"));
    }

    #[test]
    fn extract_token_falls_back_to_worker_token_header() {
        let extracted = WorkerTokenService::extract_token(None, Some("xyz"));
        assert_eq!(extracted, Some("xyz"));
    }
}
