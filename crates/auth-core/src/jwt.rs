//! Access token codec
//!
//! Signs and verifies compact HS256 tokens carrying a subject and expiry.
//! Verification is a pure function of the token, the server secret and the
//! clock; no store lookup happens here.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;
use crate::{Error, Result};

/// Minimum decoded key material, bytes. HS256 wants a 256-bit key.
const MIN_SECRET_LEN: usize = 32;

/// Claims carried by an access token. Only the subject identifies the user;
/// roles are re-resolved from the store on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    header: Header,
    validation: Validation,
    access_ttl: chrono::Duration,
}

impl TokenCodec {
    pub fn new(config: &JwtConfig) -> Result<Self> {
        if config.secret_base64.is_empty() {
            return Err(Error::Config("JWT secret is not configured".to_string()));
        }
        let secret = BASE64
            .decode(&config.secret_base64)
            .map_err(|e| Error::Config(format!("JWT secret is not valid base64: {}", e)))?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(Error::Config(format!(
                "JWT secret must decode to at least {} bytes, got {}",
                MIN_SECRET_LEN,
                secret.len()
            )));
        }

        let access_ttl_ms = i64::try_from(config.access_ttl_ms).map_err(|_| {
            Error::Config("access_ttl_ms does not fit in a signed 64-bit value".to_string())
        })?;

        let mut validation = Validation::new(Algorithm::HS256);
        // No clock-skew leeway; expiry is wall-clock at verification.
        validation.leeway = 0;
        validation.validate_exp = true;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(&secret),
            decoding_key: DecodingKey::from_secret(&secret),
            header: Header::new(Algorithm::HS256),
            validation,
            access_ttl: chrono::Duration::milliseconds(access_ttl_ms),
        })
    }

    /// Issue a signed token for `subject` expiring after `ttl`.
    pub fn issue(&self, subject: &str, ttl: chrono::Duration) -> Result<String> {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&self.header, &claims, &self.encoding_key)
            .map_err(|e| Error::Internal(format!("Token signing failed: {}", e)))
    }

    /// Issue an access token with the configured TTL.
    pub fn issue_access(&self, subject: &str) -> Result<String> {
        self.issue(subject, self.access_ttl)
    }

    /// Verify signature and expiry, returning the subject.
    pub fn verify(&self, token: &str) -> Result<String> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(data.claims.sub),
            Err(e) => match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(Error::TokenExpired),
                kind => {
                    tracing::debug!(?kind, "access token rejected");
                    Err(Error::TokenInvalid)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // base64 of 32 0x2a bytes
    fn test_config() -> JwtConfig {
        JwtConfig {
            secret_base64: BASE64.encode([0x2a; 32]),
            access_ttl_ms: 60_000,
            refresh_ttl_ms: 120_000,
        }
    }

    #[test]
    fn round_trip_before_expiry() {
        let codec = TokenCodec::new(&test_config()).unwrap();
        let token = codec.issue("alice", chrono::Duration::minutes(5)).unwrap();
        assert_eq!(codec.verify(&token).unwrap(), "alice");
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = TokenCodec::new(&test_config()).unwrap();
        let token = codec.issue("alice", chrono::Duration::seconds(-5)).unwrap();
        match codec.verify(&token) {
            Err(Error::TokenExpired) => {}
            other => panic!("expected TokenExpired, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn tampered_token_is_rejected() {
        let codec = TokenCodec::new(&test_config()).unwrap();
        let token = codec.issue("alice", chrono::Duration::minutes(5)).unwrap();
        // Flip a character in the signature segment.
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });
        assert!(matches!(codec.verify(&tampered), Err(Error::TokenInvalid)));
    }

    #[test]
    fn wrong_key_is_rejected() {
        let codec = TokenCodec::new(&test_config()).unwrap();
        let other = TokenCodec::new(&JwtConfig {
            secret_base64: BASE64.encode([0x07; 32]),
            ..test_config()
        })
        .unwrap();
        let token = codec.issue("alice", chrono::Duration::minutes(5)).unwrap();
        assert!(matches!(other.verify(&token), Err(Error::TokenInvalid)));
    }

    #[test]
    fn malformed_token_is_rejected() {
        let codec = TokenCodec::new(&test_config()).unwrap();
        assert!(matches!(codec.verify("not.a.jwt"), Err(Error::TokenInvalid)));
        assert!(matches!(codec.verify(""), Err(Error::TokenInvalid)));
    }

    #[test]
    fn oversized_access_ttl_is_fatal() {
        let config = JwtConfig {
            access_ttl_ms: u64::MAX,
            ..test_config()
        };
        assert!(matches!(TokenCodec::new(&config), Err(Error::Config(_))));
    }

    #[test]
    fn short_or_missing_secret_is_fatal() {
        let short = JwtConfig {
            secret_base64: BASE64.encode([1u8; 16]),
            ..test_config()
        };
        assert!(matches!(TokenCodec::new(&short), Err(Error::Config(_))));

        let missing = JwtConfig {
            secret_base64: String::new(),
            ..test_config()
        };
        assert!(matches!(TokenCodec::new(&missing), Err(Error::Config(_))));
    }
}
