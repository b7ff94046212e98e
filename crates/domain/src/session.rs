//! Session tokens: HS256-signed JWTs carrying the caller's [`Identity`].

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use common::UserId;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::user::{Identity, Role};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";

/// Errors produced while issuing or verifying session tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token is not three base64url segments of valid JSON.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The header names an algorithm other than HS256.
    #[error("unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The signature does not match the payload under our key.
    #[error("token signature mismatch")]
    BadSignature,

    /// The token's expiry has passed.
    #[error("token expired")]
    Expired,

    /// The signing key could not be used.
    #[error("token signing failed: {0}")]
    Signing(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Token payload: the identity plus issued-at and expiry (seconds since epoch).
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    id: UserId,
    name: String,
    email: String,
    role: Role,
    iat: i64,
    exp: i64,
}

/// Issues and verifies session tokens with a symmetric secret.
///
/// Tokens are valid for a fixed lifetime (one hour by default) and cannot be
/// refreshed or revoked; expiry forces a new login.
#[derive(Clone)]
pub struct SessionIssuer {
    secret: SecretString,
    ttl: Duration,
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SessionIssuer {
    /// Default token lifetime in seconds.
    pub const DEFAULT_TTL_SECS: i64 = 3600;

    /// Creates an issuer with the default one-hour lifetime.
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            ttl: Duration::seconds(Self::DEFAULT_TTL_SECS),
        }
    }

    /// Overrides the token lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns the token lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token for `identity`, valid from now.
    pub fn issue(&self, identity: &Identity) -> Result<String, TokenError> {
        self.issue_at(identity, Utc::now())
    }

    /// Issues a token as if the current time were `now`.
    pub fn issue_at(&self, identity: &Identity, now: DateTime<Utc>) -> Result<String, TokenError> {
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };
        let claims = Claims {
            id: identity.id,
            name: identity.name.clone(),
            email: identity.email.clone(),
            role: identity.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let signing_input = format!("{}.{}", encode_json(&header)?, encode_json(&claims)?);
        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature}"))
    }

    /// Verifies a token's signature and expiry and returns its identity.
    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verifies a token as if the current time were `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, TokenError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed("expected three segments".to_string()));
        };

        let header: Header = decode_json(header_b64)?;
        if header.alg != ALGORITHM {
            return Err(TokenError::UnsupportedAlgorithm(header.alg));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|e| TokenError::Malformed(e.to_string()))?;
        let mut mac = self.mac()?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        // Only trust the payload once the signature checks out.
        let claims: Claims = decode_json(claims_b64)?;
        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(Identity {
            id: claims.id,
            name: claims.name,
            email: claims.email,
            role: claims.role,
        })
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

fn encode_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value).map_err(|e| TokenError::Signing(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_json<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| TokenError::Malformed(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer(secret: &str) -> SessionIssuer {
        SessionIssuer::new(SecretString::from(secret.to_string()))
    }

    fn identity(role: Role) -> Identity {
        Identity {
            id: UserId::new(),
            name: "Bea".to_string(),
            email: "bea@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn issued_token_verifies_to_same_identity() {
        let issuer = issuer("s3cret");
        let who = identity(Role::Seller);

        let token = issuer.issue(&who).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(issuer.verify(&token).unwrap(), who);
    }

    #[test]
    fn token_expires_after_one_hour() {
        let issuer = issuer("s3cret");
        let issued = Utc::now();
        let token = issuer.issue_at(&identity(Role::Buyer), issued).unwrap();

        assert!(
            issuer
                .verify_at(&token, issued + Duration::minutes(59))
                .is_ok()
        );
        assert!(matches!(
            issuer.verify_at(&token, issued + Duration::hours(1)),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn wrong_key_is_rejected() {
        let token = issuer("key-one").issue(&identity(Role::Buyer)).unwrap();
        assert!(matches!(
            issuer("key-two").verify(&token),
            Err(TokenError::BadSignature)
        ));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let issuer = issuer("s3cret");
        let token = issuer.issue(&identity(Role::Buyer)).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let mut claims: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        claims["role"] = "seller".into();
        let forged = format!(
            "{}.{}.{}",
            parts[0],
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap()),
            parts[2]
        );

        assert!(matches!(
            issuer.verify(&forged),
            Err(TokenError::BadSignature)
        ));
    }

    #[test]
    fn alg_none_is_rejected() {
        let issuer = issuer("s3cret");
        let token = issuer.issue(&identity(Role::Buyer)).unwrap();
        let rest = token.split_once('.').unwrap().1;
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);

        assert!(matches!(
            issuer.verify(&format!("{header}.{rest}")),
            Err(TokenError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        let issuer = issuer("s3cret");
        for token in ["", "abc", "a.b", "a.b.c.d", "!!.??.**"] {
            assert!(
                matches!(issuer.verify(token), Err(TokenError::Malformed(_))),
                "{token:?} should be malformed"
            );
        }
    }

    #[test]
    fn debug_redacts_secret() {
        let rendered = format!("{:?}", issuer("hunter2"));
        assert!(!rendered.contains("hunter2"));
    }
}
