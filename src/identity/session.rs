use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use super::principal::Subject;

type HmacSha256 = Hmac<Sha256>;

/// Fixed credential lifetime: seven days from issuance.
pub const SESSION_LIFETIME_SECS: i64 = 7 * 24 * 60 * 60;
pub const MIN_SECRET_LEN: usize = 16;

const TOKEN_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;
const MAX_TOKEN_LEN: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("no session credential presented")]
    Missing,
    #[error("session credential failed verification")]
    Invalid,
    #[error("session credential has expired")]
    Expired,
}

#[derive(Debug, Deserialize)]
struct TokenHeader {
    alg: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: i64,
    name: String,
    #[allow(dead_code)]
    iat: i64,
    exp: i64,
}

/// Issues and verifies HMAC-SHA256 signed session tokens.
///
/// Nothing is stored server side: a token is valid exactly when its signature
/// checks out under the configured secret and its `exp` lies in the future.
#[derive(Clone)]
pub struct SessionAuthenticator {
    mac: HmacSha256,
    lifetime: Duration,
    secure_cookie: bool,
}

impl std::fmt::Debug for SessionAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAuthenticator")
            .field("lifetime_secs", &self.lifetime.num_seconds())
            .field("secure_cookie", &self.secure_cookie)
            .finish_non_exhaustive()
    }
}

impl SessionAuthenticator {
    pub fn new(secret: &[u8], secure_cookie: bool) -> anyhow::Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("session secret must be at least {} bytes", MIN_SECRET_LEN);
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|e| anyhow::anyhow!(e.to_string()))?;
        Ok(Self { mac, lifetime: Duration::seconds(SESSION_LIFETIME_SECS), secure_cookie })
    }

    pub fn lifetime(&self) -> Duration { self.lifetime }

    pub fn secure_cookie(&self) -> bool { self.secure_cookie }

    /// Issue a credential for an already authenticated subject.
    pub fn issue(&self, subject: &Subject) -> String {
        self.issue_at(subject, Utc::now())
    }

    pub fn issue_at(&self, subject: &Subject, now: DateTime<Utc>) -> String {
        let iat = now.timestamp();
        let claims = serde_json::json!({
            "sub": subject.id,
            "name": subject.name,
            "iat": iat,
            "exp": iat + self.lifetime.num_seconds(),
        });
        let header_part = URL_SAFE_NO_PAD.encode(TOKEN_HEADER);
        let claims_part = URL_SAFE_NO_PAD.encode(claims.to_string());
        let sig_part = URL_SAFE_NO_PAD.encode(self.sign(&header_part, &claims_part));
        format!("{}.{}.{}", header_part, claims_part, sig_part)
    }

    /// Resolve the subject behind a presented credential.
    pub fn verify(&self, token: Option<&str>) -> Result<Subject, AuthError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: Option<&str>, now: DateTime<Utc>) -> Result<Subject, AuthError> {
        let token = token.map(str::trim).filter(|t| !t.is_empty()).ok_or(AuthError::Missing)?;
        if token.len() > MAX_TOKEN_LEN {
            return Err(AuthError::Invalid);
        }
        let mut parts = token.split('.');
        let (Some(header_part), Some(claims_part), Some(sig_part), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::Invalid);
        };

        let header: TokenHeader = decode_json(header_part)?;
        if header.alg != "HS256" {
            return Err(AuthError::Invalid);
        }
        let sig = URL_SAFE_NO_PAD.decode(sig_part).map_err(|_| AuthError::Invalid)?;
        let mut mac = self.mac.clone();
        mac.update(header_part.as_bytes());
        mac.update(b".");
        mac.update(claims_part.as_bytes());
        mac.verify_slice(&sig).map_err(|_| AuthError::Invalid)?;

        // Signed by us from here on; only the clock can still reject it
        let claims: Claims = decode_json(claims_part)?;
        if now.timestamp() >= claims.exp {
            return Err(AuthError::Expired);
        }
        Ok(Subject { id: claims.sub, name: claims.name })
    }

    /// `Set-Cookie` value delivering a fresh credential to the client.
    pub fn session_cookie(&self, token: &str) -> Result<axum::http::HeaderValue, axum::http::header::InvalidHeaderValue> {
        super::cookie::set_session_cookie(token, self.lifetime.num_seconds(), self.secure_cookie)
    }

    /// `Set-Cookie` value telling the client to discard its credential.
    ///
    /// The token itself stays valid until `exp` for anyone still holding a copy.
    pub fn revoke(&self) -> Result<axum::http::HeaderValue, axum::http::header::InvalidHeaderValue> {
        super::cookie::clear_session_cookie(self.secure_cookie)
    }

    fn sign(&self, header_part: &str, claims_part: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(header_part.as_bytes());
        mac.update(b".");
        mac.update(claims_part.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(part: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD.decode(part).map_err(|_| AuthError::Invalid)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::Invalid)
}
