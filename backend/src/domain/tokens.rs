//! Signed, tamper-evident tokens.
//!
//! A token is `payload.timestamp.signature` where `payload` is the
//! base64url-encoded JSON object `{"user_<scope>_id": <id>}`, `timestamp` is
//! the signing time in Unix seconds and `signature` is the base64url HMAC-SHA256
//! of `payload.timestamp`. Tokens are not encrypted.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::domain::{Error, UserId};

type HmacSha256 = Hmac<Sha256>;

/// Purpose a token was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenScope {
    /// API authentication, sent as `Authorization: Bearer <token>`.
    Authentication,
    /// Account cancellation link mailed on registration.
    CancelAccount,
}

impl TokenScope {
    fn claim(self) -> &'static str {
        match self {
            Self::Authentication => "user_authentication_id",
            Self::CancelAccount => "user_cancel_account_id",
        }
    }
}

/// Failures raised while signing or verifying tokens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// The token does not have the expected shape.
    #[error("token is malformed")]
    Malformed,
    /// The signature does not match the payload.
    #[error("token signature does not match")]
    BadSignature,
    /// The payload was issued for another scope.
    #[error("token was issued for another purpose")]
    WrongScope,
    /// The token is older than the allowed age.
    #[error("token expired")]
    Expired,
    /// The signing key was rejected by the MAC implementation.
    #[error("signing key rejected: {message}")]
    KeyRejected { message: String },
}

impl From<TokenError> for Error {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::KeyRejected { message } => {
                Self::internal(format!("token signing failed: {message}"))
            }
            TokenError::Malformed
            | TokenError::BadSignature
            | TokenError::WrongScope
            | TokenError::Expired => Self::invalid_field("token", "invalid_token", "Invalid token"),
        }
    }
}

/// HMAC signer for user tokens.
#[derive(Clone)]
pub struct TokenSigner {
    key: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// Build a signer from secret key material.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            key: Zeroizing::new(secret.into()),
        }
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(&self.key).map_err(|err| TokenError::KeyRejected {
            message: err.to_string(),
        })
    }

    /// Sign a token for `user_id` in `scope`.
    ///
    /// # Examples
    /// ```
    /// use chrono::Utc;
    /// use tracker_backend::domain::{TokenScope, TokenSigner, UserId};
    ///
    /// let signer = TokenSigner::new(b"secret".to_vec());
    /// let now = Utc::now();
    /// let token = signer.sign(TokenScope::Authentication, UserId::new(3), now).expect("sign");
    /// let user = signer.verify(&token, TokenScope::Authentication, None, now).expect("verify");
    /// assert_eq!(user, UserId::new(3));
    /// ```
    pub fn sign(
        &self,
        scope: TokenScope,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let mut claims = Map::new();
        claims.insert(scope.claim().to_owned(), Value::from(user_id.get()));
        let payload = Value::Object(claims).to_string();
        let body = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload.as_bytes()),
            now.timestamp()
        );
        let mut mac = self.mac()?;
        mac.update(body.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{body}.{signature}"))
    }

    /// Verify a token and return the user it was issued to.
    ///
    /// `max_age` bounds the time since signing; `None` accepts any age.
    pub fn verify(
        &self,
        token: &str,
        scope: TokenScope,
        max_age: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Result<UserId, TokenError> {
        let (body, signature) = token.trim().rsplit_once('.').ok_or(TokenError::Malformed)?;
        let (payload, timestamp) = body.split_once('.').ok_or(TokenError::Malformed)?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;
        let mut mac = self.mac()?;
        mac.update(body.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let signed_at = timestamp
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .ok_or(TokenError::Malformed)?;
        if let Some(max_age) = max_age
            && now.signed_duration_since(signed_at) > max_age
        {
            return Err(TokenError::Expired);
        }

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Map<String, Value> =
            serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;
        claims
            .get(scope.claim())
            .and_then(Value::as_i64)
            .map(UserId::new)
            .ok_or(TokenError::WrongScope)
    }
}
