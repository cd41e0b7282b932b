//! Signed session token issuance/verification and opaque session token
//! generation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use portal_core::models::session::SessionClaims;
use portal_core::models::user::{FrontendType, UserType};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// JWT claims embedded in every signed session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedClaims {
    /// Subject: user ID as a UUID string.
    pub sub: String,
    pub email: String,
    pub user_type: UserType,
    pub staff_tier: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub frontend_type: FrontendType,
    /// Issuer.
    pub iss: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Unique token ID (UUID string).
    pub jti: String,
}

/// Issue an HS256 JWT carrying `claims`, valid from `now` for
/// `lifetime`. Returns the token and its expiry.
pub fn issue_signed_token(
    claims: &SessionClaims,
    now: DateTime<Utc>,
    lifetime: Duration,
    config: &AuthConfig,
) -> Result<(String, DateTime<Utc>), AuthError> {
    let iat = now.timestamp();
    let exp = iat + lifetime.num_seconds();
    let signed = SignedClaims {
        sub: claims.user_id.to_string(),
        email: claims.email.clone(),
        user_type: claims.user_type,
        staff_tier: claims.staff_tier.clone(),
        permissions: claims.permissions.clone(),
        frontend_type: claims.frontend_type,
        iss: config.jwt_issuer.clone(),
        iat,
        exp,
        jti: Uuid::new_v4().to_string(),
    };

    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &signed, &key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))?;

    let expires_at = DateTime::from_timestamp(exp, 0)
        .ok_or_else(|| AuthError::Crypto(format!("expiry out of range: {exp}")))?;
    Ok((token, expires_at))
}

/// Verify signature, issuer and expiry of a signed session token.
///
/// Expiry is checked against `now` rather than the system clock. Every
/// failure is reported as [`AuthError::SessionInvalid`].
pub fn decode_signed_token(
    token: &str,
    now: DateTime<Utc>,
    config: &AuthConfig,
) -> Result<SessionClaims, AuthError> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.set_issuer(&[&config.jwt_issuer]);
    validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

    let signed = jsonwebtoken::decode::<SignedClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            debug!(error = %e, "Rejected signed session token");
            AuthError::SessionInvalid
        })?;

    if now.timestamp() >= signed.exp {
        debug!(exp = signed.exp, "Signed session token expired");
        return Err(AuthError::SessionInvalid);
    }

    let user_id = Uuid::parse_str(&signed.sub).map_err(|e| {
        debug!(error = %e, "Signed session token has malformed subject");
        AuthError::SessionInvalid
    })?;

    Ok(SessionClaims {
        user_id,
        email: signed.email,
        user_type: signed.user_type,
        staff_tier: signed.staff_tier,
        permissions: signed.permissions,
        frontend_type: signed.frontend_type,
    })
}

/// Generate a cryptographically random opaque session token
/// (32 bytes → base64url-encoded, no padding).
pub fn generate_session_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rand::Rng::random(&mut rng);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 hash of a raw session token, hex-encoded.
///
/// This is the value stored in the database as `session.token_hash`.
pub fn hash_session_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}
