//! Request-level session checks for protected operations.

use std::collections::HashMap;

use chrono::Utc;
use portal_core::error::PortalResult;
use portal_core::models::session::SessionClaims;
use portal_core::models::user::UserType;
use portal_core::repository::SessionRepository;
use tracing::debug;

use crate::error::AuthError;
use crate::session::SessionIssuer;

/// Find the session token in request headers.
///
/// The named cookie wins; an `Authorization: Bearer` header is the
/// fallback. Header names are matched case-insensitively.
pub fn extract_token<'h>(headers: &'h HashMap<String, String>, cookie_name: &str) -> Option<&'h str> {
    let from_cookie = headers
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case("cookie"))
        .flat_map(|(_, value)| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| name.trim() == cookie_name && !value.trim().is_empty())
        .map(|(_, value)| value.trim());

    from_cookie.or_else(|| {
        headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("authorization"))
            .and_then(|(_, value)| {
                let (scheme, token) = value.trim().split_once(' ')?;
                let token = token.trim();
                (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
            })
    })
}

/// Authenticates requests against the session issuer.
pub struct AuthGuard<'a, S: SessionRepository> {
    issuer: &'a SessionIssuer<S>,
    cookie_name: &'a str,
}

impl<'a, S: SessionRepository> AuthGuard<'a, S> {
    pub fn new(issuer: &'a SessionIssuer<S>, cookie_name: &'a str) -> Self {
        Self {
            issuer,
            cookie_name,
        }
    }

    /// Claims of the caller's live session.
    pub async fn require_auth(&self, headers: &HashMap<String, String>) -> PortalResult<SessionClaims> {
        let token = extract_token(headers, self.cookie_name).ok_or(AuthError::Unauthenticated)?;
        self.issuer.verify(token, Utc::now()).await
    }

    /// Like [`require_auth`](Self::require_auth), and additionally
    /// requires the session's user type to be `role` and, when given,
    /// `permission` to be among its permissions.
    pub async fn require_role(
        &self,
        headers: &HashMap<String, String>,
        role: UserType,
        permission: Option<&str>,
    ) -> PortalResult<SessionClaims> {
        let claims = self.require_auth(headers).await?;

        if claims.user_type != role {
            debug!(user_type = %claims.user_type, required = %role, "Role check failed");
            return Err(match role {
                UserType::Staff => AuthError::StaffOnly,
                UserType::Client => AuthError::InsufficientPermissions,
            }
            .into());
        }

        if let Some(permission) = permission.filter(|p| !claims.has_permission(p)) {
            debug!(email = %claims.email, permission, "Permission check failed");
            return Err(AuthError::InsufficientPermissions.into());
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn reads_named_cookie() {
        let h = headers(&[("Cookie", "theme=dark; auth_token=abc.def.ghi; lang=es")]);
        assert_eq!(extract_token(&h, "auth_token"), Some("abc.def.ghi"));
    }

    #[test]
    fn cookie_header_name_is_case_insensitive() {
        let h = headers(&[("cookie", "auth_token=xyz")]);
        assert_eq!(extract_token(&h, "auth_token"), Some("xyz"));
    }

    #[test]
    fn falls_back_to_bearer() {
        let h = headers(&[("Authorization", "Bearer tok123")]);
        assert_eq!(extract_token(&h, "auth_token"), Some("tok123"));
        let h = headers(&[("authorization", "bearer tok456")]);
        assert_eq!(extract_token(&h, "auth_token"), Some("tok456"));
    }

    #[test]
    fn cookie_wins_over_bearer() {
        let h = headers(&[
            ("Cookie", "auth_token=from-cookie"),
            ("Authorization", "Bearer from-header"),
        ]);
        assert_eq!(extract_token(&h, "auth_token"), Some("from-cookie"));
    }

    #[test]
    fn missing_or_empty_token() {
        assert_eq!(extract_token(&HashMap::new(), "auth_token"), None);
        let h = headers(&[("Cookie", "auth_token=; other=1")]);
        assert_eq!(extract_token(&h, "auth_token"), None);
        let h = headers(&[("Authorization", "Basic dXNlcjpwdw==")]);
        assert_eq!(extract_token(&h, "auth_token"), None);
        let h = headers(&[("Cookie", "my_auth_token=zzz")]);
        assert_eq!(extract_token(&h, "auth_token"), None);
    }
}
