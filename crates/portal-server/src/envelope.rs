//! Request and response envelopes shared by every operation.
//!
//! An inbound event carries the payload either in a `body` field (a
//! JSON string or object) or at the top level, plus an optional
//! `headers` map. Responses are `statusCode`/`headers`/`body` with the
//! body serialised to a JSON string.

use std::collections::{BTreeMap, HashMap};

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use portal_auth::AuthError;
use portal_core::error::PortalError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::error;

/// CORS headers attached to every response.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allow_origin: String,
    pub allow_methods: String,
    pub allow_headers: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: "*".into(),
            allow_methods: "POST, OPTIONS, GET".into(),
            allow_headers: "Content-Type, X-Amz-Date, Authorization, X-Api-Key, \
                            X-Amz-Security-Token, Accept"
                .into(),
        }
    }
}

impl CorsConfig {
    fn headers(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (
                "Access-Control-Allow-Origin".to_string(),
                self.allow_origin.clone(),
            ),
            (
                "Access-Control-Allow-Methods".to_string(),
                self.allow_methods.clone(),
            ),
            (
                "Access-Control-Allow-Headers".to_string(),
                self.allow_headers.clone(),
            ),
            ("Content-Type".to_string(), "application/json".to_string()),
        ])
    }
}

/// A parsed inbound request.
#[derive(Debug, Clone, Default)]
pub struct ApiEvent {
    pub payload: Map<String, Value>,
    pub headers: HashMap<String, String>,
}

impl ApiEvent {
    pub fn parse(event: Value) -> Result<Self, PortalError> {
        let Value::Object(mut event) = event else {
            return Err(invalid_body());
        };

        let headers = match event.remove("headers") {
            Some(Value::Object(headers)) => headers
                .into_iter()
                .filter_map(|(name, value)| match value {
                    Value::String(value) => Some((name, value)),
                    _ => None,
                })
                .collect(),
            _ => HashMap::new(),
        };

        let payload = match event.remove("body") {
            Some(Value::String(raw)) => parse_body(raw.as_bytes())?,
            Some(Value::Object(body)) => body,
            Some(Value::Null) => Map::new(),
            Some(_) => return Err(invalid_body()),
            None => event,
        };

        Ok(Self { payload, headers })
    }

    /// Build an event from an HTTP request's headers and raw body.
    pub fn from_http(headers: HashMap<String, String>, body: &[u8]) -> Result<Self, PortalError> {
        Ok(Self {
            payload: parse_body(body)?,
            headers,
        })
    }

    /// A string field; non-string values count as absent.
    pub fn str_field(&self, name: &str) -> Option<String> {
        self.payload
            .get(name)
            .and_then(Value::as_str)
            .map(String::from)
    }

    /// An integer field, accepting JSON numbers and numeric strings.
    /// `Err(())` means present but not an integer.
    pub fn int_field(&self, name: &str) -> Result<Option<i64>, ()> {
        match self.payload.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n.as_i64().map(Some).ok_or(()),
            Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| ()),
            Some(_) => Err(()),
        }
    }
}

fn parse_body(raw: &[u8]) -> Result<Map<String, Value>, PortalError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice(raw) {
        Ok(Value::Object(body)) => Ok(body),
        Ok(Value::Null) => Ok(Map::new()),
        _ => Err(invalid_body()),
    }
}

fn invalid_body() -> PortalError {
    PortalError::Validation {
        message: "El cuerpo de la solicitud debe ser un objeto JSON válido".into(),
    }
}

/// Outbound response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl ApiResponse {
    pub fn json(status_code: u16, body: &Value, cors: &CorsConfig) -> Self {
        Self {
            status_code,
            headers: cors.headers(),
            body: body.to_string(),
        }
    }

    /// CORS pre-flight answer.
    pub fn preflight(cors: &CorsConfig) -> Self {
        Self {
            status_code: 204,
            headers: cors.headers(),
            body: String::new(),
        }
    }

    /// Map an error onto its status code and body. Internal failures
    /// are logged here and reach the caller only as a generic message.
    pub fn error(err: &PortalError, cors: &CorsConfig) -> Self {
        let (status, body) = match err {
            PortalError::MissingFields { message } => {
                (400, json!({ "error": message, "code": "MISSING_FIELDS" }))
            }
            PortalError::Validation { message } => {
                (400, json!({ "error": message, "code": "INVALID_INPUT" }))
            }
            PortalError::AuthenticationFailed { reason } => {
                let code = if *reason == AuthError::InvalidCredentials.to_string() {
                    "INVALID_CREDENTIALS"
                } else {
                    "UNAUTHENTICATED"
                };
                (401, json!({ "error": reason, "code": code }))
            }
            PortalError::AuthorizationDenied { reason } => {
                (403, json!({ "error": reason, "code": "FORBIDDEN" }))
            }
            PortalError::VerificationRequired { reason } => (
                403,
                json!({ "error": reason, "code": "FORBIDDEN", "requires_verification": true }),
            ),
            PortalError::Conflict { reason } => {
                (409, json!({ "error": reason, "code": "CONFLICT" }))
            }
            other => {
                error!(error = %other, "Request failed with internal error");
                (
                    500,
                    json!({ "error": "Error interno del servidor", "code": "INTERNAL_ERROR" }),
                )
            }
        };
        Self::json(status, &body, cors)
    }

    /// The body parsed back into JSON.
    pub fn body_json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, self.body).into_response();
        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.insert(name, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_as_string() {
        let event = ApiEvent::parse(json!({
            "body": "{\"email\": \"a@x.com\", \"max_uses\": 3}",
            "headers": {"Cookie": "auth_token=abc", "X-Count": 1}
        }))
        .unwrap();
        assert_eq!(event.str_field("email").as_deref(), Some("a@x.com"));
        assert_eq!(event.int_field("max_uses"), Ok(Some(3)));
        assert_eq!(event.headers.get("Cookie").map(String::as_str), Some("auth_token=abc"));
        assert!(!event.headers.contains_key("X-Count"));
    }

    #[test]
    fn body_as_object_or_top_level() {
        let nested = ApiEvent::parse(json!({"body": {"email": "a@x.com"}})).unwrap();
        assert_eq!(nested.str_field("email").as_deref(), Some("a@x.com"));

        let direct = ApiEvent::parse(json!({"email": "b@x.com", "password": "p"})).unwrap();
        assert_eq!(direct.str_field("email").as_deref(), Some("b@x.com"));
        assert_eq!(direct.str_field("password").as_deref(), Some("p"));
    }

    #[test]
    fn empty_body_is_empty_payload() {
        let event = ApiEvent::parse(json!({"body": ""})).unwrap();
        assert!(event.payload.is_empty());
        let event = ApiEvent::parse(json!({"body": null})).unwrap();
        assert!(event.payload.is_empty());
        let event = ApiEvent::from_http(HashMap::new(), b"  ").unwrap();
        assert!(event.payload.is_empty());
    }

    #[test]
    fn malformed_body_is_rejected() {
        for event in [json!({"body": "{not json"}), json!({"body": "[1,2]"}), json!("str")] {
            assert!(matches!(
                ApiEvent::parse(event),
                Err(PortalError::Validation { .. })
            ));
        }
    }

    #[test]
    fn int_field_variants() {
        let event = ApiEvent::parse(json!({"a": "7", "b": 2.5, "c": "x", "d": null})).unwrap();
        assert_eq!(event.int_field("a"), Ok(Some(7)));
        assert_eq!(event.int_field("b"), Err(()));
        assert_eq!(event.int_field("c"), Err(()));
        assert_eq!(event.int_field("d"), Ok(None));
        assert_eq!(event.int_field("missing"), Ok(None));
    }

    #[test]
    fn non_string_fields_are_absent() {
        let event = ApiEvent::parse(json!({"email": 42})).unwrap();
        assert_eq!(event.str_field("email"), None);
    }

    #[test]
    fn responses_carry_cors_headers() {
        let cors = CorsConfig::default();
        for response in [
            ApiResponse::json(200, &json!({"ok": true}), &cors),
            ApiResponse::error(&PortalError::Internal("boom".into()), &cors),
            ApiResponse::preflight(&cors),
        ] {
            assert_eq!(response.headers["Access-Control-Allow-Origin"], "*");
            assert!(response.headers.contains_key("Access-Control-Allow-Methods"));
            assert!(response.headers.contains_key("Access-Control-Allow-Headers"));
        }
    }

    #[test]
    fn serialises_with_status_code_key() {
        let response = ApiResponse::json(201, &json!({"a": 1}), &CorsConfig::default());
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["statusCode"], 201);
        assert_eq!(value["body"], "{\"a\":1}");
    }

    #[test]
    fn error_mapping() {
        let cors = CorsConfig::default();
        let cases = [
            (PortalError::from(AuthError::MissingCredentials), 400, "MISSING_FIELDS"),
            (PortalError::from(AuthError::InvalidFrontend), 400, "INVALID_INPUT"),
            (PortalError::from(AuthError::InvalidCredentials), 401, "INVALID_CREDENTIALS"),
            (PortalError::from(AuthError::Unauthenticated), 401, "UNAUTHENTICATED"),
            (PortalError::from(AuthError::AccountInactive), 403, "FORBIDDEN"),
            (PortalError::from(AuthError::EmailTaken), 409, "CONFLICT"),
            (PortalError::Database("secret detail".into()), 500, "INTERNAL_ERROR"),
        ];
        for (err, status, code) in cases {
            let response = ApiResponse::error(&err, &cors);
            assert_eq!(response.status_code, status);
            assert_eq!(response.body_json()["code"], code);
        }
    }

    #[test]
    fn internal_errors_hide_detail() {
        let response = ApiResponse::error(
            &PortalError::Database("connection refused at 10.0.0.1".into()),
            &CorsConfig::default(),
        );
        assert!(!response.body.contains("10.0.0.1"));
        assert_eq!(response.body_json()["error"], "Error interno del servidor");
    }

    #[test]
    fn unverified_flag() {
        let response = ApiResponse::error(
            &PortalError::from(AuthError::EmailNotVerified),
            &CorsConfig::default(),
        );
        assert_eq!(response.status_code, 403);
        assert_eq!(response.body_json()["requires_verification"], true);
    }
}
