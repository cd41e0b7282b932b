//! Integration tests for the auth guard.

mod common;

use std::collections::HashMap;

use chrono::Duration;
use common::{client_registration, login, seed_code, setup, staff_registration, test_config};
use portal_auth::GENERATE_INVITATION_CODES;
use portal_core::error::PortalError;
use portal_core::models::user::UserType;

fn cookie(token: &str) -> HashMap<String, String> {
    HashMap::from([("Cookie".to_string(), format!("auth_token={token}"))])
}

#[tokio::test]
async fn require_auth_without_token() {
    let (service, _db) = setup(test_config()).await;
    let err = service
        .guard()
        .require_auth(&HashMap::new())
        .await
        .unwrap_err();
    assert!(
        matches!(err, PortalError::AuthenticationFailed { ref reason } if reason == "No autenticado")
    );
}

#[tokio::test]
async fn require_auth_with_bad_token() {
    let (service, _db) = setup(test_config()).await;
    let err = service
        .guard()
        .require_auth(&cookie("not-a-token"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, PortalError::AuthenticationFailed { ref reason } if reason == "Token inválido o expirado")
    );
}

#[tokio::test]
async fn require_auth_accepts_cookie_and_bearer() {
    let (service, _db) = setup(test_config()).await;
    service
        .register(client_registration("c@x.com"))
        .await
        .unwrap();
    let out = service
        .login(login("c@x.com", "secret", None))
        .await
        .unwrap();

    let claims = service.guard().require_auth(&cookie(&out.token)).await.unwrap();
    assert_eq!(claims.email, "c@x.com");

    let bearer = HashMap::from([(
        "Authorization".to_string(),
        format!("Bearer {}", out.token),
    )]);
    assert!(service.guard().require_auth(&bearer).await.is_ok());
}

#[tokio::test]
async fn require_role_enforces_staff_and_permission() {
    let (service, db) = setup(test_config()).await;
    seed_code(&db, "GUARD001", 2, Duration::days(7)).await;
    service
        .register(staff_registration("admin@x.com", "admin", "GUARD001"))
        .await
        .unwrap();
    service
        .register(staff_registration("worker@x.com", "trabajador", "GUARD001"))
        .await
        .unwrap();
    service
        .register(client_registration("c@x.com"))
        .await
        .unwrap();

    let admin = service
        .login(login("admin@x.com", "p", Some("staff")))
        .await
        .unwrap();
    let worker = service
        .login(login("worker@x.com", "p", Some("staff")))
        .await
        .unwrap();
    let client = service
        .login(login("c@x.com", "secret", None))
        .await
        .unwrap();
    let guard = service.guard();

    let claims = guard
        .require_role(
            &cookie(&admin.token),
            UserType::Staff,
            Some(GENERATE_INVITATION_CODES),
        )
        .await
        .unwrap();
    assert_eq!(claims.staff_tier.as_deref(), Some("admin"));

    let err = guard
        .require_role(
            &cookie(&worker.token),
            UserType::Staff,
            Some(GENERATE_INVITATION_CODES),
        )
        .await
        .unwrap_err();
    assert!(
        matches!(err, PortalError::AuthorizationDenied { ref reason } if reason == "Permisos insuficientes")
    );
    assert!(
        guard
            .require_role(&cookie(&worker.token), UserType::Staff, None)
            .await
            .is_ok()
    );

    let err = guard
        .require_role(&cookie(&client.token), UserType::Staff, None)
        .await
        .unwrap_err();
    assert!(
        matches!(err, PortalError::AuthorizationDenied { ref reason } if reason == "Acceso denegado. Solo para staff.")
    );
}
