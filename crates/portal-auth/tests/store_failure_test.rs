//! Workflow behaviour when the backing store errors or stalls.

mod common;

use std::time::{Duration as StdDuration, Instant};

use chrono::Duration;
use common::faults::{Fault, UserFaults, faulty_setup};
use common::{client_registration, login, seed_code, staff_registration, test_config, used_count};
use portal_auth::config::AuthConfig;
use portal_core::error::PortalError;
use portal_core::repository::UserRepository;
use portal_db::repository::SurrealUserRepository;

const STALL: Fault = Fault::Stall(StdDuration::from_secs(10));

fn short_timeout() -> AuthConfig {
    AuthConfig {
        store_timeout_ms: 50,
        ..test_config()
    }
}

#[tokio::test]
async fn invitation_store_error_rejects_staff_registration() {
    let (service, db) = faulty_setup(test_config(), UserFaults::default(), Some(Fault::Error)).await;
    seed_code(&db, "OPEN0001", 5, Duration::days(1)).await;

    let err = service
        .register(staff_registration("s@x.com", "admin", "OPEN0001"))
        .await
        .unwrap_err();

    assert!(matches!(err, PortalError::AuthorizationDenied { .. }));
    assert_eq!(used_count(&db, "OPEN0001").await, 0);
    assert!(
        SurrealUserRepository::new(db.clone())
            .find_by_email("s@x.com")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn stalled_invitation_store_times_out_and_rejects() {
    let (service, db) = faulty_setup(short_timeout(), UserFaults::default(), Some(STALL)).await;
    seed_code(&db, "SLOW0001", 5, Duration::days(1)).await;

    let started = Instant::now();
    let err = service
        .register(staff_registration("s@x.com", "admin", "SLOW0001"))
        .await
        .unwrap_err();

    assert!(started.elapsed() < StdDuration::from_secs(5));
    assert!(matches!(err, PortalError::AuthorizationDenied { .. }));
    assert_eq!(used_count(&db, "SLOW0001").await, 0);
}

#[tokio::test]
async fn failed_last_login_update_does_not_block_login() {
    let faults = UserFaults {
        record_login: Some(Fault::Error),
        ..UserFaults::default()
    };
    let (service, db) = faulty_setup(test_config(), faults, None).await;
    service.register(client_registration("c@x.com")).await.unwrap();

    let out = service.login(login("c@x.com", "secret", None)).await.unwrap();

    assert!(!out.token.is_empty());
    let stored = SurrealUserRepository::new(db.clone())
        .get_by_email("c@x.com")
        .await
        .unwrap();
    assert!(stored.last_login.is_none());
}

#[tokio::test]
async fn stalled_last_login_update_is_abandoned() {
    let faults = UserFaults {
        record_login: Some(STALL),
        ..UserFaults::default()
    };
    let (service, _db) = faulty_setup(short_timeout(), faults, None).await;
    service.register(client_registration("c@x.com")).await.unwrap();

    let started = Instant::now();
    let out = service.login(login("c@x.com", "secret", None)).await.unwrap();

    assert!(started.elapsed() < StdDuration::from_secs(5));
    assert_eq!(out.user.email, "c@x.com");
}

#[tokio::test]
async fn failed_duplicate_check_falls_back_to_insert() {
    let faults = UserFaults {
        find_by_email: Some(Fault::Error),
        ..UserFaults::default()
    };
    let (service, db) = faulty_setup(test_config(), faults, None).await;

    let user = service.register(client_registration("c@x.com")).await.unwrap();
    assert_eq!(user.email, "c@x.com");
    assert!(
        SurrealUserRepository::new(db.clone())
            .find_by_email("c@x.com")
            .await
            .unwrap()
            .is_some()
    );

    let err = service
        .register(client_registration("c@x.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Conflict { .. }));
}

#[tokio::test]
async fn stalled_lookup_fails_login_with_timeout() {
    let faults = UserFaults {
        find_by_email: Some(STALL),
        ..UserFaults::default()
    };
    let (service, _db) = faulty_setup(short_timeout(), faults, None).await;

    let err = service
        .login(login("c@x.com", "secret", None))
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Timeout(_)));
}
