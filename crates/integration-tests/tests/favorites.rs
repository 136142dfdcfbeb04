//! Integration tests for optimistic favorites.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use axum::http::Method;
use crowdfork_client::{ApiError, DiscoverySession};
use crowdfork_core::RestaurantId;
use crowdfork_integration_tests::{TestBackend, VALID_PASSWORD};
use secrecy::SecretString;

fn session(backend: &TestBackend) -> DiscoverySession {
    DiscoverySession::new(backend.signed_in_config()).unwrap()
}

#[tokio::test]
async fn test_load_replaces_local_set() {
    let backend = TestBackend::start().await;
    backend.seed_favorites(["biz123", "biz789"]);
    let session = session(&backend);

    let count = session.favorites().load().await.unwrap();

    assert_eq!(count, 2);
    let snapshot = session.favorites().snapshot();
    assert!(snapshot.loaded);
    assert!(snapshot.ids.contains(&RestaurantId::new("biz789")));
}

#[tokio::test]
async fn test_toggle_is_visible_before_confirmation() {
    let backend = TestBackend::start().await;
    backend.set_favorite_delay(Duration::from_millis(200));
    let session = session(&backend);
    let id = RestaurantId::new("biz123");

    let pending = {
        let session = session.clone();
        let id = id.clone();
        tokio::spawn(async move { session.toggle_favorite(&id).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(session.favorites().is_favorite(&id));
    assert!(backend.favorites().is_empty());

    assert!(pending.await.unwrap().unwrap());
    assert!(session.favorites().is_favorite(&id));
    assert!(backend.favorites().contains("biz123"));
}

#[tokio::test]
async fn test_failed_toggle_rolls_back() {
    let backend = TestBackend::start().await;
    backend.set_favorite_delay(Duration::from_millis(150));
    backend.fail_favorite("biz123");
    let session = session(&backend);
    let id = RestaurantId::new("biz123");

    let pending = {
        let favorites = session.favorites().clone();
        let id = id.clone();
        tokio::spawn(async move { favorites.toggle(&id).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(session.favorites().is_favorite(&id));

    let result = pending.await.unwrap();
    match result {
        Err(ApiError::RequestFailed { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "Favorites are unavailable");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!session.favorites().is_favorite(&id));
    assert_eq!(
        session.favorites().snapshot().error.as_deref(),
        Some("Favorites are unavailable")
    );
}

#[tokio::test]
async fn test_rapid_double_toggle_is_serialized() {
    let backend = TestBackend::start().await;
    backend.set_favorite_delay(Duration::from_millis(100));
    let session = session(&backend);
    let id = RestaurantId::new("biz456");

    let first = {
        let favorites = session.favorites().clone();
        let id = id.clone();
        tokio::spawn(async move { favorites.toggle(&id).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let second = {
        let favorites = session.favorites().clone();
        let id = id.clone();
        tokio::spawn(async move { favorites.toggle(&id).await })
    };

    assert!(first.await.unwrap().unwrap());
    assert!(!second.await.unwrap().unwrap());

    assert!(!session.favorites().is_favorite(&id));
    assert!(!backend.favorites().contains("biz456"));
    let methods: Vec<Method> = backend
        .requests_to("/favorites/biz456")
        .into_iter()
        .map(|r| r.method)
        .collect();
    assert_eq!(methods, vec![Method::POST, Method::DELETE]);
}

#[tokio::test]
async fn test_abandoned_toggle_still_confirms() {
    let backend = TestBackend::start().await;
    backend.set_favorite_delay(Duration::from_millis(300));
    let session = session(&backend);
    let id = RestaurantId::new("biz123");

    let abandoned =
        tokio::time::timeout(Duration::from_millis(50), session.toggle_favorite(&id)).await;
    assert!(abandoned.is_err());
    assert!(session.favorites().is_favorite(&id));

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(session.favorites().is_favorite(&id));
    assert!(backend.favorites().contains("biz123"));
}

#[tokio::test]
async fn test_abandoned_failing_toggle_still_rolls_back() {
    let backend = TestBackend::start().await;
    backend.set_favorite_delay(Duration::from_millis(300));
    backend.fail_favorite("biz789");
    let session = session(&backend);
    let id = RestaurantId::new("biz789");

    let abandoned =
        tokio::time::timeout(Duration::from_millis(50), session.toggle_favorite(&id)).await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!session.favorites().is_favorite(&id));
    assert!(backend.favorites().is_empty());
    assert_eq!(
        session.favorites().snapshot().error.as_deref(),
        Some("Favorites are unavailable")
    );

    // The next toggle starts from the confirmed state.
    backend.set_favorite_delay(Duration::ZERO);
    let methods_before = backend.requests_to("/favorites/biz789").len();
    let _ = session.toggle_favorite(&id).await;
    let requests = backend.requests_to("/favorites/biz789");
    assert_eq!(requests.len(), methods_before + 1);
    assert_eq!(requests[methods_before].method, Method::POST);
}

#[tokio::test]
async fn test_toggles_on_different_restaurants_overlap() {
    let backend = TestBackend::start().await;
    backend.set_favorite_delay(Duration::from_millis(150));
    let session = session(&backend);
    let a = RestaurantId::new("biz123");
    let b = RestaurantId::new("biz321");

    let started = tokio::time::Instant::now();
    let (ra, rb) = tokio::join!(session.toggle_favorite(&a), session.toggle_favorite(&b));

    assert!(ra.unwrap());
    assert!(rb.unwrap());
    assert!(started.elapsed() < Duration::from_millis(290));
    assert_eq!(backend.favorites().len(), 2);
}

#[tokio::test]
async fn test_toggle_signed_out_requires_login() {
    let backend = TestBackend::start().await;
    let session = DiscoverySession::new(backend.config()).unwrap();

    let result = session.favorites().toggle(&RestaurantId::new("biz123")).await;

    assert!(matches!(result, Err(ApiError::Unauthenticated)));
    assert!(backend.requests().is_empty());
    assert!(session.favorites().snapshot().ids.is_empty());
}

#[tokio::test]
async fn test_saved_restaurants_skip_missing_details() {
    let backend = TestBackend::start().await;
    backend.seed_favorites(["biz789", "gone", "biz123"]);
    let session = session(&backend);

    let saved = session.saved_restaurants().await.unwrap();

    let names: Vec<&str> = saved.iter().map(|d| d.summary.name.as_str()).collect();
    assert_eq!(names, vec!["Golden Boy Pizza", "Tacos El Gordo"]);
}

#[tokio::test]
async fn test_login_loads_favorites_and_expiry_clears_them() {
    let backend = TestBackend::start().await;
    backend.seed_favorites(["biz123"]);
    let session = DiscoverySession::new(backend.config()).unwrap();
    let mut watcher = session.watch();

    session
        .login("me@example.com", SecretString::from(VALID_PASSWORD))
        .await
        .unwrap();
    assert!(session.favorites().is_favorite(&RestaurantId::new("biz123")));

    backend.reject_tokens(true);
    assert!(session.favorites().load().await.is_err());
    watcher.next_redirect().await.unwrap();

    assert!(session.favorites().snapshot().ids.is_empty());
}
