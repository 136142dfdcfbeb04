//! Integration tests for search dispatch, ordering and URL state.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use crowdfork_client::search::url_state;
use crowdfork_client::{ApiError, DiscoverySession, DispatchOutcome, NoLocation};
use crowdfork_core::Coordinates;
use crowdfork_integration_tests::{SlowLocation, TestBackend};
use url::Url;

const SEARCH: &str = "/search/restaurants";

fn session(backend: &TestBackend) -> DiscoverySession {
    DiscoverySession::new(backend.signed_in_config()).unwrap()
}

fn result_ids(session: &DiscoverySession) -> Vec<String> {
    session
        .search()
        .snapshot()
        .results
        .iter()
        .map(|r| r.id.to_string())
        .collect()
}

// =============================================================================
// Ordering
// =============================================================================

#[tokio::test]
async fn test_latest_search_wins_over_slow_earlier_one() {
    let backend = TestBackend::start().await;
    backend.set_search_delay("pizza", Duration::from_millis(300));
    let session = session(&backend);

    let slow = {
        let search = session.search().clone();
        tokio::spawn(async move { search.submit("pizza").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let fast = session.search().submit("tacos").await.unwrap();

    assert_eq!(fast, DispatchOutcome::Applied);
    assert_eq!(slow.await.unwrap().unwrap(), DispatchOutcome::Stale);
    assert_eq!(result_ids(&session), vec!["biz789"]);
    assert_eq!(session.search().snapshot().url.query(), Some("q=tacos"));
    assert_eq!(backend.requests_to(SEARCH).len(), 2);
}

#[tokio::test]
async fn test_stale_failure_does_not_set_error() {
    let backend = TestBackend::start().await;
    // The first request is rejected, but only after the second completes.
    backend.reject_tokens(true);
    backend.set_protected_delay(Duration::from_millis(200));
    let session = session(&backend);

    let slow = {
        let search = session.search().clone();
        tokio::spawn(async move { search.submit("pizza").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    backend.reject_tokens(false);
    backend.set_protected_delay(Duration::ZERO);
    session.search().submit("thai").await.unwrap();

    assert_eq!(slow.await.unwrap().unwrap(), DispatchOutcome::Stale);
    let snapshot = session.search().snapshot();
    assert!(snapshot.error.is_none());
    assert!(!snapshot.loading);
    assert_eq!(result_ids(&session), vec!["biz321"]);
}

// =============================================================================
// Results and errors
// =============================================================================

#[tokio::test]
async fn test_success_replaces_results_and_writes_url() {
    let backend = TestBackend::start().await;
    let session = session(&backend);

    session.edit_location("Oakland, CA");
    session.search().submit("pizza").await.unwrap();

    let snapshot = session.search().snapshot();
    assert_eq!(result_ids(&session), vec!["biz123", "biz456"]);
    assert!(!snapshot.loading);
    assert!(snapshot.error.is_none());
    assert_eq!(
        snapshot.url.as_str(),
        "http://localhost:5173/search?q=pizza&loc=Oakland%2C+CA"
    );

    let request = &backend.requests_to(SEARCH)[0];
    assert_eq!(request.param("term"), Some("pizza"));
    assert_eq!(request.param("location"), Some("Oakland, CA"));
}

#[tokio::test]
async fn test_failure_keeps_previous_results() {
    let backend = TestBackend::start().await;
    let session = session(&backend);

    session.search().submit("thai").await.unwrap();
    let url_before = session.search().snapshot().url;

    backend.reject_tokens(true);
    let result = session.search().submit("tacos").await;

    assert!(matches!(result, Err(ApiError::SessionExpired)));
    let snapshot = session.search().snapshot();
    assert_eq!(result_ids(&session), vec!["biz321"]);
    assert!(snapshot.error.is_some());
    assert_eq!(snapshot.url, url_before);
}

#[tokio::test]
async fn test_empty_text_loads_default_feed() {
    let backend = TestBackend::start().await;
    let session = session(&backend);

    session.submit().await.unwrap();

    assert_eq!(result_ids(&session), vec!["r1", "r2", "r3"]);
    assert!(backend.requests_to(SEARCH).is_empty());
    assert_eq!(backend.requests_to("/restaurants").len(), 1);
}

#[tokio::test]
async fn test_signed_out_search_never_reaches_network() {
    let backend = TestBackend::start().await;
    let session = DiscoverySession::new(backend.config()).unwrap();

    let result = session.search().submit("pizza").await;

    assert!(matches!(result, Err(ApiError::Unauthenticated)));
    assert!(backend.requests().is_empty());
    assert!(!session.search().snapshot().loading);
}

// =============================================================================
// Location
// =============================================================================

#[tokio::test]
async fn test_failed_geolocation_falls_back_to_city() {
    let backend = TestBackend::start().await;
    let session =
        DiscoverySession::with_location_provider(backend.signed_in_config(), Arc::new(NoLocation))
            .unwrap();

    assert!(session.use_current_location().await.is_err());
    session.search().submit("pizza").await.unwrap();

    let request = &backend.requests_to(SEARCH)[0];
    assert_eq!(request.param("location"), Some("San Francisco, CA"));
    assert_eq!(request.param("latitude"), None);
}

#[tokio::test]
async fn test_coordinates_replace_typed_location() {
    let backend = TestBackend::start().await;
    let mut config = backend.signed_in_config();
    config.device_location = Some(Coordinates::new(36.1, -115.17).unwrap());
    let session = DiscoverySession::new(config).unwrap();

    session.edit_location("Oakland, CA");
    session.use_current_location().await.unwrap();
    session.search().submit("tacos").await.unwrap();

    let request = &backend.requests_to(SEARCH)[0];
    assert_eq!(request.param("latitude"), Some("36.1"));
    assert_eq!(request.param("longitude"), Some("-115.17"));
    assert_eq!(request.param("location"), None);
    assert_eq!(session.search().snapshot().url.query(), Some("q=tacos"));
}

#[tokio::test]
async fn test_location_typed_during_lookup_is_kept() {
    let backend = TestBackend::start().await;
    let provider = SlowLocation {
        position: Coordinates::new(36.1, -115.17).unwrap(),
        delay: Duration::from_millis(150),
    };
    let session =
        DiscoverySession::with_location_provider(backend.signed_in_config(), Arc::new(provider))
            .unwrap();

    let lookup = {
        let session = session.clone();
        tokio::spawn(async move { session.use_current_location().await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    session.edit_location("Austin, TX");

    assert!(lookup.await.unwrap().is_ok());
    session.search().submit("tacos").await.unwrap();

    let request = &backend.requests_to(SEARCH)[0];
    assert_eq!(request.param("location"), Some("Austin, TX"));
    assert_eq!(request.param("latitude"), None);
}

#[tokio::test]
async fn test_typed_location_after_coordinates_wins() {
    let backend = TestBackend::start().await;
    let mut config = backend.signed_in_config();
    config.device_location = Some(Coordinates::new(36.1, -115.17).unwrap());
    let session = DiscoverySession::new(config).unwrap();

    session.use_current_location().await.unwrap();
    session.edit_location("Berkeley, CA");
    session.search().submit("thai").await.unwrap();

    let request = &backend.requests_to(SEARCH)[0];
    assert_eq!(request.param("location"), Some("Berkeley, CA"));
    assert_eq!(request.param("latitude"), None);
}

// =============================================================================
// URL state
// =============================================================================

#[tokio::test]
async fn test_mount_reads_url_once() {
    let backend = TestBackend::start().await;
    let session = session(&backend);
    let url = Url::parse("http://localhost:5173/search?q=tacos&loc=Las+Vegas").unwrap();

    session.mount(&url).await.unwrap();
    session.search().set_text("thai");
    session.mount(&url).await.unwrap();

    let terms: Vec<String> = backend
        .requests_to(SEARCH)
        .iter()
        .filter_map(|r| r.param("term").map(str::to_string))
        .collect();
    assert_eq!(terms, vec!["tacos", "thai"]);
    assert_eq!(
        session.search().query().location_text(),
        Some("Las Vegas")
    );
}

#[tokio::test]
async fn test_navigate_replaces_query() {
    let backend = TestBackend::start().await;
    let session = session(&backend);

    session.search().submit("pizza").await.unwrap();
    let back = url_state::back_to_search(
        &Url::parse("http://localhost:5173/saved?fromQ=thai&fromL=Oakland").unwrap(),
        &session.config().app_url,
    )
    .unwrap();
    session.search().navigate(&back).await.unwrap();

    let query = session.search().query();
    assert_eq!(query.text(), "thai");
    assert_eq!(query.location_text(), Some("Oakland"));
    assert_eq!(result_ids(&session), vec!["biz321"]);
}
