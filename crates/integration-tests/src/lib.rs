//! Integration test support for the CrowdFork discovery client.
//!
//! [`TestBackend`] is an in-process fake of the CrowdFork REST API built on
//! `axum`. It binds `127.0.0.1:0`, records every request it receives, and can
//! be told to delay, fail or reject individual calls so tests can reproduce
//! races deterministically.
//!
//! # Example
//!
//! ```rust,ignore
//! let backend = TestBackend::start().await;
//! backend.set_search_delay("pizza", Duration::from_millis(200));
//!
//! let session = DiscoverySession::new(backend.signed_in_config())?;
//! session.search().submit("pizza").await?;
//!
//! assert_eq!(backend.requests_to("/search/restaurants").len(), 1);
//! ```

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use crowdfork_client::{ClientConfig, GeoError, LocationProvider};
use crowdfork_core::Coordinates;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use url::Url;

/// Token the fake backend accepts.
pub const VALID_TOKEN: &str = "test-token";

/// Password the fake backend accepts for any email.
pub const VALID_PASSWORD: &str = "correct-horse";

/// Debounce used by [`TestBackend::config`].
pub const TEST_DEBOUNCE: Duration = Duration::from_millis(50);

const REVIEW_TIMESTAMP: &str = "2024-06-15T12:30:45.123456";
const USER_ID: &str = "uid-1";

/// A request as seen by the fake backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

impl RecordedRequest {
    /// Value of a query parameter.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }
}

#[derive(Default)]
struct Behavior {
    search_delays: HashMap<String, Duration>,
    autocomplete_delay: Duration,
    favorite_delay: Duration,
    protected_delay: Duration,
    failing_favorites: HashSet<String>,
    fail_autocomplete: bool,
    reject_tokens: bool,
}

#[derive(Default)]
struct Data {
    favorites: HashSet<String>,
    reviews: Vec<Value>,
    next_review: u32,
    profile: serde_json::Map<String, Value>,
}

#[derive(Default)]
struct BackendState {
    requests: Mutex<Vec<RecordedRequest>>,
    behavior: Mutex<Behavior>,
    data: Mutex<Data>,
}

/// Location provider that answers with a fixed position after a delay.
#[derive(Debug, Clone, Copy)]
pub struct SlowLocation {
    pub position: Coordinates,
    pub delay: Duration,
}

#[async_trait::async_trait]
impl LocationProvider for SlowLocation {
    async fn current_location(&self) -> Result<Coordinates, GeoError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.position)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process fake of the CrowdFork REST API.
pub struct TestBackend {
    addr: SocketAddr,
    state: Arc<BackendState>,
    server: JoinHandle<()>,
}

impl Drop for TestBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl TestBackend {
    /// Bind an ephemeral port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        init_tracing();

        let state = Arc::new(BackendState::default());
        lock(&state.data).profile = default_profile();

        let router = Router::new().fallback(handle).with_state(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|e| panic!("failed to bind fake backend: {e}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|e| panic!("fake backend has no address: {e}"));

        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!(error = %e, "Fake backend stopped");
            }
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Base URL of the fake backend.
    ///
    /// # Panics
    ///
    /// Never in practice: the address is always a valid URL.
    #[must_use]
    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr))
            .unwrap_or_else(|e| panic!("invalid backend url: {e}"))
    }

    /// Client configuration pointing at this backend, signed out.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::for_api(self.url());
        config.suggest_debounce = TEST_DEBOUNCE;
        config.request_timeout = Duration::from_secs(5);
        config.geolocation_timeout = Duration::from_millis(200);
        config
    }

    /// Client configuration holding a token this backend accepts.
    #[must_use]
    pub fn signed_in_config(&self) -> ClientConfig {
        let mut config = self.config();
        config.auth_token = Some(VALID_TOKEN.into());
        config
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Every request received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state.requests).clone()
    }

    /// Requests received for `path` (without query string).
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    /// Server-side favorite IDs.
    #[must_use]
    pub fn favorites(&self) -> HashSet<String> {
        lock(&self.state.data).favorites.clone()
    }

    // =========================================================================
    // Behavior
    // =========================================================================

    pub fn seed_favorites<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lock(&self.state.data)
            .favorites
            .extend(ids.into_iter().map(Into::into));
    }

    /// Delay search responses for `term`.
    pub fn set_search_delay(&self, term: &str, delay: Duration) {
        lock(&self.state.behavior)
            .search_delays
            .insert(term.to_string(), delay);
    }

    pub fn set_autocomplete_delay(&self, delay: Duration) {
        lock(&self.state.behavior).autocomplete_delay = delay;
    }

    pub fn set_favorite_delay(&self, delay: Duration) {
        lock(&self.state.behavior).favorite_delay = delay;
    }

    /// Delay every protected endpoint before the token is checked.
    pub fn set_protected_delay(&self, delay: Duration) {
        lock(&self.state.behavior).protected_delay = delay;
    }

    /// Make add/remove favorite fail for `id`.
    pub fn fail_favorite(&self, id: &str) {
        lock(&self.state.behavior)
            .failing_favorites
            .insert(id.to_string());
    }

    pub fn fail_autocomplete(&self, fail: bool) {
        lock(&self.state.behavior).fail_autocomplete = fail;
    }

    /// Answer 401 to every protected call.
    pub fn reject_tokens(&self, reject: bool) {
        lock(&self.state.behavior).reject_tokens = reject;
    }
}

/// Install a test-friendly subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crowdfork_client=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Request handling
// =============================================================================

async fn handle(
    State(state): State<Arc<BackendState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let query: HashMap<String, String> = uri
        .query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body: Option<Value> = serde_json::from_slice(&body).ok();

    let request = RecordedRequest {
        method,
        path: uri.path().to_string(),
        query,
        authorization,
        body,
    };
    lock(&state.requests).push(request.clone());

    let segments: Vec<&str> = request
        .path
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    if is_protected(&segments) {
        let (delay, reject) = {
            let behavior = lock(&state.behavior);
            (behavior.protected_delay, behavior.reject_tokens)
        };
        tokio::time::sleep(delay).await;
        let expected = format!("Bearer {VALID_TOKEN}");
        if reject || request.authorization.as_deref() != Some(expected.as_str()) {
            return error(StatusCode::UNAUTHORIZED, "Invalid or expired token");
        }
    }

    route(&state, &request, &segments).await
}

fn is_protected(segments: &[&str]) -> bool {
    !matches!(
        segments,
        ["login" | "signup"] | ["autocomplete", ..] | ["yelp", ..]
    )
}

async fn route(state: &BackendState, request: &RecordedRequest, segments: &[&str]) -> Response {
    match (request.method.as_str(), segments) {
        ("POST", ["login"]) => login(request),
        ("POST", ["signup"]) => signup(request),
        ("GET", ["search", "restaurants"]) => search(state, request).await,
        ("GET", ["restaurants"]) => listing(request),
        ("GET", ["autocomplete", "restaurants"]) => autocomplete(state, request).await,
        ("GET", ["yelp", "restaurants", id]) => detail(id),
        ("GET", ["yelp", "restaurants", id, "similar"]) => similar(id, request),
        ("GET", ["users", "me", "favorites", "ids"]) => {
            let mut ids: Vec<String> = lock(&state.data).favorites.iter().cloned().collect();
            ids.sort();
            Json(json!({ "favorite_ids": ids })).into_response()
        }
        ("POST", ["favorites", id]) => set_favorite(state, id, true).await,
        ("DELETE", ["favorites", id]) => set_favorite(state, id, false).await,
        ("POST", ["restaurants", id, "reviews"]) => create_review(state, id, request),
        ("DELETE", ["reviews", id]) => delete_review(state, id),
        ("GET", ["restaurant", id, "reviews"]) => {
            let limit = limit(request, 10);
            let reviews: Vec<Value> = lock(&state.data)
                .reviews
                .iter()
                .filter(|r| r["restaurant_id"] == *id)
                .take(limit)
                .cloned()
                .collect();
            Json(reviews).into_response()
        }
        ("GET", ["users", "me", "reviews"]) => {
            let limit = limit(request, 10);
            let reviews: Vec<Value> = lock(&state.data)
                .reviews
                .iter()
                .take(limit)
                .cloned()
                .collect();
            Json(reviews).into_response()
        }
        ("GET", ["users", "me", "reviews", "count"]) => {
            let count = lock(&state.data).reviews.len();
            Json(json!({ "count": count })).into_response()
        }
        ("GET", ["users", "me"]) => {
            Json(Value::Object(lock(&state.data).profile.clone())).into_response()
        }
        ("PUT", ["users", "me"]) => {
            let mut data = lock(&state.data);
            if let Some(Value::Object(update)) = &request.body {
                for (key, value) in update {
                    data.profile.insert(key.clone(), value.clone());
                }
            }
            Json(Value::Object(data.profile.clone())).into_response()
        }
        _ => error(StatusCode::NOT_FOUND, "Not Found"),
    }
}

fn error(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

fn limit(request: &RecordedRequest, default: usize) -> usize {
    request
        .param("limit")
        .and_then(|l| l.parse().ok())
        .unwrap_or(default)
}

fn login(request: &RecordedRequest) -> Response {
    let password = request
        .body
        .as_ref()
        .and_then(|b| b["password"].as_str())
        .unwrap_or_default();
    if password == VALID_PASSWORD {
        Json(json!({ "token": VALID_TOKEN })).into_response()
    } else {
        error(StatusCode::BAD_REQUEST, "Invalid username or password")
    }
}

fn signup(request: &RecordedRequest) -> Response {
    let email = request
        .body
        .as_ref()
        .and_then(|b| b["email"].as_str())
        .unwrap_or_default();
    if email == "taken@example.com" {
        return error(
            StatusCode::BAD_REQUEST,
            &format!("Account already created for the email {email}"),
        );
    }
    Json(json!({ "message": format!("Successfully created user {USER_ID}") })).into_response()
}

async fn search(state: &BackendState, request: &RecordedRequest) -> Response {
    let term = request.param("term").unwrap_or_default().to_lowercase();
    let delay = lock(&state.behavior)
        .search_delays
        .get(&term)
        .copied()
        .unwrap_or_default();
    tokio::time::sleep(delay).await;

    let businesses: Vec<Value> = catalog()
        .into_iter()
        .filter(|b| {
            let name = b["name"].as_str().unwrap_or_default().to_lowercase();
            let category = b["categories"][0]["title"]
                .as_str()
                .unwrap_or_default()
                .to_lowercase();
            name.contains(&term) || category.contains(&term)
        })
        .collect();
    let total = businesses.len();
    Json(json!({ "businesses": businesses, "total": total })).into_response()
}

fn listing(request: &RecordedRequest) -> Response {
    let limit = limit(request, 20);
    let restaurants: Vec<Value> = [
        ("r1", "Joe's Pizza", "Italian", "123 Main St, New York, NY"),
        ("r2", "Sushi Ko", "Japanese", "9 Pine St, San Francisco, CA"),
        ("r3", "Taqueria Sol", "Mexican", "77 Mission St, San Francisco, CA"),
    ]
    .into_iter()
    .filter(|(_, _, cuisine, _)| {
        request
            .param("cuisine_type")
            .is_none_or(|wanted| wanted.eq_ignore_ascii_case(cuisine))
    })
    .take(limit)
    .map(|(id, name, cuisine, address)| {
        json!({
            "id": id,
            "name": name,
            "cuisine_type": cuisine,
            "address": address,
            "created_at": "2024-01-01T00:00:00",
            "updated_at": "2024-01-01T00:00:00",
        })
    })
    .collect();
    Json(restaurants).into_response()
}

async fn autocomplete(state: &BackendState, request: &RecordedRequest) -> Response {
    let (delay, fail) = {
        let behavior = lock(&state.behavior);
        (behavior.autocomplete_delay, behavior.fail_autocomplete)
    };
    tokio::time::sleep(delay).await;
    if fail {
        return error(StatusCode::BAD_GATEWAY, "Autocomplete upstream unavailable");
    }

    let text = request.param("text").unwrap_or_default().to_lowercase();
    let terms: Vec<Value> = ["pizza", "pizzeria", "pad thai", "tacos", "tapas"]
        .into_iter()
        .filter(|t| t.starts_with(&text))
        .map(|t| json!({ "text": t }))
        .collect();
    Json(json!({ "terms": terms, "businesses": [], "categories": [] })).into_response()
}

fn detail(id: &str) -> Response {
    match catalog().into_iter().find(|b| b["id"] == id) {
        Some(mut business) => {
            business["photos"] = json!([format!("https://img.example.com/{id}/1.jpg")]);
            business["display_phone"] = json!("(415) 555-0100");
            business["price"] = json!("$$");
            business["hours"] = json!([{
                "open": [
                    { "day": 0, "start": "1100", "end": "2100", "is_overnight": false },
                    { "day": 4, "start": "1100", "end": "2300", "is_overnight": false }
                ],
                "hours_type": "REGULAR",
                "is_open_now": true
            }]);
            Json(business).into_response()
        }
        None => error(
            StatusCode::NOT_FOUND,
            &format!("Restaurant with ID {id} not found"),
        ),
    }
}

fn similar(id: &str, request: &RecordedRequest) -> Response {
    let limit = limit(request, 5);
    let others: Vec<Value> = catalog()
        .into_iter()
        .filter(|b| b["id"] != id)
        .take(limit)
        .collect();
    Json(others).into_response()
}

async fn set_favorite(state: &BackendState, id: &str, add: bool) -> Response {
    let (delay, fail) = {
        let behavior = lock(&state.behavior);
        (
            behavior.favorite_delay,
            behavior.failing_favorites.contains(id),
        )
    };
    tokio::time::sleep(delay).await;
    if fail {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Favorites are unavailable");
    }

    let mut data = lock(&state.data);
    if add {
        data.favorites.insert(id.to_string());
        Json(json!({ "message": "Restaurant added to favorites" })).into_response()
    } else {
        data.favorites.remove(id);
        Json(json!({ "message": "Restaurant removed from favorites" })).into_response()
    }
}

fn create_review(state: &BackendState, id: &str, request: &RecordedRequest) -> Response {
    let Some(body) = &request.body else {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "Invalid body");
    };
    if body["restaurant_id"] != id {
        return error(
            StatusCode::BAD_REQUEST,
            "Restaurant ID in path doesn't match ID in review data",
        );
    }
    let rating = body["rating"].as_f64().unwrap_or(-1.0);
    if !(0.0..=5.0).contains(&rating) {
        return error(StatusCode::BAD_REQUEST, "Rating must be between 0 and 5");
    }

    let mut data = lock(&state.data);
    data.next_review += 1;
    let review = json!({
        "id": format!("rev-{}", data.next_review),
        "restaurant_id": id,
        "user_id": USER_ID,
        "rating": rating,
        "text": body.get("text").cloned().unwrap_or(Value::Null),
        "created_at": REVIEW_TIMESTAMP,
    });
    data.reviews.insert(0, review.clone());
    Json(review).into_response()
}

fn delete_review(state: &BackendState, id: &str) -> Response {
    let mut data = lock(&state.data);
    let before = data.reviews.len();
    data.reviews.retain(|r| r["id"] != id);
    if data.reviews.len() == before {
        error(StatusCode::NOT_FOUND, &format!("Review with ID {id} not found"))
    } else {
        Json(json!({ "message": "Review deleted successfully" })).into_response()
    }
}

fn catalog() -> Vec<Value> {
    [
        ("biz123", "Golden Boy Pizza", "Pizza", 4.5, 37.8, -122.41),
        ("biz456", "Tony's Pizza Napoletana", "Pizza", 4.0, 37.8, -122.41),
        ("biz789", "Tacos El Gordo", "Tacos", 4.5, 36.1, -115.17),
        ("biz321", "Kin Khao", "Thai", 4.0, 37.79, -122.41),
    ]
    .into_iter()
    .map(|(id, name, category, rating, lat, lon)| {
        json!({
            "id": id,
            "name": name,
            "image_url": format!("https://img.example.com/{id}.jpg"),
            "rating": rating,
            "review_count": 100,
            "categories": [{ "alias": category.to_lowercase(), "title": category }],
            "location": { "display_address": ["1 Example St", "San Francisco, CA 94133"] },
            "coordinates": { "latitude": lat, "longitude": lon },
        })
    })
    .collect()
}

fn default_profile() -> serde_json::Map<String, Value> {
    let Value::Object(profile) = json!({
        "id": USER_ID,
        "email": "me@example.com",
        "display_name": "Test Eater",
        "bio": null,
        "location": "San Francisco, CA",
    }) else {
        unreachable!("profile literal is an object")
    };
    profile
}
