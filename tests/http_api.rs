//! HttpApi against a stub backend served by axum on a random port.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use lisbon_scout::api::{
    ApiError, Credentials, HttpApi, ListingQuery, ListingsApi, RunRequest, Session, TokenPair,
};
use lisbon_scout::engine::{SortField, SortSpec};
use lisbon_scout::Flag;

#[derive(Default)]
struct StubState {
    /// Token the stub currently accepts.
    access: String,
    /// Token handed out by the refresh endpoint; `None` rejects refreshes.
    refresh_gives: Option<String>,
    refresh_calls: usize,
    house_calls: usize,
    last_query: HashMap<String, String>,
    favorite: bool,
}

#[derive(Clone, Default)]
struct Stub(Arc<Mutex<StubState>>);

impl Stub {
    fn with(access: &str, refresh_gives: Option<&str>) -> Self {
        let stub = Stub::default();
        {
            let mut state = stub.0.lock().unwrap();
            state.access = access.to_string();
            state.refresh_gives = refresh_gives.map(str::to_string);
        }
        stub
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let expected = format!("Bearer {}", self.0.lock().unwrap().access);
        headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) == Some(expected.as_str())
    }

    fn refresh_calls(&self) -> usize {
        self.0.lock().unwrap().refresh_calls
    }

    fn house_calls(&self) -> usize {
        self.0.lock().unwrap().house_calls
    }
}

fn listing_json(id: u64, price: &str, bedrooms: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Apartment {id}"),
        "location": "Chiado",
        "price": price,
        "bedrooms": bedrooms,
        "area": "85 m²",
        "source": "idealista",
        "photos": null,
        "is_favorite": false,
        "scraped_at": "2024-05-01T10:00:00Z"
    })
}

async fn login(State(stub): State<Stub>, Json(body): Json<Value>) -> Response {
    if body["password"] != "segredo" {
        let detail = json!({"detail": "No active account"});
        return (StatusCode::UNAUTHORIZED, Json(detail)).into_response();
    }
    let access = stub.0.lock().unwrap().access.clone();
    Json(json!({"access": access, "refresh": "refresh-1"})).into_response()
}

async fn refresh(State(stub): State<Stub>, Json(body): Json<Value>) -> Response {
    let mut state = stub.0.lock().unwrap();
    state.refresh_calls += 1;
    match (&state.refresh_gives, body["refresh"].as_str()) {
        (Some(access), Some(_)) => Json(json!({"access": access})).into_response(),
        _ => {
            let detail = json!({"detail": "Token is invalid or expired"});
            (StatusCode::UNAUTHORIZED, Json(detail)).into_response()
        }
    }
}

async fn houses(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    stub.0.lock().unwrap().house_calls += 1;
    if !stub.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    stub.0.lock().unwrap().last_query = query;
    Json(json!({
        "count": 45,
        "next": "http://stub/api/houses/?page=3",
        "previous": "http://stub/api/houses/?page=1",
        "results": [listing_json(1, "1200.00", "T2"), listing_json(2, "€ 950", "studio")]
    }))
    .into_response()
}

async fn house(State(stub): State<Stub>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !stub.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match id.as_str() {
        "1" => Json(listing_json(1, "1200.00", "2")).into_response(),
        "lx/42?ref=1" => Json(listing_json(42, "700", "1")).into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response(),
    }
}

async fn toggle(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Path((_id, action)): Path<(String, String)>,
) -> Response {
    if !stub.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match action.as_str() {
        "toggle_favorite" => {}
        "toggle_contacted" => return Json(json!({})).into_response(),
        _ => return StatusCode::NOT_FOUND.into_response(),
    }
    let mut state = stub.0.lock().unwrap();
    state.favorite = !state.favorite;
    Json(json!({"is_favorite": state.favorite})).into_response()
}

async fn sorted(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Path(field): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !stub.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let mut houses = vec![listing_json(1, "800", "1"), listing_json(2, "1500", "3")];
    if query.get("order").map(String::as_str) == Some("desc") {
        houses.reverse();
    }
    Json(json!({"field": field, "houses": houses})).into_response()
}

async fn status(State(stub): State<Stub>, headers: HeaderMap) -> Response {
    if !stub.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "main_run": {"status": "running", "started_at": "2024-05-01T10:00:00Z"},
        "scrapers": {
            "idealista": {"name": "Idealista", "last_status": "success", "houses_found": 12},
            "imovirtual": {"last_status": "failed", "error_message": "timeout"}
        }
    }))
    .into_response()
}

async fn run(State(stub): State<Stub>, headers: HeaderMap, body: Bytes) -> Response {
    if !stub.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let request: Value = if body.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    let unknown = request["scrapers"]
        .as_array()
        .and_then(|names| names.iter().find(|n| *n != "idealista"));
    if let Some(unknown) = unknown {
        let message = format!("Unknown scraper: {}", unknown.as_str().unwrap_or_default());
        return (StatusCode::BAD_REQUEST, Json(json!({"scrapers": [message]}))).into_response();
    }
    Json(json!({"status": "started", "output": "Scraping started"})).into_response()
}

async fn serve(stub: Stub) -> String {
    let app = Router::new()
        .route("/api/users/login/", post(login))
        .route("/api/users/login/refresh/", post(refresh))
        .route("/api/houses/", get(houses))
        .route("/api/houses/{id}/", get(house))
        .route("/api/houses/{id}/{action}/", post(toggle))
        .route("/sort/{field}", get(sorted))
        .route("/api/scraper-status/", get(status))
        .route("/api/run-scrapers/", post(run))
        .with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

fn client(base_url: &str, tokens: Option<(&str, &str)>) -> HttpApi {
    let session = match tokens {
        Some((access, refresh)) => Session::with_tokens(TokenPair {
            access: access.to_string(),
            refresh: refresh.to_string(),
        }),
        None => Session::new(),
    };
    HttpApi::new(base_url).unwrap().with_session(Arc::new(session))
}

#[tokio::test]
async fn login_stores_tokens_and_lists_normalized_page() {
    let stub = Stub::with("access-1", None);
    let api = client(&serve(stub.clone()).await, None);

    let tokens = api
        .login(&Credentials {
            email: "ana@example.pt".into(),
            password: "segredo".into(),
        })
        .await
        .unwrap();
    assert_eq!(tokens.access, "access-1");
    assert!(api.session().is_authenticated().await);

    let query = ListingQuery::page(2)
        .with_ordering(SortSpec::descending(SortField::Price))
        .with_search("  Chiado ");
    let page = api.list_page(&query).await.unwrap();

    assert_eq!(page.count, 45);
    assert_eq!(page.results.len(), 2);
    assert_eq!(page.results[0].id, "1");
    assert_eq!(page.results[0].price, 1200.0);
    assert_eq!(page.results[0].bedrooms, 2);
    assert_eq!(page.results[0].area, 85.0);
    assert!(page.results[1].is_studio());
    assert_eq!(page.results[1].price, 950.0);
    assert!(page.results[1].photos.is_empty());

    let sent = stub.0.lock().unwrap().last_query.clone();
    assert_eq!(sent.get("page").map(String::as_str), Some("2"));
    assert_eq!(sent.get("ordering").map(String::as_str), Some("-price"));
    assert_eq!(sent.get("search").map(String::as_str), Some("Chiado"));
}

#[tokio::test]
async fn wrong_password_is_a_login_error() {
    let stub = Stub::with("access-1", None);
    let api = client(&serve(stub).await, None);

    let err = api
        .login(&Credentials {
            email: "ana@example.pt".into(),
            password: "wrong".into(),
        })
        .await
        .unwrap_err();
    assert!(err.requires_login());
    assert!(!api.session().is_authenticated().await);
}

#[tokio::test]
async fn expired_access_token_is_refreshed_and_retried_once() {
    let stub = Stub::with("fresh", Some("fresh"));
    let api = client(&serve(stub.clone()).await, Some(("stale", "refresh-1")));

    let page = api.list_page(&ListingQuery::page(1)).await.unwrap();

    assert_eq!(page.results.len(), 2);
    assert_eq!(stub.refresh_calls(), 1);
    assert_eq!(stub.house_calls(), 2);
    assert_eq!(api.session().access_token().await.as_deref(), Some("fresh"));
}

#[tokio::test]
async fn rejected_refresh_clears_the_session() {
    let stub = Stub::with("fresh", None);
    let api = client(&serve(stub.clone()).await, Some(("stale", "refresh-1")));

    let err = api.list_page(&ListingQuery::page(1)).await.unwrap_err();

    assert_matches!(err, ApiError::SessionExpired);
    assert_eq!(stub.refresh_calls(), 1);
    assert_eq!(stub.house_calls(), 1);
    assert!(!api.session().is_authenticated().await);
}

#[tokio::test]
async fn second_401_after_refresh_is_not_retried_again() {
    let stub = Stub::with("fresh", Some("still-wrong"));
    let api = client(&serve(stub.clone()).await, Some(("stale", "refresh-1")));

    let err = api.scraper_status().await.unwrap_err();

    assert_matches!(err, ApiError::SessionExpired);
    assert_eq!(stub.refresh_calls(), 1);
    assert!(!api.session().is_authenticated().await);
}

#[tokio::test]
async fn without_a_session_401_is_unauthorized() {
    let stub = Stub::with("fresh", Some("fresh"));
    let api = client(&serve(stub.clone()).await, None);

    let err = api.list_page(&ListingQuery::page(1)).await.unwrap_err();

    assert_matches!(err, ApiError::Unauthorized);
    assert_eq!(stub.refresh_calls(), 0);
}

#[tokio::test]
async fn toggle_returns_the_backend_value() {
    let stub = Stub::with("t", None);
    let api = client(&serve(stub).await, Some(("t", "r")));

    assert!(api.toggle("1", Flag::Favorite).await.unwrap());
    assert!(!api.toggle("1", Flag::Favorite).await.unwrap());
}

#[tokio::test]
async fn toggle_response_without_the_field_is_an_error() {
    let stub = Stub::with("t", None);
    let api = client(&serve(stub).await, Some(("t", "r")));

    let err = api.toggle("1", Flag::Contacted).await.unwrap_err();
    assert_matches!(err, ApiError::MissingField("is_contacted"));

    let err = api.toggle("1", Flag::Discarded).await.unwrap_err();
    assert_matches!(err, ApiError::NotFound(path) if path == "/api/houses/1/toggle_discarded/");
}

#[tokio::test]
async fn single_listing_and_not_found() {
    let stub = Stub::with("t", None);
    let api = client(&serve(stub).await, Some(("t", "r")));

    let listing = api.get_listing("1").await.unwrap();
    assert_eq!(listing.zone, "Chiado");
    assert_eq!(listing.bedrooms, 2);

    let err = api.get_listing("404").await.unwrap_err();
    assert_matches!(err, ApiError::NotFound(_));
}

#[tokio::test]
async fn ids_with_reserved_characters_stay_in_the_path() {
    let stub = Stub::with("t", None);
    let api = client(&serve(stub).await, Some(("t", "r")));

    let listing = api.get_listing("lx/42?ref=1").await.unwrap();
    assert_eq!(listing.id, "42");
}

#[tokio::test]
async fn sorted_endpoint_passes_direction() {
    let stub = Stub::with("t", None);
    let api = client(&serve(stub).await, Some(("t", "r")));

    let houses = api.list_sorted(&SortSpec::descending(SortField::Price)).await.unwrap();
    let prices: Vec<f64> = houses.iter().map(|l| l.price).collect();
    assert_eq!(prices, vec![1500.0, 800.0]);

    let houses = api.list_sorted(&SortSpec::ascending(SortField::Price)).await.unwrap();
    assert_eq!(houses[0].price, 800.0);
}

#[tokio::test]
async fn scraper_status_decodes() {
    let stub = Stub::with("t", None);
    let api = client(&serve(stub).await, Some(("t", "r")));

    let status = api.scraper_status().await.unwrap();
    assert!(status.is_running());
    assert_eq!(status.scrapers["idealista"].houses_found, Some(12));
    assert_eq!(status.scrapers["imovirtual"].error_message.as_deref(), Some("timeout"));
}

#[tokio::test]
async fn run_scrapers_surfaces_field_errors() {
    let stub = Stub::with("t", None);
    let api = client(&serve(stub).await, Some(("t", "r")));

    let started = api.run_scrapers(&RunRequest::all()).await.unwrap();
    assert_eq!(started.status, "started");

    let started = api.run_scrapers(&RunRequest::default()).await.unwrap();
    assert_eq!(started.output.as_deref(), Some("Scraping started"));

    let err = api
        .run_scrapers(&RunRequest::only(vec!["nope".into()]))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ApiError::Validation { status: 400, ref fields, .. }
            if fields["scrapers"] == vec!["Unknown scraper: nope".to_string()]
    );
}
