use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::api::error::ApiError;
use crate::api::session::Session;
use crate::api::traits::ListingsApi;
use crate::api::types::{
    AccessToken, Credentials, ListingQuery, Paginated, RefreshRequest, RunRequest, RunResponse,
    ScraperStatus, SortedHouses, ToggleResponse, TokenPair,
};
use crate::engine::SortSpec;
use crate::models::{Flag, Listing};

const LOGIN_PATH: &str = "/api/users/login/";
const REFRESH_PATH: &str = "/api/users/login/refresh/";
const HOUSES_PATH: &str = "/api/houses/";
const STATUS_PATH: &str = "/api/scraper-status/";
const RUN_PATH: &str = "/api/run-scrapers/";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// reqwest-backed client for the listings backend.
///
/// Every authorized call carries the session's bearer token. A 401 triggers
/// one refresh and one retry; if that fails the session is cleared and the
/// caller gets [`ApiError::SessionExpired`].
pub struct HttpApi {
    client: Client,
    base_url: String,
    session: Arc<Session>,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lisbon-scout/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(client, base_url))
    }

    /// Reuse an existing [`reqwest::Client`] (shared connection pool).
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: Arc::new(Session::new()),
        }
    }

    /// Share a session between several clients.
    pub fn with_session(mut self, session: Arc<Session>) -> Self {
        self.session = session;
        self
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let raw = self.url(path);
        Url::parse(&raw).map_err(|err| ApiError::InvalidUrl(format!("{raw}: {err}")))
    }

    /// `/api/houses/{id}/[{action}/]` with `id` percent-encoded as one segment.
    fn listing_endpoint(&self, id: &str, action: Option<&str>) -> Result<Url, ApiError> {
        let mut url = self.endpoint(HOUSES_PATH)?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| ApiError::InvalidUrl(self.base_url.clone()))?;
            segments.pop_if_empty().push(id);
            if let Some(action) = action {
                segments.push(action);
            }
            segments.push("");
        }
        Ok(url)
    }

    /// Exchange credentials for a token pair and keep it in the session.
    pub async fn login(&self, credentials: &Credentials) -> Result<TokenPair, ApiError> {
        debug!(email = %credentials.email, "Logging in");

        let response = self
            .client
            .post(self.url(LOGIN_PATH))
            .json(credentials)
            .send()
            .await?;

        let tokens: TokenPair = Self::parse_response(response, LOGIN_PATH).await?;
        self.session.store(tokens.clone()).await;
        info!(email = %credentials.email, "Logged in");
        Ok(tokens)
    }

    /// Drop the tokens; later calls go out unauthenticated.
    pub async fn logout(&self) {
        self.session.clear().await;
    }

    // ---- private helpers ----

    fn with_bearer(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send an authorized request, refreshing the token and retrying once
    /// on 401.
    async fn send_authorized<F>(&self, path: &str, build: F) -> Result<Response, ApiError>
    where
        F: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        let token = self.session.access_token().await;
        let response = Self::with_bearer(build(&self.client), token.as_deref())
            .send()
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::ensure_success(response, path).await;
        }

        if token.is_none() {
            return Err(ApiError::Unauthorized);
        }

        debug!(path, "Access token rejected, refreshing");
        self.refresh_access(token.as_deref()).await?;

        let token = self.session.access_token().await;
        let retry = Self::with_bearer(build(&self.client), token.as_deref())
            .send()
            .await?;

        if retry.status() == StatusCode::UNAUTHORIZED {
            warn!(path, "Still unauthorized after refresh, clearing session");
            self.session.clear().await;
            return Err(ApiError::SessionExpired);
        }

        Self::ensure_success(retry, path).await
    }

    async fn refresh_access(&self, rejected: Option<&str>) -> Result<(), ApiError> {
        let _guard = self.session.lock_refresh().await;

        // Someone else refreshed while we waited for the lock.
        let current = self.session.access_token().await;
        if current.is_some() && current.as_deref() != rejected {
            debug!("Token already refreshed by a concurrent request");
            return Ok(());
        }

        let Some(refresh) = self.session.refresh_token().await else {
            return Err(ApiError::SessionExpired);
        };

        let response = self
            .client
            .post(self.url(REFRESH_PATH))
            .json(&RefreshRequest { refresh: &refresh })
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), "Token refresh rejected, clearing session");
            self.session.clear().await;
            return Err(ApiError::SessionExpired);
        }

        let AccessToken { access } = Self::decode(response).await?;
        self.session.update_access(access).await;
        info!("Access token refreshed");
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        debug!(%url, ?query, "GET");
        let response = self
            .send_authorized(url.path(), |client| client.get(url.clone()).query(query))
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Pass 2xx responses through, turn anything else into an [`ApiError`].
    async fn ensure_success(response: Response, path: &str) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        warn!(path, status = status.as_u16(), "Backend returned an error");
        Err(ApiError::from_status(status.as_u16(), path, body))
    }

    async fn parse_response<T: DeserializeOwned>(
        response: Response,
        path: &str,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response, path).await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl ListingsApi for HttpApi {
    async fn list_page(&self, query: &ListingQuery) -> Result<Paginated<Listing>, ApiError> {
        let page: Paginated<Listing> = self
            .get_json(self.endpoint(HOUSES_PATH)?, &query.to_pairs())
            .await?;
        debug!(
            count = page.count,
            loaded = page.results.len(),
            page = query.page,
            "Fetched listing page"
        );
        Ok(page)
    }

    async fn list_sorted(&self, sort: &SortSpec) -> Result<Vec<Listing>, ApiError> {
        let path = format!("/sort/{}", sort.field.as_str());
        let query = [("order", sort.direction.as_query().to_string())];
        let body: SortedHouses = self.get_json(self.endpoint(&path)?, &query).await?;
        debug!(loaded = body.houses.len(), "Fetched sorted listings");
        Ok(body.houses)
    }

    async fn get_listing(&self, id: &str) -> Result<Listing, ApiError> {
        self.get_json(self.listing_endpoint(id, None)?, &[]).await
    }

    async fn toggle(&self, id: &str, flag: Flag) -> Result<bool, ApiError> {
        let url = self.listing_endpoint(id, Some(flag.action()))?;
        debug!(%url, %flag, "POST toggle");

        let response = self
            .send_authorized(url.path(), |client| client.post(url.clone()))
            .await?;
        let body: ToggleResponse = Self::decode(response).await?;

        body.value_for(flag)
            .ok_or(ApiError::MissingField(flag.field_name()))
    }

    async fn scraper_status(&self) -> Result<ScraperStatus, ApiError> {
        self.get_json(self.endpoint(STATUS_PATH)?, &[]).await
    }

    async fn run_scrapers(&self, request: &RunRequest) -> Result<RunResponse, ApiError> {
        let url = self.url(RUN_PATH);
        info!(?request, "Triggering scraper run");

        let response = self
            .send_authorized(RUN_PATH, |client| {
                let builder = client.post(&url);
                if request.is_empty() {
                    builder
                } else {
                    builder.json(request)
                }
            })
            .await?;
        Self::decode(response).await
    }
}
