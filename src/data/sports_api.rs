//! Sports API client for schedules, standings and injuries
//!
//! Every GET goes through the injected `ResponseCache` first. Fresh entries
//! are returned without touching the network; misses are fetched, decoded and
//! stored. Finished matches additionally land in a never-expiring archive.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use super::{decode_events, GameEvent};
use crate::cache::{CacheError, QueryParams, ResponseCache};

/// League name sent to the schedule API
pub const LEAGUE: &str = "NFL";

/// Default request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur when talking to the sports API
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The API answered with something other than 200
    #[error("Request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Query parameters could not be fingerprinted
    #[error(transparent)]
    InvalidParams(#[from] CacheError),

    /// Host or key missing from the configuration
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

/// NFL conference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum Conference {
    #[serde(rename = "AFC")]
    Afc,
    #[serde(rename = "NFC")]
    Nfc,
}

impl Conference {
    /// Name the standings endpoint expects
    pub fn league_name(self) -> &'static str {
        match self {
            Conference::Afc => "American Football Conference",
            Conference::Nfc => "National Football Conference",
        }
    }

    /// Short label, "AFC" or "NFC"
    pub fn label(self) -> &'static str {
        match self {
            Conference::Afc => "AFC",
            Conference::Nfc => "NFC",
        }
    }
}

/// Query of the standings endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StandingsQuery<'a> {
    league_name: &'a str,
    league_type: &'a str,
    year: &'a str,
}

/// One upstream API: where it lives and how to authenticate
#[derive(Debug, Clone)]
pub struct ApiEndpoint {
    base_url: String,
    host: Option<String>,
    key: Option<String>,
}

impl ApiEndpoint {
    /// An API reachable at `base_url` without credentials
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            host: None,
            key: None,
        }
    }

    /// A RapidAPI-style endpoint: `https://<host>` with host and key headers
    pub fn rapidapi(host: &str, key: &str) -> Self {
        Self::new(format!("https://{}", host)).with_credentials(host, key)
    }

    /// Adds the `x-rapidapi-host` and `x-rapidapi-key` headers to every request
    pub fn with_credentials(mut self, host: impl Into<String>, key: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self.key = Some(key.into());
        self
    }

    /// Full URL of a path on this API
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, mut request: RequestBuilder) -> RequestBuilder {
        if let Some(key) = &self.key {
            request = request.header("x-rapidapi-key", key.as_str());
        }
        if let Some(host) = &self.host {
            request = request.header("x-rapidapi-host", host.as_str());
        }
        request
    }
}

/// Client for the schedule/standings API and the injuries API
#[derive(Debug, Clone)]
pub struct SportsClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Cache consulted before every request
    cache: ResponseCache,
    /// Never-expiring store for finished matches
    archive: Option<ResponseCache>,
    /// Matches and standings
    schedule_api: Option<ApiEndpoint>,
    /// Team injuries
    injuries_api: Option<ApiEndpoint>,
    /// Season sent with schedule and standings requests
    season: String,
}

impl SportsClient {
    /// Creates a client with the default request timeout
    pub fn new(cache: ResponseCache, season: impl Into<String>) -> Self {
        Self::with_timeout(cache, season, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a client whose requests give up after `timeout`
    pub fn with_timeout(cache: ResponseCache, season: impl Into<String>, timeout: Duration) -> Self {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                error!("Failed to build HTTP client with timeout, using defaults: {}", e);
                Client::new()
            });

        Self {
            http_client,
            cache,
            archive: None,
            schedule_api: None,
            injuries_api: None,
            season: season.into(),
        }
    }

    /// Sets the API serving matches and standings
    pub fn with_schedule_api(mut self, api: ApiEndpoint) -> Self {
        self.schedule_api = Some(api);
        self
    }

    /// Sets the API serving injuries
    pub fn with_injuries_api(mut self, api: ApiEndpoint) -> Self {
        self.injuries_api = Some(api);
        self
    }

    /// Sets the archive for finished matches
    pub fn with_archive(mut self, archive: ResponseCache) -> Self {
        self.archive = Some(archive);
        self
    }

    /// The response cache this client reads and writes
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Drops every cached response; the archive is left alone
    pub fn clear_cache(&self) -> bool {
        self.cache.clear(None, None)
    }

    /// Drops the cached season schedule so the next `matches` call refetches it
    pub fn clear_matches_cache(&self) -> Result<bool, ApiError> {
        let url = self.schedule_api()?.url("/matches");
        Ok(self.cache.clear(Some(&url), Some(&self.matches_params())))
    }

    fn matches_params(&self) -> QueryParams {
        QueryParams::new()
            .with("league", LEAGUE)
            .with("season", self.season.as_str())
    }

    fn schedule_api(&self) -> Result<&ApiEndpoint, ApiError> {
        self.schedule_api
            .as_ref()
            .ok_or(ApiError::NotConfigured("NFL_NCAA_HIGHLIGHT_API_HOST"))
    }

    fn injuries_api(&self) -> Result<&ApiEndpoint, ApiError> {
        self.injuries_api
            .as_ref()
            .ok_or(ApiError::NotConfigured("NFL_API_HOST"))
    }

    /// All matches of the configured season
    pub async fn matches(&self) -> Result<Vec<GameEvent>, ApiError> {
        let params = self.matches_params();
        let payload = self
            .cached_get(self.schedule_api()?, "/matches", Some(&params))
            .await?;
        Ok(decode_events(&payload))
    }

    /// Full record of a single match
    ///
    /// Finished matches are served from the archive once seen with a final
    /// report, without consulting the response cache or the network.
    pub async fn match_by_id(&self, match_id: u64) -> Result<Value, ApiError> {
        let api = self.schedule_api()?;
        let path = format!("/matches/{}", match_id);
        let url = api.url(&path);

        if let Some(archive) = &self.archive {
            if let Some(archived) = archive.get::<Value>(&url, None) {
                debug!("Match {} loaded from archive", match_id);
                return Ok(archived);
            }
        }

        let payload = self.cached_get(api, &path, None).await?;

        if let Some(archive) = &self.archive {
            if is_final_report(&payload) && archive.set(&url, None, &payload) {
                debug!("Match {} archived", match_id);
            }
        }

        Ok(payload)
    }

    /// Conference standings for the configured season
    pub async fn standings(&self, conference: Conference) -> Result<Value, ApiError> {
        let params = QueryParams::from_serialize(&StandingsQuery {
            league_name: conference.league_name(),
            league_type: LEAGUE,
            year: &self.season,
        })?;
        self.cached_get(self.schedule_api()?, "/standings", Some(&params))
            .await
    }

    /// Injury report of a team, by the injuries API's team id
    pub async fn team_injuries(&self, team_id: u64) -> Result<Value, ApiError> {
        let params = QueryParams::new().with("id", team_id.to_string());
        self.cached_get(self.injuries_api()?, "/nfl-team-injuries", Some(&params))
            .await
    }

    /// GET with the response cache in front
    ///
    /// The cache key is the full URL plus the query parameters. Only
    /// successful, decodable responses are stored.
    pub async fn cached_get(
        &self,
        api: &ApiEndpoint,
        path: &str,
        params: Option<&QueryParams>,
    ) -> Result<Value, ApiError> {
        let url = api.url(path);
        debug!("Making request: {}", url);

        if let Some(cached) = self.cache.get::<Value>(&url, params) {
            debug!("CACHE HIT: {}", url);
            return Ok(cached);
        }
        debug!("CACHE MISS: {}", url);

        let payload = self.fetch(api, &url, params).await?;

        if self.cache.set(&url, params, &payload) {
            debug!("CACHE SAVED: {}", url);
        }
        Ok(payload)
    }

    /// Issues the GET request and decodes the JSON body
    async fn fetch(
        &self,
        api: &ApiEndpoint,
        url: &str,
        params: Option<&QueryParams>,
    ) -> Result<Value, ApiError> {
        let mut request = self.http_client.get(url);
        if let Some(params) = params {
            let pairs: Vec<(&str, String)> = params.pairs().collect();
            request = request.query(&pairs);
        }
        let response = api.authorize(request).send().await?;

        let status = response.status();
        let text = response.text().await?;
        if status != StatusCode::OK {
            error!("Request failed: {} - {}", status, text);
            return Err(ApiError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

/// Whether a match payload carries the final report
///
/// The single-match endpoint answers with a one-element array.
fn is_final_report(payload: &Value) -> bool {
    let record = match payload {
        Value::Array(records) => records.first(),
        other => Some(other),
    };
    record
        .and_then(|r| r.pointer("/state/report"))
        .and_then(Value::as_str)
        == Some("Final")
}
