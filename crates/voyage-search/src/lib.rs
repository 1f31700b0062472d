//! SerpApi search client for the google_flights and google_hotels engines.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};
use voyage_core::{FlightRequest, HotelRequest};

pub const CRATE_NAME: &str = "voyage-search";

pub const DEFAULT_BASE_URL: &str = "https://serpapi.com";

/// Ordered query parameters for one provider search.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchParams {
    pairs: Vec<(String, String)>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.pairs.push((key.to_string(), value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn engine(&self) -> &str {
        self.get("engine").unwrap_or("unknown")
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

pub fn flight_search_params(request: &FlightRequest, api_key: &str) -> SearchParams {
    SearchParams::new()
        .with("api_key", api_key)
        .with("engine", "google_flights")
        .with("type", request.trip_type.as_str())
        .with("hl", "en")
        .with("gl", "in")
        .with("departure_id", request.origin.trim().to_uppercase())
        .with("arrival_id", request.destination.trim().to_uppercase())
        .with("outbound_date", request.outbound_date.as_str())
        .with("return_date", request.return_date.as_str())
        .with("currency", "USD")
}

pub fn hotel_search_params(request: &HotelRequest, api_key: &str) -> SearchParams {
    SearchParams::new()
        .with("api_key", api_key)
        .with("engine", "google_hotels")
        .with("q", request.location.as_str())
        .with("hl", "en")
        .with("gl", "in")
        .with("check_in_date", request.check_in_date.as_str())
        .with("check_out_date", request.check_out_date.as_str())
        .with("currency", "USD")
        .with("sort_by", "3")
        .with("rating", "8")
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("request failed: {0}")]
    Request(reqwest::Error),
    #[error("http status {status} from {engine}: {message}")]
    HttpStatus {
        status: u16,
        engine: String,
        message: String,
    },
    #[error("invalid response body from {engine}: {source}")]
    Decode {
        engine: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The request URL carries `api_key`, so it is stripped before the error surfaces.
impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Request(err.without_url())
    }
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, params: &SearchParams) -> Result<JsonValue, SearchError>;
}

#[derive(Debug, Clone)]
pub struct SearchClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for SearchClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SerpApiClient {
    client: reqwest::Client,
    endpoint: String,
}

impl SerpApiClient {
    pub fn new(config: SearchClientConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().context("building reqwest client")?;
        Ok(Self {
            client,
            endpoint: search_endpoint(&config.base_url),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn search_endpoint(base_url: &str) -> String {
    format!("{}/search.json", base_url.trim_end_matches('/'))
}

/// SerpApi reports failures as `{"error": "..."}`; fall back to the raw body.
fn provider_error_message(body: &str) -> String {
    serde_json::from_str::<JsonValue>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(JsonValue::as_str).map(ToString::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl SearchProvider for SerpApiClient {
    async fn search(&self, params: &SearchParams) -> Result<JsonValue, SearchError> {
        let engine = params.engine().to_string();
        let span = info_span!("serpapi_search", engine = %engine);

        async {
            let resp = self
                .client
                .get(&self.endpoint)
                .query(params.pairs())
                .send()
                .await?;
            let status = resp.status();
            let body = resp.text().await?;

            if !status.is_success() {
                return Err(SearchError::HttpStatus {
                    status: status.as_u16(),
                    engine: engine.clone(),
                    message: provider_error_message(&body),
                });
            }

            let value: JsonValue = serde_json::from_str(&body).map_err(|source| SearchError::Decode {
                engine: engine.clone(),
                source,
            })?;
            if let Some(message) = value.get("error").and_then(JsonValue::as_str) {
                warn!(provider_error = message, "provider returned no results");
            }
            info!(bytes = body.len(), "search completed");
            Ok(value)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flight_request() -> FlightRequest {
        FlightRequest {
            origin: " blr ".into(),
            destination: "hyd".into(),
            outbound_date: "2025-03-10".into(),
            return_date: "2025-03-17".into(),
            trip_type: "1".into(),
        }
    }

    #[test]
    fn flight_params_normalize_airport_codes() {
        let params = flight_search_params(&flight_request(), "secret");
        assert_eq!(params.engine(), "google_flights");
        assert_eq!(params.get("departure_id"), Some("BLR"));
        assert_eq!(params.get("arrival_id"), Some("HYD"));
        assert_eq!(params.get("type"), Some("1"));
        assert_eq!(params.get("currency"), Some("USD"));
        assert_eq!(params.get("api_key"), Some("secret"));
    }

    #[test]
    fn hotel_params_carry_location_and_filters() {
        let request = HotelRequest {
            location: "Bangalore".into(),
            check_in_date: "2025-03-10".into(),
            check_out_date: "2025-03-17".into(),
        };
        let params = hotel_search_params(&request, "");
        assert_eq!(params.engine(), "google_hotels");
        assert_eq!(params.get("q"), Some("Bangalore"));
        assert_eq!(params.get("sort_by"), Some("3"));
        assert_eq!(params.get("rating"), Some("8"));
        assert_eq!(params.get("api_key"), Some(""));
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let client = SerpApiClient::new(SearchClientConfig {
            base_url: "http://127.0.0.1:9999/".into(),
            ..SearchClientConfig::default()
        })
        .unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:9999/search.json");
    }

    #[test]
    fn provider_error_message_prefers_error_field() {
        assert_eq!(provider_error_message(r#"{"error": "Invalid API key."}"#), "Invalid API key.");
        assert_eq!(provider_error_message(" bad gateway \n"), "bad gateway");
    }

    #[tokio::test]
    async fn unreachable_provider_is_a_request_error() {
        let client = SerpApiClient::new(SearchClientConfig {
            base_url: "http://127.0.0.1:1".into(),
            timeout: Duration::from_secs(2),
            user_agent: Some("voyage-test".into()),
        })
        .unwrap();
        let err = client
            .search(&flight_search_params(&flight_request(), "k"))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Request(_)));
    }

    #[tokio::test]
    async fn request_errors_do_not_expose_the_api_key() {
        let client = SerpApiClient::new(SearchClientConfig {
            base_url: "http://127.0.0.1:1".into(),
            timeout: Duration::from_secs(2),
            user_agent: None,
        })
        .unwrap();
        let err = client
            .search(&flight_search_params(&flight_request(), "TOPSECRETKEY"))
            .await
            .unwrap_err();
        match &err {
            SearchError::Request(inner) => assert!(inner.url().is_none()),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!err.to_string().contains("TOPSECRETKEY"));
        assert!(!format!("{err:?}").contains("TOPSECRETKEY"));
    }
}
