//! Exchange rate API client
//!
//! Fetches the latest rate table for a base currency from an
//! open.er-api.com compatible endpoint (`{base_url}/{CODE}`).

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

use super::BaseCurrencyEntry;

/// Base URL for the exchange rate API
pub const DEFAULT_API_BASE_URL: &str = "https://open.er-api.com/v6/latest";

/// Per-request timeout used when none is configured
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when fetching a rate table
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure: connect, timeout, or a dropped connection
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The provider answered with a non-success HTTP status
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// The provider answered but reported a failure or sent an unusable payload
    #[error("API error: {0}")]
    Api(String),
}

impl FetchError {
    /// True when the provider was reached and refused or garbled the request
    pub fn is_api_error(&self) -> bool {
        matches!(self, FetchError::HttpStatus(_) | FetchError::Api(_))
    }
}

/// Source of rate tables, one base currency at a time
pub trait RateFetcher {
    fn fetch(&self, base: &str) -> impl Future<Output = Result<BaseCurrencyEntry, FetchError>>;
}

/// Client for fetching rate tables over HTTP
#[derive(Debug, Clone)]
pub struct ExchangeRateClient {
    client: Client,
    base_url: String,
}

impl ExchangeRateClient {
    /// Creates a client for `base_url` with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, base: &str) -> String {
        format!("{}/{}", self.base_url, base)
    }

    /// Fetch the rate table for `base`
    ///
    /// # Returns
    /// * `Ok(BaseCurrencyEntry)` - validated rates plus provider metadata
    /// * `Err(FetchError::Network)` - the request could not be completed
    /// * `Err(FetchError::HttpStatus)` - non-2xx response
    /// * `Err(FetchError::Api)` - `result` was not `"success"` or rates were unusable
    pub async fn fetch_rates(&self, base: &str) -> Result<BaseCurrencyEntry, FetchError> {
        let response = self.client.get(self.url_for(base)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let body: Value = response.json().await.map_err(|e| {
            if e.is_decode() {
                FetchError::Api(format!("malformed payload: {}", e))
            } else {
                FetchError::Network(e)
            }
        })?;
        parse_response(base, body)
    }
}

impl RateFetcher for ExchangeRateClient {
    fn fetch(&self, base: &str) -> impl Future<Output = Result<BaseCurrencyEntry, FetchError>> {
        self.fetch_rates(base)
    }
}

/// Turns a decoded provider payload into a validated entry
fn parse_response(base: &str, body: Value) -> Result<BaseCurrencyEntry, FetchError> {
    let result = body.get("result").and_then(Value::as_str);
    if result != Some("success") {
        let reason = body
            .get("error-type")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(FetchError::Api(reason.to_string()));
    }

    let entry: BaseCurrencyEntry = serde_json::from_value(body)
        .map_err(|e| FetchError::Api(format!("malformed payload: {}", e)))?;

    entry
        .validate(base)
        .map_err(|e| FetchError::Api(e.to_string()))?;

    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_success_response() {
        let body = json!({
            "result": "success",
            "base_code": "USD",
            "time_last_update_utc": "Fri, 27 Mar 2020 00:00:00 +0000",
            "rates": { "USD": 1, "EUR": 0.92, "RUB": 95.1 }
        });

        let entry = parse_response("USD", body).expect("Should parse response");
        assert_eq!(entry.base_code.as_deref(), Some("USD"));
        assert_eq!(entry.rates.len(), 3);
        assert!((entry.rates["RUB"] - 95.1).abs() < 1e-9);
    }

    #[test]
    fn test_parse_error_result_reports_error_type() {
        let body = json!({ "result": "error", "error-type": "unsupported-code" });

        let err = parse_response("XXX", body).unwrap_err();
        assert!(err.is_api_error());
        assert!(err.to_string().contains("unsupported-code"));
    }

    #[test]
    fn test_parse_missing_result_is_api_error() {
        let body = json!({ "rates": { "EUR": 0.9 } });

        let err = parse_response("USD", body).unwrap_err();
        assert!(matches!(err, FetchError::Api(ref reason) if reason == "unknown error"));
    }

    #[test]
    fn test_parse_success_without_rates_is_api_error() {
        let body = json!({ "result": "success", "base_code": "USD" });

        let err = parse_response("USD", body).unwrap_err();
        assert!(err.to_string().contains("malformed payload"));
    }

    #[test]
    fn test_parse_rejects_non_positive_rate() {
        let body = json!({ "result": "success", "rates": { "EUR": 0.9, "XYZ": 0 } });

        let err = parse_response("USD", body).unwrap_err();
        assert!(err.to_string().contains("XYZ"));
    }

    #[test]
    fn test_url_trims_trailing_slash() {
        let client = ExchangeRateClient::new("http://localhost:9/v6/latest/", DEFAULT_REQUEST_TIMEOUT)
            .expect("Client should build");
        assert_eq!(client.url_for("EUR"), "http://localhost:9/v6/latest/EUR");
    }

    #[test]
    fn test_http_status_is_api_error_not_network() {
        assert!(FetchError::HttpStatus(500).is_api_error());
        assert_eq!(FetchError::HttpStatus(404).to_string(), "HTTP status 404");
    }
}
