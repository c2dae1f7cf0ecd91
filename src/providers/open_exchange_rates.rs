//! Open Exchange Rates provider (<https://openexchangerates.org>).
//!
//! JSON endpoints: `latest.json` for the current calendar day,
//! `historical/{YYYY-MM-DD}.json` otherwise, both keyed by `app_id`.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::cache::DateBucket;
use crate::error::ProviderError;
use crate::providers::{RateProvider, RateSnapshot, http_get_text};
use crate::registry::CurrencyRegistry;

pub struct OpenExchangeRates {
    base_url: String,
    app_id: String,
    timeout: Duration,
    supported: BTreeSet<String>,
}

impl OpenExchangeRates {
    pub const ID: &'static str = "open_exchange_rates";

    pub fn new(
        base_url: &str,
        app_id: &str,
        timeout: Duration,
        registry: &CurrencyRegistry,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            app_id: app_id.to_string(),
            timeout,
            supported: registry.supported_by(Self::ID),
        }
    }

    fn endpoint(&self, at: Option<DateTime<Utc>>) -> String {
        let resource = match DateBucket::for_time(at) {
            DateBucket::Latest => "latest.json".to_string(),
            DateBucket::Historical(date) => format!("historical/{date}.json"),
        };
        format!("{}/{}?app_id={}", self.base_url, resource, self.app_id)
    }
}

#[derive(Debug, Deserialize)]
struct OxrResponse {
    base: String,
    timestamp: i64,
    rates: HashMap<String, Decimal>,
}

#[async_trait]
impl RateProvider for OpenExchangeRates {
    fn id(&self) -> &'static str {
        Self::ID
    }

    #[instrument(name = "OxrFetch", skip(self), fields(at = ?at))]
    async fn fetch(&self, at: Option<DateTime<Utc>>) -> Result<RateSnapshot, ProviderError> {
        let url = self.endpoint(at);
        debug!("requesting rates from {url}");

        let body = http_get_text(&url, self.timeout).await?;
        let parsed: OxrResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Parse {
                url: url.clone(),
                detail: e.to_string(),
            })?;

        let rates = parsed
            .rates
            .into_iter()
            .filter_map(|(code, rate)| {
                let code = code.to_lowercase();
                self.supported.contains(&code).then_some((code, rate))
            })
            .collect();

        Ok(RateSnapshot {
            base: parsed.base.to_lowercase(),
            timestamp: parsed.timestamp,
            rates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LATEST_BODY: &str = r#"{
        "base": "USD",
        "timestamp": 1327748496,
        "rates": {
            "EUR": 0.7564,
            "CHF": 0.9125,
            "SEK": 6.7442,
            "XAU": 0.00057303,
            "USD": 1
        }
    }"#;

    fn provider(base_url: &str) -> OpenExchangeRates {
        let registry = CurrencyRegistry::load().unwrap();
        OpenExchangeRates::new(base_url, "TESTKEY", Duration::from_secs(5), &registry)
    }

    #[tokio::test]
    async fn fetches_latest_rates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest.json"))
            .and(query_param("app_id", "TESTKEY"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LATEST_BODY))
            .mount(&server)
            .await;

        let snapshot = provider(&server.uri()).fetch(None).await.unwrap();
        assert_eq!(snapshot.base, "usd");
        assert_eq!(snapshot.timestamp, 1327748496);
        assert_eq!(snapshot.rates["eur"], dec!(0.7564));
        assert_eq!(snapshot.rates["chf"], dec!(0.9125));
        // Unsupported codes are dropped from the table.
        assert!(!snapshot.rates.contains_key("xau"));
    }

    #[tokio::test]
    async fn a_time_on_the_current_day_uses_the_latest_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LATEST_BODY))
            .mount(&server)
            .await;

        let snapshot = provider(&server.uri()).fetch(Some(Utc::now())).await.unwrap();
        assert_eq!(snapshot.base, "usd");
    }

    #[tokio::test]
    async fn fetches_historical_rates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/historical/2011-09-09.json"))
            .and(query_param("app_id", "TESTKEY"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LATEST_BODY))
            .mount(&server)
            .await;

        let at = Utc.with_ymd_and_hms(2011, 9, 9, 12, 0, 0).unwrap();
        let snapshot = provider(&server.uri()).fetch(Some(at)).await.unwrap();
        assert_eq!(snapshot.rates["sek"], dec!(6.7442));
    }

    #[tokio::test]
    async fn blank_body_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .mount(&server)
            .await;

        let err = provider(&server.uri()).fetch(None).await.unwrap_err();
        assert!(matches!(err, ProviderError::BlankResponse { .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn http_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = provider(&server.uri()).fetch(None).await.unwrap_err();
        assert!(matches!(err, ProviderError::HttpStatus { status: 500, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn malformed_body_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"rates": []}"#))
            .mount(&server)
            .await;

        let err = provider(&server.uri()).fetch(None).await.unwrap_err();
        assert!(matches!(err, ProviderError::Parse { .. }));
        assert!(!err.is_transient());
    }
}
