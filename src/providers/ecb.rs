//! European Central Bank reference-rate provider.
//!
//! The ECB publishes XML documents rather than per-date JSON: a daily
//! document with the latest reference rates and a trailing 90-day document.
//! Historical lookups read the 90-day table and take the nearest date at or
//! before the requested one (weekends and holidays have no entry of their
//! own). The base currency is always the euro.

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crate::cache::DateBucket;
use crate::error::ProviderError;
use crate::providers::{RateProvider, RateSnapshot, http_get_text};
use crate::registry::CurrencyRegistry;

const DAILY_RESOURCE: &str = "stats/eurofxref/eurofxref-daily.xml";
const NINETY_DAY_RESOURCE: &str = "stats/eurofxref/eurofxref-hist-90d.xml";

pub struct Ecb {
    base_url: String,
    timeout: Duration,
    supported: BTreeSet<String>,
}

impl Ecb {
    pub const ID: &'static str = "ecb";

    pub fn new(base_url: &str, timeout: Duration, registry: &CurrencyRegistry) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            supported: registry.supported_by(Self::ID),
        }
    }

    fn endpoint(&self, bucket: &DateBucket) -> String {
        let resource = match bucket {
            DateBucket::Latest => DAILY_RESOURCE,
            DateBucket::Historical(_) => NINETY_DAY_RESOURCE,
        };
        format!("{}/{}", self.base_url, resource)
    }
}

fn parse_error(url: &str, detail: impl ToString) -> ProviderError {
    ProviderError::Parse {
        url: url.to_string(),
        detail: detail.to_string(),
    }
}

/// Reads the day-indexed `Cube` table out of an ECB reference-rate document.
fn parse_reference_rates(
    body: &str,
    url: &str,
) -> Result<Vec<(NaiveDate, HashMap<String, Decimal>)>, ProviderError> {
    let mut reader = Reader::from_str(body);
    let mut days: Vec<(NaiveDate, HashMap<String, Decimal>)> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"Cube" =>
            {
                let mut time = None;
                let mut currency = None;
                let mut rate = None;
                for attribute in e.attributes() {
                    let attribute = attribute.map_err(|e| parse_error(url, e))?;
                    let value = attribute
                        .unescape_value()
                        .map_err(|e| parse_error(url, e))?;
                    match attribute.key.as_ref() {
                        b"time" => {
                            let date = NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                                .map_err(|e| parse_error(url, e))?;
                            time = Some(date);
                        }
                        b"currency" => currency = Some(value.to_lowercase()),
                        b"rate" => {
                            let parsed = Decimal::from_str(&value)
                                .map_err(|e| parse_error(url, e))?;
                            rate = Some(parsed);
                        }
                        _ => {}
                    }
                }
                if let Some(date) = time {
                    days.push((date, HashMap::new()));
                }
                if let (Some(code), Some(rate)) = (currency, rate) {
                    if let Some((_, rates)) = days.last_mut() {
                        rates.insert(code, rate);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(parse_error(url, e)),
            Ok(_) => {}
        }
    }

    if days.is_empty() {
        return Err(parse_error(url, "no reference-rate entries in document"));
    }
    Ok(days)
}

#[async_trait]
impl RateProvider for Ecb {
    fn id(&self) -> &'static str {
        Self::ID
    }

    #[instrument(name = "EcbFetch", skip(self), fields(at = ?at))]
    async fn fetch(&self, at: Option<DateTime<Utc>>) -> Result<RateSnapshot, ProviderError> {
        let bucket = DateBucket::for_time(at);
        let url = self.endpoint(&bucket);
        debug!("requesting reference rates from {url}");

        let body = http_get_text(&url, self.timeout).await?;
        let days = parse_reference_rates(&body, &url)?;

        let chosen = match &bucket {
            DateBucket::Latest => days.iter().max_by_key(|(date, _)| *date),
            DateBucket::Historical(target) => days
                .iter()
                .filter(|(date, _)| date <= target)
                .max_by_key(|(date, _)| *date),
        };
        let (date, rates) = chosen.ok_or_else(|| ProviderError::MissingRate {
            detail: format!("no reference rates at or before the requested date from {url}"),
        })?;

        let mut rates: HashMap<String, Decimal> = rates
            .iter()
            .filter(|(code, _)| self.supported.contains(*code))
            .map(|(code, rate)| (code.clone(), *rate))
            .collect();
        rates.insert("eur".to_string(), Decimal::ONE);

        Ok(RateSnapshot {
            base: "eur".to_string(),
            timestamp: date.and_time(NaiveTime::MIN).and_utc().timestamp(),
            rates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DAILY_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gesmes:Envelope xmlns:gesmes="http://www.gesmes.org/xml/2002-08-01" xmlns="http://www.ecb.int/vocabulary/2002-08-01/eurofxref">
  <gesmes:subject>Reference rates</gesmes:subject>
  <Cube>
    <Cube time="2011-09-09">
      <Cube currency="USD" rate="1.3625"/>
      <Cube currency="JPY" rate="105.71"/>
      <Cube currency="ZZZ" rate="9.9999"/>
    </Cube>
  </Cube>
</gesmes:Envelope>"#;

    const NINETY_DAY_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gesmes:Envelope xmlns:gesmes="http://www.gesmes.org/xml/2002-08-01" xmlns="http://www.ecb.int/vocabulary/2002-08-01/eurofxref">
  <Cube>
    <Cube time="2011-09-09">
      <Cube currency="USD" rate="1.3625"/>
    </Cube>
    <Cube time="2011-09-07">
      <Cube currency="USD" rate="1.4103"/>
    </Cube>
    <Cube time="2011-09-06">
      <Cube currency="USD" rate="1.3993"/>
    </Cube>
  </Cube>
</gesmes:Envelope>"#;

    fn provider(base_url: &str) -> Ecb {
        let registry = CurrencyRegistry::load().unwrap();
        Ecb::new(base_url, Duration::from_secs(5), &registry)
    }

    #[tokio::test]
    async fn fetches_the_daily_document_for_latest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stats/eurofxref/eurofxref-daily.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DAILY_BODY))
            .mount(&server)
            .await;

        let snapshot = provider(&server.uri()).fetch(None).await.unwrap();
        assert_eq!(snapshot.base, "eur");
        assert_eq!(snapshot.rates["usd"], dec!(1.3625));
        assert_eq!(snapshot.rates["jpy"], dec!(105.71));
        assert_eq!(snapshot.rates["eur"], Decimal::ONE);
        // Codes outside the reference data are dropped.
        assert!(!snapshot.rates.contains_key("zzz"));
    }

    #[tokio::test]
    async fn historical_lookup_takes_the_nearest_prior_day() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stats/eurofxref/eurofxref-hist-90d.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(NINETY_DAY_BODY))
            .mount(&server)
            .await;

        // 2011-09-08 has no entry; the document's 09-07 row is the answer.
        let at = Utc.with_ymd_and_hms(2011, 9, 8, 12, 0, 0).unwrap();
        let snapshot = provider(&server.uri()).fetch(Some(at)).await.unwrap();
        assert_eq!(snapshot.rates["usd"], dec!(1.4103));

        let expected = NaiveDate::from_ymd_opt(2011, 9, 7)
            .unwrap()
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp();
        assert_eq!(snapshot.timestamp, expected);
    }

    #[tokio::test]
    async fn dates_before_the_window_are_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stats/eurofxref/eurofxref-hist-90d.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(NINETY_DAY_BODY))
            .mount(&server)
            .await;

        let at = Utc.with_ymd_and_hms(2011, 6, 1, 0, 0, 0).unwrap();
        let err = provider(&server.uri()).fetch(Some(at)).await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingRate { .. }));
    }

    #[tokio::test]
    async fn unparseable_xml_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stats/eurofxref/eurofxref-daily.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>downtime</html>"))
            .mount(&server)
            .await;

        let err = provider(&server.uri()).fetch(None).await.unwrap_err();
        assert!(matches!(err, ProviderError::Parse { .. }));
    }
}
