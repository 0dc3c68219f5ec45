use crate::config::{AlpacaSettings, Secret};
use crate::domain::model::Bar;
use crate::domain::ports::MarketData;
use crate::utils::error::{BotError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Largest page the bars endpoint serves.
const MAX_PAGE_SIZE: usize = 10_000;

#[derive(Debug, Deserialize)]
struct BarsResponse {
    #[serde(default)]
    bars: Option<Vec<Bar>>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Alpaca market data v2 client for daily stock bars.
pub struct AlpacaClient {
    client: Client,
    base_url: String,
    key_id: Secret,
    secret_key: Secret,
    feed: Option<String>,
}

impl AlpacaClient {
    pub fn new(base_url: impl Into<String>, key_id: Secret, secret_key: Secret) -> Result<Self> {
        Self::with_timeout(base_url, key_id, secret_key, Duration::from_secs(30))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        key_id: Secret,
        secret_key: Secret,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key_id,
            secret_key,
            feed: None,
        })
    }

    pub fn from_settings(settings: &AlpacaSettings) -> Result<Self> {
        let key_id = settings
            .api_key_id
            .clone()
            .ok_or_else(|| BotError::MissingConfigError {
                field: "ALPACA_API_KEY_ID".to_string(),
            })?;
        let secret_key = settings
            .api_secret_key
            .clone()
            .ok_or_else(|| BotError::MissingConfigError {
                field: "ALPACA_API_SECRET_KEY".to_string(),
            })?;

        let mut client = Self::with_timeout(
            &settings.data_base_url,
            key_id,
            secret_key,
            Duration::from_secs(settings.timeout_seconds),
        )?;
        client.feed = settings.feed.clone();
        Ok(client)
    }

    async fn fetch_page(
        &self,
        url: &str,
        limit: usize,
        page_token: Option<&str>,
    ) -> Result<BarsResponse> {
        let mut params: Vec<(&str, String)> = vec![
            ("timeframe", "1Day".to_string()),
            ("limit", limit.to_string()),
            ("adjustment", "all".to_string()),
        ];
        if let Some(feed) = &self.feed {
            params.push(("feed", feed.clone()));
        }
        if let Some(token) = page_token {
            params.push(("page_token", token.to_string()));
        }

        tracing::debug!("Requesting {} with params {:?}", url, params);

        let response = self
            .client
            .get(url)
            .header("APCA-API-KEY-ID", self.key_id.expose())
            .header("APCA-API-SECRET-KEY", self.secret_key.expose())
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Alpaca response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Error response from Alpaca: {}", body);
            return Err(BotError::ApiResponseError {
                service: "Alpaca".to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<BarsResponse>().await?)
    }
}

#[async_trait::async_trait]
impl MarketData for AlpacaClient {
    async fn daily_bars(&self, symbol: &str, limit: usize) -> Result<Vec<Bar>> {
        let url = format!("{}/v2/stocks/{}/bars", self.base_url, symbol);
        tracing::info!(
            "Requesting {} daily bars for {} from Alpaca: {}",
            limit,
            symbol,
            url
        );

        let mut bars: Vec<Bar> = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let remaining = limit.saturating_sub(bars.len()).min(MAX_PAGE_SIZE);
            let page = self
                .fetch_page(&url, remaining, page_token.as_deref())
                .await?;

            let mut page_bars = page.bars.unwrap_or_default();
            page_bars.truncate(remaining);
            let page_len = page_bars.len();
            bars.extend(page_bars);

            match page.next_page_token {
                Some(token) if page_len > 0 && bars.len() < limit && !token.is_empty() => {
                    tracing::debug!("Following next_page_token after {} bars", bars.len());
                    page_token = Some(token);
                }
                _ => break,
            }
        }

        tracing::info!("Received {} bars for {}.", bars.len(), symbol);

        if bars.is_empty() {
            tracing::warn!("No bars returned for {}. Check symbol or permissions.", symbol);
            return Ok(bars);
        }

        bars.sort_by_key(|b| b.t);

        if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
            tracing::debug!(
                "First bar: t={} o={:?} h={:?} l={:?} c={:?} v={:?}",
                first.t,
                first.o,
                first.h,
                first.l,
                first.c,
                first.v
            );
            tracing::debug!(
                "Last bar: t={} o={:?} h={:?} l={:?} c={:?} v={:?}",
                last.t,
                last.o,
                last.h,
                last.l,
                last.c,
                last.v
            );
        }
        for b in bars.iter().rev().take(5).rev() {
            tracing::debug!("  t={} c={:?}", b.t, b.c);
        }

        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(server: &MockServer) -> AlpacaClient {
        AlpacaClient::new(server.base_url(), Secret::new("key-id"), Secret::new("secret"))
            .unwrap()
    }

    #[tokio::test]
    async fn test_daily_bars_sends_credentials_and_params() {
        let server = MockServer::start();
        let bars_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v2/stocks/RSP/bars")
                .header("apca-api-key-id", "key-id")
                .header("apca-api-secret-key", "secret")
                .query_param("timeframe", "1Day")
                .query_param("limit", "3")
                .query_param("adjustment", "all");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "symbol": "RSP",
                    "next_page_token": null,
                    "bars": [
                        {"t": "2024-01-03T05:00:00Z", "o": 1.0, "h": 1.0, "l": 1.0, "c": 3.0, "v": 10},
                        {"t": "2024-01-02T05:00:00Z", "o": 1.0, "h": 1.0, "l": 1.0, "c": 2.0, "v": 10}
                    ]
                }));
        });

        let bars = client(&server).daily_bars("RSP", 3).await.unwrap();

        bars_mock.assert();
        assert_eq!(bars.len(), 2);
        // sorted oldest first
        assert_eq!(bars[0].c, Some(2.0));
        assert_eq!(bars[1].c, Some(3.0));
    }

    #[tokio::test]
    async fn test_daily_bars_null_bars_is_empty() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v2/stocks/XYZ/bars");
            then.status(200)
                .json_body(serde_json::json!({"symbol": "XYZ", "bars": null, "next_page_token": null}));
        });

        let bars = client(&server).daily_bars("XYZ", 10).await.unwrap();
        assert!(bars.is_empty());
    }

    #[tokio::test]
    async fn test_daily_bars_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v2/stocks/RSP/bars");
            then.status(403).body("{\"message\":\"forbidden.\"}");
        });

        let err = client(&server).daily_bars("RSP", 10).await.unwrap_err();
        match err {
            BotError::ApiResponseError { service, status, body } => {
                assert_eq!(service, "Alpaca");
                assert_eq!(status, 403);
                assert!(body.contains("forbidden"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_daily_bars_follows_page_token() {
        let server = MockServer::start();
        let second = server.mock(|when, then| {
            when.method(GET)
                .path("/v2/stocks/RSP/bars")
                .query_param("page_token", "page-2")
                .query_param("limit", "2");
            then.status(200).json_body(serde_json::json!({
                "bars": [
                    {"t": "2024-01-04T05:00:00Z", "c": 4.0},
                    {"t": "2024-01-05T05:00:00Z", "c": 5.0}
                ],
                "next_page_token": "page-3"
            }));
        });
        let first = server.mock(|when, then| {
            when.method(GET)
                .path("/v2/stocks/RSP/bars")
                .query_param("limit", "4");
            then.status(200).json_body(serde_json::json!({
                "bars": [
                    {"t": "2024-01-02T05:00:00Z", "c": 2.0},
                    {"t": "2024-01-03T05:00:00Z", "c": 3.0}
                ],
                "next_page_token": "page-2"
            }));
        });

        let bars = client(&server).daily_bars("RSP", 4).await.unwrap();

        first.assert();
        second.assert();
        assert_eq!(bars.len(), 4);
        assert_eq!(bars.last().unwrap().c, Some(5.0));
    }

    #[tokio::test]
    async fn test_feed_is_forwarded() {
        let server = MockServer::start();
        let bars_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v2/stocks/RSP/bars")
                .query_param("feed", "iex");
            then.status(200).json_body(serde_json::json!({"bars": []}));
        });

        let settings = AlpacaSettings {
            data_base_url: server.base_url(),
            api_key_id: Some(Secret::new("key-id")),
            api_secret_key: Some(Secret::new("secret")),
            feed: Some("iex".to_string()),
            ..AlpacaSettings::default()
        };
        let client = AlpacaClient::from_settings(&settings).unwrap();
        let bars = client.daily_bars("RSP", 5).await.unwrap();

        bars_mock.assert();
        assert!(bars.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_data_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v2/stocks/RSP/bars");
            then.status(200)
                .header("content-type", "application/json")
                .body("{\"bars\": [{\"t\": \"not a time\"}]}");
        });

        let err = client(&server).daily_bars("RSP", 5).await.unwrap_err();
        assert!(matches!(err, BotError::HttpError(_)));
        assert_eq!(err.category(), crate::utils::error::ErrorCategory::Data);
        assert!(!err.is_transient());
        assert!(err.recovery_suggestion().contains("unexpected shape"));
    }

    #[test]
    fn test_from_settings_requires_credentials() {
        let settings = AlpacaSettings::default();
        assert!(matches!(
            AlpacaClient::from_settings(&settings),
            Err(BotError::MissingConfigError { .. })
        ));
    }
}
