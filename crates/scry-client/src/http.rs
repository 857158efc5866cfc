use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use scry_types::{
    analysis::MatchAnalysis, config::ApiConfig, live::LiveGame, summoner::Summoner, FetchError,
    Result, ScryError,
};

use crate::AnalysisApi;

/// Production client speaking JSON to the scoring backend.
pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| {
                ScryError::Configuration(format!("failed to build http client: {err}"))
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, FetchError> {
        let response = request
            .send()
            .await
            .map_err(|err| FetchError::transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(decode_failure(status, response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|err| FetchError::transport(format!("undecodable response body: {err}")))
    }
}

#[async_trait]
impl AnalysisApi for HttpApi {
    async fn summoner_by_riot_id(&self, name: &str, tag: &str) -> Result<Summoner, FetchError> {
        let url = format!(
            "{}/summoner/by-riot-id/{}/{}",
            self.base_url,
            encode(name),
            encode(tag)
        );
        self.execute(self.client.get(url)).await
    }

    async fn live_game(&self, puuid: &str) -> Result<LiveGame, FetchError> {
        let url = format!("{}/match/live/{}", self.base_url, encode(puuid));
        self.execute(self.client.get(url)).await
    }

    async fn analyze_match(&self, puuid: &str) -> Result<MatchAnalysis, FetchError> {
        let url = format!("{}/analysis/match?puuid={}", self.base_url, encode(puuid));
        self.execute(self.client.post(url)).await
    }
}

fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

async fn decode_failure(status: StatusCode, response: Response) -> FetchError {
    let body = response.text().await.unwrap_or_default();
    FetchError::status(status.as_u16(), failure_message(status, &body))
}

/// Failure bodies carry a human-readable `detail` field; fall back to the
/// raw body, then the status line.
fn failure_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(detail) = value.get("detail").and_then(|d| d.as_str()) {
            return detail.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn riot_names_are_path_encoded() {
        assert_eq!(encode("Hide on bush"), "Hide%20on%20bush");
        assert_eq!(encode("KR1"), "KR1");
    }

    #[test]
    fn failure_message_prefers_detail_field() {
        let body = r#"{"detail": "Summoner 'x' is not currently in a game"}"#;
        assert_eq!(
            failure_message(StatusCode::NOT_FOUND, body),
            "Summoner 'x' is not currently in a game"
        );
    }

    #[test]
    fn failure_message_falls_back_to_body_then_status() {
        assert_eq!(
            failure_message(StatusCode::BAD_GATEWAY, "upstream exploded"),
            "upstream exploded"
        );
        assert_eq!(
            failure_message(StatusCode::BAD_GATEWAY, "  "),
            "Bad Gateway"
        );
    }
}
