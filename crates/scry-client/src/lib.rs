//! Typed transport over the remote analysis backend.

use async_trait::async_trait;
use scry_types::{analysis::MatchAnalysis, live::LiveGame, summoner::Summoner, FetchError};

mod http;

pub use http::HttpApi;

/// One method per backend endpoint.
///
/// Implementations perform exactly one network call per invocation: no
/// retries, no caching. Expected HTTP error statuses come back as
/// `FetchError::Status`; anything below the HTTP layer as
/// `FetchError::Transport`.
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    async fn summoner_by_riot_id(&self, name: &str, tag: &str) -> Result<Summoner, FetchError>;

    async fn live_game(&self, puuid: &str) -> Result<LiveGame, FetchError>;

    async fn analyze_match(&self, puuid: &str) -> Result<MatchAnalysis, FetchError>;
}
