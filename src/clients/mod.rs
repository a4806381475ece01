pub mod client;
pub mod coc;
pub mod file;
pub mod retry;
pub mod scoring_api;

pub use client::{FetchRequest, HttpClientConfig, RosterSource, ScoringService};
pub use coc::CocLeagueClient;
pub use file::FileRosterSource;
pub use retry::{retry_with_backoff, RetryConfig};
pub use scoring_api::HttpScoringClient;
