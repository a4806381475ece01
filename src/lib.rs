pub mod models;
pub mod config;
pub mod clients;
pub mod scoring;
pub mod session;
pub mod flow;
pub mod export;
pub mod tui;

pub use models::{Awards, CwlError, Field, PlayerRecord, RawPlayer, Result, Roster, ScoreResult};
pub use config::Settings;
pub use flow::{FlowController, FlowState, Phase};
pub use scoring::{RuleKey, RuleTable};
