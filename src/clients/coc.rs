use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use super::client::{build_http_client, FetchRequest, HttpClientConfig, RosterSource};
use super::retry::{retry_with_backoff, RetryConfig};
use crate::models::{coerce_float, AcquisitionError, RawPlayer};

pub const DEFAULT_COC_BASE_URL: &str = "https://api.clashofclans.com/v1";

/// Placeholder tag the API uses for wars that are not scheduled yet.
const UNSCHEDULED_WAR_TAG: &str = "#0";
const IN_WAR_STATE: &str = "inWar";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueGroup {
    pub state: String,
    #[serde(default)]
    pub rounds: Vec<LeagueRound>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueRound {
    #[serde(default)]
    pub war_tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueWar {
    pub clan: WarClan,
    pub opponent: WarClan,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WarClan {
    pub tag: String,
    #[serde(default)]
    pub members: Vec<WarMember>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarMember {
    pub tag: String,
    pub name: String,
    pub townhall_level: Option<i64>,
    #[serde(default)]
    pub attacks: Vec<WarAttack>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarAttack {
    pub defender_tag: String,
    pub stars: i64,
    pub destruction_percentage: f64,
}

impl LeagueWar {
    /// Our side and the opposing side, if `clan_tag` plays in this war.
    pub fn sides(&self, clan_tag: &str) -> Option<(&WarClan, &WarClan)> {
        if same_tag(&self.clan.tag, clan_tag) {
            Some((&self.clan, &self.opponent))
        } else if same_tag(&self.opponent.tag, clan_tag) {
            Some((&self.opponent, &self.clan))
        } else {
            None
        }
    }
}

impl WarClan {
    pub fn member(&self, tag: &str) -> Option<&WarMember> {
        self.members.iter().find(|m| same_tag(&m.tag, tag))
    }
}

impl WarMember {
    /// Most stars, then highest destruction; the earlier attack wins a tie.
    pub fn best_attack(&self) -> Option<&WarAttack> {
        self.attacks.iter().fold(None, |best: Option<&WarAttack>, attack| match best {
            Some(b)
                if (b.stars, b.destruction_percentage) >= (attack.stars, attack.destruction_percentage) =>
            {
                Some(b)
            }
            _ => Some(attack),
        })
    }
}

fn same_tag(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Uppercases the tag and makes sure it starts with `#`.
pub fn normalize_clan_tag(tag: &str) -> String {
    let tag = tag.trim().to_uppercase();
    if tag.starts_with('#') {
        tag
    } else {
        format!("#{}", tag)
    }
}

/// Tags go into URL paths with `#` percent-encoded.
pub fn encode_tag(tag: &str) -> String {
    tag.replace('#', "%23")
}

/// Builds raw player data from the wars our clan fought, keyed by league day.
///
/// A player's own level comes from the first war they appear in. Each day
/// records the player's best attack and the defender's level. Players that
/// never attacked are dropped.
pub fn collect_roster(clan_tag: &str, wars: &[(usize, LeagueWar)]) -> Vec<RawPlayer> {
    let mut players: Vec<RawPlayer> = Vec::new();

    for (day, war) in wars {
        let Some((ours, theirs)) = war.sides(clan_tag) else {
            continue;
        };

        for member in &ours.members {
            let index = match players.iter().position(|p| p.name == member.name) {
                Some(i) => i,
                None => {
                    let mut player = RawPlayer::new(member.name.clone());
                    player.own_town_hall_level = member.townhall_level;
                    players.push(player);
                    players.len() - 1
                }
            };

            let Some(best) = member.best_attack() else {
                continue;
            };
            let slot = players[index].day_mut(*day);
            slot.stars = Some(best.stars);
            slot.destruction_percent = coerce_float(best.destruction_percentage);
            slot.opponent_town_hall_level = theirs
                .member(&best.defender_tag)
                .and_then(|m| m.townhall_level);
        }
    }

    players.retain(RawPlayer::has_attack);
    players
}

/// Pulls the current league of a clan straight from the game API.
pub struct CocLeagueClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

impl CocLeagueClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, AcquisitionError> {
        Ok(Self {
            http: build_http_client(config.timeout)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: RetryConfig::with_retries(config.max_retries),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, api_key: &str) -> Result<T, AcquisitionError> {
        retry_with_backoff(&self.retry, path, AcquisitionError::is_retryable, || {
            self.get_once(path, api_key)
        })
        .await
    }

    async fn get_once<T: DeserializeOwned>(&self, path: &str, api_key: &str) -> Result<T, AcquisitionError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, bearer(api_key))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        Err(match status.as_u16() {
            403 => AcquisitionError::Unauthorized,
            404 => AcquisitionError::NotFound(path.to_string()),
            code => AcquisitionError::Api {
                status: code,
                message: api_error_message(&body),
            },
        })
    }

    async fn fetch_war(&self, war_tag: &str, api_key: &str) -> Result<LeagueWar, AcquisitionError> {
        self.get_json(&format!("/clanwarleagues/wars/{}", encode_tag(war_tag)), api_key)
            .await
    }
}

#[async_trait]
impl RosterSource for CocLeagueClient {
    async fn fetch_roster(&self, request: &FetchRequest) -> Result<Vec<RawPlayer>, AcquisitionError> {
        request.validate()?;
        let clan_tag = normalize_clan_tag(&request.clan_tag);
        let api_key = request.api_key.trim();

        let group: LeagueGroup = self
            .get_json(&format!("/clans/{}/warleague/group", encode_tag(&clan_tag)), api_key)
            .await?;
        if group.state != IN_WAR_STATE {
            return Err(AcquisitionError::NotInLeague);
        }

        let mut wars = Vec::new();
        for (index, round) in group.rounds.iter().enumerate() {
            let tags: Vec<&String> = round
                .war_tags
                .iter()
                .filter(|t| t.as_str() != UNSCHEDULED_WAR_TAG)
                .collect();
            if tags.is_empty() {
                continue;
            }

            let round_wars = try_join_all(tags.into_iter().map(|t| self.fetch_war(t, api_key))).await?;
            if let Some(war) = round_wars.into_iter().find(|w| w.sides(&clan_tag).is_some()) {
                wars.push((index + 1, war));
            }
        }

        let players = collect_roster(&clan_tag, &wars);
        info!(
            "Fetched {} league days for {}, {} players attacked",
            wars.len(),
            clan_tag,
            players.len()
        );
        Ok(players)
    }
}

fn bearer(api_key: &str) -> String {
    if api_key.starts_with("Bearer ") {
        api_key.to_string()
    } else {
        format!("Bearer {}", api_key)
    }
}

/// The API reports failures as `{"reason": ..., "message": ...}`.
fn api_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ApiError {
        reason: Option<String>,
        message: Option<String>,
    }

    match serde_json::from_str::<ApiError>(body) {
        Ok(ApiError { message: Some(m), .. }) => m,
        Ok(ApiError { reason: Some(r), .. }) => r,
        _ => body.trim().to_string(),
    }
}
