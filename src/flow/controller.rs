use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::state::{FlowState, Phase};
use crate::clients::{FetchRequest, RosterSource, ScoringService};
use crate::export;
use crate::models::{
    AcquisitionError, Awards, CwlError, Field, RawPlayer, Result, Roster, ScoreResult, ScoringError,
};
use crate::scoring::{derive_awards, normalize, FillPolicy, RuleBook, RuleKey, RuleTable};
use crate::session::{Autosave, SessionStore};

/// Sequences a report run: acquisition, fill policy, data completion and
/// results, with rule table editing as a side branch of acquisition.
///
/// Network steps come in `begin_*` / `finish_*` pairs so an event loop can run
/// the call elsewhere. Between the two the controller is busy and rejects
/// every other transition. Persistence failures during a transition do not
/// abort it; they are surfaced as the new state's error message.
pub struct FlowController {
    state: FlowState,
    rules: RuleBook,
    store: Arc<dyn SessionStore>,
    autosave: Autosave,
    busy: bool,
    last_raw: Option<Vec<RawPlayer>>,
    last_policy: FillPolicy,
}

impl FlowController {
    /// Loads the active rule table and resumes a saved roster if there is one.
    pub async fn start(store: Arc<dyn SessionStore>, autosave_interval: Duration) -> Self {
        let rules = RuleBook::load(store.clone()).await;
        let autosave = Autosave::new(store.clone(), autosave_interval);

        let mut controller = Self {
            state: FlowState::AcquireRoster { error: None },
            rules,
            store,
            autosave,
            busy: false,
            last_raw: None,
            last_policy: FillPolicy::default(),
        };

        match controller.store.load_roster().await {
            Ok(Some(roster)) => {
                info!("Resuming saved roster with {} players", roster.len());
                controller.enter_complete_data(roster, None);
            }
            Ok(None) => info!("No saved roster, starting with acquisition"),
            Err(e) => warn!("Saved roster is unreadable, starting fresh: {}", e),
        }

        controller
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn is_autosaving(&self) -> bool {
        self.autosave.is_running()
    }

    pub fn active_rules(&self) -> &RuleTable {
        self.rules.active()
    }

    pub fn results(&self) -> Option<(&[ScoreResult], &Awards)> {
        match &self.state {
            FlowState::Results { results, awards, .. } => Some((results, awards)),
            _ => None,
        }
    }

    fn check_idle(&self) -> Result<()> {
        if self.busy {
            return Err(CwlError::Busy);
        }
        Ok(())
    }

    fn invalid(&self, action: &'static str) -> CwlError {
        CwlError::InvalidTransition {
            action,
            state: self.phase().as_str(),
        }
    }

    fn expect_phase(&self, action: &'static str, phase: Phase) -> Result<()> {
        self.check_idle()?;
        if self.phase() != phase {
            return Err(self.invalid(action));
        }
        Ok(())
    }

    /// Moves the state out, leaving acquisition in its place.
    fn take_state(&mut self) -> FlowState {
        std::mem::replace(&mut self.state, FlowState::AcquireRoster { error: None })
    }

    fn enter_complete_data(&mut self, roster: Roster, error: Option<String>) {
        self.autosave.start(roster.clone());
        self.state = FlowState::CompleteData { roster, error };
    }

    // Roster acquisition

    pub fn begin_fetch(&mut self, request: &FetchRequest) -> Result<()> {
        self.expect_phase("fetch a roster", Phase::AcquireRoster)?;
        if let Err(e) = request.validate() {
            self.state = FlowState::AcquireRoster {
                error: Some(e.to_string()),
            };
            return Err(e.into());
        }
        self.state = FlowState::AcquireRoster { error: None };
        self.busy = true;
        Ok(())
    }

    pub fn finish_fetch(&mut self, outcome: std::result::Result<Vec<RawPlayer>, AcquisitionError>) -> Result<()> {
        if !self.busy || self.phase() != Phase::AcquireRoster {
            warn!("Discarding fetch result that arrived in {}", self.phase().as_str());
            return Err(self.invalid("complete a fetch"));
        }
        self.busy = false;

        match outcome {
            Ok(raw) => {
                info!("Fetched {} players", raw.len());
                self.last_raw = Some(raw.clone());
                self.state = FlowState::ConfigureFillPolicy {
                    raw,
                    policy: self.last_policy,
                };
                Ok(())
            }
            Err(e) => {
                warn!("Roster fetch failed: {}", e);
                self.state = FlowState::AcquireRoster {
                    error: Some(e.to_string()),
                };
                Err(e.into())
            }
        }
    }

    pub async fn fetch(&mut self, source: &dyn RosterSource, request: &FetchRequest) -> Result<()> {
        self.begin_fetch(request)?;
        let outcome = source.fetch_roster(request).await;
        self.finish_fetch(outcome)
    }

    pub fn open_rule_editor(&mut self) -> Result<()> {
        self.expect_phase("edit the rule table", Phase::AcquireRoster)?;
        self.state = FlowState::EditRuleTable {
            draft: self.rules.draft(),
        };
        Ok(())
    }

    // Fill policy

    pub fn set_fill_policy(&mut self, new_policy: FillPolicy) -> Result<()> {
        self.check_idle()?;
        let FlowState::ConfigureFillPolicy { policy, .. } = &mut self.state else {
            return Err(self.invalid("change the fill policy"));
        };
        *policy = new_policy;
        self.last_policy = new_policy;
        Ok(())
    }

    pub fn back_to_acquire(&mut self) -> Result<()> {
        self.expect_phase("go back to acquisition", Phase::ConfigureFillPolicy)?;
        self.state = FlowState::AcquireRoster { error: None };
        Ok(())
    }

    /// Normalizes the fetched data with the chosen policy and persists the
    /// resulting roster.
    pub async fn confirm_fill_policy(&mut self) -> Result<()> {
        self.check_idle()?;
        let FlowState::ConfigureFillPolicy { raw, policy } = &self.state else {
            return Err(self.invalid("confirm the fill policy"));
        };
        let roster = normalize(raw, *policy);

        let error = match self.store.save_roster(&roster).await {
            Ok(()) => None,
            Err(e) => {
                warn!("Could not save roster: {}", e);
                Some(format!("Could not save roster: {}", e))
            }
        };
        self.enter_complete_data(roster, error);
        Ok(())
    }

    // Data completion

    pub async fn edit_field(&mut self, player: &str, field: Field, value: Option<i64>) -> Result<()> {
        self.check_idle()?;
        let FlowState::CompleteData { roster, error } = &mut self.state else {
            return Err(self.invalid("edit the roster"));
        };
        roster.set_field(player, field, value)?;
        self.autosave.update(roster);

        if let Err(e) = self.store.save_roster(roster).await {
            warn!("Could not save roster: {}", e);
            *error = Some(format!("Could not save roster: {}", e));
        }
        Ok(())
    }

    /// Saves the roster and marks the controller busy. Returns the inputs for
    /// the scoring call.
    pub async fn begin_submit(&mut self) -> Result<(Roster, RuleTable)> {
        self.check_idle()?;
        let FlowState::CompleteData { roster, error } = &mut self.state else {
            return Err(self.invalid("submit the roster"));
        };
        *error = None;
        if let Err(e) = self.store.save_roster(roster).await {
            warn!("Could not save roster before scoring: {}", e);
        }

        self.busy = true;
        Ok((roster.clone(), self.rules.active().clone()))
    }

    pub async fn finish_submit(
        &mut self,
        outcome: std::result::Result<Vec<ScoreResult>, ScoringError>,
    ) -> Result<()> {
        if !self.busy || self.phase() != Phase::CompleteData {
            warn!("Discarding scoring result that arrived in {}", self.phase().as_str());
            return Err(self.invalid("complete scoring"));
        }
        self.busy = false;

        let results = match outcome {
            Ok(results) => results,
            Err(e) => {
                warn!("Scoring failed: {}", e);
                if let FlowState::CompleteData { error, .. } = &mut self.state {
                    *error = Some(e.to_string());
                }
                return Err(e.into());
            }
        };

        // Derived while the roster is still in place.
        let awards = match &self.state {
            FlowState::CompleteData { roster, .. } => derive_awards(roster, &results),
            _ => return Err(self.invalid("complete scoring")),
        };
        let roster = match self.take_state() {
            FlowState::CompleteData { roster, .. } => roster,
            other => {
                self.state = other;
                return Err(self.invalid("complete scoring"));
            }
        };
        self.autosave.stop().await;

        info!(
            "Scored {} players; top scorer {}, underdog {}",
            results.len(),
            awards.top_scorer.winner_name,
            awards.underdog.winner_name
        );
        self.state = FlowState::Results {
            roster,
            results,
            awards,
        };
        Ok(())
    }

    pub async fn submit(&mut self, scorer: &dyn ScoringService) -> Result<()> {
        let (roster, rules) = self.begin_submit().await?;
        let outcome = scorer.score(&roster, &rules).await;
        self.finish_submit(outcome).await
    }

    /// Only possible while the fetched data of this run is still held; a
    /// resumed roster has none.
    pub async fn back_to_fill_policy(&mut self) -> Result<()> {
        self.expect_phase("go back to the fill policy", Phase::CompleteData)?;
        let Some(raw) = self.last_raw.clone() else {
            return Err(self.invalid("reconfigure a resumed roster"));
        };
        self.autosave.stop().await;
        self.state = FlowState::ConfigureFillPolicy {
            raw,
            policy: self.last_policy,
        };
        Ok(())
    }

    // Results

    pub fn back_to_data(&mut self) -> Result<()> {
        self.expect_phase("go back to data completion", Phase::Results)?;
        let roster = match self.take_state() {
            FlowState::Results { roster, .. } => roster,
            other => {
                self.state = other;
                return Err(self.invalid("go back to data completion"));
            }
        };
        self.enter_complete_data(roster, None);
        Ok(())
    }

    /// Discards the run and clears the saved roster.
    pub async fn start_over(&mut self) -> Result<()> {
        self.expect_phase("start over", Phase::Results)?;
        self.autosave.stop().await;

        let error = match self.store.clear_roster().await {
            Ok(()) => None,
            Err(e) => {
                warn!("Could not clear saved roster: {}", e);
                Some(format!("Could not clear saved roster: {}", e))
            }
        };
        self.last_raw = None;
        self.state = FlowState::AcquireRoster { error };
        info!("Started a new run");
        Ok(())
    }

    pub fn export_results(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        self.check_idle()?;
        match self.results() {
            Some((results, _)) => export::export_results(path, results),
            None => Err(self.invalid("export results")),
        }
    }

    // Rule table editing

    pub fn edit_rule(&mut self, key: RuleKey, points: i64) -> Result<()> {
        self.check_idle()?;
        let FlowState::EditRuleTable { draft } = &mut self.state else {
            return Err(self.invalid("edit a rule"));
        };
        draft.set(key, points);
        Ok(())
    }

    pub fn reset_draft(&mut self) -> Result<()> {
        self.check_idle()?;
        let FlowState::EditRuleTable { draft } = &mut self.state else {
            return Err(self.invalid("reset the draft"));
        };
        *draft = RuleBook::reset_draft_to_default();
        Ok(())
    }

    fn take_draft(&mut self, action: &'static str) -> Result<RuleTable> {
        self.expect_phase(action, Phase::EditRuleTable)?;
        match self.take_state() {
            FlowState::EditRuleTable { draft } => Ok(draft),
            other => {
                self.state = other;
                Err(self.invalid(action))
            }
        }
    }

    pub fn apply_rules_for_session(&mut self) -> Result<()> {
        let draft = self.take_draft("apply the draft")?;
        self.rules.apply_for_session(draft);
        Ok(())
    }

    pub async fn save_rules_permanently(&mut self) -> Result<()> {
        let draft = self.take_draft("save the draft")?;
        if let Err(e) = self.rules.save_permanently(draft).await {
            warn!("Could not save rule table: {}", e);
            self.state = FlowState::AcquireRoster {
                error: Some(format!("Rules applied, but could not be saved: {}", e)),
            };
        }
        Ok(())
    }

    pub fn cancel_rule_edit(&mut self) -> Result<()> {
        self.take_draft("cancel rule editing").map(|_| ())
    }

    /// Stops the autosave timer, saving the roster one last time when a run
    /// is in data completion.
    pub async fn shutdown(&mut self) {
        self.autosave.stop().await;
        if let FlowState::CompleteData { roster, .. } = &self.state {
            if let Err(e) = self.store.save_roster(roster).await {
                warn!("Could not save roster on exit: {}", e);
            }
        }
    }
}
