use async_trait::async_trait;
use cwl_bonus::{
    clients::{FetchRequest, FileRosterSource, RosterSource, ScoringService},
    models::{AcquisitionError, Field, RawPlayer, Roster, ScoreResult, ScoringError},
    scoring::{FillPolicy, RuleKey, RuleTable, NO_ONE},
    session::{MemorySessionStore, SessionStore, SqliteSessionStore, AUTOSAVE_INTERVAL},
    FlowController, FlowState, Phase,
};
use std::sync::{Arc, Mutex};

struct StaticSource(Vec<RawPlayer>);

#[async_trait]
impl RosterSource for StaticSource {
    async fn fetch_roster(&self, _request: &FetchRequest) -> Result<Vec<RawPlayer>, AcquisitionError> {
        Ok(self.0.clone())
    }
}

/// Scores each star with the `attack_made` points and remembers what it was sent.
#[derive(Default)]
struct StarCounter {
    seen: Mutex<Vec<serde_json::Value>>,
}

#[async_trait]
impl ScoringService for StarCounter {
    async fn score(&self, roster: &Roster, rules: &RuleTable) -> Result<Vec<ScoreResult>, ScoringError> {
        self.seen.lock().unwrap().push(serde_json::json!({
            "data": roster,
            "point_system": rules,
        }));
        Ok(roster
            .iter()
            .map(|p| {
                let stars: i64 = (1..=7).filter_map(|d| p.get(Field::Stars(d))).sum();
                ScoreResult::new(p.name.clone(), stars * rules.get(RuleKey::AttackMade))
            })
            .collect())
    }
}

fn league_roster() -> Vec<RawPlayer> {
    let raw = r#"[
        {"Name": "A", "Eigenes_Rathaus": 10, "Tag1_Rathaus_Gegner": 13, "Tag1_Sterne": 3, "Tag1_Prozent": 100},
        {"Name": "B", "Eigenes_Rathaus": "12", "Tag1_Rathaus_Gegner": 12, "Tag1_Sterne": 2, "Tag1_Prozent": 85.0,
         "Tag2_Rathaus_Gegner": 11, "Tag2_Sterne": 0, "Tag2_Prozent": 0}
    ]"#;
    serde_json::from_str(raw).unwrap()
}

fn request() -> FetchRequest {
    FetchRequest::new("#2PP", "key")
}

#[tokio::test]
async fn test_full_report_run() {
    let store: Arc<dyn SessionStore> = Arc::new(SqliteSessionStore::connect("sqlite::memory:").await.unwrap());
    let mut flow = FlowController::start(store.clone(), AUTOSAVE_INTERVAL).await;
    assert_eq!(flow.phase(), Phase::AcquireRoster);

    flow.fetch(&StaticSource(league_roster()), &request()).await.unwrap();
    flow.confirm_fill_policy().await.unwrap();

    let roster = flow.state().roster().unwrap();
    assert_eq!(roster.names().collect::<Vec<_>>(), vec!["A", "B"]);
    let b = roster.get("B").unwrap();
    assert_eq!(b.own_town_hall_level, Some(12));
    assert_eq!(b.get(Field::Stars(2)), Some(0));
    assert_eq!(b.get(Field::Destruction(2)), Some(0));
    assert_eq!(b.get(Field::Stars(3)), None);

    flow.edit_field("B", Field::Stars(3), Some(3)).await.unwrap();

    let scorer = StarCounter::default();
    flow.submit(&scorer).await.unwrap();

    let FlowState::Results { results, awards, .. } = flow.state() else {
        panic!("expected results, got {:?}", flow.phase());
    };
    assert_eq!(results, &vec![ScoreResult::new("A", 3), ScoreResult::new("B", 5)]);
    assert_eq!(awards.top_scorer.winner_name, "B");
    assert_eq!(awards.top_scorer.label, "5 points");
    assert_eq!(awards.underdog.winner_name, "A");
    assert_eq!(awards.underdog.points, 6);

    let sent = scorer.seen.lock().unwrap()[0].clone();
    assert_eq!(sent["data"].as_array().unwrap().len(), 2);
    assert_eq!(sent["data"][1]["Tag3_Sterne"], 3);
    assert_eq!(sent["data"][0]["Tag7_Prozent"], serde_json::Value::Null);
    assert_eq!(sent["point_system"].as_object().unwrap().len(), 18);

    flow.start_over().await.unwrap();
    assert_eq!(flow.phase(), Phase::AcquireRoster);
    assert!(store.load_roster().await.unwrap().is_none());
}

#[tokio::test]
async fn test_roster_survives_restart() {
    let path = std::env::temp_dir().join(format!("cwl_bonus_it_{}.db", std::process::id()));
    let url = format!("sqlite://{}", path.display());

    let edited = {
        let store: Arc<dyn SessionStore> = Arc::new(SqliteSessionStore::connect(&url).await.unwrap());
        let mut flow = FlowController::start(store, AUTOSAVE_INTERVAL).await;
        flow.fetch(&StaticSource(league_roster()), &request()).await.unwrap();
        flow.set_fill_policy(FillPolicy {
            manual_entry_only: false,
            skip_opponent_town_hall: true,
        })
        .unwrap();
        flow.confirm_fill_policy().await.unwrap();
        flow.edit_field("A", Field::OwnTownHall, Some(0)).await.unwrap();
        let roster = flow.state().roster().unwrap().clone();
        flow.shutdown().await;
        roster
    };

    let store: Arc<dyn SessionStore> = Arc::new(SqliteSessionStore::connect(&url).await.unwrap());
    let mut flow = FlowController::start(store, AUTOSAVE_INTERVAL).await;
    assert_eq!(flow.phase(), Phase::CompleteData);
    assert_eq!(flow.state().roster(), Some(&edited));
    assert_eq!(edited.get("A").unwrap().own_town_hall_level, Some(0));
    assert_eq!(edited.get("A").unwrap().get(Field::OpponentTownHall(1)), None);
    assert!(flow.back_to_fill_policy().await.is_err());

    // Own level 0 never qualifies for the underdog award.
    flow.submit(&StarCounter::default()).await.unwrap();
    let (_, awards) = flow.results().unwrap();
    assert_eq!(awards.underdog.winner_name, NO_ONE);

    flow.shutdown().await;
    drop(flow);
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_rule_table_persistence() {
    let store = Arc::new(MemorySessionStore::new());

    let mut flow = FlowController::start(store.clone(), AUTOSAVE_INTERVAL).await;
    flow.open_rule_editor().unwrap();
    flow.edit_rule(RuleKey::AttackMade, 10).unwrap();
    flow.apply_rules_for_session().unwrap();
    assert_eq!(flow.active_rules().get(RuleKey::AttackMade), 10);

    let restarted = FlowController::start(store.clone(), AUTOSAVE_INTERVAL).await;
    assert_eq!(restarted.active_rules(), &RuleTable::default());

    flow.open_rule_editor().unwrap();
    flow.save_rules_permanently().await.unwrap();
    let restarted = FlowController::start(store, AUTOSAVE_INTERVAL).await;
    assert_eq!(restarted.active_rules().get(RuleKey::AttackMade), 10);
}

#[tokio::test]
async fn test_roster_file_source() {
    let path = std::env::temp_dir().join(format!("cwl_bonus_it_raw_{}.json", std::process::id()));
    std::fs::write(&path, r#"[{"Name":"Solo","Tag4_Sterne":"2","Bogus":1}]"#).unwrap();

    let mut flow = FlowController::start(Arc::new(MemorySessionStore::new()), AUTOSAVE_INTERVAL).await;
    flow.fetch(&FileRosterSource::new(&path), &request()).await.unwrap();
    let _ = std::fs::remove_file(&path);

    flow.confirm_fill_policy().await.unwrap();
    let solo = flow.state().roster().unwrap().get("Solo").unwrap().clone();
    assert_eq!(solo.get(Field::Stars(4)), Some(2));
    assert_eq!(solo.own_town_hall_level, None);
}
