use anyhow::Result;
use crossterm::{
    event::{KeyCode, KeyEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, sync::Arc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use cwl_bonus::{
    clients::{RosterSource, ScoringService},
    flow::{FlowController, Phase},
    scoring::FillPolicy,
    session::SessionStore,
    tui::{
        app::{FormField, InputMode},
        ui, App, Event as TuiEvent, EventHandler,
    },
    Settings,
};

/// Everything the UI needs to talk to the outside world.
pub struct Services {
    pub store: Arc<dyn SessionStore>,
    pub source: Arc<dyn RosterSource>,
    pub scorer: Arc<dyn ScoringService>,
}

pub async fn run_tui(settings: &Settings, services: Services) -> Result<()> {
    let flow = FlowController::start(services.store.clone(), settings.autosave_interval()).await;
    let app = Arc::new(Mutex::new(App::new(flow, settings.export.default_path.clone())));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let events = EventHandler::new(250);
    let res = run_app(&mut terminal, app.clone(), events, &services).await;

    // Always restore terminal state, even if there was an error
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    app.lock().await.flow.shutdown().await;

    if let Err(err) = res {
        eprintln!("Application error: {}", err);
        Err(err)
    } else {
        Ok(())
    }
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: Arc<Mutex<App>>,
    mut events: EventHandler,
    services: &Services,
) -> Result<()> {
    loop {
        {
            let app = app.lock().await;
            if app.should_quit {
                return Ok(());
            }
            terminal.draw(|f| ui::draw(f, &app))?;
        }

        let Some(event) = events.next().await else {
            return Ok(());
        };

        if let TuiEvent::Key(key) = event {
            handle_key(&app, key, services).await;
        }
    }
}

async fn handle_key(app: &Arc<Mutex<App>>, key: KeyEvent, services: &Services) {
    let mut guard = app.lock().await;

    // Keys are ignored while a request is in flight.
    if guard.flow.is_busy() {
        return;
    }

    if guard.input_mode == InputMode::Editing {
        handle_editing_key(&mut guard, key).await;
    } else {
        match guard.flow.phase() {
            Phase::AcquireRoster => match key.code {
                KeyCode::Char('q') => guard.should_quit = true,
                KeyCode::Char('t') => guard.start_form_edit(FormField::ClanTag),
                KeyCode::Char('k') => guard.start_form_edit(FormField::ApiKey),
                KeyCode::Char('r') => report(&mut guard, |app| app.flow.open_rule_editor()),
                KeyCode::Enter => {
                    let request = guard.fetch_request();
                    if guard.flow.begin_fetch(&request).is_ok() {
                        guard.set_loading("Fetching league data...");
                        drop(guard);
                        spawn_fetch(app.clone(), services.source.clone(), request);
                        return;
                    }
                }
                _ => {}
            },
            Phase::ConfigureFillPolicy => {
                let policy = match guard.flow.state() {
                    cwl_bonus::FlowState::ConfigureFillPolicy { policy, .. } => *policy,
                    _ => FillPolicy::default(),
                };
                match key.code {
                    KeyCode::Char('q') => guard.should_quit = true,
                    KeyCode::Char('m') => report(&mut guard, |app| {
                        app.flow.set_fill_policy(FillPolicy {
                            manual_entry_only: !policy.manual_entry_only,
                            ..policy
                        })
                    }),
                    KeyCode::Char('o') => report(&mut guard, |app| {
                        app.flow.set_fill_policy(FillPolicy {
                            skip_opponent_town_hall: !policy.skip_opponent_town_hall,
                            ..policy
                        })
                    }),
                    KeyCode::Char('b') => report(&mut guard, |app| app.flow.back_to_acquire()),
                    KeyCode::Enter => {
                        if let Err(e) = guard.flow.confirm_fill_policy().await {
                            guard.set_status(e.to_string());
                        }
                        guard.selected_player = 0;
                        guard.selected_field = 0;
                    }
                    _ => {}
                }
            }
            Phase::CompleteData => match key.code {
                KeyCode::Char('q') => guard.should_quit = true,
                KeyCode::Up => guard.move_player(-1),
                KeyCode::Down => guard.move_player(1),
                KeyCode::Left => guard.move_field(-1),
                KeyCode::Right => guard.move_field(1),
                KeyCode::Enter | KeyCode::Char('e') => {
                    if guard.player_count() > 0 {
                        guard.start_cell_edit();
                    }
                }
                KeyCode::Char('b') => {
                    if let Err(e) = guard.flow.back_to_fill_policy().await {
                        guard.set_status(e.to_string());
                    }
                }
                KeyCode::Char('s') => match guard.flow.begin_submit().await {
                    Ok((roster, rules)) => {
                        guard.set_loading("Calculating points...");
                        drop(guard);
                        spawn_submit(app.clone(), services.scorer.clone(), roster, rules);
                        return;
                    }
                    Err(e) => guard.set_status(e.to_string()),
                },
                _ => {}
            },
            Phase::Results => match key.code {
                KeyCode::Char('q') => guard.should_quit = true,
                KeyCode::Char('b') => report(&mut guard, |app| app.flow.back_to_data()),
                KeyCode::Char('n') => {
                    if let Err(e) = guard.flow.start_over().await {
                        guard.set_status(e.to_string());
                    }
                }
                KeyCode::Char('x') => {
                    let path = guard.export_path.clone();
                    match guard.flow.export_results(&path) {
                        Ok(()) => guard.set_status(format!("Exported to {}", path)),
                        Err(e) => guard.set_status(e.to_string()),
                    }
                }
                _ => {}
            },
            Phase::EditRuleTable => match key.code {
                KeyCode::Up => guard.move_rule(-1),
                KeyCode::Down => guard.move_rule(1),
                KeyCode::Enter | KeyCode::Char('e') => guard.start_rule_edit(),
                KeyCode::Char('d') => report(&mut guard, |app| app.flow.reset_draft()),
                KeyCode::Char('a') => report(&mut guard, |app| app.flow.apply_rules_for_session()),
                KeyCode::Char('s') => {
                    if let Err(e) = guard.flow.save_rules_permanently().await {
                        guard.set_status(e.to_string());
                    }
                }
                KeyCode::Esc => report(&mut guard, |app| app.flow.cancel_rule_edit()),
                _ => {}
            },
        }
    }

    guard.clamp_selection();
}

async fn handle_editing_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_edit(),
        KeyCode::Backspace => {
            app.current_input.pop();
        }
        KeyCode::Char(c) => app.current_input.push(c),
        KeyCode::Enter => match app.flow.phase() {
            Phase::AcquireRoster => app.commit_form_edit(),
            Phase::CompleteData => {
                let value = app.parsed_cell_input();
                let field = app.selected_field();
                let name = app.selected_record().map(|r| r.name.clone());
                if let Some(name) = name {
                    if let Err(e) = app.flow.edit_field(&name, field, value).await {
                        app.set_status(e.to_string());
                    }
                }
                app.cancel_edit();
            }
            Phase::EditRuleTable => {
                let (key, points) = (app.selected_rule(), app.parsed_rule_input());
                report(app, |app| app.flow.edit_rule(key, points));
                app.cancel_edit();
            }
            _ => app.cancel_edit(),
        },
        _ => {}
    }
}

/// Runs a synchronous transition and shows its error, if any.
fn report<F>(app: &mut App, action: F)
where
    F: FnOnce(&mut App) -> cwl_bonus::Result<()>,
{
    match action(app) {
        Ok(()) => app.status_message = None,
        Err(e) => app.set_status(e.to_string()),
    }
}

fn spawn_fetch(app: Arc<Mutex<App>>, source: Arc<dyn RosterSource>, request: cwl_bonus::clients::FetchRequest) {
    tokio::spawn(async move {
        let outcome = source.fetch_roster(&request).await;
        let mut app = app.lock().await;
        app.loading_message = None;
        match app.flow.finish_fetch(outcome) {
            Ok(()) => info!("Roster fetched"),
            // Already on screen through the flow state.
            Err(e) => debug!("Fetch finished with error: {}", e),
        }
    });
}

fn spawn_submit(
    app: Arc<Mutex<App>>,
    scorer: Arc<dyn ScoringService>,
    roster: cwl_bonus::Roster,
    rules: cwl_bonus::RuleTable,
) {
    tokio::spawn(async move {
        let outcome = scorer.score(&roster, &rules).await;
        let mut app = app.lock().await;
        app.loading_message = None;
        match app.flow.finish_submit(outcome).await {
            Ok(()) => info!("Scores received"),
            Err(e) => debug!("Scoring finished with error: {}", e),
        }
    });
}
