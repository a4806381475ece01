use clap::{Parser, Subcommand};
use cwl_bonus::{
    clients::{CocLeagueClient, FetchRequest, FileRosterSource, HttpScoringClient, RosterSource},
    export,
    models::{parse_entry, Field, Roster, LEAGUE_DAYS},
    scoring::{FillPolicy, RuleBook, RuleKey},
    session::{SessionStore, SqliteSessionStore},
    FlowController, FlowState, Phase, Settings,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod tui_main;

#[derive(Parser)]
#[clap(name = "cwl-bonus")]
#[clap(about = "Calculate Clan War League bonus points", long_about = None)]
struct Cli {
    /// Settings file to use instead of config/default.toml and config/local.toml
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive terminal UI
    Tui,

    /// Acquire league data and build the roster to complete
    Fetch {
        /// Clan tag, e.g. #2PP
        #[clap(long, default_value = "")]
        clan_tag: String,

        /// Clash of Clans API key
        #[clap(long, default_value = "")]
        api_key: String,

        /// Read raw player data from a JSON file instead of the API
        #[clap(long)]
        from_file: Option<PathBuf>,

        /// Start from an empty table
        #[clap(long)]
        manual: bool,

        /// Do not take over opponent town hall levels
        #[clap(long)]
        skip_opponent_th: bool,
    },

    /// Print the roster in progress
    Show,

    /// Set one cell of the roster
    Set {
        /// Player name
        player: String,

        /// Field: own, oppN, starsN, pctN or a wire key such as Tag3_Sterne
        field: String,

        /// New value; omit it (or pass anything that is not a whole number) to clear the cell
        value: Option<String>,
    },

    /// Submit the roster for scoring and print the results
    Score {
        /// Also write the results as CSV
        #[clap(long)]
        export: bool,

        /// CSV path, defaults to the configured export path
        #[clap(short, long)]
        output: Option<PathBuf>,
    },

    /// Show or change the point system
    Rules {
        #[clap(subcommand)]
        action: RulesAction,
    },

    /// Discard the roster in progress
    Reset,
}

#[derive(Subcommand)]
enum RulesAction {
    /// Print the active point system
    Show,

    /// Change one rule and save the table permanently
    Set { key: String, points: i64 },

    /// Restore and save the default point system
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::new().unwrap_or_else(|e| {
            eprintln!("Using default settings: {}", e);
            Settings::default()
        }),
    };

    if matches!(cli.command, Commands::Tui) {
        init_tui_logging(&settings)?;
    } else {
        init_logging(&settings);
    }

    // Validate settings
    if let Err(e) = settings.validate() {
        error!("Invalid settings: {}", e);
        return Err(anyhow::anyhow!(e));
    }

    let store: Arc<dyn SessionStore> = Arc::new(SqliteSessionStore::connect(&settings.session.database_url).await?);

    match cli.command {
        Commands::Tui => {
            let services = tui_main::Services {
                store,
                source: Arc::new(CocLeagueClient::new(settings.coc_client_config())?),
                scorer: Arc::new(HttpScoringClient::new(settings.scoring_client_config())?),
            };
            tui_main::run_tui(&settings, services).await?;
        }

        Commands::Fetch {
            clan_tag,
            api_key,
            from_file,
            manual,
            skip_opponent_th,
        } => {
            let mut flow = FlowController::start(store, settings.autosave_interval()).await;
            if flow.phase() != Phase::AcquireRoster {
                flow.shutdown().await;
                anyhow::bail!("A roster is already in progress; run `reset` first");
            }

            let (source, request): (Box<dyn RosterSource>, FetchRequest) = match from_file {
                // The file source ignores the request, which still has to pass validation.
                Some(path) => (Box::new(FileRosterSource::new(path)), FetchRequest::new("file", "file")),
                None => (
                    Box::new(CocLeagueClient::new(settings.coc_client_config())?),
                    FetchRequest::new(clan_tag, api_key),
                ),
            };

            flow.fetch(source.as_ref(), &request).await?;
            flow.set_fill_policy(FillPolicy {
                manual_entry_only: manual,
                skip_opponent_town_hall: skip_opponent_th,
            })?;
            flow.confirm_fill_policy().await?;

            if let Some(message) = flow.state().error() {
                warn!("{}", message);
            }
            if let Some(roster) = flow.state().roster() {
                println!("Roster ready with {} players.", roster.len());
                print_roster(roster);
            }
            flow.shutdown().await;
        }

        Commands::Show => match store.load_roster().await? {
            Some(roster) => print_roster(&roster),
            None => println!("No roster in progress. Run `fetch` first."),
        },

        Commands::Set { player, field, value } => {
            let field = Field::parse(&field).ok_or_else(|| anyhow::anyhow!("Unknown field: {}", field))?;
            let value = value.as_deref().and_then(parse_entry);

            let mut flow = FlowController::start(store, settings.autosave_interval()).await;
            let result = flow.edit_field(&player, field, value).await;
            flow.shutdown().await;
            result?;

            if let Some(message) = flow.state().error() {
                warn!("{}", message);
            }
            println!("{} {} = {}", player, field.label(), show(value));
        }

        Commands::Score { export, output } => {
            let scorer = HttpScoringClient::new(settings.scoring_client_config())?;
            let mut flow = FlowController::start(store, settings.autosave_interval()).await;
            let result = flow.submit(&scorer).await;
            flow.shutdown().await;
            result?;

            if let FlowState::Results { results, awards, .. } = flow.state() {
                println!("\n=== CWL Bonus Points ===");
                for r in results {
                    println!("  {:<24} {}", r.name, r.total_points);
                }
                println!("\nTop scorer: {} ({})", awards.top_scorer.winner_name, awards.top_scorer.label);
                println!("Underdog:   {} ({})", awards.underdog.winner_name, awards.underdog.label);

                if export {
                    let path = output.unwrap_or_else(|| PathBuf::from(&settings.export.default_path));
                    export::export_results(&path, results)?;
                    println!("\nExported to {}", path.display());
                }
            }
        }

        Commands::Rules { action } => {
            let mut book = RuleBook::load(store).await;
            match action {
                RulesAction::Show => {}
                RulesAction::Set { key, points } => {
                    let key = RuleKey::from_str(&key).ok_or_else(|| anyhow::anyhow!("Unknown rule: {}", key))?;
                    let mut draft = book.draft();
                    draft.set(key, points);
                    book.save_permanently(draft).await?;
                    info!("Saved {} = {}", key.as_str(), points);
                }
                RulesAction::Reset => {
                    book.save_permanently(RuleBook::reset_draft_to_default()).await?;
                    info!("Restored the default point system");
                }
            }

            let overrides = book.active().overrides();
            for (key, points) in book.active().iter() {
                let marker = if overrides.contains(&key) { "*" } else { " " };
                println!("{} {:<28} {:>4}  {}", marker, key.as_str(), points, key.description());
            }
        }

        Commands::Reset => {
            store.clear_roster().await?;
            println!("Roster discarded.");
        }
    }

    Ok(())
}

fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.app.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// The terminal UI owns the screen, so logs go to the configured file or
/// nowhere at all.
fn init_tui_logging(settings: &Settings) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

    match &settings.app.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
            let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.app.log_level));
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            let null_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::sink)
                .with_filter(tracing_subscriber::filter::LevelFilter::OFF);
            let _ = tracing_subscriber::registry().with(null_layer).try_init();
        }
    }
    Ok(())
}

fn show(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn print_roster(roster: &Roster) {
    print!("{:<20} {:>3}", "Name", "TH");
    for day in 1..=LEAGUE_DAYS {
        print!("  {:>9}", format!("Day {}", day));
    }
    println!();

    for player in roster.iter() {
        print!("{:<20} {:>3}", player.name, show(player.own_town_hall_level));
        for day in 1..=LEAGUE_DAYS {
            let cell = format!(
                "{}/{}/{}",
                show(player.get(Field::OpponentTownHall(day))),
                show(player.get(Field::Stars(day))),
                show(player.get(Field::Destruction(day)))
            );
            print!("  {:>9}", cell);
        }
        println!();
    }
}
