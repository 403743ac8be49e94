//! ATP match feature CLI
//!
//! Builds leakage-free as-of features for a chronological table of matches.

use clap::{Parser, Subcommand};
use tennis::{Config, Result};

#[derive(Parser)]
#[command(name = "tennis")]
#[command(about = "As-of feature engineering for ATP match results", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full pass and write the feature table
    Build {
        /// Input CSV (overrides config)
        #[arg(long)]
        input: Option<String>,
        /// Output CSV (overrides config)
        #[arg(long)]
        output: Option<String>,
        /// Also store the table in the SQLite database
        #[arg(long)]
        sqlite: bool,
    },
    /// Show a player's accumulated state after the whole input
    Player {
        /// Player name, or id when the engine keys players by id
        name: String,
        /// Also show the head-to-head record against this opponent
        #[arg(long)]
        vs: Option<String>,
        /// Input CSV (overrides config)
        #[arg(long)]
        input: Option<String>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Show SQLite sink status
    Status,
    /// Initialize a new project with default config
    Init,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use table or json.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Build {
            input,
            output,
            sqlite,
        } => commands::build(&config, input, output, sqlite),
        Commands::Player {
            name,
            vs,
            input,
            format,
        } => commands::player(&config, &name, vs, input, format),
        Commands::Status => commands::status(&config),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use tennis::data::{load_matches, save_feature_table, Database};
    use tennis::features::player_stats::percentage;
    use tennis::pipeline::{build_feature_table, run_pass};
    use tennis::{PlayerId, Surface, TennisError};

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        println!("\nNext steps:");
        println!("  1. Edit {} to point at your match CSV", config_path);
        println!("  2. Run 'tennis build' to write the feature table");
        println!("  3. Run 'tennis player \"Name\"' to inspect a player");

        Ok(())
    }

    pub fn build(
        config: &Config,
        input: Option<String>,
        output: Option<String>,
        sqlite: bool,
    ) -> Result<()> {
        let input = input.unwrap_or_else(|| config.data.input_path.clone());
        let output = output.unwrap_or_else(|| config.data.output_path.clone());

        let matches = load_matches(&input)?;
        let (table, pass) = build_feature_table(&matches, config)?;
        save_feature_table(&table, &output)?;

        if sqlite {
            let mut db = Database::open(&config.data.database_path)?;
            db.write_feature_table(&table, &input)?;
        }

        println!("Feature Build");
        println!("───────────────────────────────");
        println!("  Input:    {}", input);
        println!("  Output:   {}", output);
        println!("  Matches:  {}", pass.stats.processed);
        println!("  Players:  {}", pass.store.player_count());
        println!("  Columns:  {}", table.headers.len());
        if pass.stats.malformed_scores > 0 {
            println!("  Unreadable scores: {}", pass.stats.malformed_scores);
        }
        if sqlite {
            println!("  SQLite:   {}", config.data.database_path);
        }

        Ok(())
    }

    pub fn player(
        config: &Config,
        name: &str,
        vs: Option<String>,
        input: Option<String>,
        format: OutputFormat,
    ) -> Result<()> {
        let input = input.unwrap_or_else(|| config.data.input_path.clone());
        let matches = load_matches(&input)?;
        let pass = run_pass(&matches.records, config)?;

        let player = PlayerId::new(name.trim());
        let summary = pass
            .store
            .player_summary(&player)
            .ok_or_else(|| TennisError::UnknownPlayer(name.to_string()))?;
        let opponent = vs.map(|o| PlayerId::new(o.trim()));
        let h2h = opponent
            .as_ref()
            .map(|o| (o, pass.store.head_to_head(&player, o)));

        let season = summary.season.record;
        let form: String = summary
            .form
            .outcomes()
            .iter()
            .map(|&won| if won == 1 { 'W' } else { 'L' })
            .collect();

        if let OutputFormat::Json = format {
            let surfaces: serde_json::Map<String, serde_json::Value> = Surface::ALL
                .iter()
                .map(|s| {
                    let r = summary.surfaces[s.index()];
                    (
                        s.column().to_string(),
                        serde_json::json!({ "wins": r.wins, "losses": r.losses, "win_pct": r.win_pct() }),
                    )
                })
                .collect();
            let mut json = serde_json::json!({
                "player": summary.player.as_str(),
                "career_matches": summary.career_matches,
                "last_match": summary.last_match.to_string(),
                "year": summary.year,
                "wins_ytd": season.wins,
                "losses_ytd": season.losses,
                "win_pct_ytd": season.win_pct(),
                "bp_saved_career": summary.career.bp_saved,
                "bp_faced_career": summary.career.bp_faced,
                "tb_won_career": summary.career.tb_won,
                "tb_played_career": summary.career.tb_played,
                "form": form,
                "surfaces": surfaces,
                "first_serve_pct_career": summary.serve.first_serve_pct(),
                "aces_per_service_game": summary.serve.aces_per_service_game(),
                "df_per_service_game": summary.serve.double_faults_per_service_game(),
            });
            if let Some((opponent, (won, lost))) = &h2h {
                json["h2h"] = serde_json::json!({
                    "opponent": opponent.as_str(),
                    "wins": won,
                    "losses": lost,
                });
            }
            let text = serde_json::to_string_pretty(&json)
                .map_err(|e| TennisError::Parse(e.to_string()))?;
            println!("{}", text);
            return Ok(());
        }

        println!("{}", summary.player);
        println!("───────────────────────────────");
        println!("  Matches:     {}", summary.career_matches);
        println!("  Last match:  {}", summary.last_match);
        println!(
            "  {} record: {}-{} ({:.2}%)",
            summary.year,
            season.wins,
            season.losses,
            season.win_pct()
        );
        println!(
            "  Break points saved: {}/{} ({:.2}%)",
            summary.career.bp_saved,
            summary.career.bp_faced,
            summary.career.bp_pct()
        );
        println!(
            "  Tiebreaks won:      {}/{} ({:.2}%)",
            summary.career.tb_won,
            summary.career.tb_played,
            summary.career.tb_pct()
        );
        println!("  Form (oldest first): {}", if form.is_empty() { "-" } else { form.as_str() });

        println!("\n  Surface      W     L      %");
        for surface in Surface::ALL {
            let record = summary.surfaces[surface.index()];
            if record.played() > 0 {
                println!(
                    "  {:<8} {:>5} {:>5} {:>6.2}",
                    surface.name(),
                    record.wins,
                    record.losses,
                    record.win_pct()
                );
            }
        }

        let serve = summary.serve;
        println!("\n  First serve in:     {:.2}%", serve.first_serve_pct());
        println!("  Aces / service game: {:.2}", serve.aces_per_service_game());
        println!("  DFs / service game:  {:.2}", serve.double_faults_per_service_game());

        if let Some((opponent, (won, lost))) = h2h {
            println!(
                "\n  vs {}: {}-{} ({:.2}%)",
                opponent,
                won,
                lost,
                percentage(won as u64, (won + lost) as u64)
            );
        }

        Ok(())
    }

    pub fn status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:     {}", config.data.database_path);
        println!("  Runs:     {}", stats.run_count);
        println!("  Rows:     {}", stats.feature_rows);
        if let Some(run) = stats.last_run {
            println!("  Last run: {} from {}", run.created_at, run.input_path);
            println!("            {} rows x {} columns", run.row_count, run.column_count);
        }

        Ok(())
    }
}
