use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use time::OffsetDateTime;
use tracing::{error, info};

use subdrill::cli::{is_quit, Cli};
use subdrill::config::Settings;
use subdrill::engine::{reporter, EngineError, OverlapEngine};
use subdrill::logging::init_logging;
use subdrill::repository::Database;
use subdrill::source::RedditClient;
use subdrill::util::{append_results, format_report, report_title};

type Engine = OverlapEngine<RedditClient, Database>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    cli.apply(&mut settings);

    init_logging(cli.verbose, settings.error_log.as_deref(), settings.raw_log.as_deref())?;

    let db_path = settings.resolve_db_path()?;
    info!(path = %db_path.display(), "using cache");
    let db_path_str = db_path.to_str().context("Invalid path encoding")?;
    let db = Database::new(db_path_str).await?;
    if db.init_schema().await? {
        info!("cache initialized");
    }
    let stats = db.stats().await?;
    info!(participants = stats.participants, drilldowns = stats.drilldowns, "cache opened");

    let banlist = settings.load_banlist()?;
    info!(entries = banlist.len(), "banlist loaded");

    let client = RedditClient::new(&settings.user_agent, settings.request_timeout())?;
    let engine = OverlapEngine::new(client, db, settings.engine_config())
        .with_banlist(banlist)
        .with_retry(settings.retry_policy())
        .with_progress(reporter(!cli.quiet));

    if !cli.targets.is_empty() {
        run_targets(&engine, &settings, &cli.targets).await?;
        return Ok(());
    }

    println!("Type \"quit\", \".quit\", or \"q\" to exit.");
    let stdin = io::stdin();
    loop {
        print!("Enter the subreddits you wish to target.~/> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let targets: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if run_targets(&engine, &settings, &targets).await? {
            break;
        }
    }

    Ok(())
}

/// Process targets in order. Returns true when a quit word was seen.
async fn run_targets(engine: &Engine, settings: &Settings, targets: &[String]) -> Result<bool> {
    for target in targets {
        if is_quit(target) {
            info!("quitting");
            return Ok(true);
        }

        match analyze(engine, settings, target).await {
            Ok(text) => {
                println!("{text}");
                match append_results(&settings.results_dir, target, &text) {
                    Ok(path) => info!(path = %path.display(), "report saved"),
                    Err(err) => error!(community = %target, error = %format!("{err:#}"), "could not save report"),
                }
            }
            Err(err) if err.is_fatal() => return Err(err.into()),
            Err(err) => error!(community = %target, error = %err, "skipping target"),
        }
    }
    Ok(false)
}

async fn analyze(engine: &Engine, settings: &Settings, target: &str) -> Result<String, EngineError> {
    engine.verify_community(target).await?;
    let record = engine.drilldown(target).await?;

    let similarity = if settings.similarity {
        engine.similarity_table(target, settings.similarity_limit).await?
    } else {
        Vec::new()
    };

    let title = report_title(
        target,
        OffsetDateTime::now_utc().unix_timestamp(),
        !engine.banlist().is_empty(),
    );
    Ok(format_report(&title, &record, &similarity, engine.banlist()))
}
