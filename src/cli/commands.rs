// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! CLI command implementations.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};

use crate::cli::{render, Backend, Command, ConfigCommand};
use crate::config::{update_env_file, Config, ENV_EXAMPLE};
use crate::db::{ConnectOptions, DateRange, Store};
use crate::error::AppError;
use crate::models::{ElapsedTime, Pushup, Run};
use crate::services::smashrun::SmashrunTokens;
use crate::services::SmashrunClient;
use crate::time_utils::{now_local, parse_date_input};
use crate::AppState;

type Result<T> = std::result::Result<T, AppError>;

/// Days covered by the stats block of `status`.
const STATUS_STATS_DAYS: u32 = 30;

/// Run one CLI command.
pub async fn run(command: Command, config: Config) -> Result<()> {
    match command {
        Command::LogRun {
            duration,
            distance,
            date,
        } => log_run(&config, &duration, distance, date.as_deref()).await,
        Command::LogPushups { count, date } => {
            log_pushups(&config, count, date.as_deref()).await
        }
        Command::Status { days } => status(&config, days).await,
        Command::GetRun { days, show_splits } => get_run(&config, days, show_splits).await,
        Command::Report { days } => report(&config, days).await,
        Command::ImportSmashrun { days } => import_smashrun(&config, days).await,
        Command::SmashrunAuth => smashrun_auth(&config).await,
        Command::DropDb { force } => drop_db(&config, force).await,
        Command::Config { command } => config_command(&config, command),
        Command::Serve => serve(config).await,
    }
}

fn entry_date(date: Option<&str>) -> Result<chrono::NaiveDateTime> {
    match date.map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => parse_date_input(raw),
        None => Ok(now_local()),
    }
}

async fn log_run(
    config: &Config,
    duration: &str,
    distance: f64,
    date: Option<&str>,
) -> Result<()> {
    let duration: ElapsedTime = duration.parse()?;
    let run = Run::new(entry_date(date)?, duration, distance)?;

    let backend = Backend::connect(config, false).await?;
    let result = backend.create_run(run).await;
    backend.close().await;
    let run = result?;

    tracing::debug!(activity_id = ?run.activity_id, "Run stored");
    println!("{}", render::run_logged(&run));
    Ok(())
}

async fn log_pushups(config: &Config, count: i64, date: Option<&str>) -> Result<()> {
    let pushup = Pushup::new(entry_date(date)?, count)?;

    let backend = Backend::connect(config, false).await?;
    let result = backend.create_pushup(pushup).await;
    backend.close().await;

    println!("{}", render::pushups_logged(&result?));
    Ok(())
}

async fn status(config: &Config, days: u32) -> Result<()> {
    let range = DateRange::last_days(days, now_local());
    let backend = Backend::connect(config, true).await?;

    let result = async {
        let runs = backend.get_runs(range, None).await?;
        let pushups = backend.get_pushups(range, None).await?;
        let stats = backend.get_stats(STATUS_STATS_DAYS).await?;
        Ok::<_, AppError>((runs, pushups, stats))
    }
    .await;
    backend.close().await;
    let (runs, pushups, stats) = result?;

    println!("{}", render::recent_activities(&runs, &pushups, days));
    println!("{}", render::stats(&stats));
    Ok(())
}

async fn get_run(config: &Config, days: u32, show_splits: bool) -> Result<()> {
    let range = DateRange::last_days(days, now_local());
    let backend = Backend::connect(config, true).await?;
    let result = backend.get_runs(range, None).await;
    backend.close().await;
    let runs = result?;

    if runs.is_empty() {
        println!("No runs found in the last {} day(s)", days);
        return Ok(());
    }

    if let (Some(start), Some(end)) = (range.start, range.end) {
        print!("{}", render::runs(&runs, start, end, show_splits));
    }
    Ok(())
}

async fn report(config: &Config, days: u32) -> Result<()> {
    let backend = Backend::connect(config, true).await?;
    let result = backend.get_report(days).await;
    backend.close().await;
    let report = result?;

    if report.total_runs == 0 {
        println!("No runs found for the specified period");
        return Ok(());
    }
    print!("{}", render::report(&report));
    Ok(())
}

fn persist_tokens(config: &Config, tokens: &SmashrunTokens) -> Result<()> {
    tokens.persist(&config.env_file).with_context(|| {
        format!(
            "failed to save Smashrun tokens to {}",
            config.env_file.display()
        )
    })?;
    tracing::info!(path = %config.env_file.display(), "Saved Smashrun tokens");
    Ok(())
}

async fn import_smashrun(config: &Config, days: u32) -> Result<()> {
    let mut client = SmashrunClient::new(config)?;
    let end = Utc::now();
    let start = end
        .checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let fetched = client.get_runs(start, end).await;
    if client.tokens_refreshed() {
        persist_tokens(config, client.tokens())?;
    }
    let outcome = fetched?;
    let skipped = outcome.skipped();

    let backend = Backend::connect(config, false).await?;
    let result = backend.import_runs(outcome.runs).await;
    backend.close().await;
    let imported = result?;

    tracing::info!(imported, skipped, "Smashrun import finished");
    if imported > 0 {
        println!("Imported {} runs from Smashrun", imported);
    } else {
        println!("No runs to import from Smashrun");
    }
    if skipped > 0 {
        eprintln!("Skipped {} runs due to parsing errors", skipped);
    }
    Ok(())
}

/// Pull the authorization code out of either a bare code or the full
/// redirect URL.
pub fn extract_auth_code(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let Some((_, query)) = input.split_once('?') else {
        return Some(input.to_string());
    };
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "code")
        .and_then(|(_, value)| urlencoding::decode(value).ok())
        .map(|code| code.into_owned())
        .filter(|code| !code.is_empty())
}

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush().context("failed to write prompt")?;

    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .context("failed to read from stdin")?;
    Ok(input)
}

async fn smashrun_auth(config: &Config) -> Result<()> {
    let mut client = SmashrunClient::new(config)?;
    let url = client.authorize_url()?;

    println!("Smashrun OAuth Token Setup");
    println!("{}", "=".repeat(50));
    println!();
    println!("Step 1: open this URL in a browser and authorize fitlog:");
    println!();
    println!("  {}", url);
    println!();
    println!("You will be redirected to a URL like:");
    println!("  https://localhost:8080/callback?code=YOUR_CODE");
    println!();

    let input = prompt("Step 2: paste the code (or the whole URL): ")?;
    let code = extract_auth_code(&input)
        .ok_or_else(|| AppError::BadRequest("No authorization code provided".to_string()))?;

    let tokens = client.exchange_code(&code).await?;
    persist_tokens(config, tokens)?;

    println!("Saved Smashrun tokens to {}", config.env_file.display());
    if let Some(expires_at) = tokens.expires_at {
        println!(
            "Access token expires {}",
            expires_at.format("%Y-%m-%d %H:%M UTC")
        );
    }
    Ok(())
}

async fn drop_db(config: &Config, force: bool) -> Result<()> {
    if config.use_cloud {
        return Err(AppError::BadRequest(
            "drop-db only works on the local database; run `fitlog config local` first"
                .to_string(),
        ));
    }

    if !force {
        let answer = prompt("This will delete all data. Are you sure? [y/N] ")?;
        if !matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
            println!("Operation cancelled");
            return Ok(());
        }
    }

    let store = Store::open(config, ConnectOptions::default()).await?;
    let result = store.reset().await;
    store.close().await;
    result?;

    tracing::warn!(location = %store.location(), "Database tables dropped and recreated");
    println!("Database tables dropped and recreated successfully");
    Ok(())
}

fn set_mode(config: &Config, cloud: bool) -> Result<()> {
    let value = if cloud { "true" } else { "false" };
    update_env_file(&config.env_file, "FITLOG_USE_CLOUD", value)
        .with_context(|| format!("failed to update {}", config.env_file.display()))?;
    Ok(())
}

fn config_command(config: &Config, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            print!("{}", render::config(&config.describe()));
        }
        ConfigCommand::Init => {
            let path = config.env_file.with_extension("example");
            std::fs::write(&path, ENV_EXAMPLE)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Created example configuration file: {}", path.display());
            println!(
                "Edit this file with your settings and rename it to {}",
                config.env_file.display()
            );
        }
        ConfigCommand::Cloud => {
            set_mode(config, true)?;
            println!("Switched to cloud mode ({})", config.api_url);
            if config.require_cloud_config().is_err() {
                println!("Make sure FITLOG_API_KEY is set in your environment");
            }
        }
        ConfigCommand::Local => {
            set_mode(config, false)?;
            println!("Switched to local mode ({})", config.db_path.display());
        }
    }
    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    let store = Store::open(&config, ConnectOptions::default()).await?;
    tracing::info!(
        storage = %store.location(),
        remote = store.is_remote(),
        "Store opened"
    );
    if config.api_key.is_none() {
        tracing::warn!("FITLOG_API_KEY is not set; protected endpoints will return 500");
    }

    let addr = format!("0.0.0.0:{}", config.port);
    let state = Arc::new(AppState { config, store });
    let app = crate::routes::create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(address = %addr, "Server listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await
        .context("server error");

    tracing::info!("Shutting down");
    state.store.close().await;
    served?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_auth_code() {
        assert_eq!(extract_auth_code("  abc123\n"), Some("abc123".to_string()));
        assert_eq!(
            extract_auth_code("https://localhost:8080/callback?code=abc%2F123&state=x"),
            Some("abc/123".to_string())
        );
        assert_eq!(
            extract_auth_code("https://localhost:8080/callback?state=x"),
            None
        );
        assert_eq!(extract_auth_code("   "), None);
    }

    #[test]
    fn test_entry_date() {
        let date = entry_date(Some("06/01/25")).unwrap();
        assert_eq!(date.to_string(), "2025-06-01 00:00:00");
        assert!(matches!(
            entry_date(Some("June 1")),
            Err(AppError::BadRequest(_))
        ));
        assert!(entry_date(None).is_ok());
    }

    #[tokio::test]
    async fn test_set_mode_updates_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join(".env");
        std::fs::write(&env_file, "FITLOG_API_KEY=abc\nFITLOG_USE_CLOUD=false\n").unwrap();
        let config = Config {
            env_file: env_file.clone(),
            ..Default::default()
        };

        config_command(&config, ConfigCommand::Cloud).unwrap();
        let contents = std::fs::read_to_string(&env_file).unwrap();
        assert_eq!(contents, "FITLOG_API_KEY=abc\nFITLOG_USE_CLOUD=true\n");

        config_command(&config, ConfigCommand::Init).unwrap();
        let example = std::fs::read_to_string(dir.path().join(".env.example")).unwrap();
        assert_eq!(example, ENV_EXAMPLE);
    }

    #[tokio::test]
    async fn test_log_commands_write_local_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            db_path: dir.path().join("fitlog.db"),
            ..Default::default()
        };

        log_run(&config, "00:28:21", 3.0, Some("2025-06-01")).await.unwrap();
        log_pushups(&config, 25, Some("2025-06-01")).await.unwrap();

        let store = Store::open(&config, ConnectOptions::default()).await.unwrap();
        let runs = store.get_runs(DateRange::all(), None).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].pace_per_mile().to_string(), "00:09:27");
        let pushups = store.get_pushups(DateRange::all(), None).await.unwrap();
        assert_eq!(pushups[0].count(), 25);
        store.close().await;
    }
}
