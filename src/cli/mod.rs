// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Command-line interface.
//!
//! Commands read and write through a [`Backend`]: the local store, or the
//! fitlog REST API when cloud mode is enabled.

pub mod commands;
pub mod render;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::db::{ConnectOptions, DateRange, Store, MAX_DAYS};
use crate::error::AppError;
use crate::models::{ActivityStats, Pushup, Run, RunReport};
use crate::services::FitlogApiClient;

/// `--days` accepts 1 through [`MAX_DAYS`].
fn days_parser() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(1..=i64::from(MAX_DAYS))
}

#[derive(Parser, Debug)]
#[command(name = "fitlog")]
#[command(author, version, about = "Track runs and pushups", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Show debug output
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log a run with duration and distance
    LogRun {
        /// Run duration (HH:MM:SS)
        #[arg(long)]
        duration: String,
        /// Distance in miles
        #[arg(long)]
        distance: f64,
        /// Date (MM/DD/YY or YYYY-MM-DD), defaults to now
        #[arg(long)]
        date: Option<String>,
    },
    /// Log pushups
    LogPushups {
        /// Number of pushups
        #[arg(long)]
        count: i64,
        /// Date (MM/DD/YY or YYYY-MM-DD), defaults to now
        #[arg(long)]
        date: Option<String>,
    },
    /// Show recent activities and statistics
    Status {
        /// Number of days to show
        #[arg(long, default_value = "7", value_parser = days_parser())]
        days: u32,
    },
    /// List runs
    GetRun {
        /// Number of days back to look for runs
        #[arg(long, default_value = "1", value_parser = days_parser())]
        days: u32,
        /// Show per-mile splits
        #[arg(long)]
        show_splits: bool,
    },
    /// Summary report of your runs
    Report {
        /// Number of days to report on (7=week, 30=month, 365=year)
        #[arg(long, default_value = "7", value_parser = days_parser())]
        days: u32,
    },
    /// Import runs from Smashrun
    ImportSmashrun {
        /// Number of days of history to import
        #[arg(long, default_value = "30", value_parser = days_parser())]
        days: u32,
    },
    /// Obtain Smashrun tokens through the OAuth code flow
    SmashrunAuth,
    /// Drop and recreate all database tables
    DropDb {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Run the REST API server
    Serve,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Write an example env file
    Init,
    /// Switch to cloud mode
    Cloud,
    /// Switch to local mode
    Local,
}

/// Where CLI commands send their reads and writes.
pub enum Backend {
    Local(Store),
    Api(FitlogApiClient),
}

impl Backend {
    /// Pick the backend for the configured mode.
    ///
    /// `read_only` commands accept a read-only connection when another
    /// process holds the database lock.
    pub async fn connect(config: &Config, read_only: bool) -> Result<Self, AppError> {
        if config.use_cloud {
            tracing::debug!(url = %config.api_url, "Using fitlog API");
            return Ok(Self::Api(FitlogApiClient::from_config(config)?));
        }

        let options = ConnectOptions::default().with_read_only_fallback(read_only);
        Ok(Self::Local(Store::open(config, options).await?))
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Local(store) => store.location(),
            Self::Api(client) => client.base_url().to_string(),
        }
    }

    pub async fn create_run(&self, run: Run) -> Result<Run, AppError> {
        match self {
            Self::Local(store) => store.create_run(run).await,
            Self::Api(client) => client.create_run(&run).await,
        }
    }

    pub async fn create_pushup(&self, pushup: Pushup) -> Result<Pushup, AppError> {
        match self {
            Self::Local(store) => store.create_pushup(pushup).await,
            Self::Api(client) => client.create_pushup(&pushup).await,
        }
    }

    pub async fn get_runs(
        &self,
        range: DateRange,
        limit: Option<u32>,
    ) -> Result<Vec<Run>, AppError> {
        match self {
            Self::Local(store) => store.get_runs(range, limit).await,
            Self::Api(client) => client.get_runs(&range, limit).await,
        }
    }

    pub async fn get_pushups(
        &self,
        range: DateRange,
        limit: Option<u32>,
    ) -> Result<Vec<Pushup>, AppError> {
        match self {
            Self::Local(store) => store.get_pushups(range, limit).await,
            Self::Api(client) => client.get_pushups(&range, limit).await,
        }
    }

    pub async fn get_stats(&self, days: u32) -> Result<ActivityStats, AppError> {
        match self {
            Self::Local(store) => store.get_stats(days).await,
            Self::Api(client) => client.get_stats(days).await,
        }
    }

    pub async fn get_report(&self, days: u32) -> Result<RunReport, AppError> {
        match self {
            Self::Local(store) => store.get_report(days).await,
            Self::Api(client) => client.get_report(days).await,
        }
    }

    /// Store imported runs. The local store upserts by activity id; the API
    /// only accepts new runs.
    pub async fn import_runs(&self, runs: Vec<Run>) -> Result<usize, AppError> {
        match self {
            Self::Local(store) => store.upsert_runs(runs).await,
            Self::Api(client) => {
                let mut imported = 0;
                for run in &runs {
                    client.create_run(run).await?;
                    imported += 1;
                }
                Ok(imported)
            }
        }
    }

    pub async fn close(&self) {
        if let Self::Local(store) = self {
            store.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_log_run() {
        let cli = Cli::try_parse_from([
            "fitlog",
            "log-run",
            "--duration",
            "00:30:00",
            "--distance",
            "3.1",
            "--debug",
        ])
        .unwrap();

        assert!(cli.debug);
        match cli.command {
            Command::LogRun {
                duration,
                distance,
                date,
            } => {
                assert_eq!(duration, "00:30:00");
                assert_eq!(distance, 3.1);
                assert!(date.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["fitlog", "import-smashrun"]).unwrap();
        assert!(matches!(cli.command, Command::ImportSmashrun { days: 30 }));

        let cli = Cli::try_parse_from(["fitlog", "get-run", "--show-splits"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::GetRun {
                days: 1,
                show_splits: true
            }
        ));

        let cli = Cli::try_parse_from(["fitlog", "config", "cloud"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config {
                command: ConfigCommand::Cloud
            }
        ));
    }

    #[test]
    fn test_days_out_of_range() {
        for days in ["0", "3651", "4000000000"] {
            assert!(Cli::try_parse_from(["fitlog", "status", "--days", days]).is_err());
            assert!(Cli::try_parse_from(["fitlog", "import-smashrun", "--days", days]).is_err());
        }

        let cli = Cli::try_parse_from(["fitlog", "report", "--days", "3650"]).unwrap();
        assert!(matches!(cli.command, Command::Report { days: 3650 }));
    }

    #[tokio::test]
    async fn test_local_backend() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            db_path: dir.path().join("fitlog.db"),
            ..Default::default()
        };

        let backend = Backend::connect(&config, false).await.unwrap();
        assert!(matches!(backend, Backend::Local(_)));
        assert!(backend.describe().ends_with("fitlog.db"));
        backend.close().await;
    }
}
