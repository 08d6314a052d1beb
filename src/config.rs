// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Values come from the process environment, with a `.env` file loaded
//! first when present. The resulting [`Config`] is passed explicitly to
//! every component that needs it.

use std::env;
use std::path::{Path, PathBuf};

/// Default local database location.
pub const DEFAULT_DB_PATH: &str = "data/fitlog.db";
/// Default fitlog API base URL used in cloud mode.
pub const DEFAULT_API_URL: &str = "http://localhost:8080";
/// Default S3 region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Location of a DuckDB file hosted in S3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDb {
    pub bucket: String,
    pub key: String,
}

impl RemoteDb {
    /// Parse an `s3://bucket/key` URI.
    pub fn parse(uri: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::Invalid {
            key: "FITLOG_REMOTE_DB",
            reason: format!("expected s3://bucket/key, got '{}'", uri),
        };

        let rest = uri.strip_prefix("s3://").ok_or_else(invalid)?;
        let (bucket, key) = rest.split_once('/').ok_or_else(invalid)?;
        if bucket.is_empty() || key.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    pub fn uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

/// Static AWS credentials for S3 request signing.
#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .finish_non_exhaustive()
    }
}

/// Smashrun OAuth settings.
#[derive(Debug, Clone, Default)]
pub struct SmashrunConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Local DuckDB file (the replica when a remote database is configured)
    pub db_path: PathBuf,
    /// Remote DuckDB file in S3, if any
    pub remote_db: Option<RemoteDb>,
    pub aws_region: String,
    /// Override for the S3 endpoint (path-style requests)
    pub s3_endpoint: Option<String>,
    pub aws_credentials: Option<AwsCredentials>,
    /// fitlog API base URL used by the CLI in cloud mode
    pub api_url: String,
    /// Shared secret for the REST API
    pub api_key: Option<String>,
    /// CLI talks to the REST API instead of the local store
    pub use_cloud: bool,
    pub debug: bool,
    pub request_timeout_secs: u64,
    /// Server port
    pub port: u16,
    /// Env file updated by `config` commands and token refreshes
    pub env_file: PathBuf,
    pub smashrun: SmashrunConfig,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            remote_db: None,
            aws_region: DEFAULT_REGION.to_string(),
            s3_endpoint: None,
            aws_credentials: None,
            api_url: DEFAULT_API_URL.to_string(),
            api_key: Some("test-api-key".to_string()),
            use_cloud: false,
            debug: false,
            request_timeout_secs: 30,
            port: 8080,
            env_file: PathBuf::from(".env"),
            smashrun: SmashrunConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let flag = |key: &str| {
            non_empty(key)
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(false)
        };

        let remote_db = non_empty("FITLOG_REMOTE_DB")
            .map(|uri| RemoteDb::parse(&uri))
            .transpose()?;

        let aws_credentials = match (
            non_empty("AWS_ACCESS_KEY_ID"),
            non_empty("AWS_SECRET_ACCESS_KEY"),
        ) {
            (Some(access_key_id), Some(secret_access_key)) => Some(AwsCredentials {
                access_key_id,
                secret_access_key,
                session_token: non_empty("AWS_SESSION_TOKEN"),
            }),
            _ => None,
        };

        let request_timeout_secs = match non_empty("FITLOG_REQUEST_TIMEOUT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "FITLOG_REQUEST_TIMEOUT",
                reason: format!("expected seconds, got '{}'", raw),
            })?,
            None => 30,
        };

        Ok(Self {
            db_path: non_empty("FITLOG_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            remote_db,
            aws_region: non_empty("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            s3_endpoint: non_empty("FITLOG_S3_ENDPOINT"),
            aws_credentials,
            api_url: non_empty("FITLOG_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_key: non_empty("FITLOG_API_KEY"),
            use_cloud: flag("FITLOG_USE_CLOUD"),
            debug: flag("FITLOG_DEBUG"),
            request_timeout_secs,
            port: non_empty("PORT").and_then(|p| p.parse().ok()).unwrap_or(8080),
            env_file: non_empty("FITLOG_ENV_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".env")),
            smashrun: SmashrunConfig {
                client_id: non_empty("SMASHRUN_CLIENT_ID"),
                client_secret: non_empty("SMASHRUN_CLIENT_SECRET"),
                access_token: non_empty("SMASHRUN_ACCESS_TOKEN"),
                refresh_token: non_empty("SMASHRUN_REFRESH_TOKEN"),
            },
        })
    }

    /// Fail unless the settings needed by cloud mode are present.
    pub fn require_cloud_config(&self) -> Result<&str, ConfigError> {
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::Missing("FITLOG_API_URL"));
        }
        self.api_key
            .as_deref()
            .ok_or(ConfigError::Missing("FITLOG_API_KEY"))
    }

    /// Human-readable summary for `fitlog config show`.
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        let set = |present: bool| if present { "set" } else { "missing" }.to_string();

        let mut lines = vec![(
            "Mode",
            if self.use_cloud { "cloud" } else { "local" }.to_string(),
        )];
        if self.use_cloud {
            lines.push(("API URL", self.api_url.clone()));
            lines.push(("API key", set(self.api_key.is_some())));
        } else {
            lines.push(("Database", self.db_path.display().to_string()));
            if let Some(remote) = &self.remote_db {
                lines.push(("Remote database", remote.uri()));
                lines.push(("AWS region", self.aws_region.clone()));
                lines.push(("AWS credentials", set(self.aws_credentials.is_some())));
            }
        }
        lines.push(("Debug", self.debug.to_string()));
        lines.push(("Request timeout", format!("{}s", self.request_timeout_secs)));
        lines.push((
            "Smashrun token",
            set(self.smashrun.access_token.is_some()),
        ));
        lines
    }
}

/// Example env file written by `fitlog config init`.
pub const ENV_EXAMPLE: &str = "# fitlog configuration

# Cloud API settings
FITLOG_API_KEY=change-me
FITLOG_API_URL=http://localhost:8080

# Mode selection
FITLOG_USE_CLOUD=false

# Local database (replica path when FITLOG_REMOTE_DB is set)
FITLOG_DB_PATH=data/fitlog.db

# Remote database in S3 (server side)
# FITLOG_REMOTE_DB=s3://fitlog-dev-data/fitlog.db
# AWS_REGION=us-east-1
# AWS_ACCESS_KEY_ID=
# AWS_SECRET_ACCESS_KEY=

# Debug mode
FITLOG_DEBUG=false

# API timeout (seconds)
FITLOG_REQUEST_TIMEOUT=30

# Smashrun import
# SMASHRUN_CLIENT_ID=
# SMASHRUN_CLIENT_SECRET=
# SMASHRUN_ACCESS_TOKEN=
# SMASHRUN_REFRESH_TOKEN=
";

/// Set `key=value` in an env file, replacing an existing assignment or
/// appending a new one. Other lines are kept as they are.
pub fn update_env_file(path: &Path, key: &str, value: &str) -> std::io::Result<()> {
    let existing = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };

    let assignment = format!("{}={}", key, value);
    let mut replaced = false;
    let mut lines: Vec<String> = existing
        .lines()
        .map(|line| {
            let is_key = line
                .trim_start()
                .strip_prefix(key)
                .map(|rest| rest.trim_start().starts_with('='))
                .unwrap_or(false);
            if is_key && !replaced {
                replaced = true;
                assignment.clone()
            } else {
                line.to_string()
            }
        })
        .collect();

    if !replaced {
        lines.push(assignment);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, lines.join("\n") + "\n")
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup(lookup(&[])).expect("Config should load");

        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(config.port, 8080);
        assert_eq!(config.request_timeout_secs, 30);
        assert!(!config.use_cloud);
        assert!(config.api_key.is_none());
        assert!(config.remote_db.is_none());
    }

    #[test]
    fn test_config_from_vars() {
        let config = Config::from_lookup(lookup(&[
            ("FITLOG_REMOTE_DB", "s3://fitlog-dev-data/fitlog.db"),
            ("FITLOG_USE_CLOUD", "TRUE"),
            ("FITLOG_API_KEY", " secret "),
            ("FITLOG_REQUEST_TIMEOUT", "5"),
            ("AWS_ACCESS_KEY_ID", "AKID"),
            ("AWS_SECRET_ACCESS_KEY", "SECRET"),
        ]))
        .expect("Config should load");

        let remote = config.remote_db.expect("remote db");
        assert_eq!(remote.bucket, "fitlog-dev-data");
        assert_eq!(remote.key, "fitlog.db");
        assert!(config.use_cloud);
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.request_timeout_secs, 5);
        assert!(config.aws_credentials.is_some());
    }

    #[test]
    fn test_invalid_remote_uri() {
        let err = Config::from_lookup(lookup(&[("FITLOG_REMOTE_DB", "fitlog.db")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "FITLOG_REMOTE_DB",
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_timeout() {
        let err =
            Config::from_lookup(lookup(&[("FITLOG_REQUEST_TIMEOUT", "soon")])).unwrap_err();
        assert!(err.to_string().contains("FITLOG_REQUEST_TIMEOUT"));
    }

    #[test]
    fn test_require_cloud_config() {
        let mut config = Config::default();
        config.api_key = None;
        assert!(matches!(
            config.require_cloud_config(),
            Err(ConfigError::Missing("FITLOG_API_KEY"))
        ));

        config.api_key = Some("key".to_string());
        assert_eq!(config.require_cloud_config().unwrap(), "key");
    }

    #[test]
    fn test_update_env_file_replaces_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "# comment\nFITLOG_USE_CLOUD=false\nOTHER=1\n").unwrap();

        update_env_file(&path, "FITLOG_USE_CLOUD", "true").unwrap();
        update_env_file(&path, "SMASHRUN_ACCESS_TOKEN", "abc").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "# comment\nFITLOG_USE_CLOUD=true\nOTHER=1\nSMASHRUN_ACCESS_TOKEN=abc\n"
        );
    }

    #[test]
    fn test_update_env_file_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(".env");

        update_env_file(&path, "KEY", "value").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "KEY=value\n");
    }
}
