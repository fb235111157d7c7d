//! Worker configuration loaded from environment variables.
//!
//! Connection settings are fail-fast: the worker refuses to start without a
//! database URL or Graph credentials. The sync switch and confirm interval
//! are passed through raw and judged by the flows that consume them.

use secrecy::SecretString;
use std::env;
use std::time::Duration;
use thiserror::Error;

use enrollsync_connector_entra::EntraCloudEnvironment;
use enrollsync_db::DEFAULT_MAX_CONNECTIONS;
use enrollsync_reconciler::{FlowSchedule, SyncSettings};

/// Configuration errors that can occur during environment loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// Worker configuration.
pub struct WorkerConfig {
    pub database_url: SecretString,
    pub db_max_connections: u32,
    pub run_migrations: bool,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub cloud: EntraCloudEnvironment,
    pub sync: SyncSettings,
    pub schedule: FlowSchedule,
    pub rust_log: String,
}

impl std::fmt::Debug for WorkerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerConfig")
            .field("database_url", &"[REDACTED]")
            .field("db_max_connections", &self.db_max_connections)
            .field("run_migrations", &self.run_migrations)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("cloud", &self.cloud)
            .field("sync", &self.sync)
            .field("schedule", &self.schedule)
            .field("rust_log", &self.rust_log)
            .finish()
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a value
    /// cannot be parsed.
    ///
    /// # Required Variables
    ///
    /// - `DATABASE_URL` - PostgreSQL connection string
    /// - `ENTRA_TENANT_ID`, `ENTRA_CLIENT_ID`, `ENTRA_CLIENT_SECRET` - Graph app credentials
    ///
    /// # Optional Variables
    ///
    /// - `ENTRA_CLOUD` - `commercial` (default), `us_government` or `china`
    /// - `SYNC_ENABLED` - Global sync switch
    /// - `CONFIRM_INTERVAL_HOURS` - Confirm staleness interval
    /// - `ENROLL_EVERY_SECS`, `CONFIRM_EVERY_SECS`, `RETIRE_EVERY_SECS` - Flow periods
    /// - `DB_MAX_CONNECTIONS` - Pool size (default: 5)
    /// - `RUN_MIGRATIONS` - Apply migrations at startup (default: true)
    /// - `RUST_LOG` - Log level filter (default: "info,enrollsync=debug")
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (development only)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required =
            |name: &str| var(name).ok_or_else(|| ConfigError::MissingVar(name.to_string()));

        let database_url = SecretString::new(required("DATABASE_URL")?);
        let tenant_id = required("ENTRA_TENANT_ID")?;
        let client_id = required("ENTRA_CLIENT_ID")?;
        let client_secret = SecretString::new(required("ENTRA_CLIENT_SECRET")?);

        let cloud = match var("ENTRA_CLOUD") {
            Some(raw) => raw
                .parse::<EntraCloudEnvironment>()
                .map_err(|e| ConfigError::InvalidValue {
                    var: "ENTRA_CLOUD".to_string(),
                    message: e.to_string(),
                })?,
            None => EntraCloudEnvironment::default(),
        };

        let defaults = FlowSchedule::default();
        let schedule = FlowSchedule {
            enroll_every: parse_secs(&var, "ENROLL_EVERY_SECS", defaults.enroll_every)?,
            confirm_every: parse_secs(&var, "CONFIRM_EVERY_SECS", defaults.confirm_every)?,
            retire_every: parse_secs(&var, "RETIRE_EVERY_SECS", defaults.retire_every)?,
        };

        let db_max_connections = match var("DB_MAX_CONNECTIONS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "DB_MAX_CONNECTIONS".to_string(),
                        message: format!("expected a positive integer, got '{raw}'"),
                    })
                }
            },
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let run_migrations = match var("RUN_MIGRATIONS") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
                var: "RUN_MIGRATIONS".to_string(),
                message: format!("expected true or false, got '{raw}'"),
            })?,
            None => true,
        };

        Ok(Self {
            database_url,
            db_max_connections,
            run_migrations,
            tenant_id,
            client_id,
            client_secret,
            cloud,
            // Kept raw: an invalid switch disables sync, an invalid interval
            // aborts confirm runs.
            sync: SyncSettings::new(lookup("SYNC_ENABLED"), lookup("CONFIRM_INTERVAL_HOURS")),
            schedule,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info,enrollsync=debug".to_string()),
        })
    }
}

fn parse_secs(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let Some(raw) = var(name) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidValue {
            var: name.to_string(),
            message: format!("expected a positive number of seconds, got '{raw}'"),
        }),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
