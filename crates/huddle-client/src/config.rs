//! Runtime configuration.
//!
//! Everything comes from `HUDDLE_*` environment variables, loaded with the
//! `config` crate into a serde struct. The command line only overrides the
//! identity file and log level.

use std::{path::PathBuf, time::Duration};

use config::{Config, Environment, Map};
use huddle_core::{CredentialRetry, DEFAULT_ROOM, OccupancyMode, SessionConfig};
use serde::Deserialize;

use crate::error::ConfigError;

/// Prefix shared by every variable.
pub const ENV_PREFIX: &str = "HUDDLE";
/// Media server URL. Required.
pub const SERVER_URL_VAR: &str = "HUDDLE_SERVER_URL";
/// Base URL of the token endpoint.
pub const TOKEN_ENDPOINT_VAR: &str = "HUDDLE_TOKEN_ENDPOINT";
/// Room name.
pub const ROOM_VAR: &str = "HUDDLE_ROOM";
/// Where the identity is persisted.
pub const IDENTITY_FILE_VAR: &str = "HUDDLE_IDENTITY_FILE";
/// Total credential attempts. `0` or `1` disables retry.
pub const CREDENTIAL_RETRIES_VAR: &str = "HUDDLE_CREDENTIAL_RETRIES";
/// Initial retry delay in milliseconds.
pub const CREDENTIAL_BACKOFF_VAR: &str = "HUDDLE_CREDENTIAL_BACKOFF_MS";
/// `freeze` or `live`.
pub const OCCUPANCY_MODE_VAR: &str = "HUDDLE_OCCUPANCY_MODE";

/// Token endpoint used when none is configured.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "http://localhost:3000";

const DEFAULT_BACKOFF_MS: u64 = 500;

/// Variables as read, keyed without the prefix.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct EnvSettings {
    server_url: Option<String>,
    token_endpoint: String,
    room: String,
    identity_file: Option<PathBuf>,
    credential_retries: u32,
    credential_backoff_ms: u64,
    occupancy_mode: OccupancySetting,
}

impl Default for EnvSettings {
    fn default() -> Self {
        Self {
            server_url: None,
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            room: DEFAULT_ROOM.to_string(),
            identity_file: None,
            credential_retries: 0,
            credential_backoff_ms: DEFAULT_BACKOFF_MS,
            occupancy_mode: OccupancySetting::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum OccupancySetting {
    #[default]
    #[serde(alias = "FREEZE", alias = "Freeze")]
    Freeze,
    #[serde(alias = "LIVE", alias = "Live")]
    Live,
}

impl From<OccupancySetting> for OccupancyMode {
    fn from(setting: OccupancySetting) -> Self {
        match setting {
            OccupancySetting::Freeze => Self::FreezeOnPublish,
            OccupancySetting::Live => Self::Live,
        }
    }
}

/// Client runtime configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Passed to the session controller.
    pub session: SessionConfig,
    /// Base URL; the issuer appends `/api/get-participant-token`.
    pub token_endpoint: String,
    /// Identity persistence path.
    pub identity_file: PathBuf,
}

impl ClientConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// `ConfigError::Missing` if `HUDDLE_SERVER_URL` is unset,
    /// `ConfigError::Invalid` for unparseable values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let home = std::env::var_os("HOME").map(PathBuf::from);
        Self::load(Environment::with_prefix(ENV_PREFIX), home)
    }

    /// Read configuration from `vars` instead of the process environment.
    /// Keys are full variable names. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Same as [`ClientConfig::from_env`].
    pub fn from_vars<I, K, V>(vars: I, home: Option<PathBuf>) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let source: Map<String, String> = vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self::load(Environment::with_prefix(ENV_PREFIX).source(Some(source)), home)
    }

    fn load(env: Environment, home: Option<PathBuf>) -> Result<Self, ConfigError> {
        let settings: EnvSettings = Config::builder()
            .add_source(env.try_parsing(true).ignore_empty(true))
            .build()?
            .try_deserialize()?;

        let server_url = settings
            .server_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::Missing { var: SERVER_URL_VAR })?;

        let mut session = SessionConfig::new(server_url);
        session.room = settings.room;
        session.occupancy_mode = settings.occupancy_mode.into();
        session.credential_retry = match settings.credential_retries {
            0 | 1 => CredentialRetry::Never,
            max_attempts => CredentialRetry::Backoff {
                max_attempts,
                initial_backoff: Duration::from_millis(settings.credential_backoff_ms),
            },
        };

        let identity_file = settings.identity_file.unwrap_or_else(|| {
            home.unwrap_or_else(|| PathBuf::from(".")).join(".huddle").join("username")
        });

        Ok(Self {
            session,
            token_endpoint: settings.token_endpoint.trim_end_matches('/').to_string(),
            identity_file,
        })
    }
}
