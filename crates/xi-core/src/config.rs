// Configuration loading and parsing (app.toml, credentials.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::draft::player::Price;
use crate::draft::quota::PositionQuotas;
use crate::draft::selection::MAX_SELECTED_TEAMS;
use crate::draft::squad::{DEFAULT_BUDGET_CAP, MAX_SQUAD_SIZE};

/// Shipped `app.toml`, written out when there is no `defaults/` directory to
/// copy from (e.g. a fresh platform config dir).
const BUILTIN_APP_TOML: &str = include_str!("../data/app.toml");

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub squad: SquadConfig,
    pub assistant: AssistantConfig,
    pub images: ImagesConfig,
    pub data: DataPaths,
    pub credentials: CredentialsConfig,
}

// ---------------------------------------------------------------------------
// app.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire app.toml file. Every section is
/// optional and falls back to its defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct AppFile {
    squad: SquadConfig,
    assistant: AssistantConfig,
    images: ImagesConfig,
    data: DataPaths,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SquadConfig {
    /// Spending cap in millions.
    pub budget_cap: Price,
    pub max_players: usize,
    pub max_teams: usize,
    /// Turn the position quotas into hard constraints.
    pub enforce_quotas: bool,
    pub quotas: PositionQuotas,
}

impl Default for SquadConfig {
    fn default() -> Self {
        SquadConfig {
            budget_cap: DEFAULT_BUDGET_CAP,
            max_players: MAX_SQUAD_SIZE,
            max_teams: MAX_SELECTED_TEAMS,
            enforce_quotas: false,
            quotas: PositionQuotas::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub model: String,
    pub max_tokens: u32,
    /// How many earlier chat messages are sent with each question.
    pub history_limit: usize,
    /// Override for the Messages API endpoint.
    pub api_url: Option<String>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        AssistantConfig {
            model: "claude-sonnet-4-5".to_string(),
            max_tokens: 1024,
            history_limit: 20,
            api_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    pub enabled: bool,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        ImagesConfig {
            enabled: true,
            base_url: "https://www.thesportsdb.com/api/v1/json/3".to_string(),
            timeout_secs: 5,
        }
    }
}

/// Optional catalog CSV overrides. Both must be given, or neither (the
/// built-in catalog is used).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub teams: Option<String>,
    pub players: Option<String>,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub anthropic_api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/app.toml` and (optionally)
/// `config/credentials.toml`, both relative to `base_dir`.
///
/// This does not copy defaults; prefer `load_config()`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- app.toml (required) ---
    let app_path = config_dir.join("app.toml");
    let app_text = read_file(&app_path)?;
    let app_file: AppFile = toml::from_str(&app_text).map_err(|e| ConfigError::ParseError {
        path: app_path.clone(),
        source: e,
    })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        squad: app_file.squad,
        assistant: app_file.assistant,
        images: app_file.images,
        data: app_file.data,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were created. Skips `.example` files.
///
/// Without a `defaults/` directory only `config/app.toml` is created, from
/// the copy compiled into the binary.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        let app_path = config_dir.join("app.toml");
        if app_path.exists() {
            return Ok(vec![]);
        }
        std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to create config directory: {e}"),
        })?;
        std::fs::write(&app_path, BUILTIN_APP_TOML).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to write {}: {e}", app_path.display()),
        })?;
        return Ok(vec![app_path]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }

        let target = config_dir.join(file_name);
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Directory holding `config/` (and `defaults/`): the working directory when
/// it has either, otherwise the platform config directory.
pub fn config_base_dir() -> Result<PathBuf, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    if cwd.join("config").is_dir() || cwd.join("defaults").is_dir() {
        return Ok(cwd);
    }
    directories::ProjectDirs::from("", "", "fantasy-xi")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or(ConfigError::FileNotFound { path: cwd })
}

/// Locate the config base directory, copy missing defaults, then load.
pub fn load_config() -> Result<Config, ConfigError> {
    let base_dir = config_base_dir()?;
    let copied = ensure_config_files(&base_dir)?;
    for path in &copied {
        info!("Created {} from defaults", path.display());
    }
    load_config_from(&base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validation_error(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let squad = &config.squad;
    if squad.budget_cap == Price::ZERO {
        return Err(validation_error("squad.budget_cap", "must be greater than 0"));
    }
    if squad.max_players == 0 {
        return Err(validation_error("squad.max_players", "must be greater than 0"));
    }
    if squad.max_teams == 0 {
        return Err(validation_error("squad.max_teams", "must be greater than 0"));
    }

    let q = &squad.quotas;
    let quota_total = q.batter + q.bowler + q.wicket_keeper + q.all_rounder;
    if squad.enforce_quotas && quota_total < squad.max_players {
        return Err(validation_error(
            "squad.quotas",
            format!(
                "enforced quotas total {quota_total}, fewer than max_players {}",
                squad.max_players
            ),
        ));
    }

    if config.assistant.max_tokens == 0 {
        return Err(validation_error("assistant.max_tokens", "must be greater than 0"));
    }
    if config.assistant.model.trim().is_empty() {
        return Err(validation_error("assistant.model", "must not be empty"));
    }

    if config.images.enabled && config.images.timeout_secs == 0 {
        return Err(validation_error("images.timeout_secs", "must be greater than 0"));
    }

    if config.data.teams.is_some() != config.data.players.is_some() {
        return Err(validation_error(
            "data",
            "`teams` and `players` must be set together",
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
