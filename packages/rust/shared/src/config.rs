//! Application configuration for feedmill.
//!
//! User config lives at `~/.feedmill/feedmill.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FeedmillError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "feedmill.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".feedmill";

// ---------------------------------------------------------------------------
// Config structs (matching feedmill.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Working directories and the cursor file.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Generation service settings.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Feed fetching settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Configured feeds.
    #[serde(default)]
    pub feeds: Vec<FeedEntry>,
}

/// `[paths]` section.
///
/// Unset directories fall back to dated defaults (`raw_<date>`,
/// `translated_<date>`) resolved by the CLI at run time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of ingested, untranslated documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_dir: Option<String>,

    /// Root of the published, translated mirror.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,

    /// Feed cursor record.
    #[serde(default = "default_cursor_file")]
    pub cursor_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_dir: None,
            output_dir: None,
            cursor_file: default_cursor_file(),
        }
    }
}

fn default_cursor_file() -> String {
    "last_fetched.json".into()
}

/// `[generation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model ID sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Language the body is translated into.
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Advisory upper bound for the summary, in characters.
    #[serde(default = "default_summary_max_chars")]
    pub summary_max_chars: usize,

    /// Bodies longer than this are translated chunk by chunk.
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Per-request timeout.
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            target_language: default_target_language(),
            summary_max_chars: default_summary_max_chars(),
            chunk_chars: default_chunk_chars(),
            temperature: default_temperature(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.deepseek.com".into()
}
fn default_model() -> String {
    "deepseek-chat".into()
}
fn default_api_key_env() -> String {
    "DEEPSEEK_API_KEY".into()
}
fn default_target_language() -> String {
    "Simplified Chinese".into()
}
fn default_summary_max_chars() -> usize {
    200
}
fn default_chunk_chars() -> usize {
    24_000
}
fn default_temperature() -> f64 {
    1.3
}
fn default_generation_timeout() -> u64 {
    120
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Timeout for feed and article requests.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// User-Agent header for feed and article requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_fetch_timeout() -> u64 {
    10
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; feedmill)".into()
}

/// `[[feeds]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEntry {
    /// Feed URL; also the cursor key.
    pub url: String,
    /// Directory name override (defaults to the feed's own title).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.feedmill/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| FeedmillError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.feedmill/feedmill.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| FeedmillError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        FeedmillError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

impl AppConfig {
    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.generation.chunk_chars == 0 {
            return Err(FeedmillError::config("generation.chunk_chars must be > 0"));
        }
        if self.generation.summary_max_chars == 0 {
            return Err(FeedmillError::config(
                "generation.summary_max_chars must be > 0",
            ));
        }
        if let Some(feed) = self.feeds.iter().find(|f| f.url.trim().is_empty()) {
            return Err(FeedmillError::config(format!(
                "feed entry {:?} has an empty url",
                feed.name
            )));
        }
        Ok(())
    }
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let path = config_file_path()?;
    init_config_at(&path)?;
    Ok(path)
}

/// Write a default config file to `path`, creating its directory.
pub fn init_config_at(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| FeedmillError::io(dir, e))?;
    }

    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| FeedmillError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| FeedmillError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(())
}

/// Check that the generation API key env var is set and non-empty, returning it.
pub fn validate_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.generation.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(FeedmillError::config(format!(
            "generation API key not found. Set the {var_name} environment variable."
        ))),
    }
}
