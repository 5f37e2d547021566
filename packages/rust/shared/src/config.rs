//! Application configuration for meetnotes.
//!
//! User config lives at `~/.meetnotes/meetnotes.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MeetNotesError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "meetnotes.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".meetnotes";

// ---------------------------------------------------------------------------
// Config structs (matching meetnotes.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Text-completion service settings.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Speech-to-text / text-to-speech settings.
    #[serde(default)]
    pub speech: SpeechConfig,

    /// External recorder/player commands.
    #[serde(default)]
    pub audio: AudioConfig,

    /// URL fetching.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Inbound-message server.
    #[serde(default)]
    pub server: ServerConfig,
}

/// `[completion]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_completion_key_env")]
    pub api_key_env: String,

    /// OpenAI-compatible base URL.
    #[serde(default = "default_completion_base_url")]
    pub base_url: String,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Hard deadline for one completion call.
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_completion_key_env(),
            base_url: default_completion_base_url(),
            model: default_model(),
            timeout_secs: default_completion_timeout(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

fn default_completion_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_completion_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "anthropic/claude-3.5-sonnet".into()
}
fn default_completion_timeout() -> u64 {
    60
}
fn default_max_tokens() -> u32 {
    1500
}
fn default_temperature() -> f32 {
    0.2
}

/// `[speech]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// OpenAI-compatible base URL for `/audio/transcriptions` and `/audio/speech`.
    #[serde(default = "default_speech_base_url")]
    pub base_url: String,

    /// Name of the env var holding the speech API key.
    #[serde(default = "default_speech_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_stt_model")]
    pub stt_model: String,

    #[serde(default = "default_tts_model")]
    pub tts_model: String,

    #[serde(default = "default_tts_voice")]
    pub tts_voice: String,

    /// Playback speed multiplier (0.25 to 4.0).
    #[serde(default = "default_tts_speed")]
    pub tts_speed: f32,

    #[serde(default = "default_speech_timeout")]
    pub timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: default_speech_base_url(),
            api_key_env: default_speech_key_env(),
            stt_model: default_stt_model(),
            tts_model: default_tts_model(),
            tts_voice: default_tts_voice(),
            tts_speed: default_tts_speed(),
            timeout_secs: default_speech_timeout(),
        }
    }
}

fn default_speech_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_speech_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_stt_model() -> String {
    "whisper-1".into()
}
fn default_tts_model() -> String {
    "tts-1".into()
}
fn default_tts_voice() -> String {
    "alloy".into()
}
fn default_tts_speed() -> f32 {
    1.0
}
fn default_speech_timeout() -> u64 {
    60
}

/// `[audio]` section. Commands are argv vectors; `{path}` is replaced with the audio file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_record_cmd")]
    pub record_cmd: Vec<String>,

    #[serde(default = "default_play_cmd")]
    pub play_cmd: Vec<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            record_cmd: default_record_cmd(),
            play_cmd: default_play_cmd(),
        }
    }
}

fn default_record_cmd() -> Vec<String> {
    ["arecord", "-q", "-f", "S16_LE", "-r", "16000", "-c", "1", "{path}"]
        .map(String::from)
        .to_vec()
}
fn default_play_cmd() -> Vec<String> {
    ["aplay", "-q", "{path}"].map(String::from).to_vec()
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            max_redirects: default_max_redirects(),
        }
    }
}

fn default_fetch_timeout() -> u64 {
    20
}
fn default_max_redirects() -> usize {
    5
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    6000
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.meetnotes/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| MeetNotesError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.meetnotes/meetnotes.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| MeetNotesError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        MeetNotesError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| MeetNotesError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| MeetNotesError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| MeetNotesError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read a non-empty API key from the named env var.
pub fn resolve_api_key(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(MeetNotesError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Check that the completion API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    resolve_api_key(&config.completion.api_key_env).map(|_| ())
}
