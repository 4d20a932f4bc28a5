//! Application configuration for DocChat.
//!
//! The config file is looked up at `--config` / `DOCCHAT_CONFIG`, then
//! `./config.toml`, then `~/.docchat/config.toml`. Unlike secrets, a missing
//! or malformed config file is fatal: the chat surface cannot be built
//! without its title, placeholder and error messages.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocChatError, Result};
use crate::messages::ErrorMessages;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docchat";

/// Default prompt template file name, resolved next to the config file.
const DEFAULT_TEMPLATE_FILE: &str = "prompt_template.txt";

/// Sample template written by `init_config`.
const SAMPLE_TEMPLATE: &str = "\
You are a helpful assistant. Answer the question using only the knowledge below.
If the answer is not in the knowledge, say that you do not know.

Knowledge:
{basis_pengetahuan}

Question: {prompt}
";

// ---------------------------------------------------------------------------
// Config structs (matching config.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Page/chat surface settings.
    pub app: AppSection,

    /// User-facing error message templates keyed by scenario.
    #[serde(default)]
    pub error_messages: ErrorMessages,

    /// Knowledge buffer settings.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Document store settings.
    #[serde(default)]
    pub drive: DriveConfig,

    /// Completion service settings.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Chat session behaviour.
    #[serde(default)]
    pub session: SessionConfig,

    /// Directory the config was loaded from (for relative paths).
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// `[app]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSection {
    /// Page title.
    pub title: String,
    /// Icon shown before the title (usually an emoji).
    pub icon: String,
    /// Caption under the title.
    pub caption: String,
    /// Placeholder text for the chat input.
    pub chat_input_placeholder: String,
    /// Optional assistant message pre-seeded into every new conversation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub welcome_message: Option<String>,
    /// Prompt template path (relative paths resolve against the config dir).
    #[serde(default = "default_template_file")]
    pub prompt_template_file: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            title: "DocChat".into(),
            icon: "📚".into(),
            caption: "Ask questions about the documents in your Drive folder.".into(),
            chat_input_placeholder: "Ask a question about the documents...".into(),
            welcome_message: None,
            prompt_template_file: default_template_file(),
        }
    }
}

fn default_template_file() -> String {
    DEFAULT_TEMPLATE_FILE.into()
}

/// `[knowledge]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// How long a built knowledge buffer is reused before a full rebuild.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Sort documents by name before aggregation (reproducible buffers).
    #[serde(default = "default_true")]
    pub sort_by_name: bool,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl(),
            sort_by_name: true,
        }
    }
}

fn default_cache_ttl() -> u64 {
    600
}
fn default_true() -> bool {
    true
}

/// `[drive]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Drive REST API base URL.
    #[serde(default = "default_drive_base_url")]
    pub api_base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_drive_timeout")]
    pub timeout_secs: u64,

    /// Largest accepted file body in bytes.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Listing page size.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_drive_base_url(),
            timeout_secs: default_drive_timeout(),
            max_file_bytes: default_max_file_bytes(),
            page_size: default_page_size(),
        }
    }
}

fn default_drive_base_url() -> String {
    "https://www.googleapis.com/drive/v3".into()
}
fn default_drive_timeout() -> u64 {
    60
}
fn default_max_file_bytes() -> u64 {
    50 * 1024 * 1024
}
fn default_page_size() -> u32 {
    100
}

/// `[completion]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Generation model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Generative Language API base URL.
    #[serde(default = "default_completion_base_url")]
    pub api_base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,

    /// Env var consulted when the secrets file has no `gemini_api_key`.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_base_url: default_completion_base_url(),
            timeout_secs: default_completion_timeout(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_model() -> String {
    "gemini-1.5-flash".into()
}
fn default_completion_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn default_completion_timeout() -> u64 {
    120
}
fn default_api_key_env() -> String {
    "GEMINI_API_KEY".into()
}

/// What happens to the user's message when generation fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedTurnPolicy {
    /// The question stays in history without an answer.
    #[default]
    Keep,
    /// The question is only committed together with its answer.
    Retract,
}

/// `[session]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Failed-generation policy.
    #[serde(default)]
    pub failed_turn: FailedTurnPolicy,
}

impl AppConfig {
    /// Absolute (or cwd-relative) path of the prompt template file.
    pub fn template_path(&self) -> PathBuf {
        let file = Path::new(&self.app.prompt_template_file);
        match &self.base_dir {
            Some(dir) if file.is_relative() => dir.join(file),
            _ => file.to_path_buf(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docchat/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| DocChatError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Pick the config file: explicit path, then `./config.toml`, then the home dir.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Ok(local);
    }

    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config, failing if no config file exists.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let path = resolve_config_path(explicit)?;

    if !path.exists() {
        return Err(DocChatError::config(format!(
            "config file {} not found (run `docchat config init`)",
            path.display()
        )));
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocChatError::io(path, e))?;

    let mut config: AppConfig = toml::from_str(&content)
        .map_err(|e| DocChatError::config(format!("failed to parse {}: {e}", path.display())))?;

    config.base_dir = path.parent().map(Path::to_path_buf);
    tracing::debug!(?path, title = %config.app.title, "config loaded");

    Ok(config)
}

/// Create the config directory and write a default config file plus a
/// sample prompt template. Existing files are left untouched.
/// Returns the path to the config file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocChatError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        let config = AppConfig {
            error_messages: ErrorMessages::builtin(),
            ..Default::default()
        };
        let content =
            toml::to_string_pretty(&config).map_err(|e| DocChatError::config(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| DocChatError::io(&path, e))?;
        tracing::info!(?path, "created default config file");
    }

    let template = dir.join(DEFAULT_TEMPLATE_FILE);
    if !template.exists() {
        std::fs::write(&template, SAMPLE_TEMPLATE).map_err(|e| DocChatError::io(&template, e))?;
        tracing::info!(path = ?template, "created sample prompt template");
    }

    Ok(path)
}
