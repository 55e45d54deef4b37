// PromptShelf — Configuration (JSON file + PROMPTSHELF_* env overrides)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("home directory not found")]
    NoHomeDir,
    #[error("no API key configured for the evaluator (set evaluator.api_key or PROMPTSHELF_EVALUATOR_API_KEY)")]
    MissingApiKey,
    #[error("data directory is invalid: {0}")]
    InvalidDataDir(String),
    #[error("{0}")]
    Other(String),
}

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub suggestions: SuggestionsConfig,
    #[serde(default)]
    pub submission: SubmissionConfig,
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_system_file")]
    pub system_file: String,
    #[serde(default = "default_user_file")]
    pub user_file: String,
    #[serde(default = "default_preferences_file")]
    pub preferences_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            system_file: default_system_file(),
            user_file: default_user_file(),
            preferences_file: default_preferences_file(),
        }
    }
}

fn default_data_dir() -> String {
    "~/.promptshelf".to_string()
}
fn default_system_file() -> String {
    "system_prompts.json".to_string()
}
fn default_user_file() -> String {
    "user_prompts.json".to_string()
}
fn default_preferences_file() -> String {
    "preferences.json".to_string()
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_base: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub proxy: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            api_base: String::new(),
            model: default_model(),
            proxy: String::new(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_timeout_secs() -> u64 {
    8
}
fn default_max_retries() -> usize {
    1
}
fn default_retry_delay_ms() -> u64 {
    500
}

// ---------------------------------------------------------------------------
// Output sinks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    /// Command the processed prompt is piped into for clipboard copies.
    /// Empty means auto-detect.
    #[serde(default)]
    pub clipboard_command: String,
    /// Named chat commands, e.g. `"ask": "llm chat"`. The prompt is written to stdin.
    #[serde(default)]
    pub chat_commands: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Suggestions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionsConfig {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SuggestionsConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
        }
    }
}

fn default_max_results() -> usize {
    10
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionConfig {
    #[serde(default)]
    pub recipient: String,
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            recipient: String::new(),
            subject_prefix: default_subject_prefix(),
        }
    }
}

fn default_subject_prefix() -> String {
    "Prompt submission".to_string()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a JSON file, falling back to defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            serde_json::from_str(&contents)?
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            Config::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (prefix: PROMPTSHELF_)
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("PROMPTSHELF_STORAGE_DATA_DIR") {
            self.storage.data_dir = v;
        }
        if let Ok(v) = std::env::var("PROMPTSHELF_EVALUATOR_ENABLED") {
            self.evaluator.enabled = v.parse().unwrap_or(true);
        }
        if let Ok(v) = std::env::var("PROMPTSHELF_EVALUATOR_API_KEY") {
            self.evaluator.api_key = v;
        }
        if let Ok(v) = std::env::var("PROMPTSHELF_EVALUATOR_API_BASE") {
            self.evaluator.api_base = v;
        }
        if let Ok(v) = std::env::var("PROMPTSHELF_EVALUATOR_MODEL") {
            self.evaluator.model = v;
        }
        if let Ok(v) = std::env::var("PROMPTSHELF_EVALUATOR_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                self.evaluator.timeout_secs = n;
            }
        }
        if let Ok(v) = std::env::var("PROMPTSHELF_OUTPUT_CLIPBOARD_COMMAND") {
            self.output.clipboard_command = v;
        }
        if let Ok(v) = std::env::var("PROMPTSHELF_SUBMISSION_RECIPIENT") {
            self.submission.recipient = v;
        }
    }

    /// Resolve the data directory, expanding `~` to home directory.
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        let dir = &self.storage.data_dir;
        if let Some(stripped) = dir.strip_prefix('~') {
            let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
            Ok(home.join(dir.strip_prefix("~/").unwrap_or(stripped)))
        } else {
            Ok(PathBuf::from(dir))
        }
    }

    pub fn system_prompts_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join(&self.storage.system_file))
    }

    pub fn user_prompts_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join(&self.storage.user_file))
    }

    pub fn preferences_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join(&self.storage.preferences_file))
    }

    /// Get the default config file path: ~/.promptshelf/config.json
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".promptshelf").join("config.json"))
    }

    /// Whether prompts should be sent to the evaluator at all.
    pub fn evaluation_active(&self) -> bool {
        self.evaluator.enabled && !self.evaluator.api_key.is_empty()
    }

    /// Validate configuration for basic correctness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let dir = self.data_dir()?;
        if dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidDataDir(self.storage.data_dir.clone()));
        }

        for name in [
            &self.storage.system_file,
            &self.storage.user_file,
            &self.storage.preferences_file,
        ] {
            if name.is_empty() || name.contains(['/', '\\']) {
                return Err(ConfigError::Other(format!(
                    "storage file name '{}' must be a plain file name",
                    name
                )));
            }
        }
        if self.storage.system_file == self.storage.user_file {
            return Err(ConfigError::Other(
                "system and user prompt files must differ".to_string(),
            ));
        }

        if self.evaluator.enabled && self.evaluator.api_key.is_empty() {
            tracing::warn!("Evaluator is enabled but no API key is set; prompts will not be scored");
        }
        if self.evaluator.timeout_secs == 0 {
            return Err(ConfigError::Other(
                "evaluator.timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
