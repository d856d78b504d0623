//! Configuration management for the Virtual TA.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults
//! - Config file (`.vta/config.yaml` or `VTA_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric: the record store, prompt
//! overrides and config file all live under `<workspace>/.vta/`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers accepted for answer synthesis. `none` disables the LLM and
/// answers are composed from the matched records only.
pub const KNOWN_PROVIDERS: [&str; 3] = ["none", "openai", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .vta/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Explicit record store path (defaults to .vta/knowledge.sqlite)
    pub database: Option<PathBuf>,

    /// LLM provider used for answer synthesis ("none", "openai", "ollama")
    pub provider: String,

    /// Model identifier for the active provider
    pub model: String,

    /// API key for the LLM provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Forum ingestion settings
    pub forum: ForumConfig,

    /// HTTP server settings
    pub server: ServerConfig,

    /// Retrieval and answer composition settings
    pub retrieval: RetrievalConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
    },
}

impl ProviderConfig {
    /// Model configured for this provider.
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI { model, .. } | Self::Ollama { model, .. } => model,
        }
    }

    /// Custom endpoint, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::OpenAI { endpoint, .. } => endpoint.as_deref(),
            Self::Ollama { endpoint, .. } => Some(endpoint),
        }
    }
}

/// Discourse forum ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForumConfig {
    /// Base URL of the Discourse instance
    pub base_url: String,

    /// Category whose topic listing is paged through
    pub category_id: Option<u64>,

    /// Search terms paged through via the search endpoint
    pub search_terms: Vec<String>,

    /// First day of the ingestion window (inclusive)
    pub start_date: NaiveDate,

    /// Last day of the ingestion window (inclusive)
    pub end_date: NaiveDate,

    /// Maximum listing pages per topic query
    pub max_pages: u32,

    /// Retries per failed page request
    pub max_retries: u32,

    /// Delay between consecutive requests, in milliseconds
    pub request_delay_ms: u64,

    /// HTTP timeout per request, in seconds
    pub timeout_secs: u64,

    /// Cap on posts taken from a single topic (None = all)
    pub max_posts_per_topic: Option<usize>,

    /// Environment variable holding a Discourse API key
    pub api_key_env: Option<String>,

    /// Username sent alongside the API key
    pub api_username: Option<String>,
}

impl Default for ForumConfig {
    fn default() -> Self {
        Self {
            base_url: "https://discourse.onlinedegree.iitm.ac.in".to_string(),
            category_id: None,
            search_terms: vec![
                "TDS".to_string(),
                "Tools in Data Science".to_string(),
                "assignment".to_string(),
                "project".to_string(),
            ],
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2025, 4, 14).unwrap_or_default(),
            max_pages: 5,
            max_retries: 2,
            request_delay_ms: 1000,
            timeout_secs: 30,
            max_posts_per_topic: None,
            api_key_env: None,
            api_username: None,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Expose `POST /api/update` to re-run ingestion
    pub enable_update: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            enable_update: false,
        }
    }
}

/// Retrieval and answer composition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrievalConfig {
    /// Matches kept per question
    pub top_n: usize,

    /// Keywords extracted from a question
    pub max_keywords: usize,

    /// Source links returned per answer
    pub max_links: usize,

    /// Characters of each matched record used as context
    pub snippet_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_n: 5,
            max_keywords: 5,
            max_links: 3,
            snippet_chars: 500,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    database: Option<String>,
    logging: Option<LoggingConfig>,
    forum: Option<ForumConfig>,
    server: Option<ServerConfig>,
    retrieval: Option<RetrievalConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            database: None,
            provider: "none".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            forum: ForumConfig::default(),
            server: ServerConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `VTA_WORKSPACE`: Override workspace path
    /// - `VTA_CONFIG`: Path to config file
    /// - `VTA_DATABASE`: Path to the record store
    /// - `VTA_PROVIDER`: LLM provider
    /// - `VTA_MODEL`: Model identifier
    /// - `VTA_API_KEY`: API key
    /// - `PORT`: Server port
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let workspace = std::env::var("VTA_WORKSPACE").ok().map(PathBuf::from);
        let config_file = std::env::var("VTA_CONFIG").ok().map(PathBuf::from);
        Self::load_from(workspace, config_file)
    }

    /// Load configuration for an explicit workspace and config file.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace {
            config.workspace = workspace;
        }
        config.config_file = config_file;

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.vta_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Ok(database) = std::env::var("VTA_DATABASE") {
            config.database = Some(PathBuf::from(database));
        }

        if let Ok(provider) = std::env::var("VTA_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("VTA_MODEL") {
            config.model = model;
        }

        if let Ok(key) = std::env::var("VTA_API_KEY") {
            config.api_key = Some(key);
        }

        if let Ok(port) = std::env::var("PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| AppError::Config(format!("Invalid PORT value: {}", port)))?;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self;

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(database) = config_file.database {
            result.database = Some(PathBuf::from(database));
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }

            result.llm = Some(llm);
        }

        if let Some(forum) = config_file.forum {
            result.forum = forum;
        }

        if let Some(server) = config_file.server {
            result.server = server;
        }

        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over the config file and the
    /// environment.
    pub fn with_overrides(
        mut self,
        database: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(database) = database {
            self.database = Some(database);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .vta directory.
    pub fn vta_dir(&self) -> PathBuf {
        self.workspace.join(".vta")
    }

    /// Resolved path of the SQLite record store.
    ///
    /// Relative paths are resolved against the workspace.
    pub fn database_path(&self) -> PathBuf {
        match &self.database {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.workspace.join(path),
            None => self.vta_dir().join("knowledge.sqlite"),
        }
    }

    /// Get a provider's configuration block, if present.
    pub fn get_provider_config(&self, provider: &str) -> Option<ProviderConfig> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(provider).cloned())
    }

    /// Custom endpoint configured for a provider.
    pub fn provider_endpoint(&self, provider: &str) -> Option<String> {
        self.get_provider_config(provider)
            .and_then(|pc| pc.endpoint().map(str::to_string))
    }

    /// Resolve the API key for a provider.
    ///
    /// Order: explicit key (`VTA_API_KEY`), the provider's `apiKeyEnv`,
    /// then `OPENAI_API_KEY` for the openai provider.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        if let Some(ProviderConfig::OpenAI { api_key_env, .. }) = self.get_provider_config(provider)
        {
            if let Ok(key) = std::env::var(&api_key_env) {
                return Some(key);
            }
        }

        if provider == "openai" {
            return std::env::var("OPENAI_API_KEY").ok();
        }

        None
    }

    /// Resolve the Discourse API key, if one is configured.
    pub fn forum_api_key(&self) -> Option<String> {
        self.forum
            .api_key_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if self.provider == "openai" && self.resolve_api_key("openai").is_none() {
            return Err(AppError::Config(
                "The openai provider requires an API key (VTA_API_KEY or OPENAI_API_KEY)"
                    .to_string(),
            ));
        }

        if self.forum.start_date > self.forum.end_date {
            return Err(AppError::Config(format!(
                "Forum start date {} is after end date {}",
                self.forum.start_date, self.forum.end_date
            )));
        }

        if self.retrieval.top_n == 0 {
            return Err(AppError::Config("retrieval.topN must be at least 1".to_string()));
        }

        Ok(())
    }
}
