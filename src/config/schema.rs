//! Resolved settings record for a `dirchat` session.
//!
//! Settings come from `~/.dirchat/config.toml` (written with defaults on first
//! run) and are then overridden by `DIRCHAT_*` environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default system prompt: scopes the assistant to directory questions and
/// describes the intended tool workflow.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions \
about the user's organization directory (users, groups, devices, applications and their \
relationships). Use the available tools to look up real data instead of guessing. \
When you do not know the right query, call microsoft_graph_suggest_queries first, then run the \
suggested query with microsoft_graph_get. Use microsoft_graph_list_properties to discover the \
properties of an entity before filtering or selecting on them. If a tool reports an error, \
read the message carefully and adjust your query. Keep answers concise and cite the numbers \
you found.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub config_path: PathBuf,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub mcp: McpConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Any endpoint speaking the `OpenAI` chat completions dialect.
    #[default]
    Openai,
    /// Azure `OpenAI` deployment (`api-key` header, `api-version` query).
    AzureOpenai,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    /// Base URL. For `openai` this is the `/v1` root, for `azure-openai` the
    /// resource endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// Azure deployment name; falls back to `model` when unset.
    #[serde(default)]
    pub deployment: Option<String>,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum McpTransport {
    #[default]
    Http,
    Stdio,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(default)]
    pub transport: McpTransport,
    /// Streamable HTTP endpoint of the directory tool server.
    #[serde(default = "default_mcp_url")]
    pub url: String,
    /// Command for the `stdio` transport.
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_mcp_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Pre-acquired delegated bearer token for the tool server.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Ask for a token on the terminal when none is configured.
    #[serde(default = "default_true")]
    pub prompt_for_token: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Completion round trips allowed per user turn. Zero means the default.
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// `console`, `log` or `none`; comma-separate to combine.
    #[serde(default = "default_observability_backend")]
    pub backend: String,
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".into()
}

fn default_model() -> String {
    "gpt-4o".into()
}

fn default_api_version() -> String {
    "2024-10-21".into()
}

fn default_temperature() -> f64 {
    0.2
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_mcp_url() -> String {
    "https://mcp.svc.cloud.microsoft/enterprise".into()
}

fn default_mcp_timeout_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_max_tool_iterations() -> usize {
    10
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.into()
}

fn default_observability_backend() -> String {
    "console".into()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            endpoint: default_endpoint(),
            api_key: None,
            model: default_model(),
            deployment: None,
            api_version: default_api_version(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            transport: McpTransport::default(),
            url: default_mcp_url(),
            command: None,
            args: Vec::new(),
            timeout_secs: default_mcp_timeout_secs(),
            env: HashMap::new(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            prompt_for_token: default_true(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_iterations: default_max_tool_iterations(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            backend: default_observability_backend(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: default_config_path(),
            provider: ProviderConfig::default(),
            mcp: McpConfig::default(),
            auth: AuthConfig::default(),
            agent: AgentConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// `~/.dirchat/config.toml`, or `./.dirchat/config.toml` when no home exists.
pub fn default_config_path() -> PathBuf {
    directories::UserDirs::new()
        .map_or_else(
            || PathBuf::from(".dirchat"),
            |dirs| dirs.home_dir().join(".dirchat"),
        )
        .join("config.toml")
}

impl Config {
    /// Load the default config file, creating it with defaults if missing.
    pub fn load_or_init() -> Result<Self> {
        Self::load_or_init_at(&default_config_path())
    }

    /// Load `path` (with `~` expansion), creating it with defaults if missing,
    /// then apply environment overrides.
    pub fn load_or_init_at(path: &Path) -> Result<Self> {
        let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
        let path = PathBuf::from(expanded);

        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let mut parsed: Config = toml::from_str(&raw)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            parsed.config_path = path;
            parsed
        } else {
            let config = Config {
                config_path: path,
                ..Config::default()
            };
            config.save()?;
            tracing::info!(path = %config.config_path.display(), "Wrote default config");
            config
        };

        config.apply_env_overrides_from(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let raw = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&self.config_path, raw)
            .with_context(|| format!("Failed to write {}", self.config_path.display()))?;
        Ok(())
    }

    /// Apply `DIRCHAT_*` overrides. Empty values are ignored.
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("DIRCHAT_API_KEY") {
            self.provider.api_key = Some(key);
        }
        if let Some(endpoint) = get("DIRCHAT_ENDPOINT") {
            self.provider.endpoint = endpoint;
        }
        if let Some(model) = get("DIRCHAT_MODEL") {
            self.provider.model = model;
        }
        if let Some(url) = get("DIRCHAT_MCP_URL") {
            self.mcp.url = url;
        }
        if let Some(token) = get("DIRCHAT_ACCESS_TOKEN") {
            self.auth.access_token = Some(token);
        }
    }

    /// Iteration budget with the zero-means-default rule applied.
    pub fn effective_max_tool_iterations(&self) -> usize {
        if self.agent.max_tool_iterations == 0 {
            default_max_tool_iterations()
        } else {
            self.agent.max_tool_iterations
        }
    }
}
