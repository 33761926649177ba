use anyhow::{Context, Result};
use directories::UserDirs;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
#[cfg(unix)]
use tokio::fs::File;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

const CONFIG_FILE_NAME: &str = "config.toml";

// ── Top-level config ──────────────────────────────────────────────

/// Top-level costgate configuration, loaded from `config.toml`.
///
/// Resolution order: `COSTGATE_CONFIG_DIR` env → `~/.costgate/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    /// Path to config.toml - computed at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Gateway server configuration: host, port, body limit (`[gateway]`).
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Data source the gateway resolves records from (`[upstream]`).
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Session history policy (`[sessions]`).
    #[serde(default)]
    pub sessions: SessionsConfig,

    /// Built-in mock data source (`[mock]`).
    #[serde(default)]
    pub mock: MockConfig,

    /// Interactive conversation client (`[chat]`).
    #[serde(default)]
    pub chat: ChatConfig,
}

// ── Gateway ──────────────────────────────────────────────────────

/// Gateway server configuration (`[gateway]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GatewayConfig {
    /// Gateway port (default: 9004)
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Gateway host (default: 127.0.0.1)
    #[serde(default = "default_gateway_host")]
    pub host: String,
    /// Maximum structured query body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_gateway_port() -> u16 {
    9004
}

fn default_gateway_host() -> String {
    "127.0.0.1".into()
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            host: default_gateway_host(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

// ── Upstream data source ─────────────────────────────────────────

/// Upstream data source configuration (`[upstream]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpstreamConfig {
    /// Base URL serving `/allocations`, `/cloudCosts` and `/assets`.
    #[serde(default = "default_upstream_url")]
    pub base_url: String,
    /// Total request timeout in seconds.
    #[serde(default = "default_upstream_timeout_secs")]
    pub timeout_secs: u64,
    /// Connect timeout in seconds.
    #[serde(default = "default_upstream_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_upstream_url() -> String {
    "http://127.0.0.1:9005".into()
}

fn default_upstream_timeout_secs() -> u64 {
    30
}

fn default_upstream_connect_timeout_secs() -> u64 {
    5
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_url(),
            timeout_secs: default_upstream_timeout_secs(),
            connect_timeout_secs: default_upstream_connect_timeout_secs(),
        }
    }
}

// ── Sessions ─────────────────────────────────────────────────────

/// Session history configuration (`[sessions]` section).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SessionsConfig {
    /// Maximum queries kept per session; oldest are dropped first. 0 = unbounded.
    #[serde(default)]
    pub max_history: usize,
}

// ── Mock data source ─────────────────────────────────────────────

/// Mock data source configuration (`[mock]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MockConfig {
    /// Mock port (default: 9005)
    #[serde(default = "default_mock_port")]
    pub port: u16,
    /// Mock host (default: 127.0.0.1)
    #[serde(default = "default_gateway_host")]
    pub host: String,
}

fn default_mock_port() -> u16 {
    9005
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            port: default_mock_port(),
            host: default_gateway_host(),
        }
    }
}

// ── Chat client ──────────────────────────────────────────────────

/// Conversation client configuration (`[chat]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChatConfig {
    /// Gateway URL; defaults to the local `[gateway]` address when unset.
    #[serde(default)]
    pub gateway_url: Option<String>,
    /// Session identifier sent with every query.
    #[serde(default = "default_chat_session_id")]
    pub session_id: String,
}

fn default_chat_session_id() -> String {
    "cli-demo-001".into()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            gateway_url: None,
            session_id: default_chat_session_id(),
        }
    }
}

// ── Config impl ──────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: default_config_dir()
                .unwrap_or_else(|_| PathBuf::from(".costgate"))
                .join(CONFIG_FILE_NAME),
            gateway: GatewayConfig::default(),
            upstream: UpstreamConfig::default(),
            sessions: SessionsConfig::default(),
            mock: MockConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

fn default_config_dir() -> Result<PathBuf> {
    let home = UserDirs::new()
        .map(|u| u.home_dir().to_path_buf())
        .context("Could not find home directory")?;
    Ok(home.join(".costgate"))
}

fn resolve_config_dir() -> Result<PathBuf> {
    match std::env::var("COSTGATE_CONFIG_DIR") {
        Ok(dir) if !dir.trim().is_empty() => Ok(PathBuf::from(dir)),
        _ => default_config_dir(),
    }
}

fn parse_bool_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    pub async fn load_or_init() -> Result<Self> {
        let config_dir = resolve_config_dir()?;
        Self::load_or_init_in(&config_dir).await
    }

    /// Load `config.toml` from `config_dir`, writing defaults on first run.
    pub async fn load_or_init_in(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        fs::create_dir_all(config_dir).await.with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let initialized = !config_path.exists();
        let mut config = if initialized {
            let mut config = Config::default();
            config.config_path = config_path.clone();
            config.save().await?;
            config
        } else {
            let contents = fs::read_to_string(&config_path)
                .await
                .context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_path = config_path.clone();
            config
        };

        config.apply_env_overrides();
        config.validate()?;
        tracing::info!(
            path = %config.config_path.display(),
            initialized,
            "Config loaded"
        );
        Ok(config)
    }

    /// Validate configuration values that would cause runtime failures.
    pub fn validate(&self) -> Result<()> {
        if self.gateway.host.trim().is_empty() {
            anyhow::bail!("gateway.host must not be empty");
        }
        if self.mock.host.trim().is_empty() {
            anyhow::bail!("mock.host must not be empty");
        }
        if self.gateway.max_body_bytes == 0 {
            anyhow::bail!("gateway.max_body_bytes must be greater than 0");
        }

        validate_http_url("upstream.base_url", &self.upstream.base_url)?;
        if let Some(url) = &self.chat.gateway_url {
            validate_http_url("chat.gateway_url", url)?;
        }

        if self.upstream.timeout_secs == 0 {
            anyhow::bail!("upstream.timeout_secs must be greater than 0");
        }
        if self.upstream.connect_timeout_secs == 0 {
            anyhow::bail!("upstream.connect_timeout_secs must be greater than 0");
        }

        if self.chat.session_id.is_empty() {
            anyhow::bail!("chat.session_id must not be empty");
        }

        Ok(())
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Gateway host/port: COSTGATE_GATEWAY_* or HOST/PORT
        if let Some(host) = lookup("COSTGATE_GATEWAY_HOST").or_else(|| lookup("HOST")) {
            if !host.is_empty() {
                self.gateway.host = host;
            }
        }
        if let Some(port_str) = lookup("COSTGATE_GATEWAY_PORT").or_else(|| lookup("PORT")) {
            if let Ok(port) = port_str.parse::<u16>() {
                self.gateway.port = port;
            }
        }

        if let Some(url) = lookup("COSTGATE_UPSTREAM_URL") {
            if !url.is_empty() {
                self.upstream.base_url = url;
            }
        }

        if let Some(raw) = lookup("COSTGATE_MAX_HISTORY") {
            match raw.trim().parse::<usize>() {
                Ok(max) => self.sessions.max_history = max,
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid COSTGATE_MAX_HISTORY"),
            }
        }

        if let Some(port_str) = lookup("COSTGATE_MOCK_PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                self.mock.port = port;
            }
        }

        if let Some(session) = lookup("COSTGATE_SESSION_ID") {
            if !session.is_empty() {
                self.chat.session_id = session;
            }
        }

        // Unbounded history opt-out: COSTGATE_UNBOUNDED_HISTORY=1 clears any cap
        if let Some(flag) = lookup("COSTGATE_UNBOUNDED_HISTORY").as_deref().and_then(parse_bool_flag) {
            if flag {
                self.sessions.max_history = 0;
            }
        }
    }

    /// Gateway URL for the conversation client.
    pub fn chat_gateway_url(&self) -> String {
        self.chat.gateway_url.clone().unwrap_or_else(|| {
            let host = match self.gateway.host.as_str() {
                "0.0.0.0" | "::" => "127.0.0.1",
                other => other,
            };
            format!("http://{host}:{}", self.gateway.port)
        })
    }

    /// Persist the config. The file is staged beside `config_path` and
    /// renamed over it, so readers never observe a half-written file.
    pub async fn save(&self) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        let dir = self
            .config_path
            .parent()
            .context("Config path has no parent directory")?;
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        replace_file(&self.config_path, contents.as_bytes()).await?;
        tracing::debug!(path = %self.config_path.display(), "Config saved");
        Ok(())
    }
}

async fn replace_file(target: &Path, contents: &[u8]) -> Result<()> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let staged = dir.join(format!(".{CONFIG_FILE_NAME}.{}", uuid::Uuid::new_v4().simple()));

    let mut file = OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(&staged)
        .await
        .with_context(|| format!("Failed to stage {}", staged.display()))?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);

    if let Err(e) = fs::rename(&staged, target).await {
        let _ = fs::remove_file(&staged).await;
        return Err(e).with_context(|| format!("Failed to replace {}", target.display()));
    }

    // The rename itself is only durable once the directory entry is flushed.
    #[cfg(unix)]
    {
        let handle = File::open(dir).await?;
        handle
            .sync_all()
            .await
            .with_context(|| format!("Failed to flush {}", dir.display()))?;
    }

    Ok(())
}

fn validate_http_url(field: &str, url: &str) -> Result<()> {
    let parsed = reqwest::Url::parse(url)
        .with_context(|| format!("Invalid {field} URL: '{url}' is not a valid URL"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => anyhow::bail!("Invalid {field} URL scheme '{scheme}'. Allowed: http, https"),
    }
}
