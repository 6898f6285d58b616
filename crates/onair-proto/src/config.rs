use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::i18n::Locale;
use super::platform;
use super::protocol::Candidate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default = "default_streams")]
    pub streams: Vec<Candidate>,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    #[serde(default)]
    pub mpv: MpvConfig,
}

/// Timing and presentation knobs for the player core. Durations are in
/// milliseconds so the TOML stays flat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_reconnect_ceiling_ms")]
    pub reconnect_ceiling_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub fetch_timeout_ms: u64,
    #[serde(default)]
    pub locale: Locale,
    #[serde(default = "default_true")]
    pub autoplay: bool,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

/// Now-playing API endpoints, tried in list order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_endpoints")]
    pub endpoints: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,
    #[serde(default = "default_proxy_timeout_ms")]
    pub timeout_ms: u64,
    /// Skip TLS certificate verification for the upstream (self-signed
    /// broadcast servers).
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_messages_file")]
    pub messages_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_log_interval_secs")]
    pub log_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpvConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl PlayerConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn reconnect_ceiling(&self) -> Duration {
        Duration::from_millis(self.reconnect_ceiling_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl ApiConfig {
    /// API endpoints as failover candidates; priority is list position.
    pub fn candidates(&self) -> Vec<Candidate> {
        self.endpoints
            .iter()
            .enumerate()
            .map(|(i, url)| Candidate::new(url.clone(), i as i32))
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            player: PlayerConfig::default(),
            streams: default_streams(),
            api: ApiConfig::default(),
            http: HttpConfig::default(),
            proxy: ProxyConfig::default(),
            chat: ChatConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            mpv: MpvConfig::default(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: default_update_interval_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            reconnect_ceiling_ms: default_reconnect_ceiling_ms(),
            probe_timeout_ms: default_timeout_ms(),
            fetch_timeout_ms: default_timeout_ms(),
            locale: Locale::default(),
            autoplay: true,
            volume: default_volume(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoints: default_api_endpoints(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            upstream_url: default_upstream_url(),
            timeout_ms: default_proxy_timeout_ms(),
            accept_invalid_certs: false,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            messages_file: default_messages_file(),
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_interval_secs: default_log_interval_secs(),
        }
    }
}

impl Default for MpvConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}

fn default_update_interval_ms() -> u64 {
    15_000
}

fn default_reconnect_delay_ms() -> u64 {
    3_000
}

fn default_reconnect_ceiling_ms() -> u64 {
    30_000
}

fn default_timeout_ms() -> u64 {
    3_000
}

fn default_proxy_timeout_ms() -> u64 {
    10_000
}

fn default_volume() -> f32 {
    0.7
}

fn default_streams() -> Vec<Candidate> {
    vec![
        Candidate::new(
            "https://wwcat.duckdns.org:8443/listen/algoritm-stream/radio",
            1,
        ),
        Candidate::new("https://wwcat.duckdns.org:8000/radio", 2),
    ]
}

fn default_api_endpoints() -> Vec<String> {
    vec!["https://wwcat.duckdns.org:8443/api/nowplaying/1".to_string()]
}

fn default_upstream_url() -> String {
    "https://wwcat.duckdns.org/api/nowplaying/1".to_string()
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8989
}

fn default_messages_file() -> PathBuf {
    platform::data_dir().join("chat_messages.json")
}

fn default_log_interval_secs() -> u64 {
    60
}

impl Config {
    /// Load from the default location, writing a default file on first run.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> anyhow::Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.http.enabled);
        assert_eq!(config.http.port, 8989);
        assert_eq!(config.http.bind_address, "127.0.0.1");
        assert_eq!(config.player.update_interval(), Duration::from_secs(15));
        assert_eq!(config.player.reconnect_delay(), Duration::from_secs(3));
        assert_eq!(config.player.reconnect_ceiling(), Duration::from_secs(30));
        assert!(config.proxy.upstream_url.starts_with("https://"));
        assert!(config.chat.messages_file.ends_with("onair/chat_messages.json"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [player]
            update_interval_ms = 5000
            locale = "en"

            [[streams]]
            url = "http://a.example/radio"
            priority = 2

            [[streams]]
            url = "http://b.example/radio"
            priority = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.player.update_interval_ms, 5000);
        assert_eq!(config.player.reconnect_delay_ms, 3000);
        assert_eq!(config.player.locale, Locale::En);
        assert_eq!(config.streams.len(), 2);
        assert_eq!(config.api.endpoints.len(), 1);
    }

    #[test]
    fn test_api_candidates_use_list_position() {
        let api = ApiConfig {
            endpoints: vec!["http://one".into(), "http://two".into()],
        };
        let c = api.candidates();
        assert_eq!(c[0].priority, 0);
        assert_eq!(c[1].url, "http://two");
        assert_eq!(c[1].priority, 1);
    }

    #[test]
    fn test_load_from_writes_default_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.http.port, config.http.port);
        assert_eq!(reloaded.streams.len(), config.streams.len());
    }
}
