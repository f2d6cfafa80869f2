use anyhow::{Result, ensure};
use config as config_loader;
use dotenvy::dotenv;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Global config structure
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub wallet_api: WalletApiConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Wallet transaction API config
#[derive(Debug, Deserialize, Clone)]
pub struct WalletApiConfig {
    #[serde(default = "WalletApiConfig::default_base_url")]
    pub base_url: String,
    /// Missing key is reported per scan, not at startup
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "WalletApiConfig::default_chain_id")]
    pub chain_id: String,
    /// Sent as `X-Env`
    #[serde(default = "WalletApiConfig::default_env_header")]
    pub env_header: Option<String>,
    #[serde(default = "WalletApiConfig::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl WalletApiConfig {
    fn default_base_url() -> String {
        "https://api.zerion.io/v1/".to_string()
    }
    fn default_chain_id() -> String {
        "monad-test-v2".to_string()
    }
    fn default_env_header() -> Option<String> {
        Some("testnet".to_string())
    }
    fn default_request_timeout_secs() -> u64 {
        30
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for WalletApiConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            api_key: None,
            chain_id: Self::default_chain_id(),
            env_header: Self::default_env_header(),
            request_timeout_secs: Self::default_request_timeout_secs(),
        }
    }
}

/// Scan policy knobs
#[derive(Debug, Deserialize, Clone)]
pub struct ScanConfig {
    #[serde(default = "ScanConfig::default_page_size")]
    pub page_size: u32,
    #[serde(default = "ScanConfig::default_progress_interval_pages")]
    pub progress_interval_pages: u64,
    #[serde(default = "ScanConfig::default_progress_interval_secs")]
    pub progress_interval_secs: u64,
    #[serde(default = "ScanConfig::default_page_delay_millis")]
    pub page_delay_millis: u64,
    #[serde(default = "ScanConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "ScanConfig::default_cooldown_secs")]
    pub cooldown_secs: u64,
}

impl ScanConfig {
    fn default_page_size() -> u32 {
        100
    }
    fn default_progress_interval_pages() -> u64 {
        10
    }
    fn default_progress_interval_secs() -> u64 {
        30
    }
    fn default_page_delay_millis() -> u64 {
        600
    }
    fn default_timeout_secs() -> u64 {
        300
    }
    fn default_cooldown_secs() -> u64 {
        600
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress_interval_secs)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_millis)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            page_size: Self::default_page_size(),
            progress_interval_pages: Self::default_progress_interval_pages(),
            progress_interval_secs: Self::default_progress_interval_secs(),
            page_delay_millis: Self::default_page_delay_millis(),
            timeout_secs: Self::default_timeout_secs(),
            cooldown_secs: Self::default_cooldown_secs(),
        }
    }
}

/// HTTP API config
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "ApiConfig::default_listen_addr")]
    pub listen_addr: String,
    /// Status messages kept for the read endpoint before the oldest is evicted
    #[serde(default = "ApiConfig::default_max_messages")]
    pub max_messages: usize,
}

impl ApiConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:9001".to_string()
    }
    fn default_max_messages() -> usize {
        10_000
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            max_messages: Self::default_max_messages(),
        }
    }
}

/// Logging config
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    #[serde(default = "LoggingConfig::default_to_file")]
    pub to_file: bool,
    #[serde(default = "LoggingConfig::default_file_path")]
    pub file_path: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
    fn default_to_file() -> bool {
        true
    }
    fn default_file_path() -> String {
        "./logs/walletscan.log".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            to_file: Self::default_to_file(),
            file_path: Self::default_file_path(),
        }
    }
}

/// Metrics config
#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "MetricsConfig::default_enable")]
    pub enable: bool,
    #[serde(default = "MetricsConfig::default_prometheus_exporter_port")]
    pub prometheus_exporter_port: u16,
}

impl MetricsConfig {
    fn default_enable() -> bool {
        true
    }
    fn default_prometheus_exporter_port() -> u16 {
        9100
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enable: Self::default_enable(),
            prometheus_exporter_port: Self::default_prometheus_exporter_port(),
        }
    }
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        dotenv().ok(); // Load the .env file

        if !path.as_ref().exists() {
            anyhow::bail!("Config file not found: {:?}", path.as_ref());
        }

        let builder = config_loader::Config::builder()
            .add_source(config_loader::File::from(path.as_ref().to_path_buf()))
            .add_source(
                config_loader::Environment::with_prefix("WALLETSCAN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg = builder.try_deserialize::<AppConfig>()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.scan.page_size > 0, "scan.page_size must be positive");
        ensure!(
            self.scan.progress_interval_pages > 0,
            "scan.progress_interval_pages must be positive"
        );
        ensure!(self.scan.timeout_secs > 0, "scan.timeout_secs must be positive");
        ensure!(
            !self.wallet_api.base_url.trim().is_empty(),
            "wallet_api.base_url must not be empty"
        );
        ensure!(self.api.max_messages > 0, "api.max_messages must be positive");
        self.api
            .listen_addr
            .parse::<SocketAddr>()
            .map_err(|e| anyhow::anyhow!("Invalid api.listen_addr {}: {e}", self.api.listen_addr))?;
        Ok(())
    }
}
