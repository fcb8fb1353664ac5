//! `filesync.toml` loading.
//!
//! Every key is optional; an absent file yields the defaults below.
//!
//! ```toml
//! [server]
//! http_address = "0.0.0.0:9336"
//! https_address = "0.0.0.0:9335"
//!
//! [paths]
//! source_dir = "data"
//! destination_dir = "data"
//!
//! [tls]
//! cert = "certs/node.crt"
//! key = "certs/node.key"
//! ca = "certs/ca.crt"
//!
//! [sync]
//! address = "localhost:9335"
//! timeout_secs = 30
//! retry_cap = 5
//! retry_timeout_secs = 5
//! idempotent_retry_cap = 2
//!
//! [redis]
//! enabled = false
//! url = "redis://127.0.0.1:6379"
//! tls = false
//! tls_insecure = false
//! key = "file-sync"
//! backoff_secs = 2
//! tick_millis = 1000
//! batch_size = 10
//! execute_queue = true
//!
//! [log]
//! level = "info"
//! format = "pretty"
//! ```

use crate::error::{CliError, CliResult};
use crate::logging::LogFormat;
use filesync_core::{ExecutorConfig, DEFAULT_IDEMPOTENT_RETRY_CAP};
use filesync_engine::{PemFiles, RetryConfig, TransportConfig, DEFAULT_DESTINATION};
use filesync_queue::{PollerConfig, QueueConfig, RedisDelayQueue, DEFAULT_QUEUE_KEY};
use filesync_server::ServerConfig;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default config file name.
pub const DEFAULT_CONFIG_FILE: &str = "filesync.toml";

/// Node configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Listener addresses.
    pub server: ServerSection,
    /// Source and destination roots.
    pub paths: PathsSection,
    /// Certificate files.
    pub tls: TlsSection,
    /// Outbound delivery.
    pub sync: SyncSection,
    /// Delay queue backend.
    pub redis: RedisSection,
    /// Logging.
    pub log: LogSection,
}

/// `[server]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    /// Plain HTTP queue endpoint.
    pub http_address: String,
    /// Mutual-TLS sync endpoint.
    pub https_address: String,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self {
            http_address: defaults.queue_addr.to_string(),
            https_address: defaults.sync_addr.to_string(),
            max_body_bytes: defaults.max_body_bytes,
        }
    }
}

/// `[paths]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsSection {
    /// Root that instructions read from.
    pub source_dir: PathBuf,
    /// Root that received operations are applied to.
    pub destination_dir: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("data"),
            destination_dir: PathBuf::from("data"),
        }
    }
}

/// `[tls]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TlsSection {
    /// PEM certificate chain presented to peers.
    pub cert: PathBuf,
    /// PEM private key.
    pub key: PathBuf,
    /// PEM trust root.
    pub ca: PathBuf,
}

impl Default for TlsSection {
    fn default() -> Self {
        Self {
            cert: PathBuf::from("certs/node.crt"),
            key: PathBuf::from("certs/node.key"),
            ca: PathBuf::from("certs/ca.crt"),
        }
    }
}

/// `[sync]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSection {
    /// Peer that operations are delivered to.
    pub address: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Delivery attempts before an operation is abandoned.
    pub retry_cap: u32,
    /// Pause between attempts without a queue.
    pub retry_timeout_secs: u64,
    /// Failed attempts after which a missing delete/move target counts as done.
    pub idempotent_retry_cap: u32,
}

impl Default for SyncSection {
    fn default() -> Self {
        let retry = RetryConfig::default();
        Self {
            address: DEFAULT_DESTINATION.to_string(),
            timeout_secs: TransportConfig::default().timeout.as_secs(),
            retry_cap: retry.max_attempts,
            retry_timeout_secs: retry.retry_timeout.as_secs(),
            idempotent_retry_cap: DEFAULT_IDEMPOTENT_RETRY_CAP,
        }
    }
}

/// `[redis]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RedisSection {
    /// Route submissions through the Redis delay queue.
    pub enabled: bool,
    /// Connection URL, `redis://` or `rediss://`.
    pub url: String,
    /// Connect over TLS even when `url` says `redis://`.
    pub tls: bool,
    /// Skip server certificate verification on TLS connections.
    pub tls_insecure: bool,
    /// Sorted-set key.
    pub key: String,
    /// Backoff added per failed attempt.
    pub backoff_secs: u64,
    /// Poll interval.
    pub tick_millis: u64,
    /// Entries claimed per tick.
    pub batch_size: usize,
    /// Run the poller on this node.
    pub execute_queue: bool,
}

impl Default for RedisSection {
    fn default() -> Self {
        let queue = QueueConfig::default();
        let poller = PollerConfig::default();
        Self {
            enabled: false,
            url: "redis://127.0.0.1:6379".to_string(),
            tls: false,
            tls_insecure: false,
            key: DEFAULT_QUEUE_KEY.to_string(),
            backoff_secs: queue.backoff_unit.as_secs(),
            tick_millis: poller.tick.as_millis() as u64,
            batch_size: poller.batch_size,
            execute_queue: true,
        }
    }
}

/// `[log]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSection {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl RedisSection {
    /// URL handed to the client, with the TLS options folded in.
    pub fn connection_url(&self) -> String {
        let mut url = match self.url.strip_prefix("redis://") {
            Some(rest) if self.tls => format!("rediss://{rest}"),
            _ => self.url.clone(),
        };
        if self.tls_insecure && url.starts_with("rediss://") && !url.contains('#') {
            url.push_str("#insecure");
        }
        url
    }
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Loads `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> CliResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text).map_err(|source| CliError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parses TOML text.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Checks values serde cannot.
    pub fn validate(&self) -> CliResult<()> {
        if self.sync.retry_cap == 0 {
            return Err(CliError::InvalidConfig(
                "sync.retry_cap must be at least 1".into(),
            ));
        }
        if self.redis.batch_size == 0 {
            return Err(CliError::InvalidConfig(
                "redis.batch_size must be positive".into(),
            ));
        }
        if self.redis.tick_millis == 0 {
            return Err(CliError::InvalidConfig(
                "redis.tick_millis must be positive".into(),
            ));
        }
        if self.redis.tls_insecure && !self.redis.connection_url().starts_with("rediss://") {
            return Err(CliError::InvalidConfig(
                "redis.tls_insecure needs a TLS connection".into(),
            ));
        }
        if self.redis.enabled {
            RedisDelayQueue::client(&self.redis.connection_url())
                .map_err(|e| CliError::InvalidConfig(format!("redis.url: {e}")))?;
        }
        if self.sync.address.is_empty() {
            return Err(CliError::InvalidConfig("sync.address is empty".into()));
        }
        self.server_config().map(|_| ())
    }

    /// Listener settings.
    pub fn server_config(&self) -> CliResult<ServerConfig> {
        let sync_addr = parse_addr("server.https_address", &self.server.https_address)?;
        let queue_addr = parse_addr("server.http_address", &self.server.http_address)?;
        Ok(ServerConfig::new(sync_addr, queue_addr).with_max_body_bytes(self.server.max_body_bytes))
    }

    /// Receiver-side executor settings.
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::new(&self.paths.destination_dir)
            .with_retry_cap(self.sync.idempotent_retry_cap)
    }

    /// Outbound client settings.
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig::new(&self.sync.address)
            .with_timeout(Duration::from_secs(self.sync.timeout_secs))
    }

    /// Sender retry policy.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.sync.retry_cap)
            .with_retry_timeout(Duration::from_secs(self.sync.retry_timeout_secs))
    }

    /// Delay queue settings.
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig::new(&self.redis.key)
            .with_backoff_unit(Duration::from_secs(self.redis.backoff_secs))
    }

    /// Poll loop settings.
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig::default()
            .with_tick(Duration::from_millis(self.redis.tick_millis))
            .with_batch_size(self.redis.batch_size)
    }

    /// Certificate files for both listener and client.
    pub fn pem_files(&self) -> PemFiles {
        PemFiles::new(&self.tls.cert, &self.tls.key, &self.tls.ca)
    }
}

fn parse_addr(name: &str, value: &str) -> CliResult<SocketAddr> {
    value
        .parse()
        .map_err(|e| CliError::InvalidConfig(format!("{name} {value:?}: {e}")))
}
