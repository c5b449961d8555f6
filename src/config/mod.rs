//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    net::SocketAddr,
    num::NonZeroUsize,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::cache::BackendKind;

pub use cli::{CliArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "marscache";
const ENV_PREFIX: &str = "MARSCACHE";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3333;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_CACHE_TTL_SECS: u64 = 60 * 60;
const DEFAULT_CACHE_SWEEP_INTERVAL_SECS: u64 = 60 * 60;
const DEFAULT_CACHE_LOCAL_CAPACITY: u64 = 10_000;
const DEFAULT_SHARED_STORE_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_SHARED_STORE_MAX_IDLE: u64 = 80;
const DEFAULT_SHARED_STORE_MAX_TOTAL: u64 = 12_000;
const DEFAULT_SHARED_STORE_WAIT_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_SHARED_STORE_CONNECT_TIMEOUT_MS: u64 = 1_000;
const SHARED_STORE_SCHEMES: &[&str] = &["redis", "rediss", "redis+unix", "unix"];
const DEFAULT_UPSTREAM_BASE_URL: &str = "https://api.nasa.gov/mars-photos/api/v1/";
const DEFAULT_UPSTREAM_API_KEY: &str = "DEMO_KEY";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
    pub shared_store: SharedStoreSettings,
    pub upstream: UpstreamSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub backend: BackendKind,
    pub ttl: Duration,
    pub sweep_interval: Duration,
    pub local_capacity: NonZeroUsize,
    pub coalesce_misses: bool,
}

#[derive(Debug, Clone)]
pub struct SharedStoreSettings {
    pub url: Url,
    pub max_idle: usize,
    pub max_total: NonZeroUsize,
    pub wait_timeout: Duration,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub base_url: Url,
    pub api_key: String,
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_serve_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
    shared_store: RawSharedStoreSettings,
    upstream: RawUpstreamSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.request_timeout_seconds {
            self.server.request_timeout_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(backend) = overrides.cache_backend.as_ref() {
            self.cache.backend = Some(backend.clone());
        }
        if let Some(seconds) = overrides.cache_ttl_seconds {
            self.cache.ttl_seconds = Some(seconds);
        }
        if let Some(seconds) = overrides.cache_sweep_interval_seconds {
            self.cache.sweep_interval_seconds = Some(seconds);
        }
        if let Some(capacity) = overrides.cache_local_capacity {
            self.cache.local_capacity = Some(capacity);
        }
        if let Some(coalesce) = overrides.cache_coalesce_misses {
            self.cache.coalesce_misses = Some(coalesce);
        }
        if let Some(url) = overrides.shared_store_url.as_ref() {
            self.shared_store.url = Some(url.clone());
        }
        if let Some(max) = overrides.shared_store_max_idle {
            self.shared_store.max_idle = Some(max);
        }
        if let Some(max) = overrides.shared_store_max_total {
            self.shared_store.max_total = Some(max);
        }
        if let Some(url) = overrides.upstream_base_url.as_ref() {
            self.upstream.base_url = Some(url.clone());
        }
        if let Some(key) = overrides.upstream_api_key.as_ref() {
            self.upstream.api_key = Some(key.clone());
        }
        if let Some(seconds) = overrides.upstream_timeout_seconds {
            self.upstream.timeout_seconds = Some(seconds);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            cache,
            shared_store,
            upstream,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            cache: build_cache_settings(cache)?,
            shared_store: build_shared_store_settings(shared_store)?,
            upstream: build_upstream_settings(upstream)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }
    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;
    let request_timeout = non_zero_secs(
        server
            .request_timeout_seconds
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        "server.request_timeout_seconds",
    )?;

    Ok(ServerSettings {
        addr,
        request_timeout,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let backend = match cache.backend {
        Some(raw) => BackendKind::parse(&raw).ok_or_else(|| {
            LoadError::invalid(
                "cache.backend",
                format!("unknown backend `{raw}` (expected `local` or `shared`)"),
            )
        })?,
        None => BackendKind::Local,
    };
    let ttl = non_zero_secs(
        cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS),
        "cache.ttl_seconds",
    )?;
    let sweep_interval = non_zero_secs(
        cache
            .sweep_interval_seconds
            .unwrap_or(DEFAULT_CACHE_SWEEP_INTERVAL_SECS),
        "cache.sweep_interval_seconds",
    )?;
    let local_capacity = non_zero_usize(
        cache.local_capacity.unwrap_or(DEFAULT_CACHE_LOCAL_CAPACITY),
        "cache.local_capacity",
    )?;

    Ok(CacheSettings {
        backend,
        ttl,
        sweep_interval,
        local_capacity,
        coalesce_misses: cache.coalesce_misses.unwrap_or(true),
    })
}

fn build_shared_store_settings(
    shared_store: RawSharedStoreSettings,
) -> Result<SharedStoreSettings, LoadError> {
    let raw_url = shared_store
        .url
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_SHARED_STORE_URL.to_string());
    let url = Url::parse(&raw_url)
        .map_err(|err| LoadError::invalid("shared_store.url", format!("failed to parse: {err}")))?;
    if !SHARED_STORE_SCHEMES.contains(&url.scheme()) {
        return Err(LoadError::invalid(
            "shared_store.url",
            format!("unsupported scheme `{}`", url.scheme()),
        ));
    }

    let max_idle = usize::try_from(
        shared_store
            .max_idle
            .unwrap_or(DEFAULT_SHARED_STORE_MAX_IDLE),
    )
    .map_err(|_| {
        LoadError::invalid(
            "shared_store.max_idle",
            "value exceeds supported range for usize",
        )
    })?;
    let max_total = non_zero_usize(
        shared_store
            .max_total
            .unwrap_or(DEFAULT_SHARED_STORE_MAX_TOTAL),
        "shared_store.max_total",
    )?;
    if max_idle > max_total.get() {
        return Err(LoadError::invalid(
            "shared_store.max_idle",
            "must not exceed shared_store.max_total",
        ));
    }

    let wait_timeout = non_zero_millis(
        shared_store
            .wait_timeout_ms
            .unwrap_or(DEFAULT_SHARED_STORE_WAIT_TIMEOUT_MS),
        "shared_store.wait_timeout_ms",
    )?;
    let connect_timeout = non_zero_millis(
        shared_store
            .connect_timeout_ms
            .unwrap_or(DEFAULT_SHARED_STORE_CONNECT_TIMEOUT_MS),
        "shared_store.connect_timeout_ms",
    )?;

    Ok(SharedStoreSettings {
        url,
        max_idle,
        max_total,
        wait_timeout,
        connect_timeout,
    })
}

fn build_upstream_settings(upstream: RawUpstreamSettings) -> Result<UpstreamSettings, LoadError> {
    let raw_url = upstream
        .base_url
        .unwrap_or_else(|| DEFAULT_UPSTREAM_BASE_URL.to_string());
    let base_url = Url::parse(raw_url.trim())
        .map_err(|err| LoadError::invalid("upstream.base_url", format!("failed to parse: {err}")))?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "upstream.base_url",
            format!("unsupported scheme `{}`", base_url.scheme()),
        ));
    }

    let api_key = upstream
        .api_key
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_UPSTREAM_API_KEY.to_string());
    let timeout = non_zero_secs(
        upstream.timeout_seconds.unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        "upstream.timeout_seconds",
    )?;

    Ok(UpstreamSettings {
        base_url,
        api_key,
        timeout,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    backend: Option<String>,
    ttl_seconds: Option<u64>,
    sweep_interval_seconds: Option<u64>,
    local_capacity: Option<u64>,
    coalesce_misses: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSharedStoreSettings {
    url: Option<String>,
    max_idle: Option<u64>,
    max_total: Option<u64>,
    wait_timeout_ms: Option<u64>,
    connect_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawUpstreamSettings {
    base_url: Option<String>,
    api_key: Option<String>,
    timeout_seconds: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_secs(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}

fn non_zero_millis(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_millis(value))
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
