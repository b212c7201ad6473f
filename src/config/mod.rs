//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "rotta";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_ADMIN_HOST: &str = "127.0.0.1";
const DEFAULT_PUBLIC_PORT: u16 = 3000;
const DEFAULT_ADMIN_PORT: u16 = 3001;
const DEFAULT_PUBLIC_URL: &str = "http://localhost:3000";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_CACHE_TTL_SECONDS: u64 = 900;

/// Command-line arguments for the rotta binary.
#[derive(Debug, Parser)]
#[command(name = "rotta", version, about = "Rotta redirect and sitemap server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "ROTTA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the rotta HTTP services.
    Serve(Box<ServeArgs>),
    /// Apply pending database migrations and exit.
    Migrate(MigrateArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the public listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the administrative listener host.
    #[arg(long = "server-admin-host", value_name = "HOST")]
    pub server_admin_host: Option<String>,

    /// Override the public listener port.
    #[arg(long = "server-public-port", value_name = "PORT")]
    pub public_port: Option<u16>,

    /// Override the administrative listener port.
    #[arg(long = "server-admin-port", value_name = "PORT")]
    pub admin_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the canonical public site URL.
    #[arg(long = "site-public-url", value_name = "URL")]
    pub site_public_url: Option<String>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub site: SiteSettings,
    pub redirects: RedirectSettings,
    pub sitemap: SitemapSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub public_addr: SocketAddr,
    pub admin_addr: SocketAddr,
    pub graceful_shutdown: Duration,
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
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    /// Canonical base for generated absolute URLs, no trailing slash.
    pub public_url: String,
}

#[derive(Debug, Clone)]
pub struct RedirectSettings {
    pub auto_redirect_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct SitemapSettings {
    pub enabled: bool,
    pub cache_enabled: bool,
    pub cache_ttl_seconds: u64,
    /// Freshness window in months; 0 disables the cutoff.
    pub freshness_window_months: u32,
    pub excluded_types: Vec<String>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("configuration could not be assembled: {0}")]
    Build(#[from] config::ConfigError),
    #[error("configuration key `{key}` is invalid: {reason}")]
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

    builder = builder.add_source(Environment::with_prefix("ROTTA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Migrate(args)) => raw.apply_database_override(&args.database),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

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
    database: RawDatabaseSettings,
    site: RawSiteSettings,
    redirects: RawRedirectSettings,
    sitemap: RawSitemapSettings,
}

fn assign_if_set<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
    if value.is_some() {
        target.clone_from(value);
    }
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        assign_if_set(&mut self.server.host, &overrides.server_host);
        assign_if_set(&mut self.server.admin_host, &overrides.server_admin_host);
        assign_if_set(&mut self.server.public_port, &overrides.public_port);
        assign_if_set(&mut self.server.admin_port, &overrides.admin_port);
        assign_if_set(
            &mut self.server.graceful_shutdown_seconds,
            &overrides.server_graceful_shutdown_seconds,
        );
        assign_if_set(&mut self.logging.level, &overrides.log_level);
        assign_if_set(&mut self.logging.json, &overrides.log_json);
        assign_if_set(&mut self.database.url, &overrides.database_url);
        assign_if_set(
            &mut self.database.max_connections,
            &overrides.database_max_connections,
        );
        assign_if_set(&mut self.site.public_url, &overrides.site_public_url);
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        assign_if_set(&mut self.database.url, &overrides.database_url);
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            site,
            redirects,
            sitemap,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            site: build_site_settings(site)?,
            redirects: build_redirect_settings(redirects),
            sitemap: build_sitemap_settings(sitemap)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let admin_host = server
        .admin_host
        .unwrap_or_else(|| DEFAULT_ADMIN_HOST.to_string());

    let public_port = require_port(server.public_port, DEFAULT_PUBLIC_PORT, "server.public_port")?;
    let admin_port = require_port(server.admin_port, DEFAULT_ADMIN_PORT, "server.admin_port")?;

    let public_addr = parse_socket_addr(&host, public_port)
        .map_err(|reason| LoadError::invalid("server.public_addr", reason))?;
    let admin_addr = parse_socket_addr(&admin_host, admin_port)
        .map_err(|reason| LoadError::invalid("server.admin_addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        public_addr,
        admin_addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn require_port(value: Option<u16>, default: u16, key: &'static str) -> Result<u16, LoadError> {
    let port = value.unwrap_or(default);
    if port == 0 {
        return Err(LoadError::invalid(key, "port must be greater than zero"));
    }
    Ok(port)
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = logging
        .level
        .as_deref()
        .map(LevelFilter::from_str)
        .transpose()
        .map_err(|err| LoadError::invalid("logging.level", format!("failed to parse: {err}")))?
        .unwrap_or(LevelFilter::INFO);

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database
        .url
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    let max_connections = NonZeroU32::new(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
    )
    .ok_or_else(|| LoadError::invalid("database.max_connections", "must be greater than zero"))?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let raw = site
        .public_url
        .unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string());
    let parsed = url::Url::parse(raw.trim())
        .map_err(|err| LoadError::invalid("site.public_url", format!("failed to parse: {err}")))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(LoadError::invalid(
            "site.public_url",
            "scheme must be http or https",
        ));
    }

    Ok(SiteSettings {
        public_url: raw.trim().trim_end_matches('/').to_string(),
    })
}

fn build_redirect_settings(redirects: RawRedirectSettings) -> RedirectSettings {
    RedirectSettings {
        auto_redirect_enabled: redirects.auto_redirect_enabled.unwrap_or(true),
    }
}

fn build_sitemap_settings(sitemap: RawSitemapSettings) -> Result<SitemapSettings, LoadError> {
    let cache_ttl_seconds = sitemap
        .cache_ttl_seconds
        .unwrap_or(DEFAULT_CACHE_TTL_SECONDS);
    if cache_ttl_seconds == 0 {
        return Err(LoadError::invalid(
            "sitemap.cache_ttl_seconds",
            "must be greater than zero",
        ));
    }

    Ok(SitemapSettings {
        enabled: sitemap.enabled.unwrap_or(true),
        cache_enabled: sitemap.cache_enabled.unwrap_or(true),
        cache_ttl_seconds,
        freshness_window_months: sitemap.freshness_window_months.unwrap_or(0),
        excluded_types: sitemap.excluded_types.unwrap_or_default(),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    admin_host: Option<String>,
    public_port: Option<u16>,
    admin_port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    public_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRedirectSettings {
    auto_redirect_enabled: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSitemapSettings {
    enabled: Option<bool>,
    cache_enabled: Option<bool>,
    cache_ttl_seconds: Option<u64>,
    freshness_window_months: Option<u32>,
    excluded_types: Option<Vec<String>>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    format!("{host}:{port}")
        .parse()
        .map_err(|err| format!("cannot parse `{host}:{port}` as a socket address: {err}"))
}
