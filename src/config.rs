use crate::runtime::notify::Permission;
use anyhow::{bail, Context, Result};
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

const SERVER_URL_ENV: &str = "CHATSTREAM_SERVER_URL";
const POLL_INTERVAL_ENV: &str = "CHATSTREAM_POLL_INTERVAL_MS";
const CONNECT_TIMEOUT_ENV: &str = "CHATSTREAM_CONNECT_TIMEOUT_SECS";
const NOTIFICATIONS_ENV: &str = "CHATSTREAM_NOTIFICATIONS";
const NOTIFICATION_TITLE_ENV: &str = "CHATSTREAM_NOTIFICATION_TITLE";
const LOG_PATH_ENV: &str = "CHATSTREAM_LOG_PATH";
const DEBUG_PAYLOAD_ENV: &str = "CHATSTREAM_DEBUG_PAYLOAD";

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_NOTIFICATION_TITLE: &str = "chatstream";
const DEFAULT_LOG_FILE: &str = "chatstream.log";

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(250);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
pub struct Config {
    pub server_url: String,
    pub poll_interval: Duration,
    pub connect_timeout: Duration,
    pub notification_permission: Permission,
    pub notification_title: String,
    pub log_path: PathBuf,
    pub debug_payload: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            notification_permission: Permission::Undecided,
            notification_title: DEFAULT_NOTIFICATION_TITLE.to_string(),
            log_path: std::env::temp_dir().join(DEFAULT_LOG_FILE),
            debug_payload: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let poll_interval = match get(POLL_INTERVAL_ENV) {
            Some(raw) => Duration::from_millis(
                raw.parse::<u64>()
                    .with_context(|| format!("{POLL_INTERVAL_ENV} must be milliseconds, got '{raw}'"))?,
            ),
            None => defaults.poll_interval,
        };
        let connect_timeout = match get(CONNECT_TIMEOUT_ENV) {
            Some(raw) => Duration::from_secs(
                raw.parse::<u64>()
                    .with_context(|| format!("{CONNECT_TIMEOUT_ENV} must be seconds, got '{raw}'"))?,
            ),
            None => defaults.connect_timeout,
        };
        let notification_permission = match get(NOTIFICATIONS_ENV).as_deref().map(parse_bool_str) {
            Some(Some(true)) => Permission::Granted,
            Some(Some(false)) => Permission::Denied,
            _ => Permission::Undecided,
        };

        Ok(Self {
            server_url: get(SERVER_URL_ENV).unwrap_or(defaults.server_url),
            poll_interval,
            connect_timeout,
            notification_permission,
            notification_title: get(NOTIFICATION_TITLE_ENV).unwrap_or(defaults.notification_title),
            log_path: get(LOG_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.log_path),
            debug_payload: get(DEBUG_PAYLOAD_ENV)
                .as_deref()
                .and_then(parse_bool_str)
                .unwrap_or(false),
        })
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.server_url)
            .with_context(|| format!("Invalid {SERVER_URL_ENV} '{}'", self.server_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!(
                "Invalid {SERVER_URL_ENV} '{}': expected http:// or https:// URL",
                self.server_url
            );
        }
        if url.scheme() == "http" && !is_loopback_url(&self.server_url) {
            tracing::warn!(
                server_url = %self.server_url,
                "chat server is reached over plain http on a non-local host"
            );
        }

        if self.poll_interval < MIN_POLL_INTERVAL || self.poll_interval > MAX_POLL_INTERVAL {
            bail!(
                "{POLL_INTERVAL_ENV} must be between {} and {} ms (got {})",
                MIN_POLL_INTERVAL.as_millis(),
                MAX_POLL_INTERVAL.as_millis(),
                self.poll_interval.as_millis()
            );
        }

        if self.connect_timeout.is_zero() {
            bail!("{CONNECT_TIMEOUT_ENV} must be at least 1 second");
        }

        Ok(())
    }

    pub fn is_local_server(&self) -> bool {
        is_loopback_url(&self.server_url)
    }
}

pub fn parse_bool_str(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Returns true for localhost, loopback IPv4/IPv6 and 0.0.0.0 URLs.
pub fn is_loopback_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };

    match parsed.host_str() {
        Some(host) => {
            let host = host.trim_matches(|c| c == '[' || c == ']').to_ascii_lowercase();
            host == "localhost" || host == "::1" || host == "0.0.0.0" || host.starts_with("127.")
        }
        None => false,
    }
}
