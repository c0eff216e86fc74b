use super::decode::LineDecodeError;
use crate::config::Config;
use crate::types::ConversationId;
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::path::Path;
use tracing::{debug, error, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "chatstream=info";
const DEBUG_FILTER: &str = "chatstream=debug";

/// Installs the global tracing subscriber, writing to the configured log file.
///
/// The terminal belongs to the TUI, so nothing is written to stderr. Keep the
/// returned guard alive for the life of the process or buffered lines are lost.
pub fn init_logging(config: &Config) -> Result<WorkerGuard> {
    let file = open_log_file(&config.log_path)?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let default_filter = if config.debug_payload {
        DEBUG_FILTER
    } else {
        DEFAULT_FILTER
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(false)
        .with_ansi(false)
        .with_filter(env_filter);

    let _ = tracing_subscriber::registry().with(file_layer).try_init();
    Ok(guard)
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }

    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))
}

pub fn emit_debug_payload(request_url: &str, payload: &Value) {
    let formatted = serde_json::to_string_pretty(payload)
        .unwrap_or_else(|_| "<payload serialization error>".to_string());
    debug!(url = request_url, "request payload\n{formatted}");
}

pub fn emit_stream_parse_error(parse_error: &LineDecodeError) {
    warn!(
        line = parse_error.line(),
        error = %parse_error,
        "skipping malformed stream line"
    );
}

pub fn emit_dropped_partial_line(conversation_id: ConversationId, fragment: &str) {
    debug!(
        %conversation_id,
        fragment,
        "stream ended with an unterminated line; dropping it"
    );
}

pub fn emit_transport_failure(conversation_id: ConversationId, failure: &anyhow::Error) {
    error!(%conversation_id, error = %format!("{failure:#}"), "chat turn failed");
}

pub fn emit_poll_failure(conversation_id: ConversationId, failure: &anyhow::Error) {
    warn!(
        %conversation_id,
        error = %format!("{failure:#}"),
        "message poll failed; retrying next tick"
    );
}
