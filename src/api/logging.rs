use serde_json::Value;
use std::fs::OpenOptions;
use std::io::{IsTerminal, Write};

use crate::util::parse_bool_flag;

const DEFAULT_API_LOG_PATH: &str = "/tmp/gamegen-debug-payload.log";
const DEBUG_PAYLOAD_ENV: &str = "GAMEGEN_DEBUG_PAYLOAD";
const API_LOG_PATH_ENV: &str = "GAMEGEN_API_LOG_PATH";

pub fn debug_payload_enabled() -> bool {
    std::env::var(DEBUG_PAYLOAD_ENV)
        .ok()
        .and_then(parse_bool_flag)
        .unwrap_or(false)
}

pub fn emit_debug_payload(request_url: &str, payload: &Value) {
    let formatted_payload = serde_json::to_string_pretty(payload)
        .unwrap_or_else(|_| "<payload serialization error>".to_string());
    let message = format!(
        "GAMEGEN_API DEBUG payload_request url={request_url}\npayload:\n{formatted_payload}\n"
    );
    emit_log_message(&message);
}

/// A stream event that would not parse; the event is skipped and the
/// stream keeps going, so the details only land in the log.
pub fn emit_sse_parse_error(json_data: &str, parse_error: &serde_json::Error) {
    let message =
        format!("GAMEGEN_API ERROR sse_parse_failed error={parse_error}\ndata:\n{json_data}\n");
    emit_log_message(&message);
}

/// A provider round that ended in an error. The user only sees the fixed
/// reply text for the panel, so the error detail lands in the log.
pub fn emit_round_failure(context: &str, error: &dyn std::fmt::Display) {
    let message = format!("GAMEGEN_API ERROR round_failed context={context} error={error}");
    emit_log_message(&message);
}

fn emit_log_message(message: &str) {
    if let Some(path) = resolve_log_path() {
        if append_log_file(&path, message).is_ok() {
            return;
        }
    }

    eprintln!("{message}");
}

fn resolve_log_path() -> Option<String> {
    std::env::var(API_LOG_PATH_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            if std::io::stderr().is_terminal() {
                Some(DEFAULT_API_LOG_PATH.to_string())
            } else {
                None
            }
        })
}

fn append_log_file(path: &str, message: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(message.as_bytes())
}
