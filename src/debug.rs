//! Debug trace of MCP tool traffic.

use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Appends tool calls, results and errors to a trace file when enabled.
pub struct DebugLogger {
    enabled: bool,
    trace_file: Option<Mutex<File>>,
    trace_path: Option<PathBuf>,
}

impl DebugLogger {
    /// Create a new debug logger writing under the system temp directory.
    pub fn new(enabled: bool) -> Self {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = std::env::temp_dir().join(format!("ga4_report_mcp_trace_{}.log", timestamp));
        Self::with_path(enabled, &path)
    }

    fn with_path(enabled: bool, path: &Path) -> Self {
        let (trace_file, trace_path) = if enabled {
            match OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
            {
                Ok(file) => (Some(Mutex::new(file)), Some(path.to_path_buf())),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to create trace file");
                    (None, None)
                }
            }
        } else {
            (None, None)
        };

        Self {
            enabled,
            trace_file,
            trace_path,
        }
    }

    /// Get the trace file path.
    pub fn trace_path(&self) -> Option<&PathBuf> {
        self.trace_path.as_ref()
    }

    /// Log a message to the trace file.
    pub fn log(&self, message: &str) {
        if !self.enabled {
            return;
        }

        tracing::debug!("{}", message);

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        if let Some(ref file) = self.trace_file {
            if let Ok(mut f) = file.lock() {
                let _ = writeln!(f, "[{}] {}", timestamp, message);
                let _ = f.flush();
            }
        }
    }

    /// Log a tool call.
    pub fn log_tool_call(&self, tool_name: &str, params: &serde_json::Value) {
        if !self.enabled {
            return;
        }

        self.log(&format!(
            "TOOL CALL: {} | params: {}",
            tool_name,
            truncate_json(params, 1000)
        ));
    }

    /// Log a tool result.
    pub fn log_tool_result(&self, tool_name: &str, result: &serde_json::Value) {
        if !self.enabled {
            return;
        }

        self.log(&format!(
            "TOOL RESULT: {} | result: {}",
            tool_name,
            truncate_json(result, 1000)
        ));
    }

    /// Log an error.
    pub fn log_error(&self, context: &str, error: &str) {
        if !self.enabled {
            return;
        }

        self.log(&format!("ERROR [{}]: {}", context, error));
    }
}

impl std::fmt::Debug for DebugLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugLogger")
            .field("enabled", &self.enabled)
            .field("trace_path", &self.trace_path)
            .finish()
    }
}

/// Truncate a JSON value to at most `max_len` characters.
fn truncate_json(value: &serde_json::Value, max_len: usize) -> String {
    let s = value.to_string();
    match s.char_indices().nth(max_len) {
        Some((idx, _)) => format!("{}...(truncated)", &s[..idx]),
        None => s,
    }
}
