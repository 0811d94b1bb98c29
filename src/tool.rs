//! Agent-facing report tool.
//!
//! Wraps build → run → normalize behind a single text-returning call. Errors
//! never escape: they are rendered into the returned text so the calling
//! agent can read them and react.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use moka::future::Cache;

use crate::error::ReportError;
use crate::report::{build_request, normalize, parse_report_date, ReportClient, ReportTable};

/// Prefix of every failed tool result.
pub const FAILURE_PREFIX: &str = "Tool execution failed";

/// Arguments of `get_analytics_report`.
#[derive(Debug, Clone)]
pub struct ReportToolArgs {
    pub metrics: Vec<String>,
    pub dimensions: Vec<String>,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    dimensions: Vec<String>,
    metrics: Vec<String>,
    start: NaiveDate,
    end: NaiveDate,
}

/// Per-session state owned by the caller and passed into every tool call.
///
/// Identical calls in flight at the same time share one backend request.
#[derive(Debug)]
pub struct ReportSession {
    results: Cache<CacheKey, String>,
}

impl ReportSession {
    pub fn new() -> Self {
        Self {
            results: Cache::builder().build(),
        }
    }

    /// Number of memoized results.
    #[cfg(test)]
    pub async fn cached_results(&self) -> u64 {
        self.results.run_pending_tasks().await;
        self.results.entry_count()
    }
}

impl Default for ReportSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Report tool bound to a backend client.
#[derive(Clone)]
pub struct ReportTool {
    client: Arc<dyn ReportClient>,
    today: Option<NaiveDate>,
}

impl ReportTool {
    pub fn new(client: Arc<dyn ReportClient>) -> Self {
        Self {
            client,
            today: None,
        }
    }

    /// Pin the date relative dates resolve against.
    #[cfg(test)]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Run a report and describe it as text. Never fails; see [`FAILURE_PREFIX`].
    pub async fn get_analytics_report(&self, session: &ReportSession, args: ReportToolArgs) -> String {
        let today = self.today();
        let (start, end) = match (
            parse_report_date(&args.start_date, today),
            parse_report_date(&args.end_date, today),
        ) {
            (Ok(start), Ok(end)) => (start, end),
            (Err(e), _) | (_, Err(e)) => return failure(&ReportError::from(e)),
        };

        let key = CacheKey {
            dimensions: args.dimensions,
            metrics: args.metrics,
            start,
            end,
        };

        // Failed loads are not stored, so the next call retries.
        let load = async {
            tracing::debug!(?key, "Report not in session cache, running it");
            self.run(&key).await
        };
        match session.results.try_get_with(key.clone(), load).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Report tool call failed");
                failure(&e)
            }
        }
    }

    async fn run(&self, key: &CacheKey) -> Result<String, ReportError> {
        let request = build_request(
            key.dimensions.iter().cloned(),
            key.metrics.iter().cloned(),
            key.start,
            key.end,
            None,
        )?;
        let raw = self.client.run_report(&request).await?;
        let table = normalize(&raw, &request.dimensions, &request.metrics)?;
        Ok(describe(&table, key.start, key.end))
    }
}

impl std::fmt::Debug for ReportTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportTool")
            .field("today", &self.today)
            .finish()
    }
}

fn failure(error: &ReportError) -> String {
    format!("{}: {}", FAILURE_PREFIX, error)
}

/// Text block handed back to the agent.
fn describe(table: &ReportTable, start: NaiveDate, end: NaiveDate) -> String {
    if table.is_empty() {
        return format!(
            "GA4 report for {} to {} returned no data for the selected criteria (columns: {}).",
            start,
            end,
            table.columns.join(", ")
        );
    }

    let mut text = format!(
        "GA4 report for {} to {} ({} rows):\n\n{}",
        start,
        end,
        table.rows.len(),
        table
    );
    if let (true, Some(total)) = (table.is_truncated(), table.total_rows) {
        text.push_str(&format!(
            "\nNote: showing {} of {} matching rows.",
            table.rows.len(),
            total
        ));
    }
    if table.sampled {
        text.push_str("\nNote: this data is sampled and may not be exact.");
    }
    text
}
