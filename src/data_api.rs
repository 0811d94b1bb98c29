//! GA4 Data API client (`runReport`).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::auth::GoogleAuth;
use crate::config::Config;
use crate::error::{ClientError, ConfigError};
use crate::report::request::MatchKind;
use crate::report::{FilterExpr, RawReport, RawRow, ReportClient, ReportRequest};

// ============================================================================
// Request body
// ============================================================================

#[derive(Debug, Serialize)]
struct NamedField<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireDateRange {
    start_date: String,
    end_date: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireStringFilter<'a> {
    match_type: &'static str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireFilter<'a> {
    field_name: &'a str,
    string_filter: WireStringFilter<'a>,
}

#[derive(Debug, Serialize)]
struct WireFilterList<'a> {
    expressions: Vec<WireFilterExpression<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum WireFilterExpression<'a> {
    Filter(WireFilter<'a>),
    AndGroup(WireFilterList<'a>),
}

impl<'a> From<&'a FilterExpr> for WireFilterExpression<'a> {
    fn from(expr: &'a FilterExpr) -> Self {
        match expr {
            FilterExpr::Condition(condition) => Self::Filter(WireFilter {
                field_name: &condition.field,
                string_filter: WireStringFilter {
                    match_type: match condition.kind {
                        MatchKind::Contains => "CONTAINS",
                        MatchKind::Equals => "EXACT",
                    },
                    value: &condition.value,
                },
            }),
            FilterExpr::And(exprs) => Self::AndGroup(WireFilterList {
                expressions: exprs.iter().map(Self::from).collect(),
            }),
        }
    }
}

/// JSON body of a `runReport` call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReportBody<'a> {
    dimensions: Vec<NamedField<'a>>,
    metrics: Vec<NamedField<'a>>,
    date_ranges: Vec<WireDateRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimension_filter: Option<WireFilterExpression<'a>>,
    limit: u32,
}

impl<'a> RunReportBody<'a> {
    fn new(request: &'a ReportRequest, limit: u32) -> Self {
        Self {
            dimensions: request
                .dimensions
                .iter()
                .map(|name| NamedField { name })
                .collect(),
            metrics: request
                .metrics
                .iter()
                .map(|name| NamedField { name })
                .collect(),
            date_ranges: vec![WireDateRange {
                start_date: request.date_range.start.format("%Y-%m-%d").to_string(),
                end_date: request.date_range.end.format("%Y-%m-%d").to_string(),
            }],
            dimension_filter: request.filter.as_ref().map(WireFilterExpression::from),
            limit,
        }
    }
}

// ============================================================================
// Response body
// ============================================================================

#[derive(Debug, Deserialize)]
struct WireHeader {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireValue {
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRow {
    #[serde(default)]
    dimension_values: Vec<WireValue>,
    #[serde(default)]
    metric_values: Vec<WireValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMetadata {
    #[serde(default)]
    sampling_metadatas: Vec<serde_json::Value>,
}

/// `runReport` response. Rows are omitted entirely when nothing matched.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunReportResponse {
    #[serde(default)]
    dimension_headers: Vec<WireHeader>,
    #[serde(default)]
    metric_headers: Vec<WireHeader>,
    #[serde(default)]
    rows: Vec<WireRow>,
    #[serde(default)]
    row_count: Option<u64>,
    #[serde(default)]
    metadata: Option<WireMetadata>,
}

impl From<RunReportResponse> for RawReport {
    fn from(response: RunReportResponse) -> Self {
        let values =
            |list: Vec<WireValue>| -> Vec<Option<String>> { list.into_iter().map(|v| v.value).collect() };
        Self {
            dimension_headers: response.dimension_headers.into_iter().map(|h| h.name).collect(),
            metric_headers: response.metric_headers.into_iter().map(|h| h.name).collect(),
            rows: response
                .rows
                .into_iter()
                .map(|row| RawRow {
                    dimension_values: values(row.dimension_values),
                    metric_values: values(row.metric_values),
                })
                .collect(),
            sampled: response
                .metadata
                .map_or(false, |m| !m.sampling_metadatas.is_empty()),
            total_rows: response.row_count,
        }
    }
}

/// Google API error envelope.
#[derive(Debug, Deserialize)]
struct GoogleErrorResponse {
    error: GoogleErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

/// HTTP client for the GA4 Data API.
#[derive(Clone)]
pub struct DataApiClient {
    run_report_url: String,
    http_client: Client,
    auth: GoogleAuth,
    timeout: Duration,
    row_limit: u32,
}

impl DataApiClient {
    /// Create a new Data API client for the configured property.
    pub fn new(config: &Config, auth: GoogleAuth) -> Result<Self, ConfigError> {
        let timeout = config.timeout();
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            run_report_url: config.run_report_url()?,
            http_client,
            auth,
            timeout,
            row_limit: config.row_limit,
        })
    }

    /// Map a transport error, keeping timeouts distinguishable.
    fn request_error(&self, error: reqwest::Error) -> ClientError {
        if error.is_timeout() {
            ClientError::Timeout(self.timeout)
        } else {
            ClientError::Request(error)
        }
    }

    /// Handle HTTP response and parse JSON.
    async fn handle_response(&self, response: reqwest::Response) -> Result<RawReport, ClientError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.request_error(e))?;

        if !status.is_success() {
            tracing::warn!(%status, body = %truncate(&body, 500), "runReport failed");
            return Err(parse_error_response(status, &body));
        }

        tracing::debug!(body = %truncate(&body, 500), "runReport response");
        parse_report(&body)
    }
}

#[async_trait]
impl ReportClient for DataApiClient {
    async fn run_report(&self, request: &ReportRequest) -> Result<RawReport, ClientError> {
        let body = RunReportBody::new(request, self.row_limit);
        tracing::debug!(url = %self.run_report_url, "runReport request");

        let token = self.auth.get_token().await?;

        let response = self
            .http_client
            .post(&self.run_report_url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        self.handle_response(response).await
    }
}

/// Parse a successful `runReport` body.
fn parse_report(body: &str) -> Result<RawReport, ClientError> {
    let response: RunReportResponse = serde_json::from_str(body)?;
    Ok(response.into())
}

/// Parse error response.
fn parse_error_response(status: StatusCode, body: &str) -> ClientError {
    match serde_json::from_str::<GoogleErrorResponse>(body) {
        Ok(error) => ClientError::Api {
            status,
            code: error
                .error
                .status
                .unwrap_or_else(|| status.as_u16().to_string()),
            message: error.error.message,
        },
        Err(_) => ClientError::Http {
            status,
            body: body.to_string(),
        },
    }
}

fn truncate(body: &str, max_len: usize) -> String {
    match body.char_indices().nth(max_len) {
        Some((idx, _)) => format!("{}...(truncated)", &body[..idx]),
        None => body.to_string(),
    }
}

impl std::fmt::Debug for DataApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataApiClient")
            .field("run_report_url", &self.run_report_url)
            .field("row_limit", &self.row_limit)
            .finish()
    }
}
