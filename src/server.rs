//! MCP Server implementation with GA4 report tools.

use std::borrow::Cow;
use std::sync::Arc;

use chrono::Local;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, ErrorCode, ErrorData as McpError, Implementation,
        ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    schemars::{self, JsonSchema},
    tool, tool_handler, tool_router, ServerHandler,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::debug::DebugLogger;
use crate::error::ReportError;
use crate::report::catalog::field_catalog;
use crate::report::{
    normalize, parse_report_date, FilterOptions, ReportClient, ReportRequest, ReportTable,
};
use crate::tool::{ReportSession, ReportTool, ReportToolArgs};

/// GA4 Report MCP Server.
#[derive(Clone)]
pub struct Ga4ReportServer {
    client: Arc<dyn ReportClient>,
    report_tool: ReportTool,
    session: Arc<ReportSession>,
    debug: Arc<DebugLogger>,
    tool_router: ToolRouter<Self>,
}

impl Ga4ReportServer {
    pub fn new(client: Arc<dyn ReportClient>, debug: Arc<DebugLogger>) -> Self {
        Self {
            report_tool: ReportTool::new(client.clone()),
            client,
            session: Arc::new(ReportSession::new()),
            debug,
            tool_router: Self::tool_router(),
        }
    }

    /// Build, run and normalize a form-style report.
    async fn run_form_report(&self, params: RunReportParams) -> Result<ReportTable, ReportError> {
        let today = Local::now().date_naive();
        let start = parse_report_date(&params.start_date, today)?;
        let end = parse_report_date(&params.end_date, today)?;

        let filter = FilterOptions {
            landing_page: params.landing_page,
            channel_group: params.channel_group,
            device_category: params.device_category,
        }
        .to_filter();

        let request = ReportRequest::builder()
            .dimensions(params.dimensions)
            .metrics(params.metrics)
            .date_range(start, end)
            .filter(filter)
            .build()?;
        tracing::debug!(columns = ?request.columns(), filter = ?request.filter, "Running form report");

        let raw = self.client.run_report(&request).await?;
        Ok(normalize(&raw, &request.dimensions, &request.metrics)?)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert a pipeline error to McpError. Caller mistakes map to invalid params.
fn to_mcp_error(e: ReportError) -> McpError {
    let code = match e {
        ReportError::Validation(_) => ErrorCode::INVALID_PARAMS,
        ReportError::Client(_) => ErrorCode::INTERNAL_ERROR,
    };
    McpError {
        code,
        message: Cow::from(e.to_string()),
        data: None,
    }
}

fn to_json_text<T: Serialize>(value: &T) -> Result<String, McpError> {
    serde_json::to_string_pretty(value).map_err(|e| McpError {
        code: ErrorCode::INTERNAL_ERROR,
        message: Cow::from(e.to_string()),
        data: None,
    })
}

// ============================================================================
// Tool Parameter Structs
// ============================================================================

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetAnalyticsReportParams {
    /// Metric names, e.g. ["sessions", "activeUsers"]
    pub metrics: Vec<String>,
    /// Dimension names, e.g. ["pagePath", "sessionDefaultChannelGroup"]
    pub dimensions: Vec<String>,
    /// Start date (YYYY-MM-DD, today, yesterday or NdaysAgo)
    pub start_date: String,
    /// End date (YYYY-MM-DD, today, yesterday or NdaysAgo)
    pub end_date: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RunReportParams {
    /// Dimension names in column order (default: pagePath, firstUserDefaultChannelGroup)
    #[serde(default = "default_form_dimensions")]
    pub dimensions: Vec<String>,
    /// Metric names in column order (default: sessions, activeUsers)
    #[serde(default = "default_form_metrics")]
    pub metrics: Vec<String>,
    /// Start date (YYYY-MM-DD, today, yesterday or NdaysAgo; default: 7daysAgo)
    #[serde(default = "default_form_start_date")]
    pub start_date: String,
    /// End date (YYYY-MM-DD, today, yesterday or NdaysAgo; default: today)
    #[serde(default = "default_form_end_date")]
    pub end_date: String,
    /// Only landing pages containing this path (e.g., "/blog/my-post"); blank for all
    #[serde(default)]
    pub landing_page: Option<String>,
    /// Exact session channel group (e.g., "Organic Search"); blank or "All" for all
    #[serde(default)]
    pub channel_group: Option<String>,
    /// Exact device category (e.g., "mobile"); blank or "All" for all
    #[serde(default)]
    pub device_category: Option<String>,
}

fn default_form_dimensions() -> Vec<String> {
    vec!["pagePath".to_string(), "firstUserDefaultChannelGroup".to_string()]
}

fn default_form_metrics() -> Vec<String> {
    vec!["sessions".to_string(), "activeUsers".to_string()]
}

fn default_form_start_date() -> String {
    "7daysAgo".to_string()
}

fn default_form_end_date() -> String {
    "today".to_string()
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl Ga4ReportServer {
    #[tool(description = "Fetch a Google Analytics 4 report for the given metrics, dimensions and date range. Returns a text table; failures are reported as text starting with 'Tool execution failed'.")]
    async fn get_analytics_report(&self, Parameters(params): Parameters<GetAnalyticsReportParams>) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("get_analytics_report", &json!(params));

        let args = ReportToolArgs {
            metrics: params.metrics,
            dimensions: params.dimensions,
            start_date: params.start_date,
            end_date: params.end_date,
        };
        let text = self.report_tool.get_analytics_report(&self.session, args).await;

        self.debug.log_tool_result("get_analytics_report", &json!(text));

        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(description = "Run a Google Analytics 4 report with optional landing page, channel group and device category filters. Returns columns, rows and a sampled flag as JSON.")]
    async fn run_report(&self, Parameters(params): Parameters<RunReportParams>) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("run_report", &json!(params));

        let table = match self.run_form_report(params).await {
            Ok(table) => table,
            Err(e) => {
                self.debug.log_error("run_report", &e.to_string());
                return Err(to_mcp_error(e));
            }
        };

        let json = serde_json::to_value(&table).map_err(|e| to_mcp_error(ReportError::Client(e.into())))?;
        self.debug.log_tool_result("run_report", &json);

        Ok(CallToolResult::success(vec![Content::text(to_json_text(&json)?)]))
    }

    #[tool(description = "List commonly used GA4 dimensions and metrics. Other valid GA4 field names are accepted too.")]
    async fn list_report_fields(&self) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("list_report_fields", &json!({}));

        let catalog = field_catalog();

        Ok(CallToolResult::success(vec![Content::text(to_json_text(&catalog)?)]))
    }
}

// ============================================================================
// Server Handler Implementation
// ============================================================================

#[tool_handler]
impl ServerHandler for Ga4ReportServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "GA4 Report MCP Server - Run Google Analytics 4 reports over a configured property. \
                Use get_analytics_report for narrated tables, run_report for filtered JSON tables, \
                and list_report_fields for common field names.".to_string()
            ),
        }
    }
}
