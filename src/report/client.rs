//! Report backend interface.

use async_trait::async_trait;

use super::request::ReportRequest;
use super::table::RawReport;
use crate::error::ClientError;

/// A backend that executes report requests.
///
/// Implementations make exactly one backend call per invocation and never
/// retry; retrying is left to the caller.
#[async_trait]
pub trait ReportClient: Send + Sync {
    async fn run_report(&self, request: &ReportRequest) -> Result<RawReport, ClientError>;
}
