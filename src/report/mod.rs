//! Report pipeline: request building, backend interface, normalization.

pub mod catalog;
pub mod client;
pub mod request;
pub mod table;

// Re-export commonly used types
pub use client::ReportClient;
pub use request::{build_request, parse_report_date, FilterExpr, FilterOptions, ReportRequest};
pub use table::{normalize, RawReport, RawRow, ReportTable};
