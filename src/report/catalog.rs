//! Common GA4 fields offered to callers as suggestions.
//!
//! Requests are free to use any other field name.

use serde::Serialize;

pub const DIMENSIONS: &[&str] = &[
    "pagePath",
    "landingPage",
    "firstUserDefaultChannelGroup",
    "sessionDefaultChannelGroup",
    "country",
    "city",
    "deviceCategory",
    "browser",
    "operatingSystem",
    "fullPageUrl",
    "pageTitle",
    "source",
    "medium",
];

pub const METRICS: &[&str] = &[
    "sessions",
    "activeUsers",
    "newUsers",
    "screenPageViews",
    "engagementRate",
    "averageSessionDuration",
    "conversions",
    "totalRevenue",
];

/// Sorted field lists, as shown in pickers.
#[derive(Debug, Serialize)]
pub struct FieldCatalog {
    pub dimensions: Vec<&'static str>,
    pub metrics: Vec<&'static str>,
}

pub fn field_catalog() -> FieldCatalog {
    let mut dimensions = DIMENSIONS.to_vec();
    dimensions.sort_unstable();
    let mut metrics = METRICS.to_vec();
    metrics.sort_unstable();
    FieldCatalog {
        dimensions,
        metrics,
    }
}
