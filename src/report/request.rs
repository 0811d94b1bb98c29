//! Report request builder and filter composition.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::error::ValidationError;

/// Dimension targeted by the landing page filter.
pub const LANDING_PAGE_FIELD: &str = "landingPage";

/// Dimension targeted by the channel group filter.
pub const CHANNEL_GROUP_FIELD: &str = "sessionDefaultChannelGroup";

/// Dimension targeted by the device category filter.
pub const DEVICE_CATEGORY_FIELD: &str = "deviceCategory";

/// Optional filter value meaning "do not filter".
pub const ALL_SENTINEL: &str = "All";

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvertedDateRange { start, end });
        }
        Ok(Self { start, end })
    }
}

/// String comparison applied by a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Contains,
    Equals,
}

/// A single `field <kind> value` condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterCondition {
    pub field: String,
    pub kind: MatchKind,
    pub value: String,
}

/// Filter tree. Only AND composition is supported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterExpr {
    Condition(FilterCondition),
    And(Vec<FilterExpr>),
}

impl FilterExpr {
    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Condition(FilterCondition {
            field: field.into(),
            kind: MatchKind::Contains,
            value: value.into(),
        })
    }

    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Condition(FilterCondition {
            field: field.into(),
            kind: MatchKind::Equals,
            value: value.into(),
        })
    }

    /// AND the given expressions. A single expression is returned unwrapped,
    /// none at all yields `None`.
    pub fn all(mut exprs: Vec<FilterExpr>) -> Option<Self> {
        match exprs.len() {
            0 => None,
            1 => exprs.pop(),
            _ => Some(Self::And(exprs)),
        }
    }

    /// Check the tree and return it with field names and values trimmed.
    fn validated(self) -> Result<Self, ValidationError> {
        match self {
            Self::Condition(condition) => {
                let field = condition.field.trim();
                if field.is_empty() {
                    return Err(ValidationError::BlankFilterField);
                }
                let value = condition.value.trim();
                if value.is_empty() {
                    return Err(ValidationError::BlankFilterValue(field.to_string()));
                }
                Ok(Self::Condition(FilterCondition {
                    field: field.to_string(),
                    kind: condition.kind,
                    value: value.to_string(),
                }))
            }
            Self::And(exprs) => {
                if exprs.is_empty() {
                    return Err(ValidationError::EmptyFilterGroup);
                }
                exprs
                    .into_iter()
                    .map(Self::validated)
                    .collect::<Result<Vec<_>, _>>()
                    .map(Self::And)
            }
        }
    }
}

/// Optional free-text filters offered to interactive callers.
///
/// Blank values and the `All` sentinel mean "no filter" and are dropped
/// rather than rejected.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    pub landing_page: Option<String>,
    pub channel_group: Option<String>,
    pub device_category: Option<String>,
}

impl FilterOptions {
    /// Compose the supplied options into a single AND expression.
    pub fn to_filter(&self) -> Option<FilterExpr> {
        let mut conditions = Vec::new();
        if let Some(value) = selected(&self.landing_page) {
            conditions.push(FilterExpr::contains(LANDING_PAGE_FIELD, value));
        }
        if let Some(value) = selected(&self.channel_group) {
            conditions.push(FilterExpr::equals(CHANNEL_GROUP_FIELD, value));
        }
        if let Some(value) = selected(&self.device_category) {
            conditions.push(FilterExpr::equals(DEVICE_CATEGORY_FIELD, value));
        }
        FilterExpr::all(conditions)
    }
}

fn selected(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(ALL_SENTINEL))
}

/// Validated description of a report query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRequest {
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
    pub date_range: DateRange,
    pub filter: Option<FilterExpr>,
}

impl ReportRequest {
    pub fn builder() -> ReportRequestBuilder {
        ReportRequestBuilder::default()
    }

    /// Column names of the resulting table: dimensions, then metrics.
    pub fn columns(&self) -> Vec<String> {
        self.dimensions
            .iter()
            .chain(self.metrics.iter())
            .cloned()
            .collect()
    }
}

/// Fluent builder for [`ReportRequest`].
#[derive(Debug, Default, Clone)]
pub struct ReportRequestBuilder {
    dimensions: Vec<String>,
    metrics: Vec<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    filter: Option<FilterExpr>,
}

impl ReportRequestBuilder {
    /// Add dimensions in order.
    pub fn dimensions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dimensions.extend(names.into_iter().map(Into::into));
        self
    }

    /// Add metrics in order.
    pub fn metrics<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metrics.extend(names.into_iter().map(Into::into));
        self
    }

    /// Set the inclusive date range.
    pub fn date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// Set the filter expression.
    pub fn filter(mut self, filter: Option<FilterExpr>) -> Self {
        self.filter = filter;
        self
    }

    pub fn build(self) -> Result<ReportRequest, ValidationError> {
        let dimensions = clean_names(self.dimensions, "dimension")?;
        if dimensions.is_empty() {
            return Err(ValidationError::EmptyDimensions);
        }
        let metrics = clean_names(self.metrics, "metric")?;
        if metrics.is_empty() {
            return Err(ValidationError::EmptyMetrics);
        }

        let (start, end) = match (self.start, self.end) {
            (Some(start), Some(end)) => (start, end),
            (None, _) => return Err(ValidationError::InvalidDate("<missing start date>".into())),
            (_, None) => return Err(ValidationError::InvalidDate("<missing end date>".into())),
        };
        let date_range = DateRange::new(start, end)?;

        let filter = self.filter.map(FilterExpr::validated).transpose()?;

        Ok(ReportRequest {
            dimensions,
            metrics,
            date_range,
            filter,
        })
    }
}

fn clean_names(names: Vec<String>, kind: &'static str) -> Result<Vec<String>, ValidationError> {
    let mut cleaned: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::BlankName(kind));
        }
        if cleaned.iter().any(|existing| existing == name) {
            return Err(ValidationError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
        cleaned.push(name.to_string());
    }
    Ok(cleaned)
}

/// Validate inputs and assemble a [`ReportRequest`].
pub fn build_request<D, M>(
    dimensions: D,
    metrics: M,
    start_date: NaiveDate,
    end_date: NaiveDate,
    filter: Option<FilterExpr>,
) -> Result<ReportRequest, ValidationError>
where
    D: IntoIterator,
    D::Item: Into<String>,
    M: IntoIterator,
    M::Item: Into<String>,
{
    ReportRequest::builder()
        .dimensions(dimensions)
        .metrics(metrics)
        .date_range(start_date, end_date)
        .filter(filter)
        .build()
}

/// Parse a report date: `YYYY-MM-DD`, `today`, `yesterday` or `NdaysAgo`.
/// Relative forms resolve against `today`.
pub fn parse_report_date(input: &str, today: NaiveDate) -> Result<NaiveDate, ValidationError> {
    let trimmed = input.trim();
    let invalid = || ValidationError::InvalidDate(input.to_string());

    match trimmed {
        "today" => return Ok(today),
        "yesterday" => return today.pred_opt().ok_or_else(invalid),
        _ => {}
    }

    if let Some(days) = trimmed.strip_suffix("daysAgo") {
        let days: u64 = days.parse().map_err(|_| invalid())?;
        return today.checked_sub_days(Days::new(days)).ok_or_else(invalid);
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| invalid())
}
