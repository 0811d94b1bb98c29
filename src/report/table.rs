//! Response normalization into a flat table.

use serde::Serialize;

use crate::error::ClientError;

/// Header/row structure returned by a report backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawReport {
    pub dimension_headers: Vec<String>,
    pub metric_headers: Vec<String>,
    pub rows: Vec<RawRow>,
    /// Backend reported that the aggregates are sampled.
    pub sampled: bool,
    /// Total number of rows matching the query, before the row limit.
    pub total_rows: Option<u64>,
}

/// One backend row. `None` marks a value the backend left unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub dimension_values: Vec<Option<String>>,
    pub metric_values: Vec<Option<String>>,
}

/// Normalized report: fixed column order, string cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub sampled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<u64>,
}

impl ReportTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when the backend matched more rows than were returned.
    pub fn is_truncated(&self) -> bool {
        self.total_rows
            .map_or(false, |total| total > self.rows.len() as u64)
    }
}

/// Flatten `raw` into a table whose columns are `dimensions ++ metrics`.
///
/// Column positions come from the request. Response headers are only used to
/// locate each requested column, so a backend that reorders headers cannot
/// shuffle values between columns.
pub fn normalize(
    raw: &RawReport,
    dimensions: &[String],
    metrics: &[String],
) -> Result<ReportTable, ClientError> {
    let columns: Vec<String> = dimensions.iter().chain(metrics.iter()).cloned().collect();

    let rows = if raw.rows.is_empty() {
        Vec::new()
    } else {
        let dimension_index = column_positions(&raw.dimension_headers, dimensions, "dimension")?;
        let metric_index = column_positions(&raw.metric_headers, metrics, "metric")?;

        raw.rows
            .iter()
            .enumerate()
            .map(|(n, row)| {
                let mut cells = Vec::with_capacity(columns.len());
                pick_values(&mut cells, &row.dimension_values, &dimension_index, n, "dimension")?;
                pick_values(&mut cells, &row.metric_values, &metric_index, n, "metric")?;
                Ok(cells)
            })
            .collect::<Result<Vec<_>, ClientError>>()?
    };

    Ok(ReportTable {
        columns,
        rows,
        sampled: raw.sampled,
        total_rows: raw.total_rows,
    })
}

/// Index into the response values for each requested column.
/// Without headers the response is taken to be in request order.
fn column_positions(
    headers: &[String],
    requested: &[String],
    kind: &str,
) -> Result<Vec<usize>, ClientError> {
    if headers.is_empty() {
        return Ok((0..requested.len()).collect());
    }

    requested
        .iter()
        .map(|name| {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                ClientError::MalformedResponse(format!(
                    "{} '{}' missing from response headers {:?}",
                    kind, name, headers
                ))
            })
        })
        .collect()
}

fn pick_values(
    cells: &mut Vec<String>,
    values: &[Option<String>],
    positions: &[usize],
    row: usize,
    kind: &str,
) -> Result<(), ClientError> {
    for &position in positions {
        let value = values.get(position).ok_or_else(|| {
            ClientError::MalformedResponse(format!(
                "row {} has {} {} values, expected at least {}",
                row,
                values.len(),
                kind,
                position + 1
            ))
        })?;
        cells.push(value.clone().unwrap_or_default());
    }
    Ok(())
}

impl std::fmt::Display for ReportTable {
    /// Markdown table.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_row(f, self.columns.iter())?;
        write_row(f, self.columns.iter().map(|_| "---"))?;
        for row in &self.rows {
            write_row(f, row.iter())?;
        }
        Ok(())
    }
}

fn write_row<I, S>(f: &mut std::fmt::Formatter<'_>, cells: I) -> std::fmt::Result
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    write!(f, "|")?;
    for cell in cells {
        write!(f, " {} |", escape_cell(cell.as_ref()))?;
    }
    writeln!(f)
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace('\n', " ")
}
