//! REST API types for the dashboard frontend.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::dashboard::DashboardFilter;
use crate::error::{ServerError, ServerResult};
use crate::load::LoadSummary;
use crate::models::CsvInfo;
use crate::pipeline::EtlSummary;
use crate::transform::{DroppedRow, TransformReport};

/// Response sent after an uploaded CSV has been loaded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Unique job identifier
    pub job_id: String,

    /// "loaded", or "warning" when rows were dropped
    pub status: String,

    pub file_name: Option<String>,

    pub csv_info: CsvMetadata,

    pub transform: TransformStats,

    pub load: LoadSummary,
}

/// CSV file metadata
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvMetadata {
    pub encoding: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

impl From<CsvInfo> for CsvMetadata {
    fn from(info: CsvInfo) -> Self {
        Self {
            encoding: info.encoding,
            row_count: info.row_count,
            columns: info.headers,
        }
    }
}

/// Row accounting for the upload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformStats {
    pub rows_in: usize,
    pub rows_out: usize,
    pub invalid_dates: usize,
    pub duplicates: usize,
    pub non_positive: usize,
    /// Rows whose revenue does not fit a decimal.
    pub overflows: usize,
    pub defaulted: usize,
    pub dropped: Vec<DroppedRow>,
}

impl From<TransformReport> for TransformStats {
    fn from(report: TransformReport) -> Self {
        Self {
            rows_in: report.rows_in,
            rows_out: report.rows_out,
            invalid_dates: report.invalid_dates,
            duplicates: report.duplicates,
            non_positive: report.non_positive,
            overflows: report.overflows,
            defaulted: report.product_defaulted + report.category_defaulted,
            dropped: report.dropped,
        }
    }
}

impl UploadResponse {
    pub fn new(summary: EtlSummary, file_name: Option<String>) -> Self {
        let status = if summary.report.dropped.is_empty() { "loaded" } else { "warning" };
        Self {
            job_id: Uuid::new_v4().to_string(),
            status: status.to_string(),
            file_name,
            csv_info: summary.csv_info.into(),
            transform: summary.report.into(),
            load: summary.load,
        }
    }
}

/// Query string of `GET /api/dashboard` and `GET /api/sales`.
///
/// Dates are `YYYY-MM-DD`. `categories` is comma-separated; when absent every
/// category is selected, when present but empty none is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub categories: Option<String>,
}

impl DashboardQuery {
    pub fn into_filter(self) -> ServerResult<DashboardFilter> {
        Ok(DashboardFilter {
            start: parse_date("start", self.start)?,
            end: parse_date("end", self.end)?,
            categories: self.categories.map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(String::from)
                    .collect()
            }),
        })
    }
}

fn parse_date(name: &str, value: Option<String>) -> ServerResult<Option<NaiveDate>> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| ServerError::BadRequest(format!("{} '{}': {}", name, raw, e))),
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(start: Option<&str>, end: Option<&str>, categories: Option<&str>) -> DashboardQuery {
        DashboardQuery {
            start: start.map(String::from),
            end: end.map(String::from),
            categories: categories.map(String::from),
        }
    }

    #[test]
    fn test_query_into_filter() {
        let filter = query(Some("2024-01-05"), None, Some("Food, Office,"))
            .into_filter()
            .unwrap();
        assert_eq!(filter.start, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(filter.end, None);
        assert_eq!(filter.categories, Some(vec!["Food".to_string(), "Office".to_string()]));
    }

    #[test]
    fn test_query_defaults() {
        let filter = DashboardQuery::default().into_filter().unwrap();
        assert_eq!(filter, DashboardFilter::default());

        let none = query(None, None, Some("")).into_filter().unwrap();
        assert_eq!(none.categories, Some(Vec::new()));
    }

    #[test]
    fn test_query_bad_date() {
        let err = query(None, Some("05/01/2024"), None).into_filter().unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(msg) if msg.starts_with("end")));
    }

    #[test]
    fn test_transform_stats_keep_overflows_apart() {
        let report = TransformReport {
            rows_in: 5,
            rows_out: 2,
            non_positive: 2,
            overflows: 1,
            product_defaulted: 1,
            category_defaulted: 1,
            ..Default::default()
        };
        let stats = TransformStats::from(report);
        assert_eq!(stats.non_positive, 2);
        assert_eq!(stats.overflows, 1);
        assert_eq!(stats.defaulted, 2);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["overflows"], 1);
    }

    #[test]
    fn test_error_response_shape() {
        let body = error_response("boom");
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "boom");
        assert!(body["jobId"].is_string());
    }
}
