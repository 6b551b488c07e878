//! Per-query statistics and the HTML summary report.

use crate::error::Result;
use crate::query::QuerySpec;
use crate::substitute::{self, SubstitutionEntry};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tera::{Context, Tera};

/// Lifecycle of one query within a run. Succeeded and Failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QueryStatus::Pending => "pending",
            QueryStatus::Running => "running",
            QueryStatus::Succeeded => "succeeded",
            QueryStatus::Failed => "failed",
        };
        write!(f, "{label}")
    }
}

/// Outcome of one query: either the export statistics or an error message,
/// never both. Absent fields are skipped during serialization so the
/// template's `default` filter renders them as N/A.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryStats {
    pub query_id: String,
    pub title: String,
    pub status: QueryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryStats {
    pub fn succeeded(spec: &QuerySpec, total_rows: u64, file_size: u64, output_path: &Path) -> Self {
        Self {
            query_id: spec.id.to_string(),
            title: spec.title.to_string(),
            status: QueryStatus::Succeeded,
            total_rows: Some(total_rows),
            file_size: Some(file_size),
            output_path: Some(output_path.display().to_string()),
            error: None,
        }
    }

    pub fn failed(spec: &QuerySpec, message: String) -> Self {
        Self {
            query_id: spec.id.to_string(),
            title: spec.title.to_string(),
            status: QueryStatus::Failed,
            total_rows: None,
            file_size: None,
            output_path: None,
            error: Some(message),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything the report template needs: per-query stats in definition
/// order plus the static substitution table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub title: String,
    pub run_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub queries: Vec<QueryStats>,
    pub substitutions: Vec<SubstitutionEntry>,
}

impl RunReport {
    pub fn new(run_date: NaiveDate, queries: Vec<QueryStats>) -> Self {
        Self {
            title: format!("Short-Term Rental Registry Daily Report - {run_date}"),
            run_date,
            generated_at: Utc::now(),
            queries,
            substitutions: substitute::entries(),
        }
    }
}

pub struct ReportRenderer {
    template_engine: Tera,
}

impl ReportRenderer {
    pub fn new() -> Result<Self> {
        let mut template_engine = Tera::default();
        template_engine.add_raw_template("report.html", REPORT_TEMPLATE)?;
        Ok(Self { template_engine })
    }

    pub fn render(&self, report: &RunReport) -> Result<String> {
        let mut context = Context::new();
        context.insert("report", report);
        let html = self.template_engine.render("report.html", &context)?;
        Ok(html)
    }
}

const REPORT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{{ report.title }}</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            color: #333;
            max-width: 900px;
            margin: 0 auto;
            padding: 20px;
        }
        table {
            width: 100%;
            border-collapse: collapse;
            margin-bottom: 30px;
        }
        th, td {
            text-align: left;
            padding: 8px 12px;
            border-bottom: 1px solid #ecf0f1;
        }
        th {
            background-color: #f8f9fa;
        }
        .error {
            color: #e74c3c;
        }
        .success {
            color: #27ae60;
        }
    </style>
</head>
<body>
    <h1>{{ report.title }}</h1>
    <p><strong>Report date:</strong> {{ report.run_date }}</p>
    <p><strong>Generated:</strong> {{ report.generated_at | date(format="%Y-%m-%d %H:%M:%S UTC") }}</p>

    <h2>Query Results</h2>
    <table>
        <thead>
            <tr>
                <th>Query</th>
                <th>Outcome</th>
                <th>Rows</th>
                <th>File Size (bytes)</th>
                <th>Output Path</th>
            </tr>
        </thead>
        <tbody>
            {% for query in report.queries %}
            <tr>
                <td>{{ query.title }}</td>
                {% if query.error %}
                <td class="error">Error: {{ query.error }}</td>
                {% else %}
                <td class="success">Success</td>
                {% endif %}
                <td>{{ query.total_rows | default(value="N/A") }}</td>
                <td>{{ query.file_size | default(value="N/A") }}</td>
                <td>{{ query.output_path | default(value="N/A") }}</td>
            </tr>
            {% endfor %}
        </tbody>
    </table>

    <h2>Service BC Office Substitutions</h2>
    <table>
        <thead>
            <tr>
                <th>Username</th>
                <th>Organization</th>
            </tr>
        </thead>
        <tbody>
            {% for entry in report.substitutions %}
            <tr>
                <td>{{ entry.username }}</td>
                <td>{{ entry.organization }}</td>
            </tr>
            {% endfor %}
        </tbody>
    </table>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::query_specs;

    fn sample_spec() -> QuerySpec {
        query_specs()
            .into_iter()
            .find(|s| s.id == "sbc_accounts")
            .unwrap()
    }

    fn render(report: &RunReport) -> String {
        ReportRenderer::new().unwrap().render(report).unwrap()
    }

    #[test]
    fn test_successful_query_renders_success_and_row_count() {
        let spec = sample_spec();
        let stats = QueryStats::succeeded(&spec, 3, 42, Path::new("/tmp/out/sbc_accounts.csv"));
        let report = RunReport::new(
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            vec![stats],
        );

        let html = render(&report);
        assert!(html.contains("Success"));
        assert!(html.contains("<td>3</td>"));
        assert!(html.contains("<td>42</td>"));
        assert!(html.contains("/tmp/out/sbc_accounts.csv"));
        assert!(!html.contains("Error:"));
    }

    #[test]
    fn test_failed_query_renders_error_message_and_na_fields() {
        let spec = sample_spec();
        let stats = QueryStats::failed(&spec, "connection refused".to_string());
        let report = RunReport::new(
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            vec![stats],
        );

        let html = render(&report);
        assert!(html.contains("Error: connection refused"));
        assert!(html.contains("<td>N/A</td>"));
        assert!(!html.contains("Success"));
    }

    #[test]
    fn test_report_includes_substitution_table() {
        let report = RunReport::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), Vec::new());
        let html = render(&report);
        for (username, organization) in crate::substitute::SUBSTITUTIONS {
            assert!(html.contains(username));
            assert!(html.contains(organization));
        }
    }

    #[test]
    fn test_report_title_carries_run_date() {
        let report = RunReport::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), Vec::new());
        assert!(report.title.contains("2024-06-01"));
        assert!(render(&report).contains("2024-06-01"));
    }

    #[test]
    fn test_stats_states_are_mutually_exclusive() {
        let spec = sample_spec();
        let ok = QueryStats::succeeded(&spec, 0, 17, Path::new("x.csv"));
        assert!(ok.is_success());
        assert!(ok.error.is_none());
        assert_eq!(ok.status, QueryStatus::Succeeded);

        let failed = QueryStats::failed(&spec, "boom".to_string());
        assert!(!failed.is_success());
        assert!(failed.total_rows.is_none());
        assert!(failed.file_size.is_none());
        assert!(failed.output_path.is_none());
        assert_eq!(failed.status, QueryStatus::Failed);
    }
}
