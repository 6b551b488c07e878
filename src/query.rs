//! The fixed reporting query catalogue and the paginated runner.

use crate::error::{Error, Result};
use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Column, Row, TypeInfo};
use tracing::debug;

/// One reporting query, defined at startup and immutable for the run.
///
/// `columns` names the SELECT list in order; it doubles as the CSV header so
/// zero-row results still produce a header-only file. `substitute_column`,
/// when set, names the username column rewritten after the merge.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub id: &'static str,
    pub title: &'static str,
    pub sql: &'static str,
    pub columns: &'static [&'static str],
    pub page_size: i64,
    pub substitute_column: Option<&'static str>,
}

/// One page of query results, decoded to CSV-ready strings. NULL values
/// decode to empty fields.
#[derive(Debug, Clone, Default)]
pub struct ResultPage {
    pub rows: Vec<Vec<String>>,
}

/// Half-open UTC window `[00:00 of the run date, 00:00 of the next day)`
/// bound into every query as `$1`/`$2`.
#[derive(Debug, Clone, Copy)]
pub struct ReportWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReportWindow {
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            start: date.and_time(NaiveTime::MIN).and_utc(),
            end: (date + Days::new(1)).and_time(NaiveTime::MIN).and_utc(),
        }
    }
}

/// The four reporting queries, in report order. Every query filters on the
/// reporting window and carries an explicit ORDER BY so LIMIT/OFFSET paging
/// is deterministic.
pub fn query_specs() -> Vec<QuerySpec> {
    vec![
        QuerySpec {
            id: "applications",
            title: "Applications Received",
            sql: "SELECT a.application_number, a.registration_type::text, a.status, \
                  a.payment_account, u.username AS submitter_username, a.application_date \
                  FROM application a \
                  JOIN users u ON u.id = a.submitter_id \
                  WHERE a.application_date >= $1 AND a.application_date < $2 \
                  ORDER BY a.application_date, a.application_number",
            columns: &[
                "application_number",
                "registration_type",
                "status",
                "payment_account",
                "submitter_username",
                "application_date",
            ],
            page_size: 500,
            substitute_column: Some("submitter_username"),
        },
        QuerySpec {
            id: "registrations",
            title: "Registrations Issued",
            sql: "SELECT r.registration_number, r.registration_type::text, r.status, \
                  u.username AS reviewer_username, r.start_date, r.expiry_date \
                  FROM registrations r \
                  JOIN application a ON a.registration_id = r.id \
                  LEFT JOIN users u ON u.id = a.reviewer_id \
                  WHERE r.start_date >= $1 AND r.start_date < $2 \
                  ORDER BY r.start_date, r.registration_number",
            columns: &[
                "registration_number",
                "registration_type",
                "status",
                "reviewer_username",
                "start_date",
                "expiry_date",
            ],
            page_size: 500,
            substitute_column: Some("reviewer_username"),
        },
        QuerySpec {
            id: "sbc_accounts",
            title: "Service BC Account Activity",
            sql: "SELECT DISTINCT a.payment_account AS sbc_account_id \
                  FROM application a \
                  JOIN users u ON u.id = a.submitter_id \
                  WHERE u.login_source = 'STAFF' \
                  AND a.payment_account IS NOT NULL \
                  AND a.application_date >= $1 AND a.application_date < $2 \
                  ORDER BY sbc_account_id",
            columns: &["sbc_account_id"],
            page_size: 200,
            substitute_column: None,
        },
        QuerySpec {
            id: "bulk_validations",
            title: "Bulk Validation Requests",
            sql: "SELECT b.id::text, b.request_file_id, b.request_timestamp \
                  FROM bulk_validation b \
                  WHERE b.request_timestamp >= $1 AND b.request_timestamp < $2 \
                  ORDER BY b.request_timestamp, b.id",
            columns: &["id", "request_file_id", "request_timestamp"],
            page_size: 1000,
            substitute_column: None,
        },
    ]
}

/// Execute one page of a query. Read-only; the window binds as `$1`/`$2`
/// and paging as trailing parameters.
pub async fn fetch_page(
    pool: &PgPool,
    spec: &QuerySpec,
    window: &ReportWindow,
    page_index: u32,
) -> Result<ResultPage> {
    let paged_sql = format!("{} LIMIT $3 OFFSET $4", spec.sql);
    let offset = page_index as i64 * spec.page_size;

    debug!(query = spec.id, page = page_index, offset, "fetching page");

    let rows = sqlx::query(&paged_sql)
        .bind(window.start)
        .bind(window.end)
        .bind(spec.page_size)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let mut page = ResultPage {
        rows: Vec::with_capacity(rows.len()),
    };
    for row in &rows {
        if row.columns().len() != spec.columns.len() {
            return Err(Error::Decode(format!(
                "query '{}' returned {} columns, expected {}",
                spec.id,
                row.columns().len(),
                spec.columns.len()
            )));
        }
        let mut fields = Vec::with_capacity(spec.columns.len());
        for index in 0..spec.columns.len() {
            fields.push(decode_field(row, index)?);
        }
        page.rows.push(fields);
    }

    Ok(page)
}

/// Render one column value as a CSV field based on its Postgres type name.
fn decode_field(row: &PgRow, index: usize) -> Result<String> {
    let type_name = row.columns()[index].type_info().name();
    let value = match type_name {
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => {
            row.try_get::<Option<String>, _>(index)?.unwrap_or_default()
        }
        "INT2" => row
            .try_get::<Option<i16>, _>(index)?
            .map(|v| v.to_string())
            .unwrap_or_default(),
        "INT4" => row
            .try_get::<Option<i32>, _>(index)?
            .map(|v| v.to_string())
            .unwrap_or_default(),
        "INT8" => row
            .try_get::<Option<i64>, _>(index)?
            .map(|v| v.to_string())
            .unwrap_or_default(),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(index)?
            .map(|v| v.to_string())
            .unwrap_or_default(),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(index)?
            .map(|v| v.to_string())
            .unwrap_or_default(),
        "BOOL" => row
            .try_get::<Option<bool>, _>(index)?
            .map(|v| v.to_string())
            .unwrap_or_default(),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(index)?
            .map(|v| v.to_string())
            .unwrap_or_default(),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(index)?
            .map(|v| v.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(index)?
            .map(|v| v.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)?
            .map(|v| v.to_rfc3339())
            .unwrap_or_default(),
        other => {
            return Err(Error::Decode(format!(
                "unsupported column type '{}' at position {}",
                other, index
            )))
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalogue_shape() {
        let specs = query_specs();
        assert_eq!(specs.len(), 4);

        let ids: HashSet<_> = specs.iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), 4, "query ids must be unique");

        for spec in &specs {
            assert!(spec.page_size > 0, "{} has a non-positive page size", spec.id);
            assert!(!spec.columns.is_empty(), "{} has no columns", spec.id);
            assert!(spec.sql.contains("$1") && spec.sql.contains("$2"));
            assert!(
                spec.sql.contains("ORDER BY"),
                "{} must order results for deterministic paging",
                spec.id
            );
        }
    }

    #[test]
    fn test_two_queries_carry_a_substitution_column() {
        let specs = query_specs();
        let with_substitution: Vec<_> = specs
            .iter()
            .filter(|s| s.substitute_column.is_some())
            .collect();
        assert_eq!(with_substitution.len(), 2);

        for spec in with_substitution {
            let column = spec.substitute_column.unwrap();
            assert!(
                spec.columns.contains(&column),
                "{}'s substitution column '{}' is not in its column list",
                spec.id,
                column
            );
        }
    }

    #[test]
    fn test_report_window_is_half_open_day() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let window = ReportWindow::for_date(date);
        assert_eq!(window.start.to_rfc3339(), "2024-06-01T00:00:00+00:00");
        assert_eq!(window.end.to_rfc3339(), "2024-06-02T00:00:00+00:00");
        assert!(window.start < window.end);
    }
}
