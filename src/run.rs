//! Sequential orchestration of the reporting queries.
//!
//! Each query moves Pending -> Running -> (Succeeded | Failed); both ends
//! are terminal and a failed query never blocks the ones after it. Errors
//! land on that query's stats and the report is rendered regardless, so a
//! partial run still produces a complete summary.

use crate::config::Config;
use crate::db;
use crate::error::Result;
use crate::export;
use crate::notify::NotifyClient;
use crate::query::{self, QuerySpec, ReportWindow};
use crate::report::{QueryStats, QueryStatus, ReportRenderer, RunReport};
use crate::substitute;
use chrono::NaiveDate;
use sqlx::postgres::PgPool;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Run the whole job: export all queries, render and write the report,
/// then deliver it when delivery is configured.
pub async fn execute(config: &Config) -> Result<RunReport> {
    fs::create_dir_all(&config.output_dir)?;

    let pool = db::connect(&config.database_url)?;
    let window = ReportWindow::for_date(config.run_date);
    // Batch files live here; the directory drop cleans up whatever a failed
    // query leaves behind.
    let scratch = tempfile::tempdir()?;

    let mut outcomes = Vec::new();
    for spec in query::query_specs() {
        info!(
            query = spec.id,
            from = %QueryStatus::Pending,
            to = %QueryStatus::Running,
            "query state change"
        );
        let stats = match export_query(&pool, &spec, &window, scratch.path(), config).await {
            Ok(stats) => {
                info!(
                    query = spec.id,
                    from = %QueryStatus::Running,
                    to = %QueryStatus::Succeeded,
                    rows = stats.total_rows,
                    "query state change"
                );
                stats
            }
            Err(e) => {
                warn!(
                    query = spec.id,
                    from = %QueryStatus::Running,
                    to = %QueryStatus::Failed,
                    error = %e,
                    "query state change"
                );
                QueryStats::failed(&spec, e.to_string())
            }
        };
        outcomes.push(stats);
    }

    let report = RunReport::new(config.run_date, outcomes);
    let renderer = ReportRenderer::new()?;
    let html = renderer.render(&report)?;

    let report_path = config.output_dir.join(report_file_name(config.run_date));
    fs::write(&report_path, &html)?;
    info!(path = %report_path.display(), "report written");

    if let Some(notify) = &config.notify {
        let client = NotifyClient::new(notify)?;
        client
            .send_report(&notify.recipients, &report.title, &html)
            .await?;
    } else {
        info!("delivery not configured, skipping email");
    }

    Ok(report)
}

/// Page through one query, merge the batches, and apply substitution when
/// the spec names a column. Any error here is this query's alone.
async fn export_query(
    pool: &PgPool,
    spec: &QuerySpec,
    window: &ReportWindow,
    scratch_dir: &Path,
    config: &Config,
) -> Result<QueryStats> {
    let mut batches = Vec::new();
    let mut page_index = 0u32;
    loop {
        let page = query::fetch_page(pool, spec, window, page_index).await?;
        let short_page = (page.rows.len() as i64) < spec.page_size;
        // Page zero is always written so a zero-row result still yields a
        // header; later empty pages carry nothing worth a batch file.
        if page_index == 0 || !page.rows.is_empty() {
            batches.push(export::write_batch(scratch_dir, spec, page_index, &page)?);
        }
        page_index += 1;
        if short_page {
            break;
        }
    }

    let output_path = config.output_dir.join(csv_file_name(spec.id, config.run_date));
    let merged_rows = export::merge_batches(&batches, &output_path)?;
    let total_rows = match spec.substitute_column {
        Some(column) => substitute::apply(&output_path, column)?,
        None => merged_rows,
    };
    let file_size = fs::metadata(&output_path)?.len();

    Ok(QueryStats::succeeded(spec, total_rows, file_size, &output_path))
}

fn csv_file_name(query_id: &str, run_date: NaiveDate) -> String {
    format!("{query_id}-{run_date}.csv")
}

fn report_file_name(run_date: NaiveDate) -> String {
    format!("registry-report-{run_date}.html")
}
