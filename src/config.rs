use crate::error::{Error, Result};
use chrono::{Days, NaiveDate, Utc};
use std::path::PathBuf;

/// Runtime configuration for one report run, read from the process
/// environment. CLI flags may override individual fields afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub output_dir: PathBuf,
    pub run_date: NaiveDate,
    pub notify: Option<NotifyConfig>,
}

/// Settings for the notification service that emails the report.
/// Present only when `NOTIFY_API_URL` is set; the key and recipient list
/// are then required.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub api_url: String,
    pub api_key: String,
    pub recipients: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| Error::Config("DATABASE_URL is not set".to_string()))?;

        let output_dir = std::env::var("REPORT_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("reports"));

        let run_date = match std::env::var("REPORT_RUN_DATE") {
            Ok(raw) => raw.parse::<NaiveDate>().map_err(|e| {
                Error::Config(format!("invalid REPORT_RUN_DATE '{raw}': {e}"))
            })?,
            Err(_) => default_run_date(),
        };

        Ok(Self {
            database_url,
            output_dir,
            run_date,
            notify: notify_from_env()?,
        })
    }
}

/// The job reports on the previous day unless told otherwise.
pub fn default_run_date() -> NaiveDate {
    Utc::now().date_naive() - Days::new(1)
}

fn notify_from_env() -> Result<Option<NotifyConfig>> {
    let api_url = match std::env::var("NOTIFY_API_URL") {
        Ok(url) => url,
        Err(_) => return Ok(None),
    };

    let api_key = std::env::var("NOTIFY_API_KEY").map_err(|_| {
        Error::Config("NOTIFY_API_KEY is required when NOTIFY_API_URL is set".to_string())
    })?;

    let raw_recipients = std::env::var("REPORT_RECIPIENTS").map_err(|_| {
        Error::Config("REPORT_RECIPIENTS is required when NOTIFY_API_URL is set".to_string())
    })?;

    let recipients = parse_recipients(&raw_recipients);
    if recipients.is_empty() {
        return Err(Error::Config(
            "REPORT_RECIPIENTS must contain at least one address".to_string(),
        ));
    }

    Ok(Some(NotifyConfig {
        api_url,
        api_key,
        recipients,
    }))
}

/// Split a comma-separated recipient list, dropping empty entries.
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|address| address.trim().to_string())
        .filter(|address| !address.is_empty())
        .collect()
}
