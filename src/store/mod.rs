//! Business records (staff, reports, company) behind one async trait, kept
//! either in a local JSON document or in remote PostgREST tables.

use crate::config::StorageConfig;
use crate::core::error::EloyError;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub mod json_file;
pub mod remote;

pub use json_file::JsonFileStore;
pub use remote::RemoteTableStore;

const DATE_FORMAT: &str = "%d/%m/%Y";

/// Nullable text columns read as empty strings.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "cargo", default, deserialize_with = "null_as_empty")]
    pub role: String,
}

impl Employee {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            role: role.into().trim().to_string(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        same_name(&self.name, name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "data")]
    pub date: String,
    #[serde(rename = "conteudo", default, deserialize_with = "null_as_empty")]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "data_fundacao", default, deserialize_with = "null_as_empty")]
    pub founding_date: String,
}

/// Outcome of a write keyed by name or date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created,
    Updated,
}

/// Everything the model needs to know about the company, read in one go.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    pub company: Option<Company>,
    pub employees: Vec<Employee>,
    pub projects: Vec<String>,
    pub report_dates: Vec<String>,
}

/// Case-insensitive, whitespace-tolerant name comparison.
pub fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Parses `DD/MM/AAAA` (also with `-` or `.`) and returns it zero-padded
/// with `/` separators.
pub fn normalize_date(input: &str) -> Result<String, EloyError> {
    let cleaned = input.trim().replace(['-', '.'], "/");
    NaiveDate::parse_from_str(&cleaned, DATE_FORMAT)
        .map(|date| date.format(DATE_FORMAT).to_string())
        .map_err(|_| EloyError::Input(format!("Data inválida: '{}'. Use DD/MM/AAAA.", input.trim())))
}

/// Orders reports chronologically; unparseable dates go last.
pub fn sort_reports(reports: &mut [Report]) {
    reports.sort_by_key(|r| {
        let parsed = NaiveDate::parse_from_str(&r.date, DATE_FORMAT).ok();
        (parsed.is_none(), parsed, r.date.clone())
    });
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short label for logs and `/health`.
    fn kind(&self) -> &'static str;

    async fn employees(&self) -> Result<Vec<Employee>, EloyError>;

    /// Adds the employee, or replaces the role of the one with the same name.
    async fn upsert_employee(&self, employee: Employee) -> Result<Upsert, EloyError>;

    /// Returns `false` when nobody has that name.
    async fn update_role(&self, name: &str, role: &str) -> Result<bool, EloyError>;

    /// Returns `false` (and changes nothing) when nobody has that name.
    async fn remove_employee(&self, name: &str) -> Result<bool, EloyError>;

    async fn reports(&self) -> Result<Vec<Report>, EloyError>;

    async fn report(&self, date: &str) -> Result<Option<Report>, EloyError>;

    async fn put_report(&self, report: Report) -> Result<Upsert, EloyError>;

    async fn remove_report(&self, date: &str) -> Result<bool, EloyError>;

    async fn company(&self) -> Result<Option<Company>, EloyError>;

    async fn set_company(&self, company: Company) -> Result<(), EloyError>;

    async fn projects(&self) -> Result<Vec<String>, EloyError> {
        Ok(Vec::new())
    }

    async fn snapshot(&self) -> Result<StoreSnapshot, EloyError> {
        let report_dates = self.reports().await?.into_iter().map(|r| r.date).collect();
        Ok(StoreSnapshot {
            company: self.company().await?,
            employees: self.employees().await?,
            projects: self.projects().await?,
            report_dates,
        })
    }
}

pub fn open(config: &StorageConfig, timeout: Duration) -> Result<Arc<dyn RecordStore>, EloyError> {
    match config {
        StorageConfig::JsonFile { path } => {
            let store = JsonFileStore::new(path.clone());
            tracing::info!(path = %store.path().display(), "using JSON document store");
            Ok(Arc::new(store))
        }
        StorageConfig::Remote { url, api_key } => {
            tracing::info!(%url, "using remote table store");
            Ok(Arc::new(RemoteTableStore::new(url, api_key, timeout)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_are_normalized() {
        assert_eq!(normalize_date("1/2/2024").unwrap(), "01/02/2024");
        assert_eq!(normalize_date(" 15-03-2025 ").unwrap(), "15/03/2025");
        assert_eq!(normalize_date("15.03.2025").unwrap(), "15/03/2025");
        assert!(normalize_date("31/02/2024").is_err());
        assert!(normalize_date("amanhã").is_err());
    }

    #[test]
    fn reports_sort_chronologically() {
        let mut reports = vec![
            Report {
                date: "01/02/2025".into(),
                content: "b".into(),
            },
            Report {
                date: "sem data".into(),
                content: "z".into(),
            },
            Report {
                date: "15/12/2024".into(),
                content: "a".into(),
            },
        ];
        sort_reports(&mut reports);
        let dates: Vec<_> = reports.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, ["15/12/2024", "01/02/2025", "sem data"]);
    }

    #[test]
    fn null_columns_read_as_empty_text() {
        let employee: Employee = serde_json::from_str(r#"{"nome": "Ana", "cargo": null}"#).unwrap();
        assert_eq!(employee, Employee::new("Ana", ""));
        let company: Company =
            serde_json::from_str(r#"{"nome": "Eloy Ltda", "data_fundacao": null}"#).unwrap();
        assert!(company.founding_date.is_empty());
        let employee: Employee = serde_json::from_str(r#"{"nome": "Bruno"}"#).unwrap();
        assert!(employee.role.is_empty());
    }

    #[test]
    fn names_match_ignoring_case_and_spaces() {
        assert!(Employee::new("Ana Souza", "Dev").matches("  ana souza "));
        assert!(!Employee::new("Ana Souza", "Dev").matches("Ana"));
    }
}
