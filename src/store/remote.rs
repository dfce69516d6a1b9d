use super::{Company, Employee, RecordStore, Report, Upsert, sort_reports};
use crate::core::error::EloyError;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

const EMPLOYEES: &str = "funcionarios";
const REPORTS: &str = "relatorios";
const COMPANY: &str = "empresa";

/// Hosted tables reached through a PostgREST endpoint (`<url>/rest/v1/<table>`).
#[derive(Clone)]
pub struct RemoteTableStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RemoteTableStore {
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> Result<Self, EloyError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.base_url, table))
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn send(&self, table: &str, request: RequestBuilder) -> Result<Response, EloyError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(table, %status, "remote table request failed");
            return Err(EloyError::Store(format!(
                "{}: HTTP {}: {}",
                table,
                status,
                body.trim()
            )));
        }
        Ok(response)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, EloyError> {
        let request = self
            .request(Method::GET, table)
            .query(&[("select", columns)])
            .query(filters);
        let response = self.send(table, request).await?;
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| EloyError::Store(format!("{}: unexpected payload: {}", table, e)))
    }

    async fn insert(&self, table: &str, row: serde_json::Value) -> Result<(), EloyError> {
        let request = self
            .request(Method::POST, table)
            .header("Prefer", "return=minimal")
            .json(&row);
        self.send(table, request).await.map(|_| ())
    }

    async fn patch(
        &self,
        table: &str,
        filter: (&str, String),
        changes: serde_json::Value,
    ) -> Result<(), EloyError> {
        let request = self
            .request(Method::PATCH, table)
            .header("Prefer", "return=minimal")
            .query(&[filter])
            .json(&changes);
        self.send(table, request).await.map(|_| ())
    }

    async fn delete(&self, table: &str, filter: (&str, String)) -> Result<(), EloyError> {
        let request = self.request(Method::DELETE, table).query(&[filter]);
        self.send(table, request).await.map(|_| ())
    }

    /// PostgREST `eq` filters are exact; names are matched locally instead.
    async fn find_employee(&self, name: &str) -> Result<Option<Employee>, EloyError> {
        Ok(self
            .employees()
            .await?
            .into_iter()
            .find(|e| e.matches(name)))
    }
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

#[async_trait]
impl RecordStore for RemoteTableStore {
    fn kind(&self) -> &'static str {
        "remote"
    }

    async fn employees(&self) -> Result<Vec<Employee>, EloyError> {
        self.select(EMPLOYEES, "nome,cargo", &[]).await
    }

    async fn upsert_employee(&self, employee: Employee) -> Result<Upsert, EloyError> {
        match self.find_employee(&employee.name).await? {
            Some(existing) => {
                self.patch(
                    EMPLOYEES,
                    ("nome", eq(&existing.name)),
                    json!({ "cargo": employee.role }),
                )
                .await?;
                Ok(Upsert::Updated)
            }
            None => {
                self.insert(EMPLOYEES, serde_json::to_value(&employee)?)
                    .await?;
                Ok(Upsert::Created)
            }
        }
    }

    async fn update_role(&self, name: &str, role: &str) -> Result<bool, EloyError> {
        let Some(existing) = self.find_employee(name).await? else {
            return Ok(false);
        };
        self.patch(
            EMPLOYEES,
            ("nome", eq(&existing.name)),
            json!({ "cargo": role.trim() }),
        )
        .await?;
        Ok(true)
    }

    async fn remove_employee(&self, name: &str) -> Result<bool, EloyError> {
        let Some(existing) = self.find_employee(name).await? else {
            return Ok(false);
        };
        self.delete(EMPLOYEES, ("nome", eq(&existing.name))).await?;
        Ok(true)
    }

    async fn reports(&self) -> Result<Vec<Report>, EloyError> {
        let mut reports: Vec<Report> = self.select(REPORTS, "data,conteudo", &[]).await?;
        sort_reports(&mut reports);
        Ok(reports)
    }

    async fn report(&self, date: &str) -> Result<Option<Report>, EloyError> {
        let rows: Vec<Report> = self
            .select(REPORTS, "data,conteudo", &[("data", eq(date))])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn put_report(&self, report: Report) -> Result<Upsert, EloyError> {
        if self.report(&report.date).await?.is_some() {
            self.patch(
                REPORTS,
                ("data", eq(&report.date)),
                json!({ "conteudo": report.content }),
            )
            .await?;
            Ok(Upsert::Updated)
        } else {
            self.insert(REPORTS, serde_json::to_value(&report)?).await?;
            Ok(Upsert::Created)
        }
    }

    async fn remove_report(&self, date: &str) -> Result<bool, EloyError> {
        if self.report(date).await?.is_none() {
            return Ok(false);
        }
        self.delete(REPORTS, ("data", eq(date))).await?;
        Ok(true)
    }

    async fn company(&self) -> Result<Option<Company>, EloyError> {
        let rows: Vec<Company> = self
            .select(COMPANY, "nome,data_fundacao", &[("limit", "1".to_string())])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn set_company(&self, company: Company) -> Result<(), EloyError> {
        match self.company().await? {
            Some(existing) => {
                self.patch(
                    COMPANY,
                    ("nome", eq(&existing.name)),
                    serde_json::to_value(&company)?,
                )
                .await
            }
            None => self.insert(COMPANY, serde_json::to_value(&company)?).await,
        }
    }
}
