use super::{Company, Employee, RecordStore, Report, Upsert, normalize_date, sort_reports};
use crate::core::error::EloyError;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// On-disk layout of the document. Older files listed staff as bare
/// names; those load as employees without a role. Keys this store does not
/// manage are kept in `extra` and written back untouched.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Banco {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    empresa: Option<Company>,
    #[serde(default, deserialize_with = "deserialize_employees")]
    funcionarios: Vec<Employee>,
    #[serde(default)]
    projetos: Vec<String>,
    #[serde(default)]
    relatorios: BTreeMap<String, String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Banco {
    /// Report keys written as `1/1/2025` are stored as `01/01/2025`.
    fn normalize_report_dates(&mut self) {
        let relatorios = std::mem::take(&mut self.relatorios);
        self.relatorios = relatorios
            .into_iter()
            .map(|(date, content)| (normalize_date(&date).unwrap_or(date), content))
            .collect();
    }

    /// Older documents keep the founding date at the top level.
    fn into_company(self) -> Option<Company> {
        let legacy_date = self
            .extra
            .get("data_fundacao")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|date| !date.is_empty());

        self.empresa.map(|mut company| {
            if company.founding_date.is_empty() {
                if let Some(date) = legacy_date {
                    company.founding_date =
                        normalize_date(date).unwrap_or_else(|_| date.to_string());
                }
            }
            company
        })
    }
}

fn deserialize_employees<'de, D>(deserializer: D) -> Result<Vec<Employee>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Entry {
        Full(Employee),
        Name(String),
    }

    let entries: Vec<Entry> = Vec::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .map(|entry| match entry {
            Entry::Full(employee) => employee,
            Entry::Name(name) => Employee::new(name, ""),
        })
        .collect())
}

/// Whole-document JSON store. Every write rewrites the file; the mutex
/// serialises read-modify-write cycles inside this process only.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Banco, EloyError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Banco::default()),
            Err(e) => return Err(e.into()),
        };
        if contents.trim().is_empty() {
            return Ok(Banco::default());
        }
        let mut banco: Banco = serde_json::from_str(&contents)
            .map_err(|e| EloyError::Store(format!("{}: {}", self.path.display(), e)))?;
        banco.normalize_report_dates();
        Ok(banco)
    }

    async fn save(&self, banco: &Banco) -> Result<(), EloyError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(banco)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::debug!(path = %self.path.display(), "record document written");
        Ok(())
    }

    async fn read<R>(&self, f: impl FnOnce(Banco) -> R) -> Result<R, EloyError> {
        let _guard = self.lock.lock().await;
        Ok(f(self.load().await?))
    }

    /// Runs `f` on the document and writes it back when `f` reports a change.
    async fn modify<R>(&self, f: impl FnOnce(&mut Banco) -> (R, bool)) -> Result<R, EloyError> {
        let _guard = self.lock.lock().await;
        let mut banco = self.load().await?;
        let (result, changed) = f(&mut banco);
        if changed {
            self.save(&banco).await?;
        }
        Ok(result)
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    fn kind(&self) -> &'static str {
        "json"
    }

    async fn employees(&self) -> Result<Vec<Employee>, EloyError> {
        self.read(|banco| banco.funcionarios).await
    }

    async fn upsert_employee(&self, employee: Employee) -> Result<Upsert, EloyError> {
        self.modify(|banco| {
            match banco
                .funcionarios
                .iter_mut()
                .find(|e| e.matches(&employee.name))
            {
                Some(existing) => {
                    existing.role = employee.role;
                    (Upsert::Updated, true)
                }
                None => {
                    banco.funcionarios.push(employee);
                    (Upsert::Created, true)
                }
            }
        })
        .await
    }

    async fn update_role(&self, name: &str, role: &str) -> Result<bool, EloyError> {
        self.modify(|banco| {
            match banco.funcionarios.iter_mut().find(|e| e.matches(name)) {
                Some(existing) => {
                    existing.role = role.trim().to_string();
                    (true, true)
                }
                None => (false, false),
            }
        })
        .await
    }

    async fn remove_employee(&self, name: &str) -> Result<bool, EloyError> {
        self.modify(|banco| {
            let before = banco.funcionarios.len();
            banco.funcionarios.retain(|e| !e.matches(name));
            let removed = banco.funcionarios.len() != before;
            (removed, removed)
        })
        .await
    }

    async fn reports(&self) -> Result<Vec<Report>, EloyError> {
        let mut reports = self
            .read(|banco| {
                banco
                    .relatorios
                    .into_iter()
                    .map(|(date, content)| Report { date, content })
                    .collect::<Vec<_>>()
            })
            .await?;
        sort_reports(&mut reports);
        Ok(reports)
    }

    async fn report(&self, date: &str) -> Result<Option<Report>, EloyError> {
        self.read(|mut banco| {
            banco.relatorios.remove(date).map(|content| Report {
                date: date.to_string(),
                content,
            })
        })
        .await
    }

    async fn put_report(&self, report: Report) -> Result<Upsert, EloyError> {
        self.modify(|banco| {
            let outcome = match banco.relatorios.insert(report.date, report.content) {
                Some(_) => Upsert::Updated,
                None => Upsert::Created,
            };
            (outcome, true)
        })
        .await
    }

    async fn remove_report(&self, date: &str) -> Result<bool, EloyError> {
        self.modify(|banco| {
            let removed = banco.relatorios.remove(date).is_some();
            (removed, removed)
        })
        .await
    }

    async fn company(&self) -> Result<Option<Company>, EloyError> {
        self.read(Banco::into_company).await
    }

    async fn set_company(&self, company: Company) -> Result<(), EloyError> {
        self.modify(|banco| {
            banco.empresa = Some(company);
            ((), true)
        })
        .await
    }

    async fn projects(&self) -> Result<Vec<String>, EloyError> {
        self.read(|banco| banco.projetos).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> JsonFileStore {
        JsonFileStore::new(dir.path().join("dados").join("banco.json"))
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.employees().await.unwrap().is_empty());
        assert!(store.reports().await.unwrap().is_empty());
        assert!(store.company().await.unwrap().is_none());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn report_written_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let report = Report {
            date: "10/03/2025".to_string(),
            content: "Fechamento do trimestre concluído.".to_string(),
        };
        assert_eq!(store.put_report(report.clone()).await.unwrap(), Upsert::Created);
        assert_eq!(store.report("10/03/2025").await.unwrap(), Some(report));

        let edited = Report {
            date: "10/03/2025".to_string(),
            content: "Fechamento revisado.".to_string(),
        };
        assert_eq!(store.put_report(edited.clone()).await.unwrap(), Upsert::Updated);

        // a fresh handle sees what the first one wrote
        let reopened = JsonFileStore::new(store.path());
        assert_eq!(reopened.reports().await.unwrap(), vec![edited]);
    }

    #[tokio::test]
    async fn removing_unknown_employee_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store
            .upsert_employee(Employee::new("Ana Souza", "Analista"))
            .await
            .unwrap();
        let before = tokio::fs::read_to_string(store.path()).await.unwrap();

        assert!(!store.remove_employee("Carlos").await.unwrap());
        assert_eq!(store.employees().await.unwrap().len(), 1);
        let after = tokio::fs::read_to_string(store.path()).await.unwrap();
        assert_eq!(before, after);

        assert!(store.remove_employee("ANA SOUZA").await.unwrap());
        assert!(store.employees().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn same_name_updates_the_role() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store
            .upsert_employee(Employee::new("Bruno", "Estagiário"))
            .await
            .unwrap();
        assert_eq!(
            store
                .upsert_employee(Employee::new("bruno", "Desenvolvedor"))
                .await
                .unwrap(),
            Upsert::Updated
        );
        assert_eq!(
            store.employees().await.unwrap(),
            vec![Employee::new("Bruno", "Desenvolvedor")]
        );
        assert!(store.update_role("BRUNO", "Tech Lead").await.unwrap());
        assert!(!store.update_role("Zé", "CEO").await.unwrap());
    }

    #[tokio::test]
    async fn legacy_document_with_plain_names_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banco.json");
        tokio::fs::write(
            &path,
            r#"{
                "empresa": {"nome": "Eloy Ltda", "data_fundacao": "05/05/2010"},
                "funcionarios": ["Ana", {"nome": "Bruno", "cargo": "Dev"}],
                "projetos": ["Portal RH"],
                "relatorios": {"01/01/2025": "Início do ano"}
            }"#,
        )
        .await
        .unwrap();

        let store = JsonFileStore::new(&path);
        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.company.unwrap().founding_date, "05/05/2010");
        assert_eq!(
            snapshot.employees,
            vec![Employee::new("Ana", ""), Employee::new("Bruno", "Dev")]
        );
        assert_eq!(snapshot.projects, vec!["Portal RH".to_string()]);
        assert_eq!(snapshot.report_dates, vec!["01/01/2025".to_string()]);
    }

    #[tokio::test]
    async fn unknown_keys_survive_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banco.json");
        tokio::fs::write(
            &path,
            r#"{"empresa": {"nome": "Eloy"}, "data_fundacao": "2010", "metas": [1, 2], "relatorios": {}}"#,
        )
        .await
        .unwrap();

        let store = JsonFileStore::new(&path);
        store
            .put_report(Report {
                date: "03/03/2025".to_string(),
                content: "Planejamento anual.".to_string(),
            })
            .await
            .unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        let doc: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["metas"], serde_json::json!([1, 2]));
        assert_eq!(doc["data_fundacao"], "2010");
        assert_eq!(doc["relatorios"]["03/03/2025"], "Planejamento anual.");
        assert_eq!(store.company().await.unwrap().unwrap().founding_date, "2010");
    }

    #[tokio::test]
    async fn top_level_founding_date_fills_in_the_company() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banco.json");
        tokio::fs::write(
            &path,
            r#"{"empresa": {"nome": "Eloy", "data_fundacao": ""}, "data_fundacao": "5-5-2010"}"#,
        )
        .await
        .unwrap();
        let company = JsonFileStore::new(&path).company().await.unwrap().unwrap();
        assert_eq!(company.founding_date, "05/05/2010");
    }

    #[tokio::test]
    async fn unpadded_report_dates_are_reachable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banco.json");
        tokio::fs::write(
            &path,
            r#"{"relatorios": {"1/1/2025": "Início do ano", "sem data": "rascunho"}}"#,
        )
        .await
        .unwrap();

        let store = JsonFileStore::new(&path);
        assert_eq!(
            store.report("01/01/2025").await.unwrap().map(|r| r.content),
            Some("Início do ano".to_string())
        );
        assert!(store.remove_report("01/01/2025").await.unwrap());
        let dates: Vec<String> = store.reports().await.unwrap().into_iter().map(|r| r.date).collect();
        assert_eq!(dates, vec!["sem data".to_string()]);
    }

    #[tokio::test]
    async fn corrupt_document_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banco.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();
        let store = JsonFileStore::new(&path);
        assert!(matches!(store.employees().await, Err(EloyError::Store(_))));
    }

    #[tokio::test]
    async fn written_document_uses_the_portuguese_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store
            .set_company(Company {
                name: "Eloy Ltda".to_string(),
                founding_date: "05/05/2010".to_string(),
            })
            .await
            .unwrap();
        store
            .upsert_employee(Employee::new("Ana", "Analista"))
            .await
            .unwrap();

        let raw = tokio::fs::read_to_string(store.path()).await.unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["empresa"]["data_fundacao"], "05/05/2010");
        assert_eq!(doc["funcionarios"][0]["cargo"], "Analista");
        assert!(doc["relatorios"].is_object());
        assert!(doc["projetos"].is_array());
    }
}
