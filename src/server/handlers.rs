use super::AppState;
use super::error::{ApiError, JsonBody};
use crate::session::{Reply, SessionState};
use crate::store::{Company, Employee, Report, Upsert, normalize_date};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

type Created<T> = (StatusCode, Json<T>);

fn status_for(upsert: Upsert) -> StatusCode {
    match upsert {
        Upsert::Created => StatusCode::CREATED,
        Upsert::Updated => StatusCode::OK,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChatRequest {
    pub mensagem: String,
    pub contexto: SessionState,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmployeeBody {
    pub nome: String,
    pub cargo: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReportBody {
    pub data: String,
    pub conteudo: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CompanyBody {
    pub nome: String,
    pub data_fundacao: String,
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let conversation = &state.conversation;
    Json(json!({
        "status": "online",
        "assistente": conversation.assistant_name(),
        "modelo": conversation.provider().model(),
        "armazenamento": conversation.store().kind(),
    }))
}

pub async fn chat(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ChatRequest>,
) -> Json<Reply> {
    tracing::info!(state = %request.contexto.describe(), "chat message received");
    Json(
        state
            .conversation
            .handle(&request.mensagem, request.contexto)
            .await,
    )
}

pub async fn list_team(State(state): State<AppState>) -> Result<Json<Vec<Employee>>, ApiError> {
    Ok(Json(state.store().employees().await?))
}

pub async fn add_member(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<EmployeeBody>,
) -> Result<Created<Employee>, ApiError> {
    if body.nome.trim().is_empty() {
        return Err(ApiError::bad_request("Campo 'nome' é obrigatório."));
    }
    let employee = Employee::new(body.nome, body.cargo);
    let upsert = state.store().upsert_employee(employee.clone()).await?;
    Ok((status_for(upsert), Json(employee)))
}

pub async fn update_member(
    State(state): State<AppState>,
    Path(nome): Path<String>,
    JsonBody(body): JsonBody<EmployeeBody>,
) -> Result<Json<Employee>, ApiError> {
    let role = body.cargo.trim();
    if role.is_empty() {
        return Err(ApiError::bad_request("Campo 'cargo' é obrigatório."));
    }
    let updated = if state.store().update_role(&nome, role).await? {
        state
            .store()
            .employees()
            .await?
            .into_iter()
            .find(|e| e.matches(&nome))
    } else {
        None
    };
    updated.map(Json).ok_or_else(|| {
        ApiError::not_found(format!("Funcionário '{}' não encontrado.", nome.trim()))
    })
}

pub async fn remove_member(
    State(state): State<AppState>,
    Path(nome): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !state.store().remove_employee(&nome).await? {
        return Err(ApiError::not_found(format!(
            "Funcionário '{}' não encontrado.",
            nome.trim()
        )));
    }
    Ok(Json(json!({ "removido": nome.trim() })))
}

pub async fn list_reports(State(state): State<AppState>) -> Result<Json<Vec<Report>>, ApiError> {
    Ok(Json(state.store().reports().await?))
}

pub async fn add_report(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ReportBody>,
) -> Result<Created<Report>, ApiError> {
    let date = normalize_date(&body.data)?;
    let content = body.conteudo.trim();
    if content.is_empty() {
        return Err(ApiError::bad_request("Campo 'conteudo' é obrigatório."));
    }
    let report = Report {
        date,
        content: content.to_string(),
    };
    let upsert = state.store().put_report(report.clone()).await?;
    Ok((status_for(upsert), Json(report)))
}

pub async fn get_report(
    State(state): State<AppState>,
    Path(data): Path<String>,
) -> Result<Json<Report>, ApiError> {
    let date = normalize_date(&data)?;
    state
        .store()
        .report(&date)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Relatório de {} não encontrado.", date)))
}

pub async fn update_report(
    State(state): State<AppState>,
    Path(data): Path<String>,
    JsonBody(body): JsonBody<ReportBody>,
) -> Result<Json<Report>, ApiError> {
    let date = normalize_date(&data)?;
    let content = body.conteudo.trim();
    if content.is_empty() {
        return Err(ApiError::bad_request("Campo 'conteudo' é obrigatório."));
    }
    if state.store().report(&date).await?.is_none() {
        return Err(ApiError::not_found(format!(
            "Relatório de {} não encontrado.",
            date
        )));
    }
    let report = Report {
        date,
        content: content.to_string(),
    };
    state.store().put_report(report.clone()).await?;
    Ok(Json(report))
}

pub async fn remove_report(
    State(state): State<AppState>,
    Path(data): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let date = normalize_date(&data)?;
    if !state.store().remove_report(&date).await? {
        return Err(ApiError::not_found(format!(
            "Relatório de {} não encontrado.",
            date
        )));
    }
    Ok(Json(json!({ "removido": date })))
}

pub async fn get_company(State(state): State<AppState>) -> Result<Json<Company>, ApiError> {
    state
        .store()
        .company()
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Nenhuma informação da empresa cadastrada."))
}

pub async fn set_company(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CompanyBody>,
) -> Result<Json<Company>, ApiError> {
    let name = body.nome.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Campo 'nome' é obrigatório."));
    }
    let founding_date = if body.data_fundacao.trim().is_empty() {
        String::new()
    } else {
        normalize_date(&body.data_fundacao)?
    };
    let company = Company {
        name: name.to_string(),
        founding_date,
    };
    state.store().set_company(company.clone()).await?;
    Ok(Json(company))
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("rota não encontrada")
}
