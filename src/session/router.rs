use super::prompt::system_prompt;
use super::state::{Menu, PendingAction, SessionState};
use crate::core::error::EloyError;
use crate::providers::{LLMProvider, Message};
use crate::store::{Employee, RecordStore, Report, Upsert, normalize_date};
use regex::Regex;
use serde::Serialize;
use std::sync::{Arc, LazyLock};

const GREETINGS: &[&str] = &[
    "oi", "olá", "ola", "hey", "hello", "bom dia", "boa tarde", "boa noite",
];

const DIRECT_COMMANDS: &[(&str, PendingAction)] = &[
    ("adicionar membro", PendingAction::AddMember),
    ("remover membro", PendingAction::RemoveMember),
    ("adicionar relatorio", PendingAction::AddReport),
    ("adicionar relatório", PendingAction::AddReport),
    ("editar relatorio", PendingAction::EditReport),
    ("editar relatório", PendingAction::EditReport),
    ("remover relatorio", PendingAction::RemoveReport),
    ("remover relatório", PendingAction::RemoveReport),
];

const VIEW_REPORT: &[&str] = &["ver relatorio", "ver relatório"];

static REPORT_ARG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*(\d{1,2}[/.\-]\d{1,2}[/.\-]\d{4})(?:\s*[:,\-]\s*|\s+)(\S.*?)\s*$")
        .expect("report argument pattern is valid")
});

/// What happened, for clients that want more than the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Action {
    #[serde(rename = "saudacao")]
    Greeting,
    #[serde(rename = "menu")]
    Menu,
    #[serde(rename = "aguardando_entrada")]
    AwaitingInput,
    #[serde(rename = "cancelado")]
    Cancelled,
    #[serde(rename = "opcao_invalida")]
    InvalidOption,
    #[serde(rename = "nao_encontrado")]
    NotFound,
    #[serde(rename = "listar_relatorios")]
    ReportList,
    #[serde(rename = "ver_relatorio")]
    ReportShown,
    #[serde(rename = "relatorio_salvo")]
    ReportSaved,
    #[serde(rename = "relatorio_removido")]
    ReportRemoved,
    #[serde(rename = "listar_equipe")]
    TeamList,
    #[serde(rename = "membro_salvo")]
    MemberSaved,
    #[serde(rename = "membro_removido")]
    MemberRemoved,
    #[serde(rename = "empresa")]
    Company,
    #[serde(rename = "chat")]
    Chat,
    #[serde(rename = "erro")]
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    #[serde(rename = "resposta")]
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    #[serde(rename = "contexto")]
    pub state: SessionState,
}

impl Reply {
    fn new(text: impl Into<String>, action: Action, state: SessionState) -> Self {
        Self {
            text: text.into(),
            action: Some(action),
            state,
        }
    }
}

/// Result of routing one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    /// Answered locally.
    Reply(Reply),
    /// Needs the model; `messages` is ready to send and `state` is the
    /// state to hand back with the model's answer.
    Forward {
        messages: Vec<Message>,
        state: SessionState,
    },
}

/// Strips `prefix` from `text` ignoring case, only at a word boundary.
fn strip_command<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let n = prefix.chars().count();
    let split = text
        .char_indices()
        .nth(n)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let (head, rest) = text.split_at(split);
    if head.to_lowercase() != prefix {
        return None;
    }
    match rest.chars().next() {
        None => Some(""),
        Some(c) if c.is_whitespace() || c == ':' => {
            Some(rest.trim_start_matches(|c: char| c.is_whitespace() || c == ':'))
        }
        Some(_) => None,
    }
}

fn is_greeting(lowered: &str) -> bool {
    let bare = lowered.trim_end_matches(['!', '.', '?', ',']).trim();
    GREETINGS.contains(&bare)
}

fn preview(content: &str, max_chars: usize) -> String {
    let single_line = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= max_chars {
        single_line
    } else {
        let cut: String = single_line.chars().take(max_chars).collect();
        format!("{}…", cut.trim_end())
    }
}

/// `Nome - Cargo`, also accepting `,` or `:` as the separator.
pub fn parse_member(arg: &str) -> Result<Employee, EloyError> {
    let arg = arg.trim();
    let split = [" - ", ",", ":", "-"]
        .iter()
        .find_map(|sep| arg.split_once(sep));
    match split {
        Some((name, role)) if !name.trim().is_empty() && !role.trim().is_empty() => {
            Ok(Employee::new(name, role))
        }
        _ => Err(EloyError::Input(
            "Formato inválido. Use: Nome - Cargo.".to_string(),
        )),
    }
}

/// `DD/MM/AAAA: conteúdo`; the content may span several lines.
pub fn parse_report(arg: &str) -> Result<Report, EloyError> {
    let invalid =
        || EloyError::Input("Formato inválido. Use: DD/MM/AAAA: conteúdo.".to_string());
    let caps = REPORT_ARG.captures(arg).ok_or_else(invalid)?;
    let date = normalize_date(&caps[1])?;
    let content = caps[2].trim();
    if content.is_empty() {
        return Err(invalid());
    }
    Ok(Report {
        date,
        content: content.to_string(),
    })
}

/// Routes messages between the menus, the record store and the model.
pub struct Conversation {
    store: Arc<dyn RecordStore>,
    provider: Arc<dyn LLMProvider>,
    assistant_name: String,
}

impl Conversation {
    pub fn new(
        store: Arc<dyn RecordStore>,
        provider: Arc<dyn LLMProvider>,
        assistant_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            provider,
            assistant_name: assistant_name.into(),
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn provider(&self) -> &Arc<dyn LLMProvider> {
        &self.provider
    }

    pub fn assistant_name(&self) -> &str {
        &self.assistant_name
    }

    pub fn greeting(&self) -> String {
        format!(
            "👋 Olá! Sou {}, seu assistente corporativo. Digite 'menu' para ver as opções ou pergunte o que quiser!",
            self.assistant_name
        )
    }

    /// Routes and, when needed, asks the model. Model failures are folded
    /// into the reply text.
    pub async fn handle(&self, input: &str, state: SessionState) -> Reply {
        match self.route(input, state).await {
            Routed::Reply(reply) => reply,
            Routed::Forward { messages, state } => {
                match self.provider.get_response(&messages).await {
                    Ok(answer) => Reply::new(answer, Action::Chat, state),
                    Err(e) => {
                        tracing::warn!(error = %e, "completion request failed");
                        Reply::new(
                            format!("(Erro ao consultar a IA: {})", e),
                            Action::Error,
                            state,
                        )
                    }
                }
            }
        }
    }

    pub async fn route(&self, input: &str, state: SessionState) -> Routed {
        let text = input.trim();
        let lowered = text.to_lowercase();

        if text.is_empty() {
            return Routed::Reply(Reply {
                text: "Digite uma mensagem ou 'menu' para ver as opções.".to_string(),
                action: None,
                state,
            });
        }
        if is_greeting(&lowered) {
            tracing::debug!("greeting");
            return Routed::Reply(Reply::new(self.greeting(), Action::Greeting, state));
        }
        if matches!(lowered.as_str(), "menu" | "ajuda" | "/menu") {
            return Routed::Reply(self.show_menu(Menu::Main));
        }

        tracing::debug!(state = %state.describe(), "routing message");
        match state {
            SessionState::Awaiting(action) => {
                Routed::Reply(self.complete_pending(action, text, &lowered).await)
            }
            SessionState::Menu(menu) => Routed::Reply(self.choose(menu, &lowered).await),
            SessionState::Chat => self.chat(text, &lowered).await,
        }
    }

    fn show_menu(&self, menu: Menu) -> Reply {
        Reply::new(menu.text(), Action::Menu, SessionState::Menu(menu))
    }

    fn back_to_chat(&self) -> Reply {
        Reply::new(
            "Voltando ao chat. Pode perguntar o que quiser!",
            Action::Chat,
            SessionState::Chat,
        )
    }

    fn ask_for(&self, action: PendingAction) -> Reply {
        Reply::new(
            action.prompt(),
            Action::AwaitingInput,
            SessionState::Awaiting(action),
        )
    }

    fn store_failure(&self, error: EloyError, state: SessionState) -> Reply {
        tracing::warn!(error = %error, "record store request failed");
        Reply::new(
            format!("(Erro ao acessar os registros: {})", error),
            Action::Error,
            state,
        )
    }

    /// Appends the menu text to a reply given while a menu is open.
    fn in_menu(&self, (text, action): (String, Action), menu: Menu) -> Reply {
        Reply::new(
            format!("{}\n\n{}", text, menu.text()),
            action,
            SessionState::Menu(menu),
        )
    }

    async fn choose(&self, menu: Menu, choice: &str) -> Reply {
        let state = SessionState::Menu(menu);
        let listed = match (menu, choice) {
            (Menu::Main, "1" | "relatorios" | "relatórios") => return self.show_menu(Menu::Reports),
            (Menu::Main, "2" | "equipe") => return self.show_menu(Menu::Team),
            (Menu::Main, "3" | "empresa") => self.company_info().await,
            (Menu::Main, "0" | "sair" | "voltar") => return self.back_to_chat(),

            (Menu::Reports, "1" | "listar") => self.list_reports().await,
            (Menu::Reports, "2") => return self.ask_for(PendingAction::AddReport),
            (Menu::Reports, "3") => return self.ask_for(PendingAction::EditReport),
            (Menu::Reports, "4") => return self.ask_for(PendingAction::RemoveReport),

            (Menu::Team, "1" | "listar") => self.list_team().await,
            (Menu::Team, "2") => return self.ask_for(PendingAction::AddMember),
            (Menu::Team, "3") => return self.ask_for(PendingAction::RemoveMember),

            (Menu::Reports | Menu::Team, "0" | "voltar") => return self.show_menu(Menu::Main),
            (Menu::Reports | Menu::Team, "sair") => return self.back_to_chat(),

            _ => {
                return Reply::new(
                    format!("Opção inválida.\n\n{}", menu.text()),
                    Action::InvalidOption,
                    state,
                );
            }
        };

        match listed {
            Ok(outcome) => self.in_menu(outcome, menu),
            Err(e) => self.store_failure(e, state),
        }
    }

    async fn complete_pending(&self, action: PendingAction, text: &str, lowered: &str) -> Reply {
        let menu = action.menu();
        if lowered == "cancelar" {
            return self.in_menu(("Operação cancelada.".to_string(), Action::Cancelled), menu);
        }

        match self.perform(action, text).await {
            Ok(outcome) => self.in_menu(outcome, menu),
            Err(EloyError::Input(msg)) => Reply::new(
                format!("{}\n{}", msg, action.prompt()),
                Action::Error,
                SessionState::Awaiting(action),
            ),
            Err(e) => self.store_failure(e, SessionState::Awaiting(action)),
        }
    }

    async fn chat(&self, text: &str, lowered: &str) -> Routed {
        for (prefix, action) in DIRECT_COMMANDS {
            let Some(arg) = strip_command(text, prefix) else {
                continue;
            };
            tracing::debug!(command = action.tag(), "direct command");
            if arg.is_empty() {
                return Routed::Reply(self.ask_for(*action));
            }
            let reply = match self.perform(*action, arg).await {
                Ok((text, outcome)) => Reply::new(text, outcome, SessionState::Chat),
                Err(EloyError::Input(msg)) => Reply::new(
                    format!("{}\n{}", msg, action.prompt()),
                    Action::Error,
                    SessionState::Awaiting(*action),
                ),
                Err(e) => self.store_failure(e, SessionState::Chat),
            };
            return Routed::Reply(reply);
        }

        if let Some(arg) = VIEW_REPORT.iter().find_map(|p| strip_command(text, p)) {
            let reply = match self.show_report(arg).await {
                Ok((text, action)) => Reply::new(text, action, SessionState::Chat),
                Err(EloyError::Input(msg)) => Reply::new(
                    format!("{}\nUse: ver relatório DD/MM/AAAA.", msg),
                    Action::Error,
                    SessionState::Chat,
                ),
                Err(e) => self.store_failure(e, SessionState::Chat),
            };
            return Routed::Reply(reply);
        }

        let shortcut = match lowered {
            "relatorios" | "relatórios" => return Routed::Reply(self.show_menu(Menu::Reports)),
            "equipe" => return Routed::Reply(self.show_menu(Menu::Team)),
            "empresa" => Some(self.company_info().await),
            "listar equipe" => Some(self.list_team().await),
            "listar relatorios" | "listar relatórios" => Some(self.list_reports().await),
            _ => None,
        };
        if let Some(result) = shortcut {
            let reply = match result {
                Ok((text, action)) => Reply::new(text, action, SessionState::Chat),
                Err(e) => self.store_failure(e, SessionState::Chat),
            };
            return Routed::Reply(reply);
        }

        let snapshot = match self.store.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "could not read records for the model briefing");
                Default::default()
            }
        };
        Routed::Forward {
            messages: vec![
                Message::system(system_prompt(&self.assistant_name, &snapshot)),
                Message::user(text),
            ],
            state: SessionState::Chat,
        }
    }

    /// Runs a pending action with its argument. Malformed arguments come back
    /// as `EloyError::Input`; missing records are a normal outcome.
    async fn perform(&self, action: PendingAction, arg: &str) -> Result<(String, Action), EloyError> {
        match action {
            PendingAction::AddReport => {
                let report = parse_report(arg)?;
                let date = report.date.clone();
                let text = match self.store.put_report(report).await? {
                    Upsert::Created => format!("✅ Relatório de {} salvo.", date),
                    Upsert::Updated => format!("✅ Relatório de {} atualizado.", date),
                };
                Ok((text, Action::ReportSaved))
            }
            PendingAction::EditReport => {
                let report = parse_report(arg)?;
                if self.store.report(&report.date).await?.is_none() {
                    return Ok((
                        format!("Relatório de {} não encontrado.", report.date),
                        Action::NotFound,
                    ));
                }
                let date = report.date.clone();
                self.store.put_report(report).await?;
                Ok((format!("✏️ Relatório de {} atualizado.", date), Action::ReportSaved))
            }
            PendingAction::RemoveReport => {
                let date = normalize_date(arg)?;
                if self.store.remove_report(&date).await? {
                    Ok((format!("🗑️ Relatório de {} removido.", date), Action::ReportRemoved))
                } else {
                    Ok((
                        format!("Relatório de {} não encontrado.", date),
                        Action::NotFound,
                    ))
                }
            }
            PendingAction::AddMember => {
                let employee = parse_member(arg)?;
                let text = match self.store.upsert_employee(employee.clone()).await? {
                    Upsert::Created => format!(
                        "✅ {} adicionado(a) à equipe como {}.",
                        employee.name, employee.role
                    ),
                    Upsert::Updated => format!(
                        "✅ Cargo de {} atualizado para {}.",
                        employee.name, employee.role
                    ),
                };
                Ok((text, Action::MemberSaved))
            }
            PendingAction::RemoveMember => {
                let name = arg.trim();
                if name.is_empty() {
                    return Err(EloyError::Input("Informe um nome.".to_string()));
                }
                if self.store.remove_employee(name).await? {
                    Ok((format!("🗑️ {} removido(a) da equipe.", name), Action::MemberRemoved))
                } else {
                    Ok((
                        format!("Funcionário '{}' não encontrado.", name),
                        Action::NotFound,
                    ))
                }
            }
        }
    }

    async fn show_report(&self, arg: &str) -> Result<(String, Action), EloyError> {
        let date = normalize_date(arg)?;
        Ok(match self.store.report(&date).await? {
            Some(report) => (
                format!("📝 Relatório de {}:\n{}", report.date, report.content),
                Action::ReportShown,
            ),
            None => (
                format!("Relatório de {} não encontrado.", date),
                Action::NotFound,
            ),
        })
    }

    async fn list_reports(&self) -> Result<(String, Action), EloyError> {
        let reports = self.store.reports().await?;
        if reports.is_empty() {
            return Ok(("Nenhum relatório cadastrado ainda.".to_string(), Action::ReportList));
        }
        let lines: Vec<String> = reports
            .iter()
            .map(|r| format!("• {}: {}", r.date, preview(&r.content, 60)))
            .collect();
        Ok((format!("📝 Relatórios:\n{}", lines.join("\n")), Action::ReportList))
    }

    async fn list_team(&self) -> Result<(String, Action), EloyError> {
        let employees = self.store.employees().await?;
        if employees.is_empty() {
            return Ok(("Nenhum membro cadastrado na equipe.".to_string(), Action::TeamList));
        }
        let lines: Vec<String> = employees
            .iter()
            .map(|e| {
                if e.role.is_empty() {
                    format!("• {}", e.name)
                } else {
                    format!("• {} - {}", e.name, e.role)
                }
            })
            .collect();
        Ok((format!("👥 Equipe:\n{}", lines.join("\n")), Action::TeamList))
    }

    async fn company_info(&self) -> Result<(String, Action), EloyError> {
        let text = match self.store.company().await? {
            Some(company) if !company.founding_date.is_empty() => format!(
                "🏢 {}, fundada em {}.",
                company.name, company.founding_date
            ),
            Some(company) => format!("🏢 {}.", company.name),
            None => "Nenhuma informação da empresa cadastrada.".to_string(),
        };
        Ok((text, Action::Company))
    }
}
