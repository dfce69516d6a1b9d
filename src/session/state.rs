use serde_json::{Map, Value, json};

/// Menus reachable from the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Menu {
    Main,
    Reports,
    Team,
}

impl Menu {
    pub fn tag(&self) -> &'static str {
        match self {
            Menu::Main => "principal",
            Menu::Reports => "relatorios",
            Menu::Team => "equipe",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "principal" => Some(Menu::Main),
            "relatorios" => Some(Menu::Reports),
            "equipe" => Some(Menu::Team),
            _ => None,
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            Menu::Main => {
                "📋 Menu principal\n\
                 1 - Relatórios\n\
                 2 - Equipe\n\
                 3 - Empresa\n\
                 0 - Voltar ao chat"
            }
            Menu::Reports => {
                "📝 Relatórios\n\
                 1 - Listar relatórios\n\
                 2 - Adicionar relatório\n\
                 3 - Editar relatório\n\
                 4 - Remover relatório\n\
                 0 - Voltar"
            }
            Menu::Team => {
                "👥 Equipe\n\
                 1 - Listar equipe\n\
                 2 - Adicionar membro\n\
                 3 - Remover membro\n\
                 0 - Voltar"
            }
        }
    }
}

/// A command that has been chosen but still needs its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    AddReport,
    EditReport,
    RemoveReport,
    AddMember,
    RemoveMember,
}

impl PendingAction {
    pub fn tag(&self) -> &'static str {
        match self {
            PendingAction::AddReport => "adicionar_relatorio",
            PendingAction::EditReport => "editar_relatorio",
            PendingAction::RemoveReport => "remover_relatorio",
            PendingAction::AddMember => "adicionar_membro",
            PendingAction::RemoveMember => "remover_membro",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "adicionar_relatorio" => Some(PendingAction::AddReport),
            "editar_relatorio" => Some(PendingAction::EditReport),
            "remover_relatorio" => Some(PendingAction::RemoveReport),
            "adicionar_membro" => Some(PendingAction::AddMember),
            "remover_membro" => Some(PendingAction::RemoveMember),
            _ => None,
        }
    }

    /// The menu the conversation returns to once the action completes.
    pub fn menu(&self) -> Menu {
        match self {
            PendingAction::AddReport | PendingAction::EditReport | PendingAction::RemoveReport => {
                Menu::Reports
            }
            PendingAction::AddMember | PendingAction::RemoveMember => Menu::Team,
        }
    }

    pub fn prompt(&self) -> &'static str {
        match self {
            PendingAction::AddReport => {
                "Envie o relatório no formato DD/MM/AAAA: conteúdo (ou 'cancelar')."
            }
            PendingAction::EditReport => {
                "Envie a data do relatório e o novo conteúdo: DD/MM/AAAA: conteúdo (ou 'cancelar')."
            }
            PendingAction::RemoveReport => {
                "Informe a data do relatório a remover (DD/MM/AAAA) ou 'cancelar'."
            }
            PendingAction::AddMember => "Informe o membro no formato Nome - Cargo (ou 'cancelar').",
            PendingAction::RemoveMember => "Informe o nome do membro a remover (ou 'cancelar').",
        }
    }
}

/// Where a conversation currently is. Clients hold this between requests
/// as the `contexto` object; the server keeps nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Chat,
    Menu(Menu),
    Awaiting(PendingAction),
}

impl SessionState {
    /// Reads a client-supplied context. Anything that does not describe a
    /// known, consistent state is treated as plain chat.
    pub fn from_context(context: &Value) -> Self {
        let Some(object) = context.as_object() else {
            return SessionState::Chat;
        };

        let menu = match object.get("menu") {
            Some(Value::String(tag)) => Menu::from_tag(tag),
            _ => None,
        };
        let pending = match object.get("pendente") {
            None | Some(Value::Null) => None,
            Some(Value::String(tag)) => match PendingAction::from_tag(tag) {
                Some(action) => Some(action),
                None => return SessionState::Chat,
            },
            Some(_) => return SessionState::Chat,
        };

        match (menu, pending) {
            (Some(menu), Some(action)) if action.menu() == menu => SessionState::Awaiting(action),
            (Some(menu), None) => SessionState::Menu(menu),
            _ => SessionState::Chat,
        }
    }

    pub fn to_context(&self) -> Value {
        match self {
            SessionState::Chat => Value::Object(Map::new()),
            SessionState::Menu(menu) => json!({ "menu": menu.tag() }),
            SessionState::Awaiting(action) => json!({
                "menu": action.menu().tag(),
                "pendente": action.tag(),
            }),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            SessionState::Chat => "chat livre".to_string(),
            SessionState::Menu(menu) => format!("menu '{}'", menu.tag()),
            SessionState::Awaiting(action) => format!(
                "menu '{}', aguardando '{}'",
                action.menu().tag(),
                action.tag()
            ),
        }
    }
}

impl serde::Serialize for SessionState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_context().serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for SessionState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(SessionState::from_context(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn awaiting_state_survives_the_client_round_trip() {
        let state = SessionState::Awaiting(PendingAction::RemoveMember);
        let wire = state.to_context();
        assert_eq!(wire, json!({"menu": "equipe", "pendente": "remover_membro"}));
        assert_eq!(SessionState::from_context(&wire), state);
    }

    #[test]
    fn chat_is_an_empty_object() {
        assert_eq!(SessionState::Chat.to_context(), json!({}));
        assert_eq!(SessionState::from_context(&json!({})), SessionState::Chat);
    }

    #[test]
    fn malformed_context_means_no_context() {
        for context in [
            Value::Null,
            json!("relatorios"),
            json!([1, 2]),
            json!({"menu": 3}),
            json!({"menu": "financeiro"}),
            json!({"menu": "relatorios", "pendente": "adicionar_membro"}),
            json!({"menu": "equipe", "pendente": "voar"}),
            json!({"menu": "equipe", "pendente": 7}),
            json!({"pendente": "remover_membro"}),
        ] {
            assert_eq!(
                SessionState::from_context(&context),
                SessionState::Chat,
                "context {context} should be ignored"
            );
        }
    }

    #[test]
    fn extra_keys_and_null_pending_are_tolerated() {
        let context = json!({"menu": "relatorios", "pendente": null, "ultimo": "x"});
        assert_eq!(
            SessionState::from_context(&context),
            SessionState::Menu(Menu::Reports)
        );
    }

    #[test]
    fn deserializes_leniently_inside_request_bodies() {
        #[derive(serde::Deserialize)]
        struct Body {
            contexto: SessionState,
        }
        let body: Body = serde_json::from_str(r#"{"contexto": "lixo"}"#).unwrap();
        assert_eq!(body.contexto, SessionState::Chat);
    }
}
