use super::ChatState;
use crate::core::error::EloyError;
use crate::session::SessionState;

use console::style;

pub trait CommandHandler {
    fn execute(&self, state: &mut ChatState, args: &[&str]) -> Result<Option<String>, EloyError>;
    fn help(&self) -> &'static str;
}

pub struct QuitCommand;
pub struct RestartCommand;
pub struct ContextCommand;
pub struct ClearCommand;

pub struct HelpCommand {
    lines: Vec<&'static str>,
}

impl HelpCommand {
    pub fn new(lines: Vec<&'static str>) -> Self {
        Self { lines }
    }
}

impl CommandHandler for QuitCommand {
    fn execute(&self, state: &mut ChatState, _args: &[&str]) -> Result<Option<String>, EloyError> {
        state.should_continue = false;
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "/sair - Encerra a conversa"
    }
}

impl CommandHandler for HelpCommand {
    fn execute(
        &self,
        state: &mut ChatState,
        _args: &[&str],
    ) -> Result<Option<String>, EloyError> {
        let title = style("Comandos disponíveis").bold().underlined();
        let mut help_text = vec![title.to_string()];
        help_text.extend(self.lines.iter().map(|line| style(line).to_string()));
        help_text.push(style(self.help()).to_string());
        help_text.push(String::new());
        help_text.push(format!(
            "Digite 'menu' para navegar pelos registros ou converse com {} livremente.",
            state.assistant_name
        ));
        Ok(Some(help_text.join("\n")))
    }

    fn help(&self) -> &'static str {
        "/ajuda - Mostra os comandos disponíveis"
    }
}

impl CommandHandler for RestartCommand {
    fn execute(&self, state: &mut ChatState, _args: &[&str]) -> Result<Option<String>, EloyError> {
        state.session = SessionState::Chat;
        Ok(Some("Conversa reiniciada.".to_string()))
    }

    fn help(&self) -> &'static str {
        "/reiniciar - Volta ao chat livre, descartando menus e ações pendentes"
    }
}

impl CommandHandler for ContextCommand {
    fn execute(&self, state: &mut ChatState, _args: &[&str]) -> Result<Option<String>, EloyError> {
        Ok(Some(format!(
            "Contexto atual: {} {}",
            state.session.describe(),
            state.session.to_context()
        )))
    }

    fn help(&self) -> &'static str {
        "/contexto - Mostra o contexto da conversa"
    }
}

impl CommandHandler for ClearCommand {
    fn execute(&self, _state: &mut ChatState, _args: &[&str]) -> Result<Option<String>, EloyError> {
        console::Term::stdout().clear_screen()?;
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "/limpar - Limpa a tela"
    }
}
