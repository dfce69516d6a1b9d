use super::{
    ChatState,
    handler::{ClearCommand, ContextCommand, HelpCommand, QuitCommand, RestartCommand},
    registry::CommandRegistry,
};
use crate::core::error::EloyError;
use std::sync::Arc;

#[derive(Clone)]
pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry }
    }

    pub fn execute(
        &self,
        command: &str,
        args: &[&str],
        state: &mut ChatState,
    ) -> Result<Option<String>, EloyError> {
        self.registry.execute(command, args, state)
    }

    /// Splits a `/command arg...` line and runs it. Returns `None` when the
    /// line is not a slash command.
    pub fn execute_line(
        &self,
        line: &str,
        state: &mut ChatState,
    ) -> Option<Result<Option<String>, EloyError>> {
        let rest = line.trim().strip_prefix('/')?;
        let mut parts = rest.split_whitespace();
        let command = parts.next()?;
        let args: Vec<&str> = parts.collect();
        Some(self.execute(command, &args, state))
    }

    pub fn get_command_names(&self) -> Vec<String> {
        self.registry.get_command_names()
    }
}

pub fn create_command_registry() -> CommandDispatcher {
    let mut registry = CommandRegistry::new();

    registry.register("sair", QuitCommand);
    registry.register("reiniciar", RestartCommand);
    registry.register("contexto", ContextCommand);
    registry.register("limpar", ClearCommand);

    let lines = registry.help_lines();
    registry.register("ajuda", HelpCommand::new(lines));

    CommandDispatcher::new(Arc::new(registry))
}
