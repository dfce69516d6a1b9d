use crate::commands::handler::CommandHandler;
use crate::core::error::EloyError;
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct CommandRegistry {
    handlers: BTreeMap<String, Arc<dyn CommandHandler + Send + Sync>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    pub fn register<C: CommandHandler + Send + Sync + 'static>(&mut self, name: &str, command: C) {
        self.handlers.insert(name.to_string(), Arc::new(command));
    }

    pub fn execute(
        &self,
        name: &str,
        args: &[&str],
        state: &mut super::ChatState,
    ) -> Result<Option<String>, EloyError> {
        self.handlers
            .get(name)
            .ok_or_else(|| {
                EloyError::Input(format!(
                    "Comando desconhecido: /{}. Digite /ajuda para ver os comandos.",
                    name
                ))
            })
            .and_then(|handler| handler.execute(state, args))
    }

    pub fn get_command_names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    /// One help line per command, in name order.
    pub fn help_lines(&self) -> Vec<&'static str> {
        self.handlers.values().map(|h| h.help()).collect()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
