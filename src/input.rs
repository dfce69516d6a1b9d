use crate::commands::dispatcher::CommandDispatcher;
use crate::core::error::EloyError;

use console::style;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::{Hinter, HistoryHinter};
use rustyline::history::FileHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, EditMode, Editor, Helper};
use std::borrow::Cow;
use std::path::Path;

/// Words the router understands outside slash commands.
const KEYWORDS: &[&str] = &[
    "menu",
    "cancelar",
    "adicionar membro",
    "remover membro",
    "adicionar relatório",
    "editar relatório",
    "remover relatório",
    "ver relatório",
    "listar equipe",
    "listar relatórios",
    "empresa",
];

/// Completes `/commands` from the registry and router keywords at line start.
pub struct ChatCompleter {
    command_registry: CommandDispatcher,
}

impl ChatCompleter {
    pub fn new(command_registry: CommandDispatcher) -> Self {
        Self { command_registry }
    }

    fn candidates(&self, line: &str) -> Vec<Pair> {
        if let Some(command_part) = line.strip_prefix('/') {
            let mut commands = self.command_registry.get_command_names();
            commands.push("menu".to_string());
            commands
                .into_iter()
                .filter(|cmd| cmd.starts_with(command_part))
                .map(|cmd| Pair {
                    display: format!("/{}", cmd),
                    replacement: format!("/{}", cmd),
                })
                .collect()
        } else if line.is_empty() {
            Vec::new()
        } else {
            let lowered = line.to_lowercase();
            KEYWORDS
                .iter()
                .filter(|kw| kw.starts_with(&lowered))
                .map(|kw| Pair {
                    display: kw.to_string(),
                    replacement: kw.to_string(),
                })
                .collect()
        }
    }
}

impl Completer for ChatCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let matches = line.get(..pos).map(|l| self.candidates(l)).unwrap_or_default();
        Ok((0, matches))
    }
}

pub struct ChatHelper {
    completer: ChatCompleter,
    hinter: HistoryHinter,
}

impl ChatHelper {
    pub fn new(command_registry: CommandDispatcher) -> Self {
        Self {
            completer: ChatCompleter::new(command_registry),
            hinter: HistoryHinter {},
        }
    }
}

impl Helper for ChatHelper {}

impl Completer for ChatHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        self.completer.complete(line, pos, ctx)
    }
}

impl Hinter for ChatHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Option<String> {
        self.hinter.hint(line, pos, ctx)
    }
}

impl Highlighter for ChatHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(style(hint).dim().to_string())
    }
}

impl Validator for ChatHelper {}

pub type ChatEditor = Editor<ChatHelper, FileHistory>;

pub fn create_editor(
    command_registry: CommandDispatcher,
    history_path: &Path,
) -> Result<ChatEditor, EloyError> {
    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(false)
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .build();

    let mut editor = Editor::with_config(config)
        .map_err(|e| EloyError::Input(format!("Falha ao iniciar o editor de linha: {}", e)))?;
    editor.set_helper(Some(ChatHelper::new(command_registry)));

    if let Err(e) = editor.load_history(history_path) {
        tracing::debug!(path = %history_path.display(), error = %e, "no input history loaded");
    }

    Ok(editor)
}

/// Reads one line; `None` on Ctrl-C or Ctrl-D.
pub fn read_input(editor: &mut ChatEditor) -> Result<Option<String>, EloyError> {
    let prompt = if cfg!(windows) && std::env::var("PSModulePath").is_ok() {
        "> ".to_string()
    } else {
        style("> ").bold().cyan().to_string()
    };
    match editor.readline(&prompt) {
        Ok(line) => {
            if !line.trim().is_empty() {
                editor
                    .add_history_entry(line.as_str())
                    .map_err(|e| EloyError::Input(format!("Falha ao gravar histórico: {}", e)))?;
            }
            Ok(Some(line))
        }
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
        Err(err) => Err(EloyError::Input(format!("Erro de entrada: {}", err))),
    }
}

pub fn save_history(editor: &mut ChatEditor, history_path: &Path) -> Result<(), EloyError> {
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    editor
        .save_history(history_path)
        .map_err(|e| EloyError::Input(format!("Falha ao salvar histórico: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::create_command_registry;

    fn replacements(line: &str) -> Vec<String> {
        ChatCompleter::new(create_command_registry())
            .candidates(line)
            .into_iter()
            .map(|p| p.replacement)
            .collect()
    }

    #[test]
    fn slash_prefix_completes_commands() {
        assert_eq!(replacements("/re"), vec!["/reiniciar"]);
        assert!(replacements("/").contains(&"/menu".to_string()));
    }

    #[test]
    fn words_complete_router_keywords() {
        assert_eq!(
            replacements("Remover r"),
            vec!["remover relatório".to_string()]
        );
        assert!(replacements("").is_empty());
    }
}
