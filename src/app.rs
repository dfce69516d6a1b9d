use crate::commands::{ChatState, dispatcher::CommandDispatcher};
use crate::config::Config;
use crate::core::error::EloyError;
use crate::display;
use crate::input;
use crate::providers::Message;
use crate::session::{Conversation, Routed, SessionState};
use futures::StreamExt;
use is_terminal::IsTerminal;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

pub struct Application {
    pub config: Config,
    pub conversation: Arc<Conversation>,
    pub command_dispatcher: CommandDispatcher,
}

impl Application {
    pub fn new(
        config: Config,
        conversation: Arc<Conversation>,
        command_dispatcher: CommandDispatcher,
    ) -> Self {
        Self {
            config,
            conversation,
            command_dispatcher,
        }
    }

    /// Interactive loop on a terminal, line-by-line batch otherwise.
    pub async fn run_chat(&self) -> Result<(), EloyError> {
        if io::stdin().is_terminal() {
            self.handle_interactive_mode().await
        } else {
            self.handle_batch_mode().await
        }
    }

    /// Prints the reply to one message as JSON, ready to be fed back with
    /// `--contexto`.
    pub async fn ask(&self, mensagem: &str, contexto: Option<&str>) -> Result<(), EloyError> {
        let state = match contexto {
            Some(raw) => match serde_json::from_str::<serde_json::Value>(raw) {
                Ok(value) => SessionState::from_context(&value),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring unreadable context");
                    SessionState::Chat
                }
            },
            None => SessionState::Chat,
        };

        let reply = self.conversation.handle(mensagem, state).await;
        println!("{}", serde_json::to_string_pretty(&reply)?);
        Ok(())
    }

    /// Returns false when a slash command asked to stop.
    fn run_command(&self, line: &str, state: &mut ChatState) -> bool {
        match self.command_dispatcher.execute_line(line, state) {
            Some(Ok(Some(output))) => println!("{}", output),
            Some(Ok(None)) | None => {}
            Some(Err(e)) => display::display_error(&e.to_string()),
        }
        state.should_continue
    }

    fn is_slash_command(line: &str) -> bool {
        line.starts_with('/') && !line.eq_ignore_ascii_case("/menu")
    }

    async fn handle_batch_mode(&self) -> Result<(), EloyError> {
        self.run_batch(BufReader::new(tokio::io::stdin())).await?;
        Ok(())
    }

    /// Answers each non-empty line in turn; returns the final state.
    async fn run_batch<R: AsyncBufRead + Unpin>(&self, reader: R) -> Result<SessionState, EloyError> {
        let mut state = ChatState::new(&self.config.assistant_name);
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if Self::is_slash_command(line) {
                if !self.run_command(line, &mut state) {
                    break;
                }
                continue;
            }

            let reply = self.conversation.handle(line, state.session).await;
            display::display_reply(&state.assistant_name, &reply.text);
            state.session = reply.state;
        }

        Ok(state.session)
    }

    async fn handle_interactive_mode(&self) -> Result<(), EloyError> {
        let mut state = ChatState::new(&self.config.assistant_name);
        let history_path = Config::history_path();
        let mut editor = input::create_editor(self.command_dispatcher.clone(), &history_path)?;

        display::display_welcome(
            &state.assistant_name,
            self.conversation.provider().model(),
            self.conversation.store().kind(),
        );

        loop {
            let input = match input::read_input(&mut editor)? {
                Some(input) => input.trim().to_string(),
                None => break,
            };

            if input.is_empty() {
                continue;
            }

            if Self::is_slash_command(&input) {
                if !self.run_command(&input, &mut state) {
                    break;
                }
                continue;
            }

            match self.conversation.route(&input, state.session).await {
                Routed::Reply(reply) => {
                    display::display_reply(&state.assistant_name, &reply.text);
                    state.session = reply.state;
                }
                Routed::Forward {
                    messages,
                    state: next,
                } => {
                    self.stream_answer(&state.assistant_name, &messages).await?;
                    state.session = next;
                }
            }
        }

        display::display_info("Até logo!");
        if let Err(e) = input::save_history(&mut editor, &history_path) {
            tracing::warn!(error = %e, "could not save input history");
        }

        Ok(())
    }

    async fn stream_answer(&self, assistant_name: &str, messages: &[Message]) -> Result<(), EloyError> {
        let mut stream = match self
            .conversation
            .provider()
            .get_response_stream(messages)
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(error = %e, "completion request failed");
                display::display_reply(assistant_name, &format!("(Erro ao consultar a IA: {})", e));
                return Ok(());
            }
        };

        display::display_assistant_prefix(assistant_name);
        io::stdout().flush()?;

        while let Some(chunk_result) = stream.next().await {
            match chunk_result {
                Ok(chunk) => {
                    print!("{}", chunk);
                    io::stdout().flush()?;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "completion stream interrupted");
                    print!("\n(Erro ao consultar a IA: {})", e);
                    break;
                }
            }
        }

        println!();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::create_command_registry;
    use crate::providers::offline::OfflineProvider;
    use crate::session::state::Menu;
    use crate::store::{JsonFileStore, RecordStore};

    #[tokio::test]
    async fn batch_input_runs_until_quit() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path().join("banco.json")));
        let provider = Arc::new(OfflineProvider::new("Eloy"));
        let conversation = Arc::new(Conversation::new(store.clone(), provider, "Eloy"));
        let app = Application::new(Config::default(), conversation, create_command_registry());

        let input = "menu\n2\n\n2\nAna - Analista\n/sair\nadicionar membro Bruno - Dev\n";
        let state = app.run_batch(input.as_bytes()).await.unwrap();

        assert_eq!(state, SessionState::Menu(Menu::Team));
        let team = store.employees().await.unwrap();
        assert_eq!(team.len(), 1);
        assert_eq!(team[0].name, "Ana");
    }
}
