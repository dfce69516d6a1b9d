pub mod dispatcher;
pub mod handler;
pub mod registry;

use crate::session::SessionState;
pub use dispatcher::create_command_registry;

/// Terminal session: the conversation state threaded between turns.
pub struct ChatState {
    pub session: SessionState,
    pub assistant_name: String,
    pub should_continue: bool,
}

impl ChatState {
    pub fn new(assistant_name: &str) -> Self {
        Self {
            session: SessionState::default(),
            assistant_name: assistant_name.to_string(),
            should_continue: true,
        }
    }
}
