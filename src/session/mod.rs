pub mod prompt;
pub mod router;
pub mod state;

pub use router::{Conversation, Reply, Routed};
pub use state::SessionState;
