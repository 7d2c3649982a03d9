pub mod evaluator;
pub mod feedback;
pub mod gemini_evaluator;
pub mod generation;
pub mod interview;
pub mod lifecycle;
pub mod orchestrator;
pub mod prompt_loader;
pub mod prompts;
pub mod repository;
pub mod router;
pub mod session;
pub mod store;
pub mod transcript;
pub mod voice;

use router::Destination;

/// Represents commands that a running session issues to the runtime.
///
/// This enum is the primary API for decoupling the session's decisions from
/// how the runtime presents them (a terminal, a web client, a test harness).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Latest transcript line, shown as a live caption.
    Caption(String),
    /// Whether the assistant is currently speaking.
    Speaking(bool),
    /// A message the user should see.
    Notify(String),
    /// Feedback generation started (`true`) or finished (`false`).
    Processing(bool),
    /// The session is over; go here next.
    Navigate(Destination),
}
