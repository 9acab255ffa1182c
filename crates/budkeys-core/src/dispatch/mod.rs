// Budkeys Action Dispatch
// Named system actions that gestures resolve to

mod action;
mod executor;

pub use action::ActionName;
pub use executor::ActionExecutor;

/// Result type for dispatch operations
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Errors raised while dispatching an action
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Action {action} failed: {reason}")]
    Execution { action: String, reason: String },
}

impl DispatchError {
    pub(crate) fn execution(action: ActionName, reason: impl ToString) -> Self {
        DispatchError::Execution {
            action: action.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Executes a named action.
///
/// Dispatch is fire-and-forget from the caller's side: it returns once the
/// action has been issued, not once its effect is visible.
pub trait ActionDispatcher: Send + Sync {
    fn dispatch(&self, action: &str) -> DispatchResult<()>;
}
