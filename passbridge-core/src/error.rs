use thiserror::Error;

use crate::engine::EngineError;

/// Message delivered when a ceremony verb runs before a successful `init`.
///
/// Hosts match on this text, so it is kept exactly as the host API has
/// always reported it.
pub const NOT_INITIALIZED_MESSAGE: &str = "WebAuthn not initialiazed";

/// Every failure a single host call can end with.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Input text for `what` was malformed or incomplete.
    #[error("Decode error ({what}): {reason}")]
    Decode { what: &'static str, reason: String },

    /// A value produced by the engine could not be encoded.
    #[error("Encode error ({what}): {reason}")]
    Encode { what: &'static str, reason: String },

    /// A verb was called before `init` succeeded.
    #[error("{}", NOT_INITIALIZED_MESSAGE)]
    NotInitialized,

    /// A host option hook failed or returned undecodable options.
    #[error("Option hook {index} failed: {reason}")]
    HookRelay { index: usize, reason: String },

    /// The ceremony engine rejected the request.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A panic caught at the call boundary.
    #[error("panic: {0}")]
    Fault(String),

    /// The host call carried the wrong number or kind of arguments.
    #[error("Invalid arguments: {0}")]
    Arguments(String),
}

impl BridgeError {
    pub fn arguments(message: impl Into<String>) -> Self {
        Self::Arguments(message.into())
    }

    /// Whether this error came from the fault barrier rather than a typed failure.
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Fault(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

/// What every host-reachable call produces: encoded results or an error.
pub type Outcome = Result<Vec<String>>;
