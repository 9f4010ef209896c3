use crate::http::ERROR_CONTEXT_ERROR;
use ctr_ipc::ResultCode;
use thiserror::Error;

/// Errors from HLE service handlers and the service manager.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed command buffer or guest buffer access.
    #[error("IPC error: {0}")]
    Ipc(#[from] ctr_ipc::Error),

    /// No HTTP context is registered under the handle.
    #[error("HTTP context {0} not found")]
    ContextNotFound(u32),

    /// The HTTP transport failed to produce a response.
    #[error("HTTP error: {0}")]
    Http(String),

    /// No service is registered under the name.
    #[error("service not found: {0}")]
    ServiceNotFound(String),

    /// A service with the same name is already registered.
    #[error("service already registered: {0}")]
    AlreadyRegistered(String),

    /// The service's session quota is used up.
    #[error("session limit reached for {name} (max {max_sessions})")]
    SessionLimitReached { name: String, max_sessions: u32 },

    /// The session handle is not open.
    #[error("invalid session: {0}")]
    InvalidSession(u32),

    /// Configuration could not be parsed.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Result word the guest observes when a handler fails with this error.
    ///
    /// Only an absent context is reported; every other failure is masked as
    /// success with no further outputs.
    pub fn result_code(&self) -> ResultCode {
        match self {
            Error::ContextNotFound(_) => ERROR_CONTEXT_ERROR,
            _ => ResultCode::SUCCESS,
        }
    }
}

/// Result type for ctr-hle operations.
pub type Result<T> = std::result::Result<T, Error>;
