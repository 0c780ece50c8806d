use thiserror::Error;

/// Field-kind mismatch between stored configuration and the schema this
/// build understands. Never caused by user input on validated config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("unknown field kind: {0:?}")]
    UnknownFieldKind(String),
}

/// Reasons an overlay show/hide request was refused.
///
/// The `Display` text is meant to be shown to the operator as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverlayError {
    #[error("unknown overlay action \"{0}\"")]
    UnknownAction(String),
    #[error("no input is assigned to \"{0}\"")]
    Unbound(String),
    #[error("input \"{0}\" is not configured")]
    InputNotFound(String),
    #[error("input \"{0}\" is disabled")]
    InputDisabled(String),
    #[error("\"{holder}\" is already on air on the same input; hide it before showing \"{action}\"")]
    Blocked { action: String, holder: String },
    #[error("{0}")]
    MissingData(String),
    #[error("\"{0}\" is not on air")]
    NotActive(String),
}

/// Failure talking to the remote system. Never retried here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("could not reach remote system: {0}")]
    Unreachable(String),
    #[error("remote system answered with HTTP {0}")]
    Status(u16),
    #[error("unexpected response from remote system: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Overlay(#[from] OverlayError),
    #[error("input \"{0}\" is not configured")]
    UnknownInput(String),
}
