use crate::{privilege::PrivilegeError, sink::SinkError, template::TemplateError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Usage: cups-file job-id user title copies options [file]")]
    Usage,
    #[error("{0}")]
    Config(String),
    #[error("couldn't find entry for {user}")]
    IdentityNotFound { user: String },
    #[error("error finding entry for {user}: {source}")]
    IdentityLookup {
        user: String,
        #[source]
        source: std::io::Error,
    },
    #[error("refusing to print as {user}: account has uid 0")]
    RootIdentity { user: String },
    #[error(transparent)]
    Privilege(#[from] PrivilegeError),
    #[error(transparent)]
    InvalidTemplate(#[from] TemplateError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Result classes understood by the spooler, as process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BackendStatus {
    Ok = 0,
    Failed = 1,
}

impl From<BackendStatus> for std::process::ExitCode {
    fn from(status: BackendStatus) -> Self {
        std::process::ExitCode::from(status as u8)
    }
}

impl BackendError {
    pub fn code(&self) -> &'static str {
        match self {
            BackendError::Usage => "UsageError",
            BackendError::Config(_) => "ConfigError",
            BackendError::IdentityNotFound { .. } => "IdentityNotFound",
            BackendError::IdentityLookup { .. } => "IdentityLookupError",
            BackendError::RootIdentity { .. } => "RootIdentity",
            BackendError::Privilege(_) => "PrivilegeError",
            BackendError::InvalidTemplate(_) => "InvalidTemplate",
            BackendError::Sink(_) => "SinkError",
        }
    }

    /// Every error is fatal for the job; none of them is worth a resubmit.
    pub fn status(&self) -> BackendStatus {
        match self {
            BackendError::Usage
            | BackendError::Config(_)
            | BackendError::IdentityNotFound { .. }
            | BackendError::IdentityLookup { .. }
            | BackendError::RootIdentity { .. }
            | BackendError::Privilege(_)
            | BackendError::InvalidTemplate(_)
            | BackendError::Sink(_) => BackendStatus::Failed,
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;
