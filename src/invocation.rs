use crate::errors::{BackendError, BackendResult};
use std::ffi::OsString;
use std::path::PathBuf;

/// Printed in answer to a parameterless invocation so the spooler can list the device.
pub const DISCOVERY_LINE: &str = "file cups-file \"Unknown\" \"Save to File\"";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Discover,
    Job(JobRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub job_id: String,
    pub user: String,
    pub title: String,
    pub copies: String,
    pub options: String,
    pub data_file: Option<PathBuf>,
}

impl Invocation {
    /// `args` excludes the program name.
    pub fn parse(args: &[String]) -> BackendResult<Self> {
        match args {
            [] => Ok(Invocation::Discover),
            [job_id, user, title, copies, options, rest @ ..] if rest.len() <= 1 => {
                Ok(Invocation::Job(JobRequest {
                    job_id: job_id.clone(),
                    user: user.clone(),
                    title: title.clone(),
                    copies: copies.clone(),
                    options: options.clone(),
                    data_file: rest.first().map(PathBuf::from),
                }))
            }
            _ => Err(BackendError::Usage),
        }
    }

    pub fn from_os_args(args: impl IntoIterator<Item = OsString>) -> BackendResult<Self> {
        let args = args
            .into_iter()
            .skip(1)
            .map(|a| a.into_string().map_err(|_| BackendError::Usage))
            .collect::<BackendResult<Vec<_>>>()?;
        Self::parse(&args)
    }
}
