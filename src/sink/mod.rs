pub mod file;

use crate::{privilege::Dropped, template::OutputPath};
use std::io::{self, Read};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Unable to open print file {}: {source}", .path.display())]
    OpenInput { path: PathBuf, #[source] source: io::Error },
    #[error("Unable to create directories for {path}: {source}")]
    CreateDirs { path: String, #[source] source: io::Error },
    #[error("Unable to open {path}: {source}")]
    OpenOutput { path: String, #[source] source: io::Error },
    #[error("Unable to write print data to {path}: {source}")]
    Write { path: String, #[source] source: io::Error },
}

/// Receives the job byte stream once the process runs as the job's owner.
pub trait JobSink {
    /// Returns the number of bytes written.
    fn deliver(&self, path: &OutputPath, dropped: &Dropped, input: &mut dyn Read) -> Result<u64, SinkError>;
}
