use crate::{config::Output, privilege::Dropped, sink::{JobSink, SinkError}, template::OutputPath};
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use tracing::{debug, info};

pub struct FileSink {
    create_dirs: bool,
    mode: u32,
}

impl FileSink {
    pub fn new(output: &Output) -> anyhow::Result<Self> {
        Ok(Self { create_dirs: output.create_dirs, mode: output.mode_bits()? })
    }
}

impl JobSink for FileSink {
    fn deliver(&self, path: &OutputPath, dropped: &Dropped, input: &mut dyn Read) -> Result<u64, SinkError> {
        let target = path.as_path();
        debug!(uid = dropped.identity().uid, "Opening {}", path);
        if self.create_dirs {
            if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .map_err(|source| SinkError::CreateDirs { path: path.to_string(), source })?;
            }
        }
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(self.mode)
            .open(target)
            .map_err(|source| SinkError::OpenOutput { path: path.to_string(), source })?;

        let write_err = |source: io::Error| SinkError::Write { path: path.to_string(), source };
        let written = io::copy(input, &mut file).map_err(write_err)?;
        file.flush().map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        info!(bytes = written, "Wrote {} bytes to {}", written, path);
        Ok(written)
    }
}
