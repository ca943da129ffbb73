mod backend;
mod config;
mod errors;
mod identity;
mod invocation;
mod logging;
mod privilege;
mod sink;
mod template;

use crate::{
    backend::Outcome,
    errors::{BackendError, BackendResult, BackendStatus},
    identity::SystemAccounts,
    invocation::DISCOVERY_LINE,
    privilege::{Privileged, SystemPrivileges},
    sink::file::FileSink,
};
use std::process::ExitCode;
use tracing::{error, info};

fn main() -> ExitCode {
    logging::init();

    match run() {
        Ok(status) => status.into(),
        Err(err) => {
            error!(code = err.code(), "{err}");
            err.status().into()
        }
    }
}

fn run() -> BackendResult<BackendStatus> {
    let outcome = backend::run_with(
        std::env::args_os(),
        |key| std::env::var(key).ok(),
        SystemAccounts,
        SystemPrivileges,
        |cfg| FileSink::new(&cfg.settings.output).map_err(|e| BackendError::Config(format!("{e:#}"))),
        Privileged::claim,
        &mut std::io::stdin().lock(),
    )?;
    match outcome {
        Outcome::Discover => println!("{DISCOVERY_LINE}"),
        Outcome::Delivered(delivery) => {
            info!(path = %delivery.path, bytes = delivery.bytes, warnings = delivery.warnings.len(), "job delivered")
        }
    }
    Ok(BackendStatus::Ok)
}
