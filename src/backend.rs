use crate::{
    config::Config,
    errors::BackendResult,
    identity::{self, AccountDb, IdentityPolicy},
    invocation::{Invocation, JobRequest},
    privilege::{PrivilegeError, PrivilegeOps, Privileged},
    sink::{JobSink, SinkError},
    template::{DeviceTemplate, JobBindings, OutputPath, TemplateWarning},
};
use std::ffi::OsString;
use std::fs::File;
use std::io::Read;
use tracing::debug;

#[derive(Debug)]
pub enum Outcome {
    Discover,
    Delivered(Delivery),
}

#[derive(Debug)]
pub struct Delivery {
    pub path: OutputPath,
    pub bytes: u64,
    pub warnings: Vec<TemplateWarning>,
}

pub struct Backend<A, P, S> {
    config: Config,
    accounts: A,
    privileges: P,
    sink: S,
}

impl<A, P, S> Backend<A, P, S>
where
    A: AccountDb,
    P: PrivilegeOps,
    S: JobSink,
{
    pub fn new(config: Config, accounts: A, privileges: P, sink: S) -> Self {
        Self { config, accounts, privileges, sink }
    }

    /// Resolve, drop, expand, deliver. Nothing touches the file system before the drop.
    pub fn run(&self, job: &JobRequest, privileged: Privileged, stdin: &mut dyn Read) -> BackendResult<Delivery> {
        let settings = &self.config.settings;
        let identity = identity::resolve(&job.user, &self.accounts, &IdentityPolicy::from(settings))?;
        let user = identity.name.clone();
        let dropped = privileged.drop_to(identity, &self.privileges)?;

        let limit = settings.limits.max_path_len;
        let template = DeviceTemplate::parse(&self.config.device_uri, limit)?;
        debug!(scheme = template.scheme(), job = %job.job_id, copies = %job.copies, options = %job.options, "expanding device URI");
        let bindings = JobBindings { user: &user, title: &job.title, job_id: &job.job_id };
        let expansion = template.expand(&bindings, limit);

        let bytes = match &job.data_file {
            Some(data_file) => {
                let mut input = File::open(data_file)
                    .map_err(|source| SinkError::OpenInput { path: data_file.clone(), source })?;
                self.sink.deliver(&expansion.path, &dropped, &mut input)?
            }
            None => self.sink.deliver(&expansion.path, &dropped, stdin)?,
        };

        Ok(Delivery { path: expansion.path, bytes, warnings: expansion.warnings })
    }
}

/// Full invocation: argv (program name first), then config, sink and the
/// privileged capability, then the job itself. Argument errors return before
/// anything else is consulted.
pub fn run_with<A, P, S>(
    args: impl IntoIterator<Item = OsString>,
    env: impl Fn(&str) -> Option<String>,
    accounts: A,
    privileges: P,
    make_sink: impl FnOnce(&Config) -> BackendResult<S>,
    claim: impl FnOnce() -> Option<Privileged>,
    stdin: &mut dyn Read,
) -> BackendResult<Outcome>
where
    A: AccountDb,
    P: PrivilegeOps,
    S: JobSink,
{
    let job = match Invocation::from_os_args(args)? {
        Invocation::Discover => return Ok(Outcome::Discover),
        Invocation::Job(job) => job,
    };

    let cfg = Config::from_lookup(env)?;
    let sink = make_sink(&cfg)?;
    let privileged = claim().ok_or(PrivilegeError::AlreadyClaimed)?;

    let backend = Backend::new(cfg, accounts, privileges, sink);
    Ok(Outcome::Delivered(backend.run(&job, privileged, stdin)?))
}
