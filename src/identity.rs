use crate::{config::Settings, errors::{BackendError, BackendResult}};
use std::ffi::{CStr, CString};
use std::io;
use tracing::{debug, warn};

/// Upper bound on the getpwnam_r scratch buffer when it has to grow.
const MAX_PW_BUFFER: usize = 1 << 20;
const FALLBACK_PW_BUFFER: usize = 16 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
}

/// Account database seam; `Ok(None)` means the name is unknown.
pub trait AccountDb {
    fn lookup(&self, name: &str) -> io::Result<Option<ResolvedIdentity>>;
}

pub struct IdentityPolicy {
    pub root_fallback: String,
    pub max_user_len: usize,
}

impl From<&Settings> for IdentityPolicy {
    fn from(settings: &Settings) -> Self {
        Self {
            root_fallback: settings.identity.root_fallback.clone(),
            max_user_len: settings.limits.max_user_len,
        }
    }
}

pub fn resolve(submitted: &str, accounts: &dyn AccountDb, policy: &IdentityPolicy) -> BackendResult<ResolvedIdentity> {
    let bounded = truncate_at_boundary(submitted, policy.max_user_len);
    if bounded.len() < submitted.len() {
        warn!(limit = policy.max_user_len, "Username truncated to \"{}\"", bounded);
    }
    // compare the bounded name, since that is the one looked up
    let name = if bounded == "root" {
        warn!("Job submitted by root.  Setting UID to \"{}\"", policy.root_fallback);
        policy.root_fallback.clone()
    } else {
        bounded.to_string()
    };

    let identity = match accounts.lookup(&name) {
        Ok(Some(identity)) => identity,
        Ok(None) => return Err(BackendError::IdentityNotFound { user: name }),
        Err(source) => return Err(BackendError::IdentityLookup { user: name, source }),
    };
    if identity.uid == 0 {
        return Err(BackendError::RootIdentity { user: identity.name });
    }
    debug!("Switching to user {} ({}:{})", identity.name, identity.uid, identity.gid);
    Ok(identity)
}

pub(crate) fn truncate_at_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    &s[..cut]
}

/// The host's passwd database, via the reentrant `getpwnam_r`.
pub struct SystemAccounts;

impl AccountDb for SystemAccounts {
    fn lookup(&self, name: &str) -> io::Result<Option<ResolvedIdentity>> {
        let Ok(c_name) = CString::new(name) else {
            return Ok(None);
        };
        let hint = unsafe { libc::sysconf(libc::_SC_GETPW_R_SIZE_MAX) };
        let mut len = if hint > 0 { hint as usize } else { FALLBACK_PW_BUFFER };

        loop {
            let mut buf: Vec<libc::c_char> = vec![0; len];
            let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
            let mut result: *mut libc::passwd = std::ptr::null_mut();
            let rv = unsafe {
                libc::getpwnam_r(c_name.as_ptr(), &mut pwd, buf.as_mut_ptr(), buf.len(), &mut result)
            };

            if rv == libc::ERANGE && len < MAX_PW_BUFFER {
                len = (len * 2).min(MAX_PW_BUFFER);
                continue;
            }
            if result.is_null() {
                return if rv == 0 { Ok(None) } else { Err(io::Error::from_raw_os_error(rv)) };
            }
            // pw_name points into `buf`, which is still alive here.
            let account = unsafe { CStr::from_ptr(pwd.pw_name) }.to_string_lossy().into_owned();
            return Ok(Some(ResolvedIdentity { name: account, uid: pwd.pw_uid, gid: pwd.pw_gid }));
        }
    }
}
