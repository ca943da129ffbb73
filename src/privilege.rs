//! One-way process identity transition.
//!
//! The process starts out holding a single [`Privileged`] capability. Dropping it
//! consumes the value and yields a [`Dropped`] proof that the sink requires, so
//! nothing can write output before the drop, and nothing can get back to the
//! prior identity afterwards.

use crate::identity::ResolvedIdentity;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::debug;

static CLAIMED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Error)]
pub enum PrivilegeError {
    #[error("Failed to switch to gid {gid}: {source}")]
    SetGid { gid: u32, #[source] source: io::Error },
    #[error("Failed to drop supplementary groups: {source}")]
    ClearGroups { #[source] source: io::Error },
    #[error("Failed to switch to uid {uid}: {source}")]
    SetUid { uid: u32, #[source] source: io::Error },
    #[error("privileged identity already claimed")]
    AlreadyClaimed,
}

/// The three identity syscalls, in the order they must run.
pub trait PrivilegeOps {
    fn set_gid(&self, gid: u32) -> io::Result<()>;
    fn clear_groups(&self) -> io::Result<()>;
    fn set_uid(&self, uid: u32) -> io::Result<()>;
}

pub struct SystemPrivileges;

impl PrivilegeOps for SystemPrivileges {
    fn set_gid(&self, gid: u32) -> io::Result<()> {
        check(unsafe { libc::setgid(gid as libc::gid_t) })
    }

    fn clear_groups(&self) -> io::Result<()> {
        check(unsafe { libc::setgroups(0, std::ptr::null()) })
    }

    fn set_uid(&self, uid: u32) -> io::Result<()> {
        check(unsafe { libc::setuid(uid as libc::uid_t) })
    }
}

fn check(rv: libc::c_int) -> io::Result<()> {
    if rv == 0 { Ok(()) } else { Err(io::Error::last_os_error()) }
}

/// The identity the process was started with. At most one exists per process.
#[derive(Debug)]
pub struct Privileged {
    _private: (),
}

impl Privileged {
    pub fn claim() -> Option<Self> {
        CLAIMED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { _private: () })
    }

    #[cfg(test)]
    pub(crate) fn unclaimed() -> Self {
        Self { _private: () }
    }

    /// Group first, then supplementary groups, then user: the first two need
    /// the privilege the third gives up. Any failure stops the sequence.
    pub fn drop_to(self, identity: ResolvedIdentity, ops: &dyn PrivilegeOps) -> Result<Dropped, PrivilegeError> {
        ops.set_gid(identity.gid)
            .map_err(|source| PrivilegeError::SetGid { gid: identity.gid, source })?;
        ops.clear_groups()
            .map_err(|source| PrivilegeError::ClearGroups { source })?;
        ops.set_uid(identity.uid)
            .map_err(|source| PrivilegeError::SetUid { uid: identity.uid, source })?;
        debug!(uid = identity.uid, gid = identity.gid, "privileges dropped");
        Ok(Dropped { identity })
    }
}

/// Proof that the process now runs as `identity`.
#[derive(Debug)]
pub struct Dropped {
    identity: ResolvedIdentity,
}

impl Dropped {
    pub fn identity(&self) -> &ResolvedIdentity {
        &self.identity
    }
}
