use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use log::{debug, warn};

use crate::{StoreError, StoreResult};

/// Marker file that reserves a mailbox directory for one controller.
pub const CLAIM_FILE: &str = ".controller.lock";

/// Exclusive claim on a mailbox directory, released on drop.
///
/// The protocol carries one outstanding request at a time. Two controllers
/// writing the same command slot would overwrite each other's requests, so
/// the second one to start is refused. The claim file holds the owner's
/// process id; a claim whose owner has exited is taken over.
#[derive(Debug)]
pub struct MailboxClaim {
    path: PathBuf,
}

impl MailboxClaim {
    pub fn acquire(dir: &Path) -> StoreResult<Self> {
        let path = dir.join(CLAIM_FILE);
        if let Some(claim) = Self::create(&path)? {
            debug!("claimed mailbox {}", dir.display());
            return Ok(claim);
        }

        match holder(&path) {
            Some(pid) if !process_alive(pid) => {
                warn!(
                    "taking over mailbox {} from exited controller (pid {pid})",
                    dir.display()
                );
                remove_claim_file(&path)?;
                Self::create(&path)?.ok_or_else(|| StoreError::Claimed(dir.to_path_buf()))
            }
            _ => Err(StoreError::Claimed(dir.to_path_buf())),
        }
    }

    /// Removes the claim on `dir` regardless of its owner. Returns whether a
    /// claim was present.
    pub fn force_release(dir: &Path) -> StoreResult<bool> {
        let path = dir.join(CLAIM_FILE);
        let held = path.exists();
        if held {
            warn!(
                "releasing claim on {} held by pid {:?}",
                dir.display(),
                holder(&path)
            );
        }
        remove_claim_file(&path)?;
        Ok(held)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn create(path: &Path) -> StoreResult<Option<Self>> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(None),
            Err(err) => return Err(StoreError::io(path, err)),
        };
        if let Err(err) = writeln!(file, "{}", process::id()) {
            let _ = fs::remove_file(path);
            return Err(StoreError::io(path, err));
        }
        Ok(Some(Self {
            path: path.to_path_buf(),
        }))
    }
}

impl Drop for MailboxClaim {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            debug!("failed to release {}: {err}", self.path.display());
        }
    }
}

fn remove_claim_file(path: &Path) -> StoreResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(StoreError::io(path, err)),
    }
}

/// Process id recorded in a claim file, if readable.
fn holder(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return true;
    }
    // Signal 0 only checks that the process exists.
    if unsafe { libc::kill(pid, 0) } == 0 {
        return true;
    }
    io::Error::last_os_error().raw_os_error() != Some(libc::ESRCH)
}

// Without a portable liveness check the claim stands; `force_release`
// recovers it.
#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}
