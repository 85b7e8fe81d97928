use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

pub const LOCK_FILE: &str = ".scrape.lock";

/// Locks older than this are considered abandoned
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(2 * 60 * 60);

/// Run-level mutual exclusion. The lock file is removed when the guard drops.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Try to take the lock in `data_dir`.
    ///
    /// Returns None when another run holds a lock younger than `stale_after`.
    /// Lock I/O failures fail open: the run proceeds without exclusion.
    pub fn acquire(data_dir: &Path, stale_after: Duration) -> Option<Self> {
        let path = data_dir.join(LOCK_FILE);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                if let Err(e) = file.write_all(stamp().as_bytes()) {
                    warn!(path = %path.display(), error = %e, "Could not stamp lock file");
                }
                return Some(Self { path });
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not create lock file, continuing unlocked");
                return Some(Self { path });
            }
        }

        if let Some(age) = lock_age(&path) {
            if age < stale_after {
                debug!("Lock held for {:?}", age);
                return None;
            }
            warn!("Replacing stale lock ({:?} old)", age);
        }

        if let Err(e) = fs::write(&path, stamp()) {
            warn!(path = %path.display(), error = %e, "Could not write lock file, continuing unlocked");
        }

        Some(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                warn!(path = %self.path.display(), error = %e, "Could not release lock");
            }
        }
    }
}

/// Epoch millis written into the lock file
fn stamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .to_string()
}

fn lock_age(path: &Path) -> Option<Duration> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    Some(SystemTime::now().duration_since(modified).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_acquire_is_refused() {
        let dir = TempDir::new().unwrap();

        let first = RunLock::acquire(dir.path(), DEFAULT_STALE_AFTER);
        assert!(first.is_some());
        assert!(RunLock::acquire(dir.path(), DEFAULT_STALE_AFTER).is_none());
    }

    #[test]
    fn test_release_on_drop() {
        let dir = TempDir::new().unwrap();

        {
            let lock = RunLock::acquire(dir.path(), DEFAULT_STALE_AFTER).unwrap();
            assert!(lock.path().exists());
        }

        assert!(!dir.path().join(LOCK_FILE).exists());
        assert!(RunLock::acquire(dir.path(), DEFAULT_STALE_AFTER).is_some());
    }

    #[test]
    fn test_fresh_lock_records_acquisition_time() {
        let dir = TempDir::new().unwrap();

        let lock = RunLock::acquire(dir.path(), DEFAULT_STALE_AFTER).unwrap();

        let stamp: u128 = fs::read_to_string(lock.path()).unwrap().parse().unwrap();
        assert!(stamp > 0);
    }

    #[test]
    fn test_existing_fresh_lock_is_left_alone() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(LOCK_FILE), "owner").unwrap();

        assert!(RunLock::acquire(dir.path(), DEFAULT_STALE_AFTER).is_none());
        assert_eq!(fs::read_to_string(dir.path().join(LOCK_FILE)).unwrap(), "owner");
    }

    #[test]
    fn test_stale_lock_is_taken_over() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(LOCK_FILE), "0").unwrap();

        // Any existing lock is stale with a zero threshold
        let lock = RunLock::acquire(dir.path(), Duration::ZERO);
        assert!(lock.is_some());
    }
}
