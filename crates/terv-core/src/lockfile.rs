use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};

use terv_backend::{Displayer, ManagerError};

const LOCK_FILE_NAME: &str = ".lock";

/// Path of the lock currently held by this process, consulted by the
/// interrupt handler. The engine takes at most one install lock at a time.
static ARMED_LOCK: OnceLock<Mutex<Option<PathBuf>>> = OnceLock::new();

fn armed_lock() -> &'static Mutex<Option<PathBuf>> {
    ARMED_LOCK.get_or_init(|| {
        let result = ctrlc::set_handler(|| {
            if let Some(path) = armed_lock()
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
            {
                let _ = fs::remove_file(&path);
            }
            std::process::exit(130);
        });
        if let Err(err) = result {
            log::warn!("could not install the interrupt handler: {err}");
        }

        Mutex::new(None)
    })
}

fn arm(path: PathBuf) {
    *armed_lock().lock().unwrap_or_else(PoisonError::into_inner) = Some(path);
}

fn disarm() {
    armed_lock()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
}

/// Exclusive cross-process lock over a tool's install directory.
///
/// The lock file is removed on release, on every exit path: normal drop,
/// error unwind, or an interrupt received while the lock is held (the
/// process then terminates with a non-zero code).
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl LockGuard {
    /// Block until exclusive ownership of `install_path` is held.
    ///
    /// # Errors
    /// Returns an error when the lock file cannot be opened, locked or
    /// written.
    pub fn acquire(install_path: &Path, displayer: &Displayer) -> Result<Self, ManagerError> {
        let path = install_path.join(LOCK_FILE_NAME);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                displayer.display(format!(
                    "Waiting for lock on {}, another terv process is using it",
                    install_path.display()
                ));
                file.lock_exclusive()?;
            }
            Err(err) => return Err(err.into()),
        }

        file.set_len(0)
            .and_then(|()| file.seek(SeekFrom::Start(0)).map(|_| ()))
            .and_then(|()| writeln!(file, "{}", std::process::id()))?;

        arm(path.clone());

        Ok(Self { file, path })
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        disarm();
        if let Err(err) = FileExt::unlock(&self.file) {
            log::warn!("could not release lock {}: {err}", self.path.display());
        }
        if let Err(err) = fs::remove_file(&self.path) {
            log::warn!("could not remove lock file {}: {err}", self.path.display());
        }
    }
}
