use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use time::OffsetDateTime;

use crate::rotation::{self, RotationPolicy};

enum MillRequest {
    Run,
    Wait(Sender<()>),
}

/// Background worker that prunes and compresses backups, so the write path
/// only pays for the rename.
#[derive(Debug)]
struct Mill {
    requests: Option<Sender<MillRequest>>,
    worker: Option<JoinHandle<()>>,
}

impl Mill {
    fn spawn(path: PathBuf, policy: RotationPolicy) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let worker = std::thread::Builder::new()
            .name("pplog-mill".into())
            .spawn(move || {
                for request in rx {
                    match request {
                        // Retention problems must not cost any record.
                        MillRequest::Run => {
                            let _ = rotation::enforce_retention(&path, &policy);
                        }
                        MillRequest::Wait(done) => {
                            let _ = done.send(());
                        }
                    }
                }
            })?;
        Ok(Self {
            requests: Some(tx),
            worker: Some(worker),
        })
    }

    fn request(&self) {
        if let Some(tx) = &self.requests {
            let _ = tx.send(MillRequest::Run);
        }
    }

    /// Block until every request queued so far has been handled.
    fn wait(&self) {
        let Some(tx) = &self.requests else { return };
        let (done_tx, done_rx) = mpsc::channel();
        if tx.send(MillRequest::Wait(done_tx)).is_ok() {
            let _ = done_rx.recv();
        }
    }
}

impl Drop for Mill {
    fn drop(&mut self) {
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// State of the active log file.
#[derive(Debug)]
struct FileState {
    file: File,
    /// Bytes currently in the file.
    size: u64,
}

/// A writer that rotates its file once the next record would exceed the size
/// limit.
///
/// Writes go through `&RotatingWriter`, so one instance can be shared between
/// threads behind an `Arc`. Pruning and compression of backups run on a
/// dedicated thread; [`sync`](Self::sync) waits for it to catch up.
#[derive(Debug)]
pub struct RotatingWriter {
    path: PathBuf,
    policy: RotationPolicy,
    state: Mutex<Option<FileState>>,
    mill: Mill,
}

impl RotatingWriter {
    /// Create a rotating writer for `path`, creating parent directories.
    ///
    /// An existing file is appended to when it is under the size limit and
    /// rotated away otherwise.
    pub fn new(path: impl Into<PathBuf>, policy: RotationPolicy) -> io::Result<Self> {
        let path = path.into();
        let writer = Self {
            mill: Mill::spawn(path.clone(), policy)?,
            path,
            policy,
            state: Mutex::new(None),
        };

        if let Some(parent) = writer.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        {
            let mut guard = writer.lock();
            *guard = Some(writer.open_existing_or_new(0)?);
        }

        Ok(writer)
    }

    /// Path of the active file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Close the active file, move it to a backup and start a fresh one.
    pub fn rotate(&self) -> io::Result<()> {
        let mut guard = self.lock();
        self.rotate_locked(&mut guard)
    }

    /// Flush the active file to disk and wait for pending backup retention.
    pub fn sync(&self) -> io::Result<()> {
        {
            let guard = self.lock();
            if let Some(state) = guard.as_ref() {
                state.file.sync_all()?;
            }
        }
        self.mill.wait();
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Option<FileState>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_record(&self, buf: &[u8]) -> io::Result<usize> {
        let len = buf.len() as u64;
        if len > self.policy.max_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "write length {} exceeds maximum file size {}",
                    len, self.policy.max_size
                ),
            ));
        }

        let mut guard = self.lock();
        if guard.is_none() {
            *guard = Some(self.open_existing_or_new(len)?);
        } else if guard
            .as_ref()
            .is_some_and(|state| state.size + len > self.policy.max_size)
        {
            self.rotate_locked(&mut guard)?;
        }

        let state = guard
            .as_mut()
            .ok_or_else(|| io::Error::other("log file is not open"))?;
        state.file.write_all(buf)?;
        state.size += len;
        Ok(buf.len())
    }

    fn rotate_locked(&self, guard: &mut MutexGuard<'_, Option<FileState>>) -> io::Result<()> {
        // Drop the handle before renaming the file underneath it.
        **guard = None;
        **guard = Some(self.open_new()?);
        self.mill.request();
        Ok(())
    }

    fn open_existing_or_new(&self, write_len: u64) -> io::Result<FileState> {
        let size = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return self.open_new(),
            Err(e) => return Err(e),
        };

        if size + write_len > self.policy.max_size {
            let state = self.open_new()?;
            self.mill.request();
            return Ok(state);
        }

        let file = OpenOptions::new().append(true).open(&self.path)?;
        Ok(FileState { file, size })
    }

    fn open_new(&self) -> io::Result<FileState> {
        if self.path.exists() {
            let backup = rotation::free_backup_name(&self.path, OffsetDateTime::now_utc());
            std::fs::rename(&self.path, backup)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        Ok(FileState { file, size: 0 })
    }
}

impl Write for &RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_record(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self.lock();
        match guard.as_mut() {
            Some(state) => state.file.flush(),
            None => Ok(()),
        }
    }
}

impl Write for RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (&*self).flush()
    }
}
