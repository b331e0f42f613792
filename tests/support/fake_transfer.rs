//! Scripted transfer provider and content verifier.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use vimeo_mirror::transfer::{FetchOptions, RequestHeaders};
use vimeo_mirror::{ContentVerifier, Transfer, TransferError};

/// What one scripted fetch does before falling back to serving the body.
pub enum Step {
    /// Fails without writing anything.
    Fail(TransferError),
    /// Writes the next `n` bytes, then fails.
    Partial(usize, TransferError),
    /// Never completes.
    Hang,
}

/// Serves in-memory bodies by URL.
#[derive(Default)]
pub struct FakeTransfer {
    bodies: HashMap<String, Vec<u8>>,
    unsized_urls: HashSet<String>,
    announced: HashMap<String, u64>,
    script: Mutex<HashMap<String, VecDeque<Step>>>,
    fetches: Mutex<Vec<(String, u64)>>,
    probes: Mutex<Vec<String>>,
    headers: Mutex<Vec<RequestHeaders>>,
}

impl FakeTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn file(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }

    /// Serves `url` without announcing its length.
    #[must_use]
    pub fn unsized_file(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.unsized_urls.insert(url.to_string());
        self.file(url, body)
    }

    /// Serves `body` for `url` while announcing `size` bytes.
    #[must_use]
    pub fn misreported_file(mut self, url: &str, body: impl Into<Vec<u8>>, size: u64) -> Self {
        self.announced.insert(url.to_string(), size);
        self.file(url, body)
    }

    #[must_use]
    pub fn script(self, url: &str, steps: Vec<Step>) -> Self {
        self.script
            .lock()
            .expect("script")
            .insert(url.to_string(), steps.into());
        self
    }

    /// `(url, resume offset)` of every fetch, in order.
    pub fn fetches(&self) -> Vec<(String, u64)> {
        self.fetches.lock().expect("fetches").clone()
    }

    pub fn probes(&self) -> Vec<String> {
        self.probes.lock().expect("probes").clone()
    }

    pub fn last_headers(&self) -> Option<RequestHeaders> {
        self.headers.lock().expect("headers").last().cloned()
    }

    fn write(target: &Path, bytes: &[u8], append: bool) -> Result<(), TransferError> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(target)
            .map_err(|e| TransferError::io(target, e))?;
        file.write_all(bytes).map_err(|e| TransferError::io(target, e))
    }
}

#[async_trait]
impl Transfer for FakeTransfer {
    async fn probe_size(
        &self,
        url: &str,
        headers: &RequestHeaders,
    ) -> Result<Option<u64>, TransferError> {
        self.probes.lock().expect("probes").push(url.to_string());
        self.headers.lock().expect("headers").push(headers.clone());
        let body = self
            .bodies
            .get(url)
            .ok_or_else(|| TransferError::http_status(url, 404))?;
        if self.unsized_urls.contains(url) {
            Ok(None)
        } else {
            Ok(Some(
                self.announced
                    .get(url)
                    .copied()
                    .unwrap_or(body.len() as u64),
            ))
        }
    }

    async fn fetch(
        &self,
        url: &str,
        target: &Path,
        options: &FetchOptions,
    ) -> Result<(), TransferError> {
        self.fetches
            .lock()
            .expect("fetches")
            .push((url.to_string(), options.resume_from));
        self.headers
            .lock()
            .expect("headers")
            .push(options.headers.clone());
        let step = self
            .script
            .lock()
            .expect("script")
            .get_mut(url)
            .and_then(VecDeque::pop_front);
        let body = self
            .bodies
            .get(url)
            .ok_or_else(|| TransferError::http_status(url, 404))?;
        let offset = usize::try_from(options.resume_from).expect("offset");
        let append = offset > 0;

        match step {
            Some(Step::Fail(error)) => Err(error),
            Some(Step::Partial(count, error)) => {
                let end = (offset + count).min(body.len());
                Self::write(target, &body[offset..end], append)?;
                if let Some(progress) = &options.on_progress {
                    progress(end as u64);
                }
                Err(error)
            }
            Some(Step::Hang) => {
                std::future::pending::<()>().await;
                Ok(())
            }
            None => {
                if append && offset >= body.len() {
                    return Err(TransferError::range_not_satisfiable(url, options.resume_from));
                }
                Self::write(target, &body[offset..], append)?;
                if let Some(progress) = &options.on_progress {
                    progress(body.len() as u64);
                }
                Ok(())
            }
        }
    }
}

/// Rejects files by name.
#[derive(Default)]
pub struct FakeVerifier {
    corrupt: HashSet<String>,
    checked: Mutex<Vec<PathBuf>>,
}

impl FakeVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn corrupt(mut self, file_name: &str) -> Self {
        self.corrupt.insert(file_name.to_string());
        self
    }

    pub fn checked(&self) -> Vec<PathBuf> {
        self.checked.lock().expect("checked").clone()
    }
}

#[async_trait]
impl ContentVerifier for FakeVerifier {
    async fn verify(&self, path: &Path) -> Result<(), Vec<String>> {
        self.checked.lock().expect("checked").push(path.to_path_buf());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.corrupt.contains(&name) {
            Err(vec!["moov atom not found".to_string()])
        } else {
            Ok(())
        }
    }
}
