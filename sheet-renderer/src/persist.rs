//! Persisting an encoded export.
//!
//! Persistence is an ordered list of strategies. Each one either saves the
//! file, hands over to the next strategy, or fails the export outright:
//!
//! 1. [`BlobDownload`]: create a blob and download it (blob revoked once).
//! 2. [`DataUrlDownload`]: download a `data:` URL instead.
//! 3. [`OpenInViewer`]: open the `data:` URL for manual saving; a blocked
//!    viewer is the only user-visible failure.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use base64::Engine;
use serde::Serialize;

use crate::error::{RenderError, RenderResult};
use crate::image::png_data_uri;

/// Host facilities used by the persistence strategies.
pub trait PersistHost {
    /// Store `png` as a blob and return its URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob cannot be created.
    fn create_blob(&self, png: &[u8]) -> RenderResult<String>;

    /// Release a blob URL.
    fn revoke_blob(&self, url: &str);

    /// Whether the host can start a download without user interaction.
    fn can_download(&self) -> bool;

    /// Save the resource behind `url` (blob or `data:` URL) as `filename`.
    ///
    /// # Errors
    ///
    /// Returns an error if the download cannot be started.
    fn download(&self, url: &str, filename: &str) -> RenderResult<()>;

    /// Show `url` in a new viewing context. Returns `false` when blocked.
    fn open_view(&self, url: &str) -> bool;
}

/// A blob URL that is revoked exactly once, when dropped.
pub struct BlobHandle<'h> {
    host: &'h dyn PersistHost,
    url: String,
}

impl<'h> BlobHandle<'h> {
    /// Create a blob on `host`.
    ///
    /// # Errors
    ///
    /// Returns the host's error if the blob cannot be created.
    pub fn create(host: &'h dyn PersistHost, png: &[u8]) -> RenderResult<Self> {
        let url = host.create_blob(png)?;
        Ok(Self { host, url })
    }

    /// The blob URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for BlobHandle<'_> {
    fn drop(&mut self) {
        self.host.revoke_blob(&self.url);
    }
}

/// How an export was persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistedVia {
    /// Downloaded from a blob.
    BlobDownload,
    /// Downloaded from a `data:` URL.
    DataUrlDownload,
    /// Opened in a viewer for manual saving.
    OpenedInViewer,
}

/// Result of one persistence attempt.
#[derive(Debug)]
pub enum StrategyOutcome {
    /// The file was persisted.
    Saved(PersistedVia),
    /// This strategy is unavailable or failed; try the next one.
    Next(String),
    /// Stop the chain with this error.
    Fatal(RenderError),
}

/// One way of persisting an encoded PNG.
pub trait PersistStrategy {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Try to persist `png` as `filename`.
    fn attempt(&self, host: &dyn PersistHost, png: &[u8], filename: &str) -> StrategyOutcome;
}

/// Blob plus programmatic download.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlobDownload;

impl PersistStrategy for BlobDownload {
    fn name(&self) -> &'static str {
        "blob-download"
    }

    fn attempt(&self, host: &dyn PersistHost, png: &[u8], filename: &str) -> StrategyOutcome {
        if !host.can_download() {
            return StrategyOutcome::Next("host cannot trigger downloads".to_string());
        }
        let blob = match BlobHandle::create(host, png) {
            Ok(blob) => blob,
            Err(e) => return StrategyOutcome::Next(format!("blob creation failed: {e}")),
        };
        let downloaded = host.download(blob.url(), filename);
        match downloaded {
            Ok(()) => StrategyOutcome::Saved(PersistedVia::BlobDownload),
            Err(e) => StrategyOutcome::Next(format!("blob download failed: {e}")),
        }
    }
}

/// `data:` URL plus programmatic download.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataUrlDownload;

impl PersistStrategy for DataUrlDownload {
    fn name(&self) -> &'static str {
        "data-url-download"
    }

    fn attempt(&self, host: &dyn PersistHost, png: &[u8], filename: &str) -> StrategyOutcome {
        if !host.can_download() {
            return StrategyOutcome::Next("host cannot trigger downloads".to_string());
        }
        match host.download(&png_data_uri(png), filename) {
            Ok(()) => StrategyOutcome::Saved(PersistedVia::DataUrlDownload),
            Err(e) => StrategyOutcome::Next(format!("data URL download failed: {e}")),
        }
    }
}

/// Open the `data:` URL in a viewer.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenInViewer;

impl PersistStrategy for OpenInViewer {
    fn name(&self) -> &'static str {
        "open-in-viewer"
    }

    fn attempt(&self, host: &dyn PersistHost, png: &[u8], _filename: &str) -> StrategyOutcome {
        if host.open_view(&png_data_uri(png)) {
            StrategyOutcome::Saved(PersistedVia::OpenedInViewer)
        } else {
            StrategyOutcome::Fatal(RenderError::PopupBlocked)
        }
    }
}

/// The standard three-tier chain.
#[must_use]
pub fn default_strategies() -> Vec<Box<dyn PersistStrategy + Send + Sync>> {
    vec![
        Box::new(BlobDownload),
        Box::new(DataUrlDownload),
        Box::new(OpenInViewer),
    ]
}

/// Run `strategies` in order until one saves or fails fatally.
///
/// # Errors
///
/// Returns the fatal error of a strategy, or an export error if every
/// strategy handed over.
pub fn persist_with_fallback<S>(
    host: &dyn PersistHost,
    strategies: &[S],
    png: &[u8],
    filename: &str,
) -> RenderResult<PersistedVia>
where
    S: std::ops::Deref,
    S::Target: PersistStrategy,
{
    let mut last_reason = "no persistence strategy configured".to_string();
    for strategy in strategies {
        match strategy.attempt(host, png, filename) {
            StrategyOutcome::Saved(via) => {
                tracing::debug!(strategy = strategy.name(), ?via, filename, "export persisted");
                return Ok(via);
            }
            StrategyOutcome::Next(reason) => {
                tracing::warn!(strategy = strategy.name(), %reason, "persistence fell through");
                last_reason = reason;
            }
            StrategyOutcome::Fatal(e) => {
                tracing::warn!(strategy = strategy.name(), error = %e, "persistence failed");
                return Err(e);
            }
        }
    }
    Err(RenderError::Export(last_reason))
}

/// Native host that persists into a directory.
///
/// Blobs are temp files inside the directory; downloading renames (or, for
/// `data:` URLs, writes) the final file. There is no viewer, so
/// [`PersistHost::open_view`] always reports blocked.
#[derive(Debug)]
pub struct DirectoryHost {
    dir: PathBuf,
    blobs: Mutex<HashMap<String, PathBuf>>,
    next_blob: AtomicU64,
}

impl DirectoryHost {
    /// Host writing into `dir`, which must already exist.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            blobs: Mutex::new(HashMap::new()),
            next_blob: AtomicU64::new(1),
        }
    }

    /// Output directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of blobs created and not yet revoked.
    #[must_use]
    pub fn live_blobs(&self) -> usize {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn target(&self, filename: &str) -> RenderResult<PathBuf> {
        let name = Path::new(filename)
            .file_name()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| RenderError::Export(format!("invalid filename {filename:?}")))?;
        Ok(self.dir.join(name))
    }
}

impl PersistHost for DirectoryHost {
    fn create_blob(&self, png: &[u8]) -> RenderResult<String> {
        let n = self.next_blob.fetch_add(1, Ordering::Relaxed);
        let path = self.dir.join(format!(".sheet-blob-{n}.tmp"));
        std::fs::write(&path, png)?;
        let url = format!("blob:{n}");
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.clone(), path);
        Ok(url)
    }

    fn revoke_blob(&self, url: &str) {
        let path = self
            .blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(url);
        if let Some(path) = path {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "blob cleanup failed"),
            }
        }
    }

    fn can_download(&self) -> bool {
        self.dir.is_dir()
    }

    fn download(&self, url: &str, filename: &str) -> RenderResult<()> {
        let target = self.target(filename)?;
        if let Some(payload) = url.strip_prefix("data:") {
            let (_, encoded) = payload
                .split_once(";base64,")
                .ok_or_else(|| RenderError::Export("unsupported data URL".to_string()))?;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| RenderError::Export(format!("bad data URL: {e}")))?;
            std::fs::write(&target, bytes)?;
            return Ok(());
        }

        let source = self
            .blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
            .ok_or_else(|| RenderError::Export(format!("unknown blob {url}")))?;
        std::fs::rename(source, target)?;
        Ok(())
    }

    fn open_view(&self, url: &str) -> bool {
        tracing::warn!(bytes = url.len(), "no viewer available for exported image");
        false
    }
}
