//! First-run database provisioning from a packaged seed asset.
//!
//! Deployments differ in how the read-only seed image is reachable — a plain
//! file next to the binary, or bytes packed into the application bundle — but
//! the bootstrap semantics are identical: a byte-for-byte copy to the
//! writable location. [`SeedSource`] reduces both cases to "open a reader".

use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use tracing::debug;

/// A read-only seed image, openable as a byte stream.
pub trait SeedSource: Send + Sync {
    /// Open a reader over the seed bytes.
    ///
    /// A missing seed must surface as [`io::ErrorKind::NotFound`] — the
    /// bootstrap degrades to an empty database in that case.
    fn open(&self) -> io::Result<Box<dyn Read + Send>>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

/// Seed image read directly from the filesystem.
pub struct FileSeed {
    path: PathBuf,
}

impl FileSeed {
    /// Seed backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SeedSource for FileSeed {
    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(&self.path)?))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Seed image packed into the binary (bundled-asset deployments).
pub struct EmbeddedSeed {
    bytes: &'static [u8],
}

impl EmbeddedSeed {
    /// Seed backed by compiled-in bytes (e.g. `include_bytes!`).
    pub fn new(bytes: &'static [u8]) -> Self {
        Self { bytes }
    }
}

impl SeedSource for EmbeddedSeed {
    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.bytes)))
    }

    fn describe(&self) -> String {
        format!("embedded seed ({} bytes)", self.bytes.len())
    }
}

/// Stream-copy the seed to `dest`, returning the bytes written.
///
/// Blocking — callers run this on a blocking task.
pub(crate) fn copy_seed(seed: &dyn SeedSource, dest: &Path) -> io::Result<u64> {
    let mut reader = seed.open()?;
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(dest)?;
    let bytes = io::copy(&mut reader, &mut file)?;
    file.sync_all()?;
    debug!(source = seed.describe(), dest = %dest.display(), bytes, "seed copied");
    Ok(bytes)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
