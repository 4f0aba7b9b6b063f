//! Read-only file mappings used as zero-copy response bodies.

use memmap2::Mmap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts live mappings across all connections.
#[derive(Debug, Clone, Default)]
pub struct MapGauge(Arc<AtomicUsize>);

impl MapGauge {
    pub fn live(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    fn acquire(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }

    fn release(&self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A file mapped read-only for the lifetime of this value.
///
/// The mapping is released when the value is dropped, whichever path drops
/// it. Empty files carry no mapping at all.
pub struct MappedFile {
    map: Option<Mmap>,
    path: PathBuf,
    gauge: MapGauge,
}

impl MappedFile {
    pub fn open(path: &Path, gauge: &MapGauge) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();

        let map = if len == 0 {
            None
        } else {
            // SAFETY: the mapping is read-only and only ever exposed as a
            // byte slice. Files under the document root are not expected to
            // be truncated while being served.
            Some(unsafe { Mmap::map(&file)? })
        };

        gauge.acquire();
        tracing::trace!(path = %path.display(), len, "Mapped file");

        Ok(Self {
            map,
            path: path.to_path_buf(),
            gauge: gauge.clone(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.map.as_deref().unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for MappedFile {
    fn drop(&mut self) {
        self.gauge.release();
        tracing::trace!(path = %self.path.display(), "Released file mapping");
    }
}

impl std::fmt::Debug for MappedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedFile")
            .field("path", &self.path)
            .field("len", &self.len())
            .finish()
    }
}
