//! A minimal, line-oriented reference [`BlockWriter`].
//!
//! The on-disk record encoding is explicitly out of scope for this crate;
//! this implementation exists so the WriterLoop and rotation logic have a
//! real, non-fake collaborator to run against. One human-readable line per
//! record, opened in append mode. Not a production format: no checksums,
//! no compaction, no crash-safe partial-write recovery beyond whatever the
//! filesystem itself provides.

use std::fs::{File, OpenOptions};
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::clock::Timestamp;
use crate::types::{Datapoint, FileHandle, SeriesId, TimeUnit};
use crate::writer::{BlockWriter, BlockWriterFactory, OnFlush};

/// Creates [`FsBlockWriter`]s rooted at a fixed directory.
pub struct FsBlockWriterFactory {
    directory: PathBuf,
}

impl FsBlockWriterFactory {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

impl BlockWriterFactory for FsBlockWriterFactory {
    type Writer = FsBlockWriter;

    fn create(&self, on_flush: OnFlush) -> Self::Writer {
        FsBlockWriter {
            directory: self.directory.clone(),
            file: None,
            on_flush,
        }
    }
}

/// Append-only, line-oriented file writer. One file per block, named
/// `<block_start_ns>.log`.
pub struct FsBlockWriter {
    directory: PathBuf,
    file: Option<File>,
    on_flush: OnFlush,
}

impl FsBlockWriter {
    fn block_path(&self, block_start: Timestamp) -> PathBuf {
        self.directory.join(format!("{block_start}.log"))
    }
}

impl BlockWriter for FsBlockWriter {
    fn open(&mut self, block_start: Timestamp, block_size: Duration) -> io::Result<FileHandle> {
        std::fs::create_dir_all(&self.directory)?;
        let path = self.block_path(block_start);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        self.file = Some(file);
        Ok(FileHandle {
            path,
            block_start,
            block_size,
        })
    }

    fn write(
        &mut self,
        series: SeriesId,
        datapoint: Datapoint,
        unit: TimeUnit,
        annotation: &[u8],
    ) -> io::Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "no block file is open"))?;
        writeln!(
            file,
            "{}\t{}\t{}\t{:?}\t{}",
            series.0,
            datapoint.timestamp,
            datapoint.value,
            unit,
            String::from_utf8_lossy(annotation),
        )
    }

    fn flush(&mut self) -> io::Result<()> {
        let result = match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        };
        (self.on_flush)(result.as_ref().map(|_| ()).map_err(Into::into));
        result
    }

    fn sync(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.sync_all(),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        let result = match self.file.take() {
            Some(mut file) => file.flush(),
            None => Ok(()),
        };
        (self.on_flush)(result.as_ref().map(|_| ()).map_err(Into::into));
        result
    }
}

/// Directory an [`FsBlockWriter`] is writing into, for callers that want to
/// inspect files out of band (tests, operational tooling).
pub fn block_files(directory: impl AsRef<Path>) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(directory)? {
        paths.push(entry?.path());
    }
    paths.sort();
    Ok(paths)
}
