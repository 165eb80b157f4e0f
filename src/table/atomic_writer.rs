//! Atomic CSV file writer with automatic cleanup on failure.
//!
//! Rows go to a temporary file next to the destination, which replaces the
//! destination only on `finish()`. Dropping the writer early deletes the
//! temporary file, so an existing output file is never clobbered by a
//! partial write.

use std::io::BufWriter;
use std::path::{Path, PathBuf};

use csv::Writer;
use tempfile::NamedTempFile;

use crate::error::AppError;

/// An atomic CSV writer.
pub struct AtomicCsvWriter {
    writer: Writer<BufWriter<NamedTempFile>>,
    final_path: PathBuf,
    rows_written: u64,
}

impl AtomicCsvWriter {
    /// Creates a writer targeting `final_path`.
    ///
    /// The temporary file lives in the destination's directory so the final
    /// rename stays on one filesystem.
    ///
    /// # Errors
    ///
    /// Returns `AppError::OutputFailed` if the path has no file name or the
    /// temporary file cannot be created.
    pub fn new(final_path: impl AsRef<Path>) -> Result<Self, AppError> {
        let final_path = final_path.as_ref().to_path_buf();

        if final_path.file_name().is_none() {
            return Err(AppError::OutputFailed(format!(
                "Output path has no file name: {}",
                final_path.display()
            )));
        }

        // A bare file name has an empty parent; that means the working directory.
        let parent_dir = match final_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let temp_file = NamedTempFile::new_in(&parent_dir).map_err(|e| {
            AppError::OutputFailed(format!(
                "Failed to create temporary file in {}: {}",
                parent_dir.display(),
                e
            ))
        })?;

        Ok(Self {
            writer: Writer::from_writer(BufWriter::new(temp_file)),
            final_path,
            rows_written: 0,
        })
    }

    /// Writes one record (the header counts as a record).
    pub fn write_record<I, T>(&mut self, record: I) -> Result<(), AppError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer
            .write_record(record)
            .map_err(|e| AppError::OutputFailed(format!("Failed to write CSV record: {}", e)))?;
        self.rows_written += 1;
        Ok(())
    }

    /// Number of records written so far, header included.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flushes all buffers and atomically moves the file into place.
    ///
    /// # Errors
    ///
    /// Returns `AppError::OutputFailed` if flushing or persisting fails. The
    /// temporary file is removed in that case.
    pub fn finish(self) -> Result<PathBuf, AppError> {
        let buf_writer = self.writer.into_inner().map_err(|e| {
            AppError::OutputFailed(format!("Failed to flush CSV writer: {}", e.error()))
        })?;

        let named_temp = buf_writer.into_inner().map_err(|e| {
            AppError::OutputFailed(format!("Failed to flush buffer: {}", e.error()))
        })?;

        named_temp.persist(&self.final_path).map_err(|e| {
            AppError::OutputFailed(format!(
                "Failed to persist file to {}: {}",
                self.final_path.display(),
                e.error
            ))
        })?;

        Ok(self.final_path)
    }
}
