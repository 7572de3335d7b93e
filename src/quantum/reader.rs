//! Sequential reader for quantum files.
//!
//! The file is one contiguous byte stream of envelopes; window rotation on
//! the writer side leaves no marker to skip. After a crash the final
//! window's unwritten tail survives as zero bytes, so an all-zero header
//! means end-of-log. A header whose declared payload runs past the end of
//! the file is malformed and read strictly: no skipping, no repair.
//!
//! Replay itself (interpreting and re-applying the messages) belongs to the
//! recovery layer, not here.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::envelope::{Envelope, ENVELOPE_HEADER_BYTES};
use super::errors::{QuantumError, QuantumResult};

/// Reads envelopes back in the exact order they were written.
#[derive(Debug)]
pub struct QuantumReader {
    path: PathBuf,
    reader: BufReader<File>,
    offset: u64,
    file_len: u64,
}

impl QuantumReader {
    /// Opens a quantum file for sequential reading.
    pub fn open(path: &Path) -> QuantumResult<Self> {
        let file = File::open(path).map_err(|e| {
            QuantumError::read(format!("failed to open quantum file {}", path.display()), e)
        })?;
        let file_len = file
            .metadata()
            .map_err(|e| {
                QuantumError::read(
                    format!("failed to stat quantum file {}", path.display()),
                    e,
                )
            })?
            .len();

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            offset: 0,
            file_len,
        })
    }

    /// Reads the next envelope.
    ///
    /// Returns `Ok(None)` at end-of-log: either the end of the file or the
    /// zeroed tail of a crashed writer's final window.
    ///
    /// # Errors
    ///
    /// `QUANTA_READ_FAILED` if the stream is malformed (a trailing fragment
    /// shorter than a header, or a payload running past end of file).
    pub fn read_next(&mut self) -> QuantumResult<Option<Envelope>> {
        let remaining = self.file_len - self.offset;
        if remaining == 0 {
            return Ok(None);
        }
        if remaining < ENVELOPE_HEADER_BYTES as u64 {
            return Err(self.malformed(format!(
                "{remaining} trailing bytes at offset {} are shorter than an envelope header",
                self.offset
            )));
        }

        let mut header = [0u8; ENVELOPE_HEADER_BYTES];
        self.reader
            .read_exact(&mut header)
            .map_err(|e| self.read_failed("envelope header", e))?;

        let destination_id = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let payload_len =
            u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as u64;

        if destination_id == 0 && payload_len == 0 {
            // Zeroed tail of the final window; nothing further was written.
            self.offset = self.file_len;
            return Ok(None);
        }

        if remaining - (ENVELOPE_HEADER_BYTES as u64) < payload_len {
            return Err(self.malformed(format!(
                "envelope at offset {} declares {payload_len} payload bytes, {} available",
                self.offset,
                remaining - ENVELOPE_HEADER_BYTES as u64
            )));
        }

        let mut payload = vec![0u8; payload_len as usize];
        self.reader
            .read_exact(&mut payload)
            .map_err(|e| self.read_failed("envelope payload", e))?;

        self.offset += ENVELOPE_HEADER_BYTES as u64 + payload_len;
        Ok(Some(Envelope {
            destination_id,
            payload,
        }))
    }

    /// Path of the quantum file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset of the next unread envelope.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn malformed(&self, message: String) -> QuantumError {
        QuantumError::read(
            message,
            std::io::Error::new(std::io::ErrorKind::InvalidData, "malformed quantum file"),
        )
    }

    fn read_failed(&self, what: &str, err: std::io::Error) -> QuantumError {
        QuantumError::read(
            format!("failed to read {what} at offset {} of {}", self.offset, self.path.display()),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_stream(dir: &TempDir, frames: &[Envelope]) -> PathBuf {
        let path = dir.path().join("3.log");
        let mut bytes = Vec::new();
        for envelope in frames {
            bytes.extend_from_slice(&envelope.encode());
        }
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn reads_envelopes_in_written_order() {
        let dir = TempDir::new().unwrap();
        let path = write_stream(
            &dir,
            &[
                Envelope::new(1, b"alpha".to_vec()).unwrap(),
                Envelope::new(2, b"beta".to_vec()).unwrap(),
                Envelope::new(3, b"gamma".to_vec()).unwrap(),
            ],
        );

        let mut reader = QuantumReader::open(&path).unwrap();
        assert_eq!(reader.read_next().unwrap().unwrap().payload, b"alpha");
        assert_eq!(reader.read_next().unwrap().unwrap().payload, b"beta");

        let third = reader.read_next().unwrap().unwrap();
        assert_eq!(third.destination_id, 3);
        assert_eq!(third.payload, b"gamma");
        assert!(reader.read_next().unwrap().is_none());
    }

    #[test]
    fn empty_file_is_an_empty_log() {
        let dir = TempDir::new().unwrap();
        let path = write_stream(&dir, &[]);

        let mut reader = QuantumReader::open(&path).unwrap();
        assert!(reader.read_next().unwrap().is_none());
    }

    #[test]
    fn zeroed_tail_reads_as_end_of_log() {
        let dir = TempDir::new().unwrap();
        let path = write_stream(&dir, &[Envelope::new(4, b"survivor".to_vec()).unwrap()]);

        // Simulate a crashed writer: the final window's sparse tail.
        let mut bytes = fs::read(&path).unwrap();
        bytes.extend_from_slice(&[0u8; 64]);
        fs::write(&path, bytes).unwrap();

        let mut reader = QuantumReader::open(&path).unwrap();
        assert_eq!(reader.read_next().unwrap().unwrap().payload, b"survivor");
        assert!(reader.read_next().unwrap().is_none());
    }

    #[test]
    fn overlong_payload_declaration_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("3.log");

        let mut bytes = 5u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&100u32.to_le_bytes());
        bytes.extend_from_slice(b"short");
        fs::write(&path, bytes).unwrap();

        let mut reader = QuantumReader::open(&path).unwrap();
        let err = reader.read_next().unwrap_err();
        assert_eq!(err.code(), "QUANTA_READ_FAILED");
    }

    #[test]
    fn short_trailing_fragment_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write_stream(&dir, &[Envelope::new(6, b"ok".to_vec()).unwrap()]);

        let mut bytes = fs::read(&path).unwrap();
        bytes.extend_from_slice(&[7u8; 3]);
        fs::write(&path, bytes).unwrap();

        let mut reader = QuantumReader::open(&path).unwrap();
        reader.read_next().unwrap().unwrap();
        assert!(reader.read_next().is_err());
    }

    #[test]
    fn missing_file_fails_to_open() {
        let dir = TempDir::new().unwrap();
        let err = QuantumReader::open(&dir.path().join("absent.log")).unwrap_err();
        assert_eq!(err.code(), "QUANTA_READ_FAILED");
    }
}
