//! Trace container reader

use std::io::{self, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use lz4_flex::decompress_size_prepended;
use nether_flat::VerifierOptions;
use tracing::{debug, warn};

use super::{ContainerError, HEADER_SIZE, TRACE_MAGIC, TRACE_VERSION, TraceFile, TraceFlags};

/// Reader for `.nctr` trace files
pub struct TraceReader<R: Read> {
    reader: R,
    max_size: usize,
}

impl<R: Read> TraceReader<R> {
    /// Reader accepting buffers up to the verifier's default size limit
    pub fn new(reader: R) -> Self {
        Self::with_limit(reader, VerifierOptions::default().max_apparent_size)
    }

    /// Reader rejecting payloads or decompressed buffers above `max_size` bytes
    pub fn with_limit(reader: R, max_size: usize) -> Self {
        Self { reader, max_size }
    }

    /// Read header and payload, decompressing when flagged.
    pub fn read_trace(&mut self) -> Result<TraceFile, ContainerError> {
        let (flags, payload_len) = self.read_header().map_err(|e| eof_as(e, HEADER_SIZE))?;
        self.check_size(payload_len)?;

        let mut payload = vec![0u8; payload_len];
        self.reader
            .read_exact(&mut payload)
            .map_err(|e| eof_as(ContainerError::Io(e), payload_len))?;

        let buffer = if flags.contains(TraceFlags::COMPRESSED) {
            self.decompress(&payload)?
        } else {
            payload
        };

        debug!(
            "Read trace: {} byte payload, {} byte buffer, flags {:?}",
            payload_len,
            buffer.len(),
            flags
        );
        Ok(TraceFile { flags, buffer })
    }

    fn read_header(&mut self) -> Result<(TraceFlags, usize), ContainerError> {
        let mut magic = [0u8; 4];
        self.reader.read_exact(&mut magic)?;
        if magic != TRACE_MAGIC {
            return Err(ContainerError::BadMagic(magic));
        }

        let version = self.reader.read_u8()?;
        if version != TRACE_VERSION {
            return Err(ContainerError::UnsupportedVersion(version));
        }

        let raw_flags = self.reader.read_u8()?;
        let flags = TraceFlags::from_bits_truncate(raw_flags);
        if flags.bits() != raw_flags {
            warn!("Ignoring unknown trace flags {:#010b}", raw_flags & !TraceFlags::all().bits());
        }

        let mut reserved = [0u8; 2];
        self.reader.read_exact(&mut reserved)?;

        let payload_len = self.reader.read_u32::<LittleEndian>()? as usize;
        Ok((flags, payload_len))
    }

    /// Decompress an LZ4 block whose uncompressed size is prepended as a u32.
    fn decompress(&self, payload: &[u8]) -> Result<Vec<u8>, ContainerError> {
        let declared = payload
            .get(..4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
            .ok_or(ContainerError::Truncated { expected: 4 })?;
        self.check_size(declared)?;

        let buffer = decompress_size_prepended(payload)?;
        if buffer.len() != declared {
            return Err(ContainerError::DecompressedSizeMismatch {
                declared,
                actual: buffer.len(),
            });
        }
        Ok(buffer)
    }

    fn check_size(&self, len: usize) -> Result<(), ContainerError> {
        if len > self.max_size {
            return Err(ContainerError::PayloadTooLarge {
                len,
                limit: self.max_size,
            });
        }
        Ok(())
    }
}

fn eof_as(err: ContainerError, expected: usize) -> ContainerError {
    match err {
        ContainerError::Io(io) if io.kind() == io::ErrorKind::UnexpectedEof => ContainerError::Truncated { expected },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::TraceWriter;

    fn write(trace: &TraceFile) -> Vec<u8> {
        let mut buffer = Vec::new();
        TraceWriter::new(&mut buffer).write_trace(trace).unwrap();
        buffer
    }

    #[test]
    fn test_roundtrip_raw() {
        let trace = TraceFile::new(vec![4, 0, 0, 0, 7, 7, 7, 7], TraceFlags::empty());
        let bytes = write(&trace);
        assert_eq!(TraceReader::new(bytes.as_slice()).read_trace().unwrap(), trace);
    }

    #[test]
    fn test_roundtrip_compressed() {
        let trace = TraceFile::new(vec![0u8; 4096], TraceFlags::COMPRESSED);
        let bytes = write(&trace);
        assert!(bytes.len() < 4096);
        assert_eq!(TraceReader::new(bytes.as_slice()).read_trace().unwrap(), trace);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = write(&TraceFile::new(vec![1], TraceFlags::empty()));
        bytes[0] = b'X';
        let err = TraceReader::new(bytes.as_slice()).read_trace().unwrap_err();
        assert!(matches!(err, ContainerError::BadMagic(magic) if &magic == b"XCTR"));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = write(&TraceFile::new(vec![1], TraceFlags::empty()));
        bytes[4] = TRACE_VERSION + 1;
        let err = TraceReader::new(bytes.as_slice()).read_trace().unwrap_err();
        assert!(matches!(err, ContainerError::UnsupportedVersion(v) if v == TRACE_VERSION + 1));
    }

    #[test]
    fn test_truncated() {
        let bytes = write(&TraceFile::new(vec![1, 2, 3, 4, 5, 6], TraceFlags::empty()));

        let err = TraceReader::new(&bytes[..HEADER_SIZE - 2]).read_trace().unwrap_err();
        assert!(matches!(err, ContainerError::Truncated { expected: HEADER_SIZE }));

        let err = TraceReader::new(&bytes[..bytes.len() - 1]).read_trace().unwrap_err();
        assert!(matches!(err, ContainerError::Truncated { expected: 6 }));
    }

    #[test]
    fn test_corrupt_compressed_payload() {
        let mut bytes = write(&TraceFile::new(vec![5u8; 512], TraceFlags::COMPRESSED));
        // Claim a much larger uncompressed size than the block holds
        bytes[HEADER_SIZE..HEADER_SIZE + 4].copy_from_slice(&100_000u32.to_le_bytes());
        let err = TraceReader::new(bytes.as_slice()).read_trace().unwrap_err();
        assert!(
            matches!(
                err,
                ContainerError::Decompress(_) | ContainerError::DecompressedSizeMismatch { declared: 100_000, .. }
            ),
            "{err:?}"
        );
    }

    #[test]
    fn test_garbage_compressed_block() {
        let mut bytes = write(&TraceFile::new(vec![1], TraceFlags::empty()));
        bytes[5] = TraceFlags::COMPRESSED.bits();
        // Payload is a single byte, too short for the size prefix
        let err = TraceReader::new(bytes.as_slice()).read_trace().unwrap_err();
        assert!(matches!(err, ContainerError::Truncated { expected: 4 }));
    }

    #[test]
    fn test_oversized_payload_rejected_before_reading() {
        let bytes = write(&TraceFile::new(vec![0u8; 64], TraceFlags::empty()));
        let err = TraceReader::with_limit(bytes.as_slice(), 32).read_trace().unwrap_err();
        assert!(matches!(err, ContainerError::PayloadTooLarge { len: 64, limit: 32 }));

        // Header claims 4 GiB with no payload behind it
        let mut bytes = write(&TraceFile::new(Vec::new(), TraceFlags::empty()));
        bytes[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
        let err = TraceReader::new(bytes.as_slice()).read_trace().unwrap_err();
        assert!(matches!(err, ContainerError::PayloadTooLarge { len, .. } if len == u32::MAX as usize));
    }

    #[test]
    fn test_oversized_decompressed_size_rejected() {
        let mut bytes = write(&TraceFile::new(vec![5u8; 512], TraceFlags::COMPRESSED));
        bytes[HEADER_SIZE..HEADER_SIZE + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        let err = TraceReader::with_limit(bytes.as_slice(), 1024).read_trace().unwrap_err();
        assert!(matches!(err, ContainerError::PayloadTooLarge { limit: 1024, .. }));
    }

    #[test]
    fn test_unknown_flags_are_ignored() {
        let mut bytes = write(&TraceFile::new(vec![1], TraceFlags::empty()));
        bytes[5] = 0b1000_0000;
        let trace = TraceReader::new(bytes.as_slice()).read_trace().unwrap();
        assert_eq!(trace.flags, TraceFlags::empty());
    }
}
