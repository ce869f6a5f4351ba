//! Trace container writer

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use lz4_flex::compress_prepend_size;
use tracing::debug;

use super::{ContainerError, TRACE_MAGIC, TRACE_VERSION, TraceFile, TraceFlags};

/// Writer for `.nctr` trace files
pub struct TraceWriter<W: Write> {
    writer: W,
}

impl<W: Write> TraceWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write header and payload, compressing when the trace asks for it.
    pub fn write_trace(&mut self, trace: &TraceFile) -> Result<(), ContainerError> {
        if trace.flags.contains(TraceFlags::SIZE_PREFIXED) {
            check_size_prefix(&trace.buffer)?;
        }

        let compressed;
        let payload = if trace.flags.contains(TraceFlags::COMPRESSED) {
            compressed = compress_prepend_size(&trace.buffer);
            &compressed
        } else {
            &trace.buffer
        };
        let payload_len = u32::try_from(payload.len()).map_err(|_| ContainerError::PayloadTooLarge {
            len: payload.len(),
            limit: u32::MAX as usize,
        })?;

        self.writer.write_all(&TRACE_MAGIC)?;
        self.writer.write_u8(TRACE_VERSION)?;
        self.writer.write_u8(trace.flags.bits())?;
        self.writer.write_all(&[0, 0])?;
        self.writer.write_u32::<LittleEndian>(payload_len)?;
        self.writer.write_all(payload)?;

        debug!(
            "Wrote trace: {} byte buffer, {} byte payload, flags {:?}",
            trace.buffer.len(),
            payload_len,
            trace.flags
        );
        Ok(())
    }

    /// Consume the writer and return the inner writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn check_size_prefix(buffer: &[u8]) -> Result<(), ContainerError> {
    let prefix = buffer
        .get(..4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize);
    match prefix {
        Some(size) if size + 4 == buffer.len() => Ok(()),
        _ => Err(ContainerError::SizePrefixMismatch),
    }
}
