//! Trace file container (.nctr)
//!
//! Wraps one finished flat buffer in a small header, optionally LZ4
//! compressed.
//!
//! # File Structure
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Header (12 bytes)                    │
//! │ ├─ magic: "NCTR"                     │
//! │ ├─ version: u8                       │
//! │ ├─ flags: u8                         │
//! │ ├─ reserved: [u8; 2]                 │
//! │ └─ payload_len: u32                  │
//! ├──────────────────────────────────────┤
//! │ Payload (flat buffer, or LZ4 with    │
//! │ its uncompressed size prepended)     │
//! └──────────────────────────────────────┘
//! ```

mod reader;
mod writer;

pub use reader::TraceReader;
pub use writer::TraceWriter;

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use nether_flat::reader::{self as flat, Table};
use nether_flat::{ReadResult, Schema, Verifier};
use thiserror::Error;

/// Magic bytes at the start of every trace file
pub const TRACE_MAGIC: [u8; 4] = *b"NCTR";

/// Current container version
pub const TRACE_VERSION: u8 = 1;

/// Size of the fixed header
pub const HEADER_SIZE: usize = 12;

bitflags::bitflags! {
    /// Trace container flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TraceFlags: u8 {
        /// Payload is LZ4 compressed
        const COMPRESSED = 0b0000_0001;
        /// Flat buffer starts with a u32 size prefix
        const SIZE_PREFIXED = 0b0000_0010;
        /// Flat buffer carries a file identifier
        const HAS_IDENTIFIER = 0b0000_0100;
    }
}

/// Container-level failures
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("not a trace file (magic {0:?})")]
    BadMagic([u8; 4]),

    #[error("unsupported trace version {0} (expected {TRACE_VERSION})")]
    UnsupportedVersion(u8),

    #[error("trace truncated: expected {expected} more bytes")]
    Truncated { expected: usize },

    #[error("payload of {len} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { len: usize, limit: usize },

    #[error("payload decompressed to {actual} bytes, header declared {declared}")]
    DecompressedSizeMismatch { declared: usize, actual: usize },

    #[error("size prefix does not match the buffer length")]
    SizePrefixMismatch,

    #[error("failed to decompress payload: {0}")]
    Decompress(#[from] lz4_flex::block::DecompressError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A flat buffer together with its container flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFile {
    pub flags: TraceFlags,
    /// Uncompressed flat buffer
    pub buffer: Vec<u8>,
}

impl TraceFile {
    pub fn new(buffer: Vec<u8>, flags: TraceFlags) -> Self {
        Self { flags, buffer }
    }

    /// Root table of the buffer, honouring the size-prefix flag.
    pub fn root(&self) -> ReadResult<Table<'_>> {
        if self.flags.contains(TraceFlags::SIZE_PREFIXED) {
            flat::size_prefixed_root(&self.buffer)
        } else {
            flat::root(&self.buffer)
        }
    }

    /// Verify the buffer against `schema`.
    pub fn verify(&self, schema: &Schema) -> ReadResult<()> {
        let verifier = Verifier::new(schema);
        if self.flags.contains(TraceFlags::SIZE_PREFIXED) {
            verifier.verify_size_prefixed(&self.buffer)
        } else {
            verifier.verify(&self.buffer)
        }
    }
}

/// Write `trace` to `path`.
pub fn save(path: &Path, trace: &TraceFile) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create trace file: {}", path.display()))?;
    let mut writer = TraceWriter::new(BufWriter::new(file));
    writer
        .write_trace(trace)
        .with_context(|| format!("Failed to write trace file: {}", path.display()))?;
    writer
        .into_inner()
        .flush()
        .with_context(|| format!("Failed to flush trace file: {}", path.display()))?;
    Ok(())
}

/// Read a trace from `path`.
pub fn load(path: &Path) -> anyhow::Result<TraceFile> {
    let file = File::open(path).with_context(|| format!("Failed to open trace file: {}", path.display()))?;
    TraceReader::new(BufReader::new(file))
        .read_trace()
        .with_context(|| format!("Failed to load trace file: {}", path.display()))
}
