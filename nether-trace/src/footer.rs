//! Match footer: outcome of a match plus the profiler output of every team
//!
//! The footer is the root table of a trace buffer and carries the `NTRC` file
//! identifier.

use nether_flat::reader::{self, Table};
use nether_flat::{BuildError, FinishedBuffer, FlatBuilder, ReadError, ReadResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::profiler::{ProfilerCollection, ProfilerFileRef};

/// File identifier of trace buffers
pub const TRACE_IDENTIFIER: [u8; 4] = *b"NTRC";

/// Slots of the `MatchFooter` table
pub mod slots {
    pub const WINNER: u16 = 0;
    pub const WIN_TYPE: u16 = 1;
    pub const TOTAL_ROUNDS: u16 = 2;
    pub const PROFILER_FILES: u16 = 3;
    pub const FIELD_COUNT: u16 = 4;
}

/// How a match was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum WinType {
    #[default]
    Resignation = 0,
    MajorityPainted = 1,
    AllUnitsDestroyed = 2,
    AreaPainted = 3,
    MoreTowers = 4,
    MoreMoney = 5,
    MoreStoredPaint = 6,
    MoreRobots = 7,
    CoinFlip = 8,
}

impl WinType {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => WinType::Resignation,
            1 => WinType::MajorityPainted,
            2 => WinType::AllUnitsDestroyed,
            3 => WinType::AreaPainted,
            4 => WinType::MoreTowers,
            5 => WinType::MoreMoney,
            6 => WinType::MoreStoredPaint,
            7 => WinType::MoreRobots,
            8 => WinType::CoinFlip,
            _ => return None,
        })
    }
}

/// Owned match footer
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchFooter {
    /// Winning team id
    pub winner: i8,
    pub win_type: WinType,
    pub total_rounds: i32,
    pub profiler_files: Vec<ProfilerCollection>,
}

impl MatchFooter {
    /// Build a complete trace buffer with this footer as its root.
    pub fn encode(&self, builder: &mut FlatBuilder) -> Result<(), BuildError> {
        let mut files = Vec::with_capacity(self.profiler_files.len());
        for collection in &self.profiler_files {
            files.push(collection.write(builder)?);
        }
        let files = builder.create_vector_of_offsets(&files)?;

        builder.start_object(slots::FIELD_COUNT)?;
        builder.push_slot(slots::TOTAL_ROUNDS, self.total_rounds, 0)?;
        builder.push_slot_offset(slots::PROFILER_FILES, files)?;
        builder.push_slot(slots::WINNER, self.winner, 0)?;
        builder.push_slot(slots::WIN_TYPE, self.win_type as u8, 0)?;
        let root = builder.end_object()?;

        let bytes = builder.finish_with_identifier(root, &TRACE_IDENTIFIER)?;
        debug!(
            "Encoded match footer: {} profiler files, {} bytes",
            self.profiler_files.len(),
            bytes.len()
        );
        Ok(())
    }

    /// Copy a footer view into owned data.
    pub fn decode(bytes: &[u8]) -> ReadResult<Self> {
        let view = MatchFooterRef::root(bytes)?;
        let mut profiler_files = Vec::with_capacity(view.profiler_files_len()?);
        for i in 0..view.profiler_files_len()? {
            profiler_files.push(ProfilerCollection::read(&view.profiler_file(i)?)?);
        }
        Ok(Self {
            winner: view.winner()?,
            win_type: view.win_type()?,
            total_rounds: view.total_rounds()?,
            profiler_files,
        })
    }
}

/// Encode the profiler output of a match into a standalone trace buffer.
pub fn encode_profiler_files(collections: &[ProfilerCollection]) -> Result<FinishedBuffer, BuildError> {
    let footer = MatchFooter {
        profiler_files: collections.to_vec(),
        ..MatchFooter::default()
    };
    let mut builder = FlatBuilder::new();
    footer.encode(&mut builder)?;
    builder.into_finished()
}

/// Decode every profiler file of a trace buffer.
pub fn decode_profiler_files(bytes: &[u8]) -> ReadResult<Vec<ProfilerCollection>> {
    Ok(MatchFooter::decode(bytes)?.profiler_files)
}

/// View of a `MatchFooter` table
#[derive(Debug, Clone, Copy)]
pub struct MatchFooterRef<'a>(Table<'a>);

impl<'a> MatchFooterRef<'a> {
    /// Root footer of a trace buffer, checking its identifier.
    pub fn root(bytes: &'a [u8]) -> ReadResult<Self> {
        reader::root_with_identifier(bytes, &TRACE_IDENTIFIER).map(Self)
    }

    pub fn winner(&self) -> ReadResult<i8> {
        self.0.get(slots::WINNER, 0)
    }

    pub fn win_type(&self) -> ReadResult<WinType> {
        let raw = self.0.get(slots::WIN_TYPE, 0u8)?;
        WinType::from_u8(raw).ok_or_else(|| ReadError::TypeMismatch {
            field: "win_type".to_string(),
            expected: "a WinType",
            actual: "an unknown enum value",
        })
    }

    pub fn total_rounds(&self) -> ReadResult<i32> {
        self.0.get(slots::TOTAL_ROUNDS, 0)
    }

    pub fn profiler_files_len(&self) -> ReadResult<usize> {
        Ok(self
            .0
            .get_vector::<Table>(slots::PROFILER_FILES)?
            .map_or(0, |v| v.len()))
    }

    pub fn profiler_file(&self, index: usize) -> ReadResult<ProfilerFileRef<'a>> {
        match self.0.get_vector::<Table>(slots::PROFILER_FILES)? {
            Some(files) => files.get(index).map(ProfilerFileRef::new),
            None => Err(ReadError::IndexOutOfRange { index, len: 0 }),
        }
    }
}
