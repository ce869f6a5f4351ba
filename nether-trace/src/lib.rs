//! Nether-Trace: match traces for Nethercore
//!
//! Profiler output, team metadata and game actions encoded as nether-flat
//! buffers, plus the `.nctr` container that stores them on disk.
//!
//! # Usage
//!
//! ```
//! use nether_trace::{ProfilerCollection, ProfilerProfile, decode_profiler_files, encode_profiler_files};
//!
//! let mut team = ProfilerCollection::new();
//! let run = team.frame_id("RobotPlayer.run");
//! let mut profile = ProfilerProfile::new("Robot #1");
//! profile.open(run, 0);
//! profile.close(run, 120);
//! team.push_profile(profile);
//!
//! let buffer = encode_profiler_files(&[team.clone()]).unwrap();
//! assert_eq!(decode_profiler_files(&buffer).unwrap(), vec![team]);
//! ```

pub mod actions;
pub mod container;
pub mod footer;
pub mod profiler;
mod schema;
pub mod team;

pub use actions::{Action, ActionRecord, ActionValue, AttackAction, DieAction, DieType, PaintAction, UpgradeAction};
pub use container::{ContainerError, TraceFile, TraceFlags, TraceReader, TraceWriter};
pub use footer::{
    MatchFooter, MatchFooterRef, TRACE_IDENTIFIER, WinType, decode_profiler_files, encode_profiler_files,
};
pub use profiler::{
    ProfilerCollection, ProfilerEvent, ProfilerEventRef, ProfilerFileRef, ProfilerProfile, ProfilerProfileRef,
};
pub use schema::{TRACE_SCHEMA, trace_schema};
pub use team::{TeamData, TeamDataRef};
