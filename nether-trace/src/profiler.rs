//! Per-team profiler output
//!
//! A [`ProfilerCollection`] holds the interned frame (method) names of one team
//! and one [`ProfilerProfile`] per robot. Profiles are open/close event streams
//! that index into the frame table, the "evented" layout speedscope reads.

use hashbrown::HashMap;
use nether_flat::reader::{Table, VectorElement};
use nether_flat::{BuildError, FlatBuilder, Offset, ReadError, ReadResult, TableOffset};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Slots of the `ProfilerEvent` table
pub mod event {
    pub const IS_OPEN: u16 = 0;
    pub const AT: u16 = 1;
    pub const FRAME: u16 = 2;
    pub const FIELD_COUNT: u16 = 3;
}

/// Slots of the `ProfilerProfile` table
pub mod profile {
    pub const NAME: u16 = 0;
    pub const EVENTS: u16 = 1;
    pub const FIELD_COUNT: u16 = 2;
}

/// Slots of the `ProfilerFile` table
pub mod file {
    pub const FRAMES: u16 = 0;
    pub const PROFILES: u16 = 1;
    pub const FIELD_COUNT: u16 = 2;
}

// ============================================================================
// Owned data
// ============================================================================

/// Entering (`is_open`) or leaving a frame at a bytecode count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfilerEvent {
    pub is_open: bool,
    pub at: i32,
    pub frame: i32,
}

/// Event stream of one robot
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfilerProfile {
    pub name: String,
    pub events: Vec<ProfilerEvent>,
}

impl ProfilerProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            events: Vec::new(),
        }
    }

    pub fn open(&mut self, frame: i32, at: i32) {
        self.events.push(ProfilerEvent {
            is_open: true,
            at,
            frame,
        });
    }

    pub fn close(&mut self, frame: i32, at: i32) {
        self.events.push(ProfilerEvent {
            is_open: false,
            at,
            frame,
        });
    }

    /// Bytecode count of the first and last event
    pub fn span(&self) -> (i32, i32) {
        let start = self.events.first().map_or(0, |e| e.at);
        let end = self.events.last().map_or(0, |e| e.at);
        (start, end)
    }
}

/// Profiler output of one team
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "CollectionParts")]
pub struct ProfilerCollection {
    frames: Vec<String>,
    profiles: Vec<ProfilerProfile>,
    #[serde(skip)]
    frame_ids: HashMap<String, i32>,
}

#[derive(Deserialize)]
struct CollectionParts {
    frames: Vec<String>,
    profiles: Vec<ProfilerProfile>,
}

impl From<CollectionParts> for ProfilerCollection {
    fn from(parts: CollectionParts) -> Self {
        Self::from_parts(parts.frames, parts.profiles)
    }
}

impl PartialEq for ProfilerCollection {
    fn eq(&self, other: &Self) -> bool {
        self.frames == other.frames && self.profiles == other.profiles
    }
}

impl Eq for ProfilerCollection {}

impl ProfilerCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from already-interned frames.
    pub fn from_parts(frames: Vec<String>, profiles: Vec<ProfilerProfile>) -> Self {
        let frame_ids = frames
            .iter()
            .enumerate()
            .map(|(id, name)| (name.clone(), id as i32))
            .collect();
        Self {
            frames,
            profiles,
            frame_ids,
        }
    }

    /// Id of the frame called `name`, interning it on first use.
    pub fn frame_id(&mut self, name: &str) -> i32 {
        if let Some(&id) = self.frame_ids.get(name) {
            return id;
        }
        let id = self.frames.len() as i32;
        self.frames.push(name.to_string());
        self.frame_ids.insert(name.to_string(), id);
        id
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    pub fn profiles(&self) -> &[ProfilerProfile] {
        &self.profiles
    }

    pub fn push_profile(&mut self, profile: ProfilerProfile) {
        self.profiles.push(profile);
    }

    /// Export one profile as a speedscope document.
    pub fn to_speedscope(&self, index: usize) -> Option<serde_json::Value> {
        let profile = self.profiles.get(index)?;
        let (start, end) = profile.span();
        let frames: Vec<_> = self.frames.iter().map(|name| json!({ "name": name })).collect();
        let events: Vec<_> = profile
            .events
            .iter()
            .map(|e| {
                json!({
                    "type": if e.is_open { "O" } else { "C" },
                    "at": e.at,
                    "frame": e.frame,
                })
            })
            .collect();

        Some(json!({
            "$schema": "https://www.speedscope.app/file-format-schema.json",
            "shared": { "frames": frames },
            "profiles": [{
                "type": "evented",
                "name": profile.name,
                "unit": "none",
                "startValue": start,
                "endValue": end,
                "events": events,
            }],
        }))
    }

    /// Write the collection as a `ProfilerFile` table, leaves first.
    pub fn write(&self, builder: &mut FlatBuilder) -> Result<Offset<TableOffset>, BuildError> {
        let frames = builder.create_vector_of_strings(self.frames.as_slice())?;

        let mut profiles = Vec::with_capacity(self.profiles.len());
        for profile in &self.profiles {
            profiles.push(write_profile(builder, profile)?);
        }
        let profiles = builder.create_vector_of_offsets(&profiles)?;

        builder.start_object(file::FIELD_COUNT)?;
        builder.push_slot_offset(file::FRAMES, frames)?;
        builder.push_slot_offset(file::PROFILES, profiles)?;
        builder.end_object()
    }

    /// Copy a `ProfilerFile` view into an owned collection.
    pub fn read(view: &ProfilerFileRef<'_>) -> ReadResult<Self> {
        let frames = (0..view.frames_len()?)
            .map(|i| view.frame(i).map(str::to_string))
            .collect::<ReadResult<Vec<_>>>()?;

        let mut profiles = Vec::with_capacity(view.profiles_len()?);
        for i in 0..view.profiles_len()? {
            let profile = view.profile(i)?;
            let events = (0..profile.events_len()?)
                .map(|j| profile.event(j).and_then(|e| e.to_event()))
                .collect::<ReadResult<Vec<_>>>()?;
            profiles.push(ProfilerProfile {
                name: profile.name()?.to_string(),
                events,
            });
        }
        Ok(Self::from_parts(frames, profiles))
    }
}

fn write_profile(builder: &mut FlatBuilder, profile: &ProfilerProfile) -> Result<Offset<TableOffset>, BuildError> {
    let mut events = Vec::with_capacity(profile.events.len());
    for e in &profile.events {
        builder.start_object(event::FIELD_COUNT)?;
        builder.push_slot(event::AT, e.at, 0)?;
        builder.push_slot(event::FRAME, e.frame, 0)?;
        builder.push_slot(event::IS_OPEN, e.is_open, false)?;
        events.push(builder.end_object()?);
    }

    let name = builder.create_string(&profile.name)?;
    let events = builder.create_vector_of_offsets(&events)?;

    builder.start_object(profile::FIELD_COUNT)?;
    builder.push_slot_offset(profile::NAME, name)?;
    builder.push_slot_offset(profile::EVENTS, events)?;
    builder.end_object()
}

// ============================================================================
// Views
// ============================================================================

/// View of a `ProfilerEvent` table
#[derive(Debug, Clone, Copy)]
pub struct ProfilerEventRef<'a>(Table<'a>);

impl<'a> ProfilerEventRef<'a> {
    pub fn new(table: Table<'a>) -> Self {
        Self(table)
    }

    pub fn is_open(&self) -> ReadResult<bool> {
        self.0.get(event::IS_OPEN, false)
    }

    pub fn at(&self) -> ReadResult<i32> {
        self.0.get(event::AT, 0)
    }

    pub fn frame(&self) -> ReadResult<i32> {
        self.0.get(event::FRAME, 0)
    }

    pub fn to_event(&self) -> ReadResult<ProfilerEvent> {
        Ok(ProfilerEvent {
            is_open: self.is_open()?,
            at: self.at()?,
            frame: self.frame()?,
        })
    }
}

/// View of a `ProfilerProfile` table
#[derive(Debug, Clone, Copy)]
pub struct ProfilerProfileRef<'a>(Table<'a>);

impl<'a> ProfilerProfileRef<'a> {
    pub fn new(table: Table<'a>) -> Self {
        Self(table)
    }

    /// Robot name; empty when absent
    pub fn name(&self) -> ReadResult<&'a str> {
        Ok(self.0.get_str(profile::NAME)?.unwrap_or_default())
    }

    pub fn events_len(&self) -> ReadResult<usize> {
        Ok(self.0.get_vector::<Table>(profile::EVENTS)?.map_or(0, |v| v.len()))
    }

    pub fn event(&self, index: usize) -> ReadResult<ProfilerEventRef<'a>> {
        element::<Table>(&self.0, profile::EVENTS, index).map(ProfilerEventRef)
    }
}

/// View of a `ProfilerFile` table
#[derive(Debug, Clone, Copy)]
pub struct ProfilerFileRef<'a>(Table<'a>);

impl<'a> ProfilerFileRef<'a> {
    pub fn new(table: Table<'a>) -> Self {
        Self(table)
    }

    pub fn frames_len(&self) -> ReadResult<usize> {
        Ok(self.0.get_vector::<&str>(file::FRAMES)?.map_or(0, |v| v.len()))
    }

    pub fn frame(&self, index: usize) -> ReadResult<&'a str> {
        element::<&str>(&self.0, file::FRAMES, index)
    }

    pub fn profiles_len(&self) -> ReadResult<usize> {
        Ok(self.0.get_vector::<Table>(file::PROFILES)?.map_or(0, |v| v.len()))
    }

    pub fn profile(&self, index: usize) -> ReadResult<ProfilerProfileRef<'a>> {
        element::<Table>(&self.0, file::PROFILES, index).map(ProfilerProfileRef)
    }
}

/// Element `index` of the vector in `slot`; an absent vector is empty.
fn element<'a, T: VectorElement<'a>>(table: &Table<'a>, slot: u16, index: usize) -> ReadResult<T::Item> {
    match table.get_vector::<T>(slot)? {
        Some(vector) => vector.get(index),
        None => Err(ReadError::IndexOutOfRange { index, len: 0 }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nether_flat::reader;

    fn sample() -> ProfilerCollection {
        let mut collection = ProfilerCollection::new();
        let run = collection.frame_id("RobotPlayer.run");
        let mv = collection.frame_id("RobotPlayer.move");
        assert_eq!(collection.frame_id("RobotPlayer.run"), run);

        let mut profile = ProfilerProfile::new("Robot #1");
        profile.open(run, 0);
        profile.open(mv, 10);
        profile.close(mv, 250);
        profile.close(run, 300);
        collection.push_profile(profile);
        collection.push_profile(ProfilerProfile::new("Robot #2"));
        collection
    }

    #[test]
    fn test_frame_interning() {
        let collection = sample();
        assert_eq!(collection.frames(), ["RobotPlayer.run", "RobotPlayer.move"]);
        let mut rebuilt = ProfilerCollection::from_parts(collection.frames().to_vec(), Vec::new());
        assert_eq!(rebuilt.frame_id("RobotPlayer.move"), 1);
        assert_eq!(rebuilt.frame_id("RobotPlayer.yield"), 2);
    }

    #[test]
    fn test_profile_views() {
        let collection = sample();
        let mut builder = FlatBuilder::new();
        let root = collection.write(&mut builder).unwrap();
        let bytes = builder.finish(root).unwrap();

        let file = ProfilerFileRef::new(reader::root(bytes).unwrap());
        assert_eq!(file.frames_len().unwrap(), 2);
        assert_eq!(file.frame(1).unwrap(), "RobotPlayer.move");
        assert_eq!(file.profiles_len().unwrap(), 2);

        let first = file.profile(0).unwrap();
        assert_eq!(first.name().unwrap(), "Robot #1");
        assert_eq!(first.events_len().unwrap(), 4);
        let event = first.event(2).unwrap();
        assert!(!event.is_open().unwrap());
        assert_eq!(event.at().unwrap(), 250);
        assert_eq!(event.frame().unwrap(), 1);
        assert!(first.event(4).is_err());

        let second = file.profile(1).unwrap();
        assert_eq!(second.events_len().unwrap(), 0);
        assert!(file.profile(2).is_err());

        assert_eq!(ProfilerCollection::read(&file).unwrap(), collection);
    }

    #[test]
    fn test_speedscope_export() {
        let doc = sample().to_speedscope(0).unwrap();
        assert_eq!(doc["shared"]["frames"][0]["name"], "RobotPlayer.run");
        let profile = &doc["profiles"][0];
        assert_eq!(profile["type"], "evented");
        assert_eq!(profile["name"], "Robot #1");
        assert_eq!(profile["startValue"], 0);
        assert_eq!(profile["endValue"], 300);
        assert_eq!(profile["events"][1]["type"], "O");
        assert_eq!(profile["events"][3]["type"], "C");
        assert!(sample().to_speedscope(5).is_none());
    }
}
