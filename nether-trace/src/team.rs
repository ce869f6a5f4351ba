//! Team metadata

use nether_flat::reader::Table;
use nether_flat::{BuildError, FlatBuilder, Offset, ReadResult, TableOffset};
use serde::{Deserialize, Serialize};

/// Slots of the `TeamData` table
pub mod slots {
    pub const NAME: u16 = 0;
    pub const PACKAGE_NAME: u16 = 1;
    pub const TEAM_ID: u16 = 2;
    pub const FIELD_COUNT: u16 = 3;
}

/// Display name and bot package of one team
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TeamData {
    pub name: String,
    pub package_name: String,
    pub team_id: i8,
}

impl TeamData {
    pub fn write(&self, builder: &mut FlatBuilder) -> Result<Offset<TableOffset>, BuildError> {
        let name = builder.create_shared_string(&self.name)?;
        let package_name = builder.create_shared_string(&self.package_name)?;

        builder.start_object(slots::FIELD_COUNT)?;
        builder.push_slot_offset(slots::NAME, name)?;
        builder.push_slot_offset(slots::PACKAGE_NAME, package_name)?;
        builder.push_slot(slots::TEAM_ID, self.team_id, 0)?;
        builder.end_object()
    }

    pub fn read(view: &TeamDataRef<'_>) -> ReadResult<Self> {
        Ok(Self {
            name: view.name()?.to_string(),
            package_name: view.package_name()?.to_string(),
            team_id: view.team_id()?,
        })
    }
}

/// View of a `TeamData` table
#[derive(Debug, Clone, Copy)]
pub struct TeamDataRef<'a>(Table<'a>);

impl<'a> TeamDataRef<'a> {
    pub fn new(table: Table<'a>) -> Self {
        Self(table)
    }

    pub fn name(&self) -> ReadResult<&'a str> {
        Ok(self.0.get_str(slots::NAME)?.unwrap_or_default())
    }

    pub fn package_name(&self) -> ReadResult<&'a str> {
        Ok(self.0.get_str(slots::PACKAGE_NAME)?.unwrap_or_default())
    }

    pub fn team_id(&self) -> ReadResult<i8> {
        self.0.get(slots::TEAM_ID, 0)
    }
}
