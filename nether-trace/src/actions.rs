//! Game actions
//!
//! Every action recorded during a round is one variant of the `Action` union.
//! Most variants are small fixed-size structs written inline; indicator
//! strings carry text and are tables.

use nether_flat::reader::Table;
use nether_flat::{BuildError, FlatBuilder, FlatStruct, Offset, ReadError, ReadResult, TableOffset};
use serde::{Deserialize, Serialize};

/// Slots of the `ActionRecord` table
pub mod record {
    pub const ROBOT_ID: u16 = 0;
    pub const ACTION_TYPE: u16 = 1;
    pub const ACTION: u16 = 2;
    pub const FIELD_COUNT: u16 = 3;
}

/// Slots of the `IndicatorStringAction` table
pub mod indicator_string {
    pub const ID: u16 = 0;
    pub const VALUE: u16 = 1;
    pub const FIELD_COUNT: u16 = 2;
}

/// Union tags of `Action`. `None` (0) marks an absent action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Action {
    None = 0,
    DamageAction = 1,
    PaintAction = 2,
    UnpaintAction = 3,
    MarkAction = 4,
    UnmarkAction = 5,
    AttackAction = 6,
    SplashAction = 7,
    MopAction = 8,
    BuildAction = 9,
    TransferAction = 10,
    MessageAction = 11,
    SpawnAction = 12,
    DieAction = 13,
    UpgradeAction = 14,
    IndicatorStringAction = 15,
    IndicatorDotAction = 16,
    IndicatorLineAction = 17,
}

impl Action {
    pub const ALL: [Action; 18] = [
        Action::None,
        Action::DamageAction,
        Action::PaintAction,
        Action::UnpaintAction,
        Action::MarkAction,
        Action::UnmarkAction,
        Action::AttackAction,
        Action::SplashAction,
        Action::MopAction,
        Action::BuildAction,
        Action::TransferAction,
        Action::MessageAction,
        Action::SpawnAction,
        Action::DieAction,
        Action::UpgradeAction,
        Action::IndicatorStringAction,
        Action::IndicatorDotAction,
        Action::IndicatorLineAction,
    ];

    pub fn from_u8(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Variant name as it appears in schemas and JSON dumps
    pub fn name(self) -> &'static str {
        match self {
            Action::None => "NONE",
            Action::DamageAction => "DamageAction",
            Action::PaintAction => "PaintAction",
            Action::UnpaintAction => "UnpaintAction",
            Action::MarkAction => "MarkAction",
            Action::UnmarkAction => "UnmarkAction",
            Action::AttackAction => "AttackAction",
            Action::SplashAction => "SplashAction",
            Action::MopAction => "MopAction",
            Action::BuildAction => "BuildAction",
            Action::TransferAction => "TransferAction",
            Action::MessageAction => "MessageAction",
            Action::SpawnAction => "SpawnAction",
            Action::DieAction => "DieAction",
            Action::UpgradeAction => "UpgradeAction",
            Action::IndicatorStringAction => "IndicatorStringAction",
            Action::IndicatorDotAction => "IndicatorDotAction",
            Action::IndicatorLineAction => "IndicatorLineAction",
        }
    }
}

/// Why a robot was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(i8)]
pub enum DieType {
    #[default]
    Unknown = 0,
    Exception = 1,
    Destroyed = 2,
}

impl DieType {
    pub fn from_i8(value: i8) -> Self {
        match value {
            1 => DieType::Exception,
            2 => DieType::Destroyed,
            _ => DieType::Unknown,
        }
    }
}

// ============================================================================
// Struct actions
// ============================================================================

/// A tile painted by a robot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaintAction {
    pub loc: u16,
    pub is_secondary: i8,
}

impl FlatStruct for PaintAction {
    const SIZE: usize = 4;
    const ALIGN: usize = 2;

    fn write_to(&self, dst: &mut [u8]) {
        dst[0..2].copy_from_slice(&self.loc.to_le_bytes());
        dst[2] = self.is_secondary as u8;
        dst[3] = 0;
    }

    fn read_from(src: &[u8]) -> Self {
        Self {
            loc: u16::from_le_bytes([src[0], src[1]]),
            is_secondary: src[2] as i8,
        }
    }
}

/// Target robot of an attack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackAction {
    pub id: u16,
}

impl FlatStruct for AttackAction {
    const SIZE: usize = 2;
    const ALIGN: usize = 2;

    fn write_to(&self, dst: &mut [u8]) {
        dst[0..2].copy_from_slice(&self.id.to_le_bytes());
    }

    fn read_from(src: &[u8]) -> Self {
        Self {
            id: u16::from_le_bytes([src[0], src[1]]),
        }
    }
}

/// A robot died and should be removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DieAction {
    pub id: u16,
    pub die_type: DieType,
}

impl FlatStruct for DieAction {
    const SIZE: usize = 4;
    const ALIGN: usize = 2;

    fn write_to(&self, dst: &mut [u8]) {
        dst[0..2].copy_from_slice(&self.id.to_le_bytes());
        dst[2] = self.die_type as i8 as u8;
        dst[3] = 0;
    }

    fn read_from(src: &[u8]) -> Self {
        Self {
            id: u16::from_le_bytes([src[0], src[1]]),
            die_type: DieType::from_i8(src[2] as i8),
        }
    }
}

/// A tower was upgraded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeAction {
    pub id: u16,
}

impl FlatStruct for UpgradeAction {
    const SIZE: usize = 2;
    const ALIGN: usize = 2;

    fn write_to(&self, dst: &mut [u8]) {
        dst[0..2].copy_from_slice(&self.id.to_le_bytes());
    }

    fn read_from(src: &[u8]) -> Self {
        Self {
            id: u16::from_le_bytes([src[0], src[1]]),
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// Payload of one recorded action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActionValue {
    Paint(PaintAction),
    Attack(AttackAction),
    Die(DieAction),
    Upgrade(UpgradeAction),
    IndicatorString { id: u16, value: String },
}

impl ActionValue {
    pub fn kind(&self) -> Action {
        match self {
            ActionValue::Paint(_) => Action::PaintAction,
            ActionValue::Attack(_) => Action::AttackAction,
            ActionValue::Die(_) => Action::DieAction,
            ActionValue::Upgrade(_) => Action::UpgradeAction,
            ActionValue::IndicatorString { .. } => Action::IndicatorStringAction,
        }
    }
}

/// An action performed by one robot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub robot_id: u16,
    pub action: Option<ActionValue>,
}

impl ActionRecord {
    /// Write the record (and its payload) into `builder`.
    pub fn write(&self, builder: &mut FlatBuilder) -> Result<Offset<TableOffset>, BuildError> {
        let payload = match &self.action {
            None => None,
            Some(action) => Some((action.kind(), write_payload(builder, action)?)),
        };

        builder.start_object(record::FIELD_COUNT)?;
        builder.push_slot(record::ROBOT_ID, self.robot_id, 0)?;
        if let Some((kind, value)) = payload {
            builder.push_slot_union(record::ACTION_TYPE, record::ACTION, kind.tag(), value)?;
        }
        builder.end_object()
    }

    /// Read a record from an `ActionRecord` table.
    pub fn read(table: &Table<'_>) -> ReadResult<Self> {
        let robot_id = table.get(record::ROBOT_ID, 0u16)?;
        let Some((tag, _)) = table.get_union(record::ACTION_TYPE, record::ACTION)? else {
            return Ok(Self { robot_id, action: None });
        };

        let unsupported = || ReadError::UnknownUnionTag {
            union: "Action".to_string(),
            tag,
        };
        let action = match Action::from_u8(tag).ok_or_else(unsupported)? {
            Action::PaintAction => ActionValue::Paint(read_struct(table)?),
            Action::AttackAction => ActionValue::Attack(read_struct(table)?),
            Action::DieAction => ActionValue::Die(read_struct(table)?),
            Action::UpgradeAction => ActionValue::Upgrade(read_struct(table)?),
            Action::IndicatorStringAction => {
                let Some((_, inner)) = table.get_union_table(record::ACTION_TYPE, record::ACTION)? else {
                    return Err(unsupported());
                };
                ActionValue::IndicatorString {
                    id: inner.get(indicator_string::ID, 0u16)?,
                    value: inner.get_str(indicator_string::VALUE)?.unwrap_or_default().to_string(),
                }
            }
            _ => return Err(unsupported()),
        };
        Ok(Self {
            robot_id,
            action: Some(action),
        })
    }
}

fn write_payload(builder: &mut FlatBuilder, action: &ActionValue) -> Result<Offset<()>, BuildError> {
    let offset = match action {
        ActionValue::Paint(value) => builder.create_struct(value)?.as_untyped(),
        ActionValue::Attack(value) => builder.create_struct(value)?.as_untyped(),
        ActionValue::Die(value) => builder.create_struct(value)?.as_untyped(),
        ActionValue::Upgrade(value) => builder.create_struct(value)?.as_untyped(),
        ActionValue::IndicatorString { id, value } => {
            let text = builder.create_string(value)?;
            builder.start_object(indicator_string::FIELD_COUNT)?;
            builder.push_slot(indicator_string::ID, *id, 0)?;
            builder.push_slot_offset(indicator_string::VALUE, text)?;
            builder.end_object()?.as_untyped()
        }
    };
    Ok(offset)
}

fn read_struct<S: FlatStruct>(table: &Table<'_>) -> ReadResult<S> {
    table
        .get_union_struct::<S>(record::ACTION_TYPE, record::ACTION)?
        .map(|(_, value)| value)
        .ok_or(ReadError::InvalidOffset {
            pos: table.pos(),
        })
}
