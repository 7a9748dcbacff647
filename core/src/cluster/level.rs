use bitflags::bitflags;
use once_cell::sync::Lazy;

use crate::{
    cluster::{scenes::AttributeValuePair, ClusterDefinition, SceneExtension},
    data_model::handler::{AttributeServer, ClusterTable, CommandServer, InvokeContext, ReadContext},
    tlv::{DecodeError, FromTlv, StructReader, TlvElement, ToTlv},
    ClusterId, Result,
};

pub const CLUSTER_ID: ClusterId = 0x0008;

#[repr(u16)]
#[derive(FromPrimitive)]
pub enum Attributes {
    CurrentLevel = 0x0000,
    RemainingTime = 0x0001,
    MinLevel = 0x0002,
    MaxLevel = 0x0003,
}

#[repr(u8)]
pub enum Commands {
    MoveToLevel = 0x00,
    Stop = 0x03,
}

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct Feature: u32 {
        const ON_OFF = 0b00000001;
        const LIGHTING = 0b00000010;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MoveToLevelRequest {
    pub level: u8,
    /// Tenths of a second, null to move as fast as possible.
    pub transition_time: Option<u16>,
    pub options_mask: u8,
    pub options_override: u8,
}

impl FromTlv for MoveToLevelRequest {
    fn from_tlv(element: &TlvElement) -> std::result::Result<Self, DecodeError> {
        let reader = StructReader::new(element)?;
        Ok(Self {
            level: reader.field(0)?,
            transition_time: reader.optional(1)?,
            options_mask: reader.optional(2)?.unwrap_or(0),
            options_override: reader.optional(3)?.unwrap_or(0),
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StopRequest {
    pub options_mask: u8,
    pub options_override: u8,
}

impl FromTlv for StopRequest {
    fn from_tlv(element: &TlvElement) -> std::result::Result<Self, DecodeError> {
        let reader = StructReader::new(element)?;
        Ok(Self {
            options_mask: reader.optional(0)?.unwrap_or(0),
            options_override: reader.optional(1)?.unwrap_or(0),
        })
    }
}

/// Level Control (Application Cluster 1.6). Transitions are not animated;
/// the target level is applied at once and RemainingTime reports the
/// requested duration.
pub struct LevelControlCluster {
    current_level: u8,
    remaining_time: u16,
    min_level: u8,
    max_level: u8,
}

impl LevelControlCluster {
    pub fn new(min_level: u8, max_level: u8) -> Self {
        let (min_level, max_level) = (min_level.min(max_level), min_level.max(max_level));
        Self {
            current_level: min_level,
            remaining_time: 0,
            min_level,
            max_level,
        }
    }

    pub fn current_level(&self) -> u8 {
        self.current_level
    }

    pub fn remaining_time(&self) -> u16 {
        self.remaining_time
    }

    /// Levels outside [MinLevel, MaxLevel] are clamped.
    pub fn set_level(&mut self, level: u8, transition_time: u16) {
        self.current_level = level.clamp(self.min_level, self.max_level);
        self.remaining_time = transition_time;
    }

    fn move_to_level(
        &mut self,
        request: MoveToLevelRequest,
        _ctx: &mut InvokeContext<'_>,
    ) -> Result<()> {
        self.set_level(request.level, request.transition_time.unwrap_or(0));
        Ok(())
    }

    fn stop(&mut self, _request: StopRequest, _ctx: &mut InvokeContext<'_>) -> Result<()> {
        self.remaining_time = 0;
        Ok(())
    }

    fn get_current_level(&self, _ctx: &ReadContext<'_>) -> Result<TlvElement> {
        Ok(self.current_level.to_tlv())
    }

    fn get_remaining_time(&self, _ctx: &ReadContext<'_>) -> Result<TlvElement> {
        Ok(self.remaining_time.to_tlv())
    }

    fn get_min_level(&self, _ctx: &ReadContext<'_>) -> Result<TlvElement> {
        Ok(self.min_level.to_tlv())
    }

    fn get_max_level(&self, _ctx: &ReadContext<'_>) -> Result<TlvElement> {
        Ok(self.max_level.to_tlv())
    }
}

static TABLE: Lazy<ClusterTable<LevelControlCluster>> = Lazy::new(|| {
    ClusterTable::new()
        .attribute(AttributeServer::new(
            Attributes::CurrentLevel as _,
            "CurrentLevel",
            LevelControlCluster::get_current_level,
        ))
        .attribute(AttributeServer::new(
            Attributes::RemainingTime as _,
            "RemainingTime",
            LevelControlCluster::get_remaining_time,
        ))
        .attribute(AttributeServer::new(
            Attributes::MinLevel as _,
            "MinLevel",
            LevelControlCluster::get_min_level,
        ))
        .attribute(AttributeServer::new(
            Attributes::MaxLevel as _,
            "MaxLevel",
            LevelControlCluster::get_max_level,
        ))
        .command(
            CommandServer::new(
                Commands::MoveToLevel as _,
                Commands::MoveToLevel as _,
                "MoveToLevel",
                LevelControlCluster::move_to_level,
            )
            .without_response(),
        )
        .command(
            CommandServer::new(
                Commands::Stop as _,
                Commands::Stop as _,
                "Stop",
                LevelControlCluster::stop,
            )
            .without_response(),
        )
});

impl ClusterDefinition for LevelControlCluster {
    const ID: ClusterId = CLUSTER_ID;
    const NAME: &'static str = "LevelControl";
    const REVISION: u16 = 5;

    fn table() -> &'static ClusterTable<Self> {
        &TABLE
    }

    fn feature_map(&self) -> u32 {
        (Feature::ON_OFF | Feature::LIGHTING).bits()
    }
}

/// Scene table extension: CurrentLevel.
impl SceneExtension for LevelControlCluster {
    fn extract_scene_fields(&self) -> Vec<AttributeValuePair> {
        vec![AttributeValuePair::new(
            Attributes::CurrentLevel as _,
            self.current_level.to_tlv(),
        )]
    }

    fn apply_scene_fields(&mut self, values: &[AttributeValuePair], transition_time: f32) {
        if let Some(Ok(level)) =
            AttributeValuePair::find(values, Attributes::CurrentLevel as _).map(u8::from_tlv)
        {
            // Seconds to tenths, saturating
            let tenths = (transition_time * 10.0).round() as u16;
            self.set_level(level, tenths);
        }
    }

    fn verify_scene_fields(&self, values: &[AttributeValuePair]) -> bool {
        AttributeValuePair::find(values, Attributes::CurrentLevel as _)
            .map_or(true, |value| *value == self.current_level.to_tlv())
    }
}
