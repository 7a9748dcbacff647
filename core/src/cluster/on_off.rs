use bitflags::bitflags;
use once_cell::sync::Lazy;

use crate::{
    cluster::{scenes::AttributeValuePair, ClusterDefinition, SceneExtension},
    data_model::handler::{AttributeServer, ClusterTable, CommandServer, InvokeContext, ReadContext},
    tlv::{FromTlv, TlvElement, ToTlv},
    ClusterId, Result,
};

pub const CLUSTER_ID: ClusterId = 0x0006;

#[repr(u16)]
#[derive(FromPrimitive)]
pub enum Attributes {
    OnOff = 0x0000,
    GlobalSceneControl = 0x4000,
    OnTime = 0x4001,
    OffWaitTime = 0x4002,
    StartUpOnOff = 0x4003,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartUpOnOff {
    Off = 0,
    On = 1,
    Toggle = 2,
}

#[repr(u8)]
pub enum Commands {
    Off = 0x00,
    On = 0x01,
    Toggle = 0x02,
}

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct Feature: u32 {
        const LIGHTING = 0b00000001;
    }
}

pub struct OnOffCluster {
    on: bool,
    global_scene_control: bool,
    on_time: u16,
    off_wait_time: u16,
    startup_on_off: Option<StartUpOnOff>,
}

impl Default for OnOffCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl OnOffCluster {
    pub fn new() -> Self {
        Self {
            on: false,
            global_scene_control: true,
            on_time: 0,
            off_wait_time: 0,
            startup_on_off: None,
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn set_on(&mut self, on: bool) {
        if on {
            self.global_scene_control = true;
        } else {
            self.on_time = 0;
        }
        self.on = on;
    }

    fn cmd_off(&mut self, _request: (), _ctx: &mut InvokeContext<'_>) -> Result<()> {
        self.set_on(false);
        Ok(())
    }

    fn cmd_on(&mut self, _request: (), _ctx: &mut InvokeContext<'_>) -> Result<()> {
        self.set_on(true);
        Ok(())
    }

    fn cmd_toggle(&mut self, _request: (), _ctx: &mut InvokeContext<'_>) -> Result<()> {
        self.set_on(!self.on);
        Ok(())
    }

    fn get_on_off(&self, _ctx: &ReadContext<'_>) -> Result<TlvElement> {
        Ok(self.on.to_tlv())
    }

    fn get_global_scene_control(&self, _ctx: &ReadContext<'_>) -> Result<TlvElement> {
        Ok(self.global_scene_control.to_tlv())
    }

    fn get_on_time(&self, _ctx: &ReadContext<'_>) -> Result<TlvElement> {
        Ok(self.on_time.to_tlv())
    }

    fn get_off_wait_time(&self, _ctx: &ReadContext<'_>) -> Result<TlvElement> {
        Ok(self.off_wait_time.to_tlv())
    }

    fn get_startup_on_off(&self, _ctx: &ReadContext<'_>) -> Result<TlvElement> {
        Ok(self.startup_on_off.map(|value| value as u8).to_tlv())
    }
}

static TABLE: Lazy<ClusterTable<OnOffCluster>> = Lazy::new(|| {
    ClusterTable::new()
        .attribute(AttributeServer::new(
            Attributes::OnOff as _,
            "OnOff",
            OnOffCluster::get_on_off,
        ))
        .attribute(AttributeServer::new(
            Attributes::GlobalSceneControl as _,
            "GlobalSceneControl",
            OnOffCluster::get_global_scene_control,
        ))
        .attribute(AttributeServer::new(
            Attributes::OnTime as _,
            "OnTime",
            OnOffCluster::get_on_time,
        ))
        .attribute(AttributeServer::new(
            Attributes::OffWaitTime as _,
            "OffWaitTime",
            OnOffCluster::get_off_wait_time,
        ))
        .attribute(AttributeServer::new(
            Attributes::StartUpOnOff as _,
            "StartUpOnOff",
            OnOffCluster::get_startup_on_off,
        ))
        .command(
            CommandServer::new(Commands::Off as _, Commands::Off as _, "Off", OnOffCluster::cmd_off)
                .without_response(),
        )
        .command(
            CommandServer::new(Commands::On as _, Commands::On as _, "On", OnOffCluster::cmd_on)
                .without_response(),
        )
        .command(
            CommandServer::new(
                Commands::Toggle as _,
                Commands::Toggle as _,
                "Toggle",
                OnOffCluster::cmd_toggle,
            )
            .without_response(),
        )
});

impl ClusterDefinition for OnOffCluster {
    const ID: ClusterId = CLUSTER_ID;
    const NAME: &'static str = "OnOff";
    const REVISION: u16 = 4;

    fn table() -> &'static ClusterTable<Self> {
        &TABLE
    }

    fn feature_map(&self) -> u32 {
        Feature::LIGHTING.bits()
    }
}

/// Scene table extension: OnOff.
impl SceneExtension for OnOffCluster {
    fn extract_scene_fields(&self) -> Vec<AttributeValuePair> {
        vec![AttributeValuePair::new(
            Attributes::OnOff as _,
            self.on.to_tlv(),
        )]
    }

    fn apply_scene_fields(&mut self, values: &[AttributeValuePair], _transition_time: f32) {
        if let Some(Ok(on)) = AttributeValuePair::find(values, Attributes::OnOff as _).map(bool::from_tlv) {
            self.set_on(on);
        }
    }

    fn verify_scene_fields(&self, values: &[AttributeValuePair]) -> bool {
        AttributeValuePair::find(values, Attributes::OnOff as _)
            .map_or(true, |value| *value == self.on.to_tlv())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_fields() {
        let mut cluster = OnOffCluster::new();
        cluster.set_on(true);
        let fields = cluster.extract_scene_fields();
        assert_eq!(fields, vec![AttributeValuePair::new(0x0000, TlvElement::Boolean(true))]);
        assert!(cluster.verify_scene_fields(&fields));

        cluster.set_on(false);
        assert!(!cluster.verify_scene_fields(&fields));

        cluster.apply_scene_fields(&fields, 1.5);
        assert!(cluster.is_on());
        assert!(cluster.verify_scene_fields(&fields));

        // Values of unknown attributes and of the wrong type are ignored
        let foreign = vec![
            AttributeValuePair::new(0x1234, TlvElement::Boolean(false)),
            AttributeValuePair::new(0x0000, TlvElement::Unsigned(0)),
        ];
        cluster.apply_scene_fields(&foreign, 0.0);
        assert!(cluster.is_on());
    }
}
