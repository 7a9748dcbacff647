use num::FromPrimitive;

use crate::{
    data_model::handler::{ClusterTable, InvokeContext, InvokeResponse, ReadContext},
    tlv::{TlvElement, ToTlv},
    AttributeId, ClusterId, CommandId, Error, Result,
};

use self::scenes::AttributeValuePair;

pub mod groups;
pub mod level;
pub mod on_off;
pub mod pressure_measurement;
pub mod scenes;

/// Scene table extension of a cluster (Application Cluster 1.4.2.2).
///
/// Clusters with scene-eligible attributes report their current values on
/// store, take them back on recall, and compare them when the scene's
/// validity is read. Clusters without such attributes keep the defaults.
pub trait SceneExtension {
    fn extract_scene_fields(&self) -> Vec<AttributeValuePair> {
        Vec::new()
    }

    fn apply_scene_fields(&mut self, _values: &[AttributeValuePair], _transition_time: f32) {}

    fn verify_scene_fields(&self, _values: &[AttributeValuePair]) -> bool {
        true
    }
}

/// A cluster instance hosted on an endpoint.
pub trait ClusterServer: SceneExtension {
    fn id(&self) -> ClusterId;
    fn name(&self) -> &'static str;
    fn read_attribute(&self, attribute: AttributeId, ctx: &ReadContext<'_>) -> Result<TlvElement>;
    fn invoke(
        &mut self,
        command: CommandId,
        args: &TlvElement,
        ctx: &mut InvokeContext<'_>,
    ) -> Result<InvokeResponse>;
    fn attribute_list(&self) -> Vec<AttributeId>;
    fn accepted_commands(&self) -> Vec<CommandId>;
    fn generated_commands(&self) -> Vec<CommandId>;
}

/// Static description of a cluster type. Implementing it (plus
/// [`SceneExtension`]) makes the type a [`ClusterServer`].
pub trait ClusterDefinition: Sized + 'static {
    const ID: ClusterId;
    const NAME: &'static str;
    const REVISION: u16;

    fn table() -> &'static ClusterTable<Self>;

    fn feature_map(&self) -> u32 {
        0
    }

    /// Whether an attribute in the table is enabled on this instance, e.g.
    /// when it depends on a feature.
    fn supports_attribute(&self, _attribute: AttributeId) -> bool {
        true
    }
}

impl<C> ClusterServer for C
where
    C: ClusterDefinition + SceneExtension,
{
    fn id(&self) -> ClusterId {
        C::ID
    }

    fn name(&self) -> &'static str {
        C::NAME
    }

    fn read_attribute(&self, attribute: AttributeId, ctx: &ReadContext<'_>) -> Result<TlvElement> {
        if let Some(global) = GlobalAttributes::from_u32(attribute) {
            return Ok(match global {
                GlobalAttributes::ClusterRevision => C::REVISION.to_tlv(),
                GlobalAttributes::FeatureMap => self.feature_map().to_tlv(),
                GlobalAttributes::AttributeList => self.attribute_list().to_tlv(),
                GlobalAttributes::EventList => TlvElement::Array(Vec::new()),
                GlobalAttributes::AcceptedCommandList => self.accepted_commands().to_tlv(),
                GlobalAttributes::GeneratedCommandList => self.generated_commands().to_tlv(),
            });
        }
        match C::table().find_attribute(attribute) {
            Some(server) if self.supports_attribute(attribute) => server.get(self, ctx),
            _ => Err(Error::UnsupportedAttribute {
                cluster: C::ID,
                attribute,
            }),
        }
    }

    fn invoke(
        &mut self,
        command: CommandId,
        args: &TlvElement,
        ctx: &mut InvokeContext<'_>,
    ) -> Result<InvokeResponse> {
        C::table()
            .find_command(C::ID, command)?
            .invoke(self, args, ctx)
    }

    fn attribute_list(&self) -> Vec<AttributeId> {
        let mut attributes: Vec<AttributeId> = C::table()
            .attribute_ids()
            .filter(|id| self.supports_attribute(*id))
            .collect();
        attributes.extend(GlobalAttributes::ALL.iter().map(|global| *global as AttributeId));
        attributes
    }

    fn accepted_commands(&self) -> Vec<CommandId> {
        C::table().accepted_commands()
    }

    fn generated_commands(&self) -> Vec<CommandId> {
        C::table().generated_commands()
    }
}

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum GlobalAttributes {
    ClusterRevision = 0xFFFD,
    FeatureMap = 0xFFFC,
    AttributeList = 0xFFFB,
    EventList = 0xFFFA,
    AcceptedCommandList = 0xFFF9,
    GeneratedCommandList = 0xFFF8,
}

impl GlobalAttributes {
    pub const ALL: [GlobalAttributes; 6] = [
        GlobalAttributes::GeneratedCommandList,
        GlobalAttributes::AcceptedCommandList,
        GlobalAttributes::EventList,
        GlobalAttributes::AttributeList,
        GlobalAttributes::FeatureMap,
        GlobalAttributes::ClusterRevision,
    ];
}
