use crate::{
    cluster::{
        groups::GroupsCluster, level::LevelControlCluster, on_off::OnOffCluster,
        scenes::ScenesCluster,
    },
    data_model::{device::Endpoint, device_type::DEVICE_TYPE_DIMMABLE_LIGHT},
    EndpointId,
};

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 254;

/// A dimmable light with groups and scenes.
pub fn endpoint(endpoint_id: EndpointId) -> Endpoint {
    Endpoint::new(endpoint_id, DEVICE_TYPE_DIMMABLE_LIGHT)
        .with_cluster(GroupsCluster::new())
        .with_cluster(ScenesCluster::new())
        .with_cluster(OnOffCluster::new())
        .with_cluster(LevelControlCluster::new(MIN_LEVEL, MAX_LEVEL))
}
