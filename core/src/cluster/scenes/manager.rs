use log::info;

use crate::{fabric::Fabric, EndpointId, GroupId, Result, SceneId};

use super::{SceneEntry, SceneTable, CLUSTER_ID};

/// Scene tables stored with the fabric, one per endpoint.
///
/// Every mutation writes the whole endpoint table back and flushes the
/// fabric's storage.
pub struct ScenesManager;

impl ScenesManager {
    fn key(endpoint: EndpointId) -> String {
        endpoint.to_string()
    }

    /// The endpoint's table, empty if nothing was stored yet.
    pub fn endpoint_scenes(fabric: &Fabric, endpoint: EndpointId) -> Result<SceneTable> {
        Ok(fabric
            .scoped_cluster_data(CLUSTER_ID, &Self::key(endpoint))?
            .unwrap_or_default())
    }

    pub fn set_endpoint_scenes(
        fabric: &mut Fabric,
        endpoint: EndpointId,
        table: &SceneTable,
    ) -> Result<()> {
        fabric.set_scoped_cluster_data(CLUSTER_ID, &Self::key(endpoint), table)?;
        fabric.persist()?;
        Ok(())
    }

    /// Inserts the entries, replacing those with the same key.
    pub fn set_scenes(
        fabric: &mut Fabric,
        endpoint: EndpointId,
        entries: impl IntoIterator<Item = SceneEntry>,
    ) -> Result<()> {
        let mut table = Self::endpoint_scenes(fabric, endpoint)?;
        for entry in entries {
            table.insert(entry);
        }
        Self::set_endpoint_scenes(fabric, endpoint, &table)
    }

    pub fn scene_entry(
        fabric: &Fabric,
        endpoint: EndpointId,
        group_id: GroupId,
        scene_id: SceneId,
    ) -> Result<Option<SceneEntry>> {
        Ok(Self::endpoint_scenes(fabric, endpoint)?
            .get(group_id, scene_id)
            .cloned())
    }

    pub fn group_scenes(
        fabric: &Fabric,
        endpoint: EndpointId,
        group_id: GroupId,
    ) -> Result<Vec<SceneEntry>> {
        Ok(Self::endpoint_scenes(fabric, endpoint)?
            .group(group_id)
            .cloned()
            .collect())
    }

    /// Returns whether the scene existed.
    pub fn remove_scene(
        fabric: &mut Fabric,
        endpoint: EndpointId,
        group_id: GroupId,
        scene_id: SceneId,
    ) -> Result<bool> {
        let mut table = Self::endpoint_scenes(fabric, endpoint)?;
        if table.remove(group_id, scene_id).is_none() {
            return Ok(false);
        }
        Self::set_endpoint_scenes(fabric, endpoint, &table)?;
        Ok(true)
    }

    pub fn remove_all_scenes_for_group(
        fabric: &mut Fabric,
        endpoint: EndpointId,
        group_id: GroupId,
    ) -> Result<()> {
        let mut table = Self::endpoint_scenes(fabric, endpoint)?;
        let removed = table.remove_group(group_id);
        if removed > 0 {
            info!("Removed {removed} scenes of group {group_id} on endpoint {endpoint}");
        }
        Self::set_endpoint_scenes(fabric, endpoint, &table)
    }

    /// Removes every scene bound to a group; global scenes stay.
    pub fn remove_all_non_global_scenes(fabric: &mut Fabric, endpoint: EndpointId) -> Result<()> {
        let mut table = Self::endpoint_scenes(fabric, endpoint)?;
        let removed = table.remove_non_global();
        if removed > 0 {
            info!("Removed {removed} group scenes on endpoint {endpoint}");
        }
        Self::set_endpoint_scenes(fabric, endpoint, &table)
    }

    pub fn scene_count(fabric: &Fabric, endpoint: EndpointId) -> Result<usize> {
        Ok(Self::endpoint_scenes(fabric, endpoint)?.len())
    }
}
