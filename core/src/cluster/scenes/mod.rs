//! Scenes cluster (Application Cluster 1.4)
//!
//! Scenes are snapshots of the scene-capable attributes of every cluster on
//! an endpoint, stored per fabric and keyed by (group, scene). Store pulls the
//! snapshot out of the sibling clusters through [`SceneExtension`], recall
//! pushes it back.
//!
//! Commands that answer with a structured response report validation failures
//! in its status field. Recall has no response, so its failures abort the
//! invocation with the status attached.

use log::debug;
use once_cell::sync::Lazy;

use crate::{
    cluster::{groups::GroupsManager, ClusterDefinition, SceneExtension},
    constants::{
        GLOBAL_SCENE_GROUP, MAX_GROUP_ID, MAX_NAME_LENGTH, MIN_GROUP_ID, MIN_SCENE_ID,
        SCENE_TABLE_CAPACITY,
    },
    data_model::handler::{
        AttributeServer, ClusterTable, CommandServer, ReadContext, SecureInvokeContext,
    },
    fabric::Fabric,
    interaction_model::StatusCode,
    tlv::{TlvElement, ToTlv},
    ClusterId, EndpointId, Error, GroupId, NodeId, Result, SceneId,
};

mod manager;
mod types;

pub use manager::ScenesManager;
pub use types::*;

pub const CLUSTER_ID: ClusterId = 0x0005;

#[repr(u16)]
#[derive(FromPrimitive)]
pub enum Attributes {
    SceneCount = 0x0000,
    CurrentScene = 0x0001,
    CurrentGroup = 0x0002,
    SceneValid = 0x0003,
    NameSupport = 0x0004,
    LastConfiguredBy = 0x0005,
}

/// Requests and their responses share ids.
#[repr(u8)]
pub enum Commands {
    AddScene = 0x00,
    ViewScene = 0x01,
    RemoveScene = 0x02,
    RemoveAllScenes = 0x03,
    StoreScene = 0x04,
    RecallScene = 0x05,
    GetSceneMembership = 0x06,
    EnhancedAddScene = 0x40,
    EnhancedViewScene = 0x41,
    CopyScene = 0x42,
}

/// Capacity reported by GetSceneMembership for a group holding `count`
/// scenes. Never negative.
pub fn membership_capacity(count: usize) -> u8 {
    // At most SCENE_TABLE_CAPACITY (0xFE)
    SCENE_TABLE_CAPACITY.saturating_sub(count) as u8
}

/// Separates status rejections from failures that abort the invocation.
fn split_status<T>(result: Result<T>) -> Result<std::result::Result<T, StatusCode>> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(Error::Status { code, .. }) => Ok(Err(code)),
        Err(e) => Err(e),
    }
}

fn status_of(result: Result<()>) -> Result<StatusCode> {
    Ok(split_status(result)?.err().unwrap_or(StatusCode::Success))
}

fn not_found(group_id: GroupId, scene_id: SceneId) -> Error {
    Error::status(
        StatusCode::NotFound,
        format!("scene {scene_id} does not exist for group {group_id}"),
    )
}

/// A scene may only reference a group the endpoint is a member of. The
/// global scene group always exists.
fn require_group(fabric: &Fabric, endpoint: EndpointId, group_id: GroupId) -> Result<()> {
    if group_id != GLOBAL_SCENE_GROUP && !GroupsManager::has_group(fabric, endpoint, group_id)? {
        return Err(Error::status(
            StatusCode::InvalidCommand,
            format!("group {group_id} does not exist on endpoint {endpoint}"),
        ));
    }
    Ok(())
}

fn check_key(group_id: GroupId, scene_id: SceneId, allow_global: bool) -> Result<()> {
    let group_valid = (allow_global && group_id == GLOBAL_SCENE_GROUP)
        || (MIN_GROUP_ID..=MAX_GROUP_ID).contains(&group_id);
    if !group_valid || scene_id < MIN_SCENE_ID {
        return Err(Error::status(
            StatusCode::ConstraintError,
            format!("scene {scene_id} of group {group_id} is out of range"),
        ));
    }
    Ok(())
}

fn check_name(name: &str) -> Result<()> {
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(Error::status(
            StatusCode::ConstraintError,
            format!("scene name is longer than {MAX_NAME_LENGTH} characters"),
        ));
    }
    Ok(())
}

fn check_capacity(table: &SceneTable, group_id: GroupId, new_entries: usize) -> Result<()> {
    if table.group_len(group_id) + new_entries > SCENE_TABLE_CAPACITY {
        return Err(Error::status(
            StatusCode::ResourceExhausted,
            format!("no scene slots left in group {group_id}"),
        ));
    }
    Ok(())
}

pub struct ScenesCluster {
    current_scene: SceneId,
    current_group: GroupId,
    name_support: NameSupport,
    last_configured_by: Option<NodeId>,
}

impl Default for ScenesCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenesCluster {
    pub fn new() -> Self {
        Self {
            current_scene: 0,
            current_group: GLOBAL_SCENE_GROUP,
            name_support: NameSupport::SCENE_NAMES,
            last_configured_by: None,
        }
    }

    /// Without name support, names given to add commands are dropped.
    pub fn with_name_support(mut self, supported: bool) -> Self {
        self.name_support.set(NameSupport::SCENE_NAMES, supported);
        self
    }

    pub fn current_scene(&self) -> SceneId {
        self.current_scene
    }

    pub fn current_group(&self) -> GroupId {
        self.current_group
    }

    pub fn last_configured_by(&self) -> Option<NodeId> {
        self.last_configured_by
    }

    /// Whether the live attribute values on the endpoint still match the
    /// current scene. Clusters no longer on the endpoint are not consulted.
    pub fn is_scene_valid(&self, ctx: &ReadContext<'_>) -> Result<bool> {
        let Some(fabric) = ctx.accessing_fabric() else {
            debug!("SceneValid read without an accessing fabric");
            return Ok(false);
        };
        let endpoint = ctx.endpoint.id;
        let Some(entry) =
            ScenesManager::scene_entry(fabric, endpoint, self.current_group, self.current_scene)?
        else {
            debug!(
                "No scene {} in group {} on endpoint {}",
                self.current_scene, self.current_group, endpoint
            );
            return Ok(false);
        };
        Ok(entry.extension_field_sets.iter().all(|field_set| {
            ctx.endpoint
                .cluster(field_set.cluster_id)
                .map_or(true, |cluster| {
                    cluster.verify_scene_fields(&field_set.attribute_value_list)
                })
        }))
    }

    fn stored_name(&self, name: String) -> String {
        if self.name_support.contains(NameSupport::SCENE_NAMES) {
            name
        } else {
            String::new()
        }
    }

    fn insert_scene(
        &mut self,
        request: AddSceneRequest,
        transition_time: TransitionTime,
        ctx: &mut SecureInvokeContext<'_>,
    ) -> Result<()> {
        let endpoint = ctx.endpoint.id();
        let (group_id, scene_id) = (request.group_id, request.scene_id);
        require_group(ctx.fabric, endpoint, group_id)?;
        check_key(group_id, scene_id, false)?;
        check_name(&request.scene_name)?;

        let mut table = ScenesManager::endpoint_scenes(ctx.fabric, endpoint)?;
        if !table.contains(group_id, scene_id) {
            check_capacity(&table, group_id, 1)?;
        }
        table.insert(SceneEntry {
            group_id,
            scene_id,
            name: self.stored_name(request.scene_name),
            transition_time,
            extension_field_sets: request.extension_field_sets,
        });
        ScenesManager::set_endpoint_scenes(ctx.fabric, endpoint, &table)?;
        self.last_configured_by = Some(ctx.session.peer_node_id);
        Ok(())
    }

    fn find_scene(
        ctx: &mut SecureInvokeContext<'_>,
        group_id: GroupId,
        scene_id: SceneId,
    ) -> Result<SceneEntry> {
        let endpoint = ctx.endpoint.id();
        require_group(ctx.fabric, endpoint, group_id)?;
        ScenesManager::scene_entry(ctx.fabric, endpoint, group_id, scene_id)?
            .ok_or_else(|| not_found(group_id, scene_id))
    }

    fn view(
        request: SceneRequest,
        ctx: &mut SecureInvokeContext<'_>,
        enhanced: bool,
    ) -> Result<ViewSceneResponse> {
        let SceneRequest { group_id, scene_id } = request;
        let entry = match split_status(Self::find_scene(ctx, group_id, scene_id))? {
            Ok(entry) => entry,
            Err(status) => return Ok(ViewSceneResponse::failed(status, group_id, scene_id)),
        };
        let transition_time = if enhanced {
            entry.transition_time.as_deciseconds()
        } else {
            entry.transition_time.seconds
        };
        Ok(ViewSceneResponse {
            status: StatusCode::Success,
            group_id,
            scene_id,
            transition_time: Some(transition_time),
            scene_name: Some(entry.name),
            extension_field_sets: Some(entry.extension_field_sets),
        })
    }

    fn remove(ctx: &mut SecureInvokeContext<'_>, group_id: GroupId, scene_id: SceneId) -> Result<()> {
        let endpoint = ctx.endpoint.id();
        require_group(ctx.fabric, endpoint, group_id)?;
        if !ScenesManager::remove_scene(ctx.fabric, endpoint, group_id, scene_id)? {
            return Err(not_found(group_id, scene_id));
        }
        Ok(())
    }

    fn remove_all(ctx: &mut SecureInvokeContext<'_>, group_id: GroupId) -> Result<()> {
        let endpoint = ctx.endpoint.id();
        require_group(ctx.fabric, endpoint, group_id)?;
        ScenesManager::remove_all_scenes_for_group(ctx.fabric, endpoint, group_id)
    }

    /// Name and transition time of an existing scene survive a re-store; the
    /// field sets are replaced.
    fn store(
        &mut self,
        ctx: &mut SecureInvokeContext<'_>,
        group_id: GroupId,
        scene_id: SceneId,
    ) -> Result<()> {
        let endpoint = ctx.endpoint.id();
        require_group(ctx.fabric, endpoint, group_id)?;
        check_key(group_id, scene_id, true)?;

        let extension_field_sets = ctx
            .endpoint
            .clusters()
            .filter_map(|cluster| {
                let attribute_value_list = cluster.extract_scene_fields();
                (!attribute_value_list.is_empty()).then(|| ExtensionFieldSet {
                    cluster_id: cluster.id(),
                    attribute_value_list,
                })
            })
            .collect();

        let mut table = ScenesManager::endpoint_scenes(ctx.fabric, endpoint)?;
        let (name, transition_time) = match table.get(group_id, scene_id) {
            Some(existing) => (existing.name.clone(), existing.transition_time),
            None => {
                check_capacity(&table, group_id, 1)?;
                (String::new(), TransitionTime::default())
            }
        };
        table.insert(SceneEntry {
            group_id,
            scene_id,
            name,
            transition_time,
            extension_field_sets,
        });
        ScenesManager::set_endpoint_scenes(ctx.fabric, endpoint, &table)?;

        self.current_scene = scene_id;
        self.current_group = group_id;
        self.last_configured_by = Some(ctx.session.peer_node_id);
        Ok(())
    }

    fn copy(ctx: &mut SecureInvokeContext<'_>, request: CopySceneRequest) -> Result<()> {
        let endpoint = ctx.endpoint.id();
        let (group_from, group_to) = (request.group_id_from, request.group_id_to);
        require_group(ctx.fabric, endpoint, group_from)?;
        require_group(ctx.fabric, endpoint, group_to)?;

        let mut table = ScenesManager::endpoint_scenes(ctx.fabric, endpoint)?;
        let copies: Vec<SceneEntry> = if request.mode.contains(CopyMode::COPY_ALL_SCENES) {
            // Scene ids are kept, the requested ones are ignored
            check_key(group_to, MIN_SCENE_ID, true)?;
            table
                .group(group_from)
                .map(|entry| SceneEntry {
                    group_id: group_to,
                    ..entry.clone()
                })
                .collect()
        } else {
            check_key(group_to, request.scene_id_to, true)?;
            let source = table
                .get(group_from, request.scene_id_from)
                .ok_or_else(|| not_found(group_from, request.scene_id_from))?;
            vec![SceneEntry {
                group_id: group_to,
                scene_id: request.scene_id_to,
                ..source.clone()
            }]
        };

        let new_entries = copies
            .iter()
            .filter(|entry| !table.contains(entry.group_id, entry.scene_id))
            .count();
        check_capacity(&table, group_to, new_entries)?;
        for entry in copies {
            table.insert(entry);
        }
        ScenesManager::set_endpoint_scenes(ctx.fabric, endpoint, &table)
    }

    fn add_scene(
        &mut self,
        request: AddSceneRequest,
        ctx: &mut SecureInvokeContext<'_>,
    ) -> Result<SceneStatusResponse> {
        let (group_id, scene_id) = (request.group_id, request.scene_id);
        let transition_time = TransitionTime::from_seconds(request.transition_time);
        let status = status_of(self.insert_scene(request, transition_time, ctx))?;
        Ok(SceneStatusResponse {
            status,
            group_id,
            scene_id,
        })
    }

    /// The transition time is given in tenths of a second.
    fn enhanced_add_scene(
        &mut self,
        request: AddSceneRequest,
        ctx: &mut SecureInvokeContext<'_>,
    ) -> Result<SceneStatusResponse> {
        let (group_id, scene_id) = (request.group_id, request.scene_id);
        let transition_time = TransitionTime::from_deciseconds(request.transition_time);
        let status = status_of(self.insert_scene(request, transition_time, ctx))?;
        Ok(SceneStatusResponse {
            status,
            group_id,
            scene_id,
        })
    }

    fn view_scene(
        &mut self,
        request: SceneRequest,
        ctx: &mut SecureInvokeContext<'_>,
    ) -> Result<ViewSceneResponse> {
        Self::view(request, ctx, false)
    }

    fn enhanced_view_scene(
        &mut self,
        request: SceneRequest,
        ctx: &mut SecureInvokeContext<'_>,
    ) -> Result<ViewSceneResponse> {
        Self::view(request, ctx, true)
    }

    fn remove_scene(
        &mut self,
        request: SceneRequest,
        ctx: &mut SecureInvokeContext<'_>,
    ) -> Result<SceneStatusResponse> {
        let SceneRequest { group_id, scene_id } = request;
        Ok(SceneStatusResponse {
            status: status_of(Self::remove(ctx, group_id, scene_id))?,
            group_id,
            scene_id,
        })
    }

    fn remove_all_scenes(
        &mut self,
        request: GroupScenesRequest,
        ctx: &mut SecureInvokeContext<'_>,
    ) -> Result<RemoveAllScenesResponse> {
        let group_id = request.group_id;
        Ok(RemoveAllScenesResponse {
            status: status_of(Self::remove_all(ctx, group_id))?,
            group_id,
        })
    }

    fn store_scene(
        &mut self,
        request: SceneRequest,
        ctx: &mut SecureInvokeContext<'_>,
    ) -> Result<SceneStatusResponse> {
        let SceneRequest { group_id, scene_id } = request;
        Ok(SceneStatusResponse {
            status: status_of(self.store(ctx, group_id, scene_id))?,
            group_id,
            scene_id,
        })
    }

    /// Field sets of clusters no longer on the endpoint are skipped. An
    /// override transition time is taken as is.
    fn recall_scene(
        &mut self,
        request: RecallSceneRequest,
        ctx: &mut SecureInvokeContext<'_>,
    ) -> Result<()> {
        let RecallSceneRequest {
            group_id, scene_id, ..
        } = request;
        let entry = Self::find_scene(ctx, group_id, scene_id)?;
        let endpoint = ctx.endpoint.id();
        let transition_time = request
            .transition_time
            .map(f32::from)
            .unwrap_or_else(|| entry.transition_time.as_secs_f32());

        for field_set in &entry.extension_field_sets {
            match ctx.endpoint.cluster_mut(field_set.cluster_id) {
                Some(cluster) => {
                    cluster.apply_scene_fields(&field_set.attribute_value_list, transition_time)
                }
                None => debug!(
                    "Recall of scene {} skips cluster 0x{:04x} missing on endpoint {}",
                    scene_id, field_set.cluster_id, endpoint
                ),
            }
        }

        self.current_scene = scene_id;
        self.current_group = group_id;
        Ok(())
    }

    /// Capacity is reported even when the group is rejected.
    fn get_scene_membership(
        &mut self,
        request: GroupScenesRequest,
        ctx: &mut SecureInvokeContext<'_>,
    ) -> Result<GetSceneMembershipResponse> {
        let group_id = request.group_id;
        let endpoint = ctx.endpoint.id();
        let scenes = ScenesManager::group_scenes(ctx.fabric, endpoint, group_id)?;
        let capacity = Some(membership_capacity(scenes.len()));

        Ok(match split_status(require_group(ctx.fabric, endpoint, group_id))? {
            Ok(()) => GetSceneMembershipResponse {
                status: StatusCode::Success,
                capacity,
                group_id,
                scene_list: Some(scenes.iter().map(|entry| entry.scene_id).collect()),
            },
            Err(status) => GetSceneMembershipResponse {
                status,
                capacity,
                group_id,
                scene_list: None,
            },
        })
    }

    fn copy_scene(
        &mut self,
        request: CopySceneRequest,
        ctx: &mut SecureInvokeContext<'_>,
    ) -> Result<CopySceneResponse> {
        Ok(CopySceneResponse {
            status: status_of(Self::copy(ctx, request))?,
            group_id_from: request.group_id_from,
            scene_id_from: request.scene_id_from,
        })
    }

    /// Fails when read outside a fabric.
    fn get_scene_count(&self, ctx: &ReadContext<'_>) -> Result<TlvElement> {
        let fabric = ctx.accessing_fabric().ok_or(Error::NoAccessingFabric)?;
        let count = ScenesManager::scene_count(fabric, ctx.endpoint.id)?;
        Ok(u8::try_from(count).unwrap_or(u8::MAX).to_tlv())
    }

    fn get_current_scene(&self, _ctx: &ReadContext<'_>) -> Result<TlvElement> {
        Ok(self.current_scene.to_tlv())
    }

    fn get_current_group(&self, _ctx: &ReadContext<'_>) -> Result<TlvElement> {
        Ok(self.current_group.to_tlv())
    }

    fn get_scene_valid(&self, ctx: &ReadContext<'_>) -> Result<TlvElement> {
        Ok(self.is_scene_valid(ctx)?.to_tlv())
    }

    fn get_name_support(&self, _ctx: &ReadContext<'_>) -> Result<TlvElement> {
        Ok(self.name_support.to_tlv())
    }

    fn get_last_configured_by(&self, _ctx: &ReadContext<'_>) -> Result<TlvElement> {
        Ok(self.last_configured_by.to_tlv())
    }
}

static TABLE: Lazy<ClusterTable<ScenesCluster>> = Lazy::new(|| {
    ClusterTable::new()
        .attribute(AttributeServer::new(
            Attributes::SceneCount as _,
            "SceneCount",
            ScenesCluster::get_scene_count,
        ))
        .attribute(AttributeServer::new(
            Attributes::CurrentScene as _,
            "CurrentScene",
            ScenesCluster::get_current_scene,
        ))
        .attribute(AttributeServer::new(
            Attributes::CurrentGroup as _,
            "CurrentGroup",
            ScenesCluster::get_current_group,
        ))
        .attribute(AttributeServer::new(
            Attributes::SceneValid as _,
            "SceneValid",
            ScenesCluster::get_scene_valid,
        ))
        .attribute(AttributeServer::new(
            Attributes::NameSupport as _,
            "NameSupport",
            ScenesCluster::get_name_support,
        ))
        .attribute(AttributeServer::new(
            Attributes::LastConfiguredBy as _,
            "LastConfiguredBy",
            ScenesCluster::get_last_configured_by,
        ))
        .command(
            CommandServer::secure(
                Commands::AddScene as _,
                Commands::AddScene as _,
                "AddScene",
                ScenesCluster::add_scene,
            )
            .unicast_only(),
        )
        .command(
            CommandServer::secure(
                Commands::ViewScene as _,
                Commands::ViewScene as _,
                "ViewScene",
                ScenesCluster::view_scene,
            )
            .unicast_only(),
        )
        .command(
            CommandServer::secure(
                Commands::RemoveScene as _,
                Commands::RemoveScene as _,
                "RemoveScene",
                ScenesCluster::remove_scene,
            )
            .unicast_only(),
        )
        .command(
            CommandServer::secure(
                Commands::RemoveAllScenes as _,
                Commands::RemoveAllScenes as _,
                "RemoveAllScenes",
                ScenesCluster::remove_all_scenes,
            )
            .unicast_only(),
        )
        .command(
            CommandServer::secure(
                Commands::StoreScene as _,
                Commands::StoreScene as _,
                "StoreScene",
                ScenesCluster::store_scene,
            )
            .unicast_only(),
        )
        // Group-addressed recall is allowed
        .command(
            CommandServer::secure(
                Commands::RecallScene as _,
                Commands::RecallScene as _,
                "RecallScene",
                ScenesCluster::recall_scene,
            )
            .without_response(),
        )
        .command(
            CommandServer::secure(
                Commands::GetSceneMembership as _,
                Commands::GetSceneMembership as _,
                "GetSceneMembership",
                ScenesCluster::get_scene_membership,
            )
            .unicast_only(),
        )
        .command(
            CommandServer::secure(
                Commands::EnhancedAddScene as _,
                Commands::EnhancedAddScene as _,
                "EnhancedAddScene",
                ScenesCluster::enhanced_add_scene,
            )
            .unicast_only(),
        )
        .command(
            CommandServer::secure(
                Commands::EnhancedViewScene as _,
                Commands::EnhancedViewScene as _,
                "EnhancedViewScene",
                ScenesCluster::enhanced_view_scene,
            )
            .unicast_only(),
        )
        .command(
            CommandServer::secure(
                Commands::CopyScene as _,
                Commands::CopyScene as _,
                "CopyScene",
                ScenesCluster::copy_scene,
            )
            .unicast_only(),
        )
});

impl ClusterDefinition for ScenesCluster {
    const ID: ClusterId = CLUSTER_ID;
    const NAME: &'static str = "Scenes";
    const REVISION: u16 = 4;

    fn table() -> &'static ClusterTable<Self> {
        &TABLE
    }

    fn feature_map(&self) -> u32 {
        // Scene names
        u32::from(self.name_support.contains(NameSupport::SCENE_NAMES))
    }
}

/// The scenes cluster has no scene-capable attributes of its own.
impl SceneExtension for ScenesCluster {}

#[cfg(test)]
mod tests {
    use crate::{
        cluster::{on_off::OnOffCluster, ClusterServer},
        data_model::{device::Endpoint, device_type::DEVICE_TYPE_ON_OFF_LIGHT},
        fabric::{FabricIndex, FabricTable},
        message::MessageContext,
        session_context::{SecureSessionContext, SessionContext},
        storage::{MemoryStorage, StorageContext},
        tlv::{FromTlv, StructBuilder},
    };

    use super::*;

    struct Harness {
        endpoint: Endpoint,
        fabrics: FabricTable,
        session: SessionContext,
        message: MessageContext,
    }

    impl Harness {
        fn new(scenes: ScenesCluster) -> Self {
            let root = StorageContext::new(MemoryStorage::shared());
            let mut fabric = Fabric::new(FabricIndex(1), 0xA1, 0x01, 0xFFF1, &root).unwrap();
            GroupsManager::add_group(&mut fabric, 1, 0x0001, "Living room").unwrap();
            let mut fabrics = FabricTable::new();
            fabrics.add(fabric);
            Self {
                endpoint: Endpoint::new(1, DEVICE_TYPE_ON_OFF_LIGHT)
                    .with_cluster(scenes)
                    .with_cluster(OnOffCluster::new()),
                fabrics,
                session: SecureSessionContext::new_case(1, 2, FabricIndex(1), 0x77).into(),
                message: MessageContext::unicast(1, 0x77),
            }
        }

        fn invoke(&mut self, command: Commands, args: TlvElement) -> Result<Option<TlvElement>> {
            let response = self.endpoint.invoke(
                CLUSTER_ID,
                command as _,
                &args,
                &self.session,
                &self.message,
                &mut self.fabrics,
            )?;
            Ok(response.response)
        }
    }

    fn add(group_id: GroupId, scene_id: SceneId, name: &str) -> TlvElement {
        StructBuilder::new()
            .field(0, &group_id)
            .field(1, &scene_id)
            .field(2, &3u16)
            .field(3, name)
            .field(4, &Vec::<ExtensionFieldSet>::new())
            .build()
    }

    fn key(group_id: GroupId, scene_id: SceneId) -> TlvElement {
        StructBuilder::new()
            .field(0, &group_id)
            .field(1, &scene_id)
            .build()
    }

    fn status(response: Option<TlvElement>) -> StatusCode {
        SceneStatusResponse::from_tlv(&response.unwrap()).unwrap().status
    }

    #[test]
    fn test_membership_capacity_is_clamped() {
        for count in 0..=300usize {
            let expected = if count < 255 { 254usize.saturating_sub(count) } else { 0 };
            assert_eq!(usize::from(membership_capacity(count)), expected, "count {count}");
        }
        assert_eq!(membership_capacity(0), 254);
        assert_eq!(membership_capacity(254), 0);
    }

    #[test]
    fn test_add_validation_order() {
        let mut harness = Harness::new(ScenesCluster::new());

        // Unknown group wins over every other check
        let response = harness.invoke(Commands::AddScene, add(0x0002, 0, "x")).unwrap();
        assert_eq!(status(response), StatusCode::InvalidCommand);

        let response = harness.invoke(Commands::AddScene, add(0x0001, 0, "x")).unwrap();
        assert_eq!(status(response), StatusCode::ConstraintError);

        let response = harness.invoke(Commands::AddScene, add(0, 1, "x")).unwrap();
        assert_eq!(status(response), StatusCode::ConstraintError);

        let long_name = "a".repeat(MAX_NAME_LENGTH + 1);
        let response = harness.invoke(Commands::AddScene, add(0x0001, 1, &long_name)).unwrap();
        assert_eq!(status(response), StatusCode::ConstraintError);

        let response = harness.invoke(Commands::AddScene, add(0x0001, 1, "ÄÖÜäöüßÄÖÜäöüßÄÖ")).unwrap();
        assert_eq!(status(response), StatusCode::Success);
    }

    #[test]
    fn test_names_dropped_without_name_support() {
        let mut harness = Harness::new(ScenesCluster::new().with_name_support(false));
        harness.invoke(Commands::AddScene, add(0x0001, 1, "Movie")).unwrap();

        let response = harness.invoke(Commands::ViewScene, key(0x0001, 1)).unwrap();
        let view = ViewSceneResponse::from_tlv(&response.unwrap()).unwrap();
        assert_eq!(view.status, StatusCode::Success);
        assert_eq!(view.scene_name.as_deref(), Some(""));
        assert_eq!(view.transition_time, Some(3));
    }

    #[test]
    fn test_group_capacity_is_enforced() {
        let mut harness = Harness::new(ScenesCluster::new());
        let fabric = harness.fabrics.get_mut(FabricIndex(1)).unwrap();
        let entries = (1..=SCENE_TABLE_CAPACITY as SceneId).map(|scene_id| SceneEntry {
            group_id: 0x0001,
            scene_id,
            name: String::new(),
            transition_time: TransitionTime::default(),
            extension_field_sets: Vec::new(),
        });
        ScenesManager::set_scenes(fabric, 1, entries).unwrap();

        let response = harness.invoke(Commands::AddScene, add(0x0001, 0xFF, "")).unwrap();
        assert_eq!(status(response), StatusCode::ResourceExhausted);
        // Replacing an existing scene needs no new slot
        let response = harness.invoke(Commands::AddScene, add(0x0001, 0x10, "")).unwrap();
        assert_eq!(status(response), StatusCode::Success);

        let response = harness
            .invoke(
                Commands::GetSceneMembership,
                StructBuilder::new().field(0, &0x0001u16).build(),
            )
            .unwrap();
        let membership = GetSceneMembershipResponse::from_tlv(&response.unwrap()).unwrap();
        assert_eq!(membership.capacity, Some(0));
        assert_eq!(membership.scene_list.map(|list| list.len()), Some(254));
    }

    #[test]
    fn test_store_records_sibling_clusters_and_configurator() {
        let mut harness = Harness::new(ScenesCluster::new());
        let response = harness.invoke(Commands::StoreScene, key(0, 4)).unwrap();
        assert_eq!(status(response), StatusCode::Success);

        let response = harness.invoke(Commands::ViewScene, key(0, 4)).unwrap();
        let view = ViewSceneResponse::from_tlv(&response.unwrap()).unwrap();
        let field_sets = view.extension_field_sets.unwrap();
        assert_eq!(field_sets.len(), 1);
        assert_eq!(field_sets[0].cluster_id, 0x0006);

        let scenes = harness.endpoint.cluster(CLUSTER_ID).unwrap();
        let ctx = ReadContext {
            session: Some(&harness.session),
            fabrics: &harness.fabrics,
            endpoint: &harness.endpoint,
        };
        assert_eq!(
            scenes.read_attribute(Attributes::LastConfiguredBy as _, &ctx).unwrap(),
            TlvElement::Unsigned(0x77)
        );
        assert_eq!(
            scenes.read_attribute(Attributes::CurrentScene as _, &ctx).unwrap(),
            TlvElement::Unsigned(4)
        );
        assert_eq!(
            scenes.read_attribute(Attributes::SceneCount as _, &ctx).unwrap(),
            TlvElement::Unsigned(1)
        );
    }
}
