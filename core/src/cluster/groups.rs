//! Groups cluster (Application Cluster 1.3)
//!
//! Group membership is kept per fabric and endpoint. The scenes cluster
//! consults it before touching scenes bound to a group.

use std::collections::BTreeMap;

use bitflags::bitflags;
use once_cell::sync::Lazy;

use crate::{
    cluster::{scenes::ScenesManager, ClusterDefinition, SceneExtension},
    constants::{GROUP_TABLE_CAPACITY, MAX_GROUP_ID, MAX_NAME_LENGTH, MIN_GROUP_ID},
    data_model::handler::{
        AttributeServer, ClusterTable, CommandServer, ReadContext, SecureInvokeContext,
    },
    fabric::Fabric,
    interaction_model::StatusCode,
    tlv::{DecodeError, FromTlv, StructBuilder, StructReader, TlvElement, ToTlv},
    ClusterId, EndpointId, Error, GroupId, Result,
};

pub const CLUSTER_ID: ClusterId = 0x0004;

#[repr(u16)]
#[derive(FromPrimitive)]
pub enum Attributes {
    NameSupport = 0x0000,
}

#[repr(u8)]
pub enum Commands {
    AddGroup = 0x00,
    ViewGroup = 0x01,
    GetGroupMembership = 0x02,
    RemoveGroup = 0x03,
    RemoveAllGroups = 0x04,
}

#[repr(u8)]
pub enum Responses {
    AddGroupResponse = 0x00,
    ViewGroupResponse = 0x01,
    GetGroupMembershipResponse = 0x02,
    RemoveGroupResponse = 0x03,
}

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct NameSupport: u8 {
        const GROUP_NAMES = 0b10000000;
    }
}

/// Group ids and names of one endpoint within one fabric.
pub type GroupTable = BTreeMap<GroupId, String>;

/// Group tables stored with the fabric, one per endpoint.
pub struct GroupsManager;

impl GroupsManager {
    fn key(endpoint: EndpointId) -> String {
        endpoint.to_string()
    }

    pub fn groups(fabric: &Fabric, endpoint: EndpointId) -> Result<GroupTable> {
        Ok(fabric
            .scoped_cluster_data(CLUSTER_ID, &Self::key(endpoint))?
            .unwrap_or_default())
    }

    fn set_groups(fabric: &mut Fabric, endpoint: EndpointId, groups: &GroupTable) -> Result<()> {
        fabric.set_scoped_cluster_data(CLUSTER_ID, &Self::key(endpoint), groups)?;
        fabric.persist()?;
        Ok(())
    }

    pub fn has_group(fabric: &Fabric, endpoint: EndpointId, group_id: GroupId) -> Result<bool> {
        Ok(Self::groups(fabric, endpoint)?.contains_key(&group_id))
    }

    pub fn group_name(
        fabric: &Fabric,
        endpoint: EndpointId,
        group_id: GroupId,
    ) -> Result<Option<String>> {
        Ok(Self::groups(fabric, endpoint)?.remove(&group_id))
    }

    /// Adds the group or renames it if it exists.
    pub fn add_group(
        fabric: &mut Fabric,
        endpoint: EndpointId,
        group_id: GroupId,
        name: &str,
    ) -> Result<()> {
        let mut groups = Self::groups(fabric, endpoint)?;
        if !groups.contains_key(&group_id) && groups.len() >= GROUP_TABLE_CAPACITY {
            return Err(Error::status(
                StatusCode::ResourceExhausted,
                format!("group table of endpoint {endpoint} is full"),
            ));
        }
        groups.insert(group_id, name.to_owned());
        Self::set_groups(fabric, endpoint, &groups)
    }

    /// Returns whether the group existed.
    pub fn remove_group(fabric: &mut Fabric, endpoint: EndpointId, group_id: GroupId) -> Result<bool> {
        let mut groups = Self::groups(fabric, endpoint)?;
        if groups.remove(&group_id).is_none() {
            return Ok(false);
        }
        Self::set_groups(fabric, endpoint, &groups)?;
        Ok(true)
    }

    pub fn remove_all_groups(fabric: &mut Fabric, endpoint: EndpointId) -> Result<()> {
        Self::set_groups(fabric, endpoint, &GroupTable::new())
    }
}

#[derive(Debug, Clone)]
pub struct AddGroupRequest {
    pub group_id: GroupId,
    pub group_name: String,
}

impl FromTlv for AddGroupRequest {
    fn from_tlv(element: &TlvElement) -> std::result::Result<Self, DecodeError> {
        let reader = StructReader::new(element)?;
        Ok(Self {
            group_id: reader.field(0)?,
            group_name: reader.field(1)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GroupRequest {
    pub group_id: GroupId,
}

impl FromTlv for GroupRequest {
    fn from_tlv(element: &TlvElement) -> std::result::Result<Self, DecodeError> {
        let reader = StructReader::new(element)?;
        Ok(Self {
            group_id: reader.field(0)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct GetGroupMembershipRequest {
    pub group_list: Vec<GroupId>,
}

impl FromTlv for GetGroupMembershipRequest {
    fn from_tlv(element: &TlvElement) -> std::result::Result<Self, DecodeError> {
        let reader = StructReader::new(element)?;
        Ok(Self {
            group_list: reader.field(0)?,
        })
    }
}

/// AddGroupResponse and RemoveGroupResponse
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupStatusResponse {
    pub status: StatusCode,
    pub group_id: GroupId,
}

impl ToTlv for GroupStatusResponse {
    fn to_tlv(&self) -> TlvElement {
        StructBuilder::new()
            .field(0, &self.status)
            .field(1, &self.group_id)
            .build()
    }
}

impl FromTlv for GroupStatusResponse {
    fn from_tlv(element: &TlvElement) -> std::result::Result<Self, DecodeError> {
        let reader = StructReader::new(element)?;
        Ok(Self {
            status: reader.field(0)?,
            group_id: reader.field(1)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewGroupResponse {
    pub status: StatusCode,
    pub group_id: GroupId,
    pub group_name: String,
}

impl ToTlv for ViewGroupResponse {
    fn to_tlv(&self) -> TlvElement {
        StructBuilder::new()
            .field(0, &self.status)
            .field(1, &self.group_id)
            .field(2, &self.group_name)
            .build()
    }
}

impl FromTlv for ViewGroupResponse {
    fn from_tlv(element: &TlvElement) -> std::result::Result<Self, DecodeError> {
        let reader = StructReader::new(element)?;
        Ok(Self {
            status: reader.field(0)?,
            group_id: reader.field(1)?,
            group_name: reader.field(2)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetGroupMembershipResponse {
    /// Null when the capacity is unknown.
    pub capacity: Option<u8>,
    pub group_list: Vec<GroupId>,
}

impl ToTlv for GetGroupMembershipResponse {
    fn to_tlv(&self) -> TlvElement {
        StructBuilder::new()
            .field(0, &self.capacity)
            .field(1, &self.group_list)
            .build()
    }
}

impl FromTlv for GetGroupMembershipResponse {
    fn from_tlv(element: &TlvElement) -> std::result::Result<Self, DecodeError> {
        let reader = StructReader::new(element)?;
        Ok(Self {
            capacity: reader.optional(0)?,
            group_list: reader.field(1)?,
        })
    }
}

pub struct GroupsCluster {
    name_support: NameSupport,
}

impl Default for GroupsCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupsCluster {
    pub fn new() -> Self {
        Self {
            name_support: NameSupport::GROUP_NAMES,
        }
    }

    pub fn with_name_support(mut self, supported: bool) -> Self {
        self.name_support.set(NameSupport::GROUP_NAMES, supported);
        self
    }

    fn add_group(
        &mut self,
        request: AddGroupRequest,
        ctx: &mut SecureInvokeContext<'_>,
    ) -> Result<GroupStatusResponse> {
        let group_id = request.group_id;
        let status = if !(MIN_GROUP_ID..=MAX_GROUP_ID).contains(&group_id)
            || request.group_name.chars().count() > MAX_NAME_LENGTH
        {
            StatusCode::ConstraintError
        } else {
            let name = if self.name_support.contains(NameSupport::GROUP_NAMES) {
                request.group_name.as_str()
            } else {
                ""
            };
            match GroupsManager::add_group(ctx.fabric, ctx.endpoint.id(), group_id, name) {
                Ok(()) => StatusCode::Success,
                Err(Error::Status { code, .. }) => code,
                Err(e) => return Err(e),
            }
        };
        Ok(GroupStatusResponse { status, group_id })
    }

    fn view_group(
        &mut self,
        request: GroupRequest,
        ctx: &mut SecureInvokeContext<'_>,
    ) -> Result<ViewGroupResponse> {
        let group_id = request.group_id;
        if !(MIN_GROUP_ID..=MAX_GROUP_ID).contains(&group_id) {
            return Ok(ViewGroupResponse {
                status: StatusCode::ConstraintError,
                group_id,
                group_name: String::new(),
            });
        }
        Ok(
            match GroupsManager::group_name(ctx.fabric, ctx.endpoint.id(), group_id)? {
                Some(group_name) => ViewGroupResponse {
                    status: StatusCode::Success,
                    group_id,
                    group_name,
                },
                None => ViewGroupResponse {
                    status: StatusCode::NotFound,
                    group_id,
                    group_name: String::new(),
                },
            },
        )
    }

    /// An empty request list asks for every group.
    fn get_group_membership(
        &mut self,
        request: GetGroupMembershipRequest,
        ctx: &mut SecureInvokeContext<'_>,
    ) -> Result<GetGroupMembershipResponse> {
        let groups = GroupsManager::groups(ctx.fabric, ctx.endpoint.id())?;
        let group_list = if request.group_list.is_empty() {
            groups.keys().copied().collect()
        } else {
            request
                .group_list
                .into_iter()
                .filter(|group_id| groups.contains_key(group_id))
                .collect()
        };
        let capacity = u8::try_from(GROUP_TABLE_CAPACITY.saturating_sub(groups.len())).ok();
        Ok(GetGroupMembershipResponse {
            capacity,
            group_list,
        })
    }

    /// Scenes bound to the group go with it.
    fn remove_group(
        &mut self,
        request: GroupRequest,
        ctx: &mut SecureInvokeContext<'_>,
    ) -> Result<GroupStatusResponse> {
        let group_id = request.group_id;
        let endpoint = ctx.endpoint.id();
        let status = if !(MIN_GROUP_ID..=MAX_GROUP_ID).contains(&group_id) {
            StatusCode::ConstraintError
        } else if GroupsManager::remove_group(ctx.fabric, endpoint, group_id)? {
            ScenesManager::remove_all_scenes_for_group(ctx.fabric, endpoint, group_id)?;
            StatusCode::Success
        } else {
            StatusCode::NotFound
        };
        Ok(GroupStatusResponse { status, group_id })
    }

    fn remove_all_groups(&mut self, _request: (), ctx: &mut SecureInvokeContext<'_>) -> Result<()> {
        let endpoint = ctx.endpoint.id();
        GroupsManager::remove_all_groups(ctx.fabric, endpoint)?;
        ScenesManager::remove_all_non_global_scenes(ctx.fabric, endpoint)
    }

    fn name_support(&self, _ctx: &ReadContext<'_>) -> Result<TlvElement> {
        Ok(self.name_support.bits().to_tlv())
    }
}

static TABLE: Lazy<ClusterTable<GroupsCluster>> = Lazy::new(|| {
    ClusterTable::new()
        .attribute(AttributeServer::new(
            Attributes::NameSupport as _,
            "NameSupport",
            GroupsCluster::name_support,
        ))
        .command(
            CommandServer::secure(
                Commands::AddGroup as _,
                Responses::AddGroupResponse as _,
                "AddGroup",
                GroupsCluster::add_group,
            )
            .unicast_only(),
        )
        .command(
            CommandServer::secure(
                Commands::ViewGroup as _,
                Responses::ViewGroupResponse as _,
                "ViewGroup",
                GroupsCluster::view_group,
            )
            .unicast_only(),
        )
        .command(
            CommandServer::secure(
                Commands::GetGroupMembership as _,
                Responses::GetGroupMembershipResponse as _,
                "GetGroupMembership",
                GroupsCluster::get_group_membership,
            )
            .unicast_only(),
        )
        .command(
            CommandServer::secure(
                Commands::RemoveGroup as _,
                Responses::RemoveGroupResponse as _,
                "RemoveGroup",
                GroupsCluster::remove_group,
            )
            .unicast_only(),
        )
        .command(
            CommandServer::secure(
                Commands::RemoveAllGroups as _,
                Commands::RemoveAllGroups as _,
                "RemoveAllGroups",
                GroupsCluster::remove_all_groups,
            )
            .without_response(),
        )
});

impl ClusterDefinition for GroupsCluster {
    const ID: ClusterId = CLUSTER_ID;
    const NAME: &'static str = "Groups";
    const REVISION: u16 = 4;

    fn table() -> &'static ClusterTable<Self> {
        &TABLE
    }

    fn feature_map(&self) -> u32 {
        // Group names
        u32::from(self.name_support.contains(NameSupport::GROUP_NAMES))
    }
}

impl SceneExtension for GroupsCluster {}

#[cfg(test)]
mod tests {
    use crate::{
        fabric::FabricIndex,
        storage::{MemoryStorage, StorageContext},
    };

    use super::*;

    #[test]
    fn test_group_table() {
        let root = StorageContext::new(MemoryStorage::shared());
        let mut fabric = Fabric::new(FabricIndex(1), 1, 2, 0xFFF1, &root).unwrap();

        assert!(!GroupsManager::has_group(&fabric, 1, 0x0101).unwrap());
        GroupsManager::add_group(&mut fabric, 1, 0x0101, "Kitchen").unwrap();
        GroupsManager::add_group(&mut fabric, 1, 0x0101, "Kitchen 2").unwrap();
        assert!(GroupsManager::has_group(&fabric, 1, 0x0101).unwrap());
        assert!(!GroupsManager::has_group(&fabric, 2, 0x0101).unwrap());
        assert_eq!(
            GroupsManager::group_name(&fabric, 1, 0x0101).unwrap().as_deref(),
            Some("Kitchen 2")
        );

        assert!(GroupsManager::remove_group(&mut fabric, 1, 0x0101).unwrap());
        assert!(!GroupsManager::remove_group(&mut fabric, 1, 0x0101).unwrap());
    }

    #[test]
    fn test_group_table_capacity() {
        let root = StorageContext::new(MemoryStorage::shared());
        let mut fabric = Fabric::new(FabricIndex(1), 1, 2, 0xFFF1, &root).unwrap();
        for group_id in 1..=GROUP_TABLE_CAPACITY as GroupId {
            GroupsManager::add_group(&mut fabric, 1, group_id, "").unwrap();
        }
        assert!(matches!(
            GroupsManager::add_group(&mut fabric, 1, 0x0F00, ""),
            Err(Error::Status {
                code: StatusCode::ResourceExhausted,
                ..
            })
        ));
        // Renaming an existing group needs no new slot
        GroupsManager::add_group(&mut fabric, 1, 1, "first").unwrap();
    }
}
