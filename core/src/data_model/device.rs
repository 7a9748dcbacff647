use log::debug;

use crate::{
    cluster::ClusterServer,
    data_model::handler::{EndpointScope, InvokeContext, InvokeResponse, ReadContext},
    fabric::FabricTable,
    interaction_model::{AttributePathIB, CommandPathIB},
    message::MessageContext,
    session_context::SessionContext,
    tlv::TlvElement,
    ClusterId, CommandId, EndpointId, Error, NodeId, Result,
};

/// Node (7.8)
pub struct Node {
    pub id: NodeId,
    pub endpoints: Vec<Endpoint>,
}

impl Node {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            endpoints: Vec::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<Endpoint>) -> Self {
        self.endpoints.push(endpoint.into());
        self
    }

    /// Looks the endpoint up anywhere in the tree, including endpoints
    /// composed into other endpoints.
    pub fn endpoint(&self, id: EndpointId) -> Option<&Endpoint> {
        self.endpoints.iter().find_map(|endpoint| endpoint.find(id))
    }

    pub fn endpoint_mut(&mut self, id: EndpointId) -> Option<&mut Endpoint> {
        self.endpoints
            .iter_mut()
            .find_map(|endpoint| endpoint.find_mut(id))
    }

    pub fn invoke(
        &mut self,
        path: &CommandPathIB,
        args: &TlvElement,
        session: &SessionContext,
        message: &MessageContext,
        fabrics: &mut FabricTable,
    ) -> Result<InvokeResponse> {
        let endpoint = self
            .endpoint_mut(path.endpoint)
            .ok_or(Error::UnsupportedEndpoint(path.endpoint))?;
        endpoint.invoke(path.cluster, path.command, args, session, message, fabrics)
    }

    pub fn read_attribute(
        &self,
        path: &AttributePathIB,
        session: Option<&SessionContext>,
        fabrics: &FabricTable,
    ) -> Result<TlvElement> {
        let endpoint = self
            .endpoint(path.endpoint)
            .ok_or(Error::UnsupportedEndpoint(path.endpoint))?;
        let cluster = endpoint
            .cluster(path.cluster)
            .ok_or(Error::UnsupportedCluster {
                endpoint: path.endpoint,
                cluster: path.cluster,
            })?;
        let ctx = ReadContext {
            session,
            fabrics,
            endpoint,
        };
        cluster.read_attribute(path.attribute, &ctx)
    }
}

/// Endpoint (7.9)
pub struct Endpoint {
    pub id: EndpointId,
    pub device_types: Vec<DeviceType>,
    clusters: Vec<Box<dyn ClusterServer>>,
    children: Vec<Endpoint>,
}

impl Endpoint {
    pub fn new(id: EndpointId, device_type: DeviceType) -> Self {
        Self {
            id,
            device_types: vec![device_type],
            clusters: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_cluster(mut self, cluster: impl ClusterServer + 'static) -> Self {
        self.add_cluster(cluster);
        self
    }

    /// Adds a cluster server, replacing one with the same id.
    pub fn add_cluster(&mut self, cluster: impl ClusterServer + 'static) {
        let cluster: Box<dyn ClusterServer> = Box::new(cluster);
        match self.clusters.iter_mut().find(|c| c.id() == cluster.id()) {
            Some(existing) => *existing = cluster,
            None => self.clusters.push(cluster),
        }
    }

    pub fn clusters(&self) -> impl Iterator<Item = &(dyn ClusterServer + 'static)> + '_ {
        self.clusters.iter().map(|cluster| cluster.as_ref())
    }

    pub fn cluster(&self, id: ClusterId) -> Option<&(dyn ClusterServer + 'static)> {
        self.clusters().find(|cluster| cluster.id() == id)
    }

    pub fn cluster_mut(&mut self, id: ClusterId) -> Option<&mut (dyn ClusterServer + 'static)> {
        self.clusters
            .iter_mut()
            .find(|cluster| cluster.id() == id)
            .map(|cluster| cluster.as_mut())
    }

    pub fn add_child_endpoint(&mut self, endpoint: Endpoint) {
        self.children.push(endpoint);
    }

    pub fn child_endpoints(&self) -> &[Endpoint] {
        &self.children
    }

    pub fn find(&self, id: EndpointId) -> Option<&Endpoint> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: EndpointId) -> Option<&mut Endpoint> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    /// Invokes a command on one of this endpoint's own clusters. The other
    /// clusters stay reachable to the handler through the context.
    pub fn invoke(
        &mut self,
        cluster: ClusterId,
        command: CommandId,
        args: &TlvElement,
        session: &SessionContext,
        message: &MessageContext,
        fabrics: &mut FabricTable,
    ) -> Result<InvokeResponse> {
        let missing = Error::UnsupportedCluster {
            endpoint: self.id,
            cluster,
        };
        let Some(index) = self.clusters.iter().position(|c| c.id() == cluster) else {
            return Err(missing);
        };
        let (before, rest) = self.clusters.split_at_mut(index);
        let Some((target, after)) = rest.split_first_mut() else {
            return Err(missing);
        };
        debug!(
            "Endpoint {} dispatching command 0x{:02x} to {}",
            self.id,
            command,
            target.name()
        );
        let mut ctx = InvokeContext {
            session,
            message,
            fabrics,
            endpoint: EndpointScope::new(self.id, before, after),
        };
        target.invoke(command, args, &mut ctx)
    }
}

/// Device Type (7.15)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceType {
    pub device_type: u16,
    pub device_revision: u16,
}

/// Combines several devices (e.g. a fan and a light) into one endpoint whose
/// children are the sub-devices.
pub struct ComposedDevice {
    endpoint: Endpoint,
}

impl ComposedDevice {
    pub fn new(id: EndpointId, device_type: DeviceType, devices: Vec<Endpoint>) -> Self {
        let mut composed = Self {
            endpoint: Endpoint::new(id, device_type),
        };
        for device in devices {
            composed.add_device(device);
        }
        composed
    }

    pub fn add_device(&mut self, device: Endpoint) {
        self.endpoint.add_child_endpoint(device);
    }

    pub fn devices(&self) -> &[Endpoint] {
        self.endpoint.child_endpoints()
    }

    /// Any combination of sub-devices is accepted.
    pub fn verify_required_clusters(&self) -> Result<()> {
        Ok(())
    }
}

impl From<ComposedDevice> for Endpoint {
    fn from(composed: ComposedDevice) -> Self {
        composed.endpoint
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        cluster::{on_off::OnOffCluster, scenes::ScenesCluster},
        data_model::device_type::{
            root_node::DEVICE_TYPE_ROOT_NODE, DEVICE_TYPE_AGGREGATOR, DEVICE_TYPE_ON_OFF_LIGHT,
        },
        interaction_model::StatusCode,
        session_context::UnsecuredSessionContext,
    };

    use super::*;

    fn node() -> Node {
        let light = |id| Endpoint::new(id, DEVICE_TYPE_ON_OFF_LIGHT).with_cluster(OnOffCluster::new());
        let composed = ComposedDevice::new(2, DEVICE_TYPE_AGGREGATOR, vec![light(3), light(4)]);
        composed.verify_required_clusters().unwrap();
        assert_eq!(composed.devices().len(), 2);

        Node::new(0xf345843f)
            .with_endpoint(Endpoint::new(0, DEVICE_TYPE_ROOT_NODE))
            .with_endpoint(light(1).with_cluster(ScenesCluster::new()))
            .with_endpoint(composed)
    }

    #[test]
    fn test_find_nested_endpoint() {
        let node = node();
        assert!(node.endpoint(1).is_some());
        assert_eq!(node.endpoint(4).map(|e| e.id), Some(4));
        assert!(node.endpoint(5).is_none());
        assert_eq!(
            node.endpoint(1).unwrap().clusters().map(|c| c.id()).collect::<Vec<_>>(),
            vec![0x0006, 0x0005]
        );
    }

    #[test]
    fn test_invoke_resolves_path() {
        let mut node = node();
        let session = SessionContext::Unsecured(UnsecuredSessionContext::new(1));
        let message = MessageContext::default();
        let mut fabrics = FabricTable::new();
        let args = TlvElement::empty_struct();

        let response = node
            .invoke(&CommandPathIB::new(4, 0x0006, 0x01), &args, &session, &message, &mut fabrics)
            .unwrap();
        assert_eq!(response.code, StatusCode::Success);
        assert_eq!(response.response, None);

        let on_off = node
            .read_attribute(
                &AttributePathIB {
                    endpoint: 4,
                    cluster: 0x0006,
                    attribute: 0x0000,
                },
                Some(&session),
                &fabrics,
            )
            .unwrap();
        assert_eq!(on_off, TlvElement::Boolean(true));

        assert!(matches!(
            node.invoke(&CommandPathIB::new(9, 0x0006, 0x01), &args, &session, &message, &mut fabrics),
            Err(Error::UnsupportedEndpoint(9))
        ));
        assert!(matches!(
            node.invoke(&CommandPathIB::new(0, 0x0006, 0x01), &args, &session, &message, &mut fabrics),
            Err(Error::UnsupportedCluster {
                endpoint: 0,
                cluster: 0x0006
            })
        ));
        assert!(matches!(
            node.invoke(&CommandPathIB::new(4, 0x0006, 0x7f), &args, &session, &message, &mut fabrics),
            Err(Error::UnsupportedCommand {
                cluster: 0x0006,
                command: 0x7f
            })
        ));
    }

    #[test]
    fn test_add_cluster_replaces_same_id() {
        let mut endpoint = Endpoint::new(1, DEVICE_TYPE_ON_OFF_LIGHT)
            .with_cluster(OnOffCluster::new())
            .with_cluster(OnOffCluster::new());
        assert_eq!(endpoint.clusters().count(), 1);
        assert!(endpoint.cluster_mut(0x0006).is_some());
        assert!(endpoint.cluster(0x0008).is_none());
    }
}
