use crate::{fabric::FabricIndex, NodeId};

use super::SessionRole;

/// Session Context (4.12.2.1)
///
/// Only the parts the interaction model consults are kept here; keys and
/// counters stay with the transport.
#[derive(Debug, Clone)]
pub struct SecureSessionContext {
    pub session_type: SecureSessionType,
    pub session_role: SessionRole,
    pub local_session_id: u16,
    pub peer_session_id: u16,
    /// None for a PASE session opened before the node joined a fabric.
    pub local_fabric_index: Option<FabricIndex>,
    pub peer_node_id: NodeId,
    // TODO: CASE authenticated tags (max 3 can be stored)
}

impl SecureSessionContext {
    /// An operational session established with CASE over a fabric.
    pub fn new_case(
        local_session_id: u16,
        peer_session_id: u16,
        fabric_index: FabricIndex,
        peer_node_id: NodeId,
    ) -> Self {
        Self {
            session_type: SecureSessionType::Case,
            session_role: SessionRole::Responder,
            local_session_id,
            peer_session_id,
            local_fabric_index: Some(fabric_index),
            peer_node_id,
        }
    }

    /// A commissioning session established with a passcode.
    pub fn new_pase(local_session_id: u16, peer_session_id: u16) -> Self {
        Self {
            session_type: SecureSessionType::Pase,
            session_role: SessionRole::Responder,
            local_session_id,
            peer_session_id,
            local_fabric_index: None,
            peer_node_id: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecureSessionType {
    Case,
    Pase,
}
