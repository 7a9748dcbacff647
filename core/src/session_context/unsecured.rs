//! Unsecured Session Context (4.12.1.1)

use super::SessionRole;

#[derive(Debug, Clone)]
pub struct UnsecuredSessionContext {
    pub session_role: SessionRole,
    pub local_session_id: u16,
    pub peer_session_id: u16,
    pub ephemeral_initiator_node_id: u64,
}

impl UnsecuredSessionContext {
    pub fn new(ephemeral_initiator_node_id: u64) -> Self {
        Self {
            session_role: SessionRole::Responder,
            local_session_id: 0,
            peer_session_id: 0,
            ephemeral_initiator_node_id,
        }
    }
}
