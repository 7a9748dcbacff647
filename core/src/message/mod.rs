//! Message metadata handed to command handlers.
//!
//! Framing, encryption and counters are owned by the transport. Handlers only
//! see what they need to apply session rules: how the message was addressed
//! and who sent it.

use crate::NodeId;

pub type SessionID = u16;

/// How the message was addressed (4.4.1.2 Security Flags, Session Type)
// TODO: this clashes with SecureSessionType in that it makes for an awkward
// interface. We don't know if a secure unicast session is PASE or CASE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionType {
    #[default]
    UnsecuredSession,
    SecureUnicast(SessionID),
    SecureGroup(SessionID),
}

impl SessionType {
    pub const fn session_id(&self) -> Option<u16> {
        match self {
            SessionType::UnsecuredSession => None,
            SessionType::SecureUnicast(id) => Some(*id),
            SessionType::SecureGroup(id) => Some(*id),
        }
    }

    /// Unicast messages are addressed to a single peer. Unsecured sessions are
    /// always unicast.
    pub const fn is_unicast(&self) -> bool {
        !matches!(self, SessionType::SecureGroup(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeID {
    Unique(NodeId),
    Group(u16),
}

/// The parts of a received message that outlive decryption.
#[derive(Debug, Clone, Default)]
pub struct MessageContext {
    pub session_type: SessionType,
    pub exchange_id: u16,
    pub source_node_id: Option<NodeId>,
    pub dest_node_id: Option<NodeID>,
}

impl MessageContext {
    pub fn unicast(session_id: SessionID, source_node_id: NodeId) -> Self {
        Self {
            session_type: SessionType::SecureUnicast(session_id),
            exchange_id: 0,
            source_node_id: Some(source_node_id),
            dest_node_id: None,
        }
    }

    pub fn groupcast(session_id: SessionID, group_id: u16) -> Self {
        Self {
            session_type: SessionType::SecureGroup(session_id),
            exchange_id: 0,
            source_node_id: None,
            dest_node_id: Some(NodeID::Group(group_id)),
        }
    }

    pub fn with_exchange_id(mut self, exchange_id: u16) -> Self {
        self.exchange_id = exchange_id;
        self
    }
}
