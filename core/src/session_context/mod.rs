/// Rules on which sessions may invoke which commands
pub mod guard;
pub mod secure;
/// Unsecured Session Context (4.12.1.1)
pub mod unsecured;

pub use guard::*;
pub use secure::*;
pub use unsecured::*;

use crate::{fabric::FabricIndex, NodeId};

pub enum SessionContext {
    Secure(SecureSessionContext),
    Unsecured(UnsecuredSessionContext),
}

impl SessionContext {
    pub fn as_secure(&self) -> Option<&SecureSessionContext> {
        match self {
            SessionContext::Secure(session) => Some(session),
            SessionContext::Unsecured(_) => None,
        }
    }

    /// The fabric the peer is accessing through this session, if any.
    pub fn accessing_fabric(&self) -> Option<FabricIndex> {
        self.as_secure()
            .and_then(|session| session.local_fabric_index)
    }

    pub fn peer_node_id(&self) -> Option<NodeId> {
        self.as_secure().map(|session| session.peer_node_id)
    }
}

impl From<SecureSessionContext> for SessionContext {
    fn from(session: SecureSessionContext) -> Self {
        SessionContext::Secure(session)
    }
}

impl From<UnsecuredSessionContext> for SessionContext {
    fn from(session: UnsecuredSessionContext) -> Self {
        SessionContext::Unsecured(session)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    Initiator,
    Responder,
}
