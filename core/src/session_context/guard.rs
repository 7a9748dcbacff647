use crate::{message::MessageContext, Error, Result};

/// Which kinds of message may reach a command handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPolicy {
    /// Unicast and groupcast messages are both accepted.
    #[default]
    Any,
    /// Groupcast messages are rejected before the handler runs.
    UnicastOnly,
}

impl SessionPolicy {
    pub fn check(self, message: &MessageContext, command: &'static str) -> Result<()> {
        match self {
            SessionPolicy::Any => Ok(()),
            SessionPolicy::UnicastOnly => require_unicast(message, command),
        }
    }
}

/// Fails when the message was sent to a group rather than to this node.
pub fn require_unicast(message: &MessageContext, command: &'static str) -> Result<()> {
    if message.session_type.is_unicast() {
        Ok(())
    } else {
        Err(Error::GroupcastNotSupported { command })
    }
}
