use num::FromPrimitive;

use crate::{
    constants::INTERACTION_MODEL_REVISION,
    tlv::{DecodeError, FromTlv, StructBuilder, StructReader, TlvElement, ToTlv},
    AttributeId, ClusterId, CommandId, EndpointId,
};

pub mod transaction;

/// Status codes (8.10)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum StatusCode {
    Success = 0x00,
    Failure = 0x01,
    InvalidSubscription = 0x7d,
    UnsupportedAccess = 0x7e,
    UnsupportedEndpoint = 0x7f,
    InvalidAction = 0x80,
    UnsupportedCommand = 0x81,
    InvalidCommand = 0x85,
    UnsupportedAttribute = 0x86,
    ConstraintError = 0x87,
    UnsupportedWrite = 0x88,
    ResourceExhausted = 0x89,
    NotFound = 0x8b,
    UnreportableAttribute = 0x8c,
    InvalidDataType = 0x8d,
    UnsupportedRead = 0x8f,
    DataVersionMismatch = 0x92,
    Timeout = 0x94,
    Busy = 0x9c,
    UnsupportedCluster = 0xc3,
    NoUpstreamSubscription = 0xc5,
    NeedsTimedInteraction = 0xc6,
    UnsupportedEvent = 0xc7,
    PathsExhausted = 0xc8,
    TimedRequestMismatch = 0xc9,
    FailsafeRequired = 0xca,
}

impl FromTlv for StatusCode {
    fn from_tlv(element: &TlvElement) -> Result<Self, DecodeError> {
        let value = u8::from_tlv(element)?;
        StatusCode::from_u8(value).ok_or(DecodeError::OutOfRange {
            value: value as i128,
            target: "StatusCode",
        })
    }
}

impl ToTlv for StatusCode {
    fn to_tlv(&self) -> TlvElement {
        TlvElement::Unsigned(*self as u64)
    }
}

/// Attribute path with every component resolved; wildcards are expanded by
/// the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributePathIB {
    pub endpoint: EndpointId,
    pub cluster: ClusterId,
    pub attribute: AttributeId,
}

/// CommandPathIB (10.6.11)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandPathIB {
    pub endpoint: EndpointId,
    pub cluster: ClusterId,
    pub command: CommandId,
}

impl CommandPathIB {
    pub const fn new(endpoint: EndpointId, cluster: ClusterId, command: CommandId) -> Self {
        Self {
            endpoint,
            cluster,
            command,
        }
    }
}

impl FromTlv for CommandPathIB {
    fn from_tlv(element: &TlvElement) -> Result<Self, DecodeError> {
        let reader = StructReader::new(element)?;
        Ok(Self {
            endpoint: reader.field(0)?,
            cluster: reader.field(1)?,
            command: reader.field(2)?,
        })
    }
}

impl ToTlv for CommandPathIB {
    fn to_tlv(&self) -> TlvElement {
        StructBuilder::new()
            .field(0, &self.endpoint)
            .field(1, &self.cluster)
            .field(2, &self.command)
            .build()
    }
}

/// CommandDataIB (10.6.12)
#[derive(Debug, Clone, PartialEq)]
pub struct CommandDataIB {
    pub command_path: CommandPathIB,
    pub command_fields: Option<TlvElement>,
}

impl FromTlv for CommandDataIB {
    fn from_tlv(element: &TlvElement) -> Result<Self, DecodeError> {
        let reader = StructReader::new(element)?;
        Ok(Self {
            command_path: reader.field(0)?,
            command_fields: reader.optional(1)?,
        })
    }
}

impl ToTlv for CommandDataIB {
    fn to_tlv(&self) -> TlvElement {
        StructBuilder::new()
            .field(0, &self.command_path)
            .optional(1, self.command_fields.as_ref())
            .build()
    }
}

/// StatusIB (10.6.17)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusIB {
    pub status: StatusCode,
    pub cluster_status: Option<u8>,
}

impl StatusIB {
    pub const fn new(status: StatusCode) -> Self {
        Self {
            status,
            cluster_status: None,
        }
    }
}

impl ToTlv for StatusIB {
    fn to_tlv(&self) -> TlvElement {
        StructBuilder::new()
            .field(0, &self.status)
            .optional(1, self.cluster_status.as_ref())
            .build()
    }
}

/// CommandStatusIB (10.6.14)
#[derive(Debug, Clone, PartialEq)]
pub struct CommandStatusIB {
    pub path: CommandPathIB,
    pub status: StatusIB,
}

impl ToTlv for CommandStatusIB {
    fn to_tlv(&self) -> TlvElement {
        StructBuilder::new()
            .field(0, &self.path)
            .field(1, &self.status)
            .build()
    }
}

/// InvokeResponseIB (10.6.13), either the response command or a status.
#[derive(Debug, Clone, PartialEq)]
pub enum InvokeResponseIB {
    Command(CommandDataIB),
    Status(CommandStatusIB),
}

impl InvokeResponseIB {
    pub fn status(&self) -> StatusCode {
        match self {
            InvokeResponseIB::Command(_) => StatusCode::Success,
            InvokeResponseIB::Status(status) => status.status.status,
        }
    }
}

impl ToTlv for InvokeResponseIB {
    fn to_tlv(&self) -> TlvElement {
        match self {
            InvokeResponseIB::Command(command) => StructBuilder::new().field(0, command).build(),
            InvokeResponseIB::Status(status) => StructBuilder::new().field(1, status).build(),
        }
    }
}

/// InvokeRequestMessage (10.7.9)
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeRequestMessage {
    pub suppress_response: bool,
    pub timed_request: bool,
    pub invoke_requests: Vec<CommandDataIB>,
}

impl InvokeRequestMessage {
    pub fn new(invoke_requests: Vec<CommandDataIB>) -> Self {
        Self {
            suppress_response: false,
            timed_request: false,
            invoke_requests,
        }
    }
}

impl FromTlv for InvokeRequestMessage {
    fn from_tlv(element: &TlvElement) -> Result<Self, DecodeError> {
        let reader = StructReader::new(element)?;
        Ok(Self {
            suppress_response: reader.optional(0)?.unwrap_or(false),
            timed_request: reader.optional(1)?.unwrap_or(false),
            invoke_requests: reader.field(2)?,
        })
    }
}

/// InvokeResponseMessage (10.7.10)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InvokeResponseMessage {
    pub suppress_response: bool,
    pub invoke_responses: Vec<InvokeResponseIB>,
}

impl ToTlv for InvokeResponseMessage {
    fn to_tlv(&self) -> TlvElement {
        StructBuilder::new()
            .field(0, &self.suppress_response)
            .field(1, &self.invoke_responses)
            .field(0xFF, &INTERACTION_MODEL_REVISION)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_invoke_request() {
        let request = StructBuilder::new()
            .field(0, &false)
            .field(
                2,
                &vec![CommandDataIB {
                    command_path: CommandPathIB::new(1, 0x0005, 0x01),
                    command_fields: Some(StructBuilder::new().field(0, &1u16).build()),
                }],
            )
            .build();
        let message = InvokeRequestMessage::from_tlv(&request).unwrap();
        assert!(!message.suppress_response);
        assert!(!message.timed_request);
        assert_eq!(message.invoke_requests.len(), 1);
        assert_eq!(
            message.invoke_requests[0].command_path,
            CommandPathIB::new(1, 0x0005, 0x01)
        );
    }

    #[test]
    fn test_unknown_status_code_is_rejected() {
        assert_eq!(
            StatusCode::from_tlv(&TlvElement::Unsigned(0x8b)),
            Ok(StatusCode::NotFound)
        );
        assert!(StatusCode::from_tlv(&TlvElement::Unsigned(0x02)).is_err());
    }
}
