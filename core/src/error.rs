use thiserror::Error;

use crate::{
    interaction_model::StatusCode, storage::StorageError, tlv::DecodeError, AttributeId,
    ClusterId, CommandId, EndpointId,
};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The argument stream did not match the request schema.
    #[error("invalid command payload: {0}")]
    Decode(#[from] DecodeError),
    /// A handler rejected the invocation with a protocol status.
    #[error("{message} (status {code:?})")]
    Status { code: StatusCode, message: String },
    #[error("endpoint {0} does not exist")]
    UnsupportedEndpoint(EndpointId),
    #[error("cluster 0x{cluster:04x} does not exist on endpoint {endpoint}")]
    UnsupportedCluster {
        endpoint: EndpointId,
        cluster: ClusterId,
    },
    #[error("command 0x{command:02x} is not supported by cluster 0x{cluster:04x}")]
    UnsupportedCommand {
        cluster: ClusterId,
        command: CommandId,
    },
    #[error("attribute 0x{attribute:04x} is not supported by cluster 0x{cluster:04x}")]
    UnsupportedAttribute {
        cluster: ClusterId,
        attribute: AttributeId,
    },
    #[error("{command} does not support groupcast")]
    GroupcastNotSupported { command: &'static str },
    #[error("{0} requires a secure session")]
    InsecureSession(&'static str),
    #[error("session has no accessing fabric")]
    NoAccessingFabric,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl Error {
    pub fn status(code: StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }

    /// The status reported on the wire for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Decode(_) => StatusCode::InvalidCommand,
            Error::Status { code, .. } => *code,
            Error::UnsupportedEndpoint(_) => StatusCode::UnsupportedEndpoint,
            Error::UnsupportedCluster { .. } => StatusCode::UnsupportedCluster,
            Error::UnsupportedCommand { .. } => StatusCode::UnsupportedCommand,
            Error::UnsupportedAttribute { .. } => StatusCode::UnsupportedAttribute,
            Error::GroupcastNotSupported { .. } => StatusCode::InvalidAction,
            Error::InsecureSession(_) | Error::NoAccessingFabric => StatusCode::UnsupportedAccess,
            Error::Storage(_) => StatusCode::Failure,
        }
    }
}
