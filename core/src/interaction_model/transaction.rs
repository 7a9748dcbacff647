use log::{debug, warn};

use crate::{
    data_model::{device::Node, handler::InvokeResponse},
    fabric::FabricTable,
    message::MessageContext,
    session_context::SessionContext,
    tlv::TlvElement,
    Result,
};

use super::{
    CommandDataIB, CommandPathIB, CommandStatusIB, InvokeRequestMessage, InvokeResponseIB,
    InvokeResponseMessage, StatusIB,
};

/// One invoke interaction (8.8.2).
///
/// Every command data IB of the request runs to completion, in the order it
/// was received, before the next one is dispatched.
pub struct Transaction<'a> {
    node: &'a mut Node,
    fabrics: &'a mut FabricTable,
    session: &'a SessionContext,
    message: &'a MessageContext,
}

impl<'a> Transaction<'a> {
    pub fn new(
        node: &'a mut Node,
        fabrics: &'a mut FabricTable,
        session: &'a SessionContext,
        message: &'a MessageContext,
    ) -> Self {
        Self {
            node,
            fabrics,
            session,
            message,
        }
    }

    /// Runs an invoke request and returns the response to send back, or
    /// `None` when no response is sent (group sessions, or the requester
    /// asked for suppression). Commands run either way.
    pub fn invoke(
        node: &mut Node,
        fabrics: &mut FabricTable,
        session: &SessionContext,
        message: &MessageContext,
        request: &InvokeRequestMessage,
    ) -> Option<InvokeResponseMessage> {
        Transaction::new(node, fabrics, session, message).on_invoke_request(request)
    }

    pub fn on_invoke_request(
        &mut self,
        request: &InvokeRequestMessage,
    ) -> Option<InvokeResponseMessage> {
        let invoke_responses: Vec<InvokeResponseIB> = request
            .invoke_requests
            .iter()
            .map(|data| self.invoke_command(data))
            .collect();

        if request.suppress_response || !self.message.session_type.is_unicast() {
            debug!(
                "Suppressing {} invoke responses on exchange {}",
                invoke_responses.len(),
                self.message.exchange_id
            );
            return None;
        }
        Some(InvokeResponseMessage {
            suppress_response: false,
            invoke_responses,
        })
    }

    fn invoke_command(&mut self, data: &CommandDataIB) -> InvokeResponseIB {
        let path = data.command_path;
        let empty = TlvElement::empty_struct();
        let args = data.command_fields.as_ref().unwrap_or(&empty);
        match self.dispatch(&path, args) {
            Ok(response) => Self::render(path, response),
            Err(e) => {
                let status = e.status_code();
                warn!(
                    "Invoke of {}/0x{:04x}/0x{:02x} failed with {:?}: {}",
                    path.endpoint, path.cluster, path.command, status, e
                );
                InvokeResponseIB::Status(CommandStatusIB {
                    path,
                    status: StatusIB::new(status),
                })
            }
        }
    }

    fn dispatch(&mut self, path: &CommandPathIB, args: &TlvElement) -> Result<InvokeResponse> {
        self.node
            .invoke(path, args, self.session, self.message, self.fabrics)
    }

    fn render(path: CommandPathIB, response: InvokeResponse) -> InvokeResponseIB {
        match (response.response_id, response.response) {
            (Some(response_id), Some(fields)) => InvokeResponseIB::Command(CommandDataIB {
                command_path: CommandPathIB::new(path.endpoint, path.cluster, response_id),
                command_fields: Some(fields),
            }),
            _ => InvokeResponseIB::Status(CommandStatusIB {
                path,
                status: StatusIB::new(response.code),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        cluster::{
            on_off::{self, OnOffCluster},
            SceneExtension,
        },
        data_model::{device::Endpoint, device_type::DEVICE_TYPE_ON_OFF_LIGHT},
        interaction_model::{AttributePathIB, StatusCode},
        session_context::UnsecuredSessionContext,
        tlv::StructBuilder,
    };

    use super::*;

    fn node() -> Node {
        Node::new(0x42)
            .with_endpoint(Endpoint::new(1, DEVICE_TYPE_ON_OFF_LIGHT).with_cluster(OnOffCluster::new()))
    }

    fn command(endpoint: u16, cluster: u32, command: u32) -> CommandDataIB {
        CommandDataIB {
            command_path: CommandPathIB::new(endpoint, cluster, command),
            command_fields: None,
        }
    }

    #[test]
    fn test_commands_run_in_order() {
        let mut node = node();
        let mut fabrics = FabricTable::new();
        let session = SessionContext::Unsecured(UnsecuredSessionContext::new(7));
        let message = MessageContext::default();
        let request = InvokeRequestMessage::new(vec![
            command(1, on_off::CLUSTER_ID, 0x01),
            command(2, on_off::CLUSTER_ID, 0x01),
            command(1, 0x0300, 0x01),
            command(1, on_off::CLUSTER_ID, 0x40),
            command(1, on_off::CLUSTER_ID, 0x02),
        ]);

        let response = Transaction::invoke(&mut node, &mut fabrics, &session, &message, &request)
            .unwrap();
        let statuses: Vec<StatusCode> = response
            .invoke_responses
            .iter()
            .map(InvokeResponseIB::status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                StatusCode::Success,
                StatusCode::UnsupportedEndpoint,
                StatusCode::UnsupportedCluster,
                StatusCode::UnsupportedCommand,
                StatusCode::Success,
            ]
        );

        // On then Toggle
        let path = AttributePathIB {
            endpoint: 1,
            cluster: on_off::CLUSTER_ID,
            attribute: 0x0000,
        };
        assert_eq!(
            node.read_attribute(&path, Some(&session), &fabrics).unwrap(),
            TlvElement::Boolean(false)
        );
    }

    #[test]
    fn test_decode_failure_is_invalid_command() {
        let mut node = node();
        let mut fabrics = FabricTable::new();
        let session = SessionContext::Unsecured(UnsecuredSessionContext::new(7));
        let message = MessageContext::default();
        let request = InvokeRequestMessage::new(vec![CommandDataIB {
            command_path: CommandPathIB::new(1, on_off::CLUSTER_ID, 0x01),
            command_fields: Some(TlvElement::Unsigned(1)),
        }]);

        let response = Transaction::invoke(&mut node, &mut fabrics, &session, &message, &request)
            .unwrap();
        assert_eq!(
            response.invoke_responses,
            vec![InvokeResponseIB::Status(CommandStatusIB {
                path: CommandPathIB::new(1, on_off::CLUSTER_ID, 0x01),
                status: StatusIB::new(StatusCode::InvalidCommand),
            })]
        );
    }

    #[test]
    fn test_group_session_suppresses_response() {
        let mut node = node();
        let mut fabrics = FabricTable::new();
        let session = SessionContext::Unsecured(UnsecuredSessionContext::new(7));
        let groupcast = MessageContext::groupcast(3, 0x0101);
        let request = InvokeRequestMessage::new(vec![CommandDataIB {
            command_path: CommandPathIB::new(1, on_off::CLUSTER_ID, 0x01),
            command_fields: Some(StructBuilder::new().build()),
        }]);

        assert!(
            Transaction::invoke(&mut node, &mut fabrics, &session, &groupcast, &request).is_none()
        );
        let on = node
            .endpoint(1)
            .and_then(|endpoint| endpoint.cluster(on_off::CLUSTER_ID))
            .unwrap()
            .extract_scene_fields();
        assert_eq!(on[0].value(), Some(&TlvElement::Boolean(true)));

        let mut suppressed = InvokeRequestMessage::new(vec![command(1, on_off::CLUSTER_ID, 0x00)]);
        suppressed.suppress_response = true;
        let unicast = MessageContext::default();
        assert!(
            Transaction::invoke(&mut node, &mut fabrics, &session, &unicast, &suppressed).is_none()
        );
    }
}
