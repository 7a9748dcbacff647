//! Command and attribute bindings, and the per-cluster table that resolves
//! them.
//!
//! A [`CommandServer`] ties one command's request schema, response schema and
//! handler function to its invoke and response ids. Bindings are built once per
//! cluster type in a [`ClusterTable`] and shared by every endpoint that hosts
//! that cluster.

use core::{fmt::Debug, marker::PhantomData};

use log::debug;

use crate::{
    cluster::ClusterServer,
    data_model::device::Endpoint,
    fabric::{Fabric, FabricTable},
    interaction_model::StatusCode,
    message::MessageContext,
    session_context::{SecureSessionContext, SessionContext, SessionPolicy},
    tlv::{FromTlv, TlvElement, ToTlv},
    AttributeId, ClusterId, CommandId, EndpointId, Error, Result,
};

/// The other clusters on the endpoint a command was sent to.
///
/// The invoked cluster is borrowed separately, so it is never part of its own
/// scope.
pub struct EndpointScope<'a> {
    id: EndpointId,
    before: &'a mut [Box<dyn ClusterServer>],
    after: &'a mut [Box<dyn ClusterServer>],
}

impl<'a> EndpointScope<'a> {
    pub fn new(
        id: EndpointId,
        before: &'a mut [Box<dyn ClusterServer>],
        after: &'a mut [Box<dyn ClusterServer>],
    ) -> Self {
        Self { id, before, after }
    }

    pub fn id(&self) -> EndpointId {
        self.id
    }

    pub fn clusters(&self) -> impl Iterator<Item = &(dyn ClusterServer + 'static)> + '_ {
        self.before
            .iter()
            .chain(self.after.iter())
            .map(|cluster| cluster.as_ref())
    }

    pub fn cluster(&self, id: ClusterId) -> Option<&(dyn ClusterServer + 'static)> {
        self.clusters().find(|cluster| cluster.id() == id)
    }

    pub fn cluster_mut(&mut self, id: ClusterId) -> Option<&mut (dyn ClusterServer + 'static)> {
        self.before
            .iter_mut()
            .chain(self.after.iter_mut())
            .find(|cluster| cluster.id() == id)
            .map(|cluster| cluster.as_mut())
    }

    pub fn reborrow(&mut self) -> EndpointScope<'_> {
        EndpointScope {
            id: self.id,
            before: &mut *self.before,
            after: &mut *self.after,
        }
    }
}

/// Everything a handler may touch while processing one invocation.
pub struct InvokeContext<'a> {
    pub session: &'a SessionContext,
    pub message: &'a MessageContext,
    pub fabrics: &'a mut FabricTable,
    pub endpoint: EndpointScope<'a>,
}

impl<'a> InvokeContext<'a> {
    /// Narrows the context to a secure session and the fabric it accesses.
    pub fn secure(&mut self, command: &'static str) -> Result<SecureInvokeContext<'_>> {
        let SessionContext::Secure(session) = self.session else {
            return Err(Error::InsecureSession(command));
        };
        let index = session
            .local_fabric_index
            .ok_or(Error::NoAccessingFabric)?;
        let fabric = self
            .fabrics
            .get_mut(index)
            .ok_or(Error::NoAccessingFabric)?;
        Ok(SecureInvokeContext {
            session,
            message: self.message,
            fabric,
            endpoint: self.endpoint.reborrow(),
        })
    }
}

/// Invocation context of a handler that requires a secure, fabric-bound
/// session. It can only be obtained through [`InvokeContext::secure`].
pub struct SecureInvokeContext<'a> {
    pub session: &'a SecureSessionContext,
    pub message: &'a MessageContext,
    pub fabric: &'a mut Fabric,
    pub endpoint: EndpointScope<'a>,
}

/// Read access for attribute getters. Reads never mutate, so the whole
/// endpoint (including the cluster being read) is shared.
pub struct ReadContext<'a> {
    pub session: Option<&'a SessionContext>,
    pub fabrics: &'a FabricTable,
    pub endpoint: &'a Endpoint,
}

impl<'a> ReadContext<'a> {
    pub fn accessing_fabric(&self) -> Option<&'a Fabric> {
        let index = self.session?.accessing_fabric()?;
        self.fabrics.get(index)
    }
}

/// Outcome of a single command invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeResponse {
    pub code: StatusCode,
    /// None for commands that only answer with a status.
    pub response_id: Option<CommandId>,
    pub response: Option<TlvElement>,
}

pub type OpenHandler<C, Req, Resp> = fn(&mut C, Req, &mut InvokeContext<'_>) -> Result<Resp>;
pub type SecureHandler<C, Req, Resp> =
    fn(&mut C, Req, &mut SecureInvokeContext<'_>) -> Result<Resp>;

enum Handler<C, Req, Resp> {
    Open(OpenHandler<C, Req, Resp>),
    Secure(SecureHandler<C, Req, Resp>),
}

/// Binds one command of cluster `C`.
pub struct CommandServer<C, Req, Resp> {
    invoke_id: CommandId,
    response_id: Option<CommandId>,
    name: &'static str,
    policy: SessionPolicy,
    handler: Handler<C, Req, Resp>,
    _schema: PhantomData<fn(Req) -> Resp>,
}

impl<C, Req, Resp> CommandServer<C, Req, Resp> {
    /// A command any session may invoke.
    pub fn new(
        invoke_id: CommandId,
        response_id: CommandId,
        name: &'static str,
        handler: OpenHandler<C, Req, Resp>,
    ) -> Self {
        Self {
            invoke_id,
            response_id: Some(response_id),
            name,
            policy: SessionPolicy::Any,
            handler: Handler::Open(handler),
            _schema: PhantomData,
        }
    }

    /// A command whose handler needs the accessing fabric.
    pub fn secure(
        invoke_id: CommandId,
        response_id: CommandId,
        name: &'static str,
        handler: SecureHandler<C, Req, Resp>,
    ) -> Self {
        Self {
            invoke_id,
            response_id: Some(response_id),
            name,
            policy: SessionPolicy::Any,
            handler: Handler::Secure(handler),
            _schema: PhantomData,
        }
    }

    /// The command is answered with a status only.
    pub fn without_response(mut self) -> Self {
        self.response_id = None;
        self
    }

    pub fn unicast_only(mut self) -> Self {
        self.policy = SessionPolicy::UnicastOnly;
        self
    }
}

/// A type-erased [`CommandServer`].
pub trait CommandInvoker<C>: Send + Sync {
    fn invoke_id(&self) -> CommandId;
    fn response_id(&self) -> Option<CommandId>;
    fn name(&self) -> &'static str;
    /// Decode, run the handler, encode.
    ///
    /// A decode failure never reaches the handler. A handler failing with
    /// [`Error::Status`] yields a response carrying that status and no body;
    /// every other error is returned to the caller.
    fn invoke(
        &self,
        cluster: &mut C,
        args: &TlvElement,
        ctx: &mut InvokeContext<'_>,
    ) -> Result<InvokeResponse>;
}

impl<C, Req, Resp> CommandInvoker<C> for CommandServer<C, Req, Resp>
where
    Req: FromTlv + Debug,
    Resp: ToTlv + Debug,
{
    fn invoke_id(&self) -> CommandId {
        self.invoke_id
    }

    fn response_id(&self) -> Option<CommandId> {
        self.response_id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn invoke(
        &self,
        cluster: &mut C,
        args: &TlvElement,
        ctx: &mut InvokeContext<'_>,
    ) -> Result<InvokeResponse> {
        self.policy.check(ctx.message, self.name)?;
        let request = Req::from_tlv(args)?;
        debug!("Invoke {} with data {:?}", self.name, request);

        let result = match &self.handler {
            Handler::Open(handler) => handler(cluster, request, ctx),
            Handler::Secure(handler) => {
                let mut ctx = ctx.secure(self.name)?;
                handler(cluster, request, &mut ctx)
            }
        };

        match result {
            Ok(response) => {
                debug!("Invoke {} response: {:?}", self.name, response);
                Ok(InvokeResponse {
                    code: StatusCode::Success,
                    response_id: self.response_id,
                    response: self.response_id.map(|_| response.to_tlv()),
                })
            }
            Err(Error::Status { code, message }) => {
                debug!("Invoke {} failed with {:?}: {}", self.name, code, message);
                Ok(InvokeResponse {
                    code,
                    response_id: None,
                    response: None,
                })
            }
            Err(e) => Err(e),
        }
    }
}

pub type AttributeGetter<C> = fn(&C, &ReadContext<'_>) -> Result<TlvElement>;

/// Binds one readable attribute of cluster `C`.
pub struct AttributeServer<C> {
    pub id: AttributeId,
    pub name: &'static str,
    getter: AttributeGetter<C>,
}

impl<C> AttributeServer<C> {
    pub const fn new(id: AttributeId, name: &'static str, getter: AttributeGetter<C>) -> Self {
        Self { id, name, getter }
    }

    pub fn get(&self, cluster: &C, ctx: &ReadContext<'_>) -> Result<TlvElement> {
        (self.getter)(cluster, ctx)
    }
}

/// Attribute accessors and command invokers of one cluster type.
pub struct ClusterTable<C: 'static> {
    attributes: Vec<AttributeServer<C>>,
    commands: Vec<Box<dyn CommandInvoker<C>>>,
}

impl<C: 'static> Default for ClusterTable<C> {
    fn default() -> Self {
        Self {
            attributes: Vec::new(),
            commands: Vec::new(),
        }
    }
}

impl<C: 'static> ClusterTable<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, attribute: AttributeServer<C>) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn command<Req, Resp>(mut self, command: CommandServer<C, Req, Resp>) -> Self
    where
        Req: FromTlv + Debug + 'static,
        Resp: ToTlv + Debug + 'static,
    {
        self.commands.push(Box::new(command));
        self
    }

    pub fn find_attribute(&self, id: AttributeId) -> Option<&AttributeServer<C>> {
        self.attributes.iter().find(|attribute| attribute.id == id)
    }

    pub fn find_command(
        &self,
        cluster: ClusterId,
        command: CommandId,
    ) -> Result<&dyn CommandInvoker<C>> {
        self.commands
            .iter()
            .find(|invoker| invoker.invoke_id() == command)
            .map(|invoker| invoker.as_ref())
            .ok_or(Error::UnsupportedCommand { cluster, command })
    }

    pub fn attribute_ids(&self) -> impl Iterator<Item = AttributeId> + '_ {
        self.attributes.iter().map(|attribute| attribute.id)
    }

    pub fn accepted_commands(&self) -> Vec<CommandId> {
        self.commands.iter().map(|invoker| invoker.invoke_id()).collect()
    }

    pub fn generated_commands(&self) -> Vec<CommandId> {
        let mut generated: Vec<CommandId> = self
            .commands
            .iter()
            .filter_map(|invoker| invoker.response_id())
            .collect();
        generated.sort_unstable();
        generated.dedup();
        generated
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        fabric::FabricIndex,
        session_context::UnsecuredSessionContext,
        tlv::{StructBuilder, StructReader},
    };

    use super::*;

    #[derive(Default)]
    struct Counter {
        value: u32,
    }

    #[derive(Debug)]
    struct AddRequest {
        amount: u32,
    }

    impl FromTlv for AddRequest {
        fn from_tlv(element: &TlvElement) -> core::result::Result<Self, crate::tlv::DecodeError> {
            let reader = StructReader::new(element)?;
            Ok(Self {
                amount: reader.field(0)?,
            })
        }
    }

    impl Counter {
        fn add(&mut self, request: AddRequest, _ctx: &mut InvokeContext<'_>) -> Result<u32> {
            if request.amount == 0 {
                return Err(Error::status(StatusCode::ConstraintError, "nothing to add"));
            }
            self.value += request.amount;
            Ok(self.value)
        }

        fn fabric_add(
            &mut self,
            request: AddRequest,
            ctx: &mut SecureInvokeContext<'_>,
        ) -> Result<u32> {
            self.value += request.amount * u32::from(ctx.fabric.index.0);
            Ok(self.value)
        }
    }

    fn table() -> ClusterTable<Counter> {
        ClusterTable::new()
            .command(CommandServer::new(0x00, 0x01, "Add", Counter::add))
            .command(CommandServer::secure(0x02, 0x01, "FabricAdd", Counter::fabric_add).unicast_only())
    }

    fn args(amount: u32) -> TlvElement {
        StructBuilder::new().field(0, &amount).build()
    }

    #[test]
    fn test_invoke_encodes_response() {
        let table = table();
        let mut counter = Counter::default();
        let session = SessionContext::Unsecured(UnsecuredSessionContext::new(1));
        let message = MessageContext::default();
        let mut fabrics = FabricTable::new();
        let mut ctx = InvokeContext {
            session: &session,
            message: &message,
            fabrics: &mut fabrics,
            endpoint: EndpointScope::new(1, &mut [], &mut []),
        };

        let invoker = table.find_command(0x99, 0x00).unwrap();
        let response = invoker.invoke(&mut counter, &args(3), &mut ctx).unwrap();
        assert_eq!(response.code, StatusCode::Success);
        assert_eq!(response.response_id, Some(0x01));
        assert_eq!(response.response, Some(TlvElement::Unsigned(3)));

        let response = invoker.invoke(&mut counter, &args(0), &mut ctx).unwrap();
        assert_eq!(response.code, StatusCode::ConstraintError);
        assert_eq!(response.response, None);
        assert_eq!(counter.value, 3);
    }

    #[test]
    fn test_decode_failure_never_reaches_handler() {
        let table = table();
        let mut counter = Counter::default();
        let session = SessionContext::Unsecured(UnsecuredSessionContext::new(1));
        let message = MessageContext::default();
        let mut fabrics = FabricTable::new();
        let mut ctx = InvokeContext {
            session: &session,
            message: &message,
            fabrics: &mut fabrics,
            endpoint: EndpointScope::new(1, &mut [], &mut []),
        };

        let invoker = table.find_command(0x99, 0x00).unwrap();
        let bad = StructBuilder::new().field(0, "three").build();
        assert!(matches!(
            invoker.invoke(&mut counter, &bad, &mut ctx),
            Err(Error::Decode(_))
        ));
        assert_eq!(counter.value, 0);
    }

    #[test]
    fn test_secure_handler_requires_fabric() {
        let table = table();
        let mut counter = Counter::default();
        let session = SessionContext::Secure(SecureSessionContext::new_pase(1, 2));
        let message = MessageContext::unicast(1, 0);
        let mut fabrics = FabricTable::new();
        let mut ctx = InvokeContext {
            session: &session,
            message: &message,
            fabrics: &mut fabrics,
            endpoint: EndpointScope::new(1, &mut [], &mut []),
        };

        let invoker = table.find_command(0x99, 0x02).unwrap();
        assert!(matches!(
            invoker.invoke(&mut counter, &args(1), &mut ctx),
            Err(Error::NoAccessingFabric)
        ));

        let session = SessionContext::Secure(SecureSessionContext::new_case(1, 2, FabricIndex(1), 9));
        let groupcast = MessageContext::groupcast(1, 0x0101);
        let mut ctx = InvokeContext {
            session: &session,
            message: &groupcast,
            fabrics: &mut fabrics,
            endpoint: EndpointScope::new(1, &mut [], &mut []),
        };
        assert!(matches!(
            invoker.invoke(&mut counter, &args(1), &mut ctx),
            Err(Error::GroupcastNotSupported { .. })
        ));
    }

    #[test]
    fn test_unknown_command() {
        let table = table();
        assert!(matches!(
            table.find_command(0x99, 0x07),
            Err(Error::UnsupportedCommand {
                cluster: 0x99,
                command: 0x07
            })
        ));
        assert_eq!(table.accepted_commands(), vec![0x00, 0x02]);
        assert_eq!(table.generated_commands(), vec![0x01]);
    }
}
