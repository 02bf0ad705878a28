use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use crate::Builder;
use crate::backend::{BackendResult, ClientHandle, Sample, ServiceHandle};
use crate::callback_group::CallbackGroup;
use crate::entity::{EndpointEntity, Entity, EntityKind, GidArray};
use crate::node::XNode;

/// A service handler: anything invokable with a request, producing the
/// response payload.
pub type ServiceCallback = Arc<dyn Fn(&Sample) -> Vec<u8> + Send + Sync>;

/// Shared core of a service client.
pub struct ClientImpl {
    entity: EndpointEntity,
    gid: GidArray,
    handle: Box<dyn ClientHandle>,
}

impl ClientImpl {
    pub fn entity(&self) -> &EndpointEntity {
        &self.entity
    }

    pub fn gid(&self) -> GidArray {
        self.gid
    }

    /// Send a request payload; returns the sequence number assigned to it.
    pub fn send_request(&self, payload: &[u8]) -> BackendResult<i64> {
        self.handle.send_request(payload)
    }

    /// Non-blocking take of the next pending response. The sample's
    /// sequence number matches the one `send_request` returned.
    pub fn take_response(&self) -> Option<Sample> {
        self.handle.take_response()
    }
}

/// A client for a named service.
pub struct XClient<S> {
    inner: Arc<ClientImpl>,
    _phantom_data: PhantomData<S>,
}

impl<S> std::fmt::Debug for XClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XClient").finish_non_exhaustive()
    }
}

impl<S> XClient<S> {
    pub fn send_request(&self, payload: impl AsRef<[u8]>) -> BackendResult<i64> {
        self.inner.send_request(payload.as_ref())
    }

    pub fn take_response(&self) -> Option<Sample> {
        self.inner.take_response()
    }

    pub fn entity(&self) -> &EndpointEntity {
        self.inner.entity()
    }

    pub fn as_entity(&self) -> Entity {
        Entity::Client(self.inner.clone())
    }
}

pub struct XClientBuilder<'a, S> {
    pub(crate) node: &'a XNode,
    pub(crate) entity: EndpointEntity,
    pub(crate) group: Option<Arc<CallbackGroup>>,
    pub(crate) _phantom_data: PhantomData<S>,
}

impl<'a, S> XClientBuilder<'a, S> {
    /// Register the client with `group` instead of the node's default
    /// callback group. The group must have been created by the same node.
    pub fn with_group(mut self, group: &Arc<CallbackGroup>) -> Self {
        self.group = Some(group.clone());
        self
    }
}

impl<'a, S> Builder for XClientBuilder<'a, S> {
    type Output = XClient<S>;

    fn build(mut self) -> crate::Result<Self::Output> {
        let group = self
            .node
            .target_group(self.group.as_ref(), EntityKind::Client)?;
        self.entity.topic = self.node.qualify(&self.entity.topic, EntityKind::Client)?;
        let handle = self.node.create_backend_handle(&self.entity, |backend, node, entity| {
            backend.create_client(node, entity)
        })?;
        let gid = self.entity.gid();
        let inner = Arc::new(ClientImpl {
            entity: self.entity,
            gid,
            handle,
        });
        group.add_entity(Entity::Client(inner.clone()));
        self.node.counters().bump_clients();
        debug!("[CLN] ready: service={}", inner.entity.topic);
        Ok(XClient {
            inner,
            _phantom_data: Default::default(),
        })
    }
}

/// Shared core of a service server: descriptor, middleware handle, and the
/// user handler (when built in handler mode).
pub struct ServerImpl {
    entity: EndpointEntity,
    gid: GidArray,
    handle: Box<dyn ServiceHandle>,
    handler: Option<ServiceCallback>,
}

impl ServerImpl {
    pub fn entity(&self) -> &EndpointEntity {
        &self.entity
    }

    pub fn gid(&self) -> GidArray {
        self.gid
    }

    /// Non-blocking take of the next pending request (pull mode).
    pub fn take_request(&self) -> Option<Sample> {
        self.handle.take_request()
    }

    /// Reply to a request previously taken with
    /// [`take_request`](Self::take_request).
    pub fn send_response(&self, request: &Sample, payload: &[u8]) -> BackendResult<()> {
        self.handle.send_response(request, payload)
    }

    /// Take one pending request, run the handler, send the response back.
    ///
    /// Returns `Ok(true)` if a request was served. Servers built without a
    /// handler are left untouched so pull-mode consumers keep their
    /// requests.
    pub fn process_one(&self) -> BackendResult<bool> {
        let Some(handler) = &self.handler else {
            return Ok(false);
        };
        let Some(request) = self.handle.take_request() else {
            return Ok(false);
        };
        let response = handler(&request);
        self.handle.send_response(&request, &response)?;
        Ok(true)
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }
}

/// A server for a named service.
pub struct XServer<S> {
    inner: Arc<ServerImpl>,
    _phantom_data: PhantomData<S>,
}

impl<S> std::fmt::Debug for XServer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XServer").finish_non_exhaustive()
    }
}

impl<S> XServer<S> {
    pub fn take_request(&self) -> Option<Sample> {
        self.inner.take_request()
    }

    pub fn send_response(&self, request: &Sample, payload: impl AsRef<[u8]>) -> BackendResult<()> {
        self.inner.send_response(request, payload.as_ref())
    }

    pub fn process_one(&self) -> BackendResult<bool> {
        self.inner.process_one()
    }

    pub fn entity(&self) -> &EndpointEntity {
        self.inner.entity()
    }

    pub fn as_entity(&self) -> Entity {
        Entity::Service(self.inner.clone())
    }
}

pub struct XServerBuilder<'a, S> {
    pub(crate) node: &'a XNode,
    pub(crate) entity: EndpointEntity,
    pub(crate) group: Option<Arc<CallbackGroup>>,
    pub(crate) _phantom_data: PhantomData<S>,
}

impl<'a, S> XServerBuilder<'a, S> {
    /// Register the server with `group` instead of the node's default
    /// callback group. The group must have been created by the same node.
    pub fn with_group(mut self, group: &Arc<CallbackGroup>) -> Self {
        self.group = Some(group.clone());
        self
    }

    fn build_internal(mut self, handler: Option<ServiceCallback>) -> crate::Result<XServer<S>> {
        // Fail fast on a foreign group: nothing is created, no counter moves.
        let group = self
            .node
            .target_group(self.group.as_ref(), EntityKind::Service)?;
        self.entity.topic = self.node.qualify(&self.entity.topic, EntityKind::Service)?;
        let handle = self.node.create_backend_handle(&self.entity, |backend, node, entity| {
            backend.create_service(node, entity)
        })?;
        let gid = self.entity.gid();
        let inner = Arc::new(ServerImpl {
            entity: self.entity,
            gid,
            handle,
            handler,
        });
        group.add_entity(Entity::Service(inner.clone()));
        self.node.counters().bump_services();
        debug!(
            "[SRV] ready: service={} group={}",
            inner.entity.topic,
            group.id()
        );
        Ok(XServer {
            inner,
            _phantom_data: Default::default(),
        })
    }

    /// Build a server that answers every request through `handler`.
    pub fn build_with_handler<F>(self, handler: F) -> crate::Result<XServer<S>>
    where
        F: Fn(&Sample) -> Vec<u8> + Send + Sync + 'static,
    {
        self.build_internal(Some(Arc::new(handler)))
    }
}

impl<'a, S> Builder for XServerBuilder<'a, S> {
    type Output = XServer<S>;

    /// Build a pull-mode server; serve requests with
    /// [`XServer::take_request`] and [`XServer::send_response`].
    fn build(self) -> crate::Result<Self::Output> {
        self.build_internal(None)
    }
}
