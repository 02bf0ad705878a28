use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use crate::Builder;
use crate::backend::{BackendResult, PublisherHandle, Sample, SubscriptionHandle};
use crate::callback_group::CallbackGroup;
use crate::entity::{EndpointEntity, Entity, EntityKind, GidArray};
use crate::node::XNode;

pub const DEFAULT_QUEUE_DEPTH: usize = 10;

pub type SubCallback = Arc<dyn Fn(Sample) + Send + Sync>;

/// Shared core of a publisher. `XPub<T>` is the typed owner-side view.
pub struct PubImpl {
    entity: EndpointEntity,
    gid: GidArray,
    handle: Box<dyn PublisherHandle>,
}

impl PubImpl {
    pub fn entity(&self) -> &EndpointEntity {
        &self.entity
    }

    pub fn gid(&self) -> GidArray {
        self.gid
    }

    pub fn publish(&self, payload: &[u8]) -> BackendResult<()> {
        self.handle.publish(payload)
    }
}

/// A publisher bound to a topic.
///
/// Payload encoding lives outside this layer, so publishing takes
/// pre-serialized bytes; `T` carries the topic type resolved at creation.
pub struct XPub<T> {
    inner: Arc<PubImpl>,
    _phantom_data: PhantomData<T>,
}

impl<T> std::fmt::Debug for XPub<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XPub").finish_non_exhaustive()
    }
}

impl<T> XPub<T> {
    pub fn publish_serialized(&self, data: impl AsRef<[u8]>) -> BackendResult<()> {
        self.inner.publish(data.as_ref())
    }

    pub fn entity(&self) -> &EndpointEntity {
        self.inner.entity()
    }

    pub fn gid(&self) -> GidArray {
        self.inner.gid()
    }

    pub fn as_entity(&self) -> Entity {
        Entity::Publisher(self.inner.clone())
    }
}

pub struct XPubBuilder<'a, T> {
    pub(crate) node: &'a XNode,
    pub(crate) entity: EndpointEntity,
    pub(crate) _phantom_data: PhantomData<T>,
}

impl<'a, T> XPubBuilder<'a, T> {
    pub fn with_queue_depth(mut self, queue_depth: usize) -> Self {
        self.entity.queue_depth = queue_depth;
        self
    }
}

impl<'a, T> Builder for XPubBuilder<'a, T> {
    type Output = XPub<T>;

    fn build(mut self) -> crate::Result<Self::Output> {
        self.entity.topic = self.node.qualify(&self.entity.topic, EntityKind::Publisher)?;
        let handle = self.node.create_backend_handle(&self.entity, |backend, node, entity| {
            backend.create_publisher(node, entity)
        })?;
        debug!("[PUB] ready: topic={}", self.entity.topic);
        let gid = self.entity.gid();
        Ok(XPub {
            inner: Arc::new(PubImpl {
                entity: self.entity,
                gid,
                handle,
            }),
            _phantom_data: Default::default(),
        })
    }
}

/// Shared core of a subscription: descriptor, middleware handle, and the
/// user callback (when built in callback mode).
pub struct SubImpl {
    entity: EndpointEntity,
    gid: GidArray,
    handle: Box<dyn SubscriptionHandle>,
    callback: Option<SubCallback>,
}

impl SubImpl {
    pub fn entity(&self) -> &EndpointEntity {
        &self.entity
    }

    pub fn gid(&self) -> GidArray {
        self.gid
    }

    /// Non-blocking take of the next pending sample (pull mode).
    pub fn take(&self) -> Option<Sample> {
        self.handle.take()
    }

    /// Take one pending sample and run the user callback on it.
    ///
    /// Returns `true` if a sample was dispatched. Subscriptions built
    /// without a callback are left untouched so pull-mode consumers keep
    /// their samples.
    pub fn dispatch_one(&self) -> bool {
        let Some(callback) = &self.callback else {
            return false;
        };
        match self.handle.take() {
            Some(sample) => {
                callback(sample);
                true
            }
            None => false,
        }
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }
}

/// A subscription bound to a topic.
pub struct XSub<T> {
    inner: Arc<SubImpl>,
    _phantom_data: PhantomData<T>,
}

impl<T> std::fmt::Debug for XSub<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XSub").finish_non_exhaustive()
    }
}

impl<T> XSub<T> {
    pub fn take(&self) -> Option<Sample> {
        self.inner.take()
    }

    pub fn dispatch_one(&self) -> bool {
        self.inner.dispatch_one()
    }

    pub fn entity(&self) -> &EndpointEntity {
        self.inner.entity()
    }

    pub fn gid(&self) -> GidArray {
        self.inner.gid()
    }

    pub fn as_entity(&self) -> Entity {
        Entity::Subscription(self.inner.clone())
    }
}

pub struct XSubBuilder<'a, T> {
    pub(crate) node: &'a XNode,
    pub(crate) entity: EndpointEntity,
    pub(crate) group: Option<Arc<CallbackGroup>>,
    pub(crate) _phantom_data: PhantomData<T>,
}

impl<'a, T> XSubBuilder<'a, T> {
    pub fn with_queue_depth(mut self, queue_depth: usize) -> Self {
        self.entity.queue_depth = queue_depth;
        self
    }

    /// Register the subscription with `group` instead of the node's default
    /// callback group. The group must have been created by the same node.
    pub fn with_group(mut self, group: &Arc<CallbackGroup>) -> Self {
        self.group = Some(group.clone());
        self
    }

    fn build_internal(mut self, callback: Option<SubCallback>) -> crate::Result<XSub<T>> {
        // Fail fast on a foreign group: nothing is created, no counter moves.
        let group = self
            .node
            .target_group(self.group.as_ref(), EntityKind::Subscription)?;
        self.entity.topic = self
            .node
            .qualify(&self.entity.topic, EntityKind::Subscription)?;
        let handle = self.node.create_backend_handle(&self.entity, |backend, node, entity| {
            backend.create_subscription(node, entity)
        })?;
        let gid = self.entity.gid();
        let inner = Arc::new(SubImpl {
            entity: self.entity,
            gid,
            handle,
            callback,
        });
        group.add_entity(Entity::Subscription(inner.clone()));
        self.node.counters().bump_subscriptions();
        debug!(
            "[SUB] ready: topic={} group={}",
            inner.entity.topic,
            group.id()
        );
        Ok(XSub {
            inner,
            _phantom_data: Default::default(),
        })
    }

    /// Build a subscription that hands every sample to `callback`.
    pub fn build_with_callback<F>(self, callback: F) -> crate::Result<XSub<T>>
    where
        F: Fn(Sample) + Send + Sync + 'static,
    {
        self.build_internal(Some(Arc::new(callback)))
    }
}

impl<'a, T> Builder for XSubBuilder<'a, T> {
    type Output = XSub<T>;

    /// Build a pull-mode subscription; consume samples with
    /// [`XSub::take`].
    fn build(self) -> crate::Result<Self::Output> {
        self.build_internal(None)
    }
}
