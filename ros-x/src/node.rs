use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::Builder;
use crate::backend::{Backend, BackendResult, NodeHandle};
use crate::callback_group::{CallbackGroup, GroupKind};
use crate::context::GlobalCounter;
use crate::entity::{EndpointEntity, EntityKind, NodeEntity, TypeInfo};
use crate::parameter::{
    ListParametersResult, Parameter, ParameterDescriptor, ParameterStore, ParameterType,
    ParameterVariant, SetParametersResult,
};
use crate::pubsub::{DEFAULT_QUEUE_DEPTH, XPubBuilder, XSubBuilder};
use crate::ros_msg::{ServiceTypeInfo, WithTypeInfo};
use crate::service::{XClientBuilder, XServerBuilder};
use crate::timer::{TimerCallback, XTimerBuilder};
use crate::topic_name;

/// Errors raised while creating an entity.
///
/// Both kinds abort only the call that raised them; the node and everything
/// previously created stay valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateEntityError {
    /// The supplied callback group was not created by this node (or has
    /// already been dropped by every owner). Nothing was created.
    GroupNotInNode { kind: EntityKind },
    /// The middleware backend refused or failed to create the handle.
    EntityCreationFailed { kind: EntityKind, name: String },
}

impl std::fmt::Display for CreateEntityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GroupNotInNode { kind } => {
                write!(f, "cannot create {}: group not in node", kind.label())
            }
            Self::EntityCreationFailed { kind, name } => {
                write!(f, "failed to create {} '{}'", kind.label(), name)
            }
        }
    }
}

impl std::error::Error for CreateEntityError {}

/// Creation counters, by entity kind.
///
/// These count how many entities the node has created over its lifetime;
/// they are never decremented when an entity is dropped. Live-entity
/// tracking is deliberately not this layer's job.
#[derive(Debug, Default)]
pub struct EntityCounters {
    subscriptions: AtomicUsize,
    timers: AtomicUsize,
    services: AtomicUsize,
    clients: AtomicUsize,
}

impl EntityCounters {
    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::Relaxed)
    }

    pub fn timers(&self) -> usize {
        self.timers.load(Ordering::Relaxed)
    }

    pub fn services(&self) -> usize {
        self.services.load(Ordering::Relaxed)
    }

    pub fn clients(&self) -> usize {
        self.clients.load(Ordering::Relaxed)
    }

    pub(crate) fn bump_subscriptions(&self) {
        self.subscriptions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn bump_timers(&self) {
        self.timers.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn bump_services(&self) {
        self.services.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn bump_clients(&self) {
        self.clients.fetch_add(1, Ordering::Relaxed);
    }
}

pub struct XNodeBuilder {
    pub name: String,
    pub namespace: String,
    pub backend: Arc<dyn Backend>,
    pub counter: Arc<GlobalCounter>,
}

impl XNodeBuilder {
    pub fn with_namespace<S: AsRef<str>>(mut self, namespace: S) -> Self {
        // Root namespace "/" is normalized to the empty namespace.
        let ns = namespace.as_ref();
        self.namespace = if ns == "/" { String::new() } else { ns.to_owned() };
        self
    }
}

impl Builder for XNodeBuilder {
    type Output = XNode;

    fn build(self) -> crate::Result<XNode> {
        topic_name::validate_node_name(&self.name).map_err(|e| {
            warn!("[NODE] invalid node name '{}': {e}", self.name);
            CreateEntityError::EntityCreationFailed {
                kind: EntityKind::Node,
                name: self.name.clone(),
            }
        })?;
        let entity = NodeEntity::new(self.counter.increment(), self.name, self.namespace);
        let handle = self.backend.create_node(&entity).map_err(|e| {
            error!("[NODE] backend refused node '{}': {e}", entity.name);
            CreateEntityError::EntityCreationFailed {
                kind: EntityKind::Node,
                name: entity.name.clone(),
            }
        })?;
        let default_group = Arc::new(CallbackGroup::new(
            self.counter.increment(),
            GroupKind::MutuallyExclusive,
        ));
        let groups = Mutex::new(vec![Arc::downgrade(&default_group)]);
        info!("[NODE] created: {entity}");
        Ok(XNode {
            entity,
            handle,
            backend: self.backend,
            counter: self.counter,
            default_group,
            groups,
            counters: EntityCounters::default(),
            parameters: ParameterStore::new(),
        })
    }
}

/// A named participant owning publishers, subscriptions, timers, service
/// clients and servers, its callback groups, and a parameter store.
///
/// Entity creation is safe to call from multiple threads: the group table
/// takes a lock and the counters are atomic.
pub struct XNode {
    pub entity: NodeEntity,
    handle: Box<dyn NodeHandle>,
    backend: Arc<dyn Backend>,
    counter: Arc<GlobalCounter>,
    default_group: Arc<CallbackGroup>,
    /// Non-owning table of every group this node created. Owning references
    /// live with whoever retains the group (caller, executor); expired
    /// entries are skipped on scan and pruned on insert.
    groups: Mutex<Vec<Weak<CallbackGroup>>>,
    counters: EntityCounters,
    parameters: ParameterStore,
}

impl XNode {
    /// Allocate a new callback group of the requested kind and remember it
    /// (non-owningly) for membership checks. Always succeeds.
    pub fn create_callback_group(&self, kind: GroupKind) -> Arc<CallbackGroup> {
        let group = Arc::new(CallbackGroup::new(self.counter.increment(), kind));
        let mut groups = self.groups.lock();
        groups.retain(|weak| weak.upgrade().is_some());
        groups.push(Arc::downgrade(&group));
        debug!("[NODE] callback group created: id={} kind={}", group.id(), kind);
        group
    }

    /// The group entities land in when no explicit group is supplied.
    pub fn default_callback_group(&self) -> &Arc<CallbackGroup> {
        &self.default_group
    }

    /// Whether `group` is one of this node's groups, by identity.
    ///
    /// Expired groups are silently skipped, never counted as a match.
    pub fn group_in_node(&self, group: &Arc<CallbackGroup>) -> bool {
        self.groups
            .lock()
            .iter()
            .any(|weak| weak.upgrade().is_some_and(|g| Arc::ptr_eq(&g, group)))
    }

    /// Create a publisher for the given topic. Publishers have no inbound
    /// dispatch and are never registered with a callback group.
    pub fn create_pub<T>(&self, topic: &str) -> XPubBuilder<'_, T>
    where
        T: WithTypeInfo,
    {
        XPubBuilder {
            node: self,
            entity: self.endpoint_entity(EntityKind::Publisher, topic, Some(T::type_info())),
            _phantom_data: PhantomData,
        }
    }

    /// Create a subscription for the given topic.
    pub fn create_sub<T>(&self, topic: &str) -> XSubBuilder<'_, T>
    where
        T: WithTypeInfo,
    {
        XSubBuilder {
            node: self,
            entity: self.endpoint_entity(EntityKind::Subscription, topic, Some(T::type_info())),
            group: None,
            _phantom_data: PhantomData,
        }
    }

    /// Create a wall timer firing `callback` every `period`.
    pub fn create_wall_timer<F>(&self, period: Duration, callback: F) -> XTimerBuilder<'_>
    where
        F: Fn() + Send + Sync + 'static,
    {
        XTimerBuilder {
            node: self,
            id: self.counter.increment(),
            period,
            callback: Arc::new(callback) as TimerCallback,
            group: None,
        }
    }

    /// Fractional-seconds convenience for [`create_wall_timer`](Self::create_wall_timer).
    ///
    /// The period is truncated, never rounded, to whole nanoseconds before
    /// delegating to the integer-period form.
    pub fn create_wall_timer_secs<F>(&self, period: f64, callback: F) -> XTimerBuilder<'_>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.create_wall_timer(Duration::from_nanos((period * 1e9) as u64), callback)
    }

    /// Create a client for the given service.
    pub fn create_client<S>(&self, service: &str) -> XClientBuilder<'_, S>
    where
        S: ServiceTypeInfo,
    {
        XClientBuilder {
            node: self,
            entity: self.endpoint_entity(EntityKind::Client, service, Some(S::service_type_info())),
            group: None,
            _phantom_data: PhantomData,
        }
    }

    /// Create a server for the given service.
    pub fn create_service<S>(&self, service: &str) -> XServerBuilder<'_, S>
    where
        S: ServiceTypeInfo,
    {
        XServerBuilder {
            node: self,
            entity: self.endpoint_entity(EntityKind::Service, service, Some(S::service_type_info())),
            group: None,
            _phantom_data: PhantomData,
        }
    }

    fn endpoint_entity(
        &self,
        kind: EntityKind,
        topic: &str,
        type_info: Option<TypeInfo>,
    ) -> EndpointEntity {
        EndpointEntity {
            id: self.counter.increment(),
            node: self.entity.clone(),
            kind,
            topic: topic.to_string(),
            type_info,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }

    /// Resolve the group an entity lands in, failing fast when the caller
    /// supplied a group this node does not know.
    pub(crate) fn target_group(
        &self,
        group: Option<&Arc<CallbackGroup>>,
        kind: EntityKind,
    ) -> crate::Result<Arc<CallbackGroup>> {
        match group {
            Some(group) => {
                if self.group_in_node(group) {
                    Ok(group.clone())
                } else {
                    warn!("[NODE] cannot create {}: group not in node", kind.label());
                    Err(CreateEntityError::GroupNotInNode { kind })
                }
            }
            None => Ok(self.default_group.clone()),
        }
    }

    pub(crate) fn qualify(&self, name: &str, kind: EntityKind) -> crate::Result<String> {
        let qualify = match kind {
            EntityKind::Service | EntityKind::Client => topic_name::qualify_service_name,
            _ => topic_name::qualify_topic_name,
        };
        qualify(name, &self.entity.namespace, &self.entity.name).map_err(|e| {
            warn!("[NODE] invalid {} name '{name}': {e}", kind.label());
            CreateEntityError::EntityCreationFailed {
                kind,
                name: name.to_string(),
            }
        })
    }

    pub(crate) fn create_backend_handle<H>(
        &self,
        entity: &EndpointEntity,
        create: impl FnOnce(&dyn Backend, &dyn NodeHandle, &EndpointEntity) -> BackendResult<H>,
    ) -> crate::Result<H> {
        create(self.backend.as_ref(), self.handle.as_ref(), entity).map_err(|e| {
            error!(
                "[NODE] backend refused {} '{}': {e}",
                entity.kind.label(),
                entity.topic
            );
            CreateEntityError::EntityCreationFailed {
                kind: entity.kind,
                name: entity.topic.clone(),
            }
        })
    }

    /// Creation counts by kind; see [`EntityCounters`].
    pub fn counters(&self) -> &EntityCounters {
        &self.counters
    }

    /// Direct access to the node's parameter store.
    pub fn parameters(&self) -> &ParameterStore {
        &self.parameters
    }

    pub fn set_parameters(
        &self,
        parameters: impl IntoIterator<Item = Parameter>,
    ) -> Vec<SetParametersResult> {
        self.parameters.set_parameters(parameters)
    }

    pub fn set_parameters_atomically(
        &self,
        parameters: impl IntoIterator<Item = Parameter>,
    ) -> SetParametersResult {
        self.parameters.set_parameters_atomically(parameters)
    }

    pub fn get_parameters(&self, names: &[String]) -> Vec<ParameterVariant> {
        self.parameters.get_parameters(names)
    }

    pub fn describe_parameters(&self, names: &[String]) -> Vec<ParameterDescriptor> {
        self.parameters.describe_parameters(names)
    }

    pub fn get_parameter_types(&self, names: &[String]) -> Vec<ParameterType> {
        self.parameters.get_parameter_types(names)
    }

    pub fn list_parameters(&self, prefixes: &[String], depth: u64) -> Vec<ListParametersResult> {
        self.parameters.list_parameters(prefixes, depth)
    }
}

impl std::fmt::Debug for XNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XNode")
            .field("entity", &self.entity)
            .finish_non_exhaustive()
    }
}
