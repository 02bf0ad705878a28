//! The middleware abstraction layer.
//!
//! Everything that actually moves bytes lives behind the [`Backend`] trait:
//! ros-x creates wire-level publishers, subscriptions, clients and services
//! through it and wraps the returned opaque handles in entities. The crate
//! ships one implementation, the in-process [`inproc::InprocBackend`]
//! loopback; real deployments install their own via
//! [`XContextBuilder::with_backend`](crate::context::XContextBuilder::with_backend).

pub mod inproc;

use crate::entity::{EndpointEntity, GidArray, NodeEntity};

/// A delivered payload together with its attachment metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub payload: Vec<u8>,
    pub sequence_number: i64,
    pub source_timestamp: i64,
    pub source_gid: GidArray,
}

/// Opaque failure reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError(String);

impl BackendError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "backend error: {}", self.0)
    }
}

impl std::error::Error for BackendError {}

impl From<&str> for BackendError {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BackendError {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Opaque per-node state owned by the backend.
pub trait NodeHandle: Send + Sync {}

pub trait PublisherHandle: Send + Sync {
    /// Hand a serialized payload to the middleware.
    fn publish(&self, payload: &[u8]) -> BackendResult<()>;
}

pub trait SubscriptionHandle: Send + Sync {
    /// Non-blocking take of the next pending sample.
    fn take(&self) -> Option<Sample>;
}

pub trait ClientHandle: Send + Sync {
    /// Send a request payload; returns the assigned sequence number.
    fn send_request(&self, payload: &[u8]) -> BackendResult<i64>;
    /// Non-blocking take of the next pending response.
    fn take_response(&self) -> Option<Sample>;
}

pub trait ServiceHandle: Send + Sync {
    /// Non-blocking take of the next pending request.
    fn take_request(&self) -> Option<Sample>;
    /// Reply to a previously taken request.
    fn send_response(&self, request: &Sample, payload: &[u8]) -> BackendResult<()>;
}

/// Factory surface the node layer consumes.
///
/// All calls are synchronous and one-shot: they either return a live handle
/// or fail immediately. The endpoint descriptor carries the qualified
/// topic/service name, the resolved type description and the queue depth.
pub trait Backend: Send + Sync + 'static {
    fn create_node(&self, node: &NodeEntity) -> BackendResult<Box<dyn NodeHandle>>;

    fn create_publisher(
        &self,
        node: &dyn NodeHandle,
        entity: &EndpointEntity,
    ) -> BackendResult<Box<dyn PublisherHandle>>;

    fn create_subscription(
        &self,
        node: &dyn NodeHandle,
        entity: &EndpointEntity,
    ) -> BackendResult<Box<dyn SubscriptionHandle>>;

    fn create_client(
        &self,
        node: &dyn NodeHandle,
        entity: &EndpointEntity,
    ) -> BackendResult<Box<dyn ClientHandle>>;

    fn create_service(
        &self,
        node: &dyn NodeHandle,
        entity: &EndpointEntity,
    ) -> BackendResult<Box<dyn ServiceHandle>>;
}
