//! In-process loopback backend.
//!
//! Publications are fanned out to subscription queues (depth-bounded,
//! drop-oldest) and requests are routed to the single live server per
//! service name, with responses routed back by the requester's gid.
//! Everything stays inside the process; this is plumbing, not a transport.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::entity::{EndpointEntity, GidArray, NodeEntity, Topic};
use crate::queue::BoundedQueue;

use super::{
    Backend, BackendResult, ClientHandle, NodeHandle, PublisherHandle, Sample, ServiceHandle,
    SubscriptionHandle,
};

fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or_default()
}

struct ServiceEntry {
    gid: GidArray,
    tx: flume::Sender<Sample>,
}

#[derive(Default)]
struct Router {
    topics: Mutex<HashMap<Topic, Vec<Weak<BoundedQueue<Sample>>>>>,
    services: Mutex<HashMap<Topic, ServiceEntry>>,
    clients: Mutex<HashMap<GidArray, flume::Sender<Sample>>>,
}

impl Router {
    /// Fan a sample out to every live subscription queue on `topic`,
    /// pruning queues whose subscription has been dropped.
    fn route_publication(&self, topic: &str, sample: Sample) {
        let mut topics = self.topics.lock();
        let Some(queues) = topics.get_mut(topic) else {
            return;
        };
        queues.retain(|weak| match weak.upgrade() {
            Some(queue) => {
                if queue.push(sample.clone()) {
                    trace!("[INPROC] queue full on {topic}, oldest sample dropped");
                }
                true
            }
            None => false,
        });
        if queues.is_empty() {
            topics.remove(topic);
        }
    }
}

#[derive(Default)]
pub struct InprocBackend {
    router: Arc<Router>,
    nodes: AtomicUsize,
}

struct InprocNode {
    _id: usize,
}

impl NodeHandle for InprocNode {}

struct InprocPublisher {
    topic: Topic,
    gid: GidArray,
    sn: AtomicUsize,
    router: Arc<Router>,
}

impl PublisherHandle for InprocPublisher {
    fn publish(&self, payload: &[u8]) -> BackendResult<()> {
        let sample = Sample {
            payload: payload.to_vec(),
            sequence_number: self.sn.fetch_add(1, Ordering::AcqRel) as i64,
            source_timestamp: now_nanos(),
            source_gid: self.gid,
        };
        self.router.route_publication(&self.topic, sample);
        Ok(())
    }
}

struct InprocSubscription {
    queue: Arc<BoundedQueue<Sample>>,
}

impl SubscriptionHandle for InprocSubscription {
    fn take(&self) -> Option<Sample> {
        self.queue.try_recv()
    }
}

struct InprocClient {
    service: Topic,
    gid: GidArray,
    sn: AtomicUsize,
    rx: flume::Receiver<Sample>,
    router: Arc<Router>,
}

impl ClientHandle for InprocClient {
    fn send_request(&self, payload: &[u8]) -> BackendResult<i64> {
        let services = self.router.services.lock();
        let entry = services
            .get(&self.service)
            .filter(|e| !e.tx.is_disconnected())
            .ok_or_else(|| format!("service unavailable: {}", self.service))?;
        let sequence_number = self.sn.fetch_add(1, Ordering::AcqRel) as i64;
        entry
            .tx
            .send(Sample {
                payload: payload.to_vec(),
                sequence_number,
                source_timestamp: now_nanos(),
                source_gid: self.gid,
            })
            .map_err(|_| format!("service dropped: {}", self.service))?;
        Ok(sequence_number)
    }

    fn take_response(&self) -> Option<Sample> {
        self.rx.try_recv().ok()
    }
}

impl Drop for InprocClient {
    fn drop(&mut self) {
        self.router.clients.lock().remove(&self.gid);
    }
}

struct InprocService {
    name: Topic,
    gid: GidArray,
    rx: flume::Receiver<Sample>,
    router: Arc<Router>,
}

impl ServiceHandle for InprocService {
    fn take_request(&self) -> Option<Sample> {
        self.rx.try_recv().ok()
    }

    fn send_response(&self, request: &Sample, payload: &[u8]) -> BackendResult<()> {
        let clients = self.router.clients.lock();
        let tx = clients
            .get(&request.source_gid)
            .ok_or("requesting client no longer exists")?;
        tx.send(Sample {
            payload: payload.to_vec(),
            sequence_number: request.sequence_number,
            source_timestamp: now_nanos(),
            source_gid: self.gid,
        })
        .map_err(|_| "requesting client no longer exists")?;
        Ok(())
    }
}

impl Drop for InprocService {
    fn drop(&mut self) {
        let mut services = self.router.services.lock();
        if services.get(&self.name).is_some_and(|e| e.gid == self.gid) {
            services.remove(&self.name);
        }
    }
}

impl Backend for InprocBackend {
    fn create_node(&self, node: &NodeEntity) -> BackendResult<Box<dyn NodeHandle>> {
        self.nodes.fetch_add(1, Ordering::AcqRel);
        debug!("[INPROC] node registered: {node}");
        Ok(Box::new(InprocNode { _id: node.id }))
    }

    fn create_publisher(
        &self,
        _node: &dyn NodeHandle,
        entity: &EndpointEntity,
    ) -> BackendResult<Box<dyn PublisherHandle>> {
        if entity.topic.is_empty() {
            return Err("empty topic".into());
        }
        Ok(Box::new(InprocPublisher {
            topic: entity.topic.clone(),
            gid: entity.gid(),
            sn: AtomicUsize::new(0),
            router: self.router.clone(),
        }))
    }

    fn create_subscription(
        &self,
        _node: &dyn NodeHandle,
        entity: &EndpointEntity,
    ) -> BackendResult<Box<dyn SubscriptionHandle>> {
        if entity.topic.is_empty() {
            return Err("empty topic".into());
        }
        if entity.queue_depth == 0 {
            return Err("queue depth must be nonzero".into());
        }
        let queue = Arc::new(BoundedQueue::new(entity.queue_depth));
        self.router
            .topics
            .lock()
            .entry(entity.topic.clone())
            .or_default()
            .push(Arc::downgrade(&queue));
        Ok(Box::new(InprocSubscription { queue }))
    }

    fn create_client(
        &self,
        _node: &dyn NodeHandle,
        entity: &EndpointEntity,
    ) -> BackendResult<Box<dyn ClientHandle>> {
        if entity.topic.is_empty() {
            return Err("empty service name".into());
        }
        let gid = entity.gid();
        let (tx, rx) = flume::unbounded();
        self.router.clients.lock().insert(gid, tx);
        Ok(Box::new(InprocClient {
            service: entity.topic.clone(),
            gid,
            // Sequence numbers start at 1 for ROS compatibility.
            sn: AtomicUsize::new(1),
            rx,
            router: self.router.clone(),
        }))
    }

    fn create_service(
        &self,
        _node: &dyn NodeHandle,
        entity: &EndpointEntity,
    ) -> BackendResult<Box<dyn ServiceHandle>> {
        if entity.topic.is_empty() {
            return Err("empty service name".into());
        }
        let gid = entity.gid();
        let (tx, rx) = flume::unbounded();
        let mut services = self.router.services.lock();
        if services
            .get(&entity.topic)
            .is_some_and(|e| !e.tx.is_disconnected())
        {
            return Err(format!("service already registered: {}", entity.topic).into());
        }
        services.insert(entity.topic.clone(), ServiceEntry { gid, tx });
        Ok(Box::new(InprocService {
            name: entity.topic.clone(),
            gid,
            rx,
            router: self.router.clone(),
        }))
    }
}
