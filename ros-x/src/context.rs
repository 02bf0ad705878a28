use std::sync::{Arc, atomic::AtomicUsize};

use tracing::debug;

use crate::Builder;
use crate::backend::{Backend, inproc::InprocBackend};
use crate::node::XNodeBuilder;

/// Process-wide monotonic id source for nodes, groups and endpoints.
#[derive(Debug, Default)]
pub struct GlobalCounter(AtomicUsize);

impl GlobalCounter {
    pub fn increment(&self) -> usize {
        self.0.fetch_add(1, std::sync::atomic::Ordering::AcqRel)
    }
}

#[derive(Default)]
pub struct XContextBuilder {
    backend: Option<Arc<dyn Backend>>,
}

impl XContextBuilder {
    /// Install the middleware backend every node of this context talks to.
    ///
    /// Without this, the context falls back to the in-process loopback
    /// backend, which is enough for tests and single-process pipelines.
    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }
}

impl Builder for XContextBuilder {
    type Output = XContext;

    fn build(self) -> crate::Result<XContext> {
        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(InprocBackend::default()));
        debug!("[CTX] context ready");
        Ok(XContext {
            backend,
            counter: Arc::new(GlobalCounter::default()),
        })
    }
}

/// Shared environment for a set of nodes: the backend plus the entity id
/// counter.
pub struct XContext {
    backend: Arc<dyn Backend>,
    counter: Arc<GlobalCounter>,
}

impl XContext {
    pub fn create_node<S: AsRef<str>>(&self, name: S) -> XNodeBuilder {
        XNodeBuilder {
            name: name.as_ref().to_owned(),
            namespace: "".to_string(),
            backend: self.backend.clone(),
            counter: self.counter.clone(),
        }
    }
}
