use std::fmt::Display;
use std::sync::Arc;

use sha2::Digest;

use crate::pubsub::{PubImpl, SubImpl};
use crate::service::{ClientImpl, ServerImpl};
use crate::timer::TimerImpl;

const EMPTY_NAMESPACE: &str = "%";
const EMPTY_TYPE: &str = "EMPTY_TYPE";
pub const ENTITY_SPACE: &str = "@rosx";

pub const GID_STORAGE_SIZE: usize = 16;

pub type GidArray = [u8; GID_STORAGE_SIZE];

#[derive(Default, Debug, Hash, strum::Display, Eq, PartialEq, Clone, Copy)]
pub enum EntityKind {
    #[default]
    #[strum(serialize = "NN")]
    Node,
    #[strum(serialize = "MP")]
    Publisher,
    #[strum(serialize = "MS")]
    Subscription,
    #[strum(serialize = "WT")]
    Timer,
    #[strum(serialize = "SS")]
    Service,
    #[strum(serialize = "SC")]
    Client,
}

impl EntityKind {
    /// Human-readable label for error messages and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Publisher => "publisher",
            Self::Subscription => "subscription",
            Self::Timer => "timer",
            Self::Service => "service",
            Self::Client => "client",
        }
    }
}

#[derive(Default, Debug, Hash, Clone, PartialEq, Eq)]
pub struct NodeEntity {
    pub id: usize,
    pub name: String,
    pub namespace: String,
}

impl NodeEntity {
    pub fn new(id: usize, name: String, namespace: String) -> Self {
        Self { id, name, namespace }
    }
}

impl Display for NodeEntity {
    // <ENTITY_SPACE>/<node_id>/<node_id>/<entity_kind>/<namespace>/<node_name>
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self { id, name, namespace } = self;
        let namespace = if namespace.is_empty() {
            EMPTY_NAMESPACE
        } else {
            namespace
        };
        let kind = EntityKind::Node;
        write!(f, "{ENTITY_SPACE}/{id}/{id}/{kind}/{namespace}/{name}")
    }
}

#[derive(Debug, Hash, PartialEq, Eq, Clone)]
pub struct TypeHash {
    pub version: u8,
    pub value: [u8; 32],
}

impl TypeHash {
    pub fn new(version: u8, value: [u8; 32]) -> Self {
        Self { version, value }
    }

    pub fn zero() -> Self {
        Self::new(1, [0u8; 32])
    }

    pub fn to_rihs_string(&self) -> String {
        let hex: String = self.value.iter().map(|b| format!("{:02x}", b)).collect();
        format!("RIHS{:02}_{hex}", self.version)
    }
}

impl Display for TypeHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_rihs_string())
    }
}

#[derive(Debug, Hash, PartialEq, Eq, Clone)]
pub struct TypeInfo {
    pub name: String,
    pub hash: TypeHash,
}

impl TypeInfo {
    pub fn new(name: &str, hash: TypeHash) -> Self {
        TypeInfo {
            name: name.to_string(),
            hash,
        }
    }
}

impl Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self { name, hash } = self;
        write!(f, "{name}/{}", hash.to_rihs_string())
    }
}

pub type Topic = String;

/// Descriptor of a non-node entity: who owns it, what it is, where it talks.
#[derive(Default, Debug, Hash, PartialEq, Eq, Clone)]
pub struct EndpointEntity {
    pub id: usize,
    pub node: NodeEntity,
    pub kind: EntityKind,
    pub topic: Topic,
    pub type_info: Option<TypeInfo>,
    pub queue_depth: usize,
}

impl Display for EndpointEntity {
    // <ENTITY_SPACE>/<node_id>/<eid>/<entity_kind>/<namespace>/<node_name>/<topic>/<type_info>/<queue_depth>
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self {
            id,
            node,
            kind,
            topic,
            type_info,
            queue_depth,
        } = self;
        let namespace = if node.namespace.is_empty() {
            EMPTY_NAMESPACE
        } else {
            &node.namespace
        };
        let type_info = type_info
            .as_ref()
            .map_or(EMPTY_TYPE.to_string(), |x| x.to_string());
        write!(
            f,
            "{ENTITY_SPACE}/{}/{id}/{kind}/{namespace}/{}/{topic}/{type_info}/{queue_depth}",
            node.id, node.name,
        )
    }
}

impl EndpointEntity {
    /// Stable 16-byte identity derived from the entity's display key.
    pub fn gid(&self) -> GidArray {
        let mut gid = GidArray::default();
        let hash = sha2::Sha256::digest(self.to_string().as_bytes());
        let len = gid.len();
        gid.copy_from_slice(&hash[..len]);
        gid
    }
}

/// A live entity handle, tagged by kind.
///
/// Callback groups store these; the creator keeps the typed wrapper
/// (`XPub<T>`, `XSub<T>`, ...) which shares the same inner allocation.
#[derive(Clone)]
pub enum Entity {
    Publisher(Arc<PubImpl>),
    Subscription(Arc<SubImpl>),
    Timer(Arc<TimerImpl>),
    Client(Arc<ClientImpl>),
    Service(Arc<ServerImpl>),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Publisher(_) => EntityKind::Publisher,
            Self::Subscription(_) => EntityKind::Subscription,
            Self::Timer(_) => EntityKind::Timer,
            Self::Client(_) => EntityKind::Client,
            Self::Service(_) => EntityKind::Service,
        }
    }

    /// The entity's counter-issued id.
    pub fn id(&self) -> usize {
        match self {
            Self::Publisher(x) => x.entity().id,
            Self::Subscription(x) => x.entity().id,
            Self::Timer(x) => x.id(),
            Self::Client(x) => x.entity().id,
            Self::Service(x) => x.entity().id,
        }
    }

    /// Endpoint descriptor, if this entity has one (timers do not).
    pub fn endpoint(&self) -> Option<&EndpointEntity> {
        match self {
            Self::Publisher(x) => Some(x.entity()),
            Self::Subscription(x) => Some(x.entity()),
            Self::Timer(_) => None,
            Self::Client(x) => Some(x.entity()),
            Self::Service(x) => Some(x.entity()),
        }
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("kind", &self.kind())
            .field("id", &self.id())
            .finish()
    }
}
