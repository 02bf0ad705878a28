//! Dispatch partitions for entities.
//!
//! A callback group is a named partition an external scheduler uses to
//! decide which callbacks may run concurrently. This layer only manages
//! membership; the dispatch loop itself lives outside the crate.

use parking_lot::Mutex;

use crate::entity::Entity;

/// Dispatch discipline of a group.
#[derive(Debug, Default, Hash, PartialEq, Eq, Clone, Copy, strum::Display)]
pub enum GroupKind {
    /// Callbacks of this group never run concurrently with each other.
    #[default]
    MutuallyExclusive,
    /// Callbacks of this group may be dispatched concurrently.
    Reentrant,
}

/// A partition of entities sharing a dispatch discipline.
///
/// Groups are created only through
/// [`XNode::create_callback_group`](crate::node::XNode::create_callback_group).
/// Equality for membership checks is identity, not value: the node compares
/// the `Arc` allocation, and the counter-issued `id` gives a stable printable
/// token for the same identity.
pub struct CallbackGroup {
    id: usize,
    kind: GroupKind,
    members: Mutex<Vec<Entity>>,
}

impl CallbackGroup {
    pub(crate) fn new(id: usize, kind: GroupKind) -> Self {
        Self {
            id,
            kind,
            members: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    /// Entities are registered exactly once, at creation time; they are
    /// never re-assigned to another group afterwards.
    pub(crate) fn add_entity(&self, entity: Entity) {
        self.members.lock().push(entity);
    }

    /// Snapshot of the current members.
    pub fn members(&self) -> Vec<Entity> {
        self.members.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }
}

impl std::fmt::Debug for CallbackGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackGroup")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("members", &self.members.lock().len())
            .finish()
    }
}
