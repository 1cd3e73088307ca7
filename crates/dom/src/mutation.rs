//! Mutation records and the observer registrations that collect them.

use indextree::NodeId;
use log::{trace, warn};
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;

/// Records delivered together at one flush.
pub type MutationBatch = Vec<MutationRecord>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MutationKind {
    ChildList,
    Attributes,
}

/// One observed change. Child-list records carry added or removed nodes;
/// attribute records carry the (lowercase) attribute name.
#[derive(Clone, Debug)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
    pub attribute_name: Option<String>,
    pub observed_at: Instant,
}

impl MutationRecord {
    pub fn child_list(target: NodeId, added_nodes: Vec<NodeId>, removed_nodes: Vec<NodeId>) -> Self {
        Self {
            kind: MutationKind::ChildList,
            target,
            added_nodes,
            removed_nodes,
            attribute_name: None,
            observed_at: Instant::now(),
        }
    }

    pub fn attributes(target: NodeId, name: &str) -> Self {
        Self {
            kind: MutationKind::Attributes,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            attribute_name: Some(name.to_ascii_lowercase()),
            observed_at: Instant::now(),
        }
    }
}

/// What an observer wants to see, mirroring `MutationObserverInit`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub subtree: bool,
    pub attributes: bool,
    /// When set, only attribute records for these names are delivered.
    pub attribute_filter: Option<Vec<String>>,
}

impl ObserveOptions {
    fn accepts(&self, record: &MutationRecord) -> bool {
        match record.kind {
            MutationKind::ChildList => self.child_list,
            MutationKind::Attributes => {
                self.attributes
                    && match (&self.attribute_filter, &record.attribute_name) {
                        (None, _) => true,
                        (Some(filter), Some(name)) => {
                            filter.iter().any(|wanted| wanted.eq_ignore_ascii_case(name))
                        }
                        (Some(_), None) => false,
                    }
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u64);

#[derive(Debug)]
struct Registration {
    id: ObserverId,
    target: NodeId,
    options: ObserveOptions,
    sender: UnboundedSender<MutationBatch>,
    pending: MutationBatch,
}

/// All live observers of one document.
#[derive(Debug, Default)]
pub(crate) struct ObserverList {
    next_id: u64,
    registrations: Vec<Registration>,
}

impl ObserverList {
    pub(crate) fn register(
        &mut self,
        target: NodeId,
        options: ObserveOptions,
        sender: UnboundedSender<MutationBatch>,
    ) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId(self.next_id);
        self.registrations.push(Registration {
            id,
            target,
            options,
            sender,
            pending: Vec::new(),
        });
        id
    }

    /// Drop a registration together with any records it has not yet delivered.
    pub(crate) fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|registration| registration.id != id);
        self.registrations.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.registrations.len()
    }

    pub(crate) fn contains(&self, id: ObserverId) -> bool {
        self.registrations.iter().any(|registration| registration.id == id)
    }

    /// Queue `record` for every interested observer. `path` lists the record
    /// target followed by its ancestors within the same tree.
    pub(crate) fn enqueue(&mut self, record: &MutationRecord, path: &[NodeId]) {
        for registration in &mut self.registrations {
            let Some(depth) = path.iter().position(|node| *node == registration.target) else {
                continue;
            };
            if depth > 0 && !registration.options.subtree {
                continue;
            }
            if registration.options.accepts(record) {
                registration.pending.push(record.clone());
            }
        }
    }

    /// Hand every non-empty queue to its observer as one batch.
    pub(crate) fn flush(&mut self) -> usize {
        let mut delivered = 0;
        for registration in &mut self.registrations {
            if registration.pending.is_empty() {
                continue;
            }
            let batch = core::mem::take(&mut registration.pending);
            trace!(
                "Delivering {} mutation records to observer {:?}",
                batch.len(),
                registration.id
            );
            if registration.sender.send(batch).is_err() {
                warn!(
                    "Observer {:?} has no receiver left; dropping its batch",
                    registration.id
                );
            } else {
                delivered += 1;
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indextree::Arena;
    use tokio::sync::mpsc;

    fn three_nodes() -> (NodeId, NodeId, NodeId) {
        let mut arena: Arena<()> = Arena::new();
        (arena.new_node(()), arena.new_node(()), arena.new_node(()))
    }

    #[test]
    fn attribute_filter_limits_delivery() {
        let (root, child, _) = three_nodes();
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let mut observers = ObserverList::default();
        observers.register(
            root,
            ObserveOptions {
                attributes: true,
                subtree: true,
                attribute_filter: Some(vec!["rel".to_owned()]),
                ..ObserveOptions::default()
            },
            sender,
        );

        observers.enqueue(&MutationRecord::attributes(child, "id"), &[child, root]);
        observers.enqueue(&MutationRecord::attributes(child, "REL"), &[child, root]);
        assert_eq!(observers.flush(), 1);
        let batch = receiver.try_recv().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].attribute_name.as_deref(), Some("rel"));
    }

    #[test]
    fn non_subtree_observer_ignores_descendants() {
        let (root, child, grandchild) = three_nodes();
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let mut observers = ObserverList::default();
        observers.register(
            root,
            ObserveOptions { child_list: true, ..ObserveOptions::default() },
            sender,
        );

        let nested = MutationRecord::child_list(child, vec![grandchild], Vec::new());
        observers.enqueue(&nested, &[child, root]);
        assert_eq!(observers.flush(), 0);

        let direct = MutationRecord::child_list(root, vec![child], Vec::new());
        observers.enqueue(&direct, &[root]);
        assert_eq!(observers.flush(), 1);
        assert_eq!(receiver.try_recv().unwrap()[0].added_nodes, vec![child]);
    }

    #[test]
    fn removed_observer_loses_pending_records() {
        let (root, child, _) = three_nodes();
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let mut observers = ObserverList::default();
        let id = observers.register(
            root,
            ObserveOptions { child_list: true, ..ObserveOptions::default() },
            sender,
        );
        observers.enqueue(&MutationRecord::child_list(root, vec![child], Vec::new()), &[root]);
        assert!(observers.remove(id));
        assert!(!observers.remove(id));
        assert_eq!(observers.flush(), 0);
        assert!(receiver.try_recv().is_err());
    }
}
