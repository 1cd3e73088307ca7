use anyhow::Error;
use dom::NodeId;
use rustc_hash::FxHashSet;

/// Which bucket of a [`StyleChanges`] a resource landed in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Removed,
    Moved,
}

/// Diff produced for one mutation batch. The four lists are disjoint and keep
/// first-seen order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StyleChanges {
    pub created: Vec<NodeId>,
    pub updated: Vec<NodeId>,
    pub removed: Vec<NodeId>,
    /// Re-parented resources: still present, not to be treated as new.
    pub moved: Vec<NodeId>,
}

impl StyleChanges {
    /// Synthetic diff reporting only creations.
    pub fn created(created: Vec<NodeId>) -> Self {
        Self {
            created,
            ..Self::default()
        }
    }

    /// Moves alone are informational and do not warrant a notification.
    pub fn needs_notification(&self) -> bool {
        !(self.created.is_empty() && self.updated.is_empty() && self.removed.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        !self.needs_notification() && self.moved.is_empty()
    }

    pub fn kind_of(&self, node: NodeId) -> Option<ChangeKind> {
        [
            (&self.created, ChangeKind::Created),
            (&self.updated, ChangeKind::Updated),
            (&self.removed, ChangeKind::Removed),
            (&self.moved, ChangeKind::Moved),
        ]
        .into_iter()
        .find(|(nodes, _)| nodes.contains(&node))
        .map(|(_, kind)| kind)
    }
}

/// Consumer of style diffs. Errors are logged by the watcher and never stop it.
pub trait StyleChangeSubscriber: Send {
    fn on_change(&mut self, changes: StyleChanges) -> Result<(), Error>;
}

impl<F> StyleChangeSubscriber for F
where
    F: FnMut(StyleChanges) -> Result<(), Error> + Send,
{
    fn on_change(&mut self, changes: StyleChanges) -> Result<(), Error> {
        self(changes)
    }
}

/// Insertion-ordered set of nodes.
#[derive(Clone, Debug, Default)]
pub(crate) struct NodeSet {
    order: Vec<NodeId>,
    seen: FxHashSet<NodeId>,
}

impl NodeSet {
    pub(crate) fn insert(&mut self, node: NodeId) -> bool {
        let fresh = self.seen.insert(node);
        if fresh {
            self.order.push(node);
        }
        fresh
    }

    pub(crate) fn remove(&mut self, node: NodeId) -> bool {
        let present = self.seen.remove(&node);
        if present {
            self.order.retain(|existing| *existing != node);
        }
        present
    }

    pub(crate) fn contains(&self, node: NodeId) -> bool {
        self.seen.contains(&node)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.order.iter().copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn into_vec(self) -> Vec<NodeId> {
        self.order
    }
}

impl Extend<NodeId> for NodeSet {
    fn extend<I: IntoIterator<Item = NodeId>>(&mut self, iter: I) {
        for node in iter {
            self.insert(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::Document;

    #[test]
    fn node_set_keeps_first_seen_order() {
        let mut doc = Document::new();
        let first = doc.create_element("style");
        let second = doc.create_element("link");
        let mut set = NodeSet::default();
        set.extend([second, first, second]);
        assert_eq!(set.len(), 2);
        assert!(set.remove(second));
        assert!(!set.contains(second));
        set.insert(second);
        assert_eq!(set.into_vec(), vec![first, second]);
    }

    #[test]
    fn moved_only_diff_is_silent() {
        let mut doc = Document::new();
        let link = doc.create_element("link");
        let changes = StyleChanges {
            moved: vec![link],
            ..StyleChanges::default()
        };
        assert!(!changes.needs_notification());
        assert!(!changes.is_empty());
        assert_eq!(changes.kind_of(link), Some(ChangeKind::Moved));
        assert!(StyleChanges::created(vec![link]).needs_notification());
    }
}
