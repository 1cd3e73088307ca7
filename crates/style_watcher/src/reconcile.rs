//! Turning raw mutation batches into style diffs.

use crate::changes::{NodeSet, StyleChanges};
use crate::classifier::StyleClassifier;
use crate::config::WatchConfig;
use dom::{Document, MutationKind, MutationRecord, NodeId, for_each_shadow_host};
use log::trace;

/// Result of reconciling one batch.
#[derive(Clone, Debug, Default)]
pub struct Reconciliation {
    pub changes: StyleChanges,
    /// Added nodes that are attached to the document once the batch is applied.
    pub connected_additions: Vec<NodeId>,
}

/// Classifies the style resources touched by a mutation batch.
pub struct Reconciler<'cfg> {
    classifier: &'cfg dyn StyleClassifier,
    config: &'cfg WatchConfig,
}

impl<'cfg> Reconciler<'cfg> {
    pub fn new(classifier: &'cfg dyn StyleClassifier, config: &'cfg WatchConfig) -> Self {
        Self { classifier, config }
    }

    /// Reconcile `batch` against the current state of `doc`.
    ///
    /// Removed resources that are still connected are reported as moved.
    /// Attribute changes become updates unless the resource was removed, and a
    /// resource both moved and updated is reported as updated only. Added
    /// resources become creations unless already classified otherwise or no
    /// longer connected.
    pub fn reconcile(&self, doc: &Document, batch: &[MutationRecord]) -> Reconciliation {
        let mut additions = NodeSet::default();
        let mut deletions = NodeSet::default();
        let mut attribute_targets = NodeSet::default();
        for record in batch {
            additions.extend(record.added_nodes.iter().copied());
            deletions.extend(record.removed_nodes.iter().copied());
            if record.kind == MutationKind::Attributes
                && record
                    .attribute_name
                    .as_deref()
                    .is_some_and(|name| self.config.is_watched_attribute(name))
                && self.classifier.is_style_resource(doc, record.target)
            {
                attribute_targets.insert(record.target);
            }
        }

        let style_additions = self.styles_below(doc, additions.iter());
        let style_deletions = self.styles_below(doc, deletions.iter());

        let mut removed = NodeSet::default();
        let mut moved = NodeSet::default();
        for style in style_deletions.iter() {
            if doc.is_connected(style) {
                moved.insert(style);
            } else {
                removed.insert(style);
            }
        }

        let mut updated = NodeSet::default();
        for style in attribute_targets.iter() {
            if !removed.contains(style) {
                updated.insert(style);
                moved.remove(style);
            }
        }

        let mut created = NodeSet::default();
        for style in style_additions.iter() {
            let classified =
                removed.contains(style) || moved.contains(style) || updated.contains(style);
            if !classified && doc.is_connected(style) {
                created.insert(style);
            }
        }

        trace!(
            "Reconciled {} records: {} created, {} updated, {} removed, {} moved",
            batch.len(),
            created.len(),
            updated.len(),
            removed.len(),
            moved.len()
        );

        Reconciliation {
            changes: StyleChanges {
                created: created.into_vec(),
                updated: updated.into_vec(),
                removed: removed.into_vec(),
                moved: moved.into_vec(),
            },
            connected_additions: additions
                .iter()
                .filter(|node| doc.is_connected(*node))
                .collect(),
        }
    }

    /// Every style resource in or below `roots`, including those inside any
    /// shadow tree reachable from them.
    pub fn collect_styles<I>(&self, doc: &Document, roots: I) -> Vec<NodeId>
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.styles_below(doc, roots).into_vec()
    }

    fn styles_below<I>(&self, doc: &Document, roots: I) -> NodeSet
    where
        I: IntoIterator<Item = NodeId>,
    {
        let mut styles = NodeSet::default();
        for root in roots {
            self.styles_within(doc, root, &mut styles);
            for_each_shadow_host(doc, root, &mut |host| {
                if let Some(shadow) = doc.shadow_root(host) {
                    self.styles_within(doc, shadow, &mut styles);
                }
            });
        }
        styles
    }

    fn styles_within(&self, doc: &Document, root: NodeId, out: &mut NodeSet) {
        for node in doc.descendants(root) {
            if self.classifier.is_style_resource(doc, node) {
                out.insert(node);
            }
        }
    }
}
