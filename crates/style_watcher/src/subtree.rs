//! One mutation observer per shadow tree, keyed by host.

use anyhow::{Error, anyhow};
use dom::{Document, MutationBatch, NodeId, ObserveOptions, ObserverId, shadow_hosts};
use log::{debug, warn};
use rustc_hash::FxHashMap;
use tokio::sync::mpsc::UnboundedSender;

/// Shadow-tree observers of one watcher generation. Every observer feeds the
/// same channel as the root observer, so all batches reach one reconciler.
#[derive(Debug)]
pub struct SubtreeObserverRegistry {
    entries: FxHashMap<NodeId, ObserverId>,
    options: ObserveOptions,
    sender: UnboundedSender<MutationBatch>,
}

impl SubtreeObserverRegistry {
    pub fn new(options: ObserveOptions, sender: UnboundedSender<MutationBatch>) -> Self {
        Self {
            entries: FxHashMap::default(),
            options,
            sender,
        }
    }

    /// Observe the shadow root of `host` unless it is already observed or
    /// `host` has no shadow root. Returns whether an observer was created.
    pub fn register_if_absent(&mut self, doc: &mut Document, host: NodeId) -> Result<bool, Error> {
        if self.entries.contains_key(&host) {
            return Ok(false);
        }
        let Some(shadow) = doc.shadow_root(host) else {
            return Ok(false);
        };
        let observer = doc
            .observe(shadow, self.options.clone(), self.sender.clone())
            .map_err(|err| anyhow!("Failed to observe shadow root of {host:?}: {err}"))?;
        self.entries.insert(host, observer);
        debug!("Observing shadow root of {host:?} ({} shadow observers)", self.entries.len());
        Ok(true)
    }

    /// Register every shadow host reachable from `node`, including nested ones.
    pub fn register_all(&mut self, doc: &mut Document, node: NodeId) -> usize {
        let mut registered = 0;
        for host in shadow_hosts(doc, node) {
            match self.register_if_absent(doc, host) {
                Ok(true) => registered += 1,
                Ok(false) => {}
                Err(err) => warn!("{err:#}"),
            }
        }
        registered
    }

    /// Disconnect observers whose host is no longer attached to the document.
    pub fn retire_disconnected(&mut self, doc: &mut Document) -> usize {
        let stale: Vec<NodeId> = self
            .entries
            .keys()
            .copied()
            .filter(|host| !doc.is_connected(*host))
            .collect();
        for host in &stale {
            if let Some(observer) = self.entries.remove(host) {
                doc.disconnect_observer(observer);
            }
        }
        if !stale.is_empty() {
            debug!("Retired {} shadow observers of detached hosts", stale.len());
        }
        stale.len()
    }

    pub fn teardown_all(&mut self, doc: &mut Document) {
        for (_, observer) in self.entries.drain() {
            doc.disconnect_observer(observer);
        }
    }

    pub fn observer_for(&self, host: NodeId) -> Option<ObserverId> {
        self.entries.get(&host).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WatchConfig;
    use tokio::sync::mpsc;

    fn registry() -> (SubtreeObserverRegistry, mpsc::UnboundedReceiver<MutationBatch>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            SubtreeObserverRegistry::new(WatchConfig::default().observe_options(), sender),
            receiver,
        )
    }

    #[test]
    fn registering_twice_keeps_one_observer() {
        let mut doc = Document::new();
        let host = doc.create_element("div");
        doc.append_child(doc.root(), host).unwrap();
        doc.attach_shadow(host).unwrap();
        let (mut registry, _batches) = registry();

        assert!(registry.register_if_absent(&mut doc, host).unwrap());
        assert!(!registry.register_if_absent(&mut doc, host).unwrap());
        let root = doc.root();
        assert_eq!(registry.register_all(&mut doc, root), 0);
        assert_eq!(registry.len(), 1);
        assert_eq!(doc.observer_count(), 1);
    }

    #[test]
    fn hosts_without_shadow_roots_are_skipped() {
        let mut doc = Document::new();
        let plain = doc.create_element("div");
        let (mut registry, _batches) = registry();
        assert!(!registry.register_if_absent(&mut doc, plain).unwrap());
        assert!(registry.is_empty());
    }

    #[test]
    fn shadow_mutations_reach_the_shared_channel() {
        let mut doc = Document::new();
        let host = doc.create_element("div");
        doc.append_child(doc.root(), host).unwrap();
        let shadow = doc.attach_shadow(host).unwrap();
        let (mut registry, mut batches) = registry();
        let root = doc.root();
        registry.register_all(&mut doc, root);

        let style = doc.create_element("style");
        doc.append_child(shadow, style).unwrap();
        doc.flush();
        assert_eq!(batches.try_recv().unwrap()[0].added_nodes, vec![style]);
    }

    #[test]
    fn detached_hosts_are_retired() {
        let mut doc = Document::new();
        let kept = doc.create_element("div");
        let dropped = doc.create_element("div");
        for host in [kept, dropped] {
            doc.append_child(doc.root(), host).unwrap();
            doc.attach_shadow(host).unwrap();
        }
        let (mut registry, _batches) = registry();
        let root = doc.root();
        assert_eq!(registry.register_all(&mut doc, root), 2);

        doc.remove(dropped);
        assert_eq!(registry.retire_disconnected(&mut doc), 1);
        assert!(registry.observer_for(dropped).is_none());
        assert!(registry.observer_for(kept).is_some());
        assert_eq!(doc.observer_count(), 1);

        registry.teardown_all(&mut doc);
        assert!(registry.is_empty());
        assert_eq!(doc.observer_count(), 0);
    }
}
