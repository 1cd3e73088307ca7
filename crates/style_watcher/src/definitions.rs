//! Waiting for custom elements to become defined.

use crate::changes::NodeSet;
use dom::{Document, NodeId, SharedDocument};
use log::{debug, trace};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;

/// Groups undefined custom elements by tag and reports each tag once its
/// definition lands.
///
/// Every tag gets one waiting task: it awaits the registry's defined-signal,
/// or polls the first element of the group once per animation frame when the
/// signal is unavailable. Resolved tags are sent on the `resolved` channel;
/// the owner then calls [`DefinitionTracker::resolve`] to take the group.
/// All waits share one cancellation signal, flipped by
/// [`DefinitionTracker::unsubscribe`].
#[derive(Debug)]
pub struct DefinitionTracker {
    document: SharedDocument,
    handle: Handle,
    groups: FxHashMap<String, NodeSet>,
    resolved: UnboundedSender<String>,
    cancel: watch::Sender<bool>,
    prefer_platform: bool,
    subscribed: bool,
}

impl DefinitionTracker {
    pub fn new(
        document: SharedDocument,
        handle: Handle,
        prefer_platform: bool,
        resolved: UnboundedSender<String>,
    ) -> Self {
        Self {
            document,
            handle,
            groups: FxHashMap::default(),
            resolved,
            cancel: watch::channel(false).0,
            prefer_platform,
            subscribed: true,
        }
    }

    /// Collect undefined elements in `root` and below (same tree). A tag seen
    /// for the first time starts a wait. Returns how many elements were added.
    pub fn track(&mut self, doc: &mut Document, root: NodeId) -> usize {
        if !self.subscribed {
            return 0;
        }
        let mut added = 0;
        for node in doc.descendants(root) {
            if doc.is_defined(node) {
                continue;
            }
            let Some(tag) = doc.tag_name(node).map(str::to_owned) else {
                continue;
            };
            if let Some(group) = self.groups.get_mut(&tag) {
                if group.insert(node) {
                    added += 1;
                }
                continue;
            }
            let mut group = NodeSet::default();
            group.insert(node);
            self.groups.insert(tag.clone(), group);
            debug!("Waiting for <{tag}> to be defined");
            self.spawn_wait(doc, tag, node);
            added += 1;
        }
        added
    }

    /// Take the pending group for a resolved tag. `None` once unsubscribed or
    /// when the group was already delivered.
    pub fn resolve(&mut self, tag: &str) -> Option<Vec<NodeId>> {
        if !self.subscribed {
            return None;
        }
        self.groups.remove(tag).map(NodeSet::into_vec)
    }

    /// Drop every pending group and stop all waits. Waits that already
    /// reported their tag resolve to nothing.
    pub fn unsubscribe(&mut self) {
        self.subscribed = false;
        self.groups.clear();
        self.cancel.send_replace(true);
    }

    pub fn pending_tags(&self) -> usize {
        self.groups.len()
    }

    pub fn is_pending(&self, tag: &str) -> bool {
        self.groups.contains_key(&tag.to_ascii_lowercase())
    }

    fn spawn_wait(&self, doc: &mut Document, tag: String, sample: NodeId) {
        let resolved = self.resolved.clone();
        let mut cancelled = self.cancel.subscribe();
        let signal = if self.prefer_platform {
            doc.custom_elements_mut().when_defined(&tag)
        } else {
            None
        };

        if let Some(mut signal) = signal {
            self.handle.spawn(async move {
                let defined = tokio::select! {
                    biased;
                    _ = wait_until_set(&mut cancelled) => false,
                    defined = wait_until_set(&mut signal) => defined,
                };
                if defined && resolved.send(tag).is_err() {
                    trace!("Definition resolved after its watcher went away");
                }
            });
            return;
        }

        let mut frames = doc.frames().subscribe();
        let document = Arc::clone(&self.document);
        self.handle.spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = wait_until_set(&mut cancelled) => return,
                    tick = frames.changed() => {
                        if tick.is_err() {
                            return;
                        }
                    }
                }
                let defined = document.lock().is_defined(sample);
                if defined {
                    if resolved.send(tag).is_err() {
                        trace!("Definition resolved after its watcher went away");
                    }
                    return;
                }
            }
        });
    }
}

/// Resolves with true once the flag is set, or false if its sender is gone.
async fn wait_until_set(flag: &mut watch::Receiver<bool>) -> bool {
    loop {
        if *flag.borrow_and_update() {
            return true;
        }
        if flag.changed().await.is_err() {
            return false;
        }
    }
}
