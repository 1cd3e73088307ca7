use crate::custom_elements::CustomElementRegistry;
use crate::frame::FrameClock;
use crate::mutation::{MutationBatch, MutationRecord, ObserveOptions, ObserverId, ObserverList};
use crate::node::{ElementData, NodeKind, is_custom_element_name};
use anyhow::{Error, anyhow, bail};
use indextree::{Arena, NodeId};
use log::{debug, trace};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// A document shared between the code mutating it and the observers reading it.
pub type SharedDocument = Arc<Mutex<Document>>;

/// Arena-backed document tree.
///
/// Nodes are never freed: a removed node stays in the arena, detached, with
/// its own subtree intact, so observers can still inspect what was removed.
#[derive(Debug)]
pub struct Document {
    arena: Arena<NodeKind>,
    root: NodeId,
    custom_elements: CustomElementRegistry,
    /// Custom-element tag -> every element created with it.
    elements_by_tag: HashMap<String, Vec<NodeId>>,
    observers: ObserverList,
    frames: FrameClock,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(NodeKind::Document);
        Self {
            arena,
            root,
            custom_elements: CustomElementRegistry::default(),
            elements_by_tag: HashMap::new(),
            observers: ObserverList::default(),
            frames: FrameClock::new(),
        }
    }

    pub fn into_shared(self) -> SharedDocument {
        Arc::new(Mutex::new(self))
    }

    /// The document node itself.
    pub const fn root(&self) -> NodeId {
        self.root
    }

    pub fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.arena.get(node).map(indextree::Node::get)
    }

    pub fn element(&self, node: NodeId) -> Option<&ElementData> {
        match self.kind(node)? {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Result<&mut ElementData, Error> {
        match self.arena.get_mut(node).map(indextree::Node::get_mut) {
            Some(NodeKind::Element(data)) => Ok(data),
            Some(_) => Err(anyhow!("Node {node:?} is not an element")),
            None => Err(anyhow!("Unknown node {node:?}")),
        }
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.element(node).is_some()
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|data| data.tag.as_str())
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?.attribute(name)
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element(node).is_some_and(|data| data.has_class(class))
    }

    pub fn shadow_root(&self, node: NodeId) -> Option<NodeId> {
        self.element(node)?.shadow_root
    }

    pub fn shadow_host(&self, node: NodeId) -> Option<NodeId> {
        match self.kind(node)? {
            NodeKind::ShadowRoot { host } => Some(*host),
            _ => None,
        }
    }

    /// Non-elements are always defined.
    pub fn is_defined(&self, node: NodeId) -> bool {
        self.element(node).is_none_or(|data| data.defined)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.arena.get(node)?.parent()
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        if self.arena.get(node).is_none() {
            return Vec::new();
        }
        node.children(&self.arena).collect()
    }

    /// `node` and everything below it in the same tree, in document order.
    /// Shadow trees of descendants are not entered.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        if self.arena.get(node).is_none() {
            return Vec::new();
        }
        node.descendants(&self.arena).collect()
    }

    /// Whether `node` is reachable from the document, crossing from shadow
    /// roots to their hosts.
    pub fn is_connected(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if self.arena.get(current).is_none() {
                return false;
            }
            let Some(top) = current.ancestors(&self.arena).last() else {
                return false;
            };
            match self.kind(top) {
                Some(NodeKind::Document) => return top == self.root,
                Some(NodeKind::ShadowRoot { host }) => current = *host,
                _ => return false,
            }
        }
    }

    /// Inclusive ancestors of `node`, continuing through shadow hosts.
    fn composed_ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            if self.arena.get(id).is_none() {
                break;
            }
            out.extend(id.ancestors(&self.arena));
            current = out.last().and_then(|top| self.shadow_host(*top));
        }
        out
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let tag_lc = tag.to_ascii_lowercase();
        let custom = is_custom_element_name(&tag_lc);
        let defined = !custom || self.custom_elements.is_defined(&tag_lc);
        let node = self
            .arena
            .new_node(NodeKind::Element(ElementData::new(&tag_lc, defined)));
        if custom {
            self.elements_by_tag.entry(tag_lc).or_default().push(node);
        }
        node
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.arena.new_node(NodeKind::Text {
            text: text.to_owned(),
        })
    }

    /// Attach an isolated subtree root to `host`. Queues no mutation record.
    pub fn attach_shadow(&mut self, host: NodeId) -> Result<NodeId, Error> {
        if self.element_mut(host)?.shadow_root.is_some() {
            bail!("Element {host:?} already hosts a shadow root");
        }
        let shadow = self.arena.new_node(NodeKind::ShadowRoot { host });
        self.element_mut(host)?.shadow_root = Some(shadow);
        debug!("Attached shadow root {shadow:?} to {host:?}");
        Ok(shadow)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` under `parent` before `reference` (or last). A child that
    /// already has a parent is removed from it first, queueing its own record.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), Error> {
        match self.kind(parent) {
            Some(kind) if kind.is_container() => {}
            Some(_) => bail!("Node {parent:?} cannot have children"),
            None => bail!("Unknown parent node {parent:?}"),
        }
        match self.kind(child) {
            Some(NodeKind::Element(_) | NodeKind::Text { .. }) => {}
            Some(_) => bail!("Node {child:?} cannot be inserted"),
            None => bail!("Unknown child node {child:?}"),
        }
        if self.composed_ancestors(parent).contains(&child) {
            bail!("Inserting {child:?} under {parent:?} would create a cycle");
        }
        let reference = if reference == Some(child) {
            self.arena.get(child).and_then(indextree::Node::next_sibling)
        } else {
            reference
        };
        if let Some(sibling) = reference {
            if self.parent(sibling) != Some(parent) {
                bail!("Reference node {sibling:?} is not a child of {parent:?}");
            }
        }

        self.detach_with_record(child);
        let inserted = match reference {
            Some(sibling) => sibling.checked_insert_before(child, &mut self.arena),
            None => parent.checked_append(child, &mut self.arena),
        };
        inserted.map_err(|err| anyhow!("Failed to insert {child:?} under {parent:?}: {err:?}"))?;
        self.queue_record(MutationRecord::child_list(parent, vec![child], Vec::new()));
        Ok(())
    }

    /// Detach `node` from its parent. Returns false if it had none.
    pub fn remove(&mut self, node: NodeId) -> bool {
        self.detach_with_record(node)
    }

    fn detach_with_record(&mut self, node: NodeId) -> bool {
        let Some(parent) = self.parent(node) else {
            return false;
        };
        node.detach(&mut self.arena);
        self.queue_record(MutationRecord::child_list(parent, Vec::new(), vec![node]));
        true
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), Error> {
        self.element_mut(node)?.set_attribute(name, value);
        self.queue_record(MutationRecord::attributes(node, name));
        Ok(())
    }

    /// Remove an attribute; returns whether it existed. Absent attributes queue nothing.
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<bool, Error> {
        let removed = self.element_mut(node)?.remove_attribute(name);
        if removed {
            self.queue_record(MutationRecord::attributes(node, name));
        }
        Ok(removed)
    }

    /// Define a custom element tag: upgrade every element carrying it, then
    /// fire the tag's defined-signal. Returns how many elements were upgraded.
    pub fn define_custom_element(&mut self, tag: &str) -> usize {
        let tag_lc = tag.to_ascii_lowercase();
        if self.custom_elements.is_defined(&tag_lc) {
            return 0;
        }
        let mut upgraded = 0;
        let nodes = self.elements_by_tag.get(&tag_lc).cloned().unwrap_or_default();
        for node in nodes {
            if let Ok(data) = self.element_mut(node) {
                if !data.defined {
                    data.defined = true;
                    upgraded += 1;
                }
            }
        }
        self.custom_elements.define(&tag_lc);
        debug!("Defined <{tag_lc}>, upgraded {upgraded} elements");
        upgraded
    }

    pub const fn custom_elements(&self) -> &CustomElementRegistry {
        &self.custom_elements
    }

    pub fn custom_elements_mut(&mut self) -> &mut CustomElementRegistry {
        &mut self.custom_elements
    }

    pub const fn frames(&self) -> &FrameClock {
        &self.frames
    }

    /// Start observing `target`. Batches are sent on `sender` at each [`Self::flush`].
    pub fn observe(
        &mut self,
        target: NodeId,
        options: ObserveOptions,
        sender: UnboundedSender<MutationBatch>,
    ) -> Result<ObserverId, Error> {
        if self.arena.get(target).is_none() {
            bail!("Cannot observe unknown node {target:?}");
        }
        let id = self.observers.register(target, options, sender);
        trace!("Observer {id:?} attached to {target:?}");
        Ok(id)
    }

    /// Stop an observer, discarding its undelivered records.
    pub fn disconnect_observer(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn is_observing(&self, id: ObserverId) -> bool {
        self.observers.contains(id)
    }

    /// Deliver all queued records, one batch per observer. Returns the number
    /// of batches sent.
    pub fn flush(&mut self) -> usize {
        self.observers.flush()
    }

    fn queue_record(&mut self, record: MutationRecord) {
        let path: Vec<NodeId> = record.target.ancestors(&self.arena).collect();
        self.observers.enqueue(&record, &path);
    }
}
