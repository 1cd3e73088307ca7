//! Fixtures shared by the style watcher integration tests.

#![allow(dead_code, reason = "Each test binary uses a different subset of helpers")]

use anyhow::{Error, bail};
use dom::{Document, NodeId, SharedDocument};
use parking_lot::Mutex;
use std::sync::Arc;
use style_watcher::{StyleChangeSubscriber, StyleChanges, StyleWatcher, WatchConfig};
use tokio::runtime::Handle;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A `<html><head/><body/></html>` document with helpers that lock it per call.
pub struct Page {
    pub shared: SharedDocument,
    pub head: NodeId,
    pub body: NodeId,
}

impl Page {
    pub fn new() -> Self {
        let mut doc = Document::new();
        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.append_child(doc.root(), html).unwrap();
        doc.append_child(html, head).unwrap();
        doc.append_child(html, body).unwrap();
        Self {
            shared: doc.into_shared(),
            head,
            body,
        }
    }

    pub fn watcher(&self) -> StyleWatcher {
        self.watcher_with(WatchConfig::default())
    }

    pub fn watcher_with(&self, config: WatchConfig) -> StyleWatcher {
        StyleWatcher::new(Arc::clone(&self.shared), config, Handle::current())
    }

    pub fn element(&self, tag: &str) -> NodeId {
        self.shared.lock().create_element(tag)
    }

    pub fn append(&self, parent: NodeId, child: NodeId) {
        self.shared.lock().append_child(parent, child).unwrap();
    }

    pub fn remove(&self, node: NodeId) {
        assert!(self.shared.lock().remove(node));
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        self.shared.lock().set_attribute(node, name, value).unwrap();
    }

    pub fn attach_shadow(&self, host: NodeId) -> NodeId {
        self.shared.lock().attach_shadow(host).unwrap()
    }

    /// A `<style>` appended to `parent`.
    pub fn style_in(&self, parent: NodeId) -> NodeId {
        let style = self.element("style");
        self.append(parent, style);
        style
    }

    /// A `<link rel="stylesheet">` appended to `parent`.
    pub fn stylesheet_in(&self, parent: NodeId) -> NodeId {
        let link = self.element("link");
        self.set_attribute(link, "rel", "stylesheet");
        self.set_attribute(link, "href", "/theme.css");
        self.append(parent, link);
        link
    }

    pub fn define(&self, tag: &str) -> usize {
        self.shared.lock().define_custom_element(tag)
    }

    pub fn flush(&self) -> usize {
        self.shared.lock().flush()
    }

    pub fn observer_count(&self) -> usize {
        self.shared.lock().observer_count()
    }
}

/// Subscriber that keeps every diff it receives.
#[derive(Clone, Default)]
pub struct Recorder {
    seen: Arc<Mutex<Vec<StyleChanges>>>,
}

impl Recorder {
    pub fn subscriber(&self) -> impl StyleChangeSubscriber + use<> {
        let seen = Arc::clone(&self.seen);
        move |changes: StyleChanges| -> Result<(), Error> {
            seen.lock().push(changes);
            Ok(())
        }
    }

    /// Records the diff, then fails for the first `failures` calls.
    pub fn failing_subscriber(&self, failures: usize) -> impl StyleChangeSubscriber + use<> {
        let seen = Arc::clone(&self.seen);
        let mut remaining = failures;
        move |changes: StyleChanges| -> Result<(), Error> {
            seen.lock().push(changes);
            if remaining > 0 {
                remaining -= 1;
                bail!("stylesheet consumer is busy");
            }
            Ok(())
        }
    }

    pub fn take(&self) -> Vec<StyleChanges> {
        core::mem::take(&mut *self.seen.lock())
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }
}
