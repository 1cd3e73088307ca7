//! The watcher: owns one observation generation at a time and turns its
//! mutation batches and definition events into subscriber notifications.

use crate::changes::{StyleChangeSubscriber, StyleChanges};
use crate::classifier::{DefaultStyleClassifier, StyleClassifier};
use crate::config::WatchConfig;
use crate::definitions::DefinitionTracker;
use crate::reconcile::{Reconciler, Reconciliation};
use crate::subtree::SubtreeObserverRegistry;
use anyhow::{Context as _, Error, bail};
use dom::{MutationBatch, NodeId, ObserverId, SharedDocument};
use log::{debug, error, info, trace};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

/// Counters describing what a [`StyleWatcher`] has done so far. The counters
/// accumulate across restarts; the gauges describe the running generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchStats {
    pub batches_reconciled: u64,
    pub definitions_resolved: u64,
    pub notifications: u64,
    pub subscriber_errors: u64,
    pub subtree_observers: usize,
    pub pending_tags: usize,
}

/// Everything created by one call to [`StyleWatcher::start`].
struct Generation {
    root_observer: ObserverId,
    subtrees: SubtreeObserverRegistry,
    definitions: DefinitionTracker,
    batches: UnboundedReceiver<MutationBatch>,
    resolved: UnboundedReceiver<String>,
    subscriber: Box<dyn StyleChangeSubscriber>,
}

enum WatchEvent {
    Mutations(MutationBatch),
    Defined(String),
}

/// Watches a shared document for style resource changes.
///
/// Events are processed on the caller's schedule, either by draining whatever
/// is queued with [`StyleWatcher::process_pending`] or by awaiting the next
/// event with [`StyleWatcher::update`]. The document lock is never held while
/// the subscriber runs.
pub struct StyleWatcher {
    document: SharedDocument,
    config: WatchConfig,
    classifier: Arc<dyn StyleClassifier>,
    handle: Handle,
    generation: Option<Generation>,
    stats: WatchStats,
}

impl StyleWatcher {
    pub fn new(document: SharedDocument, config: WatchConfig, handle: Handle) -> Self {
        let classifier = Arc::new(DefaultStyleClassifier::from_config(&config));
        Self::with_classifier(document, config, handle, classifier)
    }

    pub fn with_classifier(
        document: SharedDocument,
        config: WatchConfig,
        handle: Handle,
        classifier: Arc<dyn StyleClassifier>,
    ) -> Self {
        Self {
            document,
            config,
            classifier,
            handle,
            generation: None,
            stats: WatchStats::default(),
        }
    }

    /// Begin watching and report every later change to `subscriber`.
    ///
    /// A running watcher is stopped first, so observers of the previous
    /// generation never deliver to the new subscriber.
    pub fn start<S>(&mut self, subscriber: S) -> Result<(), Error>
    where
        S: StyleChangeSubscriber + 'static,
    {
        if self.is_running() {
            debug!("Restarting style watcher");
            self.stop();
        }

        let (batch_sender, batches) = mpsc::unbounded_channel();
        let (resolved_sender, resolved) = mpsc::unbounded_channel();
        let options = self.config.observe_options();

        let mut doc = self.document.lock();
        let root = doc.root();
        let root_observer = doc
            .observe(root, options.clone(), batch_sender.clone())
            .context("Failed to observe the document root")?;
        let mut subtrees = SubtreeObserverRegistry::new(options, batch_sender);
        let hosts = subtrees.register_all(&mut doc, root);
        let mut definitions = DefinitionTracker::new(
            Arc::clone(&self.document),
            self.handle.clone(),
            self.config.prefer_platform_definitions,
            resolved_sender,
        );
        let undefined = definitions.track(&mut doc, root);
        drop(doc);

        info!("Watching styles: {hosts} shadow trees, {undefined} undefined custom elements");
        self.generation = Some(Generation {
            root_observer,
            subtrees,
            definitions,
            batches,
            resolved,
            subscriber: Box::new(subscriber),
        });
        Ok(())
    }

    /// Disconnect every observer and drop pending definition groups. Does
    /// nothing when the watcher is not running.
    pub fn stop(&mut self) {
        let stats = self.stats();
        let Some(mut generation) = self.generation.take() else {
            return;
        };
        debug!("Stopping style watcher: {stats:?}");
        let mut doc = self.document.lock();
        doc.disconnect_observer(generation.root_observer);
        generation.subtrees.teardown_all(&mut doc);
        drop(doc);
        generation.definitions.unsubscribe();
        info!("Stopped watching styles");
    }

    pub const fn is_running(&self) -> bool {
        self.generation.is_some()
    }

    /// Handle every event already queued. Returns how many were handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.next_pending() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Wait for the next event, then drain whatever else is queued.
    pub async fn update(&mut self) -> Result<usize, Error> {
        let Some(generation) = self.generation.as_mut() else {
            bail!("Style watcher is not running");
        };
        let event = tokio::select! {
            Some(batch) = generation.batches.recv() => WatchEvent::Mutations(batch),
            Some(tag) = generation.resolved.recv() => WatchEvent::Defined(tag),
            else => bail!("Style watcher event channels closed"),
        };
        self.handle_event(event);
        Ok(1 + self.process_pending())
    }

    /// Advance the document's frame clock on a timer at the configured rate.
    pub fn drive_frames(&self) -> JoinHandle<()> {
        self.document
            .lock()
            .frames()
            .spawn_ticker(&self.handle, self.config.frame_interval())
    }

    pub fn stats(&self) -> WatchStats {
        let mut stats = self.stats;
        if let Some(generation) = &self.generation {
            stats.subtree_observers = generation.subtrees.len();
            stats.pending_tags = generation.definitions.pending_tags();
        }
        stats
    }

    pub fn subtree_observer_count(&self) -> usize {
        self.generation
            .as_ref()
            .map_or(0, |generation| generation.subtrees.len())
    }

    pub fn is_pending_definition(&self, tag: &str) -> bool {
        self.generation
            .as_ref()
            .is_some_and(|generation| generation.definitions.is_pending(tag))
    }

    pub const fn config(&self) -> &WatchConfig {
        &self.config
    }

    fn next_pending(&mut self) -> Option<WatchEvent> {
        let generation = self.generation.as_mut()?;
        if let Ok(batch) = generation.batches.try_recv() {
            return Some(WatchEvent::Mutations(batch));
        }
        generation.resolved.try_recv().ok().map(WatchEvent::Defined)
    }

    fn handle_event(&mut self, event: WatchEvent) {
        match event {
            WatchEvent::Mutations(batch) => self.handle_mutations(&batch),
            WatchEvent::Defined(tag) => self.handle_defined(&tag),
        }
    }

    fn handle_mutations(&mut self, batch: &MutationBatch) {
        let Some(generation) = self.generation.as_mut() else {
            return;
        };
        let changes = {
            let mut doc = self.document.lock();
            let reconciler = Reconciler::new(self.classifier.as_ref(), &self.config);
            let Reconciliation {
                changes,
                connected_additions,
            } = reconciler.reconcile(&doc, batch);
            for node in connected_additions {
                generation.subtrees.register_all(&mut doc, node);
                generation.definitions.track(&mut doc, node);
            }
            generation.subtrees.retire_disconnected(&mut doc);
            changes
        };
        self.stats.batches_reconciled += 1;

        if changes.needs_notification() {
            notify(generation.subscriber.as_mut(), &mut self.stats, changes);
        } else if !changes.moved.is_empty() {
            trace!("{} style resources moved, nothing to report", changes.moved.len());
        }
    }

    fn handle_defined(&mut self, tag: &str) {
        let Some(generation) = self.generation.as_mut() else {
            return;
        };
        let Some(elements) = generation.definitions.resolve(tag) else {
            trace!("Ignoring definition of <{tag}>: no pending group");
            return;
        };
        self.stats.definitions_resolved += 1;

        let (connected, created) = {
            let mut doc = self.document.lock();
            let connected: Vec<NodeId> = elements
                .into_iter()
                .filter(|element| doc.is_connected(*element))
                .collect();
            let shadows: Vec<NodeId> = connected
                .iter()
                .filter_map(|element| doc.shadow_root(*element))
                .collect();
            let reconciler = Reconciler::new(self.classifier.as_ref(), &self.config);
            let created = reconciler.collect_styles(&doc, shadows.iter().copied());
            for element in &connected {
                generation.subtrees.register_all(&mut doc, *element);
            }
            for shadow in shadows {
                generation.definitions.track(&mut doc, shadow);
            }
            (connected, created)
        };
        debug!(
            "<{tag}> defined: {} connected elements, {} style resources",
            connected.len(),
            created.len()
        );
        notify(
            generation.subscriber.as_mut(),
            &mut self.stats,
            StyleChanges::created(created),
        );
    }
}

impl Drop for StyleWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn notify(subscriber: &mut dyn StyleChangeSubscriber, stats: &mut WatchStats, changes: StyleChanges) {
    stats.notifications += 1;
    if let Err(err) = subscriber.on_change(changes) {
        stats.subscriber_errors += 1;
        error!("Style change subscriber failed: {err:#}");
    }
}
