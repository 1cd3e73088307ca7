//! Incremental tracking of style resources in a mutating document.
//!
//! A [`StyleWatcher`] observes the document root and every shadow tree below
//! it, turns each delivered mutation batch into a [`StyleChanges`] diff of
//! created, updated, removed and moved style resources, and reports it to a
//! [`StyleChangeSubscriber`]. Custom elements that are still undefined when
//! inserted are tracked until their definition lands, at which point the
//! styles inside their shadow trees are reported as created.
//!
//! ```text
//! Document::flush ──batches──▶ Reconciler ──StyleChanges──▶ subscriber
//!        ▲                         │
//!        │              new hosts / undefined elements
//!        │                         ▼
//!  shadow observers ◀── SubtreeObserverRegistry   DefinitionTracker ──tags──▶ synthetic "created"
//! ```

#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining decisions left to compiler for this crate"
)]
#![allow(clippy::missing_errors_doc, reason = "Errors are plain anyhow contexts")]
#![allow(
    clippy::module_name_repetitions,
    reason = "StyleWatcher and StyleChanges read better than Watcher and Changes"
)]

mod changes;
mod classifier;
pub mod config;
mod definitions;
mod reconcile;
mod subtree;
mod watcher;

pub use changes::{ChangeKind, StyleChangeSubscriber, StyleChanges};
pub use classifier::{DefaultStyleClassifier, StyleClassifier};
pub use config::WatchConfig;
pub use definitions::DefinitionTracker;
pub use reconcile::{Reconciler, Reconciliation};
pub use subtree::SubtreeObserverRegistry;
pub use watcher::{StyleWatcher, WatchStats};
