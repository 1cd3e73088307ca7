//! In-process document model used to drive style tracking.
//!
//! The tree mirrors the parts of a browser DOM that matter to observers of
//! style resources: elements with attributes, isolated shadow trees attached
//! to hosts, custom elements that become defined after insertion, an
//! animation-frame clock, and mutation observers that receive batched
//! records at an explicit delivery checkpoint ([`Document::flush`]).

#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining decisions left to compiler for this crate"
)]
#![allow(clippy::missing_errors_doc, reason = "Errors are plain anyhow contexts")]
#![allow(
    clippy::module_name_repetitions,
    reason = "Types like MutationRecord read better than Record"
)]

mod custom_elements;
mod document;
mod frame;
mod mutation;
mod node;
pub mod traversal;

pub use custom_elements::CustomElementRegistry;
pub use document::{Document, SharedDocument};
pub use frame::FrameClock;
pub use indextree::NodeId;
pub use mutation::{MutationBatch, MutationKind, MutationRecord, ObserveOptions, ObserverId};
pub use node::{ElementData, NodeKind, is_custom_element_name};
pub use traversal::{for_each_shadow_host, shadow_hosts};
