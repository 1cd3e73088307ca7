//! Custom element definitions and their defined-signals.

use std::collections::{HashMap, HashSet};
use tokio::sync::watch;

/// Tracks which custom element tags are defined and hands out signals that
/// flip to `true` once a tag gets its definition.
#[derive(Debug)]
pub struct CustomElementRegistry {
    defined: HashSet<String>,
    signals: HashMap<String, watch::Sender<bool>>,
    when_defined_supported: bool,
}

impl Default for CustomElementRegistry {
    fn default() -> Self {
        Self {
            defined: HashSet::new(),
            signals: HashMap::new(),
            when_defined_supported: true,
        }
    }
}

impl CustomElementRegistry {
    pub fn is_defined(&self, tag: &str) -> bool {
        self.defined.contains(&tag.to_ascii_lowercase())
    }

    /// Mark `tag` as defined and wake everyone waiting on it. Returns false if
    /// the tag was already defined.
    pub fn define(&mut self, tag: &str) -> bool {
        let tag_lc = tag.to_ascii_lowercase();
        if !self.defined.insert(tag_lc.clone()) {
            return false;
        }
        if let Some(signal) = self.signals.get(&tag_lc) {
            signal.send_replace(true);
        }
        true
    }

    /// Signal that resolves when `tag` is defined, or `None` when the
    /// environment lacks `whenDefined` and callers must poll instead.
    pub fn when_defined(&mut self, tag: &str) -> Option<watch::Receiver<bool>> {
        if !self.when_defined_supported {
            return None;
        }
        let tag_lc = tag.to_ascii_lowercase();
        let already = self.defined.contains(&tag_lc);
        let signal = self
            .signals
            .entry(tag_lc)
            .or_insert_with(|| watch::channel(already).0);
        Some(signal.subscribe())
    }

    pub fn set_when_defined_supported(&mut self, supported: bool) {
        self.when_defined_supported = supported;
    }

    pub fn when_defined_supported(&self) -> bool {
        self.when_defined_supported
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_flips_on_define() {
        let mut registry = CustomElementRegistry::default();
        let signal = registry.when_defined("X-Card").unwrap();
        assert!(!*signal.borrow());
        assert!(registry.define("x-card"));
        assert!(*signal.borrow());
        assert!(!registry.define("x-card"));
        assert!(registry.is_defined("X-CARD"));
    }

    #[test]
    fn late_subscription_sees_defined_tag() {
        let mut registry = CustomElementRegistry::default();
        registry.define("x-card");
        assert!(*registry.when_defined("x-card").unwrap().borrow());
    }

    #[test]
    fn unsupported_platform_yields_no_signal() {
        let mut registry = CustomElementRegistry::default();
        registry.set_when_defined_supported(false);
        assert!(registry.when_defined("x-card").is_none());
    }
}
