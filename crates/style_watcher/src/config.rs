//! Configuration for style watching.
//!
//! Settings can be constructed programmatically or loaded from environment
//! variables with [`WatchConfig::from_env`].

use core::time::Duration;
use dom::ObserveOptions;
use std::env;

/// Attributes whose changes on a style resource count as an update.
pub const DEFAULT_WATCHED_ATTRIBUTES: [&str; 2] = ["rel", "disabled"];

/// Runtime configuration for a [`crate::StyleWatcher`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchConfig {
    /// Lowercase attribute names observed on style resources
    pub watched_attributes: Vec<String>,
    /// Animation-frame period in milliseconds used when the watcher drives frames itself
    pub frame_interval_ms: u64,
    /// Use the registry's defined-signal when available instead of polling every frame
    pub prefer_platform_definitions: bool,
    /// Class marking style elements the consumer injected itself
    pub ignore_class: Option<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_WATCHED_ATTRIBUTES.iter().map(|name| (*name).to_owned()).collect(),
            16,
            true,
            None,
        )
    }
}

impl WatchConfig {
    /// Construct a new `WatchConfig` with explicit values.
    ///
    /// # Arguments
    ///
    /// * `watched_attributes` - Attribute names to observe (lowercased)
    /// * `frame_interval_ms` - Frame period in milliseconds (minimum 1ms)
    /// * `prefer_platform_definitions` - Whether to wait on defined-signals rather than poll
    /// * `ignore_class` - Optional class excluding elements from tracking
    #[must_use]
    pub fn new(
        watched_attributes: Vec<String>,
        frame_interval_ms: u64,
        prefer_platform_definitions: bool,
        ignore_class: Option<String>,
    ) -> Self {
        Self {
            watched_attributes: watched_attributes
                .into_iter()
                .map(|name| name.trim().to_ascii_lowercase())
                .filter(|name| !name.is_empty())
                .collect(),
            frame_interval_ms: frame_interval_ms.max(1),
            prefer_platform_definitions,
            ignore_class: ignore_class.filter(|class| !class.is_empty()),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `STYLE_WATCH_ATTRIBUTES`: Comma separated attribute names (default: `rel,disabled`)
    /// - `STYLE_WATCH_FRAME_MS`: Frame period in milliseconds (default: 16)
    /// - `STYLE_WATCH_POLL_DEFINITIONS`: Set to "1" to always poll for definitions
    /// - `STYLE_WATCH_IGNORE_CLASS`: Class of elements to leave untracked
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let watched_attributes = env::var("STYLE_WATCH_ATTRIBUTES")
            .ok()
            .map(|raw| raw.split(',').map(str::to_owned).collect())
            .unwrap_or(defaults.watched_attributes);
        let frame_interval_ms = env::var("STYLE_WATCH_FRAME_MS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(defaults.frame_interval_ms);
        let prefer_platform_definitions =
            env::var("STYLE_WATCH_POLL_DEFINITIONS").ok().as_deref() != Some("1");
        let ignore_class = env::var("STYLE_WATCH_IGNORE_CLASS").ok();
        Self::new(
            watched_attributes,
            frame_interval_ms,
            prefer_platform_definitions,
            ignore_class,
        )
    }

    #[must_use]
    pub const fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// Observation settings shared by the root observer and every shadow observer.
    #[must_use]
    pub fn observe_options(&self) -> ObserveOptions {
        ObserveOptions {
            child_list: true,
            subtree: true,
            attributes: true,
            attribute_filter: Some(self.watched_attributes.clone()),
        }
    }

    pub fn is_watched_attribute(&self, name: &str) -> bool {
        self.watched_attributes
            .iter()
            .any(|watched| watched.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_watch_rel_and_disabled() {
        let config = WatchConfig::default();
        assert_eq!(config.watched_attributes, vec!["rel", "disabled"]);
        assert_eq!(config.frame_interval(), Duration::from_millis(16));
        assert!(config.prefer_platform_definitions);
        assert!(config.is_watched_attribute("DISABLED"));
        assert!(!config.is_watched_attribute("href"));
    }

    #[test]
    fn new_normalises_values() {
        let config = WatchConfig::new(
            vec![" Media ".to_owned(), String::new()],
            0,
            false,
            Some(String::new()),
        );
        assert_eq!(config.watched_attributes, vec!["media"]);
        assert_eq!(config.frame_interval_ms, 1);
        assert_eq!(config.ignore_class, None);
        let options = config.observe_options();
        assert!(options.child_list && options.subtree && options.attributes);
        assert_eq!(options.attribute_filter, Some(vec!["media".to_owned()]));
    }
}
