use crate::config::WatchConfig;
use dom::{Document, NodeId};

/// Decides whether an element is a style resource worth tracking.
pub trait StyleClassifier: Send + Sync {
    fn is_style_resource(&self, doc: &Document, node: NodeId) -> bool;
}

/// `<style>` elements and `<link>` elements whose `rel` has a `stylesheet`
/// token. Elements carrying the ignore class are skipped so a consumer's own
/// injected styles are never reported back to it.
#[derive(Clone, Debug, Default)]
pub struct DefaultStyleClassifier {
    ignore_class: Option<String>,
}

impl DefaultStyleClassifier {
    pub const fn new(ignore_class: Option<String>) -> Self {
        Self { ignore_class }
    }

    pub fn from_config(config: &WatchConfig) -> Self {
        Self::new(config.ignore_class.clone())
    }
}

impl StyleClassifier for DefaultStyleClassifier {
    fn is_style_resource(&self, doc: &Document, node: NodeId) -> bool {
        let styled = match doc.tag_name(node) {
            Some("style") => true,
            Some("link") => doc.attribute(node, "rel").is_some_and(|rel| {
                rel.split_ascii_whitespace()
                    .any(|token| token.eq_ignore_ascii_case("stylesheet"))
            }),
            _ => false,
        };
        styled
            && self
                .ignore_class
                .as_deref()
                .is_none_or(|class| !doc.has_class(node, class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_styles_and_stylesheet_links() {
        let mut doc = Document::new();
        let style = doc.create_element("STYLE");
        let sheet = doc.create_element("link");
        doc.set_attribute(sheet, "rel", "Alternate StyleSheet").unwrap();
        let icon = doc.create_element("link");
        doc.set_attribute(icon, "rel", "icon").unwrap();
        let bare_link = doc.create_element("link");
        let div = doc.create_element("div");
        let text = doc.create_text("p { color: red }");

        let classifier = DefaultStyleClassifier::default();
        assert!(classifier.is_style_resource(&doc, style));
        assert!(classifier.is_style_resource(&doc, sheet));
        assert!(!classifier.is_style_resource(&doc, icon));
        assert!(!classifier.is_style_resource(&doc, bare_link));
        assert!(!classifier.is_style_resource(&doc, div));
        assert!(!classifier.is_style_resource(&doc, text));
    }

    #[test]
    fn ignore_class_hides_injected_styles() {
        let mut doc = Document::new();
        let injected = doc.create_element("style");
        doc.set_attribute(injected, "class", "theme-injected").unwrap();
        let classifier = DefaultStyleClassifier::new(Some("theme-injected".to_owned()));
        assert!(!classifier.is_style_resource(&doc, injected));
        assert!(DefaultStyleClassifier::default().is_style_resource(&doc, injected));
    }
}
