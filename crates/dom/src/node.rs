use indextree::NodeId;
use smallvec::SmallVec;

/// Payload stored for every node in the document arena.
#[derive(Debug, Clone, Default)]
pub enum NodeKind {
    #[default]
    Document,
    Element(ElementData),
    /// Root of an isolated subtree. It has no parent; `host` owns it.
    ShadowRoot { host: NodeId },
    Text { text: String },
}

impl NodeKind {
    /// Whether nodes of this kind may hold children.
    pub const fn is_container(&self) -> bool {
        matches!(self, Self::Document | Self::Element(_) | Self::ShadowRoot { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ElementData {
    /// Lowercase tag name.
    pub tag: String,
    pub attrs: SmallVec<(String, String), 4>,
    pub shadow_root: Option<NodeId>,
    /// False while a custom element waits for its definition.
    pub defined: bool,
}

impl ElementData {
    pub fn new(tag: &str, defined: bool) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: SmallVec::new(),
            shadow_root: None,
            defined,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|attr| attr.0.eq_ignore_ascii_case(name))
            .map(|attr| attr.1.as_str())
    }

    /// Set or replace an attribute. Names are stored lowercase.
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        let name_lc = name.to_ascii_lowercase();
        if let Some(existing) = self.attrs.iter_mut().find(|attr| attr.0 == name_lc) {
            existing.1 = value.to_owned();
        } else {
            self.attrs.push((name_lc, value.to_owned()));
        }
    }

    /// Remove an attribute, returning whether it was present.
    pub fn remove_attribute(&mut self, name: &str) -> bool {
        let before = self.attrs.len();
        self.attrs.retain(|attr| !attr.0.eq_ignore_ascii_case(name));
        self.attrs.len() != before
    }

    /// Whether the whitespace-separated `class` attribute contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|token| token == class))
    }
}

/// Custom element names contain a hyphen and start with a lowercase ASCII letter.
pub fn is_custom_element_name(tag: &str) -> bool {
    tag.starts_with(|first: char| first.is_ascii_lowercase()) && tag.contains('-')
}
