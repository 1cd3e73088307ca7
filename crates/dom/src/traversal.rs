//! Walking nested shadow trees.

use crate::document::Document;
use indextree::NodeId;

/// Call `visit` with every shadow host reachable from `node`: `node` itself if
/// it hosts a shadow root, each host below it, and recursively each host
/// inside the shadow trees visited along the way. Order is document order,
/// with a host's shadow tree explored right after the host.
pub fn for_each_shadow_host<F>(doc: &Document, node: NodeId, visit: &mut F)
where
    F: FnMut(NodeId),
{
    for candidate in doc.descendants(node) {
        if let Some(shadow) = doc.shadow_root(candidate) {
            visit(candidate);
            for_each_shadow_host(doc, shadow, visit);
        }
    }
}

/// Collecting form of [`for_each_shadow_host`].
pub fn shadow_hosts(doc: &Document, node: NodeId) -> Vec<NodeId> {
    let mut hosts = Vec::new();
    for_each_shadow_host(doc, node, &mut |host| hosts.push(host));
    hosts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visits_nested_hosts_in_order() {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        doc.append_child(doc.root(), outer).unwrap();
        let outer_shadow = doc.attach_shadow(outer).unwrap();
        let inner = doc.create_element("x-panel");
        doc.append_child(outer_shadow, inner).unwrap();
        let inner_shadow = doc.attach_shadow(inner).unwrap();
        let deepest = doc.create_element("span");
        doc.append_child(inner_shadow, deepest).unwrap();
        doc.attach_shadow(deepest).unwrap();
        let sibling = doc.create_element("p");
        doc.append_child(doc.root(), sibling).unwrap();
        doc.attach_shadow(sibling).unwrap();

        assert_eq!(shadow_hosts(&doc, doc.root()), vec![outer, inner, deepest, sibling]);
        assert_eq!(shadow_hosts(&doc, inner), vec![inner, deepest]);
        let plain = doc.create_element("div");
        assert!(shadow_hosts(&doc, plain).is_empty());
    }
}
