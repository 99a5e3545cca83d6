//! Visibility of structural page regions.

use hotspot_core::events::{ElementVisibleData, EventData};

use crate::dom::DomNode;
use crate::element::describe;
use crate::recorder::Record;

/// Intersection ratios the host observer should report at.
pub const VISIBILITY_THRESHOLDS: [f64; 4] = [0.25, 0.5, 0.75, 1.0];

const TRACKED_TAGS: [&str; 6] = ["main", "section", "aside", "nav", "header", "footer"];
const TRACKED_ROLES: [&str; 3] = ["main", "navigation", "complementary"];
const TRACKED_CLASSES: [&str; 5] = ["panel", "dashboard", "card", "widget", "sidebar"];
/// Opt-in marker for arbitrary elements.
pub const TRACK_ATTRIBUTE: &str = "data-track";

/// One intersection observer record.
#[derive(Clone, Debug)]
pub struct IntersectionEntry<N> {
    pub target: N,
    pub is_intersecting: bool,
    pub intersection_ratio: f64,
}

/// Whether `node` is one of the regions worth observing.
pub fn is_tracked<N: DomNode>(node: &N) -> bool {
    let tag = node.tag_name().to_ascii_lowercase();
    if TRACKED_TAGS.contains(&tag.as_str()) {
        return true;
    }
    if node
        .attribute("role")
        .is_some_and(|role| TRACKED_ROLES.contains(&role.as_str()))
    {
        return true;
    }
    if node.attribute(TRACK_ATTRIBUTE).is_some() {
        return true;
    }
    node.class_name()
        .split_whitespace()
        .any(|class| TRACKED_CLASSES.contains(&class))
}

/// Every tracked element under `root`, in document order.
pub fn tracked_elements<N: DomNode>(root: &N) -> Vec<N> {
    let mut found = Vec::new();
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        if is_tracked(&node) {
            found.push(node.clone());
        }
        let mut children = node.children();
        children.reverse();
        stack.extend(children);
    }
    found
}

#[derive(Debug, Default)]
pub struct ElementVisibilityDetector;

impl ElementVisibilityDetector {
    pub fn on_intersections<N: DomNode>(
        &self,
        entries: &[IntersectionEntry<N>],
        rec: &mut dyn Record,
    ) {
        for entry in entries.iter().filter(|e| e.is_intersecting) {
            rec.record(EventData::ElementVisible(ElementVisibleData {
                element: Some(describe(&entry.target)),
                visible_percent: (entry.intersection_ratio.clamp(0.0, 1.0) * 100.0).round() as u32,
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::VirtualNode;
    use crate::recorder::CollectingRecorder;

    #[test]
    fn test_tracked_regions() {
        let body = VirtualNode::document();
        let header = body.append(VirtualNode::element("header"));
        let div = body.append(VirtualNode::element("div").with_attr("role", "navigation"));
        let card = body.append(VirtualNode::element("div").with_class("card shadow"));
        let marked = body.append(VirtualNode::element("span").with_attr("data-track", ""));
        let plain = body.append(VirtualNode::element("div").with_class("cards"));

        assert!(is_tracked(&header));
        assert!(is_tracked(&div));
        assert!(is_tracked(&card));
        assert!(is_tracked(&marked));
        assert!(!is_tracked(&plain));
    }

    #[test]
    fn test_tracked_elements_document_order() {
        let body = VirtualNode::document();
        let main = body.append(VirtualNode::element("main"));
        main.append(VirtualNode::element("section").with_id("hero"));
        body.append(VirtualNode::element("footer"));

        let tags: Vec<String> = tracked_elements(&body)
            .iter()
            .map(|n| n.tag_name())
            .collect();
        assert_eq!(tags, vec!["main", "section", "footer"]);
    }

    #[test]
    fn test_only_intersecting_entries_recorded() {
        let body = VirtualNode::document();
        let section = body.append(VirtualNode::element("section").with_id("pricing"));
        let entries = vec![
            IntersectionEntry {
                target: section.clone(),
                is_intersecting: true,
                intersection_ratio: 0.754,
            },
            IntersectionEntry {
                target: section,
                is_intersecting: false,
                intersection_ratio: 0.0,
            },
        ];

        let mut rec = CollectingRecorder::default();
        ElementVisibilityDetector.on_intersections(&entries, &mut rec);

        assert_eq!(rec.events.len(), 1);
        match &rec.events[0] {
            EventData::ElementVisible(v) => {
                assert_eq!(v.visible_percent, 75);
                assert_eq!(v.element.as_ref().unwrap().selector, "section#pricing");
            }
            other => panic!("expected element_visible, got {other:?}"),
        }
    }
}
