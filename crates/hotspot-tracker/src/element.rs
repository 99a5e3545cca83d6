//! Element descriptors and selector fingerprints.

use hotspot_core::types::{ElementMeta, Rect};

use crate::dom::DomNode;

const MAX_TEXT_CHARS: usize = 100;
const MAX_META_CLASSES: usize = 3;
const MAX_SELECTOR_CLASSES: usize = 2;

/// Describe `node` for an event payload.
pub fn describe<N: DomNode>(node: &N) -> ElementMeta {
    let tag = node.tag_name().to_ascii_lowercase();
    let href = node
        .attribute("href")
        .or_else(|| closest_anchor(node).and_then(|a| a.attribute("href")));

    ElementMeta {
        tag,
        id: node.id(),
        classes: split_classes(&node.class_name())
            .take(MAX_META_CLASSES)
            .map(str::to_string)
            .collect(),
        text: truncate_chars(node.text_content().trim(), MAX_TEXT_CHARS),
        href,
        selector: selector(node),
        rect: node.bounding_rect().map(|r| Rect {
            x: r.x.round(),
            y: r.y.round(),
            w: r.w.round(),
            h: r.h.round(),
        }),
    }
}

/// Build a `tag#id` / `tag.a.b:nth-child(n)` path from `node` up to the body.
///
/// The walk stops at the first ancestor carrying an id. Stable for an
/// unchanged document; not guaranteed unique.
pub fn selector<N: DomNode>(node: &N) -> String {
    if node.is_body() || node.is_document_element() {
        return "body".to_string();
    }

    let mut parts = Vec::new();
    let mut current = Some(node.clone());

    while let Some(el) = current {
        if el.is_body() {
            break;
        }

        let mut part = el.tag_name().to_ascii_lowercase();
        if let Some(id) = el.id() {
            part.push('#');
            part.push_str(&id);
            parts.push(part);
            break;
        }

        let class_name = el.class_name();
        let classes: Vec<&str> = split_classes(&class_name)
            .take(MAX_SELECTOR_CLASSES)
            .collect();
        if !classes.is_empty() {
            part.push('.');
            part.push_str(&classes.join("."));
        }

        let parent = el.parent();
        if let Some(parent) = &parent {
            if let Some(position) = nth_child(parent, &el) {
                part.push_str(&format!(":nth-child({position})"));
            }
        }

        parts.push(part);
        current = parent;
    }

    parts.reverse();
    parts.join(" > ")
}

/// 1-based position among all children, only when a same-tag sibling exists.
fn nth_child<N: DomNode>(parent: &N, el: &N) -> Option<usize> {
    let children = parent.children();
    let tag = el.tag_name();
    let same_tag = children
        .iter()
        .filter(|c| c.tag_name().eq_ignore_ascii_case(&tag))
        .count();
    if same_tag <= 1 {
        return None;
    }
    children
        .iter()
        .position(|c| c.is_same_node(el))
        .map(|idx| idx + 1)
}

fn closest_anchor<N: DomNode>(node: &N) -> Option<N> {
    let mut current = Some(node.clone());
    while let Some(el) = current {
        if el.tag_name().eq_ignore_ascii_case("a") && el.attribute("href").is_some() {
            return Some(el);
        }
        current = el.parent();
    }
    None
}

fn split_classes(class_name: &str) -> impl Iterator<Item = &str> {
    class_name.split_whitespace()
}

/// First `max` characters of `s`, on char boundaries.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::VirtualNode;

    #[test]
    fn test_selector_stops_at_id() {
        let body = VirtualNode::document();
        let form = body.append(VirtualNode::element("form").with_id("checkout"));
        let button = form.append(VirtualNode::element("BUTTON").with_class("btn primary large"));

        assert_eq!(selector(&button), "form#checkout > button.btn.primary");
    }

    #[test]
    fn test_selector_nth_child_only_with_same_tag_siblings() {
        let body = VirtualNode::document();
        let nav = body.append(VirtualNode::element("nav"));
        nav.append(VirtualNode::element("span"));
        let first = nav.append(VirtualNode::element("a").with_class("nav-link"));
        let second = nav.append(VirtualNode::element("a").with_class("nav-link"));
        let lone = body.append(VirtualNode::element("footer"));

        assert_eq!(selector(&first), "nav > a.nav-link:nth-child(2)");
        assert_eq!(selector(&second), "nav > a.nav-link:nth-child(3)");
        assert_eq!(selector(&lone), "footer");
    }

    #[test]
    fn test_selector_for_body() {
        let body = VirtualNode::document();
        assert_eq!(selector(&body), "body");
        assert_eq!(selector(&body.parent().unwrap()), "body");
    }

    #[test]
    fn test_selector_is_stable() {
        let body = VirtualNode::document();
        let div = body.append(VirtualNode::element("div").with_class("card"));
        let p = div.append(VirtualNode::element("p"));
        assert_eq!(selector(&p), selector(&p));
        assert_eq!(selector(&p), "div.card > p");
    }

    #[test]
    fn test_describe_truncates_and_limits() {
        let body = VirtualNode::document();
        let long_text = format!("  {}  ", "x".repeat(150));
        let div = body.append(
            VirtualNode::element("DIV")
                .with_class("a b c d")
                .with_text(&long_text)
                .with_rect(Rect {
                    x: 10.4,
                    y: 20.6,
                    w: 99.5,
                    h: 0.2,
                }),
        );

        let meta = describe(&div);
        assert_eq!(meta.tag, "div");
        assert_eq!(meta.classes, vec!["a", "b", "c"]);
        assert_eq!(meta.text.chars().count(), 100);
        assert_eq!(
            meta.rect,
            Some(Rect {
                x: 10.0,
                y: 21.0,
                w: 100.0,
                h: 0.0
            })
        );
        assert!(meta.id.is_none());
    }

    #[test]
    fn test_describe_href_from_enclosing_anchor() {
        let body = VirtualNode::document();
        let link = body.append(VirtualNode::element("a").with_attr("href", "/pricing"));
        let icon = link.append(VirtualNode::element("svg"));

        assert_eq!(describe(&icon).href.as_deref(), Some("/pricing"));
        assert_eq!(describe(&link).href.as_deref(), Some("/pricing"));
        assert!(describe(&body).href.is_none());
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("ab", 10), "ab");
    }
}
