//! Minimal read-only view of a document tree.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use hotspot_core::types::Rect;

/// An element the tracker can describe.
///
/// Handles are cheap clones pointing at the same underlying node.
pub trait DomNode: Clone {
    /// Tag name in any case; callers compare case-insensitively.
    fn tag_name(&self) -> String;

    fn id(&self) -> Option<String> {
        self.attribute("id").filter(|id| !id.is_empty())
    }

    /// Raw `class` attribute.
    fn class_name(&self) -> String {
        self.attribute("class").unwrap_or_default()
    }

    /// Concatenated text of the node and its descendants.
    fn text_content(&self) -> String;

    fn attribute(&self, name: &str) -> Option<String>;

    fn parent(&self) -> Option<Self>;

    fn children(&self) -> Vec<Self>;

    fn is_same_node(&self, other: &Self) -> bool;

    fn bounding_rect(&self) -> Option<Rect> {
        None
    }

    /// Whether a form control currently holds a non-empty value.
    fn has_value(&self) -> bool {
        false
    }

    fn is_body(&self) -> bool {
        self.tag_name().eq_ignore_ascii_case("body")
    }

    fn is_document_element(&self) -> bool {
        self.tag_name().eq_ignore_ascii_case("html")
    }
}

#[derive(Debug)]
struct NodeData {
    tag: String,
    attributes: RefCell<BTreeMap<String, String>>,
    text: RefCell<String>,
    value: RefCell<String>,
    rect: RefCell<Option<Rect>>,
    parent: RefCell<Weak<NodeData>>,
    children: RefCell<Vec<Rc<NodeData>>>,
}

/// In-memory element tree.
///
/// Parents are held weakly; every handle keeps the tree's root alive, so build
/// trees top-down from [`VirtualNode::document`] or another root.
#[derive(Clone, Debug)]
pub struct VirtualNode {
    node: Rc<NodeData>,
    root: Rc<NodeData>,
}

impl VirtualNode {
    pub fn element(tag: &str) -> Self {
        let node = Rc::new(NodeData {
            tag: tag.to_string(),
            attributes: RefCell::new(BTreeMap::new()),
            text: RefCell::new(String::new()),
            value: RefCell::new(String::new()),
            rect: RefCell::new(None),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
        });
        Self {
            root: Rc::clone(&node),
            node,
        }
    }

    fn handle(&self, node: Rc<NodeData>) -> Self {
        Self {
            node,
            root: Rc::clone(&self.root),
        }
    }

    /// A `<html><body>` pair; returns the body.
    pub fn document() -> Self {
        let html = Self::element("html");
        html.append(Self::element("body"))
    }

    pub fn with_attr(self, name: &str, value: &str) -> Self {
        self.node
            .attributes
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_id(self, id: &str) -> Self {
        self.with_attr("id", id)
    }

    /// Appends to the class list.
    pub fn with_class(self, class: &str) -> Self {
        let classes = match self.node.attributes.borrow().get("class") {
            Some(existing) if !existing.is_empty() => format!("{existing} {class}"),
            _ => class.to_string(),
        };
        self.with_attr("class", &classes)
    }

    pub fn with_text(self, text: &str) -> Self {
        *self.node.text.borrow_mut() = text.to_string();
        self
    }

    pub fn with_rect(self, rect: Rect) -> Self {
        *self.node.rect.borrow_mut() = Some(rect);
        self
    }

    pub fn set_value(&self, value: &str) {
        *self.node.value.borrow_mut() = value.to_string();
    }

    /// Attach `child` as the last child and return its handle.
    pub fn append(&self, child: VirtualNode) -> VirtualNode {
        *child.node.parent.borrow_mut() = Rc::downgrade(&self.node);
        self.node.children.borrow_mut().push(Rc::clone(&child.node));
        self.handle(child.node)
    }
}

impl DomNode for VirtualNode {
    fn tag_name(&self) -> String {
        self.node.tag.clone()
    }

    fn text_content(&self) -> String {
        let mut text = self.node.text.borrow().clone();
        for child in self.node.children.borrow().iter() {
            text.push_str(&self.handle(Rc::clone(child)).text_content());
        }
        text
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.node.attributes.borrow().get(name).cloned()
    }

    fn parent(&self) -> Option<Self> {
        self.node
            .parent
            .borrow()
            .upgrade()
            .map(|parent| self.handle(parent))
    }

    fn children(&self) -> Vec<Self> {
        self.node
            .children
            .borrow()
            .iter()
            .map(|c| self.handle(Rc::clone(c)))
            .collect()
    }

    fn is_same_node(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    fn bounding_rect(&self) -> Option<Rect> {
        self.node.rect.borrow().clone()
    }

    fn has_value(&self) -> bool {
        !self.node.value.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_links() {
        let body = VirtualNode::document();
        let list = body.append(VirtualNode::element("ul"));
        let item = list.append(VirtualNode::element("li").with_text("one"));

        assert!(item.parent().unwrap().is_same_node(&list));
        assert!(list.parent().unwrap().is_body());
        assert!(body.parent().unwrap().is_document_element());
        assert_eq!(list.children().len(), 1);
    }

    #[test]
    fn test_text_content_includes_descendants() {
        let body = VirtualNode::document();
        let button = body.append(VirtualNode::element("button").with_text("Buy "));
        button.append(VirtualNode::element("span").with_text("now"));
        assert_eq!(button.text_content(), "Buy now");
    }

    #[test]
    fn test_with_class_appends() {
        let button = VirtualNode::element("button")
            .with_class("btn")
            .with_class("btn-primary");
        assert_eq!(button.class_name(), "btn btn-primary");
    }

    #[test]
    fn test_empty_id_is_none() {
        let node = VirtualNode::element("div").with_id("");
        assert!(node.id().is_none());
    }

    #[test]
    fn test_value_tracking() {
        let input = VirtualNode::element("input");
        assert!(!input.has_value());
        input.set_value("x");
        assert!(input.has_value());
    }
}
