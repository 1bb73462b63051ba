//! Thin helpers over the kuchiki tree used by the decoder and every block template.

use html5ever::{LocalName, Namespace, QualName};
use kuchiki::traits::TendrilSink;
use kuchiki::{Attribute, ExpandedName, NodeRef};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

pub fn qual_name(tag: &str) -> QualName {
    QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from(tag))
}

/// Create a detached element in the HTML namespace.
pub fn element(tag: &str) -> NodeRef {
    NodeRef::new_element(qual_name(tag), Vec::<(ExpandedName, Attribute)>::new())
}

/// Parse a full document.
pub fn parse_document(html: &str) -> NodeRef {
    kuchiki::parse_html().one(html)
}

/// Parse an HTML fragment as if it were the content of a `<div>` and return the
/// top-level nodes, detached and ready to be appended elsewhere.
pub fn parse_fragment(html: &str) -> Vec<NodeRef> {
    let document = kuchiki::parse_fragment(qual_name("div"), Vec::new()).one(html);
    // html5ever roots fragments under a synthetic <html> element
    let root = document
        .children()
        .find(|child| tag_name(child).as_deref() == Some("html"))
        .unwrap_or(document);
    let nodes: Vec<NodeRef> = root.children().collect();
    for node in &nodes {
        node.detach();
    }
    nodes
}

pub fn tag_name(node: &NodeRef) -> Option<String> {
    node.as_element().map(|el| el.name.local.to_string())
}

pub fn is_element(node: &NodeRef, tag: &str) -> bool {
    node.as_element()
        .map(|el| el.name.local.as_ref().eq_ignore_ascii_case(tag))
        .unwrap_or(false)
}

pub fn element_children(node: &NodeRef) -> Vec<NodeRef> {
    node.children()
        .filter(|child| child.as_element().is_some())
        .collect()
}

pub fn get_attr(node: &NodeRef, name: &str) -> Option<String> {
    node.as_element()
        .and_then(|el| el.attributes.borrow().get(name).map(|v| v.to_string()))
}

pub fn has_attr(node: &NodeRef, name: &str) -> bool {
    node.as_element()
        .map(|el| el.attributes.borrow().contains(name))
        .unwrap_or(false)
}

pub fn set_attr(node: &NodeRef, name: &str, value: &str) {
    if let Some(el) = node.as_element() {
        el.attributes.borrow_mut().insert(name, value.to_string());
    }
}

pub fn remove_attr(node: &NodeRef, name: &str) -> Option<String> {
    node.as_element()
        .and_then(|el| el.attributes.borrow_mut().remove(name))
        .map(|attr| attr.value)
}

/// All attribute names of an element, in document order.
pub fn attr_names(node: &NodeRef) -> Vec<String> {
    node.as_element()
        .map(|el| {
            el.attributes
                .borrow()
                .map
                .keys()
                .map(|name| name.local.to_string())
                .collect()
        })
        .unwrap_or_default()
}

pub fn classes(node: &NodeRef) -> Vec<String> {
    get_attr(node, "class")
        .map(|c| c.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn has_class(node: &NodeRef, class: &str) -> bool {
    classes(node).iter().any(|c| c == class)
}

/// Append class tokens (space separated), skipping ones already present.
pub fn add_class(node: &NodeRef, class: &str) {
    let mut current = classes(node);
    for token in class.split_whitespace() {
        if !current.iter().any(|c| c == token) {
            current.push(token.to_string());
        }
    }
    set_attr(node, "class", &current.join(" "));
}

pub fn remove_class(node: &NodeRef, class: &str) {
    let remaining: Vec<String> = classes(node).into_iter().filter(|c| c != class).collect();
    if remaining.is_empty() {
        remove_attr(node, "class");
    } else {
        set_attr(node, "class", &remaining.join(" "));
    }
}

pub fn clear_children(node: &NodeRef) {
    while let Some(child) = node.first_child() {
        child.detach();
    }
}

/// Replace all children with a single text node.
pub fn set_text(node: &NodeRef, text: &str) {
    clear_children(node);
    if !text.is_empty() {
        node.append(NodeRef::new_text(text));
    }
}

pub fn text(node: &NodeRef) -> String {
    node.text_contents()
}

pub fn inner_html(node: &NodeRef) -> String {
    node.children().map(|child| child.to_string()).collect()
}

/// Replace all children with the parsed fragment.
pub fn set_inner_html(node: &NodeRef, html: &str) {
    clear_children(node);
    for child in parse_fragment(html) {
        node.append(child);
    }
}

/// Move (never clone) every child of `from` to the end of `to`.
pub fn move_children(from: &NodeRef, to: &NodeRef) {
    let children: Vec<NodeRef> = from.children().collect();
    for child in children {
        to.append(child);
    }
}

/// Drop leading and trailing whitespace from the edge text nodes, like `innerHTML.trim()`.
pub fn trim_edges(node: &NodeRef) {
    while let Some(first) = node.first_child() {
        let Some(text) = first.as_text() else { break };
        let trimmed = text.borrow().trim_start().to_string();
        if trimmed.is_empty() {
            first.detach();
            continue;
        }
        *text.borrow_mut() = trimmed;
        break;
    }
    while let Some(last) = node.last_child() {
        let Some(text) = last.as_text() else { break };
        let trimmed = text.borrow().trim_end().to_string();
        if trimmed.is_empty() {
            last.detach();
            continue;
        }
        *text.borrow_mut() = trimmed;
        break;
    }
}

pub fn set_hidden(node: &NodeRef, hidden: bool) {
    if hidden {
        set_attr(node, "hidden", "");
    } else {
        remove_attr(node, "hidden");
    }
}

pub fn is_hidden(node: &NodeRef) -> bool {
    has_attr(node, "hidden")
}

/// Set one inline style declaration, keeping any others already present.
pub fn set_style_property(node: &NodeRef, property: &str, value: &str) {
    let mut declarations: Vec<(String, String)> = get_attr(node, "style")
        .unwrap_or_default()
        .split(';')
        .filter_map(|decl| {
            let (name, val) = decl.split_once(':')?;
            Some((name.trim().to_string(), val.trim().to_string()))
        })
        .filter(|(name, _)| !name.is_empty() && name != property)
        .collect();
    declarations.push((property.to_string(), value.to_string()));
    let style = declarations
        .iter()
        .map(|(name, val)| format!("{}: {}", name, val))
        .collect::<Vec<_>>()
        .join("; ");
    set_attr(node, "style", &style);
}

pub fn style_property(node: &NodeRef, property: &str) -> Option<String> {
    get_attr(node, "style")?.split(';').find_map(|decl| {
        let (name, val) = decl.split_once(':')?;
        (name.trim() == property).then(|| val.trim().to_string())
    })
}

/// Fluent element builder used by the block templates.
pub struct El(NodeRef);

impl El {
    pub fn new(tag: &str) -> Self {
        El(element(tag))
    }

    pub fn class(self, class: &str) -> Self {
        add_class(&self.0, class);
        self
    }

    pub fn attr(self, name: &str, value: &str) -> Self {
        set_attr(&self.0, name, value);
        self
    }

    pub fn text(self, text: &str) -> Self {
        set_text(&self.0, text);
        self
    }

    pub fn html(self, html: &str) -> Self {
        set_inner_html(&self.0, html);
        self
    }

    pub fn child(self, child: NodeRef) -> Self {
        self.0.append(child);
        self
    }

    pub fn child_if(self, child: Option<NodeRef>) -> Self {
        if let Some(child) = child {
            self.0.append(child);
        }
        self
    }

    pub fn children<I: IntoIterator<Item = NodeRef>>(self, children: I) -> Self {
        for child in children {
            self.0.append(child);
        }
        self
    }

    pub fn build(self) -> NodeRef {
        self.0
    }
}
