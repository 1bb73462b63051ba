//! DOM transplant: replace a block's authoring markup with a built subtree while
//! moving editor instrumentation from consumed source nodes to their
//! destinations.

use kuchiki::NodeRef;
use log::trace;

use crate::dom;
use crate::error::BlockResult;

/// Attribute prefixes that link rendered DOM back to authored content.
pub const INSTRUMENTATION_PREFIXES: [&str; 2] = ["data-aue-", "data-richtext-"];

pub fn is_instrumentation(attribute: &str) -> bool {
    INSTRUMENTATION_PREFIXES
        .iter()
        .any(|prefix| attribute.starts_with(prefix))
}

/// Instrumentation attributes currently on `node`.
pub fn instrumentation(node: &NodeRef) -> Vec<(String, String)> {
    dom::attr_names(node)
        .into_iter()
        .filter(|name| is_instrumentation(name))
        .filter_map(|name| dom::get_attr(node, &name).map(|value| (name, value)))
        .collect()
}

/// Move every instrumentation attribute from `from` to `to`. Attributes with an
/// empty value stay where they are. Returns the number of attributes moved.
pub fn move_instrumentation(from: &NodeRef, to: &NodeRef) -> usize {
    let mut moved = 0;
    for (name, value) in instrumentation(from) {
        if value.is_empty() {
            continue;
        }
        dom::set_attr(to, &name, &value);
        dom::remove_attr(from, &name);
        moved += 1;
    }
    if moved > 0 {
        trace!("moved {} instrumentation attribute(s)", moved);
    }
    moved
}

/// A source node consumed during decoding.
///
/// Not `Clone`: relocating it takes it by value, so each source hands its
/// instrumentation to exactly one destination.
#[derive(Debug, PartialEq)]
pub struct SourceNode(NodeRef);

impl SourceNode {
    pub(crate) fn new(node: NodeRef) -> Self {
        SourceNode(node)
    }

    pub fn node(&self) -> &NodeRef {
        &self.0
    }

    /// Move this node's instrumentation onto `destination` and give back the
    /// underlying node so its children can still be moved.
    pub fn relocate_to(self, destination: &NodeRef) -> NodeRef {
        move_instrumentation(&self.0, destination);
        self.0
    }

    /// Relocate instrumentation and move every child of the source into `destination`.
    pub fn transfer_into(self, destination: &NodeRef) {
        let source = self.relocate_to(destination);
        dom::move_children(&source, destination);
    }

    /// Strip this node's instrumentation without handing it to anything.
    /// Returns the number of attributes removed.
    pub fn discard(self) -> usize {
        let markers = instrumentation(&self.0);
        for (name, _) in &markers {
            dom::remove_attr(&self.0, name);
        }
        markers.len()
    }
}

/// Nodes appended to a block by one transplant.
#[derive(Debug, Clone, Default)]
pub struct RenderedSubtree {
    roots: Vec<NodeRef>,
}

impl RenderedSubtree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: NodeRef) {
        self.roots.push(node);
    }

    pub fn roots(&self) -> &[NodeRef] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Clear `block`, run `build`, and append what it produced.
///
/// The block is cleared before building; if `build` fails the block stays
/// empty and the error is returned.
pub fn transplant<T, F>(block: &NodeRef, build: F) -> BlockResult<(RenderedSubtree, T)>
where
    F: FnOnce(&mut RenderedSubtree) -> BlockResult<T>,
{
    dom::clear_children(block);
    let mut subtree = RenderedSubtree::new();
    let output = build(&mut subtree)?;
    for root in subtree.roots() {
        block.append(root.clone());
    }
    Ok((subtree, output))
}
