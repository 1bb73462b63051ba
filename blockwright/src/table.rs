//! Read-only view over a block's authoring table.
//!
//! A block element's element children are its rows and each row's element
//! children are its cells. The view is a snapshot: it holds references into the
//! tree but never mutates it.

use kuchiki::NodeRef;

use crate::dom;

/// Attribute the universal editor puts on elements bound to a model property.
pub const PROPERTY_ATTRIBUTE: &str = "data-aue-prop";

#[derive(Debug, Clone)]
pub struct Row {
    node: NodeRef,
    cells: Vec<NodeRef>,
}

impl Row {
    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    pub fn cells(&self) -> &[NodeRef] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<&NodeRef> {
        self.cells.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct AuthoringTable {
    root: NodeRef,
    rows: Vec<Row>,
}

impl AuthoringTable {
    pub fn from_block(block: &NodeRef) -> Self {
        let rows = dom::element_children(block)
            .into_iter()
            .map(|node| Row {
                cells: dom::element_children(&node),
                node,
            })
            .collect();
        AuthoringTable {
            root: block.clone(),
            rows,
        }
    }

    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn cell(&self, row: usize, cell: usize) -> Option<&NodeRef> {
        self.row(row).and_then(|r| r.cell(cell))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when the table was rendered with editor property bindings.
    pub fn has_properties(&self) -> bool {
        self.root
            .select_first(&format!("[{}]", PROPERTY_ATTRIBUTE))
            .is_ok()
    }

    /// First element bound to the named property.
    pub fn property(&self, name: &str) -> Option<NodeRef> {
        let selector = format!("[{}]", PROPERTY_ATTRIBUTE);
        self.root.select(&selector).ok()?.find_map(|el| {
            let node = el.as_node().clone();
            (dom::get_attr(&node, PROPERTY_ATTRIBUTE).as_deref() == Some(name)).then_some(node)
        })
    }
}
