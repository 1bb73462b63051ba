//! Accordion: every row is one item, cell 0 the question, cell 1 the answer.
//!
//! The root attribute `data-single="true"` switches to single-open mode where
//! expanding an item collapses every other one.

use kuchiki::NodeRef;

use super::{Block, BuildContext};
use crate::decode::{BlockSchema, DecodedRecord, FieldSpec};
use crate::dom::{self, El};
use crate::error::BlockResult;

const ITEM_FIELDS: &[FieldSpec] = &[
    FieldSpec::html("question", 0),
    FieldSpec::html("answer", 0).cell(1),
];

#[derive(Debug, Clone)]
struct AccordionItem {
    trigger: NodeRef,
    panel: NodeRef,
}

impl AccordionItem {
    fn is_expanded(&self) -> bool {
        dom::get_attr(&self.trigger, "aria-expanded").as_deref() == Some("true")
    }

    fn set_expanded(&self, expanded: bool) {
        dom::set_attr(
            &self.trigger,
            "aria-expanded",
            if expanded { "true" } else { "false" },
        );
        dom::set_hidden(&self.panel, !expanded);
    }
}

#[derive(Debug, Clone)]
pub struct Accordion {
    items: Vec<AccordionItem>,
    single: bool,
}

impl Accordion {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_single(&self) -> bool {
        self.single
    }

    pub fn trigger(&self, index: usize) -> Option<&NodeRef> {
        self.items.get(index).map(|item| &item.trigger)
    }

    pub fn panel(&self, index: usize) -> Option<&NodeRef> {
        self.items.get(index).map(|item| &item.panel)
    }

    pub fn is_expanded(&self, index: usize) -> bool {
        self.items
            .get(index)
            .map(AccordionItem::is_expanded)
            .unwrap_or(false)
    }

    /// Indices of the items currently open.
    pub fn expanded(&self) -> Vec<usize> {
        (0..self.items.len())
            .filter(|&index| self.is_expanded(index))
            .collect()
    }

    /// Activate the trigger of item `index`, toggling it. Returns the item's
    /// new state, or `None` when there is no such item.
    pub fn activate(&self, index: usize) -> Option<bool> {
        let item = self.items.get(index)?;
        let was_expanded = item.is_expanded();
        if self.single {
            for other in self.items.iter().filter(|other| other.is_expanded()) {
                other.set_expanded(false);
            }
        }
        item.set_expanded(!was_expanded);
        Some(!was_expanded)
    }
}

impl Block for Accordion {
    const NAME: &'static str = "accordion";
    const SCHEMA: BlockSchema = BlockSchema::new(&[]).with_items(ITEM_FIELDS);
    type Handle = Accordion;

    fn build(record: &mut DecodedRecord, cx: &mut BuildContext<'_>) -> BlockResult<Accordion> {
        let single = cx.root_attr("data-single").as_deref() == Some("true");
        let wrapper = El::new("div").class("accordion-items").build();
        let mut items = Vec::new();

        for mut item in record.take_items() {
            let trigger_id = format!("accordion-trigger-{}", item.row);
            let panel_id = format!("accordion-panel-{}", item.row);

            let text = El::new("span").class("accordion-trigger-text").build();
            if let Some(question) = item.record.take_source("question") {
                question.transfer_into(&text);
                dom::trim_edges(&text);
            }
            let trigger = El::new("button")
                .attr("id", &trigger_id)
                .attr("type", "button")
                .class("accordion-trigger")
                .attr("aria-expanded", "false")
                .attr("aria-controls", &panel_id)
                .child(text)
                .child(
                    El::new("span")
                        .class("accordion-icon")
                        .attr("aria-hidden", "true")
                        .build(),
                )
                .build();

            let panel = El::new("div")
                .attr("id", &panel_id)
                .class("accordion-panel")
                .attr("hidden", "")
                .attr("role", "region")
                .attr("aria-labelledby", &trigger_id)
                .build();
            if let Some(answer) = item.record.take_source("answer") {
                answer.transfer_into(&panel);
            }

            wrapper.append(
                El::new("div")
                    .class("accordion-item")
                    .child(trigger.clone())
                    .child(panel.clone())
                    .build(),
            );
            items.push(AccordionItem { trigger, panel });
        }

        cx.append(wrapper);
        Ok(Accordion { items, single })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{decorate, DecorateOptions};
    use crate::config::DecorateConfig;
    use crate::transplant::instrumentation;
    use pretty_assertions::assert_eq;

    fn accordion(attrs: &[(&str, &str)], rows: &str) -> (NodeRef, Accordion) {
        let mut block = El::new("div").class("accordion");
        for (name, value) in attrs {
            block = block.attr(name, value);
        }
        let block = block.html(rows).build();
        let options = DecorateOptions::from_config(DecorateConfig::default()).unwrap();
        let handle = decorate::<Accordion>(&block, &options).unwrap();
        (block, handle)
    }

    const THREE: &str = "<div><div>A?</div><div><p>a</p></div></div>\
                         <div><div>B?</div><div><p>b</p></div></div>\
                         <div><div>C?</div><div><p>c</p></div></div>";

    #[test]
    fn test_items_markup() {
        let (block, handle) = accordion(
            &[],
            r#"<div><div data-aue-prop="q">  Why? </div><div data-aue-prop="a"><p>Because</p></div></div>"#,
        );
        assert_eq!(handle.len(), 1);
        let trigger = handle.trigger(0).unwrap();
        assert_eq!(dom::get_attr(trigger, "id").as_deref(), Some("accordion-trigger-0"));
        assert_eq!(
            dom::get_attr(trigger, "aria-controls").as_deref(),
            Some("accordion-panel-0")
        );
        let text = trigger.select_first(".accordion-trigger-text").unwrap();
        assert_eq!(dom::inner_html(text.as_node()), "Why?");
        assert_eq!(
            dom::get_attr(text.as_node(), "data-aue-prop").as_deref(),
            Some("q")
        );

        let panel = handle.panel(0).unwrap();
        assert!(dom::is_hidden(panel));
        assert_eq!(dom::get_attr(panel, "role").as_deref(), Some("region"));
        assert_eq!(dom::inner_html(panel), "<p>Because</p>");
        assert_eq!(dom::get_attr(panel, "data-aue-prop").as_deref(), Some("a"));

        assert_eq!(dom::element_children(&block).len(), 1);
        assert!(instrumentation(&block).is_empty());
    }

    #[test]
    fn test_blank_cells_keep_their_markers() {
        let (block, handle) = accordion(
            &[],
            r#"<div><div data-aue-prop="q1"></div><div data-aue-prop="a1"></div></div>"#,
        );
        assert_eq!(handle.len(), 1);
        let text = block.select_first(".accordion-trigger-text").unwrap();
        assert_eq!(
            dom::get_attr(text.as_node(), "data-aue-prop").as_deref(),
            Some("q1")
        );
        assert_eq!(
            dom::get_attr(handle.panel(0).unwrap(), "data-aue-prop").as_deref(),
            Some("a1")
        );
    }

    #[test]
    fn test_rows_without_cells_are_skipped_but_keep_numbering() {
        let (_, handle) = accordion(
            &[],
            "<div><div>A</div><div>a</div></div><div></div><div><div>C</div><div>c</div></div>",
        );
        assert_eq!(handle.len(), 2);
        assert_eq!(
            dom::get_attr(handle.trigger(1).unwrap(), "id").as_deref(),
            Some("accordion-trigger-2")
        );
    }

    #[test]
    fn test_multi_open_mode_keeps_others_open() {
        let (_, handle) = accordion(&[], THREE);
        assert!(!handle.is_single());
        assert_eq!(handle.activate(0), Some(true));
        assert_eq!(handle.activate(1), Some(true));
        assert_eq!(handle.expanded(), vec![0, 1]);
        assert!(!dom::is_hidden(handle.panel(0).unwrap()));
    }

    #[test]
    fn test_single_open_mode_collapses_others() {
        let (_, handle) = accordion(&[("data-single", "true")], THREE);
        assert!(handle.is_single());
        handle.activate(0);
        handle.activate(1);
        assert_eq!(handle.expanded(), vec![1]);
        assert!(dom::is_hidden(handle.panel(0).unwrap()));
        assert_eq!(
            dom::get_attr(handle.trigger(0).unwrap(), "aria-expanded").as_deref(),
            Some("false")
        );
    }

    #[test]
    fn test_activating_open_item_closes_it() {
        let (_, handle) = accordion(&[("data-single", "true")], THREE);
        handle.activate(2);
        assert_eq!(handle.activate(2), Some(false));
        assert!(handle.expanded().is_empty());
        assert_eq!(handle.activate(7), None);
    }
}
