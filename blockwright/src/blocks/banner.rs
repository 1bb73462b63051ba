//! Hero banner, first row layout.
//!
//! | row | field |
//! |-----|-------|
//! | 0 | title |
//! | 1 | description |
//! | 2 | foreground image |
//! | 3 | background image |
//! | 4 | footnote |
//! | 5, 6 | call-to-action text, link |

use kuchiki::NodeRef;

use super::{Block, BuildContext};
use crate::decode::{BlockSchema, Cta, CtaSpec, DecodedRecord, FieldSpec};
use crate::dom::{self, El};
use crate::error::BlockResult;

const FIELDS: &[FieldSpec] = &[
    FieldSpec::html("title", 0),
    FieldSpec::html("description", 1),
    FieldSpec::media("foreground", 2),
    FieldSpec::media("background", 3),
    FieldSpec::html("footnote", 4),
];

const CTAS: &[CtaSpec] = &[CtaSpec::new("ctas", 5, 6)];

/// Region built from an html field, or `None` when the field was empty.
pub(crate) fn html_region(
    record: &mut DecodedRecord,
    field: &str,
    tag: &str,
    class: Option<&str>,
) -> Option<NodeRef> {
    if record.is_defaulted(field) {
        return None;
    }
    let source = record.take_source(field)?;
    let mut region = El::new(tag);
    if let Some(class) = class {
        region = region.class(class);
    }
    let region = region.build();
    source.transfer_into(&region);
    Some(region)
}

/// `<a role="button">` for one call-to-action; its text cell's instrumentation
/// moves onto the anchor.
pub(crate) fn cta_link(cta: Cta, class: &str) -> NodeRef {
    let link = El::new("a")
        .attr("href", &cta.href)
        .class(class)
        .attr("role", "button")
        .text(&cta.text)
        .build();
    if let Some(source) = cta.source {
        source.relocate_to(&link);
    }
    link
}

/// Hand `node` the instrumentation of `field`'s cell.
pub(crate) fn claimed(record: &mut DecodedRecord, field: &str, node: NodeRef) -> NodeRef {
    if let Some(source) = record.take_source(field) {
        source.relocate_to(&node);
    }
    node
}

/// Optimized picture for a media field. The image's instrumentation goes on
/// the new `<img>`, the cell's on the `<picture>`.
pub(crate) fn media_picture(
    record: &mut DecodedRecord,
    field: &str,
    class: &str,
    cx: &BuildContext<'_>,
) -> Option<NodeRef> {
    let picture = cx.picture(record.take_media(field)?)?;
    dom::add_class(&picture, class);
    if let Some(cell) = record.take_source(field) {
        cell.relocate_to(&picture);
    }
    Some(picture)
}

pub struct Banner;

impl Block for Banner {
    const NAME: &'static str = "banner";
    const SCHEMA: BlockSchema = BlockSchema::new(FIELDS).with_ctas(CTAS);
    type Handle = ();

    fn build(record: &mut DecodedRecord, cx: &mut BuildContext<'_>) -> BlockResult<()> {
        let ctas = record.take_ctas("ctas");
        let content = El::new("div")
            .class("banner-content")
            .child_if(html_region(record, "title", "h1", None))
            .child_if(html_region(record, "description", "div", Some("banner-description")))
            .child_if(html_region(record, "footnote", "div", Some("banner-footnote")))
            .child_if((!ctas.is_empty()).then(|| {
                El::new("div")
                    .class("banner-ctas")
                    .children(ctas.into_iter().map(|cta| cta_link(cta, "banner-cta-primary")))
                    .build()
            }))
            .build();
        cx.append(El::new("div").class("banner-container").child(content).build());

        match media_picture(record, "background", "banner-bg", cx) {
            Some(picture) => {
                cx.append(picture);
                cx.append(El::new("div").class("banner-gradient-overlay").build());
            }
            None => cx.add_root_class("banner-no-bg"),
        }

        if let Some(picture) = media_picture(record, "foreground", "banner-fg", cx) {
            cx.append(picture);
        }
        Ok(())
    }
}
