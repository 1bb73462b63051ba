//! Hero banner with a status badge and a meta panel.
//!
//! Rows: 0 heading, 1 description, 2 status text, 3 status icon, 4 link text,
//! 5 link url, 6 foreground image, 7 designer, 8 last updated, 9 version.

use super::banner::{claimed, html_region, media_picture};
use super::{Block, BuildContext};
use crate::decode::{BlockSchema, DecodedRecord, FieldSpec};
use crate::dom::{self, El};
use crate::error::BlockResult;

const FIELDS: &[FieldSpec] = &[
    FieldSpec::text("heading", 0).default_text("Hero banner"),
    FieldSpec::html("description", 1),
    FieldSpec::text("status", 2),
    FieldSpec::media("status_icon", 3),
    FieldSpec::text("link_text", 4),
    FieldSpec::text("link_url", 5),
    FieldSpec::media("foreground", 6),
    FieldSpec::text("designer", 7).default_text("-"),
    FieldSpec::text("updated", 8).default_text("-"),
    FieldSpec::text("version", 9).default_text("1.0.0"),
];

const META: [(&str, &str); 3] = [
    ("Designer", "designer"),
    ("Last updated", "updated"),
    ("Version", "version"),
];

pub struct BannerV3;

impl Block for BannerV3 {
    const NAME: &'static str = "banner-v3";
    const SCHEMA: BlockSchema = BlockSchema::new(FIELDS);
    type Handle = ();

    fn build(record: &mut DecodedRecord, cx: &mut BuildContext<'_>) -> BlockResult<()> {
        let status_and_links = El::new("div").class("status-and-links").build();

        if !record.text("status").is_empty() {
            let icon = record
                .take_media("status_icon")
                .and_then(|icon| cx.picture(icon))
                .map(|picture| El::new("div").class("icon").child(picture).build())
                .map(|icon| claimed(record, "status_icon", icon));
            let status = El::new("span").text(record.text("status")).build();
            status_and_links.append(
                El::new("div")
                    .class("status-badge")
                    .child_if(icon)
                    .child(claimed(record, "status", status))
                    .build(),
            );
        }

        let (link_text, link_url) = (record.text("link_text"), record.text("link_url"));
        if !link_text.is_empty() && !link_url.is_empty() {
            let link = El::new("a")
                .class("inline-link")
                .attr("href", link_url)
                .text(link_text)
                .build();
            let links = El::new("div")
                .class("links")
                .child(claimed(record, "link_text", link))
                .build();
            status_and_links.append(claimed(record, "link_url", links));
        }

        let description = html_region(record, "description", "div", Some("description"));
        if let Some(region) = &description {
            dom::trim_edges(region);
        }

        let heading = El::new("h1")
            .class("hero-heading")
            .text(record.text("heading"))
            .build();
        let content = El::new("div")
            .class("content")
            .child(
                El::new("div")
                    .class("top-line")
                    .child(El::new("div").class("logo-row").build())
                    .child(status_and_links)
                    .build(),
            )
            .child(claimed(record, "heading", heading))
            .child_if(description)
            .build();

        let mut groups = Vec::with_capacity(META.len());
        for (label, field) in META {
            let value = El::new("span")
                .class("meta-value")
                .text(record.text(field))
                .build();
            groups.push(
                El::new("div")
                    .class("meta-group")
                    .child(El::new("span").class("meta-label").text(label).build())
                    .child(claimed(record, field, value))
                    .build(),
            );
        }
        let meta_panel = El::new("div").class("meta-panel").children(groups).build();

        let wrapper = El::new("div")
            .class("banner-inner")
            .child(content)
            .child(meta_panel)
            .child_if(media_picture(record, "foreground", "foreground-image", cx))
            .build();
        cx.adopt_root(&wrapper);
        cx.append(wrapper);
        Ok(())
    }
}
