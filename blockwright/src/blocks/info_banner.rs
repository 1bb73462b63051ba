//! Dismissible alert banner.
//!
//! Rows: 0 type, 1 title, 2 description, 3/4 button text/link,
//! 5/6 link text/url, 7 show close button.

use std::fmt;

use kuchiki::NodeRef;

use super::banner::claimed;
use super::{Block, BuildContext};
use crate::decode::{BlockSchema, DecodedRecord, FieldSpec, Normalizer};
use crate::dom::{self, El};
use crate::error::BlockResult;

const DEFAULT_DESCRIPTION: &str =
    "Lorem ipsum is placeholder text commonly used in the graphic, print, and publishing industries.";

const FIELDS: &[FieldSpec] = &[
    FieldSpec::text("type", 0)
        .default_text("warning")
        .normalize(Normalizer::Lowercase),
    FieldSpec::text("title", 1).default_text("Alert Title"),
    FieldSpec::html("description", 2).default_text(DEFAULT_DESCRIPTION),
    FieldSpec::text("button_text", 3),
    FieldSpec::text("button_link", 4),
    FieldSpec::text("link_text", 5),
    FieldSpec::text("link_url", 6),
    FieldSpec::text("show_close", 7).default_bool(true),
];

const WARNING_ICON: &str = r##"<svg width="24" height="24" viewBox="0 0 24 24" fill="none" xmlns="http://www.w3.org/2000/svg"><path d="M12 2L22 20H2L12 2Z" stroke="#FF8E26" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"/><path d="M12 9V13" stroke="#FF8E26" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"/><path d="M12 17H12.01" stroke="#FF8E26" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"/></svg>"##;

const ERROR_ICON: &str = r##"<svg width="24" height="24" viewBox="0 0 24 24" fill="none" xmlns="http://www.w3.org/2000/svg"><circle cx="12" cy="12" r="10" stroke="#DC2626" stroke-width="2"/><path d="M15 9L9 15" stroke="#DC2626" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"/><path d="M9 9L15 15" stroke="#DC2626" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"/></svg>"##;

const SUCCESS_ICON: &str = r##"<svg width="24" height="24" viewBox="0 0 24 24" fill="none" xmlns="http://www.w3.org/2000/svg"><path d="M22 11.08V12A10 10 0 1 1 5.93 7.01" stroke="#16A34A" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"/><path d="M22 4L12 14.01L9 11.01" stroke="#16A34A" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"/></svg>"##;

const INFO_ICON: &str = r##"<svg width="24" height="24" viewBox="0 0 24 24" fill="none" xmlns="http://www.w3.org/2000/svg"><circle cx="12" cy="12" r="10" stroke="#2563EB" stroke-width="2"/><path d="M12 16V12" stroke="#2563EB" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"/><path d="M12 8H12.01" stroke="#2563EB" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"/></svg>"##;

const CLOSE_ICON: &str = r##"<svg width="16" height="16" viewBox="0 0 16 16" fill="none" xmlns="http://www.w3.org/2000/svg"><path d="M12 4L4 12" stroke="#666" stroke-width="1.5" stroke-linecap="round" stroke-linejoin="round"/><path d="M4 4L12 12" stroke="#666" stroke-width="1.5" stroke-linecap="round" stroke-linejoin="round"/></svg>"##;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertKind {
    #[default]
    Warning,
    Error,
    Success,
    Info,
}

impl AlertKind {
    /// Unknown names fall back to a warning.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "error" => AlertKind::Error,
            "success" => AlertKind::Success,
            "info" => AlertKind::Info,
            _ => AlertKind::Warning,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::Warning => "warning",
            AlertKind::Error => "error",
            AlertKind::Success => "success",
            AlertKind::Info => "info",
        }
    }

    fn icon(self) -> &'static str {
        match self {
            AlertKind::Warning => WARNING_ICON,
            AlertKind::Error => ERROR_ICON,
            AlertKind::Success => SUCCESS_ICON,
            AlertKind::Info => INFO_ICON,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct InfoBanner {
    root: NodeRef,
    kind: AlertKind,
    close_button: Option<NodeRef>,
}

impl InfoBanner {
    pub fn kind(&self) -> AlertKind {
        self.kind
    }

    pub fn close_button(&self) -> Option<&NodeRef> {
        self.close_button.as_ref()
    }

    /// What the close button does: hide the whole block. Returns false when
    /// the banner was rendered without one.
    pub fn close(&self) -> bool {
        if self.close_button.is_none() {
            return false;
        }
        dom::add_class(&self.root, "hidden");
        true
    }

    pub fn is_closed(&self) -> bool {
        dom::has_class(&self.root, "hidden")
    }
}

fn description(record: &mut DecodedRecord) -> NodeRef {
    let region = El::new("div").class("alert-description").build();
    if record.is_defaulted("description") {
        dom::set_inner_html(&region, record.html("description"));
        return claimed(record, "description", region);
    }
    if let Some(source) = record.take_source("description") {
        source.transfer_into(&region);
    }
    region
}

/// Text and target of a complete action pair.
fn pair(record: &DecodedRecord, text: &str, href: &str) -> Option<(String, String)> {
    let (text, href) = (record.text(text), record.text(href));
    (!text.is_empty() && !href.is_empty()).then(|| (text.to_string(), href.to_string()))
}

/// The link url cell has no node of its own and is dropped.
fn actions(record: &mut DecodedRecord) -> Option<NodeRef> {
    let button = pair(record, "button_text", "button_link").map(|(text, href)| {
        let anchor = El::new("a")
            .class("button-text")
            .attr("href", &href)
            .text(&text)
            .build();
        let button = El::new("div")
            .class("button")
            .child(claimed(record, "button_text", anchor))
            .build();
        claimed(record, "button_link", button)
    });
    let link = pair(record, "link_text", "link_url").map(|(text, href)| {
        let anchor = El::new("a")
            .class("link")
            .attr("href", &href)
            .text(&text)
            .build();
        claimed(record, "link_text", anchor)
    });
    if button.is_none() && link.is_none() {
        return None;
    }
    Some(
        El::new("div")
            .class("actions")
            .child_if(button)
            .child_if(link)
            .build(),
    )
}

impl Block for InfoBanner {
    const NAME: &'static str = "info-banner";
    const SCHEMA: BlockSchema = BlockSchema::new(FIELDS);
    type Handle = InfoBanner;

    fn build(record: &mut DecodedRecord, cx: &mut BuildContext<'_>) -> BlockResult<InfoBanner> {
        let kind = AlertKind::from_name(record.text("type"));
        cx.add_root_class(kind.as_str());

        let close_button = record.flag("show_close").then(|| {
            let button = El::new("button")
                .class("close-button")
                .html(CLOSE_ICON)
                .attr("aria-label", "Close banner")
                .build();
            claimed(record, "show_close", button)
        });

        let title = El::new("div")
            .class("alert-title")
            .text(record.text("title"))
            .build();
        let inner = El::new("div")
            .class("inner-content")
            .child(claimed(record, "title", title))
            .child(description(record))
            .child_if(actions(record))
            .build();

        let icon = El::new("div").class("warning-icon").html(kind.icon()).build();
        let content_wrapper = El::new("div")
            .class("content-wrapper")
            .child(claimed(record, "type", icon))
            .child(inner)
            .child_if(close_button.clone())
            .build();

        let banner = El::new("div")
            .class("info-banner-wrapper")
            .child(El::new("div").class("accent-bar").build())
            .child(
                El::new("div")
                    .class("banner-content")
                    .child(content_wrapper)
                    .build(),
            )
            .build();
        cx.adopt_root(&banner);
        cx.append(banner);

        Ok(InfoBanner {
            root: cx.block().clone(),
            kind,
            close_button,
        })
    }
}
