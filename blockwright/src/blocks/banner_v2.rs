//! Hero banner with themes, two calls-to-action and a reveal animation.
//!
//! Rows: 0 title, 1 description, 2 foreground image, 3 background image,
//! 4 footnote, 5/6 primary CTA, 7/8 secondary CTA, 9 animation, 10 theme.

use kuchiki::NodeRef;

use super::banner::{cta_link, html_region};
use super::{Block, BuildContext};
use crate::decode::{BlockSchema, CtaSpec, DecodedRecord, FieldSpec, Normalizer};
use crate::dom::El;
use crate::error::BlockResult;
use crate::picture::Breakpoint;
use crate::reveal::RevealObserver;

pub const REVEAL_CLASS: &str = "banner-v2-animate";
pub const REVEAL_THRESHOLD: f64 = 0.1;
const PICTURE_WIDTH: u32 = 750;

const FIELDS: &[FieldSpec] = &[
    FieldSpec::html("title", 0),
    FieldSpec::html("description", 1),
    FieldSpec::media("foreground", 2),
    FieldSpec::media("background", 3),
    FieldSpec::html("footnote", 4),
    FieldSpec::text("animation", 9)
        .default_text("fade-up")
        .normalize(Normalizer::Lowercase),
    FieldSpec::text("theme", 10)
        .default_text("purple")
        .normalize(Normalizer::Lowercase),
];

const CTAS: &[CtaSpec] = &[
    CtaSpec::new("ctas", 5, 6).style("primary"),
    CtaSpec::new("ctas", 7, 8).style("secondary"),
];

pub struct BannerV2;

impl BannerV2 {
    /// Picture inside a wrapper div; the cell's instrumentation goes on the
    /// wrapper, the image's on the new `<img>`.
    fn framed_picture(
        record: &mut DecodedRecord,
        field: &str,
        class: &str,
        cx: &BuildContext<'_>,
    ) -> Option<NodeRef> {
        let media = record.take_media(field)?;
        let picture = cx.picture_at(media, vec![Breakpoint::width(PICTURE_WIDTH)])?;
        let frame = El::new("div").class(class).child(picture).build();
        if let Some(cell) = record.take_source(field) {
            cell.relocate_to(&frame);
        }
        Some(frame)
    }
}

impl Block for BannerV2 {
    const NAME: &'static str = "banner-v2";
    const SCHEMA: BlockSchema = BlockSchema::new(FIELDS).with_ctas(CTAS);
    type Handle = RevealObserver;

    fn build(record: &mut DecodedRecord, cx: &mut BuildContext<'_>) -> BlockResult<RevealObserver> {
        let ctas = record.take_ctas("ctas");
        let content = El::new("div")
            .class("banner-v2-content")
            .child_if(html_region(record, "title", "h1", Some("banner-v2-title")))
            .child_if(html_region(
                record,
                "description",
                "div",
                Some("banner-v2-description"),
            ))
            .child_if(html_region(record, "footnote", "div", Some("banner-v2-footnote")))
            .child_if((!ctas.is_empty()).then(|| {
                El::new("div")
                    .class("banner-v2-ctas")
                    .children(ctas.into_iter().map(|cta| {
                        let class = format!(
                            "banner-v2-cta banner-v2-cta-{}",
                            cta.style.unwrap_or("primary")
                        );
                        cta_link(cta, &class)
                    }))
                    .build()
            }))
            .build();

        let decorative = El::new("div")
            .class("banner-v2-decorative")
            .children((1..=3).map(|i| {
                El::new("div")
                    .class("banner-v2-circle")
                    .class(&format!("banner-v2-circle-{}", i))
                    .build()
            }))
            .build();

        let container = El::new("div")
            .class("banner-v2-container")
            .class(&format!("banner-v2-theme-{}", record.text("theme")))
            .class(&format!("banner-v2-animation-{}", record.text("animation")))
            .child(content)
            .child(decorative)
            .build();
        // the animation cell has no node of its own
        if let Some(theme) = record.take_source("theme") {
            theme.relocate_to(&container);
        }
        cx.append(container);

        match Self::framed_picture(record, "background", "banner-v2-bg", cx) {
            Some(frame) => {
                cx.append(frame);
                cx.append(El::new("div").class("banner-v2-gradient-overlay").build());
            }
            None => cx.add_root_class("banner-v2-no-bg"),
        }

        if let Some(frame) = Self::framed_picture(record, "foreground", "banner-v2-fg", cx) {
            cx.append(frame);
        }

        Ok(RevealObserver::new(
            cx.block().clone(),
            REVEAL_CLASS,
            REVEAL_THRESHOLD,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{decorate, DecorateOptions};
    use crate::config::DecorateConfig;
    use crate::dom;
    use crate::transplant::instrumentation;
    use pretty_assertions::assert_eq;

    fn banner(cells: &[&str]) -> (NodeRef, RevealObserver) {
        let html: String = cells
            .iter()
            .map(|cell| format!("<div><div>{}</div></div>", cell))
            .collect();
        let block = El::new("div").class("banner-v2").html(&html).build();
        let options = DecorateOptions::from_config(DecorateConfig::default()).unwrap();
        let observer = decorate::<BannerV2>(&block, &options).unwrap();
        (block, observer)
    }

    #[test]
    fn test_theme_and_animation_defaults() {
        let (block, _) = banner(&["Hello"]);
        let container = block.select_first(".banner-v2-container").unwrap();
        let container = container.as_node();
        assert!(dom::has_class(container, "banner-v2-theme-purple"));
        assert!(dom::has_class(container, "banner-v2-animation-fade-up"));
        assert_eq!(block.select(".banner-v2-circle").unwrap().count(), 3);
        assert!(dom::has_class(&block, "banner-v2-no-bg"));
    }

    #[test]
    fn test_theme_and_animation_are_lowercased() {
        let cells = ["T", "", "", "", "", "", "", "", "", " Slide-In ", "TEAL"];
        let (block, _) = banner(&cells);
        let container = block.select_first(".banner-v2-container").unwrap();
        assert!(dom::has_class(container.as_node(), "banner-v2-theme-teal"));
        assert!(dom::has_class(container.as_node(), "banner-v2-animation-slide-in"));
    }

    #[test]
    fn test_primary_and_secondary_ctas() {
        let cells = [
            "T",
            "",
            "",
            "",
            "",
            "Buy",
            "https://shop.example",
            "Learn",
            "docs.example",
        ];
        let (block, _) = banner(&cells);
        let links: Vec<_> = block
            .select(".banner-v2-ctas > a")
            .unwrap()
            .map(|a| a.as_node().clone())
            .collect();
        assert_eq!(links.len(), 2);
        assert!(dom::has_class(&links[0], "banner-v2-cta-primary"));
        assert_eq!(dom::get_attr(&links[0], "href").as_deref(), Some("https://shop.example"));
        assert!(dom::has_class(&links[1], "banner-v2-cta-secondary"));
        assert_eq!(dom::get_attr(&links[1], "href").as_deref(), Some("https://docs.example"));
    }

    #[test]
    fn test_background_is_framed_at_single_width() {
        let (block, _) = banner(&[
            "T",
            "",
            "",
            r#"<picture><img src="/bg.jpg" alt="" data-aue-prop="bg"></picture>"#,
        ]);
        let frame = block.select_first(".banner-v2-bg").unwrap();
        let picture = frame.as_node().first_child().unwrap();
        let nodes = dom::element_children(&picture);
        assert_eq!(nodes.len(), 2);
        assert_eq!(
            dom::get_attr(&nodes[1], "src").as_deref(),
            Some("/bg.jpg?width=750&format=jpg&optimize=medium")
        );
        assert_eq!(dom::get_attr(&nodes[1], "data-aue-prop").as_deref(), Some("bg"));
        assert!(instrumentation(frame.as_node()).is_empty());
        assert!(block.select_first(".banner-v2-gradient-overlay").is_ok());
    }

    #[test]
    fn test_unresolvable_background_is_left_out() {
        let (block, _) = banner(&["T", "", "", r#"<img src="http://[oops/bg.png">"#]);
        assert!(block.select_first(".banner-v2-bg").is_err());
        assert!(block.select_first(".banner-v2-gradient-overlay").is_err());
        assert!(dom::has_class(&block, "banner-v2-no-bg"));
        assert!(block.select_first(".banner-v2-title").is_ok());
    }

    #[test]
    fn test_theme_marker_moves_to_container() {
        let mut cells: Vec<String> = (0..9).map(|_| String::new()).collect();
        cells[0] = "T".to_string();
        let html: String = cells
            .iter()
            .map(|cell| format!("<div><div>{}</div></div>", cell))
            .chain([
                r#"<div><div data-aue-prop="animation">zoom</div></div>"#.to_string(),
                r#"<div><div data-aue-prop="theme">Teal</div></div>"#.to_string(),
            ])
            .collect();
        let block = El::new("div").class("banner-v2").html(&html).build();
        let options = DecorateOptions::from_config(DecorateConfig::default()).unwrap();
        decorate::<BannerV2>(&block, &options).unwrap();

        let container = block.select_first(".banner-v2-container").unwrap();
        assert_eq!(
            dom::get_attr(container.as_node(), "data-aue-prop").as_deref(),
            Some("theme")
        );
        assert!(block.select_first("[data-aue-prop=animation]").is_err());
    }

    #[test]
    fn test_reveal_observer_targets_block() {
        let (block, mut observer) = banner(&["T"]);
        assert!(!observer.observe(0.05));
        assert!(observer.observe(0.5));
        assert!(dom::has_class(&block, REVEAL_CLASS));
        assert!(!observer.is_observing());
    }
}
