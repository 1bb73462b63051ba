//! Responsive picture builder.
//!
//! Produces a `<picture>` with a WebP source per breakpoint, original-format
//! sources for every breakpoint but the last, and a fallback `<img>` at the
//! last breakpoint.

use kuchiki::NodeRef;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::DecorateConfig;
use crate::decode::MediaRef;
use crate::dom::{self, El};
use crate::error::{BlockError, BlockResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    pub width: u32,
}

impl Breakpoint {
    pub fn width(width: u32) -> Self {
        Breakpoint { media: None, width }
    }

    pub fn media(media: &str, width: u32) -> Self {
        Breakpoint {
            media: Some(media.to_string()),
            width,
        }
    }

    pub fn defaults() -> Vec<Breakpoint> {
        vec![
            Breakpoint::media("(min-width: 600px)", 2000),
            Breakpoint::width(750),
        ]
    }
}

#[derive(Debug, Clone, Default)]
pub struct PictureOptions {
    pub base: Option<Url>,
    pub eager: bool,
    pub breakpoints: Vec<Breakpoint>,
}

impl PictureOptions {
    pub fn from_config(config: &DecorateConfig) -> BlockResult<Self> {
        let base = match &config.page_url {
            Some(page_url) => Some(Url::parse(page_url).map_err(|err| BlockError::InvalidUrl {
                url: page_url.clone(),
                reason: err.to_string(),
            })?),
            None => None,
        };
        Ok(PictureOptions {
            base,
            eager: config.eager_images,
            breakpoints: config.breakpoints(),
        })
    }

    pub fn with_breakpoints(&self, breakpoints: Vec<Breakpoint>) -> Self {
        PictureOptions {
            breakpoints,
            ..self.clone()
        }
    }
}

/// Path component of `src`, resolved against `base` when relative.
fn source_path(src: &str, base: Option<&Url>) -> BlockResult<String> {
    let resolved = match base {
        Some(base) => base.join(src),
        None => match Url::parse(src) {
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Url::parse("http://localhost/").and_then(|root| root.join(src))
            }
            other => other,
        },
    };
    resolved
        .map(|url| url.path().to_string())
        .map_err(|err| BlockError::InvalidUrl {
            url: src.to_string(),
            reason: err.to_string(),
        })
}

fn extension(path: &str) -> &str {
    path.rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && !ext.contains('/'))
        .unwrap_or("jpg")
}

pub fn create_optimized_picture(
    src: &str,
    alt: &str,
    eager: bool,
    breakpoints: &[Breakpoint],
    base: Option<&Url>,
) -> BlockResult<NodeRef> {
    let defaults;
    let breakpoints = if breakpoints.is_empty() {
        defaults = Breakpoint::defaults();
        &defaults[..]
    } else {
        breakpoints
    };

    let path = source_path(src, base)?;
    let ext = extension(&path);
    let picture = dom::element("picture");

    for bp in breakpoints {
        let source = dom::element("source");
        if let Some(media) = &bp.media {
            dom::set_attr(&source, "media", media);
        }
        dom::set_attr(&source, "type", "image/webp");
        dom::set_attr(
            &source,
            "srcset",
            &format!("{}?width={}&format=webply&optimize=medium", path, bp.width),
        );
        picture.append(source);
    }

    let last = breakpoints.len() - 1;
    for (i, bp) in breakpoints.iter().enumerate() {
        let srcset = format!("{}?width={}&format={}&optimize=medium", path, bp.width, ext);
        if i < last {
            let source = dom::element("source");
            if let Some(media) = &bp.media {
                dom::set_attr(&source, "media", media);
            }
            dom::set_attr(&source, "srcset", &srcset);
            picture.append(source);
        } else {
            let img = El::new("img")
                .attr("loading", if eager { "eager" } else { "lazy" })
                .attr("alt", alt)
                .attr("src", &srcset)
                .build();
            picture.append(img);
        }
    }
    Ok(picture)
}

/// Replace an authored image with an optimized picture. The image's
/// instrumentation ends up on the new `<img>`, not on the `<picture>`.
pub fn optimize_media(media: MediaRef, options: &PictureOptions) -> BlockResult<NodeRef> {
    let picture = match create_optimized_picture(
        &media.src,
        &media.alt,
        options.eager,
        &options.breakpoints,
        options.base.as_ref(),
    ) {
        Ok(picture) => picture,
        Err(err) => {
            media.into_source().discard();
            return Err(err);
        }
    };
    if let Some(img) = picture.last_child() {
        media.into_source().relocate_to(&img);
    }
    Ok(picture)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{decode, BlockSchema, FieldSpec};
    use crate::table::AuthoringTable;
    use crate::transplant::instrumentation;

    fn children(node: &NodeRef) -> Vec<NodeRef> {
        dom::element_children(node)
    }

    #[test]
    fn test_default_breakpoints_layout() {
        let picture =
            create_optimized_picture("/media/hero.png", "Hero", false, &[], None).unwrap();
        let nodes = children(&picture);
        assert_eq!(nodes.len(), 4);
        assert_eq!(
            dom::get_attr(&nodes[0], "srcset").as_deref(),
            Some("/media/hero.png?width=2000&format=webply&optimize=medium")
        );
        assert_eq!(dom::get_attr(&nodes[0], "media").as_deref(), Some("(min-width: 600px)"));
        assert_eq!(dom::get_attr(&nodes[1], "type").as_deref(), Some("image/webp"));
        assert_eq!(
            dom::get_attr(&nodes[2], "srcset").as_deref(),
            Some("/media/hero.png?width=2000&format=png&optimize=medium")
        );
        assert!(dom::is_element(&nodes[3], "img"));
        assert_eq!(dom::get_attr(&nodes[3], "loading").as_deref(), Some("lazy"));
        assert_eq!(dom::get_attr(&nodes[3], "alt").as_deref(), Some("Hero"));
        assert_eq!(
            dom::get_attr(&nodes[3], "src").as_deref(),
            Some("/media/hero.png?width=750&format=png&optimize=medium")
        );
    }

    #[test]
    fn test_single_breakpoint_is_just_webp_and_img() {
        let picture = create_optimized_picture(
            "https://cdn.example.com/a/b.jpeg?x=1",
            "",
            true,
            &[Breakpoint::width(750)],
            None,
        )
        .unwrap();
        let nodes = children(&picture);
        assert_eq!(nodes.len(), 2);
        assert_eq!(
            dom::get_attr(&nodes[1], "src").as_deref(),
            Some("/a/b.jpeg?width=750&format=jpeg&optimize=medium")
        );
        assert_eq!(dom::get_attr(&nodes[1], "loading").as_deref(), Some("eager"));
    }

    #[test]
    fn test_relative_source_resolves_against_page() {
        let base = Url::parse("https://www.example.com/products/shoes").unwrap();
        let picture =
            create_optimized_picture("./media_1.webp", "", false, &[Breakpoint::width(100)], Some(&base))
                .unwrap();
        let img = picture.last_child().unwrap();
        assert_eq!(
            dom::get_attr(&img, "src").as_deref(),
            Some("/products/media_1.webp?width=100&format=webp&optimize=medium")
        );
    }

    #[test]
    fn test_instrumentation_lands_on_new_img() {
        const FIELDS: &[FieldSpec] = &[FieldSpec::media("image", 0)];
        let block = El::new("div")
            .html(r#"<div><div><picture><img src="/m.jpg" alt="m" data-aue-prop="image" data-aue-type="media"></picture></div></div>"#)
            .build();
        let mut record =
            decode(&AuthoringTable::from_block(&block), &BlockSchema::new(FIELDS)).unwrap();
        let media = record.take_media("image").unwrap();
        let original = media.node().clone();

        let picture = optimize_media(media, &PictureOptions::default()).unwrap();
        let img = picture.last_child().unwrap();
        assert_eq!(dom::get_attr(&img, "data-aue-prop").as_deref(), Some("image"));
        assert!(instrumentation(&picture).is_empty());
        assert!(instrumentation(&original).is_empty());
    }
}
