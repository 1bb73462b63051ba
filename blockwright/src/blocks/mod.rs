//! Block decorators.
//!
//! Every block follows the same two steps: decode its authoring table against
//! a constant [`BlockSchema`], then transplant a freshly built subtree into the
//! block element. A block only supplies its schema and a builder; defaulting,
//! clearing, and instrumentation bookkeeping live here and in
//! [`crate::transplant`].

pub mod accordion;
pub mod banner;
pub mod banner_v2;
pub mod banner_v3;
pub mod countdown;
pub mod info_banner;
pub mod pokemon;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use kuchiki::NodeRef;
use log::{debug, error, warn};

use crate::config::DecorateConfig;
use crate::decode::{BlockSchema, DecodedRecord, Decoder, MediaRef};
use crate::dom::{self, El};
use crate::error::{BlockError, BlockResult};
use crate::picture::{optimize_media, Breakpoint, PictureOptions};
use crate::table::AuthoringTable;
use crate::transplant::{move_instrumentation, transplant, RenderedSubtree};

pub use accordion::Accordion;
pub use banner::Banner;
pub use banner_v2::BannerV2;
pub use banner_v3::BannerV3;
pub use countdown::{Countdown, CountdownTimer};
pub use info_banner::InfoBanner;
pub use pokemon::PokemonWidget;

pub trait Block {
    /// Class token that marks an element as this block.
    const NAME: &'static str;
    const SCHEMA: BlockSchema;

    /// What the caller gets back to drive interactive behavior.
    type Handle;

    /// Build the block's subtree. Sources left in `record` afterwards have no
    /// destination and lose their instrumentation.
    fn build(record: &mut DecodedRecord, cx: &mut BuildContext<'_>) -> BlockResult<Self::Handle>;

    /// Shown in place of the block when decoding or building fails.
    fn error_view(error: &BlockError) -> NodeRef {
        inline_error(Self::NAME, &error.to_string())
    }
}

/// Settings shared by every block decorated in one pass.
#[derive(Debug, Clone)]
pub struct DecorateOptions {
    config: DecorateConfig,
    decoder: Decoder,
    pictures: PictureOptions,
    now: DateTime<Utc>,
}

impl DecorateOptions {
    pub fn new(config: DecorateConfig, now: DateTime<Utc>) -> BlockResult<Self> {
        Ok(DecorateOptions {
            decoder: config.decoder()?,
            pictures: PictureOptions::from_config(&config)?,
            config,
            now,
        })
    }

    /// Options evaluated against the current wall clock.
    pub fn from_config(config: DecorateConfig) -> BlockResult<Self> {
        Self::new(config, Utc::now())
    }

    pub fn config(&self) -> &DecorateConfig {
        &self.config
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn pictures(&self) -> &PictureOptions {
        &self.pictures
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

/// What a builder may touch while its block is being rebuilt.
pub struct BuildContext<'a> {
    block: &'a NodeRef,
    options: &'a DecorateOptions,
    subtree: &'a mut RenderedSubtree,
}

impl<'a> BuildContext<'a> {
    pub fn block(&self) -> &NodeRef {
        self.block
    }

    pub fn options(&self) -> &DecorateOptions {
        self.options
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.options.now
    }

    /// Append a top-level node to the block.
    pub fn append(&mut self, node: NodeRef) {
        self.subtree.push(node);
    }

    pub fn add_root_class(&self, class: &str) {
        dom::add_class(self.block, class);
    }

    pub fn root_attr(&self, name: &str) -> Option<String> {
        dom::get_attr(self.block, name)
    }

    /// Move the block root's own instrumentation onto `wrapper`.
    pub fn adopt_root(&self, wrapper: &NodeRef) -> usize {
        move_instrumentation(self.block, wrapper)
    }

    /// Optimized picture at the configured breakpoints. `None` when the image
    /// source cannot be resolved; the media region is then left out.
    pub fn picture(&self, media: MediaRef) -> Option<NodeRef> {
        optional_picture(media, &self.options.pictures)
    }

    pub fn picture_at(&self, media: MediaRef, breakpoints: Vec<Breakpoint>) -> Option<NodeRef> {
        optional_picture(media, &self.options.pictures.with_breakpoints(breakpoints))
    }
}

fn optional_picture(media: MediaRef, options: &PictureOptions) -> Option<NodeRef> {
    match optimize_media(media, options) {
        Ok(picture) => Some(picture),
        Err(err) => {
            warn!("leaving out image: {}", err);
            None
        }
    }
}

/// `<div class="{name}-error"><p>{message}</p></div>`
pub fn inline_error(name: &str, message: &str) -> NodeRef {
    El::new("div")
        .class(&format!("{}-error", name))
        .child(El::new("p").text(message).build())
        .build()
}

fn render_failure<B: Block>(block: &NodeRef, err: &BlockError) {
    error!("{} block failed: {}", B::NAME, err);
    dom::clear_children(block);
    block.append(B::error_view(err));
}

/// Decorate one block element in place.
///
/// On failure the block holds its error view and the error is returned.
pub fn decorate<B: Block>(block: &NodeRef, options: &DecorateOptions) -> BlockResult<B::Handle> {
    dom::add_class(block, B::NAME);
    let table = AuthoringTable::from_block(block);
    let mut record = match options.decoder.decode(&table, &B::SCHEMA) {
        Ok(record) => record,
        Err(err) => {
            render_failure::<B>(block, &err);
            return Err(err);
        }
    };
    debug!(
        "{}: {:?}",
        B::NAME,
        record.field_names().collect::<Vec<_>>()
    );

    let built = transplant(block, |subtree| {
        let mut cx = BuildContext {
            block,
            options,
            subtree,
        };
        let handle = B::build(&mut record, &mut cx)?;
        let dropped = record.discard_unclaimed();
        if !dropped.is_empty() {
            debug!("{}: no destination for {:?}", B::NAME, dropped);
        }
        Ok(handle)
    });
    match built {
        Ok((_, handle)) => Ok(handle),
        Err(err) => {
            render_failure::<B>(block, &err);
            Err(err)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Accordion,
    Banner,
    BannerV2,
    BannerV3,
    InfoBanner,
    Countdown,
    CountdownTimer,
    Pokemon,
}

impl BlockKind {
    pub const ALL: [BlockKind; 8] = [
        BlockKind::Accordion,
        BlockKind::Banner,
        BlockKind::BannerV2,
        BlockKind::BannerV3,
        BlockKind::InfoBanner,
        BlockKind::Countdown,
        BlockKind::CountdownTimer,
        BlockKind::Pokemon,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BlockKind::Accordion => Accordion::NAME,
            BlockKind::Banner => Banner::NAME,
            BlockKind::BannerV2 => BannerV2::NAME,
            BlockKind::BannerV3 => BannerV3::NAME,
            BlockKind::InfoBanner => InfoBanner::NAME,
            BlockKind::Countdown => Countdown::NAME,
            BlockKind::CountdownTimer => CountdownTimer::NAME,
            BlockKind::Pokemon => PokemonWidget::NAME,
        }
    }

    /// Block type of an element, read from its first class token.
    pub fn detect(node: &NodeRef) -> Option<BlockKind> {
        if !dom::is_element(node, "div") {
            return None;
        }
        dom::classes(node).first().and_then(|class| class.parse().ok())
    }
}

impl FromStr for BlockKind {
    type Err = BlockError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        BlockKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| BlockError::UnknownBlock {
                name: name.to_string(),
            })
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
