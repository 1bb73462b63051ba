//! # Blockwright
//!
//! Decorators that turn author-produced block tables into semantic page markup.
//!
//! ## Features
//! - Positional row decoding with per-field defaults and normalization
//! - DOM transplant that moves editor instrumentation instead of copying it
//! - Responsive picture generation for authored images
//! - Accordion, banner, alert, countdown and PokeAPI demo blocks
//!
//! ## Example
//! ```ignore
//! use blockwright::{decorate_page, DecorateConfig, PokeApi};
//!
//! let html = r#"<div class="info-banner"><div><div>error</div></div></div>"#;
//! let config = DecorateConfig::default();
//! let api = PokeApi::from_config(&config)?;
//! let output = decorate_page(html, config, Some(&api)).await?;
//! ```

pub mod blocks;
pub mod config;
pub mod decode;
pub mod dom;
pub mod error;
pub mod page;
pub mod picture;
pub mod pokeapi;
pub mod reveal;
pub mod table;
pub mod transplant;

// --- Core types ---
pub use blocks::{decorate, Block, BlockKind, BuildContext, DecorateOptions};
pub use config::DecorateConfig;
pub use decode::{BlockSchema, CtaSpec, DecodedRecord, Decoder, FieldKind, FieldSpec, FieldValue};
pub use error::{BlockError, BlockResult};
pub use page::{BlockHandle, DecoratedBlock, Page};
pub use pokeapi::{FetchError, PokeApi, PokemonSource};
pub use table::AuthoringTable;
pub use transplant::{move_instrumentation, transplant, RenderedSubtree, SourceNode};

/// Decorate every block of an HTML page and return the resulting markup.
pub async fn decorate_page(
    html: &str,
    config: DecorateConfig,
    source: Option<&dyn PokemonSource>,
) -> BlockResult<String> {
    let options = DecorateOptions::from_config(config)?;
    let page = Page::parse(html);
    page.decorate(&options, source).await;
    Ok(page.to_html())
}
