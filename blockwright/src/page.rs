//! Page-level decoration: find every block in a document and decorate each
//! one in document order. A failing block never affects its siblings.

use std::time::Duration;

use kuchiki::NodeRef;
use log::{debug, warn};
use tokio::task::LocalSet;

use crate::blocks::countdown::{Clock, Countdown};
use crate::blocks::info_banner::InfoBanner;
use crate::blocks::{
    self, pokemon::PendingFetch, Accordion, Banner, BannerV2, BannerV3, BlockKind, CountdownTimer,
    DecorateOptions, PokemonWidget,
};
use crate::dom;
use crate::error::BlockResult;
use crate::pokeapi::{Pokemon, PokemonSource};
use crate::reveal::RevealObserver;

/// What decorating one block produced.
#[derive(Debug)]
pub enum BlockHandle {
    Accordion(Accordion),
    Banner,
    BannerV2(RevealObserver),
    BannerV3,
    InfoBanner(InfoBanner),
    Countdown(Countdown),
    /// Fetched data, or `None` when the fetch failed and the block shows an error.
    Pokemon(Option<Pokemon>),
    /// Decorated without a data source; still showing its loading state.
    PokemonPending(PendingFetch),
}

#[derive(Debug)]
pub struct DecoratedBlock {
    pub kind: BlockKind,
    pub element: NodeRef,
    pub result: BlockResult<BlockHandle>,
}

impl DecoratedBlock {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn countdown(&self) -> Option<&Countdown> {
        match &self.result {
            Ok(BlockHandle::Countdown(countdown)) => Some(countdown),
            _ => None,
        }
    }

    pub fn accordion(&self) -> Option<&Accordion> {
        match &self.result {
            Ok(BlockHandle::Accordion(accordion)) => Some(accordion),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Page {
    document: NodeRef,
}

impl Page {
    pub fn parse(html: &str) -> Self {
        Page {
            document: dom::parse_document(html),
        }
    }

    pub fn document(&self) -> &NodeRef {
        &self.document
    }

    /// Block elements in document order.
    pub fn blocks(&self) -> Vec<(BlockKind, NodeRef)> {
        let Ok(candidates) = self.document.select("div[class]") else {
            return Vec::new();
        };
        candidates
            .filter_map(|el| {
                let node = el.as_node().clone();
                BlockKind::detect(&node).map(|kind| (kind, node))
            })
            .collect()
    }

    /// Decorate every block. Pokemon blocks wait for their fetch when a
    /// `source` is given and are left loading otherwise.
    pub async fn decorate(
        &self,
        options: &DecorateOptions,
        source: Option<&dyn PokemonSource>,
    ) -> Vec<DecoratedBlock> {
        let mut decorated = Vec::new();
        for (kind, element) in self.blocks() {
            debug!("decorating {} block", kind);
            let result = decorate_one(kind, &element, options, source).await;
            if let Err(err) = &result {
                warn!("{} block degraded: {}", kind, err);
            }
            decorated.push(DecoratedBlock {
                kind,
                element,
                result,
            });
        }
        decorated
    }

    pub fn to_html(&self) -> String {
        self.document.to_string()
    }
}

async fn decorate_one(
    kind: BlockKind,
    element: &NodeRef,
    options: &DecorateOptions,
    source: Option<&dyn PokemonSource>,
) -> BlockResult<BlockHandle> {
    let handle = match kind {
        BlockKind::Accordion => BlockHandle::Accordion(blocks::decorate::<Accordion>(element, options)?),
        BlockKind::Banner => {
            blocks::decorate::<Banner>(element, options)?;
            BlockHandle::Banner
        }
        BlockKind::BannerV2 => BlockHandle::BannerV2(blocks::decorate::<BannerV2>(element, options)?),
        BlockKind::BannerV3 => {
            blocks::decorate::<BannerV3>(element, options)?;
            BlockHandle::BannerV3
        }
        BlockKind::InfoBanner => {
            BlockHandle::InfoBanner(blocks::decorate::<InfoBanner>(element, options)?)
        }
        BlockKind::Countdown => BlockHandle::Countdown(blocks::decorate::<Countdown>(element, options)?),
        BlockKind::CountdownTimer => {
            BlockHandle::Countdown(blocks::decorate::<CountdownTimer>(element, options)?)
        }
        BlockKind::Pokemon => {
            let pending = blocks::decorate::<PokemonWidget>(element, options)?;
            match source {
                Some(source) => BlockHandle::Pokemon(pending.resolve(source).await.ok()),
                None => BlockHandle::PokemonPending(pending),
            }
        }
    };
    Ok(handle)
}

/// Run every countdown side by side until each has expired, then hand them back.
pub async fn run_countdowns<C>(countdowns: Vec<Countdown>, clock: C, period: Duration) -> Vec<Countdown>
where
    C: Clock + Clone + 'static,
{
    let local = LocalSet::new();
    let tasks: Vec<_> = countdowns
        .into_iter()
        .map(|mut countdown| {
            let clock = clock.clone();
            local.spawn_local(async move {
                countdown.run(&clock, period).await;
                countdown
            })
        })
        .collect();
    local
        .run_until(async move {
            let mut finished = Vec::with_capacity(tasks.len());
            for task in tasks {
                match task.await {
                    Ok(countdown) => finished.push(countdown),
                    Err(err) => warn!("countdown task failed: {}", err),
                }
            }
            finished
        })
        .await
}
