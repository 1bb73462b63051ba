//! Demo card backed by PokeAPI.
//!
//! Decoration renders a loading state synchronously and hands back a
//! [`PendingFetch`]. Resolving it performs the one request this block makes
//! and swaps the loading state for the card or an inline error.

use kuchiki::NodeRef;
use log::{info, warn};

use super::banner::claimed;
use super::{Block, BuildContext, DecorateOptions};
use crate::decode::{BlockSchema, DecodedRecord, FieldSpec};
use crate::dom::{self, El};
use crate::error::BlockResult;
use crate::pokeapi::{capitalize, FetchError, Pokemon, PokemonSource};
use crate::transplant::move_instrumentation;

pub const DEFAULT_IDENTIFIER: &str = "pikachu";
/// Root class that adds size, stats and abilities to the card.
pub const DETAILED_CLASS: &str = "detailed";

const FIELDS: &[FieldSpec] =
    &[FieldSpec::text("identifier", 0).default_text(DEFAULT_IDENTIFIER)];

fn loading_view(label: NodeRef) -> NodeRef {
    El::new("div")
        .class("pokemon-loading")
        .child(El::new("div").class("pokemon-spinner").build())
        .child(label)
        .build()
}

fn error_view(message: &str) -> NodeRef {
    El::new("div")
        .class("pokemon-error")
        .child(El::new("p").text(&format!("❌ {}", message)).build())
        .child(
            El::new("p")
                .text("Please check the Pokemon name and try again.")
                .build(),
        )
        .build()
}

fn header(pokemon: &Pokemon) -> NodeRef {
    El::new("div")
        .class("pokemon-header")
        .child(
            El::new("h3")
                .class("pokemon-name")
                .text(&capitalize(&pokemon.name))
                .build(),
        )
        .child(
            El::new("span")
                .class("pokemon-id")
                .text(&pokemon.display_id())
                .build(),
        )
        .build()
}

fn image(pokemon: &Pokemon) -> Option<NodeRef> {
    let src = pokemon.artwork()?;
    Some(
        El::new("div")
            .class("pokemon-image-container")
            .child(
                El::new("img")
                    .attr("src", src)
                    .attr("alt", &format!("{} artwork", pokemon.name))
                    .class("pokemon-image")
                    .build(),
            )
            .build(),
    )
}

fn types(pokemon: &Pokemon) -> NodeRef {
    El::new("div")
        .class("pokemon-types")
        .children(pokemon.types.iter().map(|slot| {
            El::new("span")
                .class("pokemon-type")
                .class(&format!("pokemon-type-{}", slot.kind.name))
                .text(&capitalize(&slot.kind.name))
                .build()
        }))
        .build()
}

fn info_item(label: &str, value: String) -> NodeRef {
    El::new("div")
        .class("pokemon-info-item")
        .child(El::new("span").class("pokemon-info-label").text(label).build())
        .child(El::new("span").class("pokemon-info-value").text(&value).build())
        .build()
}

/// Height and weight come in decimetres and hectograms.
fn details(pokemon: &Pokemon) -> Vec<NodeRef> {
    let mut info = Vec::new();
    if let Some(height) = pokemon.height {
        info.push(info_item("Height", format!("{:.1} m", height as f64 / 10.0)));
    }
    if let Some(weight) = pokemon.weight {
        info.push(info_item("Weight", format!("{:.1} kg", weight as f64 / 10.0)));
    }
    if let Some(experience) = pokemon.base_experience {
        info.push(info_item("Base experience", experience.to_string()));
    }

    let stats = pokemon.stats.iter().map(|entry| {
        El::new("div")
            .class("pokemon-stat")
            .child(
                El::new("span")
                    .class("pokemon-stat-name")
                    .text(&capitalize(&entry.stat.name))
                    .build(),
            )
            .child(
                El::new("span")
                    .class("pokemon-stat-value")
                    .text(&entry.base_stat.to_string())
                    .build(),
            )
            .build()
    });

    let abilities = pokemon.abilities.iter().map(|slot| {
        let name = capitalize(&slot.ability.name);
        let ability = El::new("span").class("pokemon-ability");
        if slot.is_hidden {
            ability
                .class("pokemon-ability-hidden")
                .text(&format!("{} (hidden)", name))
                .build()
        } else {
            ability.text(&name).build()
        }
    });

    vec![
        El::new("div").class("pokemon-info").children(info).build(),
        El::new("div").class("pokemon-stats").children(stats).build(),
        El::new("div")
            .class("pokemon-abilities")
            .children(abilities)
            .build(),
    ]
}

pub fn card(pokemon: &Pokemon, detailed: bool) -> NodeRef {
    let card = El::new("div")
        .class("pokemon-card")
        .class(if detailed {
            "pokemon-card-detailed"
        } else {
            "pokemon-card-compact"
        })
        .child(header(pokemon))
        .child_if(image(pokemon))
        .child(types(pokemon));
    if detailed {
        card.children(details(pokemon)).build()
    } else {
        card.build()
    }
}

/// The block's single outstanding request. Resolving consumes it.
#[derive(Debug)]
pub struct PendingFetch {
    app: NodeRef,
    /// Carries the identifier cell's instrumentation until the request settles.
    label: NodeRef,
    identifier: String,
    detailed: bool,
}

impl PendingFetch {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn app(&self) -> &NodeRef {
        &self.app
    }

    pub async fn resolve(self, source: &dyn PokemonSource) -> Result<Pokemon, FetchError> {
        let result = source.fetch(&self.identifier).await;
        let view = match &result {
            Ok(pokemon) => {
                info!("loaded {} {}", pokemon.display_id(), pokemon.name);
                card(pokemon, self.detailed)
            }
            Err(err) => {
                warn!("pokemon '{}' failed: {}", self.identifier, err);
                let message = match err {
                    FetchError::NotFound { .. } | FetchError::Status { .. } => {
                        format!("Could not find Pokemon: {}", self.identifier)
                    }
                    FetchError::Transport(_) | FetchError::Decode(_) => {
                        "Failed to load Pokemon data".to_string()
                    }
                };
                error_view(&message)
            }
        };
        // the name heading on a card, the message line on an error
        if let Ok(dest) = view.select_first(".pokemon-name, p") {
            move_instrumentation(&self.label, dest.as_node());
        }
        dom::clear_children(&self.app);
        self.app.append(view);
        result
    }
}

pub struct PokemonWidget;

impl Block for PokemonWidget {
    const NAME: &'static str = "pokemon";
    const SCHEMA: BlockSchema = BlockSchema::new(FIELDS);
    type Handle = PendingFetch;

    fn build(record: &mut DecodedRecord, cx: &mut BuildContext<'_>) -> BlockResult<PendingFetch> {
        let label = El::new("p").text("Loading Pokemon data...").build();
        let label = claimed(record, "identifier", label);
        let app = El::new("div").child(loading_view(label.clone())).build();
        cx.adopt_root(&app);
        cx.append(app.clone());
        Ok(PendingFetch {
            app,
            label,
            identifier: record.text("identifier").to_string(),
            detailed: dom::has_class(cx.block(), DETAILED_CLASS),
        })
    }
}

/// Decorate and wait for the fetch. Fetch failures are rendered, not returned.
pub async fn decorate(
    block: &NodeRef,
    options: &DecorateOptions,
    source: &dyn PokemonSource,
) -> BlockResult<Option<Pokemon>> {
    let pending = super::decorate::<PokemonWidget>(block, options)?;
    Ok(pending.resolve(source).await.ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecorateConfig;
    use crate::pokeapi::{AbilitySlot, NamedResource, Sprites, StatEntry, TypeSlot};
    use crate::transplant::instrumentation;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    fn named(name: &str) -> NamedResource {
        NamedResource {
            name: name.to_string(),
        }
    }

    fn pikachu() -> Pokemon {
        Pokemon {
            id: 25,
            name: "pikachu".to_string(),
            sprites: Sprites {
                front_default: Some("https://img.example/25.png".to_string()),
                ..Sprites::default()
            },
            types: vec![TypeSlot {
                kind: named("electric"),
            }],
            stats: vec![StatEntry {
                base_stat: 90,
                stat: named("speed"),
            }],
            abilities: vec![
                AbilitySlot {
                    ability: named("static"),
                    is_hidden: false,
                },
                AbilitySlot {
                    ability: named("lightning-rod"),
                    is_hidden: true,
                },
            ],
            height: Some(4),
            weight: Some(60),
            base_experience: Some(112),
        }
    }

    /// Knows only pikachu; records every identifier asked for.
    #[derive(Default)]
    struct Stub {
        requests: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PokemonSource for Stub {
        async fn fetch(&self, identifier: &str) -> Result<Pokemon, FetchError> {
            self.requests.lock().unwrap().push(identifier.to_string());
            match identifier.to_lowercase().as_str() {
                "pikachu" => Ok(pikachu()),
                "offline" => Err(FetchError::Transport("connection refused".to_string())),
                _ => Err(FetchError::NotFound {
                    identifier: identifier.to_string(),
                }),
            }
        }
    }

    fn block(classes: &[&str], html: &str) -> NodeRef {
        let mut block = El::new("div").class("pokemon");
        for class in classes {
            block = block.class(class);
        }
        block.attr("data-aue-resource", "urn:pokemon").html(html).build()
    }

    fn options() -> DecorateOptions {
        DecorateOptions::from_config(DecorateConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_loading_then_card() {
        let block = block(&[], "<div><div>Pikachu</div></div>");
        let pending = crate::blocks::decorate::<PokemonWidget>(&block, &options()).unwrap();
        assert!(block.select_first(".pokemon-loading > .pokemon-spinner").is_ok());
        assert_eq!(
            dom::get_attr(pending.app(), "data-aue-resource").as_deref(),
            Some("urn:pokemon")
        );
        assert!(instrumentation(&block).is_empty());

        let stub = Stub::default();
        let pokemon = pending.resolve(&stub).await.unwrap();
        assert_eq!(pokemon.id, 25);
        assert!(block.select_first(".pokemon-loading").is_err());

        let name = block.select_first(".pokemon-card-compact .pokemon-name").unwrap();
        assert_eq!(dom::text(name.as_node()), "Pikachu");
        let id = block.select_first(".pokemon-id").unwrap();
        assert_eq!(dom::text(id.as_node()), "#025");
        let img = block.select_first("img.pokemon-image").unwrap();
        assert_eq!(
            dom::get_attr(img.as_node(), "alt").as_deref(),
            Some("pikachu artwork")
        );
        let badge = block.select_first(".pokemon-type.pokemon-type-electric").unwrap();
        assert_eq!(dom::text(badge.as_node()), "Electric");
        assert!(block.select_first(".pokemon-stats").is_err());
    }

    #[tokio::test]
    async fn test_identifier_marker_follows_the_request() {
        let html = r#"<div><div data-aue-prop="identifier">Pikachu</div></div>"#;
        let found = block(&[], html);
        let pending = crate::blocks::decorate::<PokemonWidget>(&found, &options()).unwrap();
        let label = found.select_first(".pokemon-loading > p").unwrap();
        assert_eq!(
            dom::get_attr(label.as_node(), "data-aue-prop").as_deref(),
            Some("identifier")
        );
        pending.resolve(&Stub::default()).await.unwrap();
        let name = found.select_first("h3.pokemon-name").unwrap();
        assert_eq!(
            dom::get_attr(name.as_node(), "data-aue-prop").as_deref(),
            Some("identifier")
        );
        assert_eq!(found.select("[data-aue-prop]").unwrap().count(), 1);

        let missing = block(&[], r#"<div><div data-aue-prop="identifier">missingno</div></div>"#);
        decorate(&missing, &options(), &Stub::default()).await.unwrap();
        let message = missing.select_first(".pokemon-error p").unwrap();
        assert_eq!(
            dom::get_attr(message.as_node(), "data-aue-prop").as_deref(),
            Some("identifier")
        );
    }

    #[tokio::test]
    async fn test_empty_block_asks_for_pikachu_once() {
        let block = block(&[], "");
        let stub = Stub::default();
        decorate(&block, &options(), &stub).await.unwrap();
        assert_eq!(*stub.requests.lock().unwrap(), vec!["pikachu".to_string()]);
    }

    #[tokio::test]
    async fn test_not_found_renders_error_without_card() {
        let block = block(&[], "<div><div>missingno</div></div>");
        let found = decorate(&block, &options(), &Stub::default()).await.unwrap();
        assert!(found.is_none());
        assert!(block.select_first(".pokemon-card").is_err());
        let error = block.select_first(".pokemon-error").unwrap();
        let text = dom::text(error.as_node());
        assert!(text.contains("❌ Could not find Pokemon: missingno"));
        assert!(text.contains("Please check the Pokemon name and try again."));
    }

    #[tokio::test]
    async fn test_transport_failure_message() {
        let block = block(&[], "<div><div>offline</div></div>");
        decorate(&block, &options(), &Stub::default()).await.unwrap();
        let error = block.select_first(".pokemon-error p").unwrap();
        assert_eq!(dom::text(error.as_node()), "❌ Failed to load Pokemon data");
    }

    #[tokio::test]
    async fn test_detailed_card() {
        let block = block(&[DETAILED_CLASS], "<div><div>pikachu</div></div>");
        decorate(&block, &options(), &Stub::default()).await.unwrap();
        assert!(block.select_first(".pokemon-card-detailed").is_ok());
        let values: Vec<String> = block
            .select(".pokemon-info-value")
            .unwrap()
            .map(|el| dom::text(el.as_node()))
            .collect();
        assert_eq!(values, vec!["0.4 m", "6.0 kg", "112"]);
        let stat = block.select_first(".pokemon-stat-name").unwrap();
        assert_eq!(dom::text(stat.as_node()), "Speed");
        let hidden = block.select_first(".pokemon-ability-hidden").unwrap();
        assert_eq!(dom::text(hidden.as_node()), "Lightning-rod (hidden)");
    }
}
