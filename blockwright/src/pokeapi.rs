//! PokeAPI client used by the `pokemon` block.
//!
//! One request per call, no retry, no cache. The HTTP client itself is shared
//! by the whole process and built on first use.

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::OnceCell;
use url::Url;

use crate::config::DecorateConfig;
use crate::error::{BlockError, BlockResult};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Pokemon '{identifier}' not found")]
    NotFound { identifier: String },

    #[error("Unexpected HTTP status {status}")]
    Status { status: u16 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedResource {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artwork {
    #[serde(default)]
    pub front_default: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherSprites {
    #[serde(
        rename = "official-artwork",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub official_artwork: Option<Artwork>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprites {
    #[serde(default)]
    pub front_default: Option<String>,
    #[serde(default)]
    pub other: OtherSprites,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSlot {
    #[serde(rename = "type")]
    pub kind: NamedResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatEntry {
    pub base_stat: u32,
    pub stat: NamedResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilitySlot {
    pub ability: NamedResource,
    #[serde(default)]
    pub is_hidden: bool,
}

/// The subset of a `/pokemon/{id}` response the card renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pokemon {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub sprites: Sprites,
    #[serde(default)]
    pub types: Vec<TypeSlot>,
    #[serde(default)]
    pub stats: Vec<StatEntry>,
    #[serde(default)]
    pub abilities: Vec<AbilitySlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_experience: Option<u32>,
}

impl Pokemon {
    /// Official artwork, falling back to the default front sprite.
    pub fn artwork(&self) -> Option<&str> {
        self.sprites
            .other
            .official_artwork
            .as_ref()
            .and_then(|art| art.front_default.as_deref())
            .filter(|src| !src.is_empty())
            .or(self.sprites.front_default.as_deref())
    }

    /// `#025` style id.
    pub fn display_id(&self) -> String {
        format!("#{:03}", self.id)
    }
}

pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[async_trait]
pub trait PokemonSource: Send + Sync {
    async fn fetch(&self, identifier: &str) -> Result<Pokemon, FetchError>;
}

static CLIENT: OnceCell<Client> = OnceCell::const_new();

/// Shared client; concurrent first callers wait on the same initialization.
async fn shared_client() -> Result<&'static Client, FetchError> {
    CLIENT
        .get_or_try_init(|| async {
            Client::builder()
                .user_agent(concat!("blockwright/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|err| FetchError::Transport(err.to_string()))
        })
        .await
}

#[derive(Debug, Clone)]
pub struct PokeApi {
    base: Url,
}

impl PokeApi {
    pub fn new(base: &str) -> BlockResult<Self> {
        let base = Url::parse(base).map_err(|err| BlockError::InvalidUrl {
            url: base.to_string(),
            reason: err.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(BlockError::InvalidUrl {
                url: base.to_string(),
                reason: "not a base URL".to_string(),
            });
        }
        Ok(PokeApi { base })
    }

    pub fn from_config(config: &DecorateConfig) -> BlockResult<Self> {
        Self::new(&config.pokeapi_base)
    }

    /// `{base}/api/v2/pokemon/{identifier}`, identifier lower-cased and
    /// percent-encoded as a single segment.
    pub fn endpoint(&self, identifier: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "v2", "pokemon"])
                .push(&identifier.to_lowercase());
        }
        url
    }
}

#[async_trait]
impl PokemonSource for PokeApi {
    async fn fetch(&self, identifier: &str) -> Result<Pokemon, FetchError> {
        let url = self.endpoint(identifier);
        debug!("GET {}", url);
        let client = shared_client().await?;
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(FetchError::NotFound {
                    identifier: identifier.to_string(),
                })
            }
            status => {
                return Err(FetchError::Status {
                    status: status.as_u16(),
                })
            }
        }

        let body = response
            .text()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        serde_json::from_str(&body).map_err(|err| FetchError::Decode(err.to_string()))
    }
}
