use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::decode::Decoder;
use crate::error::BlockResult;
use crate::picture::Breakpoint;

pub const DEFAULT_POKEAPI_BASE: &str = "https://pokeapi.co";
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

/// Decoration settings, loadable from YAML. Every key is optional.
///
/// ```yaml
/// pageUrl: https://www.example.com/products/
/// eagerImages: false
/// breakpoints:
///   - media: "(min-width: 600px)"
///     width: 2000
///   - width: 750
/// pokeapiBase: https://pokeapi.co
/// tickIntervalMs: 1000
/// utcOffsetMinutes: 60
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DecorateConfig {
    /// Base URL relative image sources resolve against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    /// Width descriptors for optimized pictures when a block does not pick its own
    pub breakpoints: Vec<Breakpoint>,
    pub eager_images: bool,
    pub pokeapi_base: String,
    /// Countdown re-evaluation period
    pub tick_interval_ms: u64,
    /// Offset applied to countdown targets written without a zone
    pub utc_offset_minutes: i32,
}

impl Default for DecorateConfig {
    fn default() -> Self {
        DecorateConfig {
            page_url: None,
            breakpoints: Breakpoint::defaults(),
            eager_images: false,
            pokeapi_base: DEFAULT_POKEAPI_BASE.to_string(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            utc_offset_minutes: 0,
        }
    }
}

impl DecorateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(yaml: &str) -> BlockResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> BlockResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn decoder(&self) -> BlockResult<Decoder> {
        Decoder::with_offset_minutes(self.utc_offset_minutes)
    }

    /// Countdown tick period. A zero interval is read as one millisecond.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Configured breakpoints, or the defaults when the list is empty.
    pub fn breakpoints(&self) -> Vec<Breakpoint> {
        if self.breakpoints.is_empty() {
            Breakpoint::defaults()
        } else {
            self.breakpoints.clone()
        }
    }
}
