//! Countdown to a fixed instant.
//!
//! Rows: 0 pre message, 1 target, 2 post message, 3 font color,
//! 4 background color. `countdown-timer` reads the same fields from
//! universal-editor property markup when the table carries it.
//!
//! The handle is a two-state machine. While running, each tick rewrites the
//! day/hour/minute/second values. The first tick at or past the target hides
//! the display, shows the post message, and every later tick is a no-op.

use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use kuchiki::NodeRef;
use log::{debug, info};
use regex::Regex;

use super::{Block, BuildContext};
use crate::decode::{BlockSchema, DecodedRecord, FieldSpec, Normalizer};
use crate::dom::{self, El};
use crate::error::{BlockError, BlockResult};

pub const DEFAULT_FONT_COLOR: &str = "#ffffff";
pub const DEFAULT_BACKGROUND_COLOR: &str = "#772bcb";
pub const FORMAT_HINT: &str = "YYYY-MM-DD HH:MM:SS (e.g., 2024-12-25 23:59:59)";

const COUNTDOWN_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("pre_message", 0).default_text("Countdown ends in:"),
    FieldSpec::text("target", 1)
        .normalize(Normalizer::Timestamp)
        .required(),
    FieldSpec::text("post_message", 2).default_text("Time has expired!"),
    FieldSpec::text("font_color", 3).default_text(DEFAULT_FONT_COLOR),
    FieldSpec::text("background_color", 4).default_text(DEFAULT_BACKGROUND_COLOR),
];

const TIMER_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("pre_message", 0)
        .default_text("Countdown ends in:")
        .prop("preMessage"),
    FieldSpec::text("target", 1)
        .normalize(Normalizer::Timestamp)
        .required()
        .prop("targetDate"),
    FieldSpec::text("post_message", 2)
        .default_text("Time has expired!")
        .prop("postMessage"),
    FieldSpec::text("font_color", 3)
        .default_text(DEFAULT_FONT_COLOR)
        .prop("fontColor"),
    FieldSpec::text("background_color", 4)
        .default_text(DEFAULT_BACKGROUND_COLOR)
        .prop("backgroundColor"),
];

const UNITS: [(&str, &str); 4] = [
    ("countdown-days", "Days"),
    ("countdown-hours", "Hrs"),
    ("countdown-minutes", "Mins"),
    ("countdown-seconds", "Secs"),
];

const NAMED_COLORS: &[&str] = &[
    "red",
    "blue",
    "green",
    "white",
    "black",
    "transparent",
    "yellow",
    "orange",
    "purple",
    "pink",
    "gray",
    "grey",
];

/// `value` when it is a hex or named color, `fallback` otherwise.
pub fn css_color(value: &str, fallback: &str) -> String {
    static HEX_COLOR_REGEX: OnceLock<Regex> = OnceLock::new();
    let hex = HEX_COLOR_REGEX
        .get_or_init(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap());
    let value = value.trim();
    if hex.is_match(value) || NAMED_COLORS.contains(&value.to_ascii_lowercase().as_str()) {
        value.to_string()
    } else {
        debug!("ignoring color '{}', using {}", value, fallback);
        fallback.to_string()
    }
}

/// Whole days, hours, minutes and seconds left, each a floor-divided remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remaining {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Remaining {
    /// `None` once `now` has reached `target`.
    pub fn until(target: DateTime<Utc>, now: DateTime<Utc>) -> Option<Self> {
        let millis = (target - now).num_milliseconds();
        if millis <= 0 {
            return None;
        }
        let total = millis / 1000;
        Some(Remaining {
            days: total / 86_400,
            hours: total % 86_400 / 3_600,
            minutes: total % 3_600 / 60,
            seconds: total % 60,
        })
    }

    /// Zero-padded values in display order.
    pub fn fields(&self) -> [String; 4] {
        [self.days, self.hours, self.minutes, self.seconds].map(|value| format!("{:02}", value))
    }
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}:{:02}",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    Running,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Updated(Remaining),
    /// The transition; happens once.
    Expired,
    /// Already expired, nothing changed.
    Idle,
}

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall-clock time that advances with tokio's clock from a fixed anchor, so a
/// paused runtime drives it too.
#[derive(Debug, Clone, Copy)]
pub struct AnchoredClock {
    wall: DateTime<Utc>,
    origin: tokio::time::Instant,
}

impl AnchoredClock {
    pub fn starting_at(wall: DateTime<Utc>) -> Self {
        AnchoredClock {
            wall,
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Clock for AnchoredClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.origin.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.wall + elapsed
    }
}

#[derive(Debug, Clone)]
pub struct Countdown {
    target: DateTime<Utc>,
    state: CountdownState,
    pre_message: NodeRef,
    display: NodeRef,
    values: Vec<NodeRef>,
    post_message: NodeRef,
}

impl Countdown {
    pub fn target(&self) -> DateTime<Utc> {
        self.target
    }

    pub fn state(&self) -> CountdownState {
        self.state
    }

    pub fn is_expired(&self) -> bool {
        self.state == CountdownState::Expired
    }

    /// Rendered values joined as `DD:HH:MM:SS`.
    pub fn display_text(&self) -> String {
        self.values
            .iter()
            .map(dom::text)
            .collect::<Vec<_>>()
            .join(":")
    }

    pub fn post_message(&self) -> &NodeRef {
        &self.post_message
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> Tick {
        if self.is_expired() {
            return Tick::Idle;
        }
        match Remaining::until(self.target, now) {
            Some(remaining) => {
                for (node, value) in self.values.iter().zip(remaining.fields()) {
                    dom::set_text(node, &value);
                }
                Tick::Updated(remaining)
            }
            None => {
                dom::set_style_property(&self.pre_message, "display", "none");
                dom::set_style_property(&self.display, "display", "none");
                dom::set_style_property(&self.post_message, "display", "block");
                self.state = CountdownState::Expired;
                info!("countdown to {} expired", self.target);
                Tick::Expired
            }
        }
    }

    /// Tick once per `period` until the countdown expires. Returns at once if
    /// it already has.
    pub async fn run<C: Clock + ?Sized>(&mut self, clock: &C, period: Duration) {
        if self.is_expired() {
            return;
        }
        let start = tokio::time::Instant::now() + period;
        let mut interval = tokio::time::interval_at(start, period);
        loop {
            interval.tick().await;
            if !matches!(self.tick(clock.now()), Tick::Updated(_)) {
                break;
            }
        }
    }
}

fn build_countdown(
    record: &mut DecodedRecord,
    cx: &mut BuildContext<'_>,
    display_class: &str,
) -> BlockResult<Countdown> {
    let target = record
        .instant("target")
        .ok_or_else(|| BlockError::MissingRequired {
            field: "target".to_string(),
        })?;

    let pre_message = El::new("div")
        .class("countdown-pre-message")
        .text(record.text("pre_message"))
        .build();
    let post_message = El::new("div")
        .class("countdown-post-message")
        .text(record.text("post_message"))
        .build();
    dom::set_style_property(&post_message, "display", "none");

    let display = El::new("div").class(display_class).build();
    let mut values = Vec::with_capacity(UNITS.len());
    for (i, (class, label)) in UNITS.iter().enumerate() {
        if i > 0 {
            display.append(
                El::new("span")
                    .class("countdown-separator")
                    .text(":")
                    .build(),
            );
        }
        let value = El::new("span")
            .class("countdown-value")
            .class(class)
            .text("00")
            .build();
        display.append(
            El::new("div")
                .class("countdown-unit")
                .child(value.clone())
                .child(El::new("span").class("countdown-label").text(label).build())
                .build(),
        );
        values.push(value);
    }

    for (field, node) in [
        ("pre_message", &pre_message),
        ("target", &display),
        ("post_message", &post_message),
    ] {
        if let Some(source) = record.take_source(field) {
            source.relocate_to(node);
        }
    }

    let container = El::new("div")
        .class("countdown-container")
        .child(pre_message.clone())
        .child(display.clone())
        .child(post_message.clone())
        .build();
    dom::set_style_property(
        &container,
        "background-color",
        &css_color(record.text("background_color"), DEFAULT_BACKGROUND_COLOR),
    );
    dom::set_style_property(
        &container,
        "color",
        &css_color(record.text("font_color"), DEFAULT_FONT_COLOR),
    );
    cx.adopt_root(&container);
    cx.append(container);

    let mut countdown = Countdown {
        target,
        state: CountdownState::Running,
        pre_message,
        display,
        values,
        post_message,
    };
    countdown.tick(cx.now());
    Ok(countdown)
}

fn countdown_error(error: &BlockError) -> NodeRef {
    let (title, detail) = match error {
        BlockError::InvalidTimestamp { value, .. } => (
            "Error: Invalid Date Format".to_string(),
            format!("Target date \"{}\" is not valid.", value),
        ),
        BlockError::MissingRequired { .. } => (
            "Error: Missing Target Date".to_string(),
            "Please provide a target date for the countdown timer.".to_string(),
        ),
        other => ("Error".to_string(), other.to_string()),
    };
    El::new("div")
        .class("countdown-error")
        .attr("role", "alert")
        .child(El::new("strong").text(&title).build())
        .child(El::new("p").text(&detail).build())
        .child(
            El::new("p")
                .text(&format!("Format: {}", FORMAT_HINT))
                .build(),
        )
        .build()
}

impl Block for Countdown {
    const NAME: &'static str = "countdown";
    const SCHEMA: BlockSchema = BlockSchema::new(COUNTDOWN_FIELDS);
    type Handle = Countdown;

    fn build(record: &mut DecodedRecord, cx: &mut BuildContext<'_>) -> BlockResult<Countdown> {
        build_countdown(record, cx, "countdown-timer")
    }

    fn error_view(error: &BlockError) -> NodeRef {
        countdown_error(error)
    }
}

/// Same countdown, rendered with a `countdown-display` element and readable
/// from property markup.
pub struct CountdownTimer;

impl Block for CountdownTimer {
    const NAME: &'static str = "countdown-timer";
    const SCHEMA: BlockSchema = BlockSchema::new(TIMER_FIELDS);
    type Handle = Countdown;

    fn build(record: &mut DecodedRecord, cx: &mut BuildContext<'_>) -> BlockResult<Countdown> {
        build_countdown(record, cx, "countdown-display")
    }

    fn error_view(error: &BlockError) -> NodeRef {
        countdown_error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{decorate, DecorateOptions};
    use crate::config::DecorateConfig;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 25, h, m, s).unwrap()
    }

    fn options(now: DateTime<Utc>) -> DecorateOptions {
        DecorateOptions::new(DecorateConfig::default(), now).unwrap()
    }

    fn block(cells: &[&str]) -> NodeRef {
        let html: String = cells
            .iter()
            .map(|cell| format!("<div><div>{}</div></div>", cell))
            .collect();
        El::new("div").class("countdown").html(&html).build()
    }

    #[test]
    fn test_remaining_floor_division() {
        let target = at(12, 0, 0);
        let now = Utc.with_ymd_and_hms(2024, 12, 23, 10, 58, 49).unwrap();
        let remaining = Remaining::until(target, now).unwrap();
        assert_eq!(remaining.to_string(), "02:01:01:11");
        assert_eq!(
            Remaining::until(at(0, 0, 10), at(0, 0, 0)).unwrap().to_string(),
            "00:00:00:10"
        );
        assert_eq!(Remaining::until(at(0, 0, 0), at(0, 0, 0)), None);
        assert_eq!(Remaining::until(at(0, 0, 0), at(0, 0, 1)), None);
    }

    #[test]
    fn test_sub_second_remainder_still_runs() {
        let now = at(0, 0, 0);
        let target = now + chrono::Duration::milliseconds(400);
        assert_eq!(Remaining::until(target, now).unwrap().to_string(), "00:00:00:00");
    }

    #[test]
    fn test_initial_render_and_expiry() {
        let block = block(&["Sale ends in:", "2024-12-25 12:00:10"]);
        let mut countdown = decorate::<Countdown>(&block, &options(at(12, 0, 0))).unwrap();
        assert_eq!(countdown.state(), CountdownState::Running);
        assert_eq!(countdown.display_text(), "00:00:00:10");
        assert!(block.select_first(".countdown-container > .countdown-timer").is_ok());

        assert_eq!(
            countdown.tick(at(12, 0, 5)),
            Tick::Updated(Remaining {
                days: 0,
                hours: 0,
                minutes: 0,
                seconds: 5
            })
        );
        assert_eq!(countdown.tick(at(12, 0, 10)), Tick::Expired);
        assert!(countdown.is_expired());
        assert_eq!(
            dom::style_property(countdown.post_message(), "display").as_deref(),
            Some("block")
        );
        let timer = block.select_first(".countdown-timer").unwrap();
        assert_eq!(
            dom::style_property(timer.as_node(), "display").as_deref(),
            Some("none")
        );

        let before = block.to_string();
        assert_eq!(countdown.tick(at(12, 0, 11)), Tick::Idle);
        assert_eq!(countdown.tick(at(13, 0, 0)), Tick::Idle);
        assert_eq!(block.to_string(), before);
    }

    #[test]
    fn test_past_target_expires_at_decoration() {
        let block = block(&["", "2020-01-01"]);
        let countdown = decorate::<Countdown>(&block, &options(at(0, 0, 0))).unwrap();
        assert!(countdown.is_expired());
        assert_eq!(dom::text(countdown.post_message()), "Time has expired!");
    }

    #[test]
    fn test_colors_and_defaults() {
        let block = block(&["", "2030-01-01 00:00:00", "", "#abc", "url(evil)"]);
        decorate::<Countdown>(&block, &options(at(0, 0, 0))).unwrap();
        let container = block.select_first(".countdown-container").unwrap();
        let container = container.as_node();
        assert_eq!(dom::style_property(container, "color").as_deref(), Some("#abc"));
        assert_eq!(
            dom::style_property(container, "background-color").as_deref(),
            Some(DEFAULT_BACKGROUND_COLOR)
        );
        let pre = block.select_first(".countdown-pre-message").unwrap();
        assert_eq!(dom::text(pre.as_node()), "Countdown ends in:");
        assert_eq!(block.select(".countdown-separator").unwrap().count(), 3);
        assert_eq!(block.select(".countdown-label").unwrap().count(), 4);
    }

    #[test]
    fn test_css_color() {
        assert_eq!(css_color("Purple", "#000"), "Purple");
        assert_eq!(css_color("#12345", "#000"), "#000");
        assert_eq!(css_color(" #A1B2C3 ", "#000"), "#A1B2C3");
    }

    #[test]
    fn test_missing_target_renders_error() {
        let block = block(&["Soon"]);
        let err = decorate::<Countdown>(&block, &options(at(0, 0, 0))).unwrap_err();
        assert!(matches!(err, BlockError::MissingRequired { .. }));
        let error = block.select_first(".countdown-error > strong").unwrap();
        assert_eq!(dom::text(error.as_node()), "Error: Missing Target Date");
        assert!(block.select_first(".countdown-container").is_err());
    }

    #[test]
    fn test_invalid_target_renders_error() {
        let block = block(&["Soon", "next tuesday"]);
        let err = decorate::<Countdown>(&block, &options(at(0, 0, 0))).unwrap_err();
        assert!(err.is_validation());
        let text = dom::text(&block);
        assert!(text.contains("Error: Invalid Date Format"));
        assert!(text.contains("\"next tuesday\""));
        assert!(text.contains(FORMAT_HINT));
    }

    #[test]
    fn test_timer_reads_property_markup() {
        let block = El::new("div")
            .class("countdown-timer")
            .attr("data-aue-resource", "urn:countdown")
            .html(concat!(
                r#"<div><div><p data-aue-prop="targetDate">2024-12-25T12:01:00Z</p></div></div>"#,
                r#"<div><div><p data-aue-prop="preMessage">Doors open in</p></div></div>"#,
            ))
            .build();
        let countdown = decorate::<CountdownTimer>(&block, &options(at(12, 0, 0))).unwrap();
        assert_eq!(countdown.display_text(), "00:00:01:00");

        let pre = block.select_first(".countdown-pre-message").unwrap();
        assert_eq!(dom::text(pre.as_node()), "Doors open in");
        assert_eq!(
            dom::get_attr(pre.as_node(), "data-aue-prop").as_deref(),
            Some("preMessage")
        );
        let display = block.select_first(".countdown-display").unwrap();
        assert_eq!(
            dom::get_attr(display.as_node(), "data-aue-prop").as_deref(),
            Some("targetDate")
        );
        let container = block.select_first(".countdown-container").unwrap();
        assert_eq!(
            dom::get_attr(container.as_node(), "data-aue-resource").as_deref(),
            Some("urn:countdown")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_at_expiry() {
        let start = at(12, 0, 0);
        let block = block(&["", "2024-12-25 12:00:03"]);
        let mut countdown = decorate::<Countdown>(&block, &options(start)).unwrap();
        assert_eq!(countdown.display_text(), "00:00:00:03");

        let clock = AnchoredClock::starting_at(start);
        let began = tokio::time::Instant::now();
        countdown.run(&clock, Duration::from_secs(1)).await;

        assert!(countdown.is_expired());
        let elapsed = began.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4));
        // already expired: returns without waiting
        countdown.run(&clock, Duration::from_secs(1)).await;
        assert_eq!(began.elapsed(), elapsed);
    }
}
