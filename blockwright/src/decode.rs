//! Row decoder: positional extraction of a typed record from an authoring table.
//!
//! Each block declares its fields as a constant [`BlockSchema`]. Decoding never
//! fails on malformed input; absent or empty cells resolve to the declared
//! default. The only errors are required fields that are missing or cannot be
//! parsed.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use kuchiki::NodeRef;
use log::debug;

use crate::dom;
use crate::error::{BlockError, BlockResult};
use crate::table::AuthoringTable;
use crate::transplant::SourceNode;

/// What a cell is read as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Trimmed text content.
    Text,
    /// Inner markup, verbatim.
    Html,
    /// First image inside the cell.
    Media,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalizer {
    Lowercase,
    /// `true`/`false`, case-insensitive; anything else keeps the default.
    Boolean,
    /// Prefix `https://` unless the value already starts with `http`.
    CompleteUrlScheme,
    /// Parse as a point in time.
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    Empty,
    Text(&'static str),
    Bool(bool),
}

/// One positional field of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub row: usize,
    pub cell: usize,
    pub kind: FieldKind,
    pub default: FieldDefault,
    pub normalizer: Option<Normalizer>,
    /// Editor property name, used instead of the position when the table
    /// carries property bindings.
    pub prop: Option<&'static str>,
    pub required: bool,
}

impl FieldSpec {
    const fn new(name: &'static str, row: usize, kind: FieldKind) -> Self {
        FieldSpec {
            name,
            row,
            cell: 0,
            kind,
            default: FieldDefault::Empty,
            normalizer: None,
            prop: None,
            required: false,
        }
    }

    pub const fn text(name: &'static str, row: usize) -> Self {
        Self::new(name, row, FieldKind::Text)
    }

    pub const fn html(name: &'static str, row: usize) -> Self {
        Self::new(name, row, FieldKind::Html)
    }

    pub const fn media(name: &'static str, row: usize) -> Self {
        Self::new(name, row, FieldKind::Media)
    }

    pub const fn cell(self, cell: usize) -> Self {
        FieldSpec { cell, ..self }
    }

    pub const fn default_text(self, text: &'static str) -> Self {
        FieldSpec {
            default: FieldDefault::Text(text),
            ..self
        }
    }

    pub const fn default_bool(self, value: bool) -> Self {
        FieldSpec {
            default: FieldDefault::Bool(value),
            normalizer: Some(Normalizer::Boolean),
            ..self
        }
    }

    pub const fn normalize(self, normalizer: Normalizer) -> Self {
        FieldSpec {
            normalizer: Some(normalizer),
            ..self
        }
    }

    pub const fn prop(self, prop: &'static str) -> Self {
        FieldSpec {
            prop: Some(prop),
            ..self
        }
    }

    pub const fn required(self) -> Self {
        FieldSpec {
            required: true,
            ..self
        }
    }

    fn default_value(&self) -> FieldValue {
        match (self.kind, self.normalizer) {
            (FieldKind::Media, _) => FieldValue::Media(None),
            (_, Some(Normalizer::Boolean)) => FieldValue::Bool(match self.default {
                FieldDefault::Bool(value) => value,
                _ => false,
            }),
            (_, Some(Normalizer::Timestamp)) => FieldValue::Instant(None),
            (kind, _) => {
                let text = match self.default {
                    FieldDefault::Text(text) => text.to_string(),
                    _ => String::new(),
                };
                if kind == FieldKind::Html {
                    FieldValue::Html(text)
                } else {
                    FieldValue::Text(text)
                }
            }
        }
    }
}

/// A call-to-action built from a text row and the link row that pairs with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CtaSpec {
    /// Record field the pair is appended to.
    pub list: &'static str,
    pub text_row: usize,
    pub link_row: usize,
    pub style: Option<&'static str>,
}

impl CtaSpec {
    pub const fn new(list: &'static str, text_row: usize, link_row: usize) -> Self {
        CtaSpec {
            list,
            text_row,
            link_row,
            style: None,
        }
    }

    pub const fn style(self, style: &'static str) -> Self {
        CtaSpec {
            style: Some(style),
            ..self
        }
    }
}

/// Record field repeated rows are collected into.
pub const ITEMS_FIELD: &str = "items";

#[derive(Debug, Clone, Copy)]
pub struct BlockSchema {
    pub fields: &'static [FieldSpec],
    pub ctas: &'static [CtaSpec],
    /// When set, every row with cells is also decoded as one item.
    pub items: Option<&'static [FieldSpec]>,
}

impl BlockSchema {
    pub const fn new(fields: &'static [FieldSpec]) -> Self {
        BlockSchema {
            fields,
            ctas: &[],
            items: None,
        }
    }

    pub const fn with_ctas(self, ctas: &'static [CtaSpec]) -> Self {
        BlockSchema { ctas, ..self }
    }

    pub const fn with_items(self, items: &'static [FieldSpec]) -> Self {
        BlockSchema {
            items: Some(items),
            ..self
        }
    }
}

/// An image found in a cell. Owns the `<img>` as a consumed source so its
/// instrumentation can be handed to the optimized replacement.
#[derive(Debug, PartialEq)]
pub struct MediaRef {
    pub src: String,
    pub alt: String,
    source: SourceNode,
}

impl MediaRef {
    pub fn node(&self) -> &NodeRef {
        self.source.node()
    }

    pub fn into_source(self) -> SourceNode {
        self.source
    }
}

#[derive(Debug, PartialEq)]
pub struct Cta {
    pub text: String,
    pub href: String,
    pub style: Option<&'static str>,
    pub source: Option<SourceNode>,
}

/// One repeated row decoded on its own.
#[derive(Debug, PartialEq)]
pub struct Item {
    /// Position of the row in the table, counting rows that were skipped.
    pub row: usize,
    pub record: DecodedRecord,
}

#[derive(Debug, PartialEq)]
pub enum FieldValue {
    Text(String),
    Html(String),
    Media(Option<MediaRef>),
    Bool(bool),
    Instant(Option<DateTime<Utc>>),
    Ctas(Vec<Cta>),
    Items(Vec<Item>),
}

/// Field name to resolved value. Every field a schema declares is present.
#[derive(Debug, Default, PartialEq)]
pub struct DecodedRecord {
    values: BTreeMap<&'static str, FieldValue>,
    sources: BTreeMap<&'static str, SourceNode>,
    /// Fields whose cell was absent or blank.
    defaulted: BTreeSet<&'static str>,
    /// Cells read for a CTA list that no `Cta` owns: link cells, and both
    /// cells of an incomplete pair.
    spare: Vec<(&'static str, SourceNode)>,
}

impl DecodedRecord {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }

    /// Text or markup of a field; empty for other kinds.
    pub fn text(&self, name: &str) -> &str {
        match self.values.get(name) {
            Some(FieldValue::Text(text)) | Some(FieldValue::Html(text)) => text,
            _ => "",
        }
    }

    pub fn html(&self, name: &str) -> &str {
        self.text(name)
    }

    pub fn flag(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(FieldValue::Bool(true)))
    }

    pub fn instant(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.values.get(name) {
            Some(FieldValue::Instant(instant)) => *instant,
            _ => None,
        }
    }

    pub fn media(&self, name: &str) -> Option<&MediaRef> {
        match self.values.get(name) {
            Some(FieldValue::Media(media)) => media.as_ref(),
            _ => None,
        }
    }

    pub fn take_media(&mut self, name: &str) -> Option<MediaRef> {
        match self.values.get_mut(name) {
            Some(FieldValue::Media(media)) => media.take(),
            _ => None,
        }
    }

    pub fn ctas(&self, name: &str) -> &[Cta] {
        match self.values.get(name) {
            Some(FieldValue::Ctas(ctas)) => ctas,
            _ => &[],
        }
    }

    pub fn take_ctas(&mut self, name: &str) -> Vec<Cta> {
        match self.values.get_mut(name) {
            Some(FieldValue::Ctas(ctas)) => std::mem::take(ctas),
            _ => Vec::new(),
        }
    }

    pub fn items(&self) -> &[Item] {
        match self.values.get(ITEMS_FIELD) {
            Some(FieldValue::Items(items)) => items,
            _ => &[],
        }
    }

    pub fn take_items(&mut self) -> Vec<Item> {
        match self.values.get_mut(ITEMS_FIELD) {
            Some(FieldValue::Items(items)) => std::mem::take(items),
            _ => Vec::new(),
        }
    }

    /// The cell a field was read from, if it had content. Taking it is what
    /// lets the cell's instrumentation be relocated, once.
    pub fn take_source(&mut self, name: &str) -> Option<SourceNode> {
        self.sources.remove(name)
    }

    pub fn has_source(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// True when the field holds its default because its cell was absent or blank.
    pub fn is_defaulted(&self, name: &str) -> bool {
        self.defaulted.contains(name)
    }

    /// Strip the instrumentation of every source nothing claimed, so no marker
    /// outlives its block without a destination. Returns the fields that lost
    /// one, each named once.
    pub fn discard_unclaimed(&mut self) -> Vec<&'static str> {
        let mut dropped = Vec::new();
        for (name, source) in std::mem::take(&mut self.sources) {
            note_discard(&mut dropped, name, source.discard());
        }
        for (name, source) in self.spare.drain(..) {
            note_discard(&mut dropped, name, source.discard());
        }
        for (&name, value) in self.values.iter_mut() {
            match value {
                FieldValue::Media(media) => {
                    if let Some(media) = media.take() {
                        note_discard(&mut dropped, name, media.into_source().discard());
                    }
                }
                FieldValue::Ctas(ctas) => {
                    for source in ctas.drain(..).filter_map(|cta| cta.source) {
                        note_discard(&mut dropped, name, source.discard());
                    }
                }
                FieldValue::Items(items) => {
                    for item in items.iter_mut() {
                        for field in item.record.discard_unclaimed() {
                            note_discard(&mut dropped, field, 1);
                        }
                    }
                }
                _ => {}
            }
        }
        dropped
    }
}

fn note_discard(dropped: &mut Vec<&'static str>, name: &'static str, removed: usize) {
    if removed > 0 && !dropped.contains(&name) {
        dropped.push(name);
    }
}

/// Decodes tables against schemas. Carries the offset used for timestamps that
/// do not name a zone.
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    utc_offset: FixedOffset,
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder {
            utc_offset: Utc.fix(),
        }
    }
}

impl Decoder {
    pub fn new(utc_offset: FixedOffset) -> Self {
        Decoder { utc_offset }
    }

    pub fn with_offset_minutes(minutes: i32) -> BlockResult<Self> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(Decoder::new)
            .ok_or_else(|| {
                BlockError::Config(format!("UTC offset of {} minutes is out of range", minutes))
            })
    }

    pub fn decode(&self, table: &AuthoringTable, schema: &BlockSchema) -> BlockResult<DecodedRecord> {
        let use_properties = table.has_properties();
        let locate = |spec: &FieldSpec| match spec.prop {
            Some(prop) if use_properties => table.property(prop),
            _ => table.cell(spec.row, spec.cell).cloned(),
        };
        let mut record = self.decode_fields(schema, locate, |row| table.cell(row, 0).cloned())?;
        if let Some(fields) = schema.items {
            let items = self.decode_items(table, fields)?;
            record.values.insert(ITEMS_FIELD, FieldValue::Items(items));
        }
        debug!(
            "decoded {} field(s) from {} row(s)",
            record.len(),
            table.len()
        );
        Ok(record)
    }

    /// Decode every row with cells as its own record. Row positions in
    /// `fields` are ignored; only the cell index is used.
    pub fn decode_items(
        &self,
        table: &AuthoringTable,
        fields: &'static [FieldSpec],
    ) -> BlockResult<Vec<Item>> {
        let schema = BlockSchema::new(fields);
        let mut items = Vec::new();
        for (index, row) in table.rows().iter().enumerate() {
            if row.is_empty() {
                continue;
            }
            let record =
                self.decode_fields(&schema, |spec| row.cell(spec.cell).cloned(), |_| None)?;
            items.push(Item { row: index, record });
        }
        Ok(items)
    }

    fn decode_fields<F, R>(
        &self,
        schema: &BlockSchema,
        locate: F,
        row_cell: R,
    ) -> BlockResult<DecodedRecord>
    where
        F: Fn(&FieldSpec) -> Option<NodeRef>,
        R: Fn(usize) -> Option<NodeRef>,
    {
        let mut record = DecodedRecord::default();
        for spec in schema.fields {
            let cell = locate(spec);
            let content = cell.as_ref().filter(|cell| !is_blank(cell, spec.kind));
            let value = match content {
                Some(cell) => self.read(spec, cell)?,
                None if spec.required => {
                    return Err(BlockError::MissingRequired {
                        field: spec.name.to_string(),
                    })
                }
                None => {
                    record.defaulted.insert(spec.name);
                    spec.default_value()
                }
            };
            if let Some(cell) = cell {
                record.sources.insert(spec.name, SourceNode::new(cell));
            }
            record.values.insert(spec.name, value);
        }

        for cta in schema.ctas {
            let text_cell = row_cell(cta.text_row);
            let link_cell = row_cell(cta.link_row);
            let text = text_cell
                .as_ref()
                .map(|c| c.text_contents().trim().to_string())
                .unwrap_or_default();
            let link = link_cell.as_ref().map(link_target).unwrap_or_default();
            if let Some(cell) = link_cell {
                record.spare.push((cta.list, SourceNode::new(cell)));
            }

            let complete = !text.is_empty() && !link.is_empty();
            let text_source = text_cell.map(SourceNode::new);
            let entry = record
                .values
                .entry(cta.list)
                .or_insert_with(|| FieldValue::Ctas(Vec::new()));
            match entry {
                FieldValue::Ctas(list) if complete => list.push(Cta {
                    text,
                    href: complete_url_scheme(&link),
                    style: cta.style,
                    source: text_source,
                }),
                _ => {
                    if let Some(source) = text_source {
                        record.spare.push((cta.list, source));
                    }
                }
            }
        }
        Ok(record)
    }

    fn read(&self, spec: &FieldSpec, cell: &NodeRef) -> BlockResult<FieldValue> {
        if spec.kind == FieldKind::Media {
            return Ok(FieldValue::Media(find_media(cell)));
        }

        let text = cell.text_contents().trim().to_string();
        let value = match spec.normalizer {
            Some(Normalizer::Lowercase) => FieldValue::Text(text.to_lowercase()),
            Some(Normalizer::Boolean) => {
                let fallback = matches!(spec.default, FieldDefault::Bool(true));
                FieldValue::Bool(parse_bool(&text).unwrap_or(fallback))
            }
            Some(Normalizer::CompleteUrlScheme) => FieldValue::Text(complete_url_scheme(&text)),
            Some(Normalizer::Timestamp) => match parse_timestamp(&text, self.utc_offset) {
                Some(instant) => FieldValue::Instant(Some(instant)),
                None if spec.required => {
                    return Err(BlockError::InvalidTimestamp {
                        field: spec.name.to_string(),
                        value: text,
                    })
                }
                None => FieldValue::Instant(None),
            },
            None if spec.kind == FieldKind::Html => FieldValue::Html(dom::inner_html(cell)),
            None => FieldValue::Text(text),
        };
        Ok(value)
    }
}

/// Decode with the default (UTC) decoder.
pub fn decode(table: &AuthoringTable, schema: &BlockSchema) -> BlockResult<DecodedRecord> {
    Decoder::default().decode(table, schema)
}

fn is_blank(cell: &NodeRef, kind: FieldKind) -> bool {
    match kind {
        FieldKind::Media => find_image(cell).is_none(),
        FieldKind::Html => {
            cell.text_contents().trim().is_empty() && find_image(cell).is_none()
        }
        FieldKind::Text => cell.text_contents().trim().is_empty(),
    }
}

fn find_image(cell: &NodeRef) -> Option<NodeRef> {
    cell.select_first("img").ok().map(|img| img.as_node().clone())
}

fn find_media(cell: &NodeRef) -> Option<MediaRef> {
    let img = find_image(cell)?;
    let src = dom::get_attr(&img, "src").filter(|src| !src.trim().is_empty())?;
    Some(MediaRef {
        src,
        alt: dom::get_attr(&img, "alt").unwrap_or_default(),
        source: SourceNode::new(img),
    })
}

/// Link value of a cell: the first anchor's `href` when the cell holds a
/// link, its trimmed text otherwise.
fn link_target(cell: &NodeRef) -> String {
    cell.select_first("a[href]")
        .ok()
        .and_then(|a| dom::get_attr(a.as_node(), "href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
        .unwrap_or_else(|| cell.text_contents().trim().to_string())
}

pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

pub fn complete_url_scheme(link: &str) -> String {
    if link.starts_with("http") {
        link.to_string()
    } else {
        format!("https://{}", link)
    }
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// RFC 3339 first, then zone-less forms read in `offset`.
pub fn parse_timestamp(text: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(&Utc));
    }
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|instant| instant.with_timezone(&Utc))
}
