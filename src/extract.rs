//! Segment-to-record extraction (`page2tsv`).
//!
//! Walks each page at the requested granularity, turns every segment into
//! one record (or one per text alternative for [`Purpose::Fonts`]), and
//! collects the image URLs the records point at.
//!
//! Optional fields are extracted as `Option`s and only replaced by the
//! [`SENTINEL`] when a row is rendered. An unreadable typography or
//! confidence value only blanks that field. A segment whose polygon cannot
//! be read is skipped with a warning; the rest of the pass continues.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::geometry::{bounding_box_from_points, format_rotation, BoundingBox};
use crate::page::{walk, Granularity, NodeSegment, Page, Segment, SegmentData, TextStyle};
use crate::tsv::TsvTable;

/// Placeholder for an absent or unreadable optional field.
pub const SENTINEL: &str = "-";

pub const FONTS_COLUMNS: &[&str] = &[
    "text_equiv",
    "language",
    "font_family",
    "segment_type",
    "segment_id",
    "url_id",
    "region",
    "rotation",
    "full_region",
    "full_rotation",
];

pub const PLACEMENT_COLUMNS: &[&str] = &["segment_type", "segment_id", "url_id", "region", "rotation"];

/// What the output table is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    /// Text, language and typography per text alternative.
    Fonts,
    /// Geometry and rotation per segment.
    Skew,
    /// Page orientation only.
    PageRotation,
}

impl Purpose {
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Fonts => FONTS_COLUMNS,
            Self::Skew | Self::PageRotation => PLACEMENT_COLUMNS,
        }
    }

    /// Reject granularity/purpose pairs that cannot produce a table.
    pub fn check(self, granularity: Granularity) -> Result<()> {
        match (self, granularity) {
            (Self::Fonts, Granularity::Page) => Err(Error::UnknownPurpose(format!(
                "{self} cannot be extracted at Page level"
            ))),
            (Self::PageRotation, other) if other != Granularity::Page => Err(
                Error::UnknownPurpose(format!("{self} requires Page segments, not {other}")),
            ),
            _ => Ok(()),
        }
    }
}

impl FromStr for Purpose {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fonts" => Ok(Self::Fonts),
            "skew" => Ok(Self::Skew),
            "page-rotation" => Ok(Self::PageRotation),
            other => Err(Error::UnknownPurpose(other.to_string())),
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fonts => "fonts",
            Self::Skew => "skew",
            Self::PageRotation => "page-rotation",
        })
    }
}

/// Globally unique record id: page id + `_` + local segment id.
pub fn segment_id(page_id: &str, local_id: &str) -> String {
    format!("{page_id}_{local_id}")
}

/// The `region` cell of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionField {
    /// Whole page.
    Full,
    Box(BoundingBox),
    /// Geometry could not be read.
    Unknown,
}

impl fmt::Display for RegionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("full"),
            Self::Box(bbox) => bbox.fmt(f),
            Self::Unknown => f.write_str(SENTINEL),
        }
    }
}

/// Typography read from `TextStyle`. Each field is independently optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Typography {
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub letter_spaced: Option<bool>,
}

impl Typography {
    /// Read a raw `TextStyle`. A missing style or an unreadable value
    /// yields an absent field; nothing here fails the segment.
    pub fn from_style(id: &str, style: Option<&TextStyle>) -> Self {
        let Some(style) = style else {
            return Self::default();
        };

        Self {
            font_family: non_empty(style.font_family.as_deref()).map(str::to_string),
            // zero size reads as "no size"
            font_size: parse_number(id, "fontSize", style.font_size.as_deref())
                .filter(|s| *s != 0.0),
            bold: parse_flag(id, "bold", style.bold.as_deref()),
            italic: parse_flag(id, "italic", style.italic.as_deref()),
            letter_spaced: parse_flag(id, "letterSpaced", style.letter_spaced.as_deref()),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number(id: &str, name: &str, value: Option<&str>) -> Option<f64> {
    let raw = non_empty(value)?;
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() => Some(n),
        _ => {
            warn!(id, attribute = name, value = raw, "Unreadable attribute, treating as absent");
            None
        }
    }
}

/// `true` is kept; `false` collapses to absent like any other unset flag.
fn parse_flag(id: &str, name: &str, value: Option<&str>) -> Option<bool> {
    match non_empty(value) {
        None | Some("false" | "0") => None,
        Some("true" | "1") => Some(true),
        Some(other) => {
            warn!(id, attribute = name, value = other, "Unreadable flag, treating as absent");
            None
        }
    }
}

/// Structural and geometric fields common to every record.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub segment_type: Granularity,
    pub segment_id: String,
    pub url_id: usize,
    pub region: RegionField,
    pub rotation: f64,
}

/// A `fonts` record: one text alternative of one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct FontRecord {
    pub text: String,
    pub conf: Option<f64>,
    pub language: Option<String>,
    pub typography: Typography,
    pub placement: Placement,
    pub full_region: RegionField,
    pub full_rotation: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Fonts(FontRecord),
    Placement(Placement),
}

impl Record {
    pub fn placement(&self) -> &Placement {
        match self {
            Self::Fonts(r) => &r.placement,
            Self::Placement(p) => p,
        }
    }

    fn placement_mut(&mut self) -> &mut Placement {
        match self {
            Self::Fonts(r) => &mut r.placement,
            Self::Placement(p) => p,
        }
    }

    /// Render as table cells, substituting sentinels for absent fields.
    pub fn to_row(&self) -> Vec<String> {
        let p = self.placement();
        let placement = [
            p.segment_type.to_string(),
            p.segment_id.clone(),
            p.url_id.to_string(),
            p.region.to_string(),
            format_rotation(p.rotation),
        ];

        match self {
            Self::Placement(_) => placement.to_vec(),
            Self::Fonts(r) => {
                let mut row = vec![
                    r.text.clone(),
                    r.language.clone().unwrap_or_else(|| SENTINEL.to_string()),
                    r.typography
                        .font_family
                        .clone()
                        .unwrap_or_else(|| SENTINEL.to_string()),
                ];
                row.extend(placement);
                row.push(r.full_region.to_string());
                row.push(format_rotation(r.full_rotation));
                row
            }
        }
    }
}

/// URLs in first-use order, identical URLs sharing one id.
#[derive(Debug, Clone, Default)]
pub struct UrlRegistry {
    urls: Vec<String>,
    index: HashMap<String, usize>,
}

impl UrlRegistry {
    pub fn intern(&mut self, url: &str) -> usize {
        if let Some(&id) = self.index.get(url) {
            return id;
        }
        let id = self.urls.len();
        self.urls.push(url.to_string());
        self.index.insert(url.to_string(), id);
        id
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }
}

/// Accumulates records page by page.
#[derive(Debug)]
pub struct Extractor {
    purpose: Purpose,
    granularity: Granularity,
    urls: UrlRegistry,
    records: Vec<Record>,
    skipped: usize,
}

impl Extractor {
    /// Fails with `UnknownPurpose` for combinations that cannot be extracted.
    pub fn new(purpose: Purpose, granularity: Granularity) -> Result<Self> {
        purpose.check(granularity)?;
        Ok(Self {
            purpose,
            granularity,
            urls: UrlRegistry::default(),
            records: Vec::new(),
            skipped: 0,
        })
    }

    pub fn columns(&self) -> &'static [&'static str] {
        self.purpose.columns()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Segments dropped so far because they failed to extract.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Extract every segment of one page. `url` is registered only if the
    /// page yields at least one record.
    pub fn add_page(&mut self, page_id: &str, page: &Page, url: &str) {
        let mut page_records = Vec::new();

        for segment in walk(page, &self.granularity) {
            match self.extract_segment(page_id, &segment) {
                Ok(records) => page_records.extend(records),
                Err(err) => {
                    warn!(page_id, error = %err, "Skipping segment");
                    self.skipped += 1;
                }
            }
        }

        if page_records.is_empty() {
            debug!(page_id, "Page produced no records");
            return;
        }

        let url_id = self.urls.intern(url);
        for record in &mut page_records {
            record.placement_mut().url_id = url_id;
        }
        debug!(page_id, url_id, records = page_records.len(), "Extracted page");
        self.records.extend(page_records);
    }

    fn extract_segment(&self, page_id: &str, segment: &Segment) -> Result<Vec<Record>> {
        match segment {
            Segment::Page { rotation, .. } => Ok(vec![Record::Placement(Placement {
                segment_type: Granularity::Page,
                segment_id: page_id.to_string(),
                url_id: 0,
                region: RegionField::Full,
                rotation: *rotation,
            })]),
            Segment::Node(node) => self.extract_node(page_id, node),
        }
    }

    fn extract_node(&self, page_id: &str, segment: &NodeSegment) -> Result<Vec<Record>> {
        let node = segment.node;
        let placement = Placement {
            segment_type: self.granularity,
            segment_id: segment_id(page_id, &node.id),
            url_id: 0,
            region: RegionField::Box(segment_box(node)?),
            rotation: segment.rotation,
        };

        if self.purpose != Purpose::Fonts {
            return Ok(vec![Record::Placement(placement)]);
        }

        let full_region = match segment_box(segment.full) {
            Ok(bbox) => RegionField::Box(bbox),
            Err(err) => {
                debug!(id = %segment.full.id, error = %err, "Full region geometry unreadable");
                RegionField::Unknown
            }
        };
        let typography = Typography::from_style(&node.id, node.text_style.as_ref());

        Ok(node
            .text_equivs
            .iter()
            .map(|equiv| {
                Record::Fonts(FontRecord {
                    text: clean_text(&node.id, &equiv.unicode),
                    conf: parse_number(&node.id, "conf", equiv.conf.as_deref()),
                    language: node.language.clone(),
                    typography: typography.clone(),
                    placement: placement.clone(),
                    full_region,
                    full_rotation: segment.full_rotation,
                })
            })
            .collect())
    }

    /// The URL list and rows as a table.
    pub fn into_table(self) -> TsvTable {
        let mut table = TsvTable::new(self.purpose.columns());
        table.urls = self.urls.urls().to_vec();
        table.rows = self.records.iter().map(Record::to_row).collect();
        table
    }
}

/// Where a page's image URL comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// `scheme://server[/prefix]/<percent-encoded imageFilename>`.
    Template {
        scheme: String,
        server: String,
        prefix: Option<String>,
    },
    /// The same URL for every page.
    Fixed(String),
}

impl Default for ImageSource {
    fn default() -> Self {
        Self::Fixed(crate::tsv::EMPTY_URL.to_string())
    }
}

impl ImageSource {
    pub fn url_for(&self, page: &Page) -> String {
        match self {
            Self::Fixed(url) => url.clone(),
            Self::Template {
                scheme,
                server,
                prefix,
            } => {
                let identifier = urlencoding::encode(&page.image_filename);
                match prefix.as_deref().filter(|p| !p.is_empty()) {
                    Some(prefix) => format!("{scheme}://{server}/{prefix}/{identifier}"),
                    None => format!("{scheme}://{server}/{identifier}"),
                }
            }
        }
    }
}

fn segment_box(node: &SegmentData) -> Result<BoundingBox> {
    let points = node
        .points
        .as_deref()
        .ok_or_else(|| Error::MalformedGeometry(format!("{} has no Coords", node.id)))?;
    bounding_box_from_points(points)
}

/// Stand-in for a leading `#`, which would make the row read back as a
/// URL comment.
const COMMENT_ESCAPE: char = '＃';

/// Keep cells on one line, free of the delimiter and never comment-like.
fn clean_text(id: &str, text: &str) -> String {
    let text = text.replace(['\t', '\n', '\r'], " ");
    match text.strip_prefix('#') {
        Some(rest) => {
            warn!(id, "Text starts with '#', escaping it");
            format!("{COMMENT_ESCAPE}{rest}")
        }
        None => text,
    }
}
