//! Hierarchy walk: page → region → line → word.
//!
//! The walk carries an accumulator (composed rotation plus the enclosing
//! "full" region) down the tree instead of keeping back-references, and
//! yields segments in reading order.

use std::fmt;
use std::str::FromStr;

use super::{Page, Region, SegmentData};
use crate::error::Error;
use crate::geometry::compose_rotation;

/// PAGE region classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    Text,
    Image,
    LineDrawing,
    Graphic,
    Table,
    Chart,
    Map,
    Separator,
    Maths,
    Chem,
    Music,
    Advert,
    Noise,
    Unknown,
    Custom,
}

impl RegionKind {
    const ALL: [Self; 15] = [
        Self::Text,
        Self::Image,
        Self::LineDrawing,
        Self::Graphic,
        Self::Table,
        Self::Chart,
        Self::Map,
        Self::Separator,
        Self::Maths,
        Self::Chem,
        Self::Music,
        Self::Advert,
        Self::Noise,
        Self::Unknown,
        Self::Custom,
    ];

    /// Class name without the `Region` suffix (`"Text"`, `"Image"`, ...).
    pub fn class_name(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Image => "Image",
            Self::LineDrawing => "LineDrawing",
            Self::Graphic => "Graphic",
            Self::Table => "Table",
            Self::Chart => "Chart",
            Self::Map => "Map",
            Self::Separator => "Separator",
            Self::Maths => "Maths",
            Self::Chem => "Chem",
            Self::Music => "Music",
            Self::Advert => "Advert",
            Self::Noise => "Noise",
            Self::Unknown => "Unknown",
            Self::Custom => "Custom",
        }
    }

    pub fn from_class_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.class_name() == name)
    }

    /// Map an element local name such as `TextRegion` to its class.
    pub fn from_element_name(name: &str) -> Option<Self> {
        name.strip_suffix("Region").and_then(Self::from_class_name)
    }
}

/// Hierarchy level selected for record emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Page,
    Region(RegionKind),
    TextLine,
    Word,
}

impl FromStr for Granularity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Page" => Ok(Self::Page),
            "TextLine" => Ok(Self::TextLine),
            "Word" => Ok(Self::Word),
            other => RegionKind::from_element_name(other)
                .map(Self::Region)
                .ok_or_else(|| Error::UnknownSchema(other.to_string())),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page => f.write_str("Page"),
            Self::Region(kind) => write!(f, "{}Region", kind.class_name()),
            Self::TextLine => f.write_str("TextLine"),
            Self::Word => f.write_str("Word"),
        }
    }
}

/// A region, line or word with its accumulated state.
#[derive(Debug, Clone, Copy)]
pub struct NodeSegment<'a> {
    pub node: &'a SegmentData,
    /// Page + region (+ line (+ word)) rotation, in `[0, 360)`.
    pub rotation: f64,
    /// Enclosing region used as geometry fallback.
    pub full: &'a SegmentData,
    pub full_rotation: f64,
}

/// One emitted segment.
#[derive(Debug, Clone, Copy)]
pub enum Segment<'a> {
    Page { page: &'a Page, rotation: f64 },
    Node(NodeSegment<'a>),
}

/// Produce the ordered segments of `page` at `granularity`.
pub fn walk<'a>(page: &'a Page, granularity: &Granularity) -> Vec<Segment<'a>> {
    let page_rotation = compose_rotation(0.0, page.orientation);

    let region_segments = |kind: RegionKind| {
        regions_in_reading_order(page)
            .into_iter()
            .filter(move |r| r.kind == kind)
            .map(move |region| {
                (
                    region,
                    compose_rotation(page_rotation, region.data.orientation),
                )
            })
    };

    match granularity {
        Granularity::Page => vec![Segment::Page {
            page,
            rotation: page_rotation,
        }],
        Granularity::Region(kind) => region_segments(*kind)
            .map(|(region, rotation)| {
                Segment::Node(NodeSegment {
                    node: &region.data,
                    rotation,
                    full: &region.data,
                    full_rotation: rotation,
                })
            })
            .collect(),
        Granularity::TextLine => region_segments(RegionKind::Text)
            .flat_map(|(region, region_rotation)| {
                region.lines.iter().map(move |line| {
                    Segment::Node(NodeSegment {
                        node: &line.data,
                        rotation: compose_rotation(region_rotation, line.data.orientation),
                        full: &region.data,
                        full_rotation: region_rotation,
                    })
                })
            })
            .collect(),
        Granularity::Word => region_segments(RegionKind::Text)
            .flat_map(|(region, region_rotation)| {
                region.lines.iter().flat_map(move |line| {
                    let line_rotation = compose_rotation(region_rotation, line.data.orientation);
                    line.words.iter().map(move |word| {
                        Segment::Node(NodeSegment {
                            node: &word.data,
                            rotation: compose_rotation(line_rotation, word.data.orientation),
                            full: &region.data,
                            full_rotation: region_rotation,
                        })
                    })
                })
            })
            .collect(),
    }
}

/// All regions (any depth): reading-order references first, then the rest in
/// document order.
fn regions_in_reading_order(page: &Page) -> Vec<&Region> {
    let all = page.all_regions();
    if page.reading_order.is_empty() {
        return all;
    }

    let mut ordered: Vec<&Region> = page
        .reading_order
        .iter()
        .filter_map(|id| all.iter().find(|r| &r.data.id == id).copied())
        .collect();

    let rest: Vec<&Region> = all
        .iter()
        .filter(|r| !page.reading_order.contains(&r.data.id))
        .copied()
        .collect();
    ordered.extend(rest);
    ordered
}
