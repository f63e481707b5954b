//! Read-only PAGE-XML document model.
//!
//! Parsed once by [`parse_page`] from the `PcGts` root and never mutated.
//! Attributes that may be absent stay `Option`, and raw strings are kept where
//! a value is only validated at extraction time (coordinates, typography,
//! confidences), so one bad segment cannot fail the whole parse.
//!
//! # Example
//!
//! ```rust
//! use tsvtools::page::{parse_page, walk, Granularity};
//!
//! let xml = r#"<PcGts><Page imageFilename="p1.tif">
//!   <TextRegion id="r1"><Coords points="0,0 10,0 10,10 0,10"/>
//!     <TextLine id="l1"><Coords points="1,1 9,1 9,4 1,4"/></TextLine>
//!   </TextRegion>
//! </Page></PcGts>"#;
//!
//! let doc = parse_page(xml).unwrap();
//! let segments = walk(&doc.page, &Granularity::TextLine);
//! assert_eq!(segments.len(), 1);
//! ```

mod parser;
mod walker;

pub use parser::{parse_page, parse_page_file};
pub use walker::{walk, Granularity, NodeSegment, RegionKind, Segment};

/// Parsed `PcGts` document.
#[derive(Debug, Clone)]
pub struct PcGts {
    /// `PcGts/@pcGtsId`, if present.
    pub pc_gts_id: Option<String>,
    pub page: Page,
}

/// The single `Page` of a PAGE document.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub image_filename: String,
    pub orientation: Option<f64>,
    /// Top-level regions in document order; nested regions hang off each.
    pub regions: Vec<Region>,
    /// Region ids flattened from the `ReadingOrder` tree.
    pub reading_order: Vec<String>,
}

impl Page {
    /// Every region at any nesting depth, pre-order in document order.
    pub fn all_regions(&self) -> Vec<&Region> {
        fn collect<'a>(regions: &'a [Region], out: &mut Vec<&'a Region>) {
            for region in regions {
                out.push(region);
                collect(&region.regions, out);
            }
        }

        let mut out = Vec::new();
        collect(&self.regions, &mut out);
        out
    }
}

/// Fields shared by regions, lines and words.
#[derive(Debug, Clone, Default)]
pub struct SegmentData {
    pub id: String,
    /// Raw `Coords/@points`.
    pub points: Option<String>,
    pub orientation: Option<f64>,
    pub text_equivs: Vec<TextEquiv>,
    pub language: Option<String>,
    pub text_style: Option<TextStyle>,
}

/// One `TextEquiv` alternative.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextEquiv {
    /// `Unicode` content; empty when the element is missing.
    pub unicode: String,
    /// Raw `@conf`.
    pub conf: Option<String>,
}

/// Raw `TextStyle` attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextStyle {
    pub font_family: Option<String>,
    pub font_size: Option<String>,
    pub bold: Option<String>,
    pub italic: Option<String>,
    pub letter_spaced: Option<String>,
}

/// Any PAGE region (`TextRegion`, `ImageRegion`, ...).
#[derive(Debug, Clone)]
pub struct Region {
    pub kind: RegionKind,
    pub data: SegmentData,
    /// Only populated for text regions.
    pub lines: Vec<TextLine>,
    pub regions: Vec<Region>,
}

#[derive(Debug, Clone, Default)]
pub struct TextLine {
    pub data: SegmentData,
    pub words: Vec<Word>,
}

#[derive(Debug, Clone, Default)]
pub struct Word {
    pub data: SegmentData,
}
