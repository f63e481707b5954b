//! `tsvtools` - PAGE-XML ⇄ TSV conversion for OCR and NER ground truth
//!
//! # Features
//!
//! - **Extraction**: PAGE-XML (directly or through a METS file group) to
//!   `fonts`, `skew` or `page-rotation` tables at page, region, line or word
//!   granularity
//! - **Patching**: Corrected line text written back into PAGE-XML
//! - **Entities**: NER tagging and NED linking through REST services
//! - **Document links**: Per-document parts of concatenated tables
//!
//! # Example
//!
//! ```rust
//! use tsvtools::{parse_page, Extractor, Granularity, Layout, Purpose};
//!
//! let xml = r#"<PcGts><Page imageFilename="p1.tif">
//!   <TextRegion id="r1"><Coords points="10,10 210,10 210,110 10,110"/>
//!     <TextLine id="l1"><Coords points="20,20 120,20 120,40 20,40"/>
//!       <TextEquiv conf="0.9"><Unicode>Hello</Unicode></TextEquiv>
//!     </TextLine>
//!   </TextRegion>
//! </Page></PcGts>"#;
//!
//! let doc = parse_page(xml)?;
//! let mut extractor = Extractor::new(Purpose::Fonts, Granularity::TextLine)?;
//! extractor.add_page("PHYS_0001", &doc.page, "http://example.org/p1.tif");
//!
//! let tsv = extractor.into_table().encode(Layout::Leading)?;
//! assert!(tsv.contains("Hello\t-\t-\tTextLine\tPHYS_0001_l1\t0\t20,20,100,20\t0.0"));
//! # Ok::<(), tsvtools::Error>(())
//! ```

pub mod batch;
pub mod config;
pub mod entities;
pub mod error;
pub mod extract;
pub mod geometry;
pub mod http_client;
pub mod mets;
pub mod page;
pub mod patch;
pub mod tsv;

pub use batch::{CommandGenerator, Page2TsvCommand};
pub use config::{load_config, Config};
pub use entities::{find_entities, EnrichOptions, EnrichReport, NedService, NerService, RestNed, RestNer};
pub use error::{Error, Result};
pub use extract::{Extractor, ImageSource, Purpose, Record};
pub use geometry::{bounding_box, compose_rotation, BoundingBox, Point};
pub use http_client::{HttpConfig, ServiceClient};
pub use mets::{page_files, Mets, PageFile};
pub use page::{parse_page, parse_page_file, walk, Granularity, RegionKind, Segment};
pub use patch::{patch_page, Corrections, PatchOptions};
pub use tsv::{extract_doc_links, DocLinks, Layout, TsvTable};

/// Version of tsvtools
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
