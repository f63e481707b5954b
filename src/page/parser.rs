//! PAGE-XML parsing with `roxmltree`.
//!
//! Element matching uses local names only, so documents from every PAGE
//! schema revision (and any namespace prefix) load the same way.

use std::path::Path;

use roxmltree::{Document, Node};
use tracing::debug;

use super::walker::RegionKind;
use super::{Page, PcGts, Region, SegmentData, TextEquiv, TextLine, TextStyle, Word};
use crate::error::{Error, Result};

/// Parse a PAGE-XML document from a string.
pub fn parse_page(xml: &str) -> Result<PcGts> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();
    if root.tag_name().name() != "PcGts" {
        return Err(Error::Document(format!(
            "expected PcGts root, found {}",
            root.tag_name().name()
        )));
    }

    let page = child(root, "Page")
        .ok_or_else(|| Error::Document("PcGts without Page".to_string()))?;

    Ok(PcGts {
        pc_gts_id: root.attribute("pcGtsId").map(str::to_string),
        page: parse_page_element(page),
    })
}

/// Read and parse a PAGE-XML file.
pub fn parse_page_file(path: &Path) -> Result<PcGts> {
    let xml = std::fs::read_to_string(path)?;
    parse_page(&xml)
}

fn parse_page_element(page: Node) -> Page {
    let regions = page
        .children()
        .filter(Node::is_element)
        .filter_map(parse_region)
        .collect();

    let reading_order = child(page, "ReadingOrder")
        .map(flatten_reading_order)
        .unwrap_or_default();

    Page {
        image_filename: page.attribute("imageFilename").unwrap_or_default().to_string(),
        orientation: parse_orientation(page),
        regions,
        reading_order,
    }
}

fn parse_region(node: Node) -> Option<Region> {
    let kind = RegionKind::from_element_name(node.tag_name().name())?;

    let lines = if kind == RegionKind::Text {
        children(node, "TextLine")
            .map(|line| TextLine {
                data: parse_segment(line),
                words: children(line, "Word")
                    .map(|word| Word {
                        data: parse_segment(word),
                    })
                    .collect(),
            })
            .collect()
    } else {
        Vec::new()
    };

    Some(Region {
        kind,
        data: parse_segment(node),
        lines,
        regions: node
            .children()
            .filter(Node::is_element)
            .filter_map(parse_region)
            .collect(),
    })
}

fn parse_segment(node: Node) -> SegmentData {
    let language = node
        .attribute("language")
        .or_else(|| node.attribute("primaryLanguage"))
        .filter(|l| !l.is_empty())
        .map(str::to_string);

    SegmentData {
        id: node.attribute("id").unwrap_or_default().to_string(),
        points: child(node, "Coords").and_then(|c| c.attribute("points").map(str::to_string)),
        orientation: parse_orientation(node),
        text_equivs: children(node, "TextEquiv")
            .map(|equiv| TextEquiv {
                unicode: child(equiv, "Unicode")
                    .map(|u| u.text().unwrap_or_default().to_string())
                    .unwrap_or_default(),
                conf: equiv.attribute("conf").map(str::to_string),
            })
            .collect(),
        language,
        text_style: child(node, "TextStyle").map(|style| TextStyle {
            font_family: style.attribute("fontFamily").map(str::to_string),
            font_size: style.attribute("fontSize").map(str::to_string),
            bold: style.attribute("bold").map(str::to_string),
            italic: style.attribute("italic").map(str::to_string),
            letter_spaced: style.attribute("letterSpaced").map(str::to_string),
        }),
    }
}

/// Unparseable orientations read as absent.
fn parse_orientation(node: Node) -> Option<f64> {
    let raw = node.attribute("orientation")?;
    match raw.trim().parse::<f64>() {
        Ok(v) => Some(v),
        Err(_) => {
            debug!(id = ?node.attribute("id"), orientation = raw, "Ignoring unreadable orientation");
            None
        }
    }
}

/// One node of the reading order tree.
struct OrderEntry {
    index: Option<i64>,
    region_ref: Option<String>,
    children: Vec<OrderEntry>,
    ordered: bool,
}

fn flatten_reading_order(reading_order: Node) -> Vec<String> {
    let Some(top) = reading_order.children().find(|n| {
        n.is_element() && matches!(n.tag_name().name(), "OrderedGroup" | "UnorderedGroup")
    }) else {
        return Vec::new();
    };

    let mut ids = Vec::new();
    flatten_entry(&build_entry(top), &mut ids);

    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(id.clone()));
    ids
}

fn build_entry(node: Node) -> OrderEntry {
    let name = node.tag_name().name();
    let is_group = name.contains("Group");
    OrderEntry {
        index: node.attribute("index").and_then(|i| i.trim().parse().ok()),
        region_ref: node.attribute("regionRef").map(str::to_string),
        children: if is_group {
            node.children()
                .filter(|n| {
                    let name = n.tag_name().name();
                    n.is_element() && (name.starts_with("RegionRef") || name.contains("Group"))
                })
                .map(build_entry)
                .collect()
        } else {
            Vec::new()
        },
        ordered: name.starts_with("OrderedGroup"),
    }
}

fn flatten_entry(entry: &OrderEntry, out: &mut Vec<String>) {
    if let Some(id) = &entry.region_ref {
        out.push(id.clone());
    }

    let mut children: Vec<&OrderEntry> = entry.children.iter().collect();
    if entry.ordered {
        // stable: unindexed entries keep document order at the end
        children.sort_by_key(|c| c.index.unwrap_or(i64::MAX));
    }
    for c in children {
        flatten_entry(c, out);
    }
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}
