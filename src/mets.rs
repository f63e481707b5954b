//! METS manifest lookup: the PAGE files of one file group, with page ids.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::warn;

use crate::error::{Error, Result};

/// One `mets:file` of the selected group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFile {
    /// Physical page id (`structMap` div), or the file id if unmapped.
    pub page_id: String,
    pub file_id: String,
    /// Location resolved against the manifest directory.
    pub path: PathBuf,
}

/// A parsed METS manifest.
#[derive(Debug, Clone)]
pub struct Mets {
    base_dir: PathBuf,
    groups: Vec<(String, Vec<(String, String)>)>,
    page_of_file: HashMap<String, String>,
}

impl Mets {
    /// Parse manifest text; relative file locations resolve against `base_dir`.
    pub fn parse(xml: &str, base_dir: &Path) -> Result<Self> {
        let doc = Document::parse(xml)?;
        let root = doc.root_element();
        if root.tag_name().name() != "mets" {
            return Err(Error::Mets(format!(
                "expected mets root, found {}",
                root.tag_name().name()
            )));
        }

        let groups = root
            .descendants()
            .filter(|n| is(*n, "fileGrp"))
            .map(|grp| {
                let files = grp
                    .children()
                    .filter(|n| is(*n, "file"))
                    .filter_map(|file| {
                        let id = file.attribute("ID")?;
                        let href = file
                            .children()
                            .find(|n| is(*n, "FLocat"))?
                            .attributes()
                            .find(|a| a.name() == "href")?
                            .value();
                        Some((id.to_string(), href.to_string()))
                    })
                    .collect();
                (grp.attribute("USE").unwrap_or_default().to_string(), files)
            })
            .collect();

        let mut page_of_file = HashMap::new();
        let physical = root
            .descendants()
            .filter(|n| is(*n, "structMap"))
            .find(|n| n.attribute("TYPE") == Some("PHYSICAL"));
        if let Some(map) = physical {
            for div in map
                .descendants()
                .filter(|n| is(*n, "div") && n.attribute("TYPE") == Some("page"))
            {
                let Some(page_id) = div.attribute("ID") else {
                    continue;
                };
                for fptr in div.children().filter(|n| is(*n, "fptr")) {
                    if let Some(file_id) = fptr.attribute("FILEID") {
                        page_of_file
                            .entry(file_id.to_string())
                            .or_insert_with(|| page_id.to_string());
                    }
                }
            }
        }

        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            groups,
            page_of_file,
        })
    }

    /// Read and parse a manifest file.
    pub fn read(path: &Path) -> Result<Self> {
        let xml = std::fs::read_to_string(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        Self::parse(&xml, base_dir)
    }

    /// File group names (`USE`) in manifest order.
    pub fn file_groups(&self) -> Vec<&str> {
        self.groups.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Files of `file_grp` in manifest order.
    pub fn find_files(&self, file_grp: &str) -> Result<Vec<PageFile>> {
        let (_, files) = self
            .groups
            .iter()
            .find(|(name, _)| name == file_grp)
            .ok_or_else(|| Error::Mets(format!("no file group {file_grp:?}")))?;

        Ok(files
            .iter()
            .map(|(file_id, href)| {
                let page_id = match self.page_of_file.get(file_id) {
                    Some(page_id) => page_id.clone(),
                    None => {
                        warn!(file_id = %file_id, "File not mapped to a physical page, using file id");
                        file_id.clone()
                    }
                };
                PageFile {
                    page_id,
                    file_id: file_id.clone(),
                    path: self.base_dir.join(href.strip_prefix("file://").unwrap_or(href)),
                }
            })
            .collect())
    }
}

/// The PAGE files behind `input`: the `file_grp` files of a METS manifest,
/// or `input` itself if it is a PAGE document.
pub fn page_files(input: &Path, file_grp: Option<&str>) -> Result<Vec<PageFile>> {
    let xml = std::fs::read_to_string(input)?;
    let doc = Document::parse(&xml)?;
    let root = doc.root_element();

    match root.tag_name().name() {
        "mets" => {
            let file_grp = file_grp.ok_or_else(|| {
                Error::Configuration("a METS input needs a file group".to_string())
            })?;
            let base_dir = input.parent().unwrap_or_else(|| Path::new(""));
            Mets::parse(&xml, base_dir)?.find_files(file_grp)
        }
        "PcGts" => {
            let page_id = root
                .attribute("pcGtsId")
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .or_else(|| input.file_stem().map(|s| s.to_string_lossy().into_owned()))
                .unwrap_or_default();
            Ok(vec![PageFile {
                file_id: page_id.clone(),
                page_id,
                path: input.to_path_buf(),
            }])
        }
        other => Err(Error::Document(format!(
            "expected a mets or PcGts root, found {other}"
        ))),
    }
}

fn is(node: Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}
