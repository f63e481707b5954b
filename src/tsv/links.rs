//! Recover per-document parts from a (possibly concatenated) table.
//!
//! A part starts at a run of consecutive `#` comment lines (its header) and
//! owns every following data line up to the next comment line.

use std::path::Path;

use super::{comment_url, TsvTable, URL_ID};
use crate::error::{Error, Result};

/// URL used for rows that precede every comment block.
pub const EMPTY_URL: &str = "http://empty";

/// One comment-delimited block of a table file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Part {
    /// The comment line(s), newline-terminated.
    pub header: String,
    /// The data lines, newline-terminated.
    pub text: String,
    /// URL of the first comment line.
    pub url: Option<String>,
}

impl Part {
    /// URLs of every comment line in the header.
    pub fn urls(&self) -> Vec<String> {
        self.header.lines().map(comment_url).collect()
    }
}

/// Column header plus the parts of a table file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocLinks {
    /// The column header line, newline-terminated (empty if the file starts
    /// with a comment).
    pub columns: String,
    pub parts: Vec<Part>,
}

/// Split raw table text into parts, in file order.
pub fn extract_doc_links(content: &str) -> DocLinks {
    let mut lines = content.split_inclusive('\n');

    let columns = match content.chars().next() {
        Some('#') | None => String::new(),
        Some(_) => lines.next().map(terminated).unwrap_or_default(),
    };

    let mut parts = Vec::new();
    let mut current: Option<Part> = None;

    for line in lines {
        if line.starts_with('#') {
            match current.as_mut() {
                Some(part) if part.text.is_empty() && !part.header.is_empty() => {
                    part.header.push_str(&terminated(line));
                }
                _ => {
                    parts.extend(current.take());
                    current = Some(Part {
                        header: terminated(line),
                        ..Part::default()
                    });
                }
            }
        } else if !line.trim().is_empty() {
            current
                .get_or_insert_with(Part::default)
                .text
                .push_str(&terminated(line));
        }
    }
    parts.extend(current);

    for part in &mut parts {
        part.url = part.header.lines().next().map(comment_url);
    }

    DocLinks { columns, parts }
}

fn terminated(line: &str) -> String {
    let mut line = line.trim_end_matches(['\r', '\n']).to_string();
    line.push('\n');
    line
}

impl DocLinks {
    pub fn read(path: &Path) -> Result<Self> {
        Ok(extract_doc_links(&std::fs::read_to_string(path)?))
    }

    /// Every URL referenced by a comment line, in file order.
    pub fn urls(&self) -> Vec<String> {
        self.parts.iter().flat_map(Part::urls).collect()
    }

    /// Decode one part as a stand-alone table.
    pub fn part_table(&self, part: &Part) -> Result<TsvTable> {
        if self.columns.is_empty() {
            return Err(Error::Table("table file has no header row".to_string()));
        }
        let mut table = TsvTable::parse(&format!("{}{}", self.columns, part.text))?;
        table.urls = part.urls();
        Ok(table)
    }

    /// Recombine every part into one table with fresh sequential `url_id`s.
    ///
    /// Each part's URLs are appended to the URL list in part order and its
    /// rows are renumbered to point at them. A part with several comment
    /// lines keeps the relative `url_id`s of its rows. Parts without rows are
    /// dropped.
    pub fn resplit(&self) -> Result<TsvTable> {
        let mut combined: Option<TsvTable> = None;

        for part in &self.parts {
            let mut table = self.part_table(part)?;
            if table.rows.is_empty() {
                continue;
            }

            let out = combined.get_or_insert_with(|| TsvTable::new(&table.columns));
            let col = table.ensure_column(URL_ID, "");
            if out.column(URL_ID).is_none() {
                out.ensure_column(URL_ID, "");
            }
            if out.columns != table.columns {
                return Err(Error::Table(
                    "parts disagree on columns".to_string(),
                ));
            }

            let part_urls = if table.urls.is_empty() {
                vec![EMPTY_URL.to_string()]
            } else {
                table.urls.clone()
            };
            let offset = out.urls.len();

            for i in 0..table.rows.len() {
                let local = table
                    .url_id(i)
                    .filter(|id| part_urls.len() > 1 && *id < part_urls.len())
                    .unwrap_or(0);
                table.rows[i][col] = (offset + local).to_string();
            }

            out.urls.extend(part_urls);
            out.rows.append(&mut table.rows);
        }

        Ok(combined.unwrap_or_else(|| {
            let columns: Vec<String> = self
                .columns
                .trim_end()
                .split('\t')
                .map(str::to_string)
                .collect();
            TsvTable::new(&columns)
        }))
    }
}
