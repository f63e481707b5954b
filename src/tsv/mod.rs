//! Tab-separated tables with a `#`-comment URL block.
//!
//! Layout on disk:
//!
//! ```text
//! text_equiv  language  ...  url_id  ...
//! # http://iiif.example/image/0001.tif
//! # http://iiif.example/image/0002.tif
//! Hello       -         ...  0       ...
//! ```
//!
//! Comment line `k` is the URL of every row whose `url_id` is `k`. Fields are
//! written literally (no quoting), so values must never contain tabs or
//! newlines.
//!
//! Two layouts are written: [`Layout::Leading`] puts all comment lines right
//! after the header; [`Layout::Grouped`] puts each URL in front of its own
//! rows. Both decode to the same table.

pub mod links;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};

use crate::error::{Error, Result};

pub use links::{extract_doc_links, DocLinks, Part, EMPTY_URL};

/// Name of the column linking a row to its URL comment.
pub const URL_ID: &str = "url_id";

/// Where the URL comments go when encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Header, every URL comment, then every row.
    Leading,
    /// Header, then each URL comment followed by the rows that reference it.
    Grouped,
}

/// A decoded table plus its URL list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TsvTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// URL comments in file order; index = `url_id`.
    pub urls: Vec<String>,
}

impl TsvTable {
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            rows: Vec::new(),
            urls: Vec::new(),
        }
    }

    /// Append a row, which must have one value per column.
    pub fn push_row(&mut self, row: Vec<String>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::Table(format!(
                "row has {} fields, table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Index of `name`, appending it filled with `default` if missing.
    pub fn ensure_column(&mut self, name: &str, default: &str) -> usize {
        if let Some(idx) = self.column(name) {
            return idx;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(default.to_string());
        }
        self.columns.len() - 1
    }

    pub fn rename_column(&mut self, from: &str, to: &str) {
        if self.column(to).is_some() {
            return;
        }
        if let Some(idx) = self.column(from) {
            self.columns[idx] = to.to_string();
        }
    }

    /// Value of `column` in row `row`, if both exist.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column(column)?;
        self.rows.get(row)?.get(idx).map(String::as_str)
    }

    /// The row's `url_id`, when present and numeric.
    pub fn url_id(&self, row: usize) -> Option<usize> {
        self.get(row, URL_ID)?.trim().parse().ok()
    }

    /// The URL comment a row points at.
    pub fn url_of_row(&self, row: usize) -> Option<&str> {
        self.urls.get(self.url_id(row)?).map(String::as_str)
    }

    /// Decode a table. Comment lines are collected as the URL list.
    pub fn parse(content: &str) -> Result<Self> {
        let urls = content
            .lines()
            .filter(|line| line.starts_with('#'))
            .map(comment_url)
            .collect();

        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .comment(Some(b'#'))
            .flexible(true)
            .has_headers(true)
            .from_reader(content.as_bytes());

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.len() > columns.len() {
                return Err(Error::Table(format!(
                    "line {} has {} fields, header has {}",
                    record.position().map_or(0, csv::Position::line),
                    record.len(),
                    columns.len()
                )));
            }
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(columns.len(), String::new());
            rows.push(row);
        }

        Ok(Self {
            columns,
            rows,
            urls,
        })
    }

    pub fn read(path: &Path) -> Result<Self> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Encode the table. An empty table is just the header row.
    pub fn encode(&self, layout: Layout) -> Result<String> {
        let mut out = header_bytes(&self.columns)?;
        if self.rows.is_empty() {
            return Ok(String::from_utf8_lossy(&out).into_owned());
        }

        match layout {
            Layout::Leading => {
                out.extend(self.comment_block());
                write_rows(&mut out, self.rows.iter())?;
            }
            Layout::Grouped if self.urls.is_empty() => {
                write_rows(&mut out, self.rows.iter())?;
            }
            Layout::Grouped => {
                let url_ids: Vec<Option<usize>> =
                    (0..self.rows.len()).map(|i| self.url_id(i)).collect();

                // rows without a usable url_id cannot sit under any comment
                let orphans = self
                    .rows
                    .iter()
                    .zip(&url_ids)
                    .filter(|(_, id)| !id.is_some_and(|id| id < self.urls.len()))
                    .map(|(row, _)| row);
                write_rows(&mut out, orphans)?;

                for (idx, url) in self.urls.iter().enumerate() {
                    writeln!(out, "# {url}")?;
                    let group = self
                        .rows
                        .iter()
                        .zip(&url_ids)
                        .filter(|(_, id)| **id == Some(idx))
                        .map(|(row, _)| row);
                    write_rows(&mut out, group)?;
                }
            }
        }

        String::from_utf8(out).map_err(|e| Error::Table(e.to_string()))
    }

    pub fn write(&self, path: &Path, layout: Layout) -> Result<()> {
        std::fs::write(path, self.encode(layout)?)?;
        Ok(())
    }

    /// Create (or truncate) `path` holding only the header row.
    pub fn write_header(path: &Path, columns: &[&str]) -> Result<()> {
        std::fs::write(path, header_bytes(columns)?)?;
        Ok(())
    }

    /// Append the comment block and rows to a file started by
    /// [`TsvTable::write_header`]. Nothing is appended for an empty table.
    pub fn append_body(&self, path: &Path) -> Result<()> {
        if self.rows.is_empty() {
            return Ok(());
        }
        let mut body = self.comment_block();
        write_rows(&mut body, self.rows.iter())?;

        let mut file = OpenOptions::new().append(true).open(path)?;
        file.write_all(&body)?;
        Ok(())
    }

    fn comment_block(&self) -> Vec<u8> {
        self.urls
            .iter()
            .flat_map(|url| format!("# {url}\n").into_bytes())
            .collect()
    }
}

/// URL carried by a comment line (`# http://...`).
pub(crate) fn comment_url(line: &str) -> String {
    line.trim_start_matches('#').trim().to_string()
}

fn writer_builder() -> WriterBuilder {
    let mut builder = WriterBuilder::new();
    builder
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Never)
        .has_headers(false);
    builder
}

fn header_bytes<S: AsRef<str>>(columns: &[S]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut writer = writer_builder().from_writer(&mut out);
        writer.write_record(columns.iter().map(|c| c.as_ref()))?;
        writer.flush()?;
    }
    Ok(out)
}

fn write_rows<'a>(out: &mut Vec<u8>, rows: impl Iterator<Item = &'a Vec<String>>) -> Result<()> {
    let mut writer = writer_builder().from_writer(out);
    for row in rows {
        // such a row would decode as a URL comment
        if row.first().is_some_and(|cell| cell.starts_with('#')) {
            return Err(Error::Table(format!(
                "row starting with '#' cannot be written: {:?}",
                row.join("\t")
            )));
        }
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TsvTable {
        let mut table = TsvTable::new(&["segment_type", "segment_id", "url_id", "region", "rotation"]);
        table.urls = vec![
            "http://img/a.tif".to_string(),
            "http://img/b.tif".to_string(),
        ];
        for row in [
            ["TextLine", "p1_l1", "0", "1,2,3,4", "0.0"],
            ["TextLine", "p2_l1", "1", "5,6,7,8", "90.0"],
            ["TextLine", "p1_l2", "0", "9,9,9,9", "0.0"],
        ] {
            table
                .push_row(row.iter().map(ToString::to_string).collect())
                .unwrap();
        }
        table
    }

    #[test]
    fn leading_layout_puts_urls_after_header() {
        let encoded = sample().encode(Layout::Leading).unwrap();
        let lines: Vec<&str> = encoded.lines().collect();
        assert_eq!(lines[0], "segment_type\tsegment_id\turl_id\tregion\trotation");
        assert_eq!(lines[1], "# http://img/a.tif");
        assert_eq!(lines[2], "# http://img/b.tif");
        assert_eq!(lines[3], "TextLine\tp1_l1\t0\t1,2,3,4\t0.0");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn round_trip_preserves_rows_and_url_mapping() {
        let table = sample();
        for layout in [Layout::Leading, Layout::Grouped] {
            let decoded = TsvTable::parse(&table.encode(layout).unwrap()).unwrap();
            assert_eq!(decoded.columns, table.columns);
            assert_eq!(decoded.urls, table.urls);

            let mut expected: Vec<(Vec<String>, Option<&str>)> = (0..table.rows.len())
                .map(|i| (table.rows[i].clone(), table.url_of_row(i)))
                .collect();
            let mut actual: Vec<(Vec<String>, Option<&str>)> = (0..decoded.rows.len())
                .map(|i| (decoded.rows[i].clone(), decoded.url_of_row(i)))
                .collect();
            expected.sort();
            actual.sort();
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn grouped_layout_places_rows_under_their_url() {
        let encoded = sample().encode(Layout::Grouped).unwrap();
        let lines: Vec<&str> = encoded.lines().collect();
        assert_eq!(lines[1], "# http://img/a.tif");
        assert!(lines[2].contains("p1_l1"));
        assert!(lines[3].contains("p1_l2"));
        assert_eq!(lines[4], "# http://img/b.tif");
        assert!(lines[5].contains("p2_l1"));
    }

    #[test]
    fn empty_table_is_header_only() {
        let mut table = TsvTable::new(&["a", "b"]);
        table.urls.push("http://unused".to_string());
        assert_eq!(table.encode(Layout::Leading).unwrap(), "a\tb\n");
        assert_eq!(table.encode(Layout::Grouped).unwrap(), "a\tb\n");
    }

    #[test]
    fn quotes_are_literal() {
        let mut table = TsvTable::new(&["TEXT"]);
        table.push_row(vec!["\"quoted\" 'text'".to_string()]).unwrap();
        let encoded = table.encode(Layout::Leading).unwrap();
        assert_eq!(encoded, "TEXT\n\"quoted\" 'text'\n");
        let decoded = TsvTable::parse(&encoded).unwrap();
        assert_eq!(decoded.rows[0][0], "\"quoted\" 'text'");
    }

    #[test]
    fn short_rows_are_padded() {
        let decoded = TsvTable::parse("a\tb\tc\n1\t2\n").unwrap();
        assert_eq!(decoded.rows[0], ["1", "2", ""]);
    }

    #[test]
    fn long_rows_are_rejected() {
        assert!(matches!(
            TsvTable::parse("a\tb\n1\t2\t3\n"),
            Err(Error::Table(_))
        ));
    }

    #[test]
    fn push_row_checks_width() {
        let mut table = TsvTable::new(&["a", "b"]);
        assert!(table.push_row(vec!["1".to_string()]).is_err());
    }

    #[test]
    fn column_helpers() {
        let mut table = TsvTable::parse("No.\tTOKEN\tGND-ID\n0\tBerlin\t-\n").unwrap();
        table.rename_column("GND-ID", "ID");
        assert_eq!(table.get(0, "ID"), Some("-"));
        let tag = table.ensure_column("NE-TAG", "O");
        assert_eq!(tag, 3);
        assert_eq!(table.get(0, "NE-TAG"), Some("O"));
        assert_eq!(table.ensure_column("TOKEN", "x"), 1);
    }

    #[test]
    fn comment_like_first_cell_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tsv");
        let mut table = TsvTable::new(&["text_equiv", "segment_id"]);
        table.urls = vec!["http://img/a.tif".to_string()];
        table
            .push_row(vec!["# 12 Kapitel".to_string(), "p1_l1".to_string()])
            .unwrap();

        for layout in [Layout::Leading, Layout::Grouped] {
            assert!(matches!(table.encode(layout), Err(Error::Table(_))));
        }
        TsvTable::write_header(&path, &["text_equiv", "segment_id"]).unwrap();
        assert!(matches!(table.append_body(&path), Err(Error::Table(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "text_equiv\tsegment_id\n");
    }

    #[test]
    fn header_then_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tsv");
        let table = sample();
        TsvTable::write_header(&path, &["segment_type", "segment_id", "url_id", "region", "rotation"])
            .unwrap();
        table.append_body(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, table.encode(Layout::Leading).unwrap());
    }
}
