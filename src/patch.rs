//! Write corrected line text back into PAGE-XML (`tsv2page`).
//!
//! The document is streamed through `quick-xml` and re-serialized with
//! 2-space indentation. Only targeted `TextLine`s change: the `Unicode` of
//! their first `TextEquiv` is replaced and, unless words are kept, their
//! `Word` children are dropped. Everything else is passed through.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::debug;

use crate::error::{Error, Result};
use crate::tsv::TsvTable;

pub const LINE_ID: &str = "line_id";
pub const TEXT: &str = "TEXT";

/// Children of `TextLine` that come after `TextEquiv` in the schema.
const AFTER_TEXT_EQUIV: &[&[u8]] = &[b"TextStyle", b"UserDefined", b"Labels"];

/// Corrected text per line id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corrections {
    texts: HashMap<String, String>,
}

impl Corrections {
    /// Build from a table with `line_id` and `TEXT` columns. Later rows win
    /// for repeated ids; empty cells patch as empty text.
    pub fn from_table(table: &TsvTable) -> Result<Self> {
        let id_col = table
            .column(LINE_ID)
            .ok_or_else(|| Error::Table(format!("missing {LINE_ID} column")))?;
        let text_col = table
            .column(TEXT)
            .ok_or_else(|| Error::Table(format!("missing {TEXT} column")))?;

        let texts = table
            .rows
            .iter()
            .map(|row| (row[id_col].clone(), row[text_col].clone()))
            .collect();
        Ok(Self { texts })
    }

    pub fn read(path: &Path) -> Result<Self> {
        Self::from_table(&TsvTable::read(path)?)
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn get(&self, line_id: &str) -> Option<&str> {
        self.texts.get(line_id).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchOptions {
    /// Keep the (now stale) `Word` children of patched lines.
    pub keep_words: bool,
}

/// `<stem>.corrected.xml` in the working directory.
pub fn default_output_path(page: &Path) -> PathBuf {
    let stem = page.file_stem().unwrap_or(page.as_os_str()).to_string_lossy();
    PathBuf::from(format!("{stem}.corrected.xml"))
}

/// The `TextLine` currently being patched.
struct Target {
    depth: usize,
    text: String,
    prefix: String,
    equiv_seen: bool,
    in_first_equiv: bool,
    unicode_written: bool,
}

/// Apply `corrections` to a PAGE-XML document, returning the new document.
///
/// Fails with `PatchTargetNotFound` if any line id has no `TextLine`.
pub fn patch_page(xml: &str, corrections: &Corrections, options: PatchOptions) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    let mut depth = 0usize;
    let mut target: Option<Target> = None;
    let mut found: HashSet<String> = HashSet::new();
    // whitespace is only kept as the content of a leaf element
    let mut pending_space: Option<BytesText> = None;
    let mut after_start = false;

    loop {
        let event = reader.read_event()?;
        let space = pending_space.take();
        let was_after_start = std::mem::replace(&mut after_start, false);

        match event {
            Event::Eof => break,
            Event::Text(text) if text.iter().all(u8::is_ascii_whitespace) => {
                if was_after_start {
                    pending_space = Some(text);
                    after_start = true;
                }
            }
            Event::Start(start) => {
                let local = start.local_name().as_ref().to_vec();

                if let Some(t) = target.as_mut() {
                    if depth == t.depth + 1 {
                        if local == b"Word" && !options.keep_words {
                            reader.read_to_end(start.name())?;
                            continue;
                        }
                        if AFTER_TEXT_EQUIV.contains(&local.as_slice()) && !t.equiv_seen {
                            t.equiv_seen = true;
                            write_text_equiv(&mut writer, &t.prefix, &t.text)?;
                        }
                        if local == b"TextEquiv" && !t.equiv_seen {
                            t.equiv_seen = true;
                            t.in_first_equiv = true;
                        }
                    } else if depth == t.depth + 2
                        && t.in_first_equiv
                        && !t.unicode_written
                        && local == b"Unicode"
                    {
                        t.unicode_written = true;
                        reader.read_to_end(start.name())?;
                        let end = start.to_end().into_owned();
                        writer.write_event(Event::Start(start))?;
                        writer.write_event(Event::Text(BytesText::new(&t.text)))?;
                        writer.write_event(Event::End(end))?;
                        continue;
                    }
                } else if local == b"TextLine" {
                    target = start_target(&start, depth, corrections, &mut found)?;
                }

                writer.write_event(Event::Start(start))?;
                depth += 1;
                after_start = true;
            }
            Event::Empty(empty) => {
                let local = empty.local_name().as_ref().to_vec();

                if let Some(t) = target.as_mut() {
                    if depth == t.depth + 1 {
                        if local == b"Word" && !options.keep_words {
                            continue;
                        }
                        if AFTER_TEXT_EQUIV.contains(&local.as_slice()) && !t.equiv_seen {
                            t.equiv_seen = true;
                            write_text_equiv(&mut writer, &t.prefix, &t.text)?;
                        }
                        if local == b"TextEquiv" && !t.equiv_seen {
                            t.equiv_seen = true;
                            t.unicode_written = true;
                            let end = empty.to_end().into_owned();
                            writer.write_event(Event::Start(empty))?;
                            write_unicode(&mut writer, &t.prefix, &t.text)?;
                            writer.write_event(Event::End(end))?;
                            continue;
                        }
                    } else if depth == t.depth + 2
                        && t.in_first_equiv
                        && !t.unicode_written
                        && local == b"Unicode"
                    {
                        t.unicode_written = true;
                        let end = empty.to_end().into_owned();
                        writer.write_event(Event::Start(empty))?;
                        writer.write_event(Event::Text(BytesText::new(&t.text)))?;
                        writer.write_event(Event::End(end))?;
                        continue;
                    }
                } else if local == b"TextLine" {
                    if let Some(t) = start_target(&empty, depth, corrections, &mut found)? {
                        let end = empty.to_end().into_owned();
                        writer.write_event(Event::Start(empty))?;
                        write_text_equiv(&mut writer, &t.prefix, &t.text)?;
                        writer.write_event(Event::End(end))?;
                        continue;
                    }
                }

                writer.write_event(Event::Empty(empty))?;
            }
            Event::End(end) => {
                depth = depth.saturating_sub(1);

                if let Some(t) = target.as_mut() {
                    if depth == t.depth + 1
                        && t.in_first_equiv
                        && end.local_name().as_ref() == b"TextEquiv"
                    {
                        t.in_first_equiv = false;
                        if !t.unicode_written {
                            t.unicode_written = true;
                            write_unicode(&mut writer, &t.prefix, &t.text)?;
                        }
                    } else if depth == t.depth {
                        if !t.equiv_seen {
                            write_text_equiv(&mut writer, &t.prefix, &t.text)?;
                        }
                        target = None;
                    }
                }

                if let Some(space) = space {
                    writer.write_event(Event::Text(space))?;
                }
                writer.write_event(Event::End(end))?;
            }
            other => writer.write_event(other)?,
        }
    }

    let mut missing: Vec<&str> = corrections
        .texts
        .keys()
        .filter(|id| !found.contains(*id))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        missing.sort_unstable();
        return Err(Error::PatchTargetNotFound(missing.join(", ")));
    }

    debug!(lines = found.len(), "Patched document");
    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::Document(format!("patched document is not UTF-8: {e}")))
}

/// Start patching `line` if its id is corrected.
fn start_target(
    line: &BytesStart,
    depth: usize,
    corrections: &Corrections,
    found: &mut HashSet<String>,
) -> Result<Option<Target>> {
    let Some(attr) = line
        .attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == b"id")
    else {
        return Ok(None);
    };
    let id = attr.unescape_value()?.into_owned();
    let Some(text) = corrections.get(&id) else {
        return Ok(None);
    };
    found.insert(id);

    let name = String::from_utf8_lossy(line.name().as_ref()).into_owned();
    let prefix = name
        .rsplit_once(':')
        .map(|(p, _)| format!("{p}:"))
        .unwrap_or_default();

    Ok(Some(Target {
        depth,
        text: text.to_string(),
        prefix,
        equiv_seen: false,
        in_first_equiv: false,
        unicode_written: false,
    }))
}

fn write_text_equiv(writer: &mut Writer<Vec<u8>>, prefix: &str, text: &str) -> Result<()> {
    let name = format!("{prefix}TextEquiv");
    writer.write_event(Event::Start(BytesStart::new(name.as_str())))?;
    write_unicode(writer, prefix, text)?;
    writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
    Ok(())
}

fn write_unicode(writer: &mut Writer<Vec<u8>>, prefix: &str, text: &str) -> Result<()> {
    let name = format!("{prefix}Unicode");
    writer.write_event(Event::Start(BytesStart::new(name.as_str())))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
    Ok(())
}
