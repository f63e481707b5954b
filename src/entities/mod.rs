//! Named entity recognition and disambiguation over token tables
//! (`find-entities`).
//!
//! A token table has one row per token and a `No.` column that restarts at
//! 0 with every sentence. Tags come either from a NER service or from the
//! table's own `NE-TAG` column; a NED service then links tagged entities to
//! Wikidata ids.
//!
//! Services sit behind the [`NerService`] and [`NedService`] traits so the
//! pipeline can run against the REST adapters in [`client`] or in-process
//! fakes.

pub mod client;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::tsv::TsvTable;

pub use client::{RestNed, RestNer};

pub const NO: &str = "No.";
pub const TOKEN: &str = "TOKEN";
pub const NE_TAG: &str = "NE-TAG";
pub const NE_EMB: &str = "NE-EMB";
pub const ID: &str = "ID";
pub const CONF: &str = "conf";
/// Older tables name the link column after the GND authority file.
pub const LEGACY_ID: &str = "GND-ID";

/// Placeholder for "no link".
pub const NO_LINK: &str = "-";

/// Tags the pipeline understands; anything else reads as `O`.
pub const NE_TAGS: &[&str] = &["O", "B-PER", "B-LOC", "B-ORG", "I-PER", "I-LOC", "I-ORG"];

/// Map a tag outside [`NE_TAGS`] to `O`.
pub fn normalize_tag(tag: &str) -> &str {
    if NE_TAGS.contains(&tag) {
        tag
    } else {
        "O"
    }
}

/// One token with its tag, as exchanged with the services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedWord {
    pub word: String,
    pub prediction: String,
}

/// Tagged tokens per sentence.
pub type NerResult = Vec<Vec<TaggedWord>>;

/// Sequence tagger.
#[async_trait]
pub trait NerService: Send + Sync {
    /// Tag one sentence given as space-joined tokens. The service may split
    /// it into several sentences of its own.
    async fn tag(&self, text: &str) -> Result<NerResult>;
}

/// Entity linker.
#[async_trait]
pub trait NedService: Send + Sync {
    /// Turn tagged sentences into the service's entity map.
    async fn parse(&self, ner: &NerResult) -> Result<Value>;

    /// Rank link candidates for every entity of `entities`.
    async fn disambiguate(&self, entities: &Value, return_full: bool, priority: i64) -> Result<Value>;
}

/// Parameters of a [`find_entities`] run.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichOptions {
    /// Keep only candidates whose `proba_1` reaches this score.
    pub threshold: Option<f64>,
    pub priority: i64,
    /// Raw NED result cache. Read if present, written once if not.
    pub cache: Option<PathBuf>,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            threshold: None,
            priority: 1,
            cache: None,
        }
    }
}

/// What a [`find_entities`] run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichReport {
    pub sentences: usize,
    pub tagged_tokens: usize,
    pub entities: usize,
    pub linked_entities: usize,
    pub cache_written: bool,
}

/// Rename legacy columns and add missing tag/link columns.
pub fn prepare_table(table: &mut TsvTable) {
    table.rename_column(LEGACY_ID, ID);
    table.ensure_column(NE_TAG, "O");
    table.ensure_column(NE_EMB, "O");
    table.ensure_column(ID, NO_LINK);
}

/// Row indices per sentence; a sentence starts wherever `No.` is 0.
pub fn sentences(table: &TsvTable) -> Result<Vec<Vec<usize>>> {
    let no = table
        .column(NO)
        .ok_or_else(|| Error::Table(format!("missing {NO} column")))?;

    let mut out: Vec<Vec<usize>> = Vec::new();
    for (i, row) in table.rows.iter().enumerate() {
        let starts = row[no].trim().parse::<i64>().is_ok_and(|n| n == 0);
        match out.last_mut() {
            Some(sentence) if !starts => sentence.push(i),
            _ => out.push(vec![i]),
        }
    }
    Ok(out)
}

fn token_column(table: &TsvTable) -> Result<usize> {
    table
        .column(TOKEN)
        .ok_or_else(|| Error::Table(format!("missing {TOKEN} column")))
}

/// The table's own tags, normalized, as a NER result.
pub fn tags_from_table(table: &TsvTable) -> Result<NerResult> {
    let token = token_column(table)?;
    let tag = table
        .column(NE_TAG)
        .ok_or_else(|| Error::Configuration(format!("table has no {NE_TAG} column")))?;

    Ok(sentences(table)?
        .into_iter()
        .map(|rows| {
            rows.into_iter()
                .map(|i| TaggedWord {
                    word: table.rows[i][token].clone(),
                    prediction: normalize_tag(&table.rows[i][tag]).to_string(),
                })
                .collect()
        })
        .collect())
}

/// Tag every sentence with `ner` and write the tags into `NE-TAG`.
pub async fn apply_ner(table: &mut TsvTable, ner: &dyn NerService) -> Result<NerResult> {
    let token = token_column(table)?;
    let tag = table.ensure_column(NE_TAG, "O");

    let mut result = Vec::new();
    for rows in sentences(table)? {
        let tokens: Vec<&str> = rows.iter().map(|&i| table.rows[i][token].as_str()).collect();
        let predicted = ner.tag(&tokens.join(" ")).await?;
        let tags = align_predictions(&tokens, &predicted);

        let sentence = rows
            .iter()
            .zip(tags)
            .map(|(&i, prediction)| TaggedWord {
                word: table.rows[i][token].clone(),
                prediction,
            })
            .collect::<Vec<_>>();
        for (&i, word) in rows.iter().zip(&sentence) {
            table.rows[i][tag] = word.prediction.clone();
        }
        result.push(sentence);
    }
    Ok(result)
}

/// Map service words back onto table tokens.
///
/// Both sides are measured in characters of the whitespace-free text; a
/// token takes the tag of the first word covering its first character.
pub fn align_predictions(tokens: &[&str], predicted: &NerResult) -> Vec<String> {
    let mut spans = Vec::new();
    let mut offset = 0usize;
    for word in predicted.iter().flatten() {
        let len = solid_len(&word.word);
        spans.push((offset, offset + len, word.prediction.as_str()));
        offset += len;
    }

    let mut offset = 0usize;
    tokens
        .iter()
        .map(|token| {
            let len = solid_len(token);
            let start = offset;
            offset += len;
            if len == 0 {
                return "O".to_string();
            }
            spans
                .iter()
                .find(|(from, to, _)| *from <= start && start < *to)
                .map_or("O", |(_, _, tag)| normalize_tag(tag))
                .to_string()
        })
        .collect()
}

fn solid_len(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// A run of tokens tagged as one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub rows: Vec<usize>,
    pub kind: String,
    pub surface: String,
}

impl Entity {
    /// Key used by the NED service: surface + `-` + type.
    pub fn key(&self) -> String {
        format!("{}-{}", self.surface, self.kind)
    }
}

/// Group tagged rows into entities. An entity ends at `O`, at any `B-` tag,
/// at a type change, and at a sentence boundary.
pub fn collect_entities(table: &TsvTable) -> Result<Vec<Entity>> {
    let token = token_column(table)?;
    let tag = table
        .column(NE_TAG)
        .ok_or_else(|| Error::Table(format!("missing {NE_TAG} column")))?;

    let mut entities = Vec::new();
    for rows in sentences(table)? {
        let mut current: Option<(Vec<usize>, String)> = None;
        for i in rows {
            let Some((position, kind)) = normalize_tag(&table.rows[i][tag]).split_once('-') else {
                entities.extend(current.take());
                continue;
            };
            match current.as_mut() {
                Some((members, current_kind)) if position == "I" && current_kind.as_str() == kind => {
                    members.push(i);
                }
                _ => {
                    entities.extend(current.take());
                    current = Some((vec![i], kind.to_string()));
                }
            }
        }
        entities.extend(current);
    }

    Ok(entities
        .into_iter()
        .map(|(rows, kind)| Entity {
            surface: rows
                .iter()
                .map(|&i| table.rows[i][token].as_str())
                .collect::<Vec<_>>()
                .join(" "),
            rows,
            kind,
        })
        .collect())
}

/// Write NED links into `ID` and `conf`. Returns the number of linked
/// entities.
pub fn merge_links(table: &mut TsvTable, ned_result: &Value, threshold: Option<f64>) -> Result<usize> {
    let entities = collect_entities(table)?;
    let id = table.ensure_column(ID, NO_LINK);
    let conf = table.ensure_column(CONF, NO_LINK);

    let mut linked = 0;
    for entity in &entities {
        let candidates = ranking(ned_result, &entity.key(), threshold);
        if candidates.is_empty() {
            continue;
        }
        linked += 1;

        let ids = candidates
            .iter()
            .map(|(qid, _)| qid.as_str())
            .collect::<Vec<_>>()
            .join("|");
        let scores = candidates
            .iter()
            .map(|(_, score)| score.as_str())
            .collect::<Vec<_>>()
            .join(",");
        for &row in &entity.rows {
            table.rows[row][id] = ids.clone();
            table.rows[row][conf] = scores.clone();
        }
    }
    debug!(entities = entities.len(), linked, "Merged entity links");
    Ok(linked)
}

/// `(wikidata id, proba_1)` pairs of an entity's ranking that pass the
/// threshold, in ranking order.
fn ranking(ned_result: &Value, key: &str, threshold: Option<f64>) -> Vec<(String, String)> {
    let Some(candidates) = ned_result
        .get(key)
        .and_then(|entry| entry.get("ranking"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    candidates
        .iter()
        .filter_map(|candidate| {
            let info = candidate.get(1)?;
            let qid = info.get("wikidata")?.as_str()?;
            let proba = info.get("proba_1")?;
            let score = proba.as_f64().or_else(|| proba.as_str()?.parse().ok())?;
            if threshold.is_some_and(|t| score < t) {
                return None;
            }
            let text = match proba {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((qid.to_string(), text))
        })
        .collect()
}

/// Load a cached NED result, if the cache file exists.
pub fn load_cache(path: &Path) -> Result<Option<Value>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

/// Write the NED result unless `path` already exists. Returns whether it
/// was written.
pub fn write_cache(path: &Path, ned_result: &Value) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    let mut json = serde_json::to_string_pretty(ned_result)?;
    json.push('\n');
    std::fs::write(path, json)?;
    Ok(true)
}

/// Run the whole enrichment over `table`.
///
/// Without a NER service the table must already carry `NE-TAG`; this is
/// checked before any request is made.
pub async fn find_entities(
    table: &mut TsvTable,
    ner: Option<&dyn NerService>,
    ned: Option<&dyn NedService>,
    options: &EnrichOptions,
) -> Result<EnrichReport> {
    if ner.is_none() && table.column(NE_TAG).is_none() {
        return Err(Error::Configuration(format!(
            "either a NER endpoint or a {NE_TAG} column is required"
        )));
    }
    prepare_table(table);

    let ner_result = match ner {
        Some(service) => apply_ner(table, service).await?,
        None => {
            info!("Using NER tags already present in the table");
            tags_from_table(table)?
        }
    };

    let mut report = EnrichReport {
        sentences: ner_result.len(),
        tagged_tokens: ner_result
            .iter()
            .flatten()
            .filter(|w| w.prediction != "O")
            .count(),
        ..EnrichReport::default()
    };

    let Some(ned) = ned else {
        return Ok(report);
    };

    let cached = match &options.cache {
        Some(path) => load_cache(path)?,
        None => None,
    };
    let ned_result = match cached {
        Some(value) => {
            info!("Using cached NED result");
            value
        }
        None => {
            let entities = ned.parse(&ner_result).await?;
            ned.disambiguate(&entities, options.cache.is_some(), options.priority)
                .await?
        }
    };

    report.entities = collect_entities(table)?.len();
    report.linked_entities = merge_links(table, &ned_result, options.threshold)?;
    if report.linked_entities == 0 && report.entities > 0 {
        warn!(entities = report.entities, "No entity received a link");
    }

    if let Some(path) = &options.cache {
        report.cache_written = write_cache(path, &ned_result)?;
    }
    Ok(report)
}
