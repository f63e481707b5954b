use std::path::PathBuf;

use anyhow::{Context, Result};

use tsvtools::entities::{NedService, NerService};
use tsvtools::{find_entities, EnrichOptions, HttpConfig, Layout, RestNed, RestNer, ServiceClient, TsvTable};

pub struct FindEntitiesArgs {
    pub tsv_file: PathBuf,
    pub tsv_out_file: PathBuf,
    pub ner_rest_endpoint: Option<String>,
    pub ned_rest_endpoint: Option<String>,
    pub ned_json_file: Option<PathBuf>,
    pub ned_threshold: Option<f64>,
    pub ned_priority: i64,
    pub http: HttpConfig,
}

pub async fn cmd_find_entities(args: FindEntitiesArgs) -> Result<()> {
    let mut table = TsvTable::read(&args.tsv_file)
        .with_context(|| format!("failed to read {}", args.tsv_file.display()))?;

    let client = ServiceClient::with_config(args.http)?;
    let ner = args
        .ner_rest_endpoint
        .map(|endpoint| RestNer::new(client.clone(), endpoint));
    let ned = args
        .ned_rest_endpoint
        .map(|endpoint| RestNed::new(client.clone(), endpoint));

    if ner.is_none() {
        eprintln!(
            "🏷️  Using NER information already contained in {}",
            args.tsv_file.display()
        );
    }

    let options = EnrichOptions {
        threshold: args.ned_threshold,
        priority: args.ned_priority,
        cache: args.ned_json_file,
    };
    let report = find_entities(
        &mut table,
        ner.as_ref().map(|n| n as &dyn NerService),
        ned.as_ref().map(|n| n as &dyn NedService),
        &options,
    )
    .await?;

    table
        .write(&args.tsv_out_file, Layout::Grouped)
        .with_context(|| format!("failed to write {}", args.tsv_out_file.display()))?;

    eprintln!(
        "🔎 {} sentences, {} tagged tokens",
        report.sentences, report.tagged_tokens
    );
    if ned.is_some() {
        eprintln!(
            "🔗 Linked {}/{} entities",
            report.linked_entities, report.entities
        );
    }
    if report.cache_written {
        if let Some(cache) = &options.cache {
            eprintln!("💾 Saved NED result to {}", cache.display());
        }
    }
    eprintln!("✅ Wrote {}", args.tsv_out_file.display());
    Ok(())
}
