use std::path::Path;

use anyhow::{Context, Result};

use tsvtools::tsv::EMPTY_URL;
use tsvtools::{DocLinks, Layout, TsvTable};

fn read_links(tsv_file: &Path) -> Result<DocLinks> {
    DocLinks::read(tsv_file).with_context(|| format!("failed to read {}", tsv_file.display()))
}

pub fn cmd_extract_doc_links(tsv_file: &Path, url_file: &Path) -> Result<()> {
    let links = read_links(tsv_file)?;

    let mut table = TsvTable::new(&["url"]);
    for part in &links.parts {
        table.push_row(vec![part.url.clone().unwrap_or_else(|| EMPTY_URL.to_string())])?;
    }
    table
        .write(url_file, Layout::Leading)
        .with_context(|| format!("failed to write {}", url_file.display()))?;

    eprintln!("🔗 {} documents → {}", links.parts.len(), url_file.display());
    Ok(())
}

pub fn cmd_annotate_tsv(tsv_file: &Path, annotated_tsv_file: &Path) -> Result<()> {
    let links = read_links(tsv_file)?;
    let table = links.resplit()?;
    table
        .write(annotated_tsv_file, Layout::Grouped)
        .with_context(|| format!("failed to write {}", annotated_tsv_file.display()))?;

    eprintln!(
        "📑 {} documents, {} rows → {}",
        table.urls.len(),
        table.rows.len(),
        annotated_tsv_file.display()
    );
    Ok(())
}
