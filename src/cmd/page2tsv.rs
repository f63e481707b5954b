use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info};

use tsvtools::{page_files, parse_page_file, Extractor, Granularity, ImageSource, Purpose, TsvTable};

pub struct Page2TsvArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub file_grp: Option<String>,
    pub purpose: Purpose,
    pub segment_type: Granularity,
    pub image: ImageSource,
}

pub fn cmd_page2tsv(args: &Page2TsvArgs) -> Result<()> {
    let start = Instant::now();

    // fails on an impossible purpose/segment combination before any I/O
    let mut extractor = Extractor::new(args.purpose, args.segment_type)?;

    let files = page_files(&args.input, args.file_grp.as_deref())
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    info!(pages = files.len(), purpose = %args.purpose, segment_type = %args.segment_type, "Extracting");

    TsvTable::write_header(&args.output, extractor.columns())
        .with_context(|| format!("failed to create {}", args.output.display()))?;

    for file in &files {
        let doc = parse_page_file(&file.path)
            .with_context(|| format!("failed to read PAGE file {}", file.path.display()))?;
        let url = args.image.url_for(&doc.page);
        debug!(page_id = %file.page_id, url = %url, "Page");
        extractor.add_page(&file.page_id, &doc.page, &url);
    }

    let skipped = extractor.skipped();
    let table = extractor.into_table();
    table
        .append_body(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    eprintln!(
        "📄 {} pages → {} rows, {} images in {:.2}s",
        files.len(),
        table.rows.len(),
        table.urls.len(),
        start.elapsed().as_secs_f64()
    );
    if skipped > 0 {
        eprintln!("⚠️  Skipped {skipped} unreadable segments");
    }
    eprintln!("✅ Wrote {}", args.output.display());

    Ok(())
}
