use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use tsvtools::patch::default_output_path;
use tsvtools::{patch_page, Corrections, PatchOptions};

pub fn cmd_tsv2page(
    page_file: &Path,
    tsv_file: &Path,
    output: Option<PathBuf>,
    keep_words: bool,
) -> Result<()> {
    let corrections = Corrections::read(tsv_file)
        .with_context(|| format!("failed to read {}", tsv_file.display()))?;
    let xml = std::fs::read_to_string(page_file)
        .with_context(|| format!("failed to read {}", page_file.display()))?;

    let patched = patch_page(&xml, &corrections, PatchOptions { keep_words })?;

    let output = output.unwrap_or_else(|| default_output_path(page_file));
    std::fs::write(&output, patched)
        .with_context(|| format!("failed to write {}", output.display()))?;

    eprintln!(
        "✏️  Patched {} lines{}",
        corrections.len(),
        if keep_words { " (words kept)" } else { "" }
    );
    eprintln!("✅ Wrote {}", output.display());
    Ok(())
}
