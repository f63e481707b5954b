//! `tsvtools` CLI - PAGE-XML ⇄ TSV conversion for OCR and NER ground truth

mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use tsvtools::{load_config, Granularity, HttpConfig, ImageSource, Purpose};

use cmd::{FindEntitiesArgs, Page2TsvArgs};

#[derive(Parser)]
#[command(name = "tsvtools")]
#[command(about = "Convert PAGE-XML to NER/OCR ground-truth TSV and back")]
#[command(version)]
struct Cli {
    /// Debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a TSV table from a METS file group or a single PAGE file
    #[command(name = "page2tsv")]
    Page2Tsv {
        /// METS manifest or PAGE-XML file
        input: PathBuf,

        /// Output TSV file
        tsv_out_file: PathBuf,

        /// METS file group holding the PAGE files
        #[arg(long)]
        file_grp: Option<String>,

        /// Table schema: fonts, skew or page-rotation
        #[arg(long, default_value = "fonts")]
        purpose: Purpose,

        /// Page, TextLine, Word or <Class>Region (e.g. TextRegion)
        #[arg(long, default_value = "TextLine")]
        segment_type: Granularity,

        /// Image URL for every page when no image server is set
        #[arg(long, default_value = tsvtools::tsv::EMPTY_URL)]
        image_url: String,

        /// Image server URL scheme [default: http]
        #[arg(long)]
        scheme: Option<String>,

        /// Image server; page URLs become scheme://server/prefix/<imageFilename>
        #[arg(long)]
        server: Option<String>,

        /// Path prefix on the image server
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Write corrected line text from a TSV file back into PAGE-XML
    #[command(name = "tsv2page")]
    Tsv2Page {
        /// PAGE-XML file to correct
        page_file: PathBuf,

        /// TSV with line_id and TEXT columns
        tsv_file: PathBuf,

        /// Output file [default: <page stem>.corrected.xml]
        #[arg(short, long = "output-filename")]
        output_filename: Option<PathBuf>,

        /// Keep the (out-of-date) Words of patched TextLines
        #[arg(short, long)]
        keep_words: bool,
    },

    /// Tag and link named entities of a token table
    FindEntities {
        tsv_file: PathBuf,

        tsv_out_file: PathBuf,

        /// REST endpoint of the NER service
        #[arg(long)]
        ner_rest_endpoint: Option<String>,

        /// REST endpoint of the NED service
        #[arg(long)]
        ned_rest_endpoint: Option<String>,

        /// Cache file for the raw NED result (read if present, never overwritten)
        #[arg(long)]
        ned_json_file: Option<PathBuf>,

        /// Disable any system proxy
        #[arg(long)]
        noproxy: bool,

        /// Minimum candidate score
        #[arg(long)]
        ned_threshold: Option<f64>,

        /// NED request priority [default: 1]
        #[arg(long)]
        ned_priority: Option<i64>,
    },

    /// List the document URL of every part of a TSV file
    #[command(name = "extract-doc-links")]
    ExtractDocLinks { tsv_file: PathBuf, url_file: PathBuf },

    /// Re-split a TSV file into parts and renumber url_id per part
    #[command(name = "annotate-tsv")]
    AnnotateTsv {
        tsv_file: PathBuf,
        annotated_tsv_file: PathBuf,
    },

    /// Print page2tsv commands for PPN*/**.xml files below a directory
    #[command(name = "make-page2tsv-commands")]
    MakePage2TsvCommands {
        #[arg(long)]
        directory: PathBuf,

        #[arg(long, default_value = "fonts")]
        purpose: Purpose,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is kept for command output
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = load_config()?;

    match cli.command {
        Commands::Page2Tsv {
            input,
            tsv_out_file,
            file_grp,
            purpose,
            segment_type,
            image_url,
            scheme,
            server,
            prefix,
        } => {
            let mut image = config.image;
            if let Some(scheme) = scheme {
                image.scheme = scheme;
            }
            image.server = server.or(image.server);
            image.prefix = prefix.or(image.prefix);
            let image: ImageSource = image.source(&image_url);

            cmd::cmd_page2tsv(&Page2TsvArgs {
                input,
                output: tsv_out_file,
                file_grp,
                purpose,
                segment_type,
                image,
            })?;
        }
        Commands::Tsv2Page {
            page_file,
            tsv_file,
            output_filename,
            keep_words,
        } => {
            cmd::cmd_tsv2page(&page_file, &tsv_file, output_filename, keep_words)?;
        }
        Commands::FindEntities {
            tsv_file,
            tsv_out_file,
            ner_rest_endpoint,
            ned_rest_endpoint,
            ned_json_file,
            noproxy,
            ned_threshold,
            ned_priority,
        } => {
            let services = config.services;
            let http = HttpConfig {
                noproxy: noproxy || services.noproxy,
                ..services.http()
            };
            cmd::cmd_find_entities(FindEntitiesArgs {
                tsv_file,
                tsv_out_file,
                ner_rest_endpoint: ner_rest_endpoint.or(services.ner_rest_endpoint),
                ned_rest_endpoint: ned_rest_endpoint.or(services.ned_rest_endpoint),
                ned_json_file,
                ned_threshold: ned_threshold.or(services.ned_threshold),
                ned_priority: ned_priority.unwrap_or(services.ned_priority),
                http,
            })
            .await?;
        }
        Commands::ExtractDocLinks { tsv_file, url_file } => {
            cmd::cmd_extract_doc_links(&tsv_file, &url_file)?;
        }
        Commands::AnnotateTsv {
            tsv_file,
            annotated_tsv_file,
        } => {
            cmd::cmd_annotate_tsv(&tsv_file, &annotated_tsv_file)?;
        }
        Commands::MakePage2TsvCommands { directory, purpose } => {
            cmd::cmd_make_page2tsv_commands(&directory, purpose)?;
        }
    }

    Ok(())
}
