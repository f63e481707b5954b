//! Generate `page2tsv` invocations for a directory of PAGE files
//! (`make-page2tsv-commands`).
//!
//! Files are expected under a `PPN...` directory with a page number in
//! their name, e.g. `gt/PPN680203753/00000017.xml`. The PPN and number make
//! up the IIIF image URL of the digitized page.

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::extract::Purpose;

const IIIF_BASE: &str = "https://content.staatsbibliothek-berlin.de/dc";

/// Placeholder region later filled per segment by the consumers of the table.
const REGION_PLACEHOLDER: &str = "left,top,width,height";

/// Path shape: `<stem = .../PPN.../...<number>...>.xml`.
const FILE_PATTERN: &str = r"^(.*/(PPN[0-9X]+)/.*?([0-9]+).*?).xml";

/// One generated invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page2TsvCommand {
    pub page_file: PathBuf,
    pub tsv_file: PathBuf,
    pub image_url: String,
    pub purpose: Purpose,
}

/// Turns matching paths into commands.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    pattern: Regex,
    purpose: Purpose,
}

impl CommandGenerator {
    pub fn new(purpose: Purpose) -> Result<Self> {
        let pattern = Regex::new(FILE_PATTERN)
            .map_err(|e| Error::Configuration(format!("file pattern: {e}")))?;
        Ok(Self { pattern, purpose })
    }

    /// Build the command for `path`, if its name carries a PPN and number.
    pub fn for_file(&self, path: &Path) -> Option<Page2TsvCommand> {
        let name = path.to_string_lossy();
        let caps = self.pattern.captures(&name)?;
        let stem = caps.get(1)?.as_str();
        let ppn = caps.get(2)?.as_str();
        let Ok(number) = caps.get(3)?.as_str().parse::<u64>() else {
            warn!(path = %name, "Page number out of range");
            return None;
        };

        Some(Page2TsvCommand {
            page_file: path.to_path_buf(),
            tsv_file: PathBuf::from(format!("{stem}.tsv")),
            image_url: format!(
                "{IIIF_BASE}/{ppn}-{number:08}/{REGION_PLACEHOLDER}/full/0/default.jpg"
            ),
            purpose: self.purpose,
        })
    }

    /// Commands for every matching `*.xml` below `directory`, in path order.
    pub fn scan_directory(&self, directory: &Path) -> Result<Vec<Page2TsvCommand>> {
        let pattern = format!("{}/**/*.xml", directory.display());
        let paths = glob::glob(&pattern)
            .map_err(|e| Error::Configuration(format!("invalid directory {pattern:?}: {e}")))?;

        let mut commands = Vec::new();
        for entry in paths {
            let path = entry.map_err(glob::GlobError::into_error)?;
            match self.for_file(&path) {
                Some(command) => commands.push(command),
                None => debug!(path = %path.display(), "No PPN/page number in path"),
            }
        }
        Ok(commands)
    }
}

impl Page2TsvCommand {
    /// Shell line invoking this binary.
    pub fn to_command_line(&self) -> String {
        format!(
            "tsvtools page2tsv {} {} --image-url={} --purpose={}",
            self.page_file.display(),
            self.tsv_file.display(),
            self.image_url,
            self.purpose
        )
    }
}
