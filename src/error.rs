//! Error taxonomy shared by every conversion step.
//!
//! [`Error::MalformedGeometry`] is caught by the extractor and turned into a
//! skipped segment. Everything else propagates to the caller and ends the
//! current operation.

use thiserror::Error;

/// Conversion errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed geometry: {0}")]
    MalformedGeometry(String),

    #[error("patch target not found: no TextLine with id {0:?}")]
    PatchTargetNotFound(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("remote service error ({}): {message}", describe_status(status))]
    RemoteService {
        url: Option<String>,
        status: Option<u16>,
        message: String,
    },

    #[error("unknown segment type: {0}")]
    UnknownSchema(String),

    #[error("unknown purpose: {0}")]
    UnknownPurpose(String),

    #[error("invalid table: {0}")]
    Table(String),

    #[error("invalid document: {0}")]
    Document(String),

    #[error("invalid METS: {0}")]
    Mets(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    XmlParse(#[from] roxmltree::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn describe_status(status: &Option<u16>) -> String {
    status.map_or_else(|| "no status".to_string(), |s| format!("HTTP {s}"))
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::RemoteService {
            url: err.url().map(ToString::to_string),
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
