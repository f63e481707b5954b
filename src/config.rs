//! Settings loaded from `~/.config/tsvtools/config.toml`.
//!
//! Every value can also be given on the command line, which wins.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::extract::ImageSource;
use crate::http_client::HttpConfig;

/// Image server used to build page URLs.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ImageConfig {
    pub scheme: String,
    pub server: Option<String>,
    pub prefix: Option<String>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            server: None,
            prefix: None,
        }
    }
}

impl ImageConfig {
    /// URL template if a server is configured, else the fixed `image_url`.
    pub fn source(&self, image_url: &str) -> ImageSource {
        match &self.server {
            Some(server) => ImageSource::Template {
                scheme: self.scheme.clone(),
                server: server.clone(),
                prefix: self.prefix.clone(),
            },
            None => ImageSource::Fixed(image_url.to_string()),
        }
    }
}

/// NER/NED service endpoints and parameters.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServicesConfig {
    pub ner_rest_endpoint: Option<String>,
    pub ned_rest_endpoint: Option<String>,
    pub ned_threshold: Option<f64>,
    pub ned_priority: i64,
    pub noproxy: bool,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            ner_rest_endpoint: None,
            ned_rest_endpoint: None,
            ned_threshold: None,
            ned_priority: 1,
            noproxy: false,
        }
    }
}

impl ServicesConfig {
    pub fn http(&self) -> HttpConfig {
        HttpConfig {
            noproxy: self.noproxy,
            ..HttpConfig::default()
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub image: ImageConfig,
    pub services: ServicesConfig,
}

/// Load the configuration from `~/.config/tsvtools/config.toml`.
///
/// Returns defaults if the file doesn't exist (configuration is optional).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config() -> Result<Config> {
    load_config_from(&config_path())
}

/// Load the configuration from an explicit path, defaulting if absent.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
}

/// Return the path to the config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tsvtools")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.image.scheme, "http");
        assert_eq!(config.services.ned_priority, 1);
        assert!(!config.services.noproxy);
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
[image]
scheme = "https"
server = "content.staatsbibliothek-berlin.de"
prefix = "dc"

[services]
ner_rest_endpoint = "http://localhost:5000/ner/1"
ned_rest_endpoint = "http://localhost:5001"
ned_threshold = 0.2
ned_priority = 0
noproxy = true
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.image.server.as_deref(), Some("content.staatsbibliothek-berlin.de"));
        assert_eq!(config.services.ned_threshold, Some(0.2));
        assert_eq!(config.services.ned_priority, 0);
        assert!(config.services.http().noproxy);
        assert!(matches!(
            config.image.source("http://empty"),
            ImageSource::Template { .. }
        ));
    }

    #[test]
    fn partial_section_keeps_defaults() {
        let config: Config = toml::from_str("[services]\nnoproxy = true\n").unwrap();
        assert_eq!(config.services.ned_priority, 1);
        assert_eq!(config.image, ImageConfig::default());
        assert_eq!(
            config.image.source("http://fixed"),
            ImageSource::Fixed("http://fixed".to_string())
        );
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[services\nnoproxy = ").unwrap();
        assert!(load_config_from(&path).is_err());
    }
}
