//! Policy file loading

use serde::de::DeserializeOwned;

use crate::{Error, NormalizedPath, Result};

/// Serialization format of a policy file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyFormat {
    Toml,
    Json,
    Yaml,
}

impl PolicyFormat {
    /// Format for `path`; extensions compare case-insensitively.
    pub fn detect(path: &NormalizedPath) -> Result<Self> {
        let extension = path.extension().unwrap_or_default().to_ascii_lowercase();
        match extension.as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(Error::UnsupportedFormat { extension }),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
            Self::Yaml => "YAML",
        }
    }

    fn parse<T: DeserializeOwned>(self, content: &str) -> std::result::Result<T, String> {
        match self {
            Self::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        }
    }
}

/// Reads policy files in any supported format.
#[derive(Debug, Default)]
pub struct ConfigStore;

impl ConfigStore {
    pub fn new() -> Self {
        Self
    }

    /// Deserialize the file at `path`.
    ///
    /// The format is checked before the file is read, so an unsupported
    /// extension fails even when the file does not exist.
    pub fn load<T: DeserializeOwned>(&self, path: &NormalizedPath) -> Result<T> {
        let format = PolicyFormat::detect(path)?;
        let native = path.to_native();
        let content = std::fs::read_to_string(&native).map_err(|e| Error::io(&native, e))?;

        format.parse(&content).map_err(|message| Error::ConfigParse {
            path: native,
            format: format.name().into(),
            message,
        })
    }
}
