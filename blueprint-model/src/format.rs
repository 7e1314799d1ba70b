//! Surface syntax detection

use std::fmt;
use std::path::Path;
use thiserror::Error;

/// The two accepted textual encodings of a blueprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    /// Indentation-based block format (`.yml`, `.yaml`).
    Yaml,
    /// Compact JSON with comments (`.jsonc`).
    Jsonc,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("unsupported blueprint file extension: {0:?}")]
    UnsupportedExtension(String),
}

impl DocumentFormat {
    /// Detect the format from a file path or URI path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FormatError> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match extension.as_str() {
            "yml" | "yaml" => Ok(DocumentFormat::Yaml),
            "jsonc" => Ok(DocumentFormat::Jsonc),
            _ => Err(FormatError::UnsupportedExtension(extension)),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Yaml => f.write_str("yaml"),
            DocumentFormat::Jsonc => f.write_str("jsonc"),
        }
    }
}
