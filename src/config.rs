use crate::error::ConfigError;
use serde::Deserialize;
use std::{fs, io::ErrorKind, path::Path};
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = ".config/underwriter.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub acquisition: AcquisitionConfig,
    pub parser: ParserConfig,
    pub tagger: TaggerConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Native text shorter than this (after trimming) is discarded in favour of OCR.
    pub min_text_chars: usize,
    pub ocr: OcrConfig,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            min_text_chars: 50,
            ocr: OcrConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub pdftoppm: String,
    pub tesseract: String,
    pub dpi: u32,
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            pdftoppm: "pdftoppm".to_string(),
            tesseract: "tesseract".to_string(),
            dpi: 200,
            language: "eng".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub header_lines: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self { header_lines: 10 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaggerBackend {
    #[default]
    Pattern,
    Command,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TaggerConfig {
    pub backend: TaggerBackend,
    pub command: CommandTaggerConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CommandTaggerConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for CommandTaggerConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["scripts/spacy_tagger.py".to_string()],
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Like [`Config::load`], but a missing file means "all defaults".
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match Self::load(path) {
            Err(ConfigError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "No config file, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.acquisition.min_text_chars, 50);
        assert_eq!(cfg.acquisition.ocr.dpi, 200);
        assert_eq!(cfg.parser.header_lines, 10);
        assert_eq!(cfg.tagger.backend, TaggerBackend::Pattern);
    }

    #[test]
    fn test_partial_file() {
        let cfg: Config = toml::from_str(
            r#"
[acquisition.ocr]
language = "deu"

[tagger]
backend = "command"

[tagger.command]
program = "/opt/ner/bin/tag"
args = []
"#,
        )
        .unwrap();
        assert_eq!(cfg.acquisition.ocr.language, "deu");
        assert_eq!(cfg.acquisition.ocr.tesseract, "tesseract");
        assert_eq!(cfg.tagger.backend, TaggerBackend::Command);
        assert_eq!(cfg.tagger.command.program, "/opt/ner/bin/tag");
        assert!(cfg.tagger.command.args.is_empty());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_or_default(dir.path().join("nope.toml")).unwrap();
        assert_eq!(cfg.parser.header_lines, 10);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[parser\nheader_lines = ").unwrap();
        assert!(matches!(
            Config::load_or_default(&path),
            Err(ConfigError::Toml(_))
        ));
    }
}
