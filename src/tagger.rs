//! Named-entity tagging capability.
//!
//! The statement parser only needs labeled spans. The capability is built
//! once at startup by [`build_tagger`]; if that fails the process should not
//! accept any document.

use crate::config::{CommandTaggerConfig, TaggerBackend, TaggerConfig};
use crate::error::TaggerError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use tracing::info;

pub const LABEL_PERSON: &str = "PERSON";
pub const LABEL_ORG: &str = "ORG";

/// A labeled piece of text returned by a tagger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub text: String,
    pub label: String,
}

impl EntitySpan {
    pub fn is_party(&self) -> bool {
        self.label == LABEL_PERSON || self.label == LABEL_ORG
    }
}

pub trait EntityTagger {
    /// Spans in the order the recognizer reports them.
    fn tag(&self, text: &str) -> Result<Vec<EntitySpan>, TaggerError>;
}

pub fn build_tagger(cfg: &TaggerConfig) -> Result<Box<dyn EntityTagger>, TaggerError> {
    match cfg.backend {
        TaggerBackend::Pattern => {
            info!("Using built-in pattern tagger");
            Ok(Box::new(PatternTagger))
        }
        TaggerBackend::Command => Ok(Box::new(CommandTagger::start(&cfg.command)?)),
    }
}

// ---------------------------------------------------------------------------
// Built-in company-name recognizer
// ---------------------------------------------------------------------------

// A run of capitalised words (or `&`) on one line, ending in a legal suffix.
static COMPANY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:(?:\b[A-Z][A-Za-z0-9&'.\-]*|&)[ \t]+)+(?:PTE\.?[ \t]*LTD|CO\.?,?[ \t]*LTD|L\.?L\.?C|LLP|INC|Inc|LTD|Ltd|CORPORATION|Corporation|CORP|Corp|COMPANY|Company|CO|Co|PLC|GROUP|Group)\b\.?",
    )
    .unwrap()
});

/// Recognizes company names by their legal suffix ("ACME CORP", "Smith & Sons LLC").
/// It never reports PERSON spans.
pub struct PatternTagger;

impl EntityTagger for PatternTagger {
    fn tag(&self, text: &str) -> Result<Vec<EntitySpan>, TaggerError> {
        Ok(COMPANY_RE
            .find_iter(text)
            .map(|m| EntitySpan {
                text: m.as_str().trim().to_string(),
                label: LABEL_ORG.to_string(),
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// External recognizer process
// ---------------------------------------------------------------------------

/// Runs an external recognizer per request: text goes in on stdin, a JSON
/// array of `{"text": ..., "label": ...}` comes back on stdout.
pub struct CommandTagger {
    program: String,
    args: Vec<String>,
}

impl CommandTagger {
    /// Build the tagger and probe it once with empty input.
    pub fn start(cfg: &CommandTaggerConfig) -> Result<Self, TaggerError> {
        let tagger = Self {
            program: cfg.program.clone(),
            args: cfg.args.clone(),
        };
        tagger
            .run("")
            .map_err(|e| TaggerError::Unavailable(e.to_string()))?;
        info!(program = %tagger.program, args = ?tagger.args, "External entity tagger ready");
        Ok(tagger)
    }

    fn run(&self, text: &str) -> Result<Vec<EntitySpan>, TaggerError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| TaggerError::Failed(format!("failed to start {}: {e}", self.program)))?;

        // Closing stdin (dropping it) signals end of input.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(text.as_bytes()),
            None => Ok(()),
        };

        let output = child
            .wait_with_output()
            .map_err(|e| TaggerError::Failed(format!("{}: {e}", self.program)))?;

        if !output.status.success() {
            return Err(TaggerError::Failed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        if let Err(e) = written {
            if e.kind() != ErrorKind::BrokenPipe {
                return Err(TaggerError::Failed(format!("writing to {}: {e}", self.program)));
            }
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| TaggerError::Failed(format!("bad output from {}: {e}", self.program)))
    }
}

impl EntityTagger for CommandTagger {
    fn tag(&self, text: &str) -> Result<Vec<EntitySpan>, TaggerError> {
        self.run(text)
    }
}
