// src/acquire.rs

use crate::config::{AcquisitionConfig, OcrConfig};
use crate::error::{ExtractionError, OcrError};
use lopdf::Document;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::{debug, info, warn};

/// An uploaded statement, held only while it is being processed.
#[derive(Debug)]
pub struct RawDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl RawDocument {
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            filename,
            bytes: fs::read(path)?,
        })
    }
}

/// Which front-end produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    TextLayer,
    Ocr,
}

#[derive(Debug)]
pub struct AcquiredText {
    pub text: String,
    pub source: TextSource,
}

/// Native text extraction, one string per page in page order.
pub trait TextLayer {
    fn extract_pages(&self, doc: &RawDocument) -> Result<Vec<String>, ExtractionError>;
}

/// Renders every page into an image file inside `workdir`, in page order.
pub trait Rasterizer {
    fn rasterize(&self, doc: &RawDocument, workdir: &Path) -> Result<Vec<PathBuf>, OcrError>;
}

pub trait Recognizer {
    fn recognize(&self, image: &Path) -> Result<String, OcrError>;
}

/// Native text first, full OCR pass if that fails or comes back too short.
pub struct TextAcquirer {
    text_layer: Box<dyn TextLayer>,
    rasterizer: Box<dyn Rasterizer>,
    recognizer: Box<dyn Recognizer>,
    min_text_chars: usize,
}

impl TextAcquirer {
    pub fn new(
        text_layer: Box<dyn TextLayer>,
        rasterizer: Box<dyn Rasterizer>,
        recognizer: Box<dyn Recognizer>,
        min_text_chars: usize,
    ) -> Self {
        Self {
            text_layer,
            rasterizer,
            recognizer,
            min_text_chars,
        }
    }

    pub fn from_config(cfg: &AcquisitionConfig) -> Self {
        Self::new(
            Box::new(PdfTextLayer),
            Box::new(PdftoppmRasterizer::new(&cfg.ocr)),
            Box::new(TesseractRecognizer::new(&cfg.ocr)),
            cfg.min_text_chars,
        )
    }

    /// Only an OCR failure is an error. Native extraction problems just
    /// switch to OCR, and empty text is a valid result.
    pub fn acquire(&self, doc: &RawDocument) -> Result<AcquiredText, OcrError> {
        match self.text_layer.extract_pages(doc) {
            Ok(pages) => {
                let text = pages.concat();
                let chars = text.trim().chars().count();
                if chars >= self.min_text_chars {
                    info!(pages = pages.len(), chars, "Text layer extracted");
                    return Ok(AcquiredText {
                        text,
                        source: TextSource::TextLayer,
                    });
                }
                info!(
                    chars,
                    min = self.min_text_chars,
                    "Text layer too short — switching to OCR"
                );
            }
            Err(e) => {
                warn!(error = %e, "Text layer extraction failed — switching to OCR");
            }
        }

        Ok(AcquiredText {
            text: self.ocr(doc)?,
            source: TextSource::Ocr,
        })
    }

    fn ocr(&self, doc: &RawDocument) -> Result<String, OcrError> {
        // Removed when dropped, whichever way this function returns.
        let workdir = tempfile::Builder::new()
            .prefix("underwriter-ocr-")
            .tempdir()?;

        let images = self.rasterizer.rasterize(doc, workdir.path())?;
        if images.is_empty() {
            warn!("Rasterizer produced no page images");
        }

        let mut text = String::new();
        for (idx, image) in images.iter().enumerate() {
            let page = self.recognizer.recognize(image)?;
            debug!(page = idx + 1, chars = page.len(), "Page recognized");
            text.push_str(&page);
        }

        info!(pages = images.len(), chars = text.len(), "OCR complete");
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// PDF text layer
// ---------------------------------------------------------------------------

/// Share of image-only pages above which the PDF counts as a scan.
const SCANNED_PAGE_RATIO: f64 = 0.8;

/// `lopdf` for the structural scan check, `pdf-extract` for the text.
pub struct PdfTextLayer;

impl TextLayer for PdfTextLayer {
    fn extract_pages(&self, doc: &RawDocument) -> Result<Vec<String>, ExtractionError> {
        let pdf = Document::load_mem(&doc.bytes)?;
        if looks_like_scanned(&pdf) {
            return Err(ExtractionError::ImageOnly);
        }

        // pdf-extract panics on some malformed content streams.
        let bytes = doc.bytes.as_slice();
        let pages =
            std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
                .map_err(|_| ExtractionError::Text("pdf-extract panicked".to_string()))?
                .map_err(|e| ExtractionError::Text(e.to_string()))?;
        Ok(pages)
    }
}

fn page_resource_nonempty(doc: &Document, page: &lopdf::Dictionary, kind: &[u8]) -> bool {
    page.get(b"Resources")
        .ok()
        .and_then(|r| doc.dereference(r).ok())
        .and_then(|(_, resolved)| resolved.as_dict().ok())
        .and_then(|res| res.get(kind).ok())
        .and_then(|obj| doc.dereference(obj).ok())
        .and_then(|(_, resolved)| resolved.as_dict().ok())
        .is_some_and(|dict| !dict.is_empty())
}

/// A page with XObject images but no fonts is almost certainly a scan.
fn looks_like_scanned(doc: &Document) -> bool {
    let pages = doc.get_pages();
    if pages.is_empty() {
        return false;
    }

    let image_only = pages
        .values()
        .filter_map(|id| doc.get_object(*id).ok())
        .filter_map(|obj| obj.as_dict().ok())
        .filter(|page| {
            page_resource_nonempty(doc, page, b"XObject")
                && !page_resource_nonempty(doc, page, b"Font")
        })
        .count();

    let ratio = image_only as f64 / pages.len() as f64;
    info!(
        total_pages = pages.len(),
        image_only,
        ratio = format!("{ratio:.2}"),
        "Scanned-page analysis"
    );
    ratio >= SCANNED_PAGE_RATIO
}

// ---------------------------------------------------------------------------
// OCR front-ends (poppler + tesseract command line tools)
// ---------------------------------------------------------------------------

fn check_status(program: &str, output: &Output) -> Result<(), OcrError> {
    if output.status.success() {
        return Ok(());
    }
    Err(OcrError::Command {
        program: program.to_string(),
        status: output.status,
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

pub struct PdftoppmRasterizer {
    program: String,
    dpi: u32,
}

impl PdftoppmRasterizer {
    pub fn new(cfg: &OcrConfig) -> Self {
        Self {
            program: cfg.pdftoppm.clone(),
            dpi: cfg.dpi,
        }
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn rasterize(&self, doc: &RawDocument, workdir: &Path) -> Result<Vec<PathBuf>, OcrError> {
        let input = workdir.join("statement.pdf");
        fs::write(&input, &doc.bytes)?;

        let output = Command::new(&self.program)
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(&input)
            .arg(workdir.join("page"))
            .output()?;
        check_status(&self.program, &output)?;

        // pdftoppm zero-pads page numbers, so name order is page order.
        let mut images: Vec<PathBuf> = fs::read_dir(workdir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
            .collect();
        images.sort();

        info!(images = images.len(), dpi = self.dpi, "Pages rasterized");
        Ok(images)
    }
}

pub struct TesseractRecognizer {
    program: String,
    language: String,
}

impl TesseractRecognizer {
    pub fn new(cfg: &OcrConfig) -> Self {
        Self {
            program: cfg.tesseract.clone(),
            language: cfg.language.clone(),
        }
    }
}

impl Recognizer for TesseractRecognizer {
    fn recognize(&self, image: &Path) -> Result<String, OcrError> {
        let output = Command::new(&self.program)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()?;
        check_status(&self.program, &output)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
