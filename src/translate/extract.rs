//! Plain-text extraction from PDF bytes.

use crate::error::{PipelineError, Result};
use lopdf::Document;
use tracing::{debug, instrument};

/// Capability to turn a stored document into plain text.
pub trait ExtractText {
    fn extract_text(&self, document: &[u8]) -> Result<String>;
}

/// Extracts text page by page with `lopdf`, one newline after each page.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfExtractor;

impl ExtractText for LopdfExtractor {
    #[instrument(level = "info", skip_all, fields(bytes = document.len()))]
    fn extract_text(&self, document: &[u8]) -> Result<String> {
        let pdf = Document::load_mem(document)
            .map_err(|e| PipelineError::Extraction(format!("cannot open PDF: {e}")))?;

        let mut text = String::new();
        for page in pdf.get_pages().into_keys() {
            let page_text = pdf.extract_text(&[page]).map_err(|e| {
                PipelineError::Extraction(format!("cannot extract text from page {page}: {e}"))
            })?;
            text.push_str(&page_text);
            text.push('\n');
        }

        debug!(chars = text.chars().count(), "Extracted text");
        Ok(text)
    }
}
