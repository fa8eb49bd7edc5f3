//! The conversion engine boundary.
//!
//! The orchestrator only ever talks to this one trait. A real OCR/table/PDF
//! backend is a drop-in implementor; this module ships a deterministic
//! stand-in so the rest of the service is exercisable without one.

use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;

use crate::job::{ProcessingMetadata, ProcessingOptions, ProcessingResult};

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait Converter: Send + Sync {
    async fn convert(
        &self,
        file_path: &str,
        options: &ProcessingOptions,
        tier: &str,
    ) -> Result<ProcessingResult, ConvertError>;
}

/// File-stat based stand-in: reads the file (so it genuinely yields at an
/// `.await` point, same as a real engine would across page boundaries),
/// derives a fake page count from its size, and renders a minimal
/// page-annotated Markdown document.
pub struct StubConverter;

#[async_trait]
impl Converter for StubConverter {
    async fn convert(
        &self,
        file_path: &str,
        _options: &ProcessingOptions,
        tier: &str,
    ) -> Result<ProcessingResult, ConvertError> {
        let start = Instant::now();

        let mut file = tokio::fs::File::open(file_path).await.map_err(|e| {
            use std::io::ErrorKind;
            match e.kind() {
                ErrorKind::NotFound => ConvertError::NotFound(file_path.to_string()),
                ErrorKind::PermissionDenied => ConvertError::PermissionDenied(file_path.to_string()),
                _ => ConvertError::Other(e.to_string()),
            }
        })?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf)
            .await
            .map_err(|e| ConvertError::Other(e.to_string()))?;

        // A real backend would report the true page count; this stand-in
        // derives a plausible one from file size (roughly 2KB per page).
        let page_count = (buf.len() as u64 / 2048).max(1);

        let items: Vec<DocItem> = (1..=page_count)
            .map(|page| DocItem::PageBreak { page })
            .collect();
        let markdown = render_markdown(&items, file_path);

        let format = Path::new(file_path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        Ok(ProcessingResult {
            markdown,
            metadata: ProcessingMetadata {
                page_count,
                processing_tier: tier.to_string(),
                format,
                processing_time_ms: start.elapsed().as_millis() as u64,
                ocr_engine: "stub".to_string(),
            },
        })
    }
}

/// A single item in the stand-in engine's internal document model. Not a
/// general document model — the real Markdown post-processor is out of
/// scope; this is just enough to render a page-annotated stub.
enum DocItem {
    PageBreak { page: u64 },
}

fn render_markdown(items: &[DocItem], file_path: &str) -> String {
    let mut out = format!("# {}\n\n", file_path);
    for item in items {
        match item {
            DocItem::PageBreak { page } => {
                out.push_str(&format!("<!-- page {page} -->\n\n"));
            }
        }
    }
    out
}
