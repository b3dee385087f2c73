//! PDF text extraction.
//!
//! [`TextExtractor`] is the seam the upload path depends on; [`PdfExtractor`]
//! is the production implementation backed by `pdf-extract`. Page texts are
//! concatenated in page order and passed through unmodified: no OCR, no
//! layout reconstruction.

use async_trait::async_trait;

/// Extraction error. Never a panic: a parser panic is caught and reported
/// as [`ExtractError::Pdf`].
#[derive(Debug)]
pub enum ExtractError {
    Pdf(String),
    Join(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Join(e) => write!(f, "PDF extraction task failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Converts an uploaded byte stream into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// [`TextExtractor`] over `pdf-extract`, run on the blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

#[async_trait]
impl TextExtractor for PdfExtractor {
    async fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let owned = bytes.to_vec();
        tokio::task::spawn_blocking(move || extract_pdf(&owned))
            .await
            .map_err(|e| {
                if e.is_panic() {
                    ExtractError::Pdf("parser panicked on malformed input".to_string())
                } else {
                    ExtractError::Join(e.to_string())
                }
            })?
    }
}

/// Synchronous extraction: every page's text, in page order, joined with
/// no separator. Pages without text contribute an empty string.
pub fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(pages.concat())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a PDF with one page per entry of `pages`, each drawing its text
    /// in Helvetica. An empty entry yields a page with an empty content stream.
    fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
        let n = pages.len();
        // 1 catalog, 2 page tree, 3 font, then a (page, contents) pair per page.
        let page_obj = |i: usize| 4 + 2 * i;
        let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", page_obj(i))).collect();

        let mut out = Vec::new();
        let mut offsets = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n");

        offsets.push(out.len());
        out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
        offsets.push(out.len());
        out.extend_from_slice(
            format!(
                "2 0 obj << /Type /Pages /Kids [{}] /Count {} >> endobj\n",
                kids.join(" "),
                n
            )
            .as_bytes(),
        );
        offsets.push(out.len());
        out.extend_from_slice(
            b"3 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
        );

        for (i, text) in pages.iter().enumerate() {
            let content = if text.is_empty() {
                String::new()
            } else {
                format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", text)
            };
            offsets.push(out.len());
            out.extend_from_slice(
                format!(
                    "{} 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R /Resources << /Font << /F1 3 0 R >> >> >> endobj\n",
                    page_obj(i),
                    page_obj(i) + 1
                )
                .as_bytes(),
            );
            offsets.push(out.len());
            out.extend_from_slice(
                format!(
                    "{} 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
                    page_obj(i) + 1,
                    content.len(),
                    content
                )
                .as_bytes(),
            );
        }

        let size = offsets.len() + 1;
        let xref_start = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", size).as_bytes());
        out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
        for offset in offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(
            format!("trailer << /Size {} /Root 1 0 R >>\nstartxref\n", size).as_bytes(),
        );
        out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
        out.extend_from_slice(b"%%EOF\n");
        out
    }

    #[test]
    fn pages_are_concatenated_in_page_order() {
        let bytes = pdf_with_pages(&["Alpha", "", "Gamma"]);

        let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes).unwrap();
        assert_eq!(pages.len(), 3);
        assert!(pages[0].contains("Alpha"));
        assert!(pages[1].trim().is_empty(), "blank page: {:?}", pages[1]);
        assert!(pages[2].contains("Gamma"));

        let text = extract_pdf(&bytes).unwrap();
        assert_eq!(text, pages.concat());
        let alpha = text.find("Alpha").unwrap();
        let gamma = text.find("Gamma").unwrap();
        assert!(alpha < gamma, "out of order: {:?}", text);
        assert_eq!(text.split_whitespace().collect::<Vec<_>>(), ["Alpha", "Gamma"]);
    }

    #[tokio::test]
    async fn async_extractor_keeps_page_order() {
        let bytes = pdf_with_pages(&["First", "Second"]);
        let text = PdfExtractor.extract(&bytes).await.unwrap();
        assert_eq!(text.split_whitespace().collect::<Vec<_>>(), ["First", "Second"]);
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_pdf(b"not a pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn empty_input_returns_error() {
        assert!(extract_pdf(b"").is_err());
    }

    #[tokio::test]
    async fn async_extractor_reports_garbage_as_pdf_error() {
        let err = PdfExtractor.extract(b"%PDF-1.4 garbage").await.unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
        assert!(err.to_string().starts_with("PDF extraction failed"));
    }
}
