//! Upload and question orchestration.
//!
//! [`PdfChatService`] glues the four collaborators together. All of them
//! are injected as trait objects so tests can substitute stubs.
//!
//! # Upload effect order
//!
//! ```text
//! disk write ─▶ extract ─▶ store insert ─▶ cache put
//! ```
//!
//! The cache is written last, so a failure at any earlier step leaves it
//! untouched. There is no rollback: a file written to disk before a failed
//! extraction stays on disk, and a store row survives a failed cache put.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::TextCache;
use crate::extract::TextExtractor;
use crate::models::{
    AskResponse, ChatTurn, DocumentMetadata, NewDocument, QuestionRequest, UploadResponse,
};
use crate::qa::QaProvider;
use crate::store::DocumentStore;

/// Returned verbatim in the 404 body when `ask` names an uncached file.
pub const CONTENT_NOT_FOUND: &str = "PDF content not found. Please upload the PDF first.";

/// Model turn that closes the priming history.
pub const READY_REPLY: &str = "I am ready to answer your questions based on the PDF content.";

/// Errors surfaced by [`PdfChatService`]. None are retried.
#[derive(Debug)]
pub enum ServiceError {
    /// The upload's filename has no usable final path component.
    InvalidFilename(String),
    /// The bytes could not be parsed as a PDF.
    Extraction(String),
    /// Disk, database or cache failure.
    Storage(String),
    NotFound(String),
    /// The QA provider failed.
    UpstreamQa(String),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::InvalidFilename(name) => write!(f, "invalid filename: {:?}", name),
            ServiceError::Extraction(e) => write!(f, "{}", e),
            ServiceError::Storage(e) => write!(f, "storage error: {}", e),
            ServiceError::NotFound(e) => write!(f, "{}", e),
            ServiceError::UpstreamQa(e) => write!(f, "QA provider error: {}", e),
        }
    }
}

impl std::error::Error for ServiceError {}

/// The two priming turns every `ask` session starts with.
pub fn priming_turns(text: &str) -> Vec<ChatTurn> {
    vec![
        ChatTurn::user(format!(
            "I have the following content from a PDF: {}\n",
            text
        )),
        ChatTurn::model(READY_REPLY),
    ]
}

/// Resolves where an upload named `filename` is written.
///
/// Only the final path component is kept, so `"../x.pdf"` lands in
/// `upload_dir` as `x.pdf`. Same name, same path: later uploads overwrite.
pub fn upload_path(upload_dir: &Path, filename: &str) -> Option<PathBuf> {
    Path::new(filename)
        .file_name()
        .map(|name| upload_dir.join(name))
}

pub struct PdfChatService {
    store: Arc<dyn DocumentStore>,
    extractor: Arc<dyn TextExtractor>,
    qa: Arc<dyn QaProvider>,
    cache: Arc<dyn TextCache>,
    upload_dir: PathBuf,
}

impl PdfChatService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        extractor: Arc<dyn TextExtractor>,
        qa: Arc<dyn QaProvider>,
        cache: Arc<dyn TextCache>,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            extractor,
            qa,
            cache,
            upload_dir: upload_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Stores an uploaded PDF, extracts its text, records its metadata and
    /// caches the text under `filename`.
    pub async fn upload(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> Result<UploadResponse, ServiceError> {
        let path = upload_path(&self.upload_dir, filename)
            .ok_or_else(|| ServiceError::InvalidFilename(filename.to_string()))?;

        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(|e| {
                ServiceError::Storage(format!(
                    "failed to create {}: {}",
                    self.upload_dir.display(),
                    e
                ))
            })?;
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            ServiceError::Storage(format!("failed to write {}: {}", path.display(), e))
        })?;

        let content = self.extractor.extract(bytes).await.map_err(|e| {
            tracing::warn!(filename, error = %e, "extraction failed");
            ServiceError::Extraction(e.to_string())
        })?;

        let document_id = self
            .store
            .insert(&NewDocument::new(filename))
            .await
            .map_err(|e| {
                tracing::error!(filename, error = %e, "metadata insert failed");
                ServiceError::Storage(e.to_string())
            })?;

        self.cache
            .put(filename, content.clone())
            .await
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        tracing::info!(
            filename,
            document_id = %document_id,
            bytes = bytes.len(),
            chars = content.len(),
            "upload stored"
        );

        Ok(UploadResponse {
            filename: filename.to_string(),
            content,
            document_id,
        })
    }

    /// Answers `request.question` against the cached text of
    /// `request.filename`, in a fresh QA session.
    pub async fn ask(&self, request: QuestionRequest) -> Result<AskResponse, ServiceError> {
        let text = self
            .cache
            .get(&request.filename)
            .await
            .map_err(|e| ServiceError::Storage(e.to_string()))?
            .ok_or_else(|| ServiceError::NotFound(CONTENT_NOT_FOUND.to_string()))?;

        let mut session = self.qa.start_session(priming_turns(&text));
        let answer = session
            .send_message(&request.question)
            .await
            .map_err(|e| {
                tracing::error!(
                    filename = %request.filename,
                    model = self.qa.model_name(),
                    error = %e,
                    "QA request failed"
                );
                ServiceError::UpstreamQa(e.to_string())
            })?;

        tracing::info!(filename = %request.filename, "question answered");

        Ok(AskResponse {
            question: request.question,
            answer,
        })
    }

    /// Looks up upload metadata by store id.
    pub async fn document(&self, id: &str) -> Result<DocumentMetadata, ServiceError> {
        self.store
            .get_by_id(id)
            .await
            .map_err(|e| ServiceError::Storage(e.to_string()))?
            .ok_or_else(|| ServiceError::NotFound(format!("document not found: {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priming_embeds_text_then_ready_reply() {
        let turns = priming_turns("Hello");
        assert_eq!(turns.len(), 2);
        assert_eq!(
            turns[0],
            ChatTurn::user("I have the following content from a PDF: Hello\n")
        );
        assert_eq!(turns[1], ChatTurn::model(READY_REPLY));
    }

    #[test]
    fn upload_path_keeps_final_component() {
        let dir = Path::new("/srv/uploads");
        assert_eq!(
            upload_path(dir, "report.pdf"),
            Some(PathBuf::from("/srv/uploads/report.pdf"))
        );
        assert_eq!(
            upload_path(dir, "../../etc/passwd"),
            Some(PathBuf::from("/srv/uploads/passwd"))
        );
        assert_eq!(upload_path(dir, ""), None);
        assert_eq!(upload_path(dir, ".."), None);
    }
}
