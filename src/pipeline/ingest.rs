//! Document ingest: upload a registration PDF to Upstage Document Parse and
//! return the structured text it extracts.
//!
//! The file is read fully into memory before the request is built, so the
//! handle is closed by the time the upload starts and no descriptor is held
//! across the network call. Content type is not checked; a non-PDF is the
//! service's problem to reject.

use crate::config::GuardConfig;
use crate::error::GuardError;
use crate::pipeline::http::{check_status, transport_error};
use reqwest::{multipart, Client};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Service label used in errors and logs.
pub const SERVICE: &str = "document-parse";

/// Multipart field the service expects the PDF under.
const DOCUMENT_FIELD: &str = "document";

#[derive(Deserialize)]
struct ParseResponse {
    #[serde(default)]
    content: Option<ParsedContent>,
}

#[derive(Deserialize)]
struct ParsedContent {
    #[serde(default)]
    text: Option<String>,
}

/// Client for the document-parsing service.
#[derive(Clone)]
pub struct DocumentIngestor {
    client: Client,
    url: String,
    api_key: String,
}

impl DocumentIngestor {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    /// Build an ingestor from the run configuration.
    pub fn from_config(config: &GuardConfig) -> Result<Self, GuardError> {
        Ok(Self::new(config.parse_url.clone(), config.api_key()?))
    }

    /// Read the PDF at `path` and return the parsed text.
    ///
    /// Returns an empty string when the service's reply has no text field.
    pub async fn parse(&self, path: &Path) -> Result<String, GuardError> {
        let bytes = read_document(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        self.parse_bytes(file_name, bytes).await
    }

    /// Upload an in-memory PDF and return the parsed text.
    pub async fn parse_bytes(
        &self,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<String, GuardError> {
        let file_name = file_name.into();
        info!("Uploading '{}' ({} bytes) to {}", file_name, bytes.len(), SERVICE);

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")
            .map_err(|e| GuardError::Internal(e.to_string()))?;
        let form = multipart::Form::new().part(DOCUMENT_FIELD, part);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        let response = check_status(SERVICE, response).await?;
        let body: ParseResponse = response.json().await.map_err(|e| GuardError::Model {
            service: SERVICE.to_string(),
            detail: format!("malformed JSON: {e}"),
        })?;

        let text = body.content.and_then(|c| c.text).unwrap_or_default();
        if text.is_empty() {
            warn!("{} returned no text for the document", SERVICE);
        }
        debug!("Parsed text: {} chars", text.chars().count());
        Ok(text)
    }
}

/// Read the whole file, mapping open failures to the input-error variants.
async fn read_document(path: &Path) -> Result<Vec<u8>, GuardError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            debug!("Read local PDF: {}", path.display());
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(GuardError::FileNotFound {
            path: path.to_path_buf(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(GuardError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(e) => Err(GuardError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
