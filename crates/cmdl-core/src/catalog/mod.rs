//! Model catalog client (Civitai-compatible REST API).
//!
//! Resolves a model id, model-version id or file hash to a download URL,
//! filename and size hint. Requests go through the same injected `Transport`
//! as downloads, so they carry the configured auth header and proxy.

mod dto;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::transport::{get_bytes, Transport, TransportError};

pub use dto::{DownloadTarget, FileMetadata, Model, ModelFile, ModelInfo, ModelVersion};

/// Default catalog base URL.
pub const DEFAULT_CATALOG_URL: &str = "https://civitai.com";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid catalog base URL {0:?}")]
    BadBaseUrl(String),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportError,
    },
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("model {0} has no versions")]
    NoVersions(u64),
    #[error("model version {0} has no downloadable file")]
    NoFiles(u64),
}

pub struct CatalogClient {
    transport: Arc<dyn Transport>,
    base: Url,
}

impl CatalogClient {
    pub fn new(transport: Arc<dyn Transport>, base_url: &str) -> Result<Self, CatalogError> {
        let base = Url::parse(base_url).map_err(|_| CatalogError::BadBaseUrl(base_url.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(CatalogError::BadBaseUrl(base_url.to_string()));
        }
        Ok(Self { transport, base })
    }

    /// `{base}/api/v1/<segments...>`, each segment percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> String {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["api", "v1"]).extend(segments);
        }
        url.into()
    }

    fn fetch_json<T: DeserializeOwned>(&self, url: String) -> Result<T, CatalogError> {
        tracing::debug!(%url, "catalog request");
        let body = get_bytes(&*self.transport, &url).map_err(|source| CatalogError::Transport {
            url: url.clone(),
            source,
        })?;
        serde_json::from_slice(&body).map_err(|source| CatalogError::Decode { url, source })
    }

    pub fn model_version(&self, id: u64) -> Result<ModelVersion, CatalogError> {
        self.fetch_json(self.endpoint(&["model-versions", &id.to_string()]))
    }

    pub fn model_version_by_hash(&self, hash: &str) -> Result<ModelVersion, CatalogError> {
        self.fetch_json(self.endpoint(&["model-versions", "by-hash", hash]))
    }

    pub fn model(&self, id: u64) -> Result<Model, CatalogError> {
        self.fetch_json(self.endpoint(&["models", &id.to_string()]))
    }

    /// Latest version of model `id`.
    pub fn latest_version(&self, id: u64) -> Result<ModelVersion, CatalogError> {
        let model = self.model(id)?;
        let mut version = model
            .model_versions
            .into_iter()
            .next()
            .ok_or(CatalogError::NoVersions(id))?;
        // Versions nested in a model do not repeat the parent.
        if version.model.is_none() {
            version.model = Some(ModelInfo {
                name: model.name,
                kind: model.kind,
                nsfw: false,
            });
        }
        version.model_id.get_or_insert(model.id);
        Ok(version)
    }
}

/// Download target for `version`, or `NoFiles` if it has nothing to fetch.
pub fn target_of(version: &ModelVersion) -> Result<DownloadTarget, CatalogError> {
    version
        .download_target()
        .ok_or(CatalogError::NoFiles(version.id))
}
