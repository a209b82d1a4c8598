//! Catalog JSON payloads (only the fields the downloader reads).

use serde::Deserialize;

/// `GET /api/v1/model-versions/{id}` and `/by-hash/{hash}`; also the
/// entries of `Model::model_versions`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelVersion {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub model_id: Option<u64>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub files: Vec<ModelFile>,
    /// Parent model; absent when nested inside a `Model`.
    #[serde(default)]
    pub model: Option<ModelInfo>,
    #[serde(default)]
    pub base_model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelFile {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
    #[serde(rename = "sizeKB", alias = "sizeKb", default)]
    pub size_kb: f64,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub primary: Option<bool>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub metadata: Option<FileMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileMetadata {
    pub fp: Option<String>,
    pub size: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub nsfw: bool,
}

/// `GET /api/v1/models/{id}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Newest first.
    #[serde(default)]
    pub model_versions: Vec<ModelVersion>,
}

/// What to fetch for one model version.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadTarget {
    pub url: String,
    pub file_name: Option<String>,
    /// Estimate from the catalog; 0 when unknown.
    pub size_hint: u64,
}

impl ModelFile {
    /// Catalog size in bytes. The KB figure is rounded, so this is an estimate.
    pub fn size_bytes(&self) -> u64 {
        if self.size_kb.is_finite() && self.size_kb > 0.0 {
            (self.size_kb * 1024.0).round() as u64
        } else {
            0
        }
    }
}

impl ModelVersion {
    /// The file flagged primary, else the first one.
    pub fn primary_file(&self) -> Option<&ModelFile> {
        self.files
            .iter()
            .find(|f| f.primary == Some(true))
            .or_else(|| self.files.first())
    }

    /// Download URL, name and size hint for this version's primary file.
    pub fn download_target(&self) -> Option<DownloadTarget> {
        let file = self.primary_file();
        let url = file
            .and_then(|f| f.download_url.clone())
            .or_else(|| self.download_url.clone())
            .filter(|u| !u.is_empty())?;
        Some(DownloadTarget {
            url,
            file_name: file.map(|f| f.name.clone()),
            size_hint: file.map(ModelFile::size_bytes).unwrap_or(0),
        })
    }
}

impl Model {
    pub fn latest_version(&self) -> Option<&ModelVersion> {
        self.model_versions.first()
    }
}
