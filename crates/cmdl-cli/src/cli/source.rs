//! Where a download comes from: a direct URL or a catalog lookup.

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Args};
use cmdl_core::catalog::{self, CatalogClient, ModelVersion};
use cmdl_core::config::CmdlConfig;
use cmdl_core::transport::Transport;
use std::fmt;
use std::sync::Arc;

/// Exactly one of the four source flags.
#[derive(Debug, Clone, Args)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["url", "model_id", "model_version_id", "hash"])
))]
pub struct SourceArgs {
    /// Direct download URL.
    #[arg(short = 'u', long)]
    pub url: Option<String>,

    /// Catalog model id (downloads its latest version).
    #[arg(short = 'm', long, value_name = "ID")]
    pub model_id: Option<u64>,

    /// Catalog model version id.
    #[arg(short = 'v', long, value_name = "ID")]
    pub model_version_id: Option<u64>,

    /// File hash known to the catalog (SHA256, AutoV2, BLAKE3, ...).
    #[arg(long)]
    pub hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    ModelId(u64),
    ModelVersionId(u64),
    Hash(String),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Url(url) => write!(f, "{url}"),
            Source::ModelId(id) => write!(f, "model {id}"),
            Source::ModelVersionId(id) => write!(f, "model version {id}"),
            Source::Hash(hash) => write!(f, "hash {hash}"),
        }
    }
}

impl SourceArgs {
    pub fn source(&self) -> Result<Source> {
        let picked = [
            self.url.clone().map(Source::Url),
            self.model_id.map(Source::ModelId),
            self.model_version_id.map(Source::ModelVersionId),
            self.hash.clone().map(Source::Hash),
        ];
        let mut picked = picked.into_iter().flatten();
        match (picked.next(), picked.next()) {
            (Some(source), None) => Ok(source),
            (None, _) => bail!("one of --url, --model-id, --model-version-id or --hash is required"),
            (Some(_), Some(_)) => bail!("only one download source may be given"),
        }
    }
}

/// A concrete URL plus whatever the catalog told us about it.
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    pub url: String,
    pub file_name: Option<String>,
    /// Catalog size estimate in bytes; 0 when unknown.
    pub size_hint: u64,
}

/// Look up a catalog version for `source` (blocking).
pub fn lookup_version(catalog: &CatalogClient, source: &Source) -> Result<ModelVersion> {
    let version = match source {
        Source::Url(_) => bail!("{source} is not a catalog source"),
        Source::ModelId(id) => catalog.latest_version(*id),
        Source::ModelVersionId(id) => catalog.model_version(*id),
        Source::Hash(hash) => catalog.model_version_by_hash(hash),
    };
    version.with_context(|| format!("catalog lookup for {source}"))
}

/// Turn `source` into a download URL (blocking; catalog sources hit the API).
pub fn resolve_blocking(
    catalog_url: &str,
    transport: Arc<dyn Transport>,
    source: &Source,
) -> Result<ResolvedSource> {
    if let Source::Url(url) = source {
        return Ok(ResolvedSource {
            url: url.clone(),
            file_name: None,
            size_hint: 0,
        });
    }

    let catalog = CatalogClient::new(transport, catalog_url)?;
    let version = lookup_version(&catalog, source)?;
    let target = catalog::target_of(&version)?;
    tracing::info!(
        version = version.id,
        name = %version.name,
        url = %target.url,
        "resolved {source}"
    );
    Ok(ResolvedSource {
        url: target.url,
        file_name: target.file_name,
        size_hint: target.size_hint,
    })
}

/// `resolve_blocking` on tokio's blocking pool.
pub async fn resolve(
    cfg: &CmdlConfig,
    transport: Arc<dyn Transport>,
    source: Source,
) -> Result<ResolvedSource> {
    let catalog_url = cfg.catalog_url.clone();
    tokio::task::spawn_blocking(move || resolve_blocking(&catalog_url, transport, &source))
        .await
        .context("catalog lookup task")?
}
